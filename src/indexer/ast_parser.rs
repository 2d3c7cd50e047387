use super::docstring;
use super::language::{LANGUAGES, Language, LanguageSpec};
use super::{ANONYMOUS, CodeUnit, UnitKind, dedent};
use crate::error::ParseError;
use regex::Regex;
use std::collections::{BTreeSet, HashSet};
use std::ops::Range;
use tree_sitter::{Node, Parser, Query, QueryCursor, StreamingIterator};

/// Grammar, queries and complexity pattern for one language, compiled once
struct CompiledLanguage {
    spec: &'static LanguageSpec,
    grammar: tree_sitter::Language,
    definitions: Query,
    definition_capture: u32,
    name_capture: Option<u32>,
    calls: Query,
    complexity: Regex,
}

/// Grammar-driven extractor of functions, methods and classes.
///
/// One generic engine, configured per language by the table in
/// [`super::language`]. Queries are compiled in [`CodeParser::new`]; a fresh
/// tree-sitter parser is created per call so the value can be shared freely
/// across threads.
pub struct CodeParser {
    languages: Vec<CompiledLanguage>,
}

impl CodeParser {
    pub fn new() -> Result<Self, ParseError> {
        let languages = LANGUAGES
            .iter()
            .map(compile)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { languages })
    }

    /// Extract code units from `source`, detecting the language from
    /// `filepath`. Unsupported extensions yield an empty list. Syntax errors
    /// are tolerated: whatever the partial tree still contains is extracted.
    pub fn parse(&self, source: &str, filepath: &str) -> Vec<CodeUnit> {
        let Some(language) = Language::from_path(filepath) else {
            tracing::debug!("No grammar for {}, skipping", filepath);
            return Vec::new();
        };
        let compiled = &self.languages[language as usize];

        let mut parser = Parser::new();
        if let Err(e) = parser.set_language(&compiled.grammar) {
            tracing::warn!("Failed to set {} grammar: {}", language, e);
            return Vec::new();
        }
        let Some(tree) = parser.parse(source, None) else {
            tracing::warn!("Parser produced no tree for {}", filepath);
            return Vec::new();
        };

        let root = tree.root_node();
        if root.has_error() {
            tracing::debug!(
                "{} contains syntax errors, extracting from partial tree",
                filepath
            );
        }

        let mut definitions = compiled.find_definitions(root, source);
        definitions.sort_by(|a, b| {
            (a.0.start_byte(), a.0.end_byte(), &a.1).cmp(&(b.0.start_byte(), b.0.end_byte(), &b.1))
        });

        let mut seen: HashSet<Range<usize>> = HashSet::new();
        let units: Vec<CodeUnit> = definitions
            .into_iter()
            .filter(|(node, _)| seen.insert(node.byte_range()))
            .map(|(node, name)| compiled.build_unit(node, name, source, filepath))
            .collect();

        tracing::debug!("Parsed {} units from {}", units.len(), filepath);
        units
    }
}

fn compile(spec: &'static LanguageSpec) -> Result<CompiledLanguage, ParseError> {
    let grammar = spec.grammar();

    Parser::new()
        .set_language(&grammar)
        .map_err(|e| ParseError::GrammarLoadFailed {
            language: spec.name.to_string(),
            reason: e.to_string(),
        })?;

    let query = |source: &str, which: &str| {
        Query::new(&grammar, source).map_err(|e| ParseError::QueryCompileFailed {
            language: spec.name.to_string(),
            query: which.to_string(),
            reason: e.to_string(),
        })
    };
    let definitions = query(spec.definitions_query, "definitions")?;
    let calls = query(spec.calls_query, "calls")?;

    let definition_capture = definitions
        .capture_index_for_name("definition")
        .ok_or_else(|| ParseError::QueryCompileFailed {
            language: spec.name.to_string(),
            query: "definitions".to_string(),
            reason: "missing @definition capture".to_string(),
        })?;
    let name_capture = definitions.capture_index_for_name("name");

    let complexity =
        Regex::new(spec.complexity_pattern).map_err(|e| ParseError::PatternCompileFailed {
            language: spec.name.to_string(),
            reason: e.to_string(),
        })?;

    Ok(CompiledLanguage {
        spec,
        grammar,
        definitions,
        definition_capture,
        name_capture,
        calls,
        complexity,
    })
}

fn node_text<'s>(node: Node, source: &'s str) -> &'s str {
    source.get(node.byte_range()).unwrap_or_default()
}

/// Byte offset of the start of the line containing `offset`
fn line_start(source: &str, offset: usize) -> usize {
    source
        .get(..offset)
        .and_then(|s| s.rfind('\n'))
        .map_or(0, |i| i + 1)
}

/// An arrow function bound by `const name = (...) => ...` takes the variable's
/// name and the whole declaration as its span; any other one is anonymous.
fn resolve_arrow<'t>(arrow: Node<'t>, source: &str) -> (Node<'t>, String) {
    if let Some(declarator) = arrow.parent()
        && declarator.kind() == "variable_declarator"
        && declarator.child_by_field_name("value") == Some(arrow)
        && let Some(name) = declarator.child_by_field_name("name")
        && name.kind() == "identifier"
    {
        let span = declarator
            .parent()
            .filter(|d| {
                matches!(d.kind(), "lexical_declaration" | "variable_declaration")
                    && d.named_child_count() == 1
            })
            .unwrap_or(declarator);
        return (span, node_text(name, source).to_string());
    }
    (arrow, ANONYMOUS.to_string())
}

/// Name of a function-like node: its `name` field, or the innermost
/// declarator for C-family definitions
fn function_name<'s>(node: Node, source: &'s str) -> &'s str {
    if let Some(name) = node.child_by_field_name("name") {
        return node_text(name, source);
    }
    let mut current = node.child_by_field_name("declarator");
    while let Some(declarator) = current {
        match declarator.child_by_field_name("declarator") {
            Some(inner) => current = Some(inner),
            None => return node_text(declarator, source),
        }
    }
    ""
}

impl CompiledLanguage {
    /// Every `@definition` capture paired with its resolved name
    fn find_definitions<'t>(&self, root: Node<'t>, source: &str) -> Vec<(Node<'t>, String)> {
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&self.definitions, root, source.as_bytes());
        let mut out = Vec::new();

        while let Some(m) = matches.next() {
            let mut definition = None;
            let mut name = None;
            for cap in m.captures {
                if cap.index == self.definition_capture {
                    definition = Some(cap.node);
                } else if Some(cap.index) == self.name_capture {
                    name = Some(cap.node);
                }
            }

            let Some(definition) = definition else {
                continue;
            };
            let resolved = match name {
                Some(name) => (definition, node_text(name, source).to_string()),
                None if definition.kind() == "arrow_function" => resolve_arrow(definition, source),
                None => (definition, ANONYMOUS.to_string()),
            };
            out.push(resolved);
        }
        out
    }

    fn classify(&self, node: Node) -> UnitKind {
        let kind = node.kind();
        if self.spec.is_class_kind(kind) {
            return UnitKind::Class;
        }
        if self.spec.method_kinds.contains(&kind) {
            return UnitKind::Method;
        }

        // The nearest enclosing function or class decides
        let mut ancestor = node.parent();
        while let Some(parent) = ancestor {
            if self.spec.is_class_kind(parent.kind()) {
                return UnitKind::Method;
            }
            if self.spec.is_function_kind(parent.kind()) {
                return UnitKind::Function;
            }
            ancestor = parent.parent();
        }
        UnitKind::Function
    }

    fn build_unit(&self, node: Node, name: String, source: &str, filepath: &str) -> CodeUnit {
        let kind = self.classify(node);

        // Start at the line start when only indentation precedes the node so
        // dedenting sees the real indentation of the first line
        let line = line_start(source, node.start_byte());
        let content_start = if source[line..node.start_byte()].trim().is_empty() {
            line
        } else {
            node.start_byte()
        };
        let raw = &source[content_start..node.end_byte()];

        let content = if kind == UnitKind::Class {
            dedent(&self.skeleton(node, source, content_start, &name))
        } else {
            dedent(raw)
        };

        CodeUnit {
            kind,
            complexity: 1 + self.complexity.find_iter(raw).count() as u32,
            calls: self.calls(node, source),
            docstring: docstring::extract(self.spec.doc_style, node, source),
            content,
            start_line: node.start_position().row + 1,
            end_line: node.end_position().row + 1,
            byte_range: node.byte_range(),
            language: self.spec.language,
            filepath: filepath.to_string(),
            name,
        }
    }

    /// Names invoked anywhere inside `node`
    fn calls(&self, node: Node, source: &str) -> BTreeSet<String> {
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&self.calls, node, source.as_bytes());
        let mut out = BTreeSet::new();
        while let Some(m) = matches.next() {
            for cap in m.captures {
                let name = node_text(cap.node, source);
                if !name.is_empty() {
                    out.insert(name.to_string());
                }
            }
        }
        out
    }

    fn is_constructor(&self, member: Node, source: &str, class_name: &str) -> bool {
        if self.spec.constructor_kinds.contains(&member.kind()) {
            return true;
        }
        let name = function_name(member, source);
        self.spec.constructor_names.contains(&name)
            || (self.spec.class_named_constructor && name == class_name)
    }

    /// Class source with every non-constructor method body replaced by the
    /// language's elision marker
    fn skeleton(&self, class: Node, source: &str, content_start: usize, class_name: &str) -> String {
        let mut masks: Vec<Range<usize>> = Vec::new();

        if let Some(body) = class.child_by_field_name("body") {
            let mut cursor = body.walk();
            for child in body.named_children(&mut cursor) {
                let member = if child.kind() == "decorated_definition" {
                    child.child_by_field_name("definition").unwrap_or(child)
                } else {
                    child
                };
                if !self.spec.is_function_kind(member.kind())
                    || self.is_constructor(member, source, class_name)
                {
                    continue;
                }
                if let Some(method_body) = member.child_by_field_name("body") {
                    masks.push(method_body.byte_range());
                }
            }
        }

        let mut text = source[content_start..class.end_byte()].to_string();
        masks.sort_by_key(|r| std::cmp::Reverse(r.start));
        for range in masks {
            text.replace_range(
                range.start - content_start..range.end - content_start,
                self.spec.elision,
            );
        }
        text
    }
}
