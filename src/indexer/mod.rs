//! Code parsing, chunking and repository walking
//!
//! Turns raw source text into [`CodeUnit`]s (functions, methods, classes) with a
//! grammar-driven parser, then splits them into token-bounded [`CodeChunk`]s
//! ready for embedding.

mod ast_parser;
mod chunker;
mod docstring;
mod file_walker;
pub mod language;
mod tokenizer;

pub use ast_parser::CodeParser;
pub use chunker::SmartChunker;
pub use file_walker::{FileWalker, SourceFile};
pub use language::{Language, is_supported};
pub use tokenizer::TokenCounter;

use crate::types::ChunkMetadata;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::ops::Range;

/// Name given to definitions that have no identifier of their own
pub const ANONYMOUS: &str = "<anonymous>";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    Function,
    Method,
    Class,
}

impl UnitKind {
    pub fn as_str(self) -> &'static str {
        match self {
            UnitKind::Function => "function",
            UnitKind::Method => "method",
            UnitKind::Class => "class",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "function" => Some(UnitKind::Function),
            "method" => Some(UnitKind::Method),
            "class" => Some(UnitKind::Class),
            _ => None,
        }
    }
}

impl std::fmt::Display for UnitKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One extracted definition.
///
/// Created fresh on every parse and never mutated afterwards. For classes,
/// `content` is the skeleton (non-constructor method bodies elided).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeUnit {
    pub kind: UnitKind,
    pub name: String,
    pub content: String,
    /// 1-indexed, inclusive
    pub start_line: usize,
    pub end_line: usize,
    pub byte_range: Range<usize>,
    pub docstring: String,
    /// 1 + number of branching constructs
    pub complexity: u32,
    pub calls: BTreeSet<String>,
    pub language: Language,
    pub filepath: String,
}

impl CodeUnit {
    pub fn is_anonymous(&self) -> bool {
        self.name == ANONYMOUS
    }

    /// Whether any of `lines` (1-indexed) falls inside this unit
    pub fn overlaps_any<'a>(&self, mut lines: impl Iterator<Item = &'a usize>) -> bool {
        lines.any(|l| (self.start_line..=self.end_line).contains(l))
    }
}

/// Represents a code chunk ready for embedding
#[derive(Debug, Clone, PartialEq)]
pub struct CodeChunk {
    /// `{name}-{ordinal}-{digest8}`, stable for identical content
    pub id: String,
    pub content: String,
    pub metadata: ChunkMetadata,
}

/// Remove the whitespace prefix shared by every non-blank line
pub(crate) fn dedent(text: &str) -> String {
    let prefix = text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| &l[..l.len() - l.trim_start_matches([' ', '\t']).len()])
        .reduce(|a, b| {
            let common = a
                .bytes()
                .zip(b.bytes())
                .take_while(|(x, y)| x == y)
                .count();
            &a[..common]
        })
        .unwrap_or("");

    if prefix.is_empty() {
        return text.to_string();
    }

    text.split_inclusive('\n')
        .map(|line| line.strip_prefix(prefix).unwrap_or(line.trim_start_matches([' ', '\t'])))
        .collect()
}
