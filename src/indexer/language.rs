//! Per-language parsing configuration.
//!
//! Every supported language is one [`LanguageSpec`] entry in [`LANGUAGES`]: the
//! grammar, the query that locates definitions, the narrower query that
//! collects call sites, and the node kinds the generic extraction engine in
//! `ast_parser` needs to classify what it finds.

use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    JavaScript,
    TypeScript,
    Tsx,
    Java,
    Go,
    C,
    Cpp,
    Rust,
}

/// Where leading documentation lives for a language
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocStyle {
    /// First statement of the body is a string literal
    BodyString,
    /// `/** ... */` block or a run of line comments directly above the definition
    Preceding { line_prefix: &'static str },
}

pub struct LanguageSpec {
    pub language: Language,
    /// Stable lowercase name stored in chunk metadata
    pub name: &'static str,
    pub extensions: &'static [&'static str],
    grammar: fn() -> tree_sitter::Language,
    /// Captures `@definition` and, when the construct is named, `@name`
    pub definitions_query: &'static str,
    /// Captures `@call` for every invoked identifier or member name
    pub calls_query: &'static str,
    pub class_kinds: &'static [&'static str],
    pub function_kinds: &'static [&'static str],
    /// Node kinds that are methods regardless of nesting
    pub method_kinds: &'static [&'static str],
    pub constructor_kinds: &'static [&'static str],
    pub constructor_names: &'static [&'static str],
    /// C++ style: a member function named after its class is a constructor
    pub class_named_constructor: bool,
    pub doc_style: DocStyle,
    pub complexity_pattern: &'static str,
    /// Replacement for elided method bodies in class skeletons
    pub elision: &'static str,
}

impl LanguageSpec {
    pub fn grammar(&self) -> tree_sitter::Language {
        (self.grammar)()
    }

    pub fn is_class_kind(&self, kind: &str) -> bool {
        self.class_kinds.contains(&kind)
    }

    pub fn is_function_kind(&self, kind: &str) -> bool {
        self.function_kinds.contains(&kind)
    }
}

const C_STYLE_COMPLEXITY: &str = r"\b(?:if|for|while|switch|case|catch)\b|&&|\|\|";
const JS_COMPLEXITY: &str = r"\b(?:if|for|while|switch|case|catch)\b|&&|\|\||\?\?";
const JS_CALLS: &str = r#"
(call_expression function: (identifier) @call)
(call_expression function: (member_expression property: (property_identifier) @call))
"#;
const TS_DEFINITIONS: &str = r#"
(function_declaration name: (identifier) @name) @definition
(generator_function_declaration name: (identifier) @name) @definition
(class_declaration name: (type_identifier) @name) @definition
(abstract_class_declaration name: (type_identifier) @name) @definition
(method_definition name: (property_identifier) @name) @definition
(arrow_function) @definition
"#;
const JS_FUNCTIONS: &[&str] = &[
    "function_declaration",
    "generator_function_declaration",
    "method_definition",
    "arrow_function",
];

pub static LANGUAGES: &[LanguageSpec] = &[
    LanguageSpec {
        language: Language::Python,
        name: "python",
        extensions: &["py", "pyi"],
        grammar: || tree_sitter_python::LANGUAGE.into(),
        definitions_query: r#"
(function_definition name: (identifier) @name) @definition
(class_definition name: (identifier) @name) @definition
"#,
        calls_query: r#"
(call function: (identifier) @call)
(call function: (attribute attribute: (identifier) @call))
"#,
        class_kinds: &["class_definition"],
        function_kinds: &["function_definition"],
        method_kinds: &[],
        constructor_kinds: &[],
        constructor_names: &["__init__"],
        class_named_constructor: false,
        doc_style: DocStyle::BodyString,
        complexity_pattern: r"\b(?:if|elif|for|while|except|and|or|assert)\b",
        elision: "...",
    },
    LanguageSpec {
        language: Language::JavaScript,
        name: "javascript",
        extensions: &["js", "jsx", "mjs", "cjs"],
        grammar: || tree_sitter_javascript::LANGUAGE.into(),
        definitions_query: r#"
(function_declaration name: (identifier) @name) @definition
(generator_function_declaration name: (identifier) @name) @definition
(class_declaration name: (identifier) @name) @definition
(method_definition name: (property_identifier) @name) @definition
(arrow_function) @definition
"#,
        calls_query: JS_CALLS,
        class_kinds: &["class_declaration"],
        function_kinds: JS_FUNCTIONS,
        method_kinds: &["method_definition"],
        constructor_kinds: &[],
        constructor_names: &["constructor"],
        class_named_constructor: false,
        doc_style: DocStyle::Preceding { line_prefix: "///" },
        complexity_pattern: JS_COMPLEXITY,
        elision: "{ ... }",
    },
    LanguageSpec {
        language: Language::TypeScript,
        name: "typescript",
        extensions: &["ts", "mts", "cts"],
        grammar: || tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
        definitions_query: TS_DEFINITIONS,
        calls_query: JS_CALLS,
        class_kinds: &["class_declaration", "abstract_class_declaration"],
        function_kinds: JS_FUNCTIONS,
        method_kinds: &["method_definition"],
        constructor_kinds: &[],
        constructor_names: &["constructor"],
        class_named_constructor: false,
        doc_style: DocStyle::Preceding { line_prefix: "///" },
        complexity_pattern: JS_COMPLEXITY,
        elision: "{ ... }",
    },
    LanguageSpec {
        language: Language::Tsx,
        name: "typescript",
        extensions: &["tsx"],
        grammar: || tree_sitter_typescript::LANGUAGE_TSX.into(),
        definitions_query: TS_DEFINITIONS,
        calls_query: JS_CALLS,
        class_kinds: &["class_declaration", "abstract_class_declaration"],
        function_kinds: JS_FUNCTIONS,
        method_kinds: &["method_definition"],
        constructor_kinds: &[],
        constructor_names: &["constructor"],
        class_named_constructor: false,
        doc_style: DocStyle::Preceding { line_prefix: "///" },
        complexity_pattern: JS_COMPLEXITY,
        elision: "{ ... }",
    },
    LanguageSpec {
        language: Language::Java,
        name: "java",
        extensions: &["java"],
        grammar: || tree_sitter_java::LANGUAGE.into(),
        definitions_query: r#"
(method_declaration name: (identifier) @name) @definition
(constructor_declaration name: (identifier) @name) @definition
(class_declaration name: (identifier) @name) @definition
(interface_declaration name: (identifier) @name) @definition
"#,
        calls_query: r#"
(method_invocation name: (identifier) @call)
"#,
        class_kinds: &["class_declaration", "interface_declaration"],
        function_kinds: &["method_declaration", "constructor_declaration"],
        method_kinds: &["method_declaration", "constructor_declaration"],
        constructor_kinds: &["constructor_declaration"],
        constructor_names: &[],
        class_named_constructor: false,
        doc_style: DocStyle::Preceding { line_prefix: "///" },
        complexity_pattern: C_STYLE_COMPLEXITY,
        elision: "{ ... }",
    },
    LanguageSpec {
        language: Language::Go,
        name: "go",
        extensions: &["go"],
        grammar: || tree_sitter_go::LANGUAGE.into(),
        definitions_query: r#"
(function_declaration name: (identifier) @name) @definition
(method_declaration name: (field_identifier) @name) @definition
"#,
        calls_query: r#"
(call_expression function: (identifier) @call)
(call_expression function: (selector_expression field: (field_identifier) @call))
"#,
        class_kinds: &[],
        function_kinds: &["function_declaration", "method_declaration"],
        method_kinds: &["method_declaration"],
        constructor_kinds: &[],
        constructor_names: &[],
        class_named_constructor: false,
        doc_style: DocStyle::Preceding { line_prefix: "//" },
        complexity_pattern: r"\b(?:if|for|select|case)\b|&&|\|\|",
        elision: "{ ... }",
    },
    LanguageSpec {
        language: Language::C,
        name: "c",
        extensions: &["c", "h"],
        grammar: || tree_sitter_c::LANGUAGE.into(),
        definitions_query: r#"
(function_definition
  declarator: (function_declarator declarator: (identifier) @name)) @definition
(function_definition
  declarator: (pointer_declarator
    declarator: (function_declarator declarator: (identifier) @name))) @definition
"#,
        calls_query: r#"
(call_expression function: (identifier) @call)
(call_expression function: (field_expression field: (field_identifier) @call))
"#,
        class_kinds: &[],
        function_kinds: &["function_definition"],
        method_kinds: &[],
        constructor_kinds: &[],
        constructor_names: &[],
        class_named_constructor: false,
        doc_style: DocStyle::Preceding { line_prefix: "///" },
        complexity_pattern: r"\b(?:if|for|while|switch|case)\b|&&|\|\|",
        elision: "{ ... }",
    },
    LanguageSpec {
        language: Language::Cpp,
        name: "cpp",
        extensions: &["cpp", "cc", "cxx", "hpp", "hh", "hxx"],
        grammar: || tree_sitter_cpp::LANGUAGE.into(),
        definitions_query: r#"
(function_definition
  declarator: (function_declarator declarator: (identifier) @name)) @definition
(function_definition
  declarator: (function_declarator declarator: (field_identifier) @name)) @definition
(function_definition
  declarator: (function_declarator
    declarator: (qualified_identifier name: (identifier) @name))) @definition
(class_specifier name: (type_identifier) @name) @definition
"#,
        calls_query: r#"
(call_expression function: (identifier) @call)
(call_expression function: (field_expression field: (field_identifier) @call))
(call_expression function: (qualified_identifier name: (identifier) @call))
"#,
        class_kinds: &["class_specifier"],
        function_kinds: &["function_definition"],
        method_kinds: &[],
        constructor_kinds: &[],
        constructor_names: &[],
        class_named_constructor: true,
        doc_style: DocStyle::Preceding { line_prefix: "///" },
        complexity_pattern: C_STYLE_COMPLEXITY,
        elision: "{ ... }",
    },
    LanguageSpec {
        language: Language::Rust,
        name: "rust",
        extensions: &["rs"],
        grammar: || tree_sitter_rust::LANGUAGE.into(),
        definitions_query: r#"
(function_item name: (identifier) @name) @definition
(impl_item type: (type_identifier) @name) @definition
(impl_item type: (generic_type type: (type_identifier) @name)) @definition
(trait_item name: (type_identifier) @name) @definition
"#,
        calls_query: r#"
(call_expression function: (identifier) @call)
(call_expression function: (field_expression field: (field_identifier) @call))
(call_expression function: (scoped_identifier name: (identifier) @call))
"#,
        class_kinds: &["impl_item", "trait_item"],
        function_kinds: &["function_item"],
        method_kinds: &[],
        constructor_kinds: &[],
        constructor_names: &["new"],
        class_named_constructor: false,
        doc_style: DocStyle::Preceding { line_prefix: "///" },
        complexity_pattern: r"\b(?:if|for|while|loop)\b|=>|&&|\|\|",
        elision: "{ ... }",
    },
];

impl Language {
    /// Detect the language from a file path's extension
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        let ext = path.as_ref().extension()?.to_str()?.to_lowercase();
        Self::from_extension(&ext)
    }

    pub fn from_extension(extension: &str) -> Option<Self> {
        let ext = extension.trim_start_matches('.').to_lowercase();
        LANGUAGES
            .iter()
            .find(|spec| spec.extensions.contains(&ext.as_str()))
            .map(|spec| spec.language)
    }

    pub fn spec(self) -> &'static LanguageSpec {
        // LANGUAGES is declared in enum order
        &LANGUAGES[self as usize]
    }

    pub fn as_str(self) -> &'static str {
        self.spec().name
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the parser can extract code units from this path
pub fn is_supported(path: impl AsRef<Path>) -> bool {
    Language::from_path(path).is_some()
}
