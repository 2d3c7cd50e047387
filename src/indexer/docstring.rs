//! Leading documentation extraction

use super::dedent;
use super::language::DocStyle;
use tree_sitter::Node;

pub(crate) fn extract(style: DocStyle, node: Node, source: &str) -> String {
    match style {
        DocStyle::BodyString => body_string(node, source),
        DocStyle::Preceding { line_prefix } => preceding_comment(source, node.start_byte(), line_prefix),
    }
}

/// A string literal as the first statement of the definition's body
fn body_string(node: Node, source: &str) -> String {
    let Some(body) = node.child_by_field_name("body") else {
        return String::new();
    };
    let Some(first) = body.named_child(0) else {
        return String::new();
    };
    if first.kind() != "expression_statement" {
        return String::new();
    }
    match first.named_child(0) {
        Some(expr) if expr.kind() == "string" => {
            let raw = source.get(expr.byte_range()).unwrap_or_default();
            dedent(strip_string_quotes(raw)).trim().to_string()
        }
        _ => String::new(),
    }
}

fn strip_string_quotes(raw: &str) -> &str {
    let raw = raw.trim_start_matches(['r', 'R', 'u', 'U', 'b', 'B', 'f', 'F']);
    for quote in ["\"\"\"", "'''", "\"", "'"] {
        if let Some(inner) = raw
            .strip_prefix(quote)
            .and_then(|s| s.strip_suffix(quote))
        {
            return inner;
        }
    }
    raw
}

/// A `/** ... */` block or a run of `line_prefix` comments on the lines
/// directly above `start_byte`. Attribute and decorator lines in between are
/// skipped; a blank line ends the search.
pub(crate) fn preceding_comment(source: &str, start_byte: usize, line_prefix: &str) -> String {
    let line_start = source
        .get(..start_byte)
        .and_then(|s| s.rfind('\n'))
        .map_or(0, |i| i + 1);
    let mut lines: Vec<&str> = source[..line_start].lines().map(str::trim).collect();

    while lines
        .last()
        .is_some_and(|l| l.starts_with("#[") || l.starts_with('@'))
    {
        lines.pop();
    }

    let Some(last) = lines.last() else {
        return String::new();
    };

    if last.ends_with("*/") {
        let Some(open) = lines.iter().rposition(|l| l.starts_with("/*")) else {
            return String::new();
        };
        if !lines[open].starts_with("/**") {
            return String::new();
        }
        return lines[open..]
            .iter()
            .map(|l| {
                l.trim_start_matches("/**")
                    .trim_end_matches("*/")
                    .trim_start_matches('*')
                    .trim()
            })
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join("\n");
    }

    let run: Vec<&str> = lines
        .iter()
        .rev()
        .take_while(|l| l.starts_with(line_prefix))
        .map(|l| l.trim_start_matches('/').trim())
        .collect();

    run.into_iter().rev().collect::<Vec<_>>().join("\n").trim().to_string()
}
