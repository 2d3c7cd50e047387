//! Unified diff helpers

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

static HUNK_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^@@ -\d+(?:,(\d+))? \+(\d+)(?:,(\d+))? @@").expect("valid hunk header regex")
});

static FILE_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^diff --git \S+ b/(.+)$").expect("valid file header regex"));

/// One file's section of a multi-file diff
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    /// Path on the `b/` (new) side
    pub path: String,
    /// The fragment, starting at its `diff --git` line
    pub diff: String,
}

/// One `@@` hunk mapped onto the new file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    pub new_start: usize,
    pub new_len: usize,
    /// New-file line numbers of `+` lines
    pub added: Vec<usize>,
}

/// Split a `git diff` covering many files into per-file fragments, in order
pub fn split_unified_diff(raw: &str) -> Vec<FileDiff> {
    let mut out = Vec::new();
    let mut current: Option<(String, Vec<&str>)> = None;

    for line in raw.lines() {
        if line.starts_with("diff --git") {
            if let Some((path, lines)) = current.take() {
                out.push(FileDiff {
                    path,
                    diff: lines.join("\n"),
                });
            }
            current = FILE_HEADER
                .captures(line)
                .map(|c| (c[1].to_string(), vec![line]));
        } else if let Some((_, lines)) = current.as_mut() {
            lines.push(line);
        }
    }

    if let Some((path, lines)) = current {
        out.push(FileDiff {
            path,
            diff: lines.join("\n"),
        });
    }
    out
}

/// An omitted `,len` in a hunk header means one line
fn hunk_len(m: Option<regex::Match<'_>>) -> usize {
    m.map_or(1, |m| m.as_str().parse().unwrap_or(1))
}

/// Walk the hunks of a single-file diff fragment.
///
/// Hunk bodies are delimited by the line counts in their headers, so body
/// lines that look like `+++`/`---` file headers are still read as content.
pub fn parse_hunks(diff: &str) -> Vec<Hunk> {
    let mut hunks: Vec<Hunk> = Vec::new();
    let mut cursor = 0;
    let (mut old_left, mut new_left) = (0usize, 0usize);

    for line in diff.lines() {
        if let Some(caps) = HUNK_HEADER.captures(line) {
            let new_start = caps[2].parse().unwrap_or(0);
            let new_len = hunk_len(caps.get(3));
            hunks.push(Hunk {
                new_start,
                new_len,
                added: Vec::new(),
            });
            cursor = new_start;
            old_left = hunk_len(caps.get(1));
            new_left = new_len;
            continue;
        }

        let Some(hunk) = hunks.last_mut() else {
            continue;
        };
        // Outside a body: file headers of the next section
        if old_left == 0 && new_left == 0 {
            continue;
        }
        if line.starts_with('\\') {
            continue;
        }
        if line.starts_with('+') {
            hunk.added.push(cursor);
            cursor += 1;
            new_left = new_left.saturating_sub(1);
        } else if line.starts_with('-') {
            old_left = old_left.saturating_sub(1);
        } else {
            cursor += 1;
            old_left = old_left.saturating_sub(1);
            new_left = new_left.saturating_sub(1);
        }
    }
    hunks
}

/// New-file line numbers of every added line. Deleted lines do not exist in
/// the new file and never appear.
pub fn changed_lines(diff: &str) -> BTreeSet<usize> {
    parse_hunks(diff)
        .into_iter()
        .flat_map(|h| h.added)
        .collect()
}

/// Collapse runs of more than `max_run` deleted lines to a
/// `... [N lines removed] ...` note framed by up to two lines from each end
/// of the run, so a diff shown to a reader stays compact
pub fn condense_deletions(diff: &str, max_run: usize) -> String {
    let edge = (max_run / 2).min(2);
    let flush = |out: &mut Vec<String>, run: &mut Vec<&str>| {
        if run.len() > max_run {
            out.extend(run[..edge].iter().map(|l| l.to_string()));
            out.push(format!("... [{} lines removed] ...", run.len()));
            out.extend(run[run.len() - edge..].iter().map(|l| l.to_string()));
        } else {
            out.extend(run.iter().map(|l| l.to_string()));
        }
        run.clear();
    };

    let mut out = Vec::new();
    let mut run = Vec::new();
    for line in diff.lines() {
        if line.starts_with("diff --git") || line.starts_with("index ") {
            continue;
        }
        if line.starts_with('-') && !line.starts_with("---") {
            run.push(line);
            continue;
        }
        flush(&mut out, &mut run);
        out.push(line.to_string());
    }
    flush(&mut out, &mut run);
    out.join("\n")
}
