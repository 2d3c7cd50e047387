use super::{CodeChunk, CodeUnit, TokenCounter, UnitKind};
use crate::config::ChunkingConfig;
use crate::types::ChunkMetadata;
use sha2::{Digest, Sha256};

/// Splits code units into token-bounded chunks.
///
/// Units within the ceiling and all classes become exactly one chunk. Larger
/// functions are split into overlapping token windows, each prefixed with the
/// unit's signature so no window is read without its header.
pub struct SmartChunker {
    counter: TokenCounter,
    config: ChunkingConfig,
}

/// Rough token cost of the `... [lines X-Y context] ...` marker line
const MARKER_TOKENS: usize = 16;

impl SmartChunker {
    pub fn new(counter: TokenCounter, config: ChunkingConfig) -> Self {
        Self { counter, config }
    }

    pub fn chunk_units(&self, units: &[CodeUnit]) -> Vec<CodeChunk> {
        units.iter().flat_map(|u| self.chunk_unit(u)).collect()
    }

    pub fn chunk_unit(&self, unit: &CodeUnit) -> Vec<CodeChunk> {
        let is_class = unit.kind == UnitKind::Class;
        if is_class || self.counter.count(&unit.content) <= self.config.max_chunk_tokens {
            return vec![make_chunk(unit, unit.content.clone(), 0, 1, is_class)];
        }

        let (signature, signature_lines, body) = self.split_signature(&unit.content);
        let signature_tokens = self.counter.count(&signature);

        let window = self
            .config
            .window_tokens
            .min(
                self.config
                    .max_chunk_tokens
                    .saturating_sub(signature_tokens + MARKER_TOKENS),
            )
            .max(1);
        let step = window.saturating_sub(self.config.overlap_tokens).max(1);

        if body.trim().is_empty() || self.counter.count(body) <= window {
            return vec![make_chunk(unit, unit.content.clone(), 0, 1, false)];
        }

        let body_first_line = unit.start_line + signature_lines;
        let mut search_from = 0;
        let mut contents = Vec::new();
        for piece in self.counter.windows(body, window, step) {
            let (first, last) = match body.get(search_from..).and_then(|rest| rest.find(&piece)) {
                Some(offset) => {
                    let at = search_from + offset;
                    search_from = at;
                    let first = body_first_line + body[..at].matches('\n').count();
                    (first, first + piece.trim_end().matches('\n').count())
                }
                None => (unit.start_line, unit.end_line),
            };
            contents.push(format!(
                "{signature}\n... [lines {first}-{last} context] ...\n{piece}"
            ));
        }

        let total = contents.len();
        tracing::debug!(
            "Split {} ({} lines) into {} chunks",
            unit.name,
            unit.end_line - unit.start_line + 1,
            total
        );
        contents
            .into_iter()
            .enumerate()
            .map(|(i, content)| make_chunk(unit, content, i, total, false))
            .collect()
    }

    /// Leading lines up to the signature token cap, stopping after the first
    /// line that opens the body. Returns the signature, how many whole lines
    /// it spans, and the remaining body text.
    fn split_signature<'a>(&self, content: &'a str) -> (String, usize, &'a str) {
        let mut end = 0;
        let mut lines = 0;

        for line in content.split_inclusive('\n') {
            let candidate = &content[..end + line.len()];
            if self.counter.count(candidate.trim_end()) > self.config.signature_tokens {
                break;
            }
            end += line.len();
            lines += 1;
            let trimmed = line.trim_end();
            if trimmed.ends_with(':') || trimmed.ends_with('{') {
                break;
            }
        }

        if lines == 0 {
            // First line alone exceeds the cap: cut it mid-line
            let first_line = content.lines().next().unwrap_or_default();
            let signature = self
                .counter
                .truncate(first_line, self.config.signature_tokens);
            let body = content.strip_prefix(signature.as_str()).unwrap_or(content);
            return (signature, 0, body);
        }

        (content[..end].trim_end().to_string(), lines, &content[end..])
    }
}

fn make_chunk(unit: &CodeUnit, content: String, index: usize, total: usize, is_skeleton: bool) -> CodeChunk {
    let digest = format!("{:x}", Sha256::digest(content.as_bytes()));
    CodeChunk {
        id: format!("{}-{}-{}", unit.name, index, &digest[..8]),
        metadata: ChunkMetadata {
            kind: unit.kind,
            symbol_name: unit.name.clone(),
            file_path: unit.filepath.clone(),
            language: unit.language.as_str().to_string(),
            start_line: unit.start_line,
            end_line: unit.end_line,
            docstring: unit.docstring.clone(),
            chunk_index: index,
            total_chunks: total,
            is_skeleton,
        },
        content,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::Language;
    use std::collections::BTreeSet;

    fn chunker(config: ChunkingConfig) -> SmartChunker {
        SmartChunker::new(TokenCounter::new().unwrap(), config)
    }

    fn small_config() -> ChunkingConfig {
        ChunkingConfig {
            max_chunk_tokens: 120,
            signature_tokens: 30,
            window_tokens: 60,
            overlap_tokens: 15,
        }
    }

    fn unit(kind: UnitKind, name: &str, content: String) -> CodeUnit {
        let lines = content.lines().count().max(1);
        CodeUnit {
            kind,
            name: name.to_string(),
            start_line: 10,
            end_line: 10 + lines - 1,
            byte_range: 0..content.len(),
            content,
            docstring: String::new(),
            complexity: 1,
            calls: BTreeSet::new(),
            language: Language::Python,
            filepath: "pkg/module.py".to_string(),
        }
    }

    fn long_function() -> String {
        let mut src = String::from("def process_records(records, limit):\n");
        for i in 0..120 {
            src.push_str(&format!("    total_{i} = compute(records[{i}], limit) + {i}\n"));
        }
        src.push_str("    return total_0\n");
        src
    }

    #[test]
    fn test_small_unit_single_chunk() {
        let c = chunker(ChunkingConfig::default());
        let u = unit(
            UnitKind::Function,
            "add",
            "def add(a, b):\n    return a + b".to_string(),
        );
        let chunks = c.chunk_unit(&u);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, u.content);
        assert_eq!(chunks[0].metadata.total_chunks, 1);
        assert!(!chunks[0].metadata.is_skeleton);
        assert!(chunks[0].id.starts_with("add-0-"));
        assert_eq!(chunks[0].id.len(), "add-0-".len() + 8);
    }

    #[test]
    fn test_chunk_ids_are_deterministic() {
        let c = chunker(small_config());
        let u = unit(UnitKind::Function, "process_records", long_function());
        let first: Vec<String> = c.chunk_unit(&u).into_iter().map(|c| c.id).collect();
        let second: Vec<String> = c.chunk_unit(&u).into_iter().map(|c| c.id).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_large_unit_is_signature_anchored() {
        let config = small_config();
        let c = chunker(config);
        let counter = TokenCounter::new().unwrap();
        let u = unit(UnitKind::Function, "process_records", long_function());

        let chunks = c.chunk_unit(&u);
        assert!(chunks.len() > 1);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.metadata.chunk_index, i);
            assert_eq!(chunk.metadata.total_chunks, chunks.len());
            assert!(chunk.content.starts_with("def process_records(records, limit):\n... [lines "));
            assert!(chunk.content.contains("process_records"));
            assert!(counter.count(&chunk.content) <= config.max_chunk_tokens);
            assert_eq!(chunk.metadata.start_line, u.start_line);
            assert_eq!(chunk.metadata.end_line, u.end_line);
        }

        let ids: BTreeSet<&str> = chunks.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids.len(), chunks.len());
    }

    #[test]
    fn test_windows_report_body_line_ranges() {
        let c = chunker(small_config());
        let u = unit(UnitKind::Function, "process_records", long_function());
        let chunks = c.chunk_unit(&u);

        // Body starts on the line after the signature
        assert!(chunks[0].content.contains("[lines 11-"));
        let last = chunks.last().unwrap();
        assert!(last.content.contains(&format!("-{} context]", u.end_line)));
    }

    #[test]
    fn test_class_is_never_split() {
        let mut src = String::from("class Huge:\n");
        for i in 0..200 {
            src.push_str(&format!("    def method_{i}(self): ...\n"));
        }
        let c = chunker(small_config());
        let chunks = c.chunk_unit(&unit(UnitKind::Class, "Huge", src.clone()));
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].metadata.is_skeleton);
        assert_eq!(chunks[0].content, src);
    }

    #[test]
    fn test_oversized_first_line_still_chunks() {
        let mut line = String::from("def f(): return [");
        for i in 0..200 {
            line.push_str(&format!("{i}, "));
        }
        line.push(']');
        let c = chunker(small_config());
        let chunks = c.chunk_unit(&unit(UnitKind::Function, "f", line));
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| !c.content.trim().is_empty()));
        assert!(chunks.iter().all(|c| c.content.starts_with("def f()")));
    }

    #[test]
    fn test_chunk_units_preserves_order() {
        let c = chunker(ChunkingConfig::default());
        let units = vec![
            unit(UnitKind::Function, "a", "def a():\n    pass".to_string()),
            unit(UnitKind::Function, "b", "def b():\n    pass".to_string()),
        ];
        let names: Vec<String> = c
            .chunk_units(&units)
            .into_iter()
            .map(|c| c.metadata.symbol_name)
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
