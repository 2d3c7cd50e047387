use super::diff::parse_hunks;
use crate::config::ContextConfig;
use crate::error::ReviewContextError;
use crate::indexer::{CodeParser, CodeUnit, TokenCounter};
use crate::relations::SymbolGraph;
use crate::types::{ReviewContext, SearchHit};
use crate::vector_index::VectorIndex;
use anyhow::Context;
use futures::future::join_all;
use std::collections::{BTreeSet, HashSet};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;

pub const OMITTED_MARKER: &str = "[...omitted due to token limit...]";

/// Remaining budget below which a partial entry is not worth emitting
const MIN_PARTIAL_TOKENS: usize = 32;

/// Assembles the review context for one changed file.
///
/// Tiers go in priority order (impact, changed code, similar examples) so the
/// token budget always cuts the least valuable material first.
pub struct ContextBuilder {
    parser: Arc<CodeParser>,
    counter: TokenCounter,
    graph: Arc<RwLock<SymbolGraph>>,
    index: Arc<VectorIndex>,
    config: ContextConfig,
}

/// Accumulates text against a token ceiling. Room for the omission marker
/// is always held back, so the finished text never exceeds `limit`.
struct BudgetedText<'a> {
    counter: &'a TokenCounter,
    limit: usize,
    /// Cost of the marker block appended on exhaustion
    reserve: usize,
    text: String,
    exhausted: bool,
}

fn marker_block() -> String {
    format!("\n{OMITTED_MARKER}\n")
}

impl<'a> BudgetedText<'a> {
    fn new(counter: &'a TokenCounter, limit: usize) -> Self {
        Self {
            counter,
            limit,
            reserve: counter.count(&marker_block()),
            text: String::new(),
            exhausted: false,
        }
    }

    /// Tokens still available for content
    fn remaining(&self) -> usize {
        self.limit
            .saturating_sub(self.reserve)
            .saturating_sub(self.counter.count(&self.text))
    }

    fn fits(&self, piece: &str) -> bool {
        let candidate = format!("{}{}", self.text, piece);
        self.counter.count(&candidate) + self.reserve <= self.limit
    }

    /// Append `piece` whole if it fits. Otherwise mark the budget exhausted.
    fn push(&mut self, piece: &str) -> bool {
        if self.exhausted {
            return false;
        }
        if !self.fits(piece) {
            self.exhaust();
            return false;
        }
        self.text.push_str(piece);
        true
    }

    /// Append `piece`, cutting it to the remaining budget if needed
    fn push_truncating(&mut self, piece: &str) {
        if self.exhausted {
            return;
        }
        if self.fits(piece) {
            self.text.push_str(piece);
            return;
        }
        let room = self.remaining();
        if room >= MIN_PARTIAL_TOKENS {
            let partial = self.counter.truncate(piece, room);
            self.text.push_str(&partial);
        }
        self.exhaust();
    }

    fn exhaust(&mut self) {
        if self.exhausted {
            return;
        }
        self.exhausted = true;
        // Token boundaries can shift where pieces meet
        let keep = self.limit.saturating_sub(self.reserve);
        if self.counter.count(&self.text) > keep {
            self.text = self.counter.truncate(&self.text, keep);
        }
        self.text.push_str(&marker_block());
    }
}

impl ContextBuilder {
    pub fn new(
        parser: Arc<CodeParser>,
        counter: TokenCounter,
        graph: Arc<RwLock<SymbolGraph>>,
        index: Arc<VectorIndex>,
        config: ContextConfig,
    ) -> Self {
        Self {
            parser,
            counter,
            graph,
            index,
            config,
        }
    }

    /// Build the context for `filepath` given its full new content and its
    /// unified diff fragment.
    ///
    /// A diff with no hunks treats every unit in the file as changed. A hunk
    /// that only deletes lines marks the unit at its position in the new file.
    pub async fn build(
        &self,
        filepath: &str,
        content: &str,
        diff: &str,
    ) -> Result<ReviewContext, ReviewContextError> {
        let parser = Arc::clone(&self.parser);
        let (owned_content, owned_path) = (content.to_string(), filepath.to_string());
        let units = tokio::task::spawn_blocking(move || parser.parse(&owned_content, &owned_path))
            .await
            .context("Parse task panicked")?;

        let changed = select_changed(&units, diff);
        tracing::debug!(
            "{} of {} units in {} overlap the diff",
            changed.len(),
            units.len(),
            filepath
        );

        // Overlay the file's current units on a snapshot of the indexed graph
        let graph = {
            let mut snapshot = self.graph.read().await.clone();
            snapshot.build(&units);
            snapshot
        };

        let impact: Vec<String> = changed
            .iter()
            .filter_map(|unit| impact_entry(&graph, unit))
            .collect();
        let code: Vec<String> = changed
            .iter()
            .map(|unit| format!("--- {} ---\n{}\n", unit.name, unit.content))
            .collect();
        let similar = self.similar_entries(&changed).await;

        let mut out = BudgetedText::new(&self.counter, self.config.token_budget);
        out.push("## Context Analysis\n\n");

        if !impact.is_empty() {
            out.push("### 1. Impact Analysis (Dependencies)\n");
            for entry in &impact {
                out.push_truncating(entry);
            }
            out.push("\n");
        }

        if !code.is_empty() {
            out.push("### 2. Changed Code Context\n");
            for entry in &code {
                out.push_truncating(entry);
                out.push("\n");
            }
        }

        if !similar.is_empty() && !out.exhausted {
            out.push("### 3. Related Code Examples\n");
            for entry in &similar {
                if !out.push(entry) {
                    break;
                }
                out.push("\n");
            }
        }

        let tokens = self.counter.count(&out.text);
        tracing::info!(
            "Built context for {} ({} changed units, {} tokens)",
            filepath,
            changed.len(),
            tokens
        );

        Ok(ReviewContext {
            text: out.text,
            changed_symbols: changed.iter().map(|u| u.name.clone()).collect(),
            tokens,
        })
    }

    /// Nearest chunks per changed unit, searched concurrently and returned in
    /// source order, without the unit itself and without repeats
    async fn similar_entries(&self, changed: &[&CodeUnit]) -> Vec<String> {
        let k = self.config.similar_per_unit;
        if k == 0 {
            return Vec::new();
        }

        let searches = changed.iter().map(|unit| {
            let query = format!("{} {}", unit.name, unit.docstring);
            async move { self.index.search(query.trim(), k + 1).await }
        });
        let results = join_all(searches).await;

        let mut seen = HashSet::new();
        let mut entries = Vec::new();
        for (unit, result) in changed.iter().zip(results) {
            let hits = match result {
                Ok(hits) => hits,
                Err(e) => {
                    tracing::warn!("Similarity search for {} failed: {}", unit.name, e);
                    continue;
                }
            };
            let kept = hits
                .into_iter()
                .filter(|hit| !is_same_unit(hit, unit))
                .take(k);
            for hit in kept {
                if seen.insert((hit.file_path.clone(), hit.chunk_id.clone())) {
                    entries.push(format!(
                        "Example: {} ({}:{}, score {:.2})\n{}\n",
                        hit.symbol_name, hit.file_path, hit.start_line, hit.score, hit.content
                    ));
                }
            }
        }
        entries
    }
}

fn select_changed<'u>(units: &'u [CodeUnit], diff: &str) -> Vec<&'u CodeUnit> {
    let hunks = parse_hunks(diff);
    if hunks.is_empty() {
        return units.iter().collect();
    }

    let lines: BTreeSet<usize> = hunks
        .iter()
        .flat_map(|h| {
            if h.added.is_empty() {
                vec![h.new_start.max(1)]
            } else {
                h.added.clone()
            }
        })
        .collect();

    units.iter().filter(|u| u.overlaps_any(lines.iter())).collect()
}

fn impact_entry(graph: &SymbolGraph, unit: &CodeUnit) -> Option<String> {
    let ctx = graph.context(&unit.name);
    if ctx.is_empty() {
        return None;
    }
    let mut entry = format!("Symbol: {} ({})\n", unit.name, unit.kind);
    if !ctx.callers.is_empty() {
        let callers: Vec<&str> = ctx.callers.iter().map(String::as_str).collect();
        entry.push_str(&format!("  - Called By: {}\n", callers.join(", ")));
    }
    if !ctx.callees.is_empty() {
        let callees: Vec<&str> = ctx.callees.iter().map(String::as_str).collect();
        entry.push_str(&format!("  - Calls: {}\n", callees.join(", ")));
    }
    Some(entry)
}

/// Stored paths may be absolute while the diff path is repository-relative
fn is_same_unit(hit: &SearchHit, unit: &CodeUnit) -> bool {
    hit.symbol_name == unit.name
        && (hit.file_path == unit.filepath || Path::new(&hit.file_path).ends_with(&unit.filepath))
}
