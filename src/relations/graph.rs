use crate::indexer::CodeUnit;
use petgraph::Direction;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet};

/// One symbol name, tagged with every file that currently defines it
#[derive(Debug, Clone)]
struct SymbolNode {
    name: String,
    files: BTreeSet<String>,
}

/// Neighborhood of a symbol in the call graph
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SymbolContext {
    /// Symbols that call this one
    pub callers: BTreeSet<String>,
    /// Symbols this one calls
    pub callees: BTreeSet<String>,
}

impl SymbolContext {
    pub fn is_empty(&self) -> bool {
        self.callers.is_empty() && self.callees.is_empty()
    }
}

/// Directed caller -> callee graph over indexed symbol names.
///
/// Nodes and edges remember which files contributed them, so removing a file
/// only drops what that file introduced. Anonymous units are not graphed.
#[derive(Debug, Clone, Default)]
pub struct SymbolGraph {
    graph: StableDiGraph<SymbolNode, BTreeSet<String>>,
    index: HashMap<String, NodeIndex>,
}

impl SymbolGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace everything known about the files represented in `units`.
    /// Edges are drawn only to callees defined within `units` itself.
    pub fn build(&mut self, units: &[CodeUnit]) {
        let files: BTreeSet<&str> = units.iter().map(|u| u.filepath.as_str()).collect();
        for file in &files {
            self.remove_file(file);
        }

        let named: Vec<&CodeUnit> = units.iter().filter(|u| !u.is_anonymous()).collect();
        let available: HashSet<&str> = named.iter().map(|u| u.name.as_str()).collect();

        for unit in &named {
            let idx = self.ensure_node(&unit.name);
            self.graph[idx].files.insert(unit.filepath.clone());
        }

        for unit in &named {
            let caller = self.index[&unit.name];
            for call in &unit.calls {
                if call == &unit.name || !available.contains(call.as_str()) {
                    continue;
                }
                let callee = self.index[call];
                match self.graph.find_edge(caller, callee) {
                    Some(edge) => {
                        self.graph[edge].insert(unit.filepath.clone());
                    }
                    None => {
                        self.graph
                            .add_edge(caller, callee, BTreeSet::from([unit.filepath.clone()]));
                    }
                }
            }
        }

        tracing::debug!(
            "Symbol graph now has {} nodes and {} edges after building {} units",
            self.graph.node_count(),
            self.graph.edge_count(),
            named.len()
        );
    }

    /// Callers and callees of `name`; both empty for unknown symbols
    pub fn context(&self, name: &str) -> SymbolContext {
        let Some(&idx) = self.index.get(name) else {
            return SymbolContext::default();
        };
        let neighbors = |dir| {
            self.graph
                .neighbors_directed(idx, dir)
                .map(|n| self.graph[n].name.clone())
                .collect()
        };
        SymbolContext {
            callers: neighbors(Direction::Incoming),
            callees: neighbors(Direction::Outgoing),
        }
    }

    /// Drop every node and edge contributed by `path`. Nodes still defined in
    /// another file survive with that file's tag.
    pub fn remove_file(&mut self, path: &str) {
        let edges: Vec<_> = self
            .graph
            .edge_indices()
            .filter(|&e| self.graph[e].contains(path))
            .collect();
        for edge in edges {
            let files = &mut self.graph[edge];
            files.remove(path);
            if files.is_empty() {
                self.graph.remove_edge(edge);
            }
        }

        let nodes: Vec<_> = self
            .graph
            .node_indices()
            .filter(|&n| self.graph[n].files.contains(path))
            .collect();
        for node in nodes {
            let files = &mut self.graph[node].files;
            files.remove(path);
            if files.is_empty()
                && let Some(removed) = self.graph.remove_node(node)
            {
                self.index.remove(&removed.name);
            }
        }
    }

    /// True when any node was contributed by `path`
    pub fn has_file(&self, path: &str) -> bool {
        self.graph
            .node_weights()
            .any(|node| node.files.contains(path))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    fn ensure_node(&mut self, name: &str) -> NodeIndex {
        if let Some(&idx) = self.index.get(name) {
            return idx;
        }
        let idx = self.graph.add_node(SymbolNode {
            name: name.to_string(),
            files: BTreeSet::new(),
        });
        self.index.insert(name.to_string(), idx);
        idx
    }
}
