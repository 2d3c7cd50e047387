//! Symbol relationships between indexed code units
//!
//! Maintains a directed call graph over symbol names so the context builder
//! can report who calls a changed function and what it depends on.

mod graph;

pub use graph::{SymbolContext, SymbolGraph};
