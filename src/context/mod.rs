//! Review context assembly
//!
//! Maps a file's diff onto its parsed units and combines graph impact, the
//! changed code and similar indexed code into one token-bounded block.

mod builder;
pub mod diff;

pub use builder::{ContextBuilder, OMITTED_MARKER};
pub use diff::{FileDiff, changed_lines, split_unified_diff};
