//! # Structure Matching
//!
//! Answers "does the required pattern stand around this instance right
//! now?" every step without rebuilding anything, and reports only the
//! steps where the answer flips.
//!
//! ```text
//!   UNINITIALIZED ──first result──> MATCHED ⇄ UNMATCHED
//! ```

mod cache;
mod matcher;

pub use cache::{EdgeTrigger, MatchState, StructureMatchCache};
pub use matcher::StructureMatcher;
