//! # World Errors

use starlight_shared::BlockPos;
use thiserror::Error;

/// Errors from world mutation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorldError {
    /// Position outside the world's vertical bounds.
    #[error("position {0} is outside the world")]
    OutOfBounds(BlockPos),

    /// A collector already sits at the position.
    #[error("position {0} is already occupied by a collector")]
    Occupied(BlockPos),

    /// No collector at the position.
    #[error("no collector at {0}")]
    NoCollector(BlockPos),
}

/// Errors building a structure matcher. Evaluation treats these as
/// "not matched" and retries on the next step.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StructureError {
    /// The pattern requires no blocks.
    #[error("pattern is empty")]
    EmptyPattern,

    /// A required block falls outside the world's vertical bounds.
    #[error("pattern block at {0} is outside the world")]
    OutOfBounds(BlockPos),
}

/// Result type for world operations.
pub type WorldResult<T> = Result<T, WorldError>;

/// Result type for structure matcher construction.
pub type StructureResult<T> = Result<T, StructureError>;
