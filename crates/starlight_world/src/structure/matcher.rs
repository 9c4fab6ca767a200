//! Bound matcher for one (anchor, pattern) pair.

use std::sync::Arc;

use starlight_shared::BlockPos;

use crate::block::{Block, BlockGrid, ChunkCoord};
use crate::error::{StructureError, StructureResult};
use crate::pattern::PatternBlockArray;

/// Pattern bound to an anchor with absolute positions precomputed.
///
/// Remembers the revision of every chunk the pattern touches. When none of
/// them moved since the last check the previous answer is returned without
/// reading any block.
#[derive(Debug)]
pub struct StructureMatcher {
    anchor: BlockPos,
    pattern: Arc<PatternBlockArray>,
    /// Absolute position and required block.
    required: Vec<(BlockPos, Block)>,
    /// Sorted, unique.
    chunks: Vec<ChunkCoord>,
    /// Parallel to `chunks`; only meaningful once `checked` is set.
    seen_revisions: Vec<u64>,
    checked: bool,
    last_result: bool,
    full_checks: u64,
}

impl StructureMatcher {
    /// Binds `pattern` to `anchor`.
    ///
    /// # Errors
    ///
    /// Returns error if the pattern is empty or reaches outside the world.
    pub fn new(anchor: BlockPos, pattern: Arc<PatternBlockArray>) -> StructureResult<Self> {
        if pattern.is_empty() {
            return Err(StructureError::EmptyPattern);
        }

        let mut required = Vec::with_capacity(pattern.len());
        for (offset, block) in pattern.iter() {
            let pos = anchor + offset;
            if !BlockGrid::in_bounds(pos) {
                return Err(StructureError::OutOfBounds(pos));
            }
            required.push((pos, block));
        }

        let mut chunks: Vec<ChunkCoord> = required
            .iter()
            .map(|(pos, _)| ChunkCoord::containing(*pos))
            .collect();
        chunks.sort_unstable();
        chunks.dedup();

        Ok(Self {
            anchor,
            pattern,
            required,
            seen_revisions: vec![0; chunks.len()],
            checked: false,
            chunks,
            last_result: false,
            full_checks: 0,
        })
    }

    /// Anchor position.
    #[must_use]
    pub const fn anchor(&self) -> BlockPos {
        self.anchor
    }

    /// Bound pattern.
    #[must_use]
    pub fn pattern(&self) -> &Arc<PatternBlockArray> {
        &self.pattern
    }

    /// Chunks the pattern touches.
    #[must_use]
    pub fn chunks(&self) -> &[ChunkCoord] {
        &self.chunks
    }

    /// How many times blocks were actually re-read.
    #[must_use]
    pub const fn full_checks(&self) -> u64 {
        self.full_checks
    }

    /// Does the pattern match right now? Does not allocate.
    pub fn matches(&mut self, grid: &BlockGrid) -> bool {
        let mut changed = !self.checked;
        for (coord, seen) in self.chunks.iter().zip(self.seen_revisions.iter_mut()) {
            let revision = grid.chunk_revision(*coord);
            if *seen != revision {
                *seen = revision;
                changed = true;
            }
        }
        if !changed {
            return self.last_result;
        }

        self.full_checks += 1;
        self.checked = true;
        self.last_result = self
            .required
            .iter()
            .all(|(pos, block)| grid.get_block(*pos) == *block);
        self.last_result
    }
}
