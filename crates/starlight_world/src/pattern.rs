//! Multiblock patterns: required blocks at offsets from an anchor.

use std::collections::BTreeMap;

use starlight_shared::BlockPos;

use crate::block::{Block, BlockGrid};

/// Immutable set of `offset -> required block` entries.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PatternBlockArray {
    blocks: BTreeMap<BlockPos, Block>,
}

impl PatternBlockArray {
    /// Creates an empty pattern.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requires `block` at `offset` from the anchor. Later entries for the
    /// same offset replace earlier ones.
    #[must_use]
    pub fn with_block(mut self, offset: BlockPos, block: Block) -> Self {
        self.blocks.insert(offset, block);
        self
    }

    /// Adds a requirement in place.
    pub fn add_block(&mut self, offset: BlockPos, block: Block) {
        self.blocks.insert(offset, block);
    }

    /// Number of required blocks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// True if nothing is required.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Requirements in offset order.
    pub fn iter(&self) -> impl Iterator<Item = (BlockPos, Block)> + '_ {
        self.blocks.iter().map(|(offset, block)| (*offset, *block))
    }

    /// Checks every requirement against the grid. No caching.
    #[must_use]
    pub fn matches(&self, grid: &BlockGrid, anchor: BlockPos) -> bool {
        self.iter()
            .all(|(offset, block)| grid.get_block(anchor + offset) == block)
    }

    /// The platform a celestial collector needs to become enhanced.
    ///
    /// ```text
    ///   y-1 (viewed from above)      y-2
    ///   P  C  P                      .  .  .
    ///   C  R  C                      .  S  .
    ///   P  C  P                      .  .  .
    /// ```
    ///
    /// `R` runed marble, `C` chiseled marble, `P` marble pillar,
    /// `S` starmetal.
    #[must_use]
    pub fn collector_enhancement() -> Self {
        let mut pattern = Self::new()
            .with_block(BlockPos::new(0, -1, 0), Block::MARBLE_RUNED)
            .with_block(BlockPos::new(0, -2, 0), Block::STARMETAL);
        for (dx, dz) in [(1, 0), (-1, 0), (0, 1), (0, -1)] {
            pattern.add_block(BlockPos::new(dx, -1, dz), Block::MARBLE_CHISELED);
        }
        for (dx, dz) in [(1, 1), (1, -1), (-1, 1), (-1, -1)] {
            pattern.add_block(BlockPos::new(dx, -1, dz), Block::MARBLE_PILLAR);
        }
        pattern
    }

    /// Places every required block around `anchor`. Test and demo helper.
    ///
    /// # Errors
    ///
    /// Returns error if a block would land outside the world.
    pub fn build(&self, grid: &mut BlockGrid, anchor: BlockPos) -> crate::WorldResult<()> {
        for (offset, block) in self.iter() {
            grid.set_block(anchor + offset, block)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enhancement_pattern_shape() {
        let pattern = PatternBlockArray::collector_enhancement();
        assert_eq!(pattern.len(), 10);
        assert!(pattern.iter().all(|(offset, _)| offset.y < 0));
    }

    #[test]
    fn test_matches_after_build() {
        let pattern = PatternBlockArray::collector_enhancement();
        let mut grid = BlockGrid::new();
        let anchor = BlockPos::new(8, 70, -8);
        assert!(!pattern.matches(&grid, anchor));

        pattern.build(&mut grid, anchor).unwrap();
        assert!(pattern.matches(&grid, anchor));

        grid.set_block(anchor.offset(1, -1, 1), Block::MARBLE_RAW).unwrap();
        assert!(!pattern.matches(&grid, anchor));
    }
}
