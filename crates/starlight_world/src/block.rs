//! # Block Storage
//!
//! World blocks are organized into fixed-size chunks. Every chunk carries a
//! revision counter that is bumped whenever one of its blocks actually
//! changes, so structure matchers can skip re-reading chunks that did not
//! change since their last evaluation.
//!
//! ## Chunk Format
//!
//! Chunks are 16x16 columns spanning the full world height. Each block is
//! a `Block { id, meta }` pair. Chunks that were never written read as air
//! and report revision 0.

use std::collections::HashMap;

use starlight_shared::{BlockPos, WORLD_MAX_Y, WORLD_MIN_Y};

use crate::error::{WorldError, WorldResult};

/// Chunk width/depth in blocks.
pub const CHUNK_SIZE: usize = 16;

/// Chunk height in blocks.
#[allow(clippy::cast_sign_loss)]
pub const CHUNK_HEIGHT: usize = (WORLD_MAX_Y - WORLD_MIN_Y + 1) as usize;

/// Total blocks per chunk.
pub const BLOCKS_PER_CHUNK: usize = CHUNK_SIZE * CHUNK_SIZE * CHUNK_HEIGHT;

/// Chunk coordinate (identifies a chunk in the world grid).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChunkCoord {
    /// X coordinate (in chunks, not blocks).
    pub x: i32,
    /// Z coordinate (in chunks, not blocks).
    pub z: i32,
}

impl ChunkCoord {
    /// Creates a new chunk coordinate.
    #[inline]
    #[must_use]
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// The chunk containing a block.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub const fn containing(pos: BlockPos) -> Self {
        Self {
            x: pos.x.div_euclid(CHUNK_SIZE as i32),
            z: pos.z.div_euclid(CHUNK_SIZE as i32),
        }
    }
}

/// A single block in the world.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Block {
    /// Block type ID.
    pub id: u16,
    /// Block metadata (variant, rotation).
    pub meta: u16,
}

impl Block {
    /// Air block (empty).
    pub const AIR: Self = Self::new(0);
    /// Plain stone.
    pub const STONE: Self = Self::new(1);
    /// Raw marble.
    pub const MARBLE_RAW: Self = Self::with_meta(20, 0);
    /// Chiseled marble.
    pub const MARBLE_CHISELED: Self = Self::with_meta(20, 1);
    /// Runed marble.
    pub const MARBLE_RUNED: Self = Self::with_meta(20, 2);
    /// Marble pillar.
    pub const MARBLE_PILLAR: Self = Self::with_meta(20, 3);
    /// Starmetal block.
    pub const STARMETAL: Self = Self::new(21);
    /// Rock collector crystal.
    pub const ROCK_COLLECTOR: Self = Self::with_meta(30, 0);
    /// Celestial collector crystal.
    pub const CELESTIAL_COLLECTOR: Self = Self::with_meta(30, 1);

    /// Creates a new block with given ID.
    #[inline]
    #[must_use]
    pub const fn new(id: u16) -> Self {
        Self { id, meta: 0 }
    }

    /// Creates a block with ID and metadata.
    #[inline]
    #[must_use]
    pub const fn with_meta(id: u16, meta: u16) -> Self {
        Self { id, meta }
    }

    /// Returns true if this is an air block.
    #[inline]
    #[must_use]
    pub const fn is_air(self) -> bool {
        self.id == 0
    }
}

/// A chunk of world data.
#[derive(Clone)]
pub struct Chunk {
    /// Chunk position in the world.
    pub coord: ChunkCoord,
    /// Block data (indexed as [y][z][x]).
    blocks: Box<[Block]>,
    /// Bumped on every effective block change.
    revision: u64,
}

impl Chunk {
    /// Creates an all-air chunk.
    #[must_use]
    pub fn new(coord: ChunkCoord) -> Self {
        Self {
            coord,
            blocks: vec![Block::AIR; BLOCKS_PER_CHUNK].into_boxed_slice(),
            revision: 0,
        }
    }

    #[inline]
    #[allow(clippy::cast_sign_loss)]
    fn index(pos: BlockPos) -> usize {
        let x = pos.x.rem_euclid(CHUNK_SIZE as i32) as usize;
        let z = pos.z.rem_euclid(CHUNK_SIZE as i32) as usize;
        let y = (pos.y - WORLD_MIN_Y) as usize;
        (y * CHUNK_SIZE + z) * CHUNK_SIZE + x
    }

    /// Block at a world position inside this chunk.
    #[inline]
    #[must_use]
    pub fn get_block(&self, pos: BlockPos) -> Block {
        self.blocks[Self::index(pos)]
    }

    /// Sets a block, returning the previous one. The revision only moves
    /// when the block actually changes.
    pub fn set_block(&mut self, pos: BlockPos, block: Block) -> Block {
        let slot = &mut self.blocks[Self::index(pos)];
        let previous = *slot;
        if previous != block {
            *slot = block;
            self.revision += 1;
        }
        previous
    }

    /// Change counter.
    #[inline]
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }
}

/// All loaded chunks of one world.
#[derive(Default)]
pub struct BlockGrid {
    chunks: HashMap<ChunkCoord, Chunk>,
}

impl BlockGrid {
    /// Creates an empty grid.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True if `y` is inside the world's vertical bounds.
    #[inline]
    #[must_use]
    pub const fn in_bounds(pos: BlockPos) -> bool {
        pos.y >= WORLD_MIN_Y && pos.y <= WORLD_MAX_Y
    }

    /// Block at `pos`. Unloaded chunks and positions outside the vertical
    /// bounds read as air.
    #[must_use]
    pub fn get_block(&self, pos: BlockPos) -> Block {
        if !Self::in_bounds(pos) {
            return Block::AIR;
        }
        self.chunks
            .get(&ChunkCoord::containing(pos))
            .map_or(Block::AIR, |chunk| chunk.get_block(pos))
    }

    /// Sets a block, loading its chunk if needed. Returns the previous
    /// block.
    ///
    /// # Errors
    ///
    /// Returns error if `pos` is outside the vertical bounds.
    pub fn set_block(&mut self, pos: BlockPos, block: Block) -> WorldResult<Block> {
        if !Self::in_bounds(pos) {
            return Err(WorldError::OutOfBounds(pos));
        }
        let coord = ChunkCoord::containing(pos);
        let chunk = self.chunks.entry(coord).or_insert_with(|| Chunk::new(coord));
        Ok(chunk.set_block(pos, block))
    }

    /// Revision of a chunk; 0 if it was never written.
    #[must_use]
    pub fn chunk_revision(&self, coord: ChunkCoord) -> u64 {
        self.chunks.get(&coord).map_or(0, Chunk::revision)
    }

    /// True if no non-air block sits above `pos` in its column.
    #[must_use]
    pub fn can_see_sky(&self, pos: BlockPos) -> bool {
        let Some(chunk) = self.chunks.get(&ChunkCoord::containing(pos)) else {
            return true;
        };
        let start = pos.y.max(WORLD_MIN_Y - 1) + 1;
        (start..=WORLD_MAX_Y).all(|y| chunk.get_block(BlockPos::new(pos.x, y, pos.z)).is_air())
    }

    /// Number of loaded chunks.
    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }
}
