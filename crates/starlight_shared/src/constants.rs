//! # Shared Constants
//!
//! Values both sides must agree on.
//!
//! **CRITICAL:** The wire constants are baked into deployed clients.
//! Changing them breaks compatibility with every client already in the field.

// =============================================================================
// SIMULATION
// =============================================================================

/// Simulation steps per second.
pub const TICK_RATE: u32 = 20;

/// Lowest valid block Y coordinate.
pub const WORLD_MIN_Y: i32 = 0;

/// Highest valid block Y coordinate (inclusive).
pub const WORLD_MAX_Y: i32 = 255;

// =============================================================================
// SYNCHRONIZATION
// =============================================================================

/// Default capacity of the receive -> simulation hand-off queue.
pub const DEFAULT_SYNC_QUEUE_CAPACITY: usize = 256;

/// Count written in place of a collection that was not transmitted.
pub const ABSENT_COUNT: i32 = -1;

/// Marker byte written before an optional value that is present.
pub const PRESENT_MARKER: i8 = 1;

/// Marker byte written before an optional value that is absent.
pub const ABSENT_MARKER: i8 = -1;

// =============================================================================
// TAG STORAGE
// =============================================================================

/// Maximum nesting depth accepted when decoding a tag blob.
pub const MAX_TAG_DEPTH: usize = 512;
