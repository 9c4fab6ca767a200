//! # Starlight Shared
//!
//! Common types used by both client and server.
//!
//! ## CRITICAL RULE
//!
//! This crate must NEVER depend on:
//! - world state (blocks, structure instances, network registries)
//! - the transport
//!
//! If you need either, put it in `starlight_world` or `starlight_networking`.

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod constants;
pub mod error;
pub mod math;
pub mod registry;
pub mod tag;

pub use constants::{DEFAULT_SYNC_QUEUE_CAPACITY, TICK_RATE, WORLD_MAX_Y, WORLD_MIN_Y};
pub use error::{TagError, TagResult};
pub use math::{BlockPos, WorldId};
pub use registry::{
    Constellation, ConstellationKind, Perk, Reference, ReferenceKind, ReferenceRegistry,
    ReferenceResolver, RegistryDefinition, TargetObject,
};
pub use tag::{Tag, TagCompound};
