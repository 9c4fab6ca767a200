//! # Starlight World
//!
//! Collectors, the structures that enhance them, and the per-world
//! transmission network they feed.
//!
//! ## Step Flow
//!
//! ```text
//!   StarlightWorld::step
//!     |
//!     |-- CollectorCrystal::update
//!     |     '-- StructureMatchCache::poll_transition  (edge only)
//!     |
//!     |-- NetworkMembershipController::on_structure_transition
//!     |     |-- source.enhanced = matched
//!     |     '-- registry dirty, collector replicated
//!     |
//!     '-- WorldNetworkRegistry::publish  ──>  NetworkView (readers)
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use starlight_world::{NetworkRegistries, StarlightWorld, WorldConfig};
//!
//! let mut networks = NetworkRegistries::new();
//! let mut world = StarlightWorld::new(WorldId(0), WorldConfig::default());
//! world.place_collector(networks.get_or_create(world.id()), pos, armara, None,
//!     CrystalProperties::max_celestial(), true, CollectorType::CelestialCrystal)?;
//!
//! let report = world.step(networks.get_or_create(world.id()));
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod block;
pub mod collector;
pub mod controller;
pub mod crystal;
pub mod error;
pub mod network;
pub mod pattern;
pub mod structure;
pub mod world;

pub use block::{Block, BlockGrid, Chunk, ChunkCoord, CHUNK_HEIGHT, CHUNK_SIZE};
pub use collector::{CollectorCrystal, CollectorStep, TileUpdate};
pub use controller::NetworkMembershipController;
pub use crystal::{CollectorType, CrystalProperties};
pub use error::{StructureError, StructureResult, WorldError, WorldResult};
pub use network::{IndependentCrystalSource, NetworkRegistries, NetworkView, WorldNetworkRegistry};
pub use pattern::PatternBlockArray;
pub use structure::{EdgeTrigger, MatchState, StructureMatchCache, StructureMatcher};
pub use world::{StarlightWorld, StepReport, WorldConfig, DEFAULT_REMOVAL_GRACE_TICKS};
