//! # Starlight
//!
//! Integration crate: configuration, logging, and the fixed-step loop
//! that runs the worlds and the progression sync together.
//!
//! ## Architecture
//!
//! ```text
//!   ProgressServer ──bytes──> SyncReceiver ──queue──> ClientProgress
//!   (authoritative)           (decode)                (apply, FIFO)
//!
//!   StarlightWorld ──transitions──> WorldNetworkRegistry ──> NetworkView
//!   (collectors)                    (one per world)          (readers)
//! ```
//!
//! ## Modules
//!
//! - `config`: TOML configuration
//! - `logging`: subscriber setup for binaries
//! - `game_loop`: step orchestration and timing

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod game_loop;
pub mod logging;

pub use starlight_networking as networking;
pub use starlight_shared as shared;
pub use starlight_world as world;

pub use config::{LoggingSettings, SimulationSettings, StarlightConfig, WorldSettings};
pub use error::{ConfigError, ConfigResult, StarlightError, StarlightResult};
pub use game_loop::{GameLoop, GameLoopConfig, TickStats, TickStatsAccumulator};
pub use logging::setup_logging;
