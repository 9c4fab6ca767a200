//! # Starlight Game Loop
//!
//! Fixed-step orchestration of the worlds and the progression sync.
//!
//! ```text
//! Step N:
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │ 1. WORLD STEP (per world, ascending id)                             │
//! │    ├─ collectors update, structure edges detected                   │
//! │    ├─ membership controller writes network enhancement              │
//! │    └─ network view republished if dirty                             │
//! │                                                                     │
//! │ 2. DELIVERY (transport context)                                     │
//! │    └─ payloads sent this step are decoded and queued per player     │
//! │                                                                     │
//! │ 3. CLIENT APPLY (simulation context)                                │
//! │    └─ each player's queue drained FIFO, full replace per message    │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Server mutations made between steps (`server_mut().progress_mut(..)`
//! followed by `sync`) are therefore visible on the client after the next
//! step.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;
use starlight_networking::{
    sync_pipeline, ChannelTransport, ClientProgress, PlayerId, ProgressServer, SyncConfig,
    SyncReceiver,
};
use starlight_shared::{ReferenceRegistry, ReferenceResolver, TagCompound, WorldId};
use starlight_world::{
    NetworkRegistries, StarlightWorld, StepReport, WorldConfig, WorldNetworkRegistry,
};
use tracing::{debug, info, warn};

use crate::config::StarlightConfig;

/// Loop configuration.
#[derive(Clone, Debug)]
pub struct GameLoopConfig {
    /// Steps per second.
    pub tick_rate: u32,
    /// Client sync settings applied to every player.
    pub sync: SyncConfig,
    /// Settings for worlds created by the loop.
    pub world: WorldConfig,
    /// Warn about steps that exceed their budget.
    pub enable_timing_logs: bool,
}

impl Default for GameLoopConfig {
    fn default() -> Self {
        Self::from(&StarlightConfig::default())
    }
}

impl From<&StarlightConfig> for GameLoopConfig {
    fn from(config: &StarlightConfig) -> Self {
        Self {
            tick_rate: config.simulation.tick_rate,
            sync: config.sync_config(),
            world: config.world_config(),
            enable_timing_logs: config.simulation.enable_timing_logs,
        }
    }
}

impl GameLoopConfig {
    /// Time budget of one step.
    #[must_use]
    pub fn tick_duration(&self) -> Duration {
        Duration::from_micros(1_000_000 / u64::from(self.tick_rate.max(1)))
    }
}

/// Timing and counts of one step.
#[derive(Clone, Copy, Debug, Default)]
pub struct TickStats {
    /// Step number, starting at 1.
    pub tick: u64,
    /// Whole step in microseconds.
    pub total_us: u64,
    /// World stepping in microseconds.
    pub world_us: u64,
    /// Delivery and client apply in microseconds.
    pub sync_us: u64,
    /// Structure transitions across all worlds.
    pub transitions: u32,
    /// Collector replication records produced.
    pub tile_updates: u32,
    /// Sync messages applied across all clients.
    pub messages_applied: u32,
}

/// One connected player's client side.
struct ClientLink {
    inbox: Receiver<Vec<u8>>,
    receiver: SyncReceiver,
    progress: ClientProgress,
}

/// The simulation orchestrator.
pub struct GameLoop {
    config: GameLoopConfig,
    references: Arc<ReferenceRegistry>,
    server: ProgressServer<ChannelTransport>,
    clients: HashMap<PlayerId, ClientLink>,
    worlds: BTreeMap<WorldId, StarlightWorld>,
    networks: NetworkRegistries,
    tick: u64,
    last_reports: Vec<(WorldId, StepReport)>,
    stats_accumulator: TickStatsAccumulator,
}

impl GameLoop {
    /// Creates a loop with no players and no worlds.
    #[must_use]
    pub fn new(config: GameLoopConfig, references: ReferenceRegistry) -> Self {
        Self {
            config,
            references: Arc::new(references),
            server: ProgressServer::new(ChannelTransport::new()),
            clients: HashMap::new(),
            worlds: BTreeMap::new(),
            networks: NetworkRegistries::new(),
            tick: 0,
            last_reports: Vec::new(),
            stats_accumulator: TickStatsAccumulator::new(),
        }
    }

    /// Creates a loop from the full configuration.
    #[must_use]
    pub fn from_config(config: &StarlightConfig) -> Self {
        Self::new(
            GameLoopConfig::from(config),
            ReferenceRegistry::from_definition(&config.registry),
        )
    }

    /// Loop configuration.
    #[must_use]
    pub const fn config(&self) -> &GameLoopConfig {
        &self.config
    }

    /// References both sides resolve against.
    #[must_use]
    pub fn references(&self) -> &ReferenceRegistry {
        &self.references
    }

    // ========================================================================
    // Players
    // ========================================================================

    /// Opens a session: the server gets an empty snapshot if it has none,
    /// and the client side gets a transport link and apply queue.
    pub fn connect_player(&mut self, player: PlayerId) {
        if self.clients.contains_key(&player) {
            debug!(%player, "player already connected");
            return;
        }
        let capacity = self.config.sync.queue_capacity;
        let inbox = self.server.transport().connect(player, capacity);
        let resolver: Arc<dyn ReferenceResolver> = Arc::<ReferenceRegistry>::clone(&self.references);
        let (receiver, progress) = sync_pipeline(&self.config.sync, resolver);
        self.server.progress_mut(player);
        self.clients.insert(
            player,
            ClientLink {
                inbox,
                receiver,
                progress,
            },
        );
        info!(%player, "player connected");
    }

    /// Closes a session. The server keeps the player's progress.
    pub fn disconnect_player(&mut self, player: PlayerId) -> bool {
        self.server.transport().disconnect(player);
        let removed = self.clients.remove(&player).is_some();
        if removed {
            info!(%player, "player disconnected");
        }
        removed
    }

    /// Connected player count.
    #[must_use]
    pub fn connected_players(&self) -> usize {
        self.clients.len()
    }

    /// Authoritative progress store.
    #[must_use]
    pub const fn server(&self) -> &ProgressServer<ChannelTransport> {
        &self.server
    }

    /// Authoritative progress store, for mutation and sync.
    pub fn server_mut(&mut self) -> &mut ProgressServer<ChannelTransport> {
        &mut self.server
    }

    /// Client-side mirror of `player`'s progress.
    #[must_use]
    pub fn client(&self, player: PlayerId) -> Option<&ClientProgress> {
        self.clients.get(&player).map(|link| &link.progress)
    }

    // ========================================================================
    // Worlds
    // ========================================================================

    /// Creates (or returns) the world with `id` along with its network.
    pub fn create_world(&mut self, id: WorldId) -> &mut StarlightWorld {
        self.networks.get_or_create(id);
        let config = self.config.world.clone();
        self.worlds
            .entry(id)
            .or_insert_with(|| StarlightWorld::new(id, config))
    }

    /// World `id`.
    #[must_use]
    pub fn world(&self, id: WorldId) -> Option<&StarlightWorld> {
        self.worlds.get(&id)
    }

    /// World `id` and its network registry, borrowed together.
    pub fn world_mut(&mut self, id: WorldId) -> Option<(&mut StarlightWorld, &mut WorldNetworkRegistry)> {
        let world = self.worlds.get_mut(&id)?;
        Some((world, self.networks.get_or_create(id)))
    }

    /// Every world's network registry.
    #[must_use]
    pub const fn networks(&self) -> &NetworkRegistries {
        &self.networks
    }

    /// Serialized network registries that changed since the last call.
    pub fn save_dirty_networks(&mut self) -> Vec<(WorldId, TagCompound)> {
        self.networks
            .take_dirty_worlds()
            .into_iter()
            .filter_map(|id| self.networks.get(id).map(|n| (id, n.write_to_tag())))
            .collect()
    }

    // ========================================================================
    // Stepping
    // ========================================================================

    /// Runs one step.
    pub fn tick(&mut self) -> TickStats {
        let step_start = Instant::now();
        self.tick += 1;
        let mut stats = TickStats {
            tick: self.tick,
            ..TickStats::default()
        };

        self.last_reports.clear();
        for (id, world) in &mut self.worlds {
            let report = world.step(self.networks.get_or_create(*id));
            stats.transitions += count(report.transitions.len());
            stats.tile_updates += count(report.updates.len());
            self.last_reports.push((*id, report));
        }
        let world_done = Instant::now();

        for link in self.clients.values_mut() {
            for payload in link.inbox.try_iter() {
                link.receiver.receive(&payload);
            }
            stats.messages_applied += count(link.progress.process_pending());
        }

        let end = Instant::now();
        stats.world_us = micros(world_done - step_start);
        stats.sync_us = micros(end - world_done);
        stats.total_us = micros(end - step_start);
        self.end_tick(stats);
        stats
    }

    /// Runs `ticks` steps back to back.
    pub fn run_for(&mut self, ticks: u64) {
        for _ in 0..ticks {
            self.tick();
        }
    }

    /// Runs `ticks` steps paced at the configured tick rate.
    pub fn run_paced(&mut self, ticks: u64) {
        let budget = self.config.tick_duration();
        for _ in 0..ticks {
            let stats = self.tick();
            let spent = Duration::from_micros(stats.total_us);
            if let Some(rest) = budget.checked_sub(spent) {
                std::thread::sleep(rest);
            }
        }
    }

    fn end_tick(&mut self, stats: TickStats) {
        let budget = self.config.tick_duration();
        self.stats_accumulator.record(stats, budget);
        if self.config.enable_timing_logs && stats.total_us > micros(budget) {
            warn!(
                tick = stats.tick,
                total_us = stats.total_us,
                budget_us = micros(budget),
                "step exceeded budget"
            );
        }
    }

    /// Steps run so far.
    #[inline]
    #[must_use]
    pub const fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Per-world reports of the last step.
    #[must_use]
    pub fn last_reports(&self) -> &[(WorldId, StepReport)] {
        &self.last_reports
    }

    /// Accumulated step statistics.
    #[must_use]
    pub const fn stats(&self) -> &TickStatsAccumulator {
        &self.stats_accumulator
    }
}

fn count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

fn micros(d: Duration) -> u64 {
    u64::try_from(d.as_micros()).unwrap_or(u64::MAX)
}

/// Accumulator for step statistics.
#[derive(Clone, Debug)]
pub struct TickStatsAccumulator {
    /// Steps recorded.
    pub ticks_recorded: u64,
    /// Sum of step times.
    pub total_us_sum: u64,
    /// Shortest step.
    pub min_tick_us: u64,
    /// Longest step.
    pub max_tick_us: u64,
    /// Steps over budget.
    pub ticks_over_budget: u64,
    /// Structure transitions.
    pub transitions: u64,
    /// Sync messages applied.
    pub messages_applied: u64,
}

impl TickStatsAccumulator {
    /// Creates an empty accumulator.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ticks_recorded: 0,
            total_us_sum: 0,
            min_tick_us: u64::MAX,
            max_tick_us: 0,
            ticks_over_budget: 0,
            transitions: 0,
            messages_applied: 0,
        }
    }

    /// Records one step.
    pub fn record(&mut self, stats: TickStats, budget: Duration) {
        self.ticks_recorded += 1;
        self.total_us_sum += stats.total_us;
        self.min_tick_us = self.min_tick_us.min(stats.total_us);
        self.max_tick_us = self.max_tick_us.max(stats.total_us);
        if stats.total_us > micros(budget) {
            self.ticks_over_budget += 1;
        }
        self.transitions += u64::from(stats.transitions);
        self.messages_applied += u64::from(stats.messages_applied);
    }

    /// Mean step time in milliseconds.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn avg_tick_ms(&self) -> f64 {
        if self.ticks_recorded == 0 {
            return 0.0;
        }
        (self.total_us_sum as f64 / self.ticks_recorded as f64) / 1000.0
    }

    /// Logs a summary.
    pub fn log_summary(&self) {
        info!(
            ticks = self.ticks_recorded,
            avg_ms = self.avg_tick_ms(),
            max_us = self.max_tick_us,
            over_budget = self.ticks_over_budget,
            transitions = self.transitions,
            messages_applied = self.messages_applied,
            "simulation summary"
        );
    }
}

impl Default for TickStatsAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use starlight_shared::ConstellationKind;

    fn game_loop() -> GameLoop {
        let mut refs = ReferenceRegistry::new();
        refs.register_constellation("aevitas", ConstellationKind::Major);
        GameLoop::new(GameLoopConfig::default(), refs)
    }

    #[test]
    fn test_tick_duration() {
        let config = GameLoopConfig::default();
        assert_eq!(config.tick_duration(), Duration::from_millis(50));
    }

    #[test]
    fn test_sync_visible_after_next_tick() {
        let mut game = game_loop();
        let player = PlayerId(7);
        game.connect_player(player);

        game.server_mut().progress_mut(player).discover_constellation("aevitas");
        game.server_mut().sync(player).unwrap();
        assert!(!game.client(player).unwrap().snapshot().has_discovered("aevitas"));

        let stats = game.tick();
        assert_eq!(stats.messages_applied, 1);
        assert!(game.client(player).unwrap().snapshot().has_discovered("aevitas"));
    }

    #[test]
    fn test_disconnect_keeps_server_progress() {
        let mut game = game_loop();
        game.connect_player(PlayerId(1));
        game.server_mut().progress_mut(PlayerId(1)).grant_free_token("gift");
        assert!(game.disconnect_player(PlayerId(1)));
        assert!(!game.disconnect_player(PlayerId(1)));
        assert!(game.server_mut().sync(PlayerId(1)).is_err());
        assert_eq!(game.server().progress(PlayerId(1)).unwrap().free_tokens(), ["gift".to_string()]);
    }

    #[test]
    fn test_worlds_step_in_order() {
        let mut game = game_loop();
        game.create_world(WorldId(1));
        game.create_world(WorldId(-1));
        game.tick();
        let ids: Vec<_> = game.last_reports().iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![WorldId(-1), WorldId(1)]);
        assert_eq!(game.stats().ticks_recorded, 1);
    }
}
