//! # Starlight Simulation
//!
//! Headless run of one server, one connected client and one world with a
//! celestial collector. The collector's platform is raised and later
//! broken while the player's progression advances and syncs.
//!
//! ```bash
//! starlight_sim --config config/starlight.toml --ticks 200
//! RUST_LOG=debug starlight_sim --json-logs
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use starlight::networking::{PlayerId, ProgressionTier, ResearchProgression};
use starlight::shared::{BlockPos, ConstellationKind, ReferenceResolver, TagCompound, WorldId};
use starlight::world::{Block, CollectorType, CrystalProperties, PatternBlockArray};
use starlight::{setup_logging, GameLoop, StarlightConfig, StarlightResult};
use tracing::{error, info, warn};

const PLAYER: PlayerId = PlayerId(1);
const OVERWORLD: WorldId = WorldId(0);
const COLLECTOR: BlockPos = BlockPos::new(0, 72, 0);

/// Command line arguments.
#[derive(Parser, Debug)]
#[command(name = "starlight_sim", version, about = "Headless starlight simulation")]
struct Args {
    /// Configuration file. Defaults are used if it does not exist.
    #[arg(short, long, value_name = "FILE", default_value = "config/starlight.toml")]
    config: PathBuf,

    /// Steps to run.
    #[arg(short, long, default_value_t = 200)]
    ticks: u64,

    /// Pace steps at the configured tick rate.
    #[arg(long)]
    realtime: bool,

    /// Force JSON log output.
    #[arg(long)]
    json_logs: bool,

    /// Log level override.
    #[arg(short = 'l', long, value_name = "LEVEL")]
    log_level: Option<String>,
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "simulation failed");
            eprintln!("starlight_sim: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> StarlightResult<()> {
    let mut config = if args.config.exists() {
        StarlightConfig::load(&args.config)?
    } else {
        StarlightConfig::default()
    };
    if let Some(level) = &args.log_level {
        config.logging.level.clone_from(level);
    }
    setup_logging(&config.logging, args.json_logs)?;
    if !args.config.exists() {
        warn!(path = %args.config.display(), "config file not found, using defaults");
    }
    if config.registry.major.is_empty() {
        config.registry.major = vec!["aevitas".into(), "armara".into(), "discidia".into()];
        config.registry.weak.push("bootes".into());
        config.registry.minor.push("gelu".into());
        config.registry.perks.push("astral:root".into());
        config.registry.targets.push("astral:nocturnal_spot".into());
    }

    let mut game = GameLoop::from_config(&config);
    game.connect_player(PLAYER);
    game.create_world(OVERWORLD);

    let constellation = game
        .references()
        .constellation(&config.registry.major[0])
        .filter(|c| c.kind() == ConstellationKind::Major);
    let Some(constellation) = constellation else {
        warn!("no attunable constellation configured, nothing to simulate");
        return Ok(());
    };
    let trait_constellation = config
        .registry
        .minor
        .first()
        .and_then(|key| game.references().constellation(key));

    if let Some((world, network)) = game.world_mut(OVERWORLD) {
        world.place_collector(
            network,
            COLLECTOR,
            constellation.clone(),
            trait_constellation,
            CrystalProperties::max_celestial(),
            true,
            CollectorType::CelestialCrystal,
        )?;
    }
    let view = game
        .networks()
        .get(OVERWORLD)
        .map(starlight::world::WorldNetworkRegistry::view);

    let pattern = PatternBlockArray::collector_enhancement();
    let raise_at = 10;
    let break_at = args.ticks * 3 / 5;
    let wipe_at = args.ticks * 9 / 10;

    for tick in 1..=args.ticks {
        if tick == raise_at {
            if let Some((world, _)) = game.world_mut(OVERWORLD) {
                pattern.build(world.grid_mut(), COLLECTOR)?;
            }
        }
        if tick == break_at {
            if let Some((world, _)) = game.world_mut(OVERWORLD) {
                world.set_block(COLLECTOR + BlockPos::new(0, -2, 0), Block::STONE)?;
            }
        }

        advance_progression(&mut game, tick, &config, &constellation)?;
        if tick == wipe_at {
            game.server_mut().wipe(PLAYER)?;
        }

        if args.realtime {
            game.run_paced(1);
        } else {
            game.tick();
        }

        for (world, report) in game.last_reports() {
            for (pos, enhanced) in &report.transitions {
                info!(tick, %world, %pos, enhanced, "collector platform changed");
            }
        }
        for (world, tag) in game.save_dirty_networks() {
            let bytes = tag.to_bytes().map(|b| b.len()).unwrap_or_default();
            info!(tick, %world, bytes, "network saved");
        }
    }

    if let Some(client) = game.client(PLAYER) {
        let snapshot = client.snapshot();
        info!(
            known = snapshot.known_constellations().len(),
            tier = ?snapshot.tier(),
            was_once_attuned = snapshot.was_once_attuned(),
            stats = ?client.stats(),
            "client progression"
        );
    }
    if let Some(view) = view {
        info!(
            sources = view.len(),
            revision = view.revision(),
            enhanced = ?view.is_enhanced(COLLECTOR),
            "network view"
        );
    }
    info!(server = ?game.server().stats(), transport = ?game.server().transport().stats(), "sync totals");
    game.stats().log_summary();
    Ok(())
}

/// Scripted progression: one step of advancement every 20 ticks, synced
/// right away.
fn advance_progression(
    game: &mut GameLoop,
    tick: u64,
    config: &StarlightConfig,
    attunement: &starlight::shared::Constellation,
) -> StarlightResult<()> {
    if tick % 20 != 0 {
        return Ok(());
    }
    let stage = tick / 20;
    let perk = config.registry.perks.first().and_then(|k| game.references().perk(k));
    let target = config.registry.targets.first().and_then(|k| game.references().target(k));

    let progress = game.server_mut().progress_mut(PLAYER);
    match stage {
        1 => {
            for key in &config.registry.major {
                progress.memorize_constellation(key);
            }
            progress.unlock_research(ResearchProgression::Discovery);
        }
        2 => {
            progress.discover_constellation(attunement.key());
            progress.force_research(ResearchProgression::Attunement);
            progress.set_tier(ProgressionTier::Attunement);
        }
        3 => {
            progress.set_attunement(attunement.clone());
            progress.grant_free_token("attunement");
        }
        4 => {
            if let Some(perk) = perk {
                let mut data = TagCompound::new();
                data.set_long("unlocked_at", i64::try_from(tick).unwrap_or(i64::MAX));
                progress.apply_perk(perk, data);
            }
            progress.redeem_free_token("attunement");
            progress.add_perk_exp(150.0);
        }
        5 => {
            if let Some(target) = target {
                progress.use_target(target);
            }
            progress.set_tier(ProgressionTier::ConstellationCraft);
        }
        _ => progress.add_perk_exp(25.0),
    }
    game.server_mut().sync(PLAYER)?;
    Ok(())
}
