//! # Arena
//!
//! Two orchestrators side by side. The first runs the configured scenes
//! (bodies and fighters), the second a lone body scene. Damage is published
//! on the shared bus between phases, once with a valid target and once with
//! the invalid entity, which nothing receives.
//!
//! ```bash
//! arena --frames 3 --dt 1.0
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::{info, warn};

use strata::core::Entity;
use strata::demo::arena::{
    fighters_scene, movement_scene, spawn_body, spawn_fighter, DamageEvent, HealWaveEvent,
    Position, Velocity,
};
use strata::demo::Console;
use strata::{EngineConfig, Orchestrator, SceneConfig, SceneSeed};

const DEFAULT_CONFIG: &str = include_str!("../../config/arena.toml");

const SECOND_PHASE_FRAMES: u32 = 5;

#[derive(Parser)]
#[command(name = "arena", about = "Moving bodies and regenerating fighters")]
struct Args {
    /// TOML file describing scenes and run length
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Frames to run before damage is dealt
    #[arg(short, long)]
    frames: Option<u64>,

    /// Seconds per frame
    #[arg(short, long)]
    dt: Option<f64>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => {
            info!(path = %path.display(), "loading config");
            EngineConfig::load(path)?
        }
        None => EngineConfig::from_toml_str(DEFAULT_CONFIG)?,
    };
    config.override_run(args.frames, args.dt)?;

    let console = Console::Stdout;
    let origin = Position::default();
    let drift = Velocity { vx: 1.0, vy: 1.0 };

    let mut first = Orchestrator::from_config(&config, |scene: &SceneConfig, seed| {
        if scene.name == "fighters" {
            let built = fighters_scene(seed, &console)?;
            {
                let mut registry = built.registry_mut();
                spawn_fighter(&mut registry, 20, 20)?;
                spawn_fighter(&mut registry, 10, 10)?;
            }
            Ok(built)
        } else {
            if scene.name != "bodies" {
                warn!(scene = %scene.name, "unknown arena scene, building a body scene");
            }
            let built = movement_scene(seed, &console)?;
            spawn_body(&mut built.registry_mut(), origin, drift)?;
            Ok(built)
        }
    })?;

    let mut second = Orchestrator::new();
    {
        let seed = SceneSeed::new("bodies_2", second.bus().clone());
        let scene = movement_scene(seed, &console)?;
        spawn_body(&mut scene.registry_mut(), origin, drift)?;
        second.insert_scene(scene, true);
    }

    first.run(config.run.frames, config.run.dt)?;
    second.run(config.run.frames, config.run.dt)?;

    let target = first
        .scene("fighters")
        .and_then(|scene| scene.registry().alive_entities().first().copied());
    let bus = first.bus().clone();
    if let Some(target) = target {
        bus.publish(&DamageEvent { amount: 5, target });
    }
    bus.publish(&DamageEvent { amount: 5, target: Entity::INVALID });
    bus.publish(&HealWaveEvent { amount: 1 });

    println!("-----");
    let half = config.run.dt / 2.0;
    for _ in 0..SECOND_PHASE_FRAMES {
        println!("Orchestrator 1 :");
        first.update(half)?;
        println!("Orchestrator 2 :");
        second.update(half)?;
    }

    info!(
        first = first.frame_count(),
        second = second.frame_count(),
        "arena finished"
    );
    Ok(())
}
