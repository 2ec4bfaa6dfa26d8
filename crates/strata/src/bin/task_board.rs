//! # Task Board
//!
//! Two teams track tasks in separate scenes on one bus. After the configured
//! frames, one task is completed through the bus, one more half-length frame
//! runs, and every task of the first team is dumped through the inspector.
//!
//! ```bash
//! task_board --frames 5
//! RUST_LOG=strata=debug task_board --config my_board.toml
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::{info, warn};

use strata::core::Registry;
use strata::demo::tasks::{spawn_task, task_board_scene, TaskCompletedEvent};
use strata::demo::Console;
use strata::{EngineConfig, Orchestrator, SceneConfig};

const DEFAULT_CONFIG: &str = include_str!("../../config/task_board.toml");

#[derive(Parser)]
#[command(name = "task_board", about = "Task tracking across team scenes")]
struct Args {
    /// TOML file describing scenes and run length
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Frames to run before completing a task
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
    let mut orchestrator = Orchestrator::from_config(&config, |scene: &SceneConfig, seed| {
        let (progress, deadline, print, task) = match scene.name.as_str() {
            "TeamAlpha" => (Some(10), Some(20), Some(30), Some(("Implement ECS", 2, 5))),
            "TeamBeta" => (None, Some(20), Some(10), Some(("Write Documentation", 1, 3))),
            other => {
                warn!(scene = other, "no demo tasks for this scene");
                (Some(10), Some(20), Some(30), None)
            }
        };
        let built = task_board_scene(seed, &console, progress, deadline, print)?;
        if let Some((description, priority, days_left)) = task {
            spawn_task(&mut built.registry_mut(), description, priority, days_left)?;
        }
        Ok(built)
    })?;

    orchestrator.run(config.run.frames, config.run.dt)?;

    let completed = orchestrator
        .scene("TeamBeta")
        .and_then(|scene| scene.registry().alive_entities().first().copied());
    if let Some(target) = completed {
        orchestrator.bus().publish(&TaskCompletedEvent { target });
    }

    println!("After completion:");
    orchestrator.run(1, config.run.dt / 2.0)?;

    println!();
    println!(" Introspection Runtime :");
    if let Some(scene) = orchestrator.scene("TeamAlpha") {
        dump(&scene.registry());
    }

    let stats = orchestrator.stats();
    info!(
        frames = stats.frames_recorded,
        avg_ms = stats.avg_frame_ms(),
        "run finished"
    );
    Ok(())
}

fn dump(registry: &Registry) {
    for entity in registry.alive_entities() {
        println!("{}", registry.inspect(entity));
    }
}
