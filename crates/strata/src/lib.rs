//! # Strata
//!
//! Scenes and orchestration on top of [`strata_core`].
//!
//! ```text
//! ┌──────────────────────────── Orchestrator ───────────────────────────┐
//! │                                                                      │
//! │   Scene "alpha" (active)          Scene "beta" (inactive)            │
//! │   ├─ Registry                     ├─ Registry                        │
//! │   ├─ SystemScheduler              ├─ SystemScheduler                 │
//! │   └─ event routers ─┐             └─ event routers ─┐                │
//! │                     │                               │                │
//! └─────────────────────┼───────────────────────────────┼────────────────┘
//!                       └──────────── EventBus ─────────┘
//! ```
//!
//! ## Modules
//!
//! - `config`: TOML startup configuration
//! - `scene`: a registry with systems and event routing
//! - `orchestrator`: named scenes ticked frame by frame
//! - `demo`: components and systems used by the bundled binaries

pub mod config;
pub mod demo;
pub mod orchestrator;
pub mod scene;

pub use strata_core as core;

pub use config::{ConfigError, ConfigResult, EngineConfig, RunConfig, SceneConfig};
pub use orchestrator::{FrameStats, FrameStatsAccumulator, Orchestrator};
pub use scene::{Scene, SceneSeed};
