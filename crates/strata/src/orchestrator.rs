//! # Orchestrator
//!
//! Owns named scenes and ticks the active ones.
//!
//! ```text
//! Frame N:
//! ┌──────────────────────────────────────────────────────────┐
//! │ for each scene, in creation order:                       │
//! │   inactive? ── skip                                      │
//! │   active?   ── scene.update(dt)                          │
//! │                 ├─ systems, ascending priority           │
//! │                 └─ events deferred during the tick       │
//! │ record frame stats                                       │
//! └──────────────────────────────────────────────────────────┘
//! ```

use std::time::Instant;

use tracing::{debug, info, warn};

use strata_core::{ComponentSet, EcsResult, EventBus, Manifest};

use crate::config::{EngineConfig, SceneConfig};
use crate::scene::{Scene, SceneSeed};

/// Timing of one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Frame number, starting at 1.
    pub frame: u64,
    /// Active scenes ticked.
    pub scenes_ticked: usize,
    /// Wall time spent ticking, in microseconds.
    pub elapsed_us: u64,
}

/// Running totals over every recorded frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameStatsAccumulator {
    /// Frames recorded.
    pub frames_recorded: u64,
    /// Sum of frame times.
    pub total_us_sum: u64,
    /// Fastest frame.
    pub min_frame_us: u64,
    /// Slowest frame.
    pub max_frame_us: u64,
}

impl FrameStatsAccumulator {
    /// Creates an empty accumulator.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            frames_recorded: 0,
            total_us_sum: 0,
            min_frame_us: u64::MAX,
            max_frame_us: 0,
        }
    }

    /// Records one frame.
    pub fn record(&mut self, stats: FrameStats) {
        self.frames_recorded += 1;
        self.total_us_sum += stats.elapsed_us;
        self.min_frame_us = self.min_frame_us.min(stats.elapsed_us);
        self.max_frame_us = self.max_frame_us.max(stats.elapsed_us);
    }

    /// Average frame time in milliseconds.
    #[must_use]
    pub fn avg_frame_ms(&self) -> f64 {
        if self.frames_recorded == 0 {
            return 0.0;
        }
        (self.total_us_sum as f64 / self.frames_recorded as f64) / 1000.0
    }
}

impl Default for FrameStatsAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

struct SceneSlot {
    scene: Scene,
    active: bool,
}

/// Named scenes with active flags, ticked in creation order.
///
/// # Example
///
/// ```rust
/// use strata::core::{impl_component, EventBus};
/// use strata::Orchestrator;
///
/// struct Hp(i32);
/// impl_component!(Hp);
///
/// let mut orchestrator = Orchestrator::with_bus(EventBus::new());
/// orchestrator.create_scene::<(Hp,)>("lobby", true, 16);
/// orchestrator.create_scene::<(Hp,)>("backstage", false, 0);
///
/// orchestrator.run(3, 1.0)?;
/// assert_eq!(orchestrator.frame_count(), 3);
/// assert!(!orchestrator.is_active("backstage"));
/// # Ok::<(), strata::core::EcsError>(())
/// ```
pub struct Orchestrator {
    bus: EventBus,
    scenes: Vec<SceneSlot>,
    frame: u64,
    stats: FrameStatsAccumulator,
}

impl Orchestrator {
    /// Creates an orchestrator on the current thread's default bus.
    #[must_use]
    pub fn new() -> Self {
        Self::with_bus(EventBus::global())
    }

    /// Creates an orchestrator on the given bus.
    #[must_use]
    pub fn with_bus(bus: EventBus) -> Self {
        Self {
            bus,
            scenes: Vec::new(),
            frame: 0,
            stats: FrameStatsAccumulator::new(),
        }
    }

    /// Builds an orchestrator on the default bus from a configuration.
    ///
    /// See [`Orchestrator::apply_config`].
    ///
    /// # Errors
    ///
    /// The first error returned by `build`.
    pub fn from_config<F>(config: &EngineConfig, build: F) -> EcsResult<Self>
    where
        F: FnMut(&SceneConfig, SceneSeed) -> EcsResult<Scene>,
    {
        let mut orchestrator = Self::new();
        orchestrator.apply_config(config, build)?;
        Ok(orchestrator)
    }

    /// Creates every scene listed in `config`, in order.
    ///
    /// `build` receives a [`SceneSeed`] carrying the configured name, this
    /// orchestrator's bus and the configured reservation. Scenes made from
    /// the seed have their ids reserved before `build` spawns anything. The
    /// result is filed under its name with the configured active flag.
    ///
    /// # Errors
    ///
    /// The first error returned by `build`. Scenes built before it are kept.
    pub fn apply_config<F>(&mut self, config: &EngineConfig, mut build: F) -> EcsResult<()>
    where
        F: FnMut(&SceneConfig, SceneSeed) -> EcsResult<Scene>,
    {
        for scene_config in &config.scenes {
            let seed = SceneSeed::new(scene_config.name.clone(), self.bus.clone())
                .reserve(scene_config.preallocate);
            let scene = build(scene_config, seed)?;
            if scene.name() != scene_config.name {
                warn!(
                    configured = %scene_config.name,
                    built = scene.name(),
                    "scene built under a different name than configured"
                );
            }
            self.insert_scene(scene, scene_config.active);
        }
        Ok(())
    }

    /// Creates a scene storing the types of `S`, replacing any scene of the
    /// same name.
    pub fn create_scene<S: ComponentSet>(
        &mut self,
        name: impl Into<String>,
        active: bool,
        preallocate: usize,
    ) -> &mut Scene {
        self.create_scene_with_manifest(name, Manifest::of::<S>(), active, preallocate)
    }

    /// Creates a scene from a runtime manifest, replacing any scene of the
    /// same name.
    pub fn create_scene_with_manifest(
        &mut self,
        name: impl Into<String>,
        manifest: Manifest,
        active: bool,
        preallocate: usize,
    ) -> &mut Scene {
        let scene = SceneSeed::new(name, self.bus.clone())
            .reserve(preallocate)
            .scene_with_manifest(manifest);
        self.insert_scene(scene, active)
    }

    /// Adds a scene built elsewhere, replacing any scene of the same name.
    pub fn insert_scene(&mut self, scene: Scene, active: bool) -> &mut Scene {
        let slot = SceneSlot { scene, active };
        let index = match self.position(slot.scene.name()) {
            Some(index) => {
                debug!(scene = slot.scene.name(), "replacing scene");
                self.scenes[index] = slot;
                index
            }
            None => {
                self.scenes.push(slot);
                self.scenes.len() - 1
            }
        };
        &mut self.scenes[index].scene
    }

    /// Turns ticking on or off for a scene. Returns `false` if no scene has
    /// that name.
    pub fn set_active_scene(&mut self, name: &str, active: bool) -> bool {
        match self.position(name) {
            Some(index) => {
                self.scenes[index].active = active;
                debug!(scene = name, active, "scene activity changed");
                true
            }
            None => {
                warn!(scene = name, "no scene with this name");
                false
            }
        }
    }

    /// Checks if a scene exists and is active.
    #[must_use]
    pub fn is_active(&self, name: &str) -> bool {
        self.position(name)
            .is_some_and(|index| self.scenes[index].active)
    }

    /// Looks up a scene.
    #[must_use]
    pub fn scene(&self, name: &str) -> Option<&Scene> {
        self.position(name).map(|index| &self.scenes[index].scene)
    }

    /// Looks up a scene mutably.
    pub fn scene_mut(&mut self, name: &str) -> Option<&mut Scene> {
        let index = self.position(name)?;
        Some(&mut self.scenes[index].scene)
    }

    /// Removes a scene, returning it. Its bus bindings end when the
    /// returned scene is dropped.
    pub fn remove_scene(&mut self, name: &str) -> Option<Scene> {
        let index = self.position(name)?;
        Some(self.scenes.remove(index).scene)
    }

    /// Scene names in creation order.
    #[must_use]
    pub fn scene_names(&self) -> Vec<&str> {
        self.scenes.iter().map(|slot| slot.scene.name()).collect()
    }

    /// Ticks every active scene once.
    ///
    /// # Errors
    ///
    /// The first scene error; later scenes are not ticked this frame.
    pub fn update(&mut self, dt: f64) -> EcsResult<()> {
        self.frame += 1;
        let started = Instant::now();
        let mut scenes_ticked = 0;

        for slot in self.scenes.iter_mut().filter(|slot| slot.active) {
            slot.scene.update(dt)?;
            scenes_ticked += 1;
        }

        let stats = FrameStats {
            frame: self.frame,
            scenes_ticked,
            elapsed_us: u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX),
        };
        self.stats.record(stats);
        info!(
            frame = stats.frame,
            scenes = scenes_ticked,
            elapsed_us = stats.elapsed_us,
            dt,
            "frame complete"
        );
        Ok(())
    }

    /// Runs `frames` ticks of `dt` seconds.
    ///
    /// # Errors
    ///
    /// The first scene error; the run stops there.
    pub fn run(&mut self, frames: u64, dt: f64) -> EcsResult<()> {
        for _ in 0..frames {
            self.update(dt)?;
        }
        Ok(())
    }

    /// Frames ticked so far.
    #[must_use]
    pub const fn frame_count(&self) -> u64 {
        self.frame
    }

    /// Accumulated frame timings.
    #[must_use]
    pub fn stats(&self) -> &FrameStatsAccumulator {
        &self.stats
    }

    /// The bus shared by every scene.
    #[must_use]
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.scenes.iter().position(|slot| slot.scene.name() == name)
    }
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use strata_core::{impl_component, EcsError, Registry, System};

    struct Ticks(u32);
    impl_component!(Ticks);

    struct Counter;

    impl System for Counter {
        type Signature = (Ticks,);

        fn name(&self) -> &str {
            "counter"
        }

        fn update(&mut self, _dt: f64, registry: &mut Registry) -> EcsResult<()> {
            registry.for_each_with::<(Ticks,), _>(|_, (ticks,)| ticks.0 += 1)
        }
    }

    struct Broken;

    impl System for Broken {
        type Signature = (Ticks,);

        fn name(&self) -> &str {
            "broken"
        }

        fn update(&mut self, _dt: f64, registry: &mut Registry) -> EcsResult<()> {
            let e = registry.create();
            registry.try_get::<Ticks>(e).map(|_| ())
        }
    }

    /// Creates a scene with one counted entity, returning the entity.
    fn counted_scene(
        orchestrator: &mut Orchestrator,
        name: &str,
        active: bool,
    ) -> strata_core::Entity {
        let scene = orchestrator.create_scene::<(Ticks,)>(name, active, 0);
        scene.add_system(Counter, 0).unwrap();
        let mut registry = scene.registry_mut();
        let e = registry.create();
        registry.add(e, Ticks(0)).unwrap();
        e
    }

    fn ticks(orchestrator: &Orchestrator, name: &str, e: strata_core::Entity) -> u32 {
        orchestrator.scene(name).unwrap().registry().get::<Ticks>(e).0
    }

    #[test]
    fn test_only_active_scenes_tick() {
        let mut orchestrator = Orchestrator::with_bus(EventBus::new());
        let a = counted_scene(&mut orchestrator, "on", true);
        let b = counted_scene(&mut orchestrator, "off", false);

        orchestrator.run(3, 1.0).unwrap();
        assert_eq!(ticks(&orchestrator, "on", a), 3);
        assert_eq!(ticks(&orchestrator, "off", b), 0);

        assert!(orchestrator.set_active_scene("off", true));
        orchestrator.update(1.0).unwrap();
        assert_eq!(ticks(&orchestrator, "off", b), 1);
        assert_eq!(orchestrator.frame_count(), 4);
        assert_eq!(orchestrator.stats().frames_recorded, 4);
    }

    #[test]
    fn test_unknown_scene_activation_is_ignored() {
        let mut orchestrator = Orchestrator::with_bus(EventBus::new());
        assert!(!orchestrator.set_active_scene("ghost", true));
        assert!(!orchestrator.is_active("ghost"));
    }

    #[test]
    fn test_same_name_replaces_in_place() {
        let mut orchestrator = Orchestrator::with_bus(EventBus::new());
        counted_scene(&mut orchestrator, "first", true);
        counted_scene(&mut orchestrator, "second", true);
        orchestrator.create_scene::<(Ticks,)>("first", false, 0);

        assert_eq!(orchestrator.scene_names(), vec!["first", "second"]);
        assert!(!orchestrator.is_active("first"));
        assert!(orchestrator.scene("first").unwrap().system_names().is_empty());
    }

    #[test]
    fn test_remove_scene() {
        let mut orchestrator = Orchestrator::with_bus(EventBus::new());
        counted_scene(&mut orchestrator, "gone", true);
        let removed = orchestrator.remove_scene("gone").unwrap();
        assert_eq!(removed.name(), "gone");
        assert!(orchestrator.scene("gone").is_none());
        assert!(orchestrator.remove_scene("gone").is_none());
    }

    #[test]
    fn test_error_stops_the_frame() {
        let mut orchestrator = Orchestrator::with_bus(EventBus::new());
        orchestrator
            .create_scene::<(Ticks,)>("bad", true, 0)
            .add_system(Broken, 0)
            .unwrap();
        let later = counted_scene(&mut orchestrator, "later", true);

        let err = orchestrator.update(1.0).unwrap_err();
        assert!(matches!(err, EcsError::MissingComponent { .. }));
        assert_eq!(ticks(&orchestrator, "later", later), 0);
    }

    #[test]
    fn test_apply_config() {
        let config = EngineConfig::from_toml_str(
            r#"
            [[scenes]]
            name = "alpha"
            active = true
            preallocate = 4

            [[scenes]]
            name = "beta"
            "#,
        )
        .unwrap();

        let built = Rc::new(Cell::new(0));
        let counter = Rc::clone(&built);
        let mut orchestrator = Orchestrator::with_bus(EventBus::new());
        orchestrator
            .apply_config(&config, |_, seed| {
                counter.set(counter.get() + 1);
                let mut scene = seed.scene::<(Ticks,)>();
                scene.add_system(Counter, 0)?;
                let e = scene.registry_mut().create();
                scene.registry_mut().add(e, Ticks(0))?;
                Ok(scene)
            })
            .unwrap();

        assert_eq!(built.get(), 2);
        assert_eq!(orchestrator.scene_names(), vec!["alpha", "beta"]);
        assert!(orchestrator.is_active("alpha"));
        assert!(!orchestrator.is_active("beta"));

        let alpha = orchestrator.scene("alpha").unwrap();
        // The spawned entity took the first reserved id.
        let spawned = alpha.registry().alive_entities();
        assert_eq!(spawned.len(), 1);
        assert_eq!(spawned[0].id(), 0);
        assert_eq!(alpha.registry().entity_manager().free_count(), 3);
        assert_eq!(alpha.registry().entity_manager().allocated(), 4);
        assert!(alpha.bus().same_bus(orchestrator.bus()));

        // Unset reservations fall back to the default of 100.
        let beta = orchestrator.scene("beta").unwrap();
        assert_eq!(beta.registry().entity_manager().allocated(), 100);
        assert_eq!(beta.registry().entity_manager().free_count(), 99);
    }

    #[test]
    fn test_stats_average() {
        let mut stats = FrameStatsAccumulator::new();
        assert_eq!(stats.avg_frame_ms(), 0.0);
        stats.record(FrameStats { frame: 1, scenes_ticked: 1, elapsed_us: 1000 });
        stats.record(FrameStats { frame: 2, scenes_ticked: 1, elapsed_us: 3000 });
        assert_eq!(stats.avg_frame_ms(), 2.0);
        assert_eq!(stats.min_frame_us, 1000);
        assert_eq!(stats.max_frame_us, 3000);
    }
}
