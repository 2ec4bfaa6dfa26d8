//! Arena: bodies that drift by their velocity, and fighters whose health and
//! mana regenerate while damage events wear them down.

use strata_core::{impl_component, Delivery, EcsResult, Entity, Event, Registry, System};

use super::Console;
use crate::scene::{Scene, SceneSeed};

/// Location on the arena floor.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Position {
    /// Horizontal coordinate.
    pub x: f32,
    /// Vertical coordinate.
    pub y: f32,
}

impl_component!(Position { x, y });

/// Units per second.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Velocity {
    /// Horizontal speed.
    pub vx: f32,
    /// Vertical speed.
    pub vy: f32,
}

impl_component!(Velocity { vx, vy });

/// Hit points.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Heal {
    /// Current hit points.
    pub hp: i32,
}

impl_component!(Heal { hp });

/// Mana points.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Mana {
    /// Current mana points.
    pub mp: i32,
}

impl_component!(Mana { mp });

/// Component types of a movement scene.
pub type BodyComponents = (Position, Velocity);

/// Component types of a fighters scene.
pub type FighterComponents = (Heal, Mana);

/// Moves every body by `velocity * dt`.
#[derive(Debug, Default)]
pub struct MovementSystem {
    console: Console,
}

impl MovementSystem {
    /// Creates the system writing to `console`.
    #[must_use]
    pub fn new(console: Console) -> Self {
        Self { console }
    }
}

impl System for MovementSystem {
    type Signature = BodyComponents;

    fn name(&self) -> &str {
        "MovementSystem"
    }

    #[allow(clippy::cast_possible_truncation)]
    fn update(&mut self, dt: f64, registry: &mut Registry) -> EcsResult<()> {
        let console = &self.console;
        let dt = dt as f32;
        registry.for_each_with::<BodyComponents, _>(|_, (position, velocity)| {
            position.x += velocity.vx * dt;
            position.y += velocity.vy * dt;
            console.line(format!("  PX : {} PY : {}", position.x, position.y));
        })
    }
}

/// Adds one hit point and two mana points per tick.
#[derive(Clone, Copy, Debug, Default)]
pub struct RegenSystem;

impl System for RegenSystem {
    type Signature = FighterComponents;

    fn name(&self) -> &str {
        "RegenSystem"
    }

    fn update(&mut self, _dt: f64, registry: &mut Registry) -> EcsResult<()> {
        registry.for_each_with::<FighterComponents, _>(|_, (heal, mana)| {
            heal.hp += 1;
            mana.mp += 2;
        })
    }
}

/// Prints every fighter on one line.
#[derive(Debug, Default)]
pub struct PrintSystem {
    console: Console,
}

impl PrintSystem {
    /// Creates the system writing to `console`.
    #[must_use]
    pub fn new(console: Console) -> Self {
        Self { console }
    }
}

impl System for PrintSystem {
    type Signature = FighterComponents;

    fn name(&self) -> &str {
        "PrintSystem"
    }

    fn update(&mut self, _dt: f64, registry: &mut Registry) -> EcsResult<()> {
        let mut line = String::new();
        registry.for_each_with::<FighterComponents, _>(|entity, (heal, mana)| {
            line.push_str(&format!(
                " Entity {} :  HP : {} MP: {} |",
                entity.id(),
                heal.hp,
                mana.mp
            ));
        })?;
        self.console.line(line);
        Ok(())
    }
}

/// Damage dealt to one fighter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DamageEvent {
    /// Hit points removed.
    pub amount: i32,
    /// Receiving fighter.
    pub target: Entity,
}

impl Event for DamageEvent {
    const DELIVERY: Delivery = Delivery::Targeted;

    fn target(&self) -> Entity {
        self.target
    }
}

/// Healing applied to every fighter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HealWaveEvent {
    /// Hit points restored.
    pub amount: i32,
}

impl Event for HealWaveEvent {}

/// Builds a scene that moves bodies.
///
/// # Errors
///
/// Propagates scene setup errors.
pub fn movement_scene(seed: SceneSeed, console: &Console) -> EcsResult<Scene> {
    let mut scene = seed.scene::<BodyComponents>();
    scene.add_system(MovementSystem::new(console.clone()), 0)?;
    Ok(scene)
}

/// Builds a fighters scene: regeneration at priority 10, the report at 50,
/// and routing for [`DamageEvent`] and [`HealWaveEvent`].
///
/// # Errors
///
/// Propagates scene setup errors.
pub fn fighters_scene(seed: SceneSeed, console: &Console) -> EcsResult<Scene> {
    let mut scene = seed.scene::<FighterComponents>();
    scene.add_system(PrintSystem::new(console.clone()), 50)?;
    scene.add_system(RegenSystem, 10)?;

    let damage_console = console.clone();
    scene.add_event_router::<DamageEvent, Heal, _>(
        move |registry: &mut Registry, event: &DamageEvent, target: Entity| {
            let heal = registry.get_mut::<Heal>(target);
            heal.hp -= event.amount;
            damage_console.line(format!(
                "[EventDamage] on target.id {} took {} damage, rest {} hp",
                target.id(),
                event.amount,
                heal.hp
            ));
        },
    )?;
    scene.add_event_router::<HealWaveEvent, Heal, _>(
        |registry: &mut Registry, event: &HealWaveEvent, target: Entity| {
            registry.get_mut::<Heal>(target).hp += event.amount;
        },
    )?;
    scene.bind_router::<DamageEvent>();
    scene.bind_router::<HealWaveEvent>();
    Ok(scene)
}

/// Creates a body at `position` moving at `velocity`.
///
/// # Errors
///
/// [`strata_core::EcsError::UnknownComponent`] if the registry does not
/// store bodies.
pub fn spawn_body(
    registry: &mut Registry,
    position: Position,
    velocity: Velocity,
) -> EcsResult<Entity> {
    let entity = registry.create();
    registry.add(entity, position)?;
    registry.add(entity, velocity)?;
    Ok(entity)
}

/// Creates a fighter with the given hit and mana points.
///
/// # Errors
///
/// [`strata_core::EcsError::UnknownComponent`] if the registry does not
/// store fighters.
pub fn spawn_fighter(registry: &mut Registry, hp: i32, mp: i32) -> EcsResult<Entity> {
    let entity = registry.create();
    registry.add(entity, Heal { hp })?;
    registry.add(entity, Mana { mp })?;
    Ok(entity)
}
