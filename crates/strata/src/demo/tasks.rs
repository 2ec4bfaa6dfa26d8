//! Task board: every task has a description, a completion flag, a priority
//! and a countdown of days left.

use strata_core::{impl_component, Delivery, EcsResult, Entity, Event, Registry, System};

use super::Console;
use crate::scene::{Scene, SceneSeed};

/// What needs doing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Task {
    /// Human-readable summary.
    pub description: String,
}

impl_component!(Task { description });

/// Completion flag.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Status {
    /// Whether the task is done.
    pub completed: bool,
}

impl_component!(Status { completed });

/// Importance, higher is more urgent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Priority {
    /// Priority level.
    pub level: i32,
}

impl Default for Priority {
    fn default() -> Self {
        Self { level: 1 }
    }
}

impl_component!(Priority { level });

/// Days until the task is due.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Deadline {
    /// Remaining days, never negative.
    pub days_left: i32,
}

impl_component!(Deadline { days_left });

/// Component types stored by a task board scene.
pub type TaskComponents = (Task, Status, Priority, Deadline);

/// Reports tasks that are not done yet.
#[derive(Debug, Default)]
pub struct TaskProgressSystem {
    console: Console,
}

impl TaskProgressSystem {
    /// Creates the system writing to `console`.
    #[must_use]
    pub fn new(console: Console) -> Self {
        Self { console }
    }
}

impl System for TaskProgressSystem {
    type Signature = TaskComponents;

    fn name(&self) -> &str {
        "TaskProgressSystem"
    }

    fn update(&mut self, _dt: f64, registry: &mut Registry) -> EcsResult<()> {
        let console = &self.console;
        registry.for_each_with::<TaskComponents, _>(|_, (task, status, _, _)| {
            if !status.completed {
                console.line(format!("[Task] {} is still in progress", task.description));
            }
        })
    }
}

/// Counts deadlines down by one day per tick, stopping at zero.
#[derive(Debug, Default)]
pub struct DeadlineSystem {
    console: Console,
}

impl DeadlineSystem {
    /// Creates the system writing to `console`.
    #[must_use]
    pub fn new(console: Console) -> Self {
        Self { console }
    }
}

impl System for DeadlineSystem {
    type Signature = TaskComponents;

    fn name(&self) -> &str {
        "DeadlineSystem"
    }

    fn update(&mut self, _dt: f64, registry: &mut Registry) -> EcsResult<()> {
        let console = &self.console;
        registry.for_each_with::<TaskComponents, _>(|entity, (_, _, _, deadline)| {
            if deadline.days_left > 0 {
                deadline.days_left -= 1;
            }
            console.line(format!(
                "[Deadline] Task {} has {} day(s) left",
                entity.id(),
                deadline.days_left
            ));
        })
    }
}

/// Prints one summary line per task.
#[derive(Debug, Default)]
pub struct TaskPrintSystem {
    console: Console,
}

impl TaskPrintSystem {
    /// Creates the system writing to `console`.
    #[must_use]
    pub fn new(console: Console) -> Self {
        Self { console }
    }
}

impl System for TaskPrintSystem {
    type Signature = TaskComponents;

    fn name(&self) -> &str {
        "TaskPrintSystem"
    }

    fn update(&mut self, _dt: f64, registry: &mut Registry) -> EcsResult<()> {
        let console = &self.console;
        registry.for_each_with::<TaskComponents, _>(|_, (task, status, priority, _)| {
            console.line(format!(
                "[Task] {} | Priority: {} | Status: {}",
                task.description,
                priority.level,
                if status.completed { "V" } else { "X" }
            ));
        })
    }
}

/// Marks one task as done.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TaskCompletedEvent {
    /// The completed task.
    pub target: Entity,
}

impl Event for TaskCompletedEvent {
    const DELIVERY: Delivery = Delivery::Targeted;

    fn target(&self) -> Entity {
        self.target
    }
}

/// Creates a task entity with all four components.
///
/// # Errors
///
/// [`strata_core::EcsError::UnknownComponent`] if the registry does not
/// store the task components.
pub fn spawn_task(
    registry: &mut Registry,
    description: impl Into<String>,
    priority: i32,
    days_left: i32,
) -> EcsResult<Entity> {
    let entity = registry.create();
    registry.add(entity, Task { description: description.into() })?;
    registry.add(entity, Status::default())?;
    registry.add(entity, Priority { level: priority })?;
    registry.add(entity, Deadline { days_left: days_left.max(0) })?;
    Ok(entity)
}

/// Builds a task board scene: the three task systems at the given
/// priorities (`None` leaves a system out) and completion routing.
///
/// # Errors
///
/// Propagates scene setup errors.
pub fn task_board_scene(
    seed: SceneSeed,
    console: &Console,
    progress: Option<i32>,
    deadline: Option<i32>,
    print: Option<i32>,
) -> EcsResult<Scene> {
    let mut scene = seed.scene::<TaskComponents>();
    if let Some(priority) = progress {
        scene.add_system(TaskProgressSystem::new(console.clone()), priority)?;
    }
    if let Some(priority) = deadline {
        scene.add_system(DeadlineSystem::new(console.clone()), priority)?;
    }
    if let Some(priority) = print {
        scene.add_system(TaskPrintSystem::new(console.clone()), priority)?;
    }

    let console = console.clone();
    scene.add_event_router::<TaskCompletedEvent, Status, _>(
        move |registry: &mut Registry, _event: &TaskCompletedEvent, target: Entity| {
            if let Some(status) = registry.get_if_mut::<Status>(target) {
                status.completed = true;
                console.line(format!(" Task {} has been marked as completed!", target.id()));
            }
        },
    )?;
    scene.bind_router::<TaskCompletedEvent>();
    Ok(scene)
}
