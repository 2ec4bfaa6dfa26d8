//! # Demo Content
//!
//! Components, systems and events used by the bundled binaries.
//!
//! - `tasks`: a task board where deadlines count down and tasks get completed
//! - `arena`: moving bodies plus regenerating fighters that take damage
//!
//! Systems write their report lines to a [`Console`], which is either
//! standard output or an in-memory capture for tests.

pub mod arena;
pub mod tasks;

use std::cell::RefCell;
use std::rc::Rc;

/// Where demo systems write their report lines.
#[derive(Clone, Debug, Default)]
pub enum Console {
    /// Print to standard output.
    #[default]
    Stdout,
    /// Append to a shared buffer.
    Capture(Rc<RefCell<Vec<String>>>),
}

impl Console {
    /// A capturing console and a handle to its buffer.
    #[must_use]
    pub fn capture() -> (Self, Rc<RefCell<Vec<String>>>) {
        let lines = Rc::new(RefCell::new(Vec::new()));
        (Self::Capture(Rc::clone(&lines)), lines)
    }

    /// Writes one line.
    pub fn line(&self, text: impl Into<String>) {
        let text: String = text.into();
        match self {
            Self::Stdout => println!("{text}"),
            Self::Capture(lines) => lines.borrow_mut().push(text),
        }
    }
}
