use serde::{Serialize, Deserialize};

mod engine;
mod stack;
mod subscriber;

pub use engine::{NavigationOutcome, Slideshow};
pub use stack::{StackStep, StepIntoFrame, StepIntoStack};
pub use subscriber::ShowSubscriber;

/// How a slide was reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Forward,
    Backward,
    /// Explicit jump to an arbitrary slide
    Seek,
}

/// Lifecycle state of the navigation engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineState {
    /// Not started, or stopped
    Idle,
    /// No transition in flight
    Settled,
    /// Hide or show phase in progress
    Transitioning,
}
