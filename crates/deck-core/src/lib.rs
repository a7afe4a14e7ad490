//! Core navigation engine for step-through slideshows
//!
//! A [`Slideshow`] walks a tree of slides one at a time. Slides may declare
//! a step-into region whose children are visited before the show moves on,
//! auto-advance slides move forward on their own after a dwell time derived
//! from their text, and every move runs a two-phase hide/show transition
//! whose completion is reported back by the host.
//!
//! The engine is synchronous and host-agnostic: the slide tree, animation
//! hooks, timers, focus handling and event delivery are all supplied through
//! traits. [`driver`] wires them up for a tokio application.

pub mod config;
pub mod deck;
pub mod driver;
pub mod dwell;
pub mod error;
pub mod events;
pub mod navigation;
pub mod timer;
pub mod transition;
pub mod tree;

// Re-export commonly used types
pub use config::ShowConfig;
pub use deck::{Deck, DeckSpec, SlideId, SlideSpec};
pub use driver::{ShowDriver, ShowSignal, TimedTransitions, TokioScheduler};
pub use dwell::{estimate_dwell, DwellConfig};
pub use error::{ConfigError, DeckError, DispatchError, ShowError};
pub use events::{EventBus, EventSink, ShowEvent, ShowEventKind};
pub use navigation::{
    Direction, EngineState, NavigationOutcome, ShowSubscriber, Slideshow, StepIntoStack,
};
pub use timer::{ManualScheduler, Scheduler, TimerTicket};
pub use transition::{FocusPolicy, ListenerToken, TransitionHooks};
pub use tree::{SlideAttributes, SlideTree, VisualPhase};
