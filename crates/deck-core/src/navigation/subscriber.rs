//! Show subscriber trait

use crate::events::ShowEvent;

/// Trait for components that need to respond to show progress
pub trait ShowSubscriber<S>: Send + Sync {
    /// Called for every event the show emits
    fn on_show_event(&self, event: &ShowEvent<S>);
}
