//! Console output for show events

use std::io::Write;

use deck_core::{Deck, Direction, ShowEvent, ShowSubscriber, SlideId};

/// Prints every show event as one line, naming slides by their deck id
pub struct ConsolePresenter {
    names: Deck,
}

impl ConsolePresenter {
    pub fn new(deck: &Deck) -> Self {
        Self { names: deck.clone() }
    }

    fn name(&self, slide: SlideId) -> &str {
        self.names.key(slide).unwrap_or("?")
    }

    pub fn describe(&self, event: &ShowEvent<SlideId>) -> String {
        match event {
            ShowEvent::Started { slide } => format!("start    {}", self.name(*slide)),
            ShowEvent::Advanced { slide, direction } => {
                let arrow = match direction {
                    Direction::Forward => "->",
                    Direction::Backward => "<-",
                    Direction::Seek => "=>",
                };
                format!("{arrow}       {}", self.name(*slide))
            }
            ShowEvent::Ended { last } => format!("end      {}", self.name(*last)),
            ShowEvent::Stopped => "stopped".to_string(),
        }
    }
}

impl ShowSubscriber<SlideId> for ConsolePresenter {
    fn on_show_event(&self, event: &ShowEvent<SlideId>) {
        let mut out = std::io::stdout().lock();
        if let Err(err) = writeln!(out, "{}", self.describe(event)) {
            tracing::warn!(error = %err, "failed to write event");
        }
    }
}
