//! Error types for the slideshow core

use thiserror::Error;

/// Errors returned by [`Slideshow`](crate::Slideshow) operations
#[derive(Error, Debug)]
pub enum ShowError {
    #[error("the show has not been started")]
    NotStarted,

    #[error("the show is already running")]
    AlreadyStarted,

    #[error("the slide tree has no slides")]
    NoSlides,

    #[error("a transition is still in flight")]
    TransitionInFlight,

    #[error("seek target is not part of the slide tree: {0}")]
    InvalidSeekTarget(String),

    #[error("start slide is not part of the slide tree: {0}")]
    InvalidStartSlide(String),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Failure of an event sink's primary notification path
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DispatchError {
    #[error("{failed} event handler(s) failed, first: {first}")]
    Handler { failed: usize, first: String },

    #[error("event sink unavailable: {0}")]
    Unavailable(String),
}

/// Errors that can occur while loading or validating configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Errors in a deck description
#[derive(Error, Debug)]
pub enum DeckError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("duplicate slide id '{0}'")]
    DuplicateId(String),

    #[error("slide '{slide}' references unknown slide '{reference}'")]
    UnknownReference { slide: String, reference: String },

    #[error("deck contains no slides")]
    Empty,
}
