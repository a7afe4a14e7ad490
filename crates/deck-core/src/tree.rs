//! The node tree a show walks over
//!
//! The core never inspects slides directly. Everything it needs to know
//! about structure, declared attributes and visual state goes through
//! [`SlideTree`].

use std::fmt;
use serde::{Serialize, Deserialize};

/// Attributes a slide may declare
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideAttributes {
    /// Advance automatically after the dwell time
    pub auto_advance: bool,

    /// Selector for children to step through before moving on
    pub step_into: Option<String>,

    /// Reaching this slide ends the show
    pub end_marker: bool,

    /// Reference to the slide that backward navigation should go to
    pub back_target: Option<String>,
}

/// Visual state of a single slide
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VisualPhase {
    /// No slideshow styling at all
    #[default]
    Neutral,
    Hidden,
    /// Transitioning out
    Hiding,
    /// Transitioning in
    Showing,
    Visible,
}

impl VisualPhase {
    /// Whether a hide or show animation is running
    pub fn is_transitioning(self) -> bool {
        matches!(self, VisualPhase::Hiding | VisualPhase::Showing)
    }
}

/// Adapter over the tree of presentable nodes
pub trait SlideTree {
    /// Identity-comparable handle to a node
    type Slide: Clone + PartialEq + fmt::Debug;

    /// Handle to a focusable control inside a slide
    type Control: Clone + fmt::Debug;

    /// Slide to start from when none is given
    fn first_slide(&self) -> Option<Self::Slide>;

    /// Whether the handle refers to a node of this tree
    fn contains(&self, slide: &Self::Slide) -> bool;

    fn next_sibling(&self, slide: &Self::Slide) -> Option<Self::Slide>;

    fn previous_sibling(&self, slide: &Self::Slide) -> Option<Self::Slide>;

    /// Direct children of `slide` matching `selector`, in document order
    fn children_matching(&self, slide: &Self::Slide, selector: &str) -> Vec<Self::Slide>;

    fn attributes(&self, slide: &Self::Slide) -> SlideAttributes;

    /// Displayable text, used for dwell estimation
    fn text(&self, slide: &Self::Slide) -> String;

    /// Resolve a slide reference such as a back target
    fn resolve(&self, reference: &str) -> Option<Self::Slide>;

    /// First focusable control within `slide` (an input, else a button)
    fn focusable_descendant(&self, slide: &Self::Slide) -> Option<Self::Control>;

    fn focus(&mut self, control: &Self::Control);

    fn set_phase(&mut self, slide: &Self::Slide, phase: VisualPhase);

    fn phase(&self, slide: &Self::Slide) -> VisualPhase;
}
