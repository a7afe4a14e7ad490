//! Two-phase hide/show transitions
//!
//! A transition first hides the departing slide, then shows the target.
//! Each phase hands the renderer a fresh [`ListenerToken`]; the renderer
//! reports completion with that token exactly once. A token is consumed the
//! moment it is accepted, so a repeated or late signal is ignored.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use parking_lot::Mutex;

use crate::navigation::{Direction, StepIntoStack};
use crate::tree::{SlideTree, VisualPhase};

/// One-shot completion listener for a single animation phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerToken(u64);

impl ListenerToken {
    pub fn id(self) -> u64 {
        self.0
    }
}

/// Phase of an in-flight transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransitionPhase {
    Hiding,
    Showing,
}

/// Visual hooks implemented by the rendering collaborator
///
/// Each call must eventually be answered by exactly one
/// [`Slideshow::transition_finished`](crate::Slideshow::transition_finished)
/// with the given token. `begin_show` may defer the animation to the
/// renderer's next frame.
pub trait TransitionHooks<S> {
    fn begin_hide(&mut self, slide: &S, listener: ListenerToken);

    fn begin_show(&mut self, slide: &S, listener: ListenerToken);
}

/// Where input focus goes when a slide starts showing
pub trait FocusPolicy<T: SlideTree> {
    fn focus_on_show(&self, tree: &mut T, slide: &T::Slide);
}

/// Focus the first input in the slide, else its first button
#[derive(Debug, Default, Clone, Copy)]
pub struct FirstFocusable;

impl<T: SlideTree> FocusPolicy<T> for FirstFocusable {
    fn focus_on_show(&self, tree: &mut T, slide: &T::Slide) {
        if let Some(control) = tree.focusable_descendant(slide) {
            tracing::trace!(?control, "moving focus");
            tree.focus(&control);
        }
    }
}

/// Leave focus alone, for hosts without a notion of focus
#[derive(Debug, Default, Clone, Copy)]
pub struct NoFocus;

impl<T: SlideTree> FocusPolicy<T> for NoFocus {
    fn focus_on_show(&self, _tree: &mut T, _slide: &T::Slide) {}
}

/// Everything a transition carries until it commits
#[derive(Debug, Clone)]
pub struct Transition<S> {
    /// Slide being hidden
    pub departure: S,
    /// Slide being shown
    pub target: S,
    pub direction: Direction,
    /// Step-into stack to install on commit
    pub stack: StepIntoStack<S>,
    /// Step-into roots entered by this move, revealed with the target
    pub revealed: Vec<S>,
}

#[derive(Debug)]
struct ActiveTransition<S> {
    transition: Transition<S>,
    phase: TransitionPhase,
    listener: ListenerToken,
}

/// Drives the hide/show handshake for one transition at a time
#[derive(Debug)]
pub struct TransitionOrchestrator<S> {
    last_listener: u64,
    active: Option<ActiveTransition<S>>,
}

impl<S> Default for TransitionOrchestrator<S> {
    fn default() -> Self {
        Self {
            last_listener: 0,
            active: None,
        }
    }
}

impl<S: Clone + PartialEq + fmt::Debug> TransitionOrchestrator<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_busy(&self) -> bool {
        self.active.is_some()
    }

    pub fn phase(&self) -> Option<TransitionPhase> {
        self.active.as_ref().map(|active| active.phase)
    }

    /// Slide the in-flight transition is heading to
    pub fn target(&self) -> Option<&S> {
        self.active.as_ref().map(|active| &active.transition.target)
    }

    /// Token the orchestrator is currently waiting for
    pub fn listener(&self) -> Option<ListenerToken> {
        self.active.as_ref().map(|active| active.listener)
    }

    /// Start the hide phase on the departing slide
    pub fn begin<T>(
        &mut self,
        transition: Transition<S>,
        tree: &mut T,
        hooks: &mut dyn TransitionHooks<S>,
    ) -> ListenerToken
    where
        T: SlideTree<Slide = S>,
    {
        self.last_listener += 1;
        let listener = ListenerToken(self.last_listener);

        tree.set_phase(&transition.departure, VisualPhase::Hiding);
        hooks.begin_hide(&transition.departure, listener);

        self.active = Some(ActiveTransition {
            transition,
            phase: TransitionPhase::Hiding,
            listener,
        });
        listener
    }

    /// Accept a completion signal
    ///
    /// Finishing the hide phase starts the show phase and returns `None`.
    /// Finishing the show phase returns the completed transition, ready to
    /// commit. Unknown or already consumed tokens are ignored.
    pub fn finish<T>(
        &mut self,
        listener: ListenerToken,
        tree: &mut T,
        hooks: &mut dyn TransitionHooks<S>,
        focus: &dyn FocusPolicy<T>,
    ) -> Option<Transition<S>>
    where
        T: SlideTree<Slide = S>,
    {
        let Some(active) = self.active.as_mut() else {
            tracing::debug!(listener = listener.0, "completion signal with no transition in flight");
            return None;
        };
        if active.listener != listener {
            tracing::debug!(
                listener = listener.0,
                expected = active.listener.0,
                "stale completion signal ignored"
            );
            return None;
        }

        match active.phase {
            TransitionPhase::Hiding => {
                let transition = &active.transition;
                tree.set_phase(&transition.departure, VisualPhase::Hidden);
                for root in &transition.revealed {
                    tree.set_phase(root, VisualPhase::Visible);
                }
                tree.set_phase(&transition.target, VisualPhase::Showing);
                focus.focus_on_show(tree, &transition.target);

                self.last_listener += 1;
                let next = ListenerToken(self.last_listener);
                active.phase = TransitionPhase::Showing;
                active.listener = next;
                hooks.begin_show(&active.transition.target, next);
                None
            }
            TransitionPhase::Showing => {
                tree.set_phase(&active.transition.target, VisualPhase::Visible);
                self.active.take().map(|active| active.transition)
            }
        }
    }

    /// Detach the pending listener and drop the in-flight transition
    pub fn disarm(&mut self) -> Option<Transition<S>> {
        self.active.take().map(|active| active.transition)
    }
}

/// A hide or show request captured by [`RecordedTransitions`]
#[derive(Debug, Clone, PartialEq)]
pub struct HookRequest<S> {
    pub phase: TransitionPhase,
    pub slide: S,
    pub listener: ListenerToken,
}

/// Hooks that queue every request for the host to complete later
///
/// Clones share the same queue, so a host can hand one clone to the show
/// and poll the other.
pub struct RecordedTransitions<S> {
    requests: Arc<Mutex<VecDeque<HookRequest<S>>>>,
}

impl<S> Clone for RecordedTransitions<S> {
    fn clone(&self) -> Self {
        Self {
            requests: self.requests.clone(),
        }
    }
}

impl<S> Default for RecordedTransitions<S> {
    fn default() -> Self {
        Self {
            requests: Arc::new(Mutex::new(VecDeque::new())),
        }
    }
}

impl<S> RecordedTransitions<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Oldest request not yet taken
    pub fn take_next(&self) -> Option<HookRequest<S>> {
        self.requests.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.lock().is_empty()
    }
}

impl<S: Clone> TransitionHooks<S> for RecordedTransitions<S> {
    fn begin_hide(&mut self, slide: &S, listener: ListenerToken) {
        self.requests.lock().push_back(HookRequest {
            phase: TransitionPhase::Hiding,
            slide: slide.clone(),
            listener,
        });
    }

    fn begin_show(&mut self, slide: &S, listener: ListenerToken) {
        self.requests.lock().push_back(HookRequest {
            phase: TransitionPhase::Showing,
            slide: slide.clone(),
            listener,
        });
    }
}
