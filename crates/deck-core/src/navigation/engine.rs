//! Navigation engine implementation

use std::sync::Arc;

use super::stack::{StackStep, StepIntoStack};
use super::{Direction, EngineState};
use crate::config::ShowConfig;
use crate::error::ShowError;
use crate::events::{DiscardEvents, EventSink, ShowEvent};
use crate::timer::{AutoAdvanceTimer, Scheduler, TimerTicket};
use crate::transition::{
    FirstFocusable, FocusPolicy, ListenerToken, NoFocus, Transition, TransitionHooks,
    TransitionOrchestrator,
};
use crate::tree::{SlideTree, VisualPhase};

/// Result of a navigation request
#[derive(Debug, Clone, PartialEq)]
pub enum NavigationOutcome<S> {
    /// A transition from `from` to `to` is now in flight
    Transitioning { from: S, to: S },
    /// There was nothing left to move to; the show ended in place
    Ended,
}

/// Navigation state stored internally
#[derive(Debug, Clone)]
struct NavigationState<S> {
    current: S,
    stack: StepIntoStack<S>,
    /// Step-into region of `current` not yet entered: selector and children
    deferred: Option<(String, Vec<S>)>,
}

enum Request<S> {
    Forward,
    Backward,
    Seek(S),
}

impl<S> Request<S> {
    fn direction(&self) -> Direction {
        match self {
            Request::Forward => Direction::Forward,
            Request::Backward => Direction::Backward,
            Request::Seek(_) => Direction::Seek,
        }
    }
}

/// Outcome of target resolution, applied only when the transition commits
struct Plan<S> {
    departure: S,
    target: Option<S>,
    stack: StepIntoStack<S>,
    revealed: Vec<S>,
}

/// The slideshow navigation engine
///
/// Owns the navigation state of one show over a [`SlideTree`]. All methods
/// run on the caller's thread; timers and animation completions come back
/// in through [`timer_fired`](Self::timer_fired) and
/// [`transition_finished`](Self::transition_finished).
pub struct Slideshow<T: SlideTree + 'static> {
    tree: T,
    config: ShowConfig,
    hooks: Box<dyn TransitionHooks<T::Slide>>,
    sink: Arc<dyn EventSink<T::Slide>>,
    focus: Box<dyn FocusPolicy<T>>,
    timer: AutoAdvanceTimer<T::Slide>,
    transitions: TransitionOrchestrator<T::Slide>,
    state: Option<NavigationState<T::Slide>>,
    participants: Vec<T::Slide>,
    /// Every slide whose visual phase the show has changed
    styled: Vec<T::Slide>,
    ended: bool,
}

impl<T: SlideTree + 'static> Slideshow<T> {
    /// Create a show over `tree`
    pub fn new(
        tree: T,
        hooks: impl TransitionHooks<T::Slide> + 'static,
        scheduler: impl Scheduler + 'static,
    ) -> Self {
        Self {
            tree,
            config: ShowConfig::default(),
            hooks: Box::new(hooks),
            sink: Arc::new(DiscardEvents),
            focus: Box::new(FirstFocusable),
            timer: AutoAdvanceTimer::new(Box::new(scheduler)),
            transitions: TransitionOrchestrator::new(),
            state: None,
            participants: Vec::new(),
            styled: Vec::new(),
            ended: false,
        }
    }

    pub fn with_config(mut self, config: ShowConfig) -> Self {
        self.config = config;
        self
    }

    /// Send events to `sink` instead of discarding them
    pub fn with_sink(mut self, sink: Arc<dyn EventSink<T::Slide>>) -> Self {
        self.sink = sink;
        self
    }

    /// Replace the focus policy; `focus_on_show = false` still disables it
    pub fn with_focus_policy(mut self, policy: impl FocusPolicy<T> + 'static) -> Self {
        self.focus = Box::new(policy);
        self
    }

    /// Start the show on `initial`, or on the tree's first slide
    pub fn start(&mut self, initial: Option<T::Slide>) -> Result<(), ShowError> {
        if self.state.is_some() {
            return Err(ShowError::AlreadyStarted);
        }
        self.config.validate()?;

        let slide = match initial {
            Some(slide) if self.tree.contains(&slide) => slide,
            Some(slide) => return Err(ShowError::InvalidStartSlide(format!("{slide:?}"))),
            None => self.tree.first_slide().ok_or(ShowError::NoSlides)?,
        };

        let stack = StepIntoStack::new();
        let deferred = self.deferred_entry(&slide, &stack);

        self.tree.set_phase(&slide, VisualPhase::Visible);
        self.mark_styled(&slide);
        if self.config.focus_on_show {
            self.focus.focus_on_show(&mut self.tree, &slide);
        }

        self.state = Some(NavigationState {
            current: slide.clone(),
            stack,
            deferred,
        });
        self.participants = vec![slide.clone()];
        self.ended = false;

        tracing::info!(slide = ?slide, "show started");
        self.dispatch(ShowEvent::Started { slide: slide.clone() });
        self.schedule_auto_advance(&slide);
        Ok(())
    }

    /// Navigate in `direction`, or to `seek_target` when one is given
    pub fn advance(
        &mut self,
        direction: Direction,
        seek_target: Option<T::Slide>,
    ) -> Result<NavigationOutcome<T::Slide>, ShowError> {
        let request = match (seek_target, direction) {
            (Some(target), _) => Request::Seek(target),
            (None, Direction::Forward) => Request::Forward,
            (None, Direction::Backward) => Request::Backward,
            (None, Direction::Seek) => {
                return Err(ShowError::InvalidSeekTarget("no target given".to_string()))
            }
        };
        self.navigate(request)
    }

    pub fn advance_forward(&mut self) -> Result<NavigationOutcome<T::Slide>, ShowError> {
        self.navigate(Request::Forward)
    }

    pub fn advance_backward(&mut self) -> Result<NavigationOutcome<T::Slide>, ShowError> {
        self.navigate(Request::Backward)
    }

    /// Jump to `target`, abandoning any nested step-into traversal
    pub fn seek(&mut self, target: T::Slide) -> Result<NavigationOutcome<T::Slide>, ShowError> {
        self.navigate(Request::Seek(target))
    }

    /// Report that the animation for `listener` completed
    ///
    /// Returns the newly current slide when this completes a transition.
    pub fn transition_finished(&mut self, listener: ListenerToken) -> Option<T::Slide> {
        let focus: &dyn FocusPolicy<T> = if self.config.focus_on_show {
            self.focus.as_ref()
        } else {
            &NoFocus
        };
        let completed =
            self.transitions
                .finish(listener, &mut self.tree, self.hooks.as_mut(), focus)?;
        Some(self.commit(completed))
    }

    /// Report that the auto-advance timer for `ticket` expired
    pub fn timer_fired(
        &mut self,
        ticket: TimerTicket,
    ) -> Result<Option<NavigationOutcome<T::Slide>>, ShowError> {
        let Some(slide) = self.timer.claim(ticket) else {
            tracing::debug!(ticket = ticket.id(), "stale auto-advance timer ignored");
            return Ok(None);
        };
        if self.current() != Some(&slide) {
            tracing::debug!(slide = ?slide, "auto-advance timer outlived its slide");
            return Ok(None);
        }

        tracing::debug!(slide = ?slide, "auto-advancing");
        self.navigate(Request::Forward).map(Some)
    }

    /// Cancel the timer and detach any pending completion listener
    pub fn stop(&mut self) {
        self.timer.cancel();
        if let Some(abandoned) = self.transitions.disarm() {
            tracing::debug!(slide = ?abandoned.target, "in-flight transition abandoned");
        }
        if self.state.take().is_some() {
            tracing::info!("show stopped");
            self.dispatch(ShowEvent::Stopped);
        }
    }

    /// Remove slideshow styling from `slide`, or from every slide the show
    /// has touched: participants, revealed step-into roots and departures
    pub fn cleanup(&mut self, slide: Option<&T::Slide>) {
        match slide {
            Some(slide) => self.tree.set_phase(slide, VisualPhase::Neutral),
            None => {
                for styled in &self.styled {
                    self.tree.set_phase(styled, VisualPhase::Neutral);
                }
            }
        }
    }

    pub fn current(&self) -> Option<&T::Slide> {
        self.state.as_ref().map(|state| &state.current)
    }

    /// Target of the in-flight transition
    pub fn pending(&self) -> Option<&T::Slide> {
        self.transitions.target()
    }

    pub fn engine_state(&self) -> EngineState {
        match (&self.state, self.transitions.is_busy()) {
            (None, _) => EngineState::Idle,
            (Some(_), true) => EngineState::Transitioning,
            (Some(_), false) => EngineState::Settled,
        }
    }

    pub fn is_transitioning(&self) -> bool {
        self.transitions.is_busy()
    }

    /// Whether the most recent navigation reached the end of the show
    pub fn has_ended(&self) -> bool {
        self.ended
    }

    pub fn stack(&self) -> Option<&StepIntoStack<T::Slide>> {
        self.state.as_ref().map(|state| &state.stack)
    }

    /// Number of active step-into frames
    pub fn depth(&self) -> usize {
        self.stack().map_or(0, |stack| stack.depth())
    }

    /// Every slide that has been current during this run, in order
    pub fn participants(&self) -> &[T::Slide] {
        &self.participants
    }

    pub fn pending_timer(&self) -> Option<TimerTicket> {
        self.timer.pending().map(|(ticket, _, _)| ticket)
    }

    /// Token of the animation phase currently awaited
    pub fn awaited_listener(&self) -> Option<ListenerToken> {
        self.transitions.listener()
    }

    pub fn tree(&self) -> &T {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut T {
        &mut self.tree
    }

    pub fn config(&self) -> &ShowConfig {
        &self.config
    }

    fn navigate(
        &mut self,
        request: Request<T::Slide>,
    ) -> Result<NavigationOutcome<T::Slide>, ShowError> {
        if self.transitions.is_busy() {
            return Err(ShowError::TransitionInFlight);
        }
        let state = self.state.as_ref().ok_or(ShowError::NotStarted)?;
        if let Request::Seek(target) = &request {
            if !self.tree.contains(target) {
                return Err(ShowError::InvalidSeekTarget(format!("{target:?}")));
            }
        }

        let current = state.current.clone();
        let direction = request.direction();
        let plan = self.plan(state, request);

        self.timer.cancel();

        let Some(target) = plan.target else {
            tracing::info!(slide = ?current, ?direction, "no slide left to move to");
            self.ended = true;
            self.dispatch(ShowEvent::Ended { last: current });
            return Ok(NavigationOutcome::Ended);
        };

        let ends = self.tree.attributes(&target).end_marker;
        let from = plan.departure.clone();
        self.mark_styled(&plan.departure);
        for root in &plan.revealed {
            self.mark_styled(root);
        }
        self.mark_styled(&target);
        tracing::debug!(from = ?from, to = ?target, ?direction, "transition requested");

        self.transitions.begin(
            Transition {
                departure: plan.departure,
                target: target.clone(),
                direction,
                stack: plan.stack,
                revealed: plan.revealed,
            },
            &mut self.tree,
            self.hooks.as_mut(),
        );

        self.ended = ends;
        if ends {
            self.dispatch(ShowEvent::Ended { last: target.clone() });
        }

        Ok(NavigationOutcome::Transitioning { from, to: target })
    }

    fn plan(
        &self,
        state: &NavigationState<T::Slide>,
        request: Request<T::Slide>,
    ) -> Plan<T::Slide> {
        let mut stack = state.stack.clone();
        let mut departure = state.current.clone();
        let mut revealed = Vec::new();
        let mut entered = false;

        let candidate = match request {
            Request::Seek(target) => {
                if let Some(root) = stack.reset_on_seek() {
                    departure = root;
                }
                Some(target)
            }
            Request::Forward => match &state.deferred {
                Some((selector, children)) => {
                    entered = true;
                    revealed.push(state.current.clone());
                    stack.enter(state.current.clone(), selector.as_str(), children.clone())
                }
                None => match stack.advance() {
                    StackStep::Child { child, exited } => {
                        if let Some(root) = exited {
                            departure = root;
                        }
                        Some(child)
                    }
                    StackStep::Exhausted { root } => {
                        let next = self.tree.next_sibling(&root);
                        departure = root;
                        next
                    }
                    StackStep::Empty => self.tree.next_sibling(&state.current),
                },
            },
            Request::Backward => {
                self.resolve_backward(&state.current, &mut stack, &mut departure)
            }
        };

        let target = match candidate {
            Some(slide) if !entered => Some(self.descend(slide, &mut stack, &mut revealed)),
            other => other,
        };

        Plan {
            departure,
            target,
            stack,
            revealed,
        }
    }

    /// Back target if declared, else previous sibling, skipping auto slides
    ///
    /// Frames the target lies outside of are dropped and their outermost
    /// root becomes the departing slide.
    fn resolve_backward(
        &self,
        current: &T::Slide,
        stack: &mut StepIntoStack<T::Slide>,
        departure: &mut T::Slide,
    ) -> Option<T::Slide> {
        let attributes = self.tree.attributes(current);
        let declared = attributes.back_target.as_deref().and_then(|reference| {
            let resolved = self.tree.resolve(reference);
            if resolved.is_none() {
                tracing::warn!(reference, "back target does not resolve, using previous sibling");
            }
            resolved
        });

        let mut candidate = declared.or_else(|| self.tree.previous_sibling(current));
        while let Some(slide) = &candidate {
            if !self.tree.attributes(slide).auto_advance {
                break;
            }
            tracing::debug!(slide = ?slide, "skipping auto-advance slide going backward");
            let previous = self.tree.previous_sibling(slide);
            candidate = previous;
        }

        if let Some(target) = &candidate {
            if let Some(root) = stack.retreat_to(target) {
                tracing::debug!(root = ?root, slide = ?target, "backward leaves step-into region");
                *departure = root;
            }
            stack.rewind_to(target);
        }
        candidate
    }

    /// Enter `slide`'s step-into region if it has one
    fn descend(
        &self,
        slide: T::Slide,
        stack: &mut StepIntoStack<T::Slide>,
        revealed: &mut Vec<T::Slide>,
    ) -> T::Slide {
        let Some(selector) = self.tree.attributes(&slide).step_into else {
            return slide;
        };
        let children = self.tree.children_matching(&slide, &selector);
        match stack.enter(slide.clone(), selector.as_str(), children) {
            Some(first) => {
                revealed.push(slide);
                first
            }
            None => {
                tracing::debug!(slide = ?slide, %selector, "step-into selector matches no children");
                slide
            }
        }
    }

    /// Step-into region to enter on the next forward move from `slide`
    fn deferred_entry(
        &self,
        slide: &T::Slide,
        stack: &StepIntoStack<T::Slide>,
    ) -> Option<(String, Vec<T::Slide>)> {
        if stack.is_root(slide) {
            return None;
        }
        let selector = self.tree.attributes(slide).step_into?;
        let children = self.tree.children_matching(slide, &selector);
        if children.is_empty() {
            tracing::debug!(slide = ?slide, %selector, "step-into selector matches no children");
            return None;
        }
        Some((selector, children))
    }

    fn commit(&mut self, transition: Transition<T::Slide>) -> T::Slide {
        let Transition {
            target,
            direction,
            stack,
            ..
        } = transition;

        let deferred = self.deferred_entry(&target, &stack);
        let depth = stack.depth();
        if let Some(state) = self.state.as_mut() {
            state.current = target.clone();
            state.stack = stack;
            state.deferred = deferred;
        }

        tracing::info!(slide = ?target, ?direction, depth, "advanced");
        self.dispatch(ShowEvent::Advanced {
            slide: target.clone(),
            direction,
        });
        self.participants.push(target.clone());
        self.schedule_auto_advance(&target);
        target
    }

    fn schedule_auto_advance(&mut self, slide: &T::Slide) {
        if !self.config.auto_advance || !self.tree.attributes(slide).auto_advance {
            return;
        }
        let delay = self.config.dwell.estimate(&self.tree.text(slide));
        let ticket = self.timer.schedule_for(slide.clone(), delay);
        tracing::debug!(
            slide = ?slide,
            delay_ms = delay.as_millis() as u64,
            ticket = ticket.id(),
            "auto-advance scheduled"
        );
    }

    fn mark_styled(&mut self, slide: &T::Slide) {
        if !self.styled.contains(slide) {
            self.styled.push(slide.clone());
        }
    }

    /// Deliver an event, falling back to the sink's secondary path on failure
    fn dispatch(&self, event: ShowEvent<T::Slide>) {
        if let Err(err) = self.sink.emit(&event) {
            tracing::warn!(error = %err, kind = ?event.kind(), "event dispatch failed, using fallback");
            self.sink.emit_fallback(&event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use parking_lot::Mutex;
    use crate::deck::{ControlKind, Deck, DeckSpec, SlideId, SlideSpec};
    use crate::error::DispatchError;
    use crate::events::{EventBus, ShowEventKind, handler_from_fn};
    use crate::timer::ManualScheduler;
    use crate::transition::RecordedTransitions;

    struct Harness {
        show: Slideshow<Deck>,
        hooks: RecordedTransitions<SlideId>,
        clock: ManualScheduler,
        events: Arc<Mutex<Vec<ShowEvent<SlideId>>>>,
    }

    impl Harness {
        fn new(slides: Vec<SlideSpec>) -> Self {
            let deck = Deck::from_spec(DeckSpec { slides }).unwrap();
            let hooks = RecordedTransitions::new();
            let clock = ManualScheduler::new();
            let bus = Arc::new(EventBus::new());
            let events = Arc::new(Mutex::new(Vec::new()));
            for kind in [ShowEventKind::Started, ShowEventKind::Advanced, ShowEventKind::Ended, ShowEventKind::Stopped] {
                let log = events.clone();
                bus.subscribe(
                    kind,
                    handler_from_fn(move |event: &ShowEvent<SlideId>| {
                        log.lock().push(event.clone());
                        Ok(())
                    }),
                );
            }
            let show = Slideshow::new(deck, hooks.clone(), clock.clone()).with_sink(bus);
            Self { show, hooks, clock, events }
        }

        fn id(&self, key: &str) -> SlideId {
            self.show.tree().id(key).unwrap()
        }

        fn key(&self, id: SlideId) -> String {
            self.show.tree().key(id).unwrap().to_string()
        }

        fn current(&self) -> String {
            self.key(*self.show.current().unwrap())
        }

        /// Complete every queued animation phase
        fn settle(&mut self) {
            while let Some(request) = self.hooks.take_next() {
                self.show.transition_finished(request.listener);
            }
        }

        fn forward(&mut self) -> String {
            self.show.advance_forward().unwrap();
            self.settle();
            self.current()
        }

        fn backward(&mut self) -> String {
            self.show.advance_backward().unwrap();
            self.settle();
            self.current()
        }

        fn ended_count(&self) -> usize {
            self.events
                .lock()
                .iter()
                .filter(|event| matches!(event, ShowEvent::Ended { .. }))
                .count()
        }
    }

    fn plain(keys: &[&str]) -> Vec<SlideSpec> {
        keys.iter().map(|key| SlideSpec::new(*key)).collect()
    }

    #[test]
    fn test_start_defaults_to_first_slide() {
        let mut h = Harness::new(plain(&["a", "b"]));
        h.show.start(None).unwrap();
        assert_eq!(h.current(), "a");
        assert_eq!(h.show.engine_state(), EngineState::Settled);
        assert_eq!(h.show.tree().phase(&h.id("a")), VisualPhase::Visible);
        assert_eq!(*h.events.lock(), vec![ShowEvent::Started { slide: h.id("a") }]);
        assert!(matches!(h.show.start(None), Err(ShowError::AlreadyStarted)));
    }

    #[test]
    fn test_navigation_before_start() {
        let mut h = Harness::new(plain(&["a"]));
        assert!(matches!(h.show.advance_forward(), Err(ShowError::NotStarted)));
        assert_eq!(h.show.engine_state(), EngineState::Idle);
    }

    #[test]
    fn test_forward_follows_sibling_chain() {
        let mut h = Harness::new(plain(&["a", "b", "c"]));
        h.show.start(None).unwrap();
        assert_eq!(h.forward(), "b");
        assert_eq!(h.forward(), "c");
        assert_eq!(h.show.participants().len(), 3);

        assert_eq!(h.show.advance_forward().unwrap(), NavigationOutcome::Ended);
        assert!(h.show.has_ended());
        assert!(h.hooks.is_empty());
        assert_eq!(h.current(), "c");
    }

    #[test]
    fn test_end_marker_emits_ended_and_still_transitions() {
        let mut h = Harness::new(vec![SlideSpec::new("a"), SlideSpec::new("b").end()]);
        h.show.start(None).unwrap();
        h.show.advance_forward().unwrap();
        assert_eq!(h.ended_count(), 1);
        assert!(h.show.is_transitioning());
        h.settle();
        assert_eq!(h.current(), "b");

        let kinds: Vec<_> = h.events.lock().iter().map(|event| event.kind()).collect();
        assert_eq!(
            kinds,
            vec![ShowEventKind::Started, ShowEventKind::Ended, ShowEventKind::Advanced]
        );
    }

    #[test]
    fn test_commit_waits_for_both_phases() {
        let mut h = Harness::new(plain(&["a", "b"]));
        h.show.start(None).unwrap();
        let outcome = h.show.advance_forward().unwrap();
        assert_eq!(
            outcome,
            NavigationOutcome::Transitioning { from: h.id("a"), to: h.id("b") }
        );
        assert_eq!(h.show.pending(), Some(&h.id("b")));

        let hide = h.hooks.take_next().unwrap();
        assert!(h.show.transition_finished(hide.listener).is_none());
        assert_eq!(h.current(), "a");
        assert_eq!(h.show.engine_state(), EngineState::Transitioning);

        let show = h.hooks.take_next().unwrap();
        assert_eq!(h.show.transition_finished(show.listener), Some(h.id("b")));
        assert_eq!(h.show.transition_finished(show.listener), None);
        assert_eq!(h.show.participants().len(), 2);
        assert_eq!(h.show.pending(), None);
    }

    #[test]
    fn test_advance_rejected_mid_transition() {
        let mut h = Harness::new(plain(&["a", "b", "c"]));
        h.show.start(None).unwrap();
        h.show.advance_forward().unwrap();
        assert!(matches!(h.show.advance_forward(), Err(ShowError::TransitionInFlight)));
        h.settle();
        assert_eq!(h.current(), "b");
    }

    #[test]
    fn test_step_into_round_trip() {
        let mut h = Harness::new(vec![
            SlideSpec::new("intro"),
            SlideSpec::new("list").step_into(
                "li",
                vec![
                    SlideSpec::new("one").tag("li"),
                    SlideSpec::new("two").tag("li"),
                    SlideSpec::new("three").tag("li"),
                ],
            ),
            SlideSpec::new("after"),
        ]);
        h.show.start(None).unwrap();

        assert_eq!(h.forward(), "one");
        assert_eq!(h.show.depth(), 1);
        assert_eq!(h.show.tree().phase(&h.id("list")), VisualPhase::Visible);
        assert_eq!(h.forward(), "two");
        assert_eq!(h.forward(), "three");
        assert_eq!(h.forward(), "after");
        assert_eq!(h.show.depth(), 0);
        assert_eq!(h.show.tree().phase(&h.id("list")), VisualPhase::Hidden);
    }

    #[test]
    fn test_nested_step_into_exhausts_inner_first() {
        let mut h = Harness::new(vec![
            SlideSpec::new("start"),
            SlideSpec::new("p").step_into(
                "*",
                vec![
                    SlideSpec::new("a").step_into(
                        "*",
                        vec![SlideSpec::new("a1"), SlideSpec::new("a2")],
                    ),
                    SlideSpec::new("b"),
                ],
            ),
            SlideSpec::new("next"),
        ]);
        h.show.start(None).unwrap();

        let mut visited = Vec::new();
        loop {
            let slide = h.forward();
            if slide == "next" {
                break;
            }
            visited.push(slide);
        }
        assert_eq!(visited, vec!["a", "a1", "a2", "b"]);
        assert_eq!(h.show.depth(), 0);
    }

    #[test]
    fn test_empty_selector_is_plain_slide() {
        let mut h = Harness::new(vec![
            SlideSpec::new("a"),
            SlideSpec::new("b").step_into("missing", vec![SlideSpec::new("child")]),
            SlideSpec::new("c"),
        ]);
        h.show.start(None).unwrap();
        assert_eq!(h.forward(), "b");
        assert_eq!(h.show.depth(), 0);
        assert_eq!(h.forward(), "c");
    }

    #[test]
    fn test_backward_skips_auto_slides() {
        let mut h = Harness::new(vec![
            SlideSpec::new("a"),
            SlideSpec::new("auto1").auto(),
            SlideSpec::new("auto2").auto(),
            SlideSpec::new("d"),
        ]);
        h.show.start(h.show.tree().id("d")).unwrap();
        assert_eq!(h.backward(), "a");
    }

    #[test]
    fn test_backward_with_only_auto_slides_behind_ends() {
        let mut h = Harness::new(vec![SlideSpec::new("auto").auto(), SlideSpec::new("b")]);
        h.show.start(h.show.tree().id("b")).unwrap();
        assert_eq!(h.show.advance_backward().unwrap(), NavigationOutcome::Ended);
        assert_eq!(h.current(), "b");
    }

    #[test]
    fn test_backward_prefers_back_target() {
        let mut h = Harness::new(vec![
            SlideSpec::new("home"),
            SlideSpec::new("middle"),
            SlideSpec::new("leaf").back("#home"),
        ]);
        h.show.start(h.show.tree().id("leaf")).unwrap();
        assert_eq!(h.backward(), "home");
    }

    #[test]
    fn test_auto_back_target_walks_its_own_siblings() {
        let mut h = Harness::new(vec![
            SlideSpec::new("before"),
            SlideSpec::new("auto").auto(),
            SlideSpec::new("middle"),
            SlideSpec::new("leaf").back("#auto"),
        ]);
        h.show.start(h.show.tree().id("leaf")).unwrap();
        assert_eq!(h.backward(), "before");
    }

    #[test]
    fn test_back_target_outside_region_leaves_it() {
        let mut h = Harness::new(vec![
            SlideSpec::new("home"),
            SlideSpec::new("mid"),
            SlideSpec::new("p").step_into(
                "*",
                vec![SlideSpec::new("x"), SlideSpec::new("y").back("home")],
            ),
            SlideSpec::new("after"),
        ]);
        h.show.start(h.show.tree().id("p")).unwrap();
        assert_eq!(h.forward(), "x");
        assert_eq!(h.forward(), "y");
        assert_eq!(h.show.depth(), 1);

        let outcome = h.show.advance_backward().unwrap();
        assert_eq!(
            outcome,
            NavigationOutcome::Transitioning { from: h.id("p"), to: h.id("home") }
        );
        h.settle();
        assert_eq!(h.current(), "home");
        assert_eq!(h.show.depth(), 0);
        assert_eq!(h.show.tree().phase(&h.id("p")), VisualPhase::Hidden);

        assert_eq!(h.forward(), "mid");
        assert_eq!(h.forward(), "x");
    }

    #[test]
    fn test_backward_inside_region_requeues() {
        let mut h = Harness::new(vec![
            SlideSpec::new("p").step_into(
                "*",
                vec![SlideSpec::new("x"), SlideSpec::new("y"), SlideSpec::new("z")],
            ),
            SlideSpec::new("q"),
        ]);
        h.show.start(None).unwrap();
        assert_eq!(h.forward(), "x");
        assert_eq!(h.forward(), "y");
        assert_eq!(h.backward(), "x");
        assert_eq!(h.forward(), "y");
        assert_eq!(h.forward(), "z");
        assert_eq!(h.forward(), "q");
    }

    #[test]
    fn test_seek_clears_nested_frames() {
        let mut h = Harness::new(vec![
            SlideSpec::new("p").step_into(
                "*",
                vec![
                    SlideSpec::new("a").step_into(
                        "*",
                        vec![SlideSpec::new("a1"), SlideSpec::new("a2")],
                    ),
                    SlideSpec::new("b"),
                ],
            ),
            SlideSpec::new("x"),
        ]);
        h.show.start(None).unwrap();
        assert_eq!(h.forward(), "a");
        assert_eq!(h.forward(), "a1");
        assert_eq!(h.show.depth(), 2);

        let x = h.id("x");
        let outcome = h.show.seek(x).unwrap();
        assert_eq!(outcome, NavigationOutcome::Transitioning { from: h.id("p"), to: x });
        h.settle();
        assert_eq!(h.current(), "x");
        assert_eq!(h.show.depth(), 0);
        assert_eq!(h.show.tree().phase(&h.id("p")), VisualPhase::Hidden);
    }

    #[test]
    fn test_seek_to_unknown_slide_is_rejected() {
        let mut h = Harness::new(plain(&["a", "b"]));
        h.show.start(None).unwrap();
        let bogus = Deck::from_spec(DeckSpec { slides: plain(&["1", "2", "3", "4"]) })
            .unwrap()
            .id("4")
            .unwrap();
        assert!(matches!(h.show.seek(bogus), Err(ShowError::InvalidSeekTarget(_))));
        assert_eq!(h.current(), "a");
        assert!(!h.show.is_transitioning());
    }

    #[test]
    fn test_auto_slide_advances_after_dwell() {
        let mut h = Harness::new(vec![
            SlideSpec::new("a").text("Hello world").auto(),
            SlideSpec::new("b"),
        ]);
        h.show.start(None).unwrap();
        let ticket = h.show.pending_timer().unwrap();

        assert!(h.clock.advance(Duration::from_millis(1689)).is_empty());
        assert_eq!(h.clock.advance(Duration::from_millis(1)), vec![ticket]);

        assert!(h.show.timer_fired(ticket).unwrap().is_some());
        h.settle();
        assert_eq!(h.current(), "b");
        assert!(h.show.pending_timer().is_none());
    }

    #[test]
    fn test_manual_advance_cancels_timer() {
        let mut h = Harness::new(vec![
            SlideSpec::new("a").text("Hello world").auto(),
            SlideSpec::new("b"),
            SlideSpec::new("c"),
        ]);
        h.show.start(None).unwrap();
        let ticket = h.show.pending_timer().unwrap();

        assert_eq!(h.forward(), "b");
        assert!(h.clock.advance(Duration::from_secs(60)).is_empty());
        // even a late delivery of the old ticket has no effect
        assert_eq!(h.show.timer_fired(ticket).unwrap(), None);
        assert_eq!(h.current(), "b");
    }

    #[test]
    fn test_auto_advance_switch() {
        let deck = Deck::from_spec(DeckSpec {
            slides: vec![SlideSpec::new("a").auto(), SlideSpec::new("b")],
        })
        .unwrap();
        let clock = ManualScheduler::new();
        let config = ShowConfig { auto_advance: false, ..ShowConfig::default() };
        let mut show = Slideshow::new(deck, RecordedTransitions::new(), clock.clone()).with_config(config);
        show.start(None).unwrap();
        assert!(show.pending_timer().is_none());
        assert_eq!(clock.pending(), 0);
    }

    #[test]
    fn test_stepping_into_current_slide_keeps_it_visible() {
        let mut h = Harness::new(vec![
            SlideSpec::new("p").step_into("*", vec![SlideSpec::new("x"), SlideSpec::new("y")]),
        ]);
        h.show.start(None).unwrap();
        assert_eq!(h.forward(), "x");
        assert_eq!(h.show.tree().phase(&h.id("p")), VisualPhase::Visible);
        assert_eq!(h.forward(), "y");
        assert_eq!(h.show.advance_forward().unwrap(), NavigationOutcome::Ended);
    }

    #[test]
    fn test_focus_moves_into_shown_slide() {
        let mut h = Harness::new(vec![
            SlideSpec::new("a"),
            SlideSpec::new("form")
                .control(ControlKind::Button, "send")
                .control(ControlKind::Input, "email"),
        ]);
        h.show.start(None).unwrap();
        assert!(h.show.tree().focused().is_none());
        h.forward();
        assert_eq!(h.show.tree().focused().map(|c| c.name.as_str()), Some("email"));
    }

    #[test]
    fn test_failed_dispatch_does_not_halt_navigation() {
        let deck = Deck::from_spec(DeckSpec { slides: plain(&["a", "b"]) }).unwrap();
        let hooks = RecordedTransitions::new();
        let bus = Arc::new(EventBus::new());
        bus.subscribe(
            ShowEventKind::Advanced,
            handler_from_fn(|_event: &ShowEvent<SlideId>| {
                Err(DispatchError::Unavailable("observer gone".to_string()))
            }),
        );
        let mut show = Slideshow::new(deck, hooks.clone(), ManualScheduler::new()).with_sink(bus.clone());
        show.start(None).unwrap();
        show.advance_forward().unwrap();
        while let Some(request) = hooks.take_next() {
            show.transition_finished(request.listener);
        }

        assert_eq!(show.current(), show.tree().id("b").as_ref());
        let undelivered = bus.drain_undelivered();
        assert_eq!(undelivered.len(), 1);
        assert_eq!(undelivered[0].event.kind(), ShowEventKind::Advanced);
    }

    #[test]
    fn test_stop_detaches_listeners() {
        let mut h = Harness::new(vec![SlideSpec::new("a").auto(), SlideSpec::new("b")]);
        h.show.start(None).unwrap();
        h.show.advance_forward().unwrap();
        let hide = h.hooks.take_next().unwrap();

        h.show.stop();
        assert_eq!(h.show.engine_state(), EngineState::Idle);
        assert!(h.show.transition_finished(hide.listener).is_none());
        assert_eq!(h.clock.pending(), 0);
        assert_eq!(h.events.lock().last(), Some(&ShowEvent::Stopped));

        h.show.stop();
        let stops = h.events.lock().iter().filter(|e| **e == ShowEvent::Stopped).count();
        assert_eq!(stops, 1);
    }

    #[test]
    fn test_cleanup_is_idempotent() {
        let mut h = Harness::new(plain(&["a", "b", "c"]));
        h.show.start(None).unwrap();
        h.forward();
        h.forward();
        h.show.cleanup(None);
        let once: Vec<_> = ["a", "b", "c"].iter().map(|k| h.show.tree().phase(&h.id(k))).collect();
        h.show.cleanup(None);
        let twice: Vec<_> = ["a", "b", "c"].iter().map(|k| h.show.tree().phase(&h.id(k))).collect();
        assert_eq!(once, twice);
        assert!(once.iter().all(|phase| *phase == VisualPhase::Neutral));
    }

    #[test]
    fn test_cleanup_neutralizes_revealed_roots() {
        let mut h = Harness::new(vec![
            SlideSpec::new("intro"),
            SlideSpec::new("list").step_into("*", vec![SlideSpec::new("one"), SlideSpec::new("two")]),
        ]);
        h.show.start(None).unwrap();
        assert_eq!(h.forward(), "one");
        assert_eq!(h.show.tree().phase(&h.id("list")), VisualPhase::Visible);

        h.show.cleanup(None);
        for key in ["intro", "list", "one"] {
            assert_eq!(h.show.tree().phase(&h.id(key)), VisualPhase::Neutral, "{key}");
        }
        let keys: Vec<_> = h.show.participants().iter().map(|id| h.key(*id)).collect();
        assert_eq!(keys, vec!["intro", "one"]);
    }

    #[test]
    fn test_cleanup_after_stop_mid_transition() {
        let mut h = Harness::new(plain(&["a", "b"]));
        h.show.start(None).unwrap();
        h.show.advance_forward().unwrap();
        let hide = h.hooks.take_next().unwrap();
        h.show.transition_finished(hide.listener);
        assert_eq!(h.show.tree().phase(&h.id("b")), VisualPhase::Showing);

        h.show.stop();
        h.show.cleanup(None);
        assert_eq!(h.show.tree().phase(&h.id("b")), VisualPhase::Neutral);
        assert_eq!(h.show.participants().len(), 1);
    }

    #[test]
    fn test_cleanup_single_slide() {
        let mut h = Harness::new(plain(&["a", "b"]));
        h.show.start(None).unwrap();
        h.forward();
        let b = h.id("b");
        h.show.cleanup(Some(&b));
        assert_eq!(h.show.tree().phase(&b), VisualPhase::Neutral);
        assert_eq!(h.show.tree().phase(&h.id("a")), VisualPhase::Hidden);
    }

    #[test]
    fn test_participants_record_revisits() {
        let mut h = Harness::new(plain(&["a", "b"]));
        h.show.start(None).unwrap();
        h.forward();
        h.backward();
        h.forward();
        let keys: Vec<_> = h.show.participants().iter().map(|id| h.key(*id)).collect();
        assert_eq!(keys, vec!["a", "b", "a", "b"]);
    }
}
