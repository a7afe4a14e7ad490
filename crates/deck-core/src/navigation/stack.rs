//! Step-into stack
//!
//! Each frame tracks the children of one step-into root. Frames nest: a
//! child being stepped through may itself declare a step-into selector and
//! push a frame of its own on top.

use std::collections::VecDeque;

/// Traversal state for one step-into root
#[derive(Debug, Clone, PartialEq)]
pub struct StepIntoFrame<S> {
    root: S,
    selector: String,
    visited: Vec<S>,
    remaining: VecDeque<S>,
}

impl<S: Clone + PartialEq> StepIntoFrame<S> {
    /// The parent whose children are being stepped through
    pub fn root(&self) -> &S {
        &self.root
    }

    pub fn selector(&self) -> &str {
        &self.selector
    }

    /// Children not yet visited, in order
    pub fn remaining(&self) -> impl Iterator<Item = &S> {
        self.remaining.iter()
    }

    /// Children already handed out, the current one last
    pub fn visited(&self) -> &[S] {
        &self.visited
    }

    /// Whether `slide` is one of this frame's children
    pub fn contains(&self, slide: &S) -> bool {
        self.visited.contains(slide) || self.remaining.contains(slide)
    }
}

/// Result of moving forward through the stack
#[derive(Debug, Clone, PartialEq)]
pub enum StackStep<S> {
    /// The next child of an active frame.
    /// `exited` is the outermost root popped on the way, if any.
    Child { child: S, exited: Option<S> },
    /// Every frame was exhausted; traversal resumes after `root`
    Exhausted { root: S },
    /// No frames were active
    Empty,
}

/// LIFO stack of step-into frames
#[derive(Debug, Clone, PartialEq)]
pub struct StepIntoStack<S> {
    frames: Vec<StepIntoFrame<S>>,
}

impl<S> Default for StepIntoStack<S> {
    fn default() -> Self {
        Self { frames: Vec::new() }
    }
}

impl<S: Clone + PartialEq> StepIntoStack<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// The active frame
    pub fn top(&self) -> Option<&StepIntoFrame<S>> {
        self.frames.last()
    }

    pub fn frames(&self) -> &[StepIntoFrame<S>] {
        &self.frames
    }

    /// Whether `slide` is the root of any active frame
    pub fn is_root(&self, slide: &S) -> bool {
        self.frames.iter().any(|frame| frame.root == *slide)
    }

    /// Root of the bottom frame
    pub fn outermost_root(&self) -> Option<&S> {
        self.frames.first().map(|frame| &frame.root)
    }

    /// Start stepping through `children` of `root`
    ///
    /// Returns the first child, which becomes the immediate target. With no
    /// children nothing is pushed and `None` is returned. Entering a root that
    /// is already on the stack restarts it, dropping that frame and every
    /// frame above it.
    pub fn enter(&mut self, root: S, selector: impl Into<String>, children: Vec<S>) -> Option<S> {
        let mut remaining = VecDeque::from(children);
        let first = remaining.pop_front()?;

        if let Some(position) = self.frames.iter().position(|frame| frame.root == root) {
            self.frames.truncate(position);
        }

        self.frames.push(StepIntoFrame {
            root,
            selector: selector.into(),
            visited: vec![first.clone()],
            remaining,
        });
        Some(first)
    }

    /// Hand out the next child, popping exhausted frames on the way
    pub fn advance(&mut self) -> StackStep<S> {
        let mut exited = None;

        while let Some(frame) = self.frames.last_mut() {
            if let Some(child) = frame.remaining.pop_front() {
                frame.visited.push(child.clone());
                return StackStep::Child { child, exited };
            }

            if let Some(frame) = self.frames.pop() {
                exited = Some(frame.root);
            }
        }

        match exited {
            Some(root) => StackStep::Exhausted { root },
            None => StackStep::Empty,
        }
    }

    /// Move back to an already visited child of the active frame
    ///
    /// Children visited after `target` are queued again in their original
    /// order. Returns false, leaving the stack untouched, when `target` is
    /// not a visited child of the active frame.
    pub fn rewind_to(&mut self, target: &S) -> bool {
        let Some(frame) = self.frames.last_mut() else {
            return false;
        };
        let Some(position) = frame.visited.iter().position(|s| s == target) else {
            return false;
        };

        let requeue = frame.visited.split_off(position + 1);
        for slide in requeue.into_iter().rev() {
            frame.remaining.push_front(slide);
        }
        true
    }

    /// Drop the frames `target` lies outside of
    ///
    /// A frame is kept while `target` is one of its children or lies inside
    /// a frame nested above it. Returns the outermost root dropped, if any.
    pub fn retreat_to(&mut self, target: &S) -> Option<S> {
        let keep = self
            .frames
            .iter()
            .rposition(|frame| frame.contains(target))
            .map_or(0, |position| position + 1);
        let exited = self.frames.get(keep).map(|frame| frame.root.clone());
        self.frames.truncate(keep);
        exited
    }

    /// Abandon all nested traversal, returning the outermost root
    pub fn reset_on_seek(&mut self) -> Option<S> {
        let root = self.frames.first().map(|frame| frame.root.clone());
        self.frames.clear();
        root
    }
}
