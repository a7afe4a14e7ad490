//! In-memory slide deck
//!
//! A [`Deck`] is a concrete [`SlideTree`] built from a serializable
//! [`DeckSpec`]. Slides are addressed by [`SlideId`] handles; string ids
//! from the description are kept in an index for reference resolution.

use std::path::Path;
use indexmap::IndexMap;
use serde::{Serialize, Deserialize};

use crate::error::DeckError;
use crate::tree::{SlideAttributes, SlideTree, VisualPhase};

/// Selector that matches every direct child
pub const ANY_CHILD: &str = "*";

/// Handle to a slide in a [`Deck`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlideId(usize);

impl SlideId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Kind of focusable control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlKind {
    Input,
    Button,
}

/// Description of a focusable control
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlSpec {
    pub kind: ControlKind,
    pub name: String,
}

/// Description of one slide and its children
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlideSpec {
    /// Unique id; generated when empty
    pub id: String,
    /// Tags matched by step-into selectors
    pub tags: Vec<String>,
    pub text: String,
    pub auto: bool,
    pub step_into: Option<String>,
    pub end: bool,
    /// Id of the slide backward navigation goes to
    pub back: Option<String>,
    pub controls: Vec<ControlSpec>,
    pub children: Vec<SlideSpec>,
}

impl SlideSpec {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn auto(mut self) -> Self {
        self.auto = true;
        self
    }

    pub fn end(mut self) -> Self {
        self.end = true;
        self
    }

    pub fn back(mut self, reference: impl Into<String>) -> Self {
        self.back = Some(reference.into());
        self
    }

    pub fn control(mut self, kind: ControlKind, name: impl Into<String>) -> Self {
        self.controls.push(ControlSpec { kind, name: name.into() });
        self
    }

    /// Step through the children matching `selector`
    pub fn step_into(mut self, selector: impl Into<String>, children: Vec<SlideSpec>) -> Self {
        self.step_into = Some(selector.into());
        self.children.extend(children);
        self
    }

    pub fn child(mut self, child: SlideSpec) -> Self {
        self.children.push(child);
        self
    }
}

/// Description of a whole deck
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeckSpec {
    pub slides: Vec<SlideSpec>,
}

/// A focusable control located inside a slide
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Control {
    pub slide: SlideId,
    pub kind: ControlKind,
    pub name: String,
}

#[derive(Debug, Clone)]
struct Node {
    key: String,
    parent: Option<SlideId>,
    children: Vec<SlideId>,
    tags: Vec<String>,
    text: String,
    attributes: SlideAttributes,
    controls: Vec<ControlSpec>,
    phase: VisualPhase,
}

/// In-memory slide tree
#[derive(Debug, Clone)]
pub struct Deck {
    nodes: Vec<Node>,
    roots: Vec<SlideId>,
    index: IndexMap<String, SlideId>,
    focused: Option<Control>,
}

impl Deck {
    /// Build a deck from its description
    pub fn from_spec(spec: DeckSpec) -> Result<Self, DeckError> {
        if spec.slides.is_empty() {
            return Err(DeckError::Empty);
        }

        let mut deck = Self {
            nodes: Vec::new(),
            roots: Vec::new(),
            index: IndexMap::new(),
            focused: None,
        };

        for slide in spec.slides {
            let id = deck.insert(slide, None)?;
            deck.roots.push(id);
        }

        deck.check_references()?;
        Ok(deck)
    }

    /// Parse a deck description from JSON
    pub fn from_json_str(json: &str) -> Result<Self, DeckError> {
        let spec: DeckSpec = serde_json::from_str(json)?;
        Self::from_spec(spec)
    }

    /// Load a deck description file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DeckError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Look up a slide by its string id
    pub fn id(&self, key: &str) -> Option<SlideId> {
        self.index.get(key).copied()
    }

    /// String id of a slide
    pub fn key(&self, id: SlideId) -> Option<&str> {
        self.nodes.get(id.0).map(|node| node.key.as_str())
    }

    /// Total number of slides, nested ones included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All slide ids in document order
    pub fn ids(&self) -> impl Iterator<Item = SlideId> + '_ {
        self.index.values().copied()
    }

    /// Control that currently holds input focus
    pub fn focused(&self) -> Option<&Control> {
        self.focused.as_ref()
    }

    fn insert(&mut self, spec: SlideSpec, parent: Option<SlideId>) -> Result<SlideId, DeckError> {
        let id = SlideId(self.nodes.len());
        let key = if spec.id.is_empty() {
            format!("slide-{}", id.0)
        } else {
            spec.id
        };

        if self.index.contains_key(&key) {
            return Err(DeckError::DuplicateId(key));
        }
        self.index.insert(key.clone(), id);

        self.nodes.push(Node {
            key,
            parent,
            children: Vec::new(),
            tags: spec.tags,
            text: spec.text,
            attributes: SlideAttributes {
                auto_advance: spec.auto,
                step_into: spec.step_into,
                end_marker: spec.end,
                back_target: spec.back,
            },
            controls: spec.controls,
            phase: VisualPhase::Hidden,
        });

        for child in spec.children {
            let child_id = self.insert(child, Some(id))?;
            self.nodes[id.0].children.push(child_id);
        }

        Ok(id)
    }

    fn check_references(&self) -> Result<(), DeckError> {
        for node in &self.nodes {
            if let Some(reference) = &node.attributes.back_target {
                if self.resolve(reference).is_none() {
                    return Err(DeckError::UnknownReference {
                        slide: node.key.clone(),
                        reference: reference.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    fn node(&self, id: SlideId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    fn siblings(&self, id: SlideId) -> &[SlideId] {
        match self.node(id).and_then(|node| node.parent) {
            Some(parent) => &self.nodes[parent.0].children,
            None => &self.roots,
        }
    }

    fn sibling_at(&self, id: SlideId, offset: isize) -> Option<SlideId> {
        let siblings = self.siblings(id);
        let position = siblings.iter().position(|s| *s == id)?;
        let target = position.checked_add_signed(offset)?;
        siblings.get(target).copied()
    }

    fn collect_text(&self, id: SlideId, out: &mut Vec<String>) {
        let Some(node) = self.node(id) else { return };
        if !node.text.trim().is_empty() {
            out.push(node.text.clone());
        }
        for child in &node.children {
            self.collect_text(*child, out);
        }
    }

    fn find_control(&self, id: SlideId, kind: ControlKind) -> Option<Control> {
        let node = self.node(id)?;
        if let Some(control) = node.controls.iter().find(|c| c.kind == kind) {
            return Some(Control {
                slide: id,
                kind,
                name: control.name.clone(),
            });
        }
        node.children
            .iter()
            .find_map(|child| self.find_control(*child, kind))
    }
}

impl SlideTree for Deck {
    type Slide = SlideId;
    type Control = Control;

    fn first_slide(&self) -> Option<SlideId> {
        self.roots.first().copied()
    }

    fn contains(&self, slide: &SlideId) -> bool {
        slide.0 < self.nodes.len()
    }

    fn next_sibling(&self, slide: &SlideId) -> Option<SlideId> {
        self.sibling_at(*slide, 1)
    }

    fn previous_sibling(&self, slide: &SlideId) -> Option<SlideId> {
        self.sibling_at(*slide, -1)
    }

    fn children_matching(&self, slide: &SlideId, selector: &str) -> Vec<SlideId> {
        let Some(node) = self.node(*slide) else {
            return Vec::new();
        };
        let selector = selector.trim();
        node.children
            .iter()
            .copied()
            .filter(|child| {
                selector == ANY_CHILD || self.nodes[child.0].tags.iter().any(|t| t == selector)
            })
            .collect()
    }

    fn attributes(&self, slide: &SlideId) -> SlideAttributes {
        self.node(*slide)
            .map(|node| node.attributes.clone())
            .unwrap_or_default()
    }

    fn text(&self, slide: &SlideId) -> String {
        let mut parts = Vec::new();
        self.collect_text(*slide, &mut parts);
        parts.join(" ")
    }

    fn resolve(&self, reference: &str) -> Option<SlideId> {
        let key = reference.trim();
        self.id(key.strip_prefix('#').unwrap_or(key))
    }

    fn focusable_descendant(&self, slide: &SlideId) -> Option<Control> {
        self.find_control(*slide, ControlKind::Input)
            .or_else(|| self.find_control(*slide, ControlKind::Button))
    }

    fn focus(&mut self, control: &Control) {
        self.focused = Some(control.clone());
    }

    fn set_phase(&mut self, slide: &SlideId, phase: VisualPhase) {
        if let Some(node) = self.nodes.get_mut(slide.0) {
            node.phase = phase;
        }
    }

    fn phase(&self, slide: &SlideId) -> VisualPhase {
        self.node(*slide)
            .map(|node| node.phase)
            .unwrap_or_default()
    }
}
