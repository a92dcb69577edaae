//! Network vertices.

use std::collections::BTreeSet;

use rn_core::{Circle, LinkId, NodeId, Vertex};

use crate::lane::Lane;

/// A network vertex: a position, an optional circular footprint, and the
/// Links that enter and leave it.
///
/// The footprint should not exceed half of the shortest incident Link.
/// This is not checked; a footprint that is too big simply stops trimming
/// the design line at that end.
#[derive(Clone, Debug)]
pub struct Node {
    id:         NodeId,
    pub name:   String,
    position:   Vertex,
    circle:     Option<Circle>,
    entering:   BTreeSet<LinkId>,
    leaving:    BTreeSet<LinkId>,
    /// Lanes synthesized inside the footprint to join entering and leaving
    /// Lanes.  Rebuilt from scratch on every network rebuild.
    connectors: Vec<Lane>,
}

impl Node {
    pub fn new(id: NodeId, name: impl Into<String>, position: Vertex) -> Self {
        Self {
            id,
            name: name.into(),
            position,
            circle: None,
            entering: BTreeSet::new(),
            leaving: BTreeSet::new(),
            connectors: Vec::new(),
        }
    }

    /// Builder-style footprint.
    pub fn with_circle(mut self, radius: f64) -> Self {
        self.circle = Some(Circle::new(self.position, radius));
        self
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn position(&self) -> Vertex {
        self.position
    }

    pub fn circle(&self) -> Option<Circle> {
        self.circle
    }

    /// Links ending at this Node.
    pub fn entering(&self) -> &BTreeSet<LinkId> {
        &self.entering
    }

    /// Links starting at this Node.
    pub fn leaving(&self) -> &BTreeSet<LinkId> {
        &self.leaving
    }

    pub fn incoming_count(&self) -> usize {
        self.entering.len()
    }

    pub fn leaving_count(&self) -> usize {
        self.leaving.len()
    }

    pub fn degree(&self) -> usize {
        self.entering.len() + self.leaving.len()
    }

    /// Exactly one entering and one leaving Link.
    pub fn is_simple(&self) -> bool {
        self.entering.len() == 1 && self.leaving.len() == 1
    }

    pub fn connectors(&self) -> &[Lane] {
        &self.connectors
    }

    pub(crate) fn set_circle(&mut self, circle: Option<Circle>) {
        self.circle = circle;
    }

    /// Move the Node; a footprint moves with it.
    pub(crate) fn set_position(&mut self, position: Vertex) {
        self.position = position;
        if let Some(c) = self.circle {
            self.circle = Some(Circle::new(position, c.radius));
        }
    }

    pub(crate) fn attach(&mut self, link: LinkId, entering: bool) {
        if entering {
            self.entering.insert(link);
        } else {
            self.leaving.insert(link);
        }
    }

    pub(crate) fn detach(&mut self, link: LinkId) {
        self.entering.remove(&link);
        self.leaving.remove(&link);
    }

    pub(crate) fn connectors_mut(&mut self) -> &mut Vec<Lane> {
        &mut self.connectors
    }
}
