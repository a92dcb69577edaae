//! Lanes and the keys used to address them.
//!
//! # Ownership
//!
//! A Lane is owned either by the `CrossSectionElement` it was synthesized
//! from or, for connecting Lanes, by the `Node` it crosses.  Graph edges
//! (`down`, `up`) are plain [`LaneRef`] values: they never own anything and
//! are only valid until the next rebuild.

use std::fmt;

use rn_core::{LinkId, NodeId, Vertex};

// ── Keys ──────────────────────────────────────────────────────────────────────

/// Position of a CrossSection: `link.cross_sections()[section]`.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct SectionKey {
    pub link:    LinkId,
    pub section: usize,
}

/// Position of a CrossSectionElement inside its CrossSection.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct ElementKey {
    pub link:    LinkId,
    pub section: usize,
    pub element: usize,
}

impl ElementKey {
    #[inline]
    pub fn lane(self, lane: usize) -> LaneKey {
        LaneKey { link: self.link, section: self.section, element: self.element, lane }
    }
}

/// Position of a synthesized Lane inside its element.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct LaneKey {
    pub link:    LinkId,
    pub section: usize,
    pub element: usize,
    pub lane:    usize,
}

impl LaneKey {
    #[inline]
    pub fn element_key(self) -> ElementKey {
        ElementKey { link: self.link, section: self.section, element: self.element }
    }
}

/// A non-owning reference to any Lane in the network.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub enum LaneRef {
    /// A Lane synthesized from a cross-section element.
    Link(LaneKey),
    /// A connecting Lane owned by a Node, by index into its connectors.
    Connector { node: NodeId, index: usize },
}

impl LaneRef {
    pub fn is_connector(self) -> bool {
        matches!(self, LaneRef::Connector { .. })
    }
}

impl From<LaneKey> for LaneRef {
    fn from(key: LaneKey) -> Self {
        LaneRef::Link(key)
    }
}

impl fmt::Display for LaneRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LaneRef::Link(k) => write!(f, "{}/{}/{}/{}", k.link, k.section, k.element, k.lane),
            LaneRef::Connector { node, index } => write!(f, "{node}/c{index}"),
        }
    }
}

/// Who owns a Lane.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum LaneOwner {
    Element(ElementKey),
    Node(NodeId),
}

// ── Lane ──────────────────────────────────────────────────────────────────────

/// A drivable strip between two road markers, plus its graph edges.
#[derive(Clone, Debug, PartialEq)]
pub struct Lane {
    owner:       LaneOwner,
    /// Lateral position of the left edge relative to the design line
    /// (positive = right of the direction of travel).
    left:        f64,
    right:       f64,
    /// Indices of the bounding markers in the owning element, left first.
    /// `None` for connecting Lanes.
    markers:     Option<[usize; 2]>,
    centre_line: Vec<Vertex>,
    down:        Vec<LaneRef>,
    up:          Vec<LaneRef>,
}

impl Lane {
    pub(crate) fn new(
        owner:       LaneOwner,
        left:        f64,
        right:       f64,
        markers:     Option<[usize; 2]>,
        centre_line: Vec<Vertex>,
    ) -> Self {
        Self { owner, left, right, markers, centre_line, down: Vec::new(), up: Vec::new() }
    }

    pub fn owner(&self) -> LaneOwner {
        self.owner
    }

    pub fn is_connector(&self) -> bool {
        matches!(self.owner, LaneOwner::Node(_))
    }

    pub fn left(&self) -> f64 {
        self.left
    }

    pub fn right(&self) -> f64 {
        self.right
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    /// Lateral position of the lane centre.
    pub fn centre(&self) -> f64 {
        0.5 * (self.left + self.right)
    }

    pub fn markers(&self) -> Option<[usize; 2]> {
        self.markers
    }

    pub fn centre_line(&self) -> &[Vertex] {
        &self.centre_line
    }

    /// Lanes reachable by driving on from the end of this one.
    pub fn down(&self) -> &[LaneRef] {
        &self.down
    }

    /// Lanes that feed into this one.
    pub fn up(&self) -> &[LaneRef] {
        &self.up
    }

    /// Width of the lateral interval shared with `other` (0 when disjoint).
    pub fn overlap(&self, other: &Lane) -> f64 {
        (self.right.min(other.right) - self.left.max(other.left)).max(0.0)
    }

    pub(crate) fn add_down(&mut self, lane: LaneRef) {
        if !self.down.contains(&lane) {
            self.down.push(lane);
        }
    }

    pub(crate) fn add_up(&mut self, lane: LaneRef) {
        if !self.up.contains(&lane) {
            self.up.push(lane);
        }
    }
}
