//! Directed Links between two Nodes.

use rn_core::{LinkId, NodeId, Vertex};

use crate::lane::{ElementKey, Lane, LaneKey};
use crate::section::{CrossSection, CrossSectionElement};

// ── LinkState ─────────────────────────────────────────────────────────────────

/// How far the rebuild pipeline got for one Link.
///
/// States are ordered: a Link in a later state has passed every earlier
/// one during the current rebuild.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum LinkState {
    #[default]
    Unbound,
    TypologyBound,
    GeometryComputed,
    LanesSynthesized,
    LinkedWithinLink,
    /// Both end Nodes were linked (simple Node) or expanded.
    LinkedAtNodes,
}

// ── Link ──────────────────────────────────────────────────────────────────────

/// A directed, named connection between two Nodes.
///
/// The design line runs from the `from` Node through the intermediate
/// vertices to the `to` Node; the CrossSections are swept along it.
/// Construct through [`LinkBuilder`] and
/// [`Network::add_link`](crate::Network::add_link).
#[derive(Clone, Debug)]
pub struct Link {
    pub(crate) id:             LinkId,
    pub(crate) name:           String,
    pub(crate) from:           NodeId,
    pub(crate) to:             NodeId,
    pub(crate) length:         f64,
    pub(crate) priority:       bool,
    /// km/h
    pub(crate) max_speed:      f64,
    pub(crate) intermediate:   Vec<Vertex>,
    pub(crate) cross_sections: Vec<CrossSection>,
    pub(crate) expanded_from:  Option<NodeId>,
    pub(crate) expanded_to:    Option<NodeId>,
    pub(crate) state:          LinkState,
    /// Trimmed design line from the last geometry pass.
    pub(crate) design_line:    Vec<Vertex>,
}

impl Link {
    pub fn id(&self) -> LinkId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn from_node(&self) -> NodeId {
        self.from
    }

    pub fn to_node(&self) -> NodeId {
        self.to
    }

    /// Node anchoring route choice near the start of the Link.  Falls back
    /// to the `from` Node when no junction expansion moved it.
    pub fn expanded_from_node(&self) -> NodeId {
        self.expanded_from.unwrap_or(self.from)
    }

    pub fn expanded_to_node(&self) -> NodeId {
        self.expanded_to.unwrap_or(self.to)
    }

    /// Cached length in metres (recomputed by every rebuild).
    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn is_priority(&self) -> bool {
        self.priority
    }

    pub fn max_speed(&self) -> f64 {
        self.max_speed
    }

    /// Shape vertices between the two end Nodes (exclusive).
    pub fn intermediate_vertices(&self) -> &[Vertex] {
        &self.intermediate
    }

    /// CrossSections ordered by longitudinal position.
    pub fn cross_sections(&self) -> &[CrossSection] {
        &self.cross_sections
    }

    /// The CrossSection at the start (`at_end == false`) or end of the Link.
    pub fn cross_section_at_node(&self, at_end: bool) -> Option<&CrossSection> {
        if at_end { self.cross_sections.last() } else { self.cross_sections.first() }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Trimmed design line computed by the last rebuild; empty before that.
    /// Use [`Network::design_line`](crate::Network::design_line) for an
    /// up-to-date one.
    pub fn cached_design_line(&self) -> &[Vertex] {
        &self.design_line
    }

    pub fn element(&self, key: ElementKey) -> Option<&CrossSectionElement> {
        self.cross_sections.get(key.section)?.elements().get(key.element)
    }

    pub fn lane(&self, key: LaneKey) -> Option<&Lane> {
        self.element(key.element_key())?.lanes().get(key.lane)
    }

    /// Number of Lanes over every CrossSection.
    pub fn lane_count(&self) -> usize {
        self.cross_sections.iter().map(CrossSection::lane_count).sum()
    }

    // ── Crate-internal mutation ───────────────────────────────────────────

    pub(crate) fn element_mut(&mut self, key: ElementKey) -> Option<&mut CrossSectionElement> {
        self.cross_sections.get_mut(key.section)?.elements_mut().get_mut(key.element)
    }

    pub(crate) fn lane_mut(&mut self, key: LaneKey) -> Option<&mut Lane> {
        self.element_mut(key.element_key())?.lanes_mut().get_mut(key.lane)
    }

    /// Replace the CrossSections, re-pointing their back references and
    /// restoring longitudinal order.
    pub(crate) fn set_cross_sections(&mut self, cross_sections: Vec<CrossSection>) {
        self.cross_sections = cross_sections;
        self.adopt_cross_sections();
    }

    /// Point every CrossSection at this Link and sort them by position.
    ///
    /// The sort is stable, so CrossSections at equal positions keep the
    /// order they were given in.
    pub(crate) fn adopt_cross_sections(&mut self) {
        for cs in &mut self.cross_sections {
            cs.set_link(self.id);
        }
        self.cross_sections
            .sort_by(|a, b| a.longitudinal.total_cmp(&b.longitudinal));
    }

    /// Forget Lanes, linking results and the cached design line.
    pub(crate) fn clear_derived(&mut self) {
        for cs in &mut self.cross_sections {
            cs.clear_derived();
        }
        self.design_line.clear();
        self.state = LinkState::Unbound;
    }
}

// ── LinkBuilder ───────────────────────────────────────────────────────────────

/// Describe a Link, then hand it to
/// [`Network::add_link`](crate::Network::add_link).
///
/// Both end Nodes are required; `add_link` rejects a builder without them.
///
/// # Example
///
/// ```
/// use rn_core::{NodeId, Vertex};
/// use rn_network::{LinkBuilder, Network, Node};
///
/// let mut net = Network::new();
/// net.add_node(Node::new(NodeId(1), "a", Vertex::new(0.0, 0.0))).unwrap();
/// net.add_node(Node::new(NodeId(2), "b", Vertex::new(100.0, 0.0))).unwrap();
/// let id = net.add_link(LinkBuilder::new("main").from(NodeId(1)).to(NodeId(2))).unwrap();
/// assert_eq!(net.link(id).unwrap().length(), 100.0);
/// ```
#[derive(Clone, Debug, Default)]
pub struct LinkBuilder {
    pub(crate) name:           String,
    pub(crate) from:           Option<NodeId>,
    pub(crate) to:             Option<NodeId>,
    pub(crate) length:         Option<f64>,
    pub(crate) priority:       bool,
    pub(crate) max_speed:      Option<f64>,
    pub(crate) intermediate:   Vec<Vertex>,
    pub(crate) cross_sections: Vec<CrossSection>,
}

impl LinkBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Self::default() }
    }

    pub fn from(mut self, node: NodeId) -> Self {
        self.from = Some(node);
        self
    }

    pub fn to(mut self, node: NodeId) -> Self {
        self.to = Some(node);
        self
    }

    /// Stored length, e.g. from a persisted record.  If not given, the
    /// length is computed from the geometry when the Link is added.
    pub fn length(mut self, length: f64) -> Self {
        self.length = Some(length);
        self
    }

    pub fn priority(mut self, priority: bool) -> Self {
        self.priority = priority;
        self
    }

    /// Speed limit in km/h.  Defaults to `RebuildConfig::default_max_speed`.
    pub fn max_speed(mut self, kmh: f64) -> Self {
        self.max_speed = Some(kmh);
        self
    }

    pub fn intermediate(mut self, vertices: Vec<Vertex>) -> Self {
        self.intermediate = vertices;
        self
    }

    pub fn cross_section(mut self, cs: CrossSection) -> Self {
        self.cross_sections.push(cs);
        self
    }

    pub fn cross_sections(mut self, cross_sections: Vec<CrossSection>) -> Self {
        self.cross_sections = cross_sections;
        self
    }
}
