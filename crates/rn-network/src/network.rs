//! The road network and its rebuild pipeline.
//!
//! # Rebuild
//!
//! [`Network::rebuild_with`] turns the Node/Link definitions into a lane
//! graph.  Every derived value (design lines, Lanes, graph edges,
//! connecting Lanes) is dropped first, then recomputed in a fixed order:
//!
//! ```text
//! 1. bind        fix_phase1 for every Link (typologies, marker widths)
//! 2. per Link    design line, rebuild_lanes, connect_successive_lanes_at_link
//! 3. per Node    simple Nodes: connect_successive_lanes_at_node
//!                other Nodes:  JunctionExpander
//! ```
//!
//! Step 2 only touches one Link at a time and reads the Nodes, so with the
//! `parallel` feature it runs on Rayon.  Steps 1 and 3 are sequential.
//!
//! The [`FailurePolicy`] in the [`RebuildConfig`] decides what a failing
//! Link or Node does to the rest of the rebuild.
//!
//! # Spatial index
//!
//! An R-tree (via `rstar`) over Node positions answers nearest-node
//! queries, e.g. for snapping a clicked or imported point to the network.

use std::collections::{BTreeMap, BTreeSet};

use rstar::{AABB, PointDistance, RTree, RTreeObject};
use tracing::{debug, info, warn};

use rn_core::geom::polyline_length;
use rn_core::{Circle, FailurePolicy, LinkId, NodeId, RebuildConfig, Vertex};

use crate::continuity::connect_section_elements;
use crate::design_line::raw_vertices;
use crate::junction::{JunctionContext, JunctionExpander, LaneConnection, NoopJunctionExpander};
use crate::lane::{Lane, LaneKey, LaneOwner, LaneRef, SectionKey};
use crate::link::{Link, LinkBuilder, LinkState};
use crate::node::Node;
use crate::registry::{MarkerTemplate, Registries, Typology};
use crate::section::CrossSection;
use crate::validate::{parse_speed_limit, validate_link_name};
use crate::{NetworkError, NetworkResult};

// ── R-tree node entry ─────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
struct NodeEntry {
    point: [f64; 2], // [x, y]
    id:    NodeId,
}

impl RTreeObject for NodeEntry {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

impl PointDistance for NodeEntry {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.point[0] - point[0];
        let dy = self.point[1] - point[1];
        dx * dx + dy * dy
    }
}

fn entry(node: &Node) -> NodeEntry {
    let p = node.position();
    NodeEntry { point: [p.x, p.y], id: node.id() }
}

// ── RebuildReport ─────────────────────────────────────────────────────────────

/// Summary of one successful [`Network::rebuild_with`] call.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RebuildReport {
    /// Links that reached at least [`LinkState::LinkedWithinLink`].
    pub links:         usize,
    /// Lanes synthesized from cross-section elements.
    pub lanes:         usize,
    /// Connecting Lanes synthesized at Nodes.
    pub connectors:    usize,
    /// Nodes that were linked (simple) or expanded.
    pub linked_nodes:  usize,
    /// Nodes with Links that nothing connected (dead ends, U-turns and
    /// junctions the expander left alone).
    pub pending_nodes: Vec<NodeId>,
    /// Links isolated under [`FailurePolicy::IsolateLink`].
    pub failed_links:  Vec<(LinkId, NetworkError)>,
    /// Nodes whose linking failed under [`FailurePolicy::IsolateLink`].
    pub failed_nodes:  Vec<(NodeId, NetworkError)>,
}

// ── Network ───────────────────────────────────────────────────────────────────

/// Nodes, Links, the typology and marker-template registries, and the lane
/// graph derived from them.
///
/// Editing operations mark the lane graph stale; call [`rebuild`] (or
/// [`rebuild_with`]) to bring it up to date.
///
/// [`rebuild`]: Network::rebuild
/// [`rebuild_with`]: Network::rebuild_with
#[derive(Clone, Debug)]
pub struct Network {
    nodes:       BTreeMap<NodeId, Node>,
    links:       BTreeMap<LinkId, Link>,
    names:       BTreeMap<String, LinkId>,
    next_link:   LinkId,
    registries:  Registries,
    config:      RebuildConfig,
    spatial_idx: RTree<NodeEntry>,
    ready:       bool,
}

impl Default for Network {
    fn default() -> Self {
        Self::new()
    }
}

impl Network {
    pub fn new() -> Self {
        Self::with_config(RebuildConfig::default())
    }

    pub fn with_config(config: RebuildConfig) -> Self {
        Self {
            nodes: BTreeMap::new(),
            links: BTreeMap::new(),
            names: BTreeMap::new(),
            next_link: LinkId(0),
            registries: Registries::default(),
            config,
            spatial_idx: RTree::new(),
            ready: false,
        }
    }

    pub fn config(&self) -> &RebuildConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: RebuildConfig) {
        self.config = config;
        self.ready = false;
    }

    /// `true` once a rebuild has succeeded and nothing was edited since.
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    // ── Registries ────────────────────────────────────────────────────────

    pub fn registries(&self) -> &Registries {
        &self.registries
    }

    pub fn registries_mut(&mut self) -> &mut Registries {
        self.ready = false;
        &mut self.registries
    }

    /// Register a typology, returning the one it replaces.
    pub fn add_typology(&mut self, typology: Typology) -> Option<Typology> {
        self.registries_mut().typologies.insert(typology)
    }

    /// Register a marker template, returning the one it replaces.
    pub fn add_marker_template(&mut self, template: MarkerTemplate) -> Option<MarkerTemplate> {
        self.registries_mut().markers.insert(template)
    }

    // ── Nodes ─────────────────────────────────────────────────────────────

    /// An id not used by any Node (one past the highest in use).  This is
    /// `NodeId::INVALID` once the highest id is taken.
    pub fn next_node_id(&self) -> NodeId {
        self.nodes.keys().next_back().map_or(NodeId(0), |id| id.next())
    }

    pub fn add_node(&mut self, node: Node) -> NetworkResult<NodeId> {
        let id = node.id();
        if !id.is_valid() {
            return Err(NetworkError::InvalidNodeId(id));
        }
        if self.nodes.contains_key(&id) {
            return Err(NetworkError::DuplicateNode(id));
        }
        self.spatial_idx.insert(entry(&node));
        self.nodes.insert(id, node);
        self.ready = false;
        Ok(id)
    }

    pub fn lookup_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.nodes.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Give a Node a footprint of `radius` metres, or remove it (`None`).
    pub fn set_node_circle(&mut self, id: NodeId, radius: Option<f64>) -> NetworkResult<()> {
        let node = self.nodes.get_mut(&id).ok_or(NetworkError::NodeNotFound(id))?;
        let center = node.position();
        node.set_circle(radius.map(|r| Circle::new(center, r)));
        self.ready = false;
        Ok(())
    }

    /// Move a Node.  Lengths of the incident Links are recomputed.
    pub fn move_node(&mut self, id: NodeId, position: Vertex) -> NetworkResult<()> {
        let node = self.nodes.get_mut(&id).ok_or(NetworkError::NodeNotFound(id))?;
        self.spatial_idx.remove(&entry(node));
        node.set_position(position);
        self.spatial_idx.insert(entry(node));

        let incident: Vec<LinkId> = node.entering().iter().chain(node.leaving()).copied().collect();
        for link_id in incident {
            self.recompute_length(link_id)?;
        }
        self.ready = false;
        Ok(())
    }

    /// The Node closest to `position`, or `None` for an empty network.
    pub fn nearest_node(&self, position: Vertex) -> Option<NodeId> {
        self.spatial_idx.nearest_neighbor(&[position.x, position.y]).map(|e| e.id)
    }

    /// Remove a Node that no Link uses any more.
    pub fn remove_node(&mut self, id: NodeId) -> NetworkResult<Node> {
        let node = self.nodes.get(&id).ok_or(NetworkError::NodeNotFound(id))?;
        if node.degree() > 0 {
            return Err(NetworkError::NodeInUse { node: id, links: node.degree() });
        }
        self.spatial_idx.remove(&entry(node));
        self.ready = false;
        self.nodes.remove(&id).ok_or(NetworkError::NodeNotFound(id))
    }

    // ── Links ─────────────────────────────────────────────────────────────

    /// Create a Link from `builder` and attach it to its end Nodes.
    ///
    /// # Errors
    ///
    /// [`NetworkError::InvalidLinkName`], [`NetworkError::MissingEndpoint`],
    /// [`NetworkError::NodeNotFound`] or [`NetworkError::DuplicateLinkName`].
    pub fn add_link(&mut self, builder: LinkBuilder) -> NetworkResult<LinkId> {
        let LinkBuilder { name, from, to, length, priority, max_speed, intermediate, cross_sections } =
            builder;

        validate_link_name(&name)?;
        let from = from.ok_or_else(|| NetworkError::MissingEndpoint { link: name.clone(), end: "from" })?;
        let to = to.ok_or_else(|| NetworkError::MissingEndpoint { link: name.clone(), end: "to" })?;
        let from_pos = self.nodes.get(&from).ok_or(NetworkError::NodeNotFound(from))?.position();
        let to_pos = self.nodes.get(&to).ok_or(NetworkError::NodeNotFound(to))?.position();
        if self.names.contains_key(&name) {
            return Err(NetworkError::DuplicateLinkName(name));
        }

        let id = self.next_link;
        if !id.is_valid() {
            return Err(NetworkError::LinkIdsExhausted);
        }
        self.next_link = id.next();
        let length =
            length.unwrap_or_else(|| polyline_length(&raw_vertices(from_pos, &intermediate, to_pos)));

        let mut link = Link {
            id,
            name: name.clone(),
            from,
            to,
            length,
            priority,
            max_speed: max_speed.unwrap_or(self.config.default_max_speed),
            intermediate,
            cross_sections,
            expanded_from: None,
            expanded_to: None,
            state: LinkState::Unbound,
            design_line: Vec::new(),
        };
        link.adopt_cross_sections();

        if let Some(node) = self.nodes.get_mut(&from) {
            node.attach(id, false);
        }
        if let Some(node) = self.nodes.get_mut(&to) {
            node.attach(id, true);
        }
        debug!(link = %name, %id, %from, %to, length, "link added");
        self.names.insert(name, id);
        self.links.insert(id, link);
        self.ready = false;
        Ok(id)
    }

    pub fn link(&self, id: LinkId) -> Option<&Link> {
        self.links.get(&id)
    }

    pub fn lookup_link(&self, name: &str) -> Option<&Link> {
        self.names.get(name).and_then(|id| self.links.get(id))
    }

    pub fn links(&self) -> impl Iterator<Item = &Link> + '_ {
        self.links.values()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    fn link_mut(&mut self, id: LinkId) -> NetworkResult<&mut Link> {
        self.ready = false;
        self.links.get_mut(&id).ok_or(NetworkError::LinkNotFound(id))
    }

    pub fn rename_link(&mut self, id: LinkId, name: &str) -> NetworkResult<()> {
        validate_link_name(name)?;
        let old = self.links.get(&id).ok_or(NetworkError::LinkNotFound(id))?.name.clone();
        if old == name {
            return Ok(());
        }
        if self.names.contains_key(name) {
            return Err(NetworkError::DuplicateLinkName(name.to_owned()));
        }
        self.names.remove(&old);
        self.names.insert(name.to_owned(), id);
        self.link_mut(id)?.name = name.to_owned();
        Ok(())
    }

    /// Set the speed limit from user input such as `"80"` or `"27,5"`.
    /// Returns the parsed value in km/h.
    pub fn edit_max_speed(&mut self, id: LinkId, text: &str) -> NetworkResult<f64> {
        let kmh = parse_speed_limit(text)?;
        self.link_mut(id)?.max_speed = kmh;
        Ok(kmh)
    }

    pub fn set_priority(&mut self, id: LinkId, priority: bool) -> NetworkResult<()> {
        self.link_mut(id)?.priority = priority;
        Ok(())
    }

    /// Replace the CrossSections of a Link.  They are sorted by position.
    pub fn set_cross_sections(&mut self, id: LinkId, cross_sections: Vec<CrossSection>) -> NetworkResult<()> {
        self.link_mut(id)?.set_cross_sections(cross_sections);
        Ok(())
    }

    /// Replace the shape vertices of a Link and recompute its length.
    pub fn set_intermediate_vertices(&mut self, id: LinkId, vertices: Vec<Vertex>) -> NetworkResult<()> {
        self.link_mut(id)?.intermediate = vertices;
        self.recompute_length(id)
    }

    /// Record the Nodes a junction expansion moved the ends of a Link to.
    ///
    /// Every rebuild resets these to `None`, so set them after rebuilding.
    pub fn set_expanded_nodes(
        &mut self,
        id:   LinkId,
        from: Option<NodeId>,
        to:   Option<NodeId>,
    ) -> NetworkResult<()> {
        for node in [from, to].into_iter().flatten() {
            if !self.nodes.contains_key(&node) {
                return Err(NetworkError::NodeNotFound(node));
            }
        }
        let link = self.links.get_mut(&id).ok_or(NetworkError::LinkNotFound(id))?;
        link.expanded_from = from;
        link.expanded_to = to;
        Ok(())
    }

    /// Remove a Link and detach it from its end Nodes.  The Nodes stay.
    pub fn remove_link(&mut self, id: LinkId) -> NetworkResult<Link> {
        let link = self.links.remove(&id).ok_or(NetworkError::LinkNotFound(id))?;
        self.names.remove(&link.name);
        for node in [link.from, link.to] {
            if let Some(n) = self.nodes.get_mut(&node) {
                n.detach(id);
            }
        }
        self.ready = false;
        Ok(link)
    }

    fn recompute_length(&mut self, id: LinkId) -> NetworkResult<()> {
        let link = self.links.get(&id).ok_or(NetworkError::LinkNotFound(id))?;
        let (from, to) = self.end_nodes(link)?;
        let length = polyline_length(&link.raw_vertices(from, to));
        self.link_mut(id)?.length = length;
        Ok(())
    }

    fn end_nodes(&self, link: &Link) -> NetworkResult<(&Node, &Node)> {
        let from = self.nodes.get(&link.from).ok_or(NetworkError::NodeNotFound(link.from))?;
        let to = self.nodes.get(&link.to).ok_or(NetworkError::NodeNotFound(link.to))?;
        Ok((from, to))
    }

    // ── Geometry & lane graph ─────────────────────────────────────────────

    /// The trimmed design line of a Link, computed from the current Nodes.
    pub fn design_line(&self, id: LinkId) -> NetworkResult<Vec<Vertex>> {
        let link = self.links.get(&id).ok_or(NetworkError::LinkNotFound(id))?;
        let (from, to) = self.end_nodes(link)?;
        Ok(link.design_line(from, to, self.config.snap_tolerance))
    }

    /// Resolve a lane-graph reference.
    pub fn lane(&self, lane: LaneRef) -> Option<&Lane> {
        match lane {
            LaneRef::Link(key) => self.links.get(&key.link)?.lane(key),
            LaneRef::Connector { node, index } => self.nodes.get(&node)?.connectors().get(index),
        }
    }

    /// Total number of Lanes, connecting Lanes included.
    pub fn lane_count(&self) -> usize {
        self.links.values().map(Link::lane_count).sum::<usize>()
            + self.nodes.values().map(|n| n.connectors().len()).sum::<usize>()
    }

    // ── Linking across Nodes ──────────────────────────────────────────────

    /// Link the Lanes of the Link entering a simple Node to the Lanes of the
    /// Link leaving it, through connecting Lanes owned by the Node.
    ///
    /// Returns `Ok(false)` without changing anything when the Node is not
    /// simple or the two Links form a U-turn (the entering Link starts where
    /// the leaving Link ends).  Calling it again after a successful call
    /// adds nothing.
    pub fn connect_successive_lanes_at_node(&mut self, id: NodeId) -> NetworkResult<bool> {
        let node = self.nodes.get(&id).ok_or(NetworkError::NodeNotFound(id))?;
        if !node.is_simple() {
            return Ok(false);
        }
        let (Some(&in_id), Some(&out_id)) = (node.entering().first(), node.leaving().first()) else {
            return Ok(false);
        };
        let incoming = self.links.get(&in_id).ok_or(NetworkError::LinkNotFound(in_id))?;
        let outgoing = self.links.get(&out_id).ok_or(NetworkError::LinkNotFound(out_id))?;
        if in_id == out_id || incoming.from == outgoing.to {
            debug!(node = %id, "u-turn at simple node, not linked");
            return Ok(false);
        }

        let (Some(last), Some(first)) =
            (incoming.cross_section_at_node(true), outgoing.cross_section_at_node(false))
        else {
            return Ok(true);
        };
        let last_key = SectionKey { link: in_id, section: incoming.cross_sections.len() - 1 };
        let first_key = SectionKey { link: out_id, section: 0 };
        let plan = connect_section_elements(&incoming.name, last, last_key, first, first_key)?;

        if let Some(cs) = self.links.get_mut(&in_id).and_then(|l| l.cross_sections.last_mut()) {
            cs.set_successor(first_key);
        }
        if let Some(cs) = self.links.get_mut(&out_id).and_then(|l| l.cross_sections.first_mut()) {
            cs.set_predecessor(last_key);
        }
        for el in plan {
            if let Some(cse) = self.links.get_mut(&in_id).and_then(|l| l.element_mut(el.from)) {
                cse.set_successor(el.to);
            }
            if let Some(cse) = self.links.get_mut(&out_id).and_then(|l| l.element_mut(el.to)) {
                cse.add_predecessor(el.from);
            }
            for (from, to) in el.lanes {
                self.add_connector(id, from, to)?;
            }
        }
        Ok(true)
    }

    /// Join `from` to `to` through a connecting Lane owned by `node`.
    ///
    /// The connecting Lane runs straight from the end of `from`'s centre
    /// line to the start of `to`'s, and its lateral extent is the mean of
    /// both.  An existing connector between the same two Lanes is reused.
    pub(crate) fn add_connector(&mut self, node: NodeId, from: LaneKey, to: LaneKey) -> NetworkResult<LaneRef> {
        let missing = |lane: LaneKey| NetworkError::InvalidConnection {
            node,
            reason: format!("{} does not exist", LaneRef::Link(lane)),
        };
        let position = self.nodes.get(&node).ok_or(NetworkError::NodeNotFound(node))?.position();
        let up = self.lane(LaneRef::Link(from)).ok_or_else(|| missing(from))?;
        let down = self.lane(LaneRef::Link(to)).ok_or_else(|| missing(to))?;
        let start = up.centre_line().last().copied().unwrap_or(position);
        let end = down.centre_line().first().copied().unwrap_or(position);
        let left = 0.5 * (up.left() + down.left());
        let right = 0.5 * (up.right() + down.right());

        let connectors = self.nodes.get_mut(&node).ok_or(NetworkError::NodeNotFound(node))?.connectors_mut();
        let existing = connectors
            .iter()
            .position(|c| c.up() == [LaneRef::Link(from)] && c.down() == [LaneRef::Link(to)]);
        let index = match existing {
            Some(index) => index,
            None => {
                let mut lane = Lane::new(LaneOwner::Node(node), left, right, None, vec![start, end]);
                lane.add_up(LaneRef::Link(from));
                lane.add_down(LaneRef::Link(to));
                connectors.push(lane);
                connectors.len() - 1
            }
        };
        let connector = LaneRef::Connector { node, index };

        self.links
            .get_mut(&from.link)
            .and_then(|l| l.lane_mut(from))
            .ok_or_else(|| missing(from))?
            .add_down(connector);
        self.links
            .get_mut(&to.link)
            .and_then(|l| l.lane_mut(to))
            .ok_or_else(|| missing(to))?
            .add_up(connector);
        Ok(connector)
    }

    /// Check that `conn` runs from an approach Lane to an exit Lane of `node`.
    fn validate_connection(&self, node: &Node, conn: &LaneConnection) -> NetworkResult<()> {
        let invalid = |reason: String| NetworkError::InvalidConnection { node: node.id(), reason };
        let (from, to) = (conn.from, conn.to);

        let incoming = self
            .links
            .get(&from.link)
            .filter(|_| node.entering().contains(&from.link))
            .ok_or_else(|| invalid(format!("{} does not enter the node", from.link)))?;
        if from.section + 1 != incoming.cross_sections.len() || incoming.lane(from).is_none() {
            return Err(invalid(format!("{} is not an approach lane", LaneRef::Link(from))));
        }

        let outgoing = self
            .links
            .get(&to.link)
            .filter(|_| node.leaving().contains(&to.link))
            .ok_or_else(|| invalid(format!("{} does not leave the node", to.link)))?;
        if to.section != 0 || outgoing.lane(to).is_none() {
            return Err(invalid(format!("{} is not an exit lane", LaneRef::Link(to))));
        }
        Ok(())
    }

    /// Ask `expander` for the connections at a non-simple Node and apply
    /// them.  Nothing is applied unless every connection is valid.
    fn expand_node<J: JunctionExpander + ?Sized>(&mut self, id: NodeId, expander: &J) -> NetworkResult<bool> {
        let node = self.nodes.get(&id).ok_or(NetworkError::NodeNotFound(id))?;
        let Some(mut connections) = expander.expand(&JunctionContext::new(self, node))? else {
            return Ok(false);
        };
        connections.sort_unstable();
        connections.dedup();
        for conn in &connections {
            self.validate_connection(node, conn)?;
        }
        for conn in connections {
            self.add_connector(id, conn.from, conn.to)?;
        }
        Ok(true)
    }

    // ── Rebuild ───────────────────────────────────────────────────────────

    /// Rebuild the lane graph, leaving junctions unexpanded.
    pub fn rebuild(&mut self) -> NetworkResult<RebuildReport> {
        self.rebuild_with(&NoopJunctionExpander)
    }

    /// Rebuild the lane graph, expanding non-simple Nodes with `expander`.
    ///
    /// # Errors
    ///
    /// Under [`FailurePolicy::Abort`] the first failing Link (in id order)
    /// or Node aborts the rebuild: its error is returned and every derived
    /// value is cleared, so no Link has Lanes.  Under
    /// [`FailurePolicy::IsolateLink`] failures are collected in the report
    /// instead, the failing Link is cleared and Nodes touching it are not
    /// linked.
    pub fn rebuild_with<J: JunctionExpander + ?Sized>(&mut self, expander: &J) -> NetworkResult<RebuildReport> {
        info!(nodes = self.nodes.len(), links = self.links.len(), "network rebuild started");
        self.clear_derived();
        let policy = self.config.failure_policy;
        let mut report = RebuildReport::default();
        let mut failed: BTreeSet<LinkId> = BTreeSet::new();

        // 1. Bind.
        let mut bind_results = Vec::new();
        for (&id, link) in &mut self.links {
            bind_results.push((id, link.fix_phase1(&self.registries)));
        }
        self.absorb(bind_results, policy, &mut failed, &mut report)?;

        // 2. Geometry, lanes, linking within each Link.
        let tolerance = self.config.snap_tolerance;
        let nodes = &self.nodes;
        #[cfg(feature = "parallel")]
        let link_results: Vec<(LinkId, NetworkResult<()>)> = {
            use rayon::prelude::*;
            self.links
                .par_iter_mut()
                .filter(|(id, _)| !failed.contains(*id))
                .map(|(&id, link)| (id, build_link(link, nodes, tolerance)))
                .collect()
        };
        #[cfg(not(feature = "parallel"))]
        let link_results: Vec<(LinkId, NetworkResult<()>)> = self
            .links
            .iter_mut()
            .filter(|(id, _)| !failed.contains(*id))
            .map(|(&id, link)| (id, build_link(link, nodes, tolerance)))
            .collect();
        self.absorb(link_results, policy, &mut failed, &mut report)?;

        // 3. Nodes.
        let mut handled: BTreeSet<NodeId> = BTreeSet::new();
        if self.config.connect_at_nodes {
            let node_ids: Vec<NodeId> = self.nodes.keys().copied().collect();
            for id in node_ids {
                let Some(node) = self.nodes.get(&id) else { continue };
                if node.degree() == 0 {
                    continue;
                }
                if node.entering().iter().chain(node.leaving()).any(|l| failed.contains(l)) {
                    debug!(node = %id, "node touches an isolated link, not linked");
                    continue;
                }

                let outcome = if node.is_simple() {
                    self.connect_successive_lanes_at_node(id)
                } else {
                    self.expand_node(id, expander)
                };
                match outcome {
                    Ok(true) => {
                        handled.insert(id);
                    }
                    Ok(false) => report.pending_nodes.push(id),
                    Err(e) if policy == FailurePolicy::IsolateLink => {
                        warn!(node = %id, error = %e, "node linking failed, node left unlinked");
                        report.failed_nodes.push((id, e));
                    }
                    Err(e) => {
                        warn!(node = %id, error = %e, "node linking failed, rebuild aborted");
                        self.clear_derived();
                        return Err(e);
                    }
                }
            }
        }

        for link in self.links.values_mut() {
            if link.state == LinkState::LinkedWithinLink
                && handled.contains(&link.from)
                && handled.contains(&link.to)
            {
                link.state = LinkState::LinkedAtNodes;
            }
        }

        report.links = self.links.values().filter(|l| l.state >= LinkState::LinkedWithinLink).count();
        report.lanes = self.links.values().map(Link::lane_count).sum();
        report.connectors = self.nodes.values().map(|n| n.connectors().len()).sum();
        report.linked_nodes = handled.len();
        self.ready = true;
        info!(
            links = report.links,
            lanes = report.lanes,
            connectors = report.connectors,
            pending_nodes = report.pending_nodes.len(),
            failed_links = report.failed_links.len(),
            "network rebuild finished"
        );
        Ok(report)
    }

    /// Apply the failure policy to the per-Link results of one phase.
    fn absorb(
        &mut self,
        results: Vec<(LinkId, NetworkResult<()>)>,
        policy:  FailurePolicy,
        failed:  &mut BTreeSet<LinkId>,
        report:  &mut RebuildReport,
    ) -> NetworkResult<()> {
        for (id, result) in results {
            let Err(e) = result else { continue };
            let name = self.links.get(&id).map(|l| l.name.clone()).unwrap_or_default();
            match policy {
                FailurePolicy::Abort => {
                    warn!(link = %name, error = %e, "link failed, rebuild aborted");
                    self.clear_derived();
                    return Err(e);
                }
                FailurePolicy::IsolateLink => {
                    warn!(link = %name, error = %e, "link failed, isolated");
                    if let Some(link) = self.links.get_mut(&id) {
                        link.clear_derived();
                    }
                    failed.insert(id);
                    report.failed_links.push((id, e));
                }
            }
        }
        Ok(())
    }

    /// Drop every derived value and mark the graph stale.
    fn clear_derived(&mut self) {
        self.ready = false;
        for link in self.links.values_mut() {
            link.clear_derived();
        }
        for node in self.nodes.values_mut() {
            node.connectors_mut().clear();
        }
    }
}

/// Step 2 of the rebuild for one Link.
fn build_link(link: &mut Link, nodes: &BTreeMap<NodeId, Node>, snap_tolerance: f64) -> NetworkResult<()> {
    let from = nodes.get(&link.from).ok_or(NetworkError::NodeNotFound(link.from))?;
    let to = nodes.get(&link.to).ok_or(NetworkError::NodeNotFound(link.to))?;
    link.compute_geometry(from, to, snap_tolerance);
    link.rebuild_lanes();
    link.connect_successive_lanes_at_link()
}
