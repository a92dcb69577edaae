//! Cross-sections, their elements, and longitudinal road markers.
//!
//! # Lateral coordinates
//!
//! A CrossSection is laid out left to right across the roadway.  Lateral
//! positions are measured from the design line, positive to the right of
//! the direction of travel.  The CrossSection is centred on the design
//! line shifted by `lateral_offset`, so element `i` starts at
//!
//! ```text
//! lateral_offset - width / 2 + sum(element widths before i)
//! ```
//!
//! Marker offsets are measured from the left edge of their own element.

use rn_core::{LinkId, Vertex};

use crate::lane::{ElementKey, Lane, LaneKey, SectionKey};
use crate::registry::Typology;

// ── RoadMarkerAlong ──────────────────────────────────────────────────────────

/// A longitudinal marking (lane boundary) at a fixed lateral offset.
#[derive(Clone, Debug, PartialEq)]
pub struct RoadMarkerAlong {
    kind:     String,
    lateral:  f64,
    /// Stripe width, bound from the marker-template registry.
    width:    Option<f64>,
    vertices: Vec<Vertex>,
}

impl RoadMarkerAlong {
    pub fn new(kind: impl Into<String>, lateral: f64) -> Self {
        Self { kind: kind.into(), lateral, width: None, vertices: Vec::new() }
    }

    /// Type token, e.g. `"|"` for an edge line or `":"` for a lane divider.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn lateral(&self) -> f64 {
        self.lateral
    }

    /// `None` until the typology/marker binding pass has run.
    pub fn width(&self) -> Option<f64> {
        self.width
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub(crate) fn set_width(&mut self, width: f64) {
        self.width = Some(width);
    }

    pub(crate) fn set_vertices(&mut self, vertices: Vec<Vertex>) {
        self.vertices = vertices;
    }
}

// ── CrossSectionElement ───────────────────────────────────────────────────────

/// One lateral slice of a CrossSection: a lane group, shoulder, median, …
#[derive(Clone, Debug, PartialEq)]
pub struct CrossSectionElement {
    pub width:     f64,
    typology_name: Option<String>,
    typology:      Option<Typology>,
    markers:       Vec<RoadMarkerAlong>,
    /// Index of the counterpart element in the next CrossSection.
    neighbor:      Option<usize>,

    successor:     Option<ElementKey>,
    predecessors:  Vec<ElementKey>,
    lanes:         Vec<Lane>,
}

impl CrossSectionElement {
    pub fn new(typology_name: impl Into<String>, width: f64, markers: Vec<RoadMarkerAlong>) -> Self {
        Self {
            width,
            typology_name: Some(typology_name.into()),
            typology:      None,
            markers,
            neighbor:      None,
            successor:     None,
            predecessors:  Vec::new(),
            lanes:         Vec::new(),
        }
    }

    /// Builder-style setter for the neighbor index.
    pub fn with_neighbor(mut self, neighbor: Option<usize>) -> Self {
        self.neighbor = neighbor;
        self
    }

    pub fn typology_name(&self) -> Option<&str> {
        self.typology_name.as_deref()
    }

    pub fn set_typology_name(&mut self, name: Option<String>) {
        self.typology_name = name;
        self.typology = None;
    }

    /// The bound typology; `None` before binding.
    pub fn typology(&self) -> Option<&Typology> {
        self.typology.as_ref()
    }

    /// Drivable according to the bound typology.  Unbound elements are not.
    pub fn is_drivable(&self) -> bool {
        self.typology.as_ref().is_some_and(|t| t.drivable)
    }

    pub fn markers(&self) -> &[RoadMarkerAlong] {
        &self.markers
    }

    pub fn neighbor(&self) -> Option<usize> {
        self.neighbor
    }

    pub fn set_neighbor(&mut self, neighbor: Option<usize>) {
        self.neighbor = neighbor;
    }

    /// The element this one was bound to in the next CrossSection.
    pub fn successor(&self) -> Option<ElementKey> {
        self.successor
    }

    pub fn predecessors(&self) -> &[ElementKey] {
        &self.predecessors
    }

    pub fn lanes(&self) -> &[Lane] {
        &self.lanes
    }

    pub(crate) fn bind_typology(&mut self, typology: Typology) {
        self.typology = Some(typology);
    }

    pub(crate) fn markers_mut(&mut self) -> &mut [RoadMarkerAlong] {
        &mut self.markers
    }

    pub(crate) fn lanes_mut(&mut self) -> &mut Vec<Lane> {
        &mut self.lanes
    }

    pub(crate) fn set_successor(&mut self, key: ElementKey) {
        self.successor = Some(key);
    }

    pub(crate) fn add_predecessor(&mut self, key: ElementKey) {
        if !self.predecessors.contains(&key) {
            self.predecessors.push(key);
        }
    }

    /// Drop Lanes and linking results; keeps bindings.
    pub(crate) fn clear_derived(&mut self) {
        self.lanes.clear();
        self.successor = None;
        self.predecessors.clear();
    }
}

// ── CrossSection ──────────────────────────────────────────────────────────────

/// An ordered lateral profile of elements, valid from its longitudinal
/// position up to the next CrossSection of the same Link.
#[derive(Clone, Debug, PartialEq)]
pub struct CrossSection {
    link:               LinkId,
    /// Distance along the Link (metres) at which this profile starts.
    pub longitudinal:   f64,
    /// Shift of the profile centre relative to the design line.
    pub lateral_offset: f64,
    elements:           Vec<CrossSectionElement>,

    successor:          Option<SectionKey>,
    predecessor:        Option<SectionKey>,
}

impl CrossSection {
    pub fn new(longitudinal: f64, elements: Vec<CrossSectionElement>) -> Self {
        Self {
            link: LinkId::INVALID,
            longitudinal,
            lateral_offset: 0.0,
            elements,
            successor: None,
            predecessor: None,
        }
    }

    pub fn with_lateral_offset(mut self, offset: f64) -> Self {
        self.lateral_offset = offset;
        self
    }

    /// The owning Link; `LinkId::INVALID` until added to one.
    pub fn link(&self) -> LinkId {
        self.link
    }

    pub fn elements(&self) -> &[CrossSectionElement] {
        &self.elements
    }

    pub fn elements_mut(&mut self) -> &mut [CrossSectionElement] {
        &mut self.elements
    }

    pub fn successor(&self) -> Option<SectionKey> {
        self.successor
    }

    pub fn predecessor(&self) -> Option<SectionKey> {
        self.predecessor
    }

    /// Total width of all elements.
    pub fn width(&self) -> f64 {
        self.elements.iter().map(|e| e.width).sum()
    }

    /// Lateral position (relative to the design line) of the left edge of
    /// each element, in element order.
    pub fn element_left_edges(&self) -> Vec<f64> {
        let mut edge = self.lateral_offset - 0.5 * self.width();
        self.elements
            .iter()
            .map(|e| {
                let left = edge;
                edge += e.width;
                left
            })
            .collect()
    }

    /// Keys of every Lane in this CrossSection, element by element, left to
    /// right.  `section` is this CrossSection's index in its Link.
    pub fn lane_keys(&self, section: usize) -> Vec<LaneKey> {
        self.elements
            .iter()
            .enumerate()
            .flat_map(|(e, el)| {
                let key = ElementKey { link: self.link, section, element: e };
                (0..el.lanes.len()).map(move |l| key.lane(l))
            })
            .collect()
    }

    /// Number of Lanes over all elements.
    pub fn lane_count(&self) -> usize {
        self.elements.iter().map(|e| e.lanes.len()).sum()
    }

    pub(crate) fn set_link(&mut self, link: LinkId) {
        self.link = link;
    }

    pub(crate) fn set_successor(&mut self, key: SectionKey) {
        self.successor = Some(key);
    }

    pub(crate) fn set_predecessor(&mut self, key: SectionKey) {
        self.predecessor = Some(key);
    }

    pub(crate) fn clear_derived(&mut self) {
        self.successor = None;
        self.predecessor = None;
        for e in &mut self.elements {
            e.clear_derived();
        }
    }
}
