//! Typology/marker binding and lane synthesis.
//!
//! Binding must run before synthesis: a Lane's lateral extent depends on
//! the stripe width of the markers around it.

use tracing::debug;

use rn_core::Vertex;
use rn_core::geom::{offset_polyline, polyline_length, sub_polyline};

use crate::lane::{ElementKey, Lane, LaneOwner};
use crate::link::{Link, LinkState};
use crate::registry::Registries;
use crate::section::CrossSectionElement;
use crate::{NetworkError, NetworkResult};

impl Link {
    /// Bind every element to its typology and every road marker to its
    /// template width.
    ///
    /// Also resets the expanded Nodes to the Link's own endpoints and
    /// re-points the CrossSection back references.  The first unresolved
    /// name is returned as an error; bindings made before it are kept but
    /// the Link stays [`LinkState::Unbound`].
    pub fn fix_phase1(&mut self, registries: &Registries) -> NetworkResult<()> {
        self.expanded_from = None;
        self.expanded_to = None;
        self.state = LinkState::Unbound;
        self.adopt_cross_sections();

        let link_name = &self.name;
        for (s, cs) in self.cross_sections.iter_mut().enumerate() {
            for (e, cse) in cs.elements_mut().iter_mut().enumerate() {
                let name = cse.typology_name().ok_or_else(|| NetworkError::UnnamedTypology {
                    link:    link_name.clone(),
                    section: s,
                    element: e,
                })?;
                let typology = registries.typologies.get(name).ok_or_else(|| {
                    NetworkError::UnknownTypology { link: link_name.clone(), name: name.to_owned() }
                })?;
                cse.bind_typology(typology.clone());

                for marker in cse.markers_mut() {
                    let template = registries.markers.get(marker.kind()).ok_or_else(|| {
                        NetworkError::UnknownMarker {
                            link: link_name.clone(),
                            kind: marker.kind().to_owned(),
                        }
                    })?;
                    if template.width.is_nan() {
                        return Err(NetworkError::MarkerWidthUnset {
                            link: link_name.clone(),
                            kind: marker.kind().to_owned(),
                        });
                    }
                    marker.set_width(template.width);
                }
            }
        }

        self.state = LinkState::TypologyBound;
        Ok(())
    }

    /// Re-create the marker geometry and Lanes of every CrossSection from
    /// the cached design line.  Previously synthesized Lanes are dropped.
    ///
    /// Each CrossSection covers the design line from its own position to the
    /// next CrossSection's (the first one also covers everything before it,
    /// the last one everything after it).
    pub fn rebuild_lanes(&mut self) {
        let total = polyline_length(&self.design_line);
        let starts: Vec<f64> = self.cross_sections.iter().map(|cs| cs.longitudinal).collect();

        for (s, cs) in self.cross_sections.iter_mut().enumerate() {
            let from = if s == 0 { 0.0 } else { starts[s] };
            let to = starts.get(s + 1).copied().unwrap_or(total);
            let slice = sub_polyline(&self.design_line, from, to);
            cs.clear_derived();
            let left_edges = cs.element_left_edges();
            let link = cs.link();

            for (e, cse) in cs.elements_mut().iter_mut().enumerate().rev() {
                for marker in cse.markers_mut().iter_mut().rev() {
                    marker.set_vertices(offset_polyline(&slice, left_edges[e] + marker.lateral()));
                }
                let key = ElementKey { link, section: s, element: e };
                create_lanes(cse, key, left_edges[e], &slice);
            }
        }

        self.state = LinkState::LanesSynthesized;
        debug!(link = %self.name, lanes = self.lane_count(), "lanes synthesized");
    }
}

/// One Lane per pair of laterally adjacent markers of a drivable element.
fn create_lanes(cse: &mut CrossSectionElement, key: ElementKey, left_edge: f64, slice: &[Vertex]) {
    cse.lanes_mut().clear();
    if !cse.is_drivable() {
        return;
    }

    let markers = cse.markers();
    let mut order: Vec<usize> = (0..markers.len()).collect();
    order.sort_by(|&a, &b| markers[a].lateral().total_cmp(&markers[b].lateral()));

    let lanes: Vec<Lane> = order
        .windows(2)
        .map(|pair| {
            let (l, r) = (&markers[pair[0]], &markers[pair[1]]);
            let left = left_edge + l.lateral() + 0.5 * l.width().unwrap_or(0.0);
            let right = left_edge + r.lateral() - 0.5 * r.width().unwrap_or(0.0);
            let centre_line = offset_polyline(slice, 0.5 * (left + right));
            Lane::new(LaneOwner::Element(key), left, right, Some([pair[0], pair[1]]), centre_line)
        })
        .collect();

    *cse.lanes_mut() = lanes;
}
