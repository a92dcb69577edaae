//! On-ramp merge used by the `junction` demo.
//!
//! ```text
//!  west ──(2 lanes)──► merge ──(3 → 2 lanes)──► east ──(2 lanes)──► end
//!                        ▲
//!  ramp ──(1 lane)───────┘
//! ```
//!
//! `merge` is not simple (two entering Links), so its Lanes come from an
//! explicit lane-assignment table.  `east` is simple and linked directly.

use anyhow::Result;

use rn_core::{NodeId, Vertex};
use rn_network::{
    CrossSection, CrossSectionElement, LaneAssignment, LaneAssignmentExpander, LinkBuilder,
    MarkerTemplate, Network, Node, RoadMarkerAlong, Typology,
};

const LANE_WIDTH: f64 = 3.5;
const SHOULDER:   f64 = 1.0;

/// A carriageway of `lanes` lanes between two grass shoulders.  The road
/// surface is element 1 and continues into element 1 of the next profile.
fn carriageway(longitudinal: f64, lanes: usize) -> CrossSection {
    let width = lanes as f64 * LANE_WIDTH;
    let mut markers = vec![RoadMarkerAlong::new("|", 0.1)];
    markers.extend((1..lanes).map(|i| RoadMarkerAlong::new(":", i as f64 * LANE_WIDTH)));
    markers.push(RoadMarkerAlong::new("|", width - 0.1));

    CrossSection::new(longitudinal, vec![
        CrossSectionElement::new("grass", SHOULDER, Vec::new()),
        CrossSectionElement::new("road", width, markers).with_neighbor(Some(1)),
        CrossSectionElement::new("grass", SHOULDER, Vec::new()),
    ])
}

/// Build the merge network and the lane-assignment table for its junction.
pub fn build_network() -> Result<(Network, LaneAssignmentExpander)> {
    let mut net = Network::new();
    net.add_typology(Typology::new("grass", false).with_class("verge"));
    net.add_typology(Typology::new("road", true).with_class("asphalt"));
    net.add_marker_template(MarkerTemplate::new("|", 0.15));
    net.add_marker_template(MarkerTemplate::new(":", 0.1));

    let west  = net.add_node(Node::new(NodeId(1), "west", Vertex::new(0.0, 0.0)))?;
    let ramp  = net.add_node(Node::new(NodeId(2), "ramp", Vertex::new(100.0, -80.0)))?;
    let merge = net.add_node(Node::new(NodeId(3), "merge", Vertex::new(300.0, 0.0)).with_circle(12.0))?;
    let east  = net.add_node(Node::new(NodeId(4), "east", Vertex::new(600.0, 0.0)))?;
    let end   = net.add_node(Node::new(NodeId(5), "end", Vertex::new(900.0, 0.0)))?;

    let main = net.add_link(
        LinkBuilder::new("west_merge").from(west).to(merge).priority(true).cross_section(carriageway(0.0, 2)),
    )?;
    let slip = net.add_link(
        LinkBuilder::new("ramp_merge")
            .from(ramp)
            .to(merge)
            .max_speed(50.0)
            .intermediate(vec![Vertex::new(220.0, -30.0)])
            .cross_section(carriageway(0.0, 1)),
    )?;
    let joined = net.add_link(
        LinkBuilder::new("merge_east")
            .from(merge)
            .to(east)
            .priority(true)
            .cross_sections(vec![carriageway(0.0, 3), carriageway(150.0, 2)]),
    )?;
    net.add_link(
        LinkBuilder::new("east_exit").from(east).to(end).priority(true).cross_section(carriageway(0.0, 2)),
    )?;

    let mut table = LaneAssignmentExpander::new();
    for lane in 0..2 {
        table.assign(merge, LaneAssignment { from_link: main, from_lane: lane, to_link: joined, to_lane: lane });
    }
    table.assign(merge, LaneAssignment { from_link: slip, from_lane: 0, to_link: joined, to_lane: 2 });

    Ok((net, table))
}
