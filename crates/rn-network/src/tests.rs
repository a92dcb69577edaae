//! Unit tests for rn-network.
//!
//! All tests use small hand-built networks along the x axis, so a lateral
//! offset `d` (positive to the right of travel) shows up as `y == -d`.

#[cfg(test)]
mod helpers {
    use rn_core::{LinkId, NodeId, Vertex};

    use crate::{
        CrossSection, CrossSectionElement, LaneKey, LinkBuilder, MarkerTemplate, Network, Node,
        RoadMarkerAlong, Typology,
    };

    pub const EDGE: &str = "|";
    pub const DIVIDER: &str = ":";

    pub fn register(net: &mut Network) {
        net.add_typology(Typology::new("grass", false));
        net.add_typology(Typology::new("Road", true));
        net.add_marker_template(MarkerTemplate::new(EDGE, 0.1));
        net.add_marker_template(MarkerTemplate::new(DIVIDER, 0.1));
    }

    pub fn network() -> Network {
        let mut net = Network::new();
        register(&mut net);
        net
    }

    pub fn grass() -> CrossSectionElement {
        CrossSectionElement::new("grass", 1.0, Vec::new())
    }

    /// grass | one lane from -1.45 to 1.45 | grass
    pub fn one_lane(longitudinal: f64) -> CrossSection {
        let road = CrossSectionElement::new(
            "road",
            3.2,
            vec![RoadMarkerAlong::new(EDGE, 0.1), RoadMarkerAlong::new(EDGE, 3.1)],
        )
        .with_neighbor(Some(1));
        CrossSection::new(longitudinal, vec![grass(), road, grass()])
    }

    /// grass | lanes [-3.05, -0.05] and [0.05, 3.05] | grass
    pub fn two_lane(longitudinal: f64) -> CrossSection {
        let road = CrossSectionElement::new(
            "road",
            6.4,
            vec![
                RoadMarkerAlong::new(EDGE, 0.1),
                RoadMarkerAlong::new(DIVIDER, 3.2),
                RoadMarkerAlong::new(EDGE, 6.3),
            ],
        )
        .with_neighbor(Some(1));
        CrossSection::new(longitudinal, vec![grass(), road, grass()])
    }

    pub fn node(net: &mut Network, id: u32, x: f64, y: f64) -> NodeId {
        net.add_node(Node::new(NodeId(id), format!("n{id}"), Vertex::new(x, y))).unwrap()
    }

    pub fn link(net: &mut Network, name: &str, from: NodeId, to: NodeId, cs: Vec<CrossSection>) -> LinkId {
        net.add_link(LinkBuilder::new(name).from(from).to(to).cross_sections(cs)).unwrap()
    }

    /// A(0,0) → B(100,0) → C(200,0), links `ab` and `bc`, one CrossSection
    /// each built by `cs`.
    pub fn chain(cs: fn(f64) -> CrossSection) -> (Network, [NodeId; 3], [LinkId; 2]) {
        let mut net = network();
        let a = node(&mut net, 1, 0.0, 0.0);
        let b = node(&mut net, 2, 100.0, 0.0);
        let c = node(&mut net, 3, 200.0, 0.0);
        let ab = link(&mut net, "ab", a, b, vec![cs(0.0)]);
        let bc = link(&mut net, "bc", b, c, vec![cs(0.0)]);
        (net, [a, b, c], [ab, bc])
    }

    /// Lane `lane` of the road element (always element 1 here).
    pub fn road_lane(link: LinkId, section: usize, lane: usize) -> LaneKey {
        LaneKey { link, section, element: 1, lane }
    }
}

// ── Design line ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod design_line {
    use approx::assert_relative_eq;
    use rn_core::{Circle, Vertex};

    use super::helpers::{link, network, node, one_lane};
    use crate::LinkBuilder;
    use crate::design_line::trim;

    #[test]
    fn no_circles_gives_raw_sequence() {
        let mut net = network();
        let a = node(&mut net, 1, 0.0, 0.0);
        let b = node(&mut net, 2, 100.0, 0.0);
        let id = net
            .add_link(LinkBuilder::new("ab").from(a).to(b).intermediate(vec![Vertex::new(50.0, 10.0)]))
            .unwrap();
        assert_eq!(
            net.design_line(id).unwrap(),
            vec![Vertex::new(0.0, 0.0), Vertex::new(50.0, 10.0), Vertex::new(100.0, 0.0)]
        );
    }

    #[test]
    fn to_end_is_trimmed_at_circle() {
        let mut net = network();
        let a = node(&mut net, 1, 0.0, 0.0);
        let b = node(&mut net, 2, 100.0, 0.0);
        net.set_node_circle(b, Some(10.0)).unwrap();
        let id = link(&mut net, "ab", a, b, vec![one_lane(0.0)]);

        let line = net.design_line(id).unwrap();
        assert_eq!(line.len(), 3);
        assert_relative_eq!(line[1].x, 90.0, epsilon = 1e-9);
        assert_eq!(line[2], Vertex::new(100.0, 0.0));
    }

    #[test]
    fn trimming_is_idempotent() {
        let raw = vec![Vertex::new(0.0, 0.0), Vertex::new(40.0, 5.0), Vertex::new(100.0, 0.0)];
        let from = Some(Circle::new(raw[0], 8.0));
        let to = Some(Circle::new(raw[2], 12.0));

        let once = trim(raw.clone(), from, to, 1e-4);
        assert_eq!(once.len(), 5);
        assert_eq!(trim(raw, from, to, 1e-4), once);

        // A trimmed line is a fixed point up to rounding.
        let twice = trim(once.clone(), from, to, 1e-4);
        assert_eq!(twice.len(), once.len());
        for (a, b) in once.iter().zip(&twice) {
            assert!(a.distance(*b) < 1e-9, "{a} moved to {b}");
        }
    }

    #[test]
    fn snap_tolerance_replaces_adjacent_vertex() {
        let raw = vec![Vertex::new(0.0, 0.0), Vertex::new(10.00005, 0.0), Vertex::new(100.0, 0.0)];
        let from = Some(Circle::new(raw[0], 10.0));

        let line = trim(raw, from, None, 1e-4);
        assert_eq!(line.len(), 3);
        assert_relative_eq!(line[1].x, 10.0, epsilon = 1e-9);
        for w in line.windows(2) {
            assert!(w[0].distance(w[1]) >= 1e-4, "duplicate vertices in {line:?}");
        }
    }

    #[test]
    fn vertices_inside_the_footprint_are_removed() {
        let raw = vec![
            Vertex::new(0.0, 0.0),
            Vertex::new(50.0, 0.0),
            Vertex::new(96.0, 0.0),
            Vertex::new(100.0, 0.0),
        ];
        let to = Some(Circle::new(raw[3], 10.0));

        let line = trim(raw, None, to, 1e-4);
        // 96 is inside the circle; the entry lies on the last segment before
        // removal, i.e. at 96 + 4·(-6/4) = 90.
        assert_eq!(line.len(), 4);
        assert_relative_eq!(line[2].x, 90.0, epsilon = 1e-9);
        assert!(line.iter().all(|v| v.x != 96.0));
    }

    #[test]
    fn vertices_inside_the_from_footprint_are_removed() {
        let raw = vec![
            Vertex::new(0.0, 0.0),
            Vertex::new(4.0, 0.0),
            Vertex::new(50.0, 0.0),
            Vertex::new(100.0, 0.0),
        ];
        let from = Some(Circle::new(raw[0], 10.0));

        let line = trim(raw, from, None, 1e-4);
        // 4 is inside the circle; the exit is 4 + 1.5·4 = 10.
        assert_eq!(line.len(), 4);
        assert_relative_eq!(line[1].x, 10.0, epsilon = 1e-9);
        assert!(line.iter().all(|v| v.x != 4.0));
    }

    #[test]
    fn snap_on_a_single_segment_keeps_two_vertices() {
        // To end: the entry point coincides with the from point.
        let raw = vec![Vertex::new(0.0, 0.0), Vertex::new(10.0, 0.0)];
        let to = Some(Circle::new(raw[1], 10.0));
        let line = trim(raw, None, to, 1e-4);
        assert_eq!(line.len(), 2);
        assert_relative_eq!(line[0].x, 0.0, epsilon = 1e-9);
        assert_relative_eq!(line[1].x, 10.0);

        // From end: the exit point is within tolerance of the to point.
        let raw = vec![Vertex::new(0.0, 0.0), Vertex::new(10.00005, 0.0)];
        let from = Some(Circle::new(raw[0], 10.0));
        let line = trim(raw, from, None, 1e-4);
        assert_eq!(line.len(), 2);
        assert_relative_eq!(line[0].x, 0.0);
        assert_relative_eq!(line[1].x, 10.0, epsilon = 1e-9);
    }

    #[test]
    fn length_ignores_trimming() {
        let mut net = network();
        let a = node(&mut net, 1, 0.0, 0.0);
        let b = node(&mut net, 2, 100.0, 0.0);
        net.set_node_circle(a, Some(10.0)).unwrap();
        net.set_node_circle(b, Some(10.0)).unwrap();
        let id = link(&mut net, "ab", a, b, vec![one_lane(0.0)]);
        net.rebuild().unwrap();

        let link = net.link(id).unwrap();
        assert_relative_eq!(link.length(), 100.0);
        assert_eq!(link.cached_design_line().len(), 4);
    }

    #[test]
    fn degenerate_boundary_segment_is_untouched() {
        let raw = vec![Vertex::new(0.0, 0.0), Vertex::new(0.0, 0.0)];
        let c = Some(Circle::new(raw[0], 1.0));
        assert_eq!(trim(raw.clone(), c, c, 1e-4), raw);
    }
}

// ── Lane synthesis ────────────────────────────────────────────────────────────

#[cfg(test)]
mod synthesis {
    use approx::assert_relative_eq;

    use super::helpers::{EDGE, chain, link, network, node, one_lane, road_lane, two_lane};
    use crate::{CrossSection, CrossSectionElement, LaneOwner, LinkState, RoadMarkerAlong};

    #[test]
    fn one_lane_extent_and_centre_line() {
        let (mut net, _, [ab, _]) = chain(one_lane);
        net.rebuild().unwrap();

        let link = net.link(ab).unwrap();
        let cs = &link.cross_sections()[0];
        assert_eq!(cs.lane_count(), 1);
        assert!(cs.elements()[0].lanes().is_empty(), "grass is not drivable");

        let lane = link.lane(road_lane(ab, 0, 0)).unwrap();
        assert_relative_eq!(lane.left(), -1.45, epsilon = 1e-9);
        assert_relative_eq!(lane.right(), 1.45, epsilon = 1e-9);
        assert_eq!(lane.markers(), Some([0, 1]));
        assert_eq!(lane.owner(), LaneOwner::Element(road_lane(ab, 0, 0).element_key()));
        assert_eq!(lane.centre_line().len(), link.cached_design_line().len());
        for (c, d) in lane.centre_line().iter().zip(link.cached_design_line()) {
            assert_relative_eq!(c.distance(*d), 0.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn markers_get_width_and_geometry() {
        let (mut net, _, [ab, _]) = chain(one_lane);
        net.rebuild().unwrap();

        let road = &net.link(ab).unwrap().cross_sections()[0].elements()[1];
        let left = &road.markers()[0];
        assert_eq!(left.width(), Some(0.1));
        assert_eq!(left.vertices().len(), 2);
        // Lateral -1.5 is left of travel, i.e. +y.
        assert_relative_eq!(left.vertices()[0].y, 1.5, epsilon = 1e-9);
        assert_relative_eq!(left.vertices()[1].x, 100.0, epsilon = 1e-9);
    }

    #[test]
    fn two_lanes_left_to_right() {
        let (mut net, _, [ab, _]) = chain(two_lane);
        net.rebuild().unwrap();

        let link = net.link(ab).unwrap();
        let lanes = link.cross_sections()[0].elements()[1].lanes();
        assert_eq!(lanes.len(), 2);
        assert_relative_eq!(lanes[0].centre(), -1.55, epsilon = 1e-9);
        assert_relative_eq!(lanes[1].centre(), 1.55, epsilon = 1e-9);
        assert_relative_eq!(lanes[0].width(), 3.0, epsilon = 1e-9);
        assert_relative_eq!(lanes[0].centre_line()[0].y, 1.55, epsilon = 1e-9);
    }

    #[test]
    fn each_cross_section_covers_up_to_the_next() {
        let mut net = network();
        let a = node(&mut net, 1, 0.0, 0.0);
        let b = node(&mut net, 2, 100.0, 0.0);
        let ab = link(&mut net, "ab", a, b, vec![one_lane(20.0), one_lane(60.0)]);
        net.rebuild().unwrap();

        let link = net.link(ab).unwrap();
        let first = link.lane(road_lane(ab, 0, 0)).unwrap().centre_line();
        let second = link.lane(road_lane(ab, 1, 0)).unwrap().centre_line();
        assert_relative_eq!(first[0].x, 0.0);
        assert_relative_eq!(first[first.len() - 1].x, 60.0, epsilon = 1e-9);
        assert_relative_eq!(second[0].x, 60.0, epsilon = 1e-9);
        assert_relative_eq!(second[second.len() - 1].x, 100.0, epsilon = 1e-9);
    }

    #[test]
    fn single_marker_gives_no_lane() {
        let mut net = network();
        let a = node(&mut net, 1, 0.0, 0.0);
        let b = node(&mut net, 2, 100.0, 0.0);
        let road = CrossSectionElement::new("road", 3.0, vec![RoadMarkerAlong::new(EDGE, 0.0)]);
        let ab = link(&mut net, "ab", a, b, vec![CrossSection::new(0.0, vec![road])]);
        net.rebuild().unwrap();
        assert_eq!(net.link(ab).unwrap().lane_count(), 0);
    }

    #[test]
    fn lateral_offset_shifts_lanes() {
        let mut net = network();
        let a = node(&mut net, 1, 0.0, 0.0);
        let b = node(&mut net, 2, 100.0, 0.0);
        let ab = link(&mut net, "ab", a, b, vec![one_lane(0.0).with_lateral_offset(2.0)]);
        net.rebuild().unwrap();

        let lane = net.link(ab).unwrap().lane(road_lane(ab, 0, 0)).unwrap();
        assert_relative_eq!(lane.centre(), 2.0, epsilon = 1e-9);
        assert_relative_eq!(lane.centre_line()[0].y, -2.0, epsilon = 1e-9);
    }

    #[test]
    fn rebuild_is_repeatable() {
        let (mut net, _, [ab, bc]) = chain(two_lane);
        net.rebuild().unwrap();
        let first: Vec<CrossSection> = net.link(ab).unwrap().cross_sections().to_vec();
        let connectors = net.lookup_node(net.link(bc).unwrap().from_node()).unwrap().connectors().to_vec();

        net.rebuild().unwrap();
        assert_eq!(net.link(ab).unwrap().cross_sections(), first.as_slice());
        assert_eq!(
            net.lookup_node(net.link(bc).unwrap().from_node()).unwrap().connectors(),
            connectors.as_slice()
        );
        assert_eq!(net.link(ab).unwrap().state(), LinkState::LinkedWithinLink);
    }
}

// ── Continuity ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod continuity {
    use super::helpers::{link, network, node, one_lane, road_lane, two_lane};
    use crate::continuity::pair_lanes;
    use crate::lane::{ElementKey, Lane, LaneOwner, SectionKey};
    use crate::{LaneRef, NetworkError};
    use rn_core::LinkId;

    fn lane(left: f64, right: f64) -> Lane {
        let owner = LaneOwner::Element(ElementKey { link: LinkId(0), section: 0, element: 0 });
        Lane::new(owner, left, right, None, Vec::new())
    }

    #[test]
    fn equal_counts_pair_by_index() {
        let earlier = [lane(0.0, 3.0), lane(3.0, 6.0)];
        let later = [lane(10.0, 13.0), lane(13.0, 16.0)];
        assert_eq!(pair_lanes(&earlier, &later), vec![(0, 0), (1, 1)]);
    }

    #[test]
    fn merge_sends_both_into_one() {
        let earlier = [lane(0.0, 3.0), lane(3.0, 6.0)];
        let later = [lane(1.5, 4.5)];
        assert_eq!(pair_lanes(&earlier, &later), vec![(0, 0), (1, 0)]);
    }

    #[test]
    fn widening_feeds_every_new_lane() {
        let earlier = [lane(0.0, 3.0)];
        let later = [lane(0.0, 3.0), lane(3.0, 6.0)];
        assert_eq!(pair_lanes(&earlier, &later), vec![(0, 0), (0, 1)]);
    }

    #[test]
    fn empty_side_pairs_nothing() {
        assert!(pair_lanes(&[], &[lane(0.0, 3.0)]).is_empty());
    }

    #[test]
    fn successive_sections_within_a_link() {
        let mut net = network();
        let a = node(&mut net, 1, 0.0, 0.0);
        let b = node(&mut net, 2, 100.0, 0.0);
        let ab = link(&mut net, "ab", a, b, vec![two_lane(0.0), two_lane(50.0)]);
        net.rebuild().unwrap();

        let link = net.link(ab).unwrap();
        for l in 0..2 {
            let here = link.lane(road_lane(ab, 0, l)).unwrap();
            assert_eq!(here.down(), [LaneRef::Link(road_lane(ab, 1, l))]);
            let next = link.lane(road_lane(ab, 1, l)).unwrap();
            assert_eq!(next.up(), [LaneRef::Link(road_lane(ab, 0, l))]);
        }
        assert_eq!(link.cross_sections()[0].successor(), Some(SectionKey { link: ab, section: 1 }));
        assert_eq!(link.cross_sections()[1].predecessor(), Some(SectionKey { link: ab, section: 0 }));
        assert_eq!(
            link.cross_sections()[0].elements()[1].successor(),
            Some(ElementKey { link: ab, section: 1, element: 1 })
        );
        assert!(link.cross_sections()[0].elements()[0].successor().is_none(), "grass is not linked");
    }

    #[test]
    fn lateral_jump_keeps_identity_mapping() {
        let mut net = network();
        let a = node(&mut net, 1, 0.0, 0.0);
        let b = node(&mut net, 2, 100.0, 0.0);
        let ab = link(&mut net, "ab", a, b, vec![two_lane(0.0), two_lane(50.0).with_lateral_offset(4.0)]);
        net.rebuild().unwrap();

        let link = net.link(ab).unwrap();
        let down = link.lane(road_lane(ab, 0, 1)).unwrap().down();
        assert_eq!(down, [LaneRef::Link(road_lane(ab, 1, 1))]);
    }

    #[test]
    fn lane_drop_within_a_link() {
        let mut net = network();
        let a = node(&mut net, 1, 0.0, 0.0);
        let b = node(&mut net, 2, 100.0, 0.0);
        let ab = link(&mut net, "ab", a, b, vec![two_lane(0.0), one_lane(50.0)]);
        net.rebuild().unwrap();

        let link = net.link(ab).unwrap();
        let merged = link.lane(road_lane(ab, 1, 0)).unwrap();
        assert_eq!(merged.up().len(), 2);
    }

    #[test]
    fn missing_neighbor_links_nothing() {
        let mut net = network();
        let a = node(&mut net, 1, 0.0, 0.0);
        let b = node(&mut net, 2, 100.0, 0.0);
        let mut first = one_lane(0.0);
        first.elements_mut()[1].set_neighbor(None);
        let ab = link(&mut net, "ab", a, b, vec![first, one_lane(50.0)]);
        net.rebuild().unwrap();

        let link = net.link(ab).unwrap();
        assert!(link.lane(road_lane(ab, 0, 0)).unwrap().down().is_empty());
        assert!(link.lane(road_lane(ab, 1, 0)).unwrap().up().is_empty());
    }

    #[test]
    fn neighbor_out_of_range_fails() {
        let mut net = network();
        let a = node(&mut net, 1, 0.0, 0.0);
        let b = node(&mut net, 2, 100.0, 0.0);
        let mut first = one_lane(0.0);
        first.elements_mut()[1].set_neighbor(Some(7));
        link(&mut net, "ab", a, b, vec![first, one_lane(50.0)]);

        let err = net.rebuild().unwrap_err();
        assert_eq!(
            err,
            NetworkError::NeighborOutOfRange {
                link:      "ab".into(),
                section:   0,
                element:   1,
                neighbor:  7,
                available: 3,
            }
        );
        assert_eq!(net.lane_count(), 0);
    }

    #[test]
    fn cross_sections_are_sorted_by_position() {
        let mut net = network();
        let a = node(&mut net, 1, 0.0, 0.0);
        let b = node(&mut net, 2, 100.0, 0.0);
        let ab = link(&mut net, "ab", a, b, vec![two_lane(50.0), one_lane(0.0)]);

        let positions: Vec<f64> =
            net.link(ab).unwrap().cross_sections().iter().map(|cs| cs.longitudinal).collect();
        assert_eq!(positions, vec![0.0, 50.0]);
        assert_eq!(net.link(ab).unwrap().cross_sections()[0].link(), ab);
    }
}

// ── Linking at Nodes ──────────────────────────────────────────────────────────

#[cfg(test)]
mod nodes {
    use super::helpers::{chain, link, network, node, one_lane, road_lane, two_lane};
    use crate::{LaneOwner, LaneRef, LinkState, SectionKey};
    use rn_core::{NodeId, RebuildConfig};

    #[test]
    fn single_lane_scenario() {
        let (mut net, [a, b, c], [ab, bc]) = chain(one_lane);
        let report = net.rebuild().unwrap();

        let entering = net.link(ab).unwrap().lane(road_lane(ab, 0, 0)).unwrap();
        assert_eq!(entering.down().len(), 1);
        let connector_ref = entering.down()[0];
        assert_eq!(connector_ref, LaneRef::Connector { node: b, index: 0 });

        let connector = net.lane(connector_ref).unwrap();
        assert!(connector.is_connector());
        assert_eq!(connector.owner(), LaneOwner::Node(b));
        assert_eq!(connector.down(), [LaneRef::Link(road_lane(bc, 0, 0))]);
        assert_eq!(connector.up(), [LaneRef::Link(road_lane(ab, 0, 0))]);

        let leaving = net.link(bc).unwrap().lane(road_lane(bc, 0, 0)).unwrap();
        assert_eq!(leaving.up(), [connector_ref]);

        assert_eq!(
            net.link(ab).unwrap().cross_sections()[0].successor(),
            Some(SectionKey { link: bc, section: 0 })
        );
        assert_eq!(report.links, 2);
        assert_eq!(report.lanes, 2);
        assert_eq!(report.connectors, 1);
        assert_eq!(report.linked_nodes, 1);
        assert_eq!(report.pending_nodes, vec![a, c]);
        assert!(net.is_ready());
    }

    #[test]
    fn two_lane_pass_through_is_identity() {
        let (mut net, [_, b, _], [ab, bc]) = chain(two_lane);
        net.rebuild().unwrap();

        for l in 0..2 {
            let down = net.link(ab).unwrap().lane(road_lane(ab, 0, l)).unwrap().down();
            assert_eq!(down.len(), 1);
            let connector = net.lane(down[0]).unwrap();
            assert_eq!(connector.down(), [LaneRef::Link(road_lane(bc, 0, l))]);
        }
        assert_eq!(net.lookup_node(b).unwrap().connectors().len(), 2);
    }

    #[test]
    fn every_connector_has_exactly_one_down_lane() {
        let (mut net, _, _) = chain(two_lane);
        net.rebuild().unwrap();
        for node in net.nodes() {
            for connector in node.connectors() {
                assert_eq!(connector.down().len(), 1);
            }
        }
    }

    #[test]
    fn u_turn_is_not_linked() {
        let mut net = network();
        let a = node(&mut net, 1, 0.0, 0.0);
        let b = node(&mut net, 2, 100.0, 0.0);
        link(&mut net, "ab", a, b, vec![one_lane(0.0)]);
        link(&mut net, "ba", b, a, vec![one_lane(0.0)]);

        let report = net.rebuild().unwrap();
        assert_eq!(report.connectors, 0);
        assert_eq!(report.pending_nodes, vec![a, b]);
    }

    #[test]
    fn closed_loop_reaches_linked_at_nodes() {
        let mut net = network();
        let a = node(&mut net, 1, 0.0, 0.0);
        let b = node(&mut net, 2, 100.0, 0.0);
        let c = node(&mut net, 3, 50.0, 80.0);
        link(&mut net, "ab", a, b, vec![one_lane(0.0)]);
        link(&mut net, "bc", b, c, vec![one_lane(0.0)]);
        link(&mut net, "ca", c, a, vec![one_lane(0.0)]);

        let report = net.rebuild().unwrap();
        assert_eq!(report.connectors, 3);
        assert!(report.pending_nodes.is_empty());
        assert!(net.links().all(|l| l.state() == LinkState::LinkedAtNodes));
    }

    #[test]
    fn open_ends_stay_linked_within_link() {
        let (mut net, _, [ab, _]) = chain(one_lane);
        net.rebuild().unwrap();
        assert_eq!(net.link(ab).unwrap().state(), LinkState::LinkedWithinLink);
    }

    #[test]
    fn linking_at_nodes_can_be_disabled() {
        let (mut net, _, _) = chain(one_lane);
        net.set_config(RebuildConfig { connect_at_nodes: false, ..RebuildConfig::default() });
        let report = net.rebuild().unwrap();
        assert_eq!(report.connectors, 0);
        assert_eq!(report.linked_nodes, 0);
    }

    #[test]
    fn connecting_again_adds_nothing() {
        let (mut net, [_, b, _], [ab, _]) = chain(one_lane);
        net.rebuild().unwrap();
        assert!(net.connect_successive_lanes_at_node(b).unwrap());
        assert_eq!(net.lookup_node(b).unwrap().connectors().len(), 1);
        assert_eq!(net.link(ab).unwrap().lane(road_lane(ab, 0, 0)).unwrap().down().len(), 1);
    }

    #[test]
    fn non_simple_node_is_not_linked_directly() {
        let (mut net, [a, ..], _) = chain(one_lane);
        assert!(!net.connect_successive_lanes_at_node(a).unwrap());
        assert!(net.connect_successive_lanes_at_node(NodeId(99)).is_err());
    }
}

// ── Junction expansion ────────────────────────────────────────────────────────

#[cfg(test)]
mod junction {
    use super::helpers::{link, network, node, one_lane, road_lane};
    use crate::{
        JunctionContext, JunctionExpander, LaneAssignment, LaneAssignmentExpander, LaneConnection, LaneRef,
        Network, NetworkError, NetworkResult,
    };
    use rn_core::{LinkId, NodeId};

    /// A(0,0) → C(100,0) ← B(0,50), C → D(200,0).
    fn merge() -> (Network, NodeId, [LinkId; 3]) {
        let mut net = network();
        let a = node(&mut net, 1, 0.0, 0.0);
        let b = node(&mut net, 2, 0.0, 50.0);
        let c = node(&mut net, 3, 100.0, 0.0);
        let d = node(&mut net, 4, 200.0, 0.0);
        let ac = link(&mut net, "ac", a, c, vec![one_lane(0.0)]);
        let bc = link(&mut net, "bc", b, c, vec![one_lane(0.0)]);
        let cd = link(&mut net, "cd", c, d, vec![one_lane(0.0)]);
        (net, c, [ac, bc, cd])
    }

    #[test]
    fn noop_leaves_junction_pending() {
        let (mut net, c, _) = merge();
        let report = net.rebuild().unwrap();
        assert!(report.pending_nodes.contains(&c));
        assert!(net.lookup_node(c).unwrap().connectors().is_empty());
    }

    #[test]
    fn lane_assignment_table() {
        let (mut net, c, [ac, bc, cd]) = merge();
        let mut table = LaneAssignmentExpander::new();
        table
            .assign(c, LaneAssignment { from_link: ac, from_lane: 0, to_link: cd, to_lane: 0 })
            .assign(c, LaneAssignment { from_link: bc, from_lane: 0, to_link: cd, to_lane: 0 });
        assert_eq!(table.assignments(c).len(), 2);

        let report = net.rebuild_with(&table).unwrap();
        assert_eq!(report.connectors, 2);
        assert!(!report.pending_nodes.contains(&c));

        let node = net.lookup_node(c).unwrap();
        for connector in node.connectors() {
            assert_eq!(connector.down(), [LaneRef::Link(road_lane(cd, 0, 0))]);
        }
        let exit = net.link(cd).unwrap().lane(road_lane(cd, 0, 0)).unwrap();
        assert_eq!(exit.up().len(), 2);
    }

    #[test]
    fn unknown_lane_number_is_rejected() {
        let (mut net, c, [ac, _, cd]) = merge();
        let mut table = LaneAssignmentExpander::new();
        table.assign(c, LaneAssignment { from_link: ac, from_lane: 5, to_link: cd, to_lane: 0 });

        let err = net.rebuild_with(&table).unwrap_err();
        assert!(matches!(err, NetworkError::InvalidConnection { node, .. } if node == c));
        assert_eq!(net.lane_count(), 0);
    }

    struct Backwards;

    impl JunctionExpander for Backwards {
        fn expand(&self, ctx: &JunctionContext<'_>) -> NetworkResult<Option<Vec<LaneConnection>>> {
            let exit = ctx.leaving().next().map(|l| l.id());
            let approach = ctx.entering().next().map(|l| l.id());
            let (Some(exit), Some(approach)) = (exit, approach) else {
                return Ok(None);
            };
            Ok(Some(vec![LaneConnection { from: road_lane(exit, 0, 0), to: road_lane(approach, 0, 0) }]))
        }
    }

    #[test]
    fn connection_against_traffic_is_rejected() {
        let (mut net, c, _) = merge();
        let err = net.rebuild_with(&Backwards).unwrap_err();
        assert!(matches!(err, NetworkError::InvalidConnection { node, .. } if node == c));
    }

    #[test]
    fn context_lists_approach_and_exit_lanes() {
        let (mut net, c, [ac, _, cd]) = merge();
        net.rebuild().unwrap();
        let ctx = JunctionContext::new(&net, net.lookup_node(c).unwrap());
        assert_eq!(ctx.entering().count(), 2);
        assert_eq!(ctx.approach_lanes(ac), vec![road_lane(ac, 0, 0)]);
        assert_eq!(ctx.exit_lanes(cd), vec![road_lane(cd, 0, 0)]);
        assert!(ctx.exit_lanes(LinkId(42)).is_empty());
    }
}

// ── Rebuild failures ──────────────────────────────────────────────────────────

#[cfg(test)]
mod failures {
    use super::helpers::{chain, link, network, node, one_lane};
    use crate::{
        CrossSection, CrossSectionElement, LinkState, MarkerTemplate, NetworkError, RoadMarkerAlong,
    };
    use rn_core::{FailurePolicy, RebuildConfig};

    fn section_with(element: CrossSectionElement) -> CrossSection {
        CrossSection::new(0.0, vec![element])
    }

    #[test]
    fn unregistered_typology_fails_rebuild() {
        let (mut net, _, [ab, bc]) = chain(one_lane);
        net.set_cross_sections(bc, vec![section_with(CrossSectionElement::new("tarmac", 3.0, Vec::new()))])
            .unwrap();

        let err = net.rebuild().unwrap_err();
        assert_eq!(err, NetworkError::UnknownTypology { link: "bc".into(), name: "tarmac".into() });
        assert_eq!(net.lane_count(), 0);
        assert_eq!(net.link(ab).unwrap().state(), LinkState::Unbound);
        assert!(!net.is_ready());
    }

    #[test]
    fn typology_lookup_ignores_case() {
        let (mut net, _, [ab, _]) = chain(one_lane);
        assert!(net.registries().typologies.get("ROAD").is_some());
        net.rebuild().unwrap();
        let road = &net.link(ab).unwrap().cross_sections()[0].elements()[1];
        assert_eq!(road.typology().map(|t| t.name.as_str()), Some("Road"));
    }

    #[test]
    fn unnamed_typology_fails_rebuild() {
        let (mut net, _, [_, bc]) = chain(one_lane);
        let mut element = CrossSectionElement::new("road", 3.0, Vec::new());
        element.set_typology_name(None);
        net.set_cross_sections(bc, vec![section_with(element)]).unwrap();

        let err = net.rebuild().unwrap_err();
        assert_eq!(err, NetworkError::UnnamedTypology { link: "bc".into(), section: 0, element: 0 });
    }

    #[test]
    fn unknown_marker_fails_before_synthesis() {
        let mut net = network();
        let a = node(&mut net, 1, 0.0, 0.0);
        let b = node(&mut net, 2, 100.0, 0.0);
        let road = CrossSectionElement::new(
            "road",
            3.2,
            vec![RoadMarkerAlong::new("|", 0.1), RoadMarkerAlong::new("x", 3.1)],
        );
        let ab = link(&mut net, "ab", a, b, vec![section_with(road)]);

        let err = net.rebuild().unwrap_err();
        assert_eq!(err, NetworkError::UnknownMarker { link: "ab".into(), kind: "x".into() });
        assert_eq!(net.link(ab).unwrap().lane_count(), 0);
    }

    #[test]
    fn marker_template_without_width_fails() {
        let mut net = network();
        net.add_marker_template(MarkerTemplate::new("?", f64::NAN));
        let a = node(&mut net, 1, 0.0, 0.0);
        let b = node(&mut net, 2, 100.0, 0.0);
        let road = CrossSectionElement::new("road", 3.2, vec![RoadMarkerAlong::new("?", 0.1)]);
        link(&mut net, "ab", a, b, vec![section_with(road)]);

        let err = net.rebuild().unwrap_err();
        assert_eq!(err, NetworkError::MarkerWidthUnset { link: "ab".into(), kind: "?".into() });
    }

    #[test]
    fn isolate_policy_keeps_healthy_links() {
        let (mut net, [_, b, _], [ab, bc]) = chain(one_lane);
        net.set_config(RebuildConfig { failure_policy: FailurePolicy::IsolateLink, ..RebuildConfig::default() });
        net.set_cross_sections(bc, vec![section_with(CrossSectionElement::new("tarmac", 3.0, Vec::new()))])
            .unwrap();

        let report = net.rebuild().unwrap();
        assert_eq!(
            report.failed_links,
            vec![(bc, NetworkError::UnknownTypology { link: "bc".into(), name: "tarmac".into() })]
        );
        assert_eq!(net.link(ab).unwrap().lane_count(), 1);
        assert_eq!(net.link(bc).unwrap().state(), LinkState::Unbound);
        assert!(net.lookup_node(b).unwrap().connectors().is_empty());
        assert!(!report.pending_nodes.contains(&b));
    }
}

// ── Editing & lookup ──────────────────────────────────────────────────────────

#[cfg(test)]
mod editing {
    use approx::assert_relative_eq;

    use super::helpers::{chain, network, node, one_lane, road_lane};
    use crate::{LinkBuilder, NetworkError, Node, parse_speed_limit, validate_link_name};
    use rn_core::{NodeId, Vertex};

    #[test]
    fn reserved_node_id_is_rejected() {
        let mut net = network();
        let err = net.add_node(Node::new(NodeId::INVALID, "x", Vertex::new(0.0, 0.0))).unwrap_err();
        assert_eq!(err, NetworkError::InvalidNodeId(NodeId::INVALID));
        assert_eq!(net.node_count(), 0);

        let last = node(&mut net, u32::MAX - 1, 0.0, 0.0);
        assert_eq!(last, NodeId(u32::MAX - 1));
        assert_eq!(net.next_node_id(), NodeId::INVALID);
        let err = net.add_node(Node::new(net.next_node_id(), "y", Vertex::new(1.0, 0.0))).unwrap_err();
        assert_eq!(err, NetworkError::InvalidNodeId(NodeId::INVALID));
    }

    #[test]
    fn connector_to_a_missing_lane_is_an_error() {
        let (mut net, [_, b, _], [ab, bc]) = chain(one_lane);
        net.rebuild().unwrap();
        let connectors = net.lookup_node(b).unwrap().connectors().len();

        let err = net.add_connector(b, road_lane(ab, 0, 0), road_lane(bc, 0, 5)).unwrap_err();
        assert!(matches!(err, NetworkError::InvalidConnection { node, .. } if node == b));
        assert_eq!(net.lookup_node(b).unwrap().connectors().len(), connectors);
    }

    #[test]
    fn cross_section_at_node_picks_the_end() {
        let mut net = network();
        let a = node(&mut net, 1, 0.0, 0.0);
        let b = node(&mut net, 2, 100.0, 0.0);
        let id = net
            .add_link(LinkBuilder::new("ab").from(a).to(b).cross_sections(vec![one_lane(60.0), one_lane(0.0)]))
            .unwrap();
        let link = net.link(id).unwrap();
        assert_eq!(link.cross_section_at_node(false).map(|cs| cs.longitudinal), Some(0.0));
        assert_eq!(link.cross_section_at_node(true).map(|cs| cs.longitudinal), Some(60.0));

        let bare = net.add_link(LinkBuilder::new("ba").from(b).to(a)).unwrap();
        assert!(net.link(bare).unwrap().cross_section_at_node(true).is_none());
    }

    #[test]
    fn add_link_requires_both_endpoints() {
        let mut net = network();
        let a = node(&mut net, 1, 0.0, 0.0);
        let err = net.add_link(LinkBuilder::new("ab").from(a)).unwrap_err();
        assert_eq!(err, NetworkError::MissingEndpoint { link: "ab".into(), end: "to" });

        let err = net.add_link(LinkBuilder::new("ab").from(a).to(NodeId(9))).unwrap_err();
        assert_eq!(err, NetworkError::NodeNotFound(NodeId(9)));
    }

    #[test]
    fn link_names_are_unique_and_valid() {
        let (mut net, [a, b, _], [ab, _]) = chain(one_lane);
        let err = net.add_link(LinkBuilder::new("ab").from(a).to(b)).unwrap_err();
        assert_eq!(err, NetworkError::DuplicateLinkName("ab".into()));

        let err = net.add_link(LinkBuilder::new("a b").from(a).to(b)).unwrap_err();
        assert_eq!(err, NetworkError::InvalidLinkName("a b".into()));

        assert!(net.rename_link(ab, "bc").is_err());
        net.rename_link(ab, "main_1").unwrap();
        assert!(net.lookup_link("ab").is_none());
        assert_eq!(net.lookup_link("main_1").map(|l| l.id()), Some(ab));
    }

    #[test]
    fn name_validation() {
        assert!(validate_link_name("_a1").is_ok());
        assert!(validate_link_name("Main").is_ok());
        assert!(validate_link_name("1a").is_err());
        assert!(validate_link_name("").is_err());
        assert!(validate_link_name("a-b").is_err());
    }

    #[test]
    fn speed_limit_parsing() {
        assert_eq!(parse_speed_limit("80"), Ok(80.0));
        assert_eq!(parse_speed_limit("27,5"), Ok(27.5));
        assert_eq!(parse_speed_limit("5"), Ok(5.0));
        assert_eq!(parse_speed_limit("200"), Ok(200.0));
        for bad in ["4", "201", "abc", "", "-50", "1.2.3"] {
            assert!(parse_speed_limit(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn speed_limit_edits() {
        let (mut net, _, [ab, _]) = chain(one_lane);
        assert_eq!(net.link(ab).unwrap().max_speed(), 70.0);
        assert_eq!(net.edit_max_speed(ab, "50,5").unwrap(), 50.5);
        assert_eq!(net.link(ab).unwrap().max_speed(), 50.5);
        assert!(net.edit_max_speed(ab, "300").is_err());
        assert_eq!(net.link(ab).unwrap().max_speed(), 50.5);
    }

    #[test]
    fn stored_length_is_kept() {
        let mut net = network();
        let a = node(&mut net, 1, 0.0, 0.0);
        let b = node(&mut net, 2, 100.0, 0.0);
        let id = net.add_link(LinkBuilder::new("ab").from(a).to(b).length(123.0)).unwrap();
        assert_eq!(net.link(id).unwrap().length(), 123.0);
    }

    #[test]
    fn shape_edits_update_length() {
        let (mut net, [_, b, _], [ab, bc]) = chain(one_lane);
        net.set_intermediate_vertices(ab, vec![Vertex::new(50.0, 50.0)]).unwrap();
        assert_relative_eq!(net.link(ab).unwrap().length(), 2.0 * 50.0_f64.hypot(50.0), epsilon = 1e-9);

        net.move_node(b, Vertex::new(100.0, 100.0)).unwrap();
        assert_relative_eq!(net.link(bc).unwrap().length(), 100.0_f64.hypot(100.0), epsilon = 1e-9);
        assert_eq!(net.nearest_node(Vertex::new(90.0, 95.0)), Some(b));
    }

    #[test]
    fn nodes_in_use_cannot_be_removed() {
        let (mut net, [a, b, _], [ab, _]) = chain(one_lane);
        assert_eq!(net.remove_node(a).unwrap_err(), NetworkError::NodeInUse { node: a, links: 1 });

        net.remove_link(ab).unwrap();
        assert_eq!(net.lookup_node(b).unwrap().incoming_count(), 0);
        net.remove_node(a).unwrap();
        assert!(net.lookup_node(a).is_none());
        assert_eq!(net.nearest_node(Vertex::new(0.0, 0.0)), Some(b));
    }

    #[test]
    fn node_ids() {
        let (mut net, [a, ..], _) = chain(one_lane);
        assert_eq!(net.next_node_id(), NodeId(4));
        let err = net.add_node(crate::Node::new(a, "dup", Vertex::new(1.0, 1.0))).unwrap_err();
        assert_eq!(err, NetworkError::DuplicateNode(a));
        assert_eq!(network().next_node_id(), NodeId(0));
    }

    #[test]
    fn expanded_nodes_fall_back_to_endpoints() {
        let (mut net, [a, b, c], [ab, _]) = chain(one_lane);
        assert_eq!(net.link(ab).unwrap().expanded_to_node(), b);

        net.rebuild().unwrap();
        net.set_expanded_nodes(ab, None, Some(c)).unwrap();
        let link = net.link(ab).unwrap();
        assert_eq!(link.expanded_from_node(), a);
        assert_eq!(link.expanded_to_node(), c);

        net.rebuild().unwrap();
        assert_eq!(net.link(ab).unwrap().expanded_to_node(), b);
    }

    #[test]
    fn edits_make_the_graph_stale() {
        let (mut net, _, [ab, _]) = chain(one_lane);
        net.rebuild().unwrap();
        assert!(net.is_ready());
        net.set_priority(ab, true).unwrap();
        assert!(!net.is_ready());
        assert!(net.link(ab).unwrap().is_priority());
    }
}
