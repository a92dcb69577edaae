//! CSV export of the lane graph.
//!
//! One row per `down` edge, from every Lane (connecting Lanes included):
//!
//! ```csv
//! from_lane,from_owner,to_lane,to_owner,from_length_m
//! LinkId(0)/0/1/0,ab,NodeId(2)/c0,n2,100.0
//! NodeId(2)/c0,n2,LinkId(1)/0/1/0,bc,0.0
//! ```
//!
//! Lanes are written Link by Link (in id order), then Node by Node.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde::Serialize;

use rn_core::geom::polyline_length;
use rn_network::{Lane, LaneRef, Network};

use crate::IoResult;

#[derive(Debug, Serialize)]
struct LaneEdgeRow {
    from_lane:     String,
    from_owner:    String,
    to_lane:       String,
    to_owner:      String,
    from_length_m: f64,
}

/// Write the lane graph of `net` to a CSV file.  Returns the number of rows.
pub fn write_lane_graph_csv(net: &Network, path: &Path) -> IoResult<usize> {
    write_lane_graph(net, File::create(path)?)
}

/// Like [`write_lane_graph_csv`] but accepts any `Write` sink.
pub fn write_lane_graph<W: Write>(net: &Network, writer: W) -> IoResult<usize> {
    let mut csv = csv::Writer::from_writer(writer);
    let mut rows = 0;

    for (from, lane) in all_lanes(net) {
        for &to in lane.down() {
            csv.serialize(LaneEdgeRow {
                from_lane:     from.to_string(),
                from_owner:    owner_name(net, from),
                to_lane:       to.to_string(),
                to_owner:      owner_name(net, to),
                from_length_m: polyline_length(lane.centre_line()),
            })?;
            rows += 1;
        }
    }

    csv.flush()?;
    Ok(rows)
}

fn all_lanes(net: &Network) -> impl Iterator<Item = (LaneRef, &Lane)> + '_ {
    let link_lanes = net.links().flat_map(move |link| {
        link.cross_sections()
            .iter()
            .enumerate()
            .flat_map(|(s, cs)| cs.lane_keys(s))
            .filter_map(move |key| link.lane(key).map(|lane| (LaneRef::Link(key), lane)))
    });
    let connectors = net.nodes().flat_map(|node| {
        node.connectors()
            .iter()
            .enumerate()
            .map(move |(index, lane)| (LaneRef::Connector { node: node.id(), index }, lane))
    });
    link_lanes.chain(connectors)
}

fn owner_name(net: &Network, lane: LaneRef) -> String {
    match lane {
        LaneRef::Link(key) => net.link(key.link).map(|l| l.name().to_owned()),
        LaneRef::Connector { node, .. } => net.lookup_node(node).map(|n| n.name.clone()),
    }
    .unwrap_or_default()
}
