//! junction: build a small road network and print its lane graph.
//!
//! Without arguments the built-in on-ramp merge is used; otherwise the
//! first argument is read as a JSON network description (junctions in a
//! loaded file are left unexpanded).  The network description and the lane
//! graph are written to `output/`.
//!
//! Set `RUST_LOG=rn_network=debug` for per-link rebuild logging.

mod network;

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

use rn_io::{load_json, save_json, write_lane_graph_csv};
use rn_network::{LaneAssignmentExpander, LaneRef};

use network::build_network;

const OUTPUT_DIR: &str = "output";

fn main() -> Result<()> {
    let env_filter = EnvFilter::from_default_env()
        .add_directive(LevelFilter::WARN.into())
        .add_directive("rn_network=info".parse().unwrap_or_default())
        .add_directive("rn_io=info".parse().unwrap_or_default());
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    println!("=== junction: lane-graph builder ===");

    // 1. Network definition.
    let (mut net, expander) = match std::env::args().nth(1) {
        Some(path) => {
            let net = load_json(Path::new(&path)).with_context(|| format!("loading {path}"))?;
            (net, LaneAssignmentExpander::new())
        }
        None => build_network()?,
    };
    println!("Network: {} nodes, {} links", net.node_count(), net.link_count());

    // 2. Rebuild.
    let t0 = Instant::now();
    let report = net.rebuild_with(&expander)?;
    println!(
        "Rebuilt in {:.1?}: {} lanes, {} connecting lanes, {} nodes linked, {} pending",
        t0.elapsed(),
        report.lanes,
        report.connectors,
        report.linked_nodes,
        report.pending_nodes.len()
    );
    for (link, err) in &report.failed_links {
        println!("  isolated {link}: {err}");
    }
    println!();

    // 3. Per-link summary.
    println!("{:<12} {:>8} {:>6} {:>6}  state", "link", "length", "km/h", "lanes");
    for link in net.links() {
        println!(
            "{:<12} {:>8.1} {:>6.0} {:>6}  {:?}",
            link.name(),
            link.length(),
            link.max_speed(),
            link.lane_count(),
            link.state()
        );
    }
    println!();

    // 4. Where the lanes arriving at each node go.
    for node in net.nodes().filter(|n| !n.connectors().is_empty()) {
        println!("{} ({}):", node.name, node.id());
        for (index, connector) in node.connectors().iter().enumerate() {
            let from = connector.up().iter().map(LaneRef::to_string).collect::<Vec<_>>().join(", ");
            let to = connector.down().iter().map(LaneRef::to_string).collect::<Vec<_>>().join(", ");
            println!("  c{index}: {from} -> {to}");
        }
    }

    // 5. Output.
    let out = Path::new(OUTPUT_DIR);
    std::fs::create_dir_all(out).with_context(|| format!("creating {OUTPUT_DIR}/"))?;
    save_json(&net, &out.join("network.json"))?;
    let rows = write_lane_graph_csv(&net, &out.join("lanes.csv"))?;
    println!();
    println!("Wrote {OUTPUT_DIR}/network.json and {OUTPUT_DIR}/lanes.csv ({rows} edges)");

    Ok(())
}
