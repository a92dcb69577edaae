//! Network descriptions: JSON in, [`Network`] out, and back.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use tracing::info;

use rn_core::{LinkId, NodeId, Vertex};
use rn_network::{
    CrossSection, CrossSectionElement, LinkBuilder, MarkerTemplate, Network, Node, RoadMarkerAlong,
    Typology,
};

use crate::records::{
    CrossSectionElementRecord, CrossSectionRecord, LinkRecord, MarkerTemplateRecord, NO_NEIGHBOR,
    NetworkDescription, NodeRecord, RoadMarkerRecord, TypologyRecord, VertexRecord,
};
use crate::{IoError, IoResult};

// ── Public API ────────────────────────────────────────────────────────────────

/// Load a network from a JSON description file.
///
/// The network is not rebuilt; call [`Network::rebuild`] on the result.
pub fn load_json(path: &Path) -> IoResult<Network> {
    let file = File::open(path)?;
    from_reader(BufReader::new(file))
}

/// Like [`load_json`] but accepts any `Read` source.
pub fn from_reader<R: Read>(reader: R) -> IoResult<Network> {
    let desc: NetworkDescription = serde_json::from_reader(reader)?;
    build_network(&desc)
}

/// Create the Nodes, Links and registries of `desc`.
pub fn build_network(desc: &NetworkDescription) -> IoResult<Network> {
    let mut net = Network::with_config(desc.config.clone().unwrap_or_default());

    for t in &desc.typologies {
        let typology = Typology::new(&t.name, t.drivable);
        net.add_typology(match &t.class {
            Some(class) => typology.with_class(class),
            None => typology,
        });
    }
    for m in &desc.marker_templates {
        net.add_marker_template(MarkerTemplate::new(&m.kind, m.width.unwrap_or(f64::NAN)));
    }
    for n in &desc.nodes {
        net.add_node(node_from_record(n))?;
    }
    for l in &desc.links {
        link_from_record(&mut net, l)?;
    }

    info!(nodes = net.node_count(), links = net.link_count(), "network description loaded");
    Ok(net)
}

/// Add the Link described by `record` to `net`.
///
/// Fails with an [`IoError::Record`] naming the record when an endpoint is
/// missing or unknown, the name is taken, or a neighbor index is invalid.
pub fn link_from_record(net: &mut Network, record: &LinkRecord) -> IoResult<LinkId> {
    let label = format!("link record {:?}", record.name);

    if net.lookup_link(&record.name).is_some() {
        return Err(IoError::record(label, format!("duplicate link name {}", record.name)));
    }
    let from = resolve_node(net, &label, "fromNode", record.from_node)?;
    let to = resolve_node(net, &label, "toNode", record.to_node)?;

    let cross_sections = record
        .cross_sections
        .iter()
        .map(|cs| cross_section_from_record(&label, cs))
        .collect::<IoResult<Vec<_>>>()?;

    let mut builder = LinkBuilder::new(&record.name)
        .from(from)
        .to(to)
        .priority(record.priority)
        .intermediate(record.intermediate_points.iter().map(|v| vertex(*v)).collect())
        .cross_sections(cross_sections);
    if let Some(distance) = record.distance {
        builder = builder.length(distance);
    }
    if let Some(kmh) = record.max_speed {
        builder = builder.max_speed(kmh);
    }
    Ok(net.add_link(builder)?)
}

/// The description `net` would be loaded from.
pub fn describe(net: &Network) -> NetworkDescription {
    let typologies = net
        .registries()
        .typologies
        .iter()
        .map(|t| TypologyRecord {
            name:     t.name.clone(),
            drivable: t.drivable,
            class:    (t.class != t.name).then(|| t.class.clone()),
        })
        .collect();

    let marker_templates = net
        .registries()
        .markers
        .iter()
        .map(|m| MarkerTemplateRecord {
            kind:  m.kind.clone(),
            width: (!m.width.is_nan()).then_some(m.width),
        })
        .collect();

    let nodes = net
        .nodes()
        .map(|n| {
            let p = n.position();
            NodeRecord {
                id:     n.id().0,
                name:   n.name.clone(),
                x:      p.x,
                y:      p.y,
                z:      p.z,
                radius: n.circle().map(|c| c.radius),
            }
        })
        .collect();

    let links = net
        .links()
        .map(|l| LinkRecord {
            name:                l.name().to_owned(),
            from_node:           Some(l.from_node().0),
            to_node:             Some(l.to_node().0),
            distance:            Some(l.length()),
            priority:            l.is_priority(),
            max_speed:           Some(l.max_speed()),
            intermediate_points: l
                .intermediate_vertices()
                .iter()
                .map(|v| VertexRecord { x: v.x, y: v.y, z: v.z })
                .collect(),
            cross_sections:      l.cross_sections().iter().map(cross_section_record).collect(),
        })
        .collect();

    NetworkDescription {
        config: Some(net.config().clone()),
        typologies,
        marker_templates,
        nodes,
        links,
    }
}

/// Write the description of `net` as pretty-printed JSON.
pub fn save_json(net: &Network, path: &Path) -> IoResult<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, &describe(net))?;
    writer.flush()?;
    Ok(())
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn vertex(v: VertexRecord) -> Vertex {
    Vertex { x: v.x, y: v.y, z: v.z }
}

fn node_from_record(n: &NodeRecord) -> Node {
    let node = Node::new(NodeId(n.id), &n.name, Vertex { x: n.x, y: n.y, z: n.z });
    match n.radius {
        Some(r) => node.with_circle(r),
        None => node,
    }
}

fn resolve_node(net: &Network, label: &str, field: &str, id: Option<u32>) -> IoResult<NodeId> {
    let id = id.ok_or_else(|| IoError::record(label, format!("{field} not defined")))?;
    net.lookup_node(NodeId(id))
        .map(Node::id)
        .ok_or_else(|| IoError::record(label, format!("could not find {field} {id}")))
}

fn cross_section_from_record(label: &str, cs: &CrossSectionRecord) -> IoResult<CrossSection> {
    let elements = cs
        .elements
        .iter()
        .map(|e| element_from_record(label, e))
        .collect::<IoResult<Vec<_>>>()?;
    Ok(CrossSection::new(cs.longitudinal_position, elements).with_lateral_offset(cs.lateral_offset))
}

fn element_from_record(label: &str, e: &CrossSectionElementRecord) -> IoResult<CrossSectionElement> {
    let neighbor = match e.neighbor {
        NO_NEIGHBOR => None,
        n => Some(usize::try_from(n).map_err(|_| {
            IoError::record(label, format!("invalid neighbor index {n}: expected -1 or an element index"))
        })?),
    };
    let markers = e.markers.iter().map(|m| RoadMarkerAlong::new(&m.kind, m.lateral)).collect();

    let mut element = CrossSectionElement::new("", e.width, markers).with_neighbor(neighbor);
    element.set_typology_name(e.typology.clone());
    Ok(element)
}

fn cross_section_record(cs: &CrossSection) -> CrossSectionRecord {
    CrossSectionRecord {
        longitudinal_position: cs.longitudinal,
        lateral_offset:        cs.lateral_offset,
        elements:              cs
            .elements()
            .iter()
            .map(|e| CrossSectionElementRecord {
                typology: e.typology_name().map(str::to_owned),
                width:    e.width,
                neighbor: e.neighbor().and_then(|n| i64::try_from(n).ok()).unwrap_or(NO_NEIGHBOR),
                markers:  e
                    .markers()
                    .iter()
                    .map(|m| RoadMarkerRecord { kind: m.kind().to_owned(), lateral: m.lateral() })
                    .collect(),
            })
            .collect(),
    }
}
