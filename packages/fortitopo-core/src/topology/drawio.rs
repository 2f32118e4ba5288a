//! draw.io (mxGraph) document writer.
//!
//! Devices are laid out in fixed rows by class: the gateway on top, switches
//! below it, access points at the bottom. Edges carry the port names of both
//! ends as small labels pinned near each end.

use super::catalog::{Device, DeviceClass};
use super::links::CandidateLink;
use crate::error::{Result, TopologyError};
use quick_xml::Writer;
use quick_xml::escape::escape;
use quick_xml::events::{BytesEnd, BytesStart, Event};
use std::collections::HashSet;

const GATEWAY_X: i64 = 400;
const GATEWAY_Y: i64 = 50;
const SWITCH_ROW_Y: i64 = 250;
const ACCESS_POINT_ROW_Y: i64 = 450;
const ROW_LEFT_MARGIN: i64 = 100;
const COLUMN_SPACING: i64 = 180;

pub const NODE_WIDTH: i64 = 80;
pub const NODE_HEIGHT: i64 = 60;

const GATEWAY_STYLE: &str = "shape=mxgraph.cisco.firewalls.firewall;html=1;fillColor=#f8cecc;strokeColor=#b85450;fontColor=#FF0000;";
const SWITCH_STYLE: &str = "shape=mxgraph.cisco.switches.layer_3_switch;html=1;fillColor=#d5e8d4;strokeColor=#82b366;fontColor=#0000FF;";
const ACCESS_POINT_STYLE: &str = "shape=mxgraph.cisco.wireless.access_point;html=1;fillColor=#fff2cc;strokeColor=#d6b656;fontColor=#000000;";
const EDGE_STYLE: &str = "endArrow=none;html=1;rounded=0;";
const PORT_LABEL_STYLE: &str = "edgeLabel;html=1;align=center;verticalAlign=middle;resizable=0;points=[];fontSize=10;fontColor=#666666;";

/// Relative position of a port label along its edge (-1 = source end, 1 = target end).
const PORT_LABEL_OFFSET: &str = "0.8";

/// Top-left corner of a node on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub x: i64,
    pub y: i64,
}

/// Drawing style for a device class.
pub fn style_for(class: DeviceClass) -> &'static str {
    match class {
        DeviceClass::Gateway => GATEWAY_STYLE,
        DeviceClass::Switch => SWITCH_STYLE,
        DeviceClass::AccessPoint => ACCESS_POINT_STYLE,
    }
}

/// Assign each device its canvas position, in input order.
pub fn layout(devices: &[Device]) -> Vec<Position> {
    let mut switch_column = 0;
    let mut access_point_column = 0;

    devices
        .iter()
        .map(|device| match device.class {
            DeviceClass::Gateway => Position {
                x: GATEWAY_X,
                y: GATEWAY_Y,
            },
            DeviceClass::Switch => {
                let x = ROW_LEFT_MARGIN + switch_column * COLUMN_SPACING;
                switch_column += 1;
                Position { x, y: SWITCH_ROW_Y }
            }
            DeviceClass::AccessPoint => {
                let x = ROW_LEFT_MARGIN + access_point_column * COLUMN_SPACING;
                access_point_column += 1;
                Position {
                    x,
                    y: ACCESS_POINT_ROW_Y,
                }
            }
        })
        .collect()
}

/// Serialize devices and unique links into a `.drawio` document.
///
/// Every device becomes a node. A link is only drawn when both of its
/// endpoints were emitted as nodes; anything else is dropped silently.
pub fn render_drawio(devices: &[Device], links: &[CandidateLink]) -> Result<Vec<u8>> {
    let mut doc = DocumentWriter::new();

    doc.start(
        "mxfile",
        &[("host", "Electron"), ("agent", "fortitopo"), ("type", "device")],
    )?;
    doc.start("diagram", &[("id", "diagram_1"), ("name", "FortiTopology")])?;
    doc.start(
        "mxGraphModel",
        &[
            ("dx", "1422"),
            ("dy", "794"),
            ("grid", "1"),
            ("gridSize", "10"),
            ("guides", "1"),
            ("tooltips", "1"),
            ("connect", "1"),
            ("arrows", "1"),
            ("fold", "1"),
            ("page", "1"),
            ("pageScale", "1"),
            ("pageWidth", "827"),
            ("pageHeight", "1169"),
            ("math", "0"),
            ("shadow", "0"),
        ],
    )?;
    doc.start("root", &[])?;
    doc.empty("mxCell", &[("id", "0")])?;
    doc.empty("mxCell", &[("id", "1"), ("parent", "0")])?;
    doc.cell_ids.extend(["0".to_string(), "1".to_string()]);

    let mut emitted: HashSet<&str> = HashSet::new();
    for (device, position) in devices.iter().zip(layout(devices)) {
        doc.node(device, position)?;
        emitted.insert(device.identity.as_str());
    }

    let mut edges = 0;
    for link in links {
        if !emitted.contains(link.from.as_str()) || !emitted.contains(link.to.as_str()) {
            tracing::debug!("Dropping link {} -> {}: endpoint not on canvas", link.from, link.to);
            continue;
        }
        doc.edge(link)?;
        edges += 1;
    }

    doc.end("root")?;
    doc.end("mxGraphModel")?;
    doc.end("diagram")?;
    doc.end("mxfile")?;

    tracing::info!("Rendered diagram: {} nodes, {} edges", emitted.len(), edges);
    Ok(doc.into_inner())
}

struct DocumentWriter {
    writer: Writer<Vec<u8>>,
    /// Every cell id written so far; mxGraph requires them to be unique.
    cell_ids: HashSet<String>,
}

impl DocumentWriter {
    fn new() -> Self {
        Self {
            writer: Writer::new(Vec::new()),
            cell_ids: HashSet::new(),
        }
    }

    /// Reserve `base` as a cell id, or `base_<n>` for the first free `n`.
    ///
    /// Identities may contain `_`, so `edge_<from>_<to>` alone can repeat
    /// across different endpoint pairs.
    fn claim_id(&mut self, base: String) -> String {
        if !self.cell_ids.contains(&base) {
            self.cell_ids.insert(base.clone());
            return base;
        }
        let mut n = 1;
        loop {
            let candidate = format!("{}_{}", base, n);
            if self.cell_ids.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }

    fn into_inner(self) -> Vec<u8> {
        self.writer.into_inner()
    }

    fn start(&mut self, tag: &str, attrs: &[(&str, &str)]) -> Result<()> {
        let elem = element(tag, attrs);
        self.writer.write_event(Event::Start(elem)).map_err(xml_error)
    }

    fn empty(&mut self, tag: &str, attrs: &[(&str, &str)]) -> Result<()> {
        let elem = element(tag, attrs);
        self.writer.write_event(Event::Empty(elem)).map_err(xml_error)
    }

    fn end(&mut self, tag: &str) -> Result<()> {
        self.writer
            .write_event(Event::End(BytesEnd::new(tag)))
            .map_err(xml_error)
    }

    fn node(&mut self, device: &Device, position: Position) -> Result<()> {
        // Edges reference nodes by identity, so node ids are never rewritten.
        self.cell_ids.insert(device.identity.clone());
        let value = format!("{}\n{}", device.display_name, device.serial);
        self.start(
            "mxCell",
            &[
                ("id", device.identity.as_str()),
                ("value", value.as_str()),
                ("style", style_for(device.class)),
                ("parent", "1"),
                ("vertex", "1"),
            ],
        )?;
        let x = position.x.to_string();
        let y = position.y.to_string();
        let width = NODE_WIDTH.to_string();
        let height = NODE_HEIGHT.to_string();
        self.empty(
            "mxGeometry",
            &[
                ("x", x.as_str()),
                ("y", y.as_str()),
                ("width", width.as_str()),
                ("height", height.as_str()),
                ("as", "geometry"),
            ],
        )?;
        self.end("mxCell")
    }

    fn edge(&mut self, link: &CandidateLink) -> Result<()> {
        let edge_id = self.claim_id(format!("edge_{}_{}", link.from, link.to));
        self.start(
            "mxCell",
            &[
                ("id", edge_id.as_str()),
                ("value", ""),
                ("style", EDGE_STYLE),
                ("parent", "1"),
                ("source", link.from.as_str()),
                ("target", link.to.as_str()),
                ("edge", "1"),
            ],
        )?;
        self.empty("mxGeometry", &[("relative", "1"), ("as", "geometry")])?;
        self.end("mxCell")?;

        if let Some(port) = link.from_port.as_deref().filter(|p| !p.is_empty()) {
            let offset = format!("-{}", PORT_LABEL_OFFSET);
            let label_id = self.claim_id(format!("lbl_src_{}", edge_id));
            self.port_label(&label_id, &edge_id, port, &offset)?;
        }
        if let Some(port) = link.to_port.as_deref().filter(|p| !p.is_empty()) {
            let label_id = self.claim_id(format!("lbl_dst_{}", edge_id));
            self.port_label(&label_id, &edge_id, port, PORT_LABEL_OFFSET)?;
        }
        Ok(())
    }

    fn port_label(&mut self, id: &str, edge_id: &str, port: &str, x: &str) -> Result<()> {
        self.start(
            "mxCell",
            &[
                ("id", id),
                ("value", port),
                ("style", PORT_LABEL_STYLE),
                ("parent", edge_id),
                ("vertex", "1"),
                ("connectable", "0"),
            ],
        )?;
        self.empty(
            "mxGeometry",
            &[("x", x), ("y", "0"), ("relative", "1"), ("as", "geometry")],
        )?;
        self.end("mxCell")
    }
}

/// Build an element, escaping attribute values so that line breaks survive
/// attribute-value normalization in XML readers.
fn element<'a>(tag: &'a str, attrs: &[(&str, &str)]) -> BytesStart<'a> {
    let mut elem = BytesStart::new(tag);
    for (key, value) in attrs {
        let escaped = escape(*value)
            .replace('\n', "&#10;")
            .replace('\r', "&#13;")
            .replace('\t', "&#9;");
        elem.push_attribute((key.as_bytes(), escaped.as_bytes()));
    }
    elem
}

fn xml_error<E: std::fmt::Display>(err: E) -> TopologyError {
    TopologyError::Xml(err.to_string())
}
