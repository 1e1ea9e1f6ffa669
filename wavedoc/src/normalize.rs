// Copyright 2023-2024 The Regents of the University of California
// Copyright 2024-2025 Cornell University
// released under BSD 3-Clause License
// author: Kevin Laeufer <laeufer@cornell.edu>
//
// Turns parser output into a `Document`.

use crate::document::{Document, Node, WaveEntry};
use crate::fallback::{ForeignNode, ForeignType, END_TIME_KEY};
use crate::signals::{SignalRecord, Time};
use crate::vcd::VcdData;

/// Anything that can be turned into a viewer document.
pub trait Normalize {
    fn normalize(self) -> Document;
}

/// Produces a flat document: every record becomes one child of the root and the
/// hierarchy is only encoded in the `hierarchy` field of each leaf.
/// Records with aliases are placed according to their first reference.
impl Normalize for VcdData {
    fn normalize(self) -> Document {
        let end_time = self.end_time();
        let mut now: Time = 0;
        let children = self
            .into_signals()
            .into_iter()
            .map(|signal| {
                if let Some(last) = signal.last_change_time() {
                    now = now.max(last);
                }
                record_to_leaf(signal)
            })
            .collect();
        // a trailing time marker without changes still extends the simulation
        Document::new(children, now.max(end_time))
    }
}

fn record_to_leaf(signal: SignalRecord) -> Node {
    let mut hierarchy: Vec<String> = signal
        .first_reference()
        .map(|r| r.split('.').map(|s| s.to_string()).collect())
        .unwrap_or_default();
    let name = hierarchy.pop().unwrap_or_default();
    let wave = signal
        .changes
        .into_iter()
        .map(|c| WaveEntry::new(c.time, c.value))
        .collect();
    let mut leaf = Node::leaf(name, signal.var_type, hierarchy, wave);
    leaf.vcdid = Some(signal.id);
    leaf.width = Some(signal.width);
    leaf
}

/// Keeps the nesting of the tree. The root's name is not part of any hierarchy.
impl Normalize for ForeignNode {
    fn normalize(self) -> Document {
        let mut now: Time = 0;
        let mut path = Vec::new();
        let ForeignNode {
            name,
            tpe,
            children,
            data,
        } = self;
        match children {
            Some(children) => {
                let children = children
                    .into_iter()
                    .map(|c| convert_foreign(c, &mut path, &mut now))
                    .collect();
                let end_time = tpe
                    .meta
                    .get(END_TIME_KEY)
                    .and_then(|t| t.as_u64())
                    .unwrap_or(0);
                let mut doc = Document::new(children, now.max(end_time));
                doc.name = name;
                doc.tpe = tpe.name;
                doc
            }
            None => {
                // a lone variable at the top gets a synthetic root
                let node = ForeignNode {
                    name,
                    tpe,
                    children: None,
                    data,
                };
                let leaf = convert_foreign(node, &mut path, &mut now);
                Document::new(vec![leaf], now)
            }
        }
    }
}

fn convert_foreign(node: ForeignNode, path: &mut Vec<String>, now: &mut Time) -> Node {
    let ForeignNode {
        name,
        tpe,
        children,
        data,
    } = node;
    let ForeignType {
        name: type_name,
        mut meta,
    } = tpe;

    let mut out = if let Some(children) = children {
        path.push(name.clone());
        let children = children
            .into_iter()
            .map(|c| convert_foreign(c, path, now))
            .collect();
        path.pop();
        Node::group(name, children)
    } else {
        let wave: Vec<WaveEntry> = data
            .unwrap_or_default()
            .into_iter()
            .map(|(time, value)| WaveEntry::new(time, value))
            .collect();
        if let Some(last) = wave.last() {
            *now = (*now).max(last.time);
        }
        Node::leaf(name, "", path.clone(), wave)
    };

    // hoist the type descriptor into the node
    out.tpe = type_name;
    out.width = meta.remove("width").map(json_to_string);
    out.vcdid = meta.remove("vcdid").map(json_to_string);
    out.extra = meta;
    out
}

fn json_to_string(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    }
}
