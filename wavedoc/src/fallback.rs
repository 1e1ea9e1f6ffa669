// Copyright 2023-2024 The Regents of the University of California
// Copyright 2024-2025 Cornell University
// released under BSD 3-Clause License
// author: Kevin Laeufer <laeufer@cornell.edu>
//
// Loads VCDs with the third-party `vcd` crate (https://github.com/kevinmehall/rust-vcd).
// Used when our own parser rejects a file. The result is a nested tree in which
// every node has a type descriptor instead of flat records.

use crate::document::{GROUP_TYPE, ROOT_NAME};
use crate::signals::Time;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::BufRead;
use tracing::{debug, instrument};

#[derive(Debug, thiserror::Error)]
pub enum FallbackError {
    #[error("[vcd-rs] failed to parse header: {0}")]
    Header(String),
    #[error("[vcd-rs] failed to parse value changes: {0}")]
    Body(String),
    #[error("I/O operation failed")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FallbackError>;

/// Metadata key of the root node that holds the value of the last timestamp.
pub const END_TIME_KEY: &str = "end_time";

/// The type descriptor of a [`ForeignNode`]: a `name` plus arbitrary metadata like `width`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignType {
    pub name: String,
    #[serde(flatten)]
    pub meta: BTreeMap<String, serde_json::Value>,
}

/// Scope or variable as produced by the fallback loader.
/// Scopes have `children`, variables carry `data` as `[time, value]` pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignNode {
    pub name: String,
    #[serde(rename = "type")]
    pub tpe: ForeignType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<ForeignNode>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<(Time, String)>>,
}

impl ForeignNode {
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }
}

pub fn read_from_file<P: AsRef<std::path::Path>>(filename: P) -> Result<ForeignNode> {
    let input = std::io::BufReader::new(std::fs::File::open(filename)?);
    read(input)
}

pub fn read_from_str(content: &str) -> Result<ForeignNode> {
    read(content.as_bytes())
}

#[instrument(level = "debug", skip_all)]
fn read(input: impl BufRead) -> Result<ForeignNode> {
    let mut parser = vcd::Parser::new(input);
    let header = parser
        .parse_header()
        .map_err(|e| FallbackError::Header(e.to_string()))?;

    let mut waves: FxHashMap<vcd::IdCode, Vec<(Time, String)>> = FxHashMap::default();
    let mut time: Time = 0;
    for cmd in parser {
        let cmd = cmd.map_err(|e| FallbackError::Body(e.to_string()))?;
        let (id, value) = match cmd {
            vcd::Command::Timestamp(t) => {
                time = t;
                continue;
            }
            vcd::Command::ChangeScalar(id, value) => (id, value.to_string()),
            vcd::Command::ChangeVector(id, value) => (id, value.to_string()),
            vcd::Command::ChangeReal(id, value) => (id, value.to_string()),
            vcd::Command::ChangeString(id, value) => (id, value),
            _ => continue, // comments, $dumpvars etc.
        };
        waves.entry(id).or_default().push((time, value));
    }
    debug!(signals = waves.len(), time, "vcd-rs finished reading");

    let children = convert_items(&header.items, &waves);
    // the last timestamp may come after the last change
    let mut meta = BTreeMap::new();
    meta.insert(END_TIME_KEY.to_string(), serde_json::Value::from(time));
    Ok(ForeignNode {
        name: ROOT_NAME.to_string(),
        tpe: ForeignType {
            name: GROUP_TYPE.to_string(),
            meta,
        },
        children: Some(children),
        data: None,
    })
}

fn convert_items(
    items: &[vcd::ScopeItem],
    waves: &FxHashMap<vcd::IdCode, Vec<(Time, String)>>,
) -> Vec<ForeignNode> {
    items
        .iter()
        .flat_map(|item| match item {
            vcd::ScopeItem::Scope(scope) => {
                let mut meta = BTreeMap::new();
                meta.insert(
                    "scope_type".to_string(),
                    serde_json::Value::from(scope.scope_type.to_string()),
                );
                Some(ForeignNode {
                    name: scope.identifier.clone(),
                    tpe: ForeignType {
                        name: GROUP_TYPE.to_string(),
                        meta,
                    },
                    children: Some(convert_items(&scope.items, waves)),
                    data: None,
                })
            }
            vcd::ScopeItem::Var(var) => {
                let mut meta = BTreeMap::new();
                meta.insert("width".to_string(), serde_json::Value::from(var.size));
                meta.insert(
                    "vcdid".to_string(),
                    serde_json::Value::from(var.code.to_string()),
                );
                Some(ForeignNode {
                    name: var_name(var),
                    tpe: ForeignType {
                        name: var.var_type.to_string(),
                        meta,
                    },
                    children: None,
                    // aliases share the changes of their id
                    data: Some(waves.get(&var.code).cloned().unwrap_or_default()),
                })
            }
            _ => None, // comments inside the hierarchy
        })
        .collect()
}

/// The `vcd` crate splits the bit index off the name, we re-attach it.
fn var_name(var: &vcd::Var) -> String {
    match var.index {
        None => var.reference.clone(),
        Some(vcd::ReferenceIndex::BitSelect(bit)) => format!("{}[{}]", var.reference, bit),
        Some(vcd::ReferenceIndex::Range(msb, lsb)) => {
            format!("{}[{}:{}]", var.reference, msb, lsb)
        }
    }
}
