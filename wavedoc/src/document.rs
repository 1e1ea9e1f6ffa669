// Copyright 2023-2024 The Regents of the University of California
// Copyright 2024-2025 Cornell University
// released under BSD 3-Clause License
// author: Kevin Laeufer <laeufer@cornell.edu>
//
// The normalized document handed to waveform viewers.

use crate::signals::Time;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `type` of every node that groups other nodes.
pub const GROUP_TYPE: &str = "struct";
/// Name of the synthetic root node.
pub const ROOT_NAME: &str = "root";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaveEntry {
    pub time: Time,
    #[serde(rename = "val", alias = "value")]
    pub value: String,
}

impl WaveEntry {
    pub fn new(time: Time, value: impl Into<String>) -> Self {
        Self {
            time,
            value: value.into(),
        }
    }
}

/// A group or a signal. Leaves carry `hierarchy` and `wave`, groups carry `children`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    #[serde(rename = "type")]
    pub tpe: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<Node>>,
    /// Names of all enclosing scopes, outermost first. Does not include the node name.
    #[serde(alias = "hierarcy", default, skip_serializing_if = "Option::is_none")]
    pub hierarchy: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wave: Option<Vec<WaveEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vcdid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<String>,
    /// Any other metadata the parser provided.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Node {
    pub fn group(name: impl Into<String>, children: Vec<Node>) -> Self {
        Self {
            name: name.into(),
            tpe: GROUP_TYPE.to_string(),
            children: Some(children),
            hierarchy: None,
            wave: None,
            vcdid: None,
            width: None,
            extra: BTreeMap::new(),
        }
    }

    pub fn leaf(
        name: impl Into<String>,
        tpe: impl Into<String>,
        hierarchy: Vec<String>,
        wave: Vec<WaveEntry>,
    ) -> Self {
        Self {
            name: name.into(),
            tpe: tpe.into(),
            children: None,
            hierarchy: Some(hierarchy),
            wave: Some(wave),
            vcdid: None,
            width: None,
            extra: BTreeMap::new(),
        }
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    pub fn wave(&self) -> &[WaveEntry] {
        self.wave.as_deref().unwrap_or(&[])
    }

    pub fn hierarchy(&self) -> &[String] {
        self.hierarchy.as_deref().unwrap_or(&[])
    }

    /// Hierarchy and name joined by `.`.
    pub fn full_name(&self) -> String {
        let mut parts: Vec<&str> = self.hierarchy().iter().map(|s| s.as_str()).collect();
        parts.push(&self.name);
        parts.join(".")
    }
}

/// Root of a normalized waveform. `now` is the end of the simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub name: String,
    #[serde(rename = "type")]
    pub tpe: String,
    pub children: Vec<Node>,
    pub now: Time,
}

impl Document {
    pub fn new(children: Vec<Node>, now: Time) -> Self {
        Self {
            name: ROOT_NAME.to_string(),
            tpe: GROUP_TYPE.to_string(),
            children,
            now,
        }
    }

    /// All signals, depth first. Flat documents simply yield their children.
    pub fn leaves(&self) -> Leaves<'_> {
        Leaves {
            stack: self.children.iter().rev().collect(),
        }
    }

    pub fn find_leaf(&self, full_name: &str) -> Option<&Node> {
        self.leaves().find(|n| n.full_name() == full_name)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

pub struct Leaves<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> Iterator for Leaves<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(node) = self.stack.pop() {
            match &node.children {
                None => return Some(node),
                Some(children) => self.stack.extend(children.iter().rev()),
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example() -> Document {
        let mut clk = Node::leaf(
            "clk",
            "wire",
            vec!["top".to_string()],
            vec![WaveEntry::new(0, "0"), WaveEntry::new(5, "1")],
        );
        clk.vcdid = Some("!".to_string());
        clk.width = Some("1".to_string());
        let en = Node::leaf("en", "reg", vec!["top".to_string(), "sub".to_string()], vec![]);
        let sub = Node::group("sub", vec![en]);
        Document::new(vec![Node::group("top", vec![clk, sub])], 5)
    }

    #[test]
    fn test_json_shape() {
        let doc = Document::new(
            vec![Node::leaf("a", "wire", vec![], vec![WaveEntry::new(3, "x")])],
            3,
        );
        let value: serde_json::Value = serde_json::from_str(&doc.to_json().unwrap()).unwrap();
        assert_eq!(value["type"], "struct");
        assert_eq!(value["now"], 3);
        assert_eq!(value["children"][0]["wave"][0]["val"], "x");
        assert_eq!(value["children"][0]["wave"][0]["time"], 3);
        assert!(value["children"][0].get("vcdid").is_none());
        assert!(value["children"][0].get("children").is_none());
    }

    #[test]
    fn test_json_round_trip() {
        let mut doc = example();
        doc.children[0]
            .extra
            .insert("scope_type".to_string(), serde_json::json!("module"));
        let json = doc.to_json().unwrap();
        assert_eq!(Document::from_json(&json).unwrap(), doc);
        let pretty = doc.to_json_pretty().unwrap();
        assert_eq!(Document::from_json(&pretty).unwrap(), doc);
    }

    #[test]
    fn test_accepts_legacy_field_names() {
        let json = r#"{"name":"r","type":"struct","now":1,"children":[
            {"name":"a","type":"wire","hierarcy":["t"],"wave":[{"time":1,"value":"1"}]}]}"#;
        let doc = Document::from_json(json).unwrap();
        assert_eq!(doc.children[0].hierarchy(), ["t"]);
        assert_eq!(doc.children[0].wave(), [WaveEntry::new(1, "1")]);
    }

    #[test]
    fn test_leaves() {
        let doc = example();
        let names: Vec<_> = doc.leaves().map(|n| n.full_name()).collect();
        assert_eq!(names, ["top.clk", "top.sub.en"]);
        assert!(doc.find_leaf("top.sub.en").unwrap().wave().is_empty());
        assert!(doc.find_leaf("top.sub").is_none());
    }
}
