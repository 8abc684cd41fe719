//! Row types for the edge, link and node tables
//!
//! Column names follow the upstream extraction (`A`, `B`, `lanes:forward`, ...).
//! Columns this crate does not interpret are carried through in `extra`.

use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use geo::LineString;
use netprep_common::County;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Endpoint pair plus the parallel-edge disambiguator
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EdgeKey {
    pub a: i64,
    pub b: i64,
    pub key: u32,
}

impl EdgeKey {
    pub fn new(a: i64, b: i64, key: u32) -> Self {
        Self { a, b, key }
    }

    /// Same edge, opposite direction
    pub fn reversed(self) -> Self {
        Self {
            a: self.b,
            b: self.a,
            key: self.key,
        }
    }
}

impl fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, key {})", self.a, self.b, self.key)
    }
}

/// A tag column holding either one value or a list of values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    /// List form; a scalar is a single-element list
    pub fn as_slice(&self) -> &[T] {
        match self {
            OneOrMany::One(v) => std::slice::from_ref(v),
            OneOrMany::Many(v) => v,
        }
    }

    pub fn is_many(&self) -> bool {
        matches!(self, OneOrMany::Many(_))
    }
}

impl<T: Default> Default for OneOrMany<T> {
    fn default() -> Self {
        OneOrMany::One(T::default())
    }
}

/// Raw lane tag: a count, a numeric string, or a list of either
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LaneValue {
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<LaneValue>),
}

/// Undirected edge as produced by the graph extraction stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    #[serde(rename = "A")]
    pub a: i64,
    #[serde(rename = "B")]
    pub b: i64,
    #[serde(default)]
    pub key: u32,
    pub highway: OneOrMany<String>,
    #[serde(default)]
    pub oneway: OneOrMany<bool>,
    #[serde(default)]
    pub reversed: OneOrMany<bool>,
    #[serde(default)]
    pub lanes: Option<LaneValue>,
    #[serde(rename = "lanes:forward", default)]
    pub lanes_forward: Option<LaneValue>,
    #[serde(rename = "lanes:backward", default)]
    pub lanes_backward: Option<LaneValue>,
    #[serde(rename = "lanes:both_ways", default)]
    pub lanes_both_ways: Option<LaneValue>,
    #[serde(rename = "lanes:bus", default)]
    pub lanes_bus: Option<LaneValue>,
    #[serde(rename = "lanes:bus:forward", default)]
    pub lanes_bus_forward: Option<LaneValue>,
    #[serde(rename = "lanes:bus:backward", default)]
    pub lanes_bus_backward: Option<LaneValue>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, with = "netprep_common::county::serde_opt")]
    pub county: Option<County>,
    pub geometry: LineString<f64>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl EdgeRecord {
    pub fn edge_key(&self) -> EdgeKey {
        EdgeKey::new(self.a, self.b, self.key)
    }
}

/// Who may use the general-purpose or managed lanes of a link
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LaneAccess {
    #[default]
    Any,
    Bus,
}

/// One traversable direction of a road segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectedLink {
    #[serde(rename = "A")]
    pub a: i64,
    #[serde(rename = "B")]
    pub b: i64,
    #[serde(default)]
    pub key: u32,
    pub highway: String,
    #[serde(default)]
    pub highway_orig: String,
    #[serde(default)]
    pub steps: bool,
    #[serde(default)]
    pub oneway: bool,
    #[serde(default)]
    pub reversed: bool,
    #[serde(default)]
    pub lanes_orig: Option<u32>,
    pub lanes: u32,
    #[serde(default)]
    pub buslanes: u32,
    #[serde(default)]
    pub access: LaneAccess,
    #[serde(rename = "ML_access", default)]
    pub ml_access: LaneAccess,
    #[serde(rename = "ML_lanes", default)]
    pub ml_lanes: u32,
    pub drive_access: bool,
    pub bike_access: bool,
    pub walk_access: bool,
    pub truck_access: bool,
    pub bus_access: bool,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, with = "netprep_common::county::serde_opt")]
    pub county: Option<County>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_link_id: Option<i64>,
    pub geometry: LineString<f64>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl DirectedLink {
    pub fn edge_key(&self) -> EdgeKey {
        EdgeKey::new(self.a, self.b, self.key)
    }
}

/// Network node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    #[serde(alias = "osmid")]
    pub id: i64,
    #[serde(alias = "X")]
    pub x: f64,
    #[serde(alias = "Y")]
    pub y: f64,
    #[serde(default, with = "netprep_common::county::serde_opt")]
    pub county: Option<County>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_node_id: Option<i64>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Read a JSON array of records
pub fn read_table<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<Vec<T>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| Error::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Write records as a pretty-printed JSON array
pub fn write_table<T: Serialize, P: AsRef<Path>>(path: P, rows: &[T]) -> Result<()> {
    let path = path.as_ref();
    let io_err = |source: std::io::Error| Error::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(io_err)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, rows).map_err(|source| Error::Json {
        path: path.to_path_buf(),
        source,
    })?;
    writer.flush().map_err(io_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_record_accepts_scalar_and_list_tags() {
        let raw = r#"{
            "A": 1, "B": 2,
            "highway": ["residential", "service"],
            "oneway": false,
            "reversed": [false, true],
            "lanes": ["2", "3"],
            "lanes:forward": 2,
            "maxspeed": "25 mph",
            "geometry": [{"x": 0.0, "y": 0.0}, {"x": 1.0, "y": 0.0}]
        }"#;
        let edge: EdgeRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(edge.key, 0);
        assert!(edge.highway.is_many());
        assert_eq!(edge.reversed.as_slice(), &[false, true]);
        assert_eq!(edge.lanes_forward, Some(LaneValue::Int(2)));
        assert_eq!(
            edge.lanes,
            Some(LaneValue::List(vec![
                LaneValue::Text("2".into()),
                LaneValue::Text("3".into())
            ]))
        );
        assert_eq!(edge.extra.get("maxspeed"), Some(&serde_json::json!("25 mph")));
        assert_eq!(edge.county, None);
    }

    #[test]
    fn missing_flags_default_to_false() {
        let raw = r#"{"A": 5, "B": 6, "highway": "primary", "geometry": []}"#;
        let edge: EdgeRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(edge.oneway, OneOrMany::One(false));
        assert_eq!(edge.reversed, OneOrMany::One(false));
    }

    #[test]
    fn edge_key_reverses_endpoints() {
        let key = EdgeKey::new(3, 9, 1);
        assert_eq!(key.reversed(), EdgeKey::new(9, 3, 1));
        assert_eq!(key.to_string(), "(3, 9, key 1)");
    }

    #[test]
    fn node_accepts_upstream_column_names() {
        let raw = r#"{"osmid": 42, "X": 1.5, "Y": 2.5, "county": "Marin"}"#;
        let node: NodeRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(node.id, 42);
        assert_eq!(node.county, Some(County::Marin));
    }

    #[test]
    fn table_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nodes.json");
        let nodes = vec![NodeRecord {
            id: 1,
            x: 0.0,
            y: 0.0,
            county: Some(County::Napa),
            model_node_id: None,
            extra: BTreeMap::new(),
        }];
        write_table(&path, &nodes).unwrap();
        let back: Vec<NodeRecord> = read_table(&path).unwrap();
        assert_eq!(back, nodes);
    }

    #[test]
    fn read_table_reports_missing_file() {
        let err = read_table::<NodeRecord, _>("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
