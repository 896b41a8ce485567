//! Investigation records and total path resolution over their JSON payloads.
//!
//! Records carry no fixed schema. Field access therefore goes through
//! [`resolve_path`], which walks a dot-delimited path and returns `None` on
//! any missing key or type mismatch instead of failing.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::MinerError;

/// Research domain a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    /// Near-death experience
    Nde,
    Ganzfeld,
    CrisisApparition,
    RemoteViewing,
    Geophysical,
    /// UFO/UAP sightings
    Ufo,
}

impl Domain {
    pub const ALL: [Domain; 6] = [
        Domain::Nde,
        Domain::Ganzfeld,
        Domain::CrisisApparition,
        Domain::RemoteViewing,
        Domain::Geophysical,
        Domain::Ufo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Nde => "nde",
            Domain::Ganzfeld => "ganzfeld",
            Domain::CrisisApparition => "crisis_apparition",
            Domain::RemoteViewing => "remote_viewing",
            Domain::Geophysical => "geophysical",
            Domain::Ufo => "ufo",
        }
    }

    /// Human-readable label used in summaries.
    pub fn label(&self) -> &'static str {
        match self {
            Domain::Nde => "near-death experience",
            Domain::Ganzfeld => "ganzfeld",
            Domain::CrisisApparition => "crisis apparition",
            Domain::RemoteViewing => "remote viewing",
            Domain::Geophysical => "geophysical",
            Domain::Ufo => "UFO/UAP",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Domain {
    type Err = MinerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        Domain::ALL
            .into_iter()
            .find(|d| d.as_str() == normalized)
            .ok_or_else(|| MinerError::configuration(format!("Unknown domain '{s}'")))
    }
}

/// One investigation record as seen by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub domain: Domain,
    pub created_at: DateTime<Utc>,
    /// Merged raw and exploratory payload
    pub data: Value,
}

impl Record {
    pub fn new(
        id: impl Into<String>,
        domain: Domain,
        created_at: DateTime<Utc>,
        data: Value,
    ) -> Self {
        Self {
            id: id.into(),
            domain,
            created_at,
            data,
        }
    }

    /// Resolves a dot-delimited path inside the payload.
    pub fn field(&self, path: &str) -> Option<&Value> {
        resolve_path(&self.data, path)
    }
}

/// Walks `path` (dot-delimited object keys) through `value`.
///
/// Returns `None` for an empty path segment, a missing key, or an attempt to
/// descend into a non-object. A JSON `null` at the end of the path is
/// returned as `Some(Value::Null)`.
pub fn resolve_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return None;
    }
    path.split('.').try_fold(value, |current, segment| {
        if segment.is_empty() {
            return None;
        }
        current.as_object()?.get(segment)
    })
}

/// Flattens a payload into `(path, leaf)` pairs.
///
/// Objects are recursed into; arrays and scalars (including `null`) are
/// leaves. Empty objects produce nothing. Order follows the object's key
/// order, so the same payload always yields the same sequence.
///
/// Keys that are empty or contain a `.` are skipped with their subtree:
/// no dotted path can address them, and `{"a.b": 1}` would otherwise
/// collide with `{"a": {"b": 1}}`.
pub fn flatten(value: &Value) -> Vec<(String, &Value)> {
    let mut out = Vec::new();
    if let Value::Object(map) = value {
        flatten_into(map, "", &mut out);
    }
    out
}

fn flatten_into<'a>(map: &'a Map<String, Value>, prefix: &str, out: &mut Vec<(String, &'a Value)>) {
    for (key, child) in map {
        if key.is_empty() || key.contains('.') {
            continue;
        }
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match child {
            Value::Object(inner) => flatten_into(inner, &path, out),
            leaf => out.push((path, leaf)),
        }
    }
}

/// Merges `overlay` into `base`.
///
/// Nested objects merge key by key; any other overlay value replaces the
/// base value. A non-object overlay replaces `base` entirely.
pub fn merge_documents(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) if existing.is_object() && value.is_object() => {
                        merge_documents(existing, value)
                    }
                    _ => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (_, Value::Null) => {}
        (base, overlay) => *base = overlay,
    }
}

/// Last segment of a dot path, used as the display name of a variable.
pub fn leaf_name(path: &str) -> &str {
    path.rsplit('.').next().unwrap_or(path)
}
