//! Patch application - the single sanctioned write path into the world record.
//!
//! A patch sets or shallow-merges a value at a slash-delimited pointer into
//! the serialised record. Applying a batch always produces a new record, bumps
//! `meta.turn` exactly once and appends one ledger line per patch.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{Result, WorldError};
use crate::world_state::WorldRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOp {
    /// Assign the value at the path, creating intermediate maps.
    Set,
    /// Shallow-merge a map into whatever is at the path.
    Merge,
}

/// One state mutation, as sent over the wire by the policy layer.
///
/// A patch with a well-formed path can still be refused: a value that does
/// not fit the typed record (a string at `/player/pos/x`) is a
/// [`WorldError::RecordShape`], and an array index past the end is a
/// [`WorldError::PathTraversal`]. Either way the whole batch is dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patch {
    pub op: PatchOp,
    pub path: String,
    #[serde(default)]
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turn: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<String>,
}

impl Patch {
    pub fn set(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(PatchOp::Set, path, value)
    }

    pub fn merge(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(PatchOp::Merge, path, value)
    }

    fn new(op: PatchOp, path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            op,
            path: path.into(),
            value: value.into(),
            note: None,
            by: None,
            turn: None,
            seed: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Tag the patch with who proposed it and on which turn.
    pub fn with_provenance(mut self, by: impl Into<String>, turn: u64) -> Self {
        self.by = Some(by.into());
        self.turn = Some(turn);
        self
    }

    /// The ledger line this patch produces.
    pub fn ledger_line(&self, default_note: &str) -> String {
        let note = self.note.as_deref().unwrap_or(default_note);
        match (&self.by, self.turn) {
            (Some(by), Some(turn)) => format!("{note} [{by} T{turn}]"),
            (Some(by), None) => format!("{note} [{by}]"),
            (None, Some(turn)) => format!("{note} [T{turn}]"),
            (None, None) => note.to_string(),
        }
    }
}

/// Split a pointer into unescaped segments. `/` alone addresses the root.
pub fn parse_path(path: &str) -> Result<Vec<String>> {
    let rest = path
        .strip_prefix('/')
        .ok_or_else(|| WorldError::MalformedPath(path.to_string()))?;
    if rest.is_empty() {
        return Ok(Vec::new());
    }
    Ok(rest
        .split('/')
        .map(|seg| seg.replace("~1", "/").replace("~0", "~"))
        .collect())
}

/// Apply `patches` to a copy of `record`.
///
/// Every path is validated before anything is applied. The input record is
/// never modified; on error it is the caller's record that stays current.
/// `merge` is one level deep: nested maps in the value replace, not merge,
/// the maps already present. The patched document must still deserialize
/// into a [`WorldRecord`]; see [`Patch`] for the refusals that follow.
pub fn apply_patches(record: &WorldRecord, patches: &[Patch], default_note: &str) -> Result<WorldRecord> {
    let parsed = patches
        .iter()
        .map(|p| parse_path(&p.path))
        .collect::<Result<Vec<_>>>()?;

    let mut root = record.to_value()?;
    let mut lines = Vec::with_capacity(patches.len());
    for (patch, segments) in patches.iter().zip(&parsed) {
        let slot = slot_mut(&mut root, segments, &patch.path)?;
        match patch.op {
            PatchOp::Set => *slot = patch.value.clone(),
            PatchOp::Merge => {
                let incoming = patch
                    .value
                    .as_object()
                    .ok_or_else(|| WorldError::MergeValue(patch.path.clone()))?;
                if !slot.is_object() {
                    *slot = Value::Object(Map::new());
                }
                if let Value::Object(target) = slot {
                    for (key, value) in incoming {
                        target.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        lines.push(patch.ledger_line(default_note));
    }

    let mut next = WorldRecord::from_value(root)?;
    next.ledger.extend(lines);
    next.meta.turn += 1;
    debug!(patches = patches.len(), turn = next.meta.turn, "patches applied");
    Ok(next)
}

/// Walk to the slot a path addresses, creating maps on the way.
///
/// Numeric segments index existing arrays and `-` appends to one.
fn slot_mut<'a>(root: &'a mut Value, segments: &[String], path: &str) -> Result<&'a mut Value> {
    let mut current = root;
    for segment in segments {
        current = match current {
            Value::Array(items) => {
                let index = if segment == "-" {
                    items.push(Value::Null);
                    items.len() - 1
                } else {
                    segment
                        .parse::<usize>()
                        .ok()
                        .filter(|i| *i < items.len())
                        .ok_or_else(|| traversal(path, segment))?
                };
                &mut items[index]
            }
            other => {
                if !other.is_object() {
                    *other = Value::Object(Map::new());
                }
                other
                    .as_object_mut()
                    .ok_or_else(|| traversal(path, segment))?
                    .entry(segment.clone())
                    .or_insert(Value::Null)
            }
        };
    }
    Ok(current)
}

fn traversal(path: &str, segment: &str) -> WorldError {
    WorldError::PathTraversal {
        path: path.to_string(),
        segment: segment.to_string(),
    }
}
