//! Notebook normalizer — strips volatile fields from a parsed notebook
//!
//! The normalizer works on an untyped `serde_json::Value` so that keys it
//! does not know about survive untouched.
//!
//! # Pipeline
//!
//! `notebook JSON → parse → normalize_notebook → serialize_canonical`
//!
//! # Guarantees
//!
//! - **Idempotent**: a second pass over a normalized notebook reports no change
//! - **Deterministic**: same input always produces the same bytes
//! - **Conservative**: only execution counts, outputs, widget ids and
//!   (selected) metadata are touched

use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use serde_json::{Map, Value};

use crate::{Error, Result};

/// MIME key of interactive widget outputs
pub const WIDGET_VIEW_MIME: &str = "application/vnd.jupyter.widget-view+json";

/// Keys holding runtime-assigned widget model identifiers
pub const WIDGET_ID_KEYS: [&str; 2] = ["model_id", "modelId"];

/// Metadata keys removed when metadata is not cleared wholesale
pub const VOLATILE_METADATA_KEYS: [&str; 3] = ["widgets", "execution", "widgets_state"];

const CELLS: &str = "cells";
const EXECUTION_COUNT: &str = "execution_count";
const METADATA: &str = "metadata";
const OUTPUTS: &str = "outputs";

/// Knobs for [`normalize_notebook`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// Replace the whole top-level `metadata` with `{}` instead of removing
    /// only [`VOLATILE_METADATA_KEYS`]
    pub clear_metadata: bool,
}

// ── Public API ─────────────────────────────────────────────

/// Remove every `model_id` / `modelId` key from `value`, at any depth
///
/// Returns true if at least one key was removed.
pub fn strip_widget_ids(value: &mut Value) -> bool {
    match value {
        Value::Object(map) => {
            let mut removed = false;
            for key in WIDGET_ID_KEYS {
                removed |= map.remove(key).is_some();
            }
            for child in map.values_mut() {
                removed |= strip_widget_ids(child);
            }
            removed
        }
        Value::Array(items) => items
            .iter_mut()
            .fold(false, |removed, item| strip_widget_ids(item) | removed),
        _ => false,
    }
}

/// Normalize a parsed notebook in place
///
/// Steps:
/// 1. Null the stray top-level `execution_count`
/// 2. Null every cell's `execution_count`, empty its `outputs`, strip widget ids
/// 3. Clear `metadata`, or drop only its volatile keys
///
/// Returns whether anything was changed.
///
/// # Errors
/// Returns `InvalidNotebook` if the document is not an object, `cells` is not
/// an array of objects, or `metadata` is not an object when it has to be
/// edited key by key.
pub fn normalize_notebook(notebook: &mut Value, options: &NormalizeOptions) -> Result<bool> {
    let nb = notebook
        .as_object_mut()
        .ok_or_else(|| Error::InvalidNotebook("top level is not a JSON object".into()))?;
    let mut changed = false;

    // ── Step 1: Top-level execution count ──────────────
    if let Some(count) = nb.get_mut(EXECUTION_COUNT) {
        changed |= clear_value(count);
    }

    // ── Step 2: Cells ──────────────────────────────────
    let cells = nb
        .entry(CELLS)
        .or_insert_with(|| Value::Array(Vec::new()))
        .as_array_mut()
        .ok_or_else(|| Error::InvalidNotebook("`cells` is not an array".into()))?;
    for (index, cell) in cells.iter_mut().enumerate() {
        changed |= normalize_cell(index, cell)?;
    }

    // ── Step 3: Metadata ───────────────────────────────
    changed |= normalize_metadata(nb, options)?;

    Ok(changed)
}

/// Serialize a notebook to its canonical on-disk form
///
/// Produces deterministic output with:
/// - Object keys sorted at every depth
/// - 1-space indentation
/// - Non-ASCII characters written as-is
/// - A trailing newline
pub fn serialize_canonical(notebook: &Value) -> Result<Vec<u8>> {
    let canonical = canonicalize(notebook);
    let mut out = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(b" "));
    canonical
        .serialize(&mut serializer)
        .map_err(Error::Serialize)?;
    out.push(b'\n');
    Ok(out)
}

// ── Steps ──────────────────────────────────────────────────

fn normalize_cell(index: usize, cell: &mut Value) -> Result<bool> {
    let cell = cell
        .as_object_mut()
        .ok_or_else(|| Error::InvalidNotebook(format!("cell {index} is not a JSON object")))?;
    let mut changed = false;

    if let Some(count) = cell.get_mut(EXECUTION_COUNT) {
        changed |= clear_value(count);
    }

    if let Some(outputs) = cell.get_mut(OUTPUTS) {
        if is_truthy(outputs) {
            *outputs = Value::Array(Vec::new());
            changed = true;
        }
        // No-op once outputs are emptied.
        changed |= strip_widget_ids(outputs);
    }

    Ok(changed)
}

fn normalize_metadata(nb: &mut Map<String, Value>, options: &NormalizeOptions) -> Result<bool> {
    if options.clear_metadata {
        return Ok(match nb.get_mut(METADATA) {
            Some(metadata) if is_truthy(metadata) => {
                *metadata = Value::Object(Map::new());
                true
            }
            _ => false,
        });
    }

    let metadata = nb
        .entry(METADATA)
        .or_insert_with(|| Value::Object(Map::new()))
        .as_object_mut()
        .ok_or_else(|| Error::InvalidNotebook("`metadata` is not an object".into()))?;
    let mut changed = false;
    for key in VOLATILE_METADATA_KEYS {
        changed |= metadata.remove(key).is_some();
    }
    Ok(changed)
}

// ── Helpers ────────────────────────────────────────────────

/// Set a value to `null`, reporting whether it was anything else before
fn clear_value(value: &mut Value) -> bool {
    if value.is_null() {
        return false;
    }
    *value = Value::Null;
    true
}

/// Falsy values are `null`, `false`, zero, and empty strings, arrays, objects
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Rebuild objects with sorted keys, independent of `serde_json` map features
fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(key, value)| (key.clone(), canonicalize(value)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}
