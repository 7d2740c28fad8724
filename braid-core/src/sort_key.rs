//! Sort-key extraction and ordering
//!
//! Shards project the merge key for every document of a sorted stream as an
//! array under [`SORT_KEY_FIELD`]. This module extracts that array and
//! defines the total order used by the merge queue.
//!
//! Ordering rules:
//! 1. Type class ordering: Null < Bool < Number < String < Array < Object
//! 2. Numbers compare numerically with integer/float promotion
//! 3. Strings compare bytewise - shards have already mapped strings to
//!    collation comparison keys, so no collator is applied here
//! 4. Arrays compare element-wise, then by length
//! 5. Objects compare entry-wise (key, then value), then by length

use crate::error::{CoreError, Result};
use crate::sort::{SortDirection, SortSpec, SORT_KEY_FIELD};
use crate::Document;
use serde_json::Value;
use std::cmp::Ordering;

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

fn compare_numbers(a: &serde_json::Number, b: &serde_json::Number) -> Ordering {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return x.cmp(&y);
    }
    if let (Some(x), Some(y)) = (a.as_u64(), b.as_u64()) {
        return x.cmp(&y);
    }
    let x = a.as_f64().unwrap_or(f64::NAN);
    let y = b.as_f64().unwrap_or(f64::NAN);
    // JSON numbers cannot encode NaN; treat an unrepresentable pair as equal
    x.partial_cmp(&y).unwrap_or(Ordering::Equal)
}

/// Canonical total order over JSON values
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => compare_numbers(x, y),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => x
            .iter()
            .zip(y.iter())
            .map(|(l, r)| compare_values(l, r))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or_else(|| x.len().cmp(&y.len())),
        (Value::Object(x), Value::Object(y)) => x
            .iter()
            .zip(y.iter())
            .map(|((lk, lv), (rk, rv))| lk.cmp(rk).then_with(|| compare_values(lv, rv)))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or_else(|| x.len().cmp(&y.len())),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

/// A document's extracted merge key: one value per sort-spec entry, each
/// paired with the direction it is compared under.
#[derive(Debug, Clone)]
pub struct SortKey {
    parts: Vec<(Value, SortDirection)>,
}

impl SortKey {
    /// Extract the sort key from a document per the given spec.
    ///
    /// Fails if the document has no [`SORT_KEY_FIELD`] array. Key elements
    /// beyond the spec's length compare ascending.
    pub fn extract(doc: &Document, spec: &SortSpec) -> Result<SortKey> {
        let values = doc
            .get(SORT_KEY_FIELD)
            .and_then(Value::as_array)
            .ok_or(CoreError::MissingSortKey {
                field: SORT_KEY_FIELD,
            })?;

        let parts = values
            .iter()
            .enumerate()
            .map(|(i, v)| (v.clone(), spec.direction_at(i)))
            .collect();
        Ok(SortKey { parts })
    }

    /// The raw key values in priority order
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.parts.iter().map(|(v, _)| v)
    }
}

impl Ord for SortKey {
    fn cmp(&self, other: &Self) -> Ordering {
        for ((lv, dir), (rv, _)) in self.parts.iter().zip(other.parts.iter()) {
            let ord = compare_values(lv, rv);
            let ord = match dir {
                SortDirection::Ascending => ord,
                SortDirection::Descending => ord.reverse(),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        self.parts.len().cmp(&other.parts.len())
    }
}

impl PartialOrd for SortKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for SortKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SortKey {}
