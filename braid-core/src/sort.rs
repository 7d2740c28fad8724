//! Sort specifications for cross-shard merging
//!
//! A [`SortSpec`] is an ordered list of fields with directions, mirroring
//! the order-by clause the shards evaluated. Braid never re-sorts documents;
//! the spec only drives the comparison of precomputed sort keys.

/// Conventional field under which each shard projects the precomputed sort
/// key into every document of a sorted stream. The value is an array with
/// one element per [`SortSpec`] entry.
pub const SORT_KEY_FIELD: &str = "$sortKey";

/// Sort direction for a single key field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    /// Decode the wire convention (`1` ascending, `-1` descending)
    pub fn from_spec_value(value: i64) -> Option<SortDirection> {
        match value {
            1 => Some(SortDirection::Ascending),
            -1 => Some(SortDirection::Descending),
            _ => None,
        }
    }

    /// Encode as the wire convention
    pub fn spec_value(&self) -> i64 {
        match self {
            SortDirection::Ascending => 1,
            SortDirection::Descending => -1,
        }
    }
}

/// A single field of a sort specification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortField {
    /// Field name as evaluated by the shards
    pub name: String,
    /// Sort direction
    pub direction: SortDirection,
}

/// Ordered sort specification
///
/// Field order defines comparison priority: the first field is the primary
/// key, later fields break ties.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SortSpec {
    fields: Vec<SortField>,
}

impl SortSpec {
    /// Create an empty sort specification
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an ascending field
    pub fn asc(mut self, name: impl Into<String>) -> Self {
        self.fields.push(SortField {
            name: name.into(),
            direction: SortDirection::Ascending,
        });
        self
    }

    /// Append a descending field
    pub fn desc(mut self, name: impl Into<String>) -> Self {
        self.fields.push(SortField {
            name: name.into(),
            direction: SortDirection::Descending,
        });
        self
    }

    /// Whether no fields are specified
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Number of key fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// The key fields in priority order
    pub fn fields(&self) -> &[SortField] {
        &self.fields
    }

    /// Direction of the key element at `index`; ascending past the end
    pub fn direction_at(&self, index: usize) -> SortDirection {
        self.fields
            .get(index)
            .map(|f| f.direction)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_order() {
        let spec = SortSpec::new().asc("name").desc("age");
        assert_eq!(spec.len(), 2);
        assert_eq!(spec.fields()[0].name, "name");
        assert_eq!(spec.fields()[0].direction, SortDirection::Ascending);
        assert_eq!(spec.fields()[1].name, "age");
        assert_eq!(spec.fields()[1].direction, SortDirection::Descending);
    }

    #[test]
    fn test_direction_at_defaults_ascending() {
        let spec = SortSpec::new().desc("a");
        assert_eq!(spec.direction_at(0), SortDirection::Descending);
        assert_eq!(spec.direction_at(5), SortDirection::Ascending);
    }

    #[test]
    fn test_spec_value_roundtrip() {
        assert_eq!(
            SortDirection::from_spec_value(1),
            Some(SortDirection::Ascending)
        );
        assert_eq!(
            SortDirection::from_spec_value(-1),
            Some(SortDirection::Descending)
        );
        assert_eq!(SortDirection::from_spec_value(0), None);
        assert_eq!(SortDirection::Ascending.spec_value(), 1);
        assert_eq!(SortDirection::Descending.spec_value(), -1);
    }
}
