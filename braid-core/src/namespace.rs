//! Fully-qualified collection namespaces

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A fully-qualified `database.collection` namespace.
///
/// The collection part may itself contain dots (`db.system.views`), so
/// parsing splits on the first dot only. Serialized as the dotted string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Namespace {
    database: String,
    collection: String,
}

impl Namespace {
    /// Create a namespace from database and collection parts
    pub fn new(database: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            collection: collection.into(),
        }
    }

    /// Parse a dotted `db.collection` string
    pub fn parse(s: &str) -> Result<Self> {
        match s.split_once('.') {
            Some((db, coll)) if !db.is_empty() && !coll.is_empty() => Ok(Self::new(db, coll)),
            _ => Err(CoreError::InvalidNamespace(s.to_string())),
        }
    }

    /// The database part
    pub fn database(&self) -> &str {
        &self.database
    }

    /// The collection part
    pub fn collection(&self) -> &str {
        &self.collection
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.database, self.collection)
    }
}

impl FromStr for Namespace {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Namespace {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl From<Namespace> for String {
    fn from(ns: Namespace) -> String {
        ns.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_roundtrip() {
        let ns = Namespace::parse("orders.line_items").unwrap();
        assert_eq!(ns.database(), "orders");
        assert_eq!(ns.collection(), "line_items");
        assert_eq!(ns.to_string(), "orders.line_items");
    }

    #[test]
    fn test_parse_splits_on_first_dot() {
        let ns = Namespace::parse("admin.system.views").unwrap();
        assert_eq!(ns.database(), "admin");
        assert_eq!(ns.collection(), "system.views");
    }

    #[test]
    fn test_parse_rejects_missing_parts() {
        assert!(Namespace::parse("nodot").is_err());
        assert!(Namespace::parse(".coll").is_err());
        assert!(Namespace::parse("db.").is_err());
        assert!(Namespace::parse("").is_err());
    }

    #[test]
    fn test_serde_as_dotted_string() {
        let ns = Namespace::new("orders", "items");
        let json = serde_json::to_string(&ns).unwrap();
        assert_eq!(json, "\"orders.items\"");

        let parsed: Namespace = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, ns);

        let bad: std::result::Result<Namespace, _> = serde_json::from_str("\"nodot\"");
        assert!(bad.is_err());
    }
}
