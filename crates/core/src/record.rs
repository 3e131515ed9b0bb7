//! Record and resource identity types
//!
//! A [`Record`] is the pipeline's view of one already-identified target row:
//! a resource name, a primary key, and an attribute snapshot. The pipeline
//! never fetches records itself; they arrive from the caller's stream or from
//! the data layer's query re-read.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::value::Value;

/// Name of a declared resource
///
/// Resources are declared outside this crate; the pipeline only needs a
/// stable identity to scope destroys, transactions, and rollbacks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceName(String);

impl ResourceName {
    /// Create a resource name
    pub fn new(name: impl Into<String>) -> Self {
        ResourceName(name.into())
    }

    /// The name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ResourceName {
    fn from(s: &str) -> Self {
        ResourceName(s.to_string())
    }
}

impl std::fmt::Display for ResourceName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Primary key of a record within its resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordKey(String);

impl RecordKey {
    /// Create a record key
    pub fn new(key: impl Into<String>) -> Self {
        RecordKey(key.into())
    }

    /// The key as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RecordKey {
    fn from(s: &str) -> Self {
        RecordKey(s.to_string())
    }
}

impl std::fmt::Display for RecordKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One target record flowing through the pipeline
///
/// Attribute order is stable (ordered map) so snapshots compare and
/// serialize deterministically across runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Resource this record belongs to
    pub resource: ResourceName,
    /// Primary key within the resource
    pub key: RecordKey,
    /// Attribute snapshot
    pub fields: BTreeMap<String, Value>,
}

impl Record {
    /// Create a record with no attributes
    pub fn new(resource: impl Into<ResourceName>, key: impl Into<RecordKey>) -> Self {
        Record {
            resource: resource.into(),
            key: key.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Set an attribute, returning self for chaining
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Get an attribute value
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Set an attribute value
    pub fn set_field(&mut self, name: impl Into<String>, value: Value) {
        self.fields.insert(name.into(), value);
    }
}

impl From<String> for ResourceName {
    fn from(s: String) -> Self {
        ResourceName(s)
    }
}

impl From<String> for RecordKey {
    fn from(s: String) -> Self {
        RecordKey(s)
    }
}
