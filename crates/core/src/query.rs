//! Declarative target queries
//!
//! A [`TargetQuery`] names a resource and an optional filter. The pipeline
//! never compiles filters itself: the data layer either pushes the whole
//! query down as one native destroy ([`crate::traits::DataLayer::destroy_query`])
//! or re-reads it into a record stream for the per-record path.

use serde::{Deserialize, Serialize};

use crate::record::{Record, ResourceName};
use crate::value::Value;

/// Filter expression over record attributes
///
/// Deliberately small: equality, membership, and boolean combinators cover
/// what changes can contribute atomically. Adapters are free to reject
/// shapes they cannot push down.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Filter {
    /// Attribute equals value
    Eq(String, Value),
    /// Attribute does not equal value
    Ne(String, Value),
    /// Attribute is one of the given values
    In(String, Vec<Value>),
    /// All sub-filters hold
    And(Vec<Filter>),
    /// At least one sub-filter holds
    Or(Vec<Filter>),
}

impl Filter {
    /// Evaluate against a record snapshot
    ///
    /// Reference semantics for adapters and the in-memory test layer; a
    /// missing attribute compares as [`Value::Null`].
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Filter::Eq(field, value) => {
                record.field(field).unwrap_or(&Value::Null) == value
            }
            Filter::Ne(field, value) => {
                record.field(field).unwrap_or(&Value::Null) != value
            }
            Filter::In(field, values) => {
                let actual = record.field(field).unwrap_or(&Value::Null);
                values.iter().any(|v| v == actual)
            }
            Filter::And(filters) => filters.iter().all(|f| f.matches(record)),
            Filter::Or(filters) => filters.iter().any(|f| f.matches(record)),
        }
    }

    /// Conjoin with another filter
    #[must_use]
    pub fn and(self, other: Filter) -> Filter {
        match self {
            Filter::And(mut filters) => {
                filters.push(other);
                Filter::And(filters)
            }
            f => Filter::And(vec![f, other]),
        }
    }
}

/// A declarative selection of target records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetQuery {
    /// Resource the query selects from
    pub resource: ResourceName,
    /// Filter over the resource, `None` meaning all records
    pub filter: Option<Filter>,
    /// Tenant the selection is scoped to, if any
    pub tenant: Option<String>,
}

impl TargetQuery {
    /// Select every record of a resource
    pub fn all(resource: impl Into<ResourceName>) -> Self {
        TargetQuery {
            resource: resource.into(),
            filter: None,
            tenant: None,
        }
    }

    /// Restrict the query with a filter, conjoining with any existing one
    #[must_use]
    pub fn filtered(mut self, filter: Filter) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and(filter),
            None => filter,
        });
        self
    }

    /// Scope the query to a tenant
    #[must_use]
    pub fn for_tenant(mut self, tenant: impl Into<String>) -> Self {
        self.tenant = Some(tenant.into());
        self
    }
}

/// A query compiled by the data layer into its native representation
///
/// The payload shape is adapter-defined; the pipeline only threads it from
/// `compile_query` into `destroy_query` untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct NativeQuery {
    /// Resource the compiled query targets
    pub resource: ResourceName,
    /// Adapter-defined compiled representation
    pub repr: Value,
}

/// Options for a pushed-down query execution
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryExecuteOptions {
    /// Whether the data layer should return the destroyed records
    pub return_records: bool,
    /// Tenant scope, if any
    pub tenant: Option<String>,
}

/// Outcome of a pushed-down query execution
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    /// The operation completed; no records requested
    Done,
    /// The operation completed and returned the destroyed records
    Records(Vec<Record>),
}
