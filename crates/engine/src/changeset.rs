//! The mutable unit of work for one target record
//!
//! A [`Changeset`] accumulates everything the pipeline learns about one
//! record before execution: cast arguments, pending attribute changes,
//! validation and authorization errors, deferred hooks, and the tag set of
//! changes that applied to it. The tag set is what scopes `after_batch`
//! hooks to exactly the records a change touched.

use std::collections::BTreeMap;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use scythe_core::{MutationError, Notification, Record, Value};

/// Deferred hook run against the committed record after execution
pub type AfterActionHook =
    Arc<dyn Fn(&Record) -> Result<Vec<Notification>, MutationError> + Send + Sync>;

/// Deferred hook run exactly once per record after the transaction resolves
///
/// Runs on failure paths too, so implementations must tolerate receiving the
/// original (un-materialized) record snapshot.
pub type AfterTransactionHook =
    Arc<dyn Fn(&Record) -> Result<Vec<Notification>, MutationError> + Send + Sync>;

/// Callback applying one pending relationship operation
pub type RelationshipHook =
    Arc<dyn Fn(&Record) -> Result<Vec<Notification>, MutationError> + Send + Sync>;

/// A linked-record operation implied by the action
pub struct PendingRelationship {
    /// Relationship name, used in error reporting
    pub name: String,
    /// The operation to run against the committed record
    pub hook: RelationshipHook,
}

impl std::fmt::Debug for PendingRelationship {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingRelationship")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// In-flight mutation request for one record
pub struct Changeset {
    record: Record,
    arguments: BTreeMap<String, Value>,
    attributes: BTreeMap<String, Value>,
    valid: bool,
    errors: Vec<MutationError>,
    source_index: usize,
    context: FxHashMap<String, Value>,
    applied_changes: SmallVec<[u16; 8]>,
    after_action: Vec<AfterActionHook>,
    after_transaction: Vec<AfterTransactionHook>,
    relationships: Vec<PendingRelationship>,
}

impl Changeset {
    /// Start a changeset for a record at its original stream position
    pub fn new(record: Record, source_index: usize) -> Self {
        Changeset {
            record,
            arguments: BTreeMap::new(),
            attributes: BTreeMap::new(),
            valid: true,
            errors: Vec::new(),
            source_index,
            context: FxHashMap::default(),
            applied_changes: SmallVec::new(),
            after_action: Vec::new(),
            after_transaction: Vec::new(),
            relationships: Vec::new(),
        }
    }

    /// The original record snapshot
    pub fn record(&self) -> &Record {
        &self.record
    }

    /// 0-based position in the original input stream
    pub fn source_index(&self) -> usize {
        self.source_index
    }

    /// Whether the changeset has accumulated no errors
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Errors accumulated so far
    pub fn errors(&self) -> &[MutationError] {
        &self.errors
    }

    /// Drain accumulated errors, leaving the changeset invalid
    pub fn take_errors(&mut self) -> Vec<MutationError> {
        std::mem::take(&mut self.errors)
    }

    /// Append an error; the changeset stays in its batch but becomes invalid
    pub fn add_error(&mut self, error: MutationError) {
        self.valid = false;
        self.errors.push(error);
    }

    /// A cast argument set during preparation
    pub fn argument(&self, name: &str) -> Option<&Value> {
        self.arguments.get(name)
    }

    /// Set a cast argument
    pub fn set_argument(&mut self, name: impl Into<String>, value: Value) {
        self.arguments.insert(name.into(), value);
    }

    /// Record a pending attribute change, applied at materialization
    pub fn change_attribute(&mut self, name: impl Into<String>, value: Value) {
        self.attributes.insert(name.into(), value);
    }

    /// Pending attribute changes
    pub fn attributes(&self) -> &BTreeMap<String, Value> {
        &self.attributes
    }

    /// A context value
    pub fn context(&self, key: &str) -> Option<&Value> {
        self.context.get(key)
    }

    /// Set a context value
    pub fn set_context(&mut self, key: impl Into<String>, value: Value) {
        self.context.insert(key.into(), value);
    }

    /// Tag this changeset as touched by the change at `index`
    pub fn tag_change(&mut self, index: usize) {
        let tag = index as u16;
        if !self.applied_changes.contains(&tag) {
            self.applied_changes.push(tag);
        }
    }

    /// Whether the change at `index` applied to this changeset
    pub fn applied(&self, index: usize) -> bool {
        self.applied_changes.contains(&(index as u16))
    }

    /// Defer a hook against the committed record
    pub fn defer_after_action(&mut self, hook: AfterActionHook) {
        self.after_action.push(hook);
    }

    /// Defer a hook until the transaction resolves
    pub fn defer_after_transaction(&mut self, hook: AfterTransactionHook) {
        self.after_transaction.push(hook);
    }

    /// Queue a relationship operation implied by the action
    pub fn manage_relationship(&mut self, name: impl Into<String>, hook: RelationshipHook) {
        self.relationships.push(PendingRelationship {
            name: name.into(),
            hook,
        });
    }

    /// Deferred after-action hooks
    pub fn after_action_hooks(&self) -> &[AfterActionHook] {
        &self.after_action
    }

    /// Deferred after-transaction hooks
    pub fn after_transaction_hooks(&self) -> &[AfterTransactionHook] {
        &self.after_transaction
    }

    /// Queued relationship operations
    pub fn relationships(&self) -> &[PendingRelationship] {
        &self.relationships
    }

    /// Whether execution must keep the materialized record even when the
    /// caller did not ask for records
    pub fn needs_materialized_result(&self) -> bool {
        !self.after_action.is_empty() || !self.relationships.is_empty()
    }

    /// The final record state: the original snapshot with pending attribute
    /// changes applied
    pub fn materialize(&self) -> Record {
        let mut record = self.record.clone();
        for (name, value) in &self.attributes {
            record.set_field(name.clone(), value.clone());
        }
        record
    }
}

impl std::fmt::Debug for Changeset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Changeset")
            .field("record", &self.record.key)
            .field("source_index", &self.source_index)
            .field("valid", &self.valid)
            .field("errors", &self.errors.len())
            .field("applied_changes", &self.applied_changes)
            .finish_non_exhaustive()
    }
}
