//! Action descriptors
//!
//! An [`Action`] is the immutable description of one mutation type: its
//! ordered changes and validations, how it executes (native data-layer
//! destroy, or a collaborator-supplied manual executor), whether it can run
//! atomically, and which additional resources a transaction must also lock.
//!
//! The executor variant is closed and selected once at action-binding time;
//! nothing downstream re-checks capability presence dynamically.

use std::sync::Arc;

use scythe_core::{
    Actor, Filter, MutationError, Notification, Record, RecordKey, ResourceName, RunToken, Value,
    ValueKind,
};

use crate::changeset::Changeset;

/// Context handed to changes, validations, and manual executors
#[derive(Debug, Clone)]
pub struct ExecContext {
    /// Run this invocation belongs to
    pub run: RunToken,
    /// Acting principal, if any
    pub actor: Option<Actor>,
    /// Tenant scope, if any
    pub tenant: Option<String>,
}

/// Which batch callbacks a change declares
///
/// Rust traits cannot observe overridden defaults, so changes state their
/// hooks explicitly; the executor consults this before partitioning subsets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeHooks {
    /// `before_batch` is meaningful for this change
    pub before_batch: bool,
    /// `after_batch` is meaningful for this change
    pub after_batch: bool,
}

/// What a change contributes to a fully atomic changeset
#[derive(Debug, Clone, PartialEq)]
pub enum AtomicChange {
    /// Narrow the pushed-down query with an additional filter
    Restrict(Filter),
    /// Set an attribute as part of the native operation
    Set {
        /// Attribute name
        field: String,
        /// Value to set
        value: Value,
    },
}

/// Whether a validation can run on the atomic path
#[derive(Debug, Clone, PartialEq)]
pub enum AtomicSupport {
    /// The native operation subsumes this validation
    Supported,
    /// The validation needs a record; forces the streaming path
    Unsupported,
    /// The validation statically fails for this action invocation
    Invalid(MutationError),
}

/// A declared change module
pub trait Change: Send + Sync {
    /// Stable name, used in logs and errors
    fn name(&self) -> &str;

    /// Apply to one changeset
    fn apply(&self, changeset: &mut Changeset, ctx: &ExecContext) -> Result<(), MutationError>;

    /// Apply to a whole batch in one call
    ///
    /// The default folds per-changeset failures into each changeset; batch
    /// transformations override this.
    fn apply_batch(&self, batch: &mut [Changeset], ctx: &ExecContext) {
        for changeset in batch.iter_mut() {
            if let Err(error) = self.apply(changeset, ctx) {
                changeset.add_error(error);
            }
        }
    }

    /// Atomic translation of this change, if it has one
    fn atomic(&self) -> Option<AtomicChange> {
        None
    }

    /// Which batch callbacks this change declares
    fn hooks(&self) -> ChangeHooks {
        ChangeHooks::default()
    }

    /// Batch callback before execution, over exactly the matched subset
    fn before_batch(&self, batch: &mut [Changeset], ctx: &ExecContext) -> Vec<Notification> {
        let _ = (batch, ctx);
        Vec::new()
    }

    /// Batch callback after execution, over exactly the records the
    /// `apply`/`apply_batch` step touched
    fn after_batch(
        &self,
        records: &[Record],
        ctx: &ExecContext,
    ) -> Result<Vec<Notification>, MutationError> {
        let _ = (records, ctx);
        Ok(Vec::new())
    }
}

/// A declared validation module
pub trait Validation: Send + Sync {
    /// Stable name, used in logs and errors
    fn name(&self) -> &str;

    /// Validate one changeset
    fn validate(&self, changeset: &Changeset, ctx: &ExecContext) -> Result<(), MutationError>;

    /// Whether the atomic path can subsume this validation
    fn atomic(&self) -> AtomicSupport {
        AtomicSupport::Unsupported
    }
}

/// A where-predicate scoping a change or validation to a batch subset
pub trait Predicate: Send + Sync {
    /// Whether the change/validation applies to this changeset
    fn test(&self, changeset: &Changeset) -> bool;
}

impl<F> Predicate for F
where
    F: Fn(&Changeset) -> bool + Send + Sync,
{
    fn test(&self, changeset: &Changeset) -> bool {
        self(changeset)
    }
}

/// A change plus its scoping
pub struct ChangeSpec {
    /// The change module
    pub change: Arc<dyn Change>,
    /// Where-predicates, AND-combined
    pub conditions: Vec<Arc<dyn Predicate>>,
    /// Only apply to changesets that are still valid
    pub only_when_valid: bool,
}

impl ChangeSpec {
    /// An unconditional change
    pub fn new(change: Arc<dyn Change>) -> Self {
        ChangeSpec {
            change,
            conditions: Vec::new(),
            only_when_valid: false,
        }
    }

    /// Add a where-predicate
    #[must_use]
    pub fn when(mut self, predicate: Arc<dyn Predicate>) -> Self {
        self.conditions.push(predicate);
        self
    }

    /// Only apply to changesets that are still valid
    #[must_use]
    pub fn only_when_valid(mut self) -> Self {
        self.only_when_valid = true;
        self
    }

    /// Whole-batch fast path: no predicates, no validity scoping
    pub fn unconditional(&self) -> bool {
        self.conditions.is_empty() && !self.only_when_valid
    }

    /// Whether this spec applies to the given changeset
    pub fn applies_to(&self, changeset: &Changeset) -> bool {
        if self.only_when_valid && !changeset.is_valid() {
            return false;
        }
        self.conditions.iter().all(|p| p.test(changeset))
    }
}

/// A validation plus its scoping
pub struct ValidationSpec {
    /// The validation module
    pub validation: Arc<dyn Validation>,
    /// Where-predicates, AND-combined
    pub conditions: Vec<Arc<dyn Predicate>>,
    /// Only validate changesets that are still valid
    pub only_when_valid: bool,
}

impl ValidationSpec {
    /// An unconditional validation
    pub fn new(validation: Arc<dyn Validation>) -> Self {
        ValidationSpec {
            validation,
            conditions: Vec::new(),
            only_when_valid: false,
        }
    }

    /// Add a where-predicate
    #[must_use]
    pub fn when(mut self, predicate: Arc<dyn Predicate>) -> Self {
        self.conditions.push(predicate);
        self
    }

    /// Only validate changesets that are still valid
    #[must_use]
    pub fn only_when_valid(mut self) -> Self {
        self.only_when_valid = true;
        self
    }

    /// Whether this spec applies to the given changeset
    pub fn applies_to(&self, changeset: &Changeset) -> bool {
        if self.only_when_valid && !changeset.is_valid() {
            return false;
        }
        self.conditions.iter().all(|p| p.test(changeset))
    }
}

/// Outcome element returned by a manual executor
#[derive(Debug, Clone)]
pub enum ManualOutcome {
    /// A record was destroyed; carries its final state
    Destroyed(Record),
    /// A record failed; carries the key for attribution and the error
    Failed(RecordKey, MutationError),
    /// A notification to fold into the run
    Notify(Notification),
}

/// Collaborator-supplied executor invoked once per batch
pub trait ManualBatch: Send + Sync {
    /// Destroy the whole batch, returning a tagged outcome sequence
    fn destroy_batch(&self, batch: &[Changeset], ctx: &ExecContext) -> Vec<ManualOutcome>;
}

/// Collaborator-supplied executor invoked once per changeset
///
/// Batch size is forced to 1 for actions bound to this executor, so
/// per-record semantics are never silently batched away.
pub trait ManualRecord: Send + Sync {
    /// Destroy one record, returning the same outcome shape degenerated to
    /// (usually) a single element
    fn destroy(&self, changeset: &Changeset, ctx: &ExecContext) -> Vec<ManualOutcome>;
}

/// How an action executes, selected once at action-binding time
#[derive(Clone)]
pub enum ExecutorKind {
    /// The data layer's single-record destroy
    Native,
    /// A manual executor with bulk support
    ManualBatch(Arc<dyn ManualBatch>),
    /// A manual executor without bulk support
    ManualRecord(Arc<dyn ManualRecord>),
}

impl std::fmt::Debug for ExecutorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutorKind::Native => write!(f, "Native"),
            ExecutorKind::ManualBatch(_) => write!(f, "ManualBatch"),
            ExecutorKind::ManualRecord(_) => write!(f, "ManualRecord"),
        }
    }
}

/// An accepted input argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentSpec {
    /// Argument name
    pub name: String,
    /// Accepted value kind
    pub kind: ValueKind,
    /// Whether the argument must be present
    pub required: bool,
}

impl ArgumentSpec {
    /// An optional argument of the given kind
    pub fn optional(name: impl Into<String>, kind: ValueKind) -> Self {
        ArgumentSpec {
            name: name.into(),
            kind,
            required: false,
        }
    }

    /// A required argument of the given kind
    pub fn required(name: impl Into<String>, kind: ValueKind) -> Self {
        ArgumentSpec {
            name: name.into(),
            kind,
            required: true,
        }
    }
}

/// Immutable descriptor of one mutation type
pub struct Action {
    name: String,
    resource: ResourceName,
    changes: Vec<ChangeSpec>,
    validations: Vec<ValidationSpec>,
    executor: ExecutorKind,
    atomic_capable: bool,
    touched_resources: Vec<ResourceName>,
    arguments: Vec<ArgumentSpec>,
}

impl Action {
    /// Start building an action against a resource
    pub fn builder(name: impl Into<String>, resource: impl Into<ResourceName>) -> ActionBuilder {
        ActionBuilder {
            name: name.into(),
            resource: resource.into(),
            changes: Vec::new(),
            validations: Vec::new(),
            executor: ExecutorKind::Native,
            atomic_capable: false,
            touched_resources: Vec::new(),
            arguments: Vec::new(),
        }
    }

    /// Action name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Primary resource
    pub fn resource(&self) -> &ResourceName {
        &self.resource
    }

    /// Declared changes, in order
    pub fn changes(&self) -> &[ChangeSpec] {
        &self.changes
    }

    /// Declared validations, in order
    pub fn validations(&self) -> &[ValidationSpec] {
        &self.validations
    }

    /// The bound executor
    pub fn executor(&self) -> &ExecutorKind {
        &self.executor
    }

    /// Whether the action may run as one pushed-down operation
    pub fn atomic_capable(&self) -> bool {
        self.atomic_capable
    }

    /// Additional resources a transaction must also lock
    pub fn touched_resources(&self) -> &[ResourceName] {
        &self.touched_resources
    }

    /// Accepted input arguments
    pub fn arguments(&self) -> &[ArgumentSpec] {
        &self.arguments
    }

    /// Primary plus touched resources, the full transaction lock set
    pub fn transaction_resources(&self) -> Vec<ResourceName> {
        let mut resources = Vec::with_capacity(1 + self.touched_resources.len());
        resources.push(self.resource.clone());
        resources.extend(self.touched_resources.iter().cloned());
        resources
    }

    /// Batch size the executor forces, if any
    ///
    /// Manual executors without bulk support process one record at a time;
    /// anything else honors the requested batch size.
    pub fn forced_batch_size(&self) -> Option<usize> {
        match self.executor {
            ExecutorKind::ManualRecord(_) => Some(1),
            _ => None,
        }
    }
}

impl std::fmt::Debug for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Action")
            .field("name", &self.name)
            .field("resource", &self.resource)
            .field("changes", &self.changes.len())
            .field("validations", &self.validations.len())
            .field("executor", &self.executor)
            .field("atomic_capable", &self.atomic_capable)
            .finish_non_exhaustive()
    }
}

/// Fluent construction of an [`Action`]
pub struct ActionBuilder {
    name: String,
    resource: ResourceName,
    changes: Vec<ChangeSpec>,
    validations: Vec<ValidationSpec>,
    executor: ExecutorKind,
    atomic_capable: bool,
    touched_resources: Vec<ResourceName>,
    arguments: Vec<ArgumentSpec>,
}

impl ActionBuilder {
    /// Append an unconditional change
    #[must_use]
    pub fn change(mut self, change: Arc<dyn Change>) -> Self {
        self.changes.push(ChangeSpec::new(change));
        self
    }

    /// Append a fully-specified change
    #[must_use]
    pub fn change_spec(mut self, spec: ChangeSpec) -> Self {
        self.changes.push(spec);
        self
    }

    /// Append an unconditional validation
    #[must_use]
    pub fn validation(mut self, validation: Arc<dyn Validation>) -> Self {
        self.validations.push(ValidationSpec::new(validation));
        self
    }

    /// Append a fully-specified validation
    #[must_use]
    pub fn validation_spec(mut self, spec: ValidationSpec) -> Self {
        self.validations.push(spec);
        self
    }

    /// Bind a manual executor with bulk support
    #[must_use]
    pub fn manual_batch(mut self, executor: Arc<dyn ManualBatch>) -> Self {
        self.executor = ExecutorKind::ManualBatch(executor);
        self
    }

    /// Bind a manual executor without bulk support
    #[must_use]
    pub fn manual_record(mut self, executor: Arc<dyn ManualRecord>) -> Self {
        self.executor = ExecutorKind::ManualRecord(executor);
        self
    }

    /// Declare the action atomically executable
    #[must_use]
    pub fn atomic_capable(mut self) -> Self {
        self.atomic_capable = true;
        self
    }

    /// Add a resource the transaction must also lock
    #[must_use]
    pub fn touching(mut self, resource: impl Into<ResourceName>) -> Self {
        self.touched_resources.push(resource.into());
        self
    }

    /// Declare an accepted input argument
    #[must_use]
    pub fn argument(mut self, spec: ArgumentSpec) -> Self {
        self.arguments.push(spec);
        self
    }

    /// Finish building
    pub fn build(self) -> Action {
        Action {
            name: self.name,
            resource: self.resource,
            changes: self.changes,
            validations: self.validations,
            executor: self.executor,
            atomic_capable: self.atomic_capable,
            touched_resources: self.touched_resources,
            arguments: self.arguments,
        }
    }
}
