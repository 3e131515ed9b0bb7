//! Changeset preparation
//!
//! Turns a raw record plus an input map into a validated, argument-cast
//! changeset. Casting is deliberately shallow: presence, kind, and the one
//! lossless widening (`Int` into a `Float` argument). Full attribute typing
//! belongs to the resource declaration system, not this pipeline.

use std::collections::BTreeMap;

use scythe_core::{MutationError, Record, Value, ValueKind};

use crate::action::Action;
use crate::changeset::Changeset;

/// Prepare one record into a changeset
///
/// Cast failures append errors rather than discarding the changeset; the
/// record stays in its batch so partial-failure accounting sees it.
pub fn prepare(
    record: Record,
    input: &BTreeMap<String, Value>,
    action: &Action,
    source_index: usize,
) -> Changeset {
    let mut changeset = Changeset::new(record, source_index);

    for spec in action.arguments() {
        match input.get(&spec.name) {
            Some(value) => match cast(value, spec.kind) {
                Ok(cast_value) => changeset.set_argument(spec.name.clone(), cast_value),
                Err(reason) => changeset.add_error(MutationError::InvalidArgument {
                    name: spec.name.clone(),
                    reason,
                }),
            },
            None if spec.required => changeset.add_error(MutationError::InvalidArgument {
                name: spec.name.clone(),
                reason: "required argument is missing".into(),
            }),
            None => {}
        }
    }

    for name in input.keys() {
        if !action.arguments().iter().any(|spec| &spec.name == name) {
            changeset.add_error(MutationError::InvalidArgument {
                name: name.clone(),
                reason: "not an accepted argument".into(),
            });
        }
    }

    changeset
}

fn cast(value: &Value, kind: ValueKind) -> Result<Value, String> {
    if value.kind() == kind {
        return Ok(value.clone());
    }
    // lossless widening only
    if let (Value::Int(i), ValueKind::Float) = (value, kind) {
        return Ok(Value::Float(*i as f64));
    }
    Err(format!(
        "expected {:?}, got {}",
        kind,
        value.type_name()
    ))
}
