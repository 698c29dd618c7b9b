//! Schema validation against form state
//!
//! Validation is pulled, never pushed: the wizard asks for a result when the
//! user tries to move forward or submit, and the result is computed fresh
//! from the current values every time.

pub mod rules;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

use crate::schema::{FieldSpec, FormSchema};
use crate::state::get_path;

/// Outcome of one validation pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    /// Field-path → message for every failing field
    pub errors: BTreeMap<String, String>,
}

impl ValidationResult {
    pub fn from_errors(errors: BTreeMap<String, String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }
}

/// Which part of the schema a validation pass covers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldSelection {
    /// The whole schema
    All,
    /// Only these field-paths (a group path selects everything below it)
    Only(BTreeSet<String>),
}

impl FieldSelection {
    pub fn only<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldSelection::Only(paths.into_iter().map(Into::into).collect())
    }

    fn selects(&self, field: &FieldSpec) -> bool {
        match self {
            FieldSelection::All => true,
            FieldSelection::Only(paths) => paths
                .iter()
                .any(|selector| crate::schema::covers(selector, &field.path)),
        }
    }
}

/// Upstream validator contract
pub trait Validator: Send + Sync {
    /// Validate `data` against the `selection` subset of `schema`
    fn validate(&self, schema: &FormSchema, selection: &FieldSelection, data: &Value)
        -> ValidationResult;
}

/// Validator driven by the declarative field rules of a [`FormSchema`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaValidator;

impl Validator for SchemaValidator {
    fn validate(
        &self,
        schema: &FormSchema,
        selection: &FieldSelection,
        data: &Value,
    ) -> ValidationResult {
        let mut errors = BTreeMap::new();

        for field in schema.fields.iter().filter(|f| selection.selects(f)) {
            if let Some(group) = schema.optional_group_of(&field.path) {
                if !matches!(get_path(data, &group.path), Some(Value::Object(_))) {
                    continue;
                }
            }

            if let Some(message) = rules::check_field(field, get_path(data, &field.path)) {
                errors.insert(field.path.clone(), message);
            }
        }

        tracing::trace!(
            schema = %schema.id,
            error_count = errors.len(),
            "Validation pass complete"
        );

        ValidationResult::from_errors(errors)
    }
}
