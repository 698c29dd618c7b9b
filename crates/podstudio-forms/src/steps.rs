//! Step definitions and the per-step field requirements

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::error::{FormError, Result};
use crate::schema::FormSchema;

/// Whether a form creates a new resource or edits an existing one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Create,
    Update,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Create => write!(f, "create"),
            Mode::Update => write!(f, "update"),
        }
    }
}

/// One page of a wizard
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepDefinition {
    pub index: usize,
    pub label: String,
    /// Field-paths validated before leaving this step in any mode
    pub fields: BTreeSet<String>,
    /// Field-paths validated before leaving this step in create mode only
    #[serde(default)]
    pub create_only: BTreeSet<String>,
}

impl StepDefinition {
    pub fn new<I, S>(index: usize, label: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            index,
            label: label.into(),
            fields: fields.into_iter().map(Into::into).collect(),
            create_only: BTreeSet::new(),
        }
    }

    pub fn create_only<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.create_only = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Field-paths gating the advance out of this step in `mode`
    pub fn required_fields(&self, mode: Mode) -> BTreeSet<String> {
        let mut required = self.fields.clone();
        if mode == Mode::Create {
            required.extend(self.create_only.iter().cloned());
        }
        required
    }

    fn all_fields(&self) -> impl Iterator<Item = &String> {
        self.fields.iter().chain(self.create_only.iter())
    }
}

/// A schema together with the ordered steps that walk through it
#[derive(Debug, Clone)]
pub struct FormDefinition {
    pub schema: Arc<FormSchema>,
    pub steps: Vec<StepDefinition>,
}

impl FormDefinition {
    pub fn new(schema: FormSchema, steps: Vec<StepDefinition>) -> Self {
        Self {
            schema: Arc::new(schema),
            steps,
        }
    }

    /// Check the wiring between steps and schema
    pub fn validate(&self) -> Result<()> {
        self.schema.check()?;

        if self.steps.is_empty() {
            return Err(FormError::NoSteps(self.schema.id.clone()));
        }

        for (position, step) in self.steps.iter().enumerate() {
            if step.index != position {
                return Err(FormError::StepOutOfOrder {
                    position,
                    index: step.index,
                });
            }
            if let Some(path) = step.all_fields().find(|p| !self.schema.contains(p)) {
                return Err(FormError::UnknownStepField {
                    step: step.index,
                    label: step.label.clone(),
                    path: path.clone(),
                });
            }
        }

        Ok(())
    }

    pub fn step(&self, index: usize) -> Option<&StepDefinition> {
        self.steps.get(index)
    }

    pub fn last_index(&self) -> usize {
        self.steps.len().saturating_sub(1)
    }

    /// Field-paths required to advance out of `step` in `mode`
    ///
    /// Empty for indices past the last step.
    pub fn required_fields(&self, step: usize, mode: Mode) -> BTreeSet<String> {
        self.step(step)
            .map(|s| s.required_fields(mode))
            .unwrap_or_default()
    }
}
