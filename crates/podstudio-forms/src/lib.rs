//! Step-wizard form engine for Podstudio.
//!
//! A form is a [`FormSchema`] (flat field specs addressed by dotted paths)
//! walked through by an ordered list of [`StepDefinition`]s. The [`Wizard`]
//! owns one form's state and step index, gates forward moves on the current
//! step's fields, and submits the validated payload to a [`SubmissionSink`]
//! in create or update mode.
//!
//! # Flow
//!
//! ```text
//! initialize ─► set_field* ─► advance ──(blocked)──► set_field* ─► advance
//!                                │
//!                                └─(last step)─► submit ─► SubmissionSink
//! ```
//!
//! Validation is pulled by the wizard, never pushed by field writes.
//! Built-in forms live in [`catalog`].

pub mod catalog;
pub mod error;
pub mod schema;
pub mod sink;
pub mod state;
pub mod steps;
pub mod validation;
pub mod wizard;

pub use error::{FormError, Result};
pub use schema::{FieldKind, FieldSpec, FormSchema, GroupSpec, Presence};
pub use sink::{ResourceId, SinkError, SubmissionSink};
pub use state::FormState;
pub use steps::{FormDefinition, Mode, StepDefinition};
pub use validation::{FieldSelection, SchemaValidator, ValidationResult, Validator};
pub use wizard::{
    Advance, FailureKind, Phase, Progress, SubmissionOutcome, SubmitTarget, Wizard, WizardContext,
};
