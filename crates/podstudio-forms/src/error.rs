//! Error types for the form engine
//!
//! Only wiring mistakes and sink failures are errors here. Field validation
//! failures are data (`ValidationResult`) and never surface through this type.

use thiserror::Error;

use crate::sink::SinkError;

/// Main error type for form engine operations
#[derive(Error, Debug)]
pub enum FormError {
    /// A form definition has no steps
    #[error("Configuration error: form '{0}' declares no steps")]
    NoSteps(String),

    /// A step references a field-path the schema does not declare
    #[error("Configuration error: step {step} ('{label}') references unknown field '{path}'")]
    UnknownStepField {
        step: usize,
        label: String,
        path: String,
    },

    /// Step indices are not a dense 0..N sequence
    #[error("Configuration error: step at position {position} has index {index}")]
    StepOutOfOrder { position: usize, index: usize },

    /// A schema declares the same field-path twice
    #[error("Configuration error: field '{0}' is declared more than once")]
    DuplicateField(String),

    /// Initial values are not a JSON object
    #[error("Configuration error: initial values must be an object, got {0}")]
    InvalidInitialValues(&'static str),

    /// The submission sink failed
    #[error(transparent)]
    Sink(#[from] SinkError),
}

impl FormError {
    /// Whether this is a wiring error that must be fixed before the form can run
    pub fn is_config_error(&self) -> bool {
        !matches!(self, FormError::Sink(_))
    }
}

/// Result type alias for form engine operations
pub type Result<T> = std::result::Result<T, FormError>;
