//! Step-wizard form engine
//!
//! A [`Wizard`] walks the user through the steps of a [`FormDefinition`].
//! Forward moves are gated by validating the current step's fields; backward
//! moves never validate. The final submit validates the whole schema and
//! hands the payload to a [`SubmissionSink`].
//!
//! The wizard is a cheap cloneable handle. Event handlers may hold clones,
//! and at most one submit is in flight per wizard at any time.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::Result;
use crate::sink::{ResourceId, SinkError, SubmissionSink};
use crate::state::FormState;
use crate::steps::{FormDefinition, Mode};
use crate::validation::{FieldSelection, SchemaValidator, ValidationResult, Validator};

/// What a submit does with the validated payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "id", rename_all = "lowercase")]
pub enum SubmitTarget {
    /// Insert a new resource
    Create,
    /// Replace the resource with this id
    Update(ResourceId),
}

impl SubmitTarget {
    pub fn mode(&self) -> Mode {
        match self {
            SubmitTarget::Create => Mode::Create,
            SubmitTarget::Update(_) => Mode::Update,
        }
    }
}

/// Values the hosting page hands to the wizard at construction time
#[derive(Debug, Clone)]
pub struct WizardContext {
    pub target: SubmitTarget,
    /// Bearer token forwarded by sinks that talk to an authenticated API
    pub auth_token: Option<String>,
}

impl WizardContext {
    pub fn create() -> Self {
        Self {
            target: SubmitTarget::Create,
            auth_token: None,
        }
    }

    pub fn update(id: impl Into<ResourceId>) -> Self {
        Self {
            target: SubmitTarget::Update(id.into()),
            auth_token: None,
        }
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn mode(&self) -> Mode {
        self.target.mode()
    }
}

/// Why a submit attempt did not produce a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Full-schema validation failed; the sink was not contacted
    ValidationFailed,
    /// The sink reported a failure
    SinkError,
    /// Another submit of this wizard is still in flight
    SubmitInProgress,
    /// The wizard was unmounted
    Unmounted,
}

/// Result of one submit attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubmissionOutcome {
    Success {
        resource_id: ResourceId,
    },
    Failure {
        kind: FailureKind,
        message: String,
        /// Per-field messages when `kind` is `ValidationFailed`
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        errors: BTreeMap<String, String>,
    },
}

impl SubmissionOutcome {
    pub fn failure(kind: FailureKind, message: impl Into<String>) -> Self {
        SubmissionOutcome::Failure {
            kind,
            message: message.into(),
            errors: BTreeMap::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, SubmissionOutcome::Success { .. })
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            SubmissionOutcome::Success { .. } => None,
            SubmissionOutcome::Failure { kind, .. } => Some(*kind),
        }
    }
}

/// Lifecycle position of the wizard besides its step index
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Editing,
    Submitting,
    Submitted(ResourceId),
    Failed(FailureKind),
}

/// Result of trying to leave the current step forward
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    /// Step fields passed; the wizard moved on
    Moved { next_index: usize },
    /// Step fields failed; the wizard stayed put
    Blocked { errors: BTreeMap<String, String> },
    /// The last step passed; the next move is a submit
    ReadyToSubmit,
    /// The wizard was unmounted; nothing moved
    Unmounted,
}

/// Result of [`Wizard::proceed`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    Moved { next_index: usize },
    Blocked { errors: BTreeMap<String, String> },
    Submitted(SubmissionOutcome),
    Unmounted,
}

struct Session {
    state: FormState,
    index: usize,
    phase: Phase,
}

impl Session {
    fn resume_editing(&mut self) {
        if self.phase != Phase::Submitting {
            self.phase = Phase::Editing;
        }
    }
}

struct Inner {
    definition: FormDefinition,
    context: WizardContext,
    validator: Arc<dyn Validator>,
    sink: Arc<dyn SubmissionSink>,
    session: Mutex<Session>,
    submitting: AtomicBool,
    mounted: AtomicBool,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::Acquire)
    }

    fn validate(&self, selection: &FieldSelection, state: &FormState) -> ValidationResult {
        self.validator
            .validate(&self.definition.schema, selection, state.as_value())
    }

    /// Record the sink's answer and release the in-flight guard
    fn finish(&self, target: &SubmitTarget, result: std::result::Result<ResourceId, SinkError>) -> SubmissionOutcome {
        let form = self.definition.schema.id.as_str();
        let outcome = match result {
            Ok(resource_id) => {
                tracing::info!(form, mode = %target.mode(), resource_id = %resource_id, "Submission accepted");
                SubmissionOutcome::Success { resource_id }
            }
            Err(err) => {
                tracing::warn!(form, mode = %target.mode(), error = %err, "Submission failed");
                SubmissionOutcome::failure(FailureKind::SinkError, err.user_message())
            }
        };

        if self.is_mounted() {
            let mut session = self.lock();
            session.phase = match &outcome {
                SubmissionOutcome::Success { resource_id } => Phase::Submitted(resource_id.clone()),
                SubmissionOutcome::Failure { kind, .. } => Phase::Failed(*kind),
            };
        } else {
            tracing::debug!(form, "Wizard unmounted before submission finished; outcome discarded");
        }

        self.submitting.store(false, Ordering::Release);
        outcome
    }
}

/// Handle to one running form wizard
#[derive(Clone)]
pub struct Wizard {
    inner: Arc<Inner>,
}

impl Wizard {
    /// Build a wizard validated by the schema's own field rules
    ///
    /// `initial` seeds edit mode; without it every field starts from its
    /// default. Defaults are always applied first and `initial` is overlaid
    /// on top before the wizard is returned.
    pub fn initialize(
        definition: FormDefinition,
        initial: Option<&Value>,
        context: WizardContext,
        sink: Arc<dyn SubmissionSink>,
    ) -> Result<Self> {
        Self::with_validator(definition, initial, context, sink, Arc::new(SchemaValidator))
    }

    /// Build a wizard with a custom validator
    pub fn with_validator(
        definition: FormDefinition,
        initial: Option<&Value>,
        context: WizardContext,
        sink: Arc<dyn SubmissionSink>,
        validator: Arc<dyn Validator>,
    ) -> Result<Self> {
        definition.validate()?;

        let schema = Arc::clone(&definition.schema);
        let state = match initial {
            Some(values) => FormState::with_initial(schema, values)?,
            None => FormState::seeded(schema),
        };

        tracing::debug!(
            form = %definition.schema.id,
            mode = %context.mode(),
            steps = definition.steps.len(),
            seeded_from_initial = initial.is_some(),
            "Wizard initialized"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                definition,
                context,
                validator,
                sink,
                session: Mutex::new(Session {
                    state,
                    index: 0,
                    phase: Phase::Editing,
                }),
                submitting: AtomicBool::new(false),
                mounted: AtomicBool::new(true),
            }),
        })
    }

    pub fn definition(&self) -> &FormDefinition {
        &self.inner.definition
    }

    pub fn context(&self) -> &WizardContext {
        &self.inner.context
    }

    pub fn current_step(&self) -> usize {
        self.inner.lock().index
    }

    pub fn current_label(&self) -> String {
        let index = self.current_step();
        self.inner
            .definition
            .step(index)
            .map(|s| s.label.clone())
            .unwrap_or_default()
    }

    pub fn phase(&self) -> Phase {
        self.inner.lock().phase.clone()
    }

    pub fn is_submitting(&self) -> bool {
        self.inner.submitting.load(Ordering::Acquire)
    }

    pub fn is_mounted(&self) -> bool {
        self.inner.is_mounted()
    }

    pub fn value(&self, path: &str) -> Option<Value> {
        self.inner.lock().state.get(path).cloned()
    }

    pub fn is_touched(&self, path: &str) -> bool {
        self.inner.lock().state.is_touched(path)
    }

    /// Write one field; never validates
    pub fn set_field(&self, path: &str, value: Value) {
        if !self.is_mounted() {
            tracing::debug!(path, "Ignoring field write on unmounted wizard");
            return;
        }
        let mut session = self.inner.lock();
        session.state.set(path, value);
        session.resume_editing();
        tracing::trace!(path, "Field updated");
    }

    /// Reset a field or switch off an optional group
    pub fn clear_field(&self, path: &str) {
        if !self.is_mounted() {
            return;
        }
        let mut session = self.inner.lock();
        session.state.clear(path);
        session.resume_editing();
    }

    /// Validate the fields that gate leaving step `index`
    ///
    /// Returns `None` when there is no such step.
    pub fn check_step(&self, index: usize) -> Option<ValidationResult> {
        let step = self.inner.definition.step(index)?;
        let selection = FieldSelection::Only(step.required_fields(self.inner.context.mode()));
        let session = self.inner.lock();
        Some(self.inner.validate(&selection, &session.state))
    }

    /// Try to leave the current step forward
    pub fn advance(&self) -> Advance {
        if !self.is_mounted() {
            tracing::debug!(
                form = %self.inner.definition.schema.id,
                "Ignoring advance on unmounted wizard"
            );
            return Advance::Unmounted;
        }
        let mut session = self.inner.lock();
        let index = session.index;
        let required = self
            .inner
            .definition
            .required_fields(index, self.inner.context.mode());
        let result = self.inner.validate(&FieldSelection::Only(required), &session.state);

        if !result.valid {
            tracing::debug!(
                form = %self.inner.definition.schema.id,
                step = index,
                error_count = result.errors.len(),
                "Step blocked by validation"
            );
            return Advance::Blocked {
                errors: result.errors,
            };
        }

        if index >= self.inner.definition.last_index() {
            return Advance::ReadyToSubmit;
        }

        session.index = index + 1;
        session.resume_editing();
        tracing::debug!(form = %self.inner.definition.schema.id, step = index + 1, "Step advanced");
        Advance::Moved {
            next_index: index + 1,
        }
    }

    /// Step back; never validates and never fails
    ///
    /// An unmounted wizard stays where it is.
    pub fn retreat(&self) -> usize {
        let mut session = self.inner.lock();
        if !self.is_mounted() {
            return session.index;
        }
        session.index = session.index.saturating_sub(1);
        session.resume_editing();
        session.index
    }

    /// Advance, submitting with the context's target when leaving the last step
    pub async fn proceed(&self) -> Progress {
        match self.advance() {
            Advance::Moved { next_index } => Progress::Moved { next_index },
            Advance::Blocked { errors } => Progress::Blocked { errors },
            Advance::Unmounted => Progress::Unmounted,
            Advance::ReadyToSubmit => {
                let target = self.inner.context.target.clone();
                Progress::Submitted(self.submit(target).await)
            }
        }
    }

    /// Validate the whole schema and hand the payload to the sink
    ///
    /// A submit issued while another is in flight is rejected without
    /// contacting the sink. The sink call runs on its own task, so dropping
    /// this future or unmounting the wizard never cancels it.
    pub async fn submit(&self, target: SubmitTarget) -> SubmissionOutcome {
        let form = self.inner.definition.schema.id.clone();

        if !self.is_mounted() {
            return SubmissionOutcome::failure(FailureKind::Unmounted, "This form is no longer active");
        }

        if self
            .inner
            .submitting
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!(form = %form, "Submit rejected while another is in flight");
            return SubmissionOutcome::failure(
                FailureKind::SubmitInProgress,
                "A submission is already in progress",
            );
        }

        let payload = {
            let mut session = self.inner.lock();
            let result = self.inner.validate(&FieldSelection::All, &session.state);
            if !result.valid {
                session.phase = Phase::Failed(FailureKind::ValidationFailed);
                drop(session);
                self.inner.submitting.store(false, Ordering::Release);
                tracing::debug!(
                    form = %form,
                    error_count = result.errors.len(),
                    "Submit blocked by validation"
                );
                return SubmissionOutcome::Failure {
                    kind: FailureKind::ValidationFailed,
                    message: "Please fix the highlighted fields before submitting".to_string(),
                    errors: result.errors,
                };
            }
            session.phase = Phase::Submitting;
            session.state.payload()
        };

        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(async move {
            let result = match &target {
                SubmitTarget::Create => inner.sink.create(payload).await,
                SubmitTarget::Update(id) => inner.sink.update(id, payload).await,
            };
            inner.finish(&target, result)
        });

        match task.await {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::error!(form = %form, error = %err, "Submission task aborted");
                self.inner.submitting.store(false, Ordering::Release);
                if self.is_mounted() {
                    self.inner.lock().phase = Phase::Failed(FailureKind::SinkError);
                }
                SubmissionOutcome::failure(FailureKind::SinkError, "The submission was interrupted")
            }
        }
    }

    /// Detach the wizard from its page
    ///
    /// An in-flight submit still reaches the sink, but its outcome no longer
    /// updates the wizard, and later field writes are ignored.
    pub fn unmount(&self) {
        if self.inner.mounted.swap(false, Ordering::AcqRel) {
            tracing::debug!(form = %self.inner.definition.schema.id, "Wizard unmounted");
        }
    }
}

impl std::fmt::Debug for Wizard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wizard")
            .field("form", &self.inner.definition.schema.id)
            .field("step", &self.current_step())
            .field("phase", &self.phase())
            .field("submitting", &self.is_submitting())
            .finish()
    }
}
