//! Edit cycle: the UI-facing contract for editing one section.
//!
//! # Data Flow
//! ```text
//! store snapshot → FormSchema::materialize → FormItem list rendered
//!     → operator edits staged as raw UI inputs
//!     → submit: decode + validate per field
//!         → invalid fields reported inline, withheld from the patch
//!         → valid fields diffed against the baseline snapshot
//!     → Patch (changed fields only) → ConfigStore::update
//!     → next render derives from the post-merge snapshot
//! ```
//!
//! # Design Decisions
//! - No optimistic apply: the view re-derives from the store, so a
//!   failed update visibly reverts to the prior values
//! - Rejected fields stay staged so the operator can correct and
//!   resubmit them; accepted fields are cleared
//! - A patch carries only fields whose decoded value differs from the
//!   baseline; an edit typed back to its original value sends nothing

use crate::document::Patch;
use crate::schema::{FormItem, FormSchema, SchemaError, UiInput, ValidationError};
use crate::store::{ConfigStore, StoreError};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

/// Failures surfaced by the edit cycle.
#[derive(Debug, Error)]
pub enum EditError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Staged id does not name a field of this form's schema.
    #[error("unknown field `{0}` for this form")]
    UnknownField(String),
}

/// Lifecycle phase of an edit session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// The document is not loaded yet; present a loading state, never a
    /// partially-initialized form.
    Loading,
    /// The document is available and the form can be rendered.
    Ready,
}

/// A field-scoped validation failure from a submit.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldError {
    pub field: String,
    pub error: ValidationError,
}

/// Outcome of a submit.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitReport {
    /// Fields included in the committed patch.
    pub committed: Vec<String>,
    /// Fields withheld because their input failed validation. These do
    /// not block the committed fields.
    pub rejected: Vec<FieldError>,
}

/// Interactive editing session for one section form.
pub struct EditSession {
    store: Arc<ConfigStore>,
    schema: FormSchema,
    staged: BTreeMap<String, UiInput>,
}

impl EditSession {
    pub fn new(store: Arc<ConfigStore>, schema: FormSchema) -> Self {
        Self {
            store,
            schema,
            staged: BTreeMap::new(),
        }
    }

    pub fn phase(&self) -> SessionPhase {
        if self.store.is_initialized() {
            SessionPhase::Ready
        } else {
            SessionPhase::Loading
        }
    }

    /// Load the document if it is not loaded yet, moving the session
    /// from `Loading` to `Ready`.
    pub async fn ensure_loaded(&self) -> Result<(), EditError> {
        self.store.load().await?;
        Ok(())
    }

    /// Render the form from the live snapshot.
    pub fn render(&self) -> Result<Vec<FormItem>, EditError> {
        let doc = self.store.snapshot().ok_or(StoreError::NotLoaded)?;
        Ok(self.schema.materialize(&doc)?)
    }

    /// Stage a raw UI input for one field.
    pub fn stage(&mut self, field: &str, input: UiInput) -> Result<(), EditError> {
        if self.schema.field(field).is_none() {
            return Err(EditError::UnknownField(field.to_string()));
        }
        self.staged.insert(field.to_string(), input);
        Ok(())
    }

    /// Drop all staged edits.
    pub fn discard(&mut self) {
        self.staged.clear();
    }

    pub fn has_staged_edits(&self) -> bool {
        !self.staged.is_empty()
    }

    /// Validate staged edits and commit the changed fields.
    ///
    /// Inputs that fail their category's validation are reported per
    /// field and withheld; they never reach the network and never block
    /// the valid fields. The patch carries only fields whose decoded
    /// value differs from the current snapshot. On a store failure every
    /// staged edit is kept, so the operator can retry.
    pub async fn submit(&mut self) -> Result<SubmitReport, EditError> {
        let doc = self.store.snapshot().ok_or(StoreError::NotLoaded)?;
        let baseline = doc.section(self.schema.key());

        let mut patch = Patch::new();
        let mut committed = Vec::new();
        let mut unchanged = Vec::new();
        let mut rejected = Vec::new();

        for (field, input) in &self.staged {
            // stage() rejects ids outside the schema, and the schema is
            // fixed for the session's lifetime.
            let Some(spec) = self.schema.field(field) else {
                continue;
            };
            match spec.category.decode(input) {
                Ok(value) => {
                    let current = baseline
                        .and_then(|section| section.get(field))
                        .cloned()
                        .unwrap_or(Value::Null);
                    if value == current {
                        unchanged.push(field.clone());
                    } else {
                        patch.insert(field.clone(), value);
                        committed.push(field.clone());
                    }
                }
                Err(error) => rejected.push(FieldError {
                    field: field.clone(),
                    error,
                }),
            }
        }

        if !patch.is_empty() {
            self.store
                .update(self.schema.key().clone(), patch)
                .await?;
        }

        for field in committed.iter().chain(unchanged.iter()) {
            self.staged.remove(field);
        }
        if !rejected.is_empty() {
            tracing::debug!(
                section = %self.schema.key(),
                rejected = rejected.len(),
                "submit kept invalid fields staged"
            );
        }

        Ok(SubmitReport { committed, rejected })
    }
}
