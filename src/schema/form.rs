//! Form schemas: declarative field lists per editable section.
//!
//! A schema declares which fields a section exposes and how each one is
//! edited. Materializing a schema against the current document snapshot
//! yields the renderable [`FormItem`] list; default values always come
//! from the live document, never from schema defaults, so a successful
//! update is reflected in the very next derivation.

use super::category::{ChoiceOption, FieldCategory, UiInput};
use crate::document::{ConfigDocument, SectionKey};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// A schema-authoring fault. Raised when the schema is constructed or
/// first materialized, before any form is shown.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    #[error("duplicate field id `{field}` in schema for {key}")]
    DuplicateField { key: SectionKey, field: String },

    #[error("duplicate discriminator {discriminator} in options for `{field}`")]
    DuplicateDiscriminator { field: String, discriminator: i64 },

    #[error("section {0} is not present in the document")]
    MissingSection(SectionKey),
}

/// Declarative descriptor for one editable field.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    /// Names exactly one field in the target section.
    pub id: String,
    pub label: String,
    pub category: FieldCategory,
    /// Relative layout width. Presentation metadata only; no effect on
    /// persistence.
    pub span: u8,
    /// Minimum rows hint for multi-line text.
    pub rows: Option<u16>,
}

impl FieldSpec {
    pub fn new(id: &str, label: &str, category: FieldCategory) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            category,
            span: 12,
            rows: None,
        }
    }

    pub fn span(mut self, span: u8) -> Self {
        self.span = span;
        self
    }

    pub fn rows(mut self, rows: u16) -> Self {
        self.rows = Some(rows);
        self
    }
}

/// One renderable field: the descriptor plus the value pulled from the
/// current document snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormItem {
    pub id: String,
    pub label: String,
    pub category: FieldCategory,
    /// Current value, encoded for the widget.
    pub default_value: UiInput,
    pub span: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<ChoiceOption>>,
}

/// Ordered field list for one editable section.
#[derive(Debug, Clone)]
pub struct FormSchema {
    key: SectionKey,
    fields: Vec<FieldSpec>,
}

impl FormSchema {
    /// Build a schema, checking it for authoring faults up front.
    pub fn new(key: SectionKey, fields: Vec<FieldSpec>) -> Result<Self, SchemaError> {
        for (index, field) in fields.iter().enumerate() {
            if fields[..index].iter().any(|f| f.id == field.id) {
                return Err(SchemaError::DuplicateField {
                    key,
                    field: field.id.clone(),
                });
            }
            if let Some(options) = field.category.options() {
                for (i, option) in options.iter().enumerate() {
                    if options[..i]
                        .iter()
                        .any(|o| o.discriminator == option.discriminator)
                    {
                        return Err(SchemaError::DuplicateDiscriminator {
                            field: field.id.clone(),
                            discriminator: option.discriminator,
                        });
                    }
                }
            }
        }
        Ok(Self { key, fields })
    }

    pub fn key(&self) -> &SectionKey {
        &self.key
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field(&self, id: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.id == id)
    }

    /// Materialize the renderable item list against a document snapshot.
    ///
    /// The section must exist in the document; individual fields may be
    /// absent, which reads as unset.
    pub fn materialize(&self, doc: &ConfigDocument) -> Result<Vec<FormItem>, SchemaError> {
        let section = doc
            .section(&self.key)
            .ok_or_else(|| SchemaError::MissingSection(self.key.clone()))?;

        Ok(self
            .fields
            .iter()
            .map(|spec| {
                let value = section.get(&spec.id).unwrap_or(&Value::Null);
                FormItem {
                    id: spec.id.clone(),
                    label: spec.label.clone(),
                    category: spec.category,
                    default_value: spec.category.encode(value),
                    span: spec.span,
                    rows: spec.rows,
                    options: spec.category.options(),
                }
            })
            .collect())
    }
}

/// Built-in schema for the proxy's `basic` section.
pub fn basic_schema(namespace: &str) -> FormSchema {
    let fields = vec![
        FieldSpec::new("threads", "Threads", FieldCategory::Number).span(6),
        FieldSpec::new("work_stealing", "Work stealing", FieldCategory::Checkbox).span(6),
        FieldSpec::new("log_level", "Log level", FieldCategory::Text).span(6),
        FieldSpec::new("grace_period", "Grace period", FieldCategory::Text).span(6),
        FieldSpec::new(
            "graceful_shutdown_timeout",
            "Graceful shutdown timeout",
            FieldCategory::Text,
        )
        .span(6),
        FieldSpec::new(
            "upstream_keepalive_pool_size",
            "Upstream keepalive pool size",
            FieldCategory::Number,
        )
        .span(6),
        FieldSpec::new("webhook", "Webhook", FieldCategory::Text),
        FieldSpec::new("webhook_type", "Webhook type", FieldCategory::WebhookType).span(6),
        FieldSpec::new("sentry", "Sentry", FieldCategory::Text).span(6),
        FieldSpec::new("error_template", "Error template", FieldCategory::Textarea)
            .span(24)
            .rows(8),
    ];
    FormSchema::new(SectionKey::new(namespace, "basic"), fields)
        .expect("builtin basic schema is well formed")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc() -> ConfigDocument {
        ConfigDocument::from_value(json!({
            "pingap": {
                "basic": {
                    "threads": 4,
                    "log_level": "info",
                    "work_stealing": false
                }
            }
        }))
        .unwrap()
    }

    #[test]
    fn defaults_come_from_the_live_document() {
        let items = basic_schema("pingap").materialize(&doc()).unwrap();
        let by_id = |id: &str| items.iter().find(|i| i.id == id).unwrap();

        assert_eq!(by_id("threads").default_value, UiInput::Text("4".into()));
        assert_eq!(by_id("log_level").default_value, UiInput::Text("info".into()));
        // Explicit false must not read as inherit.
        assert_eq!(by_id("work_stealing").default_value, UiInput::Choice(0));
        // Absent field reads as unset.
        assert_eq!(by_id("webhook").default_value, UiInput::Text(String::new()));
        assert_eq!(by_id("error_template").rows, Some(8));
    }

    #[test]
    fn field_order_follows_the_declaration() {
        let items = basic_schema("pingap").materialize(&doc()).unwrap();
        assert_eq!(items[0].id, "threads");
        assert_eq!(items[1].id, "work_stealing");
    }

    #[test]
    fn missing_section_is_a_schema_error() {
        let schema = basic_schema("other");
        assert_eq!(
            schema.materialize(&doc()),
            Err(SchemaError::MissingSection(SectionKey::new("other", "basic")))
        );
    }

    #[test]
    fn duplicate_field_ids_fail_at_construction() {
        let key = SectionKey::new("pingap", "basic");
        let fields = vec![
            FieldSpec::new("threads", "Threads", FieldCategory::Number),
            FieldSpec::new("threads", "Threads again", FieldCategory::Number),
        ];
        assert!(matches!(
            FormSchema::new(key, fields),
            Err(SchemaError::DuplicateField { .. })
        ));
    }

    #[test]
    fn selection_fields_carry_their_option_tables() {
        let items = basic_schema("pingap").materialize(&doc()).unwrap();
        let checkbox = items.iter().find(|i| i.id == "work_stealing").unwrap();
        assert_eq!(checkbox.options.as_ref().unwrap().len(), 3);
        let webhook_type = items.iter().find(|i| i.id == "webhook_type").unwrap();
        assert_eq!(webhook_type.options.as_ref().unwrap().len(), 3);
        assert!(items.iter().find(|i| i.id == "webhook").unwrap().options.is_none());
    }
}
