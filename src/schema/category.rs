//! Field categories and their value codecs.
//!
//! Each category defines how a wire value (the JSON stored in the
//! configuration document) maps to and from the primitive a UI widget
//! carries. The category set is a closed enum, so adding a category is a
//! compile-time-checked change: every codec method matches exhaustively.

use serde::Serialize;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Allowed values for the `webhook_type` field.
pub const WEBHOOK_TYPES: &[&str] = &["normal", "wecom", "dingtalk"];

/// A field-level validation failure.
///
/// Reported inline for the offending field; never blocks other fields
/// in the same form and is always raised before any network call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// The widget delivered an input shape the category cannot accept.
    #[error("{category} field expects {expected} input")]
    WrongWidget {
        category: FieldCategory,
        expected: &'static str,
    },

    /// Numeric field given something other than a non-negative integer.
    #[error("`{0}` is not a non-negative integer")]
    NotANumber(String),

    /// Selection widget reported a discriminator outside the option table.
    #[error("unknown discriminator {0}")]
    UnknownDiscriminator(i64),

    /// Enumerated field given a value outside its closed allowed set.
    #[error("`{value}` is not an allowed value")]
    NotAllowed { value: String },
}

/// Tri-state field domain: explicitly set true, explicitly set false, or
/// not set at all (inherit the proxy's default).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriState {
    True,
    False,
    Inherit,
}

impl TriState {
    /// Wire discriminator for this state, by convention 1 / 0 / -1.
    ///
    /// Selection widgets carry a single scalar per option, and the values
    /// for `False` and `Inherit` could collide under loose comparison, so
    /// the discriminator is the only thing decode ever matches on.
    pub fn discriminator(self) -> i64 {
        match self {
            TriState::True => 1,
            TriState::False => 0,
            TriState::Inherit => -1,
        }
    }

    /// Inverse of [`TriState::discriminator`].
    pub fn from_discriminator(discriminator: i64) -> Option<Self> {
        match discriminator {
            1 => Some(TriState::True),
            0 => Some(TriState::False),
            -1 => Some(TriState::Inherit),
            _ => None,
        }
    }

    /// Read the state out of a stored wire value. Anything that is not an
    /// explicit boolean (null, absent, or a foreign type) means inherit.
    pub fn from_wire(value: &Value) -> Self {
        match value {
            Value::Bool(true) => TriState::True,
            Value::Bool(false) => TriState::False,
            _ => TriState::Inherit,
        }
    }

    /// The wire value persisted for this state. `Inherit` is null, which
    /// the merge turns into an absent field.
    pub fn to_wire(self) -> Value {
        match self {
            TriState::True => Value::Bool(true),
            TriState::False => Value::Bool(false),
            TriState::Inherit => Value::Null,
        }
    }
}

/// One selectable option for an enumerated or tri-state field.
///
/// `discriminator` is what the widget reports back; `value` is the wire
/// value the selection decodes to. Discriminators within one option list
/// are distinct and cover the field's whole domain.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChoiceOption {
    pub label: &'static str,
    pub discriminator: i64,
    pub value: Value,
}

/// Raw value as collected from a UI widget, before decoding.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum UiInput {
    /// Free-form text, also used for numbers typed into a text box.
    Text(String),
    /// A number delivered directly by a numeric widget.
    Number(f64),
    /// The discriminator reported by a selection widget.
    Choice(i64),
}

/// Closed set of editable field categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldCategory {
    /// Single-line string, stored as-is.
    Text,
    /// Non-negative integer; empty input means unset.
    Number,
    /// Tri-state boolean rendered as a three-option selection.
    Checkbox,
    /// Multi-line text; identical wire semantics to [`FieldCategory::Text`].
    Textarea,
    /// Enumerated string restricted to [`WEBHOOK_TYPES`].
    WebhookType,
}

impl FieldCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            FieldCategory::Text => "text",
            FieldCategory::Number => "number",
            FieldCategory::Checkbox => "checkbox",
            FieldCategory::Textarea => "textarea",
            FieldCategory::WebhookType => "webhook_type",
        }
    }

    /// Option table for selection widgets; `None` for free-form categories.
    pub fn options(self) -> Option<Vec<ChoiceOption>> {
        match self {
            FieldCategory::Checkbox => Some(vec![
                ChoiceOption {
                    label: "Yes",
                    discriminator: TriState::True.discriminator(),
                    value: TriState::True.to_wire(),
                },
                ChoiceOption {
                    label: "No",
                    discriminator: TriState::False.discriminator(),
                    value: TriState::False.to_wire(),
                },
                ChoiceOption {
                    label: "None",
                    discriminator: TriState::Inherit.discriminator(),
                    value: TriState::Inherit.to_wire(),
                },
            ]),
            FieldCategory::WebhookType => Some(
                WEBHOOK_TYPES
                    .iter()
                    .enumerate()
                    .map(|(index, name)| ChoiceOption {
                        label: name,
                        discriminator: index as i64,
                        value: Value::String((*name).to_string()),
                    })
                    .collect(),
            ),
            FieldCategory::Text | FieldCategory::Number | FieldCategory::Textarea => None,
        }
    }

    /// Encode a stored wire value into the primitive a widget renders.
    pub fn encode(self, value: &Value) -> UiInput {
        match self {
            FieldCategory::Text | FieldCategory::Textarea | FieldCategory::WebhookType => {
                UiInput::Text(value.as_str().unwrap_or_default().to_string())
            }
            FieldCategory::Number => match value {
                Value::Number(n) => UiInput::Text(n.to_string()),
                _ => UiInput::Text(String::new()),
            },
            FieldCategory::Checkbox => UiInput::Choice(TriState::from_wire(value).discriminator()),
        }
    }

    /// Decode a widget input back into a wire value.
    ///
    /// Null means "unset"; the merge removes the field. Validation
    /// failures are field-scoped and happen before anything touches the
    /// network.
    pub fn decode(self, input: &UiInput) -> Result<Value, ValidationError> {
        match self {
            FieldCategory::Text | FieldCategory::Textarea => match input {
                UiInput::Text(s) if s.is_empty() => Ok(Value::Null),
                UiInput::Text(s) => Ok(Value::String(s.clone())),
                _ => Err(ValidationError::WrongWidget {
                    category: self,
                    expected: "text",
                }),
            },
            FieldCategory::Number => match input {
                UiInput::Text(s) => {
                    let trimmed = s.trim();
                    if trimmed.is_empty() {
                        Ok(Value::Null)
                    } else {
                        trimmed
                            .parse::<u64>()
                            .map(Value::from)
                            .map_err(|_| ValidationError::NotANumber(trimmed.to_string()))
                    }
                }
                UiInput::Number(n) => {
                    if n.is_finite() && *n >= 0.0 && n.fract() == 0.0 && *n <= u64::MAX as f64 {
                        Ok(Value::from(*n as u64))
                    } else {
                        Err(ValidationError::NotANumber(n.to_string()))
                    }
                }
                UiInput::Choice(_) => Err(ValidationError::WrongWidget {
                    category: self,
                    expected: "numeric",
                }),
            },
            FieldCategory::Checkbox => match input {
                // Match on the discriminator only; the carried values for
                // "false" and "none" are not distinguishable by loose
                // widget comparison.
                UiInput::Choice(d) => TriState::from_discriminator(*d)
                    .map(TriState::to_wire)
                    .ok_or(ValidationError::UnknownDiscriminator(*d)),
                _ => Err(ValidationError::WrongWidget {
                    category: self,
                    expected: "discriminator",
                }),
            },
            FieldCategory::WebhookType => match input {
                UiInput::Text(s) => {
                    let trimmed = s.trim();
                    if trimmed.is_empty() {
                        Ok(Value::Null)
                    } else if WEBHOOK_TYPES.contains(&trimmed) {
                        Ok(Value::String(trimmed.to_string()))
                    } else {
                        Err(ValidationError::NotAllowed {
                            value: trimmed.to_string(),
                        })
                    }
                }
                UiInput::Choice(d) => usize::try_from(*d)
                    .ok()
                    .and_then(|index| WEBHOOK_TYPES.get(index))
                    .map(|name| Value::String((*name).to_string()))
                    .ok_or(ValidationError::UnknownDiscriminator(*d)),
                UiInput::Number(_) => Err(ValidationError::WrongWidget {
                    category: self,
                    expected: "text or discriminator",
                }),
            },
        }
    }
}

impl fmt::Display for FieldCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
