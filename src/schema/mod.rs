//! Form schema subsystem.
//!
//! # Data Flow
//! ```text
//! FieldSpec declarations (per section)
//!     → FormSchema::new (authoring checks, fail fast)
//!     → materialize against the current document snapshot
//!     → FormItem list (labels, widgets, option tables, live defaults)
//!     → edit cycle stages raw UiInput per field
//!     → category codec decodes + validates back to wire values
//! ```
//!
//! # Design Decisions
//! - Categories are a closed enum; codec dispatch matches exhaustively
//! - Tri-state booleans travel as discriminators, never as raw values
//! - Schema faults surface at construction, validation faults per field

pub mod category;
pub mod form;

pub use category::{ChoiceOption, FieldCategory, TriState, UiInput, ValidationError, WEBHOOK_TYPES};
pub use form::{basic_schema, FieldSpec, FormItem, FormSchema, SchemaError};
