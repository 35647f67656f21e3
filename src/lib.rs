//! Configuration-editing core for the reverse-proxy admin panel.

pub mod backend;
pub mod document;
pub mod edit;
pub mod schema;
pub mod store;

pub use backend::{BackendError, BackendSettings, ConfigBackend, FileBackend, HttpBackend};
pub use document::{ConfigDocument, Patch, SectionKey};
pub use edit::{EditSession, SessionPhase, SubmitReport};
pub use schema::{basic_schema, FieldCategory, FormItem, FormSchema, TriState};
pub use store::{ConfigStore, StoreError};
