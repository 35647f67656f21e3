//! Backend configuration API clients.
//!
//! # Data Flow
//! ```text
//! ConfigStore.load()
//!     → ConfigBackend::fetch → full ConfigDocument
//! ConfigStore.update(key, patch)
//!     → ConfigBackend::persist → backend applies the patch atomically
//! ```
//!
//! # Design Decisions
//! - The store only sees the trait, so deployments can point the panel
//!   at the proxy's admin API or directly at its config file
//! - Persist is all-or-nothing: a backend either applies every field of
//!   a patch or rejects the whole patch
//! - Timeouts surface through the same error type as any other
//!   transport failure

pub mod file;
pub mod http;

use crate::document::{ConfigDocument, Patch, SectionKey};
use async_trait::async_trait;
use thiserror::Error;

pub use file::FileBackend;
pub use http::{BackendSettings, HttpBackend};

/// Transport-level failure talking to the configuration backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request failed, including timeouts.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend refused the read or write.
    #[error("backend rejected the request: {status} {message}")]
    Rejected { status: u16, message: String },

    /// File backend could not access its document.
    #[error("io error on {file}: {source}")]
    Io {
        file: String,
        #[source]
        source: std::io::Error,
    },

    /// The stored document could not be parsed or re-encoded.
    #[error("document format error: {0}")]
    Format(String),
}

/// Remote store holding the persisted configuration document.
#[async_trait]
pub trait ConfigBackend: Send + Sync {
    /// Read the full configuration document.
    async fn fetch(&self) -> Result<ConfigDocument, BackendError>;

    /// Persist a partial patch scoped to one section.
    async fn persist(&self, key: &SectionKey, patch: &Patch) -> Result<(), BackendError>;
}
