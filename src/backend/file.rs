//! File backend: edits the proxy's TOML configuration document directly.
//!
//! For single-node deployments the admin panel can bypass the admin API
//! and operate on the same TOML file the proxy loads at startup. Writes
//! are read-modify-write over the full document, so fields this editor
//! does not own survive every save.

use super::{BackendError, ConfigBackend};
use crate::document::{ConfigDocument, Patch, SectionKey};
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Configuration backend over a TOML file holding one namespace.
pub struct FileBackend {
    path: PathBuf,
    namespace: String,
}

impl FileBackend {
    pub fn new(path: impl AsRef<Path>, namespace: &str) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            namespace: namespace.to_string(),
        }
    }

    fn io_error(&self, source: std::io::Error) -> BackendError {
        BackendError::Io {
            file: self.path.display().to_string(),
            source,
        }
    }
}

#[async_trait]
impl ConfigBackend for FileBackend {
    async fn fetch(&self) -> Result<ConfigDocument, BackendError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            // A missing file is an empty document; the first save creates it.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(self.io_error(e)),
        };
        let table: toml::Table = raw
            .parse()
            .map_err(|e: toml::de::Error| BackendError::Format(e.to_string()))?;
        let sections = match serde_json::to_value(table)
            .map_err(|e| BackendError::Format(e.to_string()))?
        {
            Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        Ok(ConfigDocument::from_namespace(&self.namespace, sections))
    }

    async fn persist(&self, key: &SectionKey, patch: &Patch) -> Result<(), BackendError> {
        if key.namespace() != self.namespace {
            return Err(BackendError::Rejected {
                status: 404,
                message: format!("unknown namespace `{}`", key.namespace()),
            });
        }

        let mut doc = self.fetch().await?;
        doc.merge(key, patch);

        let sections = doc
            .namespace(&self.namespace)
            .cloned()
            .unwrap_or_default();
        // Nulls never reach this point: the merge removes unset fields,
        // which is what makes the document TOML-encodable.
        let value = toml::Value::try_from(Value::Object(sections))
            .map_err(|e| BackendError::Format(e.to_string()))?;
        let text = toml::to_string_pretty(&value)
            .map_err(|e| BackendError::Format(e.to_string()))?;

        tokio::fs::write(&self.path, text)
            .await
            .map_err(|e| self.io_error(e))?;
        tracing::debug!(file = %self.path.display(), section = %key, "patch written");
        Ok(())
    }
}
