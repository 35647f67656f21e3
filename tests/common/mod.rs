//! Shared utilities for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use proxy_admin::backend::{BackendError, ConfigBackend};
use proxy_admin::document::{ConfigDocument, Patch, SectionKey};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

/// Programmable in-memory configuration backend.
///
/// Tests can inject failures and hold fetches or persists open behind a
/// gate to exercise the store's concurrency protocol.
pub struct MemoryBackend {
    doc: Mutex<ConfigDocument>,
    pub fetch_count: AtomicUsize,
    pub persist_count: AtomicUsize,
    last_patch: Mutex<Option<(SectionKey, Patch)>>,
    fail_fetch: AtomicBool,
    fail_persist: AtomicBool,
    fetch_gate: Mutex<Option<watch::Receiver<bool>>>,
    persist_gate: Mutex<Option<watch::Receiver<bool>>>,
}

impl MemoryBackend {
    pub fn seeded(value: Value) -> Arc<Self> {
        Arc::new(Self {
            doc: Mutex::new(ConfigDocument::from_value(value).unwrap()),
            fetch_count: AtomicUsize::new(0),
            persist_count: AtomicUsize::new(0),
            last_patch: Mutex::new(None),
            fail_fetch: AtomicBool::new(false),
            fail_persist: AtomicBool::new(false),
            fetch_gate: Mutex::new(None),
            persist_gate: Mutex::new(None),
        })
    }

    pub fn set_fail_fetch(&self, on: bool) {
        self.fail_fetch.store(on, Ordering::SeqCst);
    }

    pub fn set_fail_persist(&self, on: bool) {
        self.fail_persist.store(on, Ordering::SeqCst);
    }

    /// Hold every fetch open until `true` is sent on the returned handle.
    pub fn hold_fetch(&self) -> watch::Sender<bool> {
        let (tx, rx) = watch::channel(false);
        *self.fetch_gate.lock().unwrap() = Some(rx);
        tx
    }

    /// Hold every persist open until `true` is sent on the returned handle.
    pub fn hold_persist(&self) -> watch::Sender<bool> {
        let (tx, rx) = watch::channel(false);
        *self.persist_gate.lock().unwrap() = Some(rx);
        tx
    }

    /// The last patch the backend accepted.
    pub fn last_patch(&self) -> Option<(SectionKey, Patch)> {
        self.last_patch.lock().unwrap().clone()
    }

    /// The backend's current persisted document.
    pub fn document(&self) -> ConfigDocument {
        self.doc.lock().unwrap().clone()
    }
}

async fn wait_on(gate: &Mutex<Option<watch::Receiver<bool>>>) {
    // Clone the receiver out before awaiting so the lock never crosses
    // a suspension point.
    let rx = gate.lock().unwrap().clone();
    if let Some(mut rx) = rx {
        let _ = rx.wait_for(|released| *released).await;
    }
}

#[async_trait]
impl ConfigBackend for MemoryBackend {
    async fn fetch(&self) -> Result<ConfigDocument, BackendError> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        wait_on(&self.fetch_gate).await;
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(BackendError::Rejected {
                status: 500,
                message: "injected fetch failure".to_string(),
            });
        }
        Ok(self.doc.lock().unwrap().clone())
    }

    async fn persist(&self, key: &SectionKey, patch: &Patch) -> Result<(), BackendError> {
        self.persist_count.fetch_add(1, Ordering::SeqCst);
        wait_on(&self.persist_gate).await;
        if self.fail_persist.load(Ordering::SeqCst) {
            return Err(BackendError::Rejected {
                status: 500,
                message: "injected persist failure".to_string(),
            });
        }
        let mut doc = self.doc.lock().unwrap();
        doc.merge(key, patch);
        *self.last_patch.lock().unwrap() = Some((key.clone(), patch.clone()));
        Ok(())
    }
}

/// Initialize test logging once; later calls are no-ops.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_test_writer()
        .try_init();
}
