//! In-process stand-in for browser object URLs.
//!
//! Every `blob:` URL handed out is owned by a [`BlobHandle`]; the entry is
//! removed when the handle is released or dropped, whichever comes first.

use bytes::Bytes;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct StoredBlob {
    pub bytes: Bytes,
    pub content_type: String,
}

#[derive(Debug, Clone, Default)]
pub struct BlobRegistry {
    entries: Arc<Mutex<HashMap<String, StoredBlob>>>,
}

impl BlobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers bytes under a fresh `blob:` URL
    pub fn create(&self, bytes: Bytes, content_type: impl Into<String>) -> BlobHandle {
        let url = format!("blob:{}", Uuid::new_v4());
        let blob = StoredBlob {
            bytes,
            content_type: content_type.into(),
        };
        self.lock().insert(url.clone(), blob);
        tracing::trace!("Created object URL {}", url);

        BlobHandle {
            url,
            registry: self.clone(),
            released: false,
        }
    }

    pub fn resolve(&self, url: &str) -> Option<StoredBlob> {
        self.lock().get(url).cloned()
    }

    pub fn live_count(&self) -> usize {
        self.lock().len()
    }

    fn revoke(&self, url: &str) {
        if self.lock().remove(url).is_some() {
            tracing::trace!("Revoked object URL {}", url);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, StoredBlob>> {
        // A poisoned map only means another holder panicked mid-insert/remove
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Owner of one object URL
#[derive(Debug)]
pub struct BlobHandle {
    url: String,
    registry: BlobRegistry,
    released: bool,
}

impl BlobHandle {
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn bytes(&self) -> Option<Bytes> {
        self.registry.resolve(&self.url).map(|b| b.bytes)
    }

    /// Revokes the URL now instead of at drop
    pub fn release(mut self) {
        self.revoke_once();
    }

    fn revoke_once(&mut self) {
        if !self.released {
            self.registry.revoke(&self.url);
            self.released = true;
        }
    }
}

impl Drop for BlobHandle {
    fn drop(&mut self) {
        self.revoke_once();
    }
}
