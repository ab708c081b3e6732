//! Data URL to object handle conversion.
//!
//! Large `data:image/...` strings are decoded once into a [`Blob`] held by a
//! [`BlobStore`], and callers keep a short `blob:` URL instead. Every handle
//! created by a [`BlobUrlConverter`] is revoked on replacement, on explicit
//! revoke, on [`BlobUrlConverter::cleanup_all`] or when the converter drops.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use bananalab_core::defaults::DATA_IMAGE_PREFIX;

use crate::error::{Result, ThumbnailError};

/// Scheme prefix of handles issued by [`BlobStore`].
pub const BLOB_URL_PREFIX: &str = "blob:bananalab/";

/// Decoded binary image data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// Decode a base64 `data:image/<type>;base64,<payload>` URL.
pub fn decode_data_url(url: &str) -> Result<Blob> {
    if !url.starts_with(DATA_IMAGE_PREFIX) {
        return Err(ThumbnailError::InvalidDataUrl("not an image data URL".into()));
    }
    let rest = &url["data:".len()..];
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| ThumbnailError::InvalidDataUrl("missing ',' separator".into()))?;
    let mime = header
        .strip_suffix(";base64")
        .ok_or_else(|| ThumbnailError::InvalidDataUrl("only base64 data URLs are supported".into()))?;
    let bytes = STANDARD
        .decode(payload)
        .map_err(|e| ThumbnailError::InvalidDataUrl(e.to_string()))?;

    Ok(Blob {
        mime: mime.to_string(),
        bytes,
    })
}

/// Table of live object handles.
///
/// Only [`BlobUrlConverter`] creates and revokes handles; everyone else can
/// resolve them.
#[derive(Clone, Default)]
pub struct BlobStore {
    handles: Arc<Mutex<HashMap<String, Arc<Blob>>>>,
}

impl BlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Arc<Blob>>> {
        self.handles.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn create(&self, blob: Blob) -> String {
        let url = format!("{BLOB_URL_PREFIX}{}", Uuid::new_v4());
        self.lock().insert(url.clone(), Arc::new(blob));
        url
    }

    pub(crate) fn revoke(&self, url: &str) -> bool {
        self.lock().remove(url).is_some()
    }

    pub fn resolve(&self, url: &str) -> Option<Arc<Blob>> {
        self.lock().get(url).cloned()
    }

    /// Number of handles not yet revoked.
    pub fn live_handles(&self) -> usize {
        self.lock().len()
    }
}

/// Counts reported by [`conversion_stats`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConversionStats {
    pub data_urls: usize,
    pub object_urls: usize,
    pub other: usize,
    /// `object_urls / (data_urls + object_urls)` as a percentage, 0 when empty.
    pub conversion_rate: f64,
}

/// Count data URL and handle-backed entries in a thumbnail map.
pub fn conversion_stats(thumbnails: &HashMap<String, String>) -> ConversionStats {
    let mut stats = ConversionStats::default();
    for value in thumbnails.values() {
        if value.starts_with(DATA_IMAGE_PREFIX) {
            stats.data_urls += 1;
        } else if value.starts_with(BLOB_URL_PREFIX) {
            stats.object_urls += 1;
        } else {
            stats.other += 1;
        }
    }
    let convertible = stats.data_urls + stats.object_urls;
    if convertible > 0 {
        let rate = stats.object_urls as f64 / convertible as f64 * 100.0;
        stats.conversion_rate = (rate * 100.0).round() / 100.0;
    }
    stats
}

/// Owns the handles it creates, keyed by page id.
pub struct BlobUrlConverter {
    store: BlobStore,
    handles: HashMap<String, String>,
}

impl BlobUrlConverter {
    pub fn new(store: BlobStore) -> Self {
        Self {
            store,
            handles: HashMap::new(),
        }
    }

    pub fn store(&self) -> &BlobStore {
        &self.store
    }

    /// Convert one value. Image data URLs become handles, replacing (and
    /// revoking) any handle previously issued for `key`; anything else is
    /// returned unchanged.
    pub fn convert(&mut self, key: &str, value: &str) -> Result<String> {
        if !value.starts_with(DATA_IMAGE_PREFIX) {
            return Ok(value.to_string());
        }

        let blob = decode_data_url(value)?;
        let url = self.store.create(blob);
        if let Some(previous) = self.handles.insert(key.to_string(), url.clone()) {
            self.store.revoke(&previous);
        }
        Ok(url)
    }

    /// Convert a whole page id to thumbnail map.
    ///
    /// Yields once before starting so the conversion runs after whatever the
    /// caller is currently doing. Entries that fail to decode keep their
    /// original value.
    pub async fn convert_all(
        &mut self,
        thumbnails: &HashMap<String, String>,
    ) -> HashMap<String, String> {
        tokio::task::yield_now().await;

        let mut converted = HashMap::with_capacity(thumbnails.len());
        for (page_id, value) in thumbnails {
            let out = match self.convert(page_id, value) {
                Ok(url) => url,
                Err(e) => {
                    warn!(page_id = %page_id, error = %e, "Thumbnail conversion failed, keeping data URL");
                    value.clone()
                }
            };
            converted.insert(page_id.clone(), out);
        }
        debug!(entries = converted.len(), handles = self.handles.len(), "Thumbnails converted");
        converted
    }

    /// Revoke the handle issued for `key`.
    pub fn revoke(&mut self, key: &str) -> bool {
        match self.handles.remove(key) {
            Some(url) => self.store.revoke(&url),
            None => false,
        }
    }

    /// Revoke every handle this converter issued.
    pub fn cleanup_all(&mut self) {
        let count = self.handles.len();
        for (_, url) in self.handles.drain() {
            self.store.revoke(&url);
        }
        if count > 0 {
            debug!(revoked = count, "Revoked thumbnail handles");
        }
    }

    pub fn handle_count(&self) -> usize {
        self.handles.len()
    }

    pub fn url_for(&self, key: &str) -> Option<&str> {
        self.handles.get(key).map(String::as_str)
    }
}

impl Drop for BlobUrlConverter {
    fn drop(&mut self) {
        self.cleanup_all();
    }
}
