//! Centralized default constants for the BananaLab backend.
//!
//! **This module is the single source of truth** for shared default values.
//! Configuration structs ([`crate::OptimizerConfig`] and the thumbnail
//! controller's config) start from these constants and let callers override
//! them, so tests can parameterize thresholds.
//!
//! The payload constants must match the storage engine the design documents
//! are written to; changing them breaks compatibility with existing clients.

// =============================================================================
// PAYLOAD OPTIMIZATION
// =============================================================================

/// Maximum size of a single write accepted by the backing store (1 MiB).
///
/// Mirrors MySQL's default `max_allowed_packet`.
pub const MAX_PACKET_SIZE: usize = 1_048_576;

/// Fraction of [`MAX_PACKET_SIZE`] a design document may occupy.
///
/// The rest is headroom for the surrounding row and protocol framing.
pub const SAFE_PACKET_RATIO: f64 = 0.8;

/// Embedded image content longer than this (in characters) is replaced by
/// [`PLACEHOLDER_IMAGE`].
pub const LARGE_IMAGE_THRESHOLD: usize = 500_000;

/// 1x1 transparent PNG used in place of oversized embedded images.
pub const PLACEHOLDER_IMAGE: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mNkYAAAAAYAAjCB0C8AAAAASUVORK5CYII=";

/// Prefix identifying an embedded (inline) image.
pub const DATA_IMAGE_PREFIX: &str = "data:image/";

/// Filter keys and the values that mean "no adjustment".
///
/// A filter entry equal to its default is redundant and dropped on save.
pub const FILTER_DEFAULTS: &[(&str, FilterDefault)] = &[
    ("brightness", FilterDefault::Number(100.0)),
    ("contrast", FilterDefault::Number(100.0)),
    ("saturation", FilterDefault::Number(100.0)),
    ("tint", FilterDefault::Number(0.0)),
    ("hue", FilterDefault::Number(0.0)),
    ("blur", FilterDefault::Number(0.0)),
    ("scale", FilterDefault::Number(1.0)),
    ("rotate", FilterDefault::Number(0.0)),
    ("opacity", FilterDefault::Number(100.0)),
    ("blendMode", FilterDefault::Text("normal")),
];

/// A default filter value, kept as a const-friendly enum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterDefault {
    Number(f64),
    Text(&'static str),
}

/// Element-level cache fields that never reach storage.
pub const ELEMENT_EPHEMERAL_FIELDS: &[&str] = &["_temp", "_cache", "_preview"];

/// Page-level cache fields that never reach storage.
pub const PAGE_EPHEMERAL_FIELDS: &[&str] = &["_thumbnail_cache"];

/// Auto-save routes guarded by the payload gate (glob, `*` matches anything).
pub const SAVE_ROUTES: &[&str] = &[
    "api/v1/projects/*/save-progress",
    "api/v1/projects/*/auto-save",
];

// =============================================================================
// THUMBNAILS
// =============================================================================

/// Minimum interval between successful generations for the same page.
pub const THUMBNAIL_DEBOUNCE_MS: u64 = 1000;

/// Pages rendered concurrently during bulk generation.
pub const THUMBNAIL_BATCH_CONCURRENCY: usize = 2;

/// Pause between bulk generation batches.
pub const THUMBNAIL_BATCH_PAUSE_MS: u64 = 200;

/// Delay before regenerating an invalidated page.
pub const THUMBNAIL_INVALIDATE_DELAY_MS: u64 = 100;

/// Settle delay before capturing a page.
pub const THUMBNAIL_SETTLE_DELAY_MS: u64 = 50;

/// Upper bound on a single page capture (image loading included).
pub const THUMBNAIL_IMAGE_TIMEOUT_MS: u64 = 15_000;

/// Fallback thumbnail width in pixels.
pub const THUMBNAIL_FALLBACK_WIDTH: u32 = 200;

/// Fallback thumbnail height in pixels.
pub const THUMBNAIL_FALLBACK_HEIGHT: u32 = 150;

/// Fallback thumbnail fill color (RGBA).
pub const THUMBNAIL_FALLBACK_COLOR: [u8; 4] = [0xF3, 0xF4, 0xF6, 0xFF];

// =============================================================================
// SERVER
// =============================================================================

/// Default HTTP server port.
pub const SERVER_PORT: u16 = 3000;

/// Maximum request body size in bytes (64 MiB).
///
/// Far above the packet limit on purpose: oversized designs must reach the
/// payload gate to be shrunk, not be cut off by the transport.
pub const MAX_BODY_SIZE_BYTES: usize = 64 * 1024 * 1024;

/// Default page size for list endpoints.
pub const PAGE_LIMIT: i64 = 50;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_packet_budget_is_below_packet_size() {
        let budget = (MAX_PACKET_SIZE as f64 * SAFE_PACKET_RATIO).ceil() as usize;
        assert_eq!(budget, 838_861);
        assert!(budget < MAX_PACKET_SIZE);
    }

    #[test]
    fn placeholder_is_far_below_threshold() {
        assert!(PLACEHOLDER_IMAGE.starts_with(DATA_IMAGE_PREFIX));
        assert!(PLACEHOLDER_IMAGE.len() < LARGE_IMAGE_THRESHOLD);
    }

    #[test]
    fn filter_defaults_have_unique_keys() {
        let mut keys: Vec<&str> = FILTER_DEFAULTS.iter().map(|(k, _)| *k).collect();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), FILTER_DEFAULTS.len());
    }
}
