//! Thumbnail controller configuration.

use std::time::Duration;

use bananalab_core::defaults;

/// Timing and sizing knobs for [`crate::ThumbnailController`].
#[derive(Debug, Clone)]
pub struct ThumbnailConfig {
    /// Minimum interval between successful generations for one page.
    pub debounce: Duration,
    /// Pages rendered concurrently by bulk generation.
    pub batch_concurrency: usize,
    /// Pause between bulk batches.
    pub batch_pause: Duration,
    /// Delay before an invalidated page is regenerated.
    pub invalidate_delay: Duration,
    /// Settle delay before each capture.
    pub settle_delay: Duration,
    /// Upper bound for a single capture.
    pub image_timeout: Duration,
    pub fallback_width: u32,
    pub fallback_height: u32,
    pub fallback_color: [u8; 4],
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(defaults::THUMBNAIL_DEBOUNCE_MS),
            batch_concurrency: defaults::THUMBNAIL_BATCH_CONCURRENCY,
            batch_pause: Duration::from_millis(defaults::THUMBNAIL_BATCH_PAUSE_MS),
            invalidate_delay: Duration::from_millis(defaults::THUMBNAIL_INVALIDATE_DELAY_MS),
            settle_delay: Duration::from_millis(defaults::THUMBNAIL_SETTLE_DELAY_MS),
            image_timeout: Duration::from_millis(defaults::THUMBNAIL_IMAGE_TIMEOUT_MS),
            fallback_width: defaults::THUMBNAIL_FALLBACK_WIDTH,
            fallback_height: defaults::THUMBNAIL_FALLBACK_HEIGHT,
            fallback_color: defaults::THUMBNAIL_FALLBACK_COLOR,
        }
    }
}

impl ThumbnailConfig {
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_batch_concurrency(mut self, n: usize) -> Self {
        self.batch_concurrency = n.max(1);
        self
    }

    pub fn with_batch_pause(mut self, pause: Duration) -> Self {
        self.batch_pause = pause;
        self
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn with_image_timeout(mut self, timeout: Duration) -> Self {
        self.image_timeout = timeout;
        self
    }
}
