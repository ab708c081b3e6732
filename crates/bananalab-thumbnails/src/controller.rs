//! Page thumbnail generation controller.
//!
//! Each page id owns a small state machine:
//!
//! ```text
//! Idle -> Generating -> Ready
//!                    -> Fallback (render failed or timed out)
//! ```
//!
//! At most one generation runs per page. A successful render starts the
//! debounce window; a new non-forced request inside that window is answered
//! from the cache. Cancelled generations never touch the cache.
//!
//! State lives behind a `std::sync::Mutex` that is never held across an
//! `.await`, so the controller can be shared freely between tasks on a
//! multi-threaded runtime.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio::runtime::Handle;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info, warn};

use bananalab_core::defaults::PLACEHOLDER_IMAGE;

use crate::cancel::CancelToken;
use crate::config::ThumbnailConfig;
use crate::error::RenderError;
use crate::fallback::fallback_thumbnail;
use crate::renderer::PageRenderer;

/// Observable state of one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PageState {
    Idle,
    Generating,
    Ready,
    /// Last generation failed; the cached thumbnail is the placeholder.
    Fallback,
}

/// Counters reported by [`ThumbnailController::get_stats`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ThumbnailStats {
    pub total_pages: usize,
    pub generated: usize,
    pub generating: usize,
    pub errors: usize,
    /// `generated / total_pages` as a rounded percentage.
    pub completion_percent: u32,
}

/// Outcome of a bulk run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub requested: usize,
    pub completed: usize,
    /// Pages answered from cache, already in flight, or cancelled.
    pub skipped: usize,
    /// Pages that ended up with the fallback thumbnail.
    pub failed: usize,
}

enum Generation {
    Rendered(String),
    Fallback(String),
    Skipped(Option<String>),
}

impl Generation {
    fn into_thumbnail(self) -> Option<String> {
        match self {
            Generation::Rendered(t) | Generation::Fallback(t) => Some(t),
            Generation::Skipped(t) => t,
        }
    }
}

struct InFlight {
    token: CancelToken,
    ticket: u64,
}

#[derive(Default)]
struct PageEntry {
    thumbnail: Option<String>,
    is_fallback: bool,
    error: Option<String>,
    last_generated: Option<Instant>,
    in_flight: Option<InFlight>,
}

/// Releases a page's in-flight claim if the generation future is dropped
/// before `finish` runs, so the page does not stay `Generating` forever.
struct InFlightGuard<'a> {
    shared: &'a Shared,
    page_id: &'a str,
    ticket: u64,
    token: CancelToken,
    armed: bool,
}

impl InFlightGuard<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        self.token.cancel();
        let mut inner = self.shared.lock();
        if let Some(entry) = inner.pages.get_mut(self.page_id) {
            if entry.in_flight.as_ref().is_some_and(|f| f.ticket == self.ticket) {
                entry.in_flight = None;
                debug!(page_id = self.page_id, "Thumbnail generation dropped before completion");
            }
        }
    }
}

impl PageEntry {
    fn state(&self) -> PageState {
        match (&self.in_flight, &self.thumbnail) {
            (Some(_), _) => PageState::Generating,
            (None, Some(_)) if self.is_fallback => PageState::Fallback,
            (None, Some(_)) => PageState::Ready,
            (None, None) => PageState::Idle,
        }
    }
}

#[derive(Default)]
struct Inner {
    pages: HashMap<String, PageEntry>,
    known_pages: HashSet<String>,
    scheduled: HashMap<String, JoinHandle<()>>,
    next_ticket: u64,
    torn_down: bool,
}

struct Shared {
    renderer: Arc<dyn PageRenderer>,
    config: ThumbnailConfig,
    fallback: String,
    inner: Mutex<Inner>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Produces and caches one thumbnail per page.
///
/// Cheap to clone; clones share the same cache.
#[derive(Clone)]
pub struct ThumbnailController {
    shared: Arc<Shared>,
}

impl ThumbnailController {
    pub fn new(renderer: Arc<dyn PageRenderer>, config: ThumbnailConfig) -> Self {
        let fallback = fallback_thumbnail(
            config.fallback_width,
            config.fallback_height,
            config.fallback_color,
        )
        .unwrap_or_else(|e| {
            warn!(error = %e, "Fallback raster encoding failed, using 1x1 placeholder");
            PLACEHOLDER_IMAGE.to_string()
        });

        Self {
            shared: Arc::new(Shared {
                renderer,
                config,
                fallback,
                inner: Mutex::new(Inner::default()),
            }),
        }
    }

    pub fn config(&self) -> &ThumbnailConfig {
        &self.shared.config
    }

    /// The placeholder cached for pages whose render failed.
    pub fn fallback_image(&self) -> &str {
        &self.shared.fallback
    }

    /// Declare the pages of the current document so stats have a denominator.
    pub fn register_pages<I, S>(&self, page_ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut inner = self.shared.lock();
        inner.known_pages = page_ids.into_iter().map(Into::into).collect();
    }

    /// Generate a thumbnail unless one is in flight or the page is inside its
    /// debounce window. Skipped requests return whatever is cached.
    pub async fn generate_thumbnail(&self, page_id: &str) -> Option<String> {
        self.generate(page_id, false).await.into_thumbnail()
    }

    /// Generate a thumbnail now, cancelling any in-flight generation for the
    /// page and ignoring the debounce window.
    pub async fn regenerate_thumbnail(&self, page_id: &str) -> Option<String> {
        self.generate(page_id, true).await.into_thumbnail()
    }

    /// Generate thumbnails for many pages, `batch_concurrency` at a time with
    /// `batch_pause` between batches. Failures never abort sibling pages.
    pub async fn generate_multiple_thumbnails(&self, page_ids: &[String]) -> BatchSummary {
        let config = &self.shared.config;
        let mut summary = BatchSummary {
            requested: page_ids.len(),
            ..BatchSummary::default()
        };

        for (index, batch) in page_ids.chunks(config.batch_concurrency.max(1)).enumerate() {
            if index > 0 {
                sleep(config.batch_pause).await;
            }
            if self.shared.lock().torn_down {
                summary.skipped += page_ids.len() - index * config.batch_concurrency.max(1);
                break;
            }

            let mut set = JoinSet::new();
            for page_id in batch {
                let controller = self.clone();
                let page_id = page_id.clone();
                set.spawn(async move { controller.generate(&page_id, false).await });
            }

            while let Some(joined) = set.join_next().await {
                match joined {
                    Ok(Generation::Rendered(_)) => summary.completed += 1,
                    Ok(Generation::Fallback(_)) => summary.failed += 1,
                    Ok(Generation::Skipped(_)) => summary.skipped += 1,
                    Err(e) => {
                        warn!(error = %e, "Thumbnail task aborted");
                        summary.failed += 1;
                    }
                }
            }
        }

        info!(
            requested = summary.requested,
            completed = summary.completed,
            skipped = summary.skipped,
            failed = summary.failed,
            "Batch thumbnail generation finished"
        );
        summary
    }

    /// Drop the cached thumbnail and schedule a fresh generation after
    /// `invalidate_delay`.
    ///
    /// Outside a tokio runtime the cache is still cleared but nothing is
    /// scheduled; the next request regenerates the page.
    pub fn invalidate_thumbnail(&self, page_id: &str) {
        let mut inner = self.shared.lock();
        if inner.torn_down {
            return;
        }

        if let Some(entry) = inner.pages.get_mut(page_id) {
            if let Some(in_flight) = entry.in_flight.take() {
                in_flight.token.cancel();
            }
            *entry = PageEntry::default();
        }

        let Ok(runtime) = Handle::try_current() else {
            warn!(page_id, "No tokio runtime, thumbnail regeneration not scheduled");
            return;
        };
        let controller = self.clone();
        let delay = self.shared.config.invalidate_delay;
        let id = page_id.to_string();
        let handle = runtime.spawn(async move {
            sleep(delay).await;
            controller.generate(&id, false).await;
        });

        inner.scheduled.retain(|_, h| !h.is_finished());
        if let Some(previous) = inner.scheduled.insert(page_id.to_string(), handle) {
            previous.abort();
        }
        debug!(page_id, delay_ms = delay.as_millis() as u64, "Thumbnail invalidated");
    }

    /// Return the cached thumbnail. On a miss, start a generation in the
    /// background and return `None`; callers poll again later.
    ///
    /// Called outside a tokio runtime, a miss returns `None` without starting
    /// a generation.
    pub fn get_thumbnail(&self, page_id: &str) -> Option<String> {
        {
            let inner = self.shared.lock();
            if let Some(entry) = inner.pages.get(page_id) {
                if entry.thumbnail.is_some() || entry.in_flight.is_some() {
                    return entry.thumbnail.clone();
                }
            }
            if inner.torn_down {
                return None;
            }
        }

        let Ok(runtime) = Handle::try_current() else {
            debug!(page_id, "No tokio runtime, background generation skipped");
            return None;
        };
        let controller = self.clone();
        let id = page_id.to_string();
        runtime.spawn(async move {
            controller.generate(&id, false).await;
        });
        None
    }

    pub fn has_thumbnail(&self, page_id: &str) -> bool {
        self.shared
            .lock()
            .pages
            .get(page_id)
            .is_some_and(|e| e.thumbnail.is_some())
    }

    pub fn state(&self, page_id: &str) -> PageState {
        self.shared
            .lock()
            .pages
            .get(page_id)
            .map_or(PageState::Idle, PageEntry::state)
    }

    /// The recorded failure for a page, if its last generation fell back.
    pub fn error(&self, page_id: &str) -> Option<String> {
        self.shared
            .lock()
            .pages
            .get(page_id)
            .and_then(|e| e.error.clone())
    }

    /// Counters over the registered pages only. Entries for pages dropped by
    /// a later [`register_pages`](Self::register_pages) are not counted.
    pub fn get_stats(&self) -> ThumbnailStats {
        let inner = self.shared.lock();
        let mut stats = ThumbnailStats {
            total_pages: inner.known_pages.len(),
            ..ThumbnailStats::default()
        };
        let registered = inner.known_pages.iter().filter_map(|id| inner.pages.get(id));
        for entry in registered {
            if entry.thumbnail.is_some() {
                stats.generated += 1;
            }
            if entry.in_flight.is_some() {
                stats.generating += 1;
            }
            if entry.error.is_some() {
                stats.errors += 1;
            }
        }
        if stats.total_pages > 0 {
            let ratio = stats.generated as f64 / stats.total_pages as f64;
            stats.completion_percent = (ratio * 100.0).round() as u32;
        }
        stats
    }

    /// Cancel every in-flight and scheduled generation. Cached thumbnails are
    /// kept; further requests are ignored.
    pub fn teardown(&self) {
        let mut inner = self.shared.lock();
        inner.torn_down = true;

        let mut cancelled = 0usize;
        for entry in inner.pages.values_mut() {
            if let Some(in_flight) = entry.in_flight.take() {
                in_flight.token.cancel();
                cancelled += 1;
            }
        }
        for (_, handle) in inner.scheduled.drain() {
            handle.abort();
        }
        debug!(cancelled, "Thumbnail controller torn down");
    }

    async fn generate(&self, page_id: &str, force: bool) -> Generation {
        let (token, ticket) = match self.begin(page_id, force) {
            Ok(started) => started,
            Err(cached) => return Generation::Skipped(cached),
        };

        let guard = InFlightGuard {
            shared: &self.shared,
            page_id,
            ticket,
            token: token.clone(),
            armed: true,
        };
        let outcome = self.capture(page_id, &token).await;
        guard.disarm();
        self.finish(page_id, ticket, &token, outcome)
    }

    /// Claim the page for a new generation, or return the cached value.
    fn begin(&self, page_id: &str, force: bool) -> Result<(CancelToken, u64), Option<String>> {
        let debounce = self.shared.config.debounce;
        let mut guard = self.shared.lock();
        let inner = &mut *guard;
        if inner.torn_down {
            return Err(None);
        }
        inner.known_pages.insert(page_id.to_string());

        let entry = inner.pages.entry(page_id.to_string()).or_default();
        match &entry.in_flight {
            Some(_) if !force => {
                debug!(page_id, "Thumbnail generation already in flight");
                return Err(entry.thumbnail.clone());
            }
            Some(previous) => previous.token.cancel(),
            None if !force => {
                let fresh = entry.last_generated.is_some_and(|at| at.elapsed() < debounce);
                if fresh && entry.thumbnail.is_some() {
                    debug!(page_id, "Thumbnail inside debounce window");
                    return Err(entry.thumbnail.clone());
                }
            }
            None => {}
        }

        let ticket = inner.next_ticket;
        inner.next_ticket += 1;
        let token = CancelToken::new();
        entry.in_flight = Some(InFlight {
            token: token.clone(),
            ticket,
        });
        Ok((token, ticket))
    }

    async fn capture(&self, page_id: &str, token: &CancelToken) -> Result<String, RenderError> {
        let config = &self.shared.config;

        tokio::select! {
            _ = token.cancelled() => return Err(RenderError::Cancelled),
            _ = sleep(config.settle_delay) => {}
        }

        let render = self.shared.renderer.render(page_id, token);
        tokio::select! {
            _ = token.cancelled() => Err(RenderError::Cancelled),
            result = timeout(config.image_timeout, render) => match result {
                Ok(Ok(data)) if data.is_empty() => Err(RenderError::Empty),
                Ok(rendered) => rendered,
                Err(_) => Err(RenderError::Timeout(config.image_timeout)),
            },
        }
    }

    fn finish(
        &self,
        page_id: &str,
        ticket: u64,
        token: &CancelToken,
        outcome: Result<String, RenderError>,
    ) -> Generation {
        let mut inner = self.shared.lock();
        let Some(entry) = inner.pages.get_mut(page_id) else {
            return Generation::Skipped(None);
        };

        let current = entry.in_flight.as_ref().is_some_and(|f| f.ticket == ticket);
        if !current || token.is_cancelled() {
            debug!(page_id, "Thumbnail generation cancelled");
            return Generation::Skipped(entry.thumbnail.clone());
        }
        entry.in_flight = None;

        match outcome {
            Ok(data) => {
                entry.thumbnail = Some(data.clone());
                entry.is_fallback = false;
                entry.error = None;
                entry.last_generated = Some(Instant::now());
                debug!(page_id, bytes = data.len(), "Thumbnail generated");
                Generation::Rendered(data)
            }
            Err(RenderError::Cancelled) => {
                debug!(page_id, "Renderer reported cancellation");
                Generation::Skipped(entry.thumbnail.clone())
            }
            Err(err) => {
                warn!(page_id, error = %err, "Thumbnail generation failed, using fallback");
                let fallback = self.shared.fallback.clone();
                entry.thumbnail = Some(fallback.clone());
                entry.is_fallback = true;
                entry.error = Some(err.to_string());
                Generation::Fallback(fallback)
            }
        }
    }
}
