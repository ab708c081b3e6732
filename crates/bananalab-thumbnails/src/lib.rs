//! # bananalab-thumbnails
//!
//! Page thumbnails for the BananaLab editor.
//!
//! - [`ThumbnailController`]: per-page generation with debounce, cancellation,
//!   fallback placeholders and bounded batch generation
//! - [`BlobUrlConverter`]: swaps large data URLs for revocable object handles
//! - [`ThumbnailClient`]: uploads thumbnails and queries their status

pub mod blob;
pub mod cancel;
pub mod client;
pub mod config;
pub mod controller;
pub mod error;
pub mod fallback;
pub mod renderer;

pub use blob::{
    conversion_stats, decode_data_url, Blob, BlobStore, BlobUrlConverter, ConversionStats,
    BLOB_URL_PREFIX,
};
pub use cancel::CancelToken;
pub use client::{FileStatus, GeneratedFile, PageStatus, ThumbnailClient, UploadResponse};
pub use config::ThumbnailConfig;
pub use controller::{BatchSummary, PageState, ThumbnailController, ThumbnailStats};
pub use error::{RenderError, Result, ThumbnailError};
pub use fallback::fallback_thumbnail;
pub use renderer::{FnRenderer, PageRenderer};
