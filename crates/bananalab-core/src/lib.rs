//! # bananalab-core
//!
//! Core types and the design payload optimizer for the BananaLab creative
//! editor backend.
//!
//! This crate provides the typed design document model, the pure
//! optimization pass that keeps auto-saved designs under the storage packet
//! limit, injected configuration, and the repository trait the storage layer
//! implements.

pub mod config;
pub mod defaults;
pub mod design;
pub mod error;
pub mod models;
pub mod payload;
pub mod traits;

// Re-export commonly used types at crate root
pub use config::OptimizerConfig;
pub use design::{Cell, DesignDocument, Element, Lenient, Page, ParsedDesign};
pub use error::{DesignParseError, Error, Result};
pub use models::*;
pub use payload::{
    serialized_len, sha256_hex, size_in_mb, OptimizationReport, Optimized, PayloadOptimizer,
};
pub use traits::*;
