//! Design payload optimizer.
//!
//! Shrinks a design document so it fits in a single storage write:
//!
//! 1. Oversized embedded images are swapped for a 1x1 placeholder plus the
//!    SHA-256 of the original, its length, and a `needs_reupload` flag.
//! 2. Filter entries equal to their default are dropped (sparse filters).
//! 3. Ephemeral cache fields are removed.
//!
//! The result is then measured against `ceil(packet_limit * safe_ratio)`.
//! The transform is pure: same input and config, same output.

use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use tracing::{debug, info, trace, warn};

use crate::config::OptimizerConfig;
use crate::defaults::DATA_IMAGE_PREFIX;
use crate::design::{
    DesignDocument, Element, ParsedDesign, CONTENT_BACKUP, CONTENT_SIZE, NEEDS_REUPLOAD,
};
use crate::error::{Error, Result};

/// What an optimization pass did.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OptimizationReport {
    /// Serialized size of the input.
    pub original_bytes: usize,
    /// Serialized size of the output.
    pub optimized_bytes: usize,
    /// Embedded images swapped for the placeholder.
    pub images_replaced: usize,
    /// Filter entries dropped for matching their default.
    pub filters_removed: usize,
    /// Ephemeral cache fields dropped.
    pub ephemeral_removed: usize,
    /// Well-formed pages visited.
    pub pages: usize,
    /// Share of bytes saved, in percent with 2 decimals.
    pub saved_percent: f64,
}

impl OptimizationReport {
    /// Whether the pass modified the document.
    pub fn changed(&self) -> bool {
        self.images_replaced + self.filters_removed + self.ephemeral_removed > 0
    }
}

/// Result of a successful optimization.
#[derive(Debug, Clone)]
pub struct Optimized {
    pub document: Value,
    pub report: OptimizationReport,
}

/// Applies the optimization rules of an [`OptimizerConfig`].
#[derive(Debug, Clone, Default)]
pub struct PayloadOptimizer {
    config: OptimizerConfig,
}

impl PayloadOptimizer {
    pub fn new(config: OptimizerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Optimize a design document and enforce the size budget.
    ///
    /// Objects without `pages` come back unchanged and unmeasured. A
    /// non-object root is an [`Error::InvalidDesign`]. An output still above
    /// [`OptimizerConfig::max_payload_bytes`] is [`Error::PayloadTooLarge`].
    pub fn optimize(&self, document: Value) -> Result<Optimized> {
        let original_bytes = serialized_len(&document)?;

        let mut design = match DesignDocument::parse(document)? {
            ParsedDesign::Design(design) => design,
            ParsedDesign::PassThrough(value) => {
                debug!("Design document has no pages, passing through");
                return Ok(Optimized {
                    document: value,
                    report: OptimizationReport {
                        original_bytes,
                        optimized_bytes: original_bytes,
                        ..Default::default()
                    },
                });
            }
        };

        let mut report = OptimizationReport {
            original_bytes,
            ..Default::default()
        };
        self.apply(&mut design, &mut report);

        let document = design.to_value()?;
        let optimized_bytes = serialized_len(&document)?;
        report.optimized_bytes = optimized_bytes;
        report.saved_percent = saved_percent(original_bytes, optimized_bytes);

        let limit_bytes = self.config.max_payload_bytes();
        if optimized_bytes > limit_bytes {
            warn!(
                pages = report.pages,
                original_size = original_bytes,
                optimized_size = optimized_bytes,
                size_mb = size_in_mb(optimized_bytes),
                max_size_mb = size_in_mb(limit_bytes),
                "Design payload exceeds packet budget after optimization"
            );
            return Err(Error::PayloadTooLarge {
                size_bytes: optimized_bytes,
                limit_bytes,
            });
        }

        if report.changed() {
            info!(
                pages = report.pages,
                original_size = original_bytes,
                optimized_size = optimized_bytes,
                saved_percent = report.saved_percent,
                images_replaced = report.images_replaced,
                filters_removed = report.filters_removed,
                "Design payload optimized"
            );
        }

        Ok(Optimized { document, report })
    }

    /// Apply the structural rules in place, without measuring.
    pub fn apply(&self, design: &mut DesignDocument, report: &mut OptimizationReport) {
        report.pages += design.page_count();
        for page in design.pages_mut() {
            let page_id = page.id();
            report.ephemeral_removed +=
                remove_keys(&mut page.extra, &self.config.page_ephemeral_fields);

            for cell in page.cells_mut() {
                for element in cell.elements_mut() {
                    self.optimize_element(page_id.as_deref(), element, report);
                }
            }
        }
    }

    fn optimize_element(
        &self,
        page_id: Option<&str>,
        element: &mut Element,
        report: &mut OptimizationReport,
    ) {
        if element.is_image() {
            if let Some(original) = element.content_str() {
                if original.starts_with(DATA_IMAGE_PREFIX)
                    && original.len() > self.config.large_image_threshold
                {
                    let backup = sha256_hex(original);
                    let size = original.len();
                    trace!(
                        page_id = page_id.unwrap_or("-"),
                        content_size = size,
                        "Replacing oversized embedded image"
                    );

                    element.content = Some(Value::String(self.config.placeholder_image.clone()));
                    element
                        .extra
                        .insert(CONTENT_BACKUP.to_string(), Value::String(backup));
                    element
                        .extra
                        .insert(CONTENT_SIZE.to_string(), Value::from(size));
                    element
                        .extra
                        .insert(NEEDS_REUPLOAD.to_string(), Value::Bool(true));
                    report.images_replaced += 1;
                }
            }
        }

        if let Some(filters) = element.filters_mut() {
            let before = filters.len();
            filters.retain(|key, value| !self.config.is_default_filter(key, value));
            report.filters_removed += before - filters.len();
        }

        report.ephemeral_removed +=
            remove_keys(&mut element.extra, &self.config.element_ephemeral_fields);
    }
}

/// Convert a byte count to MB, rounded to 2 decimals.
pub fn size_in_mb(bytes: usize) -> f64 {
    round2(bytes as f64 / 1024.0 / 1024.0)
}

/// Lowercase hex SHA-256 of a string.
pub fn sha256_hex(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

/// Size of the compact JSON encoding of `value`.
pub fn serialized_len(value: &Value) -> Result<usize> {
    Ok(serde_json::to_vec(value)?.len())
}

fn saved_percent(original: usize, optimized: usize) -> f64 {
    if original == 0 {
        return 0.0;
    }
    round2((original as f64 - optimized as f64) / original as f64 * 100.0)
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

fn remove_keys(map: &mut Map<String, Value>, keys: &[String]) -> usize {
    keys.iter().filter(|k| map.remove(k.as_str()).is_some()).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn big_image(len: usize) -> String {
        let prefix = "data:image/png;base64,";
        format!("{}{}", prefix, "A".repeat(len - prefix.len()))
    }

    fn single_element(element: Value) -> Value {
        json!({"pages": [{"id": 1, "cells": [{"id": "c", "elements": [element]}]}]})
    }

    fn first_element(doc: &Value) -> &Value {
        &doc["pages"][0]["cells"][0]["elements"][0]
    }

    #[test]
    fn test_replaces_oversized_image_and_sparsifies_filters() {
        let content = big_image(600_000);
        let input = single_element(json!({
            "type": "image",
            "content": content,
            "filters": {"brightness": 100, "opacity": 50}
        }));

        let out = PayloadOptimizer::default().optimize(input).unwrap();
        let el = first_element(&out.document);

        assert_eq!(el["content"], crate::defaults::PLACEHOLDER_IMAGE);
        assert_eq!(el["content_size"], 600_000);
        assert_eq!(el["content_backup"], sha256_hex(&content));
        assert_eq!(el["needs_reupload"], true);
        assert_eq!(el["filters"], json!({"opacity": 50}));
        assert_eq!(out.report.images_replaced, 1);
        assert_eq!(out.report.filters_removed, 1);
        assert!(out.report.saved_percent > 90.0);
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let content = big_image(500_000);
        let input = single_element(json!({"type": "image", "content": content}));

        let out = PayloadOptimizer::default().optimize(input).unwrap();
        assert_eq!(first_element(&out.document)["content"], content);
        assert_eq!(out.report.images_replaced, 0);
    }

    #[test]
    fn test_non_image_elements_keep_large_content() {
        let content = big_image(600_000);
        let input = single_element(json!({"type": "shape", "content": content}));
        let optimizer =
            PayloadOptimizer::new(OptimizerConfig::default().with_packet_limit(10_000_000));

        let out = optimizer.optimize(input).unwrap();
        assert_eq!(first_element(&out.document)["content"], content);
    }

    #[test]
    fn test_non_data_uri_content_is_kept() {
        let content = "x".repeat(600_000);
        let input = single_element(json!({"type": "image", "content": content}));
        let optimizer =
            PayloadOptimizer::new(OptimizerConfig::default().with_packet_limit(10_000_000));

        let out = optimizer.optimize(input).unwrap();
        assert_eq!(out.report.images_replaced, 0);
    }

    #[test]
    fn test_removes_ephemeral_fields() {
        let input = json!({"pages": [{
            "_thumbnail_cache": "data:image/png;base64,AAAA",
            "cells": [{"elements": [
                {"type": "text", "_temp": 1, "_cache": {}, "_preview": "x", "text": "keep"}
            ]}]
        }]});

        let out = PayloadOptimizer::default().optimize(input).unwrap();
        assert_eq!(
            out.document,
            json!({"pages": [{"cells": [{"elements": [{"type": "text", "text": "keep"}]}]}]})
        );
        assert_eq!(out.report.ephemeral_removed, 4);
    }

    #[test]
    fn test_filters_without_defaults_are_kept() {
        let input = single_element(json!({
            "type": "image",
            "filters": {"sepia": 0, "blendMode": "normal", "blur": 2, "hue": 0.0}
        }));

        let out = PayloadOptimizer::default().optimize(input).unwrap();
        assert_eq!(
            first_element(&out.document)["filters"],
            json!({"sepia": 0, "blur": 2})
        );
    }

    #[test]
    fn test_corrupt_filters_are_untouched() {
        let input = single_element(json!({"type": "image", "filters": [100, 100]}));
        let out = PayloadOptimizer::default().optimize(input.clone()).unwrap();
        assert_eq!(out.document, input);
        assert!(!out.report.changed());
    }

    #[test]
    fn test_report_counts_well_formed_pages() {
        let input = json!({"pages": [
            {"id": "cover", "cells": []},
            "not a page",
            {"id": 2, "cells": [{"elements": [{"type": "image", "content": big_image(600_000)}]}]}
        ]});
        let out = PayloadOptimizer::default().optimize(input).unwrap();
        assert_eq!(out.report.pages, 2);
        assert_eq!(out.report.images_replaced, 1);
        assert_eq!(out.document["pages"][1], "not a page");
    }

    #[test]
    fn test_document_without_pages_passes_through() {
        let input = json!({"title": "Summer", "_temp": true});
        let out = PayloadOptimizer::default().optimize(input.clone()).unwrap();
        assert_eq!(out.document, input);
        assert_eq!(out.report.original_bytes, out.report.optimized_bytes);
    }

    #[test]
    fn test_non_object_root_is_invalid() {
        let err = PayloadOptimizer::default().optimize(json!("pages")).unwrap_err();
        assert!(matches!(err, Error::InvalidDesign(_)));
    }

    #[test]
    fn test_rejects_payload_over_budget() {
        // Many images just under the threshold survive replacement.
        let elements: Vec<Value> = (0..2)
            .map(|_| json!({"type": "image", "content": big_image(450_000)}))
            .collect();
        let input = json!({"pages": [{"cells": [{"elements": elements}]}]});

        let err = PayloadOptimizer::default().optimize(input).unwrap_err();
        match err {
            Error::PayloadTooLarge {
                size_bytes,
                limit_bytes,
            } => {
                assert_eq!(limit_bytes, 838_861);
                assert!(size_bytes > 900_000);
                assert_eq!(size_in_mb(limit_bytes), 0.8);
            }
            other => panic!("expected PayloadTooLarge, got {other:?}"),
        }
    }

    #[test]
    fn test_size_in_mb_rounding() {
        assert_eq!(size_in_mb(1_048_576), 1.0);
        assert_eq!(size_in_mb(1_500_000), 1.43);
        assert_eq!(size_in_mb(0), 0.0);
    }

    #[test]
    fn test_sha256_hex_known_vector() {
        assert_eq!(
            sha256_hex("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
