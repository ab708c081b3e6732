//! Injected configuration for the payload optimizer.

use serde_json::Value;

use crate::defaults::{self, FilterDefault};

/// Thresholds and tables driving [`crate::PayloadOptimizer`].
///
/// Starts from [`crate::defaults`]; tests override fields through the
/// `with_*` builders.
#[derive(Debug, Clone)]
pub struct OptimizerConfig {
    /// Maximum size of a single storage write in bytes.
    pub packet_limit: usize,
    /// Fraction of `packet_limit` a design document may use.
    pub safe_ratio: f64,
    /// Embedded image content longer than this is replaced.
    pub large_image_threshold: usize,
    /// Replacement for oversized embedded images.
    pub placeholder_image: String,
    /// Filter keys and their "no adjustment" values.
    pub filter_defaults: Vec<(String, FilterDefault)>,
    /// Element keys stripped unconditionally.
    pub element_ephemeral_fields: Vec<String>,
    /// Page keys stripped unconditionally.
    pub page_ephemeral_fields: Vec<String>,
    /// Glob patterns of routes the payload gate applies to.
    pub save_routes: Vec<String>,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            packet_limit: defaults::MAX_PACKET_SIZE,
            safe_ratio: defaults::SAFE_PACKET_RATIO,
            large_image_threshold: defaults::LARGE_IMAGE_THRESHOLD,
            placeholder_image: defaults::PLACEHOLDER_IMAGE.to_string(),
            filter_defaults: defaults::FILTER_DEFAULTS
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect(),
            element_ephemeral_fields: to_strings(defaults::ELEMENT_EPHEMERAL_FIELDS),
            page_ephemeral_fields: to_strings(defaults::PAGE_EPHEMERAL_FIELDS),
            save_routes: to_strings(defaults::SAVE_ROUTES),
        }
    }
}

impl OptimizerConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `PAYLOAD_PACKET_LIMIT` | `1048576` | Storage packet limit in bytes |
    /// | `PAYLOAD_SAFE_RATIO` | `0.8` | Usable share of the packet limit |
    /// | `PAYLOAD_LARGE_IMAGE_THRESHOLD` | `500000` | Image content length that triggers replacement |
    /// | `PAYLOAD_SAVE_ROUTES` | save-progress, auto-save | Comma-separated route globs |
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(limit) = env_parse::<usize>("PAYLOAD_PACKET_LIMIT") {
            config.packet_limit = limit.max(1);
        }
        if let Some(ratio) = env_parse::<f64>("PAYLOAD_SAFE_RATIO") {
            if ratio > 0.0 && ratio <= 1.0 {
                config.safe_ratio = ratio;
            } else {
                tracing::warn!(ratio, "PAYLOAD_SAFE_RATIO out of range (0, 1], using default");
            }
        }
        if let Some(threshold) = env_parse::<usize>("PAYLOAD_LARGE_IMAGE_THRESHOLD") {
            config.large_image_threshold = threshold;
        }
        if let Ok(routes) = std::env::var("PAYLOAD_SAVE_ROUTES") {
            let routes: Vec<String> = routes
                .split(',')
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(String::from)
                .collect();
            if !routes.is_empty() {
                config.save_routes = routes;
            }
        }

        config
    }

    /// Largest serialized design document accepted, in bytes.
    ///
    /// `ceil(packet_limit * safe_ratio)`.
    pub fn max_payload_bytes(&self) -> usize {
        (self.packet_limit as f64 * self.safe_ratio).ceil() as usize
    }

    /// Default value for a filter key, if the key has one.
    pub fn filter_default(&self, key: &str) -> Option<&FilterDefault> {
        self.filter_defaults
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Whether `value` equals the default for `key`.
    ///
    /// Numbers compare numerically so `100` and `100.0` are both defaults.
    /// Keys without a default are never simplifiable.
    pub fn is_default_filter(&self, key: &str, value: &Value) -> bool {
        match (self.filter_default(key), value) {
            (Some(FilterDefault::Number(d)), Value::Number(n)) => n.as_f64() == Some(*d),
            (Some(FilterDefault::Text(d)), Value::String(s)) => s == d,
            _ => false,
        }
    }

    pub fn with_packet_limit(mut self, bytes: usize) -> Self {
        self.packet_limit = bytes;
        self
    }

    pub fn with_safe_ratio(mut self, ratio: f64) -> Self {
        self.safe_ratio = ratio;
        self
    }

    pub fn with_large_image_threshold(mut self, chars: usize) -> Self {
        self.large_image_threshold = chars;
        self
    }

    pub fn with_save_routes<I, S>(mut self, routes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.save_routes = routes.into_iter().map(Into::into).collect();
        self
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_max_payload_bytes() {
        let config = OptimizerConfig::default();
        assert_eq!(config.max_payload_bytes(), 838_861);
    }

    #[test]
    fn test_max_payload_bytes_rounds_up() {
        let config = OptimizerConfig::default()
            .with_packet_limit(10)
            .with_safe_ratio(0.25);
        assert_eq!(config.max_payload_bytes(), 3);
    }

    #[test]
    fn test_is_default_filter_numeric() {
        let config = OptimizerConfig::default();
        assert!(config.is_default_filter("brightness", &json!(100)));
        assert!(config.is_default_filter("brightness", &json!(100.0)));
        assert!(config.is_default_filter("scale", &json!(1)));
        assert!(!config.is_default_filter("brightness", &json!(101)));
        assert!(!config.is_default_filter("brightness", &json!("100")));
    }

    #[test]
    fn test_is_default_filter_text() {
        let config = OptimizerConfig::default();
        assert!(config.is_default_filter("blendMode", &json!("normal")));
        assert!(!config.is_default_filter("blendMode", &json!("multiply")));
    }

    #[test]
    fn test_unknown_filter_is_never_default() {
        let config = OptimizerConfig::default();
        assert!(!config.is_default_filter("sepia", &json!(0)));
    }

    #[test]
    fn test_with_save_routes() {
        let config = OptimizerConfig::default().with_save_routes(["a/*/b"]);
        assert_eq!(config.save_routes, vec!["a/*/b".to_string()]);
    }
}
