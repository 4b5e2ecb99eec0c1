//! Model catalog
//!
//! Per-model capabilities the surface needs: whether images can be attached,
//! whether prompt-cache figures are worth showing, and prices for display.

use serde::{Deserialize, Serialize};

/// Model used when none is configured or the configured one is unknown
pub const DEFAULT_MODEL_ID: &str = "claude-3-5-sonnet-20240620";

/// Capabilities and prices of one model. Prices are USD per million tokens.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Model identifier
    pub id: String,
    /// Accepts image input
    #[serde(default)]
    pub supports_images: bool,
    /// Supports prompt caching
    #[serde(default)]
    pub supports_prompt_cache: bool,
    /// Maximum output tokens
    pub max_tokens: u32,
    /// Input price
    pub input_price: f64,
    /// Output price
    pub output_price: f64,
    /// Cache write price
    #[serde(default)]
    pub cache_writes_price: Option<f64>,
    /// Cache read price
    #[serde(default)]
    pub cache_reads_price: Option<f64>,
}

impl ModelInfo {
    /// Human-readable summary lines for a settings panel
    #[must_use]
    pub fn describe(&self) -> Vec<String> {
        let supports = |yes: bool, what: &str| {
            if yes {
                format!("Supports {what}")
            } else {
                format!("Does not support {what}")
            }
        };
        let mut lines = vec![
            supports(self.supports_images, "images"),
            supports(self.supports_prompt_cache, "prompt caching"),
            format!("Max output: {} tokens", self.max_tokens),
            format!("Input price: {}/million tokens", format_price(self.input_price)),
        ];
        if let (true, Some(writes), Some(reads)) = (
            self.supports_prompt_cache,
            self.cache_writes_price,
            self.cache_reads_price,
        ) {
            lines.push(format!("Cache writes price: {}/million tokens", format_price(writes)));
            lines.push(format!("Cache reads price: {}/million tokens", format_price(reads)));
        }
        lines.push(format!(
            "Output price: {}/million tokens",
            format_price(self.output_price)
        ));
        lines
    }
}

/// Dollar amount with two decimals
#[must_use]
pub fn format_price(price: f64) -> String {
    format!("${price:.2}")
}

fn builtin(
    id: &str,
    max_tokens: u32,
    prices: (f64, f64),
    cache: (f64, f64),
) -> ModelInfo {
    ModelInfo {
        id: id.to_string(),
        supports_images: true,
        supports_prompt_cache: true,
        max_tokens,
        input_price: prices.0,
        output_price: prices.1,
        cache_writes_price: Some(cache.0),
        cache_reads_price: Some(cache.1),
    }
}

/// Known models, built-ins first, then user additions
#[derive(Clone, Debug, PartialEq)]
pub struct ModelCatalog {
    models: Vec<ModelInfo>,
}

impl Default for ModelCatalog {
    fn default() -> Self {
        Self {
            models: vec![
                builtin(DEFAULT_MODEL_ID, 8192, (3.0, 15.0), (3.75, 0.3)),
                builtin("claude-3-opus-20240229", 4096, (15.0, 75.0), (18.75, 1.5)),
                builtin("claude-3-haiku-20240307", 4096, (0.25, 1.25), (0.3, 0.03)),
            ],
        }
    }
}

impl ModelCatalog {
    /// Built-in catalog
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace entries; a user entry with a known id wins
    pub fn extend(&mut self, models: impl IntoIterator<Item = ModelInfo>) {
        for model in models {
            match self.models.iter_mut().find(|m| m.id == model.id) {
                Some(existing) => *existing = model,
                None => self.models.push(model),
            }
        }
    }

    /// Exact lookup
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&ModelInfo> {
        self.models.iter().find(|m| m.id == id)
    }

    /// Resolve an optional id, falling back to the default model
    #[must_use]
    pub fn resolve(&self, id: Option<&str>) -> ModelInfo {
        if let Some(id) = id {
            if let Some(info) = self.get(id) {
                return info.clone();
            }
            tracing::warn!(model = id, fallback = DEFAULT_MODEL_ID, "unknown model");
        }
        self.get(DEFAULT_MODEL_ID)
            .cloned()
            .unwrap_or_else(|| builtin(DEFAULT_MODEL_ID, 8192, (3.0, 15.0), (3.75, 0.3)))
    }

    /// All models in catalog order
    #[must_use]
    pub fn models(&self) -> &[ModelInfo] {
        &self.models
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_model() {
        let info = ModelCatalog::new().resolve(None);
        assert_eq!(info.id, DEFAULT_MODEL_ID);
        assert!(info.supports_images);
        assert!(info.supports_prompt_cache);
        assert_eq!(info.max_tokens, 8192);
        assert_eq!(info.input_price, 3.0);
        assert_eq!(info.output_price, 15.0);
        assert_eq!(info.cache_writes_price, Some(3.75));
        assert_eq!(info.cache_reads_price, Some(0.3));
    }

    #[test]
    fn test_unknown_falls_back() {
        let info = ModelCatalog::new().resolve(Some("nope"));
        assert_eq!(info.id, DEFAULT_MODEL_ID);
    }

    #[test]
    fn test_extend_adds_and_replaces() {
        let mut catalog = ModelCatalog::new();
        let text_only = ModelInfo {
            id: "local-text".into(),
            supports_images: false,
            supports_prompt_cache: false,
            max_tokens: 2048,
            input_price: 0.0,
            output_price: 0.0,
            cache_writes_price: None,
            cache_reads_price: None,
        };
        catalog.extend([
            text_only.clone(),
            ModelInfo {
                id: DEFAULT_MODEL_ID.into(),
                supports_images: false,
                ..text_only.clone()
            },
        ]);
        assert_eq!(catalog.models().len(), 4);
        assert_eq!(catalog.resolve(Some("local-text")), text_only);
        assert!(!catalog.resolve(None).supports_images);
    }

    #[test]
    fn test_describe() {
        let lines = ModelCatalog::new().resolve(None).describe();
        assert_eq!(
            lines,
            vec![
                "Supports images",
                "Supports prompt caching",
                "Max output: 8192 tokens",
                "Input price: $3.00/million tokens",
                "Cache writes price: $3.75/million tokens",
                "Cache reads price: $0.30/million tokens",
                "Output price: $15.00/million tokens",
            ]
        );
    }
}
