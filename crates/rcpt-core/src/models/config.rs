//! Configuration structures for the receipt pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::categorize::CategoryRule;
use crate::receipt::rules::patterns::DEFAULT_MERCHANT_PATTERNS;

/// Main configuration for the rcpt pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RcptConfig {
    /// OCR and image normalization configuration.
    pub ocr: OcrConfig,

    /// Model configuration.
    pub models: ModelConfig,

    /// Receipt parser configuration.
    pub parser: ParserConfig,

    /// Ordered category table, first matching rule wins.
    pub categories: Vec<CategoryRule>,

    /// Limits enforced by callers of the core.
    pub limits: LimitsConfig,
}

impl Default for RcptConfig {
    fn default() -> Self {
        Self {
            ocr: OcrConfig::default(),
            models: ModelConfig::default(),
            parser: ParserConfig::default(),
            categories: crate::categorize::default_rules(),
            limits: LimitsConfig::default(),
        }
    }
}

/// OCR engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Maximum image dimension (longer side) for processing.
    pub max_image_size: u32,

    /// Percentage of darkest and brightest pixels ignored when stretching contrast.
    pub contrast_clip_percent: f32,

    /// Unsharp mask blur radius.
    pub sharpen_sigma: f32,

    /// Unsharp mask threshold.
    pub sharpen_threshold: i32,

    /// Keep `[UNK]` tokens in recognized text instead of replacing them with spaces.
    pub keep_unk: bool,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            max_image_size: 2048,
            contrast_clip_percent: 1.0,
            sharpen_sigma: 1.0,
            sharpen_threshold: 2,
            keep_unk: false,
        }
    }
}

/// Model file paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Directory containing model files.
    pub model_dir: PathBuf,

    /// Text detection model file name.
    pub detection_model: String,

    /// Text recognition model file name.
    pub recognition_model: String,

    /// Character dictionary file name.
    pub dictionary: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models"),
            detection_model: "det.onnx".to_string(),
            recognition_model: "latin_rec.onnx".to_string(),
            dictionary: "latin_dict.txt".to_string(),
        }
    }
}

impl ModelConfig {
    pub fn detection_path(&self) -> PathBuf {
        self.model_dir.join(&self.detection_model)
    }

    pub fn recognition_path(&self) -> PathBuf {
        self.model_dir.join(&self.recognition_model)
    }

    pub fn dictionary_path(&self) -> PathBuf {
        self.model_dir.join(&self.dictionary)
    }

    /// Check that every model file is present.
    pub fn is_complete(&self) -> bool {
        self.detection_path().exists()
            && self.recognition_path().exists()
            && self.dictionary_path().exists()
    }
}

/// Receipt parser configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Merchant and legal-entity patterns (regex fragments, matched case-insensitively).
    pub merchant_patterns: Vec<String>,

    /// Store names longer than this are truncated (in characters).
    pub max_store_name_len: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            merchant_patterns: DEFAULT_MERCHANT_PATTERNS
                .iter()
                .map(|p| p.to_string())
                .collect(),
            max_store_name_len: 60,
        }
    }
}

/// Policies owned by the callers of the core (CLI, persistence).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum number of items kept per receipt.
    pub max_items: usize,

    /// Maximum accepted document size.
    pub max_file_size_bytes: u64,

    /// Deadline for a single extraction call.
    pub extraction_timeout_secs: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_items: 200,
            max_file_size_bytes: 10 * 1024 * 1024,
            extraction_timeout_secs: 120,
        }
    }
}

impl RcptConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::receipt::Category;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: RcptConfig =
            serde_json::from_str(r#"{ "limits": { "max_items": 50 } }"#).unwrap();

        assert_eq!(config.limits.max_items, 50);
        assert_eq!(config.limits.extraction_timeout_secs, 120);
        assert_eq!(config.parser.max_store_name_len, 60);
        assert_eq!(config.categories.len(), 4);
        assert_eq!(config.categories[0].category, Category::Coffee);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = RcptConfig::default();
        config.parser.merchant_patterns = vec!["mega image".to_string()];
        config.ocr.max_image_size = 1024;
        config.save(&path).unwrap();

        let loaded = RcptConfig::from_file(&path).unwrap();
        assert_eq!(loaded.parser.merchant_patterns, vec!["mega image".to_string()]);
        assert_eq!(loaded.ocr.max_image_size, 1024);
        assert_eq!(loaded.categories.len(), config.categories.len());
    }

    #[test]
    fn test_invalid_json_is_invalid_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = RcptConfig::from_file(&path).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }
}
