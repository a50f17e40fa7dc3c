/// Configuration module for the requirement pipeline.
///
/// Handles loading, validating, and providing default configuration values.
/// Required keys have no default: a config file missing them fails to load.
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::info;

// ── Default value functions ──────────────────────────────────────────

fn default_batch_size() -> usize {
    64
}

fn default_device() -> String {
    "cpu".to_string()
}

fn default_dimensions() -> usize {
    384
}

fn default_k() -> usize {
    6
}

fn default_true() -> bool {
    true
}

fn default_extensions() -> Vec<String> {
    [".pdf", ".txt", ".png", ".jpg", ".jpeg", ".docx"]
        .iter()
        .map(|e| (*e).to_string())
        .collect()
}

// ── Config structs ───────────────────────────────────────────────────

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    pub chunking: ChunkingConfig,

    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub rag: RagConfig,

    pub output: OutputConfig,

    #[serde(default)]
    pub sectioning: SectioningConfig,

    #[serde(default)]
    pub loader: LoaderConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ChunkingConfig {
    /// Window length in characters. Zero or less keeps each document whole.
    pub size: i64,
    /// Negative values mean no overlap.
    pub overlap: i64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EmbeddingConfig {
    /// `hash` for the offline embedder, otherwise a HuggingFace repo id.
    pub model: String,

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default = "default_device")]
    pub device: String,

    /// Vector width of the `hash` embedder.
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RagConfig {
    #[serde(default = "default_k")]
    pub k: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm_provider: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm_model: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OutputConfig {
    pub generate_docx: bool,
    pub generate_excel: bool,

    #[serde(default = "default_true")]
    pub generate_user_stories: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SectioningConfig {
    #[serde(default = "default_true", deserialize_with = "deserialize_flag")]
    pub allow_api: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoaderConfig {
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

// ── Default impls ────────────────────────────────────────────────────

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            k: default_k(),
            llm_provider: None,
            llm_model: None,
        }
    }
}

impl Default for SectioningConfig {
    fn default() -> Self {
        Self {
            allow_api: default_true(),
        }
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
        }
    }
}

impl ChunkingConfig {
    /// Window length for the chunker, `0` for whole-text chunks.
    #[must_use]
    pub fn window_size(&self) -> usize {
        usize::try_from(self.size).unwrap_or(0)
    }

    #[must_use]
    pub fn window_overlap(&self) -> usize {
        usize::try_from(self.overlap).unwrap_or(0)
    }
}

impl EmbeddingConfig {
    /// Directory holding the ONNX model files for this model id.
    #[must_use]
    pub fn resolved_model_dir(&self) -> PathBuf {
        if let Some(dir) = &self.model_dir {
            return dir.clone();
        }
        let leaf = self.model.replace(['/', '\\'], "--");
        dirs::cache_dir()
            .map(|d| d.join("reqrag").join("models"))
            .unwrap_or_else(|| PathBuf::from("models"))
            .join(leaf)
    }
}

// ── Flag parsing ─────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(untagged)]
enum FlagValue {
    Bool(bool),
    Int(i64),
    Text(String),
}

/// Accept `true`, `1`, `"1"`, `"0"` and friends. Anything unparsable is `true`.
fn deserialize_flag<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<FlagValue>::deserialize(deserializer)?;
    Ok(match value {
        Some(FlagValue::Bool(b)) => b,
        Some(FlagValue::Int(i)) => i != 0,
        Some(FlagValue::Text(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "0" | "false" | "no" | "off" => false,
            other => other.parse::<i64>().map(|i| i != 0).unwrap_or(true),
        },
        None => true,
    })
}

// ── Config implementation ────────────────────────────────────────────

impl Config {
    /// Load configuration from a YAML, JSON or TOML file, picked by extension.
    ///
    /// Missing required keys and invalid values are errors.
    pub fn load(config_path: impl AsRef<Path>) -> Result<Self> {
        let path = config_path.as_ref();
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();

        let cfg: Config = match ext.as_str() {
            "json" => serde_json::from_str(&data)
                .with_context(|| format!("invalid config: {}", path.display()))?,
            "toml" => toml::from_str(&data)
                .with_context(|| format!("invalid config: {}", path.display()))?,
            _ => Self::from_yaml(&data)
                .with_context(|| format!("invalid config: {}", path.display()))?,
        };

        cfg.validate()?;
        info!("Loaded configuration from {}", path.display());
        Ok(cfg)
    }

    /// Parse a YAML document.
    pub fn from_yaml(data: &str) -> Result<Self> {
        serde_yaml::from_str(data).context("failed to parse YAML config")
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.embedding.batch_size > 0,
            "embedding.batch_size must be positive"
        );
        anyhow::ensure!(
            !self.embedding.model.trim().is_empty(),
            "embedding.model must not be empty"
        );
        anyhow::ensure!(
            self.embedding.dimensions > 0,
            "embedding.dimensions must be positive"
        );
        anyhow::ensure!(self.rag.k > 0, "rag.k must be positive");
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
chunking:
  size: 800
  overlap: 100
embedding:
  model: hash
output:
  generate_docx: false
  generate_excel: true
"#;

    #[test]
    fn test_minimal_yaml_defaults() {
        let config = Config::from_yaml(MINIMAL).unwrap();
        assert_eq!(config.chunking.size, 800);
        assert_eq!(config.chunking.overlap, 100);
        assert_eq!(config.embedding.batch_size, 64);
        assert_eq!(config.embedding.device, "cpu");
        assert_eq!(config.rag.k, 6);
        assert!(config.rag.llm_provider.is_none());
        assert!(config.output.generate_user_stories);
        assert!(config.sectioning.allow_api);
        assert_eq!(config.loader.extensions.len(), 6);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_negative_chunking_values() {
        let yaml = MINIMAL
            .replace("size: 800", "size: -1")
            .replace("overlap: 100", "overlap: -5");
        let config = Config::from_yaml(&yaml).unwrap();
        assert_eq!(config.chunking.size, -1);
        assert_eq!(config.chunking.window_size(), 0);
        assert_eq!(config.chunking.window_overlap(), 0);

        let windows = crate::chunker::split_into_windows(
            "abcdef",
            config.chunking.window_size(),
            config.chunking.window_overlap(),
        );
        assert_eq!(windows, vec!["abcdef"]);
    }

    #[test]
    fn test_missing_required_key_fails() {
        let yaml = "chunking:\n  size: 10\nembedding:\n  model: hash\noutput:\n  generate_docx: true\n  generate_excel: true\n";
        let err = Config::from_yaml(yaml).unwrap_err();
        assert!(format!("{err:#}").contains("overlap"));
    }

    #[test]
    fn test_allow_api_flag_forms() {
        for (raw, expected) in [
            ("0", false),
            ("1", true),
            ("\"0\"", false),
            ("\"1\"", true),
            ("false", false),
            ("true", true),
            ("\"maybe\"", true),
        ] {
            let yaml = format!("{MINIMAL}sectioning:\n  allow_api: {raw}\n");
            let config = Config::from_yaml(&yaml).unwrap();
            assert_eq!(config.sectioning.allow_api, expected, "allow_api: {raw}");
        }
    }

    #[test]
    fn test_validate_bad_k() {
        let mut config = Config::from_yaml(MINIMAL).unwrap();
        config.rag.k = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_bad_batch_size() {
        let mut config = Config::from_yaml(MINIMAL).unwrap();
        config.embedding.batch_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_json_and_toml() {
        let temp = tempfile::tempdir().unwrap();

        let json_path = temp.path().join("config.json");
        std::fs::write(
            &json_path,
            r#"{"chunking": {"size": 0, "overlap": 0}, "embedding": {"model": "hash"},
                "output": {"generate_docx": true, "generate_excel": false},
                "rag": {"k": 3, "llm_provider": "openai"}}"#,
        )
        .unwrap();
        let config = Config::load(&json_path).unwrap();
        assert_eq!(config.rag.k, 3);
        assert_eq!(config.rag.llm_provider.as_deref(), Some("openai"));

        let toml_path = temp.path().join("config.toml");
        std::fs::write(
            &toml_path,
            "[chunking]\nsize = 200\noverlap = 20\n[embedding]\nmodel = \"hash\"\ndimensions = 16\n[output]\ngenerate_docx = false\ngenerate_excel = false\n",
        )
        .unwrap();
        let config = Config::load(&toml_path).unwrap();
        assert_eq!(config.embedding.dimensions, 16);
        assert_eq!(config.chunking.size, 200);
    }

    #[test]
    fn test_load_missing_file_fails() {
        assert!(Config::load("/nonexistent/config.yaml").is_err());
    }

    #[test]
    fn test_resolved_model_dir() {
        let mut config = Config::from_yaml(MINIMAL).unwrap();
        config.embedding.model = "sentence-transformers/all-MiniLM-L6-v2".into();
        let dir = config.embedding.resolved_model_dir();
        assert!(dir.ends_with("sentence-transformers--all-MiniLM-L6-v2"));

        config.embedding.model_dir = Some(PathBuf::from("/tmp/models/x"));
        assert_eq!(config.embedding.resolved_model_dir(), PathBuf::from("/tmp/models/x"));
    }
}
