//! Process-wide embedder cache keyed by `(model, device)`.
//!
//! Loading a model is the dominant one-time cost of a run. The cache holds the
//! lock across lookup and load, so concurrent runs with the same key load once.
use std::collections::HashMap;
use std::sync::{Arc, LazyLock, Mutex};

use tracing::info;

use super::hash::HashEmbedder;
use super::onnx::OnnxEmbedder;
use super::{Embedder, EmbedderError, download};
use crate::config::EmbeddingConfig;

/// Model id selecting the offline [`HashEmbedder`].
pub const HASH_MODEL: &str = "hash";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelKey {
    pub model: String,
    pub device: String,
}

impl ModelKey {
    #[must_use]
    pub fn from_config(cfg: &EmbeddingConfig) -> Self {
        let model = if cfg.model == HASH_MODEL {
            // The hash embedder's behavior depends on its width
            format!("{HASH_MODEL}:{}", cfg.dimensions)
        } else {
            cfg.model.clone()
        };
        Self {
            model,
            device: cfg.device.clone(),
        }
    }
}

#[derive(Default)]
pub struct ModelCache {
    models: Mutex<HashMap<ModelKey, Arc<dyn Embedder>>>,
}

static GLOBAL: LazyLock<Arc<ModelCache>> = LazyLock::new(|| Arc::new(ModelCache::new()));

impl ModelCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The shared process-wide cache.
    #[must_use]
    pub fn global() -> Arc<ModelCache> {
        Arc::clone(&GLOBAL)
    }

    /// Return the cached embedder for `cfg`, loading it on first use.
    pub fn get_or_load(&self, cfg: &EmbeddingConfig) -> Result<Arc<dyn Embedder>, EmbedderError> {
        let key = ModelKey::from_config(cfg);
        let mut models = self
            .models
            .lock()
            .map_err(|e| EmbedderError::ModelLoadFailed(format!("model cache poisoned: {e}")))?;

        if let Some(embedder) = models.get(&key) {
            return Ok(Arc::clone(embedder));
        }

        let embedder = load_embedder(cfg)?;
        info!("Cached embedder {} on {}", key.model, key.device);
        models.insert(key, Arc::clone(&embedder));
        Ok(embedder)
    }

    /// Number of loaded models.
    #[must_use]
    pub fn len(&self) -> usize {
        self.models.lock().map(|m| m.len()).unwrap_or(0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn load_embedder(cfg: &EmbeddingConfig) -> Result<Arc<dyn Embedder>, EmbedderError> {
    if cfg.model == HASH_MODEL {
        return Ok(Arc::new(HashEmbedder::new(cfg.dimensions)));
    }

    let model_dir = cfg.resolved_model_dir();
    download::ensure_model_files(&cfg.model, &model_dir)
        .map_err(|e| EmbedderError::ModelLoadFailed(format!("{e:#}")))?;
    Ok(Arc::new(OnnxEmbedder::new(&model_dir, &cfg.device)?))
}
