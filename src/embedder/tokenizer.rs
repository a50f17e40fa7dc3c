/// Sentence-transformer tokenizer wrapper around HuggingFace `tokenizers`.
///
/// Produces padded, rectangular batches ready to feed the ONNX session.
use std::path::Path;

use anyhow::Result;
use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};

/// Longest sequence the MiniLM / e5 family accepts.
const MAX_SEQ_LEN: usize = 512;

/// Wrapper around the HuggingFace tokenizer.
pub struct ModelTokenizer {
    inner: Tokenizer,
    max_length: usize,
}

/// A padded batch, flattened row-major with shape `[batch, seq_len]`.
#[derive(Debug, Clone)]
pub struct TokenBatch {
    pub batch: usize,
    pub seq_len: usize,
    pub input_ids: Vec<i64>,
    pub attention_mask: Vec<i64>,
    pub token_type_ids: Vec<i64>,
}

impl ModelTokenizer {
    /// Load a tokenizer from a `tokenizer.json` file in the model directory.
    pub fn from_model_dir(model_dir: &Path) -> Result<Self> {
        let tokenizer_path = model_dir.join("tokenizer.json");

        anyhow::ensure!(
            tokenizer_path.exists(),
            "tokenizer.json not found in {}",
            model_dir.display()
        );

        let mut inner = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow::anyhow!("failed to load tokenizer: {e}"))?;

        inner
            .with_truncation(Some(TruncationParams {
                max_length: MAX_SEQ_LEN,
                ..Default::default()
            }))
            .map_err(|e| anyhow::anyhow!("failed to configure truncation: {e}"))?;

        // Pad every batch to its longest member so tensors are rectangular
        inner.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::BatchLongest,
            ..Default::default()
        }));

        Ok(Self {
            inner,
            max_length: MAX_SEQ_LEN,
        })
    }

    /// Tokenize a batch of texts into one padded tensor batch.
    pub fn tokenize_batch(&self, texts: &[&str]) -> Result<TokenBatch> {
        let encodings = self
            .inner
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| anyhow::anyhow!("failed to encode batch: {e}"))?;

        let seq_len = encodings.first().map_or(0, |e| e.get_ids().len());
        let mut out = TokenBatch {
            batch: encodings.len(),
            seq_len,
            input_ids: Vec::with_capacity(encodings.len() * seq_len),
            attention_mask: Vec::with_capacity(encodings.len() * seq_len),
            token_type_ids: Vec::with_capacity(encodings.len() * seq_len),
        };

        for enc in &encodings {
            anyhow::ensure!(
                enc.get_ids().len() == seq_len,
                "ragged batch: expected {seq_len} tokens, got {}",
                enc.get_ids().len()
            );
            out.input_ids.extend(enc.get_ids().iter().map(|&id| i64::from(id)));
            out.attention_mask
                .extend(enc.get_attention_mask().iter().map(|&m| i64::from(m)));
            out.token_type_ids
                .extend(enc.get_type_ids().iter().map(|&t| i64::from(t)));
        }

        Ok(out)
    }

    /// Get the vocabulary size.
    #[must_use]
    pub fn vocab_size(&self) -> usize {
        self.inner.get_vocab_size(false)
    }

    /// Get the configured maximum sequence length.
    #[must_use]
    pub fn max_length(&self) -> usize {
        self.max_length
    }
}
