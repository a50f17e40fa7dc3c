/// ONNX Runtime embedder using the `ort` crate.
///
/// Loads a sentence-transformer ONNX export, runs batched inference, applies
/// mean pooling with the attention mask, and L2-normalizes each row.
use std::path::Path;
use std::sync::Mutex;

use ort::session::Session;
use ort::value::Tensor;
use tracing::{info, warn};

use super::tokenizer::ModelTokenizer;
use super::{Embedder, EmbedderError, l2_normalize};

/// ONNX-backed embedder implementing the `Embedder` trait.
pub struct OnnxEmbedder {
    session: Mutex<Session>,
    tokenizer: ModelTokenizer,
    dimensions: usize,
}

impl OnnxEmbedder {
    /// Load `model.onnx` and `tokenizer.json` from `model_dir`.
    ///
    /// The output width is measured with one inference so any sentence-transformer
    /// export works without a hard-coded dimension.
    pub fn new(model_dir: &Path, device: &str) -> Result<Self, EmbedderError> {
        let model_path = model_dir.join("model.onnx");

        if !model_path.exists() {
            return Err(EmbedderError::ModelLoadFailed(format!(
                "model.onnx not found in {}",
                model_dir.display()
            )));
        }

        if !matches!(device, "cpu" | "auto") {
            warn!("Device {device:?} is not supported by this build, running on CPU");
        }

        info!("Initializing ONNX Runtime...");

        let session = Session::builder()
            .map_err(|e| EmbedderError::ModelLoadFailed(format!("session builder error: {e}")))?
            .with_intra_threads(4)
            .map_err(|e| EmbedderError::ModelLoadFailed(format!("thread config error: {e}")))?
            .with_inter_threads(4)
            .map_err(|e| EmbedderError::ModelLoadFailed(format!("thread config error: {e}")))?
            .commit_from_file(&model_path)
            .map_err(|e| EmbedderError::ModelLoadFailed(format!("model load error: {e}")))?;

        let tokenizer = ModelTokenizer::from_model_dir(model_dir)
            .map_err(|e| EmbedderError::TokenizerError(e.to_string()))?;

        info!("Tokenizer loaded (vocab size: {})", tokenizer.vocab_size());

        let mut embedder = Self {
            session: Mutex::new(session),
            tokenizer,
            dimensions: 0,
        };
        let sample = embedder.infer(&["sample"])?;
        embedder.dimensions = sample.first().map_or(0, Vec::len);
        if embedder.dimensions == 0 {
            return Err(EmbedderError::ModelLoadFailed(
                "model produced an empty embedding".into(),
            ));
        }

        info!(
            "ONNX model loaded from {} ({} dimensions)",
            model_dir.display(),
            embedder.dimensions
        );
        Ok(embedder)
    }

    /// Run one padded batch through the model and pool each row.
    fn infer(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedderError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let tokens = self
            .tokenizer
            .tokenize_batch(texts)
            .map_err(|e| EmbedderError::TokenizerError(e.to_string()))?;
        let (batch, seq_len) = (tokens.batch, tokens.seq_len);

        // (shape, data) tuple form avoids ndarray version coupling with ort
        let input_ids_val = Tensor::from_array(([batch, seq_len], tokens.input_ids))
            .map_err(|e| EmbedderError::InferenceFailed(format!("input_ids error: {e}")))?;
        let attention_mask_val =
            Tensor::from_array(([batch, seq_len], tokens.attention_mask.clone())).map_err(
                |e| EmbedderError::InferenceFailed(format!("attention_mask error: {e}")),
            )?;
        let token_type_ids_val = Tensor::from_array(([batch, seq_len], tokens.token_type_ids))
            .map_err(|e| EmbedderError::InferenceFailed(format!("token_type_ids error: {e}")))?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| EmbedderError::InferenceFailed(format!("lock poisoned: {e}")))?;
        let outputs = session
            .run(ort::inputs![
                "input_ids" => input_ids_val,
                "attention_mask" => attention_mask_val,
                "token_type_ids" => token_type_ids_val,
            ])
            .map_err(|e| EmbedderError::InferenceFailed(format!("inference failed: {e}")))?;

        // Output shape: [batch, seq_len, hidden_size]
        let (_shape, hidden_data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| EmbedderError::InferenceFailed(format!("output extraction: {e}")))?;

        let per_row = batch * seq_len;
        if per_row == 0 || hidden_data.len() % per_row != 0 {
            return Err(EmbedderError::Malformed(format!(
                "{} output values do not fit batch {batch} x seq {seq_len}",
                hidden_data.len()
            )));
        }
        let hidden_size = hidden_data.len() / per_row;

        Ok((0..batch)
            .map(|b| {
                let hidden = &hidden_data[b * seq_len * hidden_size..(b + 1) * seq_len * hidden_size];
                let mask = &tokens.attention_mask[b * seq_len..(b + 1) * seq_len];
                l2_normalize(&mean_pooling(hidden, mask, seq_len, hidden_size))
            })
            .collect())
    }
}

impl Embedder for OnnxEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedderError> {
        self.infer(&[text])?
            .pop()
            .ok_or_else(|| EmbedderError::Malformed("no output row".into()))
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedderError> {
        self.infer(texts)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// Mean pooling over one row's hidden states weighted by attention mask.
///
/// `hidden_data` is a flat array with shape `[seq_len, hidden_size]`.
fn mean_pooling(
    hidden_data: &[f32],
    attention_mask: &[i64],
    seq_len: usize,
    hidden_size: usize,
) -> Vec<f32> {
    let mut result = vec![0.0f32; hidden_size];
    let mut mask_sum: f32 = 0.0;

    for t in 0..seq_len {
        let mask = attention_mask[t] as f32;
        if mask == 0.0 {
            continue;
        }
        mask_sum += mask;

        let token = &hidden_data[t * hidden_size..(t + 1) * hidden_size];
        for (acc, v) in result.iter_mut().zip(token) {
            *acc += v * mask;
        }
    }

    if mask_sum > 0.0 {
        for v in &mut result {
            *v /= mask_sum;
        }
    }

    result
}
