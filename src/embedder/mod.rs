/// Embedder trait and shared types for text embedding.
///
/// Backends produce one vector per text; [`embed_all`] batches calls and
/// guarantees the result is a unit-normalized `(n, d)` f32 matrix.
pub mod cache;
pub mod download;
pub mod hash;
pub mod onnx;
pub mod tokenizer;

use thiserror::Error;
use tracing::debug;

/// Errors that can occur during embedding operations.
#[derive(Error, Debug)]
pub enum EmbedderError {
    #[error("inference failed: {0}")]
    InferenceFailed(String),

    #[error("model load failed: {0}")]
    ModelLoadFailed(String),

    #[error("tokenizer error: {0}")]
    TokenizerError(String),

    #[error("malformed embedding output: {0}")]
    Malformed(String),
}

/// Trait for text embedding implementations.
///
/// All implementations must be `Send + Sync` to allow concurrent use
/// behind `Arc`.
pub trait Embedder: Send + Sync {
    /// Embed a single text string into a vector.
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedderError>;

    /// Embed multiple text strings into vectors.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedderError>;

    /// Return the dimensionality of the embedding vectors.
    fn dimensions(&self) -> usize;
}

/// Row-major `(rows, dim)` matrix of unit vectors.
#[derive(Debug, Clone, PartialEq)]
pub struct Embeddings {
    dim: usize,
    data: Vec<f32>,
}

impl Embeddings {
    /// A zero-row matrix of width `dim`.
    #[must_use]
    pub fn empty(dim: usize) -> Self {
        Self {
            dim,
            data: Vec::new(),
        }
    }

    /// Build from rows, rejecting any row whose width is not `dim`.
    pub fn from_rows(dim: usize, rows: Vec<Vec<f32>>) -> Result<Self, EmbedderError> {
        if dim == 0 {
            return Err(EmbedderError::Malformed("zero-width vectors".into()));
        }
        let mut data = Vec::with_capacity(rows.len() * dim);
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != dim {
                return Err(EmbedderError::Malformed(format!(
                    "row {i} has {} values, expected {dim}",
                    row.len()
                )));
            }
            data.extend(row);
        }
        Ok(Self { dim, data })
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        if self.dim == 0 {
            0
        } else {
            self.data.len() / self.dim
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[must_use]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// `(rows, dim)`.
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        (self.len(), self.dim)
    }

    #[must_use]
    pub fn row(&self, i: usize) -> Option<&[f32]> {
        let start = i.checked_mul(self.dim)?;
        self.data.get(start..start + self.dim)
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f32]> {
        self.data.chunks_exact(self.dim.max(1))
    }

    /// Matrix holding only the first row, if any.
    #[must_use]
    pub fn first_row(&self) -> Self {
        match self.row(0) {
            Some(row) => Self {
                dim: self.dim,
                data: row.to_vec(),
            },
            None => Self::empty(self.dim),
        }
    }
}

/// Embed `texts` in batches of `batch_size`, preserving input order.
///
/// Every row is L2-normalized here regardless of what the backend returns.
/// Rows that cannot be normalized (all zeros, NaN or infinite) are rejected.
pub fn embed_all<E: Embedder + ?Sized>(
    embedder: &E,
    texts: &[String],
    batch_size: usize,
) -> Result<Embeddings, EmbedderError> {
    let dim = embedder.dimensions();
    if texts.is_empty() {
        return Ok(Embeddings::empty(dim));
    }

    let mut rows = Vec::with_capacity(texts.len());
    for batch in texts.chunks(batch_size.max(1)) {
        let refs: Vec<&str> = batch.iter().map(String::as_str).collect();
        let vectors = embedder.embed_batch(&refs)?;
        if vectors.len() != refs.len() {
            return Err(EmbedderError::Malformed(format!(
                "backend returned {} vectors for {} texts",
                vectors.len(),
                refs.len()
            )));
        }
        for vector in &vectors {
            let norm_sq: f32 = vector.iter().map(|v| v * v).sum();
            if !norm_sq.is_finite() || norm_sq == 0.0 {
                return Err(EmbedderError::Malformed(format!(
                    "row {} has zero norm or non-finite values",
                    rows.len()
                )));
            }
            rows.push(l2_normalize(vector));
        }
        debug!("Embedded batch of {} texts", refs.len());
    }

    Embeddings::from_rows(dim, rows)
}

/// L2-normalize a vector, returning the normalized copy.
pub(crate) fn l2_normalize(vec: &[f32]) -> Vec<f32> {
    let norm_sq: f32 = vec.iter().map(|v| v * v).sum();
    if norm_sq == 0.0 {
        return vec.to_vec();
    }

    let inv_norm = 1.0 / norm_sq.sqrt();
    vec.iter().map(|v| v * inv_norm).collect()
}
