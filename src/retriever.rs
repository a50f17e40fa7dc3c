//! In-memory vector index backed by SQLite and sqlite-vec.
//!
//! The index lives for one run. Row `i` of the insertion order is stored under
//! rowid `i + 1` and maps back to `payloads[i]`. Search is exact: every stored
//! vector is scored against the query.
use std::sync::Once;

use rusqlite::{Connection, params};
use sqlite_vec::sqlite3_vec_init;
use thiserror::Error;
use tracing::{debug, info};

use crate::embedder::Embeddings;
use crate::models::Chunk;

#[derive(Error, Debug)]
pub enum RetrieverError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("dimension mismatch: index has {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("{vectors} vectors but {payloads} payloads")]
    CountMismatch { vectors: usize, payloads: usize },
}

/// One search hit: score is the inner product of the unit vectors.
pub type Hit = (f32, Chunk);

static INIT_VEC: Once = Once::new();

/// Register the sqlite-vec extension for every new connection. Safe to call
/// multiple times.
fn init_sqlite_vec() {
    INIT_VEC.call_once(|| unsafe {
        rusqlite::ffi::sqlite3_auto_extension(Some(std::mem::transmute(
            sqlite3_vec_init as *const (),
        )));
    });
}

/// Helper to serialize a float32 vector into bytes for the vec0 virtual table.
pub fn serialize_vector(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

pub struct VectorIndex {
    conn: Connection,
    dim: usize,
    payloads: Vec<Chunk>,
}

impl VectorIndex {
    /// Open an empty in-memory index for vectors of width `dim`.
    pub fn new(dim: usize) -> Result<Self, RetrieverError> {
        init_sqlite_vec();
        let conn = Connection::open_in_memory()?;
        let vec_version: String = conn.query_row("SELECT vec_version()", [], |row| row.get(0))?;
        debug!("sqlite-vec version: {vec_version}");

        conn.execute_batch(&format!(
            "CREATE VIRTUAL TABLE vectors USING vec0(embedding FLOAT[{dim}]);"
        ))?;

        Ok(Self {
            conn,
            dim,
            payloads: Vec::new(),
        })
    }

    #[must_use]
    pub fn dim(&self) -> usize {
        self.dim
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.payloads.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.payloads.is_empty()
    }

    /// Append vectors and their payloads, preserving insertion order.
    pub fn add(&mut self, vectors: &Embeddings, payloads: Vec<Chunk>) -> Result<(), RetrieverError> {
        if vectors.dim() != self.dim {
            return Err(RetrieverError::DimensionMismatch {
                expected: self.dim,
                actual: vectors.dim(),
            });
        }
        if vectors.len() != payloads.len() {
            return Err(RetrieverError::CountMismatch {
                vectors: vectors.len(),
                payloads: payloads.len(),
            });
        }

        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare("INSERT INTO vectors(rowid, embedding) VALUES (?, ?)")?;
            for (i, row) in vectors.rows().enumerate() {
                let rowid = (self.payloads.len() + i + 1) as i64;
                stmt.execute(params![rowid, serialize_vector(row)])?;
            }
        }
        tx.commit()?;

        self.payloads.extend(payloads);
        info!("Indexed {} vectors ({} total)", vectors.len(), self.payloads.len());
        Ok(())
    }

    /// Return up to `k` hits per query, best first.
    pub fn search(&self, queries: &Embeddings, k: usize) -> Result<Vec<Vec<Hit>>, RetrieverError> {
        if queries.dim() != self.dim {
            return Err(RetrieverError::DimensionMismatch {
                expected: self.dim,
                actual: queries.dim(),
            });
        }

        let mut stmt = self.conn.prepare(
            r#"
            SELECT rowid, vec_distance_cosine(embedding, ?) AS distance
            FROM vectors
            ORDER BY distance ASC, rowid ASC
            LIMIT ?
            "#,
        )?;

        let mut results = Vec::with_capacity(queries.len());
        for query in queries.rows() {
            let rows = stmt.query_map(params![serialize_vector(query), k as i64], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, f64>(1)?))
            })?;

            let mut hits = Vec::new();
            for row in rows {
                let (rowid, distance) = row?;
                // Rowids without a payload are never surfaced
                let Some(chunk) = self.payload_for(rowid) else {
                    continue;
                };
                hits.push(((1.0 - distance) as f32, chunk.clone()));
            }
            results.push(hits);
        }

        Ok(results)
    }

    fn payload_for(&self, rowid: i64) -> Option<&Chunk> {
        let index = usize::try_from(rowid).ok()?.checked_sub(1)?;
        self.payloads.get(index)
    }
}
