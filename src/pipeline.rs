//! Batch orchestration of the extraction stages.
//!
//! A run is strictly sequential: scan, load, chunk, embed, index, retrieve,
//! synthesize, classify, validate, prioritize, section, then write artifacts.
//! Validation runs before prioritization, so flag indices refer to the
//! classified order rather than the prioritized order in the report.
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::chunker::chunk_document;
use crate::classifier::classify;
use crate::config::Config;
use crate::embedder::cache::ModelCache;
use crate::embedder::{Embedder, Embeddings, embed_all};
use crate::loader::Loader;
use crate::models::{Chunk, RequirementItem, ValidationReport};
use crate::output;
use crate::prioritizer::prioritize;
use crate::retriever::VectorIndex;
use crate::sectioner::{SectionSummary, Sectioner, summarize};
use crate::synthesizer::Synthesizer;
use crate::validator::validate;

pub const NO_TEXT_MESSAGE: &str =
    "No text extracted from inputs. Ensure docs exist and OCR is configured.";
pub const EMBED_FAILED_MESSAGE: &str = "Failed to compute embeddings. Check model and inputs.";

/// Wall-clock milliseconds per stage group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timings {
    pub list_files_ms: u64,
    pub load_and_chunk_ms: u64,
    pub embed_ms: u64,
    pub index_and_search_ms: u64,
    pub rag_nlp_validate_prioritize_ms: u64,
    pub total_ms: u64,
}

/// Result of one run. Early exits carry `message` and no timings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub files: Vec<String>,
    pub num_chunks: usize,
    pub num_candidates: usize,
    pub validation: ValidationReport,
    pub output_dir: String,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timings: Option<Timings>,
    #[serde(default)]
    pub prioritized: Vec<RequirementItem>,
    #[serde(default)]
    pub user_stories: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sections_summary: Option<SectionSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl RunReport {
    fn early_exit(
        files: Vec<String>,
        num_chunks: usize,
        out_dir: &Path,
        started_at: DateTime<Utc>,
        message: &str,
    ) -> Self {
        Self {
            files,
            num_chunks,
            num_candidates: 0,
            validation: ValidationReport::default(),
            output_dir: display_path(out_dir),
            started_at,
            timings: None,
            prioritized: Vec::new(),
            user_stories: Vec::new(),
            sections_summary: None,
            message: Some(message.to_string()),
        }
    }
}

/// Counts from an index-only build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSummary {
    pub files: usize,
    pub chunks: usize,
    pub dimensions: usize,
}

pub struct Pipeline {
    config: Config,
    cache: Arc<ModelCache>,
    loader: Loader,
    synthesizer: Synthesizer,
    sectioner: Sectioner,
}

fn display_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

fn millis_since(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

impl Pipeline {
    /// Pipeline with the process-wide model cache, the CLI OCR tools,
    /// the configured generation backend and environment-driven sectioning.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            loader: Loader::new(&config.loader),
            synthesizer: Synthesizer::from_config(&config.rag),
            sectioner: Sectioner::from_env(),
            cache: ModelCache::global(),
            config,
        }
    }

    /// Load and validate the config file, then build the pipeline.
    pub fn from_path(config_path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(Config::load(config_path)?))
    }

    #[must_use]
    pub fn with_cache(mut self, cache: Arc<ModelCache>) -> Self {
        self.cache = cache;
        self
    }

    #[must_use]
    pub fn with_loader(mut self, loader: Loader) -> Self {
        self.loader = loader;
        self
    }

    #[must_use]
    pub fn with_synthesizer(mut self, synthesizer: Synthesizer) -> Self {
        self.synthesizer = synthesizer;
        self
    }

    #[must_use]
    pub fn with_sectioner(mut self, sectioner: Sectioner) -> Self {
        self.sectioner = sectioner;
        self
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    fn load_chunks(&self, files: &[PathBuf]) -> Vec<Chunk> {
        let cfg = &self.config.chunking;
        let (size, overlap) = (cfg.window_size(), cfg.window_overlap());
        let mut chunks = Vec::new();
        for path in files {
            let doc = self.loader.load(path);
            // Blank documents yield no chunks, even with whole-text windows
            if doc.text.trim().is_empty() {
                debug!("{}: no text", doc.source);
                continue;
            }
            let doc_chunks = chunk_document(&doc, size, overlap);
            debug!("{}: {} chunks", doc.source, doc_chunks.len());
            chunks.extend(doc_chunks);
        }
        chunks
    }

    fn embedder(&self) -> Result<Arc<dyn Embedder>> {
        Ok(self.cache.get_or_load(&self.config.embedding)?)
    }

    /// Embed every chunk. `None` when the model or its output is unusable.
    fn embed_chunks(&self, embedder: &dyn Embedder, chunks: &[Chunk]) -> Option<Embeddings> {
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        match embed_all(embedder, &texts, self.config.embedding.batch_size) {
            Ok(vectors) if !vectors.is_empty() && vectors.len() == chunks.len() => Some(vectors),
            Ok(vectors) => {
                warn!(
                    "Embedder returned {} vectors for {} chunks",
                    vectors.len(),
                    chunks.len()
                );
                None
            }
            Err(e) => {
                warn!("Embedding failed: {e}");
                None
            }
        }
    }

    /// Load, chunk, embed and index without synthesis.
    pub fn build_index(&self, input_dir: impl AsRef<Path>) -> Result<IndexSummary> {
        let files = self.loader.list_input_files(input_dir.as_ref())?;
        let chunks = self.load_chunks(&files);
        if chunks.is_empty() {
            warn!("{NO_TEXT_MESSAGE}");
            return Ok(IndexSummary {
                files: files.len(),
                ..IndexSummary::default()
            });
        }

        let embedder = self.embedder().context("failed to load embedding model")?;
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = embed_all(embedder.as_ref(), &texts, self.config.embedding.batch_size)
            .context("failed to embed chunks")?;

        let mut index = VectorIndex::new(vectors.dim())?;
        let num_chunks = chunks.len();
        index.add(&vectors, chunks)?;

        Ok(IndexSummary {
            files: files.len(),
            chunks: num_chunks,
            dimensions: index.dim(),
        })
    }

    /// Run every stage over `input_dir` and write artifacts to `out_dir`.
    ///
    /// No extracted text and unusable embeddings are reported through
    /// `RunReport::message`. Errors are reserved for scan, index and output
    /// failures.
    pub fn run(
        &self,
        input_dir: impl AsRef<Path>,
        out_dir: impl AsRef<Path>,
        query: &str,
    ) -> Result<RunReport> {
        let (input_dir, out_dir) = (input_dir.as_ref(), out_dir.as_ref());
        let started_at = Utc::now();
        let t0 = Instant::now();

        let files = self.loader.list_input_files(input_dir)?;
        let file_names: Vec<String> = files.iter().map(|p| display_path(p)).collect();
        let list_files_ms = millis_since(t0);

        let t_load = Instant::now();
        let chunks = self.load_chunks(&files);
        let load_and_chunk_ms = millis_since(t_load);
        info!("Loaded {} files into {} chunks", files.len(), chunks.len());

        if chunks.is_empty() {
            warn!("{NO_TEXT_MESSAGE}");
            return Ok(RunReport::early_exit(
                file_names,
                0,
                out_dir,
                started_at,
                NO_TEXT_MESSAGE,
            ));
        }

        let t_embed = Instant::now();
        let embedded = match self.embedder() {
            Ok(embedder) => self
                .embed_chunks(embedder.as_ref(), &chunks)
                .map(|vectors| (embedder, vectors)),
            Err(e) => {
                warn!("Embedding model unavailable: {e:#}");
                None
            }
        };
        let Some((embedder, vectors)) = embedded else {
            return Ok(RunReport::early_exit(
                file_names,
                chunks.len(),
                out_dir,
                started_at,
                EMBED_FAILED_MESSAGE,
            ));
        };
        let embed_ms = millis_since(t_embed);
        info!("Embedded {} chunks, dimension {}", vectors.len(), vectors.dim());

        let t_index = Instant::now();
        let num_chunks = chunks.len();
        let mut index = VectorIndex::new(vectors.dim())?;
        index.add(&vectors, chunks)?;

        let query_vectors = match embed_all(embedder.as_ref(), &[query.to_string()], 1) {
            Ok(q) if !q.is_empty() => q,
            Ok(_) => vectors.first_row(),
            Err(e) => {
                warn!("Query embedding failed, using first chunk: {e}");
                vectors.first_row()
            }
        };
        let contexts: Vec<Chunk> = index
            .search(&query_vectors, self.config.rag.k)?
            .into_iter()
            .next()
            .unwrap_or_default()
            .into_iter()
            .map(|(_score, chunk)| chunk)
            .collect();
        let index_and_search_ms = millis_since(t_index);
        info!("Retrieved {} contexts for query {query:?}", contexts.len());

        let t_rag = Instant::now();
        let candidates = self.synthesizer.synthesize(query, &contexts);
        let parsed = classify(&candidates);
        let validation = validate(&parsed);
        let prioritized = prioritize(&parsed);
        let prioritized = self
            .sectioner
            .annotate(&prioritized, self.config.sectioning.allow_api);
        let sections_summary = summarize(&prioritized);
        info!(
            "{} candidates, {} requirements, {} flags, {} under-specified",
            candidates.len(),
            prioritized.len(),
            validation.flags.len(),
            validation.missing.len()
        );

        let user_stories = self.write_outputs(&prioritized, out_dir)?;

        let timings = Timings {
            list_files_ms,
            load_and_chunk_ms,
            embed_ms,
            index_and_search_ms,
            rag_nlp_validate_prioritize_ms: millis_since(t_rag),
            total_ms: millis_since(t0),
        };
        debug!("Timings: {timings:?}");

        Ok(RunReport {
            files: file_names,
            num_chunks,
            num_candidates: candidates.len(),
            validation,
            output_dir: display_path(out_dir),
            started_at,
            timings: Some(timings),
            prioritized,
            user_stories,
            sections_summary: Some(sections_summary),
            message: None,
        })
    }

    /// Write the enabled artifacts and return the generated user stories.
    fn write_outputs(&self, items: &[RequirementItem], out_dir: &Path) -> Result<Vec<String>> {
        let cfg = &self.config.output;
        fs::create_dir_all(out_dir)
            .with_context(|| format!("failed to create output directory {}", out_dir.display()))?;

        if cfg.generate_docx {
            output::write_docx(items, &out_dir.join(output::DOCX_FILE))?;
        }
        if cfg.generate_excel {
            output::write_table(items, &out_dir.join(output::TABLE_FILE))?;
        }
        if !cfg.generate_user_stories {
            return Ok(Vec::new());
        }
        let stories = output::generate_user_stories(items);
        output::write_user_stories(&stories, &out_dir.join(output::STORIES_FILE))?;
        Ok(stories)
    }
}
