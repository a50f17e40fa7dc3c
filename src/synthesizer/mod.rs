//! Candidate requirement synthesis from retrieved context.
//!
//! Without a generation backend, candidates are literal lines lifted from the
//! top contexts. With one, the backend's free text is parsed the same way.
pub mod providers;

use tracing::{info, warn};

use crate::config::RagConfig;
use crate::models::Chunk;

pub use providers::{AnthropicBackend, GenerationBackend, OpenAiBackend};

/// Contexts concatenated by the offline path.
const TOP_CONTEXTS: usize = 3;
/// Per-context character budget of the offline path.
const CONTEXT_CHARS: usize = 800;
/// Upper bound on candidates per run.
pub const MAX_CANDIDATES: usize = 10;

const MODAL_KEYWORDS: [&str; 4] = ["shall", "must", "should", "could"];

/// Turns retrieved chunks into candidate requirement lines.
pub struct Synthesizer {
    backend: Option<Box<dyn GenerationBackend>>,
}

impl Synthesizer {
    /// Offline synthesizer using only the line heuristic.
    #[must_use]
    pub fn offline() -> Self {
        Self { backend: None }
    }

    #[must_use]
    pub fn with_backend(backend: Box<dyn GenerationBackend>) -> Self {
        Self {
            backend: Some(backend),
        }
    }

    /// Build from `rag.llm_provider`. Unknown providers or missing API keys
    /// fall back to offline synthesis.
    #[must_use]
    pub fn from_config(cfg: &RagConfig) -> Self {
        match providers::backend_from_config(cfg) {
            Ok(Some(backend)) => {
                info!("Using {} for requirement synthesis", backend.name());
                Self::with_backend(backend)
            }
            Ok(None) => Self::offline(),
            Err(e) => {
                warn!("Generation backend unavailable, synthesizing offline: {e:#}");
                Self::offline()
            }
        }
    }

    #[must_use]
    pub fn backend_name(&self) -> &str {
        self.backend.as_ref().map_or("offline", |b| b.name())
    }

    /// Produce at most [`MAX_CANDIDATES`] candidate lines for `query`.
    pub fn synthesize(&self, query: &str, contexts: &[Chunk]) -> Vec<String> {
        if let Some(backend) = &self.backend {
            match backend.generate(query, contexts) {
                Ok(text) => return extract_candidates(&text),
                Err(e) => warn!("{} generation failed, using offline path: {e:#}", backend.name()),
            }
        }
        extract_candidates(&offline_context(contexts))
    }
}

/// The top contexts, each cut to its character budget, joined by blank lines.
fn offline_context(contexts: &[Chunk]) -> String {
    contexts
        .iter()
        .take(TOP_CONTEXTS)
        .map(|c| c.text.chars().take(CONTEXT_CHARS).collect::<String>())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Split `text` into trimmed non-empty lines and keep those carrying a modal
/// keyword. If none do, keep the first lines unfiltered.
pub fn extract_candidates(text: &str) -> Vec<String> {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    let modal: Vec<String> = lines
        .iter()
        .filter(|l| {
            let lower = l.to_lowercase();
            MODAL_KEYWORDS.iter().any(|k| lower.contains(k))
        })
        .take(MAX_CANDIDATES)
        .map(|l| (*l).to_string())
        .collect();

    if !modal.is_empty() {
        return modal;
    }

    lines
        .into_iter()
        .take(MAX_CANDIDATES)
        .map(str::to_string)
        .collect()
}
