//! Best-effort external section classifiers.
//!
//! Every failure (transport, status, body, unknown label) yields `None` so the
//! caller falls through to the next classifier or the heuristic.
use std::time::Duration;

use anyhow::{Context, Result, bail};
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::{OUTLINE_SECTIONS, canonical_section};

pub const ENRICH_URL_ENV: &str = "REQUIREMENT_SECTION_ENRICH_URL";
pub const HF_TOKEN_ENV: &str = "HF_API_TOKEN";
pub const ZERO_SHOT_URL_ENV: &str = "HF_ZERO_SHOT_URL";

const DEFAULT_ZERO_SHOT_URL: &str =
    "https://api-inference.huggingface.co/models/facebook/bart-large-mnli";
const CALL_TIMEOUT: Duration = Duration::from_secs(8);

/// A capability that may label a text with an outline section.
pub trait SectionClassifier: Send + Sync {
    fn name(&self) -> &str;

    /// A canonical outline label, or `None` when inconclusive.
    fn attempt(&self, text: &str) -> Option<String>;
}

/// Build the classifiers whose environment variables are set, highest
/// priority first.
pub fn classifiers_from_env() -> Vec<Box<dyn SectionClassifier>> {
    let mut classifiers: Vec<Box<dyn SectionClassifier>> = Vec::new();

    if let Ok(url) = std::env::var(ENRICH_URL_ENV) {
        if !url.trim().is_empty() {
            match EnrichmentEndpoint::new(url) {
                Ok(c) => classifiers.push(Box::new(c)),
                Err(e) => debug!("Enrichment endpoint disabled: {e:#}"),
            }
        }
    }

    if let Ok(token) = std::env::var(HF_TOKEN_ENV) {
        if !token.trim().is_empty() {
            let url = std::env::var(ZERO_SHOT_URL_ENV)
                .unwrap_or_else(|_| DEFAULT_ZERO_SHOT_URL.to_string());
            match ZeroShotEndpoint::new(url, token) {
                Ok(c) => classifiers.push(Box::new(c)),
                Err(e) => debug!("Zero-shot endpoint disabled: {e:#}"),
            }
        }
    }

    classifiers
}

fn http_client() -> Result<Client> {
    Client::builder()
        .timeout(CALL_TIMEOUT)
        .build()
        .context("failed to build HTTP client")
}

// ── Caller-provided enrichment endpoint ──────────────────────────────

/// POST `{"text"}`, expecting `{"section"}`.
pub struct EnrichmentEndpoint {
    url: String,
    client: Client,
}

#[derive(Deserialize)]
struct EnrichmentResponse {
    #[serde(default)]
    section: Option<String>,
}

impl EnrichmentEndpoint {
    pub fn new(url: String) -> Result<Self> {
        Ok(Self {
            url,
            client: http_client()?,
        })
    }

    fn call(&self, text: &str) -> Result<String> {
        let resp = self
            .client
            .post(&self.url)
            .json(&json!({ "text": text }))
            .send()
            .context("enrichment request failed")?;
        if !resp.status().is_success() {
            bail!("enrichment endpoint returned {}", resp.status());
        }
        let body: EnrichmentResponse = resp.json().context("invalid enrichment response")?;
        parse_enrichment(body).context("enrichment label is not an outline section")
    }
}

fn parse_enrichment(body: EnrichmentResponse) -> Option<String> {
    body.section
        .as_deref()
        .and_then(canonical_section)
        .map(str::to_string)
}

impl SectionClassifier for EnrichmentEndpoint {
    fn name(&self) -> &str {
        "enrichment endpoint"
    }

    fn attempt(&self, text: &str) -> Option<String> {
        self.call(text)
            .map_err(|e| debug!("{}: {e:#}", self.name()))
            .ok()
    }
}

// ── Zero-shot classification endpoint ────────────────────────────────

/// HuggingFace-style zero-shot classification over the outline labels.
pub struct ZeroShotEndpoint {
    url: String,
    token: String,
    client: Client,
}

#[derive(Deserialize)]
struct ZeroShotResponse {
    #[serde(default)]
    labels: Vec<String>,
}

impl ZeroShotEndpoint {
    pub fn new(url: String, token: String) -> Result<Self> {
        Ok(Self {
            url,
            token,
            client: http_client()?,
        })
    }

    fn call(&self, text: &str) -> Result<String> {
        let body = json!({
            "inputs": text,
            "parameters": {
                "candidate_labels": OUTLINE_SECTIONS,
                "multi_label": false,
            },
        });
        let resp = self
            .client
            .post(&self.url)
            .bearer_auth(self.token.trim())
            .json(&body)
            .send()
            .context("zero-shot request failed")?;
        if !resp.status().is_success() {
            bail!("zero-shot endpoint returned {}", resp.status());
        }
        let body: ZeroShotResponse = resp.json().context("invalid zero-shot response")?;
        parse_zero_shot(body).context("top zero-shot label is not an outline section")
    }
}

/// Only the top-ranked label counts.
fn parse_zero_shot(body: ZeroShotResponse) -> Option<String> {
    body.labels
        .first()
        .and_then(|l| canonical_section(l))
        .map(str::to_string)
}

impl SectionClassifier for ZeroShotEndpoint {
    fn name(&self) -> &str {
        "zero-shot endpoint"
    }

    fn attempt(&self, text: &str) -> Option<String> {
        self.call(text)
            .map_err(|e| debug!("{}: {e:#}", self.name()))
            .ok()
    }
}
