use std::time::Duration;

use anyhow::{Context, Result, bail};
use reqwest::blocking::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};

use crate::config::RagConfig;
use crate::models::Chunk;

const OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";
const ANTHROPIC_URL: &str = "https://api.anthropic.com/v1/messages";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-5-haiku-latest";
const MAX_TOKENS: usize = 800;
const TEMPERATURE: f32 = 0.0;

const SYSTEM_PROMPT: &str = "You extract software requirements from project documents. \
Answer with one requirement per line, each phrased with shall, must, should or could. \
Use only facts present in the provided context.";

/// A text-generation service that turns `(query, contexts)` into free text.
pub trait GenerationBackend: Send + Sync {
    fn name(&self) -> &str;

    fn generate(&self, query: &str, contexts: &[Chunk]) -> Result<String>;
}

/// Resolve `rag.llm_provider` into a backend. `None`, empty, `none` and
/// `offline` mean no backend.
pub fn backend_from_config(cfg: &RagConfig) -> Result<Option<Box<dyn GenerationBackend>>> {
    let Some(provider) = cfg.llm_provider.as_deref() else {
        return Ok(None);
    };
    let model = cfg.llm_model.clone();

    match provider.trim().to_ascii_lowercase().as_str() {
        "" | "none" | "offline" => Ok(None),
        "openai" => {
            let key = std::env::var("OPENAI_API_KEY").context("OPENAI_API_KEY is not set")?;
            let model = model.unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string());
            Ok(Some(Box::new(OpenAiBackend::new(key, model)?)))
        }
        "anthropic" => {
            let key = std::env::var("ANTHROPIC_API_KEY").context("ANTHROPIC_API_KEY is not set")?;
            let model = model.unwrap_or_else(|| DEFAULT_ANTHROPIC_MODEL.to_string());
            Ok(Some(Box::new(AnthropicBackend::new(key, model)?)))
        }
        other => bail!("unknown llm_provider {other:?}"),
    }
}

/// User prompt listing the query and numbered context chunks.
pub(crate) fn build_prompt(query: &str, contexts: &[Chunk]) -> String {
    let mut prompt = format!("Query: {query}\n\nContext:\n");
    for (i, c) in contexts.iter().enumerate() {
        prompt.push_str(&format!("[{}] ({}#{})\n{}\n\n", i + 1, c.source, c.offset, c.text));
    }
    prompt.push_str("Requirements:");
    prompt
}

fn http_client(provider: &str) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(60))
        .build()
        .with_context(|| format!("failed to build {provider} HTTP client"))
}

// ── OpenAI ───────────────────────────────────────────────────────────

pub struct OpenAiBackend {
    api_key: String,
    model: String,
    client: Client,
}

impl OpenAiBackend {
    pub fn new(api_key: String, model: String) -> Result<Self> {
        Ok(Self {
            api_key,
            model,
            client: http_client("OpenAI")?,
        })
    }
}

impl GenerationBackend for OpenAiBackend {
    fn name(&self) -> &str {
        "openai"
    }

    fn generate(&self, query: &str, contexts: &[Chunk]) -> Result<String> {
        let mut headers = HeaderMap::new();
        let auth = format!("Bearer {}", self.api_key.trim());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth).context("invalid OpenAI API key")?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let prompt = build_prompt(query, contexts);
        let body = ChatRequest {
            model: &self.model,
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt,
                },
            ],
        };
        let resp = self
            .client
            .post(OPENAI_URL)
            .headers(headers)
            .json(&body)
            .send()
            .context("failed to call OpenAI chat completions")?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp
                .text()
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            bail!("OpenAI returned {}: {}", status, text);
        }
        let parsed: ChatResponse = resp.json().context("failed to parse OpenAI response")?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .context("OpenAI response has no choices")
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: usize,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: String,
}

// ── Anthropic ────────────────────────────────────────────────────────

pub struct AnthropicBackend {
    api_key: String,
    model: String,
    client: Client,
}

impl AnthropicBackend {
    pub fn new(api_key: String, model: String) -> Result<Self> {
        Ok(Self {
            api_key,
            model,
            client: http_client("Anthropic")?,
        })
    }
}

impl GenerationBackend for AnthropicBackend {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn generate(&self, query: &str, contexts: &[Chunk]) -> Result<String> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(self.api_key.trim()).context("invalid Anthropic API key")?,
        );
        headers.insert("anthropic-version", HeaderValue::from_static("2023-06-01"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let prompt = build_prompt(query, contexts);
        let body = AnthropicRequest {
            model: &self.model,
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
            system: SYSTEM_PROMPT,
            messages: vec![AnthropicMessage {
                role: "user",
                content: &prompt,
            }],
        };
        let resp = self
            .client
            .post(ANTHROPIC_URL)
            .headers(headers)
            .json(&body)
            .send()
            .context("failed to call Anthropic messages API")?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp
                .text()
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            bail!("Anthropic returned {}: {}", status, text);
        }
        let parsed: AnthropicResponse =
            resp.json().context("failed to parse Anthropic response")?;
        let answer = parsed
            .content
            .into_iter()
            .filter_map(|block| match block {
                AnthropicResponseBlock::Text { text } => Some(text),
                AnthropicResponseBlock::Other => None,
            })
            .collect::<Vec<_>>()
            .join("\n");
        if answer.is_empty() {
            bail!("Anthropic response missing text content");
        }
        Ok(answer)
    }
}

#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: usize,
    temperature: f32,
    system: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicResponseBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicResponseBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}
