//! Gemini-based embedding client implementation.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use super::TextEmbedder;
use crate::error::{RagError, Result};

/// Default public endpoint for the Gemini REST API.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Blocking embeddings client for the Gemini `embedContent` endpoint.
///
/// Requests are sent one text at a time so output ordering always matches
/// input ordering; a failed call aborts the batch without retrying.
#[derive(Clone)]
pub struct GeminiEmbedder {
    client: Client,
    base_url: String,
    model: String,
}

impl GeminiEmbedder {
    /// Builds a new Gemini embeddings client.
    pub fn new(api_key: &str, base_url: &str, model: &str, timeout: Duration) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(RagError::InvalidInput("missing Gemini API key".into()));
        }
        if model.trim().is_empty() {
            return Err(RagError::InvalidInput("missing embedding model name".into()));
        }
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-goog-api-key",
            HeaderValue::from_str(api_key.trim())
                .map_err(|_| RagError::InvalidInput("invalid Gemini API key".into()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|err| RagError::EmbeddingProvider(format!("failed to build client: {err}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }

    fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/models/{}:embedContent", self.base_url, self.model);
        let request = EmbedRequest {
            content: Content {
                parts: vec![Part { text }],
            },
        };
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .map_err(|err| RagError::EmbeddingProvider(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(RagError::EmbeddingProvider(format!(
                "embedContent returned {status}: {body}"
            )));
        }
        let body = response
            .text()
            .map_err(|err| RagError::EmbeddingProvider(err.to_string()))?;
        extract_vector(&body)
    }
}

impl TextEmbedder for GeminiEmbedder {
    fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed_one(text)?);
        }
        Ok(vectors)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Normalizes the provider's known wire shapes into a flat float vector.
///
/// The endpoint has been observed to answer with a singular
/// `{"embedding": {"values": [...]}}`, or a plural `embeddings` key that is
/// either the float list itself or a list of entries (value objects, objects
/// carrying an `embedding` field, raw float lists, or a single-element
/// nested list). Anything else is rejected rather than guessed at.
fn extract_vector(body: &str) -> Result<Vec<f32>> {
    let parsed: EmbedResponse = serde_json::from_str(body)
        .map_err(|_| RagError::MalformedEmbeddingResponse(snippet(body)))?;

    let payload = match (parsed.embedding, parsed.embeddings) {
        (Some(single), _) => single,
        (None, Some(EmbeddingsField::Entries(mut many))) if !many.is_empty() => {
            many.swap_remove(0)
        }
        (None, Some(EmbeddingsField::Flat(values))) => EmbeddingPayload::Flat(values),
        _ => return Err(RagError::MalformedEmbeddingResponse(snippet(body))),
    };

    let values = match payload {
        EmbeddingPayload::Values { values } => values,
        EmbeddingPayload::Embedding { embedding } => embedding,
        EmbeddingPayload::Flat(values) => values,
        EmbeddingPayload::Nested(mut rows) => {
            if rows.is_empty() {
                return Err(RagError::MalformedEmbeddingResponse(snippet(body)));
            }
            rows.swap_remove(0)
        }
    };
    if values.is_empty() {
        return Err(RagError::MalformedEmbeddingResponse(snippet(body)));
    }
    Ok(values)
}

fn snippet(body: &str) -> String {
    const MAX_CHARS: usize = 200;
    body.chars().take(MAX_CHARS).collect()
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    content: Content<'a>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    #[serde(default)]
    embedding: Option<EmbeddingPayload>,
    #[serde(default)]
    embeddings: Option<EmbeddingsField>,
}

/// The plural key is either a list of entries or the float list itself.
#[derive(Deserialize)]
#[serde(untagged)]
enum EmbeddingsField {
    Entries(Vec<EmbeddingPayload>),
    Flat(Vec<f32>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EmbeddingPayload {
    Values { values: Vec<f32> },
    Embedding { embedding: Vec<f32> },
    Flat(Vec<f32>),
    Nested(Vec<Vec<f32>>),
}
