use cka_core::error::AppError;
use serde::{Deserialize, Serialize};

use super::Embedder;
use crate::ollama::OllamaClient;

/// Longest passage sent for embedding. Longer text is cut at the last char boundary below it.
const MAX_EMBED_INPUT_BYTES: usize = 12_000;

/// Dense vectors from the loopback Ollama `/api/embeddings` endpoint. Uses the client's timeout.
#[derive(Debug, Clone)]
pub struct OllamaEmbedder {
    client: OllamaClient,
}

impl OllamaEmbedder {
    pub fn new(client: OllamaClient) -> Self {
        Self { client }
    }
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    #[serde(default)]
    embedding: Vec<f32>,
}

fn embed_error(message: &str) -> AppError {
    AppError::new("AI_EMBEDDINGS_FAILED", message)
}

fn truncate_input(input: &str) -> &str {
    if input.len() <= MAX_EMBED_INPUT_BYTES {
        return input;
    }
    let cut = (0..=MAX_EMBED_INPUT_BYTES)
        .rev()
        .find(|i| input.is_char_boundary(*i))
        .unwrap_or(0);
    &input[..cut]
}

/// Decode an embeddings reply. An empty vector or a non-finite component is a failure.
pub fn decode_embedding(body: &str) -> Result<Vec<f32>, AppError> {
    let parsed: EmbedResponse = serde_json::from_str(body)
        .map_err(|e| embed_error("Embeddings response was not valid JSON").with_details(e.to_string()))?;
    if parsed.embedding.is_empty() {
        return Err(embed_error("Embeddings response had no vector"));
    }
    if parsed.embedding.iter().any(|x| !x.is_finite()) {
        return Err(embed_error("Embeddings response contained a non-finite value"));
    }
    Ok(parsed.embedding)
}

impl Embedder for OllamaEmbedder {
    fn embed(&self, model: &str, input: &str) -> Result<Vec<f32>, AppError> {
        let url = format!("{}/api/embeddings", self.client.base_url());
        let body = serde_json::to_value(EmbedRequest {
            model,
            prompt: truncate_input(input),
        })
        .map_err(|e| embed_error("Failed to encode embeddings request").with_details(e.to_string()))?;

        let resp = ureq::post(&url)
            .timeout(self.client.timeout())
            .send_json(body)
            .map_err(|e| match e {
                ureq::Error::Status(code, _) => embed_error("Embeddings endpoint returned an error")
                    .with_details(format!("model={model}; status={code}"))
                    .with_retryable(code >= 500),
                other => embed_error("Failed to call embeddings endpoint")
                    .with_details(other.to_string())
                    .with_retryable(true),
            })?;
        let text = resp
            .into_string()
            .map_err(|e| embed_error("Failed to read embeddings response").with_details(e.to_string()))?;
        decode_embedding(&text)
    }
}
