use serde::{Deserialize, Serialize};

use super::{encode_body, non_blank, post_json, truncate_detail, FailureKind, GenerationFailure, GenerationRequest, Llm};
use crate::ollama::OllamaClient;

/// Local fallback tier: a single model served by Ollama on the loopback interface.
#[derive(Debug, Clone)]
pub struct OllamaLlm {
    client: OllamaClient,
}

impl OllamaLlm {
    pub fn new(client: OllamaClient) -> Self {
        Self { client }
    }
}

#[derive(Debug, Clone, Serialize)]
struct Options {
    num_predict: u32,
}

#[derive(Debug, Clone, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: Options,
}

#[derive(Debug, Clone, Deserialize)]
struct GenerateResponse {
    response: String,
}

pub fn decode_response(body: &str) -> Result<String, GenerationFailure> {
    let v: GenerateResponse = serde_json::from_str(body).map_err(|e| {
        GenerationFailure::new(
            FailureKind::Malformed,
            format!("{e}; body={}", truncate_detail(body)),
        )
    })?;
    non_blank(v.response)
}

impl Llm for OllamaLlm {
    fn provider(&self) -> &str {
        "Ollama"
    }

    fn generate(&self, req: &GenerationRequest<'_>) -> Result<String, GenerationFailure> {
        let url = format!("{}/api/generate", self.client.base_url());
        let body = encode_body(&GenerateRequest {
            model: req.model_id,
            prompt: req.prompt,
            stream: false,
            options: Options {
                num_predict: req.max_output_tokens,
            },
        })?;
        let raw = post_json(ureq::post(&url), body, self.client.timeout())?;
        decode_response(&raw)
    }
}
