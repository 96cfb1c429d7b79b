use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{encode_body, non_blank, post_json, truncate_detail, FailureKind, GenerationFailure, GenerationRequest, Llm};

pub const HF_INFERENCE_BASE_URL: &str = "https://api-inference.huggingface.co";

/// Hugging Face Inference API client (text-generation / text2text models).
#[derive(Clone)]
pub struct HuggingFaceLlm {
    base_url: String,
    token: String,
    timeout: Duration,
}

impl std::fmt::Debug for HuggingFaceLlm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HuggingFaceLlm")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl HuggingFaceLlm {
    pub fn new(token: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: HF_INFERENCE_BASE_URL.to_string(),
            token: token.into(),
            timeout,
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

#[derive(Debug, Serialize)]
struct Parameters {
    max_new_tokens: u32,
    return_full_text: bool,
}

#[derive(Debug, Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
    parameters: Parameters,
}

#[derive(Debug, Deserialize)]
struct Generated {
    generated_text: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InferenceResponse {
    Many(Vec<Generated>),
    One(Generated),
    Error { error: String },
}

/// Extract `generated_text` from either the list or the single-object response shape.
pub fn decode_response(body: &str) -> Result<String, GenerationFailure> {
    let resp: InferenceResponse = serde_json::from_str(body).map_err(|e| {
        GenerationFailure::new(
            FailureKind::Malformed,
            format!("{e}; body={}", truncate_detail(body)),
        )
    })?;
    match resp {
        InferenceResponse::Many(items) => match items.into_iter().next() {
            Some(g) => non_blank(g.generated_text),
            None => Err(GenerationFailure::new(FailureKind::Malformed, "empty result list")),
        },
        InferenceResponse::One(g) => non_blank(g.generated_text),
        InferenceResponse::Error { error } => {
            Err(GenerationFailure::new(FailureKind::Malformed, truncate_detail(&error)))
        }
    }
}

impl Llm for HuggingFaceLlm {
    fn provider(&self) -> &str {
        "Hugging Face"
    }

    fn generate(&self, req: &GenerationRequest<'_>) -> Result<String, GenerationFailure> {
        let url = format!("{}/models/{}", self.base_url, req.model_id);
        let body = encode_body(&InferenceRequest {
            inputs: req.prompt,
            parameters: Parameters {
                max_new_tokens: req.max_output_tokens,
                return_full_text: false,
            },
        })?;
        let request = ureq::post(&url).set("Authorization", &format!("Bearer {}", self.token));
        let raw = post_json(request, body, self.timeout)?;
        decode_response(&raw)
    }
}
