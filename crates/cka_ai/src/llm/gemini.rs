use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{encode_body, non_blank, post_json, truncate_detail, FailureKind, GenerationFailure, GenerationRequest, Llm};

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Google Gemini `generateContent` client. Primary generation tier.
#[derive(Clone)]
pub struct GeminiLlm {
    base_url: String,
    api_key: String,
    timeout: Duration,
}

impl std::fmt::Debug for GeminiLlm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiLlm")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl GeminiLlm {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: GEMINI_BASE_URL.to_string(),
            api_key: api_key.into(),
            timeout,
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfigBody {
    max_output_tokens: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfigBody,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<serde_json::Value>,
}

/// Extract the generated text from a `generateContent` response body.
pub fn decode_response(body: &str) -> Result<String, GenerationFailure> {
    let resp: GenerateContentResponse = serde_json::from_str(body).map_err(|e| {
        GenerationFailure::new(
            FailureKind::Malformed,
            format!("{e}; body={}", truncate_detail(body)),
        )
    })?;

    let Some(first) = resp.candidates.first() else {
        let feedback = resp
            .prompt_feedback
            .map(|v| v.to_string())
            .unwrap_or_else(|| "none".to_string());
        return Err(GenerationFailure::new(
            FailureKind::Malformed,
            format!("response has no candidates; prompt_feedback={feedback}"),
        ));
    };

    let Some(content) = first.content.as_ref() else {
        return Err(GenerationFailure::new(
            FailureKind::Empty,
            format!(
                "candidate has no content; finish_reason={}",
                first.finish_reason.as_deref().unwrap_or("unknown")
            ),
        ));
    };

    let text = content
        .parts
        .iter()
        .filter_map(|p| p.text.as_deref())
        .collect::<String>();
    non_blank(text)
}

impl Llm for GeminiLlm {
    fn provider(&self) -> &str {
        "Gemini"
    }

    fn generate(&self, req: &GenerationRequest<'_>) -> Result<String, GenerationFailure> {
        let url = format!("{}/models/{}:generateContent", self.base_url, req.model_id);
        let body = encode_body(&GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part { text: req.prompt }],
            }],
            generation_config: GenerationConfigBody {
                max_output_tokens: req.max_output_tokens,
            },
        })?;

        let request = ureq::post(&url).set("x-goog-api-key", &self.api_key);
        let raw = post_json(request, body, self.timeout)?;
        decode_response(&raw)
    }
}
