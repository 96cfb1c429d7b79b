use std::fmt;
use std::time::Duration;

pub mod gemini;
pub mod huggingface;
pub mod ollama_llm;

/// One generation call: the full prompt, the model to run it on and the output budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationRequest<'a> {
    pub prompt: &'a str,
    pub model_id: &'a str,
    pub max_output_tokens: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Timeout,
    Transport,
    Status(u16),
    /// The body did not have the expected shape.
    Malformed,
    /// The expected text field was present but blank.
    Empty,
    /// The capability is not available at all (e.g. not configured).
    Unavailable,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Transport => write!(f, "transport error"),
            FailureKind::Status(code) => write!(f, "HTTP {code}"),
            FailureKind::Malformed => write!(f, "malformed response"),
            FailureKind::Empty => write!(f, "empty response"),
            FailureKind::Unavailable => write!(f, "unavailable"),
        }
    }
}

/// Failure of a single generation attempt, decoded at the network boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationFailure {
    pub kind: FailureKind,
    pub detail: String,
}

impl GenerationFailure {
    pub fn new(kind: FailureKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for GenerationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.detail.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}: {}", self.kind, self.detail)
        }
    }
}

impl std::error::Error for GenerationFailure {}

/// A text-generation backend. `Ok` carries the generated text, `Err` a typed failure.
pub trait Llm {
    /// Short label used in trace lines, e.g. "Gemini".
    fn provider(&self) -> &str;

    fn generate(&self, req: &GenerationRequest<'_>) -> Result<String, GenerationFailure>;
}

pub(crate) const MAX_DETAIL_CHARS: usize = 300;

pub(crate) fn truncate_detail(text: &str) -> String {
    let t = text.trim();
    if t.chars().count() <= MAX_DETAIL_CHARS {
        return t.to_string();
    }
    let mut s: String = t.chars().take(MAX_DETAIL_CHARS).collect();
    s.push_str("...");
    s
}

fn is_timeout(transport: &ureq::Transport) -> bool {
    if !matches!(transport.kind(), ureq::ErrorKind::Io) {
        return false;
    }
    let io_timeout = std::error::Error::source(transport)
        .and_then(|s| s.downcast_ref::<std::io::Error>())
        .map(|e| {
            matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
            )
        })
        .unwrap_or(false);
    io_timeout || transport.to_string().contains("timed out")
}

/// Map a `ureq` error onto a failure kind. Non-2xx statuses keep a truncated body as detail.
pub(crate) fn failure_from_ureq(err: ureq::Error) -> GenerationFailure {
    match err {
        ureq::Error::Status(code, resp) => {
            let body = resp.into_string().unwrap_or_default();
            GenerationFailure::new(FailureKind::Status(code), truncate_detail(&body))
        }
        ureq::Error::Transport(t) => {
            if is_timeout(&t) {
                GenerationFailure::new(FailureKind::Timeout, t.to_string())
            } else {
                GenerationFailure::new(FailureKind::Transport, t.to_string())
            }
        }
    }
}

/// POST a JSON body and return the raw response text of a 2xx reply.
pub(crate) fn post_json(
    req: ureq::Request,
    body: serde_json::Value,
    timeout: Duration,
) -> Result<String, GenerationFailure> {
    let resp = req.timeout(timeout).send_json(body).map_err(failure_from_ureq)?;
    resp.into_string().map_err(|e| {
        GenerationFailure::new(FailureKind::Transport, format!("failed to read response body: {e}"))
    })
}

pub(crate) fn encode_body<T: serde::Serialize>(body: &T) -> Result<serde_json::Value, GenerationFailure> {
    serde_json::to_value(body).map_err(|e| {
        GenerationFailure::new(FailureKind::Malformed, format!("failed to encode request: {e}"))
    })
}

pub(crate) fn non_blank(text: String) -> Result<String, GenerationFailure> {
    if text.trim().is_empty() {
        return Err(GenerationFailure::new(FailureKind::Empty, "no text returned"));
    }
    Ok(text)
}
