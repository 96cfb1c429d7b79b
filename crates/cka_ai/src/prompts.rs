use cka_core::domain::RetrievedResult;
use sha2::{Digest, Sha256};

pub const CONTEXT_DELIMITER: &str = "\n\n---\n\n";

/// `"[id] text"` blocks joined by [`CONTEXT_DELIMITER`]; empty for no references.
pub fn build_context(retrieved: &[RetrievedResult]) -> String {
    retrieved
        .iter()
        .map(|r| format!("[{}] {}", r.id, r.text))
        .collect::<Vec<_>>()
        .join(CONTEXT_DELIMITER)
}

/// Deterministic prompt for the clinical answer. Identical inputs give byte-identical output.
pub fn build_prompt(query: &str, retrieved: &[RetrievedResult]) -> String {
    let context = build_context(retrieved);
    // Contract for the model:
    // - references are optional support, not a hard boundary
    // - cite with the bracketed ids used in the context section
    format!(
        r#"You are an advanced clinical AI assistant.
The following references may or may not be sufficient.
If they are useful, incorporate them and cite them in square brackets using their IDs, e.g. [id].
If not, use your own knowledge.

Write your answer as if advising a seasoned professional doctor.
Be precise, evidence-based, and avoid generic explanations.

CONTEXT (references for your use):
{context}

QUESTION: {query}

Provide the answer below in clear medical language:
"#
    )
}

/// Hex SHA-256 of a prompt, recorded in the trace.
pub fn prompt_fingerprint(prompt: &str) -> String {
    hex::encode(Sha256::digest(prompt.as_bytes()))
}
