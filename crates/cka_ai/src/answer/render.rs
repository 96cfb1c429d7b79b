use cka_core::domain::RetrievedResult;

use crate::prompts::build_context;

pub const OFFLINE_DISCLAIMER: &str = "⚠️ Offline fallback: no language model produced an answer. The retrieved passages are shown verbatim below; this is not a generated answer.";

pub const NO_DOCUMENTS_MESSAGE: &str = "⚠️ Offline fallback: no language model produced an answer and no documents were retrieved for this query.";

/// Non-generative answer: the disclaimer followed by every reference as `"[id] text"`.
pub fn offline_answer(references: &[RetrievedResult]) -> String {
    if references.is_empty() {
        return NO_DOCUMENTS_MESSAGE.to_string();
    }
    format!("{OFFLINE_DISCLAIMER}\n\n{}", build_context(references))
}

/// Provenance block shown under an answer.
pub fn format_sources(references: &[RetrievedResult]) -> String {
    if references.is_empty() {
        return "Sources used: none".to_string();
    }
    let mut out = String::from("Sources used:");
    for r in references {
        out.push_str(&format!("\n- {} (score={:.3}) {}", r.id, r.score, r.source_url));
    }
    out
}
