use cka_core::domain::RetrievedResult;

/// Reference ids cited as `[id]` in a generated answer, in reference order.
///
/// Generation is not rejected when this is empty; the orchestrator only reports it in the trace.
pub fn cited_reference_ids(answer: &str, references: &[RetrievedResult]) -> Vec<String> {
    references
        .iter()
        .filter(|r| answer.contains(&format!("[{}]", r.id)))
        .map(|r| r.id.clone())
        .collect()
}
