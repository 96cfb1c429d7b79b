use std::cmp::Ordering;

use cka_core::domain::RetrievedResult;
use cka_core::trace::Trace;

use crate::index::{Index, KnowledgeBase, Similarity, TermVector};

pub mod similarity;

/// Score the query against every document, in corpus order. Empty when the query cannot be
/// represented (semantic index with a failed query embedding); the reason goes to the trace.
fn score_documents(kb: &KnowledgeBase, query: &str, trace: &mut Trace) -> Vec<f32> {
    match kb.index() {
        Index::Lexical(entries) => {
            let q = TermVector::from_text(query);
            entries.iter().map(|e| q.similarity(&e.vector)).collect()
        }
        Index::Semantic(semantic) => match semantic.embed_query(query) {
            Ok(q) => semantic
                .entries()
                .iter()
                .map(|e| q.similarity(&e.vector))
                .collect(),
            Err(e) => {
                trace.warn(format!("Query embedding failed, no local results: {e}"));
                Vec::new()
            }
        },
    }
}

/// Positions of the `k` best scores, descending. The sort is stable, so equal scores keep corpus order.
pub fn rank_top_k(scores: &[f32], k: usize) -> Vec<(usize, f32)> {
    let mut ranked = scores.iter().copied().enumerate().collect::<Vec<_>>();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    ranked.truncate(k);
    ranked
}

pub fn format_ids(results: &[RetrievedResult]) -> String {
    let ids = results.iter().map(|r| r.id.as_str()).collect::<Vec<_>>();
    format!("[{}]", ids.join(", "))
}

/// Top-k local retrieval. Returns at most `k` results (`k = 0` is treated as 1) ordered by
/// descending cosine score. An empty corpus yields an empty vector.
pub fn retrieve_top_k(
    kb: &KnowledgeBase,
    query: &str,
    k: usize,
    trace: &mut Trace,
) -> Vec<RetrievedResult> {
    let k = k.max(1);
    tracing::debug!(k, index = kb.index().kind(), "retrieving local documents");

    let scores = score_documents(kb, query, trace);
    let results = rank_top_k(&scores, k)
        .into_iter()
        .map(|(i, score)| RetrievedResult::from_document(&kb.documents()[i], score))
        .collect::<Vec<_>>();

    trace.push(format!(
        "Retrieved {} local documents: {}",
        results.len(),
        format_ids(&results)
    ));
    results
}
