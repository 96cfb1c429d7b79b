use cka_core::domain::{DocumentOrigin, RetrievedResult};
use cka_core::error::AppError;
use cka_core::trace::Trace;

pub mod pubmed;

pub use pubmed::PubMedClient;

/// Score given to every external result; the remote search does not expose a comparable score.
pub const UNRANKED_SCORE: f32 = 1.0;

/// A fetched external record, already shaped as a pseudo-document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalRecord {
    pub id: String,
    pub text: String,
    pub url: String,
}

/// Two-step remote literature search.
pub trait LiteratureSource {
    /// Label used in trace lines, e.g. "PubMed".
    fn name(&self) -> &str;

    /// External identifiers matching `query`, at most `max_results`.
    fn search(&self, query: &str, max_results: usize) -> Result<Vec<String>, AppError>;

    /// Records for `ids`, in the same order.
    fn fetch(&self, ids: &[String]) -> Result<Vec<ExternalRecord>, AppError>;
}

/// Search then fetch. Any failure degrades to an empty result with a trace line; nothing is raised.
pub fn retrieve_external(
    source: &dyn LiteratureSource,
    query: &str,
    k: usize,
    trace: &mut Trace,
) -> Vec<RetrievedResult> {
    let k = k.max(1);

    let mut ids = match source.search(query, k) {
        Ok(ids) => ids,
        Err(e) => {
            trace.warn(format!("{} search failed: {e}", source.name()));
            return Vec::new();
        }
    };
    ids.truncate(k);
    if ids.is_empty() {
        trace.push(format!("{} search returned no results", source.name()));
        return Vec::new();
    }

    let records = match source.fetch(&ids) {
        Ok(records) => records,
        Err(e) => {
            trace.warn(format!("{} fetch failed: {e}", source.name()));
            return Vec::new();
        }
    };

    records
        .into_iter()
        .take(k)
        .map(|r| RetrievedResult {
            id: r.id,
            text: r.text,
            score: UNRANKED_SCORE,
            source_url: r.url,
            origin: DocumentOrigin::External,
        })
        .collect()
}
