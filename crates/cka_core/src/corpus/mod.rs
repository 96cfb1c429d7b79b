use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::demo::fallback_document;
use crate::domain::{Document, LoadWarning};
use crate::error::AppError;
use crate::trace::Trace;

/// Result of parsing corpus text: the valid documents in file order plus one warning per skipped line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CorpusParse {
    pub documents: Vec<Document>,
    pub warnings: Vec<LoadWarning>,
}

/// What `load_corpus` ended up with.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CorpusLoad {
    pub documents: Vec<Document>,
    pub warnings: Vec<LoadWarning>,
    /// Set when the built-in sample replaced the configured corpus.
    pub fallback_reason: Option<String>,
}

impl CorpusLoad {
    pub fn used_fallback(&self) -> bool {
        self.fallback_reason.is_some()
    }
}

fn warning(code: &str, message: impl Into<String>, line: usize) -> LoadWarning {
    LoadWarning {
        code: code.to_string(),
        message: message.into(),
        line: Some(line),
    }
}

/// Parse newline-delimited JSON records (`id`, `text`, optional `url`).
///
/// Blank lines are ignored. Lines that are not JSON objects, lack a non-blank `id` or `text`, or
/// repeat an earlier id are skipped with a warning.
pub fn parse_corpus(text: &str) -> CorpusParse {
    let mut documents = Vec::new();
    let mut warnings = Vec::new();
    let mut seen: BTreeSet<String> = BTreeSet::new();

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        let mut doc: Document = match serde_json::from_str(line) {
            Ok(d) => d,
            Err(e) => {
                warnings.push(warning(
                    "CORPUS_LINE_INVALID",
                    format!("Line is not a valid document record: {e}"),
                    line_no,
                ));
                continue;
            }
        };

        let id = doc.id.trim().to_string();
        if id.is_empty() {
            warnings.push(warning("CORPUS_ID_MISSING", "Document id is blank", line_no));
            continue;
        }
        if doc.text.trim().is_empty() {
            warnings.push(warning(
                "CORPUS_TEXT_MISSING",
                format!("Document {id} has blank text"),
                line_no,
            ));
            continue;
        }
        if !seen.insert(id.clone()) {
            warnings.push(warning(
                "CORPUS_ID_DUPLICATE",
                format!("Document id {id} already loaded; keeping the first record"),
                line_no,
            ));
            continue;
        }

        doc.id = id;
        if doc.source_url.trim().is_empty() {
            doc.source_url = crate::domain::LOCAL_SOURCE_URL.to_string();
        }
        documents.push(doc);
    }

    CorpusParse { documents, warnings }
}

fn read_corpus_file(path: &Path) -> Result<CorpusParse, AppError> {
    let raw = fs::read_to_string(path).map_err(|e| {
        AppError::new("CORPUS_READ_FAILED", "Failed to read corpus file")
            .with_details(format!("path={}; err={}", path.display(), e))
    })?;
    let parsed = parse_corpus(&raw);
    if parsed.documents.is_empty() {
        return Err(AppError::new("CORPUS_EMPTY", "Corpus file has no valid documents")
            .with_details(format!(
                "path={}; skipped_lines={}",
                path.display(),
                parsed.warnings.len()
            )));
    }
    Ok(parsed)
}

/// Load the corpus at `path`. Never fails: a missing, unreadable or empty file yields the single
/// built-in sample document. Appends one trace line describing the outcome.
pub fn load_corpus(path: &Path, trace: &mut Trace) -> CorpusLoad {
    match read_corpus_file(path) {
        Ok(parsed) => {
            for w in parsed.warnings.iter() {
                tracing::warn!(code = %w.code, line = ?w.line, "{}", w.message);
            }
            if parsed.warnings.is_empty() {
                trace.push(format!(
                    "Loaded {} documents from {}",
                    parsed.documents.len(),
                    path.display()
                ));
            } else {
                trace.push(format!(
                    "Loaded {} documents from {} (skipped {} malformed lines)",
                    parsed.documents.len(),
                    path.display(),
                    parsed.warnings.len()
                ));
            }
            CorpusLoad {
                documents: parsed.documents,
                warnings: parsed.warnings,
                fallback_reason: None,
            }
        }
        Err(e) => {
            let reason = e.to_string();
            trace.warn(format!(
                "Could not load {}, using built-in sample document: {reason}",
                path.display()
            ));
            CorpusLoad {
                documents: vec![fallback_document()],
                warnings: Vec::new(),
                fallback_reason: Some(reason),
            }
        }
    }
}
