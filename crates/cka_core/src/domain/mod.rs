use serde::{Deserialize, Serialize};

/// Source URL used for documents that do not point anywhere outside the local corpus.
pub const LOCAL_SOURCE_URL: &str = "local";

fn default_source_url() -> String {
    LOCAL_SOURCE_URL.to_string()
}

/// Where a document (and therefore a retrieved passage) came from.
///
/// The origin is assigned by the code that creates the document and is never read from the corpus
/// file, so a corpus record cannot impersonate the built-in fallback.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DocumentOrigin {
    #[default]
    Corpus,
    BuiltinFallback,
    External,
}

/// A corpus record. Immutable after load.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Document {
    pub id: String,
    pub text: String,
    #[serde(rename = "url", default = "default_source_url")]
    pub source_url: String,
    #[serde(skip_deserializing, default)]
    pub origin: DocumentOrigin,
}

impl Document {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            source_url: default_source_url(),
            origin: DocumentOrigin::Corpus,
        }
    }

    pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = url.into();
        self
    }

    pub fn with_origin(mut self, origin: DocumentOrigin) -> Self {
        self.origin = origin;
        self
    }
}

/// One passage returned by local or external retrieval, fresh per query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievedResult {
    pub id: String,
    pub text: String,
    pub score: f32,
    pub source_url: String,
    pub origin: DocumentOrigin,
}

impl RetrievedResult {
    pub fn from_document(doc: &Document, score: f32) -> Self {
        Self {
            id: doc.id.clone(),
            text: doc.text.clone(),
            score,
            source_url: doc.source_url.clone(),
            origin: doc.origin,
        }
    }
}

/// Retrieval sources a deployment may enable.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    LocalDocs,
    ExternalLiterature,
    WebSearch,
}

impl SourceKind {
    pub fn label(self) -> &'static str {
        match self {
            SourceKind::LocalDocs => "Local Docs",
            SourceKind::ExternalLiterature => "PubMed",
            SourceKind::WebSearch => "Web Search",
        }
    }
}

/// Non-fatal problem found while loading input, e.g. a skipped corpus line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoadWarning {
    pub code: String,
    pub message: String,
    pub line: Option<usize>,
}
