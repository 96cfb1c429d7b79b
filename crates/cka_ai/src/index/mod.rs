//! Startup-time document index.
//!
//! A [`KnowledgeBase`] owns the loaded documents and one index entry per document. It is built once
//! and never updated; a different document set means building a new one.

use std::collections::BTreeMap;

use cka_core::config::{Configuration, IndexKind};
use cka_core::corpus::load_corpus;
use cka_core::domain::Document;
use cka_core::error::{AppError, AppResult};
use cka_core::trace::Trace;

use crate::embeddings::Embedder;
use crate::retrieve::similarity::{
    cosine_similarity, counts_norm, l2_norm, sparse_cosine_similarity,
};

pub mod tokenize;

pub use tokenize::{term_counts, tokenize};

/// Scoring primitive shared by both index variants: symmetric cosine, 0 for zero-magnitude input.
pub trait Similarity {
    fn similarity(&self, other: &Self) -> f32;
}

/// Sparse term-count vector with its magnitude cached.
#[derive(Debug, Clone, PartialEq)]
pub struct TermVector {
    counts: BTreeMap<String, u32>,
    norm: f32,
}

impl TermVector {
    pub fn from_text(text: &str) -> Self {
        let counts = term_counts(text);
        let norm = counts_norm(&counts);
        Self { counts, norm }
    }

    pub fn counts(&self) -> &BTreeMap<String, u32> {
        &self.counts
    }

    pub fn norm(&self) -> f32 {
        self.norm
    }
}

impl Similarity for TermVector {
    fn similarity(&self, other: &Self) -> f32 {
        sparse_cosine_similarity(&self.counts, &other.counts, self.norm, other.norm)
    }
}

/// Fixed-width dense embedding with its magnitude cached.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseVector {
    values: Vec<f32>,
    norm: f32,
}

impl DenseVector {
    pub fn new(values: Vec<f32>) -> Self {
        let norm = l2_norm(&values);
        Self { values, norm }
    }

    pub fn dims(&self) -> usize {
        self.values.len()
    }
}

impl Similarity for DenseVector {
    fn similarity(&self, other: &Self) -> f32 {
        if self.values.len() != other.values.len() {
            return 0.0;
        }
        cosine_similarity(&self.values, &other.values, self.norm, other.norm)
    }
}

/// One entry per document, in corpus order.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry<V> {
    pub doc_id: String,
    pub vector: V,
}

pub struct SemanticIndex {
    model: String,
    dims: usize,
    embedder: Box<dyn Embedder>,
    entries: Vec<IndexEntry<DenseVector>>,
}

impl SemanticIndex {
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    pub fn entries(&self) -> &[IndexEntry<DenseVector>] {
        &self.entries
    }

    /// Embed a query with the same model used for the documents.
    pub fn embed_query(&self, query: &str) -> Result<DenseVector, AppError> {
        let v = self.embedder.embed(&self.model, query)?;
        if !self.entries.is_empty() && v.len() != self.dims {
            return Err(AppError::new(
                "INDEX_DIMS_MISMATCH",
                "Query embedding dims do not match index dims",
            )
            .with_details(format!("index_dims={}; query_dims={}", self.dims, v.len())));
        }
        Ok(DenseVector::new(v))
    }
}

pub enum Index {
    Lexical(Vec<IndexEntry<TermVector>>),
    Semantic(SemanticIndex),
}

impl Index {
    pub fn kind(&self) -> &'static str {
        match self {
            Index::Lexical(_) => "lexical",
            Index::Semantic(_) => "semantic",
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Index::Lexical(entries) => entries.len(),
            Index::Semantic(s) => s.entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Immutable documents plus their index, shared by reference with the retriever and orchestrator.
pub struct KnowledgeBase {
    documents: Vec<Document>,
    index: Index,
}

impl KnowledgeBase {
    /// Term-count index. Infallible, linear in total corpus size.
    pub fn lexical(documents: Vec<Document>) -> Self {
        let entries = documents
            .iter()
            .map(|d| IndexEntry {
                doc_id: d.id.clone(),
                vector: TermVector::from_text(&d.text),
            })
            .collect::<Vec<_>>();
        tracing::debug!(documents = entries.len(), "built lexical index");
        Self {
            documents,
            index: Index::Lexical(entries),
        }
    }

    /// Dense index: one embedding call per document. All vectors must share one width.
    pub fn semantic(
        documents: Vec<Document>,
        embedder: Box<dyn Embedder>,
        model: &str,
    ) -> Result<Self, AppError> {
        let mut entries: Vec<IndexEntry<DenseVector>> = Vec::with_capacity(documents.len());
        let mut dims: Option<usize> = None;

        for doc in documents.iter() {
            let v = embedder.embed(model, &doc.text).map_err(|e| {
                AppError::new("INDEX_BUILD_FAILED", "Failed to compute embeddings")
                    .with_details(format!("doc_id={}; err={}", doc.id, e))
                    .with_retryable(e.retryable)
            })?;
            match dims {
                Some(d) if d != v.len() => {
                    return Err(AppError::new(
                        "INDEX_BUILD_FAILED",
                        "Embedding dimension mismatch across documents",
                    )
                    .with_details(format!("expected={}; got={}; doc_id={}", d, v.len(), doc.id)));
                }
                Some(_) => {}
                None => dims = Some(v.len()),
            }
            entries.push(IndexEntry {
                doc_id: doc.id.clone(),
                vector: DenseVector::new(v),
            });
        }

        tracing::debug!(documents = entries.len(), model, "built semantic index");
        Ok(Self {
            documents,
            index: Index::Semantic(SemanticIndex {
                model: model.to_string(),
                dims: dims.unwrap_or(0),
                embedder,
                entries,
            }),
        })
    }

    /// Startup path: reject a model outside the allow-list, then load the configured corpus and
    /// build the configured index. Nothing is read or embedded for a rejected model.
    ///
    /// A semantic index that cannot be built (no embedder, or an embedding failure) degrades to the
    /// lexical index with a trace warning.
    pub fn open(
        config: &Configuration,
        model_choice: &str,
        embedder: Option<Box<dyn Embedder>>,
        trace: &mut Trace,
    ) -> AppResult<Self> {
        config.ensure_model_allowed(model_choice)?;

        let corpus = load_corpus(&config.retrieval.corpus_path, trace);
        for w in &corpus.warnings {
            tracing::debug!(code = %w.code, line = ?w.line, "{}", w.message);
        }

        if config.retrieval.index == IndexKind::Lexical {
            return Ok(Self::lexical(corpus.documents));
        }
        let Some(embedder) = embedder else {
            trace.warn("Semantic index requested without an embedder, using lexical index");
            return Ok(Self::lexical(corpus.documents));
        };

        let model = &config.retrieval.embedding_model;
        match Self::semantic(corpus.documents.clone(), embedder, model) {
            Ok(kb) => {
                trace.push(format!("Built semantic index with {model}"));
                Ok(kb)
            }
            Err(e) => {
                trace.warn(format!("Semantic index unavailable, using lexical index: {e}"));
                Ok(Self::lexical(corpus.documents))
            }
        }
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn index(&self) -> &Index {
        &self.index
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}
