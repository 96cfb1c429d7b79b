//! Answer orchestration: retrieve, optionally escalate to external literature, build the prompt,
//! then walk the generation tiers (primary, local fallback, offline) until one produces an answer.
//!
//! Only configuration and input problems are returned as `Err`. Every other failure is recorded in
//! the trace and handled by moving to the next tier.

use cka_core::config::Configuration;
use cka_core::domain::{DocumentOrigin, RetrievedResult, SourceKind};
use cka_core::error::{AppError, AppResult};
use cka_core::trace::Trace;
use serde::{Deserialize, Serialize};

use crate::guardrails::cited_reference_ids;
use crate::index::KnowledgeBase;
use crate::literature::{retrieve_external, LiteratureSource};
use crate::llm::{GenerationRequest, Llm};
use crate::prompts::{build_prompt, prompt_fingerprint};
use crate::retrieve::{format_ids, retrieve_top_k};

mod render;

pub use render::{format_sources, offline_answer, NO_DOCUMENTS_MESSAGE, OFFLINE_DISCLAIMER};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GenerationTier {
    Primary,
    LocalFallback,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Answer {
    Generated {
        text: String,
        tier: GenerationTier,
        model: String,
    },
    /// Every generative tier failed; `text` holds the raw retrieved passages.
    Offline { text: String },
}

impl Answer {
    pub fn text(&self) -> &str {
        match self {
            Answer::Generated { text, .. } | Answer::Offline { text } => text,
        }
    }

    /// `None` when no generative tier succeeded.
    pub fn generated_text(&self) -> Option<&str> {
        match self {
            Answer::Generated { text, .. } => Some(text),
            Answer::Offline { .. } => None,
        }
    }

    pub fn is_offline(&self) -> bool {
        matches!(self, Answer::Offline { .. })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationOutcome {
    pub answer: Answer,
    pub trace: Vec<String>,
    pub references: Vec<RetrievedResult>,
}

/// True when the only local result is the built-in sample that replaced a missing corpus.
/// Decided by origin, so a corpus document that happens to be called `sample_1` does not count.
pub fn is_fallback_only(results: &[RetrievedResult]) -> bool {
    matches!(results, [only] if only.origin == DocumentOrigin::BuiltinFallback)
}

/// Local results are not worth prompting with: none at all, or only the built-in sample.
pub fn needs_escalation(results: &[RetrievedResult]) -> bool {
    results.is_empty() || is_fallback_only(results)
}

/// The secondary, self-hosted tier: one backend and one fixed model.
pub struct LocalFallback<'a> {
    pub llm: &'a dyn Llm,
    pub model: &'a str,
}

pub struct AnswerEngine<'a> {
    config: &'a Configuration,
    knowledge: &'a KnowledgeBase,
    primary: &'a dyn Llm,
    local_fallback: Option<LocalFallback<'a>>,
    literature: Option<&'a dyn LiteratureSource>,
}

impl<'a> AnswerEngine<'a> {
    pub fn new(config: &'a Configuration, knowledge: &'a KnowledgeBase, primary: &'a dyn Llm) -> Self {
        Self {
            config,
            knowledge,
            primary,
            local_fallback: None,
            literature: None,
        }
    }

    pub fn with_local_fallback(mut self, llm: &'a dyn Llm, model: &'a str) -> Self {
        self.local_fallback = Some(LocalFallback { llm, model });
        self
    }

    pub fn with_literature(mut self, source: &'a dyn LiteratureSource) -> Self {
        self.literature = Some(source);
        self
    }

    /// Answer one query. `Err` only for a blank query or a model outside the allow-list, both
    /// detected before any retrieval or network call.
    pub fn answer(&self, query: &str, top_k: u32, model_choice: &str) -> AppResult<GenerationOutcome> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::new("QUERY_EMPTY", "Query must not be empty"));
        }
        self.config.ensure_model_allowed(model_choice)?;

        let k = top_k.max(1) as usize;
        let mut trace = Trace::new();
        trace.push(format!("User query: {query}"));

        let references = self.gather_references(query, k, &mut trace);

        let prompt = build_prompt(query, &references);
        let fingerprint = prompt_fingerprint(&prompt);
        trace.push(format!(
            "Built prompt from {} references (sha256={})",
            references.len(),
            &fingerprint[..12]
        ));

        let answer = self.generate(&prompt, model_choice, &references, &mut trace);
        Ok(GenerationOutcome {
            answer,
            trace: trace.into_lines(),
            references,
        })
    }

    fn gather_references(&self, query: &str, k: usize, trace: &mut Trace) -> Vec<RetrievedResult> {
        if self.config.source_enabled(SourceKind::WebSearch) {
            trace.push("Web Search source is enabled but not supported; ignoring it");
        }

        let local = if self.config.source_enabled(SourceKind::LocalDocs) {
            retrieve_top_k(self.knowledge, query, k, trace)
        } else {
            trace.push("Local Docs source disabled; skipping local retrieval");
            Vec::new()
        };

        if !needs_escalation(&local) {
            return local;
        }

        match self.literature {
            Some(source) if self.config.source_enabled(SourceKind::ExternalLiterature) => {
                trace.warn(format!(
                    "Local docs not useful; switching to {}",
                    source.name()
                ));
                let external = retrieve_external(source, query, k, trace);
                trace.push(format!(
                    "Retrieved {} {} documents: {}",
                    external.len(),
                    source.name(),
                    format_ids(&external)
                ));
                if external.is_empty() && !local.is_empty() {
                    trace.push(format!(
                        "No {} documents; keeping {} local results",
                        source.name(),
                        local.len()
                    ));
                    return local;
                }
                external
            }
            _ => {
                trace.push("Local docs not useful, but external literature is not enabled; keeping local results");
                local
            }
        }
    }

    fn generate(
        &self,
        prompt: &str,
        model: &str,
        references: &[RetrievedResult],
        trace: &mut Trace,
    ) -> Answer {
        let req = GenerationRequest {
            prompt,
            model_id: model,
            max_output_tokens: self.config.generation.max_output_tokens,
        };

        trace.push(format!(
            "Calling primary model {model} ({})",
            self.primary.provider()
        ));
        match self.primary.generate(&req) {
            Ok(text) => {
                trace.push(format!(
                    "Primary model responded successfully ({})",
                    self.primary.provider()
                ));
                return generated(text, GenerationTier::Primary, model, references, trace);
            }
            Err(failure) => trace.warn(format!("Primary model failed: {failure}")),
        }

        match &self.local_fallback {
            None => trace.push("No local fallback model configured"),
            Some(local) => {
                trace.push(format!(
                    "Calling local fallback model {} ({})",
                    local.model,
                    local.llm.provider()
                ));
                let req = GenerationRequest {
                    model_id: local.model,
                    ..req
                };
                match local.llm.generate(&req) {
                    Ok(text) => {
                        trace.push(format!(
                            "Local fallback responded successfully ({})",
                            local.llm.provider()
                        ));
                        return generated(
                            text,
                            GenerationTier::LocalFallback,
                            local.model,
                            references,
                            trace,
                        );
                    }
                    Err(failure) => trace.warn(format!("Local fallback failed: {failure}")),
                }
            }
        }

        trace.warn(format!(
            "All generation tiers failed; returning offline answer with {} retrieved passages",
            references.len()
        ));
        Answer::Offline {
            text: offline_answer(references),
        }
    }
}

fn generated(
    text: String,
    tier: GenerationTier,
    model: &str,
    references: &[RetrievedResult],
    trace: &mut Trace,
) -> Answer {
    let text = text.trim().to_string();
    let cited = cited_reference_ids(&text, references);
    if cited.is_empty() {
        trace.push(format!(
            "Answer cites none of the {} references",
            references.len()
        ));
    } else {
        trace.push(format!(
            "Answer cites {} of {} references: [{}]",
            cited.len(),
            references.len(),
            cited.join(", ")
        ));
    }
    Answer::Generated {
        text,
        tier,
        model: model.to_string(),
    }
}
