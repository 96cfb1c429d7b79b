use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use cka_ai::answer::{format_sources, AnswerEngine, GenerationOutcome};
use cka_ai::embeddings::ollama_embed::OllamaEmbedder;
use cka_ai::embeddings::Embedder;
use cka_ai::index::KnowledgeBase;
use cka_ai::literature::PubMedClient;
use cka_ai::llm::gemini::GeminiLlm;
use cka_ai::llm::huggingface::HuggingFaceLlm;
use cka_ai::llm::ollama_llm::OllamaLlm;
use cka_ai::llm::Llm;
use cka_ai::ollama::OllamaClient;
use cka_core::config::{Configuration, Credentials, GenerationProvider, IndexKind};
use cka_core::domain::SourceKind;
use cka_core::trace::Trace;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "clinicalkey")]
#[command(about = "Answer clinical questions from a local corpus and PubMed", long_about = None)]
#[command(version)]
struct Cli {
    #[arg(short, long, help = "Configuration file (defaults to ./clinicalkey.toml when present)")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Answer one question")]
    Ask {
        query: String,

        #[arg(short = 'k', long, help = "Number of references to retrieve")]
        top_k: Option<u32>,

        #[arg(short, long, help = "Primary model id (must be in the allow-list)")]
        model: Option<String>,

        #[arg(long, help = "Print the full outcome as JSON")]
        json: bool,
    },

    #[command(about = "Show the effective configuration")]
    Config,

    #[command(about = "Check that the local Ollama endpoint is reachable")]
    Health,
}

#[derive(Debug, serde::Serialize)]
struct AskOutput<'a> {
    #[serde(flatten)]
    outcome: &'a GenerationOutcome,
    startup_trace: &'a [String],
}

#[derive(Debug, serde::Serialize)]
struct HealthStatus {
    ok: bool,
    message: String,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Configuration::load(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Commands::Ask {
            query,
            top_k,
            model,
            json,
        } => ask(&config, &query, top_k, model.as_deref(), json),
        Commands::Config => show_config(&config),
        Commands::Health => health(&config),
    }
}

fn ask(config: &Configuration, query: &str, top_k: Option<u32>, model: Option<&str>, json: bool) -> Result<()> {
    let model = model.unwrap_or(config.generation.primary_model.as_str());
    let top_k = top_k.unwrap_or(config.retrieval.top_k);
    let credentials = Credentials::from_env(config.generation.provider)?;

    let embedder: Option<Box<dyn Embedder>> = match config.retrieval.index {
        IndexKind::Lexical => None,
        IndexKind::Semantic => Some(Box::new(OllamaEmbedder::new(ollama_client(config)?))),
    };
    let mut startup = Trace::new();
    let knowledge = KnowledgeBase::open(config, model, embedder, &mut startup)?;

    let timeout = Duration::from_secs(config.generation.timeout_secs);
    let primary: Box<dyn Llm> = match config.generation.provider {
        GenerationProvider::Gemini => Box::new(GeminiLlm::new(credentials.api_key, timeout)),
        GenerationProvider::HuggingFace => Box::new(HuggingFaceLlm::new(credentials.api_key, timeout)),
    };

    let local = match &config.generation.local_fallback_model {
        Some(model) => Some((OllamaLlm::new(ollama_client(config)?), model.as_str())),
        None => None,
    };

    let pubmed = if config.source_enabled(SourceKind::ExternalLiterature) {
        Some(PubMedClient::new(&config.literature))
    } else {
        None
    };

    let mut engine = AnswerEngine::new(config, &knowledge, primary.as_ref());
    if let Some((llm, model)) = &local {
        engine = engine.with_local_fallback(llm, model);
    }
    if let Some(client) = &pubmed {
        engine = engine.with_literature(client);
    }

    let outcome = engine.answer(query, top_k, model)?;

    if json {
        let out = AskOutput {
            outcome: &outcome,
            startup_trace: startup.lines(),
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("{}", outcome.answer.text());
    if !outcome.references.is_empty() {
        println!();
        println!("{}", format_sources(&outcome.references));
    }
    println!();
    println!("Trace:");
    for line in startup.lines().iter().chain(outcome.trace.iter()) {
        println!("  {line}");
    }
    Ok(())
}

fn ollama_client(config: &Configuration) -> Result<OllamaClient> {
    let client = OllamaClient::new(&config.ollama.base_url)?
        .with_timeout(Duration::from_secs(config.ollama.timeout_secs));
    Ok(client)
}

fn show_config(config: &Configuration) -> Result<()> {
    let mut shown = config.clone();
    if shown.literature.api_key.is_some() {
        shown.literature.api_key = Some("<redacted>".to_string());
    }
    println!("{}", serde_json::to_string_pretty(&shown)?);

    let var = config.generation.provider.credential_env();
    let present = Credentials::from_env(config.generation.provider).is_ok();
    println!();
    println!("{var}: {}", if present { "set" } else { "missing" });
    Ok(())
}

fn health(config: &Configuration) -> Result<()> {
    let client = ollama_client(config)?;
    let status = match client.health_check() {
        Ok(()) => HealthStatus {
            ok: true,
            message: format!("Ollama reachable at {}", client.base_url()),
        },
        Err(e) => HealthStatus {
            ok: false,
            message: e.to_string(),
        },
    };
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}
