pub mod answer;
pub mod embeddings;
pub mod guardrails;
pub mod index;
pub mod literature;
pub mod llm;
pub mod ollama;
pub mod prompts;
pub mod retrieve;
