//! Axon Engine Library
//!
//! Orchestration layer for the Axon AI tutor. It is used by both the main
//! binary and integration tests.

/// Configuration management module
pub mod config;

/// Secret management module
pub mod secrets;

/// Rate limiting module
pub mod rate_limiter;

/// Per-conversation state
pub mod conversation;

/// Document upload, staging and indexing
pub mod documents;

/// Fragment retrieval for prompts
pub mod context;

/// Strategy selection
pub mod strategy;

/// Prompt templates
pub mod prompts;

/// Chat model adapters
pub mod llm;

/// Web search providers
pub mod search;

/// Translation backend
pub mod translation;

/// Speech-to-text
pub mod audio;

/// Tool-using agent
pub mod agent;

/// Search-then-answer reasoning graph
pub mod graph;

/// Question pipeline
pub mod orchestrator;

/// Telemetry and Observability
pub mod telemetry;

/// CLI interface module
pub mod cli;

/// Command handlers module
pub mod handlers;
