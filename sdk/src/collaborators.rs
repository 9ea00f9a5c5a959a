//! Collaborator traits
//!
//! The engine reaches every external service (model inference, web search,
//! translation, document indexing, speech-to-text) through one of these
//! narrow traits. Concrete HTTP-backed implementations live in the engine;
//! tests plug in in-memory doubles.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

use crate::errors::Result;
use crate::types::{DocumentKind, Fragment, GraphState, Message, PageText, SearchHit};

/// A chat-completion model
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Returns the provider name (e.g., "groq", "openai")
    fn name(&self) -> &str;

    /// Generate a completion for a rendered prompt
    async fn generate(&self, messages: &[Message]) -> Result<String>;
}

/// A web search backend returning a bounded, ordered list of hits
#[async_trait]
pub trait SearchProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn search(&self, query: &str) -> Result<Vec<SearchHit>>;
}

/// A live multi-step tool-using agent bound to one conversation
#[async_trait]
pub trait ToolAgent: Send + Sync {
    /// Answer a question, calling tools as needed up to the step limit
    async fn run(&self, question: &str) -> Result<String>;

    /// Forget the agent's own running transcript
    async fn clear_memory(&self) {}

    /// Release every tool session the agent owns
    async fn close(&self) -> Result<()>;
}

/// Creates agent sessions on demand
#[async_trait]
pub trait ToolAgentFactory: Send + Sync {
    async fn create(&self) -> Result<Arc<dyn ToolAgent>>;
}

/// A graph-structured reasoning agent
#[async_trait]
pub trait GraphAgent: Send + Sync {
    /// Run the graph from `initial` to its terminal node
    async fn invoke(&self, initial: GraphState) -> Result<GraphState>;
}

/// Text translation and language detection
#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate `text` into `target`; `source` of `None` lets the backend detect it
    async fn translate(&self, text: &str, source: Option<&str>, target: &str) -> Result<String>;

    /// Detect the language of `text`, returning a code such as "fr"
    async fn detect(&self, text: &str) -> Result<String>;
}

/// A searchable index built over one uploaded document
#[async_trait]
pub trait DocumentIndex: Send + Sync {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<Fragment>>;
}

/// Extracts text from a staged upload
#[async_trait]
pub trait DocumentLoader: Send + Sync {
    /// Whether this loader can read `kind`
    fn supports(&self, kind: DocumentKind) -> bool;

    async fn load(&self, path: &Path, kind: DocumentKind) -> Result<Vec<PageText>>;
}

/// Builds a searchable index from loaded pages
#[async_trait]
pub trait IndexBuilder: Send + Sync {
    async fn build(&self, pages: Vec<PageText>) -> Result<Arc<dyn DocumentIndex>>;
}

/// Speech-to-text backend
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: &Path, language: &str) -> Result<String>;
}

/// Loads a local speech model for a size variant ("tiny", "base", ...)
#[async_trait]
pub trait SpeechModelLoader: Send + Sync {
    async fn load(&self, variant: &str) -> Result<Arc<dyn Transcriber>>;
}
