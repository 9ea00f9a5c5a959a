//! Axon SDK
//!
//! Shared library providing the error taxonomy, value types and collaborator
//! traits used by the Axon engine and its service adapters.

/// Collaborator traits
pub mod collaborators;

/// Error types and handling
pub mod errors;

/// Shared value types
pub mod types;

// Re-export commonly used types
pub use collaborators::{
    ChatModel, DocumentIndex, DocumentLoader, GraphAgent, IndexBuilder, SearchProvider,
    SpeechModelLoader, ToolAgent, ToolAgentFactory, Transcriber, Translator,
};
pub use errors::{Result, TutorError, TutorErrorExt};
pub use types::{
    format_search_context, DocumentKind, Fragment, GraphState, Message, MessageRole, PageText,
    SearchHit, Speaker, Turn,
};
