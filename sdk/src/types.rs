//! Value types shared between the engine and collaborator adapters

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Message exchanged with a chat model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Role of the message sender (user, assistant, system, tool)
    pub role: MessageRole,

    /// Content of the message
    pub content: String,

    /// Optional tool call ID for tool result messages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    /// Create a new user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            tool_call_id: None,
        }
    }

    /// Create a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            tool_call_id: None,
        }
    }

    /// Create a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
            tool_call_id: None,
        }
    }

    /// Create a new tool result message
    pub fn tool_result(content: impl Into<String>, tool_call_id: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Tool,
            content: content.into(),
            tool_call_id: Some(tool_call_id.into()),
        }
    }
}

/// Role of a message sender
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
    Tool,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
            MessageRole::System => write!(f, "system"),
            MessageRole::Tool => write!(f, "tool"),
        }
    }
}

/// Who said a conversation turn
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
}

impl From<Speaker> for MessageRole {
    fn from(speaker: Speaker) -> Self {
        match speaker {
            Speaker::User => MessageRole::User,
            Speaker::Assistant => MessageRole::Assistant,
        }
    }
}

/// One entry of a conversation's memory
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Turn {
    pub speaker: Speaker,
    pub text: String,
    pub at: DateTime<Utc>,
}

impl Turn {
    pub fn new(speaker: Speaker, text: impl Into<String>) -> Self {
        Self {
            speaker,
            text: text.into(),
            at: Utc::now(),
        }
    }

    /// Convert the turn into a chat message for prompting
    pub fn to_message(&self) -> Message {
        Message {
            role: self.speaker.into(),
            content: self.text.clone(),
            tool_call_id: None,
        }
    }
}

/// A retrieved snippet of an uploaded document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Fragment {
    pub content: String,

    /// Page or location marker, when the loader knows one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

impl Fragment {
    pub fn new(content: impl Into<String>, page: Option<u32>) -> Self {
        Self {
            content: content.into(),
            page,
        }
    }
}

/// Text of one page (or row, for tabular files) produced by a loader
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PageText {
    pub text: String,
    pub page: Option<u32>,
}

/// A single web search result
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    pub url: String,
    pub title: String,
    pub content: String,
}

impl SearchHit {
    pub fn new(
        url: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            content: content.into(),
        }
    }
}

/// Format search hits as a prompt context block
pub fn format_search_context(hits: &[SearchHit]) -> String {
    hits.iter()
        .map(|h| format!("Source: {}\nTitle: {}\nContent: {}", h.url, h.title, h.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// State threaded through a graph-structured agent
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GraphState {
    pub question: String,
    pub context: String,
    pub file_context: String,
    pub search_results: Vec<SearchHit>,
    pub need_search: bool,
    pub final_answer: String,
}

impl GraphState {
    /// Initial state for a question, with optional uploaded-file context
    pub fn initial(question: impl Into<String>, file_context: Option<&str>) -> Self {
        Self {
            question: question.into(),
            file_context: file_context.unwrap_or_default().to_string(),
            ..Self::default()
        }
    }
}

/// Supported upload formats
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Pdf,
    Docx,
    Text,
    Csv,
}

impl DocumentKind {
    /// Classify a filename by extension (case-insensitive)
    pub fn from_filename(filename: &str) -> Option<Self> {
        let ext = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())?
            .to_lowercase();

        match ext.as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" | "doc" => Some(Self::Docx),
            "txt" => Some(Self::Text),
            "csv" => Some(Self::Csv),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_creation() {
        let user_msg = Message::user("Hello");
        assert_eq!(user_msg.role, MessageRole::User);
        assert_eq!(user_msg.tool_call_id, None);

        let tool_msg = Message::tool_result("result", "call_123");
        assert_eq!(tool_msg.role, MessageRole::Tool);
        assert_eq!(tool_msg.tool_call_id, Some("call_123".to_string()));
    }

    #[test]
    fn test_turn_to_message() {
        let turn = Turn::new(Speaker::Assistant, "F = ma");
        let msg = turn.to_message();
        assert_eq!(msg.role, MessageRole::Assistant);
        assert_eq!(msg.content, "F = ma");
    }

    #[test]
    fn test_document_kind_from_filename() {
        assert_eq!(DocumentKind::from_filename("notes.PDF"), Some(DocumentKind::Pdf));
        assert_eq!(DocumentKind::from_filename("essay.doc"), Some(DocumentKind::Docx));
        assert_eq!(DocumentKind::from_filename("data.csv"), Some(DocumentKind::Csv));
        assert_eq!(DocumentKind::from_filename("a.txt"), Some(DocumentKind::Text));
        assert_eq!(DocumentKind::from_filename("image.png"), None);
        assert_eq!(DocumentKind::from_filename("README"), None);
    }

    #[test]
    fn test_format_search_context() {
        let hits = vec![
            SearchHit::new("https://a.edu", "A", "alpha"),
            SearchHit::new("https://b.org", "B", "beta"),
        ];
        let ctx = format_search_context(&hits);
        assert_eq!(
            ctx,
            "Source: https://a.edu\nTitle: A\nContent: alpha\nSource: https://b.org\nTitle: B\nContent: beta"
        );
    }

    #[test]
    fn test_graph_state_initial() {
        let state = GraphState::initial("Why is the sky blue?", Some("From notes.txt:\nlight"));
        assert_eq!(state.file_context, "From notes.txt:\nlight");
        assert!(state.search_results.is_empty());
        assert!(!state.need_search);
        assert!(state.final_answer.is_empty());
    }
}
