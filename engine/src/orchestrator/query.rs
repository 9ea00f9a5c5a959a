use serde::{Deserialize, Serialize};

use crate::strategy::{Strategy, StrategyPreferences};

/// A student's question
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TutorQuery {
    pub question: String,

    /// Conversation to continue; a new one is created when absent
    #[serde(default)]
    pub conversation_id: Option<String>,

    /// Language of the question: a code, "english", or "auto" to detect
    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default)]
    pub preferences: StrategyPreferences,
}

fn default_language() -> String {
    "en".to_string()
}

impl TutorQuery {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            conversation_id: None,
            language: default_language(),
            preferences: StrategyPreferences::default(),
        }
    }

    pub fn in_conversation(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_preferences(mut self, preferences: StrategyPreferences) -> Self {
        self.preferences = preferences;
        self
    }
}

/// The tutor's reply
#[derive(Debug, Clone, Serialize)]
pub struct TutorAnswer {
    pub answer: String,
    pub conversation_id: String,
    pub sources: Vec<String>,

    /// Language as requested by the caller
    pub language: String,

    /// Language the question was translated from, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translated_from: Option<String>,

    pub strategy: Strategy,
}

/// Result of a standalone translation
#[derive(Debug, Clone, Serialize)]
pub struct TranslationResult {
    pub original_text: String,
    pub translated_text: String,
    pub source_language: String,
    pub target_language: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_defaults_from_json() {
        let query: TutorQuery = serde_json::from_str(r#"{"question": "Why is the sky blue?"}"#).unwrap();
        assert_eq!(query.language, "en");
        assert!(query.conversation_id.is_none());
        assert_eq!(query.preferences, StrategyPreferences::default());
    }

    #[test]
    fn test_answer_serializes_strategy_in_snake_case() {
        let answer = TutorAnswer {
            answer: "a".into(),
            conversation_id: "conv_1".into(),
            sources: vec![],
            language: "en".into(),
            translated_from: None,
            strategy: Strategy::DirectSearch,
        };
        let json = serde_json::to_value(&answer).unwrap();
        assert_eq!(json["strategy"], "direct_search");
        assert!(json.get("translated_from").is_none());
    }
}
