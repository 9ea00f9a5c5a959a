//! Agent working memory
//!
//! The running transcript of one agent session: system prompt, questions,
//! tool calls, tool results and answers. When the estimated size passes the
//! context limit the oldest entries after the system prompt are dropped.

use axon_sdk::types::{Message, MessageRole};

/// Default context budget in tokens
const DEFAULT_CONTEXT_LIMIT: usize = 8000;

/// Rough size of one token in characters
const CHARS_PER_TOKEN: usize = 4;

/// Per-message overhead for role and framing, in tokens
const MESSAGE_OVERHEAD: usize = 10;

#[derive(Debug, Clone)]
pub struct WorkingMemory {
    messages: Vec<Message>,
    context_limit: usize,
    token_count: usize,
}

impl WorkingMemory {
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_CONTEXT_LIMIT)
    }

    pub fn with_limit(context_limit: usize) -> Self {
        Self {
            messages: Vec::new(),
            context_limit,
            token_count: 0,
        }
    }

    /// Append a message, trimming old entries when over budget
    pub fn push(&mut self, message: Message) {
        self.token_count += estimate_tokens(&message);
        self.messages.push(message);

        if self.token_count > self.context_limit {
            self.trim();
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn token_count(&self) -> usize {
        self.token_count
    }

    pub fn clear(&mut self) {
        self.messages.clear();
        self.token_count = 0;
    }

    /// Drop the oldest non-system messages until within budget, always
    /// keeping the two most recent
    fn trim(&mut self) {
        let keep_head = match self.messages.first() {
            Some(m) if m.role == MessageRole::System => 1,
            _ => 0,
        };

        while self.token_count > self.context_limit && self.messages.len() > keep_head + 2 {
            let removed = self.messages.remove(keep_head);
            self.token_count = self.token_count.saturating_sub(estimate_tokens(&removed));
        }
    }
}

impl Default for WorkingMemory {
    fn default() -> Self {
        Self::new()
    }
}

fn estimate_tokens(message: &Message) -> usize {
    let chars = message.content.len() + message.tool_call_id.as_ref().map_or(0, |id| id.len());
    chars.div_ceil(CHARS_PER_TOKEN) + MESSAGE_OVERHEAD
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_tracks_tokens() {
        let mut memory = WorkingMemory::new();
        memory.push(Message::user("abcd"));
        assert_eq!(memory.len(), 1);
        assert_eq!(memory.token_count(), 1 + MESSAGE_OVERHEAD);
    }

    #[test]
    fn test_trim_keeps_system_prompt_and_recent_messages() {
        let mut memory = WorkingMemory::with_limit(60);
        memory.push(Message::system("tutor"));
        for i in 0..10 {
            memory.push(Message::user(format!("question number {} with padding text", i)));
        }

        let messages = memory.messages();
        assert_eq!(messages[0].role, MessageRole::System);
        assert!(messages.len() < 11);
        assert!(messages
            .last()
            .map(|m| m.content.contains("number 9"))
            .unwrap_or(false));
        assert!(memory.token_count() <= 60 || memory.len() == 3);
    }

    #[test]
    fn test_clear() {
        let mut memory = WorkingMemory::new();
        memory.push(Message::system("tutor"));
        memory.clear();
        assert!(memory.is_empty());
        assert_eq!(memory.token_count(), 0);
    }
}
