//! Tool-using agent
//!
//! A multi-step agent that can search the web before answering. One session
//! is created lazily per conversation by `WebToolAgentFactory` and kept until
//! the conversation is removed.

pub mod core;
pub mod tools;
pub mod working_memory;

pub use self::core::WebToolAgent;
pub use tools::AgentTools;
pub use working_memory::WorkingMemory;

use async_trait::async_trait;
use axon_sdk::collaborators::{ChatModel, SearchProvider, ToolAgent, ToolAgentFactory};
use axon_sdk::errors::Result;
use std::sync::Arc;

use crate::config::AgentConfig;
use crate::rate_limiter::RateLimiter;

/// Creates `WebToolAgent` sessions sharing one model, search backend and limiter
pub struct WebToolAgentFactory {
    model: Arc<dyn ChatModel>,
    tools: Arc<AgentTools>,
    max_steps: usize,
    memory_enabled: bool,
}

impl WebToolAgentFactory {
    pub fn new(
        model: Arc<dyn ChatModel>,
        search: Arc<dyn SearchProvider>,
        limiter: Arc<RateLimiter>,
        config: &AgentConfig,
    ) -> Self {
        Self {
            model,
            tools: Arc::new(AgentTools::with_web_search(search, limiter)),
            max_steps: config.max_steps,
            memory_enabled: config.memory_enabled,
        }
    }
}

#[async_trait]
impl ToolAgentFactory for WebToolAgentFactory {
    async fn create(&self) -> Result<Arc<dyn ToolAgent>> {
        tracing::debug!("Creating agent session (max {} steps)", self.max_steps);
        Ok(Arc::new(WebToolAgent::new(
            Arc::clone(&self.model),
            Arc::clone(&self.tools),
            self.max_steps,
            self.memory_enabled,
        )))
    }
}

/// Collect the text after each `Source:` marker up to the end of its line
pub fn extract_sources(answer: &str) -> Vec<String> {
    answer
        .split("Source:")
        .skip(1)
        .filter_map(|part| part.trim().lines().next())
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_sources() {
        let answer = "Mars has two moons.\nSource: https://nasa.gov/mars\nSource:  https://esa.int \n";
        assert_eq!(
            extract_sources(answer),
            vec!["https://nasa.gov/mars".to_string(), "https://esa.int".to_string()]
        );
    }

    #[test]
    fn test_extract_sources_none() {
        assert!(extract_sources("No citations here.").is_empty());
        assert!(extract_sources("Source:\n").is_empty());
    }

    #[test]
    fn test_extract_sources_inline_marker() {
        assert_eq!(
            extract_sources("See Source: https://a.edu for more"),
            vec!["https://a.edu for more".to_string()]
        );
    }
}
