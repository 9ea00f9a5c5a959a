use axon_sdk::collaborators::SearchProvider;
use axon_sdk::types::format_search_context;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::rate_limiter::RateLimiter;

/// Tools the agent may call.
///
/// Errors are returned as text so the model can see them and correct itself.
/// Every outbound search waits on the shared web_search limiter.
pub struct AgentTools {
    web_search: Option<(Arc<dyn SearchProvider>, Arc<RateLimiter>)>,
}

impl AgentTools {
    pub fn empty() -> Self {
        Self { web_search: None }
    }

    pub fn with_web_search(search: Arc<dyn SearchProvider>, limiter: Arc<RateLimiter>) -> Self {
        Self {
            web_search: Some((search, limiter)),
        }
    }

    /// Dispatch a tool call by name with JSON-encoded arguments
    pub async fn dispatch(&self, name: &str, arguments_json: &str) -> String {
        debug!("Dispatching tool '{}' with args: {}", name, arguments_json);

        let args: serde_json::Value = match serde_json::from_str(arguments_json) {
            Ok(v) => v,
            Err(e) => return format!("ERROR: Failed to parse arguments JSON: {}", e),
        };

        match name {
            "web_search" => {
                let Some((ref search, ref limiter)) = self.web_search else {
                    return "ERROR: web_search tool is not enabled".to_string();
                };
                let query = args
                    .get("query")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .trim();
                if query.is_empty() {
                    return "ERROR: web_search requires a non-empty \"query\"".to_string();
                }

                limiter.acquire().await;
                match search.search(query).await {
                    Ok(hits) if hits.is_empty() => format!("No results found for '{}'", query),
                    Ok(hits) => format_search_context(&hits),
                    Err(e) => format!("ERROR: {}", e),
                }
            }
            _ => {
                warn!("Unknown tool requested: {}", name);
                format!(
                    "ERROR: Unknown tool '{}'. Available tools: {}",
                    name,
                    self.available_tool_names().join(", ")
                )
            }
        }
    }

    pub fn available_tool_names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.web_search.is_some() {
            names.push("web_search");
        }
        names
    }
}
