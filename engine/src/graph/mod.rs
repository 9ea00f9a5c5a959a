//! Reasoning graph
//!
//! `TutorGraph` walks a fixed state graph over `GraphState`:
//!
//! ```text
//! determine_search ──need_search──▶ search ──▶ answer ──▶ end
//!        └──────────────otherwise──────────────▶ answer
//! ```
//!
//! The first node asks the model for a `{"need_search": bool}` verdict,
//! falling back to the keyword heuristic when the reply is not usable JSON.

use async_trait::async_trait;
use axon_sdk::collaborators::{ChatModel, GraphAgent, SearchProvider};
use axon_sdk::errors::Result;
use axon_sdk::types::{format_search_context, GraphState};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::llm::extract_json_object;
use crate::prompts;
use crate::rate_limiter::RateLimiter;
use crate::strategy::needs_external_tools;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Node {
    DetermineSearch,
    Search,
    Answer,
    End,
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Node::DetermineSearch => "determine_search",
            Node::Search => "search",
            Node::Answer => "answer",
            Node::End => "end",
        };
        write!(f, "{}", name)
    }
}

pub struct TutorGraph {
    model: Arc<dyn ChatModel>,
    search: Option<Arc<dyn SearchProvider>>,
    limiter: Option<Arc<RateLimiter>>,
}

impl TutorGraph {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self {
            model,
            search: None,
            limiter: None,
        }
    }

    /// Enable the search node, throttled by `limiter`
    pub fn with_search(mut self, search: Arc<dyn SearchProvider>, limiter: Arc<RateLimiter>) -> Self {
        self.search = Some(search);
        self.limiter = Some(limiter);
        self
    }

    async fn determine_search(&self, state: &mut GraphState) -> Result<Node> {
        let reply = self
            .model
            .generate(&prompts::search_decision(&state.question))
            .await?;

        state.need_search = match extract_json_object(&reply)
            .and_then(|v| v.get("need_search").and_then(|n| n.as_bool()))
        {
            Some(verdict) => verdict,
            None => {
                debug!("Search verdict not parseable, using keyword heuristic");
                needs_external_tools(&state.question)
            }
        };

        Ok(if state.need_search {
            Node::Search
        } else {
            Node::Answer
        })
    }

    async fn search(&self, state: &mut GraphState) -> Result<Node> {
        let Some(search) = &self.search else {
            warn!("Search requested but no search provider is configured");
            return Ok(Node::Answer);
        };

        if let Some(limiter) = &self.limiter {
            limiter.acquire().await;
        }

        let hits = search.search(&state.question).await?;
        state.context = format_search_context(&hits);
        state.search_results = hits;
        Ok(Node::Answer)
    }

    async fn answer(&self, state: &mut GraphState) -> Result<Node> {
        state.final_answer = self.model.generate(&prompts::graph_answer(state)).await?;
        Ok(Node::End)
    }
}

#[async_trait]
impl GraphAgent for TutorGraph {
    async fn invoke(&self, initial: GraphState) -> Result<GraphState> {
        let mut state = initial;
        let mut node = Node::DetermineSearch;

        while node != Node::End {
            debug!("Graph node: {}", node);
            node = match node {
                Node::DetermineSearch => self.determine_search(&mut state).await?,
                Node::Search => self.search(&mut state).await?,
                Node::Answer => self.answer(&mut state).await?,
                Node::End => Node::End,
            };
        }

        Ok(state)
    }
}
