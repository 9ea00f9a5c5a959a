//! Strategy Selector
//!
//! Decides per question which answer-generation strategy to use. The first
//! gate is a keyword heuristic over the question text: conceptual questions
//! go straight to the chat model, questions with recency, lookup or
//! recommendation cues may use an external tool. Among tool strategies the
//! order is fixed (graph agent, direct search, tool agent), each guarded by
//! the caller's preference and by whether the backing service is configured.

use axon_sdk::errors::{Result, TutorError};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Cue phrases that mark a question as needing external tools
pub const EXTERNAL_TOOL_CUES: &[&str] = &[
    "latest",
    "recent",
    "news",
    "current",
    "search",
    "find",
    "lookup",
    "research",
    "what is the current",
    "how many",
    "statistics",
    "recommend",
    "where can i",
    "what are the best",
];

/// True if the lower-cased question contains any tool cue
pub fn needs_external_tools(question: &str) -> bool {
    let question = question.to_lowercase();
    EXTERNAL_TOOL_CUES.iter().any(|cue| question.contains(cue))
}

/// Answer-generation strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Chat model alone, with uploaded-document context
    Plain,
    /// One premium search, then the chat model over the results
    DirectSearch,
    /// Multi-step tool-using agent bound to the conversation
    ToolAgent,
    /// Graph-structured reasoning agent
    GraphAgent,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Strategy::Plain => "plain",
            Strategy::DirectSearch => "direct_search",
            Strategy::ToolAgent => "tool_agent",
            Strategy::GraphAgent => "graph_agent",
        };
        write!(f, "{}", name)
    }
}

/// Which tool strategies the caller allows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyPreferences {
    #[serde(default)]
    pub graph_agent: bool,
    #[serde(default = "enabled")]
    pub direct_search: bool,
    #[serde(default = "enabled")]
    pub tool_agent: bool,
}

fn enabled() -> bool {
    true
}

impl Default for StrategyPreferences {
    fn default() -> Self {
        Self {
            graph_agent: false,
            direct_search: true,
            tool_agent: true,
        }
    }
}

impl StrategyPreferences {
    /// Preferences allowing exactly one tool strategy
    pub fn only(strategy: Strategy) -> Self {
        Self {
            graph_agent: strategy == Strategy::GraphAgent,
            direct_search: strategy == Strategy::DirectSearch,
            tool_agent: strategy == Strategy::ToolAgent,
        }
    }

    /// Tool strategies requested, in selection order
    pub fn requested(&self) -> Vec<Strategy> {
        let mut requested = Vec::new();
        if self.graph_agent {
            requested.push(Strategy::GraphAgent);
        }
        if self.direct_search {
            requested.push(Strategy::DirectSearch);
        }
        if self.tool_agent {
            requested.push(Strategy::ToolAgent);
        }
        requested
    }
}

/// Which tool strategies have their backing services configured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StrategyAvailability {
    pub graph_agent: bool,
    pub direct_search: bool,
    pub tool_agent: bool,
}

impl StrategyAvailability {
    pub fn all() -> Self {
        Self {
            graph_agent: true,
            direct_search: true,
            tool_agent: true,
        }
    }

    pub fn is_available(&self, strategy: Strategy) -> bool {
        match strategy {
            Strategy::Plain => true,
            Strategy::GraphAgent => self.graph_agent,
            Strategy::DirectSearch => self.direct_search,
            Strategy::ToolAgent => self.tool_agent,
        }
    }

    fn missing_requirement(strategy: Strategy) -> &'static str {
        match strategy {
            Strategy::GraphAgent | Strategy::DirectSearch => "TAVILY_API_KEY is not set",
            Strategy::ToolAgent => "no tool agent is configured",
            Strategy::Plain => "",
        }
    }
}

/// Outcome of strategy selection for one request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StrategyDecision {
    pub strategy: Strategy,
    pub needs_tools: bool,
    pub has_file_context: bool,
    pub has_history: bool,
}

/// Pick the strategy for a question.
///
/// Without tool cues the answer is always `Plain`. With cues, the first
/// requested and available strategy in order graph agent, direct search,
/// tool agent wins; if none qualifies the request falls back to `Plain`,
/// except when exactly one strategy was requested and it is unavailable.
pub fn select(
    question: &str,
    preferences: &StrategyPreferences,
    availability: &StrategyAvailability,
    has_file_context: bool,
    has_history: bool,
) -> Result<StrategyDecision> {
    let needs_tools = needs_external_tools(question);
    let decision = |strategy| StrategyDecision {
        strategy,
        needs_tools,
        has_file_context,
        has_history,
    };

    if !needs_tools {
        return Ok(decision(Strategy::Plain));
    }

    let requested = preferences.requested();
    if let Some(&strategy) = requested.iter().find(|s| availability.is_available(**s)) {
        debug!("Selected {} strategy", strategy);
        return Ok(decision(strategy));
    }

    if let [only] = requested.as_slice() {
        return Err(TutorError::Configuration(format!(
            "{} strategy requested but {}",
            only,
            StrategyAvailability::missing_requirement(*only)
        )));
    }

    debug!("No requested tool strategy available, answering directly");
    Ok(decision(Strategy::Plain))
}
