use axon_sdk::collaborators::{ChatModel, GraphAgent, SearchProvider, ToolAgentFactory};
use axon_sdk::errors::{Result, TutorError};
use axon_sdk::types::{format_search_context, GraphState};
use std::sync::Arc;
use tracing::debug;

use crate::agent::extract_sources;
use crate::conversation::ConversationStore;
use crate::prompts;
use crate::rate_limiter::RateLimiters;
use crate::strategy::Strategy;

/// Everything a strategy may call, cheap to clone into a spawned task
#[derive(Clone)]
pub(crate) struct Collaborators {
    pub store: Arc<ConversationStore>,
    pub model: Arc<dyn ChatModel>,
    pub premium_search: Option<Arc<dyn SearchProvider>>,
    pub agent_factory: Option<Arc<dyn ToolAgentFactory>>,
    pub graph: Option<Arc<dyn GraphAgent>>,
    pub limiters: RateLimiters,
}

/// Answer text and its citations
#[derive(Debug)]
pub(crate) struct Dispatched {
    pub answer: String,
    pub sources: Vec<String>,
}

/// Inputs for one dispatch, owned so the call can outlive its caller
pub(crate) struct DispatchRequest {
    pub conversation_id: String,
    pub strategy: Strategy,
    pub question: String,
    pub file_context: Option<String>,
}

fn unavailable(strategy: Strategy) -> TutorError {
    TutorError::Configuration(format!("{} strategy is not configured", strategy))
}

/// Invoke the one collaborator behind `request.strategy`
pub(crate) async fn dispatch(collab: Collaborators, request: DispatchRequest) -> Result<Dispatched> {
    let DispatchRequest {
        conversation_id,
        strategy,
        question,
        file_context,
    } = request;
    let file_context = file_context.as_deref();
    debug!("Dispatching {} for conversation {}", strategy, conversation_id);

    match strategy {
        Strategy::Plain => {
            let answer = collab
                .model
                .generate(&prompts::direct_answer(&question, file_context))
                .await?;
            Ok(Dispatched {
                answer,
                sources: Vec::new(),
            })
        }
        Strategy::DirectSearch => {
            let search = collab.premium_search.ok_or_else(|| unavailable(strategy))?;
            collab.limiters.premium_search.acquire().await;

            let hits = search.search(&question).await?;
            let search_context = format_search_context(&hits);
            let answer = collab
                .model
                .generate(&prompts::search_answer(&question, file_context, &search_context))
                .await?;

            Ok(Dispatched {
                answer,
                sources: hits.into_iter().map(|h| h.url).collect(),
            })
        }
        Strategy::ToolAgent => {
            let factory = collab.agent_factory.ok_or_else(|| unavailable(strategy))?;

            let session = collab
                .store
                .agent_session_or_init(&conversation_id, factory.as_ref())
                .await?;
            let answer = session
                .run(&prompts::agent_question(&question, file_context))
                .await?;
            let sources = extract_sources(&answer);

            Ok(Dispatched { answer, sources })
        }
        Strategy::GraphAgent => {
            let graph = collab.graph.ok_or_else(|| unavailable(strategy))?;
            let state = graph
                .invoke(GraphState::initial(question, file_context))
                .await?;

            Ok(Dispatched {
                answer: state.final_answer,
                sources: state.search_results.into_iter().map(|h| h.url).collect(),
            })
        }
    }
}
