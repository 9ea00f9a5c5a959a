//! Orchestrator
//!
//! Runs one student question through a fixed pipeline:
//!
//! 1. Resolve the conversation and take its request gate
//! 2. Translate the question to English when it is in another language
//! 3. Assemble context from the conversation's uploaded documents
//! 4. Select a strategy
//! 5. Dispatch to exactly one collaborator
//! 6. Translate the answer back
//! 7. Append the original question and final answer to the conversation
//!
//! Nothing is written to the conversation unless every step succeeds.
//! Collaborator failures surface as a single `Processing` error with secrets
//! scrubbed from the cause.

mod dispatch;
pub mod query;

pub use query::{TranslationResult, TutorAnswer, TutorQuery};

use axon_sdk::collaborators::{ChatModel, GraphAgent, SearchProvider, ToolAgentFactory, Translator};
use axon_sdk::errors::{Result, TutorError};
use std::sync::Arc;
use tracing::{debug, info, warn};

use self::dispatch::{dispatch, Collaborators, DispatchRequest};
use crate::agent::WebToolAgentFactory;
use crate::config::Config;
use crate::context::ContextAssembler;
use crate::conversation::ConversationStore;
use crate::graph::TutorGraph;
use crate::llm::build_chat_model;
use crate::rate_limiter::RateLimiters;
use crate::search::{DuckDuckGoSearch, TavilySearch};
use crate::secrets::{scrub_secrets, SecretStore, GOOGLE_CLOUD_API_KEY, TAVILY_API_KEY};
use crate::strategy::{self, StrategyAvailability};
use crate::translation::{is_english, GoogleTranslator};

const ENGLISH: &str = "en";

pub struct Orchestrator {
    collab: Collaborators,
    translator: Option<Arc<dyn Translator>>,
    assembler: ContextAssembler,
}

impl Orchestrator {
    pub fn new(store: Arc<ConversationStore>, model: Arc<dyn ChatModel>, limiters: RateLimiters) -> Self {
        Self {
            collab: Collaborators {
                store,
                model,
                premium_search: None,
                agent_factory: None,
                graph: None,
                limiters,
            },
            translator: None,
            assembler: ContextAssembler::new(3),
        }
    }

    /// Wire the HTTP-backed collaborators described by `config`.
    ///
    /// Premium search and the reasoning graph need TAVILY_API_KEY and
    /// translation needs GOOGLE_CLOUD_API_KEY; without them those features
    /// are simply unavailable. The tool agent searches DuckDuckGo, which
    /// needs no key.
    pub fn from_config(config: &Config, secrets: &SecretStore, store: Arc<ConversationStore>) -> Result<Self> {
        let model = build_chat_model(&config.llm, secrets)?;
        let limiters = RateLimiters::from_config(&config.rate_limits);

        let web_search: Arc<dyn SearchProvider> = Arc::new(DuckDuckGoSearch::new(&config.search)?);
        let factory = WebToolAgentFactory::new(
            Arc::clone(&model),
            web_search,
            Arc::clone(&limiters.web_search),
            &config.agent,
        );

        let mut orchestrator = Self::new(store, Arc::clone(&model), limiters.clone())
            .with_tool_agent(Arc::new(factory))
            .with_assembler(ContextAssembler::new(config.context.max_fragments));

        match secrets.get(TAVILY_API_KEY) {
            Some(key) => {
                let premium: Arc<dyn SearchProvider> = Arc::new(TavilySearch::new(&config.search, key)?);
                let graph = TutorGraph::new(Arc::clone(&model))
                    .with_search(Arc::clone(&premium), Arc::clone(&limiters.premium_search));
                orchestrator = orchestrator
                    .with_premium_search(premium)
                    .with_graph(Arc::new(graph));
            }
            None => info!("{} not set; direct search and graph agent disabled", TAVILY_API_KEY),
        }

        match secrets.get(GOOGLE_CLOUD_API_KEY) {
            Some(key) => {
                let translator = GoogleTranslator::new(
                    &config.translation,
                    key,
                    Arc::clone(&limiters.translation),
                )?;
                orchestrator = orchestrator.with_translator(Arc::new(translator));
            }
            None => info!("{} not set; translation disabled", GOOGLE_CLOUD_API_KEY),
        }

        Ok(orchestrator)
    }

    pub fn with_premium_search(mut self, search: Arc<dyn SearchProvider>) -> Self {
        self.collab.premium_search = Some(search);
        self
    }

    pub fn with_tool_agent(mut self, factory: Arc<dyn ToolAgentFactory>) -> Self {
        self.collab.agent_factory = Some(factory);
        self
    }

    pub fn with_graph(mut self, graph: Arc<dyn GraphAgent>) -> Self {
        self.collab.graph = Some(graph);
        self
    }

    pub fn with_translator(mut self, translator: Arc<dyn Translator>) -> Self {
        self.translator = Some(translator);
        self
    }

    pub fn with_assembler(mut self, assembler: ContextAssembler) -> Self {
        self.assembler = assembler;
        self
    }

    pub fn store(&self) -> &Arc<ConversationStore> {
        &self.collab.store
    }

    pub fn availability(&self) -> StrategyAvailability {
        StrategyAvailability {
            graph_agent: self.collab.graph.is_some(),
            direct_search: self.collab.premium_search.is_some(),
            tool_agent: self.collab.agent_factory.is_some(),
        }
    }

    /// Answer a question
    pub async fn ask(&self, query: TutorQuery) -> Result<TutorAnswer> {
        let (conversation_id, _) = self.collab.store.resolve(query.conversation_id.as_deref());
        let _gate = self.collab.store.request_gate(&conversation_id).await?;

        info!(
            "Question for conversation {} (language {})",
            conversation_id, query.language
        );

        let source_language = self.source_language(&query).await.map_err(surface)?;
        let question = match &source_language {
            Some(language) => self
                .translator()?
                .translate(&query.question, Some(language), ENGLISH)
                .await
                .map_err(surface)?,
            None => query.question.clone(),
        };

        let snapshot = self.collab.store.snapshot(&conversation_id)?;
        let file_context = self.assembler.assemble(&snapshot, &question).await;

        let decision = strategy::select(
            &question,
            &query.preferences,
            &self.availability(),
            file_context.is_some(),
            snapshot.has_history(),
        )?;
        info!("Answering with {} strategy", decision.strategy);

        // Spawned so a dropped caller does not cancel an in-flight strategy
        let request = DispatchRequest {
            conversation_id: conversation_id.clone(),
            strategy: decision.strategy,
            question,
            file_context,
        };
        let dispatched = tokio::spawn(dispatch(self.collab.clone(), request))
            .await
            .map_err(|e| TutorError::Processing(format!("Dispatch task failed: {}", e)))?
            .map_err(surface)?;

        let answer = match &source_language {
            Some(language) => self
                .translator()?
                .translate(&dispatched.answer, Some(ENGLISH), language)
                .await
                .map_err(surface)?,
            None => dispatched.answer,
        };

        self.collab
            .store
            .append_exchange(&conversation_id, &query.question, &answer)?;

        Ok(TutorAnswer {
            answer,
            conversation_id,
            sources: dispatched.sources,
            language: query.language,
            translated_from: source_language,
            strategy: decision.strategy,
        })
    }

    /// Translate text outside any conversation.
    ///
    /// A `from` of `None` or "auto" lets the backend detect the language.
    pub async fn translate(&self, text: &str, from: Option<&str>, to: &str) -> Result<TranslationResult> {
        let source = from.filter(|f| !f.eq_ignore_ascii_case("auto"));
        let translated_text = self
            .translator()?
            .translate(text, source, to)
            .await
            .map_err(surface)?;

        Ok(TranslationResult {
            original_text: text.to_string(),
            translated_text,
            source_language: source.unwrap_or("auto").to_string(),
            target_language: to.to_string(),
        })
    }

    /// Run one line of a console chat through the conversation's tool agent
    pub async fn agent_turn(&self, conversation_id: &str, input: &str) -> Result<String> {
        let factory = self.collab.agent_factory.as_ref().ok_or_else(|| {
            TutorError::Configuration("No tool agent is configured".to_string())
        })?;

        let session = self
            .collab
            .store
            .agent_session_or_init(conversation_id, factory.as_ref())
            .await?;
        session.run(input).await.map_err(surface)
    }

    /// Forget the agent's transcript for a conversation, if it has one
    pub async fn clear_agent_memory(&self, conversation_id: &str) -> Result<()> {
        if let Some(session) = self.collab.store.get_agent_session(conversation_id).await? {
            session.clear_memory().await;
        }
        Ok(())
    }

    /// Release every conversation and agent session
    pub async fn shutdown(&self) {
        self.collab.store.shutdown().await;
    }

    fn translator(&self) -> Result<&Arc<dyn Translator>> {
        self.translator.as_ref().ok_or_else(|| {
            TutorError::Processing(format!(
                "Translation is unavailable; {} is not set",
                GOOGLE_CLOUD_API_KEY
            ))
        })
    }

    /// Language to translate the question from, or `None` to use it as is
    async fn source_language(&self, query: &TutorQuery) -> Result<Option<String>> {
        if is_english(&query.language) {
            return Ok(None);
        }

        let language = if query.language.eq_ignore_ascii_case("auto") {
            let detected = self.translator()?.detect(&query.question).await?;
            debug!("Detected question language '{}'", detected);
            detected
        } else {
            query.language.clone()
        };

        Ok(Some(language).filter(|l| !is_english(l)))
    }
}

/// Map an error to what the caller of `ask` sees.
///
/// Caller mistakes pass through; everything else becomes `Processing`.
fn surface(err: TutorError) -> TutorError {
    match err {
        TutorError::NotFound(_) | TutorError::UnsupportedInput(_) => err,
        other => {
            warn!("Request failed: {}", scrub_secrets(&other.to_string()));
            match other.into_processing() {
                TutorError::Processing(cause) => TutorError::Processing(scrub_secrets(&cause)),
                unchanged => unchanged,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_surface_keeps_caller_errors() {
        assert!(matches!(
            surface(TutorError::NotFound("File a.txt".into())),
            TutorError::NotFound(_)
        ));
        assert!(matches!(
            surface(TutorError::UnsupportedInput("x".into())),
            TutorError::UnsupportedInput(_)
        ));
    }

    #[test]
    fn test_surface_folds_and_scrubs_upstream_errors() {
        let err = surface(TutorError::upstream("groq returned 401 for key gsk_abcdefghijklmnop1234"));
        match err {
            TutorError::Processing(cause) => {
                assert!(cause.contains("groq returned 401"));
                assert!(!cause.contains("gsk_abcdefghijklmnop1234"));
            }
            other => panic!("Expected Processing, got {:?}", other),
        }
    }

    #[test]
    fn test_surface_folds_configuration_errors() {
        let err = surface(TutorError::Configuration("GROQ_API_KEY is not set".into()));
        assert!(matches!(err, TutorError::Processing(_)));
    }
}
