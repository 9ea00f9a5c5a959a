//! Agent Core
//!
//! The tool agent answers through a think-act-observe cycle:
//!
//! 1. Send the working memory to the chat model
//! 2. If the reply is a tool call, run the tool, add the result, loop
//! 3. Otherwise the reply is the final answer
//!
//! The loop is bounded by `max_steps` model calls. With memory enabled the
//! transcript carries over between questions of the same session.

use async_trait::async_trait;
use axon_sdk::collaborators::{ChatModel, ToolAgent};
use axon_sdk::errors::{Result, TutorError};
use axon_sdk::types::Message;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::tools::AgentTools;
use super::WorkingMemory;
use crate::llm::parse_tool_calls;
use crate::prompts;

pub struct WebToolAgent {
    model: Arc<dyn ChatModel>,
    tools: Arc<AgentTools>,
    memory: Mutex<WorkingMemory>,
    max_steps: usize,
    memory_enabled: bool,
    closed: AtomicBool,
}

impl WebToolAgent {
    pub fn new(
        model: Arc<dyn ChatModel>,
        tools: Arc<AgentTools>,
        max_steps: usize,
        memory_enabled: bool,
    ) -> Self {
        Self {
            model,
            tools,
            memory: Mutex::new(WorkingMemory::new()),
            max_steps: max_steps.max(1),
            memory_enabled,
            closed: AtomicBool::new(false),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Number of messages currently in the transcript
    pub async fn transcript_len(&self) -> usize {
        self.memory.lock().await.len()
    }
}

#[async_trait]
impl ToolAgent for WebToolAgent {
    async fn run(&self, question: &str) -> Result<String> {
        if self.is_closed() {
            return Err(TutorError::upstream("Agent session is closed"));
        }

        let mut memory = self.memory.lock().await;
        if !self.memory_enabled || memory.is_empty() {
            memory.clear();
            memory.push(Message::system(prompts::agent_system()));
        }
        let checkpoint = memory.clone();
        memory.push(Message::user(question));

        for step in 1..=self.max_steps {
            debug!("Agent step {}/{}", step, self.max_steps);

            let reply = match self.model.generate(memory.messages()).await {
                Ok(reply) => reply,
                Err(e) => {
                    *memory = checkpoint;
                    return Err(e);
                }
            };

            match parse_tool_calls(&reply) {
                Some(call) => {
                    debug!("Tool call: {} ({})", call.name, call.id);

                    let arguments = serde_json::from_str::<serde_json::Value>(&call.arguments)
                        .unwrap_or_default();
                    memory.push(Message::assistant(
                        serde_json::json!({ "function": &call.name, "arguments": arguments })
                            .to_string(),
                    ));

                    let result = self.tools.dispatch(&call.name, &call.arguments).await;
                    memory.push(Message::tool_result(result, &call.id));
                }
                None => {
                    info!("Agent answered after {} steps", step);
                    memory.push(Message::assistant(&reply));
                    return Ok(reply);
                }
            }
        }

        warn!("Agent gave no answer within {} steps", self.max_steps);
        *memory = checkpoint;
        Err(TutorError::upstream(format!(
            "Agent gave no answer within {} steps",
            self.max_steps
        )))
    }

    async fn clear_memory(&self) {
        self.memory.lock().await.clear();
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            debug!("Agent session already closed");
            return Ok(());
        }
        self.memory.lock().await.clear();
        Ok(())
    }
}
