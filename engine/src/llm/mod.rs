//! Chat model layer
//!
//! Concrete `ChatModel` implementations and the helpers that pull structured
//! output (tool calls, JSON verdicts) out of free-form model text.
//! Groq and OpenAI both speak the OpenAI chat-completions protocol, so one
//! adapter serves both.

use axon_sdk::collaborators::ChatModel;
use axon_sdk::errors::{Result, TutorError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::LLMConfig;
use crate::secrets::{SecretStore, GROQ_API_KEY, OPENAI_API_KEY};

pub mod openai_compat;

pub use openai_compat::OpenAiCompatModel;

/// Tool call requested by the model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    /// Unique identifier for this tool call
    pub id: String,

    /// Name of the tool to call
    pub name: String,

    /// Arguments to pass to the tool (JSON string)
    pub arguments: String,
}

impl ToolCall {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }
}

/// Build the configured chat model
///
/// The API key is resolved per request, so a missing key surfaces on first use.
pub fn build_chat_model(config: &LLMConfig, secrets: &SecretStore) -> Result<Arc<dyn ChatModel>> {
    let key_name = match config.provider.as_str() {
        "groq" => GROQ_API_KEY,
        "openai" => OPENAI_API_KEY,
        other => {
            return Err(TutorError::Configuration(format!(
                "Unsupported chat provider '{}'",
                other
            )))
        }
    };

    let model = OpenAiCompatModel::new(
        config.provider.clone(),
        config.base_url(),
        config.effective_model(),
        config.temperature,
        config.timeout_secs,
        key_name,
        secrets.clone(),
    )?;

    Ok(Arc::new(model))
}

/// Remove `<think>...</think>` reasoning blocks some models prepend
pub fn strip_reasoning(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let mut rest = content;

    while let Some(start) = rest.find("<think>") {
        out.push_str(&rest[..start]);
        match rest[start..].find("</think>") {
            Some(end) => rest = &rest[start + end + "</think>".len()..],
            None => {
                rest = "";
                break;
            }
        }
    }
    out.push_str(rest);

    out.trim().to_string()
}

/// Parse a tool call from model output.
///
/// Handles multiple output formats:
/// 1. Raw JSON: `{"function": "...", "arguments": {...}}`
/// 2. Fenced JSON (with or without trailing text)
/// 3. `<tool_call>name({...})</tool_call>` markers
/// 4. JSON embedded in prose
pub fn parse_tool_calls(content: &str) -> Option<ToolCall> {
    let trimmed = content.trim();

    if let Some(tc) = try_parse_function_json(trimmed) {
        return Some(tc);
    }

    if let Some(inner) = extract_fenced_json(trimmed) {
        if let Some(tc) = try_parse_function_json(inner.trim()) {
            return Some(tc);
        }
    }

    if let Some(tc) = parse_tool_call_markers(trimmed) {
        return Some(tc);
    }

    if let Some(pos) = trimmed.find("{\"function\"") {
        if let Some(json_str) = extract_balanced_json(&trimmed[pos..]) {
            if let Some(tc) = try_parse_function_json(json_str) {
                return Some(tc);
            }
        }
    }

    None
}

/// Parse `<tool_call>name(args)</tool_call>`; malformed markers yield `None`
fn parse_tool_call_markers(content: &str) -> Option<ToolCall> {
    let open = "<tool_call>";
    let start = content.find(open)? + open.len();
    let end = start + content[start..].find("</tool_call>")?;
    let tool_content = &content[start..end];

    let paren_pos = tool_content.find('(')?;
    let args_end = tool_content.rfind(')').unwrap_or(tool_content.len());
    if args_end <= paren_pos {
        return None;
    }

    let tool_name = tool_content[..paren_pos].trim();
    if tool_name.is_empty() {
        return None;
    }

    Some(ToolCall::new(
        format!("call_{}", uuid::Uuid::new_v4()),
        tool_name,
        &tool_content[paren_pos + 1..args_end],
    ))
}

/// Find the first JSON object in model output, fenced or inline
pub fn extract_json_object(content: &str) -> Option<serde_json::Value> {
    let trimmed = content.trim();

    let as_object = |s: &str| {
        serde_json::from_str::<serde_json::Value>(s)
            .ok()
            .filter(|v| v.is_object())
    };

    if let Some(value) = as_object(trimmed) {
        return Some(value);
    }

    if let Some(value) = extract_fenced_json(trimmed).and_then(|inner| as_object(inner.trim())) {
        return Some(value);
    }

    let pos = trimmed.find('{')?;
    let json_str = extract_balanced_json(&trimmed[pos..])?;
    serde_json::from_str(json_str).ok()
}

fn try_parse_function_json(s: &str) -> Option<ToolCall> {
    let json: serde_json::Value = serde_json::from_str(s).ok()?;
    let function = json.get("function")?.as_str()?;
    let arguments = json.get("arguments")?;
    Some(ToolCall::new(
        format!("call_{}", uuid::Uuid::new_v4()),
        function,
        arguments.to_string(),
    ))
}

/// Extract the body of the first markdown code fence in the text.
///
/// Works even when there is trailing prose after the closing fence.
fn extract_fenced_json(content: &str) -> Option<&str> {
    let fence_start = content.find("```")?;
    let after_opening = &content[fence_start + 3..];

    // Skip the language tag line (e.g. "json\n")
    let body_start_rel = after_opening.find('\n')? + 1;
    let body_start = fence_start + 3 + body_start_rel;

    let closing = content[body_start..].find("```")?;
    let body_end = body_start + closing;

    if body_start >= body_end {
        return None;
    }

    Some(&content[body_start..body_end])
}

/// Extract a balanced JSON object starting at position 0 of `s`.
///
/// Counts brace depth, respecting string literals.
fn extract_balanced_json(s: &str) -> Option<&str> {
    if !s.starts_with('{') {
        return None;
    }
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in s.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}
