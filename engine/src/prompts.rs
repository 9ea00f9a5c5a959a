//! Prompt rendering
//!
//! Every prompt the engine sends to a chat model is rendered here, so the
//! wording lives in one place and the strategies only pass inputs.

use axon_sdk::types::{GraphState, Message};

const TUTOR_ROLE: &str = "You are an AI tutor specializing in education.";

const ANSWER_GUIDANCE: &[&str] = &[
    "Provide a clear, accurate, and educational response. Include examples where helpful.",
    "Break down complex concepts and explain your reasoning.",
    "",
    "If mathematical or scientific notation would help, use proper formatting.",
    "If code examples would help, provide properly commented code.",
];

/// Direct answer, optionally grounded in uploaded-document context
pub fn direct_answer(question: &str, file_context: Option<&str>) -> Vec<Message> {
    let mut parts = vec![format!("The student has asked: {}", question)];

    if let Some(context) = file_context {
        parts.push(String::new());
        parts.push("Here is relevant information from uploaded documents:".to_string());
        parts.push(context.to_string());
    }

    parts.push(String::new());
    parts.extend(ANSWER_GUIDANCE.iter().map(|s| s.to_string()));

    vec![Message::system(TUTOR_ROLE), Message::user(parts.join("\n"))]
}

/// Combined context block for search-backed answers
pub fn search_context_block(file_context: Option<&str>, search_context: &str) -> String {
    let mut context = String::new();
    if let Some(fc) = file_context.filter(|fc| !fc.is_empty()) {
        context.push_str(&format!("Context from uploaded files:\n{}\n\n", fc));
    }
    if !search_context.is_empty() {
        context.push_str(&format!("Search results:\n{}", search_context));
    }
    context
}

/// Answer over search results, asking the model to cite them
pub fn search_answer(question: &str, file_context: Option<&str>, search_context: &str) -> Vec<Message> {
    let mut parts = vec![
        format!("The student has asked: {}", question),
        String::new(),
        "Here is relevant information to help you answer:".to_string(),
        search_context_block(file_context, search_context),
        String::new(),
    ];
    parts.extend(ANSWER_GUIDANCE.iter().map(|s| s.to_string()));
    parts.push(String::new());
    parts.push(
        "At the end of your response, include sources that you used from the search results."
            .to_string(),
    );

    vec![Message::system(TUTOR_ROLE), Message::user(parts.join("\n"))]
}

/// System prompt for the tool-using agent
pub fn agent_system() -> String {
    let parts = [
        "You are an advanced AI tutor designed to help with education.",
        "Your primary goals are to:",
        "1. Explain complex topics clearly and accurately",
        "2. Answer questions thoroughly with examples",
        "3. Break down difficult concepts into manageable pieces",
        "4. Use web search and other tools to provide up-to-date information",
        "5. Help with problem-solving through guided reasoning",
        "",
        "When using tools, prioritize educational resources and reliable sources.",
        "Always explain your reasoning process to help the student understand how to approach similar problems.",
        "",
        "IMPORTANT RULES:",
        "1. To call a tool, your ENTIRE response must be ONLY the JSON object. No explanation, no markdown fences, no text around it.",
        "2. When you have the final answer, respond with plain text only, no JSON.",
        "3. Never guess tool output. Call the tool and wait for the real result.",
        "4. For every web page you relied on, add a line `Source: <url>` at the end of your answer.",
        "",
        "Tool call format (your entire response must be exactly this):",
        r#"{"function": "tool_name", "arguments": {"arg1": "value1"}}"#,
        "",
        "Available tools:",
        "",
        "## web_search",
        "Search the web and return matching pages with their URLs.",
        r#"Arguments: {"query": "search terms"}"#,
    ];
    parts.join("\n")
}

/// Question handed to the tool agent, prefixed with document context
pub fn agent_question(question: &str, file_context: Option<&str>) -> String {
    match file_context {
        Some(context) => format!(
            "I have the following information from my documents:\n{}\n\nBased on this and your knowledge, please answer: {}",
            context, question
        ),
        None => question.to_string(),
    }
}

/// Ask the model whether a question benefits from external search
pub fn search_decision(question: &str) -> Vec<Message> {
    let parts = [
        "Given the student's question, determine if external search would be beneficial.".to_string(),
        String::new(),
        format!("Question: {}", question),
        String::new(),
        "Return a JSON with the following format:".to_string(),
        r#"{"need_search": true or false, "reasoning": "brief explanation of your decision"}"#
            .to_string(),
    ];
    vec![Message::user(parts.join("\n"))]
}

/// Final answer node of the reasoning graph
pub fn graph_answer(state: &GraphState) -> Vec<Message> {
    let file_context = Some(state.file_context.as_str()).filter(|fc| !fc.is_empty());
    let context = search_context_block(file_context, &state.context);

    let mut parts = vec![format!("The student has asked: {}", state.question)];
    if !context.is_empty() {
        parts.push(String::new());
        parts.push(context);
    }
    parts.push(String::new());
    parts.extend(ANSWER_GUIDANCE.iter().map(|s| s.to_string()));
    parts.push(String::new());
    parts.push("If you used search results, cite your sources at the end.".to_string());

    vec![Message::system(TUTOR_ROLE), Message::user(parts.join("\n"))]
}

#[cfg(test)]
mod tests {
    use super::*;
    use axon_sdk::types::MessageRole;

    #[test]
    fn test_direct_answer_without_context() {
        let messages = direct_answer("What is osmosis?", None);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, MessageRole::System);
        assert!(messages[1].content.starts_with("The student has asked: What is osmosis?"));
        assert!(!messages[1].content.contains("uploaded documents"));
    }

    #[test]
    fn test_direct_answer_includes_file_context() {
        let messages = direct_answer("q", Some("From a.txt:\nWater moves."));
        assert!(messages[1]
            .content
            .contains("Here is relevant information from uploaded documents:\nFrom a.txt:\nWater moves."));
    }

    #[test]
    fn test_search_context_block() {
        assert_eq!(
            search_context_block(Some("F"), "S"),
            "Context from uploaded files:\nF\n\nSearch results:\nS"
        );
        assert_eq!(search_context_block(None, "S"), "Search results:\nS");
        assert_eq!(search_context_block(Some(""), ""), "");
    }

    #[test]
    fn test_search_answer_asks_for_sources() {
        let messages = search_answer("q", None, "Source: https://a.edu");
        assert!(messages[1].content.contains("Search results:\nSource: https://a.edu"));
        assert!(messages[1].content.contains("include sources"));
    }

    #[test]
    fn test_agent_question_prefix() {
        assert_eq!(agent_question("Why?", None), "Why?");
        let q = agent_question("Why?", Some("notes"));
        assert!(q.starts_with("I have the following information from my documents:\nnotes"));
        assert!(q.ends_with("please answer: Why?"));
    }

    #[test]
    fn test_agent_system_describes_web_search() {
        let prompt = agent_system();
        assert!(prompt.contains("## web_search"));
        assert!(prompt.contains("Source: <url>"));
    }

    #[test]
    fn test_graph_answer_omits_empty_context() {
        let state = GraphState::initial("What is DNA?", None);
        let messages = graph_answer(&state);
        assert!(!messages[1].content.contains("Search results"));
        assert!(!messages[1].content.contains("uploaded files"));
    }
}
