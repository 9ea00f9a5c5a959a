//! Command handlers for CLI operations
//!
//! - ask: answer one question, optionally over uploaded files
//! - chat: console session with the tool agent
//! - translate / transcribe: standalone language services
//! - config, secret, doctor: setup and diagnostics

use anyhow::{Context, Result};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::audio::{AudioService, GroqTranscriber};
use crate::cli::{AskArgs, SecretAction};
use crate::config::Config;
use crate::conversation::ConversationStore;
use crate::documents::{DocumentService, KeywordIndexBuilder};
use crate::orchestrator::{Orchestrator, TutorQuery};
use crate::secrets::{
    prompt_for_secret, SecretManager, SecretStore, GROQ_API_KEY, KNOWN_KEYS, SERVICE_NAME,
};

/// Output format for command results
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine consumption
    Json,
}

/// Secret store backed by the OS keychain
pub fn keychain_secrets() -> SecretStore {
    SecretStore::new(Arc::new(SecretManager::new(SERVICE_NAME)))
}

/// Answer one question
pub async fn handle_ask(args: AskArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let secrets = keychain_secrets();
    let store = Arc::new(ConversationStore::new());
    let orchestrator = Orchestrator::from_config(config, &secrets, Arc::clone(&store))
        .context("Failed to set up the tutor")?;

    let mut conversation_id = args.conversation.clone();
    if !args.files.is_empty() {
        let documents = DocumentService::new(
            Arc::clone(&store),
            Arc::new(KeywordIndexBuilder),
            &config.core.staging_dir,
        );
        for path in &args.files {
            let id = upload(&documents, conversation_id.as_deref(), path).await?;
            conversation_id = Some(id);
        }
    }

    let mut query = TutorQuery::new(&args.question)
        .with_language(
            args.language
                .clone()
                .unwrap_or_else(|| config.core.default_language.clone()),
        )
        .with_preferences(args.preferences());
    if let Some(id) = conversation_id {
        query = query.in_conversation(id);
    }

    let result = orchestrator.ask(query).await;
    orchestrator.shutdown().await;
    let answer = result?;

    match format {
        OutputFormat::Text => {
            println!("{}", answer.answer);
            if !answer.sources.is_empty() {
                println!();
                println!("Sources:");
                for source in &answer.sources {
                    println!("  - {}", source);
                }
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&answer)?),
    }

    Ok(())
}

async fn upload(documents: &DocumentService, conversation_id: Option<&str>, path: &Path) -> Result<String> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("Invalid file name: {}", path.display()))?;

    let receipt = documents.ingest(conversation_id, filename, &bytes, None).await?;
    tracing::info!("Uploaded {} to {}", filename, receipt.conversation_id);
    Ok(receipt.conversation_id)
}

/// Console chat with the tool agent
pub async fn handle_chat(config: &Config) -> Result<()> {
    let secrets = keychain_secrets();
    let orchestrator = Orchestrator::from_config(config, &secrets, Arc::new(ConversationStore::new()))
        .context("Failed to set up the tutor")?;
    let (conversation_id, _) = orchestrator.store().create();

    println!();
    println!("===== Interactive AI Tutor Chat =====");
    println!("Type 'exit' to end the chat");
    println!("Type 'clear' to clear conversation history");
    println!("======================================");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"\nYou: ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        match input.to_lowercase().as_str() {
            "exit" => {
                println!("Exiting chat...");
                break;
            }
            "clear" => {
                orchestrator.clear_agent_memory(&conversation_id).await?;
                println!("Memory cleared!");
                continue;
            }
            _ => {}
        }

        match orchestrator.agent_turn(&conversation_id, input).await {
            Ok(answer) => println!("\nTutor: {}", answer),
            Err(e) => println!("\nAn error occurred: {}", e),
        }
    }

    orchestrator.shutdown().await;
    Ok(())
}

/// Translate text
pub async fn handle_translate(
    text: String,
    from: Option<String>,
    to: String,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    let secrets = keychain_secrets();
    let orchestrator = Orchestrator::from_config(config, &secrets, Arc::new(ConversationStore::new()))
        .context("Failed to set up the tutor")?;

    let result = orchestrator.translate(&text, from.as_deref(), &to).await?;

    match format {
        OutputFormat::Text => println!("{}", result.translated_text),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
    }
    Ok(())
}

/// Transcribe an audio file
pub async fn handle_transcribe(
    file: &Path,
    language: &str,
    variant: Option<&str>,
    remote: bool,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    let secrets = keychain_secrets();
    let store = Arc::new(ConversationStore::new());

    let mut service = AudioService::new(
        Arc::clone(&store),
        &config.audio.upload_dir,
        &config.audio.default_variant,
    );
    if secrets.has(GROQ_API_KEY) {
        service = service.with_remote(Arc::new(GroqTranscriber::new(&config.audio, secrets.clone())?));
    }

    let bytes = tokio::fs::read(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let filename = file
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("Invalid file name: {}", file.display()))?;

    let transcription = service
        .transcribe_upload(None, filename, &bytes, language, variant, remote)
        .await?;

    match format {
        OutputFormat::Text => println!("{}", transcription.text),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&transcription)?),
    }
    Ok(())
}

/// Print the effective configuration
pub fn handle_config_show(config: &Config, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => println!("{}", toml::to_string_pretty(config)?),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(config)?),
    }
    Ok(())
}

/// Manage keychain secrets
pub fn handle_secret(action: SecretAction, format: OutputFormat) -> Result<()> {
    let manager = Arc::new(SecretManager::new(SERVICE_NAME));

    match action {
        SecretAction::Set { key } => {
            if !KNOWN_KEYS.contains(&key.as_str()) {
                tracing::warn!("'{}' is not a key Axon uses", key);
            }
            let value = prompt_for_secret(&key)?;
            manager.set_secret(&key, &value)?;
            println!("Stored {}", key);
        }
        SecretAction::Delete { key } => {
            manager.delete_secret(&key)?;
            println!("Deleted {}", key);
        }
        SecretAction::List => {
            let store = SecretStore::new(manager);
            let status: Vec<(&str, bool)> = KNOWN_KEYS.iter().map(|k| (*k, store.has(k))).collect();

            match format {
                OutputFormat::Text => {
                    for (key, set) in &status {
                        println!("{:<22} {}", key, if *set { "set" } else { "not set" });
                    }
                }
                OutputFormat::Json => {
                    let map: serde_json::Map<String, serde_json::Value> = status
                        .iter()
                        .map(|(k, set)| (k.to_string(), json!(set)))
                        .collect();
                    println!("{}", serde_json::to_string_pretty(&map)?);
                }
            }
        }
    }
    Ok(())
}

/// Validate configuration and report which features are usable
pub async fn handle_doctor(config: &Config, format: OutputFormat) -> Result<()> {
    let secrets = keychain_secrets();
    let mut checks: Vec<(String, String)> = Vec::new();
    let mut issues = Vec::new();

    checks.push(("Configuration".into(), "Valid".into()));

    for (label, dir) in [
        ("Data directory", &config.core.data_dir),
        ("Staging directory", &config.core.staging_dir),
        ("Audio upload directory", &config.audio.upload_dir),
    ] {
        if dir.exists() {
            checks.push((label.into(), "Exists".into()));
        } else {
            checks.push((label.into(), "Missing".into()));
            issues.push(format!("{} does not exist: {:?}", label, dir));
        }
    }

    for key in KNOWN_KEYS {
        let set = secrets.has(key);
        let status = if set { "Configured" } else { "Not set" };
        checks.push((key.into(), status.into()));
    }

    match Orchestrator::from_config(config, &secrets, Arc::new(ConversationStore::new())) {
        Ok(orchestrator) => {
            let available = orchestrator.availability();
            for (label, ok) in [
                ("Direct search", available.direct_search),
                ("Graph agent", available.graph_agent),
                ("Tool agent", available.tool_agent),
            ] {
                let status = if ok { "Available" } else { "Unavailable" };
                checks.push((label.into(), status.into()));
            }
        }
        Err(e) => issues.push(format!("Tutor setup failed: {}", e)),
    }

    let model_key = match config.llm.provider.as_str() {
        "openai" => crate::secrets::OPENAI_API_KEY,
        _ => GROQ_API_KEY,
    };
    if !secrets.has(model_key) {
        issues.push(format!(
            "{} is required for provider '{}'. Run `axon secret set {}`",
            model_key, config.llm.provider, model_key
        ));
    }

    match format {
        OutputFormat::Text => {
            println!("Axon Doctor");
            println!();
            for (name, status) in &checks {
                println!("  {:<24} {}", name, status);
            }
            if issues.is_empty() {
                println!();
                println!("No issues found");
            } else {
                println!();
                println!("Issues:");
                for issue in &issues {
                    println!("  - {}", issue);
                }
            }
        }
        OutputFormat::Json => {
            let output = json!({
                "checks": checks
                    .iter()
                    .map(|(name, status)| json!({"name": name, "status": status}))
                    .collect::<Vec<_>>(),
                "issues": issues,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
