use async_trait::async_trait;
use axon_sdk::collaborators::Transcriber;
use axon_sdk::errors::{Result, TutorError};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::config::AudioConfig;
use crate::secrets::{SecretStore, GROQ_API_KEY};

/// Large uploads can take a while to transcribe
const TRANSCRIBE_TIMEOUT_SECS: u64 = 60;

/// Remote Whisper transcription through Groq's OpenAI-compatible endpoint
pub struct GroqTranscriber {
    base_url: String,
    model: String,
    secrets: SecretStore,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct TranscriptionResponse {
    #[serde(default)]
    text: String,
}

impl GroqTranscriber {
    pub fn new(config: &AudioConfig, secrets: SecretStore) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(TRANSCRIBE_TIMEOUT_SECS))
            .build()
            .map_err(|e| TutorError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: config.groq_base_url.trim_end_matches('/').to_string(),
            model: config.remote_model.clone(),
            secrets,
            client,
        })
    }
}

#[async_trait]
impl Transcriber for GroqTranscriber {
    async fn transcribe(&self, audio: &Path, language: &str) -> Result<String> {
        let api_key = self.secrets.require(GROQ_API_KEY)?;
        let bytes = tokio::fs::read(audio).await?;
        let file_name = audio
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio")
            .to_string();

        let form = reqwest::multipart::Form::new()
            .part("file", reqwest::multipart::Part::bytes(bytes).file_name(file_name))
            .text("model", self.model.clone())
            .text("language", language.to_string());

        let response = self
            .client
            .post(format!("{}/audio/transcriptions", self.base_url))
            .header("Authorization", format!("Bearer {}", api_key.unsecure()))
            .multipart(form)
            .send()
            .await
            .map_err(|e| TutorError::upstream(format!("Transcription request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(TutorError::upstream(format!(
                "Groq transcription returned {}: {}",
                status, text
            )));
        }

        let body: TranscriptionResponse = response
            .json()
            .await
            .map_err(|e| TutorError::upstream(format!("Invalid transcription response: {}", e)))?;

        Ok(body.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base: String) -> AudioConfig {
        AudioConfig {
            groq_base_url: base,
            ..AudioConfig::default()
        }
    }

    #[tokio::test]
    async fn test_transcribe_posts_multipart() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/audio/transcriptions"))
            .and(header("Authorization", "Bearer gsk_test"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"text": "Bonjour la classe"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let clip = dir.path().join("clip.wav");
        std::fs::write(&clip, b"RIFF").unwrap();

        let secrets = SecretStore::in_memory();
        secrets.insert(GROQ_API_KEY, "gsk_test");
        let transcriber = GroqTranscriber::new(&config(server.uri()), secrets).unwrap();

        let text = transcriber.transcribe(&clip, "fr").await.unwrap();
        assert_eq!(text, "Bonjour la classe");
    }

    #[tokio::test]
    async fn test_error_status_is_upstream() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/audio/transcriptions"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad audio"))
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let clip = dir.path().join("clip.wav");
        std::fs::write(&clip, b"RIFF").unwrap();

        let secrets = SecretStore::in_memory();
        secrets.insert(GROQ_API_KEY, "gsk_test");
        let transcriber = GroqTranscriber::new(&config(server.uri()), secrets).unwrap();

        let err = transcriber.transcribe(&clip, "en").await.unwrap_err();
        assert!(err.to_string().contains("bad audio"));
    }
}
