//! Translation adapter
//!
//! `GoogleTranslator` implements the `Translator` trait over the Google Cloud
//! Translation v2 REST API. Every call (translate and detect) first acquires
//! the shared translation rate limiter.

use async_trait::async_trait;
use axon_sdk::collaborators::Translator;
use axon_sdk::errors::{Result, TutorError};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::config::TranslationConfig;
use crate::rate_limiter::RateLimiter;
use crate::secrets::SecretString;

/// True when `language` names English, in any case.
///
/// Regional tags such as "en-GB" count too, beyond the plain "en" and
/// "english", so they never trigger a round-trip through the translator.
pub fn is_english(language: &str) -> bool {
    let language = language.trim().to_lowercase();
    language == "en" || language == "english" || language.starts_with("en-")
}

pub struct GoogleTranslator {
    base_url: String,
    api_key: SecretString,
    limiter: Arc<RateLimiter>,
    client: reqwest::Client,
}

impl GoogleTranslator {
    pub fn new(
        config: &TranslationConfig,
        api_key: SecretString,
        limiter: Arc<RateLimiter>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| TutorError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            limiter,
            client,
        })
    }

    async fn post_form(&self, url: String, form: &[(&str, &str)]) -> Result<Value> {
        self.limiter.acquire().await;

        let response = self
            .client
            .post(url)
            .query(&[("key", self.api_key.unsecure())])
            .form(form)
            .send()
            .await
            .map_err(|e| TutorError::upstream(format!("Translation request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(TutorError::upstream(format!(
                "Translation API returned {}: {}",
                status, text
            )));
        }

        response
            .json()
            .await
            .map_err(|e| TutorError::upstream(format!("Invalid translation response: {}", e)))
    }
}

#[async_trait]
impl Translator for GoogleTranslator {
    async fn translate(&self, text: &str, source: Option<&str>, target: &str) -> Result<String> {
        let mut form = vec![("q", text), ("target", target), ("format", "text")];
        if let Some(source) = source {
            form.push(("source", source));
        }

        let body = self.post_form(self.base_url.clone(), &form).await?;

        let translated = body
            .pointer("/data/translations/0/translatedText")
            .and_then(|t| t.as_str())
            .ok_or_else(|| TutorError::upstream("No translation in response"))?;

        tracing::debug!(
            "Translated {} chars {} -> {}",
            text.len(),
            source.unwrap_or("auto"),
            target
        );
        Ok(translated.to_string())
    }

    async fn detect(&self, text: &str) -> Result<String> {
        let body = self
            .post_form(format!("{}/detect", self.base_url), &[("q", text)])
            .await?;

        let language = body
            .pointer("/data/detections/0/0/language")
            .and_then(|l| l.as_str())
            .ok_or_else(|| TutorError::upstream("No detection in response"))?;

        tracing::debug!("Detected language '{}'", language);
        Ok(language.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn translator_for(server: &MockServer, limiter: Arc<RateLimiter>) -> GoogleTranslator {
        let config = TranslationConfig {
            base_url: format!("{}/language/translate/v2", server.uri()),
        };
        GoogleTranslator::new(&config, SecretString::new("AIza-test"), limiter).unwrap()
    }

    #[test]
    fn test_is_english() {
        assert!(is_english("en"));
        assert!(is_english("English"));
        assert!(is_english("en-US"));
        assert!(!is_english("fr"));
        assert!(!is_english("auto"));
    }

    #[tokio::test]
    async fn test_translate_posts_form_and_reads_translation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/language/translate/v2"))
            .and(query_param("key", "AIza-test"))
            .and(body_string_contains("target=en"))
            .and(body_string_contains("source=fr"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"translations": [{"translatedText": "What is gravity?"}]}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let limiter = Arc::new(RateLimiter::new("translation", 20));
        let translator = translator_for(&server, Arc::clone(&limiter));
        let out = translator
            .translate("Qu'est-ce que la gravité ?", Some("fr"), "en")
            .await
            .unwrap();

        assert_eq!(out, "What is gravity?");
        assert_eq!(limiter.in_window().await, 1);
    }

    #[tokio::test]
    async fn test_detect_reads_first_detection() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/language/translate/v2/detect"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"detections": [[{"language": "fr", "confidence": 0.98}]]}
            })))
            .mount(&server)
            .await;

        let limiter = Arc::new(RateLimiter::new("translation", 20));
        let translator = translator_for(&server, limiter);
        assert_eq!(translator.detect("Bonjour").await.unwrap(), "fr");
    }

    #[tokio::test]
    async fn test_api_error_is_upstream_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("API key not valid"))
            .mount(&server)
            .await;

        let limiter = Arc::new(RateLimiter::new("translation", 20));
        let translator = translator_for(&server, limiter);
        let err = translator.translate("hola", None, "en").await.unwrap_err();
        assert!(matches!(err, TutorError::Upstream(_)));
    }
}
