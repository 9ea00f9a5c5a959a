use async_trait::async_trait;
use axon_sdk::collaborators::SearchProvider;
use axon_sdk::errors::{Result, TutorError};
use axon_sdk::types::SearchHit;
use serde::Deserialize;
use serde_json::json;

use crate::config::SearchConfig;
use crate::secrets::SecretString;

/// Domain-filtered premium search
pub struct TavilySearch {
    base_url: String,
    api_key: SecretString,
    max_results: usize,
    include_domains: Vec<String>,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    url: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
}

impl TavilySearch {
    pub fn new(config: &SearchConfig, api_key: SecretString) -> Result<Self> {
        Ok(Self {
            base_url: config.tavily_base_url.trim_end_matches('/').to_string(),
            api_key,
            max_results: config.max_results,
            include_domains: config.include_domains.clone(),
            client: super::http_client()?,
        })
    }
}

#[async_trait]
impl SearchProvider for TavilySearch {
    fn name(&self) -> &str {
        "tavily"
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        let payload = json!({
            "api_key": self.api_key.unsecure(),
            "query": query,
            "max_results": self.max_results,
            "include_domains": self.include_domains,
            "search_depth": "basic",
        });

        let response = self
            .client
            .post(format!("{}/search", self.base_url))
            .json(&payload)
            .send()
            .await
            .map_err(|e| TutorError::upstream(format!("Tavily request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(TutorError::upstream(format!(
                "Tavily returned {}: {}",
                status, text
            )));
        }

        let body: TavilyResponse = response
            .json()
            .await
            .map_err(|e| TutorError::upstream(format!("Invalid Tavily response: {}", e)))?;

        let hits: Vec<SearchHit> = body
            .results
            .into_iter()
            .take(self.max_results)
            .map(|r| SearchHit::new(r.url, r.title, r.content))
            .collect();

        tracing::debug!("Tavily returned {} results for '{}'", hits.len(), query);
        Ok(hits)
    }
}
