use async_trait::async_trait;
use axon_sdk::collaborators::SearchProvider;
use axon_sdk::errors::{Result, TutorError};
use axon_sdk::types::SearchHit;
use serde::Deserialize;

use crate::config::SearchConfig;

/// Keyless search over the DuckDuckGo instant-answer API
pub struct DuckDuckGoSearch {
    base_url: String,
    max_results: usize,
    client: reqwest::Client,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InstantAnswer {
    #[serde(default)]
    heading: String,
    #[serde(default)]
    abstract_text: String,
    #[serde(rename = "AbstractURL", default)]
    abstract_url: String,
    #[serde(default)]
    related_topics: Vec<RelatedTopic>,
}

/// Either a single topic or a named group of topics
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RelatedTopic {
    Topic {
        #[serde(rename = "Text")]
        text: String,
        #[serde(rename = "FirstURL")]
        first_url: String,
    },
    Group {
        #[serde(rename = "Topics")]
        topics: Vec<RelatedTopic>,
    },
}

impl DuckDuckGoSearch {
    pub fn new(config: &SearchConfig) -> Result<Self> {
        Ok(Self {
            base_url: config.duckduckgo_base_url.trim_end_matches('/').to_string(),
            max_results: config.max_results,
            client: super::http_client()?,
        })
    }
}

fn flatten_topics(topics: Vec<RelatedTopic>, out: &mut Vec<SearchHit>) {
    for topic in topics {
        match topic {
            RelatedTopic::Topic { text, first_url } => {
                let title = text
                    .split(" - ")
                    .next()
                    .unwrap_or(text.as_str())
                    .to_string();
                out.push(SearchHit::new(first_url, title, text));
            }
            RelatedTopic::Group { topics } => flatten_topics(topics, out),
        }
    }
}

#[async_trait]
impl SearchProvider for DuckDuckGoSearch {
    fn name(&self) -> &str {
        "duckduckgo"
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        let response = self
            .client
            .get(format!("{}/", self.base_url))
            .query(&[
                ("q", query),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ])
            .send()
            .await
            .map_err(|e| TutorError::upstream(format!("DuckDuckGo request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(TutorError::upstream(format!(
                "DuckDuckGo returned {}",
                response.status()
            )));
        }

        let answer: InstantAnswer = response
            .json()
            .await
            .map_err(|e| TutorError::upstream(format!("Invalid DuckDuckGo response: {}", e)))?;

        let mut hits = Vec::new();
        if !answer.abstract_text.is_empty() {
            hits.push(SearchHit::new(
                answer.abstract_url,
                answer.heading,
                answer.abstract_text,
            ));
        }
        flatten_topics(answer.related_topics, &mut hits);
        hits.truncate(self.max_results);

        tracing::debug!("DuckDuckGo returned {} results for '{}'", hits.len(), query);
        Ok(hits)
    }
}
