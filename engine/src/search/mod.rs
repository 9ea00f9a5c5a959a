//! Web search adapters
//!
//! - `TavilySearch`: premium search restricted to educational and reference
//!   domains, used by the direct-search strategy and the graph agent
//! - `DuckDuckGoSearch`: keyless general search, used as the tool agent's
//!   `web_search` tool

pub mod duckduckgo;
pub mod tavily;

pub use duckduckgo::DuckDuckGoSearch;
pub use tavily::TavilySearch;

use axon_sdk::errors::{Result, TutorError};
use std::time::Duration;

const SEARCH_TIMEOUT: Duration = Duration::from_secs(30);

fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(SEARCH_TIMEOUT)
        .build()
        .map_err(|e| TutorError::Configuration(format!("Failed to build HTTP client: {}", e)))
}
