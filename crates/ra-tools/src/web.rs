//! Web search through DuckDuckGo's HTML endpoint.

use async_trait::async_trait;
use reqwest::{Client, Url};
use scraper::{Html, Selector};
use tracing::debug;

use ra_core::{Error, Tool};

const TOOL_NAME: &str = "search";
const DEFAULT_ENDPOINT: &str = "https://html.duckduckgo.com/html/";
const NO_RESULTS: &str = "No good DuckDuckGo Search Result was found";

/// Configuration for the DuckDuckGo-based web search
#[derive(Clone, Debug)]
pub struct WebSearchConfig {
    /// HTML search endpoint
    pub endpoint: String,
    /// DuckDuckGo region code (e.g., "wt-wt", "us-en")
    pub region: String,
    /// Maximum number of result snippets to keep
    pub max_results: usize,
}

impl Default for WebSearchConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            region: "wt-wt".to_string(),
            max_results: 5,
        }
    }
}

impl WebSearchConfig {
    pub fn new(region: impl Into<String>, max_results: usize) -> Self {
        Self {
            region: region.into(),
            max_results,
            ..Self::default()
        }
    }
}

pub struct WebSearchTool {
    client: Client,
    config: WebSearchConfig,
}

impl WebSearchTool {
    pub fn new(config: WebSearchConfig) -> Self {
        Self {
            client: Client::builder()
                .user_agent("Mozilla/5.0 (compatible; research-agent/0.1)")
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            config,
        }
    }

    fn search_url(&self, query: &str) -> Result<Url, Error> {
        Url::parse_with_params(
            &self.config.endpoint,
            &[("q", query), ("kl", self.config.region.as_str())],
        )
        .map_err(|e| Error::tool(TOOL_NAME, format!("Invalid search endpoint: {}", e)))
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn description(&self) -> &str {
        "Search the web for information"
    }

    async fn execute(&self, argument: &str) -> Result<String, Error> {
        let query = argument.trim();
        if query.is_empty() {
            return Err(Error::tool(TOOL_NAME, "Empty search query"));
        }

        let url = self.search_url(query)?;
        debug!(%url, "Searching DuckDuckGo");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::tool(TOOL_NAME, format!("Search request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::tool(
                TOOL_NAME,
                format!("Search API error {}", response.status()),
            ));
        }

        let html = response
            .text()
            .await
            .map_err(|e| Error::tool(TOOL_NAME, format!("Failed to read response: {}", e)))?;

        let snippets = extract_snippets(&html, self.config.max_results);
        if snippets.is_empty() {
            Ok(NO_RESULTS.to_string())
        } else {
            Ok(snippets.join(" "))
        }
    }
}

/// Result snippets from a DuckDuckGo HTML results page, in page order.
fn extract_snippets(html: &str, max_results: usize) -> Vec<String> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse(".result__snippet") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .filter(|snippet| !snippet.is_empty())
        .take(max_results)
        .collect()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
