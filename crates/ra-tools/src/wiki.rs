//! Wikipedia lookup: resolve the best-matching page, return the lead sentences.

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::debug;

use ra_core::{Error, Tool};

const TOOL_NAME: &str = "wiki";

#[derive(Clone, Debug)]
pub struct WikipediaConfig {
    /// Wikipedia language edition (subdomain), e.g. "en"
    pub language: String,
    /// Number of sentences of the page summary to return
    pub sentences: usize,
}

impl Default for WikipediaConfig {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            sentences: 3,
        }
    }
}

impl WikipediaConfig {
    pub fn new(language: impl Into<String>, sentences: usize) -> Self {
        Self {
            language: language.into(),
            sentences,
        }
    }

    fn base_url(&self) -> String {
        format!("https://{}.wikipedia.org", self.language)
    }
}

pub struct WikipediaTool {
    client: Client,
    config: WikipediaConfig,
}

impl WikipediaTool {
    pub fn new(config: WikipediaConfig) -> Self {
        Self {
            client: Client::builder()
                .user_agent(concat!("research-agent/", env!("CARGO_PKG_VERSION")))
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            config,
        }
    }

    fn search_url(&self, query: &str) -> Result<Url, Error> {
        Url::parse_with_params(
            &format!("{}/w/api.php", self.config.base_url()),
            &[
                ("action", "query"),
                ("list", "search"),
                ("srsearch", query),
                ("srlimit", "1"),
                ("format", "json"),
                ("utf8", "1"),
            ],
        )
        .map_err(|e| Error::tool(TOOL_NAME, format!("Invalid Wikipedia URL: {}", e)))
    }

    fn summary_url(&self, title: &str) -> Result<Url, Error> {
        let mut url = Url::parse(&format!("{}/api/rest_v1/page/summary", self.config.base_url()))
            .map_err(|e| Error::tool(TOOL_NAME, format!("Invalid Wikipedia URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| Error::tool(TOOL_NAME, "Wikipedia URL cannot take a path"))?
            .push(&title.replace(' ', "_"));
        Ok(url)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::tool(TOOL_NAME, format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::tool(
                TOOL_NAME,
                format!("Wikipedia API error {}", response.status()),
            ));
        }

        response
            .json()
            .await
            .map_err(|e| Error::tool(TOOL_NAME, format!("Failed to parse response: {}", e)))
    }

    /// Title of the best search hit for `query`.
    async fn resolve_title(&self, query: &str) -> Result<String, Error> {
        let result: SearchResponse = self.get_json(self.search_url(query)?).await?;
        result
            .query
            .search
            .into_iter()
            .next()
            .map(|hit| hit.title)
            .ok_or_else(|| {
                Error::tool(
                    TOOL_NAME,
                    format!("Page id \"{}\" does not match any pages", query),
                )
            })
    }
}

#[derive(Deserialize)]
struct SearchResponse {
    query: SearchQuery,
}

#[derive(Deserialize)]
struct SearchQuery {
    search: Vec<SearchHit>,
}

#[derive(Deserialize)]
struct SearchHit {
    title: String,
}

#[derive(Deserialize)]
struct PageSummary {
    #[serde(rename = "type", default)]
    page_type: String,
    title: String,
    #[serde(default)]
    extract: String,
}

#[async_trait]
impl Tool for WikipediaTool {
    fn description(&self) -> &str {
        "Search Wikipedia for information."
    }

    async fn execute(&self, argument: &str) -> Result<String, Error> {
        let query = argument.trim();
        if query.is_empty() {
            return Err(Error::tool(TOOL_NAME, "Empty Wikipedia query"));
        }

        let title = self.resolve_title(query).await?;
        debug!(query, title = %title, "Resolved Wikipedia page");

        let summary: PageSummary = self.get_json(self.summary_url(&title)?).await?;
        if summary.page_type == "disambiguation" {
            return Err(Error::tool(
                TOOL_NAME,
                format!("\"{}\" may refer to several pages", summary.title),
            ));
        }

        let text = first_sentences(&summary.extract, self.config.sentences);
        if text.is_empty() {
            return Err(Error::tool(
                TOOL_NAME,
                format!("Page \"{}\" has no summary", summary.title),
            ));
        }
        Ok(text)
    }
}

/// The first `count` sentences of `text`.
///
/// A sentence ends at `.`, `!` or `?` followed by the end of the text, or by
/// whitespace and then an uppercase letter or punctuation. A period before a
/// number or a lowercase word ("Dec. 2023", "e.g. this") does not end one.
/// Abbreviations before a capitalized word ("Mr. Smith") still do.
/// Returns the whole (trimmed) text when it is shorter.
fn first_sentences(text: &str, count: usize) -> String {
    if count == 0 {
        return String::new();
    }

    let mut seen = 0;
    for (i, ch) in text.char_indices() {
        if !matches!(ch, '.' | '!' | '?') {
            continue;
        }

        let end = i + ch.len_utf8();
        let rest = &text[end..];
        let next = rest.trim_start().chars().next();
        let at_boundary = match next {
            None => true,
            Some(c) => {
                rest.starts_with(char::is_whitespace) && (c.is_uppercase() || !c.is_alphanumeric())
            }
        };

        if at_boundary {
            seen += 1;
            if seen == count {
                return text[..end].trim().to_string();
            }
        }
    }

    text.trim().to_string()
}
