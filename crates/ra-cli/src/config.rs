use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use ra_tools::{WebSearchConfig, WikipediaConfig};

/// Environment variables that must be set before anything else runs.
pub const REQUIRED_SECRETS: &[&str] = &["OPENROUTER_API_KEY"];

const ENV_PREFIX: &str = "RESEARCH_AGENT_";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// OpenRouter model id
    pub model: String,

    /// OpenAI-compatible API base URL
    pub base_url: String,

    /// Sent as HTTP-Referer for OpenRouter app attribution
    pub referer: String,

    /// Sent as X-Title for OpenRouter app attribution
    pub title: String,

    /// Append-only research log (supports $VAR, ${VAR}, ~)
    pub output_file: String,

    #[serde(default)]
    pub search: SearchConfigEntry,

    #[serde(default)]
    pub wiki: WikiConfigEntry,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: "microsoft/mai-ds-r1:free".to_string(),
            base_url: "https://openrouter.ai/api/v1".to_string(),
            referer: "http://localhost:5000".to_string(),
            title: "AI Agent Tutorial".to_string(),
            output_file: "research_output.txt".to_string(),
            search: SearchConfigEntry::default(),
            wiki: WikiConfigEntry::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfigEntry {
    /// DuckDuckGo region code
    #[serde(default = "default_region")]
    pub region: String,

    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

fn default_region() -> String {
    "wt-wt".to_string()
}

fn default_max_results() -> usize {
    5
}

impl Default for SearchConfigEntry {
    fn default() -> Self {
        Self {
            region: default_region(),
            max_results: default_max_results(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WikiConfigEntry {
    #[serde(default = "default_language")]
    pub language: String,

    /// Sentences of the page summary to return
    #[serde(default = "default_sentences")]
    pub sentences: usize,
}

fn default_language() -> String {
    "en".to_string()
}

fn default_sentences() -> usize {
    3
}

impl Default for WikiConfigEntry {
    fn default() -> Self {
        Self {
            language: default_language(),
            sentences: default_sentences(),
        }
    }
}

/// Expand environment variables in a path string
/// Supports: $VAR, ${VAR}, ~
pub fn expand_path(path: &str) -> PathBuf {
    let mut result = path.to_string();

    // Expand ~ at the start
    if result.starts_with("~/") {
        if let Some(home) = dirs::home_dir() {
            result = format!("{}{}", home.display(), &result[1..]);
        }
    } else if result == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }

    // Expand $VAR and ${VAR}; unknown variables are left as written
    let Ok(re) = regex::Regex::new(r"\$\{?([A-Za-z_][A-Za-z0-9_]*)\}?") else {
        return PathBuf::from(result);
    };
    let expanded = re.replace_all(&result, |caps: &regex::Captures| {
        let var_name = &caps[1];
        std::env::var(var_name).unwrap_or_else(|_| caps[0].to_string())
    });

    PathBuf::from(expanded.to_string())
}

impl Config {
    /// Defaults, then the config file if present, then `RESEARCH_AGENT_*` variables.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        Self::figment(Some(&path))
            .extract()
            .with_context(|| format!("Invalid configuration (file: {})", path.display()))
    }

    pub fn figment(file: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = file {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        Ok(config_dir.join("research-agent").join("config.toml"))
    }

    pub fn output_path(&self) -> PathBuf {
        expand_path(&self.output_file)
    }

    pub fn web_search_config(&self) -> WebSearchConfig {
        WebSearchConfig::new(&self.search.region, self.search.max_results)
    }

    pub fn wikipedia_config(&self) -> WikipediaConfig {
        WikipediaConfig::new(&self.wiki.language, self.wiki.sentences)
    }
}

/// Credentials read from the environment, never from the config file.
#[derive(Clone)]
pub struct Secrets {
    pub openrouter_api_key: String,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("openrouter_api_key", &"<redacted>")
            .finish()
    }
}

impl Secrets {
    /// Load `.env` if there is one, then read the process environment.
    pub fn load() -> Result<Self, ra_core::Error> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!(path = %path.display(), "Loaded .env"),
            Err(e) => tracing::debug!(error = %e, "No .env loaded"),
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Every required name that is unset or empty is reported in one error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ra_core::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let present = |name: &str| lookup(name).filter(|v| !v.is_empty());

        let missing: Vec<&str> = REQUIRED_SECRETS
            .iter()
            .copied()
            .filter(|name| present(name).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(ra_core::Error::config(format!(
                "Missing required environment variables: {}",
                missing.join(", ")
            )));
        }

        Ok(Self {
            openrouter_api_key: present("OPENROUTER_API_KEY").unwrap_or_default(),
        })
    }
}
