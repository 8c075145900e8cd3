//! ra-tools: Built-in tools for research-agent
//!
//! This crate provides the three tools a research record may name:
//! - Search: DuckDuckGo web search
//! - Wiki: Wikipedia summaries
//! - Save text to file: append-only research log

pub mod filesystem;
pub mod web;
pub mod wiki;

use std::path::PathBuf;
use std::sync::Arc;

use ra_core::ToolRegistry;

pub use filesystem::SaveTextTool;
pub use web::{WebSearchConfig, WebSearchTool};
pub use wiki::{WikipediaConfig, WikipediaTool};

/// Build the fixed registry from tool settings.
pub fn create_tool_registry(
    search: WebSearchConfig,
    wiki: WikipediaConfig,
    output_file: impl Into<PathBuf>,
) -> ToolRegistry {
    ToolRegistry::new(
        Arc::new(WebSearchTool::new(search)),
        Arc::new(WikipediaTool::new(wiki)),
        Arc::new(SaveTextTool::new(output_file)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_descriptions() {
        let registry = create_tool_registry(
            WebSearchConfig::default(),
            WikipediaConfig::default(),
            "research_output.txt",
        );
        assert_eq!(
            registry.render_descriptions(),
            "- search: Search the web for information\n\
             - wiki: Search Wikipedia for information.\n\
             - save_text_to_file: Saves structured research data to a text file.\n"
        );
    }
}
