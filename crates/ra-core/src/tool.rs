use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::Error;

/// The fixed set of tools a research record may name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    Search,
    Wiki,
    SaveTextToFile,
}

impl ToolKind {
    /// Registration order, which is also the order tools are described to the model.
    pub const ALL: [ToolKind; 3] = [ToolKind::Search, ToolKind::Wiki, ToolKind::SaveTextToFile];

    pub fn name(&self) -> &'static str {
        match self {
            ToolKind::Search => "search",
            ToolKind::Wiki => "wiki",
            ToolKind::SaveTextToFile => "save_text_to_file",
        }
    }

    /// Case-insensitive lookup; surrounding whitespace is ignored.
    pub fn from_name(name: &str) -> Option<Self> {
        let normalized = name.trim().to_lowercase();
        Self::ALL.into_iter().find(|kind| kind.name() == normalized)
    }
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub content: String,
    pub is_error: bool,
}

impl ToolOutput {
    pub fn success(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: true,
        }
    }
}

/// A tool takes one text argument and produces one text result.
#[async_trait]
pub trait Tool: Send + Sync {
    fn description(&self) -> &str;

    async fn execute(&self, argument: &str) -> Result<String, Error>;
}

/// One implementation per `ToolKind`, fixed at construction.
pub struct ToolRegistry {
    search: Arc<dyn Tool>,
    wiki: Arc<dyn Tool>,
    save: Arc<dyn Tool>,
}

impl ToolRegistry {
    pub fn new(search: Arc<dyn Tool>, wiki: Arc<dyn Tool>, save: Arc<dyn Tool>) -> Self {
        Self { search, wiki, save }
    }

    pub fn get(&self, kind: ToolKind) -> &dyn Tool {
        match kind {
            ToolKind::Search => self.search.as_ref(),
            ToolKind::Wiki => self.wiki.as_ref(),
            ToolKind::SaveTextToFile => self.save.as_ref(),
        }
    }

    pub fn lookup(&self, name: &str) -> Option<ToolKind> {
        ToolKind::from_name(name)
    }

    /// One `- name: description` line per tool, in registration order.
    pub fn render_descriptions(&self) -> String {
        ToolKind::ALL
            .iter()
            .map(|kind| format!("- {}: {}\n", kind.name(), self.get(*kind).description()))
            .collect()
    }

    /// Run a tool, folding any failure into an error output.
    pub async fn invoke(&self, kind: ToolKind, argument: &str) -> ToolOutput {
        debug!(tool = %kind, argument, "Invoking tool");
        match self.get(kind).execute(argument).await {
            Ok(content) => ToolOutput::success(content),
            Err(e) => {
                warn!(tool = %kind, error = %e, "Tool invocation failed");
                ToolOutput::error(e.to_string())
            }
        }
    }
}
