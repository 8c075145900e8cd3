//! Sequential tool dispatch driven by a research record.
//!
//! Each `tools_used` entry is either a bare tool name or `name: argument`.
//! Entries run one at a time in the order the model listed them. Unknown
//! names and failing tools are reported and skipped. Once the loop is done
//! the summary is always handed to the persistence tool, exactly once.

use tracing::{info, warn};

use crate::record::ResearchRecord;
use crate::tool::{ToolKind, ToolOutput, ToolRegistry};

/// Progress notifications, emitted in the order things happen.
#[derive(Debug, Clone, Copy)]
pub enum DispatchEvent<'a> {
    /// An entry was split into a tool name and argument.
    Decided { tool: &'a str, argument: &'a str },
    /// A registered tool is about to run.
    Calling { kind: ToolKind },
    /// A registered tool finished, successfully or not.
    Completed { kind: ToolKind, output: &'a ToolOutput },
    /// The entry named a tool that is not registered.
    NotFound { tool: &'a str },
    /// The summary is about to be persisted.
    Saving,
    /// Persistence finished.
    Saved { output: &'a ToolOutput },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    /// The `tools_used` entry as the model wrote it.
    pub entry: String,
    /// Normalized tool name.
    pub tool: String,
    pub argument: String,
    /// `None` when the tool is not registered.
    pub output: Option<ToolOutput>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub invocations: Vec<ToolInvocation>,
    pub persisted: ToolOutput,
}

/// Split a `tools_used` entry on its first colon.
///
/// The name is trimmed and lowercased; the argument is trimmed. An entry
/// without a colon takes the user's query as its argument.
pub fn split_entry(entry: &str, user_query: &str) -> (String, String) {
    match entry.split_once(':') {
        Some((name, argument)) => (name.trim().to_lowercase(), argument.trim().to_string()),
        None => (entry.trim().to_lowercase(), user_query.to_string()),
    }
}

/// Run every tool the record names, then persist its summary.
pub async fn dispatch<F>(
    record: &ResearchRecord,
    user_query: &str,
    tools: &ToolRegistry,
    mut on_event: F,
) -> DispatchReport
where
    F: FnMut(DispatchEvent<'_>),
{
    let mut invocations = Vec::with_capacity(record.tools_used().len());

    for entry in record.tools_used() {
        let (tool, argument) = split_entry(entry, user_query);
        on_event(DispatchEvent::Decided {
            tool: &tool,
            argument: &argument,
        });

        let output = match tools.lookup(&tool) {
            Some(kind) => {
                on_event(DispatchEvent::Calling { kind });
                let output = tools.invoke(kind, &argument).await;
                on_event(DispatchEvent::Completed {
                    kind,
                    output: &output,
                });
                Some(output)
            }
            None => {
                warn!(tool = %tool, entry = %entry, "Model named an unregistered tool");
                on_event(DispatchEvent::NotFound { tool: &tool });
                None
            }
        };

        invocations.push(ToolInvocation {
            entry: entry.clone(),
            tool,
            argument,
            output,
        });
    }

    on_event(DispatchEvent::Saving);
    let persisted = tools
        .invoke(ToolKind::SaveTextToFile, record.summary())
        .await;
    on_event(DispatchEvent::Saved { output: &persisted });

    info!(
        invocations = invocations.len(),
        persisted = !persisted.is_error,
        "Dispatch finished"
    );

    DispatchReport {
        invocations,
        persisted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::testing::MockTool;
    use std::sync::Arc;

    struct Fixture {
        registry: ToolRegistry,
        search: Arc<MockTool>,
        wiki: Arc<MockTool>,
        save: Arc<MockTool>,
    }

    fn fixture() -> Fixture {
        let search = Arc::new(MockTool::new("Search the web for information"));
        let wiki = Arc::new(MockTool::new("Search Wikipedia for information."));
        let save = Arc::new(MockTool::new("Saves structured research data to a text file."));
        Fixture {
            registry: ToolRegistry::new(search.clone(), wiki.clone(), save.clone()),
            search,
            wiki,
            save,
        }
    }

    fn record(tools_used: &[&str]) -> ResearchRecord {
        ResearchRecord::new(
            "T",
            "S",
            vec![],
            tools_used.iter().map(|s| s.to_string()).collect(),
        )
    }

    #[test]
    fn test_split_entry_with_argument() {
        assert_eq!(
            split_entry("search: quantum computing", "q"),
            ("search".to_string(), "quantum computing".to_string())
        );
    }

    #[test]
    fn test_split_entry_without_argument() {
        assert_eq!(
            split_entry("search", "what is a qubit"),
            ("search".to_string(), "what is a qubit".to_string())
        );
    }

    #[test]
    fn test_split_entry_first_colon_only() {
        assert_eq!(
            split_entry(" Wiki :  Ratio 3:2 ", "q"),
            ("wiki".to_string(), "Ratio 3:2".to_string())
        );
        assert_eq!(
            split_entry("search:", "q"),
            ("search".to_string(), String::new())
        );
    }

    #[tokio::test]
    async fn test_dispatch_in_order_with_duplicates() {
        let f = fixture();
        let record = record(&["search: a", "wiki: b", "SEARCH: a", "search"]);

        let report = dispatch(&record, "user query", &f.registry, |_| {}).await;

        assert_eq!(f.search.calls(), vec!["a", "a", "user query"]);
        assert_eq!(f.wiki.calls(), vec!["b"]);
        assert_eq!(report.invocations.len(), 4);
        assert_eq!(report.invocations[2].entry, "SEARCH: a");
        assert_eq!(report.invocations[2].tool, "search");
    }

    #[tokio::test]
    async fn test_unknown_tool_does_not_stop_loop() {
        let f = fixture();
        let record = record(&["calculator: 2+2", "wiki: Rust"]);

        let mut not_found = Vec::new();
        let report = dispatch(&record, "q", &f.registry, |event| {
            if let DispatchEvent::NotFound { tool } = event {
                not_found.push(tool.to_string());
            }
        })
        .await;

        assert_eq!(not_found, vec!["calculator"]);
        assert!(report.invocations[0].output.is_none());
        assert_eq!(f.wiki.calls(), vec!["Rust"]);
        assert_eq!(f.save.calls(), vec!["S"]);
    }

    #[tokio::test]
    async fn test_tool_failure_does_not_stop_loop() {
        let f = fixture();
        f.search
            .queue_result(Err(Error::tool("search", "network unreachable")));
        let record = record(&["search: x", "wiki: y"]);

        let report = dispatch(&record, "q", &f.registry, |_| {}).await;

        let failed = report.invocations[0].output.as_ref().unwrap();
        assert!(failed.is_error);
        assert!(failed.content.contains("network unreachable"));
        assert_eq!(f.wiki.calls(), vec!["y"]);
        assert!(!report.persisted.is_error);
        assert_eq!(f.save.calls(), vec!["S"]);
    }

    #[tokio::test]
    async fn test_persists_once_even_when_requested() {
        let f = fixture();
        let record = record(&["save_text_to_file: draft"]);

        dispatch(&record, "q", &f.registry, |_| {}).await;

        assert_eq!(f.save.calls(), vec!["draft", "S"]);
    }

    #[tokio::test]
    async fn test_persists_with_no_tools() {
        let f = fixture();
        let report = dispatch(&record(&[]), "q", &f.registry, |_| {}).await;

        assert!(report.invocations.is_empty());
        assert!(f.search.calls().is_empty());
        assert_eq!(f.save.calls(), vec!["S"]);
        assert_eq!(report.persisted, ToolOutput::success("result for S"));
    }

    #[tokio::test]
    async fn test_event_order() {
        let f = fixture();
        let record = record(&["wiki: Topic", "nope"]);

        let mut events = Vec::new();
        dispatch(&record, "q", &f.registry, |event| {
            events.push(match event {
                DispatchEvent::Decided { tool, argument } => format!("decided {} {}", tool, argument),
                DispatchEvent::Calling { kind } => format!("calling {}", kind),
                DispatchEvent::Completed { kind, .. } => format!("completed {}", kind),
                DispatchEvent::NotFound { tool } => format!("not found {}", tool),
                DispatchEvent::Saving => "saving".to_string(),
                DispatchEvent::Saved { .. } => "saved".to_string(),
            });
        })
        .await;

        assert_eq!(
            events,
            vec![
                "decided wiki Topic",
                "calling wiki",
                "completed wiki",
                "decided nope q",
                "not found nope",
                "saving",
                "saved",
            ]
        );
    }
}
