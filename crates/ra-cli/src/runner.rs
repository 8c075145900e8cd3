//! One research run: prompt, complete, interpret, dispatch.

use std::io::Write;

use anyhow::Result;
use tracing::{debug, info, warn};

use ra_core::{
    build_prompt, dispatch, interpret, CompletionRequest, DispatchEvent, DispatchReport, Error,
    FinishReason, InterpretError, ParsePath, Provider, ToolRegistry,
};

use crate::config::Config;

/// Sampling is deterministic for every run.
pub const TEMPERATURE: f32 = 0.0;
/// Output-length cap for the single completion.
pub const MAX_TOKENS: u32 = 1000;

const EMPTY_RESPONSE_HINT: &str =
    "LLM returned an empty response. Please try again or check your API/model settings.";

/// Everything a run needs, built once at startup.
pub struct ResearchContext {
    pub tools: ToolRegistry,
    pub model: String,
}

impl ResearchContext {
    pub fn new(tools: ToolRegistry, model: impl Into<String>) -> Self {
        Self {
            tools,
            model: model.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let tools = ra_tools::create_tool_registry(
            config.web_search_config(),
            config.wikipedia_config(),
            config.output_path(),
        );
        Self::new(tools, &config.model)
    }
}

/// How a run ended. Only `Completed` persisted anything.
#[derive(Debug)]
pub enum RunOutcome {
    Completed {
        report: DispatchReport,
        repaired: bool,
    },
    CallFailed(Error),
    ParseFailed(InterpretError),
}

/// Ask the model once and act on its answer, writing progress to `out`.
pub async fn run<W: Write>(
    ctx: &ResearchContext,
    provider: &dyn Provider,
    query: &str,
    out: &mut W,
) -> Result<RunOutcome> {
    let prompt = build_prompt(query, &ctx.tools);
    debug!(chars = prompt.len(), "Built prompt");

    let request = CompletionRequest::from_prompt(prompt)
        .with_model(&ctx.model)
        .with_temperature(TEMPERATURE)
        .with_max_tokens(MAX_TOKENS);

    info!(model = %ctx.model, provider = provider.name(), "Requesting completion");
    let raw = match provider.complete(request).await {
        Ok(response) => {
            if let Some(thinking) = &response.thinking {
                debug!(thinking = %thinking, "Model reasoning");
            }
            debug!(
                model = %response.model,
                prompt_tokens = response.usage.prompt_tokens,
                completion_tokens = response.usage.completion_tokens,
                "Completion received"
            );
            if let Some(reason) = cut_short(response.finish_reason) {
                warn!(max_tokens = MAX_TOKENS, "Response was cut short: {}", reason);
            }
            response.into_text()
        }
        Err(e) => Err(e),
    };

    let raw = match raw {
        Ok(raw) => raw,
        Err(Error::EmptyResponse) => {
            warn!("Model returned an empty response");
            writeln!(out, "{}", EMPTY_RESPONSE_HINT)?;
            return Ok(RunOutcome::CallFailed(Error::EmptyResponse));
        }
        Err(e) => {
            warn!(error = %e, "Completion failed");
            writeln!(out, "Error occurred: {}", e)?;
            writeln!(out, "{}", EMPTY_RESPONSE_HINT)?;
            return Ok(RunOutcome::CallFailed(e));
        }
    };

    writeln!(out, "\nRaw LLM Response:\n{}", raw)?;

    let interpreted = match interpret(&raw) {
        Ok(interpreted) => interpreted,
        Err(e) => {
            writeln!(out, "Could not parse response: {}", e.strict)?;
            writeln!(out, "Still could not parse response: {}", e.repair)?;
            return Ok(RunOutcome::ParseFailed(e));
        }
    };

    match &interpreted.path {
        ParsePath::Strict => writeln!(out, "\nParsed Response:")?,
        ParsePath::Repaired { strict_error } => {
            writeln!(out, "Could not parse response, trying to fix... {}", strict_error)?;
            writeln!(out, "\nParsed Response (after fix):")?;
        }
    }
    writeln!(out, "{}", interpreted.record)?;
    writeln!(out, "\nAgent process:")?;

    let mut write_error = None;
    let report = dispatch(&interpreted.record, query, &ctx.tools, |event| {
        if write_error.is_none() {
            if let Err(e) = writeln!(out, "{}", describe(&event)) {
                write_error = Some(e);
            }
        }
    })
    .await;
    if let Some(e) = write_error {
        return Err(e.into());
    }

    Ok(RunOutcome::Completed {
        report,
        repaired: interpreted.was_repaired(),
    })
}

/// Why the model stopped before finishing its answer, if it did.
fn cut_short(reason: FinishReason) -> Option<&'static str> {
    match reason {
        FinishReason::Length => Some("token limit reached, the JSON is likely truncated"),
        FinishReason::ContentFilter => Some("content filter"),
        FinishReason::Error => Some("provider reported an error"),
        FinishReason::Stop => None,
    }
}

/// Human-readable line for a dispatch event.
fn describe(event: &DispatchEvent<'_>) -> String {
    match event {
        DispatchEvent::Decided { tool, argument } => {
            format!("Agent decided to use tool: {} with argument: {}", tool, argument)
        }
        DispatchEvent::Calling { kind } => format!("Calling tool '{}'...", kind),
        DispatchEvent::Completed { kind, output } => {
            format!("Tool '{}' result: {}", kind, output.content)
        }
        DispatchEvent::NotFound { tool } => format!("Tool '{}' not found.", tool),
        DispatchEvent::Saving => "Saving summary to file using save_text_to_file...".to_string(),
        DispatchEvent::Saved { output } => {
            format!("Tool 'save_text_to_file' result: {}", output.content)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ra_core::testing::{MockProvider, MockTool};
    use ra_tools::SaveTextTool;
    use std::path::PathBuf;
    use std::sync::Arc;

    struct Harness {
        ctx: ResearchContext,
        provider: MockProvider,
        search: Arc<MockTool>,
        wiki: Arc<MockTool>,
        output: PathBuf,
        _dir: tempfile::TempDir,
    }

    fn harness() -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("research_output.txt");
        let search = Arc::new(MockTool::new("Search the web for information"));
        let wiki = Arc::new(MockTool::new("Search Wikipedia for information."));
        let tools = ToolRegistry::new(
            search.clone(),
            wiki.clone(),
            Arc::new(SaveTextTool::new(&output)),
        );
        Harness {
            ctx: ResearchContext::new(tools, "microsoft/mai-ds-r1:free"),
            provider: MockProvider::new(),
            search,
            wiki,
            output,
            _dir: dir,
        }
    }

    impl Harness {
        async fn run(&self, query: &str) -> (RunOutcome, String) {
            let mut out = Vec::new();
            let outcome = run(&self.ctx, &self.provider, query, &mut out)
                .await
                .unwrap();
            (outcome, String::from_utf8(out).unwrap())
        }

        fn saved(&self) -> Option<String> {
            std::fs::read_to_string(&self.output).ok()
        }
    }

    #[tokio::test]
    async fn test_strict_record_dispatches_and_persists() {
        let h = harness();
        h.provider.queue_response(
            r#"{"topic":"T","summary":"S","sources":[],"tools_used":["wiki: Topic"]}"#,
        );

        let (outcome, output) = h.run("tell me about T").await;

        match outcome {
            RunOutcome::Completed { report, repaired } => {
                assert!(!repaired);
                assert_eq!(report.invocations.len(), 1);
                assert!(!report.persisted.is_error);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(h.wiki.calls(), vec!["Topic"]);
        assert!(h.search.calls().is_empty());

        let saved = h.saved().unwrap();
        assert_eq!(saved.matches("--- Research Output ---").count(), 1);
        assert!(saved.contains("\n\nS\n\n"));

        assert!(output.contains("Parsed Response:\nTopic: T"));
        assert!(output.contains("Agent decided to use tool: wiki with argument: Topic"));
        assert!(output.contains("Calling tool 'wiki'..."));
        assert!(output.contains("Tool 'wiki' result: result for Topic"));
        assert!(output.contains("Saving summary to file using save_text_to_file..."));
        assert!(output.contains("Tool 'save_text_to_file' result: Data successfully saved to"));
    }

    #[tokio::test]
    async fn test_repaired_record_still_persists() {
        let h = harness();
        h.provider.queue_response(r#"{"topic":"T","summary":"S"}"#);

        let (outcome, output) = h.run("q").await;

        match outcome {
            RunOutcome::Completed { report, repaired } => {
                assert!(repaired);
                assert!(report.invocations.is_empty());
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert!(h.search.calls().is_empty());
        assert!(h.wiki.calls().is_empty());
        assert_eq!(h.saved().unwrap().matches("\n\nS\n\n").count(), 1);
        assert!(output.contains("Could not parse response, trying to fix..."));
        assert!(output.contains("Parsed Response (after fix):"));
    }

    #[tokio::test]
    async fn test_missing_topic_persists_nothing() {
        let h = harness();
        h.provider
            .queue_response(r#"{"summary":"S","sources":[],"tools_used":["search: x"]}"#);

        let (outcome, output) = h.run("q").await;

        assert!(matches!(outcome, RunOutcome::ParseFailed(_)));
        assert!(h.saved().is_none());
        assert!(h.search.calls().is_empty());
        assert!(output.contains("Still could not parse response:"));
        assert!(output.contains("topic"));
    }

    #[tokio::test]
    async fn test_malformed_response_persists_nothing() {
        let h = harness();
        h.provider.queue_response("Sure! Here is the research you asked for.");

        let (outcome, _) = h.run("q").await;

        assert!(matches!(outcome, RunOutcome::ParseFailed(_)));
        assert!(h.saved().is_none());
    }

    #[tokio::test]
    async fn test_bare_tool_uses_query_and_unknown_tool_is_skipped() {
        let h = harness();
        h.provider.queue_response(
            r#"{"topic":"T","summary":"S","sources":[],"tools_used":["calculator: 1+1","Search"]}"#,
        );

        let (outcome, output) = h.run("quantum computing").await;

        assert!(matches!(outcome, RunOutcome::Completed { .. }));
        assert_eq!(h.search.calls(), vec!["quantum computing"]);
        assert!(output.contains("Tool 'calculator' not found."));
        assert!(h.saved().is_some());
    }

    #[test]
    fn test_cut_short() {
        assert!(cut_short(FinishReason::Length).unwrap().contains("token limit"));
        assert!(cut_short(FinishReason::ContentFilter).is_some());
        assert!(cut_short(FinishReason::Stop).is_none());
    }

    #[tokio::test]
    async fn test_truncated_response_persists_nothing() {
        let h = harness();
        h.provider.queue_completion(
            r#"{"topic":"T","summary":"A long summary that ran past the"#,
            FinishReason::Length,
        );

        let (outcome, output) = h.run("q").await;

        assert!(matches!(outcome, RunOutcome::ParseFailed(_)));
        assert!(output.contains("Raw LLM Response:"));
        assert!(h.saved().is_none());
    }

    #[tokio::test]
    async fn test_call_failure_stops_run() {
        let h = harness();
        h.provider.queue_error(Error::auth("No auth credentials found"));

        let (outcome, output) = h.run("q").await;

        match outcome {
            RunOutcome::CallFailed(e) => assert!(e.is_auth_error()),
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert!(output.starts_with("Error occurred: Authentication error"));
        assert!(!output.contains("Raw LLM Response"));
        assert!(h.saved().is_none());
    }

    #[tokio::test]
    async fn test_blank_response_is_call_failure() {
        let h = harness();
        h.provider.queue_response("  \n ");

        let (outcome, output) = h.run("q").await;

        assert!(matches!(outcome, RunOutcome::CallFailed(Error::EmptyResponse)));
        assert_eq!(output.trim(), EMPTY_RESPONSE_HINT);
        assert!(h.saved().is_none());
    }

    #[tokio::test]
    async fn test_request_parameters() {
        let h = harness();
        h.provider
            .queue_response(r#"{"topic":"T","summary":"S","sources":[],"tools_used":[]}"#);

        let _ = h.run("history of the transistor").await;

        assert_eq!(h.provider.request_count(), 1);
        let request = h.provider.last_request().unwrap();
        assert_eq!(request.model.as_deref(), Some("microsoft/mai-ds-r1:free"));
        assert_eq!(request.temperature, Some(0.0));
        assert_eq!(request.max_tokens, Some(1000));
        assert_eq!(request.messages.len(), 1);
        assert!(request.messages[0]
            .content
            .ends_with("User query: history of the transistor"));
    }
}
