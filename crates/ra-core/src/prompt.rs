//! Prompt construction for the single research completion.

use crate::tool::ToolRegistry;

/// The exact shape the model is told to answer in.
pub const FORMAT_INSTRUCTIONS: &str =
    r#"{"topic": string, "summary": string, "sources": list of string, "tools_used": list of string}"#;

const SYSTEM_PROMPT: &str = r#"You are a research assistant that will help generate a research paper.
You have access to these tools: search (web search), wiki (Wikipedia lookup), save_text_to_file (save research to a text file).
When answering, use the tools as needed and always list the tools you used in the 'tools_used' field, even if you only considered them.
If you use a tool, specify it in 'tools_used' as 'tool_name: argument'.
Always return a valid JSON object with ALL of these fields: topic (str), summary (str), sources (list of str), tools_used (list of str).
If you do not use a tool, return an empty list for tools_used. If you do not have sources, return an empty list for sources.
Wrap the output in this format and provide no other text:"#;

/// Instruction block, format description, tool list, then the query.
pub fn build_prompt(user_query: &str, tools: &ToolRegistry) -> String {
    format!(
        "{}\n{}\n\n\nAvailable tools:\n{}\n\nUser query: {}",
        SYSTEM_PROMPT,
        FORMAT_INSTRUCTIONS,
        tools.render_descriptions(),
        user_query
    )
}
