//! ra-core: Core types and traits for research-agent
//!
//! This crate provides the contract between the language model and the rest
//! of the program: the prompt that asks for a research record, the interpreter
//! that turns raw model text back into one, and the loop that dispatches the
//! tools the record names.

pub mod dispatch;
pub mod error;
pub mod message;
pub mod prompt;
pub mod provider;
pub mod record;
pub mod tool;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use dispatch::{dispatch, split_entry, DispatchEvent, DispatchReport, ToolInvocation};
pub use error::Error;
pub use message::{strip_thinking_tags, Message, Role, Usage};
pub use prompt::{build_prompt, FORMAT_INSTRUCTIONS};
pub use provider::{CompletionRequest, CompletionResponse, FinishReason, Provider};
pub use record::{
    interpret, repair, strict_parse, InterpretError, Interpreted, ParseError, ParsePath,
    ResearchRecord, OPTIONAL_COLLECTIONS,
};
pub use tool::{Tool, ToolKind, ToolOutput, ToolRegistry};

pub type Result<T> = std::result::Result<T, Error>;
