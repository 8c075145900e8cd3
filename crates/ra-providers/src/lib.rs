//! ra-providers: LLM provider implementations for research-agent
//!
//! This crate provides implementations of the Provider trait for LLM APIs.

pub mod openrouter;

pub use openrouter::OpenRouterProvider;
