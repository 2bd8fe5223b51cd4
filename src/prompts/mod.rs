//! Prompt module for LLM-based operations.
//!
//! This module provides prompt templates for the text-generation provider.

pub mod query_refinement;
pub mod summarize;

pub use query_refinement::build_refinement_prompt;
pub use summarize::build_summary_prompt;
