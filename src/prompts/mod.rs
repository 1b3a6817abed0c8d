//! Prompt catalog and input resolution.

pub mod catalog;
pub mod resolver;

pub use catalog::{PromptCatalog, PromptEntry};
pub use resolver::{resolve, selection_index};
