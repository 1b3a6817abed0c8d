//! Named canonical prompts available for numeric or key selection.
//!
//! Entries keep insertion order, which is also the numbered display order
//! used by [`super::resolve`]. The catalog is loaded once at startup from an
//! optional TOML file:
//!
//! ```toml
//! [[prompts]]
//! key = "success"
//! text = "What is the key to success?"
//! ```
//!
//! When the file is absent or unreadable the built-in prompts are used.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Built-in prompts used when no catalog file is configured.
const DEFAULT_PROMPTS: &[(&str, &str)] = &[
    ("success", "What is the key to success?"),
    ("strategy", "How would you handle a complex strategy?"),
    ("escape", "Plan a bold escape from a difficult situation."),
    ("money-making", "Generate a money-making plan."),
    ("argument", "Give advice for winning an argument."),
    ("setback", "How would you handle a sudden setback?"),
];

/// A single named prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptEntry {
    pub key: String,
    pub text: String,
}

impl PromptEntry {
    pub fn new(key: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            text: text.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    prompts: Vec<PromptEntry>,
}

/// Ordered key → text prompt catalog with unique keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptCatalog {
    entries: Vec<PromptEntry>,
}

impl PromptCatalog {
    /// Build a catalog from entries in display order. A repeated key replaces
    /// the text of its first occurrence.
    pub fn new(entries: impl IntoIterator<Item = PromptEntry>) -> Self {
        let mut catalog = Self::default();
        for entry in entries {
            catalog.add(entry.key, entry.text);
        }
        catalog
    }

    /// The built-in prompts.
    pub fn with_defaults() -> Self {
        Self::new(
            DEFAULT_PROMPTS
                .iter()
                .map(|(key, text)| PromptEntry::new(*key, *text)),
        )
    }

    /// Load from a TOML catalog file, falling back to the built-ins.
    pub fn load(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::with_defaults();
        };

        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Prompt catalog not readable, using built-in prompts");
                return Self::with_defaults();
            }
        };

        match toml::from_str::<CatalogFile>(&raw) {
            Ok(file) if !file.prompts.is_empty() => {
                let catalog = Self::new(file.prompts);
                info!(path = %path.display(), prompts = catalog.len(), "Loaded prompt catalog");
                catalog
            }
            Ok(_) => {
                warn!(path = %path.display(), "Prompt catalog is empty, using built-in prompts");
                Self::with_defaults()
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Prompt catalog is invalid, using built-in prompts");
                Self::with_defaults()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in display order.
    pub fn entries(&self) -> &[PromptEntry] {
        &self.entries
    }

    /// Text for `key`, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.key == key)
            .map(|e| e.text.as_str())
    }

    /// Entry at a 1-based display position.
    pub fn entry_at(&self, position: usize) -> Option<&PromptEntry> {
        position.checked_sub(1).and_then(|i| self.entries.get(i))
    }

    /// Insert a prompt, or replace the text of an existing key in place.
    pub fn add(&mut self, key: impl Into<String>, text: impl Into<String>) {
        let key = key.into();
        let text = text.into();
        match self.entries.iter_mut().find(|e| e.key == key) {
            Some(existing) => existing.text = text,
            None => self.entries.push(PromptEntry { key, text }),
        }
    }

    /// Replace the text of an existing key. Returns `false` if the key is unknown.
    pub fn update(&mut self, key: &str, text: impl Into<String>) -> bool {
        match self.entries.iter_mut().find(|e| e.key == key) {
            Some(existing) => {
                existing.text = text.into();
                true
            }
            None => {
                warn!(key, "Prompt key not found");
                false
            }
        }
    }

    /// Remove a prompt, returning it if it existed.
    pub fn remove(&mut self, key: &str) -> Option<PromptEntry> {
        let index = self.entries.iter().position(|e| e.key == key);
        if index.is_none() {
            warn!(key, "Prompt key not found");
        }
        index.map(|i| self.entries.remove(i))
    }

    /// Entries whose text contains `keyword`, case-insensitively, in display order.
    pub fn search(&self, keyword: &str) -> Vec<&PromptEntry> {
        let needle = keyword.to_lowercase();
        self.entries
            .iter()
            .filter(|e| e.text.to_lowercase().contains(&needle))
            .collect()
    }
}
