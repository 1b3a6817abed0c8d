//! Running conversation transcript for one session.

use std::fmt;

/// Persona line every transcript starts with.
pub const SYSTEM_PREAMBLE: &str = "You are Ostap Bender, the Great Strategist.";

/// Speaker of a transcript line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    /// Label used when rendering. System lines are rendered without one.
    pub fn label(&self) -> &'static str {
        match self {
            Role::System => "System",
            Role::User => "User",
            Role::Assistant => "Bender",
        }
    }
}

/// One `(role, message)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptEntry {
    pub role: Role,
    pub message: String,
}

/// Append-only transcript, always starting with [`SYSTEM_PREAMBLE`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new()
    }
}

impl Transcript {
    pub fn new() -> Self {
        Self {
            entries: vec![TranscriptEntry {
                role: Role::System,
                message: SYSTEM_PREAMBLE.to_string(),
            }],
        }
    }

    pub(crate) fn push(&mut self, role: Role, message: impl Into<String>) {
        self.entries.push(TranscriptEntry {
            role,
            message: message.into(),
        });
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false: the preamble is never removed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of completed user/assistant exchanges.
    pub fn turns(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.role == Role::Assistant)
            .count()
    }
}

impl fmt::Display for Transcript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            match entry.role {
                Role::System => writeln!(f, "{}", entry.message)?,
                role => writeln!(f, "{}: {}", role.label(), entry.message)?,
            }
        }
        Ok(())
    }
}
