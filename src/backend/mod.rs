//! Text generation backends used for screen commentary.
//!
//! The companion never depends on a network model being reachable: the offline
//! rule backend always produces something short and speakable, and
//! [`NullTextBackend`] exists for runs where commentary is switched off.

mod rules;

use anyhow::Result;

use crate::config::LlmProvider;
use crate::error::CompanionError;

pub use rules::OfflineRuleBackend;

/// What the companion is looking at, plus how it feels about it.
#[derive(Debug, Clone, Copy)]
pub struct TextPrompt<'a> {
    pub screen_text: &'a str,
    pub mood: f32,
}

/// Trait implemented by anything that can turn a prompt into a short reply.
pub trait TextBackend: Send {
    /// Identifier used in logs and the status line.
    fn name(&self) -> &str;

    /// Produce a reply. Errors are reported to the user as a spoken apology.
    fn generate(&mut self, prompt: &TextPrompt<'_>) -> Result<String>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullTextBackend;

impl TextBackend for NullTextBackend {
    fn name(&self) -> &str {
        "none"
    }

    fn generate(&mut self, _prompt: &TextPrompt<'_>) -> Result<String> {
        Err(CompanionError::MissingCollaborator("text backend").into())
    }
}

/// Build the backend selected on the command line.
pub fn backend_for(provider: LlmProvider) -> Box<dyn TextBackend> {
    match provider {
        LlmProvider::None => Box::new(NullTextBackend),
        LlmProvider::Offline => Box::new(OfflineRuleBackend),
    }
}
