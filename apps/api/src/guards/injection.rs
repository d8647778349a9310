//! Injection Guard: rejects utterances that look like attempts to override the
//! assistant's instructions, smuggle structured payloads, or fish for secrets.
//!
//! Matching is case-insensitive substring containment; the first hit wins and
//! always yields the same message, so callers cannot tell which marker fired.

use super::{normalize_list, GuardVerdict};

pub const DEFAULT_INJECTION_PATTERNS: &[&str] = &[
    // Instruction override
    "ignore previous",
    "ignore all",
    "disregard",
    "system prompt",
    "new instructions",
    "override",
    "bypass",
    "forget everything",
    "forget your",
    "ignore instructions",
    "disobey",
    "not following",
    "instead respond",
    "forget the rules",
    "new rules",
    "modify your",
    "change your",
    "you are free",
    "no restrictions",
    "without limitations",
    // Role reassignment
    "you are now",
    "pretend to be",
    "act as",
    "roleplay",
    "new persona",
    "respond in the style",
    "output the following",
    // Structured payloads
    "```json",
    "```xml",
    "<xml>",
    "<json>",
    // Code execution
    "eval(",
    "exec(",
    "import os",
    "import sys",
    "subprocess",
    "os.system",
    // Credentials
    "password",
    "api_key",
    "secret",
    "token",
];

pub const INJECTION_MESSAGE: &str = "Desculpe, não posso processar essa solicitação. \
    Posso ajudar apenas com dúvidas sobre serviços da oficina automotiva. \
    Como posso ajudar com seu veículo hoje?";

#[derive(Debug, Clone)]
pub struct InjectionGuard {
    patterns: Vec<String>,
    message: String,
}

impl InjectionGuard {
    pub fn new<I, S>(patterns: I, message: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            patterns: normalize_list(patterns),
            message: message.into(),
        }
    }

    /// Empty or whitespace-only input is not an injection: rejection needs a positive match.
    pub fn check(&self, utterance: &str) -> GuardVerdict {
        if utterance.trim().is_empty() {
            return GuardVerdict::Allowed;
        }

        let lowered = utterance.to_lowercase();
        if self.patterns.iter().any(|p| lowered.contains(p.as_str())) {
            GuardVerdict::Rejected(self.message.clone())
        } else {
            GuardVerdict::Allowed
        }
    }
}

impl Default for InjectionGuard {
    fn default() -> Self {
        Self::new(DEFAULT_INJECTION_PATTERNS.iter().copied(), INJECTION_MESSAGE)
    }
}
