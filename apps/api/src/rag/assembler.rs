//! Prompt Assembler: builds the system and user messages for one turn.
//!
//! The context block is bounded by `max_context_chars`: passages are taken in
//! rank order until the next one would overflow, and a single oversized top
//! passage is cut at a character boundary. A bound of 0 disables the limit.

use tracing::warn;

use crate::rag::prompts::{PASSAGE_SEPARATOR, QUESTION_TEMPLATE, SYSTEM_PROMPT_TEMPLATE};

/// A fully rendered prompt. Built fresh for every turn.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledPrompt {
    /// Persona with the context block substituted in.
    pub system: String,
    /// Question segment sent as the user message.
    pub user: String,
    /// The context block alone, as embedded in `system`.
    pub context: String,
    pub passages_used: usize,
    pub truncated: bool,
}

#[derive(Debug, Clone)]
pub struct PromptAssembler {
    persona_template: String,
    max_context_chars: usize,
}

impl PromptAssembler {
    pub fn new(persona_template: impl Into<String>, max_context_chars: usize) -> Self {
        Self {
            persona_template: persona_template.into(),
            max_context_chars,
        }
    }

    pub fn with_default_persona(max_context_chars: usize) -> Self {
        Self::new(SYSTEM_PROMPT_TEMPLATE, max_context_chars)
    }

    pub fn assemble<S: AsRef<str>>(&self, passages: &[S], question: &str) -> AssembledPrompt {
        let (context, passages_used, truncated) = self.build_context(passages);

        if truncated {
            warn!(
                "Context exceeded {} chars: kept {}/{} passages",
                self.max_context_chars,
                passages_used,
                passages.len()
            );
        }

        AssembledPrompt {
            system: self.persona_template.replace("{context}", &context),
            user: QUESTION_TEMPLATE.replace("{question}", question),
            context,
            passages_used,
            truncated,
        }
    }

    fn build_context<S: AsRef<str>>(&self, passages: &[S]) -> (String, usize, bool) {
        let limit = self.max_context_chars;
        let separator_len = PASSAGE_SEPARATOR.chars().count();

        let mut context = String::new();
        let mut used_chars = 0;
        let mut used = 0;

        for passage in passages {
            let passage = passage.as_ref();
            let passage_len = passage.chars().count();
            let cost = if used == 0 {
                passage_len
            } else {
                passage_len + separator_len
            };

            if limit > 0 && used_chars + cost > limit {
                if used == 0 {
                    // The best passage alone is too long: keep its head.
                    context.extend(passage.chars().take(limit));
                    return (context, 1, true);
                }
                return (context, used, true);
            }

            if used > 0 {
                context.push_str(PASSAGE_SEPARATOR);
            }
            context.push_str(passage);
            used_chars += cost;
            used += 1;
        }

        (context, used, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_joins_passages_with_blank_line() {
        let assembler = PromptAssembler::with_default_persona(0);
        let prompt = assembler.assemble(
            &["Troca de óleo custa R$150.", "Alinhamento custa R$80."],
            "Preços?",
        );
        assert_eq!(
            prompt.context,
            "Troca de óleo custa R$150.\n\nAlinhamento custa R$80."
        );
        assert_eq!(prompt.passages_used, 2);
        assert!(!prompt.truncated);
    }

    #[test]
    fn test_persona_embeds_context_and_rules() {
        let assembler = PromptAssembler::with_default_persona(0);
        let prompt = assembler.assemble(&["Abrimos às 8h."], "Qual o horário?");
        assert!(prompt.system.contains("AutoCare"));
        assert!(prompt.system.contains("Use apenas as informações fornecidas no contexto"));
        assert!(prompt.system.ends_with("Contexto dos documentos:\nAbrimos às 8h."));
        assert!(!prompt.system.contains("{context}"));
    }

    #[test]
    fn test_question_segment() {
        let assembler = PromptAssembler::with_default_persona(0);
        let prompt = assembler.assemble::<&str>(&[], "Vocês fazem alinhamento?");
        assert_eq!(prompt.user, "Pergunta: Vocês fazem alinhamento?");
        assert_eq!(prompt.context, "");
        assert_eq!(prompt.passages_used, 0);
    }

    #[test]
    fn test_drops_passages_that_overflow() {
        let assembler = PromptAssembler::new("{context}", 12);
        let prompt = assembler.assemble(&["aaaaa", "bbbbb", "ccccc"], "q");
        // "aaaaa" + "\n\n" + "bbbbb" = 12 chars; the third would overflow.
        assert_eq!(prompt.context, "aaaaa\n\nbbbbb");
        assert_eq!(prompt.passages_used, 2);
        assert!(prompt.truncated);
    }

    #[test]
    fn test_truncates_oversized_top_passage_on_char_boundary() {
        let assembler = PromptAssembler::new("{context}", 4);
        let prompt = assembler.assemble(&["óleo sintético", "outro"], "q");
        assert_eq!(prompt.context, "óleo");
        assert_eq!(prompt.passages_used, 1);
        assert!(prompt.truncated);
    }

    #[test]
    fn test_custom_persona_template() {
        let assembler = PromptAssembler::new("CTX<{context}>", 0);
        let prompt = assembler.assemble(&["x"], "y");
        assert_eq!(prompt.system, "CTX<x>");
    }
}
