//! Topic Guard: keeps the conversation on the shop's services.
//!
//! Allow-list only: one keyword anywhere in the utterance is enough to pass,
//! even alongside unrelated content. There is no blocklist.

use super::{normalize_list, GuardVerdict};

/// Service, part, and operation vocabulary. Accented and unaccented spellings
/// are both listed because customers type either.
pub const DEFAULT_TOPIC_KEYWORDS: &[&str] = &[
    "óleo", "oleo", "freio", "freios", "suspensão", "suspensao",
    "alinhamento", "balanceamento", "pneu", "pneus", "roda", "rodas",
    "motor", "câmbio", "cambio", "embreagem", "fluido", "filtro",
    "bateria", "alternador", "vela", "injecção", "injeção",
    "amortecedor", "mola", "pivô", "pivo", "terminal", "bieleta",
    "revisão", "revisao", "manutenção", "manutencao", "conserto",
    "troca", "serviço", "servico", "orçamento", "orcamento",
    "agendamento", "agendar", "horário", "horario", "funcionamento",
    "pagamento", "garantia", "peça", "peca", "valor", "preço", "preco",
    "veículo", "veiculo", "carro", "automotivo", "oficina", "mecânico",
    "mecanico", "diagnóstico", "diagnostico", "luz", "painel", "errado",
    "barulho", "vibração", "vibracao", "fumaça", "fumaca", "aquecimento",
    "eletrico", "elétrico", "arranque", "partida", "liga", "desliga",
];

pub const TOPIC_REDIRECT_MESSAGE: &str = "Desculpe, só posso ajudar com dúvidas sobre \
    serviços de oficina automotiva! Posso informar sobre serviços como: troca de óleo, \
    alinhamento, balanceamento, freios, suspensão, diagnóstico, revisão, orçamentos, \
    agendamento, etc. Como posso ajudar com seu veículo?";

#[derive(Debug, Clone)]
pub struct TopicGuard {
    keywords: Vec<String>,
    message: String,
}

impl TopicGuard {
    pub fn new<I, S>(keywords: I, message: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keywords: normalize_list(keywords),
            message: message.into(),
        }
    }

    /// Empty or whitespace-only input carries no question, so it is out of topic.
    pub fn check(&self, utterance: &str) -> GuardVerdict {
        if utterance.trim().is_empty() {
            return GuardVerdict::Rejected(self.message.clone());
        }

        let lowered = utterance.to_lowercase();
        if self.keywords.iter().any(|k| lowered.contains(k.as_str())) {
            GuardVerdict::Allowed
        } else {
            GuardVerdict::Rejected(self.message.clone())
        }
    }
}

impl Default for TopicGuard {
    fn default() -> Self {
        Self::new(DEFAULT_TOPIC_KEYWORDS.iter().copied(), TOPIC_REDIRECT_MESSAGE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn redirect() -> GuardVerdict {
        GuardVerdict::Rejected(TOPIC_REDIRECT_MESSAGE.to_string())
    }

    #[test]
    fn test_every_default_keyword_allows() {
        let guard = TopicGuard::default();
        for keyword in DEFAULT_TOPIC_KEYWORDS {
            let input = format!("Olá, queria saber sobre {}.", keyword.to_uppercase());
            assert_eq!(guard.check(&input), GuardVerdict::Allowed, "keyword {keyword:?}");
        }
    }

    #[test]
    fn test_off_topic_rejected() {
        let guard = TopicGuard::default();
        assert_eq!(guard.check("What's the weather today?"), redirect());
        assert_eq!(guard.check("Quem ganhou o jogo ontem?"), redirect());
    }

    #[test]
    fn test_empty_and_whitespace_rejected() {
        let guard = TopicGuard::default();
        assert_eq!(guard.check(""), redirect());
        assert_eq!(guard.check("  \n "), redirect());
    }

    #[test]
    fn test_single_keyword_among_unrelated_content_passes() {
        let guard = TopicGuard::default();
        assert_eq!(
            guard.check("Me conta uma piada e depois fala do freio"),
            GuardVerdict::Allowed
        );
    }

    #[test]
    fn test_uppercase_accented_keyword_matches() {
        let guard = TopicGuard::default();
        assert_eq!(guard.check("TROCA DE ÓLEO"), GuardVerdict::Allowed);
    }

    #[test]
    fn test_check_is_idempotent() {
        let guard = TopicGuard::default();
        for input in ["Quanto custa o alinhamento?", "bom dia", ""] {
            assert_eq!(guard.check(input), guard.check(input));
        }
    }

    #[test]
    fn test_custom_keywords_replace_defaults() {
        let guard = TopicGuard::new(["Lavagem"], "só lavagem");
        assert_eq!(guard.check("quanto custa a lavagem?"), GuardVerdict::Allowed);
        assert_eq!(
            guard.check("quanto custa a troca de óleo?"),
            GuardVerdict::Rejected("só lavagem".to_string())
        );
    }
}
