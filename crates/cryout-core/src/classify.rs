use async_trait::async_trait;

use crate::Result;

/// Moderation instruction used when `OPENAI_PROMPT` is not set.
pub const DEFAULT_MODERATION_PROMPT: &str = "Проверь, соответствует ли сообщение следующим критериям: написано преимущественно на русском языке, не содержит грубых ругательств (допускаются слова с символами '*'), а цель сообщения — пожаловаться, выплакаться, выговориться публично. Ответь только 'да' или 'нет'. Сообщение:\n\n";

/// The only answer that approves a message for publication.
const AFFIRMATIVE_ANSWER: &str = "да";

/// Boolean approval plus the normalized model answer for diagnostics.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Verdict {
    pub approved: bool,
    pub raw_answer: String,
}

/// Normalize a model reply into a verdict.
///
/// Anything that is not exactly the affirmative token after trimming and
/// lower-casing counts as a rejection, including empty or partial output.
pub fn interpret_answer(answer: &str) -> Verdict {
    let normalized = answer.trim().to_lowercase();
    Verdict {
        approved: normalized == AFFIRMATIVE_ANSWER,
        raw_answer: normalized,
    }
}

/// Port for the external content classifier.
///
/// Errors are reserved for transport failures; a negative verdict is a
/// normal `Ok` result.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, text: &str) -> Result<Verdict>;
}
