use crate::config::AppConfig;
use crate::error::AppError;
use crate::nlu::{IntentRecognizer, RecognizeTextRequest};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::Arc;
use uuid::Uuid;

/// Lower-cased, non-empty search terms for one query.
pub type KeywordSet = BTreeSet<String>;

lazy_static! {
    static ref SLOT_SEPARATOR: Regex = Regex::new(r",|\band\b").expect("slot separator pattern");
    static ref AND_WORD: Regex = Regex::new(r"\band\b").expect("conjunction pattern");
    static ref NON_WORD: Regex = Regex::new(r"\W+").expect("non-word pattern");
}

/// Shortest token the fallback tokenizer keeps, in characters.
const MIN_FALLBACK_TOKEN_CHARS: usize = 3;

#[derive(Debug, Clone)]
pub struct NluSettings {
    pub bot_id: String,
    pub bot_alias_id: String,
    pub locale_id: String,
}

impl NluSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            bot_id: config.nlu_bot_id.clone(),
            bot_alias_id: config.nlu_bot_alias_id.clone(),
            locale_id: config.nlu_locale.clone(),
        }
    }
}

pub struct KeywordExtractor {
    recognizer: Arc<dyn IntentRecognizer>,
    settings: NluSettings,
}

impl KeywordExtractor {
    pub fn new(recognizer: Arc<dyn IntentRecognizer>, settings: NluSettings) -> Self {
        Self { recognizer, settings }
    }

    /// Never fails: when the intent service errors or fills no slot, the
    /// query goes through `fallback_keywords` instead.
    pub async fn extract(&self, query: &str) -> KeywordSet {
        let keywords = match self.recognize(query).await {
            Ok(keywords) => keywords,
            Err(e) => {
                log::warn!("Intent recognition failed: {}", e);
                KeywordSet::new()
            }
        };

        if keywords.is_empty() {
            log::info!("Using fallback tokenizer for query: {:?}", query);
            return fallback_keywords(query);
        }
        keywords
    }

    async fn recognize(&self, query: &str) -> Result<KeywordSet, AppError> {
        let request = RecognizeTextRequest {
            bot_id: self.settings.bot_id.clone(),
            bot_alias_id: self.settings.bot_alias_id.clone(),
            locale_id: self.settings.locale_id.clone(),
            session_id: format!("sess-{}", Uuid::new_v4()),
            text: query.to_string(),
        };

        let response = self.recognizer.recognize_text(&request).await?;
        log::debug!("Intent recognition response: {:?}", response);

        Ok(response
            .interpreted_values()
            .into_iter()
            .flat_map(slot_keywords)
            .collect())
    }
}

/// Splits one slot value on commas and the word "and".
fn slot_keywords(value: &str) -> Vec<String> {
    let lowered = value.to_lowercase();
    SLOT_SEPARATOR
        .split(&lowered)
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

/// Deterministic tokenizer used when the intent service yields nothing.
pub fn fallback_keywords(query: &str) -> KeywordSet {
    let lowered = query.to_lowercase();
    let without_and = AND_WORD.replace_all(&lowered, " ");
    NON_WORD
        .split(&without_and)
        .filter(|token| token.chars().count() >= MIN_FALLBACK_TOKEN_CHARS)
        .map(str::to_string)
        .collect()
}
