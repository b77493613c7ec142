//! Intent recognition client used to pull search terms out of free text.

use crate::error::AppError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecognizeTextRequest {
    pub bot_id: String,
    pub bot_alias_id: String,
    pub locale_id: String,
    pub session_id: String,
    pub text: String,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RecognizeTextResponse {
    #[serde(default)]
    pub session_state: Option<SessionState>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct SessionState {
    #[serde(default)]
    pub intent: Option<Intent>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Intent {
    #[serde(default)]
    pub slots: Option<HashMap<String, Option<Slot>>>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Slot {
    #[serde(default)]
    pub value: Option<SlotValue>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SlotValue {
    #[serde(default)]
    pub interpreted_value: Option<String>,
}

impl RecognizeTextResponse {
    /// Interpreted values of every filled slot, in no particular order.
    pub fn interpreted_values(&self) -> Vec<&str> {
        self.session_state
            .as_ref()
            .and_then(|state| state.intent.as_ref())
            .and_then(|intent| intent.slots.as_ref())
            .map(|slots| {
                slots
                    .values()
                    .flatten()
                    .filter_map(|slot| slot.value.as_ref()?.interpreted_value.as_deref())
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
pub trait IntentRecognizer: Send + Sync {
    async fn recognize_text(&self, request: &RecognizeTextRequest) -> Result<RecognizeTextResponse, AppError>;
}

pub struct HttpIntentRecognizer {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpIntentRecognizer {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, AppError> {
        log::debug!("Creating NLU client for endpoint: {}", endpoint);
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoint: endpoint.to_string() })
    }
}

#[async_trait]
impl IntentRecognizer for HttpIntentRecognizer {
    async fn recognize_text(&self, request: &RecognizeTextRequest) -> Result<RecognizeTextResponse, AppError> {
        let response = self.client.post(&self.endpoint).json(request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::collaborator("NLU", format!("{}: {}", status, body)));
        }
        Ok(response.json::<RecognizeTextResponse>().await?)
    }
}
