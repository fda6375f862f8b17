use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::accumulator::Totals;
use crate::error::NarrativeError;
use crate::history::MessageHistory;
use crate::sentences::{SentenceBank, SentenceCategory};

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// Text-generation collaborator.
pub trait Narrator: Send + Sync {
    fn generate(&self, prompt: &str) -> Result<String, NarrativeError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NarrativeKind {
    Intro,
    Closing,
}

impl NarrativeKind {
    pub fn prompt(self, weekly: &Totals) -> String {
        let data = serde_json::to_string(weekly).unwrap_or_else(|_| "{}".to_string());
        match self {
            NarrativeKind::Intro => format!(
                "다음은 스터디원들의 작업 시간입니다: {data}. \n이 데이터를 바탕으로 따뜻한 격려의 말을 해주세요."
            ),
            NarrativeKind::Closing => format!(
                "다음은 스터디원들의 작업 시간입니다: {data}. \n이 데이터를 바탕으로 이번 주를 마무리하는 따뜻한 말을 해주세요."
            ),
        }
    }

    fn fallback_category(self) -> SentenceCategory {
        match self {
            NarrativeKind::Intro => SentenceCategory::Intro,
            NarrativeKind::Closing => SentenceCategory::Closing,
        }
    }
}

/// Produces narrative text, substituting a sentence bank pick when the
/// narrator fails. Never fails itself.
pub struct Narrative {
    narrator: Arc<dyn Narrator>,
    bank: SentenceBank,
    history: Option<Arc<dyn MessageHistory>>,
}

impl Narrative {
    pub fn new(
        narrator: Arc<dyn Narrator>,
        bank: SentenceBank,
        history: Option<Arc<dyn MessageHistory>>,
    ) -> Self {
        Self {
            narrator,
            bank,
            history,
        }
    }

    pub fn bank(&self) -> &SentenceBank {
        &self.bank
    }

    pub fn write(&self, kind: NarrativeKind, weekly: &Totals, channel: &str) -> String {
        match self.narrator.generate(&kind.prompt(weekly)) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, ?kind, "narrative generation failed, using sentence bank");
                let category = kind.fallback_category();
                match &self.history {
                    Some(h) => self
                        .bank
                        .pick_unused_random(category, h.as_ref(), channel, Utc::now()),
                    None => self.bank.pick_random(category),
                }
            }
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct OpenAiNarrator {
    api_key: String,
    model: String,
    base_url: String,
    http: reqwest::blocking::Client,
}

impl OpenAiNarrator {
    pub fn new(api_key: String, model: String) -> Result<Self, NarrativeError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            api_key,
            model,
            base_url: OPENAI_API_URL.to_string(),
            http,
        })
    }
}

impl Narrator for OpenAiNarrator {
    fn generate(&self, prompt: &str) -> Result<String, NarrativeError> {
        if self.api_key.is_empty() {
            return Err(NarrativeError::MissingApiKey);
        }
        let body = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
        };
        let resp = self
            .http
            .post(&self.base_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(NarrativeError::Status {
                status: status.as_u16(),
                body: body.trim().to_string(),
            });
        }
        let parsed: ChatResponse = resp.json()?;
        first_content(parsed).ok_or(NarrativeError::Empty)
    }
}

fn first_content(resp: ChatResponse) -> Option<String> {
    let text = resp.choices.into_iter().next()?.message.content?;
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.to_string())
}
