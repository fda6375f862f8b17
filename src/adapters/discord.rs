use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::blocking::{Client as HttpClient, ClientBuilder, RequestBuilder, multipart};
use serde::Deserialize;
use serde_json::json;

use crate::engine::{Engine, ResultSink};
use crate::error::{DeliveryError, HistoryError};
use crate::history::{HistoryMessage, MessageHistory, PAGE_SIZE};
use crate::parser::is_command;
use crate::types::{Job, Message, Outbound, Response};

const API_BASE: &str = "https://discord.com/api/v10";

pub const INTRO_MESSAGE: &str = "안녕하세요! 이만큼 리포트 봇이에요 🫧\n\
     오늘 함께한 시간과 과제를 `/이름 시간 (완료/전체)` 형식으로 알려주세요.\n\
     예: /선미 50 (3/3) 영지 20 (1/3)";

#[derive(Debug, Deserialize)]
struct ApiMessage {
    id: String,
    #[serde(default)]
    content: String,
    author: ApiUser,
    timestamp: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct ApiUser {
    id: String,
    #[serde(default)]
    bot: bool,
}

impl From<ApiMessage> for HistoryMessage {
    fn from(m: ApiMessage) -> Self {
        HistoryMessage {
            id: m.id,
            author_is_bot: m.author.bot,
            content: m.content,
            timestamp: m.timestamp,
        }
    }
}

fn snowflake(id: &str) -> u64 {
    id.parse().unwrap_or(0)
}

/// Thin Discord REST client: channel reads, sends, and typing.
pub struct Client {
    token: String,
    base: String,
    http: HttpClient,
}

impl Client {
    pub fn new(token: String) -> Result<Self, reqwest::Error> {
        Self::from_builder(token, API_BASE.to_string(), HttpClient::builder())
    }

    fn from_builder(
        token: String,
        base: String,
        builder: ClientBuilder,
    ) -> Result<Self, reqwest::Error> {
        let http = builder.timeout(Duration::from_secs(60)).build()?;
        Ok(Self { token, base, http })
    }

    fn authed(&self, rb: RequestBuilder) -> RequestBuilder {
        rb.header("Authorization", format!("Bot {}", self.token))
    }

    fn get_messages(
        &self,
        channel: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<ApiMessage>, HistoryError> {
        let url = format!("{}/channels/{channel}/messages", self.base);
        let resp = self.authed(self.http.get(url).query(query)).send()?;
        let status = resp.status();
        if !status.is_success() {
            return Err(HistoryError::Status {
                status: status.as_u16(),
            });
        }
        Ok(resp.json()?)
    }

    pub fn latest_message_id(&self, channel: &str) -> Result<Option<String>, HistoryError> {
        let page = self.get_messages(channel, &[("limit", "1".to_string())])?;
        Ok(page.into_iter().next().map(|m| m.id))
    }

    /// Messages newer than `after`, oldest first.
    fn messages_after(
        &self,
        channel: &str,
        after: Option<&str>,
    ) -> Result<Vec<ApiMessage>, HistoryError> {
        let mut query = vec![("limit", PAGE_SIZE.to_string())];
        if let Some(after) = after {
            query.push(("after", after.to_string()));
        }
        let mut page = self.get_messages(channel, &query)?;
        page.sort_by_key(|m| snowflake(&m.id));
        Ok(page)
    }

    pub fn send(
        &self,
        channel: &str,
        out: &Outbound,
        reply_to: Option<&str>,
    ) -> Result<(), DeliveryError> {
        let url = format!("{}/channels/{channel}/messages", self.base);
        let mut payload = json!({ "content": out.content });
        if let Some(id) = reply_to {
            payload["message_reference"] = json!({ "message_id": id });
        }

        let rb = self.authed(self.http.post(url));
        let rb = match &out.attachment {
            None => rb.json(&payload),
            Some(att) => {
                payload["attachments"] = json!([{ "id": 0, "filename": att.name }]);
                let file = multipart::Part::bytes(att.bytes.clone())
                    .file_name(att.name.clone())
                    .mime_str("image/png")?;
                let form = multipart::Form::new()
                    .text("payload_json", payload.to_string())
                    .part("files[0]", file);
                rb.multipart(form)
            }
        };

        let resp = rb.send()?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(DeliveryError::Status {
                status: status.as_u16(),
                body: body.trim().to_string(),
            });
        }
        Ok(())
    }

    pub fn trigger_typing(&self, channel: &str) -> Result<(), DeliveryError> {
        let url = format!("{}/channels/{channel}/typing", self.base);
        let resp = self.authed(self.http.post(url)).send()?;
        if !resp.status().is_success() {
            return Err(DeliveryError::Status {
                status: resp.status().as_u16(),
                body: String::new(),
            });
        }
        Ok(())
    }
}

impl MessageHistory for Client {
    fn page(
        &self,
        channel: &str,
        before: Option<&str>,
        limit: usize,
    ) -> Result<Vec<HistoryMessage>, HistoryError> {
        let mut query = vec![("limit", limit.to_string())];
        if let Some(before) = before {
            query.push(("before", before.to_string()));
        }
        let mut page = self.get_messages(channel, &query)?;
        page.sort_by_key(|m| std::cmp::Reverse(snowflake(&m.id)));
        Ok(page.into_iter().map(HistoryMessage::from).collect())
    }
}

/// Polls one channel for commands and posts replies and reports back to it.
pub struct Adapter {
    client: Arc<Client>,
    channel: String,
    eng: Arc<dyn Engine>,
    poll_interval: Duration,
}

impl Adapter {
    pub fn new(
        client: Arc<Client>,
        channel: String,
        eng: Arc<dyn Engine>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            client,
            channel,
            eng,
            poll_interval,
        }
    }

    pub fn announce(&self) -> Result<(), DeliveryError> {
        self.client
            .send(&self.channel, &Outbound::text(INTRO_MESSAGE), None)
    }

    pub fn run(&self, stop: &AtomicBool) -> Result<(), HistoryError> {
        // Start from the newest message so the backlog is not replayed.
        let mut cursor = self.client.latest_message_id(&self.channel)?;
        tracing::info!(channel = %self.channel, cursor = ?cursor, "discord polling started");

        while !stop.load(Ordering::Relaxed) {
            match self.client.messages_after(&self.channel, cursor.as_deref()) {
                Ok(batch) => {
                    for m in batch {
                        cursor = Some(m.id.clone());
                        self.dispatch(m);
                    }
                }
                Err(e) => tracing::warn!(error = %e, "discord poll failed"),
            }
            thread::sleep(self.poll_interval);
        }
        Ok(())
    }

    fn dispatch(&self, m: ApiMessage) {
        let looks_like_command = !m.author.bot && is_command(&m.content);
        let message_id = m.id.clone();
        let resp = self.eng.handle(Message {
            id: m.id,
            user_id: m.author.id,
            channel: self.channel.clone(),
            text: m.content,
            author_is_bot: m.author.bot,
        });

        if resp.is_empty() {
            if looks_like_command {
                if let Err(e) = self.client.trigger_typing(&self.channel) {
                    tracing::debug!(error = %e, "typing indicator failed");
                }
            }
            return;
        }

        let reply_to = resp.reply.then_some(message_id.as_str());
        for out in &resp.messages {
            if let Err(e) = self.client.send(&self.channel, out, reply_to) {
                tracing::error!(error = %e, "discord reply failed");
                return;
            }
        }
    }
}

impl ResultSink for Adapter {
    fn deliver(&self, job: &Job, resp: &Response) -> Result<(), DeliveryError> {
        // Stop at the first failure so later messages never arrive out of order.
        for out in &resp.messages {
            self.client.send(&job.channel_id, out, None)?;
        }
        Ok(())
    }
}
