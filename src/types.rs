use std::time::SystemTime;

/// One decoded `(name, minutes, (done/total))` triple.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReportEntry {
    pub name: String,
    pub minutes: u32,
    pub done: u32,
    pub total: u32,
}

impl ReportEntry {
    pub fn is_complete(&self) -> bool {
        self.done == self.total
    }
}

#[derive(Clone, Debug, Default)]
pub struct Message {
    pub id: String,
    pub user_id: String,
    pub channel: String,
    pub text: String,
    pub author_is_bot: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attachment {
    pub name: String,
    pub bytes: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Outbound {
    pub content: String,
    pub attachment: Option<Attachment>,
}

impl Outbound {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            attachment: None,
        }
    }
}

/// What an adapter should send back. `reply` marks a direct answer to the
/// triggering message rather than a channel post.
#[derive(Clone, Debug, Default)]
pub struct Response {
    pub messages: Vec<Outbound>,
    pub reply: bool,
}

impl Response {
    pub fn reply(text: impl Into<String>) -> Self {
        Self {
            messages: vec![Outbound::text(text)],
            reply: true,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[derive(Clone, Debug)]
pub enum TaskInput {
    Report(Vec<ReportEntry>),
}

#[derive(Clone, Debug)]
pub struct Job {
    pub id: String,
    pub task_name: String,
    pub input: TaskInput,
    pub user_id: String,
    pub channel_id: String,
    pub created_at: SystemTime,
}
