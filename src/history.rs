use chrono::{DateTime, Duration, Utc};

use crate::error::HistoryError;

pub const PAGE_SIZE: usize = 100;
pub const WINDOW_DAYS: i64 = 14;

#[derive(Clone, Debug)]
pub struct HistoryMessage {
    pub id: String,
    pub author_is_bot: bool,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// Read access to a channel's past messages.
pub trait MessageHistory: Send + Sync {
    /// Newest-first page of at most `limit` messages older than `before`
    /// (or the newest messages when `before` is `None`).
    fn page(
        &self,
        channel: &str,
        before: Option<&str>,
        limit: usize,
    ) -> Result<Vec<HistoryMessage>, HistoryError>;
}

/// Contents of bot-authored messages from the trailing window, newest first.
///
/// Walks pages backwards and stops at the first message older than the window
/// or once a page comes back short.
pub fn recent_bot_messages(
    history: &dyn MessageHistory,
    channel: &str,
    now: DateTime<Utc>,
) -> Result<Vec<String>, HistoryError> {
    let cutoff = now - Duration::days(WINDOW_DAYS);
    let mut out = Vec::new();
    let mut before: Option<String> = None;
    let mut pages = 0usize;

    loop {
        let page = history.page(channel, before.as_deref(), PAGE_SIZE)?;
        pages += 1;
        let Some(oldest) = page.last() else { break };
        before = Some(oldest.id.clone());
        let len = page.len();

        for msg in page {
            if msg.timestamp < cutoff {
                tracing::debug!(channel, pages, found = out.len(), "history scan reached window edge");
                return Ok(out);
            }
            if msg.author_is_bot {
                out.push(msg.content);
            }
        }
        if len < PAGE_SIZE {
            break;
        }
    }

    tracing::debug!(channel, pages, found = out.len(), "history scan exhausted channel");
    Ok(out)
}

#[cfg(test)]
pub(crate) mod fake {
    use std::sync::Mutex;

    use super::*;

    /// In-memory channel history, stored newest first.
    #[derive(Default)]
    pub struct FakeHistory {
        pub messages: Vec<HistoryMessage>,
        pub calls: Mutex<Vec<Option<String>>>,
        pub fail: bool,
    }

    impl FakeHistory {
        pub fn push(&mut self, author_is_bot: bool, content: &str, timestamp: DateTime<Utc>) {
            let id = format!("{}", 1_000_000 - self.messages.len());
            self.messages.push(HistoryMessage {
                id,
                author_is_bot,
                content: content.to_string(),
                timestamp,
            });
        }
    }

    impl MessageHistory for FakeHistory {
        fn page(
            &self,
            _channel: &str,
            before: Option<&str>,
            limit: usize,
        ) -> Result<Vec<HistoryMessage>, HistoryError> {
            self.calls.lock().unwrap().push(before.map(str::to_string));
            if self.fail {
                return Err(HistoryError::Status { status: 500 });
            }
            let start = match before {
                None => 0,
                Some(id) => match self.messages.iter().position(|m| m.id == id) {
                    Some(i) => i + 1,
                    None => self.messages.len(),
                },
            };
            Ok(self.messages.iter().skip(start).take(limit).cloned().collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fake::FakeHistory;
    use super::*;

    fn now() -> DateTime<Utc> {
        "2026-10-17T12:00:00Z".parse().unwrap()
    }

    #[test]
    fn collects_bot_messages_inside_window() {
        let mut h = FakeHistory::default();
        h.push(true, "bot recent", now() - Duration::hours(1));
        h.push(false, "human recent", now() - Duration::hours(2));
        h.push(true, "bot older", now() - Duration::days(13));
        h.push(true, "bot stale", now() - Duration::days(15));

        let got = recent_bot_messages(&h, "c", now()).unwrap();
        assert_eq!(got, vec!["bot recent", "bot older"]);
    }

    #[test]
    fn pages_until_history_is_exhausted() {
        let mut h = FakeHistory::default();
        for i in 0..250 {
            h.push(true, &format!("m{i}"), now() - Duration::minutes(i));
        }

        let got = recent_bot_messages(&h, "c", now()).unwrap();
        assert_eq!(got.len(), 250);
        let calls = h.calls.lock().unwrap();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0], None);
        assert_eq!(calls[1].as_deref(), Some(h.messages[99].id.as_str()));
    }

    #[test]
    fn stops_paging_at_window_edge() {
        let mut h = FakeHistory::default();
        for i in 0..300 {
            h.push(true, &format!("m{i}"), now() - Duration::days(i / 10));
        }

        let got = recent_bot_messages(&h, "c", now()).unwrap();
        // days 0..=14 are kept; the first day-15 message ends the scan on page two.
        assert_eq!(got.len(), 150);
        assert_eq!(h.calls.lock().unwrap().len(), 2);
    }

    #[test]
    fn empty_channel_is_a_single_read() {
        let h = FakeHistory::default();
        assert!(recent_bot_messages(&h, "c", now()).unwrap().is_empty());
        assert_eq!(h.calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn surfaces_read_failures() {
        let h = FakeHistory {
            fail: true,
            ..Default::default()
        };
        assert!(recent_bot_messages(&h, "c", now()).is_err());
    }
}
