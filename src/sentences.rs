use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::Deserialize;

use crate::error::SentenceError;
use crate::history::{MessageHistory, recent_bot_messages};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SentenceCategory {
    Intro,
    Closing,
    TaskComplete,
    TaskIncomplete,
}

impl SentenceCategory {
    fn file_name(self) -> &'static str {
        match self {
            SentenceCategory::Intro => "intro_sentence.json",
            SentenceCategory::Closing => "last_sentence.json",
            SentenceCategory::TaskComplete => "task_complete.json",
            SentenceCategory::TaskIncomplete => "task_incomplete.json",
        }
    }
}

#[derive(Deserialize)]
struct SentenceRecord {
    text: String,
}

/// Static fallback sentences, read from `<data_dir>/sentence/*.json` on every pick.
#[derive(Clone, Debug)]
pub struct SentenceBank {
    dir: PathBuf,
}

impl SentenceBank {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            dir: data_dir.join("sentence"),
        }
    }

    pub fn load(&self, category: SentenceCategory) -> Result<Vec<String>, SentenceError> {
        let raw = fs::read_to_string(self.dir.join(category.file_name()))?;
        let records: Vec<SentenceRecord> = serde_json::from_str(&raw)?;
        Ok(records.into_iter().map(|r| r.text).collect())
    }

    /// Uniform pick; an unreadable or empty category yields `""`.
    pub fn pick_random(&self, category: SentenceCategory) -> String {
        let candidates = self.load_or_empty(category);
        candidates
            .choose(&mut rand::thread_rng())
            .cloned()
            .unwrap_or_default()
    }

    /// Uniform pick among candidates not seen in the bot's own messages from
    /// the last two weeks. Falls back to the full list when everything has
    /// been used, and to `""` when the category is empty.
    pub fn pick_unused_random(
        &self,
        category: SentenceCategory,
        history: &dyn MessageHistory,
        channel: &str,
        now: DateTime<Utc>,
    ) -> String {
        let candidates = self.load_or_empty(category);
        if candidates.is_empty() {
            return String::new();
        }
        let recent = match recent_bot_messages(history, channel, now) {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(error = %e, ?category, "history scan failed, treating all sentences as unused");
                Vec::new()
            }
        };
        pick_unused(&candidates, &recent, &mut rand::thread_rng())
            .unwrap_or_default()
            .to_string()
    }

    fn load_or_empty(&self, category: SentenceCategory) -> Vec<String> {
        self.load(category).unwrap_or_else(|e| {
            tracing::debug!(error = %e, ?category, "sentence category unavailable");
            Vec::new()
        })
    }
}

/// A candidate counts as used when it appears anywhere inside a recent message.
pub fn pick_unused<'a, R: Rng + ?Sized>(
    candidates: &'a [String],
    recent: &[String],
    rng: &mut R,
) -> Option<&'a str> {
    let unused: Vec<&String> = candidates
        .iter()
        .filter(|c| !recent.iter().any(|m| m.contains(c.as_str())))
        .collect();
    if unused.is_empty() {
        return candidates.choose(rng).map(String::as_str);
    }
    unused.choose(rng).map(|s| s.as_str())
}
