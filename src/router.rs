use crate::parser::{is_command, parse_report};
use crate::tasks::report;
use crate::types::{Message, TaskInput};

#[derive(Clone, Debug)]
pub struct Route {
    pub task_name: String,
    pub input: TaskInput,
}

pub trait Router: Send + Sync {
    // Ok(None): not for us (not a command, bot-authored, or another channel)
    // Ok(Some(Route)): valid command -> route
    // Err(String): command-like input that failed validation; the text is the reply
    fn route(&self, msg: &Message) -> Result<Option<Route>, String>;
}

/// Routes `/` report commands, optionally restricted to one channel.
#[derive(Clone, Debug, Default)]
pub struct CommandRouter {
    channel: Option<String>,
}

impl CommandRouter {
    pub fn new(channel: Option<String>) -> Self {
        Self {
            channel: channel.filter(|c| !c.is_empty()),
        }
    }
}

impl Router for CommandRouter {
    fn route(&self, msg: &Message) -> Result<Option<Route>, String> {
        if msg.author_is_bot {
            return Ok(None);
        }
        if self.channel.as_ref().is_some_and(|c| c != &msg.channel) {
            return Ok(None);
        }
        if !is_command(&msg.text) {
            return Ok(None);
        }

        match parse_report(&msg.text) {
            Ok(entries) => Ok(Some(Route {
                task_name: report::NAME.to_string(),
                input: TaskInput::Report(entries),
            })),
            Err(e) => {
                tracing::info!(user = %msg.user_id, error = ?e, "rejected report command");
                Err(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(channel: &str, text: &str, bot: bool) -> Message {
        Message {
            id: "1".to_string(),
            user_id: "u".to_string(),
            channel: channel.to_string(),
            text: text.to_string(),
            author_is_bot: bot,
        }
    }

    #[test]
    fn routes_valid_commands_to_report() {
        let r = CommandRouter::new(None);
        let route = r.route(&msg("any", "/민수 50 (3/3)", false)).unwrap().unwrap();
        assert_eq!(route.task_name, "report");
        let TaskInput::Report(entries) = route.input;
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn ignores_plain_chatter_and_bots() {
        let r = CommandRouter::new(None);
        assert!(r.route(&msg("c", "안녕하세요", false)).unwrap().is_none());
        assert!(r.route(&msg("c", "/민수 50 (3/3)", true)).unwrap().is_none());
    }

    #[test]
    fn ignores_other_channels_when_restricted() {
        let r = CommandRouter::new(Some("study".to_string()));
        assert!(r.route(&msg("random", "/민수 50 (3/3)", false)).unwrap().is_none());
        assert!(r.route(&msg("study", "/민수 50 (3/3)", false)).unwrap().is_some());
    }

    #[test]
    fn empty_restriction_means_unrestricted() {
        let r = CommandRouter::new(Some(String::new()));
        assert!(r.route(&msg("random", "/민수 50 (3/3)", false)).unwrap().is_some());
    }

    #[test]
    fn grammar_errors_become_corrective_replies() {
        let r = CommandRouter::new(None);
        let shape = r.route(&msg("c", "/민수 50", false)).unwrap_err();
        assert_eq!(
            shape,
            "이름, 시간, 과제수(예: /선미 50 (3/3) 영지 20 (1/3)) 형식으로 입력해주세요!"
        );
        let value = r.route(&msg("c", "/민수 오십 (3/3)", false)).unwrap_err();
        assert_eq!(
            value,
            "시간은 숫자, 과제수는 (완료/전체) 형식으로 입력해주세요! (예: /선미 50 (3/3) 영지 20 (1/3))"
        );
    }
}
