use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::error::ConfigError;
use crate::narrative::DEFAULT_MODEL;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Cli,
    Discord,
}

#[derive(Parser, Clone, Debug)]
#[command(name = "imankeum", version, about = "Study-time report bot")]
pub struct Args {
    /// auto|cli|discord; auto picks discord when a token is set
    #[arg(long, env = "IMANKEUM_MODE", default_value = "auto")]
    pub mode: String,

    #[arg(long, env = "DISCORD_TOKEN", default_value = "", hide_env_values = true)]
    pub discord_token: String,

    /// Only this channel is served; required in discord mode
    #[arg(long, env = "CHANNEL_ID")]
    pub channel_id: Option<String>,

    #[arg(long, env = "OPENAI_API_KEY", default_value = "", hide_env_values = true)]
    pub openai_api_key: String,

    #[arg(long, env = "OPENAI_MODEL", default_value = DEFAULT_MODEL)]
    pub openai_model: String,

    /// Holds member_color_list.json and sentence/*.json
    #[arg(long, env = "IMANKEUM_DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,

    /// Where the cli adapter writes attachments
    #[arg(long, env = "IMANKEUM_OUT_DIR", default_value = "out")]
    pub out_dir: PathBuf,

    #[arg(long, env = "IMANKEUM_QUEUE_SIZE", default_value_t = 128)]
    pub queue_size: usize,

    #[arg(long, env = "IMANKEUM_CONCURRENCY", default_value_t = 1)]
    pub concurrency: usize,

    /// 500ms|2s|1m
    #[arg(long, env = "IMANKEUM_POLL_INTERVAL", default_value = "2s", value_parser = parse_duration)]
    pub poll_interval: Duration,

    #[arg(long, default_value = "10s", value_parser = parse_duration)]
    pub shutdown_timeout: Duration,
}

impl Args {
    pub fn select_mode(&self) -> Result<Mode, ConfigError> {
        match self.mode.trim().to_ascii_lowercase().as_str() {
            "auto" if !self.discord_token.is_empty() => Ok(Mode::Discord),
            "auto" | "cli" => Ok(Mode::Cli),
            "discord" => Ok(Mode::Discord),
            other => Err(ConfigError::Mode(other.to_string())),
        }
    }

    /// Channel filter for the router; empty means unrestricted.
    pub fn channel(&self) -> Option<String> {
        self.channel_id.clone().filter(|c| !c.trim().is_empty())
    }

    pub fn discord_settings(&self) -> Result<(String, String), ConfigError> {
        if self.discord_token.is_empty() {
            return Err(ConfigError::Missing("DISCORD_TOKEN"));
        }
        let channel = self.channel().ok_or(ConfigError::Missing("CHANNEL_ID"))?;
        Ok((self.discord_token.clone(), channel))
    }
}

pub fn parse_duration(s: &str) -> Result<Duration, ConfigError> {
    let s = s.trim();
    let bad = || ConfigError::Duration(s.to_string());
    if let Some(v) = s.strip_suffix("ms") {
        return v.trim().parse::<u64>().map(Duration::from_millis).map_err(|_| bad());
    }
    if let Some(v) = s.strip_suffix('s') {
        return v.trim().parse::<u64>().map(Duration::from_secs).map_err(|_| bad());
    }
    if let Some(v) = s.strip_suffix('m') {
        return v
            .trim()
            .parse::<u64>()
            .map(|mins| Duration::from_secs(mins * 60))
            .map_err(|_| bad());
    }
    // No suffix means seconds.
    s.parse::<u64>().map(Duration::from_secs).map_err(|_| bad())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["imankeum"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn parses_durations() {
        assert_eq!(parse_duration("500ms"), Ok(Duration::from_millis(500)));
        assert_eq!(parse_duration("10s"), Ok(Duration::from_secs(10)));
        assert_eq!(parse_duration("1m"), Ok(Duration::from_secs(60)));
        assert_eq!(parse_duration(" 3 "), Ok(Duration::from_secs(3)));
        assert!(parse_duration("soon").is_err());
    }

    #[test]
    fn explicit_modes() {
        assert_eq!(args(&["--mode", "cli", "--discord-token", "t"]).select_mode(), Ok(Mode::Cli));
        assert_eq!(args(&["--mode", "discord"]).select_mode(), Ok(Mode::Discord));
        assert!(args(&["--mode", "telegram"]).select_mode().is_err());
    }

    #[test]
    fn auto_mode_prefers_discord_when_token_present() {
        assert_eq!(
            args(&["--mode", "auto", "--discord-token", "t"]).select_mode(),
            Ok(Mode::Discord)
        );
    }

    #[test]
    fn discord_needs_token_and_channel() {
        let a = args(&["--mode", "discord", "--discord-token", "t", "--channel-id", " "]);
        assert_eq!(a.discord_settings(), Err(ConfigError::Missing("CHANNEL_ID")));
        let a = args(&["--mode", "discord", "--channel-id", "1", "--discord-token", ""]);
        assert_eq!(a.discord_settings(), Err(ConfigError::Missing("DISCORD_TOKEN")));
        let a = args(&["--discord-token", "t", "--channel-id", "1"]);
        assert_eq!(a.discord_settings(), Ok(("t".to_string(), "1".to_string())));
    }

    #[test]
    fn defaults() {
        let a = args(&["--mode", "cli"]);
        assert_eq!(a.concurrency, 1);
        assert_eq!(a.queue_size, 128);
        assert_eq!(a.data_dir, PathBuf::from("data"));
        assert_eq!(a.poll_interval, Duration::from_secs(2));
    }
}
