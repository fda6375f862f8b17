use thiserror::Error;

const SHAPE_HELP: &str = "이름, 시간, 과제수(예: /선미 50 (3/3) 영지 20 (1/3)) 형식으로 입력해주세요!";
const VALUE_HELP: &str =
    "시간은 숫자, 과제수는 (완료/전체) 형식으로 입력해주세요! (예: /선미 50 (3/3) 영지 20 (1/3))";

/// Grammar errors. The display text is the corrective reply shown to the member.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("{}", SHAPE_HELP)]
    Shape { tokens: usize },
    #[error("{}", VALUE_HELP)]
    Value { token: String },
}

#[derive(Error, Debug)]
pub enum NarrativeError {
    #[error("OPENAI_API_KEY is empty")]
    MissingApiKey,
    #[error("narrative request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("narrative backend returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("narrative backend returned empty output")]
    Empty,
}

#[derive(Error, Debug)]
pub enum ChartError {
    #[error("chart has no drawable area: {width}x{height}")]
    Canvas { width: u32, height: u32 },
    #[error("png encoding failed: {0}")]
    Encode(#[from] image::ImageError),
}

#[derive(Error, Debug)]
pub enum SentenceError {
    #[error("sentence file unreadable: {0}")]
    Io(#[from] std::io::Error),
    #[error("sentence file malformed: {0}")]
    Format(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("history request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("history backend returned status {status}")]
    Status { status: u16 },
}

#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("delivery request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("delivery rejected with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("delivery i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("output lock poisoned")]
    Poisoned,
}

#[derive(Error, Debug)]
pub enum TaskError {
    #[error("invalid input for task {task}")]
    InvalidInput { task: &'static str },
    #[error("unknown task: {0}")]
    UnknownTask(String),
    #[error("totals lock poisoned")]
    Poisoned,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    #[error("queue closed")]
    Closed,
    #[error("queue canceled")]
    Canceled,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    #[error("registry: task name is empty")]
    EmptyName,
    #[error("registry: task already registered: {0}")]
    Duplicate(String),
    #[error("registry: poisoned lock")]
    Poisoned,
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("totals store i/o failed: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid mode: {0} (expected auto|cli|discord)")]
    Mode(String),
    #[error("invalid duration: {0}")]
    Duration(String),
    #[error("{0} is required in discord mode")]
    Missing(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_errors_render_corrective_text() {
        let shape = ParseError::Shape { tokens: 2 };
        assert!(shape.to_string().starts_with("이름, 시간, 과제수"));
        let value = ParseError::Value {
            token: "abc".to_string(),
        };
        assert!(value.to_string().starts_with("시간은 숫자"));
    }
}
