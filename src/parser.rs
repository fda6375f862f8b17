use std::sync::LazyLock;

use regex::Regex;

use crate::error::ParseError;
use crate::types::ReportEntry;

pub const TRIGGER: char = '/';

// ASCII digits only; `\d` would also accept other Unicode decimal digits.
static TASK_FRACTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\(([0-9]+)/([0-9]+)\)$").expect("task fraction pattern"));

pub fn is_command(text: &str) -> bool {
    text.starts_with(TRIGGER)
}

/// Decodes `/<name> <minutes> (<done>/<total>) ...` into entries, in input order.
///
/// Nothing is returned unless every triple is valid, so callers never
/// accumulate a partially-parsed command.
pub fn parse_report(line: &str) -> Result<Vec<ReportEntry>, ParseError> {
    let body = line.strip_prefix(TRIGGER).unwrap_or(line);
    let tokens: Vec<&str> = body.split_whitespace().collect();
    if tokens.len() < 3 || tokens.len() % 3 != 0 {
        return Err(ParseError::Shape {
            tokens: tokens.len(),
        });
    }

    tokens
        .chunks_exact(3)
        .map(|triple| parse_triple(triple[0], triple[1], triple[2]))
        .collect()
}

fn parse_triple(name: &str, minutes: &str, task: &str) -> Result<ReportEntry, ParseError> {
    let minutes = parse_minutes(minutes).ok_or_else(|| ParseError::Value {
        token: minutes.to_string(),
    })?;
    let (done, total) = parse_fraction(task).ok_or_else(|| ParseError::Value {
        token: task.to_string(),
    })?;
    Ok(ReportEntry {
        name: name.to_string(),
        minutes,
        done,
        total,
    })
}

/// Leading run of ASCII digits, so `50분` reads as 50. A token that does not
/// start with a digit (including `-5`) is rejected.
fn parse_minutes(token: &str) -> Option<u32> {
    let end = token
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(token.len());
    token[..end].parse::<u32>().ok()
}

fn parse_fraction(token: &str) -> Option<(u32, u32)> {
    let caps = TASK_FRACTION.captures(token)?;
    let done = caps[1].parse::<u32>().ok()?;
    let total = caps[2].parse::<u32>().ok()?;
    Some((done, total))
}
