//! Parsers for USI engine output lines.
//!
//! All parsing is purely syntactic: move tokens are kept as opaque strings.

use crate::types::{MateOutcome, ProgressInfo};

/// Tag of progress lines.
pub const INFO_TAG: &str = "info";
/// Tag of the terminal line of a search.
pub const BESTMOVE_TAG: &str = "bestmove";
/// Tag of the terminal line of a mate search.
pub const CHECKMATE_TAG: &str = "checkmate";

/// A field reported during the identification handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdField {
    Name(String),
    Author(String),
}

/// First whitespace-separated token of a line.
pub fn line_tag(line: &str) -> Option<&str> {
    line.split_whitespace().next()
}

/// Parse an `id name ...` or `id author ...` line.
pub fn parse_id_line(line: &str) -> Option<IdField> {
    if let Some(rest) = line.strip_prefix("id name") {
        return Some(IdField::Name(rest.trim().to_string()));
    }
    if let Some(rest) = line.strip_prefix("id author") {
        return Some(IdField::Author(rest.trim().to_string()));
    }
    None
}

/// Parse an `info` line.
///
/// Recognized fields are `depth`, `score cp N` / `score mate N`, `nodes`,
/// `multipv` and a trailing `pv ...`. Anything else is skipped. A `string`
/// field ends the scan because the rest of the line is free text.
///
/// Returns `None` if the line is not an `info` line or carries no recognized field.
///
/// # Example
///
/// ```rust
/// use usi_client::internal::parse_progress_line;
///
/// let info = parse_progress_line("info depth 12 score cp 35 multipv 1 pv 7g7f 3c3d").unwrap();
/// assert_eq!(info.depth, Some(12));
/// assert_eq!(info.score_cp, Some(35));
/// assert!(parse_progress_line("info string hello").is_none());
/// ```
pub fn parse_progress_line(line: &str) -> Option<ProgressInfo> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.first() != Some(&INFO_TAG) {
        return None;
    }

    let mut info = ProgressInfo::default();
    let mut i = 1;

    while i < tokens.len() {
        match tokens[i] {
            "depth" => {
                if let Some(depth) = tokens.get(i + 1).and_then(|t| t.parse().ok()) {
                    info.depth = Some(depth);
                    i += 2;
                    continue;
                }
            }
            "score" => {
                let kind = tokens.get(i + 1).copied();
                let value = tokens.get(i + 2).and_then(|t| t.parse::<i32>().ok());
                match (kind, value) {
                    (Some("cp"), Some(value)) => {
                        info.score_cp = Some(value);
                        i += 3;
                        continue;
                    }
                    (Some("mate"), Some(value)) => {
                        info.score_mate = Some(value);
                        i += 3;
                        continue;
                    }
                    _ => {}
                }
            }
            "nodes" => {
                if let Some(nodes) = tokens.get(i + 1).and_then(|t| t.parse().ok()) {
                    info.nodes = Some(nodes);
                    i += 2;
                    continue;
                }
            }
            "multipv" => {
                if let Some(index) = tokens.get(i + 1).and_then(|t| t.parse().ok()) {
                    info.multipv = Some(index);
                    i += 2;
                    continue;
                }
            }
            "pv" => {
                info.pv = Some(tokens[i + 1..].iter().map(|t| t.to_string()).collect());
                break;
            }
            "string" => break,
            _ => {}
        }
        i += 1;
    }

    if info.is_empty() { None } else { Some(info) }
}

/// Parse a `bestmove` line.
///
/// Returns `None` if the line is not a `bestmove` line, `Some(None)` if it
/// carries no move token.
pub fn parse_bestmove_line(line: &str) -> Option<Option<String>> {
    let mut tokens = line.split_whitespace();
    if tokens.next() != Some(BESTMOVE_TAG) {
        return None;
    }
    Some(tokens.next().map(str::to_string))
}

/// Parse a `checkmate` line.
pub fn parse_checkmate_line(line: &str) -> Option<MateOutcome> {
    let mut tokens = line.split_whitespace();
    if tokens.next() != Some(CHECKMATE_TAG) {
        return None;
    }

    let rest: Vec<String> = tokens.map(str::to_string).collect();
    let outcome = match rest.first().map(String::as_str) {
        None | Some("nomate") => MateOutcome::NoMate,
        Some("timeout") => MateOutcome::Timeout,
        Some("notimplemented") => MateOutcome::NotImplemented,
        Some(_) => MateOutcome::Found(rest),
    };
    Some(outcome)
}
