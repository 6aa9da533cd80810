//! Search requests and results.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;

/// Move token reported when the engine produced no best move.
pub const RESIGN: &str = "resign";

/// Fallback engine name when the handshake did not report one.
pub const DEFAULT_ENGINE_NAME: &str = "YaneuraOu";

/// Fallback author when the handshake did not report one.
pub const DEFAULT_ENGINE_AUTHOR: &str = "Unknown";

/// A position to analyze: an explicit SFEN or the initial position, plus moves played from it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Position {
    pub sfen: Option<String>,
    pub moves: Vec<String>,
}

impl Position {
    /// The initial position.
    pub fn startpos() -> Self {
        Self::default()
    }

    /// An explicit SFEN position.
    pub fn from_sfen(sfen: impl Into<String>) -> Self {
        Self {
            sfen: Some(sfen.into()),
            moves: Vec::new(),
        }
    }

    pub fn with_moves<I, S>(mut self, moves: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.moves = moves.into_iter().map(Into::into).collect();
        self
    }

    /// Render the `position` command line.
    pub fn to_command(&self) -> String {
        let mut command = match self.sfen.as_deref().filter(|s| !s.trim().is_empty()) {
            Some(sfen) => format!("position sfen {}", sfen.trim()),
            None => "position startpos".to_string(),
        };
        if !self.moves.is_empty() {
            command.push_str(" moves ");
            command.push_str(&self.moves.join(" "));
        }
        command
    }
}

/// A request for a normal analysis search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub position: Position,
    /// Thinking time in milliseconds (ignored when `depth` is set).
    pub time_ms: u64,
    /// Fixed search depth.
    pub depth: Option<u32>,
    /// Number of candidate lines (MultiPV).
    pub multipv: u32,
}

impl AnalysisRequest {
    pub fn new(position: Position) -> Self {
        Self {
            position,
            time_ms: 1000,
            depth: None,
            multipv: 1,
        }
    }

    pub fn with_time_ms(mut self, time_ms: u64) -> Self {
        self.time_ms = time_ms;
        self
    }

    pub fn with_depth(mut self, depth: u32) -> Self {
        self.depth = Some(depth);
        self
    }

    pub fn with_multipv(mut self, multipv: u32) -> Self {
        self.multipv = multipv;
        self
    }
}

/// Fields extracted from one `info` line. Every field is optional because
/// engines only report what changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProgressInfo {
    pub depth: Option<u32>,
    pub score_cp: Option<i32>,
    pub score_mate: Option<i32>,
    pub nodes: Option<u64>,
    pub multipv: Option<u32>,
    pub pv: Option<Vec<String>>,
}

impl ProgressInfo {
    /// True when no recognized field was found.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// The variation this record belongs to, given how many lines were requested.
    ///
    /// Engines omit `multipv` when a single line is searched, so in that case
    /// a record that carries a principal variation counts as variation 1.
    /// In a multi-line search an unindexed record is ambiguous and yields `None`.
    pub fn variation_index(&self, requested: u32) -> Option<u32> {
        match self.multipv {
            Some(index) => Some(index),
            None if requested <= 1 => self.pv.as_ref().map(|_| 1),
            None => None,
        }
    }
}

/// Raw result of one search on a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOutcome {
    /// Best move, or [`RESIGN`] when the engine produced none.
    pub bestmove: String,
    /// Last record seen for each variation, by ascending index.
    pub variations: Vec<ProgressInfo>,
    pub elapsed: Duration,
    /// No `bestmove` line arrived before the read bound expired.
    pub timed_out: bool,
}

impl SearchOutcome {
    pub(crate) fn new(
        bestmove: Option<String>,
        variations: BTreeMap<u32, ProgressInfo>,
        elapsed: Duration,
        timed_out: bool,
    ) -> Self {
        Self {
            bestmove: bestmove.unwrap_or_else(|| RESIGN.to_string()),
            variations: variations.into_values().collect(),
            elapsed,
            timed_out,
        }
    }
}

/// One candidate line in an analysis result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Variation {
    #[serde(rename = "move")]
    pub move_: String,
    pub score_cp: Option<i32>,
    pub score_mate: Option<i32>,
    pub depth: u32,
    pub nodes: Option<u64>,
    pub pv: Option<Vec<String>>,
}

impl From<ProgressInfo> for Variation {
    fn from(info: ProgressInfo) -> Self {
        let move_ = info
            .pv
            .as_ref()
            .and_then(|pv| pv.first())
            .cloned()
            .unwrap_or_default();

        Self {
            move_,
            score_cp: info.score_cp,
            score_mate: info.score_mate,
            depth: info.depth.unwrap_or(0),
            nodes: info.nodes,
            pv: info.pv,
        }
    }
}

/// Analysis result returned by the pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisResult {
    pub bestmove: String,
    pub variations: Vec<Variation>,
    pub time_ms: u64,
    pub engine_name: String,
}

/// Outcome of a mate search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MateOutcome {
    /// A forced mate; the full mating sequence.
    Found(Vec<String>),
    /// The engine proved there is no mate (`checkmate nomate`).
    NoMate,
    /// The engine gave up within its budget (`checkmate timeout`).
    Timeout,
    /// The engine does not support mate search (`checkmate notimplemented`).
    NotImplemented,
    /// No `checkmate` line arrived before the read bound expired.
    NoResponse,
}

impl MateOutcome {
    pub fn is_found(&self) -> bool {
        matches!(self, MateOutcome::Found(_))
    }

    pub fn timed_out(&self) -> bool {
        matches!(self, MateOutcome::Timeout | MateOutcome::NoResponse)
    }

    pub fn moves(&self) -> Option<&[String]> {
        match self {
            MateOutcome::Found(moves) => Some(moves),
            _ => None,
        }
    }

    /// Mate length in plies.
    pub fn length(&self) -> Option<usize> {
        self.moves().map(<[String]>::len)
    }

    pub fn message(&self) -> Option<&'static str> {
        match self {
            MateOutcome::Found(_) => None,
            MateOutcome::NoMate => Some("No mate found"),
            MateOutcome::Timeout => Some("Search timeout"),
            MateOutcome::NotImplemented => Some("Mate search not implemented"),
            MateOutcome::NoResponse => Some("Mate search timeout"),
        }
    }
}

/// Serializable view of a [`MateOutcome`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MateResult {
    pub mate_found: bool,
    pub mate_moves: Option<Vec<String>>,
    pub mate_length: Option<usize>,
    pub message: Option<String>,
}

impl From<MateOutcome> for MateResult {
    fn from(outcome: MateOutcome) -> Self {
        let message = outcome.message().map(str::to_string);
        match outcome {
            MateOutcome::Found(moves) => Self {
                mate_found: true,
                mate_length: Some(moves.len()),
                mate_moves: Some(moves),
                message,
            },
            _ => Self {
                mate_found: false,
                mate_moves: None,
                mate_length: None,
                message,
            },
        }
    }
}

/// Identity reported by an engine during the `usi` handshake.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EngineIdentity {
    pub name: Option<String>,
    pub author: Option<String>,
}

impl EngineIdentity {
    /// Both name and author were reported.
    pub fn is_complete(&self) -> bool {
        self.name.is_some() && self.author.is_some()
    }
}

/// Engine information exposed by the pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineInfo {
    pub name: String,
    pub author: String,
    pub version: String,
    pub options: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_command() {
        assert_eq!(Position::startpos().to_command(), "position startpos");

        let pos = Position::startpos().with_moves(["7g7f", "3c3d"]);
        assert_eq!(pos.to_command(), "position startpos moves 7g7f 3c3d");

        let sfen = "lnsgkgsnl/1r5b1/ppppppppp/9/9/9/PPPPPPPPP/1B5R1/LNSGKGSNL b - 1";
        let pos = Position::from_sfen(sfen).with_moves(["2g2f"]);
        assert_eq!(pos.to_command(), format!("position sfen {sfen} moves 2g2f"));
    }

    #[test]
    fn test_blank_sfen_falls_back_to_startpos() {
        let pos = Position::from_sfen("   ");
        assert_eq!(pos.to_command(), "position startpos");
    }

    #[test]
    fn test_variation_from_progress_info() {
        let info = ProgressInfo {
            depth: Some(12),
            score_cp: Some(35),
            nodes: Some(10000),
            multipv: Some(1),
            pv: Some(vec!["7g7f".into(), "3c3d".into()]),
            ..Default::default()
        };
        let variation = Variation::from(info);
        assert_eq!(variation.move_, "7g7f");
        assert_eq!(variation.depth, 12);
        assert_eq!(variation.score_cp, Some(35));
        assert_eq!(variation.score_mate, None);

        let bare = Variation::from(ProgressInfo {
            multipv: Some(2),
            ..Default::default()
        });
        assert_eq!(bare.move_, "");
        assert_eq!(bare.depth, 0);
        assert!(bare.pv.is_none());
    }

    #[test]
    fn test_variation_index_defaults_only_for_single_line() {
        let with_pv = ProgressInfo {
            pv: Some(vec!["7g7f".into()]),
            ..Default::default()
        };
        assert_eq!(with_pv.variation_index(1), Some(1));
        assert_eq!(with_pv.variation_index(3), None);

        let indexed = ProgressInfo {
            multipv: Some(2),
            ..Default::default()
        };
        assert_eq!(indexed.variation_index(3), Some(2));

        let nodes_only = ProgressInfo {
            nodes: Some(5),
            ..Default::default()
        };
        assert_eq!(nodes_only.variation_index(1), None);
    }

    #[test]
    fn test_search_outcome_orders_variations_and_defaults_to_resign() {
        let mut map = BTreeMap::new();
        map.insert(3, ProgressInfo { multipv: Some(3), ..Default::default() });
        map.insert(1, ProgressInfo { multipv: Some(1), ..Default::default() });

        let outcome = SearchOutcome::new(None, map, Duration::from_millis(5), true);
        assert_eq!(outcome.bestmove, RESIGN);
        let indices: Vec<_> = outcome.variations.iter().map(|v| v.multipv).collect();
        assert_eq!(indices, vec![Some(1), Some(3)]);
    }

    #[test]
    fn test_mate_result_serialization() {
        let found = MateResult::from(MateOutcome::Found(vec!["7g7f".into(), "8c8d".into()]));
        let json = serde_json::to_value(&found).unwrap();
        assert_eq!(json["mate_found"], true);
        assert_eq!(json["mate_length"], 2);
        assert!(json["message"].is_null());

        let none = MateResult::from(MateOutcome::NoMate);
        assert!(!none.mate_found);
        assert_eq!(none.message.as_deref(), Some("No mate found"));
        assert!(!MateOutcome::NoMate.timed_out());
        assert!(MateOutcome::NoResponse.timed_out());
    }

    #[test]
    fn test_variation_serializes_move_field() {
        let variation = Variation::from(ProgressInfo {
            pv: Some(vec!["2g2f".into()]),
            ..Default::default()
        });
        let json = serde_json::to_string(&variation).unwrap();
        assert!(json.contains("\"move\":\"2g2f\""));
    }
}
