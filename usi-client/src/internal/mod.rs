//! Internal implementation details: process transport, output queue and line parsers.

pub mod info_parser;
pub mod output_queue;
pub mod transport;

pub use info_parser::{
    IdField, parse_bestmove_line, parse_checkmate_line, parse_id_line, parse_progress_line,
};
pub use output_queue::OutputQueue;
