//! Interview transcript assembly
//!
//! Speech-to-text results from the room and the conversational engine are
//! funnelled into a single `TranscriptAggregator`, which keeps only final
//! results and merges consecutive results from the same speaker into one turn.

mod aggregator;
mod stats;

pub use aggregator::{Speaker, TranscriptAggregator, TranscriptEntry, TranscriptExport};
pub use stats::{candidate_responses, interviewer_questions, TalkTimeRatio, TranscriptStats};
