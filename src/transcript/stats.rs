use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::aggregator::{Speaker, TranscriptEntry};

/// Counts derived from a transcript snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranscriptStats {
    /// Number of coalesced entries
    pub total_entries: usize,

    /// Entries per speaker
    pub speaker_entries: BTreeMap<Speaker, usize>,

    /// Whitespace-separated words across all entries
    pub total_words: usize,

    /// Words per speaker
    pub speaker_words: BTreeMap<Speaker, usize>,

    /// Interviewer turns containing a question mark
    pub questions_asked: usize,

    /// Non-empty candidate turns
    pub candidate_responses: usize,

    pub talk_time: TalkTimeRatio,
}

/// Share of words spoken by each side
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TalkTimeRatio {
    pub interviewer_words: usize,
    pub candidate_words: usize,
    pub interviewer_ratio: f64,
    pub candidate_ratio: f64,
}

impl TranscriptStats {
    pub fn from_entries(entries: &[TranscriptEntry]) -> Self {
        let mut stats = Self {
            total_entries: entries.len(),
            ..Self::default()
        };

        for entry in entries {
            let words = entry.text.split_whitespace().count();
            stats.total_words += words;
            *stats.speaker_entries.entry(entry.speaker).or_default() += 1;
            *stats.speaker_words.entry(entry.speaker).or_default() += words;
        }
        stats.questions_asked = interviewer_questions(entries).len();
        stats.candidate_responses = candidate_responses(entries).len();
        stats.talk_time = stats.talk_time_ratio();

        stats
    }

    pub fn words_for(&self, speaker: Speaker) -> usize {
        self.speaker_words.get(&speaker).copied().unwrap_or(0)
    }

    /// Unknown speakers are left out of both sides of the ratio
    pub fn talk_time_ratio(&self) -> TalkTimeRatio {
        let interviewer_words = self.words_for(Speaker::Interviewer);
        let candidate_words = self.words_for(Speaker::Candidate);
        let total = interviewer_words + candidate_words;

        if total == 0 {
            return TalkTimeRatio::default();
        }

        TalkTimeRatio {
            interviewer_words,
            candidate_words,
            interviewer_ratio: interviewer_words as f64 / total as f64,
            candidate_ratio: candidate_words as f64 / total as f64,
        }
    }
}

/// Interviewer turns that contain a question
pub fn interviewer_questions(entries: &[TranscriptEntry]) -> Vec<&str> {
    entries
        .iter()
        .filter(|e| e.speaker == Speaker::Interviewer && e.text.contains('?'))
        .map(|e| e.text.trim())
        .collect()
}

pub fn candidate_responses(entries: &[TranscriptEntry]) -> Vec<&str> {
    entries
        .iter()
        .filter(|e| e.speaker == Speaker::Candidate)
        .map(|e| e.text.trim())
        .filter(|t| !t.is_empty())
        .collect()
}
