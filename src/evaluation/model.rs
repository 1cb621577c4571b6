use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const MIN_SCORE: f32 = 1.0;
pub const MAX_SCORE: f32 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum Recommendation {
    #[serde(rename = "Hire")]
    Hire,
    #[serde(rename = "No Hire")]
    NoHire,
    #[serde(rename = "Maybe")]
    Maybe,
}

impl Recommendation {
    pub fn label(&self) -> &'static str {
        match self {
            Recommendation::Hire => "Hire",
            Recommendation::NoHire => "No Hire",
            Recommendation::Maybe => "Maybe",
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl TryFrom<String> for Recommendation {
    type Error = String;

    /// Accepts `Hire`, `No Hire`, `no_hire`, `NO-HIRE`, `maybe`, ...
    fn try_from(raw: String) -> std::result::Result<Self, Self::Error> {
        let normalized: String = raw
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();

        match normalized.as_str() {
            "hire" => Ok(Recommendation::Hire),
            "nohire" => Ok(Recommendation::NoHire),
            "maybe" => Ok(Recommendation::Maybe),
            _ => Err(format!("unknown recommendation: {:?}", raw)),
        }
    }
}

/// Per-category scores, each 1-10
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailedScores {
    pub technical_competency: f32,
    pub communication_skills: f32,
    pub problem_solving: f32,
    pub experience_relevance: f32,
    pub cultural_fit: f32,
}

impl DetailedScores {
    /// (label, score) pairs in report order
    pub fn entries(&self) -> [(&'static str, f32); 5] {
        [
            ("Technical Competency", self.technical_competency),
            ("Communication Skills", self.communication_skills),
            ("Problem Solving", self.problem_solving),
            ("Experience Relevance", self.experience_relevance),
            ("Cultural Fit", self.cultural_fit),
        ]
    }
}

/// Scored assessment of one finished interview. Never mutated once saved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub overall_score: f32,
    pub recommendation: Recommendation,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub areas_for_improvement: Vec<String>,
    pub detailed_scores: DetailedScores,
    #[serde(default)]
    pub key_observations: Vec<String>,
    #[serde(default)]
    pub standout_moments: Vec<String>,
    #[serde(default)]
    pub concerns: Vec<String>,
    #[serde(default)]
    pub detailed_feedback: String,
    #[serde(default)]
    pub next_steps_recommendation: String,

    #[serde(default)]
    pub candidate_id: String,
    #[serde(default)]
    pub job_role: String,
    #[serde(default)]
    pub evaluated_at: Option<DateTime<Utc>>,
}

impl Evaluation {
    /// Check every score is within 1-10
    pub fn validate(&self) -> Result<()> {
        check_score("overall_score", self.overall_score)?;
        for (label, score) in self.detailed_scores.entries() {
            check_score(label, score)?;
        }
        Ok(())
    }
}

fn check_score(name: &str, score: f32) -> Result<()> {
    if !(MIN_SCORE..=MAX_SCORE).contains(&score) {
        bail!(
            "{} out of range: {} (expected {}-{})",
            name,
            score,
            MIN_SCORE,
            MAX_SCORE
        );
    }
    Ok(())
}
