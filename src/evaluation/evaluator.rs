use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing::{error, info};

use super::model::Evaluation;
use super::report::render_report;
use crate::config::EvaluationConfig;
use crate::nats::messages::{EvaluationGenerateReply, EvaluationGenerateRequest};
use crate::nats::NatsClient;

const GENERATE_SUBJECT: &str = "evaluation.generate";

/// Scoring model that turns a transcript into an `Evaluation`
#[async_trait::async_trait]
pub trait Evaluator: Send + Sync {
    async fn evaluate(&self, transcript: &str, job_role: &str, candidate_id: &str)
        -> Result<Evaluation>;
}

/// Prompt sent to the scoring model
pub fn evaluation_prompt(transcript: &str, job_role: &str) -> String {
    format!(
        r#"Analyze this interview transcript for a {job_role} position.

Transcript:
{transcript}

Provide a comprehensive evaluation in JSON format with the following structure:
{{
    "overall_score": <1-10>,
    "recommendation": "<Hire|No Hire|Maybe>",
    "strengths": ["..."],
    "areas_for_improvement": ["..."],
    "detailed_scores": {{
        "technical_competency": <1-10>,
        "communication_skills": <1-10>,
        "problem_solving": <1-10>,
        "experience_relevance": <1-10>,
        "cultural_fit": <1-10>
    }},
    "key_observations": ["..."],
    "standout_moments": ["..."],
    "concerns": ["..."],
    "detailed_feedback": "A paragraph of detailed feedback",
    "next_steps_recommendation": "What should happen next in the hiring process"
}}

Guidelines:
- Be objective and fair
- Provide specific examples from the transcript
- Base scores on actual evidence from the interview

Return ONLY valid JSON, no additional text."#
    )
}

/// Parse the model's reply, tolerating a surrounding Markdown code fence
pub fn parse_evaluation(raw: &str, candidate_id: &str, job_role: &str) -> Result<Evaluation> {
    let mut text = raw.trim();
    text = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    text = text.strip_suffix("```").unwrap_or(text).trim();

    let mut evaluation: Evaluation =
        serde_json::from_str(text).context("Failed to parse evaluation JSON")?;

    evaluation.candidate_id = candidate_id.to_string();
    evaluation.job_role = job_role.to_string();
    evaluation.evaluated_at = Some(Utc::now());

    evaluation.validate()?;
    Ok(evaluation)
}

fn file_stem(evaluation: &Evaluation) -> String {
    let at = evaluation.evaluated_at.unwrap_or_else(Utc::now);
    let candidate = if evaluation.candidate_id.is_empty() {
        "unknown"
    } else {
        &evaluation.candidate_id
    };
    format!("{}_{}", candidate, at.format("%Y%m%d_%H%M%S"))
}

/// Write `<candidate>_<YYYYmmdd_HHMMSS>.json` under `dir`
pub async fn save_evaluation(dir: &Path, evaluation: &Evaluation) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    let path = dir.join(format!("{}.json", file_stem(evaluation)));
    let json = serde_json::to_vec_pretty(evaluation)?;
    tokio::fs::write(&path, json)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;

    info!("Evaluation saved: {}", path.display());
    Ok(path)
}

/// Write the Markdown report next to the JSON file
pub async fn save_report(dir: &Path, evaluation: &Evaluation) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;

    let path = dir.join(format!("{}.md", file_stem(evaluation)));
    tokio::fs::write(&path, render_report(evaluation))
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;

    info!("Markdown report saved: {}", path.display());
    Ok(path)
}

/// Files produced by `evaluate_and_save`
#[derive(Debug, Clone)]
pub struct EvaluationFiles {
    pub evaluation: Evaluation,
    pub json: PathBuf,
    pub report: Option<PathBuf>,
}

/// Score a transcript and persist the result per `config`
pub async fn evaluate_and_save(
    evaluator: &dyn Evaluator,
    config: &EvaluationConfig,
    transcript: &str,
    job_role: &str,
    candidate_id: &str,
) -> Result<EvaluationFiles> {
    let evaluation = evaluator
        .evaluate(transcript, job_role, candidate_id)
        .await?;

    let json = save_evaluation(&config.output_dir, &evaluation).await?;
    let report = if config.write_report {
        Some(save_report(&config.output_dir, &evaluation).await?)
    } else {
        None
    };

    Ok(EvaluationFiles {
        evaluation,
        json,
        report,
    })
}

/// Scoring model reached through NATS request/reply
pub struct NatsEvaluator {
    client: NatsClient,
}

impl NatsEvaluator {
    pub fn new(client: NatsClient) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl Evaluator for NatsEvaluator {
    async fn evaluate(
        &self,
        transcript: &str,
        job_role: &str,
        candidate_id: &str,
    ) -> Result<Evaluation> {
        let request = EvaluationGenerateRequest {
            candidate_id: candidate_id.to_string(),
            job_role: job_role.to_string(),
            prompt: evaluation_prompt(transcript, job_role),
        };

        let reply: EvaluationGenerateReply = self
            .client
            .request_json(GENERATE_SUBJECT.to_string(), &request)
            .await?;

        let text = match (reply.text, reply.error) {
            (_, Some(error)) => return Err(anyhow!("Scoring model failed: {}", error)),
            (Some(text), None) => text,
            (None, None) => return Err(anyhow!("Scoring model returned no text")),
        };

        parse_evaluation(&text, candidate_id, job_role).map_err(|e| {
            error!("Unparseable evaluation for {}: {}", candidate_id, text);
            e
        })
    }
}
