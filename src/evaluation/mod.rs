//! Post-interview evaluation
//!
//! A scoring model turns the finished transcript into an `Evaluation`, which
//! is saved once as JSON and optionally rendered as a Markdown report.

mod evaluator;
mod model;
mod report;

pub use evaluator::{
    evaluate_and_save, evaluation_prompt, parse_evaluation, save_evaluation, save_report,
    EvaluationFiles, Evaluator, NatsEvaluator,
};
pub use model::{DetailedScores, Evaluation, Recommendation, MAX_SCORE, MIN_SCORE};
pub use report::render_report;
