use std::fmt::Write;

use super::model::Evaluation;

/// Render a Markdown report.
///
/// Section order: overview, detailed scores, strengths, areas for
/// improvement, key observations, standout moments, concerns, detailed
/// feedback, next steps. Standout moments and concerns are omitted when empty.
pub fn render_report(evaluation: &Evaluation) -> String {
    let mut report = String::new();

    let evaluated_at = evaluation
        .evaluated_at
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| "N/A".to_string());

    let _ = write!(
        report,
        "# Interview Evaluation Report\n\n\
         ## Candidate Information\n\
         - **Candidate ID**: {}\n\
         - **Job Role**: {}\n\
         - **Evaluation Date**: {}\n\n\
         ## Overall Assessment\n\
         - **Overall Score**: {}/10\n\
         - **Recommendation**: **{}**\n\n\
         ## Detailed Scores\n",
        or_na(&evaluation.candidate_id),
        or_na(&evaluation.job_role),
        evaluated_at,
        evaluation.overall_score,
        evaluation.recommendation,
    );

    for (label, score) in evaluation.detailed_scores.entries() {
        let _ = writeln!(report, "- **{}**: {}/10", label, score);
    }

    push_list(&mut report, "Strengths", &evaluation.strengths);
    push_list(&mut report, "Areas for Improvement", &evaluation.areas_for_improvement);
    push_list(&mut report, "Key Observations", &evaluation.key_observations);

    if !evaluation.standout_moments.is_empty() {
        push_list(&mut report, "Standout Moments", &evaluation.standout_moments);
    }
    if !evaluation.concerns.is_empty() {
        push_list(&mut report, "Concerns", &evaluation.concerns);
    }

    let _ = write!(
        report,
        "\n## Detailed Feedback\n\n{}\n\n## Next Steps\n\n{}\n",
        or_na(&evaluation.detailed_feedback),
        or_na(&evaluation.next_steps_recommendation),
    );

    report
}

fn push_list(report: &mut String, title: &str, items: &[String]) {
    let _ = writeln!(report, "\n## {}", title);
    for item in items {
        let _ = writeln!(report, "- {}", item);
    }
}

fn or_na(value: &str) -> &str {
    if value.trim().is_empty() {
        "N/A"
    } else {
        value
    }
}
