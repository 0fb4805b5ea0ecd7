//! Stage 2: the denormalized training KPI fact table.

use crate::error::PipelineError;
use crate::stage::{run_stage, Stage, StageOutcome};
use kf_core::FeedbackPolicy;
use kf_db::Database;

/// Feedback rows numbered in ingestion order.
const FEEDBACK_ROWS: &str =
    "SELECT enrollment_id, rating, comments, rowid AS feedback_seq FROM feedbacks";

/// Feedback relation joined into the fact table under `policy`
pub(crate) fn feedback_relation(policy: FeedbackPolicy) -> String {
    match policy {
        FeedbackPolicy::FanOut => FEEDBACK_ROWS.to_string(),
        FeedbackPolicy::Latest => format!(
            "SELECT * FROM ({}) AS fb \
             QUALIFY ROW_NUMBER() OVER (PARTITION BY enrollment_id ORDER BY feedback_seq DESC) = 1",
            FEEDBACK_ROWS
        ),
    }
}

/// SELECT producing `fact_training_kpis`
pub(crate) fn fact_sql(policy: FeedbackPolicy) -> String {
    format!(
        "\
SELECT
    tep.enrollment_id,
    tep.participant_id,
    tep.first_name,
    tep.last_name,
    tep.department,
    tep.participant_start_date,
    tep.course_id,
    c.course_name,
    c.category AS course_category,
    c.duration_hours AS training_hours,
    tep.enrollment_date,
    tep.completion_date,
    tep.score AS enrollment_score,
    tep.enrollment_status,
    tep.is_completed,
    CAST(EXTRACT(QUARTER FROM tep.enrollment_date) AS INTEGER) AS enrollment_quarter,
    f.rating AS feedback_score,
    f.comments AS feedback_comments,
    strftime(tep.enrollment_date, '%Y-%m') AS enrollment_month_year,
    strftime(tep.enrollment_date, '%Y') || '-' ||
        CAST(EXTRACT(QUARTER FROM tep.enrollment_date) AS VARCHAR) AS enrollment_quarter_year
FROM transformed_enrollments_participants AS tep
LEFT JOIN courses AS c ON tep.course_id = c.course_id
LEFT JOIN ({feedback}) AS f ON tep.enrollment_id = f.enrollment_id
ORDER BY tep.enrollment_id, f.feedback_seq",
        feedback = feedback_relation(policy)
    )
}

/// Rebuild `fact_training_kpis` from the committed stage-1 table.
///
/// Every intermediate row survives: missing course or feedback data leaves
/// the corresponding columns null. With [`FeedbackPolicy::FanOut`] an
/// enrollment with N feedback rows yields N fact rows; with
/// [`FeedbackPolicy::Latest`] only the last ingested feedback row is kept.
pub async fn build_fact(
    db: &dyn Database,
    policy: FeedbackPolicy,
) -> Result<StageOutcome, PipelineError> {
    log::debug!("Feedback policy: {}", policy);
    run_stage(db, Stage::Fact, &fact_sql(policy)).await
}

#[cfg(test)]
#[path = "fact_test.rs"]
mod tests;
