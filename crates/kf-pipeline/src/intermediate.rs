//! Stage 1: enrollments joined to participants.

use crate::error::PipelineError;
use crate::stage::{run_stage, Stage, StageOutcome};
use kf_db::Database;

/// Inner join of enrollments and participants with the derived status and
/// calendar columns. Enrollments without a matching participant drop out.
pub(crate) const INTERMEDIATE_SQL: &str = "\
SELECT
    e.enrollment_id,
    e.participant_id,
    p.first_name,
    p.last_name,
    p.department,
    p.start_date_at_company AS participant_start_date,
    e.course_id,
    e.enrollment_date,
    e.completion_date,
    e.score,
    e.status AS enrollment_status,
    CASE WHEN e.status = 'completed' THEN TRUE ELSE FALSE END AS is_completed,
    CAST(EXTRACT(YEAR FROM e.enrollment_date) AS INTEGER) AS enrollment_year,
    CAST(EXTRACT(MONTH FROM e.enrollment_date) AS INTEGER) AS enrollment_month
FROM enrollments AS e
JOIN participants AS p ON e.participant_id = p.participant_id
ORDER BY e.enrollment_id";

/// Rebuild `transformed_enrollments_participants`.
///
/// Fails with [`PipelineError::UpstreamMissing`] if `enrollments` or
/// `participants` has not been ingested.
pub async fn build_intermediate(db: &dyn Database) -> Result<StageOutcome, PipelineError> {
    run_stage(db, Stage::Intermediate, INTERMEDIATE_SQL).await
}

#[cfg(test)]
#[path = "intermediate_test.rs"]
mod tests;
