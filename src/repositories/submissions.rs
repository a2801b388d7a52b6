use sqlx::PgPool;

use crate::db::models::Submission;
use crate::db::types::SubmissionStatus;

const COLUMNS: &str = "\
    id, exam_id, candidate_id, status, progress, timing, answers, scores, \
    integrity, grading, started_at, expires_at, completed_at, graded_at, \
    cancelled_at, created_at, updated_at";

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!("SELECT {COLUMNS} FROM submissions WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn find_active_by_exam_and_candidate(
    pool: &PgPool,
    exam_id: &str,
    candidate_id: &str,
) -> Result<Option<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!(
        "SELECT {COLUMNS} FROM submissions
         WHERE exam_id = $1 AND candidate_id = $2 AND status = $3",
    ))
    .bind(exam_id)
    .bind(candidate_id)
    .bind(SubmissionStatus::InProgress)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn list_by_candidate(
    pool: &PgPool,
    candidate_id: &str,
    skip: i64,
    limit: i64,
) -> Result<Vec<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!(
        "SELECT {COLUMNS} FROM submissions
         WHERE candidate_id = $1
         ORDER BY created_at DESC
         OFFSET $2 LIMIT $3",
    ))
    .bind(candidate_id)
    .bind(skip)
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub(crate) async fn list_by_exam(
    pool: &PgPool,
    exam_id: &str,
    status: Option<SubmissionStatus>,
    skip: i64,
    limit: i64,
) -> Result<Vec<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!(
        "SELECT {COLUMNS} FROM submissions
         WHERE exam_id = $1 AND ($2::submissionstatus IS NULL OR status = $2)
         ORDER BY created_at DESC
         OFFSET $3 LIMIT $4",
    ))
    .bind(exam_id)
    .bind(status)
    .bind(skip)
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub(crate) async fn count_by_exam(
    pool: &PgPool,
    exam_id: &str,
    status: Option<SubmissionStatus>,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT COUNT(*) FROM submissions
         WHERE exam_id = $1 AND ($2::submissionstatus IS NULL OR status = $2)",
    )
    .bind(exam_id)
    .bind(status)
    .fetch_one(pool)
    .await
}

pub(crate) async fn create(pool: &PgPool, submission: &Submission) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO submissions (
            id, exam_id, candidate_id, status, progress, timing, answers,
            scores, integrity, grading, started_at, expires_at, completed_at,
            graded_at, cancelled_at, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17)",
    )
    .bind(&submission.id)
    .bind(&submission.exam_id)
    .bind(&submission.candidate_id)
    .bind(submission.status)
    .bind(&submission.progress)
    .bind(&submission.timing)
    .bind(&submission.answers)
    .bind(&submission.scores)
    .bind(&submission.integrity)
    .bind(&submission.grading)
    .bind(submission.started_at)
    .bind(submission.expires_at)
    .bind(submission.completed_at)
    .bind(submission.graded_at)
    .bind(submission.cancelled_at)
    .bind(submission.created_at)
    .bind(submission.updated_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Persist the whole aggregate after a lifecycle transition. Every engine
/// operation mutates the in-memory row, then lands here exactly once.
pub(crate) async fn save(pool: &PgPool, submission: &Submission) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE submissions
         SET status = $1,
             progress = $2,
             timing = $3,
             answers = $4,
             scores = $5,
             integrity = $6,
             grading = $7,
             expires_at = $8,
             completed_at = $9,
             graded_at = $10,
             cancelled_at = $11,
             updated_at = $12
         WHERE id = $13",
    )
    .bind(submission.status)
    .bind(&submission.progress)
    .bind(&submission.timing)
    .bind(&submission.answers)
    .bind(&submission.scores)
    .bind(&submission.integrity)
    .bind(&submission.grading)
    .bind(submission.expires_at)
    .bind(submission.completed_at)
    .bind(submission.graded_at)
    .bind(submission.cancelled_at)
    .bind(submission.updated_at)
    .bind(&submission.id)
    .execute(pool)
    .await?;

    Ok(())
}
