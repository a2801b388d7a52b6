use sqlx::types::Json;
use sqlx::PgPool;

use crate::db::models::{Exam, ModuleConfigMap};
use crate::db::types::ExamStatus;
use crate::services::lifecycle::SubmissionEvent;

pub(crate) const COLUMNS: &str = "\
    id, title, description, status, modules, is_free, created_by, \
    total_submissions, graded_submissions, band_score_sum, \
    created_at, updated_at, published_at";

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Exam>, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!("SELECT {COLUMNS} FROM exams WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) struct CreateExam<'a> {
    pub id: &'a str,
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub modules: &'a ModuleConfigMap,
    pub is_free: bool,
    pub created_by: &'a str,
    pub created_at: time::PrimitiveDateTime,
    pub updated_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(pool: &PgPool, params: CreateExam<'_>) -> Result<Exam, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!(
        "INSERT INTO exams (
            id, title, description, status, modules, is_free, created_by,
            created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.title)
    .bind(params.description)
    .bind(ExamStatus::Draft)
    .bind(Json(params.modules))
    .bind(params.is_free)
    .bind(params.created_by)
    .bind(params.created_at)
    .bind(params.updated_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn list_published(
    pool: &PgPool,
    skip: i64,
    limit: i64,
) -> Result<Vec<Exam>, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!(
        "SELECT {COLUMNS} FROM exams
         WHERE status = $1
         ORDER BY published_at DESC NULLS LAST
         OFFSET $2 LIMIT $3",
    ))
    .bind(ExamStatus::Published)
    .bind(skip)
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub(crate) async fn list_all(pool: &PgPool, skip: i64, limit: i64) -> Result<Vec<Exam>, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!(
        "SELECT {COLUMNS} FROM exams ORDER BY created_at DESC OFFSET $1 LIMIT $2",
    ))
    .bind(skip)
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub(crate) async fn set_status(
    pool: &PgPool,
    id: &str,
    status: ExamStatus,
    now: time::PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    let published_at = matches!(status, ExamStatus::Published).then_some(now);
    sqlx::query(
        "UPDATE exams
         SET status = $1,
             published_at = COALESCE($2, published_at),
             updated_at = $3
         WHERE id = $4",
    )
    .bind(status)
    .bind(published_at)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Roll a submission lifecycle event into the exam's aggregate counters.
pub(crate) async fn apply_event(
    pool: &PgPool,
    event: &SubmissionEvent,
    now: time::PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    match event {
        SubmissionEvent::Completed { exam_id, .. } => {
            sqlx::query(
                "UPDATE exams
                 SET total_submissions = total_submissions + 1, updated_at = $1
                 WHERE id = $2",
            )
            .bind(now)
            .bind(exam_id)
            .execute(pool)
            .await?;
        }
        SubmissionEvent::Graded { exam_id, overall_band, .. } => {
            sqlx::query(
                "UPDATE exams
                 SET graded_submissions = graded_submissions + 1,
                     band_score_sum = band_score_sum + $1,
                     updated_at = $2
                 WHERE id = $3",
            )
            .bind(overall_band.unwrap_or(0.0))
            .bind(now)
            .bind(exam_id)
            .execute(pool)
            .await?;
        }
    }
    Ok(())
}
