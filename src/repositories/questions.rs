use sqlx::types::Json;
use sqlx::PgPool;

use crate::db::models::{AnswerValue, Question};
use crate::db::types::{ExamModule, QuestionKind};

const COLUMNS: &str = "\
    id, exam_id, module, order_index, kind, prompt, options, correct_answer, \
    points, created_at";

pub(crate) struct CreateQuestion<'a> {
    pub id: &'a str,
    pub exam_id: &'a str,
    pub module: ExamModule,
    pub order_index: i32,
    pub kind: QuestionKind,
    pub prompt: &'a str,
    pub options: &'a [String],
    pub correct_answer: Option<&'a AnswerValue>,
    pub points: f64,
    pub created_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(
    pool: &PgPool,
    params: CreateQuestion<'_>,
) -> Result<Question, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "INSERT INTO questions (
            id, exam_id, module, order_index, kind, prompt, options,
            correct_answer, points, created_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.exam_id)
    .bind(params.module)
    .bind(params.order_index)
    .bind(params.kind)
    .bind(params.prompt)
    .bind(Json(params.options))
    .bind(params.correct_answer.map(Json))
    .bind(params.points)
    .bind(params.created_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn list_by_exam(pool: &PgPool, exam_id: &str) -> Result<Vec<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "SELECT {COLUMNS} FROM questions WHERE exam_id = $1 ORDER BY module, order_index",
    ))
    .bind(exam_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!("SELECT {COLUMNS} FROM questions WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn count_by_exam(pool: &PgPool, exam_id: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM questions WHERE exam_id = $1")
        .bind(exam_id)
        .fetch_one(pool)
        .await
}
