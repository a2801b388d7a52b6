use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentAdmin, CurrentUser};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::Exam;
use crate::db::types::{ExamStatus, QuestionKind, UserRole};
use crate::repositories;
use crate::schemas::exam::{
    ExamCreate, ExamResponse, ExamStatsResponse, QuestionBulkCreate, QuestionResponse,
};

#[derive(Debug, Deserialize)]
pub(crate) struct ListExamsQuery {
    #[serde(default)]
    skip: i64,
    #[serde(default = "crate::api::pagination::default_limit")]
    limit: i64,
}

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_exam).get(list_exams))
        .route("/:exam_id", get(get_exam))
        .route("/:exam_id/publish", post(publish_exam))
        .route("/:exam_id/questions", post(add_questions).get(list_questions))
        .route("/:exam_id/stats", get(exam_stats))
}

async fn create_exam(
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<ExamCreate>,
) -> Result<(StatusCode, Json<ExamResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let modules = payload.module_config();
    if modules.enabled_modules().is_empty() {
        return Err(ApiError::BadRequest("At least one module must be enabled".to_string()));
    }
    for module in modules.enabled_modules() {
        if modules.get(module).duration_minutes <= 0 {
            return Err(ApiError::BadRequest(format!(
                "Module '{}' must have a positive duration",
                module.as_str()
            )));
        }
    }

    let now = primitive_now_utc();
    let exam = repositories::exams::create(
        state.db(),
        repositories::exams::CreateExam {
            id: &Uuid::new_v4().to_string(),
            title: payload.title.trim(),
            description: payload.description.as_deref(),
            modules: &modules,
            is_free: payload.is_free,
            created_by: &admin.id,
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create exam"))?;

    Ok((StatusCode::CREATED, Json(ExamResponse::from_db(exam))))
}

async fn list_exams(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Query(query): Query<ListExamsQuery>,
) -> Result<Json<Vec<ExamResponse>>, ApiError> {
    let limit = query.limit.clamp(1, 500);
    let skip = query.skip.max(0);

    let exams = if user.role == UserRole::Admin {
        repositories::exams::list_all(state.db(), skip, limit).await
    } else {
        repositories::exams::list_published(state.db(), skip, limit).await
    }
    .map_err(|e| ApiError::internal(e, "Failed to list exams"))?;

    Ok(Json(exams.into_iter().map(ExamResponse::from_db).collect()))
}

async fn get_exam(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(exam_id): Path<String>,
) -> Result<Json<ExamResponse>, ApiError> {
    let exam = fetch_exam(&state, &exam_id).await?;

    if user.role != UserRole::Admin && exam.status != ExamStatus::Published {
        return Err(ApiError::NotFound("Exam not found".to_string()));
    }

    Ok(Json(ExamResponse::from_db(exam)))
}

async fn publish_exam(
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
    Path(exam_id): Path<String>,
) -> Result<Json<ExamResponse>, ApiError> {
    let exam = fetch_exam(&state, &exam_id).await?;

    if exam.status == ExamStatus::Published {
        return Err(ApiError::Conflict("Exam is already published".to_string()));
    }
    if exam.status == ExamStatus::Archived {
        return Err(ApiError::BadRequest("Archived exams cannot be published".to_string()));
    }

    let question_count = repositories::questions::count_by_exam(state.db(), &exam.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count questions"))?;
    if question_count == 0 {
        return Err(ApiError::BadRequest("Cannot publish an exam without questions".to_string()));
    }

    let now = primitive_now_utc();
    repositories::exams::set_status(state.db(), &exam.id, ExamStatus::Published, now)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to publish exam"))?;

    let exam = fetch_exam(&state, &exam_id).await?;
    tracing::info!(exam_id = %exam.id, "Exam published");

    Ok(Json(ExamResponse::from_db(exam)))
}

async fn add_questions(
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
    Path(exam_id): Path<String>,
    Json(payload): Json<QuestionBulkCreate>,
) -> Result<(StatusCode, Json<Vec<QuestionResponse>>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let exam = fetch_exam(&state, &exam_id).await?;
    if exam.status == ExamStatus::Archived {
        return Err(ApiError::BadRequest("Archived exams cannot be edited".to_string()));
    }

    let modules = &exam.modules.0;
    for question in &payload.questions {
        if !modules.get(question.module).enabled {
            return Err(ApiError::BadRequest(format!(
                "Module '{}' is not enabled for this exam",
                question.module.as_str()
            )));
        }
        if question.kind == QuestionKind::Objective && question.correct_answer.is_none() {
            return Err(ApiError::BadRequest(
                "Objective questions require a correct_answer".to_string(),
            ));
        }
    }

    let now = primitive_now_utc();
    let mut created = Vec::with_capacity(payload.questions.len());
    for question in &payload.questions {
        let row = repositories::questions::create(
            state.db(),
            repositories::questions::CreateQuestion {
                id: &Uuid::new_v4().to_string(),
                exam_id: &exam.id,
                module: question.module,
                order_index: question.order_index,
                kind: question.kind,
                prompt: &question.prompt,
                options: &question.options,
                correct_answer: question.correct_answer.as_ref(),
                points: question.points,
                created_at: now,
            },
        )
        .await
        .map_err(|e| ApiError::internal(e, "Failed to create question"))?;
        created.push(QuestionResponse::from_db(row));
    }

    Ok((StatusCode::CREATED, Json(created)))
}

async fn list_questions(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(exam_id): Path<String>,
) -> Result<Json<Vec<QuestionResponse>>, ApiError> {
    let exam = fetch_exam(&state, &exam_id).await?;

    if user.role != UserRole::Admin && exam.status != ExamStatus::Published {
        return Err(ApiError::NotFound("Exam not found".to_string()));
    }

    let questions = repositories::questions::list_by_exam(state.db(), &exam.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list questions"))?;

    Ok(Json(questions.into_iter().map(QuestionResponse::from_db).collect()))
}

async fn exam_stats(
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
    Path(exam_id): Path<String>,
) -> Result<Json<ExamStatsResponse>, ApiError> {
    let exam = fetch_exam(&state, &exam_id).await?;
    Ok(Json(ExamStatsResponse::from_db(&exam)))
}

pub(crate) async fn fetch_exam(state: &AppState, exam_id: &str) -> Result<Exam, ApiError> {
    repositories::exams::find_by_id(state.db(), exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load exam"))?
        .ok_or_else(|| ApiError::NotFound("Exam not found".to_string()))
}
