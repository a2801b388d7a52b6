use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use sqlx::types::Json as SqlxJson;
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::exams::fetch_exam;
use crate::api::guards::CurrentUser;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::Submission;
use crate::db::types::{ExamModule, ExamStatus, SubmissionStatus, UserRole};
use crate::repositories;
use crate::schemas::submission::{
    AnswerSubmitRequest, SubmissionDetailResponse, SubmissionResponse, ViolationRequest,
};
use crate::services::{exam_timing, lifecycle};

#[derive(Debug, Deserialize)]
pub(crate) struct MySubmissionsQuery {
    #[serde(default)]
    skip: i64,
    #[serde(default = "crate::api::pagination::default_limit")]
    limit: i64,
}

pub(crate) async fn start_attempt(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(exam_id): Path<String>,
) -> Result<(StatusCode, Json<SubmissionResponse>), ApiError> {
    let exam = fetch_exam(&state, &exam_id).await?;
    if exam.status != ExamStatus::Published {
        return Err(ApiError::NotFound("Exam not found".to_string()));
    }

    // Resuming beats double-booking: an open attempt is returned as-is.
    let existing =
        repositories::submissions::find_active_by_exam_and_candidate(state.db(), &exam.id, &user.id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to check active submissions"))?;
    if let Some(submission) = existing {
        return Ok((StatusCode::OK, Json(SubmissionResponse::from_db(submission))));
    }

    let now = primitive_now_utc();
    let expires_at = exam_timing::compute_attempt_expiry(&exam.modules.0, now);

    let submission = Submission {
        id: Uuid::new_v4().to_string(),
        exam_id: exam.id.clone(),
        candidate_id: user.id.clone(),
        status: SubmissionStatus::InProgress,
        progress: SqlxJson(Default::default()),
        timing: SqlxJson(Default::default()),
        answers: SqlxJson(Default::default()),
        scores: SqlxJson(Default::default()),
        integrity: SqlxJson(Default::default()),
        grading: SqlxJson(Default::default()),
        started_at: now,
        expires_at,
        completed_at: None,
        graded_at: None,
        cancelled_at: None,
        created_at: now,
        updated_at: now,
    };

    repositories::submissions::create(state.db(), &submission)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to create submission"))?;

    tracing::info!(submission_id = %submission.id, exam_id = %exam.id, "Attempt started");

    Ok((StatusCode::CREATED, Json(SubmissionResponse::from_db(submission))))
}

pub(crate) async fn my_submissions(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Query(query): Query<MySubmissionsQuery>,
) -> Result<Json<Vec<SubmissionResponse>>, ApiError> {
    let limit = query.limit.clamp(1, 500);
    let submissions =
        repositories::submissions::list_by_candidate(state.db(), &user.id, query.skip.max(0), limit)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to list submissions"))?;

    Ok(Json(submissions.into_iter().map(SubmissionResponse::from_db).collect()))
}

pub(crate) async fn get_submission(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(submission_id): Path<String>,
) -> Result<Json<SubmissionResponse>, ApiError> {
    let submission = fetch_owned(&state, &user.id, user.role, &submission_id).await?;
    Ok(Json(SubmissionResponse::from_db(submission)))
}

pub(crate) async fn start_module(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path((submission_id, module)): Path<(String, ExamModule)>,
) -> Result<Json<SubmissionResponse>, ApiError> {
    let mut submission = fetch_owned(&state, &user.id, user.role, &submission_id).await?;
    let exam = fetch_exam(&state, &submission.exam_id).await?;
    reject_expired(&submission)?;

    let now = primitive_now_utc();
    lifecycle::start_module(&mut submission, &exam.modules.0, module, now)?;
    persist(&state, &mut submission, now).await?;

    Ok(Json(SubmissionResponse::from_db(submission)))
}

pub(crate) async fn record_answer(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path((submission_id, module)): Path<(String, ExamModule)>,
    Json(payload): Json<AnswerSubmitRequest>,
) -> Result<StatusCode, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let exam_settings = state.settings().exam();
    let rate_key = format!("rl:answers:{submission_id}");
    let allowed = state
        .redis()
        .rate_limit(
            &rate_key,
            exam_settings.answer_save_max_per_window,
            exam_settings.answer_save_window_seconds,
        )
        .await
        .unwrap_or(true);
    if !allowed {
        return Err(ApiError::TooManyRequests("Answers are being saved too frequently"));
    }

    let mut submission = fetch_owned(&state, &user.id, user.role, &submission_id).await?;
    let exam = fetch_exam(&state, &submission.exam_id).await?;
    reject_expired(&submission)?;

    let question = repositories::questions::find_by_id(state.db(), &payload.question_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load question"))?
        .ok_or_else(|| ApiError::NotFound("Question not found".to_string()))?;

    if question.exam_id != submission.exam_id || question.module != module {
        return Err(ApiError::BadRequest(
            "Question does not belong to this exam module".to_string(),
        ));
    }

    lifecycle::validate_answer_shape(&question, &payload.answer)?;

    let now = primitive_now_utc();
    lifecycle::record_answer(
        &mut submission,
        &exam.modules.0,
        module,
        &payload.question_id,
        payload.answer,
        payload.time_spent_seconds,
    )?;
    persist(&state, &mut submission, now).await?;

    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn complete_module(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path((submission_id, module)): Path<(String, ExamModule)>,
) -> Result<Json<SubmissionResponse>, ApiError> {
    let mut submission = fetch_owned(&state, &user.id, user.role, &submission_id).await?;
    let exam = fetch_exam(&state, &submission.exam_id).await?;
    reject_expired(&submission)?;

    let now = primitive_now_utc();
    let finished = lifecycle::complete_module(&mut submission, &exam.modules.0, module, now)?;
    persist(&state, &mut submission, now).await?;

    if finished {
        tracing::info!(submission_id = %submission.id, "All modules completed");
    }

    Ok(Json(SubmissionResponse::from_db(submission)))
}

pub(crate) async fn submit(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(submission_id): Path<String>,
) -> Result<Json<SubmissionDetailResponse>, ApiError> {
    let mut submission = fetch_owned(&state, &user.id, user.role, &submission_id).await?;
    let exam = fetch_exam(&state, &submission.exam_id).await?;

    let now = primitive_now_utc();
    if !exam_timing::within_submit_grace(submission.expires_at, now) {
        return Err(ApiError::BadRequest("Attempt has expired".to_string()));
    }

    let questions = repositories::questions::list_by_exam(state.db(), &submission.exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load questions"))?;

    let events = lifecycle::finalize(&mut submission, &exam.modules.0, &questions, now)?;
    persist(&state, &mut submission, now).await?;
    apply_events(&state, &events, now).await;

    tracing::info!(submission_id = %submission.id, "Submission finalized");

    Ok(Json(SubmissionDetailResponse::from_db(submission)))
}

pub(crate) async fn report_violation(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(submission_id): Path<String>,
    Json(payload): Json<ViolationRequest>,
) -> Result<StatusCode, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let mut submission = fetch_owned(&state, &user.id, user.role, &submission_id).await?;

    let now = primitive_now_utc();
    lifecycle::record_violation(
        &mut submission,
        &payload.kind,
        payload.description,
        payload.severity,
        now,
    )?;
    persist(&state, &mut submission, now).await?;

    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn cancel(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(submission_id): Path<String>,
) -> Result<Json<SubmissionResponse>, ApiError> {
    let mut submission = fetch_owned(&state, &user.id, user.role, &submission_id).await?;

    let now = primitive_now_utc();
    lifecycle::cancel(&mut submission, now)?;
    persist(&state, &mut submission, now).await?;

    tracing::info!(submission_id = %submission.id, "Attempt cancelled");

    Ok(Json(SubmissionResponse::from_db(submission)))
}

pub(crate) async fn result(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(submission_id): Path<String>,
) -> Result<Json<SubmissionDetailResponse>, ApiError> {
    let submission = fetch_owned(&state, &user.id, user.role, &submission_id).await?;

    match submission.status {
        SubmissionStatus::Completed | SubmissionStatus::Graded => {
            Ok(Json(SubmissionDetailResponse::from_db(submission)))
        }
        _ => Err(ApiError::BadRequest("Results are not available yet".to_string())),
    }
}

/// Load a submission and confirm the caller may touch it. Non-owners get the
/// same 404 as a missing row so submission ids cannot be probed.
pub(crate) async fn fetch_owned(
    state: &AppState,
    user_id: &str,
    role: UserRole,
    submission_id: &str,
) -> Result<Submission, ApiError> {
    let submission = repositories::submissions::find_by_id(state.db(), submission_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load submission"))?
        .ok_or_else(|| ApiError::NotFound("Submission not found".to_string()))?;

    if submission.candidate_id != user_id && role != UserRole::Admin {
        return Err(ApiError::NotFound("Submission not found".to_string()));
    }

    Ok(submission)
}

fn reject_expired(submission: &Submission) -> Result<(), ApiError> {
    if exam_timing::is_expired(submission.expires_at, primitive_now_utc()) {
        return Err(ApiError::BadRequest("Attempt has expired".to_string()));
    }
    Ok(())
}

pub(crate) async fn persist(
    state: &AppState,
    submission: &mut Submission,
    now: time::PrimitiveDateTime,
) -> Result<(), ApiError> {
    submission.updated_at = now;
    repositories::submissions::save(state.db(), submission)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to save submission"))
}

/// Stats roll-ups are best-effort: the submission row is already saved, so a
/// failed counter update is logged instead of failing the request.
pub(crate) async fn apply_events(
    state: &AppState,
    events: &[lifecycle::SubmissionEvent],
    now: time::PrimitiveDateTime,
) {
    for event in events {
        if let Err(err) = repositories::exams::apply_event(state.db(), event, now).await {
            tracing::error!(error = %err, "Failed to apply submission event to exam stats");
        }
    }
}
