use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentAdmin;
use crate::api::pagination::PaginatedResponse;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::types::SubmissionStatus;
use crate::repositories;
use crate::schemas::submission::{
    FlagRequest, GradeRequest, SubmissionDetailResponse, SubmissionResponse,
};
use crate::services::lifecycle;

use super::candidate::{apply_events, persist};

#[derive(Debug, Deserialize)]
pub(crate) struct ListSubmissionsQuery {
    #[serde(default)]
    status: Option<SubmissionStatus>,
    #[serde(default)]
    skip: i64,
    #[serde(default = "crate::api::pagination::default_limit")]
    limit: i64,
}

pub(crate) async fn list_by_exam(
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
    Path(exam_id): Path<String>,
    Query(query): Query<ListSubmissionsQuery>,
) -> Result<Json<PaginatedResponse<SubmissionResponse>>, ApiError> {
    let limit = query.limit.clamp(1, 500);
    let skip = query.skip.max(0);

    let submissions =
        repositories::submissions::list_by_exam(state.db(), &exam_id, query.status, skip, limit)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to list submissions"))?;
    let total_count = repositories::submissions::count_by_exam(state.db(), &exam_id, query.status)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count submissions"))?;

    Ok(Json(PaginatedResponse {
        items: submissions.into_iter().map(SubmissionResponse::from_db).collect(),
        total_count,
        skip,
        limit,
    }))
}

pub(crate) async fn grade(
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Path(submission_id): Path<String>,
    Json(payload): Json<GradeRequest>,
) -> Result<Json<SubmissionDetailResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let mut submission = fetch(&state, &submission_id).await?;

    let now = primitive_now_utc();
    let events = lifecycle::transition_to_graded(
        &mut submission,
        &admin.id,
        payload.writing.map(|writing| writing.into_score()),
        payload.speaking.map(|speaking| speaking.into_score()),
        payload.notes,
        now,
    )?;
    persist(&state, &mut submission, now).await?;
    apply_events(&state, &events, now).await;

    tracing::info!(submission_id = %submission.id, graded_by = %admin.id, "Submission graded");

    Ok(Json(SubmissionDetailResponse::from_db(submission)))
}

pub(crate) async fn flag(
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Path(submission_id): Path<String>,
    Json(payload): Json<FlagRequest>,
) -> Result<Json<SubmissionDetailResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let mut submission = fetch(&state, &submission_id).await?;

    let now = primitive_now_utc();
    lifecycle::flag_for_review(&mut submission, &payload.reason);
    persist(&state, &mut submission, now).await?;

    tracing::info!(submission_id = %submission.id, flagged_by = %admin.id, "Submission flagged");

    Ok(Json(SubmissionDetailResponse::from_db(submission)))
}

async fn fetch(
    state: &AppState,
    submission_id: &str,
) -> Result<crate::db::models::Submission, ApiError> {
    repositories::submissions::find_by_id(state.db(), submission_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load submission"))?
        .ok_or_else(|| ApiError::NotFound("Submission not found".to_string()))
}
