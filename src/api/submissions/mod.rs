use axum::{
    routing::{get, post},
    Router,
};

use crate::core::state::AppState;

mod admin;
mod candidate;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/start/:exam_id", post(candidate::start_attempt))
        .route("/my", get(candidate::my_submissions))
        .route("/:submission_id", get(candidate::get_submission))
        .route("/:submission_id/modules/:module/start", post(candidate::start_module))
        .route("/:submission_id/modules/:module/answers", post(candidate::record_answer))
        .route("/:submission_id/modules/:module/complete", post(candidate::complete_module))
        .route("/:submission_id/submit", post(candidate::submit))
        .route("/:submission_id/violations", post(candidate::report_violation))
        .route("/:submission_id/cancel", post(candidate::cancel))
        .route("/:submission_id/result", get(candidate::result))
        .route("/by-exam/:exam_id", get(admin::list_by_exam))
        .route("/:submission_id/grade", post(admin::grade))
        .route("/:submission_id/flag", post(admin::flag))
}
