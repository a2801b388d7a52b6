use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::{
    AnswerMap, AnswerValue, GradingInfo, IntegrityReport, ProgressMap, ScoreCard, SpeakingScore,
    Submission, TimingMap, WritingScore,
};
use crate::db::types::{SubmissionStatus, ViolationSeverity};

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct AnswerSubmitRequest {
    #[serde(alias = "questionId")]
    #[validate(length(min = 1, message = "question_id must not be empty"))]
    pub(crate) question_id: String,
    pub(crate) answer: AnswerValue,
    #[serde(default)]
    #[serde(alias = "timeSpentSeconds")]
    #[validate(range(min = 0, message = "time_spent_seconds must be non-negative"))]
    pub(crate) time_spent_seconds: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ViolationRequest {
    #[validate(length(min = 1, max = 64, message = "kind must be 1-64 characters"))]
    pub(crate) kind: String,
    #[validate(length(min = 1, max = 500, message = "description must be 1-500 characters"))]
    pub(crate) description: String,
    pub(crate) severity: ViolationSeverity,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct WritingScoreRequest {
    #[serde(default)]
    #[serde(alias = "task1Score")]
    #[validate(range(min = 0.0, max = 9.0, message = "task1_score must be within 0-9"))]
    pub(crate) task1_score: Option<f64>,
    #[serde(default)]
    #[serde(alias = "task2Score")]
    #[validate(range(min = 0.0, max = 9.0, message = "task2_score must be within 0-9"))]
    pub(crate) task2_score: Option<f64>,
    #[serde(alias = "overallScore")]
    #[validate(range(min = 0.0, max = 9.0, message = "overall_score must be within 0-9"))]
    pub(crate) overall_score: f64,
    #[serde(default)]
    pub(crate) feedback: Option<String>,
}

impl WritingScoreRequest {
    pub(crate) fn into_score(self) -> WritingScore {
        WritingScore {
            task1_score: self.task1_score,
            task2_score: self.task2_score,
            overall_score: self.overall_score,
            feedback: self.feedback,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct SpeakingScoreRequest {
    #[serde(alias = "overallScore")]
    #[validate(range(min = 0.0, max = 9.0, message = "overall_score must be within 0-9"))]
    pub(crate) overall_score: f64,
    #[serde(default)]
    pub(crate) feedback: Option<String>,
}

impl SpeakingScoreRequest {
    pub(crate) fn into_score(self) -> SpeakingScore {
        SpeakingScore { overall_score: self.overall_score, feedback: self.feedback }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct GradeRequest {
    #[serde(default)]
    #[validate(nested)]
    pub(crate) writing: Option<WritingScoreRequest>,
    #[serde(default)]
    #[validate(nested)]
    pub(crate) speaking: Option<SpeakingScoreRequest>,
    #[serde(default)]
    #[validate(length(max = 2000, message = "notes must be at most 2000 characters"))]
    pub(crate) notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct FlagRequest {
    #[validate(length(min = 1, max = 500, message = "reason must be 1-500 characters"))]
    pub(crate) reason: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmissionResponse {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) candidate_id: String,
    pub(crate) status: SubmissionStatus,
    pub(crate) progress: ProgressMap,
    pub(crate) timing: TimingMap,
    pub(crate) started_at: String,
    pub(crate) expires_at: String,
    pub(crate) completed_at: Option<String>,
    pub(crate) graded_at: Option<String>,
    pub(crate) cancelled_at: Option<String>,
}

impl SubmissionResponse {
    pub(crate) fn from_db(submission: Submission) -> Self {
        Self {
            id: submission.id,
            exam_id: submission.exam_id,
            candidate_id: submission.candidate_id,
            status: submission.status,
            progress: submission.progress.0,
            timing: submission.timing.0,
            started_at: format_primitive(submission.started_at),
            expires_at: format_primitive(submission.expires_at),
            completed_at: submission.completed_at.map(format_primitive),
            graded_at: submission.graded_at.map(format_primitive),
            cancelled_at: submission.cancelled_at.map(format_primitive),
        }
    }
}

/// Full attempt detail, answers and scores included. Served to the owning
/// candidate after grading and to admins at any point.
#[derive(Debug, Serialize)]
pub(crate) struct SubmissionDetailResponse {
    #[serde(flatten)]
    pub(crate) submission: SubmissionResponse,
    pub(crate) answers: AnswerMap,
    pub(crate) scores: ScoreCard,
    pub(crate) integrity: IntegrityReport,
    pub(crate) grading: GradingInfo,
}

impl SubmissionDetailResponse {
    pub(crate) fn from_db(submission: Submission) -> Self {
        let answers = submission.answers.0.clone();
        let scores = submission.scores.0.clone();
        let integrity = submission.integrity.0.clone();
        let grading = submission.grading.0.clone();
        Self {
            submission: SubmissionResponse::from_db(submission),
            answers,
            scores,
            integrity,
            grading,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmissionListResponse {
    pub(crate) items: Vec<SubmissionResponse>,
    pub(crate) total: i64,
}
