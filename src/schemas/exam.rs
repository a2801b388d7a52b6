use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::{AnswerValue, Exam, ModuleConfig, ModuleConfigMap, Question};
use crate::db::types::{ExamModule, ExamStatus, QuestionKind};

#[derive(Debug, Clone, Copy, Deserialize)]
pub(crate) struct ModuleConfigDto {
    #[serde(default)]
    pub(crate) enabled: bool,
    #[serde(default)]
    #[serde(alias = "durationMinutes")]
    pub(crate) duration_minutes: i32,
}

impl ModuleConfigDto {
    fn into_config(self) -> ModuleConfig {
        ModuleConfig { enabled: self.enabled, duration_minutes: self.duration_minutes }
    }
}

impl Default for ModuleConfigDto {
    fn default() -> Self {
        Self { enabled: false, duration_minutes: 0 }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ExamCreate {
    #[validate(length(min = 1, max = 200, message = "title must be 1-200 characters"))]
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(default)]
    pub(crate) listening: ModuleConfigDto,
    #[serde(default)]
    pub(crate) reading: ModuleConfigDto,
    #[serde(default)]
    pub(crate) writing: ModuleConfigDto,
    #[serde(default)]
    pub(crate) speaking: ModuleConfigDto,
    #[serde(default)]
    #[serde(alias = "isFree")]
    pub(crate) is_free: bool,
}

impl ExamCreate {
    pub(crate) fn module_config(&self) -> ModuleConfigMap {
        ModuleConfigMap {
            listening: self.listening.into_config(),
            reading: self.reading.into_config(),
            writing: self.writing.into_config(),
            speaking: self.speaking.into_config(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub(crate) struct QuestionCreate {
    pub(crate) module: ExamModule,
    #[serde(alias = "orderIndex")]
    pub(crate) order_index: i32,
    pub(crate) kind: QuestionKind,
    #[validate(length(min = 1, message = "prompt must not be empty"))]
    pub(crate) prompt: String,
    #[serde(default)]
    pub(crate) options: Vec<String>,
    #[serde(default)]
    #[serde(alias = "correctAnswer")]
    pub(crate) correct_answer: Option<AnswerValue>,
    #[validate(range(min = 0.0, message = "points must be non-negative"))]
    pub(crate) points: f64,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct QuestionBulkCreate {
    #[validate(length(min = 1, message = "at least one question is required"), nested)]
    pub(crate) questions: Vec<QuestionCreate>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ExamResponse {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) status: ExamStatus,
    pub(crate) modules: ModuleConfigMap,
    pub(crate) is_free: bool,
    pub(crate) created_at: String,
    pub(crate) published_at: Option<String>,
}

impl ExamResponse {
    pub(crate) fn from_db(exam: Exam) -> Self {
        Self {
            id: exam.id,
            title: exam.title,
            description: exam.description,
            status: exam.status,
            modules: exam.modules.0,
            is_free: exam.is_free,
            created_at: format_primitive(exam.created_at),
            published_at: exam.published_at.map(format_primitive),
        }
    }
}

/// Question payload as seen by a candidate taking the exam. The answer key
/// never leaves the server through this shape.
#[derive(Debug, Serialize)]
pub(crate) struct QuestionResponse {
    pub(crate) id: String,
    pub(crate) module: ExamModule,
    pub(crate) order_index: i32,
    pub(crate) kind: QuestionKind,
    pub(crate) prompt: String,
    pub(crate) options: Vec<String>,
    pub(crate) points: f64,
}

impl QuestionResponse {
    pub(crate) fn from_db(question: Question) -> Self {
        Self {
            id: question.id,
            module: question.module,
            order_index: question.order_index,
            kind: question.kind,
            prompt: question.prompt,
            options: question.options.0,
            points: question.points,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ExamStatsResponse {
    pub(crate) exam_id: String,
    pub(crate) total_submissions: i64,
    pub(crate) graded_submissions: i64,
    pub(crate) average_band_score: Option<f64>,
}

impl ExamStatsResponse {
    pub(crate) fn from_db(exam: &Exam) -> Self {
        let average_band_score = (exam.graded_submissions > 0)
            .then(|| exam.band_score_sum / exam.graded_submissions as f64);
        Self {
            exam_id: exam.id.clone(),
            total_submissions: exam.total_submissions,
            graded_submissions: exam.graded_submissions,
            average_band_score,
        }
    }
}
