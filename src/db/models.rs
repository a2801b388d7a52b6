use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use time::PrimitiveDateTime;

use crate::db::types::{
    ExamModule, ExamStatus, GradingMethod, ModuleProgress, QuestionKind, SubmissionStatus,
    UserRole, ViolationKind, ViolationSeverity,
};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct User {
    pub(crate) id: String,
    pub(crate) email: String,
    pub(crate) hashed_password: String,
    pub(crate) full_name: String,
    pub(crate) role: UserRole,
    pub(crate) is_active: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Exam {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) status: ExamStatus,
    pub(crate) modules: Json<ModuleConfigMap>,
    pub(crate) is_free: bool,
    pub(crate) created_by: String,
    pub(crate) total_submissions: i64,
    pub(crate) graded_submissions: i64,
    pub(crate) band_score_sum: f64,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
    pub(crate) published_at: Option<PrimitiveDateTime>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub(crate) struct ModuleConfig {
    pub(crate) enabled: bool,
    pub(crate) duration_minutes: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ModuleConfigMap {
    pub(crate) listening: ModuleConfig,
    pub(crate) reading: ModuleConfig,
    pub(crate) writing: ModuleConfig,
    pub(crate) speaking: ModuleConfig,
}

impl ModuleConfigMap {
    pub(crate) fn get(&self, module: ExamModule) -> ModuleConfig {
        match module {
            ExamModule::Listening => self.listening,
            ExamModule::Reading => self.reading,
            ExamModule::Writing => self.writing,
            ExamModule::Speaking => self.speaking,
        }
    }

    pub(crate) fn enabled_modules(&self) -> Vec<ExamModule> {
        ExamModule::ALL.into_iter().filter(|module| self.get(*module).enabled).collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Question {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) module: ExamModule,
    pub(crate) order_index: i32,
    pub(crate) kind: QuestionKind,
    pub(crate) prompt: String,
    pub(crate) options: Json<Vec<String>>,
    pub(crate) correct_answer: Option<Json<AnswerValue>>,
    pub(crate) points: f64,
    pub(crate) created_at: PrimitiveDateTime,
}

/// A recorded answer payload. The shape is fixed per question type so
/// correctness comparison stays exhaustive instead of stringly-typed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub(crate) enum AnswerValue {
    Text(String),
    Choice(String),
    MultiChoice(Vec<String>),
    StructuredMap(BTreeMap<String, String>),
}

/// One exam attempt. Everything the lifecycle engine owns lives on this row;
/// each engine operation is a single load-mutate-save cycle against it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Submission {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) candidate_id: String,
    pub(crate) status: SubmissionStatus,
    pub(crate) progress: Json<ProgressMap>,
    pub(crate) timing: Json<TimingMap>,
    pub(crate) answers: Json<AnswerMap>,
    pub(crate) scores: Json<ScoreCard>,
    pub(crate) integrity: Json<IntegrityReport>,
    pub(crate) grading: Json<GradingInfo>,
    pub(crate) started_at: PrimitiveDateTime,
    pub(crate) expires_at: PrimitiveDateTime,
    pub(crate) completed_at: Option<PrimitiveDateTime>,
    pub(crate) graded_at: Option<PrimitiveDateTime>,
    pub(crate) cancelled_at: Option<PrimitiveDateTime>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ProgressMap {
    pub(crate) listening: ModuleProgress,
    pub(crate) reading: ModuleProgress,
    pub(crate) writing: ModuleProgress,
    pub(crate) speaking: ModuleProgress,
}

impl Default for ProgressMap {
    fn default() -> Self {
        Self {
            listening: ModuleProgress::NotStarted,
            reading: ModuleProgress::NotStarted,
            writing: ModuleProgress::NotStarted,
            speaking: ModuleProgress::NotStarted,
        }
    }
}

impl ProgressMap {
    pub(crate) fn get(&self, module: ExamModule) -> ModuleProgress {
        match module {
            ExamModule::Listening => self.listening,
            ExamModule::Reading => self.reading,
            ExamModule::Writing => self.writing,
            ExamModule::Speaking => self.speaking,
        }
    }

    pub(crate) fn set(&mut self, module: ExamModule, progress: ModuleProgress) {
        match module {
            ExamModule::Listening => self.listening = progress,
            ExamModule::Reading => self.reading = progress,
            ExamModule::Writing => self.writing = progress,
            ExamModule::Speaking => self.speaking = progress,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub(crate) struct ModuleTiming {
    pub(crate) started_at: Option<PrimitiveDateTime>,
    pub(crate) completed_at: Option<PrimitiveDateTime>,
    pub(crate) duration_seconds: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct TimingMap {
    pub(crate) listening: ModuleTiming,
    pub(crate) reading: ModuleTiming,
    pub(crate) writing: ModuleTiming,
    pub(crate) speaking: ModuleTiming,
}

impl TimingMap {
    pub(crate) fn get(&self, module: ExamModule) -> &ModuleTiming {
        match module {
            ExamModule::Listening => &self.listening,
            ExamModule::Reading => &self.reading,
            ExamModule::Writing => &self.writing,
            ExamModule::Speaking => &self.speaking,
        }
    }

    pub(crate) fn get_mut(&mut self, module: ExamModule) -> &mut ModuleTiming {
        match module {
            ExamModule::Listening => &mut self.listening,
            ExamModule::Reading => &mut self.reading,
            ExamModule::Writing => &mut self.writing,
            ExamModule::Speaking => &mut self.speaking,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct AnswerRecord {
    pub(crate) question_id: String,
    pub(crate) answer: AnswerValue,
    pub(crate) is_correct: Option<bool>,
    pub(crate) score: Option<f64>,
    pub(crate) time_spent_seconds: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct AnswerMap {
    pub(crate) listening: Vec<AnswerRecord>,
    pub(crate) reading: Vec<AnswerRecord>,
    pub(crate) writing: Vec<AnswerRecord>,
    pub(crate) speaking: Vec<AnswerRecord>,
}

impl AnswerMap {
    pub(crate) fn get(&self, module: ExamModule) -> &Vec<AnswerRecord> {
        match module {
            ExamModule::Listening => &self.listening,
            ExamModule::Reading => &self.reading,
            ExamModule::Writing => &self.writing,
            ExamModule::Speaking => &self.speaking,
        }
    }

    pub(crate) fn get_mut(&mut self, module: ExamModule) -> &mut Vec<AnswerRecord> {
        match module {
            ExamModule::Listening => &mut self.listening,
            ExamModule::Reading => &mut self.reading,
            ExamModule::Writing => &mut self.writing,
            ExamModule::Speaking => &mut self.speaking,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct ObjectiveScore {
    pub(crate) raw_score: f64,
    pub(crate) total_questions: i64,
    pub(crate) correct_answers: i64,
    pub(crate) percentage: f64,
    pub(crate) band_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct WritingScore {
    pub(crate) task1_score: Option<f64>,
    pub(crate) task2_score: Option<f64>,
    pub(crate) overall_score: f64,
    pub(crate) feedback: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct SpeakingScore {
    pub(crate) overall_score: f64,
    pub(crate) feedback: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct OverallScore {
    pub(crate) band_score: f64,
    pub(crate) total_score: f64,
    pub(crate) max_possible_score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct ScoreCard {
    pub(crate) listening: Option<ObjectiveScore>,
    pub(crate) reading: Option<ObjectiveScore>,
    pub(crate) writing: Option<WritingScore>,
    pub(crate) speaking: Option<SpeakingScore>,
    pub(crate) overall: Option<OverallScore>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct SuspiciousActivity {
    pub(crate) kind: String,
    pub(crate) description: String,
    pub(crate) occurred_at: PrimitiveDateTime,
    pub(crate) severity: ViolationSeverity,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct IntegrityReport {
    pub(crate) full_screen_exit_count: i64,
    pub(crate) tab_switch_count: i64,
    pub(crate) copy_paste_count: i64,
    pub(crate) right_click_count: i64,
    pub(crate) suspicious_activity: Vec<SuspiciousActivity>,
    pub(crate) flagged_for_review: bool,
    pub(crate) flag_reason: Option<String>,
}

impl IntegrityReport {
    pub(crate) fn counter_mut(&mut self, kind: ViolationKind) -> &mut i64 {
        match kind {
            ViolationKind::FullScreenExit => &mut self.full_screen_exit_count,
            ViolationKind::TabSwitch => &mut self.tab_switch_count,
            ViolationKind::CopyPaste => &mut self.copy_paste_count,
            ViolationKind::RightClick => &mut self.right_click_count,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct GradingInfo {
    pub(crate) graded_by: Option<String>,
    pub(crate) method: Option<GradingMethod>,
    pub(crate) notes: Option<String>,
}
