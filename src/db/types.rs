use serde::{Deserialize, Serialize};
use sqlx::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "userrole", rename_all = "lowercase")]
pub(crate) enum UserRole {
    Candidate,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "examstatus", rename_all = "lowercase")]
pub(crate) enum ExamStatus {
    Draft,
    Published,
    Archived,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "submissionstatus", rename_all = "snake_case")]
pub(crate) enum SubmissionStatus {
    InProgress,
    Completed,
    Graded,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum ModuleProgress {
    NotStarted,
    InProgress,
    Completed,
}

/// The four IELTS skill areas. Listening and reading are machine-checkable;
/// writing and speaking are graded by a human.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "exammodule", rename_all = "lowercase")]
pub(crate) enum ExamModule {
    Listening,
    Reading,
    Writing,
    Speaking,
}

impl ExamModule {
    pub(crate) const ALL: [ExamModule; 4] =
        [ExamModule::Listening, ExamModule::Reading, ExamModule::Writing, ExamModule::Speaking];

    pub(crate) fn is_objective(self) -> bool {
        matches!(self, ExamModule::Listening | ExamModule::Reading)
    }

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            ExamModule::Listening => "listening",
            ExamModule::Reading => "reading",
            ExamModule::Writing => "writing",
            ExamModule::Speaking => "speaking",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "questionkind", rename_all = "lowercase")]
pub(crate) enum QuestionKind {
    Objective,
    Subjective,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum GradingMethod {
    Auto,
    Manual,
    Hybrid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum ViolationSeverity {
    Low,
    Medium,
    High,
}

/// Proctoring violation kinds that carry a dedicated counter. Unknown kinds
/// coming from the client are still logged, just not counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum ViolationKind {
    FullScreenExit,
    TabSwitch,
    CopyPaste,
    RightClick,
}

impl ViolationKind {
    pub(crate) fn parse(raw: &str) -> Option<Self> {
        match raw {
            "full_screen_exit" => Some(ViolationKind::FullScreenExit),
            "tab_switch" => Some(ViolationKind::TabSwitch),
            "copy_paste" => Some(ViolationKind::CopyPaste),
            "right_click" => Some(ViolationKind::RightClick),
            _ => None,
        }
    }
}
