use thiserror::Error;
use time::PrimitiveDateTime;

use crate::db::models::{
    AnswerRecord, AnswerValue, ModuleConfigMap, Question, SpeakingScore, Submission,
    SuspiciousActivity, WritingScore,
};
use crate::db::types::{
    ExamModule, GradingMethod, ModuleProgress, QuestionKind, SubmissionStatus, ViolationKind,
    ViolationSeverity,
};
use crate::services::scoring;

/// Typed failures of the attempt state machine. Precondition violations are
/// surfaced to the caller, never silently repaired; the API layer maps them
/// to transport status codes.
#[derive(Debug, Error)]
pub(crate) enum LifecycleError {
    #[error("question {0} not found")]
    QuestionNotFound(String),
    #[error("module '{0}' is not enabled for this exam")]
    ModuleNotEnabled(&'static str),
    #[error("{0}")]
    InvalidState(String),
    #[error("cannot submit: modules not completed: {0}")]
    IncompleteExam(String),
    #[error("{0}")]
    InvalidAnswer(String),
}

/// Side effects the engine asks its caller to apply elsewhere (exam stats
/// roll-ups). The engine never mutates aggregates other than the submission.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SubmissionEvent {
    Completed { submission_id: String, exam_id: String, overall_band: Option<f64> },
    Graded { submission_id: String, exam_id: String, overall_band: Option<f64> },
}

/// Admin-supplied scores for the subjective modules.
#[derive(Debug, Clone)]
pub(crate) enum ManualScore {
    Writing(WritingScore),
    Speaking(SpeakingScore),
}

fn require_in_progress(submission: &Submission, operation: &str) -> Result<(), LifecycleError> {
    if submission.status != SubmissionStatus::InProgress {
        return Err(LifecycleError::InvalidState(format!(
            "cannot {operation}: submission is {status:?}",
            status = submission.status
        )));
    }
    Ok(())
}

fn require_enabled(config: &ModuleConfigMap, module: ExamModule) -> Result<(), LifecycleError> {
    if !config.get(module).enabled {
        return Err(LifecycleError::ModuleNotEnabled(module.as_str()));
    }
    Ok(())
}

/// Begin (or resume) a module. Stamps the module start time exactly once.
pub(crate) fn start_module(
    submission: &mut Submission,
    config: &ModuleConfigMap,
    module: ExamModule,
    now: PrimitiveDateTime,
) -> Result<(), LifecycleError> {
    require_in_progress(submission, "start module")?;
    require_enabled(config, module)?;

    match submission.progress.0.get(module) {
        ModuleProgress::Completed => Err(LifecycleError::InvalidState(format!(
            "module '{}' is already completed",
            module.as_str()
        ))),
        ModuleProgress::InProgress => Ok(()),
        ModuleProgress::NotStarted => {
            submission.progress.0.set(module, ModuleProgress::InProgress);
            let timing = submission.timing.0.get_mut(module);
            if timing.started_at.is_none() {
                timing.started_at = Some(now);
            }
            Ok(())
        }
    }
}

/// Upsert the answer for one question. Re-recording replaces the previous
/// payload in place and clears any stale grading of that entry.
pub(crate) fn record_answer(
    submission: &mut Submission,
    config: &ModuleConfigMap,
    module: ExamModule,
    question_id: &str,
    answer: AnswerValue,
    time_spent_seconds: i64,
) -> Result<(), LifecycleError> {
    require_in_progress(submission, "record answer")?;
    require_enabled(config, module)?;

    let record = AnswerRecord {
        question_id: question_id.to_string(),
        answer,
        is_correct: None,
        score: None,
        time_spent_seconds,
    };

    let entries = submission.answers.0.get_mut(module);
    match entries.iter_mut().find(|entry| entry.question_id == question_id) {
        Some(existing) => *existing = record,
        None => entries.push(record),
    }

    Ok(())
}

/// Mark a module completed, deriving its duration exactly once. Returns
/// `true` when this call completed the whole submission (the only place a
/// submission transitions to `completed` during the attempt).
pub(crate) fn complete_module(
    submission: &mut Submission,
    config: &ModuleConfigMap,
    module: ExamModule,
    now: PrimitiveDateTime,
) -> Result<bool, LifecycleError> {
    require_in_progress(submission, "complete module")?;
    require_enabled(config, module)?;

    if submission.progress.0.get(module) == ModuleProgress::Completed {
        return Ok(false);
    }

    submission.progress.0.set(module, ModuleProgress::Completed);

    let timing = submission.timing.0.get_mut(module);
    timing.completed_at = Some(now);
    // A missing start means timing capture was lost client-side; duration is
    // best-effort telemetry, so record zero instead of failing the attempt.
    timing.duration_seconds = Some(match timing.started_at {
        Some(started_at) => (now - started_at).whole_seconds().max(0),
        None => 0,
    });

    let all_completed = config
        .enabled_modules()
        .into_iter()
        .all(|enabled| submission.progress.0.get(enabled) == ModuleProgress::Completed);

    if all_completed {
        submission.status = SubmissionStatus::Completed;
        submission.completed_at = Some(now);
    }

    Ok(all_completed)
}

/// Submit-time orchestration: auto-grade the objective modules, roll up the
/// overall band, and settle the submission in `completed`.
pub(crate) fn finalize(
    submission: &mut Submission,
    config: &ModuleConfigMap,
    questions: &[Question],
    now: PrimitiveDateTime,
) -> Result<Vec<SubmissionEvent>, LifecycleError> {
    match submission.status {
        // The last complete_module call normally flips the status already;
        // finalize accepts both shapes of "candidate just finished".
        SubmissionStatus::InProgress | SubmissionStatus::Completed => {}
        other => {
            return Err(LifecycleError::InvalidState(format!(
                "cannot submit: submission is {other:?}"
            )));
        }
    }

    let incomplete: Vec<&'static str> = config
        .enabled_modules()
        .into_iter()
        .filter(|module| submission.progress.0.get(*module) != ModuleProgress::Completed)
        .map(ExamModule::as_str)
        .collect();
    if !incomplete.is_empty() {
        return Err(LifecycleError::IncompleteExam(incomplete.join(", ")));
    }

    let mut auto_graded = false;
    for module in [ExamModule::Listening, ExamModule::Reading] {
        if config.get(module).enabled && !submission.answers.0.get(module).is_empty() {
            scoring::score_objective_module(submission, module, questions)?;
            auto_graded = true;
        }
    }

    scoring::compute_overall(&mut submission.scores.0);

    if submission.status != SubmissionStatus::Completed {
        submission.status = SubmissionStatus::Completed;
    }
    if submission.completed_at.is_none() {
        submission.completed_at = Some(now);
    }
    if auto_graded {
        submission.grading.0.method = Some(GradingMethod::Auto);
    }

    Ok(vec![SubmissionEvent::Completed {
        submission_id: submission.id.clone(),
        exam_id: submission.exam_id.clone(),
        overall_band: submission.scores.0.overall.as_ref().map(|overall| overall.band_score),
    }])
}

/// Write admin-supplied scores for a subjective module. Manual grading only
/// happens after the candidate has finished.
pub(crate) fn record_manual_score(
    submission: &mut Submission,
    score: ManualScore,
) -> Result<(), LifecycleError> {
    match submission.status {
        SubmissionStatus::Completed | SubmissionStatus::Graded => {}
        other => {
            return Err(LifecycleError::InvalidState(format!(
                "cannot record manual score: submission is {other:?}"
            )));
        }
    }

    match score {
        ManualScore::Writing(writing) => submission.scores.0.writing = Some(writing),
        ManualScore::Speaking(speaking) => submission.scores.0.speaking = Some(speaking),
    }

    Ok(())
}

/// Merge manual grades, recompute the overall band, and advance to `graded`.
pub(crate) fn transition_to_graded(
    submission: &mut Submission,
    grader_id: &str,
    writing: Option<WritingScore>,
    speaking: Option<SpeakingScore>,
    notes: Option<String>,
    now: PrimitiveDateTime,
) -> Result<Vec<SubmissionEvent>, LifecycleError> {
    if submission.status != SubmissionStatus::Completed {
        return Err(LifecycleError::InvalidState(format!(
            "cannot grade: submission is {status:?}",
            status = submission.status
        )));
    }

    if let Some(writing) = writing {
        record_manual_score(submission, ManualScore::Writing(writing))?;
    }
    if let Some(speaking) = speaking {
        record_manual_score(submission, ManualScore::Speaking(speaking))?;
    }

    scoring::compute_overall(&mut submission.scores.0);

    let grading = &mut submission.grading.0;
    grading.graded_by = Some(grader_id.to_string());
    grading.method = Some(match grading.method {
        Some(GradingMethod::Auto) | Some(GradingMethod::Hybrid) => GradingMethod::Hybrid,
        _ => GradingMethod::Manual,
    });
    if notes.is_some() {
        grading.notes = notes;
    }

    submission.status = SubmissionStatus::Graded;
    submission.graded_at = Some(now);

    Ok(vec![SubmissionEvent::Graded {
        submission_id: submission.id.clone(),
        exam_id: submission.exam_id.clone(),
        overall_band: submission.scores.0.overall.as_ref().map(|overall| overall.band_score),
    }])
}

/// Log a proctoring violation. Unrecognized kinds are kept in the activity
/// log without a counter so a client-side typo never loses the signal.
pub(crate) fn record_violation(
    submission: &mut Submission,
    kind_raw: &str,
    description: String,
    severity: ViolationSeverity,
    now: PrimitiveDateTime,
) -> Result<(), LifecycleError> {
    match submission.status {
        SubmissionStatus::InProgress | SubmissionStatus::Completed => {}
        other => {
            return Err(LifecycleError::InvalidState(format!(
                "cannot record violation: submission is {other:?}"
            )));
        }
    }

    let integrity = &mut submission.integrity.0;
    integrity.suspicious_activity.push(SuspiciousActivity {
        kind: kind_raw.to_string(),
        description,
        occurred_at: now,
        severity,
    });

    if let Some(kind) = ViolationKind::parse(kind_raw) {
        *integrity.counter_mut(kind) += 1;
    }

    Ok(())
}

/// Mark the attempt for human review. Idempotent; never touches `status`.
pub(crate) fn flag_for_review(submission: &mut Submission, reason: &str) {
    let integrity = &mut submission.integrity.0;
    integrity.flagged_for_review = true;
    integrity.flag_reason = Some(reason.to_string());
}

/// Terminal escape hatch out of an in-progress attempt.
pub(crate) fn cancel(
    submission: &mut Submission,
    now: PrimitiveDateTime,
) -> Result<(), LifecycleError> {
    require_in_progress(submission, "cancel")?;
    submission.status = SubmissionStatus::Cancelled;
    submission.cancelled_at = Some(now);
    Ok(())
}

/// Reject payloads whose shape does not fit the question's declared type
/// before they reach the answer list.
pub(crate) fn validate_answer_shape(
    question: &Question,
    answer: &AnswerValue,
) -> Result<(), LifecycleError> {
    match question.kind {
        QuestionKind::Subjective => match answer {
            AnswerValue::Text(_) => Ok(()),
            _ => Err(LifecycleError::InvalidAnswer(format!(
                "question {} expects a text answer",
                question.id
            ))),
        },
        QuestionKind::Objective => match &question.correct_answer {
            Some(correct) if std::mem::discriminant(&correct.0) != std::mem::discriminant(answer) => {
                Err(LifecycleError::InvalidAnswer(format!(
                    "answer payload does not match the declared type of question {}",
                    question.id
                )))
            }
            _ => Ok(()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{
        AnswerMap, GradingInfo, IntegrityReport, ModuleConfig, ProgressMap, ScoreCard, TimingMap,
    };
    use sqlx::types::Json;
    use time::macros::datetime;
    use time::Duration;

    fn full_config() -> ModuleConfigMap {
        let on = ModuleConfig { enabled: true, duration_minutes: 60 };
        ModuleConfigMap { listening: on, reading: on, writing: on, speaking: on }
    }

    fn objective_config() -> ModuleConfigMap {
        let on = ModuleConfig { enabled: true, duration_minutes: 60 };
        let off = ModuleConfig { enabled: false, duration_minutes: 0 };
        ModuleConfigMap { listening: on, reading: on, writing: off, speaking: off }
    }

    fn t0() -> PrimitiveDateTime {
        datetime!(2026-03-01 09:00:00)
    }

    fn make_submission() -> Submission {
        Submission {
            id: "sub-1".to_string(),
            exam_id: "exam-1".to_string(),
            candidate_id: "cand-1".to_string(),
            status: SubmissionStatus::InProgress,
            progress: Json(ProgressMap::default()),
            timing: Json(TimingMap::default()),
            answers: Json(AnswerMap::default()),
            scores: Json(ScoreCard::default()),
            integrity: Json(IntegrityReport::default()),
            grading: Json(GradingInfo::default()),
            started_at: t0(),
            expires_at: t0() + Duration::hours(3),
            completed_at: None,
            graded_at: None,
            cancelled_at: None,
            created_at: t0(),
            updated_at: t0(),
        }
    }

    fn listening_question(id: &str, correct: &str) -> Question {
        Question {
            id: id.to_string(),
            exam_id: "exam-1".to_string(),
            module: ExamModule::Listening,
            order_index: 0,
            kind: QuestionKind::Objective,
            prompt: "prompt".to_string(),
            options: Json(vec![]),
            correct_answer: Some(Json(AnswerValue::Text(correct.to_string()))),
            points: 1.0,
            created_at: t0(),
        }
    }

    fn complete_all(submission: &mut Submission, config: &ModuleConfigMap) {
        for module in config.enabled_modules() {
            start_module(submission, config, module, t0()).expect("start");
            complete_module(submission, config, module, t0() + Duration::minutes(30))
                .expect("complete");
        }
    }

    #[test]
    fn start_module_stamps_start_time_once() {
        let config = full_config();
        let mut submission = make_submission();

        start_module(&mut submission, &config, ExamModule::Listening, t0()).expect("start");
        assert_eq!(submission.progress.0.listening, ModuleProgress::InProgress);
        assert_eq!(submission.timing.0.listening.started_at, Some(t0()));

        // Resuming is a no-op and keeps the original start.
        start_module(&mut submission, &config, ExamModule::Listening, t0() + Duration::minutes(5))
            .expect("resume");
        assert_eq!(submission.timing.0.listening.started_at, Some(t0()));
    }

    #[test]
    fn start_module_rejects_disabled_module() {
        let config = objective_config();
        let mut submission = make_submission();

        let err = start_module(&mut submission, &config, ExamModule::Writing, t0()).unwrap_err();
        assert!(matches!(err, LifecycleError::ModuleNotEnabled("writing")));
    }

    #[test]
    fn start_module_rejects_cancelled_submission() {
        let config = full_config();
        let mut submission = make_submission();
        cancel(&mut submission, t0()).expect("cancel");

        let err = start_module(&mut submission, &config, ExamModule::Listening, t0()).unwrap_err();
        assert!(matches!(err, LifecycleError::InvalidState(_)));
    }

    #[test]
    fn complete_module_derives_duration_once() {
        let config = full_config();
        let mut submission = make_submission();

        start_module(&mut submission, &config, ExamModule::Reading, t0()).expect("start");
        complete_module(&mut submission, &config, ExamModule::Reading, t0() + Duration::minutes(42))
            .expect("complete");

        let timing = submission.timing.0.reading;
        assert_eq!(timing.duration_seconds, Some(42 * 60));
        assert_eq!(timing.completed_at, Some(t0() + Duration::minutes(42)));
    }

    #[test]
    fn complete_module_is_idempotent() {
        let config = full_config();
        let mut submission = make_submission();

        start_module(&mut submission, &config, ExamModule::Reading, t0()).expect("start");
        complete_module(&mut submission, &config, ExamModule::Reading, t0() + Duration::minutes(10))
            .expect("complete");
        let timing_before = submission.timing.0.reading;

        complete_module(&mut submission, &config, ExamModule::Reading, t0() + Duration::minutes(55))
            .expect("repeat");

        assert_eq!(submission.progress.0.reading, ModuleProgress::Completed);
        assert_eq!(submission.timing.0.reading.completed_at, timing_before.completed_at);
        assert_eq!(submission.timing.0.reading.duration_seconds, timing_before.duration_seconds);
    }

    #[test]
    fn missing_start_time_yields_zero_duration() {
        let config = full_config();
        let mut submission = make_submission();

        // Completed without ever being started: timing is telemetry, not a
        // correctness gate.
        complete_module(&mut submission, &config, ExamModule::Speaking, t0()).expect("complete");
        assert_eq!(submission.timing.0.speaking.duration_seconds, Some(0));
    }

    #[test]
    fn completing_last_module_completes_submission() {
        let config = objective_config();
        let mut submission = make_submission();

        start_module(&mut submission, &config, ExamModule::Listening, t0()).expect("start");
        let finished =
            complete_module(&mut submission, &config, ExamModule::Listening, t0()).expect("l");
        assert!(!finished);
        assert_eq!(submission.status, SubmissionStatus::InProgress);

        start_module(&mut submission, &config, ExamModule::Reading, t0()).expect("start");
        let finished =
            complete_module(&mut submission, &config, ExamModule::Reading, t0()).expect("r");
        assert!(finished);
        assert_eq!(submission.status, SubmissionStatus::Completed);
        assert!(submission.completed_at.is_some());

        // Invariant: completed implies every enabled module is completed.
        for module in config.enabled_modules() {
            assert_eq!(submission.progress.0.get(module), ModuleProgress::Completed);
        }
    }

    #[test]
    fn record_answer_overwrites_same_question() {
        let config = full_config();
        let mut submission = make_submission();

        record_answer(
            &mut submission,
            &config,
            ExamModule::Listening,
            "q1",
            AnswerValue::Text("first".to_string()),
            12,
        )
        .expect("record");
        record_answer(
            &mut submission,
            &config,
            ExamModule::Listening,
            "q1",
            AnswerValue::Text("second".to_string()),
            20,
        )
        .expect("overwrite");

        let entries = submission.answers.0.get(ExamModule::Listening);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].answer, AnswerValue::Text("second".to_string()));
        assert_eq!(entries[0].time_spent_seconds, 20);
    }

    #[test]
    fn record_answer_rejects_completed_submission() {
        let config = objective_config();
        let mut submission = make_submission();
        complete_all(&mut submission, &config);

        let err = record_answer(
            &mut submission,
            &config,
            ExamModule::Listening,
            "q1",
            AnswerValue::Text("late".to_string()),
            5,
        )
        .unwrap_err();
        assert!(matches!(err, LifecycleError::InvalidState(_)));
    }

    #[test]
    fn finalize_rejects_incomplete_modules() {
        let config = objective_config();
        let mut submission = make_submission();

        start_module(&mut submission, &config, ExamModule::Listening, t0()).expect("start");
        complete_module(&mut submission, &config, ExamModule::Listening, t0()).expect("complete");
        start_module(&mut submission, &config, ExamModule::Reading, t0()).expect("start");

        let err = finalize(&mut submission, &config, &[], t0()).unwrap_err();
        assert!(matches!(err, LifecycleError::IncompleteExam(ref modules) if modules == "reading"));
        assert_eq!(submission.status, SubmissionStatus::InProgress);
    }

    #[test]
    fn finalize_scores_listening_scenario() {
        let config = objective_config();
        let mut submission = make_submission();

        let questions: Vec<Question> =
            (1..=10).map(|i| listening_question(&format!("q{i}"), &format!("answer-{i}"))).collect();

        start_module(&mut submission, &config, ExamModule::Listening, t0()).expect("start");
        for (index, question) in questions.iter().enumerate() {
            // First seven correct, last three wrong.
            let payload = if index < 7 {
                AnswerValue::Text(format!("answer-{}", index + 1))
            } else {
                AnswerValue::Text("wrong".to_string())
            };
            record_answer(&mut submission, &config, ExamModule::Listening, &question.id, payload, 30)
                .expect("record");
        }
        complete_all(&mut submission, &config);

        let events = finalize(&mut submission, &config, &questions, t0()).expect("finalize");

        let listening = submission.scores.0.listening.clone().expect("listening score");
        assert_eq!(listening.raw_score, 7.0);
        assert_eq!(listening.total_questions, 10);
        assert_eq!(listening.correct_answers, 7);
        assert_eq!(listening.percentage, 70.0);
        assert_eq!(listening.band_score, 7.0);

        assert_eq!(submission.status, SubmissionStatus::Completed);
        assert_eq!(submission.grading.0.method, Some(GradingMethod::Auto));
        assert_eq!(
            events,
            vec![SubmissionEvent::Completed {
                submission_id: "sub-1".to_string(),
                exam_id: "exam-1".to_string(),
                overall_band: Some(7.0),
            }]
        );
    }

    #[test]
    fn finalize_fails_on_unknown_question_reference() {
        let config = objective_config();
        let mut submission = make_submission();

        start_module(&mut submission, &config, ExamModule::Listening, t0()).expect("start");
        record_answer(
            &mut submission,
            &config,
            ExamModule::Listening,
            "ghost",
            AnswerValue::Text("x".to_string()),
            5,
        )
        .expect("record");
        complete_all(&mut submission, &config);

        let err = finalize(&mut submission, &config, &[], t0()).unwrap_err();
        assert!(matches!(err, LifecycleError::QuestionNotFound(ref id) if id == "ghost"));
    }

    #[test]
    fn graded_transition_merges_manual_scores() {
        let config = full_config();
        let mut submission = make_submission();
        complete_all(&mut submission, &config);
        assert_eq!(submission.status, SubmissionStatus::Completed);

        let events = transition_to_graded(
            &mut submission,
            "admin-1",
            Some(WritingScore {
                task1_score: Some(6.5),
                task2_score: Some(7.5),
                overall_score: 7.0,
                feedback: Some("solid structure".to_string()),
            }),
            Some(SpeakingScore { overall_score: 7.5, feedback: None }),
            Some("reviewed in full".to_string()),
            t0() + Duration::hours(4),
        )
        .expect("grade");

        assert_eq!(submission.status, SubmissionStatus::Graded);
        assert_eq!(submission.grading.0.graded_by.as_deref(), Some("admin-1"));
        assert_eq!(submission.grading.0.method, Some(GradingMethod::Manual));
        assert_eq!(submission.scores.0.overall.clone().expect("overall").band_score, 7.5);
        assert!(matches!(events[0], SubmissionEvent::Graded { .. }));
    }

    #[test]
    fn grading_after_auto_scoring_is_hybrid() {
        let config = objective_config();
        let mut submission = make_submission();
        let questions = vec![listening_question("q1", "yes")];

        start_module(&mut submission, &config, ExamModule::Listening, t0()).expect("start");
        record_answer(
            &mut submission,
            &config,
            ExamModule::Listening,
            "q1",
            AnswerValue::Text("yes".to_string()),
            10,
        )
        .expect("record");
        complete_all(&mut submission, &config);
        finalize(&mut submission, &config, &questions, t0()).expect("finalize");

        transition_to_graded(&mut submission, "admin-1", None, None, None, t0())
            .expect("grade");
        assert_eq!(submission.grading.0.method, Some(GradingMethod::Hybrid));
    }

    #[test]
    fn no_backward_transitions() {
        let config = objective_config();
        let mut submission = make_submission();
        complete_all(&mut submission, &config);
        transition_to_graded(&mut submission, "admin-1", None, None, None, t0()).expect("grade");

        // Graded is final: neither grading again nor cancelling goes back.
        assert!(matches!(
            transition_to_graded(&mut submission, "admin-2", None, None, None, t0()),
            Err(LifecycleError::InvalidState(_))
        ));
        assert!(matches!(cancel(&mut submission, t0()), Err(LifecycleError::InvalidState(_))));
        assert_eq!(submission.status, SubmissionStatus::Graded);
    }

    #[test]
    fn manual_score_rejected_while_in_progress() {
        let mut submission = make_submission();
        let err = record_manual_score(
            &mut submission,
            ManualScore::Speaking(SpeakingScore { overall_score: 6.0, feedback: None }),
        )
        .unwrap_err();
        assert!(matches!(err, LifecycleError::InvalidState(_)));
    }

    #[test]
    fn violations_increment_matching_counter() {
        let mut submission = make_submission();

        record_violation(
            &mut submission,
            "tab_switch",
            "switched tab".to_string(),
            ViolationSeverity::Low,
            t0(),
        )
        .expect("violation");
        record_violation(
            &mut submission,
            "tab_switch",
            "switched tab".to_string(),
            ViolationSeverity::Low,
            t0() + Duration::seconds(30),
        )
        .expect("violation");

        assert_eq!(submission.integrity.0.tab_switch_count, 2);
        assert_eq!(submission.integrity.0.suspicious_activity.len(), 2);
    }

    #[test]
    fn unknown_violation_kind_is_logged_without_counter() {
        let mut submission = make_submission();

        record_violation(
            &mut submission,
            "teleportation",
            "client sent a kind we do not track".to_string(),
            ViolationSeverity::Medium,
            t0(),
        )
        .expect("violation");

        let integrity = &submission.integrity.0;
        assert_eq!(integrity.suspicious_activity.len(), 1);
        assert_eq!(integrity.full_screen_exit_count, 0);
        assert_eq!(integrity.tab_switch_count, 0);
        assert_eq!(integrity.copy_paste_count, 0);
        assert_eq!(integrity.right_click_count, 0);
    }

    #[test]
    fn violations_rejected_after_grading() {
        let config = objective_config();
        let mut submission = make_submission();
        complete_all(&mut submission, &config);
        transition_to_graded(&mut submission, "admin-1", None, None, None, t0()).expect("grade");

        let err = record_violation(
            &mut submission,
            "copy_paste",
            "paste".to_string(),
            ViolationSeverity::High,
            t0(),
        )
        .unwrap_err();
        assert!(matches!(err, LifecycleError::InvalidState(_)));
    }

    #[test]
    fn flag_for_review_is_idempotent_and_status_neutral() {
        let mut submission = make_submission();

        flag_for_review(&mut submission, "too many tab switches");
        flag_for_review(&mut submission, "too many tab switches");

        assert!(submission.integrity.0.flagged_for_review);
        assert_eq!(
            submission.integrity.0.flag_reason.as_deref(),
            Some("too many tab switches")
        );
        assert_eq!(submission.status, SubmissionStatus::InProgress);
    }

    #[test]
    fn cancel_is_terminal() {
        let mut submission = make_submission();
        cancel(&mut submission, t0()).expect("cancel");
        assert_eq!(submission.status, SubmissionStatus::Cancelled);
        assert!(submission.cancelled_at.is_some());

        assert!(matches!(cancel(&mut submission, t0()), Err(LifecycleError::InvalidState(_))));
    }

    #[test]
    fn answer_shape_validation_matches_declared_type() {
        let question = listening_question("q1", "yes");

        validate_answer_shape(&question, &AnswerValue::Text("no".to_string())).expect("text ok");
        let err = validate_answer_shape(
            &question,
            &AnswerValue::MultiChoice(vec!["a".to_string()]),
        )
        .unwrap_err();
        assert!(matches!(err, LifecycleError::InvalidAnswer(_)));

        let essay = Question {
            kind: QuestionKind::Subjective,
            correct_answer: None,
            module: ExamModule::Writing,
            ..listening_question("w1", "")
        };
        validate_answer_shape(&essay, &AnswerValue::Text("essay body".to_string()))
            .expect("essay ok");
        assert!(matches!(
            validate_answer_shape(&essay, &AnswerValue::Choice("a".to_string())),
            Err(LifecycleError::InvalidAnswer(_))
        ));
    }

    #[test]
    fn multi_choice_answers_compare_element_wise() {
        let config = objective_config();
        let mut submission = make_submission();
        let mut question = listening_question("q1", "");
        question.correct_answer =
            Some(Json(AnswerValue::MultiChoice(vec!["a".to_string(), "b".to_string()])));
        let questions = vec![question];

        start_module(&mut submission, &config, ExamModule::Listening, t0()).expect("start");
        // Order matters for exact-match semantics.
        record_answer(
            &mut submission,
            &config,
            ExamModule::Listening,
            "q1",
            AnswerValue::MultiChoice(vec!["b".to_string(), "a".to_string()]),
            15,
        )
        .expect("record");
        complete_all(&mut submission, &config);
        finalize(&mut submission, &config, &questions, t0()).expect("finalize");

        let listening = submission.scores.0.listening.clone().expect("score");
        assert_eq!(listening.correct_answers, 0);
        assert_eq!(submission.answers.0.listening[0].is_correct, Some(false));
    }
}
