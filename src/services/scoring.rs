use std::collections::HashMap;

use crate::db::models::{ObjectiveScore, OverallScore, Question, ScoreCard, Submission};
use crate::db::types::ExamModule;
use crate::services::lifecycle::LifecycleError;

/// Percentage lower bound to band score, evaluated top-down, first match
/// wins. This is grading policy, not a computed curve; the steps must not
/// be "simplified" into arithmetic.
const BAND_TABLE: &[(f64, f64)] = &[
    (90.0, 9.0),
    (85.0, 8.5),
    (80.0, 8.0),
    (75.0, 7.5),
    (70.0, 7.0),
    (65.0, 6.5),
    (60.0, 6.0),
    (55.0, 5.5),
    (50.0, 5.0),
    (45.0, 4.5),
    (40.0, 4.0),
    (35.0, 3.5),
    (30.0, 3.0),
    (25.0, 2.5),
    (20.0, 2.0),
];

pub(crate) fn band_for_percentage(percentage: f64) -> f64 {
    for (lower_bound, band) in BAND_TABLE {
        if percentage >= *lower_bound {
            return *band;
        }
    }
    1.0
}

/// Round to the nearest 0.5 band, half up. Inputs are non-negative, so
/// `f64::round` (half away from zero) gives half-up behavior.
pub(crate) fn round_to_half_band(value: f64) -> f64 {
    (value * 2.0).round() / 2.0
}

/// Grade every recorded answer of an objective module against the question
/// bank and write the module aggregate into the score card.
pub(crate) fn score_objective_module(
    submission: &mut Submission,
    module: ExamModule,
    questions: &[Question],
) -> Result<(), LifecycleError> {
    if !module.is_objective() {
        return Err(LifecycleError::InvalidState(format!(
            "module '{}' is not auto-gradable",
            module.as_str()
        )));
    }

    let bank: HashMap<&str, &Question> = questions
        .iter()
        .filter(|question| question.module == module)
        .map(|question| (question.id.as_str(), question))
        .collect();

    let mut raw_score = 0.0;
    let mut total_questions = 0i64;
    let mut correct_answers = 0i64;

    for record in submission.answers.0.get_mut(module) {
        let question = bank
            .get(record.question_id.as_str())
            .ok_or_else(|| LifecycleError::QuestionNotFound(record.question_id.clone()))?;

        let is_correct = match &question.correct_answer {
            Some(correct) => record.answer == correct.0,
            None => false,
        };

        record.is_correct = Some(is_correct);
        record.score = Some(if is_correct { question.points } else { 0.0 });

        total_questions += 1;
        if is_correct {
            correct_answers += 1;
            raw_score += question.points;
        }
    }

    // 0, not NaN, when nothing was answered.
    let percentage = if total_questions == 0 {
        0.0
    } else {
        correct_answers as f64 / total_questions as f64 * 100.0
    };

    let score = ObjectiveScore {
        raw_score,
        total_questions,
        correct_answers,
        percentage,
        band_score: band_for_percentage(percentage),
    };

    match module {
        ExamModule::Listening => submission.scores.0.listening = Some(score),
        ExamModule::Reading => submission.scores.0.reading = Some(score),
        ExamModule::Writing | ExamModule::Speaking => unreachable!(),
    }

    Ok(())
}

/// Band scores currently present on the card. A stored 0.0 counts as unset.
fn collect_present_bands(scores: &ScoreCard) -> Vec<f64> {
    let mut collected = Vec::new();
    if let Some(listening) = &scores.listening {
        collected.push(listening.band_score);
    }
    if let Some(reading) = &scores.reading {
        collected.push(reading.band_score);
    }
    if let Some(writing) = &scores.writing {
        collected.push(writing.overall_score);
    }
    if let Some(speaking) = &scores.speaking {
        collected.push(speaking.overall_score);
    }
    collected.retain(|band| *band > 0.0);
    collected
}

/// Recompute the overall aggregate from whichever module scores exist.
/// Leaves the card untouched when no module has been scored yet. Idempotent.
pub(crate) fn compute_overall(scores: &mut ScoreCard) {
    let collected = collect_present_bands(scores);
    if collected.is_empty() {
        return;
    }

    let total: f64 = collected.iter().sum();
    let mean = total / collected.len() as f64;

    scores.overall = Some(OverallScore {
        band_score: round_to_half_band(mean),
        total_score: total,
        max_possible_score: 9.0 * collected.len() as f64,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{SpeakingScore, WritingScore};

    #[test]
    fn band_table_is_total_and_monotonic() {
        let mut previous = band_for_percentage(0.0);
        for step in 0..=1000 {
            let percentage = step as f64 / 10.0;
            let band = band_for_percentage(percentage);
            assert!((1.0..=9.0).contains(&band), "band {band} out of range at {percentage}");
            assert!(band >= previous, "band regressed at {percentage}");
            previous = band;
        }
    }

    #[test]
    fn band_table_boundaries() {
        assert_eq!(band_for_percentage(100.0), 9.0);
        assert_eq!(band_for_percentage(90.0), 9.0);
        assert_eq!(band_for_percentage(89.9), 8.5);
        assert_eq!(band_for_percentage(70.0), 7.0);
        assert_eq!(band_for_percentage(20.0), 2.0);
        assert_eq!(band_for_percentage(19.9), 1.0);
        assert_eq!(band_for_percentage(0.0), 1.0);
    }

    #[test]
    fn rounds_half_up_to_nearest_half_band() {
        assert_eq!(round_to_half_band(7.25), 7.5);
        assert_eq!(round_to_half_band(7.0), 7.0);
        assert_eq!(round_to_half_band(6.25), 6.5);
        assert_eq!(round_to_half_band(6.24), 6.0);
        assert_eq!(round_to_half_band(8.75), 9.0);
    }

    #[test]
    fn overall_mean_of_two_bands_rounds_up() {
        let mut scores = ScoreCard::default();
        scores.writing =
            Some(WritingScore { task1_score: None, task2_score: None, overall_score: 7.0, feedback: None });
        scores.speaking = Some(SpeakingScore { overall_score: 7.5, feedback: None });

        compute_overall(&mut scores);

        let overall = scores.overall.expect("overall");
        assert_eq!(overall.band_score, 7.5);
        assert_eq!(overall.total_score, 14.5);
        assert_eq!(overall.max_possible_score, 18.0);
    }

    #[test]
    fn overall_averages_only_present_scores() {
        let mut scores = ScoreCard::default();
        scores.listening = Some(ObjectiveScore {
            raw_score: 30.0,
            total_questions: 40,
            correct_answers: 30,
            percentage: 75.0,
            band_score: 7.5,
        });

        compute_overall(&mut scores);

        let overall = scores.overall.clone().expect("overall");
        assert_eq!(overall.band_score, 7.5);
        assert_eq!(overall.max_possible_score, 9.0);
    }

    #[test]
    fn overall_treats_zero_band_as_unset() {
        let mut scores = ScoreCard::default();
        scores.speaking = Some(SpeakingScore { overall_score: 0.0, feedback: None });

        compute_overall(&mut scores);

        assert!(scores.overall.is_none());
    }

    #[test]
    fn overall_is_idempotent() {
        let mut scores = ScoreCard::default();
        scores.writing = Some(WritingScore {
            task1_score: Some(6.0),
            task2_score: Some(7.0),
            overall_score: 6.5,
            feedback: None,
        });
        scores.speaking = Some(SpeakingScore { overall_score: 7.0, feedback: None });

        compute_overall(&mut scores);
        let first = scores.overall.clone();
        compute_overall(&mut scores);

        assert_eq!(scores.overall, first);
    }

    #[test]
    fn overall_noop_when_nothing_scored() {
        let mut scores = ScoreCard::default();
        compute_overall(&mut scores);
        assert!(scores.overall.is_none());
    }

    #[test]
    fn three_band_mean_rounds_to_whole() {
        let mut scores = ScoreCard::default();
        scores.listening = Some(ObjectiveScore {
            raw_score: 24.0,
            total_questions: 40,
            correct_answers: 24,
            percentage: 60.0,
            band_score: 6.0,
        });
        scores.reading = Some(ObjectiveScore {
            raw_score: 28.0,
            total_questions: 40,
            correct_answers: 28,
            percentage: 70.0,
            band_score: 7.0,
        });
        scores.writing = Some(WritingScore {
            task1_score: None,
            task2_score: None,
            overall_score: 8.0,
            feedback: None,
        });

        compute_overall(&mut scores);

        assert_eq!(scores.overall.expect("overall").band_score, 7.0);
    }
}
