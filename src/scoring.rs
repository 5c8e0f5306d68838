//! Scoring engine
//!
//! Converts a raw test result into a percentile, letter grade, standardized
//! score and a list of feedback messages. Pure function of its inputs, the
//! scoring configuration and the normative table.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::error::{FitAssessError, Result};
use crate::models::{
    AgeGroup, Gender, Grade, MetricKind, RepetitionData, Score, TestSubmission, TestType,
};
use crate::norms::NormativeTable;

/// Scoring policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Decimal places kept in the standardized score
    pub precision: u32,

    /// Share of the standardized score taken by the raw percentile
    pub percentile_weight: Decimal,

    /// Share of the standardized score taken by form-weighted percentile
    pub form_weight: Decimal,

    /// Average form score at or above which form is "excellent"
    pub form_excellent: Decimal,

    /// Average form score at or above which form is "good"
    pub form_good: Decimal,

    /// Average form score at or above which form is "fair"
    pub form_fair: Decimal,

    /// Repetition-duration coefficient of variation below which pacing is consistent
    pub consistent_cv: f64,

    /// Coefficient of variation below which pacing is moderately consistent
    pub moderate_cv: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            precision: 3,
            percentile_weight: dec!(0.8),
            form_weight: dec!(0.2),
            form_excellent: dec!(90),
            form_good: dec!(75),
            form_fair: dec!(50),
            consistent_cv: 0.15,
            moderate_cv: 0.30,
        }
    }
}

impl ScoringConfig {
    pub fn validate(&self) -> Result<()> {
        if self.percentile_weight + self.form_weight != Decimal::ONE {
            return Err(FitAssessError::Configuration(format!(
                "scoring weights must sum to 1, got {} + {}",
                self.percentile_weight, self.form_weight
            )));
        }
        if self.percentile_weight < Decimal::ZERO || self.form_weight < Decimal::ZERO {
            return Err(FitAssessError::Configuration(
                "scoring weights must not be negative".to_string(),
            ));
        }
        if !(self.form_excellent >= self.form_good && self.form_good >= self.form_fair) {
            return Err(FitAssessError::Configuration(
                "form thresholds must be descending".to_string(),
            ));
        }
        if !(self.consistent_cv > 0.0 && self.moderate_cv > self.consistent_cv) {
            return Err(FitAssessError::Configuration(
                "consistency thresholds must be positive and ascending".to_string(),
            ));
        }
        Ok(())
    }
}

/// Everything needed to score one test
#[derive(Debug, Clone)]
pub struct ScoringInput<'a> {
    pub test_type: TestType,
    /// Rep count, hold duration, distance or time depending on the test
    pub raw_value: Decimal,
    pub age_group: AgeGroup,
    pub gender: Gender,
    pub repetitions: &'a [RepetitionData],
}

/// Output of the scoring engine
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredTest {
    pub score: Score,
    pub average_form_score: Decimal,
}

/// Converts raw results into scores against a normative table
pub struct ScoringEngine<'a> {
    config: &'a ScoringConfig,
    norms: &'a NormativeTable,
}

impl<'a> ScoringEngine<'a> {
    pub fn new(config: &'a ScoringConfig, norms: &'a NormativeTable) -> Self {
        Self { config, norms }
    }

    /// Score a test result
    pub fn score(&self, input: &ScoringInput<'_>) -> Result<ScoredTest> {
        validate_repetitions(input.repetitions)?;
        if input.raw_value < Decimal::ZERO {
            return Err(FitAssessError::validation(format!(
                "raw value out of range: {}",
                input.raw_value
            )));
        }

        let bands = self
            .norms
            .lookup(input.test_type, input.age_group, input.gender)?;
        let percentile = bands.percentile_for(input.raw_value);
        let grade = Grade::from_percentile(percentile);
        let average_form_score = average_form_score(input.repetitions);
        let standardized_score = self.standardized_score(percentile, average_form_score);

        let feedback = self.feedback(
            input.test_type,
            grade,
            average_form_score,
            input.repetitions,
        );

        Ok(ScoredTest {
            score: Score {
                raw_score: input.raw_value,
                standardized_score,
                percentile: Some(percentile),
                grade,
                feedback,
            },
            average_form_score,
        })
    }

    /// `percentile * 0.8 + (form / 100) * percentile * 0.2`, rounded and clamped to [0, 100]
    pub fn standardized_score(&self, percentile: Decimal, average_form_score: Decimal) -> Decimal {
        let blended = percentile * self.config.percentile_weight
            + (average_form_score / dec!(100)) * percentile * self.config.form_weight;
        blended
            .round_dp_with_strategy(self.config.precision, RoundingStrategy::MidpointAwayFromZero)
            .max(Decimal::ZERO)
            .min(dec!(100))
    }

    /// Four independent feedback axes; each contributes at most one message
    pub fn feedback(
        &self,
        test_type: TestType,
        grade: Grade,
        average_form_score: Decimal,
        repetitions: &[RepetitionData],
    ) -> Vec<String> {
        let mut feedback = vec![performance_message(grade).to_string()];

        if !repetitions.is_empty() {
            feedback.push(self.form_message(average_form_score).to_string());
        }

        feedback.push(test_type.tip().to_string());

        if let Some(cv) = timing_variation(repetitions) {
            feedback.push(self.consistency_message(cv).to_string());
        }

        feedback
    }

    fn form_message(&self, average_form_score: Decimal) -> &'static str {
        if average_form_score >= self.config.form_excellent {
            "Excellent form throughout the test."
        } else if average_form_score >= self.config.form_good {
            "Good form with minor lapses; keep focusing on technique."
        } else if average_form_score >= self.config.form_fair {
            "Form needs attention; slow down and control each repetition."
        } else {
            "Poor form detected; work on technique before adding volume."
        }
    }

    fn consistency_message(&self, cv: f64) -> &'static str {
        if cv < self.config.consistent_cv {
            "Your repetition pace was very consistent."
        } else if cv < self.config.moderate_cv {
            "Your repetition pace varied somewhat; aim for a steady rhythm."
        } else {
            "Your repetition pace was inconsistent; you may be fatiguing early."
        }
    }
}

fn performance_message(grade: Grade) -> &'static str {
    match grade {
        Grade::A => "Outstanding result: you are in the top 20% for your group.",
        Grade::B => "Strong result, above the average for your group.",
        Grade::C => "Solid result, around the average for your group.",
        Grade::D => "Below average for your group; regular practice will move you up.",
        Grade::F => "This is your starting point; build a consistent training routine.",
    }
}

/// Mean form score of all repetitions, 0 when none were recorded
pub fn average_form_score(repetitions: &[RepetitionData]) -> Decimal {
    if repetitions.is_empty() {
        return Decimal::ZERO;
    }
    let total: Decimal = repetitions.iter().map(|rep| rep.form_score).sum();
    (total / Decimal::from(repetitions.len()))
        .round_dp(2)
        .max(Decimal::ZERO)
        .min(dec!(100))
}

/// Coefficient of variation of repetition durations.
///
/// `None` with fewer than two repetitions or a non-positive mean.
pub fn timing_variation(repetitions: &[RepetitionData]) -> Option<f64> {
    if repetitions.len() < 2 {
        return None;
    }
    let durations: Vec<f64> = repetitions
        .iter()
        .filter_map(|rep| rep.duration.to_f64())
        .collect();
    if durations.len() < 2 {
        return None;
    }

    let mean = durations.iter().mean();
    if mean.is_nan() || mean <= 0.0 {
        return None;
    }
    let std_dev = durations.iter().std_dev();
    Some(std_dev / mean)
}

fn validate_repetitions(repetitions: &[RepetitionData]) -> Result<()> {
    for (index, rep) in repetitions.iter().enumerate() {
        if rep.form_score < Decimal::ZERO || rep.form_score > dec!(100) {
            return Err(FitAssessError::validation(format!(
                "form score out of range: repetition {} has {}",
                index + 1,
                rep.form_score
            )));
        }
        if rep.duration < Decimal::ZERO || rep.end_time < rep.start_time {
            return Err(FitAssessError::validation(format!(
                "repetition timing out of range: repetition {}",
                index + 1
            )));
        }
    }
    Ok(())
}

/// Test duration in seconds, from the submission or its timestamps
pub fn submission_duration(submission: &TestSubmission) -> Result<Decimal> {
    let duration = match submission.duration {
        Some(duration) => duration,
        None => {
            let millis = (submission.completed_at - submission.started_at).num_milliseconds();
            Decimal::from_i64(millis).unwrap_or_default() / dec!(1000)
        }
    };
    if duration < Decimal::ZERO || submission.completed_at < submission.started_at {
        return Err(FitAssessError::validation(format!(
            "duration out of range: {}",
            duration
        )));
    }
    Ok(duration)
}

/// The raw performance value a test is graded on
pub fn raw_value_for(submission: &TestSubmission) -> Result<Decimal> {
    match submission.test_type.metric() {
        MetricKind::Reps => Ok(Decimal::from(
            submission
                .total_reps
                .unwrap_or(submission.repetitions.len() as u32),
        )),
        MetricKind::Hold => submission_duration(submission),
        MetricKind::Distance | MetricKind::Time => {
            submission.measured_value.ok_or_else(|| {
                FitAssessError::validation(format!(
                    "measured value required: {} is graded on {}",
                    submission.test_type,
                    if submission.test_type.metric() == MetricKind::Time {
                        "time"
                    } else {
                        "distance"
                    }
                ))
            })
        }
    }
}
