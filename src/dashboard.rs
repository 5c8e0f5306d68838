//! Per-athlete dashboard aggregation

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::{Athlete, Grade, PlanWorkout, TestResult, TestType, TrainingPlan, Trend};

/// Aggregates for one test type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestTypeSummary {
    pub test_type: TestType,
    pub count: usize,
    pub best_score: Decimal,
    pub latest_score: Decimal,
    pub latest_grade: Grade,
    pub latest_at: DateTime<Utc>,
}

/// Active plan progress
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanSummary {
    pub plan_id: String,
    pub weekly_volume: u32,
    pub weekly_intensity: Decimal,
    pub total_workouts: usize,
    pub completed_workouts: usize,
    /// Percent, rounded to one decimal place
    pub completion_rate: Decimal,
    pub latest_trend: Option<Trend>,
    pub last_adapted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub athlete_id: String,
    pub athlete_name: String,
    pub total_tests: usize,
    pub average_score: Option<Decimal>,
    pub grade_distribution: BTreeMap<Grade, usize>,
    pub by_test_type: Vec<TestTypeSummary>,
    pub recent_results: Vec<TestResult>,
    pub active_plan: Option<PlanSummary>,
}

impl DashboardSummary {
    /// Summarize valid results and the active plan
    pub fn build(
        athlete: &Athlete,
        results: &[TestResult],
        active_plan: Option<(&TrainingPlan, &[PlanWorkout])>,
        recent_limit: usize,
    ) -> Self {
        let mut valid: Vec<&TestResult> = results
            .iter()
            .filter(|r| r.is_valid && r.athlete_id == athlete.id)
            .collect();
        valid.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));

        let average_score = if valid.is_empty() {
            None
        } else {
            let total: Decimal = valid.iter().map(|r| r.score.standardized_score).sum();
            Some((total / Decimal::from(valid.len())).round_dp(2))
        };

        let mut grade_distribution: BTreeMap<Grade, usize> =
            Grade::ALL.iter().map(|grade| (*grade, 0)).collect();
        for result in &valid {
            *grade_distribution.entry(result.score.grade).or_insert(0) += 1;
        }

        // valid is newest first, so the first entry per type is the latest
        let mut by_type: BTreeMap<TestType, TestTypeSummary> = BTreeMap::new();
        for result in &valid {
            let score = result.score.standardized_score;
            by_type
                .entry(result.test_type)
                .and_modify(|summary| {
                    summary.count += 1;
                    summary.best_score = summary.best_score.max(score);
                })
                .or_insert_with(|| TestTypeSummary {
                    test_type: result.test_type,
                    count: 1,
                    best_score: score,
                    latest_score: score,
                    latest_grade: result.score.grade,
                    latest_at: result.completed_at,
                });
        }

        Self {
            athlete_id: athlete.id.clone(),
            athlete_name: athlete.name.clone(),
            total_tests: valid.len(),
            average_score,
            grade_distribution,
            by_test_type: by_type.into_values().collect(),
            recent_results: valid.iter().take(recent_limit).map(|r| (*r).clone()).collect(),
            active_plan: active_plan.map(|(plan, workouts)| plan_summary(plan, workouts)),
        }
    }
}

fn plan_summary(plan: &TrainingPlan, workouts: &[PlanWorkout]) -> PlanSummary {
    let completed_workouts = workouts.iter().filter(|w| w.completed).count();
    let completion_rate = if workouts.is_empty() {
        Decimal::ZERO
    } else {
        (Decimal::from(completed_workouts) / Decimal::from(workouts.len()) * Decimal::ONE_HUNDRED)
            .round_dp(1)
    };

    PlanSummary {
        plan_id: plan.id.clone(),
        weekly_volume: plan.weekly_volume,
        weekly_intensity: plan.weekly_intensity,
        total_workouts: workouts.len(),
        completed_workouts,
        completion_rate,
        latest_trend: plan.performance_history.last().map(|s| s.trend),
        last_adapted_at: plan.last_adapted_at,
    }
}
