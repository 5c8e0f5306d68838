//! Plan adaptation from recent performance trends
//!
//! Compares the two most recent standardized scores of every test type in a
//! trailing window, votes an overall trend, and scales the plan's weekly
//! volume and intensity accordingly.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{FitAssessError, Result};
use crate::models::{PerformanceSnapshot, TestResult, TestType, TrainingPlan, Trend};

/// Adaptation policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptationConfig {
    /// Trailing window of results considered, in days
    pub window_days: i64,

    /// Fewer valid results in the window is a validation error
    pub min_results: usize,

    /// Percent change above which a test type is improving
    pub improving_threshold_pct: Decimal,

    /// Percent drop beyond which a test type is declining
    pub declining_threshold_pct: Decimal,

    pub increase_factor: Decimal,
    pub decrease_factor: Decimal,

    pub min_intensity: Decimal,
    pub max_intensity: Decimal,
    pub min_volume: u32,
    pub max_volume: u32,

    /// Oldest snapshots are dropped beyond this many; `None` keeps everything
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_history: Option<usize>,
}

impl Default for AdaptationConfig {
    fn default() -> Self {
        Self {
            window_days: 30,
            min_results: 2,
            improving_threshold_pct: dec!(5),
            declining_threshold_pct: dec!(5),
            increase_factor: dec!(1.1),
            decrease_factor: dec!(0.9),
            min_intensity: dec!(1),
            max_intensity: dec!(10),
            min_volume: 60,
            max_volume: 1200,
            max_history: Some(120),
        }
    }
}

impl AdaptationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.window_days <= 0 {
            return Err(FitAssessError::Configuration(
                "adaptation window must be positive".to_string(),
            ));
        }
        if self.min_results < 2 {
            return Err(FitAssessError::Configuration(
                "adaptation needs at least two results".to_string(),
            ));
        }
        if self.increase_factor < Decimal::ONE || self.decrease_factor > Decimal::ONE {
            return Err(FitAssessError::Configuration(
                "increase factor must be >= 1 and decrease factor <= 1".to_string(),
            ));
        }
        if self.min_intensity > self.max_intensity || self.min_volume > self.max_volume {
            return Err(FitAssessError::Configuration(
                "adaptation bounds are inverted".to_string(),
            ));
        }
        if self.max_history == Some(0) {
            return Err(FitAssessError::Configuration(
                "history cap must keep at least one snapshot".to_string(),
            ));
        }
        Ok(())
    }
}

/// Trend of a single test type between its two most recent results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeTrend {
    pub test_type: TestType,
    pub previous_score: Decimal,
    pub latest_score: Decimal,
    /// `None` when the previous score was zero
    pub change_pct: Option<Decimal>,
    pub trend: Trend,
}

/// What an adaptation decided
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdaptationOutcome {
    pub overall_trend: Trend,
    pub type_trends: Vec<TypeTrend>,
    pub previous_intensity: Decimal,
    pub new_intensity: Decimal,
    pub previous_volume: u32,
    pub new_volume: u32,
    pub snapshots: Vec<PerformanceSnapshot>,
    pub adapted_at: DateTime<Utc>,
}

impl AdaptationOutcome {
    pub fn volume_changed(&self) -> bool {
        self.previous_volume != self.new_volume
    }
}

/// Revises plans from recent test results
pub struct PlanAdapter<'a> {
    config: &'a AdaptationConfig,
}

impl<'a> PlanAdapter<'a> {
    pub fn new(config: &'a AdaptationConfig) -> Self {
        Self { config }
    }

    pub fn window_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::days(self.config.window_days)
    }

    /// Decide the new volume and intensity; does not modify the plan
    pub fn adapt(
        &self,
        plan: &TrainingPlan,
        results: &[TestResult],
        now: DateTime<Utc>,
    ) -> Result<AdaptationOutcome> {
        let window_start = self.window_start(now);
        let recent: Vec<&TestResult> = results
            .iter()
            .filter(|r| r.is_valid && r.completed_at >= window_start && r.completed_at <= now)
            .collect();

        if recent.len() < self.config.min_results {
            return Err(FitAssessError::validation(format!(
                "not enough data: {} valid results in the last {} days, {} required",
                recent.len(),
                self.config.window_days,
                self.config.min_results
            )));
        }

        let mut by_type: BTreeMap<TestType, Vec<&TestResult>> = BTreeMap::new();
        for result in recent {
            by_type.entry(result.test_type).or_default().push(result);
        }

        let mut type_trends = Vec::new();
        let mut snapshots = Vec::new();
        for (test_type, mut samples) in by_type {
            if samples.len() < 2 {
                continue;
            }
            samples.sort_by_key(|r| r.completed_at);
            let previous = samples[samples.len() - 2];
            let latest = samples[samples.len() - 1];

            let trend_entry = self.type_trend(
                test_type,
                previous.score.standardized_score,
                latest.score.standardized_score,
            );
            snapshots.push(PerformanceSnapshot {
                date: latest.completed_at,
                test_type,
                score: latest.score.standardized_score,
                percentile: latest.score.percentile,
                trend: trend_entry.trend,
            });
            type_trends.push(trend_entry);
        }

        let overall_trend = majority_trend(type_trends.iter().map(|t| t.trend));
        let (new_intensity, new_volume) =
            self.adjusted_load(plan.weekly_intensity, plan.weekly_volume, overall_trend);

        Ok(AdaptationOutcome {
            overall_trend,
            type_trends,
            previous_intensity: plan.weekly_intensity,
            new_intensity,
            previous_volume: plan.weekly_volume,
            new_volume,
            snapshots,
            adapted_at: now,
        })
    }

    /// Apply an outcome to the in-memory plan, enforcing the history cap.
    ///
    /// Returns the number of snapshots dropped from the front of the history.
    pub fn apply(&self, plan: &mut TrainingPlan, outcome: &AdaptationOutcome) -> usize {
        plan.weekly_intensity = outcome.new_intensity;
        plan.weekly_volume = outcome.new_volume;
        plan.last_adapted_at = Some(outcome.adapted_at);
        plan.performance_history
            .extend(outcome.snapshots.iter().cloned());

        match self.config.max_history {
            Some(cap) if plan.performance_history.len() > cap => {
                let excess = plan.performance_history.len() - cap;
                plan.performance_history.drain(..excess);
                excess
            }
            _ => 0,
        }
    }

    fn type_trend(&self, test_type: TestType, previous: Decimal, latest: Decimal) -> TypeTrend {
        let exact_pct = if previous.is_zero() {
            None
        } else {
            Some((latest - previous) / previous * dec!(100))
        };

        let trend = match exact_pct {
            Some(pct) if pct > self.config.improving_threshold_pct => Trend::Improving,
            Some(pct) if pct < -self.config.declining_threshold_pct => Trend::Declining,
            Some(_) => Trend::Stable,
            // From zero, any gain is an improvement
            None if latest > previous => Trend::Improving,
            None => Trend::Stable,
        };

        TypeTrend {
            test_type,
            previous_score: previous,
            latest_score: latest,
            change_pct: exact_pct.map(|pct| pct.round_dp(2)),
            trend,
        }
    }

    fn adjusted_load(&self, intensity: Decimal, volume: u32, trend: Trend) -> (Decimal, u32) {
        let factor = match trend {
            Trend::Improving => self.config.increase_factor,
            Trend::Declining => self.config.decrease_factor,
            Trend::Stable => return (intensity, volume),
        };

        let new_intensity = (intensity * factor)
            .round_dp(2)
            .max(self.config.min_intensity)
            .min(self.config.max_intensity);

        let new_volume = (Decimal::from(volume) * factor)
            .round()
            .to_u32()
            .unwrap_or(volume)
            .max(self.config.min_volume)
            .min(self.config.max_volume);

        (new_intensity, new_volume)
    }
}

/// Strict majority of improving vs declining; ties and no signal are stable
pub fn majority_trend(trends: impl IntoIterator<Item = Trend>) -> Trend {
    let (mut improving, mut declining) = (0usize, 0usize);
    for trend in trends {
        match trend {
            Trend::Improving => improving += 1,
            Trend::Declining => declining += 1,
            Trend::Stable => {}
        }
    }

    if improving > declining {
        Trend::Improving
    } else if declining > improving {
        Trend::Declining
    } else {
        Trend::Stable
    }
}
