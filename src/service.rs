//! Application service: ownership checks, validation and persistence around
//! the scoring, planning, adaptation and leaderboard engines.
//!
//! Every operation takes the requesting `user_id`. Athletes, results and
//! plans owned by another user are reported as not found.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs;
use tracing::{debug, info};
use uuid::Uuid;

use crate::adaptation::{AdaptationOutcome, PlanAdapter};
use crate::config::AppConfig;
use crate::dashboard::DashboardSummary;
use crate::database::{
    AthleteQuery, Database, DatabaseStats, TestResultQuery, TestTypeStats,
};
use crate::error::{FitAssessError, Result};
use crate::leaderboard::{rank_athletes, LeaderboardEntry, LeaderboardFilter};
use crate::models::{
    Athlete, AthleteUpdate, GeneratedPlan, NewAthlete, PlanWorkout, TestResult, TestSubmission,
    TestType, TrainingPlan,
};
use crate::norms::NormativeTable;
use crate::scoring::{raw_value_for, submission_duration, ScoringEngine, ScoringInput};
use crate::training_plan::{session_duration, PlanGenerator, PlanRequest};

/// Filters for listing an athlete's results
#[derive(Debug, Clone, Default)]
pub struct ResultFilter {
    pub test_type: Option<TestType>,
    pub include_invalid: bool,
    /// Most recent N results
    pub limit: Option<usize>,
}

/// A plan and its schedule
#[derive(Debug, Clone, Serialize)]
pub struct PlanDetails {
    pub plan: TrainingPlan,
    pub workouts: Vec<PlanWorkout>,
}

/// Result of a plan adaptation
#[derive(Debug, Clone, Serialize)]
pub struct AdaptedPlan {
    pub plan: TrainingPlan,
    pub outcome: AdaptationOutcome,
    /// Snapshots removed by the history cap
    pub dropped_snapshots: usize,
    /// New duration of open workouts, when volume changed
    pub rescaled_session_minutes: Option<u32>,
}

/// Store-wide counts
#[derive(Debug, Clone, Serialize)]
pub struct ServiceStats {
    pub database: DatabaseStats,
    pub by_test_type: Vec<TestTypeStats>,
}

pub struct AssessmentService {
    db: Database,
    config: AppConfig,
    norms: NormativeTable,
}

impl AssessmentService {
    /// Validate configuration and assemble the service
    pub fn new(db: Database, config: AppConfig, norms: NormativeTable) -> Result<Self> {
        config.validate()?;
        norms.validate()?;
        Ok(Self { db, config, norms })
    }

    /// Open the configured database file, creating its directory
    pub fn open(config: AppConfig) -> anyhow::Result<Self> {
        if let Some(parent) = config.database.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let norms = config.load_norms()?;
        let db = Database::new(&config.database.path)?;
        info!(
            database = %config.database.path.display(),
            norms_version = %norms.version,
            "Assessment service opened"
        );
        Ok(Self::new(db, config, norms)?)
    }

    /// Service over a private in-memory database
    pub fn in_memory(config: AppConfig) -> anyhow::Result<Self> {
        let norms = config.load_norms()?;
        Ok(Self::new(Database::in_memory()?, config, norms)?)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn norms(&self) -> &NormativeTable {
        &self.norms
    }

    // ---- Athletes -------------------------------------------------------

    pub fn create_athlete(&self, user_id: &str, new: NewAthlete) -> Result<Athlete> {
        let today = Utc::now().date_naive();
        let name = validate_name(&new.name)?;
        validate_date_of_birth(new.date_of_birth, today)?;

        let now = Utc::now();
        let athlete = Athlete {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            name,
            date_of_birth: new.date_of_birth,
            gender: new.gender,
            sport: new.sport,
            school: non_blank(new.school),
            club: non_blank(new.club),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.db.insert_athlete(&athlete)?;

        info!(athlete_id = %athlete.id, user_id, sport = %athlete.sport, "Athlete created");
        Ok(athlete)
    }

    /// Owned athlete, active or not
    pub fn get_athlete(&self, user_id: &str, athlete_id: &str) -> Result<Athlete> {
        match self.db.find_athlete(athlete_id)? {
            Some(athlete) if athlete.user_id == user_id => Ok(athlete),
            _ => Err(FitAssessError::not_found("athlete", athlete_id)),
        }
    }

    pub fn list_athletes(&self, user_id: &str, include_inactive: bool) -> Result<Vec<Athlete>> {
        Ok(self.db.list_athletes(user_id, include_inactive)?)
    }

    pub fn update_athlete(
        &self,
        user_id: &str,
        athlete_id: &str,
        update: AthleteUpdate,
    ) -> Result<Athlete> {
        let mut athlete = self.get_athlete(user_id, athlete_id)?;

        if let Some(name) = &update.name {
            athlete.name = validate_name(name)?;
        }
        if let Some(date_of_birth) = update.date_of_birth {
            validate_date_of_birth(date_of_birth, Utc::now().date_naive())?;
            athlete.date_of_birth = date_of_birth;
        }
        if let Some(gender) = update.gender {
            athlete.gender = gender;
        }
        if let Some(sport) = update.sport {
            athlete.sport = sport;
        }
        if let Some(school) = update.school {
            athlete.school = non_blank(school);
        }
        if let Some(club) = update.club {
            athlete.club = non_blank(club);
        }
        athlete.updated_at = Utc::now();

        self.db.update_athlete(&athlete)?;
        info!(athlete_id, "Athlete updated");
        Ok(athlete)
    }

    /// Soft delete
    pub fn deactivate_athlete(&self, user_id: &str, athlete_id: &str) -> Result<Athlete> {
        self.set_athlete_active(user_id, athlete_id, false)
    }

    pub fn restore_athlete(&self, user_id: &str, athlete_id: &str) -> Result<Athlete> {
        self.set_athlete_active(user_id, athlete_id, true)
    }

    fn set_athlete_active(&self, user_id: &str, athlete_id: &str, active: bool) -> Result<Athlete> {
        let mut athlete = self.get_athlete(user_id, athlete_id)?;
        if athlete.is_active != active {
            athlete.is_active = active;
            athlete.updated_at = Utc::now();
            self.db.update_athlete(&athlete)?;
            info!(athlete_id, active, "Athlete activation changed");
        }
        Ok(athlete)
    }

    /// Owned and active athlete; inactive athletes accept no new data
    fn active_athlete(&self, user_id: &str, athlete_id: &str) -> Result<Athlete> {
        let athlete = self.get_athlete(user_id, athlete_id)?;
        if !athlete.is_active {
            return Err(FitAssessError::not_found("athlete", athlete_id));
        }
        Ok(athlete)
    }

    // ---- Test results ---------------------------------------------------

    /// Score and store a test. Nothing is written when scoring fails.
    pub fn submit_test(
        &self,
        user_id: &str,
        athlete_id: &str,
        submission: TestSubmission,
    ) -> Result<TestResult> {
        let athlete = self.active_athlete(user_id, athlete_id)?;

        let duration = submission_duration(&submission)?;
        let raw_value = raw_value_for(&submission)?;
        let age_group = athlete.age_group_on(submission.completed_at.date_naive());

        let engine = ScoringEngine::new(&self.config.scoring, &self.norms);
        let scored = engine.score(&ScoringInput {
            test_type: submission.test_type,
            raw_value,
            age_group,
            gender: athlete.gender,
            repetitions: &submission.repetitions,
        })?;

        let total_reps = submission
            .total_reps
            .unwrap_or(submission.repetitions.len() as u32);

        let result = TestResult {
            id: Uuid::new_v4().to_string(),
            athlete_id: athlete.id.clone(),
            user_id: user_id.to_string(),
            test_type: submission.test_type,
            started_at: submission.started_at,
            completed_at: submission.completed_at,
            duration,
            repetitions: submission.repetitions,
            total_reps,
            measured_value: submission.measured_value,
            score: scored.score,
            average_form_score: scored.average_form_score,
            is_valid: true,
            created_at: Utc::now(),
        };
        self.db.insert_test_result(&result)?;

        info!(
            result_id = %result.id,
            athlete_id,
            test_type = %result.test_type,
            age_group = %age_group,
            score = %result.score.standardized_score,
            grade = %result.score.grade,
            "Test result stored"
        );
        Ok(result)
    }

    /// Owned, valid result
    pub fn get_test_result(&self, user_id: &str, result_id: &str) -> Result<TestResult> {
        match self.db.find_test_result(result_id)? {
            Some(result) if result.user_id == user_id && result.is_valid => Ok(result),
            _ => Err(FitAssessError::not_found("test result", result_id)),
        }
    }

    /// Results oldest first
    pub fn list_test_results(
        &self,
        user_id: &str,
        athlete_id: &str,
        filter: &ResultFilter,
    ) -> Result<Vec<TestResult>> {
        let athlete = self.get_athlete(user_id, athlete_id)?;
        Ok(self.db.query_test_results(&TestResultQuery {
            athlete_id: Some(athlete.id),
            test_type: filter.test_type,
            since: None,
            include_invalid: filter.include_invalid,
            limit: filter.limit,
        })?)
    }

    /// Soft delete; the row stays for auditing but leaves every aggregate
    pub fn delete_test_result(&self, user_id: &str, result_id: &str) -> Result<()> {
        let result = self.get_test_result(user_id, result_id)?;
        if !self.db.invalidate_test_result(&result.id)? {
            return Err(FitAssessError::not_found("test result", result_id));
        }
        info!(result_id, athlete_id = %result.athlete_id, "Test result invalidated");
        Ok(())
    }

    // ---- Training plans -------------------------------------------------

    /// Replace the athlete's active plan with a freshly generated one
    pub fn generate_plan(
        &mut self,
        user_id: &str,
        athlete_id: &str,
        request: &PlanRequest,
    ) -> Result<PlanDetails> {
        self.generate_plan_at(user_id, athlete_id, request, Utc::now())
    }

    pub fn generate_plan_at(
        &mut self,
        user_id: &str,
        athlete_id: &str,
        request: &PlanRequest,
        now: DateTime<Utc>,
    ) -> Result<PlanDetails> {
        let athlete = self.active_athlete(user_id, athlete_id)?;

        let generated: GeneratedPlan =
            PlanGenerator::new(&self.config.plan).generate(&athlete.id, request, now)?;
        let deactivated = self.db.create_plan(&generated)?;

        info!(
            plan_id = %generated.plan.id,
            athlete_id,
            difficulty = %generated.plan.difficulty,
            weekly_volume = generated.plan.weekly_volume,
            workouts = generated.workouts.len(),
            deactivated,
            "Training plan generated"
        );
        Ok(PlanDetails {
            plan: generated.plan,
            workouts: generated.workouts,
        })
    }

    /// Every plan generated for the athlete, newest first, including superseded ones
    pub fn plan_history(&self, user_id: &str, athlete_id: &str) -> Result<Vec<TrainingPlan>> {
        let athlete = self.get_athlete(user_id, athlete_id)?;
        Ok(self.db.list_plans(&athlete.id)?)
    }

    pub fn active_plan(&self, user_id: &str, athlete_id: &str) -> Result<PlanDetails> {
        let athlete = self.get_athlete(user_id, athlete_id)?;
        let plan = self
            .db
            .active_plan(&athlete.id)?
            .ok_or_else(|| FitAssessError::not_found("training plan", athlete_id))?;
        let workouts = self.db.plan_workouts(&plan.id)?;
        Ok(PlanDetails { plan, workouts })
    }

    pub fn adapt_plan(&mut self, user_id: &str, athlete_id: &str) -> Result<AdaptedPlan> {
        self.adapt_plan_at(user_id, athlete_id, Utc::now())
    }

    /// Revise the active plan from recent results.
    ///
    /// Validation failures leave the stored plan untouched.
    pub fn adapt_plan_at(
        &mut self,
        user_id: &str,
        athlete_id: &str,
        now: DateTime<Utc>,
    ) -> Result<AdaptedPlan> {
        let PlanDetails { plan, workouts } = self.active_plan(user_id, athlete_id)?;
        let adapter = PlanAdapter::new(&self.config.adaptation);

        let results = self.db.query_test_results(&TestResultQuery {
            athlete_id: Some(plan.athlete_id.clone()),
            since: Some(adapter.window_start(now)),
            ..TestResultQuery::default()
        })?;

        let outcome = match adapter.adapt(&plan, &results, now) {
            Ok(outcome) => outcome,
            Err(e) => {
                e.log("adapt_plan");
                return Err(e);
            }
        };

        let mut adapted = plan;
        let dropped_snapshots = adapter.apply(&mut adapted, &outcome);

        let rescaled_session_minutes = if outcome.volume_changed() {
            let sessions: BTreeSet<u32> = workouts.iter().map(|w| w.day_number).collect();
            Some(session_duration(adapted.weekly_volume, sessions.len()))
        } else {
            None
        };

        self.db.save_adaptation(
            &adapted,
            &outcome.snapshots,
            self.config.adaptation.max_history,
            rescaled_session_minutes,
        )?;

        info!(
            plan_id = %adapted.id,
            athlete_id,
            trend = %outcome.overall_trend,
            intensity = %outcome.new_intensity,
            volume = outcome.new_volume,
            dropped_snapshots,
            "Training plan adapted"
        );
        Ok(AdaptedPlan {
            plan: adapted,
            outcome,
            dropped_snapshots,
            rescaled_session_minutes,
        })
    }

    pub fn complete_workout(&self, user_id: &str, workout_id: &str) -> Result<PlanWorkout> {
        self.complete_workout_at(user_id, workout_id, Utc::now())
    }

    pub fn complete_workout_at(
        &self,
        user_id: &str,
        workout_id: &str,
        now: DateTime<Utc>,
    ) -> Result<PlanWorkout> {
        let not_found = || FitAssessError::not_found("workout", workout_id);

        let workout = self.db.find_workout(workout_id)?.ok_or_else(not_found)?;
        let plan = self.db.find_plan(&workout.plan_id)?.ok_or_else(not_found)?;
        self.get_athlete(user_id, &plan.athlete_id)
            .map_err(|_| not_found())?;

        if workout.completed {
            return Err(FitAssessError::validation(format!(
                "workout already completed: {}",
                workout_id
            )));
        }
        self.db.complete_workout(workout_id, now)?;
        debug!(workout_id, plan_id = %plan.id, "Workout completed");

        Ok(PlanWorkout {
            completed: true,
            completed_at: Some(now),
            ..workout
        })
    }

    // ---- Aggregates -----------------------------------------------------

    pub fn leaderboard(&self, filter: &LeaderboardFilter) -> Result<Vec<LeaderboardEntry>> {
        self.leaderboard_as_of(filter, Utc::now().date_naive())
    }

    /// Rank active athletes in a segment, with ages taken on `today`
    pub fn leaderboard_as_of(
        &self,
        filter: &LeaderboardFilter,
        today: NaiveDate,
    ) -> Result<Vec<LeaderboardEntry>> {
        let limit = filter.limit.unwrap_or(self.config.leaderboard.default_limit);
        if limit == 0 {
            return Err(FitAssessError::validation(
                "limit out of range: must be at least 1",
            ));
        }
        let ranking_key = filter
            .ranking_key
            .unwrap_or(self.config.leaderboard.ranking_key);

        let (born_after, born_on_or_before) = match filter.age_group {
            Some(group) => group.birth_date_range(today),
            None => (None, None),
        };
        let query = AthleteQuery {
            sport: filter.sport,
            school: filter.school.clone(),
            club: filter.club.clone(),
            born_after,
            born_on_or_before,
            active_only: true,
        };

        let (athletes, results) = self.db.leaderboard_candidates(&query, filter.test_type)?;
        let entries = rank_athletes(&athletes, &results, filter, ranking_key, limit, today);

        debug!(
            candidates = athletes.len(),
            results = results.len(),
            ranked = entries.len(),
            "Leaderboard computed"
        );
        Ok(entries)
    }

    pub fn dashboard(&self, user_id: &str, athlete_id: &str) -> Result<DashboardSummary> {
        let athlete = self.get_athlete(user_id, athlete_id)?;
        let results = self.db.query_test_results(&TestResultQuery {
            athlete_id: Some(athlete.id.clone()),
            ..TestResultQuery::default()
        })?;

        let plan = self.db.active_plan(&athlete.id)?;
        let workouts = match &plan {
            Some(plan) => self.db.plan_workouts(&plan.id)?,
            None => Vec::new(),
        };

        Ok(DashboardSummary::build(
            &athlete,
            &results,
            plan.as_ref().map(|p| (p, workouts.as_slice())),
            self.config.dashboard.recent_limit,
        ))
    }

    pub fn stats(&self) -> Result<ServiceStats> {
        Ok(ServiceStats {
            database: self.db.get_stats()?,
            by_test_type: self.db.test_type_stats(None)?,
        })
    }
}

fn validate_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(FitAssessError::validation("name required: athlete name is blank"));
    }
    Ok(trimmed.to_string())
}

fn validate_date_of_birth(date_of_birth: NaiveDate, today: NaiveDate) -> Result<()> {
    if date_of_birth > today {
        return Err(FitAssessError::validation(format!(
            "date of birth out of range: {} is in the future",
            date_of_birth
        )));
    }
    Ok(())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
