use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row, TransactionBehavior};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::str::FromStr;

use crate::models::{
    Athlete, GeneratedPlan, PerformanceSnapshot, PlanWorkout, Score, Sport, TestResult, TestType,
    TrainingPlan,
};

/// Database error types
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[source] rusqlite::Error),
    #[error("Database busy: {0}")]
    Busy(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Data not found: {0}")]
    NotFound(String),
    #[error("Integrity check failed: {0}")]
    Integrity(String),
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(failure, _)
                if matches!(
                    failure.code,
                    ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked
                ) =>
            {
                DatabaseError::Busy(err.to_string())
            }
            rusqlite::Error::SqliteFailure(failure, _)
                if failure.code == ErrorCode::ConstraintViolation =>
            {
                DatabaseError::Integrity(err.to_string())
            }
            _ => DatabaseError::Sqlite(err),
        }
    }
}

impl From<serde_json::Error> for DatabaseError {
    fn from(err: serde_json::Error) -> Self {
        DatabaseError::Serialization(err.to_string())
    }
}

/// Athlete filter shared by athlete listings and leaderboard queries
#[derive(Debug, Default, Clone)]
pub struct AthleteQuery {
    pub sport: Option<Sport>,
    pub school: Option<String>,
    pub club: Option<String>,
    /// Exclusive lower bound on date of birth
    pub born_after: Option<NaiveDate>,
    /// Inclusive upper bound on date of birth
    pub born_on_or_before: Option<NaiveDate>,
    pub active_only: bool,
}

/// Test result query filters
#[derive(Debug, Default, Clone)]
pub struct TestResultQuery {
    pub athlete_id: Option<String>,
    pub test_type: Option<TestType>,
    pub since: Option<DateTime<Utc>>,
    pub include_invalid: bool,
    pub limit: Option<usize>,
}

/// Database statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatabaseStats {
    pub athlete_count: usize,
    pub active_athlete_count: usize,
    pub test_result_count: usize,
    pub valid_test_result_count: usize,
    pub plan_count: usize,
    pub active_plan_count: usize,
    pub workout_count: usize,
    pub completed_workout_count: usize,
}

/// Per-test-type aggregate over valid results
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestTypeStats {
    pub test_type: TestType,
    pub count: usize,
    pub average_score: f64,
    pub best_score: f64,
}

// Conditions over the `a` alias of the athletes table; parameters ?1..?6
const ATHLETE_CONDITIONS: &str = r#"
    (?1 IS NULL OR a.sport = ?1)
    AND (?2 IS NULL OR a.school = ?2)
    AND (?3 IS NULL OR a.club = ?3)
    AND (?4 IS NULL OR a.date_of_birth > ?4)
    AND (?5 IS NULL OR a.date_of_birth <= ?5)
    AND (?6 = 0 OR a.is_active = 1)
"#;

const ATHLETE_COLUMNS: &str = "a.id, a.user_id, a.name, a.date_of_birth, a.gender, a.sport, \
    a.school, a.club, a.is_active, a.created_at, a.updated_at";

const RESULT_COLUMNS: &str = "r.id, r.athlete_id, r.user_id, r.test_type, r.started_at, \
    r.completed_at, r.duration, r.repetitions, r.total_reps, r.measured_value, r.raw_score, \
    r.standardized_score, r.percentile, r.grade, r.feedback, r.average_form_score, r.is_valid, \
    r.created_at";

const PLAN_COLUMNS: &str = "id, athlete_id, sport, difficulty, weekly_volume, weekly_intensity, \
    is_active, last_adapted_at, created_at";

const WORKOUT_COLUMNS: &str = "id, plan_id, week_number, day_number, workout_type, title, \
    duration_minutes, exercises, completed, completed_at";

/// Database connection and management
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Create or open a database at the specified path
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self, DatabaseError> {
        let conn = Connection::open(db_path)?;
        let mut db = Self { conn };
        db.conn.pragma_update(None, "journal_mode", "WAL")?;
        db.init_schema()?;
        Ok(db)
    }

    /// Private in-memory database, used by tests and dry runs
    pub fn in_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        let mut db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Initialize database schema with tables and indexes
    fn init_schema(&mut self) -> Result<(), DatabaseError> {
        self.conn.pragma_update(None, "synchronous", "NORMAL")?;
        self.conn.pragma_update(None, "foreign_keys", "ON")?;

        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS athletes (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                name TEXT NOT NULL,
                date_of_birth DATE NOT NULL,
                gender TEXT NOT NULL,
                sport TEXT NOT NULL,
                school TEXT,
                club TEXT,
                is_active BOOLEAN NOT NULL DEFAULT TRUE,
                created_at DATETIME NOT NULL,
                updated_at DATETIME NOT NULL
            );

            CREATE TABLE IF NOT EXISTS test_results (
                id TEXT PRIMARY KEY,
                athlete_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                test_type TEXT NOT NULL,
                started_at DATETIME NOT NULL,
                completed_at DATETIME NOT NULL,
                duration TEXT NOT NULL,
                repetitions TEXT NOT NULL,
                total_reps INTEGER NOT NULL,
                measured_value TEXT,

                -- Score
                raw_score TEXT NOT NULL,
                standardized_score TEXT NOT NULL,
                percentile TEXT,
                grade TEXT NOT NULL,
                feedback TEXT NOT NULL,
                average_form_score TEXT NOT NULL,

                is_valid BOOLEAN NOT NULL DEFAULT TRUE,
                created_at DATETIME NOT NULL,

                FOREIGN KEY (athlete_id) REFERENCES athletes (id)
            );

            CREATE TABLE IF NOT EXISTS training_plans (
                id TEXT PRIMARY KEY,
                athlete_id TEXT NOT NULL,
                sport TEXT NOT NULL,
                difficulty TEXT NOT NULL,
                weekly_volume INTEGER NOT NULL CHECK (weekly_volume > 0),
                weekly_intensity TEXT NOT NULL,
                is_active BOOLEAN NOT NULL DEFAULT TRUE,
                last_adapted_at DATETIME,
                created_at DATETIME NOT NULL,

                FOREIGN KEY (athlete_id) REFERENCES athletes (id)
            );

            CREATE TABLE IF NOT EXISTS plan_workouts (
                id TEXT PRIMARY KEY,
                plan_id TEXT NOT NULL,
                week_number INTEGER NOT NULL CHECK (week_number >= 1),
                day_number INTEGER NOT NULL CHECK (day_number BETWEEN 1 AND 7),
                workout_type TEXT NOT NULL,
                title TEXT NOT NULL,
                duration_minutes INTEGER NOT NULL,
                exercises TEXT NOT NULL,
                completed BOOLEAN NOT NULL DEFAULT FALSE,
                completed_at DATETIME,

                FOREIGN KEY (plan_id) REFERENCES training_plans (id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS performance_snapshots (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                plan_id TEXT NOT NULL,
                date DATETIME NOT NULL,
                test_type TEXT NOT NULL,
                score TEXT NOT NULL,
                percentile TEXT,
                trend TEXT NOT NULL,

                FOREIGN KEY (plan_id) REFERENCES training_plans (id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_athletes_user ON athletes (user_id);
            CREATE INDEX IF NOT EXISTS idx_athletes_segment ON athletes (sport, school, club);
            CREATE INDEX IF NOT EXISTS idx_results_athlete_completed
                ON test_results (athlete_id, completed_at);
            CREATE INDEX IF NOT EXISTS idx_results_type ON test_results (test_type) WHERE is_valid;
            CREATE INDEX IF NOT EXISTS idx_workouts_plan
                ON plan_workouts (plan_id, week_number, day_number);
            CREATE INDEX IF NOT EXISTS idx_snapshots_plan ON performance_snapshots (plan_id, seq);

            -- At most one active plan per athlete
            CREATE UNIQUE INDEX IF NOT EXISTS idx_one_active_plan
                ON training_plans (athlete_id) WHERE is_active;
            "#,
        )?;

        Ok(())
    }

    // ---- Athletes -------------------------------------------------------

    pub fn insert_athlete(&self, athlete: &Athlete) -> Result<(), DatabaseError> {
        self.conn.execute(
            r#"
            INSERT INTO athletes (
                id, user_id, name, date_of_birth, gender, sport, school, club,
                is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
            params![
                athlete.id,
                athlete.user_id,
                athlete.name,
                athlete.date_of_birth,
                athlete.gender.as_str(),
                athlete.sport.as_str(),
                athlete.school,
                athlete.club,
                athlete.is_active,
                athlete.created_at,
                athlete.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Overwrite an athlete's mutable fields; false when the id is unknown
    pub fn update_athlete(&self, athlete: &Athlete) -> Result<bool, DatabaseError> {
        let changed = self.conn.execute(
            r#"
            UPDATE athletes SET
                name = ?2, date_of_birth = ?3, gender = ?4, sport = ?5,
                school = ?6, club = ?7, is_active = ?8, updated_at = ?9
            WHERE id = ?1
            "#,
            params![
                athlete.id,
                athlete.name,
                athlete.date_of_birth,
                athlete.gender.as_str(),
                athlete.sport.as_str(),
                athlete.school,
                athlete.club,
                athlete.is_active,
                athlete.updated_at,
            ],
        )?;
        Ok(changed > 0)
    }

    pub fn find_athlete(&self, athlete_id: &str) -> Result<Option<Athlete>, DatabaseError> {
        let athlete = self
            .conn
            .query_row(
                &format!("SELECT {} FROM athletes a WHERE a.id = ?1", ATHLETE_COLUMNS),
                params![athlete_id],
                athlete_from_row,
            )
            .optional()?;
        Ok(athlete)
    }

    pub fn list_athletes(
        &self,
        user_id: &str,
        include_inactive: bool,
    ) -> Result<Vec<Athlete>, DatabaseError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM athletes a
             WHERE a.user_id = ?1 AND (?2 OR a.is_active)
             ORDER BY a.name, a.id",
            ATHLETE_COLUMNS
        ))?;
        let athletes = stmt
            .query_map(params![user_id, include_inactive], athlete_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(athletes)
    }

    pub fn query_athletes(&self, query: &AthleteQuery) -> Result<Vec<Athlete>, DatabaseError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM athletes a WHERE {} ORDER BY a.id",
            ATHLETE_COLUMNS, ATHLETE_CONDITIONS
        ))?;
        let athletes = stmt
            .query_map(
                params![
                    query.sport.map(|s| s.as_str()),
                    query.school,
                    query.club,
                    query.born_after,
                    query.born_on_or_before,
                    query.active_only,
                ],
                athlete_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(athletes)
    }

    // ---- Test results ---------------------------------------------------

    pub fn insert_test_result(&self, result: &TestResult) -> Result<(), DatabaseError> {
        self.conn.execute(
            r#"
            INSERT INTO test_results (
                id, athlete_id, user_id, test_type, started_at, completed_at, duration,
                repetitions, total_reps, measured_value, raw_score, standardized_score,
                percentile, grade, feedback, average_form_score, is_valid, created_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18
            )
            "#,
            params![
                result.id,
                result.athlete_id,
                result.user_id,
                result.test_type.as_str(),
                result.started_at,
                result.completed_at,
                result.duration.to_string(),
                to_json(&result.repetitions)?,
                result.total_reps,
                result.measured_value.map(|v| v.to_string()),
                result.score.raw_score.to_string(),
                result.score.standardized_score.to_string(),
                result.score.percentile.map(|p| p.to_string()),
                result.score.grade.as_str(),
                to_json(&result.score.feedback)?,
                result.average_form_score.to_string(),
                result.is_valid,
                result.created_at,
            ],
        )?;
        Ok(())
    }

    pub fn find_test_result(&self, result_id: &str) -> Result<Option<TestResult>, DatabaseError> {
        let result = self
            .conn
            .query_row(
                &format!("SELECT {} FROM test_results r WHERE r.id = ?1", RESULT_COLUMNS),
                params![result_id],
                test_result_from_row,
            )
            .optional()?;
        Ok(result)
    }

    /// Soft-delete a result; false when it was already invalid or unknown
    pub fn invalidate_test_result(&self, result_id: &str) -> Result<bool, DatabaseError> {
        let changed = self.conn.execute(
            "UPDATE test_results SET is_valid = FALSE WHERE id = ?1 AND is_valid",
            params![result_id],
        )?;
        Ok(changed > 0)
    }

    /// Results ordered by completion time, oldest first
    pub fn query_test_results(
        &self,
        query: &TestResultQuery,
    ) -> Result<Vec<TestResult>, DatabaseError> {
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {} FROM test_results r
            WHERE (?1 IS NULL OR r.athlete_id = ?1)
              AND (?2 IS NULL OR r.test_type = ?2)
              AND (?3 OR r.is_valid)
            ORDER BY r.completed_at, r.id
            "#,
            RESULT_COLUMNS
        ))?;

        let mut results = stmt
            .query_map(
                params![
                    query.athlete_id,
                    query.test_type.map(|t| t.as_str()),
                    query.include_invalid,
                ],
                test_result_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;

        // Timestamps are compared as values, not as stored text
        if let Some(since) = query.since {
            results.retain(|r| r.completed_at >= since);
        }
        if let Some(limit) = query.limit {
            let skip = results.len().saturating_sub(limit);
            results.drain(..skip);
        }

        Ok(results)
    }

    /// Athletes matching `query` and their valid results of `test_type`
    pub fn leaderboard_candidates(
        &self,
        query: &AthleteQuery,
        test_type: Option<TestType>,
    ) -> Result<(Vec<Athlete>, Vec<TestResult>), DatabaseError> {
        let athletes = self.query_athletes(query)?;

        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {} FROM test_results r
            JOIN athletes a ON a.id = r.athlete_id
            WHERE r.is_valid AND (?7 IS NULL OR r.test_type = ?7) AND {}
            "#,
            RESULT_COLUMNS, ATHLETE_CONDITIONS
        ))?;
        let results = stmt
            .query_map(
                params![
                    query.sport.map(|s| s.as_str()),
                    query.school,
                    query.club,
                    query.born_after,
                    query.born_on_or_before,
                    query.active_only,
                    test_type.map(|t| t.as_str()),
                ],
                test_result_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;

        Ok((athletes, results))
    }

    // ---- Training plans -------------------------------------------------

    /// Store a new active plan and its workouts in one transaction.
    ///
    /// Deactivates the athlete's current active plan first and returns how
    /// many plans were deactivated.
    pub fn create_plan(&mut self, generated: &GeneratedPlan) -> Result<usize, DatabaseError> {
        let plan = &generated.plan;
        if generated.workouts.is_empty() {
            return Err(DatabaseError::Integrity(format!(
                "plan {} has no workouts",
                plan.id
            )));
        }

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let deactivated = tx.execute(
            "UPDATE training_plans SET is_active = FALSE WHERE athlete_id = ?1 AND is_active",
            params![plan.athlete_id],
        )?;

        tx.execute(
            &format!(
                "INSERT INTO training_plans ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                PLAN_COLUMNS
            ),
            params![
                plan.id,
                plan.athlete_id,
                plan.sport.as_str(),
                plan.difficulty.as_str(),
                plan.weekly_volume,
                plan.weekly_intensity.to_string(),
                plan.is_active,
                plan.last_adapted_at,
                plan.created_at,
            ],
        )?;

        {
            let mut insert = tx.prepare(&format!(
                "INSERT INTO plan_workouts ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                WORKOUT_COLUMNS
            ))?;
            for workout in &generated.workouts {
                insert.execute(params![
                    workout.id,
                    workout.plan_id,
                    workout.week_number,
                    workout.day_number,
                    workout.workout_type.as_str(),
                    workout.title,
                    workout.duration_minutes,
                    to_json(&workout.exercises)?,
                    workout.completed,
                    workout.completed_at,
                ])?;
            }
        } // Statement is dropped here

        insert_snapshots(&tx, &plan.id, &plan.performance_history)?;

        tx.commit()?;
        Ok(deactivated)
    }

    pub fn find_plan(&self, plan_id: &str) -> Result<Option<TrainingPlan>, DatabaseError> {
        let plan = self
            .conn
            .query_row(
                &format!("SELECT {} FROM training_plans WHERE id = ?1", PLAN_COLUMNS),
                params![plan_id],
                plan_from_row,
            )
            .optional()?;
        plan.map(|plan| self.with_history(plan)).transpose()
    }

    pub fn active_plan(&self, athlete_id: &str) -> Result<Option<TrainingPlan>, DatabaseError> {
        let plan = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM training_plans WHERE athlete_id = ?1 AND is_active",
                    PLAN_COLUMNS
                ),
                params![athlete_id],
                plan_from_row,
            )
            .optional()?;
        plan.map(|plan| self.with_history(plan)).transpose()
    }

    /// All plans for an athlete, newest first, without history
    pub fn list_plans(&self, athlete_id: &str) -> Result<Vec<TrainingPlan>, DatabaseError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM training_plans WHERE athlete_id = ?1 ORDER BY created_at DESC",
            PLAN_COLUMNS
        ))?;
        let plans = stmt
            .query_map(params![athlete_id], plan_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(plans)
    }

    pub fn plan_workouts(&self, plan_id: &str) -> Result<Vec<PlanWorkout>, DatabaseError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM plan_workouts WHERE plan_id = ?1 ORDER BY week_number, day_number",
            WORKOUT_COLUMNS
        ))?;
        let workouts = stmt
            .query_map(params![plan_id], workout_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(workouts)
    }

    pub fn find_workout(&self, workout_id: &str) -> Result<Option<PlanWorkout>, DatabaseError> {
        let workout = self
            .conn
            .query_row(
                &format!("SELECT {} FROM plan_workouts WHERE id = ?1", WORKOUT_COLUMNS),
                params![workout_id],
                workout_from_row,
            )
            .optional()?;
        Ok(workout)
    }

    /// Mark a workout done; false when it was already completed or unknown
    pub fn complete_workout(
        &self,
        workout_id: &str,
        completed_at: DateTime<Utc>,
    ) -> Result<bool, DatabaseError> {
        let changed = self.conn.execute(
            "UPDATE plan_workouts SET completed = TRUE, completed_at = ?2
             WHERE id = ?1 AND NOT completed",
            params![workout_id, completed_at],
        )?;
        Ok(changed > 0)
    }

    /// Persist an adapted plan in one transaction.
    ///
    /// Updates volume, intensity and adaptation time, appends the new
    /// snapshots, trims history to `max_history`, and rescales open workouts
    /// to `session_minutes` when given. Fails if the plan is no longer active.
    pub fn save_adaptation(
        &mut self,
        plan: &TrainingPlan,
        new_snapshots: &[PerformanceSnapshot],
        max_history: Option<usize>,
        session_minutes: Option<u32>,
    ) -> Result<(), DatabaseError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let updated = tx.execute(
            r#"
            UPDATE training_plans
            SET weekly_volume = ?2, weekly_intensity = ?3, last_adapted_at = ?4
            WHERE id = ?1 AND is_active
            "#,
            params![
                plan.id,
                plan.weekly_volume,
                plan.weekly_intensity.to_string(),
                plan.last_adapted_at,
            ],
        )?;
        if updated == 0 {
            return Err(DatabaseError::NotFound(format!("active plan {}", plan.id)));
        }

        insert_snapshots(&tx, &plan.id, new_snapshots)?;

        if let Some(cap) = max_history {
            tx.execute(
                r#"
                DELETE FROM performance_snapshots
                WHERE plan_id = ?1 AND seq NOT IN (
                    SELECT seq FROM performance_snapshots
                    WHERE plan_id = ?1 ORDER BY seq DESC LIMIT ?2
                )
                "#,
                params![plan.id, cap as i64],
            )?;
        }

        if let Some(minutes) = session_minutes {
            tx.execute(
                "UPDATE plan_workouts SET duration_minutes = ?2
                 WHERE plan_id = ?1 AND NOT completed",
                params![plan.id, minutes],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn with_history(&self, mut plan: TrainingPlan) -> Result<TrainingPlan, DatabaseError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT date, test_type, score, percentile, trend
            FROM performance_snapshots WHERE plan_id = ?1 ORDER BY seq
            "#,
        )?;
        plan.performance_history = stmt
            .query_map(params![plan.id], snapshot_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(plan)
    }

    // ---- Statistics -----------------------------------------------------

    /// Get database statistics
    pub fn get_stats(&self) -> Result<DatabaseStats, DatabaseError> {
        let count = |sql: &str| -> Result<usize, DatabaseError> {
            let n: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
            Ok(n as usize)
        };

        Ok(DatabaseStats {
            athlete_count: count("SELECT COUNT(*) FROM athletes")?,
            active_athlete_count: count("SELECT COUNT(*) FROM athletes WHERE is_active")?,
            test_result_count: count("SELECT COUNT(*) FROM test_results")?,
            valid_test_result_count: count("SELECT COUNT(*) FROM test_results WHERE is_valid")?,
            plan_count: count("SELECT COUNT(*) FROM training_plans")?,
            active_plan_count: count("SELECT COUNT(*) FROM training_plans WHERE is_active")?,
            workout_count: count("SELECT COUNT(*) FROM plan_workouts")?,
            completed_workout_count: count("SELECT COUNT(*) FROM plan_workouts WHERE completed")?,
        })
    }

    /// Count, average and best standardized score per test type
    pub fn test_type_stats(
        &self,
        athlete_id: Option<&str>,
    ) -> Result<Vec<TestTypeStats>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT test_type,
                   COUNT(*) AS count,
                   AVG(CAST(standardized_score AS REAL)) AS average_score,
                   MAX(CAST(standardized_score AS REAL)) AS best_score
            FROM test_results
            WHERE is_valid AND (?1 IS NULL OR athlete_id = ?1)
            GROUP BY test_type
            ORDER BY count DESC, test_type
            "#,
        )?;

        let stats = stmt
            .query_map(params![athlete_id], |row| {
                Ok(TestTypeStats {
                    test_type: parse_text(row, "test_type")?,
                    count: row.get::<_, i64>("count")? as usize,
                    average_score: row.get("average_score")?,
                    best_score: row.get("best_score")?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(stats)
    }
}

fn insert_snapshots(
    conn: &Connection,
    plan_id: &str,
    snapshots: &[PerformanceSnapshot],
) -> Result<(), DatabaseError> {
    let mut stmt = conn.prepare(
        r#"
        INSERT INTO performance_snapshots (plan_id, date, test_type, score, percentile, trend)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )?;
    for snapshot in snapshots {
        stmt.execute(params![
            plan_id,
            snapshot.date,
            snapshot.test_type.as_str(),
            snapshot.score.to_string(),
            snapshot.percentile.map(|p| p.to_string()),
            snapshot.trend.as_str(),
        ])?;
    }
    Ok(())
}

fn to_json<T: Serialize>(value: &T) -> Result<String, DatabaseError> {
    Ok(serde_json::to_string(value)?)
}

fn conversion_error<E>(index: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(err))
}

/// Parse a TEXT column through `FromStr`
fn parse_text<T>(row: &Row, column: &str) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let index = row.as_ref().column_index(column)?;
    let text: String = row.get(index)?;
    text.parse::<T>().map_err(|e| conversion_error(index, e))
}

fn parse_optional_text<T>(row: &Row, column: &str) -> rusqlite::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let index = row.as_ref().column_index(column)?;
    let text: Option<String> = row.get(index)?;
    text.map(|t| t.parse::<T>().map_err(|e| conversion_error(index, e)))
        .transpose()
}

fn json_column<T: DeserializeOwned>(row: &Row, column: &str) -> rusqlite::Result<T> {
    let index = row.as_ref().column_index(column)?;
    let text: String = row.get(index)?;
    serde_json::from_str(&text).map_err(|e| conversion_error(index, e))
}

fn athlete_from_row(row: &Row) -> rusqlite::Result<Athlete> {
    Ok(Athlete {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        name: row.get("name")?,
        date_of_birth: row.get("date_of_birth")?,
        gender: parse_text(row, "gender")?,
        sport: parse_text(row, "sport")?,
        school: row.get("school")?,
        club: row.get("club")?,
        is_active: row.get("is_active")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn test_result_from_row(row: &Row) -> rusqlite::Result<TestResult> {
    Ok(TestResult {
        id: row.get("id")?,
        athlete_id: row.get("athlete_id")?,
        user_id: row.get("user_id")?,
        test_type: parse_text(row, "test_type")?,
        started_at: row.get("started_at")?,
        completed_at: row.get("completed_at")?,
        duration: parse_text::<Decimal>(row, "duration")?,
        repetitions: json_column(row, "repetitions")?,
        total_reps: row.get("total_reps")?,
        measured_value: parse_optional_text(row, "measured_value")?,
        score: Score {
            raw_score: parse_text(row, "raw_score")?,
            standardized_score: parse_text(row, "standardized_score")?,
            percentile: parse_optional_text(row, "percentile")?,
            grade: parse_text(row, "grade")?,
            feedback: json_column(row, "feedback")?,
        },
        average_form_score: parse_text(row, "average_form_score")?,
        is_valid: row.get("is_valid")?,
        created_at: row.get("created_at")?,
    })
}

fn plan_from_row(row: &Row) -> rusqlite::Result<TrainingPlan> {
    Ok(TrainingPlan {
        id: row.get("id")?,
        athlete_id: row.get("athlete_id")?,
        sport: parse_text(row, "sport")?,
        difficulty: parse_text(row, "difficulty")?,
        weekly_volume: row.get("weekly_volume")?,
        weekly_intensity: parse_text(row, "weekly_intensity")?,
        is_active: row.get("is_active")?,
        performance_history: Vec::new(), // Loaded separately
        last_adapted_at: row.get("last_adapted_at")?,
        created_at: row.get("created_at")?,
    })
}

fn workout_from_row(row: &Row) -> rusqlite::Result<PlanWorkout> {
    Ok(PlanWorkout {
        id: row.get("id")?,
        plan_id: row.get("plan_id")?,
        week_number: row.get("week_number")?,
        day_number: row.get("day_number")?,
        workout_type: parse_text(row, "workout_type")?,
        title: row.get("title")?,
        duration_minutes: row.get("duration_minutes")?,
        exercises: json_column(row, "exercises")?,
        completed: row.get("completed")?,
        completed_at: row.get("completed_at")?,
    })
}

fn snapshot_from_row(row: &Row) -> rusqlite::Result<PerformanceSnapshot> {
    Ok(PerformanceSnapshot {
        date: row.get("date")?,
        test_type: parse_text(row, "test_type")?,
        score: parse_text(row, "score")?,
        percentile: parse_optional_text(row, "percentile")?,
        trend: parse_text(row, "trend")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Difficulty, Gender, Grade, RepetitionData, Trend, WorkoutType};
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;
    use std::collections::BTreeSet;
    use tempfile::tempdir;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 9, 10, 18, 30, 0).unwrap()
    }

    fn athlete(id: &str, user_id: &str, dob: NaiveDate) -> Athlete {
        Athlete {
            id: id.to_string(),
            user_id: user_id.to_string(),
            name: format!("Athlete {}", id),
            date_of_birth: dob,
            gender: Gender::Female,
            sport: Sport::Volleyball,
            school: Some("Lakeside".to_string()),
            club: None,
            is_active: true,
            created_at: now(),
            updated_at: now(),
        }
    }

    fn test_result(id: &str, athlete_id: &str, score: Decimal, days_ago: i64) -> TestResult {
        let completed_at = now() - Duration::days(days_ago);
        let mut issues = BTreeSet::new();
        issues.insert("knees_caving".to_string());
        TestResult {
            id: id.to_string(),
            athlete_id: athlete_id.to_string(),
            user_id: "coach".to_string(),
            test_type: TestType::Squats,
            started_at: completed_at - Duration::seconds(45),
            completed_at,
            duration: dec!(45.5),
            repetitions: vec![RepetitionData {
                start_time: dec!(0),
                end_time: dec!(1.8),
                duration: dec!(1.8),
                form_score: dec!(82.5),
                issues,
            }],
            total_reps: 1,
            measured_value: None,
            score: Score {
                raw_score: dec!(1),
                standardized_score: score,
                percentile: Some(dec!(12.5)),
                grade: Grade::F,
                feedback: vec!["Keep going.".to_string()],
            },
            average_form_score: dec!(82.5),
            is_valid: true,
            created_at: completed_at,
        }
    }

    fn generated_plan(id: &str, athlete_id: &str) -> GeneratedPlan {
        let plan = TrainingPlan {
            id: id.to_string(),
            athlete_id: athlete_id.to_string(),
            sport: Sport::Volleyball,
            difficulty: Difficulty::Advanced,
            weekly_volume: 180,
            weekly_intensity: dec!(8),
            is_active: true,
            performance_history: Vec::new(),
            last_adapted_at: None,
            created_at: now(),
        };
        let workouts = (1..=2)
            .map(|day| PlanWorkout {
                id: format!("{}-w{}", id, day),
                plan_id: id.to_string(),
                week_number: 1,
                day_number: day,
                workout_type: WorkoutType::Cardio,
                title: "Cardio Conditioning".to_string(),
                duration_minutes: 90,
                exercises: Vec::new(),
                completed: false,
                completed_at: None,
            })
            .collect();
        GeneratedPlan { plan, workouts }
    }

    #[test]
    fn test_athlete_round_trip_and_update() {
        let db = Database::in_memory().unwrap();
        let mut a = athlete("a1", "coach", NaiveDate::from_ymd_opt(2011, 4, 2).unwrap());
        db.insert_athlete(&a).unwrap();

        let loaded = db.find_athlete("a1").unwrap().unwrap();
        assert_eq!(loaded, a);

        a.club = Some("Spikers".to_string());
        a.is_active = false;
        assert!(db.update_athlete(&a).unwrap());
        let loaded = db.find_athlete("a1").unwrap().unwrap();
        assert_eq!(loaded.club.as_deref(), Some("Spikers"));
        assert!(!loaded.is_active);

        assert!(db.list_athletes("coach", false).unwrap().is_empty());
        assert_eq!(db.list_athletes("coach", true).unwrap().len(), 1);
        assert!(db.find_athlete("missing").unwrap().is_none());
    }

    #[test]
    fn test_athlete_query_by_birth_range() {
        let db = Database::in_memory().unwrap();
        db.insert_athlete(&athlete("old", "c", NaiveDate::from_ymd_opt(2010, 1, 1).unwrap()))
            .unwrap();
        db.insert_athlete(&athlete("edge", "c", NaiveDate::from_ymd_opt(2012, 9, 10).unwrap()))
            .unwrap();
        db.insert_athlete(&athlete("young", "c", NaiveDate::from_ymd_opt(2015, 1, 1).unwrap()))
            .unwrap();

        let query = AthleteQuery {
            born_after: NaiveDate::from_ymd_opt(2010, 9, 10),
            born_on_or_before: NaiveDate::from_ymd_opt(2012, 9, 10),
            active_only: true,
            ..AthleteQuery::default()
        };
        let found = db.query_athletes(&query).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "edge");

        let query = AthleteQuery {
            school: Some("Elsewhere".to_string()),
            ..AthleteQuery::default()
        };
        assert!(db.query_athletes(&query).unwrap().is_empty());
    }

    #[test]
    fn test_result_round_trip_and_soft_delete() {
        let db = Database::in_memory().unwrap();
        db.insert_athlete(&athlete("a1", "coach", NaiveDate::from_ymd_opt(2000, 1, 1).unwrap()))
            .unwrap();
        let result = test_result("r1", "a1", dec!(11.875), 3);
        db.insert_test_result(&result).unwrap();

        let loaded = db.find_test_result("r1").unwrap().unwrap();
        assert_eq!(loaded, result);

        assert!(db.invalidate_test_result("r1").unwrap());
        assert!(!db.invalidate_test_result("r1").unwrap());

        let valid = db
            .query_test_results(&TestResultQuery {
                athlete_id: Some("a1".to_string()),
                ..TestResultQuery::default()
            })
            .unwrap();
        assert!(valid.is_empty());

        let all = db
            .query_test_results(&TestResultQuery {
                athlete_id: Some("a1".to_string()),
                include_invalid: true,
                ..TestResultQuery::default()
            })
            .unwrap();
        assert_eq!(all.len(), 1);
        assert!(!all[0].is_valid);
    }

    #[test]
    fn test_result_query_window_and_limit() {
        let db = Database::in_memory().unwrap();
        db.insert_athlete(&athlete("a1", "coach", NaiveDate::from_ymd_opt(2000, 1, 1).unwrap()))
            .unwrap();
        for (i, days_ago) in [40, 20, 10, 5].iter().enumerate() {
            db.insert_test_result(&test_result(&format!("r{}", i), "a1", dec!(50), *days_ago))
                .unwrap();
        }

        let recent = db
            .query_test_results(&TestResultQuery {
                athlete_id: Some("a1".to_string()),
                since: Some(now() - Duration::days(30)),
                ..TestResultQuery::default()
            })
            .unwrap();
        assert_eq!(
            recent.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(),
            vec!["r1", "r2", "r3"]
        );

        let latest = db
            .query_test_results(&TestResultQuery {
                limit: Some(2),
                ..TestResultQuery::default()
            })
            .unwrap();
        assert_eq!(
            latest.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(),
            vec!["r2", "r3"]
        );
    }

    #[test]
    fn test_create_plan_deactivates_previous() {
        let mut db = Database::in_memory().unwrap();
        db.insert_athlete(&athlete("a1", "coach", NaiveDate::from_ymd_opt(2000, 1, 1).unwrap()))
            .unwrap();

        assert_eq!(db.create_plan(&generated_plan("p1", "a1")).unwrap(), 0);
        assert_eq!(db.create_plan(&generated_plan("p2", "a1")).unwrap(), 1);

        let active = db.active_plan("a1").unwrap().unwrap();
        assert_eq!(active.id, "p2");
        assert!(!db.find_plan("p1").unwrap().unwrap().is_active);
        assert_eq!(db.list_plans("a1").unwrap().len(), 2);
        assert_eq!(db.plan_workouts("p2").unwrap().len(), 2);

        let stats = db.get_stats().unwrap();
        assert_eq!(stats.plan_count, 2);
        assert_eq!(stats.active_plan_count, 1);
        assert_eq!(stats.workout_count, 4);
    }

    #[test]
    fn test_failed_plan_insert_rolls_back() {
        let mut db = Database::in_memory().unwrap();
        db.insert_athlete(&athlete("a1", "coach", NaiveDate::from_ymd_opt(2000, 1, 1).unwrap()))
            .unwrap();
        db.create_plan(&generated_plan("p1", "a1")).unwrap();

        // Second workout violates the day_number check
        let mut broken = generated_plan("p2", "a1");
        broken.workouts[1].day_number = 9;
        assert!(db.create_plan(&broken).is_err());

        let active = db.active_plan("a1").unwrap().unwrap();
        assert_eq!(active.id, "p1");
        assert!(db.find_plan("p2").unwrap().is_none());
        assert!(db.plan_workouts("p2").unwrap().is_empty());
    }

    #[test]
    fn test_save_adaptation_trims_history_and_rescales() {
        let mut db = Database::in_memory().unwrap();
        db.insert_athlete(&athlete("a1", "coach", NaiveDate::from_ymd_opt(2000, 1, 1).unwrap()))
            .unwrap();
        db.create_plan(&generated_plan("p1", "a1")).unwrap();
        assert!(db.complete_workout("p1-w1", now()).unwrap());
        assert!(!db.complete_workout("p1-w1", now()).unwrap());

        let snapshot = |score: Decimal| PerformanceSnapshot {
            date: now(),
            test_type: TestType::Squats,
            score,
            percentile: Some(score),
            trend: Trend::Improving,
        };

        let mut plan = db.active_plan("a1").unwrap().unwrap();
        plan.weekly_volume = 198;
        plan.weekly_intensity = dec!(8.8);
        plan.last_adapted_at = Some(now());
        db.save_adaptation(&plan, &[snapshot(dec!(50)), snapshot(dec!(55))], Some(2), Some(99))
            .unwrap();
        db.save_adaptation(&plan, &[snapshot(dec!(60))], Some(2), None)
            .unwrap();

        let stored = db.find_plan("p1").unwrap().unwrap();
        assert_eq!(stored.weekly_volume, 198);
        assert_eq!(stored.weekly_intensity, dec!(8.8));
        assert_eq!(stored.last_adapted_at, Some(now()));
        assert_eq!(
            stored
                .performance_history
                .iter()
                .map(|s| s.score)
                .collect::<Vec<_>>(),
            vec![dec!(55), dec!(60)]
        );

        let workouts = db.plan_workouts("p1").unwrap();
        assert_eq!(workouts[0].duration_minutes, 90);
        assert!(workouts[0].completed);
        assert_eq!(workouts[1].duration_minutes, 99);
    }

    #[test]
    fn test_save_adaptation_requires_active_plan() {
        let mut db = Database::in_memory().unwrap();
        db.insert_athlete(&athlete("a1", "coach", NaiveDate::from_ymd_opt(2000, 1, 1).unwrap()))
            .unwrap();
        db.create_plan(&generated_plan("p1", "a1")).unwrap();
        let stale = db.find_plan("p1").unwrap().unwrap();
        db.create_plan(&generated_plan("p2", "a1")).unwrap();

        let err = db.save_adaptation(&stale, &[], None, None).unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound(_)));
    }

    #[test]
    fn test_leaderboard_candidates_and_type_stats() {
        let db = Database::in_memory().unwrap();
        db.insert_athlete(&athlete("a1", "coach", NaiveDate::from_ymd_opt(2000, 1, 1).unwrap()))
            .unwrap();
        let mut other = athlete("a2", "coach", NaiveDate::from_ymd_opt(2000, 1, 1).unwrap());
        other.sport = Sport::Tennis;
        db.insert_athlete(&other).unwrap();

        db.insert_test_result(&test_result("r1", "a1", dec!(40), 3)).unwrap();
        db.insert_test_result(&test_result("r2", "a1", dec!(60), 2)).unwrap();
        db.insert_test_result(&test_result("r3", "a2", dec!(90), 2)).unwrap();

        let (athletes, results) = db
            .leaderboard_candidates(
                &AthleteQuery {
                    sport: Some(Sport::Volleyball),
                    active_only: true,
                    ..AthleteQuery::default()
                },
                Some(TestType::Squats),
            )
            .unwrap();
        assert_eq!(athletes.len(), 1);
        assert_eq!(results.len(), 2);

        let stats = db.test_type_stats(Some("a1")).unwrap();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].test_type, TestType::Squats);
        assert_eq!(stats[0].count, 2);
        assert!((stats[0].average_score - 50.0).abs() < 1e-9);
        assert!((stats[0].best_score - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_file_database_persists() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("fitassess.db");
        {
            let db = Database::new(&path).unwrap();
            db.insert_athlete(&athlete("a1", "coach", NaiveDate::from_ymd_opt(2000, 1, 1).unwrap()))
                .unwrap();
        }
        let db = Database::new(&path).unwrap();
        assert!(db.find_athlete("a1").unwrap().is_some());
    }
}
