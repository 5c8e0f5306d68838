use chrono::{DateTime, Datelike, Months, NaiveDate, Utc, Weekday};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Error returned when a stored or user-supplied label does not name a known variant
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown {kind}: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

/// Implements `as_str`, `Display`, `FromStr` and `ALL` for a fieldless enum,
/// using the same snake_case labels serde uses.
macro_rules! labelled_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $label:literal),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let normalized = s.trim().to_lowercase().replace('-', "_");
                match normalized.as_str() {
                    $($label => Ok($name::$variant),)+
                    _ => Err(ParseEnumError {
                        kind: $kind,
                        value: s.to_string(),
                    }),
                }
            }
        }
    };
}

/// Fitness tests supported by the assessment app
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestType {
    Squats,
    PushUps,
    SitUps,
    PullUps,
    Burpees,
    JumpingJacks,
    Lunges,
    MountainClimbers,
    Plank,
    WallSit,
    Balance,
    VerticalJump,
    BroadJump,
    SitAndReach,
    #[serde(rename = "sprint_20m")]
    Sprint20m,
    ShuttleRun,
}

labelled_enum!(TestType, "test type", {
    Squats => "squats",
    PushUps => "push_ups",
    SitUps => "sit_ups",
    PullUps => "pull_ups",
    Burpees => "burpees",
    JumpingJacks => "jumping_jacks",
    Lunges => "lunges",
    MountainClimbers => "mountain_climbers",
    Plank => "plank",
    WallSit => "wall_sit",
    Balance => "balance",
    VerticalJump => "vertical_jump",
    BroadJump => "broad_jump",
    SitAndReach => "sit_and_reach",
    Sprint20m => "sprint_20m",
    ShuttleRun => "shuttle_run",
});

/// What a test measures as its raw performance value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// Number of completed repetitions
    Reps,
    /// Seconds a position was held
    Hold,
    /// Distance reached in centimeters
    Distance,
    /// Seconds to complete a course (lower is better)
    Time,
}

impl TestType {
    pub fn metric(&self) -> MetricKind {
        match self {
            TestType::Squats
            | TestType::PushUps
            | TestType::SitUps
            | TestType::PullUps
            | TestType::Burpees
            | TestType::JumpingJacks
            | TestType::Lunges
            | TestType::MountainClimbers => MetricKind::Reps,
            TestType::Plank | TestType::WallSit | TestType::Balance => MetricKind::Hold,
            TestType::VerticalJump | TestType::BroadJump | TestType::SitAndReach => {
                MetricKind::Distance
            }
            TestType::Sprint20m | TestType::ShuttleRun => MetricKind::Time,
        }
    }

    /// Canned coaching tip shown with every result of this test
    pub fn tip(&self) -> &'static str {
        match self {
            TestType::Squats => "Keep your heels planted and push your knees out as you descend.",
            TestType::PushUps => {
                "Hold a straight line from head to heels and lower your chest to fist height."
            }
            TestType::SitUps => "Anchor your feet and avoid pulling on your neck.",
            TestType::PullUps => {
                "Start each rep from a dead hang and bring your chin over the bar."
            }
            TestType::Burpees => "Land softly from the jump and keep your core tight in the plank.",
            TestType::JumpingJacks => {
                "Stay light on the balls of your feet and fully extend your arms."
            }
            TestType::Lunges => "Keep your front knee over your ankle and your torso upright.",
            TestType::MountainClimbers => {
                "Keep your hips level with your shoulders while driving the knees."
            }
            TestType::Plank => "Squeeze your glutes and keep your hips from sagging.",
            TestType::WallSit => {
                "Keep your thighs parallel to the floor and your back flat on the wall."
            }
            TestType::Balance => "Fix your gaze on a point ahead and engage your core.",
            TestType::VerticalJump => "Use a quick counter-movement and swing your arms upward.",
            TestType::BroadJump => "Drive your arms forward and land with both feet together.",
            TestType::SitAndReach => "Exhale as you reach and keep your knees straight.",
            TestType::Sprint20m => "Lean forward in the first steps and pump your arms hard.",
            TestType::ShuttleRun => "Lower your center of gravity before each turn.",
        }
    }
}

/// Athlete gender as used for normative segmentation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Other,
}

labelled_enum!(Gender, "gender", {
    Male => "male",
    Female => "female",
    Other => "other",
});

/// Sports in the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sport {
    Football,
    Basketball,
    Volleyball,
    Athletics,
    Swimming,
    Tennis,
    Cricket,
    Hockey,
    Wrestling,
    Gymnastics,
    General,
}

labelled_enum!(Sport, "sport", {
    Football => "football",
    Basketball => "basketball",
    Volleyball => "volleyball",
    Athletics => "athletics",
    Swimming => "swimming",
    Tennis => "tennis",
    Cricket => "cricket",
    Hockey => "hockey",
    Wrestling => "wrestling",
    Gymnastics => "gymnastics",
    General => "general",
});

/// Age groups used for both normative lookup and leaderboard segmentation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgeGroup {
    U12,
    U14,
    U16,
    U18,
    U20,
    #[serde(rename = "adult")]
    Adult,
}

impl AgeGroup {
    pub const ALL: &'static [AgeGroup] = &[
        AgeGroup::U12,
        AgeGroup::U14,
        AgeGroup::U16,
        AgeGroup::U18,
        AgeGroup::U20,
        AgeGroup::Adult,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgeGroup::U12 => "U12",
            AgeGroup::U14 => "U14",
            AgeGroup::U16 => "U16",
            AgeGroup::U18 => "U18",
            AgeGroup::U20 => "U20",
            AgeGroup::Adult => "adult",
        }
    }

    /// Half-open age range `[min, max)` in whole years
    pub fn age_range(&self) -> (u32, Option<u32>) {
        match self {
            AgeGroup::U12 => (0, Some(12)),
            AgeGroup::U14 => (12, Some(14)),
            AgeGroup::U16 => (14, Some(16)),
            AgeGroup::U18 => (16, Some(18)),
            AgeGroup::U20 => (18, Some(20)),
            AgeGroup::Adult => (20, None),
        }
    }

    pub fn from_age(age: u32) -> Self {
        match age {
            0..=11 => AgeGroup::U12,
            12..=13 => AgeGroup::U14,
            14..=15 => AgeGroup::U16,
            16..=17 => AgeGroup::U18,
            18..=19 => AgeGroup::U20,
            _ => AgeGroup::Adult,
        }
    }

    /// Date-of-birth range for this group as of `today`.
    ///
    /// Returns `(born_after, born_on_or_before)`: an athlete belongs to the
    /// group when `born_after < dob <= born_on_or_before`. Either bound may be
    /// open.
    pub fn birth_date_range(&self, today: NaiveDate) -> (Option<NaiveDate>, Option<NaiveDate>) {
        let (min_age, max_age) = self.age_range();
        let latest = if min_age == 0 {
            None
        } else {
            today.checked_sub_months(Months::new(12 * min_age))
        };
        let earliest = max_age.and_then(|max| today.checked_sub_months(Months::new(12 * max)));
        (earliest, latest)
    }
}

impl fmt::Display for AgeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgeGroup {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "u12" => Ok(AgeGroup::U12),
            "u14" => Ok(AgeGroup::U14),
            "u16" => Ok(AgeGroup::U16),
            "u18" => Ok(AgeGroup::U18),
            "u20" => Ok(AgeGroup::U20),
            "adult" | "senior" => Ok(AgeGroup::Adult),
            _ => Err(ParseEnumError {
                kind: "age group",
                value: s.to_string(),
            }),
        }
    }
}

/// Whole years between `date_of_birth` and `on`
pub fn age_on(date_of_birth: NaiveDate, on: NaiveDate) -> u32 {
    let mut age = on.year() - date_of_birth.year();
    if (on.month(), on.day()) < (date_of_birth.month(), date_of_birth.day()) {
        age -= 1;
    }
    age.max(0) as u32
}

/// Letter grade derived from a percentile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    pub const ALL: &'static [Grade] = &[Grade::A, Grade::B, Grade::C, Grade::D, Grade::F];

    /// 80–100 → A, 60–79 → B, 40–59 → C, 20–39 → D, 0–19 → F
    pub fn from_percentile(percentile: Decimal) -> Self {
        if percentile >= dec!(80) {
            Grade::A
        } else if percentile >= dec!(60) {
            Grade::B
        } else if percentile >= dec!(40) {
            Grade::C
        } else if percentile >= dec!(20) {
            Grade::D
        } else {
            Grade::F
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Grade {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "A" => Ok(Grade::A),
            "B" => Ok(Grade::B),
            "C" => Ok(Grade::C),
            "D" => Ok(Grade::D),
            "F" => Ok(Grade::F),
            _ => Err(ParseEnumError {
                kind: "grade",
                value: s.to_string(),
            }),
        }
    }
}

/// Athlete profile owned by an app user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Athlete {
    pub id: String,

    /// Owning user account
    pub user_id: String,

    pub name: String,
    pub date_of_birth: NaiveDate,
    pub gender: Gender,
    pub sport: Sport,
    pub school: Option<String>,
    pub club: Option<String>,

    /// Soft-delete flag; inactive athletes are hidden from leaderboards
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Athlete {
    pub fn age_on(&self, date: NaiveDate) -> u32 {
        age_on(self.date_of_birth, date)
    }

    pub fn age_group_on(&self, date: NaiveDate) -> AgeGroup {
        AgeGroup::from_age(self.age_on(date))
    }
}

/// Input for creating an athlete
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAthlete {
    pub name: String,
    pub date_of_birth: NaiveDate,
    pub gender: Gender,
    pub sport: Sport,
    #[serde(default)]
    pub school: Option<String>,
    #[serde(default)]
    pub club: Option<String>,
}

/// Partial update of an athlete profile; `None` leaves a field untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AthleteUpdate {
    pub name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub sport: Option<Sport>,
    pub school: Option<Option<String>>,
    pub club: Option<Option<String>>,
}

/// Timing and form of a single repetition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepetitionData {
    /// Seconds from test start
    pub start_time: Decimal,
    pub end_time: Decimal,
    /// Seconds
    pub duration: Decimal,
    /// Form quality in [0, 100]
    pub form_score: Decimal,
    #[serde(default)]
    pub issues: BTreeSet<String>,
}

/// Scoring outcome stored with a test result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub raw_score: Decimal,
    pub standardized_score: Decimal,
    pub percentile: Option<Decimal>,
    pub grade: Grade,
    pub feedback: Vec<String>,
}

/// A submitted and scored fitness test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub id: String,
    pub athlete_id: String,
    pub user_id: String,
    pub test_type: TestType,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,

    /// Test duration in seconds
    pub duration: Decimal,

    pub repetitions: Vec<RepetitionData>,
    pub total_reps: u32,

    /// Distance (cm) or time (s) for tests not measured in reps or holds
    pub measured_value: Option<Decimal>,

    pub score: Score,
    pub average_form_score: Decimal,

    /// Soft-delete flag
    pub is_valid: bool,

    pub created_at: DateTime<Utc>,
}

/// Raw test data as submitted by the mobile client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSubmission {
    pub test_type: TestType,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    /// Defaults to `completed_at - started_at`
    #[serde(default)]
    pub duration: Option<Decimal>,
    #[serde(default)]
    pub repetitions: Vec<RepetitionData>,
    /// Defaults to the number of repetitions
    #[serde(default)]
    pub total_reps: Option<u32>,
    #[serde(default)]
    pub measured_value: Option<Decimal>,
}

/// Plan difficulty levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
    Elite,
}

labelled_enum!(Difficulty, "difficulty", {
    Beginner => "beginner",
    Intermediate => "intermediate",
    Advanced => "advanced",
    Elite => "elite",
});

/// Workout categories for scheduled plan sessions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkoutType {
    Strength,
    Cardio,
    Flexibility,
    Skill,
    Recovery,
}

labelled_enum!(WorkoutType, "workout type", {
    Strength => "strength",
    Cardio => "cardio",
    Flexibility => "flexibility",
    Skill => "skill",
    Recovery => "recovery",
});

/// Direction of an athlete's recent performance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Improving,
    Stable,
    Declining,
}

labelled_enum!(Trend, "trend", {
    Improving => "improving",
    Stable => "stable",
    Declining => "declining",
});

/// A prescribed exercise inside a plan workout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    pub name: String,
    pub sets: Option<u32>,
    pub reps: Option<u32>,
    /// Seconds
    pub duration: Option<u32>,
    /// 1–10 scale
    pub intensity: Option<Decimal>,
}

/// One scheduled session of a training plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanWorkout {
    pub id: String,
    pub plan_id: String,
    pub week_number: u32,
    /// 1 = Monday … 7 = Sunday
    pub day_number: u32,
    pub workout_type: WorkoutType,
    pub title: String,
    pub duration_minutes: u32,
    pub exercises: Vec<Exercise>,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Historical record of one test type's score and trend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSnapshot {
    pub date: DateTime<Utc>,
    pub test_type: TestType,
    pub score: Decimal,
    pub percentile: Option<Decimal>,
    pub trend: Trend,
}

/// Training plan header; workouts are stored separately
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingPlan {
    pub id: String,
    pub athlete_id: String,
    pub sport: Sport,
    pub difficulty: Difficulty,

    /// Minutes per week, within [60, 1200]
    pub weekly_volume: u32,

    /// 1–10 scale
    pub weekly_intensity: Decimal,

    pub is_active: bool,
    pub performance_history: Vec<PerformanceSnapshot>,
    pub last_adapted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// A plan together with its scheduled workouts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedPlan {
    pub plan: TrainingPlan,
    pub workouts: Vec<PlanWorkout>,
}

/// ISO day number (Monday = 1) for a weekday
pub fn day_number(day: Weekday) -> u32 {
    day.number_from_monday()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_test_type_labels() {
        assert_eq!(TestType::ALL.len(), 16);
        for test_type in TestType::ALL {
            let json = serde_json::to_string(test_type).unwrap();
            assert_eq!(json, format!("\"{}\"", test_type.as_str()));
            assert_eq!(test_type.as_str().parse::<TestType>().unwrap(), *test_type);
        }
        assert_eq!("push-ups".parse::<TestType>().unwrap(), TestType::PushUps);
        assert!("yoga".parse::<TestType>().is_err());
    }

    #[test]
    fn test_metric_kinds() {
        assert_eq!(TestType::Squats.metric(), MetricKind::Reps);
        assert_eq!(TestType::Plank.metric(), MetricKind::Hold);
        assert_eq!(TestType::BroadJump.metric(), MetricKind::Distance);
        assert_eq!(TestType::Sprint20m.metric(), MetricKind::Time);
    }

    #[test]
    fn test_grade_bands() {
        assert_eq!(Grade::from_percentile(dec!(100)), Grade::A);
        assert_eq!(Grade::from_percentile(dec!(80)), Grade::A);
        assert_eq!(Grade::from_percentile(dec!(79.9)), Grade::B);
        assert_eq!(Grade::from_percentile(dec!(60)), Grade::B);
        assert_eq!(Grade::from_percentile(dec!(59)), Grade::C);
        assert_eq!(Grade::from_percentile(dec!(40)), Grade::C);
        assert_eq!(Grade::from_percentile(dec!(39)), Grade::D);
        assert_eq!(Grade::from_percentile(dec!(20)), Grade::D);
        assert_eq!(Grade::from_percentile(dec!(19.99)), Grade::F);
        assert_eq!(Grade::from_percentile(dec!(0)), Grade::F);
    }

    #[test]
    fn test_age_on_birthday_boundary() {
        let dob = NaiveDate::from_ymd_opt(2012, 6, 15).unwrap();
        assert_eq!(age_on(dob, NaiveDate::from_ymd_opt(2024, 6, 14).unwrap()), 11);
        assert_eq!(age_on(dob, NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()), 12);
        assert_eq!(age_on(dob, NaiveDate::from_ymd_opt(2011, 1, 1).unwrap()), 0);
    }

    #[test]
    fn test_age_group_birth_range_matches_age() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        let (after, on_or_before) = AgeGroup::U14.birth_date_range(today);
        assert_eq!(after, NaiveDate::from_ymd_opt(2012, 3, 10));
        assert_eq!(on_or_before, NaiveDate::from_ymd_opt(2014, 3, 10));

        // Youngest and oldest members of the group
        let youngest = NaiveDate::from_ymd_opt(2014, 3, 10).unwrap();
        let oldest = NaiveDate::from_ymd_opt(2012, 3, 11).unwrap();
        assert_eq!(AgeGroup::from_age(age_on(youngest, today)), AgeGroup::U14);
        assert_eq!(AgeGroup::from_age(age_on(oldest, today)), AgeGroup::U14);

        let (after, on_or_before) = AgeGroup::Adult.birth_date_range(today);
        assert!(after.is_none());
        assert_eq!(on_or_before, NaiveDate::from_ymd_opt(2006, 3, 10));

        let (after, on_or_before) = AgeGroup::U12.birth_date_range(today);
        assert_eq!(after, NaiveDate::from_ymd_opt(2014, 3, 10));
        assert!(on_or_before.is_none());
    }

    #[test]
    fn test_age_group_parsing() {
        assert_eq!("u16".parse::<AgeGroup>().unwrap(), AgeGroup::U16);
        assert_eq!("Adult".parse::<AgeGroup>().unwrap(), AgeGroup::Adult);
        assert!("u13".parse::<AgeGroup>().is_err());
        assert_eq!(serde_json::to_string(&AgeGroup::Adult).unwrap(), "\"adult\"");
    }

    #[test]
    fn test_day_number() {
        assert_eq!(day_number(Weekday::Mon), 1);
        assert_eq!(day_number(Weekday::Sun), 7);
    }
}
