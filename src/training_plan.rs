use chrono::{DateTime, Utc, Weekday};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{FitAssessError, Result};
use crate::models::{
    day_number, Difficulty, Exercise, GeneratedPlan, PlanWorkout, Sport, TrainingPlan, WorkoutType,
};

/// Weekly intensity assigned to a new plan for each difficulty
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DifficultyIntensity {
    pub beginner: Decimal,
    pub intermediate: Decimal,
    pub advanced: Decimal,
    pub elite: Decimal,
}

impl Default for DifficultyIntensity {
    fn default() -> Self {
        Self {
            beginner: dec!(4),
            intermediate: dec!(6),
            advanced: dec!(8),
            elite: dec!(9),
        }
    }
}

impl DifficultyIntensity {
    pub fn for_difficulty(&self, difficulty: Difficulty) -> Decimal {
        match difficulty {
            Difficulty::Beginner => self.beginner,
            Difficulty::Intermediate => self.intermediate,
            Difficulty::Advanced => self.advanced,
            Difficulty::Elite => self.elite,
        }
    }
}

/// Exercise prescription inside a workout template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseTemplate {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sets: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reps: Option<u32>,
    /// Seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
}

impl ExerciseTemplate {
    fn new(name: &str, sets: Option<u32>, reps: Option<u32>, duration: Option<u32>) -> Self {
        Self {
            name: name.to_string(),
            sets,
            reps,
            duration,
        }
    }

    fn instantiate(&self, intensity: Decimal) -> Exercise {
        Exercise {
            name: self.name.clone(),
            sets: self.sets,
            reps: self.reps,
            duration: self.duration,
            intensity: Some(intensity),
        }
    }
}

/// One slot of the weekly template rotation.
///
/// A `skill` template with no exercises draws them from the sport catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutTemplate {
    pub workout_type: WorkoutType,
    pub title: String,
    #[serde(default)]
    pub exercises: Vec<ExerciseTemplate>,
}

/// Sport-specific skill drills
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SportSkillSet {
    pub sport: Sport,
    pub exercises: Vec<ExerciseTemplate>,
}

/// Plan generation policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanConfig {
    /// Weeks scheduled for every new plan
    pub weeks: u32,

    /// Minutes per week when the request does not specify a volume
    pub default_weekly_volume: u32,

    pub min_weekly_volume: u32,
    pub max_weekly_volume: u32,

    /// Training days when the request does not specify any
    pub default_days: Vec<Weekday>,

    pub intensity: DifficultyIntensity,

    /// Templates assigned to training days in rotation
    pub rotation: Vec<WorkoutTemplate>,

    pub sport_skills: Vec<SportSkillSet>,

    /// Used when a sport has no entry in `sport_skills`
    pub generic_skills: Vec<ExerciseTemplate>,
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            weeks: 4,
            default_weekly_volume: 180,
            min_weekly_volume: 60,
            max_weekly_volume: 1200,
            default_days: vec![Weekday::Mon, Weekday::Wed, Weekday::Fri],
            intensity: DifficultyIntensity::default(),
            rotation: vec![
                WorkoutTemplate {
                    workout_type: WorkoutType::Strength,
                    title: "Strength Training".to_string(),
                    exercises: vec![
                        ExerciseTemplate::new("Squats", Some(3), Some(12), None),
                        ExerciseTemplate::new("Push-ups", Some(3), Some(10), None),
                        ExerciseTemplate::new("Lunges", Some(3), Some(10), None),
                        ExerciseTemplate::new("Plank", Some(3), None, Some(45)),
                    ],
                },
                WorkoutTemplate {
                    workout_type: WorkoutType::Cardio,
                    title: "Cardio Conditioning".to_string(),
                    exercises: vec![
                        ExerciseTemplate::new("Jumping jacks", Some(3), None, Some(60)),
                        ExerciseTemplate::new("Burpees", Some(3), Some(10), None),
                        ExerciseTemplate::new("Mountain climbers", Some(3), None, Some(45)),
                        ExerciseTemplate::new("Interval run", Some(1), None, Some(900)),
                    ],
                },
                WorkoutTemplate {
                    workout_type: WorkoutType::Skill,
                    title: "Sport Skills".to_string(),
                    exercises: Vec::new(),
                },
            ],
            sport_skills: default_sport_skills(),
            generic_skills: vec![
                ExerciseTemplate::new("Agility ladder", Some(4), None, Some(30)),
                ExerciseTemplate::new("Cone drills", Some(4), None, Some(45)),
                ExerciseTemplate::new("Balance holds", Some(3), None, Some(30)),
            ],
        }
    }
}

fn default_sport_skills() -> Vec<SportSkillSet> {
    let skill = |sport, exercises: Vec<ExerciseTemplate>| SportSkillSet { sport, exercises };
    vec![
        skill(
            Sport::Football,
            vec![
                ExerciseTemplate::new("Dribbling through cones", Some(4), None, Some(60)),
                ExerciseTemplate::new("Passing against a wall", Some(3), Some(20), None),
                ExerciseTemplate::new("Shooting practice", Some(3), Some(10), None),
            ],
        ),
        skill(
            Sport::Basketball,
            vec![
                ExerciseTemplate::new("Free throws", Some(5), Some(10), None),
                ExerciseTemplate::new("Crossover dribbles", Some(3), None, Some(60)),
                ExerciseTemplate::new("Defensive slides", Some(4), None, Some(30)),
            ],
        ),
        skill(
            Sport::Athletics,
            vec![
                ExerciseTemplate::new("Sprint starts", Some(6), Some(1), None),
                ExerciseTemplate::new("A-skips", Some(3), None, Some(30)),
                ExerciseTemplate::new("Bounding", Some(3), Some(8), None),
            ],
        ),
        skill(
            Sport::Tennis,
            vec![
                ExerciseTemplate::new("Shadow swings", Some(3), Some(20), None),
                ExerciseTemplate::new("Split-step reactions", Some(4), None, Some(30)),
            ],
        ),
        skill(
            Sport::Swimming,
            vec![
                ExerciseTemplate::new("Streamline holds", Some(3), None, Some(30)),
                ExerciseTemplate::new("Dryland pull-throughs", Some(3), Some(15), None),
            ],
        ),
    ]
}

impl PlanConfig {
    pub fn validate(&self) -> Result<()> {
        if self.weeks == 0 {
            return Err(FitAssessError::Configuration(
                "plan must span at least one week".to_string(),
            ));
        }
        if self.rotation.is_empty() {
            return Err(FitAssessError::Configuration(
                "workout rotation is empty".to_string(),
            ));
        }
        if self.default_days.is_empty() {
            return Err(FitAssessError::Configuration(
                "default training days are empty".to_string(),
            ));
        }
        if !(self.min_weekly_volume <= self.default_weekly_volume
            && self.default_weekly_volume <= self.max_weekly_volume)
        {
            return Err(FitAssessError::Configuration(format!(
                "default weekly volume {} outside [{}, {}]",
                self.default_weekly_volume, self.min_weekly_volume, self.max_weekly_volume
            )));
        }
        Ok(())
    }

    fn skills_for(&self, sport: Sport) -> &[ExerciseTemplate] {
        self.sport_skills
            .iter()
            .find(|set| set.sport == sport)
            .map(|set| set.exercises.as_slice())
            .unwrap_or(self.generic_skills.as_slice())
    }
}

/// Request for a new plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanRequest {
    pub sport: Sport,
    pub difficulty: Difficulty,
    /// Minutes per week
    #[serde(default)]
    pub weekly_volume: Option<u32>,
    #[serde(default)]
    pub available_days: Option<Vec<Weekday>>,
}

/// Builds initial training plans from a request
pub struct PlanGenerator<'a> {
    config: &'a PlanConfig,
}

impl<'a> PlanGenerator<'a> {
    pub fn new(config: &'a PlanConfig) -> Self {
        Self { config }
    }

    /// Generate an active plan with `weeks × days` workouts.
    ///
    /// Deactivating any previous plan is the caller's responsibility.
    pub fn generate(
        &self,
        athlete_id: &str,
        request: &PlanRequest,
        now: DateTime<Utc>,
    ) -> Result<GeneratedPlan> {
        let weekly_volume = request
            .weekly_volume
            .unwrap_or(self.config.default_weekly_volume);
        if weekly_volume < self.config.min_weekly_volume
            || weekly_volume > self.config.max_weekly_volume
        {
            return Err(FitAssessError::validation(format!(
                "weekly volume out of range: {} not in [{}, {}]",
                weekly_volume, self.config.min_weekly_volume, self.config.max_weekly_volume
            )));
        }

        let days = self.training_days(request.available_days.as_deref())?;
        let weekly_intensity = self.config.intensity.for_difficulty(request.difficulty);

        let plan = TrainingPlan {
            id: Uuid::new_v4().to_string(),
            athlete_id: athlete_id.to_string(),
            sport: request.sport,
            difficulty: request.difficulty,
            weekly_volume,
            weekly_intensity,
            is_active: true,
            performance_history: Vec::new(),
            last_adapted_at: None,
            created_at: now,
        };

        let session_minutes = session_duration(weekly_volume, days.len());
        let mut workouts = Vec::with_capacity(days.len() * self.config.weeks as usize);

        for week_number in 1..=self.config.weeks {
            for (day_index, day) in days.iter().enumerate() {
                let template = &self.config.rotation[day_index % self.config.rotation.len()];
                workouts.push(self.build_workout(
                    &plan,
                    template,
                    week_number,
                    *day,
                    session_minutes,
                ));
            }
        }

        Ok(GeneratedPlan { plan, workouts })
    }

    /// Sorted, de-duplicated training days
    fn training_days(&self, requested: Option<&[Weekday]>) -> Result<Vec<Weekday>> {
        let mut days = match requested {
            Some([]) => {
                return Err(FitAssessError::validation(
                    "available days empty: at least one training day is required",
                ))
            }
            Some(days) => days.to_vec(),
            None => self.config.default_days.clone(),
        };
        days.sort_by_key(|day| day.num_days_from_monday());
        days.dedup();
        Ok(days)
    }

    fn build_workout(
        &self,
        plan: &TrainingPlan,
        template: &WorkoutTemplate,
        week_number: u32,
        day: Weekday,
        duration_minutes: u32,
    ) -> PlanWorkout {
        let exercises: &[ExerciseTemplate] =
            if template.workout_type == WorkoutType::Skill && template.exercises.is_empty() {
                self.config.skills_for(plan.sport)
            } else {
                &template.exercises
            };

        PlanWorkout {
            id: Uuid::new_v4().to_string(),
            plan_id: plan.id.clone(),
            week_number,
            day_number: day_number(day),
            workout_type: template.workout_type,
            title: template.title.clone(),
            duration_minutes,
            exercises: exercises
                .iter()
                .map(|exercise| exercise.instantiate(plan.weekly_intensity))
                .collect(),
            completed: false,
            completed_at: None,
        }
    }
}

/// Minutes per session: weekly volume split evenly, rounded down
pub fn session_duration(weekly_volume: u32, sessions_per_week: usize) -> u32 {
    if sessions_per_week == 0 {
        return 0;
    }
    weekly_volume / sessions_per_week as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn request(days: Option<Vec<Weekday>>, volume: Option<u32>) -> PlanRequest {
        PlanRequest {
            sport: Sport::Football,
            difficulty: Difficulty::Intermediate,
            weekly_volume: volume,
            available_days: days,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 9, 2, 8, 0, 0).unwrap()
    }

    #[test]
    fn test_default_plan_generation() {
        let config = PlanConfig::default();
        let generated = PlanGenerator::new(&config)
            .generate("athlete-1", &request(None, None), now())
            .unwrap();

        assert_eq!(generated.plan.weekly_volume, 180);
        assert_eq!(generated.plan.weekly_intensity, dec!(6));
        assert!(generated.plan.is_active);
        assert_eq!(generated.workouts.len(), 12);

        let first_week: Vec<_> = generated
            .workouts
            .iter()
            .filter(|w| w.week_number == 1)
            .collect();
        assert_eq!(
            first_week.iter().map(|w| w.day_number).collect::<Vec<_>>(),
            vec![1, 3, 5]
        );
        assert_eq!(
            first_week.iter().map(|w| w.workout_type).collect::<Vec<_>>(),
            vec![WorkoutType::Strength, WorkoutType::Cardio, WorkoutType::Skill]
        );
        assert!(generated.workouts.iter().all(|w| w.duration_minutes == 60));
    }

    #[test]
    fn test_intensity_by_difficulty() {
        let config = PlanConfig::default();
        let generator = PlanGenerator::new(&config);
        for (difficulty, expected) in [
            (Difficulty::Beginner, dec!(4)),
            (Difficulty::Intermediate, dec!(6)),
            (Difficulty::Advanced, dec!(8)),
            (Difficulty::Elite, dec!(9)),
        ] {
            let mut req = request(None, None);
            req.difficulty = difficulty;
            let generated = generator.generate("a", &req, now()).unwrap();
            assert_eq!(generated.plan.weekly_intensity, expected);
            assert!(generated.workouts[0]
                .exercises
                .iter()
                .all(|e| e.intensity == Some(expected)));
        }
    }

    #[test]
    fn test_rotation_wraps_and_duration_floors() {
        let config = PlanConfig::default();
        let days = vec![
            Weekday::Sat,
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Thu,
            Weekday::Mon,
        ];
        let generated = PlanGenerator::new(&config)
            .generate("a", &request(Some(days), Some(250)), now())
            .unwrap();

        // duplicate Monday dropped: 4 sessions per week
        assert_eq!(generated.workouts.len(), 16);
        let week: Vec<_> = generated
            .workouts
            .iter()
            .filter(|w| w.week_number == 2)
            .collect();
        assert_eq!(
            week.iter().map(|w| w.day_number).collect::<Vec<_>>(),
            vec![1, 2, 4, 6]
        );
        assert_eq!(week[3].workout_type, WorkoutType::Strength);

        // 250 / 4 = 62 (floor), never exceeding the weekly volume
        assert!(week.iter().all(|w| w.duration_minutes == 62));
        assert!(week.iter().map(|w| w.duration_minutes).sum::<u32>() <= 250);
    }

    #[test]
    fn test_sport_specific_skills() {
        let config = PlanConfig::default();
        let generator = PlanGenerator::new(&config);

        let football = generator.generate("a", &request(None, None), now()).unwrap();
        let skill = football
            .workouts
            .iter()
            .find(|w| w.workout_type == WorkoutType::Skill)
            .unwrap();
        assert!(skill.exercises.iter().any(|e| e.name.contains("Dribbling")));

        let mut req = request(None, None);
        req.sport = Sport::Wrestling;
        let wrestling = generator.generate("a", &req, now()).unwrap();
        let skill = wrestling
            .workouts
            .iter()
            .find(|w| w.workout_type == WorkoutType::Skill)
            .unwrap();
        assert_eq!(skill.exercises[0].name, "Agility ladder");
    }

    #[test]
    fn test_invalid_requests() {
        let config = PlanConfig::default();
        let generator = PlanGenerator::new(&config);

        let err = generator
            .generate("a", &request(None, Some(30)), now())
            .unwrap_err();
        assert_eq!(err.reason(), "weekly_volume_out_of_range");

        let err = generator
            .generate("a", &request(None, Some(1201)), now())
            .unwrap_err();
        assert_eq!(err.reason(), "weekly_volume_out_of_range");

        let err = generator
            .generate("a", &request(Some(Vec::new()), None), now())
            .unwrap_err();
        assert_eq!(err.reason(), "available_days_empty");
    }

    #[test]
    fn test_session_duration() {
        assert_eq!(session_duration(180, 3), 60);
        assert_eq!(session_duration(200, 3), 66);
        assert_eq!(session_duration(180, 0), 0);
    }

    #[test]
    fn test_config_validation() {
        assert!(PlanConfig::default().validate().is_ok());
        let config = PlanConfig {
            rotation: Vec::new(),
            ..PlanConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
