//! Leaderboards by sport, age group, school, club and test type

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::models::{AgeGroup, Athlete, Sport, TestResult, TestType};

/// Which per-result metric an athlete is ranked by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankingKey {
    #[default]
    StandardizedScore,
    AverageFormScore,
}

impl RankingKey {
    pub fn value_of(&self, result: &TestResult) -> Decimal {
        match self {
            RankingKey::StandardizedScore => result.score.standardized_score,
            RankingKey::AverageFormScore => result.average_form_score,
        }
    }
}

impl std::str::FromStr for RankingKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "standardized_score" | "score" => Ok(RankingKey::StandardizedScore),
            "average_form_score" | "form" => Ok(RankingKey::AverageFormScore),
            _ => Err(format!("Invalid ranking key: {}", s)),
        }
    }
}

/// Leaderboard defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeaderboardConfig {
    pub default_limit: usize,
    pub ranking_key: RankingKey,
}

impl Default for LeaderboardConfig {
    fn default() -> Self {
        Self {
            default_limit: 10,
            ranking_key: RankingKey::StandardizedScore,
        }
    }
}

/// Segment filter; unset fields match everyone
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LeaderboardFilter {
    pub sport: Option<Sport>,
    pub age_group: Option<AgeGroup>,
    pub school: Option<String>,
    pub club: Option<String>,
    pub test_type: Option<TestType>,
    pub limit: Option<usize>,
    pub ranking_key: Option<RankingKey>,
}

impl LeaderboardFilter {
    /// Demographic and organisation match for an active athlete
    pub fn matches_athlete(&self, athlete: &Athlete, today: NaiveDate) -> bool {
        athlete.is_active
            && self.sport.map_or(true, |sport| athlete.sport == sport)
            && self
                .age_group
                .map_or(true, |group| athlete.age_group_on(today) == group)
            && self
                .school
                .as_deref()
                .map_or(true, |school| athlete.school.as_deref() == Some(school))
            && self
                .club
                .as_deref()
                .map_or(true, |club| athlete.club.as_deref() == Some(club))
    }

    pub fn matches_result(&self, result: &TestResult) -> bool {
        result.is_valid && self.test_type.map_or(true, |t| result.test_type == t)
    }
}

/// One ranked row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub athlete_id: String,
    pub athlete_name: String,
    pub sport: Sport,
    pub school: Option<String>,
    pub club: Option<String>,
    pub best_score: Decimal,
    pub test_type: TestType,
    pub result_id: String,
    pub achieved_at: DateTime<Utc>,
}

/// Rank athletes by their best qualifying result.
///
/// Ties on score go to the result completed first, then to the lower
/// athlete id. Ranks are positions 1..N after truncation to `limit`.
pub fn rank_athletes(
    athletes: &[Athlete],
    results: &[TestResult],
    filter: &LeaderboardFilter,
    ranking_key: RankingKey,
    limit: usize,
    today: NaiveDate,
) -> Vec<LeaderboardEntry> {
    let eligible: HashMap<&str, &Athlete> = athletes
        .iter()
        .filter(|athlete| filter.matches_athlete(athlete, today))
        .map(|athlete| (athlete.id.as_str(), athlete))
        .collect();

    let mut best: HashMap<&str, &TestResult> = HashMap::new();
    for result in results.iter().filter(|r| filter.matches_result(r)) {
        if !eligible.contains_key(result.athlete_id.as_str()) {
            continue;
        }
        best.entry(result.athlete_id.as_str())
            .and_modify(|current| {
                if outranks(ranking_key, result, *current) {
                    *current = result;
                }
            })
            .or_insert(result);
    }

    let mut ranked: Vec<(&Athlete, &TestResult)> = best
        .into_iter()
        .filter_map(|(athlete_id, result)| eligible.get(athlete_id).map(|a| (*a, result)))
        .collect();

    ranked.sort_by(|(a_athlete, a_result), (b_athlete, b_result)| {
        ranking_key
            .value_of(b_result)
            .cmp(&ranking_key.value_of(a_result))
            .then(a_result.completed_at.cmp(&b_result.completed_at))
            .then(a_athlete.id.cmp(&b_athlete.id))
    });
    ranked.truncate(limit);

    ranked
        .into_iter()
        .enumerate()
        .map(|(index, (athlete, result))| LeaderboardEntry {
            rank: index + 1,
            athlete_id: athlete.id.clone(),
            athlete_name: athlete.name.clone(),
            sport: athlete.sport,
            school: athlete.school.clone(),
            club: athlete.club.clone(),
            best_score: ranking_key.value_of(result),
            test_type: result.test_type,
            result_id: result.id.clone(),
            achieved_at: result.completed_at,
        })
        .collect()
}

/// Higher value wins; equal values go to the earlier result
fn outranks(key: RankingKey, candidate: &TestResult, current: &TestResult) -> bool {
    let (candidate_value, current_value) = (key.value_of(candidate), key.value_of(current));
    candidate_value > current_value
        || (candidate_value == current_value && candidate.completed_at < current.completed_at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Gender, Grade, Score};
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 9, 1).unwrap()
    }

    fn athlete(id: &str, age_years: i32, sport: Sport, school: Option<&str>) -> Athlete {
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Athlete {
            id: id.to_string(),
            user_id: "coach".to_string(),
            name: format!("Athlete {}", id),
            date_of_birth: NaiveDate::from_ymd_opt(2024 - age_years, 3, 1).unwrap(),
            gender: Gender::Female,
            sport,
            school: school.map(str::to_string),
            club: None,
            is_active: true,
            created_at: created,
            updated_at: created,
        }
    }

    fn rank(
        athletes: &[Athlete],
        results: &[TestResult],
        filter: &LeaderboardFilter,
        limit: usize,
    ) -> Vec<LeaderboardEntry> {
        rank_athletes(athletes, results, filter, RankingKey::StandardizedScore, limit, today())
    }

    fn result(
        athlete_id: &str,
        test_type: TestType,
        score: Decimal,
        form: Decimal,
        day: u32,
    ) -> TestResult {
        let completed_at = Utc.with_ymd_and_hms(2024, 8, day, 9, 0, 0).unwrap();
        TestResult {
            id: format!("{}-{}-{}", athlete_id, test_type, day),
            athlete_id: athlete_id.to_string(),
            user_id: "coach".to_string(),
            test_type,
            started_at: completed_at - Duration::minutes(2),
            completed_at,
            duration: dec!(120),
            repetitions: Vec::new(),
            total_reps: 20,
            measured_value: None,
            score: Score {
                raw_score: dec!(20),
                standardized_score: score,
                percentile: Some(score),
                grade: Grade::from_percentile(score),
                feedback: Vec::new(),
            },
            average_form_score: form,
            is_valid: true,
            created_at: completed_at,
        }
    }

    #[test]
    fn test_best_score_ranking() {
        let athletes = vec![
            athlete("a", 13, Sport::Football, None),
            athlete("b", 13, Sport::Football, None),
            athlete("c", 13, Sport::Football, None),
        ];
        let results = vec![
            result("a", TestType::Squats, dec!(40), dec!(90), 1),
            result("a", TestType::Squats, dec!(70), dec!(60), 5),
            result("b", TestType::Squats, dec!(80), dec!(70), 2),
            result("c", TestType::Squats, dec!(30), dec!(95), 3),
        ];

        let board = rank_athletes(
            &athletes,
            &results,
            &LeaderboardFilter::default(),
            RankingKey::StandardizedScore,
            10,
            today(),
        );

        assert_eq!(
            board.iter().map(|e| e.athlete_id.as_str()).collect::<Vec<_>>(),
            vec!["b", "a", "c"]
        );
        assert_eq!(board.iter().map(|e| e.rank).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(board[1].best_score, dec!(70));
    }

    #[test]
    fn test_rank_by_form_score() {
        let athletes = vec![
            athlete("a", 13, Sport::Football, None),
            athlete("c", 13, Sport::Football, None),
        ];
        let results = vec![
            result("a", TestType::Squats, dec!(70), dec!(60), 5),
            result("c", TestType::Squats, dec!(30), dec!(95), 3),
        ];

        let board = rank_athletes(
            &athletes,
            &results,
            &LeaderboardFilter::default(),
            RankingKey::AverageFormScore,
            10,
            today(),
        );
        assert_eq!(board[0].athlete_id, "c");
        assert_eq!(board[0].best_score, dec!(95));
    }

    #[test]
    fn test_age_group_and_segment_filters() {
        let athletes = vec![
            athlete("u14", 13, Sport::Football, Some("North High")),
            athlete("u16", 15, Sport::Football, Some("North High")),
            athlete("u14-other-school", 12, Sport::Football, Some("South High")),
            athlete("u14-basket", 13, Sport::Basketball, Some("North High")),
        ];
        let results: Vec<_> = athletes
            .iter()
            .enumerate()
            .map(|(i, a)| {
                result(&a.id, TestType::PushUps, dec!(50) + Decimal::from(i), dec!(80), 1)
            })
            .collect();

        let filter = LeaderboardFilter {
            age_group: Some(AgeGroup::U14),
            ..LeaderboardFilter::default()
        };
        let board = rank(&athletes, &results, &filter, 10);
        assert_eq!(
            board.iter().map(|e| e.athlete_id.as_str()).collect::<Vec<_>>(),
            vec!["u14-basket", "u14-other-school", "u14"]
        );

        let filter = LeaderboardFilter {
            age_group: Some(AgeGroup::U14),
            sport: Some(Sport::Football),
            school: Some("North High".to_string()),
            ..LeaderboardFilter::default()
        };
        let board = rank(&athletes, &results, &filter, 10);
        assert_eq!(board.len(), 1);
        assert_eq!(board[0].athlete_id, "u14");
    }

    #[test]
    fn test_test_type_filter_and_invalid_results() {
        let athletes = vec![
            athlete("a", 17, Sport::Athletics, None),
            athlete("b", 17, Sport::Athletics, None),
        ];
        let mut deleted = result("a", TestType::Plank, dec!(99), dec!(99), 4);
        deleted.is_valid = false;
        let results = vec![
            deleted,
            result("a", TestType::Plank, dec!(45), dec!(70), 2),
            result("b", TestType::Squats, dec!(90), dec!(90), 2),
        ];

        let filter = LeaderboardFilter {
            test_type: Some(TestType::Plank),
            ..LeaderboardFilter::default()
        };
        let board = rank(&athletes, &results, &filter, 10);
        assert_eq!(board.len(), 1);
        assert_eq!(board[0].best_score, dec!(45));

        // Across all test types athlete b leads
        let board = rank(&athletes, &results, &LeaderboardFilter::default(), 10);
        assert_eq!(board[0].athlete_id, "b");
        assert_eq!(board[1].best_score, dec!(45));
    }

    #[test]
    fn test_ties_and_limit() {
        let athletes: Vec<_> = ["d", "c", "b", "a"]
            .iter()
            .map(|id| athlete(id, 25, Sport::Tennis, None))
            .collect();
        let results = vec![
            result("d", TestType::Squats, dec!(60), dec!(80), 3),
            result("c", TestType::Squats, dec!(60), dec!(80), 1),
            result("b", TestType::Squats, dec!(60), dec!(80), 1),
            result("a", TestType::Squats, dec!(50), dec!(80), 1),
        ];

        let board = rank(&athletes, &results, &LeaderboardFilter::default(), 3);
        assert_eq!(
            board.iter().map(|e| e.athlete_id.as_str()).collect::<Vec<_>>(),
            vec!["b", "c", "d"]
        );
        assert_eq!(board.last().unwrap().rank, 3);
    }

    #[test]
    fn test_inactive_athletes_excluded() {
        let mut inactive = athlete("a", 30, Sport::Hockey, None);
        inactive.is_active = false;
        let athletes = vec![inactive, athlete("b", 30, Sport::Hockey, None)];
        let results = vec![
            result("a", TestType::Squats, dec!(99), dec!(99), 1),
            result("b", TestType::Squats, dec!(10), dec!(99), 1),
        ];

        let board = rank(&athletes, &results, &LeaderboardFilter::default(), 10);
        assert_eq!(board.len(), 1);
        assert_eq!(board[0].athlete_id, "b");
    }

    #[test]
    fn test_ranking_key_parsing() {
        assert_eq!("form".parse::<RankingKey>().unwrap(), RankingKey::AverageFormScore);
        assert_eq!(
            "standardized-score".parse::<RankingKey>().unwrap(),
            RankingKey::StandardizedScore
        );
        assert!("speed".parse::<RankingKey>().is_err());
    }
}
