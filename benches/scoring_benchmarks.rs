use chrono::{Duration, NaiveDate, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::BTreeSet;

use fitassess::{
    rank_athletes, AgeGroup, Athlete, Gender, Grade, LeaderboardFilter, NormativeTable,
    RankingKey, RepetitionData, Score, ScoringConfig, ScoringEngine, ScoringInput, Sport,
    TestResult, TestType,
};

/// Benchmarks for the scoring engine and leaderboard ranking
///
/// Dataset sizes mirror a single test submission up to a district-wide
/// leaderboard.

fn create_repetitions(count: usize) -> Vec<RepetitionData> {
    (0..count)
        .map(|i| {
            let start = Decimal::from(i as u32) * dec!(1.8);
            let duration = dec!(1.6) + Decimal::from((i % 5) as u32) * dec!(0.1);
            RepetitionData {
                start_time: start,
                end_time: start + duration,
                duration,
                form_score: dec!(70) + Decimal::from((i % 30) as u32),
                issues: BTreeSet::new(),
            }
        })
        .collect()
}

fn create_population(size: usize) -> (Vec<Athlete>, Vec<TestResult>) {
    let now = Utc.with_ymd_and_hms(2024, 9, 1, 12, 0, 0).unwrap();
    let sports = [Sport::Football, Sport::Basketball, Sport::Athletics];

    let athletes: Vec<Athlete> = (0..size)
        .map(|i| Athlete {
            id: format!("athlete-{:05}", i),
            user_id: "bench".to_string(),
            name: format!("Athlete {}", i),
            date_of_birth: NaiveDate::from_ymd_opt(2006 + (i % 8) as i32, 1 + (i % 12) as u32, 1)
                .unwrap(),
            gender: if i % 2 == 0 { Gender::Male } else { Gender::Female },
            sport: sports[i % sports.len()],
            school: Some(format!("School {}", i % 10)),
            club: None,
            is_active: i % 17 != 0,
            created_at: now,
            updated_at: now,
        })
        .collect();

    // Five squat results per athlete
    let results = athletes
        .iter()
        .flat_map(|athlete| {
            (0..5).map(move |n| {
                let score = Decimal::from(((athlete.id.len() * 7 + n * 13) % 100) as u32);
                let completed_at = now - Duration::days(n as i64);
                TestResult {
                    id: format!("{}-{}", athlete.id, n),
                    athlete_id: athlete.id.clone(),
                    user_id: athlete.user_id.clone(),
                    test_type: TestType::Squats,
                    started_at: completed_at - Duration::seconds(60),
                    completed_at,
                    duration: dec!(60),
                    repetitions: Vec::new(),
                    total_reps: 30,
                    measured_value: None,
                    score: Score {
                        raw_score: dec!(30),
                        standardized_score: score,
                        percentile: Some(score),
                        grade: Grade::from_percentile(score),
                        feedback: Vec::new(),
                    },
                    average_form_score: dec!(80),
                    is_valid: n != 4,
                    created_at: completed_at,
                }
            })
        })
        .collect();

    (athletes, results)
}

fn bench_scoring(c: &mut Criterion) {
    let config = ScoringConfig::default();
    let norms = NormativeTable::builtin();
    let engine = ScoringEngine::new(&config, &norms);

    let mut group = c.benchmark_group("Scoring");

    for &reps in &[0usize, 10, 50, 200] {
        let repetitions = create_repetitions(reps);
        group.throughput(Throughput::Elements(reps.max(1) as u64));
        group.bench_with_input(
            BenchmarkId::new("score_squats", reps),
            &repetitions,
            |b, repetitions| {
                b.iter(|| {
                    engine.score(black_box(&ScoringInput {
                        test_type: TestType::Squats,
                        raw_value: dec!(40),
                        age_group: AgeGroup::U16,
                        gender: Gender::Female,
                        repetitions,
                    }))
                });
            },
        );
    }

    group.bench_function("norm_lookup_fallback", |b| {
        b.iter(|| norms.lookup(black_box(TestType::PushUps), AgeGroup::U18, Gender::Male))
    });

    group.finish();
}

fn bench_leaderboard(c: &mut Criterion) {
    let today = NaiveDate::from_ymd_opt(2024, 9, 1).unwrap();
    let mut group = c.benchmark_group("Leaderboard");

    for &size in &[100usize, 1_000, 10_000] {
        let (athletes, results) = create_population(size);
        let filter = LeaderboardFilter {
            sport: Some(Sport::Football),
            age_group: Some(AgeGroup::U16),
            test_type: Some(TestType::Squats),
            ..LeaderboardFilter::default()
        };

        group.throughput(Throughput::Elements(results.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("rank_athletes", size),
            &(athletes, results),
            |b, (athletes, results)| {
                b.iter(|| {
                    rank_athletes(
                        black_box(athletes),
                        black_box(results),
                        &filter,
                        RankingKey::StandardizedScore,
                        10,
                        today,
                    )
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_scoring, bench_leaderboard);
criterion_main!(benches);
