//! Normative percentile bands
//!
//! Maps a raw test value to a population percentile. Bands are segmented by
//! test type, age group and gender, versioned, and loadable from TOML so that
//! alternative norms can be swapped in without code changes.

use anyhow::Context;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{FitAssessError, Result};
use crate::models::{AgeGroup, Gender, TestType};

/// Raw-score thresholds at the 10th, 25th, 50th, 75th and 90th percentiles.
///
/// Thresholds ascend for higher-is-better tests and descend for timed tests.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PercentileBands {
    pub p10: Decimal,
    pub p25: Decimal,
    pub p50: Decimal,
    pub p75: Decimal,
    pub p90: Decimal,
}

impl PercentileBands {
    pub fn new(p10: Decimal, p25: Decimal, p50: Decimal, p75: Decimal, p90: Decimal) -> Self {
        Self {
            p10,
            p25,
            p50,
            p75,
            p90,
        }
    }

    /// (percentile, raw threshold) pairs in percentile order
    pub fn points(&self) -> [(Decimal, Decimal); 5] {
        [
            (dec!(10), self.p10),
            (dec!(25), self.p25),
            (dec!(50), self.p50),
            (dec!(75), self.p75),
            (dec!(90), self.p90),
        ]
    }

    pub fn is_ascending(&self) -> bool {
        self.p90 >= self.p10
    }

    /// Thresholds must be strictly monotonic in one direction
    pub fn validate(&self) -> std::result::Result<(), String> {
        let points = self.points();
        let ascending = self.is_ascending();
        for pair in points.windows(2) {
            let (lower, upper) = (pair[0].1, pair[1].1);
            let ordered = if ascending { upper > lower } else { upper < lower };
            if !ordered {
                return Err(format!(
                    "thresholds must be strictly monotonic, got {} then {}",
                    lower, upper
                ));
            }
        }
        Ok(())
    }

    /// Linearly interpolated percentile for `value`, clamped to [0, 100].
    ///
    /// Values outside [p10, p90] extrapolate along the outermost segment
    /// before clamping.
    pub fn percentile_for(&self, value: Decimal) -> Decimal {
        let points = self.points();
        let ascending = self.is_ascending();
        let beyond = |value: Decimal, threshold: Decimal| {
            if ascending {
                value <= threshold
            } else {
                value >= threshold
            }
        };

        let segment = if beyond(value, points[0].1) {
            0
        } else {
            (0..points.len() - 1)
                .find(|&i| beyond(value, points[i + 1].1))
                .unwrap_or(points.len() - 2)
        };

        let (lower_pct, lower_val) = points[segment];
        let (upper_pct, upper_val) = points[segment + 1];

        if upper_val == lower_val {
            return lower_pct;
        }

        let percentile =
            lower_pct + (value - lower_val) / (upper_val - lower_val) * (upper_pct - lower_pct);
        percentile.max(Decimal::ZERO).min(dec!(100))
    }
}

/// Bands for one test type and demographic bucket.
///
/// `None` for age group or gender means the entry applies to everyone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormEntry {
    pub test_type: TestType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_group: Option<AgeGroup>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    pub bands: PercentileBands,
}

/// Versioned normative data table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormativeTable {
    pub version: String,
    pub entries: Vec<NormEntry>,
}

impl Default for NormativeTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl NormativeTable {
    /// Load a table from TOML and validate every entry
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read norms file: {}", path.as_ref().display()))?;

        let table: NormativeTable =
            toml::from_str(&content).with_context(|| "Failed to parse normative table")?;
        table.validate()?;

        Ok(table)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .with_context(|| "Failed to serialize normative table")?;
        fs::write(&path, content)
            .with_context(|| format!("Failed to write norms file: {}", path.as_ref().display()))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.version.trim().is_empty() {
            return Err(FitAssessError::Configuration(
                "normative table version is empty".to_string(),
            ));
        }
        for entry in &self.entries {
            entry.bands.validate().map_err(|reason| {
                FitAssessError::Configuration(format!(
                    "invalid bands for {} ({:?}/{:?}): {}",
                    entry.test_type, entry.age_group, entry.gender, reason
                ))
            })?;
        }
        Ok(())
    }

    /// Most specific bands for the bucket.
    ///
    /// Falls back (age, gender) → (age, any) → (any, gender) → (any, any).
    pub fn lookup(
        &self,
        test_type: TestType,
        age_group: AgeGroup,
        gender: Gender,
    ) -> Result<&PercentileBands> {
        let candidates = [
            (Some(age_group), Some(gender)),
            (Some(age_group), None),
            (None, Some(gender)),
            (None, None),
        ];

        candidates
            .iter()
            .find_map(|(age, sex)| {
                self.entries.iter().find(|entry| {
                    entry.test_type == test_type && entry.age_group == *age && entry.gender == *sex
                })
            })
            .map(|entry| &entry.bands)
            .ok_or_else(|| {
                FitAssessError::validation(format!(
                    "no normative data: {} for {} {}",
                    test_type, age_group, gender
                ))
            })
    }

    /// Built-in population norms shipped with the crate
    pub fn builtin() -> Self {
        let general = |test_type, bands: [Decimal; 5]| NormEntry {
            test_type,
            age_group: None,
            gender: None,
            bands: PercentileBands::new(bands[0], bands[1], bands[2], bands[3], bands[4]),
        };

        let mut entries = vec![
            general(TestType::Squats, [dec!(15), dec!(25), dec!(35), dec!(45), dec!(55)]),
            general(TestType::PushUps, [dec!(8), dec!(15), dec!(22), dec!(30), dec!(40)]),
            general(TestType::SitUps, [dec!(12), dec!(20), dec!(28), dec!(36), dec!(45)]),
            general(TestType::PullUps, [dec!(1), dec!(3), dec!(6), dec!(10), dec!(15)]),
            general(TestType::Burpees, [dec!(10), dec!(15), dec!(20), dec!(25), dec!(30)]),
            general(TestType::JumpingJacks, [dec!(25), dec!(35), dec!(45), dec!(55), dec!(65)]),
            general(TestType::Lunges, [dec!(12), dec!(20), dec!(28), dec!(36), dec!(44)]),
            general(TestType::MountainClimbers, [dec!(20), dec!(30), dec!(40), dec!(50), dec!(60)]),
            general(TestType::Plank, [dec!(30), dec!(60), dec!(90), dec!(120), dec!(180)]),
            general(TestType::WallSit, [dec!(20), dec!(40), dec!(60), dec!(90), dec!(120)]),
            general(TestType::Balance, [dec!(10), dec!(20), dec!(30), dec!(45), dec!(60)]),
            general(TestType::VerticalJump, [dec!(25), dec!(32), dec!(40), dec!(48), dec!(56)]),
            general(TestType::BroadJump, [dec!(140), dec!(165), dec!(190), dec!(215), dec!(240)]),
            general(TestType::SitAndReach, [dec!(10), dec!(18), dec!(25), dec!(32), dec!(38)]),
            general(TestType::Sprint20m, [dec!(4.4), dec!(4.0), dec!(3.7), dec!(3.4), dec!(3.1)]),
            general(
                TestType::ShuttleRun,
                [dec!(13.0), dec!(12.0), dec!(11.2), dec!(10.5), dec!(9.8)],
            ),
        ];

        // Youth and gender-specific refinements
        entries.push(NormEntry {
            test_type: TestType::Squats,
            age_group: Some(AgeGroup::U12),
            gender: None,
            bands: PercentileBands::new(dec!(10), dec!(18), dec!(25), dec!(32), dec!(40)),
        });
        entries.push(NormEntry {
            test_type: TestType::PushUps,
            age_group: None,
            gender: Some(Gender::Female),
            bands: PercentileBands::new(dec!(4), dec!(9), dec!(15), dec!(21), dec!(28)),
        });
        entries.push(NormEntry {
            test_type: TestType::PushUps,
            age_group: Some(AgeGroup::U12),
            gender: None,
            bands: PercentileBands::new(dec!(4), dec!(8), dec!(13), dec!(18), dec!(24)),
        });
        entries.push(NormEntry {
            test_type: TestType::Sprint20m,
            age_group: Some(AgeGroup::U12),
            gender: None,
            bands: PercentileBands::new(dec!(5.0), dec!(4.6), dec!(4.3), dec!(4.0), dec!(3.7)),
        });

        Self {
            version: "2024.1".to_string(),
            entries,
        }
    }
}
