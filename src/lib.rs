// Library interface for FitAssess modules
// This allows integration tests and benchmarks to access the core functionality

pub mod adaptation;
pub mod config;
pub mod dashboard;
pub mod database;
pub mod error;
pub mod leaderboard;
pub mod logging;
pub mod models;
pub mod norms;
pub mod scoring;
pub mod service;
pub mod training_plan;

// Re-export commonly used types for convenience
pub use models::*;
pub use adaptation::{AdaptationConfig, AdaptationOutcome, PlanAdapter};
pub use config::AppConfig;
pub use dashboard::DashboardSummary;
pub use database::{Database, DatabaseError};
pub use error::{ErrorKind, FitAssessError, Result};
pub use leaderboard::{rank_athletes, LeaderboardEntry, LeaderboardFilter, RankingKey};
pub use logging::{LogConfig, LogFormat, LogLevel};
pub use norms::{NormativeTable, PercentileBands};
pub use scoring::{ScoringConfig, ScoringEngine, ScoringInput};
pub use service::AssessmentService;
pub use training_plan::{PlanConfig, PlanGenerator, PlanRequest};
