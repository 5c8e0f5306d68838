use anyhow::{Context, Result};
use chrono::{NaiveDate, Weekday};
use clap::{Args, Parser, Subcommand};
use colored::*;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use tabled::{settings::Style, Table, Tabled};

use fitassess::error::ErrorKind;
use fitassess::logging::init_logging;
use fitassess::service::{AdaptedPlan, PlanDetails, ResultFilter};
use fitassess::{
    AgeGroup, AppConfig, AssessmentService, Athlete, AthleteUpdate, DashboardSummary, Difficulty,
    FitAssessError, Gender, LeaderboardEntry, LeaderboardFilter, NewAthlete, PlanRequest,
    RankingKey, Sport, TestResult, TestSubmission, TestType,
};

/// FitAssess - Fitness Assessment CLI
///
/// Scores fitness tests against normative data, builds and adapts training
/// plans, and ranks athletes on leaderboards.
#[derive(Parser)]
#[command(name = "fitassess")]
#[command(author = "FitAssess Contributors")]
#[command(version)]
#[command(about = "Fitness assessment and training plan CLI", long_about = None)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity of output
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Acting user; records of other users are invisible
    #[arg(short, long, default_value = "local", global = true)]
    user: String,

    /// Print JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage athlete profiles
    #[command(subcommand)]
    Athlete(AthleteCommand),

    /// Submit and review fitness tests
    #[command(subcommand)]
    Test(TestCommand),

    /// Generate, inspect and adapt training plans
    #[command(subcommand)]
    Plan(PlanCommand),

    /// Rank athletes by their best result
    Leaderboard(LeaderboardArgs),

    /// Summary of one athlete's results and plan
    Dashboard {
        athlete_id: String,
    },

    /// Store-wide counts and per-test averages
    Stats,

    /// Inspect or export normative data
    #[command(subcommand)]
    Norms(NormsCommand),

    /// Configure application settings
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand)]
enum AthleteCommand {
    /// Register an athlete
    Add {
        #[arg(long)]
        name: String,
        /// Date of birth (YYYY-MM-DD)
        #[arg(long)]
        dob: NaiveDate,
        #[arg(long)]
        gender: Gender,
        #[arg(long)]
        sport: Sport,
        #[arg(long)]
        school: Option<String>,
        #[arg(long)]
        club: Option<String>,
    },
    /// List athletes
    List {
        /// Include deactivated athletes
        #[arg(short, long)]
        all: bool,
    },
    Show {
        athlete_id: String,
    },
    Update {
        athlete_id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        dob: Option<NaiveDate>,
        #[arg(long)]
        gender: Option<Gender>,
        #[arg(long)]
        sport: Option<Sport>,
        #[arg(long, conflicts_with = "clear_school")]
        school: Option<String>,
        #[arg(long, conflicts_with = "clear_club")]
        club: Option<String>,
        #[arg(long)]
        clear_school: bool,
        #[arg(long)]
        clear_club: bool,
    },
    /// Soft-delete an athlete
    Deactivate {
        athlete_id: String,
    },
    Restore {
        athlete_id: String,
    },
}

#[derive(Subcommand)]
enum TestCommand {
    /// Score and store a test submission read from a JSON file
    Submit {
        athlete_id: String,
        #[arg(short, long)]
        file: PathBuf,
    },
    List {
        athlete_id: String,
        #[arg(short = 't', long = "type")]
        test_type: Option<TestType>,
        /// Include deleted results
        #[arg(short, long)]
        all: bool,
        #[arg(short, long)]
        limit: Option<usize>,
    },
    Show {
        result_id: String,
    },
    /// Soft-delete a result
    Delete {
        result_id: String,
    },
}

#[derive(Subcommand)]
enum PlanCommand {
    /// Replace the active plan with a new four-week plan
    Generate {
        athlete_id: String,
        #[arg(short, long, default_value = "intermediate")]
        difficulty: Difficulty,
        /// Defaults to the athlete's sport
        #[arg(short, long)]
        sport: Option<Sport>,
        /// Weekly volume in minutes
        #[arg(long)]
        volume: Option<u32>,
        /// Training days, e.g. mon,wed,fri
        #[arg(long, value_delimiter = ',')]
        days: Option<Vec<Weekday>>,
    },
    /// Show the active plan and its workouts
    Show {
        athlete_id: String,
    },
    /// List every plan generated for an athlete, newest first
    History {
        athlete_id: String,
    },
    /// Adjust volume and intensity from recent results
    Adapt {
        athlete_id: String,
    },
    /// Mark a workout as done
    Complete {
        workout_id: String,
    },
}

#[derive(Args)]
struct LeaderboardArgs {
    #[arg(long)]
    sport: Option<Sport>,
    /// U12, U14, U16, U18, U20 or adult
    #[arg(long)]
    age_group: Option<AgeGroup>,
    #[arg(long)]
    school: Option<String>,
    #[arg(long)]
    club: Option<String>,
    #[arg(short = 't', long = "type")]
    test_type: Option<TestType>,
    #[arg(short, long)]
    limit: Option<usize>,
    /// score or form
    #[arg(long)]
    rank_by: Option<RankingKey>,
}

#[derive(Subcommand)]
enum NormsCommand {
    /// Print percentile bands
    Show {
        #[arg(short = 't', long = "type")]
        test_type: Option<TestType>,
    },
    /// Write the active table to a TOML file
    Export {
        output: PathBuf,
    },
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the effective configuration
    Show,
    /// Print the default config file path
    Path,
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli) {
        match err.downcast_ref::<FitAssessError>() {
            Some(app_err) => {
                app_err.log("cli");
                eprintln!(
                    "{} {} {}",
                    "Error:".red().bold(),
                    app_err,
                    format!("[{}]", app_err.reason()).dimmed()
                );
                if app_err.is_retryable() {
                    eprintln!("{}", "The database is busy; try again shortly.".yellow());
                }
                std::process::exit(match app_err.kind() {
                    ErrorKind::NotFound => 2,
                    ErrorKind::Validation => 3,
                    ErrorKind::Internal => 1,
                });
            }
            None => {
                eprintln!("{} {:#}", "Error:".red().bold(), err);
                std::process::exit(1);
            }
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => AppConfig::load_from_file(path)?,
        None => AppConfig::load_or_default(),
    };
    init_logging(&config.logging.clone().with_verbosity(cli.verbose))?;

    let user = cli.user.as_str();
    let json = cli.json;

    match cli.command {
        Commands::Config(command) => return run_config(command, config, cli.config),
        Commands::Norms(command) => {
            let norms = config.load_norms()?;
            return run_norms(command, &norms, json);
        }
        _ => {}
    }

    let mut service = AssessmentService::open(config)?;

    match cli.command {
        Commands::Athlete(command) => run_athlete(&service, user, command, json),
        Commands::Test(command) => run_test(&service, user, command, json),
        Commands::Plan(command) => run_plan(&mut service, user, command, json),
        Commands::Leaderboard(args) => {
            let filter = LeaderboardFilter {
                sport: args.sport,
                age_group: args.age_group,
                school: args.school,
                club: args.club,
                test_type: args.test_type,
                limit: args.limit,
                ranking_key: args.rank_by,
            };
            let entries = service.leaderboard(&filter)?;
            output(json, &entries, || print_leaderboard(&entries))
        }
        Commands::Dashboard { athlete_id } => {
            let summary = service.dashboard(user, &athlete_id)?;
            output(json, &summary, || print_dashboard(&summary))
        }
        Commands::Stats => {
            let stats = service.stats()?;
            output(json, &stats, || {
                let db = &stats.database;
                println!("{}", "Store".cyan().bold());
                println!("  Athletes:  {} ({} active)", db.athlete_count, db.active_athlete_count);
                println!(
                    "  Results:   {} ({} valid)",
                    db.test_result_count, db.valid_test_result_count
                );
                println!("  Plans:     {} ({} active)", db.plan_count, db.active_plan_count);
                println!(
                    "  Workouts:  {} ({} completed)",
                    db.workout_count, db.completed_workout_count
                );
                if !stats.by_test_type.is_empty() {
                    let rows: Vec<_> = stats
                        .by_test_type
                        .iter()
                        .map(|s| TypeStatsRow {
                            test: s.test_type.to_string(),
                            count: s.count,
                            average: format!("{:.1}", s.average_score),
                            best: format!("{:.1}", s.best_score),
                        })
                        .collect();
                    println!("{}", Table::new(rows).with(Style::rounded()));
                }
            })
        }
        Commands::Config(_) | Commands::Norms(_) => Ok(()),
    }
}

fn run_athlete(
    service: &AssessmentService,
    user: &str,
    command: AthleteCommand,
    json: bool,
) -> Result<()> {
    match command {
        AthleteCommand::Add {
            name,
            dob,
            gender,
            sport,
            school,
            club,
        } => {
            let athlete = service.create_athlete(
                user,
                NewAthlete {
                    name,
                    date_of_birth: dob,
                    gender,
                    sport,
                    school,
                    club,
                },
            )?;
            output(json, &athlete, || {
                println!("{} {}", "✓ Athlete created:".green(), athlete.id);
            })
        }
        AthleteCommand::List { all } => {
            let athletes = service.list_athletes(user, all)?;
            output(json, &athletes, || print_athletes(&athletes))
        }
        AthleteCommand::Show { athlete_id } => {
            let athlete = service.get_athlete(user, &athlete_id)?;
            output(json, &athlete, || print_athletes(std::slice::from_ref(&athlete)))
        }
        AthleteCommand::Update {
            athlete_id,
            name,
            dob,
            gender,
            sport,
            school,
            club,
            clear_school,
            clear_club,
        } => {
            let update = AthleteUpdate {
                name,
                date_of_birth: dob,
                gender,
                sport,
                school: if clear_school { Some(None) } else { school.map(Some) },
                club: if clear_club { Some(None) } else { club.map(Some) },
            };
            let athlete = service.update_athlete(user, &athlete_id, update)?;
            output(json, &athlete, || {
                println!("{} {}", "✓ Athlete updated:".green(), athlete.id);
            })
        }
        AthleteCommand::Deactivate { athlete_id } => {
            let athlete = service.deactivate_athlete(user, &athlete_id)?;
            output(json, &athlete, || {
                println!("{} {}", "✓ Athlete deactivated:".yellow(), athlete.id);
            })
        }
        AthleteCommand::Restore { athlete_id } => {
            let athlete = service.restore_athlete(user, &athlete_id)?;
            output(json, &athlete, || {
                println!("{} {}", "✓ Athlete restored:".green(), athlete.id);
            })
        }
    }
}

fn run_test(
    service: &AssessmentService,
    user: &str,
    command: TestCommand,
    json: bool,
) -> Result<()> {
    match command {
        TestCommand::Submit { athlete_id, file } => {
            let content = fs::read_to_string(&file)
                .with_context(|| format!("Failed to read submission: {}", file.display()))?;
            let submission: TestSubmission = serde_json::from_str(&content)
                .with_context(|| format!("Invalid submission JSON: {}", file.display()))?;

            let result = service.submit_test(user, &athlete_id, submission)?;
            output(json, &result, || print_result_detail(&result))
        }
        TestCommand::List {
            athlete_id,
            test_type,
            all,
            limit,
        } => {
            let filter = ResultFilter {
                test_type,
                include_invalid: all,
                limit,
            };
            let results = service.list_test_results(user, &athlete_id, &filter)?;
            output(json, &results, || print_results(&results))
        }
        TestCommand::Show { result_id } => {
            let result = service.get_test_result(user, &result_id)?;
            output(json, &result, || print_result_detail(&result))
        }
        TestCommand::Delete { result_id } => {
            service.delete_test_result(user, &result_id)?;
            println!("{} {}", "✓ Test result deleted:".yellow(), result_id);
            Ok(())
        }
    }
}

fn run_plan(
    service: &mut AssessmentService,
    user: &str,
    command: PlanCommand,
    json: bool,
) -> Result<()> {
    match command {
        PlanCommand::Generate {
            athlete_id,
            difficulty,
            sport,
            volume,
            days,
        } => {
            let sport = match sport {
                Some(sport) => sport,
                None => service.get_athlete(user, &athlete_id)?.sport,
            };
            let request = PlanRequest {
                sport,
                difficulty,
                weekly_volume: volume,
                available_days: days,
            };
            let details = service.generate_plan(user, &athlete_id, &request)?;
            output(json, &details, || {
                println!("{}", "✓ Training plan generated".green().bold());
                print_plan(&details);
            })
        }
        PlanCommand::Show { athlete_id } => {
            let details = service.active_plan(user, &athlete_id)?;
            output(json, &details, || print_plan(&details))
        }
        PlanCommand::History { athlete_id } => {
            let plans = service.plan_history(user, &athlete_id)?;
            output(json, &plans, || {
                if plans.is_empty() {
                    println!("{}", "No training plans found".dimmed());
                    return;
                }
                let rows: Vec<_> = plans
                    .iter()
                    .map(|p| PlanRow {
                        id: p.id.clone(),
                        created: p.created_at.format("%Y-%m-%d %H:%M").to_string(),
                        sport: p.sport.to_string(),
                        difficulty: p.difficulty.to_string(),
                        volume: p.weekly_volume,
                        intensity: p.weekly_intensity.to_string(),
                        active: if p.is_active { "✓" } else { "" }.to_string(),
                    })
                    .collect();
                println!("{}", Table::new(rows).with(Style::rounded()));
            })
        }
        PlanCommand::Adapt { athlete_id } => {
            let adapted = service.adapt_plan(user, &athlete_id)?;
            output(json, &adapted, || print_adaptation(&adapted))
        }
        PlanCommand::Complete { workout_id } => {
            let workout = service.complete_workout(user, &workout_id)?;
            output(json, &workout, || {
                println!(
                    "{} week {} day {} ({})",
                    "✓ Workout completed:".green(),
                    workout.week_number,
                    workout.day_number,
                    workout.title
                );
            })
        }
    }
}

fn run_norms(command: NormsCommand, norms: &fitassess::NormativeTable, json: bool) -> Result<()> {
    match command {
        NormsCommand::Show { test_type } => {
            let entries: Vec<_> = norms
                .entries
                .iter()
                .filter(|e| test_type.map_or(true, |t| e.test_type == t))
                .collect();
            output(json, &entries, || {
                println!("{} {}", "Normative table".cyan().bold(), norms.version);
                let rows: Vec<_> = entries
                    .iter()
                    .map(|e| NormRow {
                        test: e.test_type.to_string(),
                        age_group: e.age_group.map_or("any".to_string(), |g| g.to_string()),
                        gender: e.gender.map_or("any".to_string(), |g| g.to_string()),
                        p10: e.bands.p10.to_string(),
                        p25: e.bands.p25.to_string(),
                        p50: e.bands.p50.to_string(),
                        p75: e.bands.p75.to_string(),
                        p90: e.bands.p90.to_string(),
                    })
                    .collect();
                println!("{}", Table::new(rows).with(Style::rounded()));
            })
        }
        NormsCommand::Export { output: path } => {
            norms.save_to_file(&path)?;
            println!("{} {}", "✓ Norms written to".green(), path.display());
            Ok(())
        }
    }
}

fn run_config(command: ConfigCommand, mut config: AppConfig, path: Option<PathBuf>) -> Result<()> {
    match command {
        ConfigCommand::Show => {
            println!("{}", toml::to_string_pretty(&config)?);
            if let Err(e) = config.validate() {
                eprintln!("{} {}", "Warning:".yellow().bold(), e);
            }
        }
        ConfigCommand::Path => {
            println!("{}", path.unwrap_or_else(AppConfig::default_config_path).display());
        }
        ConfigCommand::Init { force } => {
            let path = path.unwrap_or_else(AppConfig::default_config_path);
            if path.exists() && !force {
                anyhow::bail!(
                    "Config file already exists: {} (use --force to overwrite)",
                    path.display()
                );
            }
            config.save_to_file(&path)?;
            println!("{} {}", "✓ Config written to".green(), path.display());
        }
    }
    Ok(())
}

/// JSON when requested, otherwise the human rendering
fn output<T: Serialize>(json: bool, value: &T, render: impl FnOnce()) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        render();
    }
    Ok(())
}

fn or_dash(value: &Option<String>) -> String {
    value.clone().unwrap_or_else(|| "-".to_string())
}

#[derive(Tabled)]
struct AthleteRow {
    id: String,
    name: String,
    born: NaiveDate,
    gender: String,
    sport: String,
    school: String,
    club: String,
    active: String,
}

#[derive(Tabled)]
struct ResultRow {
    id: String,
    test: String,
    completed: String,
    raw: String,
    score: String,
    grade: String,
    form: String,
    valid: String,
}

#[derive(Tabled)]
struct PlanRow {
    id: String,
    created: String,
    sport: String,
    difficulty: String,
    volume: u32,
    intensity: String,
    active: String,
}

#[derive(Tabled)]
struct WorkoutRow {
    id: String,
    week: u32,
    day: String,
    workout: String,
    minutes: u32,
    exercises: usize,
    done: String,
}

#[derive(Tabled)]
struct LeaderboardRow {
    rank: usize,
    athlete: String,
    sport: String,
    school: String,
    club: String,
    test: String,
    score: String,
    achieved: String,
}

#[derive(Tabled)]
struct TypeStatsRow {
    test: String,
    count: usize,
    average: String,
    best: String,
}

#[derive(Tabled)]
struct NormRow {
    test: String,
    age_group: String,
    gender: String,
    p10: String,
    p25: String,
    p50: String,
    p75: String,
    p90: String,
}

fn print_athletes(athletes: &[Athlete]) {
    if athletes.is_empty() {
        println!("{}", "No athletes found".dimmed());
        return;
    }
    let rows: Vec<_> = athletes
        .iter()
        .map(|a| AthleteRow {
            id: a.id.clone(),
            name: a.name.clone(),
            born: a.date_of_birth,
            gender: a.gender.to_string(),
            sport: a.sport.to_string(),
            school: or_dash(&a.school),
            club: or_dash(&a.club),
            active: if a.is_active { "yes" } else { "no" }.to_string(),
        })
        .collect();
    println!("{}", Table::new(rows).with(Style::rounded()));
}

fn grade_colored(grade: fitassess::Grade) -> ColoredString {
    match grade {
        fitassess::Grade::A => grade.as_str().green().bold(),
        fitassess::Grade::B => grade.as_str().green(),
        fitassess::Grade::C => grade.as_str().yellow(),
        fitassess::Grade::D => grade.as_str().red(),
        fitassess::Grade::F => grade.as_str().red().bold(),
    }
}

fn print_results(results: &[TestResult]) {
    if results.is_empty() {
        println!("{}", "No test results found".dimmed());
        return;
    }
    let rows: Vec<_> = results
        .iter()
        .map(|r| ResultRow {
            id: r.id.clone(),
            test: r.test_type.to_string(),
            completed: r.completed_at.format("%Y-%m-%d %H:%M").to_string(),
            raw: r.score.raw_score.to_string(),
            score: r.score.standardized_score.to_string(),
            grade: r.score.grade.to_string(),
            form: r.average_form_score.to_string(),
            valid: if r.is_valid { "yes" } else { "no" }.to_string(),
        })
        .collect();
    println!("{}", Table::new(rows).with(Style::rounded()));
}

fn print_result_detail(result: &TestResult) {
    println!("{} {}", "Test result".cyan().bold(), result.id);
    println!("  Test:        {}", result.test_type);
    println!("  Completed:   {}", result.completed_at.format("%Y-%m-%d %H:%M:%S"));
    println!("  Raw score:   {}", result.score.raw_score);
    if let Some(percentile) = result.score.percentile {
        println!("  Percentile:  {}", percentile.round_dp(1));
    }
    println!("  Score:       {}", result.score.standardized_score);
    println!("  Grade:       {}", grade_colored(result.score.grade));
    println!("  Avg form:    {}", result.average_form_score);
    for line in &result.score.feedback {
        println!("  • {}", line);
    }
}

fn print_plan(details: &PlanDetails) {
    let plan = &details.plan;
    println!("{} {}", "Plan".cyan().bold(), plan.id);
    println!(
        "  {} {}, {} min/week, intensity {}",
        plan.sport, plan.difficulty, plan.weekly_volume, plan.weekly_intensity
    );
    if let Some(adapted) = plan.last_adapted_at {
        println!("  Last adapted: {}", adapted.format("%Y-%m-%d"));
    }

    let rows: Vec<_> = details
        .workouts
        .iter()
        .map(|w| WorkoutRow {
            id: w.id.clone(),
            week: w.week_number,
            day: weekday_name(w.day_number).to_string(),
            workout: w.title.clone(),
            minutes: w.duration_minutes,
            exercises: w.exercises.len(),
            done: if w.completed { "✓" } else { "" }.to_string(),
        })
        .collect();
    println!("{}", Table::new(rows).with(Style::rounded()));
}

fn weekday_name(day_number: u32) -> &'static str {
    match day_number {
        1 => "Mon",
        2 => "Tue",
        3 => "Wed",
        4 => "Thu",
        5 => "Fri",
        6 => "Sat",
        7 => "Sun",
        _ => "?",
    }
}

fn print_adaptation(adapted: &AdaptedPlan) {
    let outcome = &adapted.outcome;
    let trend = outcome.overall_trend.to_string();
    let trend = match outcome.overall_trend {
        fitassess::Trend::Improving => trend.green().bold(),
        fitassess::Trend::Stable => trend.normal(),
        fitassess::Trend::Declining => trend.red().bold(),
    };
    println!("{} {}", "Overall trend:".cyan().bold(), trend);
    for t in &outcome.type_trends {
        let change = t
            .change_pct
            .map_or("n/a".to_string(), |pct| {
                if pct.is_sign_positive() && !pct.is_zero() {
                    format!("+{}%", pct)
                } else {
                    format!("{}%", pct)
                }
            });
        println!(
            "  {:<18} {} → {} ({}) {}",
            t.test_type.as_str(),
            t.previous_score,
            t.latest_score,
            change,
            t.trend
        );
    }
    println!(
        "  Intensity: {} → {}",
        outcome.previous_intensity, outcome.new_intensity
    );
    println!(
        "  Volume:    {} → {} min/week",
        outcome.previous_volume, outcome.new_volume
    );
    if let Some(minutes) = adapted.rescaled_session_minutes {
        println!("  Open workouts rescaled to {} min", minutes);
    }
}

fn print_leaderboard(entries: &[LeaderboardEntry]) {
    if entries.is_empty() {
        println!("{}", "No ranked athletes".dimmed());
        return;
    }
    let rows: Vec<_> = entries
        .iter()
        .map(|e| LeaderboardRow {
            rank: e.rank,
            athlete: e.athlete_name.clone(),
            sport: e.sport.to_string(),
            school: or_dash(&e.school),
            club: or_dash(&e.club),
            test: e.test_type.to_string(),
            score: e.best_score.to_string(),
            achieved: e.achieved_at.format("%Y-%m-%d").to_string(),
        })
        .collect();
    println!("{}", Table::new(rows).with(Style::rounded()));
}

fn print_dashboard(summary: &DashboardSummary) {
    println!("{} {}", "Dashboard".cyan().bold(), summary.athlete_name);
    println!("  Valid tests:   {}", summary.total_tests);
    match summary.average_score {
        Some(avg) => println!("  Average score: {}", avg),
        None => println!("  Average score: -"),
    }

    let grades: Vec<String> = summary
        .grade_distribution
        .iter()
        .map(|(grade, count)| format!("{}:{}", grade_colored(*grade), count))
        .collect();
    println!("  Grades:        {}", grades.join("  "));

    for t in &summary.by_test_type {
        println!(
            "  {:<18} n={:<3} best {:<8} latest {} ({})",
            t.test_type.as_str(),
            t.count,
            t.best_score.to_string(),
            t.latest_score,
            grade_colored(t.latest_grade)
        );
    }

    if let Some(plan) = &summary.active_plan {
        println!(
            "  Plan {}: {}/{} workouts ({}%), {} min/week @ {}",
            plan.plan_id,
            plan.completed_workouts,
            plan.total_workouts,
            plan.completion_rate,
            plan.weekly_volume,
            plan.weekly_intensity
        );
    }

    if !summary.recent_results.is_empty() {
        println!("{}", "Recent results".cyan());
        print_results(&summary.recent_results);
    }
}
