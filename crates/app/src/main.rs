mod config;

use std::path::PathBuf;

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::debug;

use config::{AppConfig, prepare_sqlite_file};
use pathway_core::Calendar;
use pathway_core::model::{
    CourseId, LearnerId, LearnerProgress, LessonId, LessonNode, LessonStatus, ProgressEvent,
};
use services::{AppServices, Clock, Completion};

#[derive(Parser)]
#[command(name = "pathway")]
#[command(about = "Track lesson completions, experience, levels and streaks")]
#[command(version)]
struct Cli {
    /// SQLite database URL or path
    #[arg(long = "db", env = "PATHWAY_DB_URL", global = true)]
    db_url: Option<String>,

    /// Offset from UTC, in minutes, that decides calendar days for streaks
    #[arg(long, env = "PATHWAY_UTC_OFFSET_MINUTES", global = true, allow_negative_numbers = true)]
    utc_offset_minutes: Option<i32>,

    /// Path to a TOML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Publish a sample linear course
    Seed {
        #[arg(long)]
        course: CourseId,
        #[arg(long, default_value_t = 5)]
        lessons: u32,
        /// Experience each lesson is worth
        #[arg(long, default_value_t = 10)]
        xp: u32,
    },
    /// Complete a lesson for a learner
    Complete {
        #[arg(long)]
        learner: LearnerId,
        #[arg(long)]
        lesson: LessonId,
        #[arg(long, allow_negative_numbers = true)]
        xp: i64,
    },
    /// Show a learner's path through a course
    View {
        #[arg(long)]
        learner: LearnerId,
        #[arg(long)]
        course: CourseId,
    },
    /// Show a learner's experience, level and streak
    Snapshot {
        #[arg(long)]
        learner: LearnerId,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref())?.with_overrides(
        cli.db_url.clone(),
        cli.utc_offset_minutes,
        cli.verbose,
    );

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .init();

    let calendar = Calendar::with_offset_minutes(config.utc_offset_minutes)?;
    prepare_sqlite_file(&config.database_url)?;
    debug!(db = %config.database_url, offset = config.utc_offset_minutes, "opening storage");
    let clock = Clock::default_clock();
    let services = AppServices::new_sqlite(&config.database_url, clock, calendar).await?;

    match cli.command {
        Commands::Seed {
            course,
            lessons,
            xp,
        } => {
            let published = services
                .catalog()
                .publish_linear_course(&course, lessons, xp)
                .await?;
            if cli.json {
                print_json(&published)?;
            } else {
                println!("published {} lessons in {course}", published.len());
                for lesson in &published {
                    println!("  {}  {} ({} XP)", lesson.id, lesson.title, lesson.xp_reward);
                }
            }
        }
        Commands::Complete {
            learner,
            lesson,
            xp,
        } => {
            let completion = services
                .progress()
                .on_lesson_finished(learner, lesson, xp)
                .await?;
            if cli.json {
                print_json(&CompletionReport::from(&completion))?;
            } else {
                print_completion(&completion, &calendar, clock.now());
            }
        }
        Commands::View { learner, course } => {
            let nodes = services
                .course_view()
                .course_lesson_view(learner, &course)
                .await?;
            if cli.json {
                print_json(&nodes)?;
            } else {
                print_course(&course, &nodes);
            }
        }
        Commands::Snapshot { learner } => {
            let progress = services.progress().snapshot(learner).await?;
            if cli.json {
                print_json(&progress)?;
            } else {
                print_progress(&progress, &calendar, clock.now());
            }
        }
    }

    Ok(())
}

//
// ─── OUTPUT ────────────────────────────────────────────────────────────────────
//

#[derive(Serialize)]
struct CompletionReport<'a> {
    applied: bool,
    progress: &'a LearnerProgress,
    events: &'a [ProgressEvent],
}

impl<'a> From<&'a Completion> for CompletionReport<'a> {
    fn from(completion: &'a Completion) -> Self {
        Self {
            applied: completion.is_applied(),
            progress: &completion.progress,
            events: completion.events(),
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_completion(completion: &Completion, calendar: &Calendar, now: DateTime<Utc>) {
    if !completion.is_applied() {
        println!("lesson already completed, nothing changed");
    }
    for event in completion.events() {
        println!("  {}", describe(event));
    }
    print_progress(&completion.progress, calendar, now);
}

fn describe(event: &ProgressEvent) -> String {
    match event {
        ProgressEvent::XpAwarded { amount } => format!("+{amount} XP"),
        ProgressEvent::LevelUp { from, to } => format!("level up: {from} -> {to}"),
        ProgressEvent::StreakStarted => "streak started".to_string(),
        ProgressEvent::StreakExtended { days } => format!("streak extended to {days} days"),
        ProgressEvent::StreakReset { previous } => format!("streak reset (was {previous})"),
    }
}

fn print_progress(progress: &LearnerProgress, calendar: &Calendar, now: DateTime<Utc>) {
    let level = progress.level_progress();
    let streak = progress.current_streak(now, calendar);
    println!("learner     {}", progress.learner_id());
    println!(
        "level       {} ({} XP, {} to next level)",
        level.level,
        level.experience,
        level.xp_to_next_level()
    );
    println!("streak      {streak} day(s)");
    println!("completed   {} lesson(s)", progress.completed_lessons().len());
}

fn print_course(course: &CourseId, nodes: &[LessonNode]) {
    if nodes.is_empty() {
        println!("course {course} has no lessons");
        return;
    }
    println!("course {course}");
    for node in nodes {
        let mark = match node.status() {
            LessonStatus::Completed => "[x]",
            LessonStatus::Unlocked => "[>]",
            LessonStatus::Locked => "[ ]",
        };
        println!("  {mark} {:>2}. {}  ({})", node.order.saturating_add(1), node.title, node.id);
    }
}
