use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use services::{AppServices, Clock, TopicQuery};
use storage::seed::seed_demo;
use syllabus_core::hierarchy::ChartSeries;
use syllabus_core::model::{ContentFilter, ContentKind, LabelId, PlanConfig, Scope, StudentId};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Curriculum coverage dashboard and study planner.
#[derive(Parser, Debug)]
#[command(name = "syllabus")]
#[command(version)]
struct Cli {
    /// Database URL or path to a SQLite file
    #[arg(long = "db", default_value = "sqlite://dev.sqlite3", env = "SYLLABUS_DB_URL")]
    db_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create or upgrade the schema
    Migrate,
    /// Load the demo catalogue
    Seed,
    /// Content totals per subject family
    Subjects {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// One drill-down level of a subject's topic tree
    Topics {
        /// Subject name prefix, e.g. "Physics" for both HL and SL
        #[arg(long)]
        subject: String,
        /// Label id to drill into; omit for the root level
        #[arg(long)]
        parent: Option<u64>,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Generate and store a student's study plan
    Plan {
        #[arg(long)]
        student: u64,
        /// JSON file holding subjects, availability and vacations
        #[arg(long)]
        config: PathBuf,
        #[arg(long, default_value = "Study plan")]
        name: String,
    },
}

#[derive(Args, Debug)]
struct FilterArgs {
    /// recipe or slide
    #[arg(long, default_value = "recipe")]
    kind: ContentKind,
    /// Curriculum id, or ALL
    #[arg(long, default_value = "ALL")]
    curriculum: String,
    /// Language id, or ALL
    #[arg(long, default_value = "ALL")]
    language: String,
    /// in_progress, pending_review, completed, or ALL
    #[arg(long, default_value = "ALL")]
    status: String,
}

impl FilterArgs {
    fn content_filter(&self) -> Result<ContentFilter> {
        Ok(ContentFilter {
            curriculum: Scope::parse(&self.curriculum).context("invalid --curriculum")?,
            language: Scope::parse(&self.language).context("invalid --language")?,
            status: Scope::parse(&self.status).context("invalid --status")?,
        })
    }
}

fn normalize_sqlite_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed == "sqlite::memory:" || trimmed.starts_with("sqlite://") {
        return trimmed.to_string();
    }

    let path_str = trimmed.strip_prefix("sqlite:").unwrap_or(trimmed);
    let path = Path::new(path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<()> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let Some(path) = db_url.strip_prefix("sqlite://") else {
        bail!("invalid database url: {db_url}");
    };
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        bail!("invalid database url: {db_url}");
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)
            .with_context(|| format!("creating {}", path.display()))?;
    }
    Ok(())
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let db_url = normalize_sqlite_url(&cli.db_url);
    prepare_sqlite_file(&db_url)?;
    let app = AppServices::new_sqlite(&db_url, Clock::default())
        .await
        .with_context(|| format!("opening {db_url}"))?;
    info!(%db_url, "database ready");

    match cli.command {
        Command::Migrate => {}
        Command::Seed => {
            let summary = seed_demo(app.storage()).await.context("seeding demo data")?;
            print_json(&json!({
                "subjects": summary.subjects,
                "labels": summary.labels,
                "contents": summary.contents,
            }))?;
        }
        Command::Subjects { filter } => {
            let totals = app
                .dashboard()
                .subject_level(filter.kind, &filter.content_filter()?)
                .await?;
            print_json(&totals)?;
        }
        Command::Topics {
            subject,
            parent,
            filter,
        } => {
            let mut query =
                TopicQuery::roots(filter.kind, subject).with_filter(filter.content_filter()?);
            if let Some(parent) = parent {
                query = query.children_of(LabelId::new(parent));
            }
            let entries = app.dashboard().topic_level(&query).await?;
            print_json(&json!({
                "entries": entries,
                "chart": ChartSeries::from(entries.as_slice()),
            }))?;
        }
        Command::Plan {
            student,
            config,
            name,
        } => {
            let raw = std::fs::read_to_string(&config)
                .with_context(|| format!("reading {}", config.display()))?;
            let plan_config: PlanConfig = serde_json::from_str(&raw)
                .with_context(|| format!("parsing {}", config.display()))?;
            let outcome = app
                .planner()
                .generate_and_save(StudentId::new(student), &name, plan_config)
                .await?;
            print_json(&json!({
                "planId": outcome.plan_id,
                "sessions": outcome.sessions,
            }))?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "syllabus=info,services=info,storage=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    run(Cli::parse()).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlite_urls_are_normalised() {
        assert_eq!(normalize_sqlite_url("sqlite::memory:"), "sqlite::memory:");
        assert_eq!(
            normalize_sqlite_url("sqlite:///tmp/dash.sqlite3"),
            "sqlite:///tmp/dash.sqlite3"
        );
        assert_eq!(
            normalize_sqlite_url("/tmp/dash.sqlite3"),
            "sqlite:///tmp/dash.sqlite3"
        );
        assert_eq!(
            normalize_sqlite_url("sqlite:/tmp/dash.sqlite3"),
            "sqlite:///tmp/dash.sqlite3"
        );
        assert!(normalize_sqlite_url("dash.sqlite3").starts_with("sqlite:///"));
    }

    #[test]
    fn filter_args_parse_wildcards() {
        let args = FilterArgs {
            kind: ContentKind::Slide,
            curriculum: "ALL".into(),
            language: "2".into(),
            status: "completed".into(),
        };
        let filter = args.content_filter().unwrap();
        assert_eq!(filter.curriculum, Scope::Any);
        assert_eq!(filter.language.value().map(|l| l.value()), Some(2));
        assert!(filter.status.value().is_some());

        let bad = FilterArgs {
            status: "archived".into(),
            ..args
        };
        assert!(bad.content_filter().is_err());
    }

    #[test]
    fn cli_parses_topic_drill_down() {
        let cli = Cli::try_parse_from([
            "syllabus",
            "--db",
            "sqlite::memory:",
            "topics",
            "--subject",
            "Physics",
            "--parent",
            "4",
            "--kind",
            "slide",
        ])
        .unwrap();
        match cli.command {
            Command::Topics {
                subject, parent, filter,
            } => {
                assert_eq!(subject, "Physics");
                assert_eq!(parent, Some(4));
                assert_eq!(filter.kind, ContentKind::Slide);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
