use std::fmt;
use std::sync::Arc;

use reading_core::ReportZone;
use services::{AnalyticsConfig, AppServices, Clock, ServerRender};
use storage::repository::Storage;
use tracing_subscriber::EnvFilter;

mod report;
mod seed;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidZone { raw: String },
    InvalidVisits { raw: String },
    MissingSlug,
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidZone { raw } => {
                write!(f, "invalid --tz value (expected local, utc or +HH:MM): {raw}")
            }
            ArgsError::InvalidVisits { raw } => write!(f, "invalid --visits value: {raw}"),
            ArgsError::MissingSlug => write!(f, "article requires a slug"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- metrics        [--db <sqlite_url>] [--tz <zone>]");
    eprintln!("  cargo run -p app -- article <slug> [--db <sqlite_url>]");
    eprintln!("  cargo run -p app -- clear          [--db <sqlite_url>]");
    eprintln!("  cargo run -p app -- seed           [--db <sqlite_url>] [--visits <n>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite:analytics.sqlite3");
    eprintln!("  --tz local");
    eprintln!("  --visits 40");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  READING_DB_URL, READING_TZ, READING_MAX_SESSIONS, RUST_LOG");
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Metrics,
    Article(String),
    Clear,
    Seed,
}

struct Args {
    command: Command,
    db_url: String,
    zone: Option<ReportZone>,
    visits: u32,
}

impl Args {
    fn parse(argv: Vec<String>) -> Result<Self, ArgsError> {
        let mut args = argv.into_iter().peekable();

        let first = args.peek().cloned();
        let command = match first.as_deref() {
            None => Command::Metrics,
            Some(first) if first.starts_with("--") || first == "-h" => Command::Metrics,
            Some("metrics") => {
                args.next();
                Command::Metrics
            }
            Some("article") => {
                args.next();
                let slug = args
                    .next()
                    .filter(|s| !s.starts_with("--"))
                    .ok_or(ArgsError::MissingSlug)?;
                Command::Article(slug)
            }
            Some("clear") => {
                args.next();
                Command::Clear
            }
            Some("seed") => {
                args.next();
                Command::Seed
            }
            Some(other) => return Err(ArgsError::UnknownArg(other.to_string())),
        };

        let mut db_url = std::env::var("READING_DB_URL")
            .ok()
            .map_or_else(|| "sqlite://analytics.sqlite3".into(), normalize_sqlite_url);
        let mut zone = None;
        let mut visits = 40;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--tz" => {
                    let value = require_value(&mut args, "--tz")?;
                    zone = Some(
                        ReportZone::parse(&value)
                            .ok_or_else(|| ArgsError::InvalidZone { raw: value.clone() })?,
                    );
                }
                "--visits" => {
                    let value = require_value(&mut args, "--visits")?;
                    visits = value
                        .parse::<u32>()
                        .map_err(|_| ArgsError::InvalidVisits { raw: value.clone() })?;
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            command,
            db_url,
            zone,
            visits,
        })
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let argv: Vec<String> = std::env::args().skip(1).collect();
    let args = Args::parse(argv).inspect_err(|_| print_usage())?;

    let mut config = AnalyticsConfig::from_env();
    if let Some(zone) = args.zone {
        config.report_zone = zone;
    }

    prepare_sqlite_file(&args.db_url)?;
    let storage = Storage::sqlite(&args.db_url).await?;
    tracing::info!(db = %args.db_url, "opened analytics store");

    // No page here, so the dashboard never records a session of its own.
    let services = AppServices::from_storage(
        &storage,
        Clock::default_clock(),
        config.clone(),
        Arc::new(ServerRender),
    );

    match args.command {
        Command::Metrics => {
            let mut dashboard = services.dashboard();
            dashboard.refresh().await;
            if !dashboard.has_data() {
                eprintln!("no analytics data yet");
            }
            if let Some(metrics) = dashboard.metrics() {
                println!("{}", serde_json::to_string_pretty(metrics)?);
            }
        }
        Command::Article(slug) => match services.analytics().get_article_analytics(&slug).await {
            Some(article) => {
                println!("{}", serde_json::to_string_pretty(&report::article_json(&article))?);
            }
            None => eprintln!("no analytics recorded for {slug}"),
        },
        Command::Clear => {
            services.analytics().clear_analytics().await;
            eprintln!("analytics cleared");
        }
        Command::Seed => {
            let count = seed::seed_visits(&storage, &config, chrono::Utc::now(), args.visits).await;
            eprintln!("seeded {count} visits");
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
