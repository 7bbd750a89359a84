use std::fmt;

use chrono::Utc;
use storage::curriculum::{DEFAULT_CURRICULUM, seed_if_empty};
use storage::repository::Storage;
use storage::sqlite::normalize_sqlite_url;
use study_core::model::{Email, Profile, UserId};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    admin_email: Option<String>,
    admin_name: String,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidAdminEmail { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidAdminEmail { raw } => {
                write!(f, "invalid --admin-email value: {raw}")
            }
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

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("TRACKER_DB_URL").unwrap_or_else(|_| "sqlite://tracker.sqlite3".into());
        let mut admin_email = std::env::var("TRACKER_ADMIN_EMAIL").ok();
        let mut admin_name = std::env::var("TRACKER_ADMIN_NAME").unwrap_or_else(|_| "Admin".into());

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--admin-email" => {
                    let value = require_value(&mut args, "--admin-email")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidAdminEmail { raw: value });
                    }
                    admin_email = Some(value);
                }
                "--admin-name" => {
                    admin_name = require_value(&mut args, "--admin-name")?;
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url: normalize_sqlite_url(&db_url),
            admin_email,
            admin_name,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite://tracker.sqlite3)");
    eprintln!("  --admin-email <email>     Create (if missing) and promote this user to admin");
    eprintln!("  --admin-name <name>       Display name for a newly created admin (default: Admin)");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  TRACKER_DB_URL, TRACKER_ADMIN_EMAIL, TRACKER_ADMIN_NAME");
    eprintln!("Logging: RUST_LOG (default: info)");
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let report = seed_if_empty(storage.catalog.as_ref(), DEFAULT_CURRICULUM).await?;

    if let Some(raw) = args.admin_email.as_deref() {
        let email = Email::parse(raw)?;
        let profile = match storage.profiles.find_by_email(&email).await? {
            Some(existing) => existing,
            None => {
                let created = Profile::new(UserId::random(), &args.admin_name, email, Utc::now())?;
                storage.profiles.upsert_profile(&created).await?;
                created
            }
        };
        let granted = storage.roles.grant_admin(profile.user_id()).await?;
        tracing::info!(
            user_id = %profile.user_id(),
            email = profile.email().as_str(),
            newly_granted = granted,
            "admin role ensured"
        );
    }

    tracing::info!(
        db = %args.db_url,
        sections = report.sections,
        topics = report.topics,
        "seed finished"
    );
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(err) = run().await {
        tracing::error!("{err}");
        std::process::exit(2);
    }
}
