use std::fmt;

use services::{Clock, ProgressStore};
use tracing_subscriber::EnvFilter;
use tutor_core::model::LessonId;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingLessonId,
    UnknownArg(String),
    InvalidNumber { flag: &'static str, raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingLessonId => write!(f, "a lesson id is required"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidNumber { flag, raw } => {
                write!(f, "invalid {flag} value: {raw}")
            }
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
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

fn parse_number(flag: &'static str, raw: String) -> Result<u32, ArgsError> {
    raw.parse().map_err(|_| ArgsError::InvalidNumber { flag, raw })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- stats    [--db <sqlite_url>] [--lessons <total>]");
    eprintln!("  cargo run -p app -- complete <lesson-id> [--score <n>] [--time <seconds>]");
    eprintln!("  cargo run -p app -- mistake  <lesson-id> --question <text> --error <text>");
    eprintln!("  cargo run -p app -- reset    [--db <sqlite_url>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite:tutor.sqlite3");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  TUTOR_DB_URL");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Stats,
    Complete,
    Mistake,
    Reset,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "stats" => Some(Self::Stats),
            "complete" => Some(Self::Complete),
            "mistake" => Some(Self::Mistake),
            "reset" => Some(Self::Reset),
            _ => None,
        }
    }
}

struct Args {
    db_url: String,
    lesson_id: Option<LessonId>,
    total_lessons: usize,
    score: u32,
    time_spent: u32,
    question: Option<String>,
    error_description: Option<String>,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("TUTOR_DB_URL")
            .ok()
            .map_or_else(|| "sqlite://tutor.sqlite3".into(), normalize_sqlite_url);
        let mut lesson_id = None;
        let mut total_lessons = 0;
        let mut score = 0;
        let mut time_spent = 0;
        let mut question = None;
        let mut error_description = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--lessons" => {
                    let value = require_value(args, "--lessons")?;
                    total_lessons = parse_number("--lessons", value)? as usize;
                }
                "--score" => {
                    let value = require_value(args, "--score")?;
                    score = parse_number("--score", value)?;
                }
                "--time" => {
                    let value = require_value(args, "--time")?;
                    time_spent = parse_number("--time", value)?;
                }
                "--question" => {
                    question = Some(require_value(args, "--question")?);
                }
                "--error" => {
                    error_description = Some(require_value(args, "--error")?);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                other if !other.starts_with("--") && lesson_id.is_none() => {
                    lesson_id = Some(LessonId::new(other));
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            lesson_id,
            total_lessons,
            score,
            time_spent,
            question,
            error_description,
        })
    }

    fn require_lesson(&self) -> Result<LessonId, ArgsError> {
        self.lesson_id.clone().ok_or(ArgsError::MissingLessonId)
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

fn print_stats(store: &ProgressStore, total_lessons: usize) {
    let overview = store.overview(total_lessons);
    let state = store.current_state();

    println!("Lessons completed: {}", overview.lessons_completed);
    if total_lessons > 0 {
        println!("Overall progress:  {:.1}%", overview.percent_complete);
    }
    println!("Total score:       {}", overview.total_score);
    println!("Active days:       {}", overview.current_streak);
    println!("Time spent:        {}s", overview.total_time_spent);

    if state.progress.lesson_progress.is_empty() {
        println!();
        println!("No lessons started yet.");
        return;
    }

    println!();
    for (id, lesson) in &state.progress.lesson_progress {
        let status = if lesson.is_completed { "done" } else { "open" };
        println!(
            "  {id} [{status}] score {} time {}s mistakes {}",
            lesson.score,
            lesson.time_spent,
            lesson.mistakes.len()
        );
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    let cmd = match argv.first().map(String::as_str) {
        None | Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };
    argv.remove(0);

    let mut iter = argv.into_iter();
    let parsed = Args::parse(&mut iter).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    // Open + migrate SQLite at startup. Keep this in the binary glue so
    // core/services stay pure.
    prepare_sqlite_file(&parsed.db_url)?;
    let store = ProgressStore::open_sqlite(&parsed.db_url, Clock::default_clock()).await?;

    match cmd {
        Command::Stats => {
            print_stats(&store, parsed.total_lessons);
        }
        Command::Complete => {
            let lesson_id = parsed.require_lesson()?;
            store.complete_lesson(lesson_id.clone(), parsed.score, parsed.time_spent);
            println!(
                "completed {lesson_id} (score {}, time {}s)",
                parsed.score, parsed.time_spent
            );
        }
        Command::Mistake => {
            let lesson_id = parsed.require_lesson()?;
            let question = parsed
                .question
                .clone()
                .ok_or(ArgsError::MissingValue { flag: "--question" })?;
            let description = parsed
                .error_description
                .clone()
                .ok_or(ArgsError::MissingValue { flag: "--error" })?;
            store.add_mistake(lesson_id.clone(), question, description);
            println!("{}", store.past_errors(&lesson_id));
        }
        Command::Reset => {
            store.reset().await?;
            println!("progress cleared");
            // Exit without flushing: a flush here would write the fresh
            // initial state back into the storage we just purged.
            return Ok(());
        }
    }

    // CLI invocations are one-shot: write through before exiting rather
    // than waiting out the debounce window.
    if matches!(cmd, Command::Complete | Command::Mistake) {
        store.flush().await?;
    }
    store.shutdown().await;
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
