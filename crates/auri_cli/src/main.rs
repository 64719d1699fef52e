//! Command-line entry point for the Auri core.
//!
//! # Responsibility
//! - Drive the local stores from a terminal for inspection and scripting.
//! - Print records as JSON so output can be piped into other tools.

use auri_core::assessment::{score, Questionnaire};
use auri_core::chat::usage_meter::Plan;
use auri_core::service::roleplay_service::NewRoleplay;
use auri_core::{
    init_logging, ActivityCategory, AuriCore, CoreConfig, MemorySource, RecordId, Session,
};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::error::Error;
use std::path::PathBuf;

type CliResult<T> = Result<T, Box<dyn Error>>;

#[derive(Parser, Debug)]
#[command(name = "auri", version, about = "Inspect and drive Auri's local stores")]
struct Args {
    /// JSON config file; `AURI_*` variables override it.
    #[arg(long, env = "AURI_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite database path; overrides the config file.
    #[arg(long, env = "AURI_DB_PATH")]
    db: Option<PathBuf>,

    /// Absolute directory for rolling log files; logging is off when unset.
    #[arg(long, env = "AURI_LOG_DIR")]
    log_dir: Option<String>,

    /// Session used for remote mirroring, as `user_id:access_token`.
    #[arg(long, env = "AURI_SESSION", hide_env_values = true)]
    session: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Prints core linkage information.
    Ping,
    #[command(subcommand)]
    Activity(ActivityCommand),
    #[command(subcommand)]
    Memory(MemoryCommand),
    #[command(subcommand)]
    Roleplay(RoleplayCommand),
    /// Scores a questionnaire (`phq9` or `gad7`) from 0-3 answers.
    Assess {
        questionnaire: String,
        #[arg(required = true, num_args = 1..)]
        answers: Vec<u8>,
    },
    /// Shows today's message usage, optionally counting one message.
    Usage {
        #[arg(long)]
        premium: bool,
        #[arg(long)]
        record: bool,
    },
    /// Runs one outbox drain pass over every store.
    Drain,
}

#[derive(Subcommand, Debug)]
enum ActivityCommand {
    Log {
        category: String,
        #[arg(long)]
        note: Option<String>,
    },
    List {
        #[arg(long)]
        category: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum MemoryCommand {
    Add {
        content: String,
        #[arg(long, default_value = "user")]
        source: String,
    },
    List,
    /// Prints the chat context block built from recent notes.
    Context {
        #[arg(long, default_value_t = 10)]
        max: usize,
    },
}

#[derive(Subcommand, Debug)]
enum RoleplayCommand {
    Add {
        #[arg(long)]
        title: String,
        #[arg(long)]
        scenario: String,
        #[arg(long, default_value = "")]
        partner_role: String,
        #[arg(long)]
        goal: Option<String>,
    },
    List,
    Delete { id: RecordId },
}

#[tokio::main]
async fn main() -> CliResult<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => CoreConfig::load(path)?,
        None => {
            let mut config = CoreConfig::default();
            config.apply_env_overrides(|name| std::env::var(name).ok())?;
            config
        }
    };
    if let Some(db) = &args.db {
        config.db_path = db.clone();
    }
    if let Some(log_dir) = &args.log_dir {
        init_logging(&config.log_level, log_dir)?;
    }

    if let Command::Ping = args.command {
        println!("auri_core ping={}", auri_core::ping());
        println!("auri_core version={}", auri_core::core_version());
        return Ok(());
    }
    if let Command::Assess {
        questionnaire,
        answers,
    } = &args.command
    {
        let result = score(parse_questionnaire(questionnaire)?, answers)?;
        return print_json(&result);
    }

    let core = AuriCore::open(config, tokio::runtime::Handle::current())?;
    if let Some(raw) = &args.session {
        let (user_id, token) = raw
            .split_once(':')
            .ok_or("session must be `user_id:access_token`")?;
        core.sign_in(Session::new(user_id, token));
    }

    match args.command {
        Command::Activity(ActivityCommand::Log { category, note }) => {
            let category = category.parse::<ActivityCategory>()?;
            print_json(&core.activity().log(category, note.as_deref())?)
        }
        Command::Activity(ActivityCommand::List { category }) => {
            let records = match category {
                Some(category) => core
                    .activity()
                    .list_by_category(category.parse::<ActivityCategory>()?),
                None => core.activity().list(),
            };
            print_json(&records)
        }
        Command::Memory(MemoryCommand::Add { content, source }) => {
            let source = source.parse::<MemorySource>()?;
            print_json(&core.memory().remember(&content, source)?)
        }
        Command::Memory(MemoryCommand::List) => print_json(&core.memory().list()),
        Command::Memory(MemoryCommand::Context { max }) => {
            println!("{}", core.memory().context_block(max));
            Ok(())
        }
        Command::Roleplay(RoleplayCommand::Add {
            title,
            scenario,
            partner_role,
            goal,
        }) => {
            let record = core.roleplay().create(NewRoleplay {
                title,
                scenario,
                partner_role,
                goal,
            })?;
            print_json(&record)
        }
        Command::Roleplay(RoleplayCommand::List) => print_json(&core.roleplay().list()),
        Command::Roleplay(RoleplayCommand::Delete { id }) => {
            let removed = core.roleplay().delete(id)?;
            print_json(&serde_json::json!({ "id": id, "removed": removed }))
        }
        Command::Usage { premium, record } => {
            let plan = if premium { Plan::Premium } else { Plan::Free };
            let snapshot = if record {
                core.usage().record_message(plan)?
            } else {
                core.usage().snapshot(plan)
            };
            print_json(&serde_json::json!({
                "used": snapshot.used,
                "limit": snapshot.limit,
                "remaining": snapshot.remaining(),
            }))
        }
        Command::Drain => {
            let outcomes = core.drain_outboxes().await;
            println!("{outcomes:?}");
            Ok(())
        }
        Command::Ping | Command::Assess { .. } => Ok(()),
    }
}

fn parse_questionnaire(raw: &str) -> CliResult<Questionnaire> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "phq9" | "phq-9" => Ok(Questionnaire::Phq9),
        "gad7" | "gad-7" => Ok(Questionnaire::Gad7),
        other => Err(format!("unknown questionnaire `{other}`; expected phq9|gad7").into()),
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
