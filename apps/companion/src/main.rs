use std::{path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use client_core::{
    config::{load_settings, Settings},
    display::EntryTimestamp,
    timer::format_clock,
    CredentialProvider, DeleteOutcome, EntryListController, EntryStore, GroupId, HttpEntryStore,
    LoadOutcome, MissingCredentials, PracticeTimer, StaticCredentials, TimerStatus,
    WizardSession,
};
use shared::{
    content::ExerciseContent,
    domain::{EntryId, ExerciseKind},
    protocol::{Entry, EntryFields},
};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod interactive;

#[derive(Parser, Debug)]
#[command(name = "companion", about = "Practice companion for skills exercises")]
struct Args {
    /// TOML settings file (defaults to ./companion.toml when present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[arg(long, global = true)]
    api_url: Option<String>,
    #[arg(long, global = true)]
    token: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print saved entries for one exercise, newest first.
    List {
        #[arg(long)]
        exercise: ExerciseKind,
        #[arg(long)]
        grouped: bool,
    },
    /// Delete one entry, or a whole group with --grouped.
    Delete {
        #[arg(long)]
        exercise: ExerciseKind,
        id: String,
        #[arg(long)]
        grouped: bool,
    },
    /// Save a single entry from field=value pairs.
    Create {
        #[arg(long)]
        exercise: ExerciseKind,
        #[arg(required = true, value_parser = parse_field)]
        fields: Vec<(String, String)>,
    },
    /// Walk through a guided exercise on stdin.
    Wizard {
        #[arg(long)]
        content: PathBuf,
    },
    /// Count down a timed practice.
    Timer {
        #[arg(long, default_value_t = 300)]
        seconds: u32,
    },
}

fn parse_field(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected field=value, got {raw:?}")),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut settings = load_settings(args.config.as_deref())?;
    if let Some(api_url) = args.api_url {
        settings.api_base_url = api_url;
    }
    if let Some(token) = args.token {
        settings.api_token = Some(token);
    }

    match args.command {
        Command::List { exercise, grouped } => list(&settings, exercise, grouped).await,
        Command::Delete {
            exercise,
            id,
            grouped,
        } => delete(&settings, exercise, &id, grouped).await,
        Command::Create { exercise, fields } => create(&settings, exercise, fields).await,
        Command::Wizard { content } => wizard(&settings, content).await,
        Command::Timer { seconds } => timer(seconds).await,
    }
}

fn build_store(settings: &Settings) -> Result<Arc<dyn EntryStore>> {
    let credentials: Arc<dyn CredentialProvider> = match &settings.api_token {
        Some(token) => Arc::new(StaticCredentials::new(token.clone())),
        None => Arc::new(MissingCredentials),
    };
    let store = HttpEntryStore::new(settings.api_url()?, credentials, settings.request_timeout())?;
    Ok(Arc::new(store))
}

fn controller(
    settings: &Settings,
    exercise: ExerciseKind,
    grouped: bool,
) -> Result<Arc<EntryListController>> {
    let store = build_store(settings)?;
    Ok(if grouped {
        EntryListController::grouped(store, exercise, settings.group_bucket_secs)
    } else {
        EntryListController::new(store, exercise)
    })
}

async fn load(list: &EntryListController) -> Result<usize> {
    match list.load().await {
        LoadOutcome::Loaded(count) => Ok(count),
        LoadOutcome::Failed(err) => bail!("{}", err.user_message()),
        LoadOutcome::Discarded => bail!("load was superseded"),
    }
}

fn print_entry(entry: &Entry) {
    let stamp = EntryTimestamp::of(entry.created_at, &Local);
    println!("#{}  {} {}", entry.id, stamp.date, stamp.time);
    for (field, value) in &entry.fields {
        println!("    {field}: {value}");
    }
}

async fn list(settings: &Settings, exercise: ExerciseKind, grouped: bool) -> Result<()> {
    let list = controller(settings, exercise, grouped)?;
    let count = load(&list).await?;
    if count == 0 {
        println!("No entries yet.");
        return Ok(());
    }

    if grouped {
        for group in list.groups().await {
            let when = group
                .created_at()
                .map(|created_at| {
                    let stamp = EntryTimestamp::of(created_at, &Local);
                    format!("{} {}", stamp.date, stamp.time)
                })
                .unwrap_or_default();
            println!("group {}  {when}", group.id().0);
            for value in group.values() {
                println!("    {value}");
            }
        }
    } else {
        for entry in list.entries().await {
            print_entry(&entry);
        }
    }
    Ok(())
}

async fn delete(settings: &Settings, exercise: ExerciseKind, id: &str, grouped: bool) -> Result<()> {
    let list = controller(settings, exercise, grouped)?;
    load(&list).await?;

    let result = if grouped {
        let group_id = id
            .parse::<i64>()
            .with_context(|| format!("group id must be a number, got {id:?}"))?;
        list.delete_group(GroupId(group_id)).await
    } else {
        list.delete(&EntryId::from(id)).await
    };

    match result {
        Ok(DeleteOutcome::Deleted) => {
            println!("Deleted. {} entries remain.", list.entries().await.len());
            Ok(())
        }
        Ok(DeleteOutcome::AlreadyPending) => {
            println!("A delete for {id} is already running.");
            Ok(())
        }
        Err(err) => bail!("{}", err.user_message()),
    }
}

async fn create(
    settings: &Settings,
    exercise: ExerciseKind,
    fields: Vec<(String, String)>,
) -> Result<()> {
    let store = build_store(settings)?;
    let fields: EntryFields = fields.into_iter().collect();
    let entry = store
        .create_entry(&exercise, fields)
        .await
        .map_err(|err| anyhow::anyhow!(err.user_message()))?;
    print_entry(&entry);
    Ok(())
}

async fn wizard(settings: &Settings, path: PathBuf) -> Result<()> {
    let raw = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let content = ExerciseContent::from_json(&raw)
        .with_context(|| format!("failed to load {}", path.display()))?;
    let session = WizardSession::new(Arc::new(content), build_store(settings)?)?
        .with_notice_ttl(settings.notice_ttl());
    interactive::run_wizard(session).await
}

async fn timer(seconds: u32) -> Result<()> {
    let mut timer =
        PracticeTimer::new(seconds).on_complete(|| info!("timer: practice complete"));
    let mut updates = timer.subscribe();
    println!("{}", format_clock(seconds));
    timer.start();

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = *updates.borrow_and_update();
                println!("{}", format_clock(snapshot.remaining_secs));
                if snapshot.status == TimerStatus::Expired {
                    println!("Time is up.");
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                timer.pause();
                println!("Paused at {}.", format_clock(timer.snapshot().remaining_secs));
                break;
            }
        }
    }
    Ok(())
}
