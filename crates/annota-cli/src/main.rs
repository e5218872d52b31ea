//! annota: operator tool for image note history.
//!
//! Inspects and repairs notes directly against the database: version
//! history, revert, copy between posts, bulk undo of one actor's edits and
//! composite search. Results are printed to stdout as JSON.

mod config;
mod logging;

use std::process::ExitCode;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::info;
use uuid::Uuid;

use annota_db::{
    Actor, Database, Error, NoteRepository, NoteSearchParams, NoteSearchRepository,
    UndoRepository,
};

use config::{CliConfig, LogConfig};

#[derive(Parser, Debug)]
#[command(name = "annota")]
#[command(author, version, about = "Image note versioning and integrity tool")]
#[command(propagate_version = true)]
struct Cli {
    /// ID of the acting user (required for writes and search)
    #[arg(long, global = true)]
    actor: Option<Uuid>,

    /// IP address recorded on writes
    #[arg(long, global = true, default_value = "127.0.0.1")]
    ip: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Apply pending database migrations
    Migrate,

    /// Show a note
    Show {
        /// Note ID
        note: Uuid,
    },

    /// List a note's versions, oldest first
    History {
        /// Note ID
        note: Uuid,
    },

    /// Restore a note from one of its versions
    Revert {
        /// Note ID
        note: Uuid,

        /// Version ID to restore
        #[arg(value_name = "VERSION")]
        version_id: Uuid,

        /// Report a rejected revert as a revert failure
        #[arg(long)]
        strict: bool,
    },

    /// Copy a note onto another post, rescaled to its image
    Copy {
        /// Source note ID
        note: Uuid,

        /// Target post ID
        #[arg(long = "to")]
        to_post: Uuid,
    },

    /// Delete every version written by a user and revert the notes they touched
    Undo {
        /// User whose edits are undone
        target: Uuid,
    },

    /// Search notes; every given filter must match
    Search {
        /// Body text (full-text, or a `*` pattern for privileged users)
        #[arg(long)]
        body: Option<String>,

        /// Post ID
        #[arg(long)]
        post: Option<Uuid>,

        /// Space-separated tags the post must carry
        #[arg(long)]
        tags: Option<String>,

        /// Creator name
        #[arg(long)]
        creator: Option<String>,

        /// Creator ID
        #[arg(long)]
        creator_id: Option<Uuid>,

        /// Active state
        #[arg(long)]
        active: Option<bool>,

        /// Maximum number of results
        #[arg(long)]
        limit: Option<i64>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let _log_guard = logging::init(&LogConfig::from_env());

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report(&e),
    }
}

/// Print the error chain. Rejected writes exit with 2, everything else with 1.
fn report(e: &anyhow::Error) -> ExitCode {
    eprintln!("Error: {:#}", e);
    let errors = match e.downcast_ref::<Error>() {
        Some(Error::Validation(errors)) | Some(Error::RevertFailed { errors, .. }) => errors,
        _ => return ExitCode::FAILURE,
    };
    for field_error in errors.iter() {
        eprintln!("  {}", field_error);
    }
    ExitCode::from(2)
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = CliConfig::from_env()?;
    let db = Database::connect_with_config(&config.database_url, config.pool.clone())
        .await
        .context("connecting to database")?;
    annota_db::log_pool_metrics(db.pool());

    if config.run_migrations || matches!(cli.command, Commands::Migrate) {
        db.migrate().await.context("running migrations")?;
        info!(subsystem = "cli", op = "migrate", "Migrations applied");
    }

    match cli.command {
        Commands::Migrate => {}
        Commands::Show { note } => print_json(&db.notes.fetch(note).await?)?,
        Commands::History { note } => print_json(&db.notes.list_versions(note).await?)?,
        Commands::Revert {
            note,
            version_id,
            strict,
        } => {
            let actor = acting_actor(&db, cli.actor, &cli.ip).await?;
            let reverted = if strict {
                db.notes.revert_to_strict(note, version_id, &actor).await?
            } else {
                db.notes.revert_to(note, version_id, &actor).await?
            };
            print_json(&reverted)?;
        }
        Commands::Copy { note, to_post } => {
            let actor = acting_actor(&db, cli.actor, &cli.ip).await?;
            print_json(&db.notes.copy_to(note, to_post, &actor).await?)?;
        }
        Commands::Undo { target } => {
            let actor = acting_actor(&db, cli.actor, &cli.ip).await?;
            let report = db.undo.undo_all_by_actor(target, &actor).await?;
            print_json(&report)?;
        }
        Commands::Search {
            body,
            post,
            tags,
            creator,
            creator_id,
            active,
            limit,
        } => {
            let actor = acting_actor(&db, cli.actor, &cli.ip).await?;
            let params = NoteSearchParams {
                body_matches: body,
                post_id: post,
                post_tags_match: tags,
                creator_name: creator,
                creator_id,
                is_active: active,
                limit,
            };
            print_json(&db.search.search(&params, &actor).await?)?;
        }
    }
    Ok(())
}

/// Load the acting user; privilege comes from the stored profile.
async fn acting_actor(db: &Database, actor: Option<Uuid>, ip: &str) -> anyhow::Result<Actor> {
    let Some(actor_id) = actor else {
        bail!("--actor is required for this command");
    };
    match db.actors.fetch(actor_id).await? {
        Some(profile) => Ok(profile.acting_from(ip)),
        None => bail!("unknown actor {}", actor_id),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
