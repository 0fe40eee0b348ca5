//! Polyhedron command-line driver.
//!
//! Runs a script of store commands against an editor session and prints
//! created ids and `show` output to stdout. Logs go to stderr.
//!
//! ## Usage
//!
//! ```bash
//! # In-process stores, commands from stdin
//! echo "add-project" | polyhedron
//!
//! # Remote mode against a database persisted to a JSON file
//! polyhedron --mode firebase --user amy --db-file tree.json --script edits.txt
//! ```

mod script;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use polyhedron_store::{EditorSession, MemoryDatabase, RealtimeDb, StoreConfig};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Scripted driver for the Polyhedron block and project stores.
#[derive(Parser, Debug)]
#[command(name = "polyhedron")]
#[command(about = "Run block and project store commands")]
struct Args {
    /// RON config file (default: ~/.config/polyhedron/config.ron if present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Store mode: memory or firebase
    #[arg(long)]
    mode: Option<String>,

    /// Signed-in user id for firebase mode
    #[arg(long)]
    user: Option<String>,

    /// JSON file the database is loaded from and saved back to (firebase mode)
    #[arg(long)]
    db_file: Option<PathBuf>,

    /// Command script (default: stdin)
    #[arg(long)]
    script: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => StoreConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => StoreConfig::load_default()?,
    };
    let config = config
        .with_env_overrides()?
        .with_overrides(args.mode.as_deref(), args.user.clone())?;

    let db = if config.mode.is_remote() {
        Some(open_database(args.db_file.as_deref())?)
    } else {
        None
    };
    let handle = db.clone().map(|db| Arc::new(db) as Arc<dyn RealtimeDb>);
    let session = EditorSession::open(&config, handle)?;

    let text = match &args.script {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read script {}", path.display()))?,
        None => std::io::read_to_string(std::io::stdin()).context("failed to read stdin")?,
    };

    let mut failures = 0usize;
    for (number, line) in text.lines().enumerate() {
        let outcome = match script::parse_line(line) {
            Ok(Some(command)) => script::execute(&session, command).await,
            Ok(None) => continue,
            Err(e) => Err(e),
        };
        match outcome {
            Ok(Some(output)) => println!("{output}"),
            Ok(None) => {}
            Err(e) => {
                failures += 1;
                eprintln!("line {}: {e}", number + 1);
            }
        }
    }

    if let (Some(db), Some(path)) = (&db, &args.db_file) {
        save_database(db, path)?;
    }

    if failures > 0 {
        tracing::warn!(failures, "script finished with errors");
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

/// In-process database, loaded from `path` when the file exists.
fn open_database(path: Option<&Path>) -> Result<MemoryDatabase> {
    match path {
        Some(path) if path.exists() => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read database {}", path.display()))?;
            let tree = serde_json::from_str(&text)
                .with_context(|| format!("database {} is not JSON", path.display()))?;
            tracing::info!(path = %path.display(), "loaded database");
            Ok(MemoryDatabase::with_tree(tree))
        }
        _ => Ok(MemoryDatabase::new()),
    }
}

fn save_database(db: &MemoryDatabase, path: &Path) -> Result<()> {
    let text = serde_json::to_string_pretty(&db.export())?;
    std::fs::write(path, text).with_context(|| format!("failed to write database {}", path.display()))?;
    tracing::info!(path = %path.display(), "saved database");
    Ok(())
}
