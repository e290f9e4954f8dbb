use anyhow::{Context, Result, anyhow};
use clap::Parser;
use docguard::replay::{Seed, replay};
use docguard::{Caller, CommandEngine, MemoryDocumentStore, StoreConfig};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{self, AsyncBufRead, BufReader};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "docguard")]
#[command(about = "Replay document commands against an in-memory store")]
struct Cli {
    /// JSON file with collections, roles and users to create first
    #[arg(long)]
    seed: Option<PathBuf>,

    /// JSON store configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// User the commands run as; defaults to the built-in admin
    #[arg(long)]
    user: Option<String>,

    /// Extra role for the caller, repeatable
    #[arg(long = "role")]
    roles: Vec<String>,

    /// JSON-lines command file, or `-` for stdin
    commands: String,
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<StoreConfig> {
    let Some(path) = path else {
        return Ok(StoreConfig::default());
    };

    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config '{}'", path.display()))?;
    let config: StoreConfig = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse config '{}'", path.display()))?;
    config.validate().map_err(|e| anyhow!("Invalid config: {}", e))?;
    Ok(config)
}

async fn resolve_caller(store: &MemoryDocumentStore, user: Option<&str>, extra: &[String]) -> Result<Caller> {
    let base = match user {
        Some(name) => store
            .caller_for(name)
            .await
            .with_context(|| format!("Unknown user '{}'", name))?,
        None => store.admin_caller(),
    };

    let mut roles = base.roles().to_vec();
    for role in extra {
        if !roles.contains(role) {
            roles.push(role.clone());
        }
    }
    Ok(Caller::new(base.username(), roles))
}

async fn open_commands(source: &str) -> Result<Box<dyn AsyncBufRead + Unpin>> {
    if source == "-" {
        return Ok(Box::new(BufReader::new(io::stdin())));
    }

    let file = tokio::fs::File::open(source)
        .await
        .with_context(|| format!("Failed to open commands '{}'", source))?;
    Ok(Box::new(BufReader::new(file)))
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;
    let store = Arc::new(MemoryDocumentStore::with_config(config));

    if let Some(path) = &cli.seed {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read seed '{}'", path.display()))?;
        Seed::from_json_str(&raw)?
            .apply(&store)
            .await
            .with_context(|| format!("Failed to apply seed '{}'", path.display()))?;
    }

    let caller = resolve_caller(&store, cli.user.as_deref(), &cli.roles).await?;
    let engine = CommandEngine::new(store);

    let input = open_commands(&cli.commands).await?;
    let mut stdout = io::stdout();
    let stats = replay(&engine, &caller, input, &mut stdout).await?;

    tracing::info!(
        executed = stats.executed,
        succeeded = stats.succeeded,
        failed = stats.failed,
        "replay finished"
    );
    Ok(())
}
