//! epgdb-import: command line front end for the epg.db importer.
//!
//! Subcommands:
//! - `create-empty` writes an empty cache file with the native schema
//! - `check` runs a quick integrity check on the cache file
//! - `import` merges channel events from a JSON file into the cache

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use log::{error, info, warn};
use serde::Deserialize;

use epgdb_import::config::ConfigFile;
use epgdb_import::{
    logging, CacheEngine, CacheState, CommandCacheEngine, DefaultStringHasher, DumpPoller,
    EpgDatabase, ImportConfig, ImportError, ImportSession, NullCacheEngine, Readiness,
};
use epgdb_types::EpgEvent;

/// epgdb-import - Import EPG events into the native epg.db cache
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short = 'f', long)]
    config: Option<PathBuf>,

    /// Path to the epg.db file (overrides the config file)
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Directory where log files are stored (console only when unset)
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Number of days to keep log files
    #[arg(long)]
    log_retention_days: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replace the cache file with an empty database
    CreateEmpty,
    /// Run an integrity check on the cache file
    Check,
    /// Import channel events from a JSON file
    Import {
        /// JSON file with a list of `{ name, services, events }` entries
        #[arg(short, long)]
        events: PathBuf,

        /// Source name recorded in T_Source
        #[arg(short, long, default_value = "EPGImport")]
        source: String,

        /// Source priority
        #[arg(short, long, default_value = "99")]
        priority: i64,

        /// Start from an empty cache instead of the engine's dump
        #[arg(long)]
        from_scratch: bool,

        /// Keep events that ended up to this many hours ago
        #[arg(long)]
        outdated_hours: Option<i64>,

        /// Import events starting within this many days
        #[arg(long)]
        timespan_days: Option<i64>,

        /// Service ids to skip (comma separated)
        #[arg(long, value_delimiter = ',')]
        exclude_sid: Vec<u16>,
    },
}

/// One channel entry of the events file.
#[derive(Debug, Deserialize)]
struct ChannelEvents {
    #[serde(default)]
    name: Option<String>,
    services: Vec<String>,
    #[serde(default)]
    events: Vec<EpgEvent>,
}

fn load_events(path: &Path) -> Result<Vec<ChannelEvents>, Box<dyn std::error::Error>> {
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Load config file: explicit path > auto-detect > default
    let config_path = args.config.clone().or_else(|| {
        let default_path = PathBuf::from("epgdb-import.toml");
        default_path.exists().then_some(default_path)
    });
    let file_config = match &config_path {
        Some(path) => match ConfigFile::load(path) {
            Ok(c) => {
                eprintln!("Loaded config from: {}", path.display());
                c
            }
            Err(e) => {
                eprintln!("Failed to load config file: {}", e);
                return Err(e);
            }
        },
        None => ConfigFile::default(),
    };

    // Command line takes precedence over the config file
    let log_dir = args
        .log_dir
        .clone()
        .or_else(|| file_config.logging.log_dir.as_ref().map(PathBuf::from));
    let retention_days = args
        .log_retention_days
        .or(file_config.logging.retention_days)
        .unwrap_or(7);
    logging::init_logging(
        log_dir.as_deref(),
        retention_days,
        args.verbose,
        file_config.logging.level.as_deref(),
    )?;

    let mut config = file_config.import_config();
    if let Some(path) = args.database {
        config.epgdb_path = path;
    }

    match args.command {
        Command::CreateEmpty => {
            EpgDatabase::create_empty(&config.epgdb_path)?;
            info!("Created {}", config.epgdb_path.display());
        }
        Command::Check => {
            let result = EpgDatabase::check_integrity(&config.epgdb_path);
            println!("{}", result);
            if result != "ok" {
                return Err(format!("integrity check failed: {}", result).into());
            }
        }
        Command::Import {
            events,
            source,
            priority,
            from_scratch,
            outdated_hours,
            timespan_days,
            exclude_sid,
        } => {
            if let Some(hours) = outdated_hours {
                config.outdated_hours = hours;
            }
            if let Some(days) = timespan_days {
                config.timespan_days = days;
            }
            let channels = load_events(&events)?;
            info!("Loaded {} channels from {}", channels.len(), events.display());

            let engine: Arc<dyn CacheEngine> = match (
                file_config.engine.save_command.clone(),
                file_config.engine.load_command.clone(),
            ) {
                (None, None) => Arc::new(NullCacheEngine),
                (save, load) => Arc::new(CommandCacheEngine::new(save, load)),
            };
            let dump_first = file_config.engine.save_command.is_some() && !from_scratch;

            let mut session = open_session(config, &source, priority, engine, from_scratch, dump_first)
                .await?;
            session.set_excluded_sids(exclude_sid);

            if let Err(e) = run_import(&mut session, channels) {
                error!("Import failed: {}", e);
                session.cancel_process();
                return Err(e.into());
            }
            session.final_process()?;

            let stats = session.stats();
            println!("{}", serde_json::to_string_pretty(stats)?);
        }
    }

    Ok(())
}

async fn open_session(
    config: ImportConfig,
    source: &str,
    priority: i64,
    engine: Arc<dyn CacheEngine>,
    from_scratch: bool,
    dump_first: bool,
) -> Result<ImportSession, Box<dyn std::error::Error>> {
    let hasher = Arc::new(DefaultStringHasher);

    if from_scratch {
        return Ok(ImportSession::from_scratch(config, source, priority, engine, hasher)?);
    }
    if !dump_first {
        return Ok(ImportSession::attach(config, source, priority, engine, hasher)?);
    }

    let poller = DumpPoller::new(config.poll_interval());
    let mut session = ImportSession::new(config, source, priority, engine, hasher)?;
    // The save command runs to completion, so the dump has been requested
    // and finished from our side once it returns.
    if !session.cache_state_changed(CacheState::SaveFinished) {
        return Err("engine did not report a pending save".into());
    }

    let cancel = poller.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling");
            cancel.cancel();
        }
    });

    info!(
        "Waiting for {} to settle (polling every {:?})",
        session.path().display(),
        poller.interval()
    );
    match poller.wait_until_ready(&mut session).await? {
        Readiness::Ready => Ok(session),
        other => {
            session.cancel_process();
            Err(format!("epg.db not ready: {:?}", other).into())
        }
    }
}

fn run_import(session: &mut ImportSession, channels: Vec<ChannelEvents>) -> Result<(), ImportError> {
    let names: HashMap<String, String> = channels
        .iter()
        .filter_map(|channel| {
            let name = channel.name.as_ref()?;
            Some(channel.services.iter().map(move |s| (s.clone(), name.clone())))
        })
        .flatten()
        .collect();
    let resolver = |reference: &str| names.get(reference).cloned();

    for channel in channels {
        session.add_events(channel.events);
        let services: Vec<&str> = channel.services.iter().map(String::as_str).collect();
        session.preprocess_events_channel(Some(&services[..]), &resolver)?;
    }
    Ok(())
}
