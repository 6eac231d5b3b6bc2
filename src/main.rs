mod config;
mod db;
mod discover;
mod entities;
mod error;
mod fetcher;
mod loader;
mod logging;
mod models;
mod storage;
mod tmdb;

use std::{path::PathBuf, time::Duration};

use clap::{Parser, Subcommand};
use jiff::civil::Date;
use tracing::{error, info};

use crate::{
    config::Config,
    discover::MAX_PAGES,
    error::{AppError, AppResult},
    models::{BatchPolicy, DateRange, DuplicatePolicy, GenreFormat, parse_cli_date},
    storage::{RawLayout, S3Store},
    tmdb::TmdbClient,
};

#[derive(Debug, Parser)]
#[command(name = "movieload", version, about = "Extract TMDB movie metadata and load it into Postgres")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create the movie, genre, movie_genre and production_company tables if absent
    CreateTables,

    /// Fetch the genre taxonomy, save it locally and upload it
    FetchGenres {
        #[arg(long, value_enum, default_value_t = GenreFormat::Csv)]
        format: GenreFormat,
    },

    /// Insert the saved genre taxonomy into the genre table
    LoadGenres {
        /// Taxonomy file (.csv or .json); defaults to the fetched CSV
        file: Option<PathBuf>,
    },

    /// Discover movies released in a date range and fetch their detail documents
    Fetch {
        /// First release date, YYYYMMDD or YYYY-MM-DD (default: today)
        #[arg(long, value_parser = parse_cli_date)]
        start: Option<Date>,

        /// Last release date, inclusive (default: the start date)
        #[arg(long, value_parser = parse_cli_date)]
        end: Option<Date>,

        /// Drop movie ids repeated across result pages
        #[arg(long)]
        dedup: bool,

        /// Skip movies that fail instead of aborting the batch
        #[arg(long)]
        best_effort: bool,

        /// Stop after this many result pages (at most 500)
        #[arg(long, default_value_t = MAX_PAGES)]
        max_pages: u32,
    },

    /// Load fetched detail documents from a directory
    Load {
        /// Folder holding TMDB_movie_data_raw_<id>.json files
        dir: PathBuf,

        /// Commit each document separately and skip failing ones
        #[arg(long)]
        best_effort: bool,
    },
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::CreateTables => "create-tables",
            Command::FetchGenres { .. } => "fetch-genres",
            Command::LoadGenres { .. } => "load-genres",
            Command::Fetch { .. } => "fetch",
            Command::Load { .. } => "load",
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;
    let log_file = logging::init(&config.log_dir, cli.command.name())?;
    tracing::debug!(log_file = %log_file.display(), command = cli.command.name(), "starting");

    match run(&config, cli.command).await {
        Ok(status) => {
            info!("{status}");
            Ok(())
        },
        Err(err) => {
            error!(error = %err, "run failed");
            Err(err.into())
        },
    }
}

async fn run(config: &Config, command: Command) -> AppResult<String> {
    let layout = RawLayout::new(&config.work_dir);

    match command {
        Command::CreateTables => {
            let db = db::connect(&config.database_url).await?;
            let result = db::create_tables(&db).await;
            let closed = db.close().await;
            result?;
            closed?;
            Ok("tables created".to_string())
        },

        Command::FetchGenres { format } => {
            let (tmdb, store) = fetch_clients(config).await?;
            let path = fetcher::fetch_genres(&tmdb, &store, &layout, format).await?;
            Ok(format!("genre taxonomy saved to {}", path.display()))
        },

        Command::LoadGenres { file } => {
            let path = file.unwrap_or_else(|| layout.genre_path(GenreFormat::Csv));
            if !path.is_file() {
                return Err(AppError::Config(format!("genre file {} not found", path.display())));
            }

            let db = db::connect(&config.database_url).await?;
            let result = loader::load_genres(&db, &path).await;
            let closed = db.close().await;
            let inserted = result?;
            closed?;
            Ok(format!("genre data insertion completed: {inserted} rows"))
        },

        Command::Fetch { start, end, dedup, best_effort, max_pages } => {
            let start = start.unwrap_or_else(|| jiff::Zoned::now().date());
            let range = DateRange::new(start, end.unwrap_or(start))?;
            let duplicates = if dedup { DuplicatePolicy::Dedup } else { DuplicatePolicy::Keep };

            let (tmdb, store) = fetch_clients(config).await?;
            let discovered = discover::discover_movie_ids(&tmdb, &range, max_pages, duplicates).await?;
            let summary =
                fetcher::fetch_details(&tmdb, &store, &layout, &range, &discovered.ids, batch_policy(best_effort))
                    .await?;
            let note = if discovered.truncated { " (page limit reached, more movies may exist)" } else { "" };
            Ok(format!(
                "fetch completed for {range}: {} documents saved, {} failed{note}",
                summary.fetched, summary.failed
            ))
        },

        Command::Load { dir, best_effort } => {
            if !dir.is_dir() {
                return Err(AppError::Config(format!("no folder selected: {} is not a directory", dir.display())));
            }

            let files = loader::list_documents(&dir).await?;

            let db = db::connect(&config.database_url).await?;
            let result = loader::load_documents(&db, &files, batch_policy(best_effort)).await;
            let closed = db.close().await;
            let summary = result?;
            closed?;
            Ok(format!("data insertion completed: {} documents loaded, {} failed", summary.loaded, summary.failed))
        },
    }
}

fn batch_policy(best_effort: bool) -> BatchPolicy {
    if best_effort { BatchPolicy::BestEffort } else { BatchPolicy::AllOrNothing }
}

/// Validates credentials before any network or file I/O happens.
async fn fetch_clients(config: &Config) -> AppResult<(TmdbClient, S3Store)> {
    let api_key = config.require_api_key()?.to_string();
    let bucket = config.require_bucket()?.to_string();

    let http = reqwest::Client::builder()
        .user_agent("movieload/0.1")
        .timeout(Duration::from_secs(30))
        .build()
        .map_err(|e| AppError::Other(e.into()))?;

    let tmdb = TmdbClient::new(http, api_key, config.tmdb_base_url.clone(), config.tmdb_rps);
    let store = S3Store::connect(bucket, config.aws_region.clone(), config.s3_endpoint_url.clone()).await;
    Ok((tmdb, store))
}
