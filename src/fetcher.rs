use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::{
    error::AppResult,
    models::{BatchPolicy, DateRange, FetchSummary, GenreFormat},
    storage::{ObjectStore, RawLayout, ensure_dir, save_genre_csv, save_json},
    tmdb::TmdbClient,
};

/// Fetches one detail document per id, in order, writing each locally and
/// then uploading it under the mirrored key.
pub async fn fetch_details(
    tmdb: &TmdbClient,
    store: &dyn ObjectStore,
    layout: &RawLayout,
    range: &DateRange,
    movie_ids: &[i32],
    policy: BatchPolicy,
) -> AppResult<FetchSummary> {
    ensure_dir(&layout.range_folder(range)).await?;

    let mut summary = FetchSummary::default();
    for &movie_id in movie_ids {
        match fetch_detail(tmdb, store, layout, range, movie_id).await {
            Ok(()) => summary.fetched += 1,
            Err(err) => match policy {
                BatchPolicy::AllOrNothing => return Err(err),
                BatchPolicy::BestEffort => {
                    warn!(movie_id = movie_id, error = %err, "failed to fetch movie detail");
                    summary.failed += 1;
                },
            },
        }
    }

    info!(range = %range, fetched = summary.fetched, failed = summary.failed, "movie details fetched");
    Ok(summary)
}

async fn fetch_detail(
    tmdb: &TmdbClient,
    store: &dyn ObjectStore,
    layout: &RawLayout,
    range: &DateRange,
    movie_id: i32,
) -> AppResult<()> {
    let document = tmdb.movie_detail(movie_id).await?;

    let path = layout.document_path(range, movie_id);
    save_json(&path, &document).await?;
    store.put_file(&path, &RawLayout::document_key(range, movie_id)).await?;

    debug!(movie_id = movie_id, path = %path.display(), "saved movie detail");
    Ok(())
}

/// Replaces the local and remote genre taxonomy file.
pub async fn fetch_genres(
    tmdb: &TmdbClient,
    store: &dyn ObjectStore,
    layout: &RawLayout,
    format: GenreFormat,
) -> AppResult<PathBuf> {
    let (raw, list) = tmdb.genre_list().await?;

    ensure_dir(&layout.raw_folder()).await?;
    let path = layout.genre_path(format);
    match format {
        GenreFormat::Csv => save_genre_csv(&path, &list.genres).await?,
        GenreFormat::Json => save_json(&path, &raw).await?,
    }
    store.put_file(&path, &RawLayout::genre_key(format)).await?;

    info!(genres = list.genres.len(), path = %path.display(), "saved genre taxonomy");
    Ok(path)
}
