use std::path::{Path, PathBuf};

use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, Set, TransactionTrait,
    prelude::Date, sea_query::OnConflict,
};
use tracing::{debug, info, warn};

use crate::{
    entities::{genre, movie, movie_genre, production_company},
    error::{AppError, AppResult},
    models::{BatchPolicy, GenreList, GenreRow, LoadSummary, MovieDocument, split_ymd},
};

/// Loads the given detail documents in order.
///
/// With [`BatchPolicy::AllOrNothing`] all files share one transaction that
/// is committed once at the end, so any failure leaves the database
/// untouched. With [`BatchPolicy::BestEffort`] each file gets its own
/// transaction and failing files are skipped.
pub async fn load_documents(
    db: &DatabaseConnection,
    files: &[PathBuf],
    policy: BatchPolicy,
) -> AppResult<LoadSummary> {
    let mut summary = LoadSummary::default();
    match policy {
        BatchPolicy::AllOrNothing => {
            let txn = db.begin().await?;
            for path in files {
                load_file(&txn, path).await?;
                summary.loaded += 1;
            }
            txn.commit().await?;
        },
        BatchPolicy::BestEffort => {
            for path in files {
                let txn = db.begin().await?;
                match load_file(&txn, path).await {
                    Ok(()) => {
                        txn.commit().await?;
                        summary.loaded += 1;
                    },
                    Err(err) => {
                        txn.rollback().await?;
                        warn!(file = %path.display(), error = %err, "skipped document");
                        summary.failed += 1;
                    },
                }
            }
        },
    }

    Ok(summary)
}

/// Lists `*.json` files in `dir` sorted by name. A directory with no
/// entries at all is an error.
pub async fn list_documents(dir: &Path) -> AppResult<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await.map_err(|e| AppError::io(dir, e))?;

    let mut any_entry = false;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(|e| AppError::io(dir, e))? {
        any_entry = true;
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "json") && path.is_file() {
            files.push(path);
        }
    }

    if !any_entry {
        return Err(AppError::data(format!("the selected directory {} is empty", dir.display())));
    }

    files.sort();
    debug!(dir = %dir.display(), files = files.len(), "found detail documents");
    Ok(files)
}

/// Errors come back tagged with the file they came from.
async fn load_file<C: ConnectionTrait>(conn: &C, path: &Path) -> AppResult<()> {
    let movie_id = read_and_load(conn, path)
        .await
        .map_err(|source| AppError::Document { path: path.to_path_buf(), source: Box::new(source) })?;

    let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
    info!(file = %name, movie_id = movie_id, "inserted data");
    Ok(())
}

async fn read_and_load<C: ConnectionTrait>(conn: &C, path: &Path) -> AppResult<i32> {
    let text = tokio::fs::read_to_string(path).await.map_err(|e| AppError::io(path, e))?;
    let document: MovieDocument = serde_json::from_str(&text)?;
    load_document(conn, &document).await?;
    Ok(document.id)
}

/// Inserts one movie with its genre links and production companies.
pub async fn load_document<C: ConnectionTrait>(conn: &C, doc: &MovieDocument) -> AppResult<()> {
    let release_date = parse_release_date(doc.release_date.as_deref())?;

    let model = movie::ActiveModel {
        id: Set(doc.id),
        adult: Set(Some(doc.adult)),
        budget: Set(Some(doc.budget)),
        homepage: Set(doc.homepage.clone()),
        imdb_id: Set(doc.imdb_id.clone()),
        original_language: Set(doc.original_language.clone()),
        original_title: Set(doc.original_title.clone()),
        overview: Set(doc.overview.clone()),
        popularity: Set(Some(doc.popularity)),
        release_date: Set(release_date),
        revenue: Set(Some(doc.revenue)),
        runtime: Set(doc.runtime),
        title: Set(doc.title.clone()),
        vote_average: Set(Some(doc.vote_average)),
        vote_count: Set(Some(doc.vote_count)),
    };
    let movie_id = movie::Entity::insert(model).exec(conn).await?.last_insert_id;

    for genre_ref in &doc.genres {
        let genre = genre::Entity::find()
            .filter(genre::Column::Name.eq(genre_ref.name.as_str()))
            .one(conn)
            .await?
            .ok_or_else(|| {
                AppError::data(format!("movie {movie_id}: genre {:?} is not in the genre table", genre_ref.name))
            })?;

        let link = movie_genre::ActiveModel { movie_id: Set(movie_id), genre_id: Set(genre.id) };
        movie_genre::Entity::insert(link).exec_without_returning(conn).await?;
    }

    for company in &doc.production_companies {
        let model = production_company::ActiveModel {
            id: Set(company.id),
            name: Set(Some(company.name.clone())),
            origin_country: Set(company.origin_country.clone()),
        };
        // First writer wins: an existing company keeps its name and country.
        let inserted = production_company::Entity::insert(model)
            .on_conflict(OnConflict::column(production_company::Column::Id).do_nothing().to_owned())
            .exec_without_returning(conn)
            .await?;
        if inserted == 0 {
            debug!(company_id = company.id, "production company already present");
        }
    }

    Ok(())
}

/// Empty or absent dates are stored as NULL; anything else must be `YYYY-MM-DD`.
pub fn parse_release_date(value: Option<&str>) -> AppResult<Option<Date>> {
    let Some(value) = value.filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    split_ymd(value)
        .and_then(|(y, m, d)| Date::from_ymd_opt(y.into(), m as u32, d as u32))
        .map(Some)
        .ok_or_else(|| AppError::data(format!("release date {value:?} does not match YYYY-MM-DD")))
}

/// Inserts the genre taxonomy in file order inside one transaction.
/// `.json` files are read in the `genre/movie/list` shape, anything else as
/// an `id,name` CSV.
pub async fn load_genres(db: &DatabaseConnection, path: &Path) -> AppResult<usize> {
    let rows = read_genre_file(path).await?;

    let txn = db.begin().await?;
    for row in &rows {
        let model = genre::ActiveModel { id: Set(row.id), name: Set(Some(row.name.clone())) };
        genre::Entity::insert(model).exec_without_returning(&txn).await?;
    }
    txn.commit().await?;

    info!(file = %path.display(), genres = rows.len(), "inserted genres");
    Ok(rows.len())
}

async fn read_genre_file(path: &Path) -> AppResult<Vec<GenreRow>> {
    let text = tokio::fs::read_to_string(path).await.map_err(|e| AppError::io(path, e))?;

    if path.extension().is_some_and(|ext| ext == "json") {
        let list: GenreList = serde_json::from_str(&text)?;
        return Ok(list.genres);
    }

    csv::Reader::from_reader(text.as_bytes())
        .deserialize()
        .collect::<Result<Vec<GenreRow>, _>>()
        .map_err(AppError::from)
}
