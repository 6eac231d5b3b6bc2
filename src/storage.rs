use std::path::{Path, PathBuf};

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::{error::DisplayErrorContext, primitives::ByteStream};
use serde::Serialize;
use serde_json::{Serializer, Value, ser::PrettyFormatter};

use crate::{
    error::{AppError, AppResult},
    models::{DateRange, GenreFormat, GenreRow},
};

/// Folder name locally and key prefix remotely.
pub const RAW_PREFIX: &str = "TMDB_movie_data_raw";
pub const GENRE_FILE_STEM: &str = "TMDB_movie_data_movie_genre";

/// Naming scheme shared by the fetch and load phases. Remote keys mirror
/// local paths below the work directory.
#[derive(Clone, Debug)]
pub struct RawLayout {
    root: PathBuf,
}

impl RawLayout {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self { root: work_dir.into() }
    }

    pub fn raw_folder(&self) -> PathBuf {
        self.root.join(RAW_PREFIX)
    }

    pub fn range_folder(&self, range: &DateRange) -> PathBuf {
        self.raw_folder().join(range_folder_name(range))
    }

    pub fn document_path(&self, range: &DateRange, movie_id: i32) -> PathBuf {
        self.range_folder(range).join(document_file_name(movie_id))
    }

    pub fn document_key(range: &DateRange, movie_id: i32) -> String {
        format!("{RAW_PREFIX}/{}/{}", range_folder_name(range), document_file_name(movie_id))
    }

    pub fn genre_path(&self, format: GenreFormat) -> PathBuf {
        self.raw_folder().join(genre_file_name(format))
    }

    pub fn genre_key(format: GenreFormat) -> String {
        format!("{RAW_PREFIX}/{}", genre_file_name(format))
    }
}

fn range_folder_name(range: &DateRange) -> String {
    format!("{RAW_PREFIX}_{range}")
}

fn document_file_name(movie_id: i32) -> String {
    format!("{RAW_PREFIX}_{movie_id}.json")
}

fn genre_file_name(format: GenreFormat) -> String {
    format!("{GENRE_FILE_STEM}.{}", format.extension())
}

pub async fn ensure_dir(dir: &Path) -> AppResult<()> {
    tokio::fs::create_dir_all(dir).await.map_err(|e| AppError::io(dir, e))
}

/// Writes `value` as UTF-8 JSON indented by four spaces.
pub async fn save_json(path: &Path, value: &Value) -> AppResult<()> {
    let mut buf = Vec::new();
    let mut ser = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    value.serialize(&mut ser)?;
    tokio::fs::write(path, buf).await.map_err(|e| AppError::io(path, e))
}

/// Writes the taxonomy as an `id,name` CSV with a header row.
pub async fn save_genre_csv(path: &Path, rows: &[GenreRow]) -> AppResult<()> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer.serialize(row)?;
    }
    let buf = writer.into_inner().map_err(|e| AppError::io(path, e.into_error()))?;
    tokio::fs::write(path, buf).await.map_err(|e| AppError::io(path, e))
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put_file(&self, local: &Path, key: &str) -> AppResult<()>;
}

pub struct S3Store {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3Store {
    /// Credentials come from the default AWS provider chain.
    pub async fn connect(bucket: String, region: Option<String>, endpoint_url: Option<String>) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(aws_config::Region::new(region));
        }
        let shared = loader.load().await;

        let mut s3_config = aws_sdk_s3::config::Builder::from(&shared);
        if let Some(endpoint) = endpoint_url {
            s3_config = s3_config.endpoint_url(endpoint).force_path_style(true);
        }

        let client = aws_sdk_s3::Client::from_conf(s3_config.build());
        Self { client, bucket }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put_file(&self, local: &Path, key: &str) -> AppResult<()> {
        let body = ByteStream::from_path(local)
            .await
            .map_err(|e| AppError::Storage { key: key.to_string(), reason: e.to_string() })?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .send()
            .await
            .map_err(|e| AppError::Storage {
                key: key.to_string(),
                reason: DisplayErrorContext(&e).to_string(),
            })?;

        tracing::debug!(bucket = %self.bucket, key = %key, "uploaded");
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::*;

    /// Records uploads and optionally rejects one key.
    #[derive(Default)]
    pub struct RecordingStore {
        pub uploads: Mutex<Vec<(PathBuf, String)>>,
        pub reject_key: Option<String>,
    }

    impl RecordingStore {
        pub fn keys(&self) -> Vec<String> {
            self.uploads.lock().unwrap().iter().map(|(_, k)| k.clone()).collect()
        }
    }

    #[async_trait]
    impl ObjectStore for RecordingStore {
        async fn put_file(&self, local: &Path, key: &str) -> AppResult<()> {
            if self.reject_key.as_deref() == Some(key) {
                return Err(AppError::Storage { key: key.to_string(), reason: "rejected".to_string() });
            }
            assert!(local.exists(), "uploaded file {} is missing", local.display());
            self.uploads.lock().unwrap().push((local.to_path_buf(), key.to_string()));
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use jiff::civil::date;

    use super::*;

    #[test]
    fn single_day_and_range_folders() {
        let layout = RawLayout::new("/work");
        let day = DateRange::single(date(2023, 10, 20));
        let range = DateRange::new(date(2023, 10, 1), date(2023, 10, 20)).unwrap();

        assert_eq!(
            layout.document_path(&day, 42),
            Path::new("/work/TMDB_movie_data_raw/TMDB_movie_data_raw_2023-10-20/TMDB_movie_data_raw_42.json")
        );
        assert_eq!(
            RawLayout::document_key(&range, 42),
            "TMDB_movie_data_raw/TMDB_movie_data_raw_2023-10-01_2023-10-20/TMDB_movie_data_raw_42.json"
        );
    }

    #[test]
    fn genre_file_per_format() {
        let layout = RawLayout::new("w");
        assert_eq!(
            layout.genre_path(GenreFormat::Csv),
            Path::new("w").join("TMDB_movie_data_raw").join("TMDB_movie_data_movie_genre.csv")
        );
        assert_eq!(RawLayout::genre_key(GenreFormat::Json), "TMDB_movie_data_raw/TMDB_movie_data_movie_genre.json");
    }

    #[tokio::test]
    async fn json_is_indented_and_keeps_unicode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        save_json(&path, &serde_json::json!({"title": "Amélie"})).await.unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "{\n    \"title\": \"Amélie\"\n}");
    }

    #[tokio::test]
    async fn genre_csv_has_header_and_rows_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("genres.csv");
        let rows = vec![
            GenreRow { id: 28, name: "Action".to_string() },
            GenreRow { id: 10402, name: "Music".to_string() },
        ];
        save_genre_csv(&path, &rows).await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "id,name\n28,Action\n10402,Music\n");
    }
}
