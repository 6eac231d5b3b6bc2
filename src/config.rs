use std::path::PathBuf;

use anyhow::Context;

use crate::error::{AppError, AppResult};

#[derive(Clone, Debug)]
pub struct Config {
    pub tmdb_api_key: Option<String>,
    pub tmdb_base_url: String,
    pub tmdb_rps: u32,
    pub s3_bucket_name: Option<String>,
    pub aws_region: Option<String>,
    pub s3_endpoint_url: Option<String>,
    pub database_url: String,
    pub work_dir: PathBuf,
    pub log_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let tmdb_api_key = non_empty_var("TMDB_API_KEY");
        let tmdb_base_url = std::env::var("TMDB_BASE_URL")
            .unwrap_or_else(|_| "https://api.themoviedb.org/3".to_string());

        // TMDB documents a limit of 50 requests per second.
        let tmdb_rps: u32 = std::env::var("TMDB_RPS")
            .ok()
            .map(|s| s.parse::<u32>())
            .transpose()
            .context("TMDB_RPS")?
            .unwrap_or(50);

        let database_url = match non_empty_var("DATABASE_URL") {
            Some(url) => url,
            None => {
                let host = std::env::var("DB_HOST").unwrap_or_else(|_| "localhost".to_string());
                let port: u16 = std::env::var("DB_PORT")
                    .unwrap_or_else(|_| "5432".to_string())
                    .parse()
                    .context("DB_PORT")?;
                let name = std::env::var("DB_NAME").unwrap_or_default();
                let user = std::env::var("DB_USER").unwrap_or_default();
                let password = std::env::var("DB_PASSWORD").unwrap_or_default();
                postgres_url(&host, port, &name, &user, &password)
            },
        };

        Ok(Self {
            tmdb_api_key,
            tmdb_base_url,
            tmdb_rps,
            s3_bucket_name: non_empty_var("S3_BUCKET_NAME"),
            aws_region: non_empty_var("AWS_REGION"),
            s3_endpoint_url: non_empty_var("S3_ENDPOINT_URL"),
            database_url,
            work_dir: std::env::var("WORK_DIR").map(PathBuf::from).unwrap_or_else(|_| ".".into()),
            log_dir: std::env::var("LOG_DIR").map(PathBuf::from).unwrap_or_else(|_| "logs".into()),
        })
    }

    pub fn require_api_key(&self) -> AppResult<&str> {
        self.tmdb_api_key
            .as_deref()
            .ok_or_else(|| AppError::Config("TMDB_API_KEY is not set".to_string()))
    }

    pub fn require_bucket(&self) -> AppResult<&str> {
        self.s3_bucket_name
            .as_deref()
            .ok_or_else(|| AppError::Config("S3_BUCKET_NAME is not set".to_string()))
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn postgres_url(host: &str, port: u16, name: &str, user: &str, password: &str) -> String {
    let credentials = match (user.is_empty(), password.is_empty()) {
        (true, _) => String::new(),
        (false, true) => format!("{}@", urlencoding::encode(user)),
        (false, false) => format!("{}:{}@", urlencoding::encode(user), urlencoding::encode(password)),
    };
    format!("postgres://{credentials}{host}:{port}/{name}")
}
