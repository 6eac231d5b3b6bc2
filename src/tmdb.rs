use std::{num::NonZeroU32, sync::Arc, time::Duration};

use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;

use crate::{
    error::{ApiError, AppResult},
    models::{DateRange, GenreList},
};

pub struct TmdbClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl TmdbClient {
    pub fn new(client: reqwest::Client, api_key: String, base_url: String, rps: u32) -> Self {
        // One slot every 1/rps seconds with no burst, so no 1-second window
        // ever admits more than `rps` calls.
        let period = Duration::from_secs(1) / rps.max(1);
        let quota = Quota::with_period(period)
            .unwrap_or_else(|| Quota::per_second(NonZeroU32::MIN))
            .allow_burst(NonZeroU32::MIN);
        let limiter = Arc::new(RateLimiter::direct(quota));
        Self { client, api_key, base_url, limiter }
    }

    /// Issues one rate-limited GET. Only HTTP 200 counts as success.
    pub async fn send_request(&self, path: &str, params: &[(&str, String)]) -> Result<Value, ApiError> {
        self.limiter.until_ready().await;

        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), path.trim_start_matches('/'));
        let resp = self
            .client
            .get(&url)
            .query(&[("api_key", self.api_key.as_str())])
            .query(params)
            .send()
            .await
            .map_err(|source| ApiError::Transport { url: url.clone(), source })?;

        let status = resp.status();
        if status != StatusCode::OK {
            tracing::debug!(url = %url, status = %status, "non-success response");
            return Err(ApiError::Status { url, status });
        }

        resp.json().await.map_err(|source| ApiError::Decode { url, source })
    }

    /// Movie ids on one page of `discover/movie`. A missing or null result list is empty.
    pub async fn discover_page(&self, range: &DateRange, page: u32) -> AppResult<Vec<i32>> {
        let params = [
            ("page", page.to_string()),
            ("primary_release_date.gte", range.start().to_string()),
            ("primary_release_date.lte", range.end().to_string()),
            ("sort_by", "primary_release_date.desc".to_string()),
        ];
        let body = self.send_request("discover/movie", &params).await?;
        let page: DiscoverPage = serde_json::from_value(body)?;
        Ok(page.results.unwrap_or_default().into_iter().map(|m| m.id).collect())
    }

    pub async fn movie_detail(&self, movie_id: i32) -> Result<Value, ApiError> {
        self.send_request(&format!("movie/{movie_id}"), &[]).await
    }

    /// Raw `genre/movie/list` body together with its typed rows.
    pub async fn genre_list(&self) -> AppResult<(Value, GenreList)> {
        let body = self.send_request("genre/movie/list", &[("language", "en".to_string())]).await?;
        let list = serde_json::from_value(body.clone())?;
        Ok((body, list))
    }
}

#[derive(Debug, Deserialize)]
struct DiscoverPage {
    #[serde(default)]
    results: Option<Vec<DiscoverMovie>>,
}

#[derive(Debug, Deserialize)]
struct DiscoverMovie {
    id: i32,
}
