use std::collections::HashSet;

use tracing::{debug, info};

use crate::{
    error::AppResult,
    models::{DateRange, DuplicatePolicy},
    tmdb::TmdbClient,
};

/// TMDB serves at most this many pages for one discover query.
pub const MAX_PAGES: u32 = 500;

/// Movie ids found by one discover walk.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Discovered {
    pub ids: Vec<i32>,
    /// The last allowed page still had results, so more may exist.
    pub truncated: bool,
}

/// Walks `discover/movie` pages for `range` until a page comes back empty
/// or the page cap is hit. `max_pages` can lower the cap, never raise it.
pub async fn discover_movie_ids(
    tmdb: &TmdbClient,
    range: &DateRange,
    max_pages: u32,
    duplicates: DuplicatePolicy,
) -> AppResult<Discovered> {
    let last_page = max_pages.clamp(1, MAX_PAGES);
    let mut ids = Vec::new();
    let mut truncated = false;

    for page in 1..=last_page {
        let found = tmdb.discover_page(range, page).await?;
        debug!(page = page, found = found.len(), "fetched discover page");

        if found.is_empty() {
            break;
        }
        ids.extend(found);

        if page == last_page {
            truncated = true;
            info!(
                pages = last_page,
                "fetched {last_page} pages of results; more movies may exist beyond the page limit"
            );
        }
    }

    if duplicates == DuplicatePolicy::Dedup {
        let before = ids.len();
        let mut seen = HashSet::new();
        ids.retain(|id| seen.insert(*id));
        debug!(removed = before - ids.len(), "dropped duplicate movie ids");
    }

    info!(range = %range, movies = ids.len(), "discovered movie ids");
    Ok(Discovered { ids, truncated })
}

#[cfg(test)]
mod tests {
    use jiff::civil::date;
    use serde_json::json;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path, query_param},
    };

    use super::*;
    use crate::error::{ApiError, AppError};

    async fn mount_page(server: &MockServer, page: u32, ids: &[i32], expect: u64) {
        let results: Vec<_> = ids.iter().map(|id| json!({"id": id})).collect();
        Mock::given(method("GET"))
            .and(path("/discover/movie"))
            .and(query_param("page", page.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"page": page, "results": results})))
            .expect(expect)
            .mount(server)
            .await;
    }

    fn tmdb(server: &MockServer) -> TmdbClient {
        TmdbClient::new(reqwest::Client::new(), "k".to_string(), server.uri(), 10_000)
    }

    fn range() -> DateRange {
        DateRange::new(date(2023, 10, 1), date(2023, 10, 2)).unwrap()
    }

    #[tokio::test]
    async fn stops_at_first_empty_page() {
        let server = MockServer::start().await;
        mount_page(&server, 1, &[10, 11], 1).await;
        mount_page(&server, 2, &[12], 1).await;
        mount_page(&server, 3, &[], 1).await;
        mount_page(&server, 4, &[99], 0).await;

        let found = discover_movie_ids(&tmdb(&server), &range(), MAX_PAGES, DuplicatePolicy::Keep).await.unwrap();
        assert_eq!(found, Discovered { ids: vec![10, 11, 12], truncated: false });
    }

    #[tokio::test]
    async fn never_requests_past_the_page_cap() {
        let server = MockServer::start().await;
        for page in 1..=3 {
            mount_page(&server, page, &[page as i32], 1).await;
        }
        mount_page(&server, 4, &[4], 0).await;

        let found = discover_movie_ids(&tmdb(&server), &range(), 3, DuplicatePolicy::Keep).await.unwrap();
        assert_eq!(found, Discovered { ids: vec![1, 2, 3], truncated: true });
    }

    #[tokio::test]
    async fn larger_page_limit_is_clamped_to_500() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/discover/movie"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": [{"id": 1}, {"id": 2}]})))
            .expect(500)
            .mount(&server)
            .await;

        let found = discover_movie_ids(&tmdb(&server), &range(), 1000, DuplicatePolicy::Keep).await.unwrap();
        assert_eq!(found.ids.len(), 1000);
        assert!(found.truncated);
    }

    #[tokio::test]
    async fn duplicates_follow_policy() {
        let server = MockServer::start().await;
        mount_page(&server, 1, &[1, 2], 2).await;
        mount_page(&server, 2, &[2, 3], 2).await;
        mount_page(&server, 3, &[], 2).await;

        let tmdb = tmdb(&server);
        let kept = discover_movie_ids(&tmdb, &range(), MAX_PAGES, DuplicatePolicy::Keep).await.unwrap();
        assert_eq!(kept.ids, vec![1, 2, 2, 3]);

        let deduped = discover_movie_ids(&tmdb, &range(), MAX_PAGES, DuplicatePolicy::Dedup).await.unwrap();
        assert_eq!(deduped.ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn failed_page_aborts_the_walk() {
        let server = MockServer::start().await;
        mount_page(&server, 1, &[1], 1).await;
        Mock::given(method("GET"))
            .and(path("/discover/movie"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = discover_movie_ids(&tmdb(&server), &range(), MAX_PAGES, DuplicatePolicy::Keep).await.unwrap_err();
        assert!(matches!(err, AppError::Api(ApiError::Status { .. })));
    }
}
