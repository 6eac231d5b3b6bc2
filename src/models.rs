use std::fmt;

use jiff::civil::Date;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Inclusive range of primary release dates.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DateRange {
    start: Date,
    end: Date,
}

impl DateRange {
    pub fn new(start: Date, end: Date) -> AppResult<Self> {
        if start > end {
            return Err(AppError::Config(format!("start date {start} is after end date {end}")));
        }
        Ok(Self { start, end })
    }

    pub fn single(day: Date) -> Self {
        Self { start: day, end: day }
    }

    pub fn start(&self) -> Date {
        self.start
    }

    pub fn end(&self) -> Date {
        self.end
    }

    pub fn is_single_day(&self) -> bool {
        self.start == self.end
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_single_day() {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}_{}", self.start, self.end)
        }
    }
}

/// Splits a strict `YYYY-MM-DD` string into its numeric parts.
pub fn split_ymd(s: &str) -> Option<(i16, i8, i8)> {
    let b = s.as_bytes();
    if b.len() != 10 || b[4] != b'-' || b[7] != b'-' {
        return None;
    }
    let year = digits(s, 0..4)?.parse().ok()?;
    let month = digits(s, 5..7)?.parse().ok()?;
    let day = digits(s, 8..10)?.parse().ok()?;
    Some((year, month, day))
}

fn digits(s: &str, range: std::ops::Range<usize>) -> Option<&str> {
    let part = s.get(range)?;
    part.bytes().all(|c| c.is_ascii_digit()).then_some(part)
}

/// Parses a command-line date given as `YYYYMMDD` or `YYYY-MM-DD`.
pub fn parse_cli_date(s: &str) -> Result<Date, String> {
    let s = s.trim();
    let normalized = if s.len() == 8 && s.bytes().all(|c| c.is_ascii_digit()) {
        format!("{}-{}-{}", &s[..4], &s[4..6], &s[6..])
    } else {
        s.to_string()
    };
    let (y, m, d) =
        split_ymd(&normalized).ok_or_else(|| format!("expected YYYYMMDD or YYYY-MM-DD, got {s:?}"))?;
    Date::new(y, m, d).map_err(|e| format!("{s:?} is not a calendar date: {e}"))
}

/// What to do when one item of a batch fails.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum BatchPolicy {
    /// The first failure aborts the batch; for loads nothing is committed.
    #[default]
    AllOrNothing,
    /// Failures are logged and counted; the remaining items still run.
    BestEffort,
}

/// Treatment of ids seen on more than one discover page.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum DuplicatePolicy {
    #[default]
    Keep,
    Dedup,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, clap::ValueEnum)]
pub enum GenreFormat {
    #[default]
    Csv,
    Json,
}

impl GenreFormat {
    pub fn extension(self) -> &'static str {
        match self {
            GenreFormat::Csv => "csv",
            GenreFormat::Json => "json",
        }
    }
}

/// A `movie/{id}` detail document as stored on disk.
#[derive(Clone, Debug, Deserialize)]
pub struct MovieDocument {
    pub id: i32,
    pub adult: bool,
    pub budget: i64,
    pub homepage: Option<String>,
    pub imdb_id: Option<String>,
    pub original_language: Option<String>,
    pub original_title: Option<String>,
    pub overview: Option<String>,
    pub popularity: f64,
    pub release_date: Option<String>,
    pub revenue: i64,
    pub runtime: Option<i32>,
    pub title: Option<String>,
    pub vote_average: f64,
    pub vote_count: i32,
    pub genres: Vec<GenreRef>,
    pub production_companies: Vec<CompanyRef>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct GenreRef {
    pub name: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CompanyRef {
    pub id: i32,
    pub name: String,
    pub origin_country: Option<String>,
}

/// One row of the genre taxonomy, also the CSV record shape.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct GenreRow {
    pub id: i32,
    pub name: String,
}

/// Body of `genre/movie/list`.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct GenreList {
    pub genres: Vec<GenreRow>,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct FetchSummary {
    pub fetched: usize,
    pub failed: usize,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct LoadSummary {
    pub loaded: usize,
    pub failed: usize,
}

#[cfg(test)]
mod tests {
    use jiff::civil::date;

    use super::*;

    #[test]
    fn strict_ymd_shape() {
        assert_eq!(split_ymd("2023-10-20"), Some((2023, 10, 20)));
        assert_eq!(split_ymd("2023-1-20"), None);
        assert_eq!(split_ymd("20231020"), None);
        assert_eq!(split_ymd("2023/10/20"), None);
        assert_eq!(split_ymd("2023-10-20T00:00"), None);
        assert_eq!(split_ymd("+023-10-20"), None);
    }

    #[test]
    fn cli_dates_accept_compact_and_dashed_forms() {
        assert_eq!(parse_cli_date("20231020"), Ok(date(2023, 10, 20)));
        assert_eq!(parse_cli_date("2023-10-20"), Ok(date(2023, 10, 20)));
        assert!(parse_cli_date("20230230").is_err());
        assert!(parse_cli_date("yesterday").is_err());
    }

    #[test]
    fn range_rejects_reversed_bounds() {
        assert!(DateRange::new(date(2024, 1, 2), date(2024, 1, 1)).is_err());
        let range = DateRange::new(date(2024, 1, 1), date(2024, 1, 31)).unwrap();
        assert_eq!(range.to_string(), "2024-01-01_2024-01-31");
        assert_eq!(DateRange::single(date(2024, 1, 1)).to_string(), "2024-01-01");
    }

    #[test]
    fn detail_document_tolerates_null_text_fields() {
        let doc: MovieDocument = serde_json::from_value(serde_json::json!({
            "id": 42,
            "adult": false,
            "budget": 0,
            "homepage": null,
            "imdb_id": null,
            "original_language": "en",
            "original_title": "Answer",
            "overview": "",
            "popularity": 1.5,
            "release_date": "",
            "revenue": 3_000_000_000_i64,
            "runtime": null,
            "title": "Answer",
            "vote_average": 0.0,
            "vote_count": 0,
            "genres": [{"id": 28, "name": "Action"}],
            "production_companies": [{"id": 7, "name": "Studio A", "origin_country": "US", "logo_path": null}]
        }))
        .unwrap();
        assert_eq!(doc.id, 42);
        assert_eq!(doc.revenue, 3_000_000_000);
        assert_eq!(doc.genres[0].name, "Action");
        assert_eq!(doc.production_companies[0].origin_country.as_deref(), Some("US"));
    }
}
