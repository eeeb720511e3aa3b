//! Occupancy feed download and line decoding.

use std::time::{Duration, Instant};

use reqwest::blocking::Client;
use tracing::{debug, info};

use crate::data::timestamp::parse_records;
use crate::domain::{DEFAULT_FEED_URL, OccupancyRecord, SAMPLES_PER_WEEK, Sample};
use crate::error::AppError;

/// How long a downloaded feed stays fresh.
pub const FEED_TTL: Duration = Duration::from_secs(120);

const FEED_URL_ENV: &str = "RSF_FEED_URL";

pub struct FeedClient {
    client: Client,
    url: String,
}

/// Feed URL from `RSF_FEED_URL` (environment or `.env`), else the public feed.
pub fn feed_url_from_env() -> String {
    std::env::var(FEED_URL_ENV).unwrap_or_else(|_| DEFAULT_FEED_URL.to_string())
}

impl FeedClient {
    pub fn new(url: impl Into<String>) -> Result<Self, AppError> {
        let url = url.into();
        if url.trim().is_empty() {
            return Err(AppError::usage("Feed URL is empty."));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| AppError::io(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client, url })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Download the whole feed body.
    pub fn fetch_text(&self) -> Result<String, AppError> {
        let started = Instant::now();
        let resp = self
            .client
            .get(&self.url)
            .send()
            .map_err(|e| AppError::io(format!("Feed request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(AppError::io(format!(
                "Feed request failed with status {}.",
                resp.status()
            )));
        }

        let body = resp
            .text()
            .map_err(|e| AppError::io(format!("Failed to read feed body: {e}")))?;
        info!(
            url = %self.url,
            bytes = body.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "downloaded feed"
        );
        Ok(body)
    }
}

/// Decode the newline-delimited feed, keeping only the trailing `truncate_weeks`
/// worth of lines (`0` keeps everything).
pub fn parse_feed(text: &str, truncate_weeks: usize) -> Result<Vec<OccupancyRecord>, AppError> {
    let lines: Vec<&str> = text.trim().split('\n').collect();
    let skip = if truncate_weeks > 0 {
        lines.len().saturating_sub(SAMPLES_PER_WEEK * truncate_weeks)
    } else {
        0
    };

    let mut out = Vec::with_capacity(lines.len() - skip);
    for (idx, line) in lines.iter().enumerate().skip(skip) {
        let line = line.trim();
        if line.is_empty() {
            return Err(AppError::data(format!("Feed line {} is empty.", idx + 1)));
        }
        let record: OccupancyRecord = serde_json::from_str(line)
            .map_err(|e| AppError::data(format!("Malformed feed line {}: {e}", idx + 1)))?;
        out.push(record);
    }

    debug!(total_lines = lines.len(), kept = out.len(), truncate_weeks, "decoded feed");
    Ok(out)
}

/// A decoded feed window with its timestamps parsed.
///
/// `samples[i]` is `records[i]` with its timestamp parsed.
#[derive(Debug, Clone)]
pub struct LoadedFeed {
    pub records: Vec<OccupancyRecord>,
    pub samples: Vec<Sample>,
}

impl LoadedFeed {
    /// Decode the trailing window of a feed body and parse its timestamps.
    pub fn from_text(text: &str, truncate_weeks: usize) -> Result<Self, AppError> {
        let records = parse_feed(text, truncate_weeks)?;
        Self::from_records(records)
    }

    pub fn from_records(records: Vec<OccupancyRecord>) -> Result<Self, AppError> {
        let started = Instant::now();
        let samples = parse_records(&records)?;
        info!(
            samples = samples.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "parsed timestamps"
        );
        Ok(Self { records, samples })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Time-boxed memo of the last decoded and parsed feed.
///
/// A cached load is reused while it is younger than the TTL and was made for the
/// same trailing window; a hit skips both the download and timestamp parsing.
#[derive(Debug)]
pub struct FeedCache {
    ttl: Duration,
    entry: Option<CacheEntry>,
}

#[derive(Debug)]
struct CacheEntry {
    loaded_at: Instant,
    truncate_weeks: usize,
    feed: LoadedFeed,
}

impl Default for FeedCache {
    fn default() -> Self {
        Self::with_ttl(FEED_TTL)
    }
}

impl FeedCache {
    pub fn with_ttl(ttl: Duration) -> Self {
        Self { ttl, entry: None }
    }

    /// Drop the memo so the next load re-fetches.
    pub fn invalidate(&mut self) {
        self.entry = None;
    }

    pub fn is_fresh(&self, truncate_weeks: usize) -> bool {
        self.entry.as_ref().is_some_and(|e| {
            e.truncate_weeks == truncate_weeks && e.loaded_at.elapsed() < self.ttl
        })
    }

    /// Return the memoized feed, calling `fetch` for a new feed body when stale.
    pub fn load<F>(&mut self, truncate_weeks: usize, fetch: F) -> Result<&LoadedFeed, AppError>
    where
        F: FnOnce() -> Result<String, AppError>,
    {
        if !self.is_fresh(truncate_weeks) {
            let started = Instant::now();
            let text = fetch()?;
            let feed = LoadedFeed::from_text(&text, truncate_weeks)?;
            info!(
                records = feed.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "loaded feed"
            );
            self.entry = Some(CacheEntry {
                loaded_at: Instant::now(),
                truncate_weeks,
                feed,
            });
        } else {
            debug!(truncate_weeks, "feed memo hit");
        }

        let entry = self.entry.as_ref().ok_or_else(|| AppError::data("Feed memo is empty."))?;
        Ok(&entry.feed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_lines(n: usize) -> String {
        (0..n)
            .map(|i| format!(r#"{{"datetime": "Tue Sep 13 10:{:02}:00 PDT 2022", "count": {i}}}"#, i % 60))
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn parse_feed_keeps_all_lines_when_untruncated() {
        let text = format!("{}\n", feed_lines(3));
        let records = parse_feed(&text, 0).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[2].count, 2);
    }

    #[test]
    fn parse_feed_keeps_trailing_week() {
        let text = feed_lines(SAMPLES_PER_WEEK + 5);
        let records = parse_feed(&text, 1).unwrap();
        assert_eq!(records.len(), SAMPLES_PER_WEEK);
        assert_eq!(records[0].count, 5);
    }

    #[test]
    fn parse_feed_names_malformed_line() {
        let text = format!("{}\nnot json", feed_lines(2));
        let err = parse_feed(&text, 0).unwrap_err();
        assert_eq!(err.exit_code(), 3);
        assert!(err.message().contains("line 3"), "{err}");
    }

    #[test]
    fn cache_reuses_fresh_load() {
        let mut cache = FeedCache::with_ttl(Duration::from_secs(600));
        let n = cache.load(3, || Ok(feed_lines(2))).unwrap().len();
        assert_eq!(n, 2);

        let again = cache
            .load(3, || Err(AppError::io("should not refetch")))
            .unwrap();
        assert_eq!(again.len(), 2);
    }

    #[test]
    fn cache_hit_reuses_parsed_samples() {
        let mut cache = FeedCache::with_ttl(Duration::from_secs(600));
        let first = cache.load(3, || Ok(feed_lines(3))).unwrap();
        assert_eq!(first.samples.len(), 3);
        assert_eq!(first.samples[2].count, first.records[2].count);
        let parsed_at = first.samples.as_ptr();

        let mut fetched = false;
        let again = cache
            .load(3, || {
                fetched = true;
                Ok(feed_lines(3))
            })
            .unwrap();
        assert!(std::ptr::eq(again.samples.as_ptr(), parsed_at));
        assert!(!fetched);
    }

    #[test]
    fn bad_timestamp_fails_the_load() {
        let mut cache = FeedCache::default();
        let text = r#"{"datetime": "not a timestamp", "count": 1}"#;
        let err = cache.load(3, || Ok(text.to_string())).unwrap_err();
        assert_eq!(err.exit_code(), 3);
        assert!(!cache.is_fresh(3));
    }

    #[test]
    fn cache_refetches_when_window_changes_or_expired() {
        let mut cache = FeedCache::with_ttl(Duration::from_secs(600));
        cache.load(3, || Ok(feed_lines(2))).unwrap();
        assert!(!cache.is_fresh(4));
        assert_eq!(cache.load(4, || Ok(feed_lines(5))).unwrap().len(), 5);

        let mut expired = FeedCache::with_ttl(Duration::ZERO);
        expired.load(3, || Ok(feed_lines(2))).unwrap();
        assert!(!expired.is_fresh(3));
        assert!(expired.load(3, || Err(AppError::io("offline"))).is_err());
    }

    #[test]
    fn invalidate_forces_refetch() {
        let mut cache = FeedCache::default();
        cache.load(3, || Ok(feed_lines(1))).unwrap();
        cache.invalidate();
        assert!(!cache.is_fresh(3));
    }
}
