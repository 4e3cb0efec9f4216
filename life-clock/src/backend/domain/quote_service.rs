//! # Quote of the Day
//!
//! One quote per local calendar day. The first request of a day fetches from
//! the remote source and caches the result under `daily_quote_cache`; later
//! requests that day are served from the cache. When the fetch fails the day
//! gets a quote from a fixed local list instead, chosen by date so every run
//! on the same day agrees.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use log::{debug, info, warn};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use crate::backend::storage::{ChangeFeed, KeyValueStore, StoredDocument};
use shared::{Quote, QuoteCache};

pub const QUOTE_CACHE_KEY: &str = "daily_quote_cache";

pub const DEFAULT_QUOTE_API_URL: &str = "https://dummyjson.com/quotes/random";

const FALLBACK_QUOTES: &[(&str, &str)] = &[
    ("The trouble is, you think you have time.", "Jack Kornfield"),
    ("It is not that we have a short time to live, but that we waste a lot of it.", "Seneca"),
    ("The key is in not spending time, but in investing it.", "Stephen R. Covey"),
    ("Lost time is never found again.", "Benjamin Franklin"),
    ("How we spend our days is, of course, how we spend our lives.", "Annie Dillard"),
    ("You may delay, but time will not.", "Benjamin Franklin"),
    ("Time you enjoy wasting is not wasted time.", "Marthe Troly-Curtin"),
];

fn fallback_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or(NaiveDate::MIN)
}

/// Quote from the local list for `day`; wraps for days before 2024-01-01
pub fn fallback_quote(day: NaiveDate) -> Quote {
    let offset = (day - fallback_epoch()).num_days();
    let index = offset.rem_euclid(FALLBACK_QUOTES.len() as i64) as usize;
    let (text, author) = FALLBACK_QUOTES[index];
    Quote {
        text: text.to_string(),
        author: author.to_string(),
    }
}

#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn fetch_quote(&self) -> Result<Quote>;
}

/// `{ "quote": "...", "author": "..." }`
#[derive(Debug, Deserialize)]
struct RemoteQuote {
    quote: String,
    author: String,
}

pub struct HttpQuoteSource {
    client: reqwest::Client,
    url: String,
}

impl HttpQuoteSource {
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl QuoteSource for HttpQuoteSource {
    async fn fetch_quote(&self) -> Result<Quote> {
        debug!("Fetching quote from {}", self.url);
        let remote: RemoteQuote = self
            .client
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("Request to {} failed", self.url))?
            .error_for_status()?
            .json()
            .await
            .context("Quote response was not the expected JSON")?;
        Ok(Quote {
            text: remote.quote,
            author: remote.author,
        })
    }
}

#[derive(Clone)]
pub struct QuoteService {
    cache: Arc<StoredDocument<Option<QuoteCache>>>,
    source: Arc<dyn QuoteSource>,
}

impl QuoteService {
    pub fn new(store: Arc<dyn KeyValueStore>, feed: ChangeFeed, source: Arc<dyn QuoteSource>) -> Self {
        Self {
            cache: Arc::new(StoredDocument::open(QUOTE_CACHE_KEY, store, feed)),
            source,
        }
    }

    /// Quote for `today`. Never fails: fetch errors fall back to the local list.
    pub async fn daily_quote(&self, today: NaiveDate) -> Quote {
        if let Some(cached) = self.cached_for(today) {
            debug!("Using cached quote for {}", today);
            return cached;
        }

        match self.source.fetch_quote().await {
            Ok(quote) => {
                info!("Fetched quote of the day by {}", quote.author);
                let entry = QuoteCache {
                    date: today,
                    quote: quote.clone(),
                };
                if let Err(e) = self.cache.replace(Some(entry)) {
                    warn!("Failed to cache quote of the day: {:#}", e);
                }
                quote
            }
            Err(e) => {
                warn!("Error fetching quote, using local fallback: {:#}", e);
                fallback_quote(today)
            }
        }
    }

    pub fn cached_for(&self, today: NaiveDate) -> Option<Quote> {
        match &*self.cache.get() {
            Some(cached) if cached.date == today => Some(cached.quote.clone()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::storage::MemoryStore;
    use anyhow::anyhow;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingSource {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl QuoteSource for CountingSource {
        async fn fetch_quote(&self) -> Result<Quote> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail {
                return Err(anyhow!("network down"));
            }
            Ok(Quote {
                text: format!("Remote quote #{}", n),
                author: "Remote".to_string(),
            })
        }
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_fallback_is_deterministic_and_wraps() {
        assert_eq!(fallback_quote(day(2024, 1, 1)).author, "Jack Kornfield");
        assert_eq!(fallback_quote(day(2024, 1, 2)).author, "Seneca");
        assert_eq!(fallback_quote(day(2024, 1, 8)), fallback_quote(day(2024, 1, 1)));
        // one day before the epoch wraps to the last entry
        assert_eq!(fallback_quote(day(2023, 12, 31)).author, "Marthe Troly-Curtin");
    }

    #[tokio::test]
    async fn test_same_day_uses_cache() {
        let store = Arc::new(MemoryStore::new());
        let source = CountingSource::new(false);
        let service = QuoteService::new(store.clone(), ChangeFeed::new(), source.clone());

        let first = service.daily_quote(day(2024, 6, 15)).await;
        let second = service.daily_quote(day(2024, 6, 15)).await;
        assert_eq!(first, second);
        assert_eq!(source.calls(), 1);

        let raw = store.get(QUOTE_CACHE_KEY).unwrap().unwrap();
        assert!(raw.contains("\"date\":\"2024-06-15\""));

        let next_day = service.daily_quote(day(2024, 6, 16)).await;
        assert_eq!(next_day.text, "Remote quote #2");
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_failure_falls_back_without_caching() {
        let store = Arc::new(MemoryStore::new());
        let source = CountingSource::new(true);
        let service = QuoteService::new(store.clone(), ChangeFeed::new(), source.clone());

        let quote = service.daily_quote(day(2024, 1, 2)).await;
        assert_eq!(quote, fallback_quote(day(2024, 1, 2)));
        assert_eq!(store.get(QUOTE_CACHE_KEY).unwrap(), None);

        service.daily_quote(day(2024, 1, 2)).await;
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_unreadable_cache_is_ignored() {
        let store = Arc::new(MemoryStore::new());
        store
            .set(QUOTE_CACHE_KEY, r#"{"date":"Sat Jun 15 2024","quote":{"text":"x","author":"y"}}"#)
            .unwrap();
        let source = CountingSource::new(false);
        let service = QuoteService::new(store, ChangeFeed::new(), source.clone());

        assert!(service.cached_for(day(2024, 6, 15)).is_none());
        service.daily_quote(day(2024, 6, 15)).await;
        assert_eq!(source.calls(), 1);
    }
}
