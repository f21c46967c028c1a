//! Paginated fetch of new catalog records.

use crate::clients::{CatalogSource, Media, PageRequest, TransportError};
use crate::config::Config;
use crate::models::record::{self, Record};
use crate::services::normalize::{normalize, normalize_text};
use crate::services::reconcile::KnownIds;
use std::time::Duration;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub start_year: i32,
    pub per_page: u32,
    /// Maximum number of new records to yield.
    pub limit: usize,
    pub page_delay: Duration,
    pub rate_limit_wait: Duration,
    pub site_base_url: String,
}

impl FetchOptions {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            start_year: config.harvest.start_year,
            per_page: config.anilist.per_page,
            limit: config.harvest.limit,
            page_delay: config.anilist.page_delay(),
            rate_limit_wait: config.anilist.rate_limit_wait(),
            site_base_url: config.anilist.site_base_url.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The remote reported no further pages.
    Exhausted,
    CapReached,
    /// A non-retryable transport error ended the loop early.
    Aborted(TransportError),
}

#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub records: Vec<Record>,
    pub pages_requested: u32,
    pub skipped_known: usize,
    pub rate_limit_retries: u32,
    pub stop_reason: StopReason,
}

pub struct Fetcher<S> {
    source: S,
    options: FetchOptions,
}

impl<S: CatalogSource> Fetcher<S> {
    pub fn new(source: S, options: FetchOptions) -> Self {
        Self { source, options }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Pages through the collection until it is exhausted, the cap is hit or
    /// a non-retryable error occurs. Never fails: partial results are kept.
    pub async fn fetch(&self, known: &KnownIds) -> FetchOutcome {
        info!(
            start_year = self.options.start_year,
            limit = self.options.limit,
            known = known.len(),
            "Fetching manhwa data from {} to present",
            self.options.start_year
        );

        let mut records = Vec::new();
        let mut seen = KnownIds::new();
        let mut skipped_known = 0;
        let mut rate_limit_retries = 0;
        let mut pages_requested = 0;
        let mut page = 1;

        let stop_reason = loop {
            if records.len() >= self.options.limit {
                break StopReason::CapReached;
            }

            let request = PageRequest {
                page,
                per_page: self.options.per_page,
                start_year: self.options.start_year,
            };

            pages_requested += 1;
            let result = match self.source.fetch_page(&request).await {
                Ok(result) => result,
                Err(TransportError::RateLimited) => {
                    rate_limit_retries += 1;
                    warn!(
                        page,
                        wait_secs = self.options.rate_limit_wait.as_secs(),
                        "Rate limit hit, waiting before retrying the same page"
                    );
                    tokio::time::sleep(self.options.rate_limit_wait).await;
                    continue;
                }
                Err(err) => {
                    error!(page, error = %err, "Error fetching data, stopping with partial results");
                    break StopReason::Aborted(err);
                }
            };

            for media in result.media {
                if known.contains(media.id) {
                    skipped_known += 1;
                    debug!(id = media.id, "Skipping already existing entry");
                    continue;
                }
                if !seen.insert(media.id) {
                    debug!(id = media.id, "Skipping entry already fetched this run");
                    continue;
                }

                records.push(build_record(media, &self.options.site_base_url));

                if records.len() >= self.options.limit {
                    break;
                }
            }

            info!(
                "Fetched page {} of {}",
                result.page_info.current_page.unwrap_or(page),
                result
                    .page_info
                    .last_page
                    .map_or_else(|| "?".to_string(), |p| p.to_string())
            );

            if records.len() >= self.options.limit {
                break StopReason::CapReached;
            }
            if !result.page_info.has_next_page {
                break StopReason::Exhausted;
            }

            tokio::time::sleep(self.options.page_delay).await;
            page += 1;
        };

        info!(fetched = records.len(), "Fetched {} manhwa entries", records.len());

        FetchOutcome {
            records,
            pages_requested,
            skipped_known,
            rate_limit_retries,
            stop_reason,
        }
    }
}

/// Normalized text, with values that normalize to nothing treated as absent.
fn normalize_present(text: Option<&str>) -> Option<String> {
    normalize(text).filter(|s| !s.is_empty())
}

fn join_normalized<I>(items: I) -> String
where
    I: IntoIterator<Item = String>,
{
    normalize_text(&items.into_iter().collect::<Vec<_>>().join(", "))
}

/// Converts one remote entry into a normalized [`Record`].
#[must_use]
pub fn build_record(media: Media, site_base_url: &str) -> Record {
    let title = media.title.unwrap_or_default();
    let site_url = record::site_url(site_base_url, media.id, title.romaji.as_deref());

    let cover_image_url = media.cover_image.and_then(|c| {
        record::pick_cover([
            c.extra_large.as_deref(),
            c.large.as_deref(),
            c.medium.as_deref(),
        ])
    });

    Record {
        id: media.id,
        title_romaji: normalize_present(title.romaji.as_deref()),
        title_english: normalize_present(title.english.as_deref()),
        title_native: normalize_present(title.native.as_deref()),
        title_synonyms: join_normalized(media.synonyms.unwrap_or_default()),
        start_year: media.start_date.and_then(|d| d.year),
        genres: join_normalized(media.genres.unwrap_or_default()),
        tags: join_normalized(media.tags.unwrap_or_default().into_iter().map(|t| t.name)),
        description: normalize_present(media.description.as_deref()),
        cover_image_url,
        site_url,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::anilist::{CoverImage, MediaTag, MediaTitle};
    use crate::clients::{MediaPage, PageInfo};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays scripted responses and records every page requested.
    struct ScriptedSource {
        responses: Mutex<VecDeque<Result<MediaPage, TransportError>>>,
        requested: Mutex<Vec<u32>>,
    }

    impl ScriptedSource {
        fn new(responses: Vec<Result<MediaPage, TransportError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                requested: Mutex::new(Vec::new()),
            }
        }

        fn requested(&self) -> Vec<u32> {
            self.requested.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl CatalogSource for ScriptedSource {
        async fn fetch_page(&self, request: &PageRequest) -> Result<MediaPage, TransportError> {
            self.requested.lock().unwrap().push(request.page);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(TransportError::Fatal("script exhausted".to_string())))
        }
    }

    fn media(id: i64) -> Media {
        Media {
            id,
            title: Some(MediaTitle {
                romaji: Some(format!("Title {id}")),
                english: None,
                native: None,
            }),
            ..Media::default()
        }
    }

    fn page(current: u32, last: u32, ids: impl IntoIterator<Item = i64>) -> MediaPage {
        MediaPage {
            page_info: PageInfo {
                current_page: Some(current),
                last_page: Some(last),
                has_next_page: current < last,
                ..PageInfo::default()
            },
            media: ids.into_iter().map(media).collect(),
        }
    }

    fn options(limit: usize) -> FetchOptions {
        FetchOptions {
            start_year: 2010,
            per_page: 10,
            limit,
            page_delay: Duration::ZERO,
            rate_limit_wait: Duration::from_secs(60),
            site_base_url: "https://anilist.co".to_string(),
        }
    }

    fn ids(outcome: &FetchOutcome) -> Vec<i64> {
        outcome.records.iter().map(|r| r.id).collect()
    }

    #[tokio::test]
    async fn test_fetch_until_exhausted() {
        let source = ScriptedSource::new(vec![Ok(page(1, 2, 1..=3)), Ok(page(2, 2, 4..=5))]);
        let fetcher = Fetcher::new(source, options(100));

        let outcome = fetcher.fetch(&KnownIds::new()).await;

        assert_eq!(ids(&outcome), vec![1, 2, 3, 4, 5]);
        assert_eq!(outcome.stop_reason, StopReason::Exhausted);
        assert_eq!(fetcher.source().requested(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_cap_enforced() {
        let source = ScriptedSource::new(vec![
            Ok(page(1, 3, 1..=10)),
            Ok(page(2, 3, 11..=20)),
            Ok(page(3, 3, 21..=30)),
        ]);
        let fetcher = Fetcher::new(source, options(10));

        let outcome = fetcher.fetch(&KnownIds::new()).await;

        assert_eq!(outcome.records.len(), 10);
        assert_eq!(outcome.stop_reason, StopReason::CapReached);
        assert_eq!(fetcher.source().requested(), vec![1]);
    }

    #[tokio::test]
    async fn test_cap_mid_page() {
        let source = ScriptedSource::new(vec![Ok(page(1, 3, 1..=4)), Ok(page(2, 3, 5..=8))]);
        let fetcher = Fetcher::new(source, options(6));

        let outcome = fetcher.fetch(&KnownIds::new()).await;

        assert_eq!(ids(&outcome), vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(outcome.stop_reason, StopReason::CapReached);
    }

    #[tokio::test]
    async fn test_known_ids_skipped_and_not_counted() {
        let source = ScriptedSource::new(vec![Ok(page(1, 2, 5..=9)), Ok(page(2, 2, 10..=12))]);
        let fetcher = Fetcher::new(source, options(5));
        let known: KnownIds = [7, 8].into_iter().collect();

        let outcome = fetcher.fetch(&known).await;

        assert!(outcome.records.iter().all(|r| r.id != 7 && r.id != 8));
        assert_eq!(ids(&outcome), vec![5, 6, 9, 10, 11]);
        assert_eq!(outcome.skipped_known, 2);
        assert_eq!(outcome.stop_reason, StopReason::CapReached);
    }

    #[tokio::test]
    async fn test_duplicate_across_pages_yielded_once() {
        let source = ScriptedSource::new(vec![Ok(page(1, 2, [1, 2])), Ok(page(2, 2, [2, 3]))]);
        let fetcher = Fetcher::new(source, options(100));

        let outcome = fetcher.fetch(&KnownIds::new()).await;

        assert_eq!(ids(&outcome), vec![1, 2, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_retries_same_page() {
        let source = ScriptedSource::new(vec![
            Ok(page(1, 3, [1])),
            Err(TransportError::RateLimited),
            Ok(page(2, 3, [2])),
            Ok(page(3, 3, [3])),
        ]);
        let fetcher = Fetcher::new(source, options(100));
        let started = tokio::time::Instant::now();

        let outcome = fetcher.fetch(&KnownIds::new()).await;

        assert_eq!(fetcher.source().requested(), vec![1, 2, 2, 3]);
        assert_eq!(ids(&outcome), vec![1, 2, 3]);
        assert_eq!(outcome.rate_limit_retries, 1);
        assert!(started.elapsed() >= Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_transport_error_keeps_partial_results() {
        let source = ScriptedSource::new(vec![
            Ok(page(1, 3, [1, 2])),
            Err(TransportError::Transient("connection refused".to_string())),
        ]);
        let fetcher = Fetcher::new(source, options(100));

        let outcome = fetcher.fetch(&KnownIds::new()).await;

        assert_eq!(ids(&outcome), vec![1, 2]);
        assert_eq!(
            outcome.stop_reason,
            StopReason::Aborted(TransportError::Transient("connection refused".to_string()))
        );
        assert_eq!(fetcher.source().requested(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_fatal_on_first_page_yields_nothing() {
        let source = ScriptedSource::new(vec![Err(TransportError::Fatal("400".to_string()))]);
        let fetcher = Fetcher::new(source, options(100));

        let outcome = fetcher.fetch(&KnownIds::new()).await;

        assert!(outcome.records.is_empty());
        assert!(matches!(outcome.stop_reason, StopReason::Aborted(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_page_delay_between_requests() {
        let source = ScriptedSource::new(vec![Ok(page(1, 2, [1])), Ok(page(2, 2, [2]))]);
        let mut opts = options(100);
        opts.page_delay = Duration::from_millis(500);
        let fetcher = Fetcher::new(source, opts);
        let started = tokio::time::Instant::now();

        fetcher.fetch(&KnownIds::new()).await;

        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(500));
        assert!(elapsed < Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_delay_after_cap_reached() {
        let source = ScriptedSource::new(vec![Ok(page(1, 3, 1..=4))]);
        let mut opts = options(3);
        opts.page_delay = Duration::from_secs(10);
        let fetcher = Fetcher::new(source, opts);
        let started = tokio::time::Instant::now();

        let outcome = fetcher.fetch(&KnownIds::new()).await;

        assert_eq!(outcome.stop_reason, StopReason::CapReached);
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn test_build_record() {
        let media = Media {
            id: 12345,
            title: Some(MediaTitle {
                romaji: Some("My Title".to_string()),
                english: Some(" My  <b>Title</b> ".to_string()),
                native: None,
            }),
            synonyms: Some(vec!["Alt One".to_string(), "Alt <i>Two</i>".to_string()]),
            start_date: Some(crate::clients::anilist::FuzzyDate { year: Some(2019) }),
            genres: Some(vec!["Action".to_string(), "Drama".to_string()]),
            tags: Some(vec![
                MediaTag {
                    name: "Revenge".to_string(),
                },
                MediaTag {
                    name: "Webtoon".to_string(),
                },
            ]),
            description: Some("A <br>story\n\nabout things.".to_string()),
            cover_image: Some(CoverImage {
                extra_large: None,
                large: Some("https://img/l.jpg".to_string()),
                medium: Some("https://img/m.jpg".to_string()),
            }),
            site_url: Some("https://anilist.co/manga/12345".to_string()),
        };

        let record = build_record(media, "https://anilist.co");

        assert_eq!(record.site_url, "https://anilist.co/manga/12345/My-Title/");
        assert_eq!(record.title_english.as_deref(), Some("My Title"));
        assert_eq!(record.title_native, None);
        assert_eq!(record.title_synonyms, "Alt One, Alt Two");
        assert_eq!(record.genres, "Action, Drama");
        assert_eq!(record.tags, "Revenge, Webtoon");
        assert_eq!(record.start_year, Some(2019));
        assert_eq!(record.description.as_deref(), Some("A story about things."));
        assert_eq!(record.cover_image_url.as_deref(), Some("https://img/l.jpg"));
    }

    #[test]
    fn test_build_record_sparse() {
        let record = build_record(media(3), "https://anilist.co");
        assert_eq!(record.title_synonyms, "");
        assert_eq!(record.genres, "");
        assert_eq!(record.tags, "");
        assert_eq!(record.description, None);
        assert_eq!(record.cover_image_url, None);
        assert_eq!(record.site_url, "https://anilist.co/manga/3/Title-3/");
    }

    #[test]
    fn test_markup_only_text_is_absent() {
        let mut sparse = media(4);
        sparse.description = Some("<br><br>".to_string());
        let record = build_record(sparse, "https://anilist.co");
        assert_eq!(record.description, None);
    }
}
