use crate::clients::{CatalogSource, PageRequest, TransportError};
use crate::config::AnilistConfig;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const PAGE_QUERY: &str = r#"
    query ($page: Int, $perPage: Int, $startYear: FuzzyDateInt, $countryOfOrigin: CountryCode) {
        Page(page: $page, perPage: $perPage) {
            pageInfo {
                total
                currentPage
                lastPage
                hasNextPage
                perPage
            }
            media(type: MANGA, countryOfOrigin: $countryOfOrigin, startDate_greater: $startYear, sort: START_DATE_DESC) {
                id
                title { romaji english native }
                synonyms
                startDate { year }
                genres
                tags { name }
                description
                coverImage { extraLarge large medium }
                siteUrl
            }
        }
    }
"#;

#[derive(Serialize)]
struct GraphQLRequest<'a> {
    query: &'a str,
    variables: Variables<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Variables<'a> {
    page: u32,
    per_page: u32,
    start_year: i64,
    country_of_origin: &'a str,
}

#[derive(Deserialize)]
struct GraphQLResponse {
    data: Option<Data>,
    #[serde(default)]
    errors: Vec<GraphQLError>,
}

#[derive(Deserialize)]
struct GraphQLError {
    message: String,
}

#[derive(Deserialize)]
struct Data {
    #[serde(rename = "Page")]
    page: Option<RawPage>,
}

#[derive(Deserialize)]
struct RawPage {
    #[serde(rename = "pageInfo")]
    page_info: PageInfo,
    #[serde(default)]
    media: Vec<Media>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PageInfo {
    pub total: Option<i64>,
    #[serde(rename = "currentPage")]
    pub current_page: Option<u32>,
    #[serde(rename = "lastPage")]
    pub last_page: Option<u32>,
    #[serde(rename = "hasNextPage", default)]
    pub has_next_page: bool,
    #[serde(rename = "perPage")]
    pub per_page: Option<u32>,
}

/// One page of results as returned by the remote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaPage {
    pub page_info: PageInfo,
    pub media: Vec<Media>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Media {
    pub id: i64,
    pub title: Option<MediaTitle>,
    pub synonyms: Option<Vec<String>>,
    #[serde(rename = "startDate")]
    pub start_date: Option<FuzzyDate>,
    pub genres: Option<Vec<String>>,
    pub tags: Option<Vec<MediaTag>>,
    pub description: Option<String>,
    #[serde(rename = "coverImage")]
    pub cover_image: Option<CoverImage>,
    #[serde(rename = "siteUrl")]
    pub site_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MediaTitle {
    pub romaji: Option<String>,
    pub english: Option<String>,
    pub native: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FuzzyDate {
    pub year: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MediaTag {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CoverImage {
    #[serde(rename = "extraLarge")]
    pub extra_large: Option<String>,
    pub large: Option<String>,
    pub medium: Option<String>,
}

#[derive(Clone)]
pub struct AnilistClient {
    client: Client,
    endpoint: String,
    country_of_origin: String,
}

impl AnilistClient {
    pub fn new(config: &AnilistConfig) -> Self {
        Self {
            client: Client::builder()
                .user_agent(config.user_agent.as_str())
                .timeout(Duration::from_secs(config.request_timeout_seconds))
                .build()
                .unwrap_or_else(|_| Client::new()),
            endpoint: config.endpoint.clone(),
            country_of_origin: config.country_of_origin.clone(),
        }
    }
}

#[async_trait::async_trait]
impl CatalogSource for AnilistClient {
    async fn fetch_page(&self, request: &PageRequest) -> Result<MediaPage, TransportError> {
        let body = GraphQLRequest {
            query: PAGE_QUERY,
            variables: Variables {
                page: request.page,
                per_page: request.per_page,
                start_year: request.start_date(),
                country_of_origin: &self.country_of_origin,
            },
        };

        debug!(page = request.page, "Requesting page from AniList");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(classify_reqwest_error)?;

        let status = response.status();
        if let Some(err) = classify_status(status) {
            return Err(err);
        }

        let text = response.text().await.map_err(classify_reqwest_error)?;
        decode_page(&text)
    }
}

/// Maps a non-success HTTP status to its error class.
#[must_use]
pub fn classify_status(status: StatusCode) -> Option<TransportError> {
    if status.is_success() {
        None
    } else if status == StatusCode::TOO_MANY_REQUESTS {
        Some(TransportError::RateLimited)
    } else if status.is_server_error() {
        Some(TransportError::Transient(format!("AniList returned {status}")))
    } else {
        Some(TransportError::Fatal(format!("AniList returned {status}")))
    }
}

fn classify_reqwest_error(err: reqwest::Error) -> TransportError {
    if let Some(status) = err.status()
        && let Some(classified) = classify_status(status)
    {
        return classified;
    }

    if err.is_builder() {
        TransportError::Fatal(err.to_string())
    } else {
        TransportError::Transient(err.to_string())
    }
}

/// Decodes a successful response body into a page.
///
/// # Errors
///
/// Returns [`TransportError::Fatal`] if the body is not a page response.
pub fn decode_page(body: &str) -> Result<MediaPage, TransportError> {
    let response: GraphQLResponse = serde_json::from_str(body)
        .map_err(|e| TransportError::Fatal(format!("Invalid AniList response: {e}")))?;

    match response.data.and_then(|d| d.page) {
        Some(page) => Ok(MediaPage {
            page_info: page.page_info,
            media: page.media,
        }),
        None => {
            let messages: Vec<String> = response.errors.into_iter().map(|e| e.message).collect();
            let detail = if messages.is_empty() {
                "response contained no page".to_string()
            } else {
                messages.join("; ")
            };
            Err(TransportError::Fatal(format!("AniList query failed: {detail}")))
        }
    }
}
