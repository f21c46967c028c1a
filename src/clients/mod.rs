//! Remote catalog access.
//!
//! [`CatalogSource`] is the seam between the fetch loop and the network so the
//! loop can be driven by a scripted source in tests.

pub mod anilist;

pub use anilist::{AnilistClient, Media, MediaPage, PageInfo};

use thiserror::Error;

/// Transport outcome of a single page request.
///
/// Connection failures never carry a response, so they are classified as
/// [`TransportError::Transient`] and never as rate limiting.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("Rate limited by remote (HTTP 429)")]
    RateLimited,

    #[error("Transient transport error: {0}")]
    Transient(String),

    #[error("Fatal transport error: {0}")]
    Fatal(String),
}

/// Parameters of one page of the filtered collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based.
    pub page: u32,
    pub per_page: u32,
    /// Only entries that started after this year are returned.
    pub start_year: i32,
}

impl PageRequest {
    /// `FuzzyDateInt` encoding of the threshold: 2010 becomes 20100000.
    #[must_use]
    pub fn start_date(&self) -> i64 {
        i64::from(self.start_year) * 10_000
    }
}

#[async_trait::async_trait]
pub trait CatalogSource: Send + Sync {
    /// Requests exactly one page.
    ///
    /// # Errors
    ///
    /// - [`TransportError::RateLimited`] when the remote throttles
    /// - [`TransportError::Transient`] when no response arrives or on 5xx
    /// - [`TransportError::Fatal`] for anything else that yields no page
    async fn fetch_page(&self, request: &PageRequest) -> Result<MediaPage, TransportError>;
}
