//! The `WebClient` capability: HTTP-level fetch of badge pages and per-game
//! card pages, parsed into navigable HTML node sets.
//!
//! Out of scope in depth (see the crate's top-level documentation): the
//! platform's exact markup is an external fact this crate does not control.
//! [`HttpWebClient`] is a best-effort real implementation; [`mock::MockWebClient`]
//! is a fixture-based stand-in for tests.

mod html;
mod mock;

pub use html::HttpWebClient;
pub use mock::MockWebClient;

use async_trait::async_trait;
use scraper::Html;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WebClientError {
    #[error("http request failed: {0}")]
    Request(String),
    #[error("unexpected http status {0}")]
    Status(u16),
    #[error("not logged in to the web session")]
    NotLoggedIn,
}

/// A parsed badge page: page 1 carries pagination metadata, subsequent pages
/// do not.
pub struct BadgePage {
    pub document: Html,
    /// Highest page number linked from pagination, if any was present.
    pub last_page: Option<u32>,
}

/// A parsed per-game cards page.
pub struct CardPage {
    pub document: Html,
}

/// HTTP-level capability consulted by `CardsFarmer`. The actual row-by-row
/// badge parsing (`check_page`) lives in the `farmer` module; this trait only
/// fetches and hands back a navigable document, matching the separation
/// between "page structure knowledge" (here) and "farming semantics" (farmer).
#[async_trait]
pub trait WebClient: Send + Sync {
    /// Fetch badge page `page` (1-indexed) for the given Steam id.
    async fn fetch_badge_page(&self, steam_id: u64, page: u32) -> Result<BadgePage, WebClientError>;

    /// Fetch the per-game cards-remaining page for `app_id`.
    async fn fetch_card_page(&self, steam_id: u64, app_id: u32) -> Result<CardPage, WebClientError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_serves_fixtures() {
        let client = MockWebClient::new().with_badge_page(
            1,
            r#"<html><body><div class="badge_title_stats_content"></div></body></html>"#,
            Some(2),
        );

        let page = client.fetch_badge_page(1, 1).await.unwrap();
        assert_eq!(page.last_page, Some(2));
    }
}
