use super::{BadgePage, CardPage, WebClient, WebClientError};
use async_trait::async_trait;
use scraper::Html;
use std::collections::HashMap;
use std::sync::Mutex;

/// Fixture-based `WebClient` for tests: badge pages and card pages are
/// registered up front by page number / app id.
#[derive(Default)]
pub struct MockWebClient {
    badge_pages: HashMap<u32, (String, Option<u32>)>,
    card_pages: HashMap<u32, String>,
    /// App ids whose card-page fetch should fail, to exercise retry/None paths.
    failing_card_pages: Mutex<HashMap<u32, u32>>,
}

impl MockWebClient {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_badge_page(mut self, page: u32, html: impl Into<String>, last_page: Option<u32>) -> Self {
        self.badge_pages.insert(page, (html.into(), last_page));
        self
    }

    #[must_use]
    pub fn with_card_page(mut self, app_id: u32, html: impl Into<String>) -> Self {
        self.card_pages.insert(app_id, html.into());
        self
    }

    /// Make the next `attempts` fetches of `app_id`'s card page fail before
    /// succeeding, to exercise `should_farm`'s `None`-on-failure path.
    #[must_use]
    pub fn failing_n_times(self, app_id: u32, attempts: u32) -> Self {
        self.failing_card_pages.lock().unwrap().insert(app_id, attempts);
        self
    }
}

#[async_trait]
impl WebClient for MockWebClient {
    async fn fetch_badge_page(&self, _steam_id: u64, page: u32) -> Result<BadgePage, WebClientError> {
        let (html, last_page) = self
            .badge_pages
            .get(&page)
            .cloned()
            .ok_or(WebClientError::Status(404))?;
        Ok(BadgePage {
            document: Html::parse_document(&html),
            last_page,
        })
    }

    async fn fetch_card_page(&self, _steam_id: u64, app_id: u32) -> Result<CardPage, WebClientError> {
        {
            let mut failing = self.failing_card_pages.lock().unwrap();
            if let Some(remaining) = failing.get_mut(&app_id) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(WebClientError::Status(503));
                }
            }
        }

        let html = self
            .card_pages
            .get(&app_id)
            .cloned()
            .ok_or(WebClientError::Status(404))?;
        Ok(CardPage {
            document: Html::parse_document(&html),
        })
    }
}
