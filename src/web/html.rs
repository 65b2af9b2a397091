use super::{BadgePage, CardPage, WebClient, WebClientError};
use async_trait::async_trait;
use scraper::{Html, Selector};

/// Real `WebClient`, backed by an HTTP client and an HTML parser.
///
/// The platform's markup is an external fact this crate does not control;
/// selectors here are best-effort and `farmer::check_page` treats every
/// extraction as optional, skipping only the malformed row rather than
/// failing the whole page.
pub struct HttpWebClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpWebClient {
    pub fn new(http: reqwest::Client) -> Self {
        Self {
            http,
            base_url: "https://steamcommunity.com".to_string(),
        }
    }

    /// Override the base URL; used by integration tests against a local
    /// fixture server instead of the real platform.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn badge_page_url(&self, steam_id: u64, page: u32) -> String {
        format!("{}/profiles/{}/badges/?p={}", self.base_url, steam_id, page)
    }

    fn card_page_url(&self, steam_id: u64, app_id: u32) -> String {
        format!(
            "{}/profiles/{}/gamecards/{}/",
            self.base_url, steam_id, app_id
        )
    }

    async fn get_document(&self, url: &str) -> Result<Html, WebClientError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| WebClientError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(WebClientError::Status(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| WebClientError::Request(e.to_string()))?;

        Ok(Html::parse_document(&body))
    }
}

#[async_trait]
impl WebClient for HttpWebClient {
    async fn fetch_badge_page(&self, steam_id: u64, page: u32) -> Result<BadgePage, WebClientError> {
        let document = self.get_document(&self.badge_page_url(steam_id, page)).await?;
        let last_page = parse_last_page(&document);
        Ok(BadgePage { document, last_page })
    }

    async fn fetch_card_page(&self, steam_id: u64, app_id: u32) -> Result<CardPage, WebClientError> {
        let document = self.get_document(&self.card_page_url(steam_id, app_id)).await?;
        Ok(CardPage { document })
    }
}

/// Parse the highest page number out of the pagination control at the bottom
/// of badge page 1. Absence means there's only one page.
fn parse_last_page(document: &Html) -> Option<u32> {
    let selector = Selector::parse(".pagelink").ok()?;
    document
        .select(&selector)
        .filter_map(|el| el.text().collect::<String>().trim().parse::<u32>().ok())
        .max()
}
