use std::time::Duration;

use log::debug;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

use crate::{FeedError, Result};

/// Huya channel fetcher.
pub mod huya;

/// User agent sent with every page request.
///
/// Some platforms only embed their metadata in the mobile page.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Linux; Android 11; Pixel 5) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/90.0.4430.91 Mobile Safari/537.36 Edg/117.0.0.0";

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Source of page bodies for the fetchers.
///
/// Implementors must be safe to share across pool workers. Deadlines are
/// the implementor's responsibility; the pool never cancels a request.
pub trait PageSource: Sync {
    /// Fetches the body of the page at `url` as text.
    fn fetch_page(&self, url: &str) -> Result<String>;
}

/// A [`PageSource`] that downloads pages over HTTP.
pub struct HttpPageSource {
    client: Client,
}

impl HttpPageSource {
    /// Creates a source whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;
        Ok(HttpPageSource { client })
    }
}

impl PageSource for HttpPageSource {
    fn fetch_page(&self, url: &str) -> Result<String> {
        debug!("GET {url}");
        let response = self.client.get(url).send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_owned(),
            });
        }

        Ok(response.text()?)
    }
}
