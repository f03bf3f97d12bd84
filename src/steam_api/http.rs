//! Blocking HTTP transport used by the Steam API worker pool

use std::sync::OnceLock;
use std::time::Duration;

use url::Url;

use super::error::SteamApiError;

/// Blocking GET transport. Called only from worker threads.
pub trait HttpClient: Send + Sync {
    fn get_bytes(&self, url: &Url) -> Result<Vec<u8>, SteamApiError>;

    fn get_string(&self, url: &Url) -> Result<String, SteamApiError> {
        let bytes = self.get_bytes(url)?;
        String::from_utf8(bytes).map_err(|e| SteamApiError::Http(format!("Invalid UTF-8: {}", e)))
    }
}

/// `reqwest::blocking` client, built lazily on the first worker thread that
/// uses it so it is never created inside an async context.
#[derive(Default)]
pub struct ReqwestHttpClient {
    client: OnceLock<reqwest::blocking::Client>,
}

impl ReqwestHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn client(&self) -> Result<&reqwest::blocking::Client, SteamApiError> {
        if let Some(client) = self.client.get() {
            return Ok(client);
        }

        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("tf2-companion/", env!("CARGO_PKG_VERSION")))
            .timeout(None::<Duration>)
            .build()
            .map_err(|e| SteamApiError::Http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(self.client.get_or_init(|| client))
    }
}

impl HttpClient for ReqwestHttpClient {
    fn get_bytes(&self, url: &Url) -> Result<Vec<u8>, SteamApiError> {
        let response = self
            .client()?
            .get(url.clone())
            .send()
            .map_err(|e| SteamApiError::Http(format!("Request failed: {}", e.without_url())))?;

        if !response.status().is_success() {
            return Err(SteamApiError::Http(format!("HTTP {}", response.status())));
        }

        let bytes = response
            .bytes()
            .map_err(|e| SteamApiError::Http(format!("Failed to read response: {}", e)))?;

        Ok(bytes.to_vec())
    }
}

/// The API key travels in the query string; keep it out of the logs
pub(crate) fn redacted(url: &Url) -> String {
    let mut url = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if k == "key" {
                "<redacted>".to_string()
            } else {
                v.into_owned()
            };
            (k.into_owned(), v)
        })
        .collect();

    if !pairs.is_empty() {
        url.query_pairs_mut().clear().extend_pairs(pairs);
    }

    url.to_string()
}
