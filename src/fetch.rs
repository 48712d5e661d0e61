use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tracing::debug;

use crate::error::CatalogError;

/// Retrieves one asset's bytes.
pub trait AssetFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, CatalogError>;
}

#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
    base_url: Option<String>,
}

impl HttpFetcher {
    /// `base_url` is prepended to root-relative asset paths such as
    /// `/assets/singles/x/master.mp3`.
    pub fn new(base_url: Option<String>, timeout: Duration) -> Result<Self, CatalogError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("ceo-bars/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| CatalogError::Filesystem(err.to_string()))?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|err| CatalogError::NetworkFetch {
                url: base_url.clone().unwrap_or_default(),
                message: err.to_string(),
            })?;

        Ok(Self {
            client,
            base_url: base_url.map(|url| url.trim_end_matches('/').to_string()),
        })
    }

    pub fn resolve_url(&self, url: &str) -> Result<String, CatalogError> {
        if url.starts_with("http://") || url.starts_with("https://") {
            return Ok(url.to_string());
        }
        match &self.base_url {
            Some(base) if url.starts_with('/') => Ok(format!("{base}{url}")),
            Some(base) => Ok(format!("{base}/{url}")),
            None => Err(CatalogError::NetworkFetch {
                url: url.to_string(),
                message: "relative asset URL and no base_url configured".to_string(),
            }),
        }
    }
}

impl AssetFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, CatalogError> {
        let resolved = self.resolve_url(url)?;
        debug!(url = %resolved, "fetching asset");
        let response =
            self.client
                .get(&resolved)
                .send()
                .map_err(|err| CatalogError::NetworkFetch {
                    url: resolved.clone(),
                    message: err.to_string(),
                })?;
        let response = handle_status(&resolved, response)?;
        let bytes = response.bytes().map_err(|err| CatalogError::NetworkFetch {
            url: resolved.clone(),
            message: err.to_string(),
        })?;
        Ok(bytes.to_vec())
    }
}

fn handle_status(
    url: &str,
    response: reqwest::blocking::Response,
) -> Result<reqwest::blocking::Response, CatalogError> {
    if response.status().is_success() {
        return Ok(response);
    }
    Err(CatalogError::FetchStatus {
        url: url.to_string(),
        status: response.status().as_u16(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_urls_use_base() {
        let fetcher = HttpFetcher::new(
            Some("https://ceobars.example/".to_string()),
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(
            fetcher.resolve_url("/assets/singles/a/master.mp3").unwrap(),
            "https://ceobars.example/assets/singles/a/master.mp3"
        );
        assert_eq!(
            fetcher.resolve_url("https://cdn/a.mp3").unwrap(),
            "https://cdn/a.mp3"
        );
    }

    #[test]
    fn relative_url_without_base_fails() {
        let fetcher = HttpFetcher::new(None, Duration::from_secs(5)).unwrap();
        assert!(matches!(
            fetcher.resolve_url("/assets/a.mp3"),
            Err(CatalogError::NetworkFetch { .. })
        ));
    }
}
