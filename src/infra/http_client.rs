use crate::app::ports::DocumentSource;
use crate::error::{EtlError, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::{debug, instrument};

/// HTTP(S) fetcher. No timeout is set: a stalled server stalls the run.
pub struct ReqwestSource {
    client: reqwest::Client,
}

impl Default for ReqwestSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ReqwestSource {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl DocumentSource for ReqwestSource {
    #[instrument(skip(self))]
    async fn fetch(&self, location: &str) -> Result<String> {
        let resp = self.client.get(location).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(EtlError::Fetch {
                location: location.to_string(),
                status: status.as_u16(),
            });
        }
        let body = resp.text().await?;
        debug!("Fetched {} bytes", body.len());
        Ok(body)
    }
}

/// Reads local files; accepts plain paths and `file://` URLs.
pub struct FsSource;

#[async_trait]
impl DocumentSource for FsSource {
    async fn fetch(&self, location: &str) -> Result<String> {
        let path = PathBuf::from(location.strip_prefix("file://").unwrap_or(location));
        let body = tokio::fs::read_to_string(&path).await?;
        debug!("Read {} bytes from {}", body.len(), path.display());
        Ok(body)
    }
}

/// Dispatches on the location's scheme.
#[derive(Default)]
pub struct LocationSource {
    http: ReqwestSource,
}

impl LocationSource {
    pub fn new() -> Self {
        Self::default()
    }
}

pub fn is_remote(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

#[async_trait]
impl DocumentSource for LocationSource {
    async fn fetch(&self, location: &str) -> Result<String> {
        if is_remote(location) {
            self.http.fetch(location).await
        } else {
            FsSource.fetch(location).await
        }
    }
}
