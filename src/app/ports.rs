use crate::error::Result;
use async_trait::async_trait;

/// Fetches the text behind a location: an `http(s)://` URL, a `file://` URL or a local path.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn fetch(&self, location: &str) -> Result<String>;
}

