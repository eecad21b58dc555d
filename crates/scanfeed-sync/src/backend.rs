use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::Method;
use reqwest::StatusCode;
use scanfeed_core::ChannelUpdate;
use scanfeed_core::MessageId;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use crate::contracts::ChannelRecord;
use crate::contracts::RecordingRecord;
use crate::contracts::SettingsRecord;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("build http client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered HTTP {status}")]
    Status { url: String, status: StatusCode },
    #[error("decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// The edge server's HTTP surface as the feed uses it.
#[async_trait]
pub trait FeedBackend: Send + Sync {
    /// Base URL used to build audio links.
    fn base_url(&self) -> &str;

    async fn fetch_channels(&self) -> Result<Vec<ChannelRecord>, BackendError>;
    async fn fetch_recordings(&self) -> Result<Vec<RecordingRecord>, BackendError>;
    async fn fetch_settings(&self) -> Result<SettingsRecord, BackendError>;
    async fn delete_recording(&self, id: MessageId) -> Result<(), BackendError>;
    async fn update_channel(&self, id: &str, update: &ChannelUpdate) -> Result<(), BackendError>;
    async fn ping(&self) -> Result<(), BackendError>;
}

#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(BackendError::Client)?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { client, base_url })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&ChannelUpdate>,
    ) -> Result<reqwest::Response, BackendError> {
        let url = self.url(path);
        debug!(%method, %url, "backend request");
        let mut request = self.client.request(method, &url);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request
            .send()
            .await
            .map_err(|source| BackendError::Transport {
                url: url.clone(),
                source,
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Status { url, status });
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, BackendError> {
        let response = self.send(Method::GET, path, None).await?;
        let url = response.url().to_string();
        response
            .json::<T>()
            .await
            .map_err(|source| BackendError::Decode { url, source })
    }
}

#[async_trait]
impl FeedBackend for HttpBackend {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn fetch_channels(&self) -> Result<Vec<ChannelRecord>, BackendError> {
        self.get_json("channels").await
    }

    async fn fetch_recordings(&self) -> Result<Vec<RecordingRecord>, BackendError> {
        self.get_json("recordings").await
    }

    async fn fetch_settings(&self) -> Result<SettingsRecord, BackendError> {
        self.get_json("settings").await
    }

    async fn delete_recording(&self, id: MessageId) -> Result<(), BackendError> {
        self.send(Method::DELETE, &format!("recordings/{id}"), None)
            .await
            .map(drop)
    }

    async fn update_channel(&self, id: &str, update: &ChannelUpdate) -> Result<(), BackendError> {
        self.send(Method::PUT, &format!("channel/{id}"), Some(update))
            .await
            .map(drop)
    }

    async fn ping(&self) -> Result<(), BackendError> {
        self.send(Method::GET, "ping", None).await.map(drop)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn urls_join_without_doubled_slashes() {
        let backend = HttpBackend::new("http://edge.local:5000/", Duration::from_secs(1))
            .expect("client");
        assert_eq!(backend.base_url(), "http://edge.local:5000");
        assert_eq!(backend.url("channels"), "http://edge.local:5000/channels");
        assert_eq!(backend.url("/recordings/4"), "http://edge.local:5000/recordings/4");
    }
}
