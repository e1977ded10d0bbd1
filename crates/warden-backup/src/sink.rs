use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;
use url::Url;

/// Destination for finished artifacts outside the host (chat storage, an
/// object store front, ...). Upload is always best effort: the local
/// artifact is the source of truth.
#[async_trait]
pub trait BackupSink: Send + Sync {
    async fn upload(&self, artifact: &Path, caption: &str) -> Result<(), SinkError>;
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("upload request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("could not read artifact: {0}")]
    Io(#[from] std::io::Error),
}

/// POSTs the artifact bytes to a fixed endpoint, caption and filename as
/// query parameters, optional bearer token.
pub struct HttpSink {
    client: Client,
    endpoint: Url,
    token: Option<String>,
}

impl HttpSink {
    pub fn new(endpoint: Url, token: Option<String>) -> Result<Self, SinkError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()?;
        Ok(Self {
            client,
            endpoint,
            token,
        })
    }
}

#[async_trait]
impl BackupSink for HttpSink {
    async fn upload(&self, artifact: &Path, caption: &str) -> Result<(), SinkError> {
        let bytes = tokio::fs::read(artifact).await?;
        let filename = artifact
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| "backup.tar.gz".to_string());

        let mut request = self
            .client
            .post(self.endpoint.clone())
            .query(&[("filename", filename.as_str()), ("caption", caption)])
            .body(bytes);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        request.send().await?.error_for_status()?;
        Ok(())
    }
}
