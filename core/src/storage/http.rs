use std::time::Duration;

use async_trait::async_trait;
use carto_common::storage::{ObjectStore, StorageError};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;

/// S3-compatible store addressed path-style: `<endpoint>/<bucket>/<key>`.
pub struct HttpStore {
    endpoint: String,
    bucket: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl HttpStore {
    pub fn new(endpoint: String, bucket: String, token: Option<String>) -> anyhow::Result<Self> {
        reqwest::Url::parse(&endpoint)
            .map_err(|e| anyhow::anyhow!("invalid storage endpoint '{endpoint}': {e}"))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            bucket: bucket.trim_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
            client,
        })
    }

    fn object_url(&self, key: &str) -> String {
        let key = key.trim_start_matches('/');
        if self.bucket.is_empty() {
            format!("{}/{}", self.endpoint, key)
        } else {
            format!("{}/{}/{}", self.endpoint, self.bucket, key)
        }
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.header(AUTHORIZATION, format!("Bearer {token}")),
            None => request,
        }
    }
}

fn transport(key: &str, e: reqwest::Error) -> StorageError {
    StorageError::Http {
        key: key.to_string(),
        reason: e.to_string(),
    }
}

#[async_trait]
impl ObjectStore for HttpStore {
    async fn upload(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<(), StorageError> {
        let request = self
            .client
            .put(self.object_url(key))
            .header(CONTENT_TYPE, content_type)
            .body(data);

        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| transport(key, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(StorageError::Status {
                key: key.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(())
    }

    async fn download(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let request = self.client.get(self.object_url(key));
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| transport(key, e))?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(StorageError::NotFound(key.to_string())),
            status if !status.is_success() => Err(StorageError::Status {
                key: key.to_string(),
                status: status.as_u16(),
            }),
            _ => {
                let bytes = response.bytes().await.map_err(|e| transport(key, e))?;
                Ok(bytes.to_vec())
            }
        }
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
