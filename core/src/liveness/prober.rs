use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::redirect::Policy;

const MAX_REDIRECTS: usize = 10;

/// HTTP probing port of the liveness validator.
#[async_trait]
pub trait EndpointProber: Send + Sync {
    /// Sends a HEAD request and returns the final status code.
    async fn head(&self, url: &str) -> anyhow::Result<u16>;
}

/// HTTPS-only prober that follows redirects.
pub struct HttpsProber {
    client: reqwest::Client,
}

impl HttpsProber {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .https_only(true)
            .redirect(Policy::limited(MAX_REDIRECTS))
            .build()
            .context("failed to build liveness probe client")?;

        Ok(Self { client })
    }
}

#[async_trait]
impl EndpointProber for HttpsProber {
    async fn head(&self, url: &str) -> anyhow::Result<u16> {
        let response = self.client.head(url).send().await?;
        Ok(response.status().as_u16())
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
