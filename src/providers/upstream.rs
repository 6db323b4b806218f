use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use crate::config::UpstreamConfig;
use crate::core::{UpstreamResolver, UpstreamResponse};

const BODY_PREVIEW_CHARS: usize = 200;

/// Client for the third-party resolution service.
///
/// The service is called as `GET <endpoint>?url=<link>&version=<tag>` and answers with
/// `{status, message?, result?}`.
pub struct HttpUpstream {
    endpoint: Url,
    http: Client,
}

impl HttpUpstream {
    pub fn new(cfg: &UpstreamConfig) -> Result<Self> {
        let endpoint = Url::parse(&cfg.endpoint)
            .with_context(|| format!("invalid upstream endpoint {:?}", cfg.endpoint))?;
        let http = Client::builder()
            .timeout(cfg.timeout)
            .user_agent(concat!("tiklink/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("building upstream client")?;
        Ok(Self { endpoint, http })
    }
}

#[async_trait]
impl UpstreamResolver for HttpUpstream {
    async fn fetch(&self, link: &str, version: &str) -> Result<UpstreamResponse> {
        let response = self
            .http
            .get(self.endpoint.clone())
            .query(&[("url", link), ("version", version)])
            .send()
            .await
            .with_context(|| format!("upstream request for {link} failed"))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("reading upstream response body")?;

        if !status.is_success() {
            let detail = serde_json::from_str::<UpstreamResponse>(&body)
                .ok()
                .and_then(|parsed| parsed.message)
                .unwrap_or_else(|| preview(&body));
            return Err(anyhow!("upstream returned HTTP {}: {}", status.as_u16(), detail));
        }

        serde_json::from_str(&body)
            .with_context(|| format!("upstream returned malformed JSON: {}", preview(&body)))
    }
}

fn preview(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= BODY_PREVIEW_CHARS {
        return trimmed.to_string();
    }
    let cut: String = trimmed.chars().take(BODY_PREVIEW_CHARS).collect();
    format!("{cut}…")
}
