use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::redirect::Policy;
use reqwest::Client;
use tracing::debug;

use crate::config::ProbeConfig;
use crate::core::RedirectProbe;

/// Expands short links with a HEAD request that follows redirects.
pub struct HttpRedirectProbe {
    http: Client,
}

impl HttpRedirectProbe {
    pub fn new(cfg: &ProbeConfig) -> Result<Self> {
        let http = Client::builder()
            .redirect(Policy::limited(cfg.max_redirects))
            .timeout(cfg.timeout)
            .user_agent(cfg.user_agent.clone())
            .build()
            .context("building redirect probe client")?;
        Ok(Self { http })
    }
}

#[async_trait]
impl RedirectProbe for HttpRedirectProbe {
    async fn resolve_redirect(&self, link: &str) -> Result<String> {
        let response = self
            .http
            .head(link)
            .send()
            .await
            .with_context(|| format!("HEAD {link}"))?;
        let resolved = response.url().to_string();
        debug!(
            target: "tiklink::providers::probe",
            link,
            resolved = %resolved,
            status = response.status().as_u16(),
            "probe finished"
        );
        Ok(resolved)
    }
}
