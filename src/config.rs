use anyhow::Context;
use serde::Deserialize;
use std::{
    env,
    fs::File,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::constants::{
    BROWSER_USER_AGENT, DEFAULT_BIND, DEFAULT_PROBE_MAX_REDIRECTS, DEFAULT_PROBE_TIMEOUT_SECS,
    DEFAULT_REQUEST_BUDGET_SECS, DEFAULT_UPSTREAM_ENDPOINT, DEFAULT_UPSTREAM_TIMEOUT_SECS,
    DEFAULT_UPSTREAM_VERSION,
};
use crate::core::LinkDefaults;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ServerSection {
    pub bind: Option<String>,
    pub request_budget: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct UpstreamSection {
    pub endpoint: Option<String>,
    pub version: Option<String>,
    pub timeout: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ProbeSection {
    pub timeout: Option<String>,
    pub max_redirects: Option<usize>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct LinksSection {
    pub placeholder_author: Option<String>,
    pub fallback_authors: Option<Vec<String>>,
    pub unknown_author: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Root {
    pub server: Option<ServerSection>,
    pub upstream: Option<UpstreamSection>,
    pub probe: Option<ProbeSection>,
    pub links: Option<LinksSection>,
}

#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub endpoint: String,
    pub version: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ProbeConfig {
    pub timeout: Duration,
    pub max_redirects: usize,
    pub user_agent: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind: String,
    pub request_budget: Duration,
    pub upstream: UpstreamConfig,
    pub probe: ProbeConfig,
    pub links: LinkDefaults,
    pub source: Option<PathBuf>,
}

impl AppConfig {
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let lookup = |key: &str| env::var(key).ok();
        if let Some(path) = path {
            let mut cfg = Self::from_root(Some(Self::read_yaml(path)?), lookup)?;
            cfg.source = Some(path.to_path_buf());
            return Ok(cfg);
        }
        for candidate in Self::candidates() {
            if candidate.exists() {
                let mut cfg = Self::from_root(Some(Self::read_yaml(&candidate)?), lookup)?;
                cfg.source = Some(candidate);
                return Ok(cfg);
            }
        }
        Self::from_root(None, lookup)
    }

    fn candidates() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("tiklink.yaml"), PathBuf::from("tiklink.yml")];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("tiklink").join("tiklink.yaml"));
        }
        paths
    }

    fn read_yaml(path: &Path) -> anyhow::Result<Root> {
        let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
        serde_yaml::from_reader(file).with_context(|| format!("parsing {}", path.display()))
    }

    fn from_root<F>(root: Option<Root>, env: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let r = root.unwrap_or_default();
        let server = r.server.unwrap_or_default();
        let upstream = r.upstream.unwrap_or_default();
        let probe = r.probe.unwrap_or_default();
        let links = r.links.unwrap_or_default();
        let fallback = LinkDefaults::default();

        let bind = env("TIKLINK_BIND")
            .or(server.bind)
            .unwrap_or_else(|| DEFAULT_BIND.to_string());

        let upstream = UpstreamConfig {
            endpoint: env("TIKLINK_UPSTREAM_URL")
                .or(upstream.endpoint)
                .unwrap_or_else(|| DEFAULT_UPSTREAM_ENDPOINT.to_string()),
            version: env("TIKLINK_UPSTREAM_VERSION")
                .or(upstream.version)
                .unwrap_or_else(|| DEFAULT_UPSTREAM_VERSION.to_string()),
            timeout: duration_or(
                "upstream.timeout",
                upstream.timeout.as_deref(),
                DEFAULT_UPSTREAM_TIMEOUT_SECS,
            )?,
        };

        let probe = ProbeConfig {
            timeout: duration_or(
                "probe.timeout",
                probe.timeout.as_deref(),
                DEFAULT_PROBE_TIMEOUT_SECS,
            )?,
            max_redirects: probe.max_redirects.unwrap_or(DEFAULT_PROBE_MAX_REDIRECTS),
            user_agent: probe
                .user_agent
                .unwrap_or_else(|| BROWSER_USER_AGENT.to_string()),
        };

        let links = LinkDefaults {
            placeholder_author: links
                .placeholder_author
                .unwrap_or(fallback.placeholder_author),
            fallback_authors: links.fallback_authors.unwrap_or(fallback.fallback_authors),
            unknown_author: links.unknown_author.unwrap_or(fallback.unknown_author),
        };

        Ok(Self {
            bind,
            request_budget: duration_or(
                "server.request_budget",
                server.request_budget.as_deref(),
                DEFAULT_REQUEST_BUDGET_SECS,
            )?,
            upstream,
            probe,
            links,
            source: None,
        })
    }
}

fn duration_or(key: &str, value: Option<&str>, default_secs: u64) -> anyhow::Result<Duration> {
    match value {
        Some(raw) => humantime::parse_duration(raw.trim())
            .with_context(|| format!("invalid duration for {key}: {raw:?}")),
        None => Ok(Duration::from_secs(default_secs)),
    }
}
