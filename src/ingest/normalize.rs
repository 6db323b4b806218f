use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};
use url::Url;

use super::canonical::{canonicalize, ensure_scheme};
use super::standard_link;
use crate::constants::{
    ALIAS_TOKEN, MISSING_AUTHOR_SEGMENT, MOBILE_HOST, PRIMARY_DOMAIN, PRIMARY_TOKEN,
    SHORT_CODE_SEGMENT, SHORT_HOSTS,
};
use crate::core::{LinkDefaults, LinkShape, RedirectProbe, VideoId};
use crate::error::ResolveError;

static STANDARD_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/@[^/]+/video/[0-9]+").unwrap());

/// What to do with a link once its shape is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rewrite {
    Keep,
    Replace(String),
    /// Follow redirects and use the final location.
    Probe,
    /// Follow redirects, then swap the first alias token for the primary one.
    ProbeAlias,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classified {
    pub shape: LinkShape,
    pub rewrite: Rewrite,
}

impl Classified {
    fn new(shape: LinkShape, rewrite: Rewrite) -> Self {
        Self { shape, rewrite }
    }
}

/// Decision table over a canonical link. First matching rule wins.
pub fn classify(link: &str, defaults: &LinkDefaults) -> Classified {
    let parsed = Url::parse(link).ok();
    let host = parsed
        .as_ref()
        .and_then(|url| url.host_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let path = parsed.as_ref().map(|url| url.path()).unwrap_or_default();
    let is_short_host = SHORT_HOSTS.contains(&host.as_str());

    if link.contains(SHORT_CODE_SEGMENT) {
        return Classified::new(LinkShape::ShortCode, Rewrite::Probe);
    }

    if is_short_host && !first_segment(path).chars().any(|c| c.is_ascii_alphabetic()) {
        let rewrite = rewrite_from_id(link, defaults);
        return Classified::new(LinkShape::NumericShort, rewrite);
    }

    if is_short_host {
        return Classified::new(LinkShape::AltShortDomain, Rewrite::Probe);
    }

    if host == MOBILE_HOST && path.starts_with("/v/") {
        let rewrite = rewrite_from_id(path, defaults);
        return Classified::new(LinkShape::Mobile, rewrite);
    }

    if link.contains(MISSING_AUTHOR_SEGMENT) {
        let filled = format!("/@{}/video/", defaults.placeholder_author);
        return Classified::new(
            LinkShape::MissingSegment,
            Rewrite::Replace(link.replacen(MISSING_AUTHOR_SEGMENT, &filled, 1)),
        );
    }

    let alias_scope = if host.is_empty() { link } else { host.as_str() };
    if alias_scope.contains(ALIAS_TOKEN) {
        return Classified::new(LinkShape::AliasDomain, Rewrite::ProbeAlias);
    }

    if host.ends_with(PRIMARY_DOMAIN) && STANDARD_PATH.is_match(path) {
        return Classified::new(LinkShape::Standard, Rewrite::Keep);
    }

    Classified::new(LinkShape::Unknown, Rewrite::Keep)
}

fn first_segment(path: &str) -> &str {
    path.trim_start_matches('/').split('/').next().unwrap_or_default()
}

fn rewrite_from_id(scope: &str, defaults: &LinkDefaults) -> Rewrite {
    match VideoId::find(scope) {
        Some(id) => Rewrite::Replace(standard_link(&defaults.placeholder_author, &id)),
        None => Rewrite::Keep,
    }
}

/// Normalized link plus how it was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    pub link: String,
    pub shape: LinkShape,
    /// Set when a redirect probe failed and the pre-probe link was kept.
    pub degraded: Option<ResolveError>,
}

pub struct ShapeNormalizer<P> {
    probe: P,
    defaults: LinkDefaults,
}

impl<P: RedirectProbe> ShapeNormalizer<P> {
    pub fn new(probe: P, defaults: LinkDefaults) -> Self {
        Self { probe, defaults }
    }

    pub fn defaults(&self) -> &LinkDefaults {
        &self.defaults
    }

    pub fn probe(&self) -> &P {
        &self.probe
    }

    /// Rewrites a validated canonical link into a form the upstream accepts.
    ///
    /// Never fails: probe errors degrade to the best link known so far.
    pub async fn normalize(&self, link: &str) -> Normalized {
        let Classified { shape, rewrite } = classify(link, &self.defaults);
        debug!(target: "tiklink::ingest::normalize", %shape, link, "classified link");

        let mut degraded = None;
        let rewritten = match rewrite {
            Rewrite::Keep => link.to_string(),
            Rewrite::Replace(next) => next,
            Rewrite::Probe => match self.expand(link).await {
                Ok(resolved) => resolved,
                Err(err) => {
                    degraded = Some(err);
                    link.to_string()
                }
            },
            Rewrite::ProbeAlias => match self.expand(link).await {
                Ok(resolved) => resolved.replacen(ALIAS_TOKEN, PRIMARY_TOKEN, 1),
                Err(err) => {
                    degraded = Some(err);
                    link.to_string()
                }
            },
        };

        Normalized {
            link: ensure_scheme(&rewritten),
            shape,
            degraded,
        }
    }

    async fn expand(&self, link: &str) -> Result<String, ResolveError> {
        match self.probe.resolve_redirect(link).await {
            Ok(resolved) => {
                let resolved = canonicalize(&resolved);
                if resolved != link {
                    debug!(
                        target: "tiklink::ingest::normalize",
                        from = link,
                        to = %resolved,
                        "expanded redirecting link"
                    );
                }
                Ok(resolved)
            }
            Err(err) => {
                warn!(
                    target: "tiklink::ingest::normalize",
                    link,
                    error = %err,
                    "redirect probe failed; continuing with unexpanded link"
                );
                Err(ResolveError::Probe {
                    link: link.to_string(),
                    message: format!("{err:#}"),
                })
            }
        }
    }
}
