use std::collections::HashSet;

use super::standard_link;
use crate::constants::{MOBILE_HOST, SHORT_HOSTS};
use crate::core::{LinkDefaults, VideoId};
use crate::error::ResolveError;

/// Ordered, duplicate-free links to try against the upstream for one video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantSet {
    id: VideoId,
    links: Vec<String>,
}

impl VariantSet {
    /// Builds the set from a normalized link. The link itself is always the first entry.
    pub fn build(normalized: &str, defaults: &LinkDefaults) -> Result<Self, ResolveError> {
        let id = VideoId::find(normalized).ok_or_else(|| ResolveError::NoVideoId {
            link: normalized.to_string(),
        })?;

        let mut candidates = vec![
            normalized.to_string(),
            standard_link(&defaults.placeholder_author, &id),
            standard_link("", &id),
        ];
        candidates.extend(
            defaults
                .fallback_authors
                .iter()
                .map(|author| standard_link(author, &id)),
        );
        candidates.push(format!("https://{}/{id}", SHORT_HOSTS[0]));
        candidates.push(format!("https://{MOBILE_HOST}/v/{id}.html"));

        let mut seen = HashSet::new();
        let links = candidates
            .into_iter()
            .filter(|link| seen.insert(link.clone()))
            .collect();
        Ok(Self { id, links })
    }

    pub fn id(&self) -> &VideoId {
        &self.id
    }

    pub fn links(&self) -> &[String] {
        &self.links
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.links.iter().map(String::as_str)
    }
}
