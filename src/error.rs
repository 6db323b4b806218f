use serde::Serialize;
use thiserror::Error;

/// Pipeline stage a failure originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    Extraction,
    Validation,
    Normalization,
    NetworkProbe,
    Upstream,
    ContentMissing,
    Internal,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("url is required")]
    Empty,

    #[error("Invalid TikTok URL format. Please provide a valid TikTok URL.")]
    InvalidLink { link: String },

    #[error("Could not extract video ID from URL")]
    NoVideoId { link: String },

    /// Absorbed by the normalizer; never terminates a request.
    #[error("redirect probe failed for {link}: {message}")]
    Probe { link: String, message: String },

    #[error("{message}")]
    UpstreamExhausted { attempts: usize, message: String },

    #[error("Video not found or is not available for download. The video might be private, age-restricted, or deleted.")]
    ContentMissing,

    #[error("resolution cancelled after {attempts} attempt(s)")]
    Cancelled { attempts: usize },
}

impl ResolveError {
    pub fn stage(&self) -> Stage {
        match self {
            ResolveError::Empty => Stage::Extraction,
            ResolveError::InvalidLink { .. } => Stage::Validation,
            ResolveError::NoVideoId { .. } => Stage::Normalization,
            ResolveError::Probe { .. } => Stage::NetworkProbe,
            ResolveError::UpstreamExhausted { .. } => Stage::Upstream,
            ResolveError::ContentMissing => Stage::ContentMissing,
            ResolveError::Cancelled { .. } => Stage::Internal,
        }
    }

    /// Whether the caller, not the service, is at fault.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self.stage(),
            Stage::Extraction | Stage::Validation | Stage::Normalization | Stage::ContentMissing
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_follow_taxonomy() {
        assert_eq!(ResolveError::Empty.stage(), Stage::Extraction);
        assert_eq!(
            ResolveError::NoVideoId { link: "x".into() }.stage(),
            Stage::Normalization
        );
        assert_eq!(ResolveError::ContentMissing.stage(), Stage::ContentMissing);
        assert!(ResolveError::ContentMissing.is_client_error());
        assert!(!ResolveError::UpstreamExhausted {
            attempts: 3,
            message: "boom".into()
        }
        .is_client_error());
    }

    #[test]
    fn exhausted_message_is_the_underlying_one() {
        let err = ResolveError::UpstreamExhausted {
            attempts: 2,
            message: "API returned: error - private".into(),
        };
        assert_eq!(err.to_string(), "API returned: error - private");
    }

    #[test]
    fn stage_serializes_kebab_case() {
        assert_eq!(
            serde_json::to_string(&Stage::ContentMissing).unwrap(),
            "\"content-missing\""
        );
    }
}
