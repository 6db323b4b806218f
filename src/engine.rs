use serde_json::json;
use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::core::{LinkDefaults, MediaDescriptor, RawMedia, RedirectProbe, UpstreamResolver};
use crate::error::ResolveError;
use crate::ingest::{canonicalize, extract_link, is_recognized, ShapeNormalizer, VariantSet};
use crate::postprocess;
use crate::telemetry::{AttemptEvent, AttemptOutcome, ResolveMonitor};

const NO_ATTEMPT_MESSAGE: &str = "All URL variations failed";

/// The resolution pipeline: extract, canonicalize, validate, normalize, fan out into variants,
/// walk the variants against the upstream one at a time, then postprocess.
pub struct Engine<P, U>
where
    P: RedirectProbe,
    U: UpstreamResolver,
{
    pub normalizer: ShapeNormalizer<P>,
    pub upstream: U,
    pub version: String,
}

impl<P, U> Engine<P, U>
where
    P: RedirectProbe,
    U: UpstreamResolver,
{
    pub fn new(probe: P, upstream: U, version: impl Into<String>, defaults: LinkDefaults) -> Self {
        Self {
            normalizer: ShapeNormalizer::new(probe, defaults),
            upstream,
            version: version.into(),
        }
    }

    pub fn defaults(&self) -> &LinkDefaults {
        self.normalizer.defaults()
    }

    pub async fn resolve(
        &self,
        text: &str,
        monitor: &ResolveMonitor,
        cancel: &CancellationToken,
    ) -> Result<MediaDescriptor, ResolveError> {
        let extracted = extract_link(text);
        if extracted.is_empty() {
            return Err(ResolveError::Empty);
        }

        let canonical = canonicalize(&extracted);
        if !is_recognized(&canonical) {
            return Err(ResolveError::InvalidLink { link: extracted });
        }

        let normalized = self.normalizer.normalize(&canonical).await;
        if let Some(degraded) = &normalized.degraded {
            monitor.note_event(
                "probe.degraded",
                json!({
                    "link": canonical,
                    "shape": normalized.shape,
                    "error": degraded.to_string(),
                }),
            );
        }

        let variants = VariantSet::build(&normalized.link, self.defaults())?;
        info!(
            target: "tiklink::engine",
            shape = %normalized.shape,
            id = %variants.id(),
            variants = variants.len(),
            "resolving"
        );

        let (_, raw) = self.try_variants(variants.iter(), monitor, cancel).await?;
        postprocess::finalize(raw, &[&canonical, &normalized.link], self.defaults())
    }

    /// Calls the upstream once per variant, in order, until one returns usable media.
    ///
    /// Only one call is in flight at a time. Cancellation is honored between attempts.
    pub async fn try_variants<'a, I>(
        &self,
        variants: I,
        monitor: &ResolveMonitor,
        cancel: &CancellationToken,
    ) -> Result<(String, RawMedia), ResolveError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut attempts = 0;
        let mut last_error: Option<String> = None;

        for variant in variants {
            if cancel.is_cancelled() {
                warn!(
                    target: "tiklink::engine",
                    attempts,
                    "cancelled before trying {}",
                    variant
                );
                return Err(ResolveError::Cancelled { attempts });
            }

            attempts += 1;
            let started_at = OffsetDateTime::now_utc();
            let outcome = match self.upstream.fetch(variant, &self.version).await {
                Ok(response) => response.into_media(),
                Err(err) => Err(format!("{err:#}")),
            };
            let finished_at = OffsetDateTime::now_utc();

            match outcome {
                Ok(media) => {
                    monitor.record(AttemptEvent {
                        variant: variant.to_string(),
                        outcome: AttemptOutcome::Success,
                        error: None,
                        started_at,
                        finished_at,
                    });
                    info!(target: "tiklink::engine", attempts, "upstream resolved {}", variant);
                    return Ok((variant.to_string(), media));
                }
                Err(message) => {
                    warn!(
                        target: "tiklink::engine",
                        attempts,
                        error = %message,
                        "upstream rejected {}",
                        variant
                    );
                    monitor.record(AttemptEvent {
                        variant: variant.to_string(),
                        outcome: AttemptOutcome::Failed,
                        error: Some(message.clone()),
                        started_at,
                        finished_at,
                    });
                    last_error = Some(message);
                }
            }
        }

        warn!(target: "tiklink::engine", attempts, "all variants exhausted");
        Err(ResolveError::UpstreamExhausted {
            attempts,
            message: last_error.unwrap_or_else(|| NO_ATTEMPT_MESSAGE.to_string()),
        })
    }
}
