use std::fmt;
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::constants::{
    DEFAULT_FALLBACK_AUTHORS, DEFAULT_PLACEHOLDER_AUTHOR, DEFAULT_UNKNOWN_AUTHOR, VIDEO_ID_LEN,
};

static VIDEO_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!("[0-9]{{{VIDEO_ID_LEN}}}")).unwrap());

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum LinkShape {
    Standard,
    ShortCode,
    NumericShort,
    AltShortDomain,
    Mobile,
    MissingSegment,
    AliasDomain,
    Unknown,
}

impl LinkShape {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkShape::Standard => "standard",
            LinkShape::ShortCode => "short-code",
            LinkShape::NumericShort => "numeric-short",
            LinkShape::AltShortDomain => "alt-short-domain",
            LinkShape::Mobile => "mobile",
            LinkShape::MissingSegment => "missing-segment",
            LinkShape::AliasDomain => "alias-domain",
            LinkShape::Unknown => "unknown",
        }
    }
}

impl fmt::Display for LinkShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed-length numeric video token recovered from a link.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VideoId(String);

impl VideoId {
    /// First run of exactly [`VIDEO_ID_LEN`] ASCII digits anywhere in `text`.
    pub fn find(text: &str) -> Option<Self> {
        VIDEO_ID_PATTERN
            .find(text)
            .map(|found| Self(found.as_str().to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Named fallbacks used when rewriting links and filling descriptors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkDefaults {
    pub placeholder_author: String,
    pub fallback_authors: Vec<String>,
    pub unknown_author: String,
}

impl Default for LinkDefaults {
    fn default() -> Self {
        Self {
            placeholder_author: DEFAULT_PLACEHOLDER_AUTHOR.to_string(),
            fallback_authors: DEFAULT_FALLBACK_AUTHORS
                .iter()
                .map(|name| name.to_string())
                .collect(),
            unknown_author: DEFAULT_UNKNOWN_AUTHOR.to_string(),
        }
    }
}

/// Author record as reported upstream. Fields are kept loosely typed; the upstream is not
/// consistent about them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RawAuthor {
    pub avatar: Option<Value>,
    pub nickname: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Result body as the upstream service reports it. Unknown fields ride along in `extra`.
///
/// Known fields are held as raw JSON so an unexpectedly typed value never rejects the payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RawMedia {
    #[serde(rename = "type")]
    pub content_type: Option<Value>,
    pub desc: Option<Value>,
    #[serde(default, deserialize_with = "object_or_none")]
    pub author: Option<RawAuthor>,
    #[serde(rename = "videoSD")]
    pub video_sd: Option<Value>,
    #[serde(rename = "videoHD")]
    pub video_hd: Option<Value>,
    #[serde(rename = "video_hd")]
    pub video_hd_alt: Option<Value>,
    #[serde(rename = "videoWatermark")]
    pub video_watermark: Option<Value>,
    pub music: Option<Value>,
    pub create_time: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RawMedia {
    pub fn is_empty(&self) -> bool {
        self.content_type.is_none()
            && self.desc.is_none()
            && self.author.is_none()
            && self.video_sd.is_none()
            && self.video_hd.is_none()
            && self.video_hd_alt.is_none()
            && self.video_watermark.is_none()
            && self.music.is_none()
            && self.create_time.is_none()
            && self.extra.is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UpstreamResponse {
    #[serde(default, deserialize_with = "string_or_empty")]
    pub status: String,
    #[serde(default, deserialize_with = "string_or_none")]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "object_or_none")]
    pub result: Option<RawMedia>,
}

impl UpstreamResponse {
    pub fn is_success(&self) -> bool {
        self.status == "success" && self.result.as_ref().is_some_and(|r| !r.is_empty())
    }

    /// Usable media, or the message describing why this response is not usable.
    pub fn into_media(self) -> Result<RawMedia, String> {
        let message = self.failure_message();
        if self.is_success() {
            if let Some(result) = self.result {
                return Ok(result);
            }
        }
        Err(message)
    }

    /// Message recorded when a structurally valid response is still unusable.
    pub fn failure_message(&self) -> String {
        format!(
            "API returned: {} - {}",
            self.status,
            self.message.as_deref().unwrap_or("Unknown error")
        )
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Author {
    pub avatar: Option<String>,
    pub nickname: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Validated, immutable output of a resolution.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MediaDescriptor {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    pub author: Author,
    #[serde(rename = "videoSD", skip_serializing_if = "Option::is_none")]
    pub video_sd: Option<String>,
    #[serde(rename = "videoHD", skip_serializing_if = "Option::is_none")]
    pub video_hd: Option<String>,
    #[serde(rename = "video_hd", skip_serializing_if = "Option::is_none")]
    pub video_hd_alt: Option<String>,
    #[serde(rename = "videoWatermark", skip_serializing_if = "Option::is_none")]
    pub video_watermark: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub music: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_time: Option<Value>,
    #[serde(rename = "uploadDate")]
    pub upload_date: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// JSON body shared by the HTTP surface and the `resolve` subcommand.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Envelope {
    Success { result: MediaDescriptor },
    Error { error: String },
}

fn object_or_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    match Value::deserialize(deserializer)? {
        value @ Value::Object(_) => Ok(serde_json::from_value(value).ok()),
        _ => Ok(None),
    }
}

fn string_or_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(text) => Ok(Some(text)),
        _ => Ok(None),
    }
}

fn string_or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(string_or_none(deserializer)?.unwrap_or_default())
}

#[async_trait]
pub trait RedirectProbe: Send + Sync {
    /// Follows redirects from `link` and returns the final location.
    async fn resolve_redirect(&self, link: &str) -> anyhow::Result<String>;
}

#[async_trait]
pub trait UpstreamResolver: Send + Sync {
    async fn fetch(&self, link: &str, version: &str) -> anyhow::Result<UpstreamResponse>;
}

#[async_trait]
impl<T: RedirectProbe + ?Sized> RedirectProbe for Arc<T> {
    async fn resolve_redirect(&self, link: &str) -> anyhow::Result<String> {
        (**self).resolve_redirect(link).await
    }
}

#[async_trait]
impl<T: UpstreamResolver + ?Sized> UpstreamResolver for Arc<T> {
    async fn fetch(&self, link: &str, version: &str) -> anyhow::Result<UpstreamResponse> {
        (**self).fetch(link, version).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn finds_first_nineteen_digit_run() {
        let id = VideoId::find("https://vm.tiktok.com/7123456789012345678/").unwrap();
        assert_eq!(id.as_str(), "7123456789012345678");
        assert!(VideoId::find("https://vm.tiktok.com/712345678901234567").is_none());
    }

    #[test]
    fn upstream_success_requires_non_empty_result() {
        let empty: UpstreamResponse =
            serde_json::from_value(json!({"status": "success", "result": {}})).unwrap();
        assert!(!empty.is_success());

        let filled: UpstreamResponse =
            serde_json::from_value(json!({"status": "success", "result": {"videoSD": "u1"}}))
                .unwrap();
        assert!(filled.is_success());
        assert_eq!(filled.result.unwrap().video_sd, Some(json!("u1")));
    }

    #[test]
    fn failure_message_falls_back_to_unknown() {
        let response = UpstreamResponse {
            status: "error".into(),
            ..Default::default()
        };
        assert_eq!(response.failure_message(), "API returned: error - Unknown error");
    }

    #[test]
    fn raw_media_keeps_unknown_fields() {
        let raw: RawMedia = serde_json::from_value(json!({
            "images": ["a.jpg", "b.jpg"],
            "music": "m.mp3"
        }))
        .unwrap();
        assert_eq!(raw.music.as_ref().and_then(Value::as_str), Some("m.mp3"));
        assert_eq!(raw.extra.get("images"), Some(&json!(["a.jpg", "b.jpg"])));
    }

    #[test]
    fn oddly_typed_fields_do_not_reject_the_payload() {
        let response: UpstreamResponse = serde_json::from_value(json!({
            "result": {
                "videoSD": "https://cdn/sd.mp4",
                "music": {"play_url": "m.mp3"},
                "author": {"avatar": ["x.jpg"], "nickname": "a", "uid": "42"}
            }
        }))
        .unwrap();
        assert_eq!(response.status, "");
        let result = response.result.unwrap();
        assert_eq!(result.music, Some(json!({"play_url": "m.mp3"})));
        let author = result.author.unwrap();
        assert_eq!(author.avatar, Some(json!(["x.jpg"])));
        assert_eq!(author.extra.get("uid"), Some(&json!("42")));
    }

    #[test]
    fn non_object_result_and_message_are_dropped() {
        let response: UpstreamResponse = serde_json::from_value(json!({
            "status": "error",
            "message": {"code": 7},
            "result": "nope"
        }))
        .unwrap();
        assert!(response.result.is_none());
        assert_eq!(response.failure_message(), "API returned: error - Unknown error");

        let media: RawMedia = serde_json::from_value(json!({"author": "someone"})).unwrap();
        assert!(media.author.is_none());
    }

    #[test]
    fn envelope_is_tagged_by_status() {
        let body = serde_json::to_value(Envelope::Error {
            error: "url is required".into(),
        })
        .unwrap();
        assert_eq!(body, json!({"status": "error", "error": "url is required"}));
    }
}
