//! Turns a successful upstream payload into the descriptor returned to callers.

use serde_json::{Map, Value};
use time::macros::format_description;
use time::OffsetDateTime;
use tracing::warn;

use crate::constants::{STORY_CONTENT_TYPE, STORY_SEGMENT};
use crate::core::{Author, LinkDefaults, MediaDescriptor, RawMedia};
use crate::error::ResolveError;

/// `links` are the forms the request passed through; any of them marking a story tags the result.
pub fn finalize(
    raw: RawMedia,
    links: &[&str],
    defaults: &LinkDefaults,
) -> Result<MediaDescriptor, ResolveError> {
    let mut extra = raw.extra;
    let raw_type = text_field("type", raw.content_type, &mut extra);
    let content_type = if links.iter().any(|link| link.contains(STORY_SEGMENT)) {
        Some(STORY_CONTENT_TYPE.to_string())
    } else {
        raw_type
    };

    let upload_date = raw.create_time.as_ref().and_then(upload_date);

    let author = match raw.author {
        Some(author) => Author {
            avatar: non_empty(author.avatar.and_then(into_text)),
            nickname: non_empty(author.nickname.and_then(into_text))
                .unwrap_or_else(|| defaults.unknown_author.clone()),
            extra: author.extra,
        },
        None => Author {
            avatar: None,
            nickname: defaults.unknown_author.clone(),
            extra: Map::new(),
        },
    };

    let descriptor = MediaDescriptor {
        content_type,
        desc: text_field("desc", raw.desc, &mut extra),
        author,
        video_sd: non_empty(text_field("videoSD", raw.video_sd, &mut extra)),
        video_hd: non_empty(text_field("videoHD", raw.video_hd, &mut extra)),
        video_hd_alt: non_empty(text_field("video_hd", raw.video_hd_alt, &mut extra)),
        video_watermark: non_empty(text_field(
            "videoWatermark",
            raw.video_watermark,
            &mut extra,
        )),
        music: non_empty(text_field("music", raw.music, &mut extra)),
        create_time: raw.create_time,
        upload_date,
        extra,
    };

    if !has_media(&descriptor) {
        warn!(
            target: "tiklink::postprocess",
            links = ?links,
            "upstream reported success without any retrievable media"
        );
        return Err(ResolveError::ContentMissing);
    }
    Ok(descriptor)
}

fn has_media(descriptor: &MediaDescriptor) -> bool {
    [
        &descriptor.video_sd,
        &descriptor.video_hd,
        &descriptor.video_hd_alt,
        &descriptor.video_watermark,
        &descriptor.music,
    ]
    .iter()
    .any(|asset| asset.is_some())
}

/// Text value of a known field. Anything else is passed through under its wire name.
fn text_field(key: &str, value: Option<Value>, extra: &mut Map<String, Value>) -> Option<String> {
    match value {
        Some(Value::String(text)) => Some(text),
        Some(Value::Null) | None => None,
        Some(other) => {
            extra.insert(key.to_string(), other);
            None
        }
    }
}

fn into_text(value: Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text),
        _ => None,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Epoch seconds (number or numeric string) to ISO form; zero or garbage means absent.
fn upload_date(raw: &Value) -> Option<String> {
    let seconds = match raw {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?,
        Value::String(s) => s.trim().parse::<i64>().ok()?,
        _ => return None,
    };
    if seconds == 0 {
        return None;
    }
    OffsetDateTime::from_unix_timestamp(seconds)
        .ok()?
        .format(format_description!(
            "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
        ))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::RawAuthor;
    use serde_json::json;

    const LINK: &str = "https://www.tiktok.com/@a/video/7123456789012345678";

    fn with_video() -> RawMedia {
        RawMedia {
            video_sd: Some("https://cdn.example/sd.mp4".into()),
            ..Default::default()
        }
    }

    #[test]
    fn derives_upload_date_from_epoch_seconds() {
        let raw = RawMedia {
            create_time: Some(json!(1_657_792_800)),
            ..with_video()
        };
        let descriptor = finalize(raw, &[LINK], &LinkDefaults::default()).unwrap();
        assert_eq!(
            descriptor.upload_date.as_deref(),
            Some("2022-07-14T10:00:00.000Z")
        );
    }

    #[test]
    fn zero_or_missing_timestamp_leaves_date_absent() {
        let zero = RawMedia {
            create_time: Some(json!(0)),
            ..with_video()
        };
        assert!(finalize(zero, &[LINK], &LinkDefaults::default())
            .unwrap()
            .upload_date
            .is_none());
        assert!(finalize(with_video(), &[LINK], &LinkDefaults::default())
            .unwrap()
            .upload_date
            .is_none());

        let textual = RawMedia {
            create_time: Some(json!("1657792800")),
            ..with_video()
        };
        assert!(finalize(textual, &[LINK], &LinkDefaults::default())
            .unwrap()
            .upload_date
            .is_some());
    }

    #[test]
    fn missing_author_gets_sentinel() {
        let descriptor = finalize(with_video(), &[LINK], &LinkDefaults::default()).unwrap();
        assert_eq!(
            descriptor.author,
            Author {
                avatar: None,
                nickname: "Unknown Author".into(),
                extra: Map::new(),
            }
        );

        let nameless = RawMedia {
            author: Some(RawAuthor {
                avatar: Some("https://cdn.example/a.jpg".into()),
                nickname: Some(json!("")),
                ..Default::default()
            }),
            ..with_video()
        };
        let descriptor = finalize(nameless, &[LINK], &LinkDefaults::default()).unwrap();
        assert_eq!(descriptor.author.nickname, "Unknown Author");
        assert_eq!(
            descriptor.author.avatar.as_deref(),
            Some("https://cdn.example/a.jpg")
        );
    }

    #[test]
    fn story_links_tag_content_type() {
        let raw = RawMedia {
            content_type: Some("video".into()),
            ..with_video()
        };
        let descriptor = finalize(
            raw,
            &["https://www.tiktok.com/@a/story/7123456789012345678"],
            &LinkDefaults::default(),
        )
        .unwrap();
        assert_eq!(descriptor.content_type.as_deref(), Some("story"));
    }

    #[test]
    fn success_without_media_is_content_missing() {
        let raw = RawMedia {
            desc: Some("deleted video".into()),
            video_sd: Some(json!("")),
            ..Default::default()
        };
        assert_eq!(
            finalize(raw, &[LINK], &LinkDefaults::default()),
            Err(ResolveError::ContentMissing)
        );
    }

    #[test]
    fn audio_alone_counts_as_media() {
        let raw = RawMedia {
            music: Some("https://cdn.example/a.mp3".into()),
            ..Default::default()
        };
        assert!(finalize(raw, &[LINK], &LinkDefaults::default()).is_ok());
    }

    #[test]
    fn oddly_typed_fields_pass_through_untouched() {
        let raw: RawMedia = serde_json::from_value(json!({
            "videoSD": "https://cdn.example/sd.mp4",
            "music": {"play_url": "m.mp3"},
            "author": {"avatar": ["x.jpg"], "nickname": "al", "uid": "42", "username": "al"}
        }))
        .unwrap();
        let descriptor = finalize(raw, &[LINK], &LinkDefaults::default()).unwrap();
        assert_eq!(
            serde_json::to_value(&descriptor).unwrap(),
            json!({
                "author": {"avatar": null, "nickname": "al", "uid": "42", "username": "al"},
                "videoSD": "https://cdn.example/sd.mp4",
                "music": {"play_url": "m.mp3"},
                "uploadDate": null
            })
        );
    }

    #[test]
    fn structured_music_alone_is_not_media() {
        let raw: RawMedia =
            serde_json::from_value(json!({"music": {"play_url": "m.mp3"}})).unwrap();
        assert_eq!(
            finalize(raw, &[LINK], &LinkDefaults::default()),
            Err(ResolveError::ContentMissing)
        );
    }

    #[test]
    fn serializes_like_the_public_result() {
        let raw: RawMedia = serde_json::from_value(json!({
            "type": "image",
            "videoHD": "hd.mp4",
            "images": ["1.jpg"]
        }))
        .unwrap();
        let descriptor = finalize(raw, &[LINK], &LinkDefaults::default()).unwrap();
        assert_eq!(
            serde_json::to_value(&descriptor).unwrap(),
            json!({
                "type": "image",
                "author": {"avatar": null, "nickname": "Unknown Author"},
                "videoHD": "hd.mp4",
                "uploadDate": null,
                "images": ["1.jpg"]
            })
        );
    }
}
