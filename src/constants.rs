//! Shared constants for the tiklink resolver.

pub const PRIMARY_DOMAIN: &str = "tiktok.com";
pub const PRIMARY_TOKEN: &str = "tiktok";
pub const ALIAS_TOKEN: &str = "douyin";

pub const STANDARD_HOST: &str = "www.tiktok.com";
pub const MOBILE_HOST: &str = "m.tiktok.com";
pub const SHORT_HOSTS: &[&str] = &["vm.tiktok.com", "vt.tiktok.com"];

/// Substrings accepted by the link validator. Order is irrelevant.
pub const RECOGNIZED_DOMAINS: &[&str] = &[
    PRIMARY_DOMAIN,
    "vm.tiktok.com",
    "vt.tiktok.com",
    MOBILE_HOST,
    ALIAS_TOKEN,
];

pub const VIDEO_ID_LEN: usize = 19;

pub const SHORT_CODE_SEGMENT: &str = "/t/";
pub const MISSING_AUTHOR_SEGMENT: &str = "/@/video/";
pub const STORY_SEGMENT: &str = "/story/";

pub const STORY_CONTENT_TYPE: &str = "story";

pub const DEFAULT_PLACEHOLDER_AUTHOR: &str = "placeholder";
pub const DEFAULT_FALLBACK_AUTHORS: &[&str] = &["tiktok", "user"];
pub const DEFAULT_UNKNOWN_AUTHOR: &str = "Unknown Author";

pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

pub const DEFAULT_BIND: &str = "0.0.0.0:4321";
pub const DEFAULT_UPSTREAM_ENDPOINT: &str = "http://127.0.0.1:8787/api/download";
pub const DEFAULT_UPSTREAM_VERSION: &str = "v3";
pub const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 20;
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 8;
pub const DEFAULT_PROBE_MAX_REDIRECTS: usize = 10;
pub const DEFAULT_REQUEST_BUDGET_SECS: u64 = 45;
