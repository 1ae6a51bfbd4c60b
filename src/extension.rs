//! File extension inference for localized resources.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

static PATH_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.([A-Za-z0-9]{3,6})$").expect("valid suffix regex"));

/// Maps a declared content type to an extension. Parameters such as
/// `charset` are ignored and matching is case-insensitive.
pub fn from_content_type(content_type: &str) -> Option<&'static str> {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    let ext = match essence.as_str() {
        "text/html" => "html",
        "text/css" => "css",
        "application/javascript" | "text/javascript" | "application/x-javascript" => "js",
        "application/json" => "json",
        "image/png" => "png",
        "image/jpeg" => "jpg",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/avif" => "avif",
        "image/svg+xml" => "svg",
        "image/x-icon" | "image/vnd.microsoft.icon" => "ico",
        "font/woff" | "application/font-woff" => "woff",
        "font/woff2" => "woff2",
        "font/ttf" | "application/x-font-ttf" => "ttf",
        "font/otf" => "otf",
        "video/mp4" => "mp4",
        "video/webm" => "webm",
        "audio/mpeg" => "mp3",
        "text/plain" => "txt",
        "application/xml" | "text/xml" => "xml",
        _ => return None,
    };
    Some(ext)
}

/// Takes a 3 to 6 character alphanumeric suffix from the URL path.
pub fn from_url(url: &str) -> Option<String> {
    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url.split(['?', '#']).next().unwrap_or_default().to_string(),
    };
    PATH_SUFFIX
        .captures(&path)
        .map(|caps| caps[1].to_ascii_lowercase())
}

/// Content type first, then the URL path. `None` means the resource cannot
/// be given a local file name.
pub fn infer(content_type: Option<&str>, url: &str) -> Option<String> {
    content_type
        .and_then(from_content_type)
        .map(str::to_string)
        .or_else(|| from_url(url))
}
