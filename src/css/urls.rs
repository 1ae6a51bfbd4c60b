//! Rewrites `url(...)` references inside CSS text to absolute URLs.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use url::Url;

static CSS_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)url\(\s*(?:"([^"]*)"|'([^']*)'|([^)'"\s]*))\s*\)"#).expect("valid url() regex")
});

/// Resolves every `url(...)` in `css` against `base`, keeping the original
/// quoting. `data:` URIs, fragment-only references and values that fail to
/// resolve are left untouched.
pub fn absolutize_css_urls(css: &str, base: &Url) -> String {
    CSS_URL
        .replace_all(css, |caps: &Captures| {
            let (raw, quote) = if let Some(m) = caps.get(1) {
                (m.as_str(), Some('"'))
            } else if let Some(m) = caps.get(2) {
                (m.as_str(), Some('\''))
            } else {
                (caps.get(3).map_or("", |m| m.as_str()), None)
            };

            let trimmed = raw.trim();
            if trimmed.is_empty()
                || trimmed.starts_with('#')
                || trimmed
                    .get(..5)
                    .is_some_and(|scheme| scheme.eq_ignore_ascii_case("data:"))
            {
                return caps[0].to_string();
            }

            let Ok(resolved) = base.join(trimmed) else {
                return caps[0].to_string();
            };
            let resolved = resolved.to_string();

            match quote {
                Some(q) => format!("url({q}{resolved}{q})"),
                None if resolved.contains(['(', ')', '\'', '"']) => {
                    format!("url(\"{}\")", resolved.replace('"', "%22"))
                }
                None => format!("url({resolved})"),
            }
        })
        .into_owned()
}
