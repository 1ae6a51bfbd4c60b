//! Parsing and serialization of the responsive-image `srcset` micro-syntax.
//!
//! Candidates are split the way HTML does it: a URL is a run of
//! non-whitespace characters, and its descriptors run until the next comma.
//! A URL that itself ends in a comma closes its candidate immediately, which
//! keeps commas inside `data:` URLs intact.

use std::fmt;
use std::num::NonZeroU64;

use thiserror::Error;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SrcsetError {
    #[error("invalid srcset descriptor '{0}'")]
    InvalidDescriptor(String),
    #[error("srcset candidate '{0}' carries both a width and a density descriptor")]
    ConflictingDescriptors(String),
    #[error("srcset candidate is missing its URL")]
    MissingUrl,
}

/// Width (`Nw`) or pixel density (`Nx`) of a candidate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Descriptor {
    Width(NonZeroU64),
    Density(f64),
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Descriptor::Width(w) => write!(f, "{}w", w),
            Descriptor::Density(x) => write!(f, "{}x", x),
        }
    }
}

/// One `(url, width-or-density)` entry of a srcset value.
#[derive(Debug, Clone, PartialEq)]
pub struct SrcsetCandidate {
    pub url: String,
    pub descriptor: Option<Descriptor>,
}

impl SrcsetCandidate {
    pub fn new(url: impl Into<String>, descriptor: Option<Descriptor>) -> Self {
        Self {
            url: url.into(),
            descriptor,
        }
    }

    pub fn width(&self) -> Option<u64> {
        match self.descriptor {
            Some(Descriptor::Width(w)) => Some(w.get()),
            _ => None,
        }
    }

    pub fn density(&self) -> Option<f64> {
        match self.descriptor {
            Some(Descriptor::Density(x)) => Some(x),
            _ => None,
        }
    }

    fn render(&self) -> Result<String, SrcsetError> {
        if self.url.trim().is_empty() {
            return Err(SrcsetError::MissingUrl);
        }
        Ok(match self.descriptor {
            Some(descriptor) => format!("{} {}", self.url, descriptor),
            None => self.url.clone(),
        })
    }
}

impl fmt::Display for SrcsetCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.descriptor {
            Some(descriptor) => write!(f, "{} {}", self.url, descriptor),
            None => f.write_str(&self.url),
        }
    }
}

/// Parses a srcset value into sorted, de-duplicated candidates.
pub fn parse(value: &str) -> Result<Vec<SrcsetCandidate>, SrcsetError> {
    let mut candidates = Vec::new();
    let mut rest = value;

    loop {
        rest = rest.trim_start_matches(|c: char| c.is_whitespace() || c == ',');
        if rest.is_empty() {
            break;
        }

        let url_end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        let raw_url = &rest[..url_end];
        rest = &rest[url_end..];

        if raw_url.ends_with(',') {
            candidates.push(SrcsetCandidate::new(raw_url.trim_end_matches(','), None));
            continue;
        }

        let descriptors_end = descriptor_end(rest);
        let descriptors = &rest[..descriptors_end];
        rest = &rest[descriptors_end..];

        let descriptor = parse_descriptors(raw_url, descriptors)?;
        candidates.push(SrcsetCandidate::new(raw_url, descriptor));
    }

    candidates.sort_by_cached_key(|candidate| candidate.to_string());
    candidates.dedup();
    Ok(candidates)
}

/// Serializes candidates as `url[ Nw| Nx]` joined by `", "`.
pub fn serialize(candidates: &[SrcsetCandidate]) -> Result<String, SrcsetError> {
    let mut rendered: Vec<String> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let text = candidate.render()?;
        if !rendered.contains(&text) {
            rendered.push(text);
        }
    }
    Ok(rendered.join(", "))
}

/// Resolves every candidate URL against `base`. Candidates whose URL cannot be
/// joined keep their original text.
pub fn resolve_urls(candidates: Vec<SrcsetCandidate>, base: &Url) -> Vec<SrcsetCandidate> {
    candidates
        .into_iter()
        .map(|candidate| match base.join(&candidate.url) {
            Ok(resolved) => SrcsetCandidate {
                url: resolved.to_string(),
                ..candidate
            },
            Err(_) => candidate,
        })
        .collect()
}

/// Rewrites a srcset value so every candidate URL is absolute.
pub fn absolutize(value: &str, base: &Url) -> Result<String, SrcsetError> {
    serialize(&resolve_urls(parse(value)?, base))
}

// Descriptors end at the first comma outside parentheses.
fn descriptor_end(input: &str) -> usize {
    let mut depth = 0usize;
    for (idx, c) in input.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => return idx,
            _ => {}
        }
    }
    input.len()
}

fn parse_descriptors(url: &str, descriptors: &str) -> Result<Option<Descriptor>, SrcsetError> {
    let mut width: Option<NonZeroU64> = None;
    let mut density: Option<f64> = None;

    for token in descriptors.split_whitespace() {
        if let Some(number) = token.strip_suffix('w') {
            if width.is_some() {
                return Err(SrcsetError::InvalidDescriptor(token.to_string()));
            }
            let parsed = number
                .parse::<u64>()
                .ok()
                .and_then(NonZeroU64::new)
                .ok_or_else(|| SrcsetError::InvalidDescriptor(token.to_string()))?;
            width = Some(parsed);
        } else if let Some(number) = token.strip_suffix('x') {
            if density.is_some() {
                return Err(SrcsetError::InvalidDescriptor(token.to_string()));
            }
            let parsed = number
                .parse::<f64>()
                .ok()
                .filter(|x| x.is_finite() && *x > 0.0)
                .ok_or_else(|| SrcsetError::InvalidDescriptor(token.to_string()))?;
            density = Some(parsed);
        } else {
            return Err(SrcsetError::InvalidDescriptor(token.to_string()));
        }

        if width.is_some() && density.is_some() {
            return Err(SrcsetError::ConflictingDescriptors(format!(
                "{} {}",
                url,
                descriptors.trim()
            )));
        }
    }

    Ok(width
        .map(Descriptor::Width)
        .or(density.map(Descriptor::Density)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_width_and_density_candidates() {
        let parsed = parse("small.jpg 480w, large.jpg 1080w").unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].url, "large.jpg");
        assert_eq!(parsed[0].width(), Some(1080));
        assert_eq!(parsed[1].url, "small.jpg");
        assert_eq!(parsed[1].width(), Some(480));

        let parsed = parse("a.png 1.5x").unwrap();
        assert_eq!(parsed[0].density(), Some(1.5));
    }

    #[test]
    fn widths_beyond_u32_parse_and_serialize() {
        let parsed = parse("a.jpg 5000000000w, b.jpg 480w").unwrap();
        assert_eq!(parsed[0].width(), Some(5_000_000_000));
        assert_eq!(
            serialize(&parsed).unwrap(),
            "a.jpg 5000000000w, b.jpg 480w"
        );

        let base = Url::parse("https://example.com/").unwrap();
        assert_eq!(
            absolutize("a.jpg 5000000000w", &base).unwrap(),
            "https://example.com/a.jpg 5000000000w"
        );
    }

    #[test]
    fn duplicate_candidates_collapse() {
        let parsed = parse("a.jpg 100w, a.jpg 100w").unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].to_string(), "a.jpg 100w");
    }

    #[test]
    fn width_and_density_together_conflict() {
        assert!(matches!(
            parse("a.jpg 2x 100w"),
            Err(SrcsetError::ConflictingDescriptors(_))
        ));
    }

    #[test]
    fn non_positive_descriptors_are_rejected() {
        assert!(matches!(
            parse("a.jpg 0w"),
            Err(SrcsetError::InvalidDescriptor(_))
        ));
        assert!(matches!(
            parse("a.jpg 0x"),
            Err(SrcsetError::InvalidDescriptor(_))
        ));
        assert!(matches!(
            parse("a.jpg -2x"),
            Err(SrcsetError::InvalidDescriptor(_))
        ));
    }

    #[test]
    fn unknown_descriptor_suffix_is_rejected() {
        assert!(matches!(
            parse("a.jpg 100h"),
            Err(SrcsetError::InvalidDescriptor(token)) if token == "100h"
        ));
        assert!(parse("a.jpg 1.5w").is_err());
    }

    #[test]
    fn bare_url_and_comma_without_space() {
        let parsed = parse("a.jpg, b.jpg 2x,c.jpg 3x").unwrap();
        let rendered: Vec<String> = parsed.iter().map(|c| c.to_string()).collect();
        assert_eq!(rendered, vec!["a.jpg", "b.jpg 2x", "c.jpg 3x"]);
    }

    #[test]
    fn data_urls_keep_their_commas() {
        let parsed = parse("data:image/png;base64,AAAA 1x, b.png 2x").unwrap();
        assert_eq!(parsed[0].url, "b.png");
        assert_eq!(parsed[1].url, "data:image/png;base64,AAAA");
        assert_eq!(parsed[1].density(), Some(1.0));
    }

    #[test]
    fn empty_value_parses_to_nothing() {
        assert!(parse("").unwrap().is_empty());
        assert!(parse("  ,  ").unwrap().is_empty());
        assert_eq!(serialize(&[]).unwrap(), "");
    }

    #[test]
    fn serialize_requires_urls() {
        let candidates = vec![SrcsetCandidate::new("", None)];
        assert_eq!(serialize(&candidates), Err(SrcsetError::MissingUrl));
    }

    #[test]
    fn serialize_dedupes_rendered_candidates() {
        let candidates = vec![
            SrcsetCandidate::new("a.jpg", Some(Descriptor::Density(2.0))),
            SrcsetCandidate::new("b.jpg", None),
            SrcsetCandidate::new("a.jpg", Some(Descriptor::Density(2.0))),
        ];
        assert_eq!(serialize(&candidates).unwrap(), "a.jpg 2x, b.jpg");
    }

    #[test]
    fn serialized_output_parses_again() {
        let inputs = [
            "a.jpg",
            "a.jpg 1x, b.jpg 2x",
            "img/hero-640.webp 640w,img/hero-1280.webp 1280w",
            "a.jpg 1.25x, a.jpg 1.25x, c.jpg",
        ];
        for input in inputs {
            let serialized = serialize(&parse(input).unwrap()).unwrap();
            let reparsed = parse(&serialized).unwrap();
            assert_eq!(serialize(&reparsed).unwrap(), serialized, "input: {input}");
        }
    }

    #[test]
    fn absolutize_resolves_against_base() {
        let base = Url::parse("https://example.com/blog/post.html").unwrap();
        let rewritten = absolutize("img/a.jpg 1x, /b.jpg 2x", &base).unwrap();
        assert_eq!(
            rewritten,
            "https://example.com/b.jpg 2x, https://example.com/blog/img/a.jpg 1x"
        );
    }
}
