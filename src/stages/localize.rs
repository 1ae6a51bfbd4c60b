//! Third render pass: inline and prune stylesheets, absolutize URLs, write
//! every still-referenced resource next to the document and minify.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use url::Url;

use super::scripts::{
    APPLY_SHEETS, APPLY_STYLE_SOURCES, COLLECT_ATTRIBUTE_NAMES, EXTRACT_RULES, PROBE_SELECTORS,
    REFRESH_IMAGE_SOURCES, SAMPLE_ATTRIBUTE, SAMPLE_STYLE_SOURCES, SET_ATTRIBUTE,
    STRIP_ATTRIBUTES,
};
use super::{close_pass, open_pass, run_count, RunContext};
use crate::browser::{evaluate_as, RenderSession, SessionFactory};
use crate::capture::{CapturedResource, ResourceCapture};
use crate::css::{
    absolutize_css_urls, collect_selectors, prune, serialize_rules, MatchTable, PruneStats,
    StyleRuleNode,
};
use crate::{extension, srcset, Result};

/// Inline styles and external stylesheet links, in document order.
pub const STYLE_SOURCE_SELECTOR: &str = r#"style, link[rel~="stylesheet"][href]"#;

/// A resource that could not be localized. The run continues and the
/// original URL stays in the document.
#[derive(Debug, Error)]
pub enum LocalizeError {
    #[error("no file extension could be inferred for {url}")]
    UnresolvableExtension { url: String },
    #[error("failed to write {url} to {}: {reason}", .path.display())]
    ResourceWriteFailure {
        url: String,
        path: PathBuf,
        reason: String,
    },
}

impl LocalizeError {
    pub fn url(&self) -> &str {
        match self {
            LocalizeError::UnresolvableExtension { url }
            | LocalizeError::ResourceWriteFailure { url, .. } => url,
        }
    }
}

/// One entry of the URL rewrite map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewriteEntry {
    pub url: String,
    pub file: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Localized {
    /// Minified final document.
    pub html: String,
    pub rewrites: Vec<RewriteEntry>,
    /// URLs that stayed remote because localization failed.
    pub skipped: Vec<String>,
    pub inlined_stylesheets: usize,
    pub pruned_rules: usize,
    pub ambiguous_selectors: usize,
    pub stripped_attributes: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum StyleSource {
    Inline { text: String },
    Link { href: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct AttributeName {
    tag: String,
    name: String,
}

/// Attributes that carry no rendering value: private `data-*` state,
/// editing markers, spellcheck hints and placeholders outside form fields.
pub fn is_denied_attribute(tag: &str, name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    name.starts_with("data-")
        || name == "contenteditable"
        || name == "spellcheck"
        || (name == "placeholder"
            && !matches!(tag.to_ascii_lowercase().as_str(), "input" | "textarea"))
}

/// The markup-escaped form a URL takes inside attribute values.
fn escaped(url: &str) -> String {
    url.replace('&', "&amp;")
}

/// Captured resources whose URL still occurs in `html`, literally or
/// escaped, in capture order.
pub fn referenced_resources(html: &str, resources: &[CapturedResource]) -> Vec<CapturedResource> {
    resources
        .iter()
        .filter(|r| {
            occurs_bounded(html, &r.request_url) || occurs_bounded(html, &escaped(&r.request_url))
        })
        .cloned()
        .collect()
}

/// A URL occurrence ends at a quote, `)`, `,`, `#`, `<`, `>`, whitespace or
/// the end of the markup.
fn ends_url(next: Option<char>) -> bool {
    match next {
        None => true,
        Some(c) => c.is_whitespace() || matches!(c, '"' | '\'' | ')' | ',' | '#' | '<' | '>'),
    }
}

fn occurs_bounded(html: &str, url: &str) -> bool {
    !url.is_empty()
        && html
            .match_indices(url)
            .any(|(idx, _)| ends_url(html[idx + url.len()..].chars().next()))
}

fn replace_bounded(html: &str, url: &str, file: &str) -> String {
    if url.is_empty() {
        return html.to_string();
    }
    let mut out = String::with_capacity(html.len());
    let mut last = 0;
    for (idx, _) in html.match_indices(url) {
        let end = idx + url.len();
        if ends_url(html[end..].chars().next()) {
            out.push_str(&html[last..idx]);
            out.push_str(file);
            last = end;
        }
    }
    out.push_str(&html[last..]);
    out
}

/// Replaces every occurrence of each original URL with its local file.
/// Longer URLs go first, and a match must end where the URL does, so
/// `a.css` never rewrites the front of `a.css.map`.
pub fn apply_rewrites(html: &str, rewrites: &[RewriteEntry]) -> String {
    let mut ordered: Vec<&RewriteEntry> = rewrites.iter().collect();
    ordered.sort_by(|a, b| b.url.len().cmp(&a.url.len()));

    let mut out = html.to_string();
    for entry in ordered {
        let escaped_url = escaped(&entry.url);
        if escaped_url != entry.url {
            out = replace_bounded(&out, &escaped_url, &entry.file);
        }
        out = replace_bounded(&out, &entry.url, &entry.file);
    }
    out
}

/// Minifies the final document: comments dropped, whitespace collapsed,
/// embedded CSS minified, attribute quotes removed where the result stays
/// valid.
pub fn minify(html: &str) -> String {
    let cfg = minify_html::Cfg {
        minify_css: true,
        ensure_spec_compliant_unquoted_attribute_values: true,
        ..minify_html::Cfg::default()
    };
    let minified = minify_html::minify(html.as_bytes(), &cfg);
    String::from_utf8_lossy(&minified).into_owned()
}

/// Replays `html` for the page URL and localizes it into `out_dir`.
pub async fn localize<F: SessionFactory>(
    factory: &F,
    ctx: &RunContext,
    html: String,
    out_dir: &Path,
) -> Result<Localized> {
    let started = Instant::now();
    let capture = Arc::new(ResourceCapture::excluding(&ctx.url));

    let session = open_pass(factory, ctx, Some(html), Some(capture.clone())).await?;
    let result = localize_page(&session, &ctx.url, &capture, out_dir).await;
    close_pass(&session).await;

    let localized = result?;
    log::info!(
        "Localized {} in {:.2?}: {} resources written, {} skipped, {} stylesheets inlined, {} rules pruned",
        ctx.url,
        started.elapsed(),
        localized.rewrites.len(),
        localized.skipped.len(),
        localized.inlined_stylesheets,
        localized.pruned_rules
    );
    Ok(localized)
}

/// Runs the localization steps against an already loaded page whose
/// responses are being recorded into `capture`.
pub async fn localize_page<S: RenderSession + ?Sized>(
    session: &S,
    page_url: &Url,
    capture: &ResourceCapture,
    out_dir: &Path,
) -> Result<Localized> {
    let inlined_stylesheets = inline_stylesheets(session, page_url, &capture.snapshot()).await?;

    run_count(session, REFRESH_IMAGE_SOURCES, Vec::new()).await?;
    rewrite_srcsets(session, page_url).await?;
    let stripped_attributes = strip_attributes(session).await?;
    rewrite_style_attributes(session, page_url).await?;
    let stats = prune_stylesheets(session).await?;

    let serialized = session.serialize_document().await?;
    let referenced = referenced_resources(&serialized, &capture.snapshot());
    log::debug!("{} captured resources still referenced", referenced.len());

    let (rewrites, failures) = write_resources(session, &referenced, out_dir).await;
    for failure in &failures {
        log::warn!("Leaving resource remote: {}", failure);
    }

    let html = minify(&apply_rewrites(&serialized, &rewrites));

    Ok(Localized {
        html,
        rewrites,
        skipped: failures.iter().map(|f| f.url().to_string()).collect(),
        inlined_stylesheets,
        pruned_rules: stats.removed,
        ambiguous_selectors: stats.kept_ambiguous.len(),
        stripped_attributes,
    })
}

/// Rewrites inline style text in place and swaps every captured external
/// stylesheet for an inline copy, with `url(...)` references absolutized
/// against the sheet's own location.
async fn inline_stylesheets<S: RenderSession + ?Sized>(
    session: &S,
    page_url: &Url,
    resources: &[CapturedResource],
) -> Result<usize> {
    let sources: Vec<StyleSource> = evaluate_as(
        session,
        SAMPLE_STYLE_SOURCES,
        vec![json!(STYLE_SOURCE_SELECTOR)],
    )
    .await?;

    let by_url: HashMap<&str, &CapturedResource> = resources
        .iter()
        .flat_map(|r| [(r.request_url.as_str(), r), (r.final_url.as_str(), r)])
        .collect();

    let by_url = &by_url;
    let texts: Vec<Option<String>> = join_all(sources.iter().map(|source| async move {
        match source {
            StyleSource::Inline { text } => Some(absolutize_css_urls(text, page_url)),
            StyleSource::Link { href } => {
                external_stylesheet(session, by_url.get(href.as_str()).copied(), href).await
            }
        }
    }))
    .await;

    let inlined = sources
        .iter()
        .zip(&texts)
        .filter(|(source, text)| matches!(source, StyleSource::Link { .. }) && text.is_some())
        .count();

    run_count(
        session,
        APPLY_STYLE_SOURCES,
        vec![json!(STYLE_SOURCE_SELECTOR), json!(texts)],
    )
    .await?;
    Ok(inlined)
}

async fn external_stylesheet<S: RenderSession + ?Sized>(
    session: &S,
    resource: Option<&CapturedResource>,
    href: &str,
) -> Option<String> {
    let Some(resource) = resource else {
        log::warn!("Stylesheet {} was not captured; keeping the link", href);
        return None;
    };

    let body = match resource.body(session).await {
        Ok(body) => body,
        Err(err) => {
            log::warn!("Could not read stylesheet {}: {}; keeping the link", href, err);
            return None;
        }
    };

    let css = String::from_utf8_lossy(&body);
    match Url::parse(&resource.final_url) {
        Ok(base) => Some(absolutize_css_urls(&css, &base)),
        Err(_) => Some(css.into_owned()),
    }
}

async fn rewrite_srcsets<S: RenderSession + ?Sized>(session: &S, page_url: &Url) -> Result<()> {
    let values: Vec<String> = evaluate_as(session, SAMPLE_ATTRIBUTE, vec![json!("srcset")]).await?;

    let updates: Vec<_> = values
        .iter()
        .enumerate()
        .filter_map(|(index, value)| match srcset::absolutize(value, page_url) {
            Ok(rewritten) if rewritten != *value => {
                Some(json!({ "index": index, "value": rewritten }))
            }
            Ok(_) => None,
            Err(err) => {
                log::warn!("Leaving srcset {:?} unchanged: {}", value, err);
                None
            }
        })
        .collect();

    if !updates.is_empty() {
        run_count(session, SET_ATTRIBUTE, vec![json!("srcset"), json!(updates)]).await?;
    }
    Ok(())
}

async fn strip_attributes<S: RenderSession + ?Sized>(session: &S) -> Result<usize> {
    let names: Vec<AttributeName> = evaluate_as(session, COLLECT_ATTRIBUTE_NAMES, Vec::new()).await?;
    let denied: Vec<AttributeName> = names
        .into_iter()
        .filter(|attr| is_denied_attribute(&attr.tag, &attr.name))
        .collect();

    if denied.is_empty() {
        return Ok(0);
    }
    run_count(session, STRIP_ATTRIBUTES, vec![json!(denied)]).await
}

async fn rewrite_style_attributes<S: RenderSession + ?Sized>(
    session: &S,
    page_url: &Url,
) -> Result<()> {
    let values: Vec<String> = evaluate_as(session, SAMPLE_ATTRIBUTE, vec![json!("style")]).await?;

    let updates: Vec<_> = values
        .iter()
        .enumerate()
        .filter_map(|(index, value)| {
            let rewritten = absolutize_css_urls(value, page_url);
            (rewritten != *value).then(|| json!({ "index": index, "value": rewritten }))
        })
        .collect();

    if !updates.is_empty() {
        run_count(session, SET_ATTRIBUTE, vec![json!("style"), json!(updates)]).await?;
    }
    Ok(())
}

/// Prunes every `<style>` element against the live document and writes the
/// surviving rules back, removing elements left with none.
async fn prune_stylesheets<S: RenderSession + ?Sized>(session: &S) -> Result<PruneStats> {
    let sheets: Vec<Option<Vec<StyleRuleNode>>> =
        evaluate_as(session, EXTRACT_RULES, Vec::new()).await?;

    let mut selectors = BTreeSet::new();
    for rules in sheets.iter().flatten() {
        selectors.extend(collect_selectors(rules));
    }

    let matches: HashMap<String, Option<bool>> = if selectors.is_empty() {
        HashMap::new()
    } else {
        let selectors: Vec<String> = selectors.into_iter().collect();
        evaluate_as(session, PROBE_SELECTORS, vec![json!(selectors)]).await?
    };
    let table = MatchTable::new(matches);

    let mut stats = PruneStats::default();
    let mut updates = Vec::new();
    for (index, sheet) in sheets.into_iter().enumerate() {
        let Some(mut rules) = sheet else {
            continue;
        };
        prune(&mut rules, &table, &mut stats);
        let text = (!rules.is_empty()).then(|| serialize_rules(&rules));
        updates.push(json!({ "index": index, "text": text }));
    }

    if !updates.is_empty() {
        run_count(session, APPLY_SHEETS, vec![json!(updates)]).await?;
    }
    Ok(stats)
}

/// Writes each referenced resource as `{ordinal}.{ext}`, ordinal being its
/// position in `referenced`. Failures are returned, never raised.
async fn write_resources<S: RenderSession + ?Sized>(
    session: &S,
    referenced: &[CapturedResource],
    out_dir: &Path,
) -> (Vec<RewriteEntry>, Vec<LocalizeError>) {
    let results = join_all(
        referenced
            .iter()
            .enumerate()
            .map(|(ordinal, resource)| write_resource(session, ordinal, resource, out_dir)),
    )
    .await;

    let mut rewrites = Vec::new();
    let mut failures = Vec::new();
    for result in results {
        match result {
            Ok(entry) => rewrites.push(entry),
            Err(err) => failures.push(err),
        }
    }
    (rewrites, failures)
}

async fn write_resource<S: RenderSession + ?Sized>(
    session: &S,
    ordinal: usize,
    resource: &CapturedResource,
    out_dir: &Path,
) -> std::result::Result<RewriteEntry, LocalizeError> {
    let ext = extension::infer(resource.content_type(), &resource.request_url)
        .or_else(|| extension::from_url(&resource.final_url))
        .ok_or_else(|| LocalizeError::UnresolvableExtension {
            url: resource.request_url.clone(),
        })?;

    let file = format!("{ordinal}.{ext}");
    let path = out_dir.join(&file);
    let failure = |reason: String| LocalizeError::ResourceWriteFailure {
        url: resource.request_url.clone(),
        path: path.clone(),
        reason,
    };

    let body = resource
        .body(session)
        .await
        .map_err(|err| failure(err.to_string()))?;
    tokio::fs::write(&path, body)
        .await
        .map_err(|err| failure(err.to_string()))?;

    log::debug!("Wrote {} as {}", resource.request_url, file);
    Ok(RewriteEntry {
        url: resource.request_url.clone(),
        file,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::scripted::{ScriptedFactory, ScriptedSession};
    use crate::browser::ObservedResponse;

    fn captured(urls: &[&str]) -> Vec<CapturedResource> {
        let capture = ResourceCapture::new();
        for (id, url) in urls.iter().enumerate() {
            capture.record(ObservedResponse {
                response_id: id as u64,
                request_url: url.to_string(),
                final_url: url.to_string(),
                resource_type: "image".to_string(),
                status: 200,
                headers: HashMap::new(),
            });
        }
        capture.snapshot()
    }

    #[test]
    fn deny_list_covers_private_and_editing_attributes() {
        assert!(is_denied_attribute("div", "data-testid"));
        assert!(is_denied_attribute("div", "DATA-x"));
        assert!(is_denied_attribute("p", "contenteditable"));
        assert!(is_denied_attribute("textarea", "spellcheck"));
        assert!(is_denied_attribute("div", "placeholder"));
        assert!(!is_denied_attribute("input", "placeholder"));
        assert!(!is_denied_attribute("textarea", "placeholder"));
        assert!(!is_denied_attribute("div", "class"));
        assert!(!is_denied_attribute("a", "database"));
    }

    #[test]
    fn referenced_resources_match_literal_and_escaped_urls() {
        let resources = captured(&[
            "https://cdn.test/a.png",
            "https://cdn.test/img?id=1&s=2",
            "https://cdn.test/unused.png",
        ]);
        let html = r#"<img src="https://cdn.test/a.png"><img src="https://cdn.test/img?id=1&amp;s=2">"#;

        let urls: Vec<_> = referenced_resources(html, &resources)
            .into_iter()
            .map(|r| r.request_url)
            .collect();
        assert_eq!(urls, vec!["https://cdn.test/a.png", "https://cdn.test/img?id=1&s=2"]);
    }

    #[test]
    fn rewrites_replace_longest_urls_first() {
        let rewrites = vec![
            RewriteEntry {
                url: "https://cdn.test/a.css".to_string(),
                file: "0.css".to_string(),
            },
            RewriteEntry {
                url: "https://cdn.test/a.css?v=2&x=1".to_string(),
                file: "1.css".to_string(),
            },
        ];
        let html = r#"<a href="https://cdn.test/a.css?v=2&amp;x=1">x</a><a href="https://cdn.test/a.css">y</a>"#;
        assert_eq!(
            apply_rewrites(html, &rewrites),
            r#"<a href="1.css">x</a><a href="0.css">y</a>"#
        );
    }

    #[test]
    fn rewrites_leave_longer_unrewritten_urls_alone() {
        let rewrites = vec![RewriteEntry {
            url: "https://cdn.test/a.css".to_string(),
            file: "0.css".to_string(),
        }];
        let html = concat!(
            r#"<link href="https://cdn.test/a.css.map">"#,
            r#"<link href="https://cdn.test/a.css">"#,
            r#"<div style="background:url(https://cdn.test/a.css)"></div>"#,
            r#"<img srcset="https://cdn.test/a.css 1x, https://cdn.test/a.css2 2x">"#,
            r#"<use href="https://cdn.test/a.css#frag">"#
        );
        assert_eq!(
            apply_rewrites(html, &rewrites),
            concat!(
                r#"<link href="https://cdn.test/a.css.map">"#,
                r#"<link href="0.css">"#,
                r#"<div style="background:url(0.css)"></div>"#,
                r#"<img srcset="0.css 1x, https://cdn.test/a.css2 2x">"#,
                r#"<use href="0.css#frag">"#
            )
        );
    }

    #[test]
    fn prefix_only_matches_do_not_count_as_references() {
        let resources = captured(&["https://cdn.test/a.css"]);
        let html = r#"<link href="https://cdn.test/a.css.map">"#;
        assert!(referenced_resources(html, &resources).is_empty());
    }

    #[test]
    fn minify_drops_comments_and_collapses_whitespace() {
        let html = "<!DOCTYPE html>\n<html>\n  <body>\n    <!-- note -->\n    <p class=\"a\">  hi  </p>\n  </body>\n</html>\n";
        let out = minify(html);
        assert!(!out.contains("note"), "{out}");
        assert!(!out.contains("\n  "), "{out}");
        assert!(out.contains("hi"));
    }

    #[tokio::test]
    async fn localize_writes_referenced_resources_in_capture_order() {
        let document = concat!(
            "<html><head><style>.a{background:url(https://cdn.test/bg.png)}</style></head>",
            "<body><div class=\"a\"><img src=\"https://cdn.test/pic?id=1&amp;s=2\"></div>",
            "<a href=\"https://cdn.test/blob\">b</a><!-- gone --></body></html>"
        );
        let session = ScriptedSession::new()
            .response(
                "https://cdn.test/app.css",
                "stylesheet",
                &[("content-type", "text/css")],
                Some(b".a{background:url(bg.png)}"),
            )
            .response(
                "https://cdn.test/bg.png",
                "image",
                &[("content-type", "image/png")],
                Some(b"png"),
            )
            .response(
                "https://cdn.test/pic?id=1&s=2",
                "image",
                &[("content-type", "image/jpeg")],
                Some(b"jpg"),
            )
            .response(
                "https://cdn.test/unused.woff2",
                "font",
                &[("content-type", "font/woff2")],
                Some(b"font"),
            )
            .response("https://cdn.test/blob", "other", &[], Some(b"?"))
            .answer(
                SAMPLE_STYLE_SOURCES,
                json!([
                    { "kind": "inline", "text": ".x{background:url(x.png)}" },
                    { "kind": "link", "href": "https://cdn.test/app.css" }
                ]),
            )
            .answer(APPLY_STYLE_SOURCES, json!(2))
            .answer(SAMPLE_ATTRIBUTE, json!(["a.png 1x, b.png 2x"]))
            .answer(SAMPLE_ATTRIBUTE, json!(["background:url(x.png)"]))
            .answer(
                COLLECT_ATTRIBUTE_NAMES,
                json!([
                    { "tag": "div", "name": "data-x" },
                    { "tag": "input", "name": "placeholder" },
                    { "tag": "p", "name": "placeholder" },
                    { "tag": "div", "name": "class" }
                ]),
            )
            .answer(STRIP_ATTRIBUTES, json!(2))
            .answer(
                EXTRACT_RULES,
                json!([
                    [
                        { "kind": "style", "selector": ".a", "text": ".a { color: blue; }" },
                        { "kind": "style", "selector": ".unused", "text": ".unused { color: red; }" }
                    ],
                    [
                        { "kind": "group", "prelude": "@media (min-width: 1px)", "children": [
                            { "kind": "style", "selector": ".gone", "text": ".gone { margin: 0px; }" }
                        ]}
                    ],
                    null
                ]),
            )
            .answer(
                PROBE_SELECTORS,
                json!({ ".a": true, ".unused": false, ".gone": false }),
            )
            .answer(APPLY_SHEETS, json!(2))
            .document(document);

        let factory = ScriptedFactory::new([session.clone()]);
        let ctx = RunContext::new(Url::parse("https://example.com/").unwrap());
        let dir = tempfile::tempdir().unwrap();

        let localized = localize(&factory, &ctx, "<p>pruned</p>".to_string(), dir.path())
            .await
            .unwrap();

        assert_eq!(
            session.calls_to(APPLY_STYLE_SOURCES)[0][1],
            json!([
                ".x{background:url(https://example.com/x.png)}",
                ".a{background:url(https://cdn.test/bg.png)}"
            ])
        );
        assert_eq!(localized.inlined_stylesheets, 1);

        let set_calls = session.calls_to(SET_ATTRIBUTE);
        assert_eq!(
            set_calls[0],
            vec![
                json!("srcset"),
                json!([{ "index": 0, "value": "https://example.com/a.png 1x, https://example.com/b.png 2x" }])
            ]
        );
        assert_eq!(
            set_calls[1],
            vec![
                json!("style"),
                json!([{ "index": 0, "value": "background:url(https://example.com/x.png)" }])
            ]
        );

        assert_eq!(
            session.calls_to(STRIP_ATTRIBUTES)[0][0],
            json!([{ "tag": "div", "name": "data-x" }, { "tag": "p", "name": "placeholder" }])
        );
        assert_eq!(localized.stripped_attributes, 2);

        assert_eq!(
            session.calls_to(APPLY_SHEETS)[0][0],
            json!([
                { "index": 0, "text": ".a { color: blue; }" },
                { "index": 1, "text": null }
            ])
        );
        assert_eq!(localized.pruned_rules, 3);

        assert_eq!(
            localized.rewrites,
            vec![
                RewriteEntry {
                    url: "https://cdn.test/bg.png".to_string(),
                    file: "0.png".to_string()
                },
                RewriteEntry {
                    url: "https://cdn.test/pic?id=1&s=2".to_string(),
                    file: "1.jpg".to_string()
                },
            ]
        );
        assert_eq!(localized.skipped, vec!["https://cdn.test/blob".to_string()]);

        assert_eq!(std::fs::read(dir.path().join("0.png")).unwrap(), b"png");
        assert_eq!(std::fs::read(dir.path().join("1.jpg")).unwrap(), b"jpg");
        let written: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(written.len(), 2, "unreferenced resources must not be written");

        assert!(localized.html.contains("0.png"));
        assert!(localized.html.contains("1.jpg"));
        assert!(localized.html.contains("https://cdn.test/blob"));
        assert!(!localized.html.contains("gone"));
        assert!(session.was_closed());
    }
}
