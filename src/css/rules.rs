//! Static dead-rule elimination over a stylesheet's rule tree.
//!
//! A style rule survives when its selector matches at least one element of
//! the live document. This only holds while the document no longer changes:
//! a page that toggles classes from script after load can lose rules it
//! needs later.

use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectorError {
    #[error("selector '{0}' is not a valid document query")]
    AmbiguousSelector(String),
}

/// A node of a stylesheet's rule hierarchy, as extracted from the live CSSOM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StyleRuleNode {
    /// A rule carrying a selector.
    Style { selector: String, text: String },
    /// `@media`, `@supports`, `@layer`, `@container` blocks.
    Group {
        prelude: String,
        #[serde(default)]
        children: Vec<StyleRuleNode>,
    },
    /// `@import`; never evaluated.
    Import { text: String },
    /// Anything else (`@font-face`, `@keyframes`, ...) is kept verbatim.
    Other { text: String },
}

impl StyleRuleNode {
    /// Serialized CSS text of this rule and its surviving children.
    pub fn css_text(&self) -> String {
        match self {
            StyleRuleNode::Style { text, .. }
            | StyleRuleNode::Import { text }
            | StyleRuleNode::Other { text } => text.clone(),
            StyleRuleNode::Group { prelude, children } => {
                format!("{} {{{}}}", prelude.trim(), serialize_rules(children))
            }
        }
    }
}

/// Answers whether a selector matches anything in the current document.
pub trait SelectorProbe {
    fn exists(&self, selector: &str) -> Result<bool, SelectorError>;
}

/// Probe backed by results computed page-side. `None` marks a selector the
/// document rejected as a query; missing selectors are treated the same way.
#[derive(Debug, Clone, Default)]
pub struct MatchTable {
    matches: HashMap<String, Option<bool>>,
}

impl MatchTable {
    pub fn new(matches: HashMap<String, Option<bool>>) -> Self {
        Self { matches }
    }
}

impl SelectorProbe for MatchTable {
    fn exists(&self, selector: &str) -> Result<bool, SelectorError> {
        match self.matches.get(selector) {
            Some(Some(found)) => Ok(*found),
            _ => Err(SelectorError::AmbiguousSelector(selector.to_string())),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PruneStats {
    pub removed: usize,
    pub kept_ambiguous: Vec<String>,
}

static BARE_PSEUDO_ELEMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(^|[\s,>+~(])::?(?:before|after)\b").expect("valid bare pseudo regex")
});
static PSEUDO_ELEMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)::?(?:before|after)\b").expect("valid pseudo regex"));

/// Removes `::before`/`::after` (and `:before`/`:after`) so the selector can
/// be used as a document query. A bare pseudo-element becomes `*`.
pub fn strip_pseudo_elements(selector: &str) -> String {
    let bare = BARE_PSEUDO_ELEMENT.replace_all(selector, "${1}*");
    PSEUDO_ELEMENT.replace_all(&bare, "").trim().to_string()
}

/// Every probe-ready selector in the forest, for a single page-side lookup.
pub fn collect_selectors(rules: &[StyleRuleNode]) -> BTreeSet<String> {
    let mut selectors = BTreeSet::new();
    collect_into(rules, &mut selectors);
    selectors
}

fn collect_into(rules: &[StyleRuleNode], selectors: &mut BTreeSet<String>) {
    for rule in rules {
        match rule {
            StyleRuleNode::Style { selector, .. } => {
                selectors.insert(strip_pseudo_elements(selector));
            }
            StyleRuleNode::Group { children, .. } => collect_into(children, selectors),
            StyleRuleNode::Import { .. } | StyleRuleNode::Other { .. } => {}
        }
    }
}

/// Prunes a rule list in place, children before parents.
pub fn prune(rules: &mut Vec<StyleRuleNode>, probe: &impl SelectorProbe, stats: &mut PruneStats) {
    let mut doomed = Vec::new();

    for (idx, rule) in rules.iter_mut().enumerate() {
        let delete = match rule {
            StyleRuleNode::Style { selector, .. } => {
                match probe.exists(&strip_pseudo_elements(selector)) {
                    Ok(found) => !found,
                    Err(err) => {
                        log::warn!("Keeping rule: {}", err);
                        stats.kept_ambiguous.push(selector.clone());
                        false
                    }
                }
            }
            StyleRuleNode::Group { children, .. } => {
                prune(children, probe, stats);
                children.is_empty()
            }
            StyleRuleNode::Import { .. } => true,
            StyleRuleNode::Other { .. } => false,
        };
        if delete {
            doomed.push(idx);
        }
    }

    for idx in doomed.into_iter().rev() {
        rules.remove(idx);
        stats.removed += 1;
    }
}

/// Concatenates the serialized text of every rule.
pub fn serialize_rules(rules: &[StyleRuleNode]) -> String {
    rules.iter().map(StyleRuleNode::css_text).collect()
}
