//! Stylesheet handling: rule-tree pruning and `url(...)` rewriting.

mod rules;
mod urls;

pub use rules::{
    collect_selectors, prune, serialize_rules, strip_pseudo_elements, MatchTable, PruneStats,
    SelectorError, SelectorProbe, StyleRuleNode,
};
pub use urls::absolutize_css_urls;
