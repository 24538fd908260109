use crate::ids::{Pid, Qid};
use serde::Serialize;
use serde_with::DeserializeFromStr;
use strum::{Display as StrumDisplay, EnumString};

pub const DEFAULT_SPARQL: &str = "SELECT ?x WHERE { ?x $property $root }";
pub const DEFAULT_WDQ: &str = "CLAIM[$property:$root]";

/// Query service used to find the items related to a root.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    DeserializeFromStr,
    EnumString,
    StrumDisplay,
)]
#[strum(ascii_case_insensitive, serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum QueryLanguage {
    #[default]
    Sparql,
    Wdq,
}

/// A query with `$root` and `$property` already substituted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Query {
    Sparql(String),
    Wdq(String),
}

impl Query {
    pub fn render(language: QueryLanguage, template: &str, property: &Pid, root: &Qid) -> Self {
        match language {
            QueryLanguage::Sparql => Self::Sparql(render_sparql(template, property, root)),
            QueryLanguage::Wdq => Self::Wdq(render_wdq(template, property, root)),
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Self::Sparql(q) | Self::Wdq(q) => q,
        }
    }
}

/// Prefixes every bare `P…` with `wdt:`, leaving already prefixed ones alone.
pub fn prefix_properties(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 8);
    let mut previous = None;
    for c in s.chars() {
        if c == 'P' && previous != Some(':') {
            out.push_str("wdt:");
        }
        out.push(c);
        previous = Some(c);
    }
    out
}

/// Substitutes the template. A template without a braced group is a bare
/// triple pattern and gets wrapped into `SELECT ?x WHERE { … }`, with `?x`
/// added as the subject when missing.
pub fn render_sparql(template: &str, property: &Pid, root: &Qid) -> String {
    let query = template
        .replace("$root", &format!("wd:{root}"))
        .replace("$property", &prefix_properties(property.as_str()));
    if query.contains('{') {
        return query;
    }
    let body = query.trim();
    let subject = if body.starts_with("?x") { "" } else { "?x " };
    format!("SELECT ?x WHERE {{ {subject}{body} }}")
}

/// The legacy syntax takes numbers only.
pub fn render_wdq(template: &str, property: &Pid, root: &Qid) -> String {
    template
        .replace("$root", root.number())
        .replace("$property", property.number())
}
