use derive_more::{AsRef, Deref, Display};
use serde::Serialize;
use serde_with::DeserializeFromStr;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("'{value}' is not a valid {kind} id")]
pub struct IdError {
    pub value: String,
    pub kind: &'static str,
}

fn parse_prefixed(s: &str, prefix: char, kind: &'static str) -> Result<String, IdError> {
    let s = s.trim();
    let mut chars = s.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.eq_ignore_ascii_case(&prefix))
        && !s[1..].is_empty()
        && s[1..].chars().all(|c| c.is_ascii_digit());
    if !valid {
        return Err(IdError {
            value: s.to_string(),
            kind,
        });
    }
    Ok(format!("{prefix}{}", &s[1..]))
}

/// Wikidata item id, e.g. `Q42`.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    Deref,
    AsRef,
    Serialize,
    DeserializeFromStr,
)]
#[serde(transparent)]
pub struct Qid(String);

impl Qid {
    /// Digits without the `Q`, as the legacy query service wants them.
    pub fn number(&self) -> &str {
        &self.0[1..]
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub(crate) fn known(id: &'static str) -> Self {
        Self(id.to_string())
    }
}

impl FromStr for Qid {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_prefixed(s, 'Q', "item").map(Self)
    }
}

/// Wikidata property id, e.g. `P170`.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    Deref,
    AsRef,
    Serialize,
    DeserializeFromStr,
)]
#[serde(transparent)]
pub struct Pid(String);

impl Pid {
    pub fn number(&self) -> &str {
        &self.0[1..]
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub(crate) fn known(id: &'static str) -> Self {
        Self(id.to_string())
    }
}

impl FromStr for Pid {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_prefixed(s, 'P', "property").map(Self)
    }
}
