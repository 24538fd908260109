//! Browse Wikidata as a spiral menu: the configured root sits in the
//! center, the items pointing at it through a property sit around it, and
//! clicking one loads its own neighbours.

pub mod bridge;
pub mod config;
pub mod events;
pub mod explorer;
pub mod ids;
pub mod input;
pub mod query;
pub mod source;
pub mod sys;
pub mod wikidata;

#[cfg(feature = "gui")]
pub mod gui;
