use crate::events::{ListenerId, MenuEvent};
use crate::item::ItemId;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MenuError {
    #[error("'{0}' is not a recognized event")]
    UnknownEvent(String),
    #[error("listener {id} is not registered for '{event}'")]
    UnknownListener { event: MenuEvent, id: ListenerId },
    #[error("item {0} is not part of the menu")]
    UnknownItem(ItemId),
    #[error("item {child} is not a direct child of item {parent}")]
    NotAChild { parent: ItemId, child: ItemId },
    #[error("item {0} is not shown as a slice")]
    NotVisible(ItemId),
    #[error("the menu is already at its top level")]
    AtTopLevel,
    #[error("invalid option `{name}`: {reason}")]
    InvalidOption { name: &'static str, reason: String },
}
