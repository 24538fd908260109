use crate::ids::Qid;
use crate::query::Query;
use crate::wikidata::Entity;
use spiral::ItemId;

/// What a fetch was started for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Origin {
    /// The first load of the configured root.
    Root,
    /// Children of a clicked leaf.
    Children(ItemId),
    /// The next page behind a "load more" button.
    More { parent: ItemId, button: ItemId },
}

/// Work for the background runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Related { origin: Origin, query: Query },
    Entities { origin: Origin, ids: Vec<Qid> },
    Thumbnail { item: ItemId, file: String },
}

/// Messages from the background runtime to the UI thread.
#[derive(Debug, Clone)]
pub enum AppEvent {
    Related { origin: Origin, ids: Vec<Qid> },
    Entities { origin: Origin, entities: Vec<Entity> },
    Thumbnail { item: ItemId, url: String, bytes: Vec<u8> },
    Failed { origin: Option<Origin>, error: String },
    ConfigReload,
}
