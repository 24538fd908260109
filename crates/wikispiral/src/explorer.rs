//! Grows a [`Menu`] out of Wikidata as the user clicks around.
//!
//! The explorer lives on the UI thread next to the menu. It never touches
//! the network itself: every fetch comes back to the host as
//! [`Effect::Fetch`], and the answer is fed in again through
//! [`Explorer::handle`]. Clicks reach it through the menu's event
//! listeners and are picked up by [`Explorer::drain`].

use crate::bridge::{indicator_text, item_from_entity, load_more_item, split_page};
use crate::config::Config;
use crate::events::{AppEvent, Origin, Request};
use crate::ids::Qid;
use crate::wikidata::Entity;
use spiral::{ItemId, Menu, MenuEvent, MenuItem, Signal};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

/// Pause between appending a page and paging onto it.
pub const LOAD_MORE_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Fetch(Request),
    /// Page forward once the delay has passed.
    NextAfter(Duration),
    Open(String),
}

struct Node {
    entity: Entity,
    /// Related ids not fetched yet, behind the "load more" button.
    unloaded: Vec<Qid>,
    /// Number of related ids, loaded or not.
    total: usize,
    explored: bool,
}

#[derive(Default)]
struct Staged {
    unloaded: Vec<Qid>,
    total: usize,
}

pub struct Explorer {
    config: Config,
    menu: Option<Menu>,
    nodes: HashMap<ItemId, Node>,
    /// "load more" buttons, by the item they page.
    buttons: HashMap<ItemId, ItemId>,
    staged: HashMap<Origin, Staged>,
    in_flight: HashMap<ItemId, Vec<Qid>>,
    signals: Rc<RefCell<Vec<Signal>>>,
    loading: bool,
    panel: Option<String>,
    error: Option<String>,
}

impl Explorer {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            menu: None,
            nodes: HashMap::new(),
            buttons: HashMap::new(),
            staged: HashMap::new(),
            in_flight: HashMap::new(),
            signals: Rc::default(),
            loading: false,
            panel: None,
            error: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// `None` until the root and its first page have arrived.
    pub fn menu(&self) -> Option<&Menu> {
        self.menu.as_ref()
    }

    pub fn menu_mut(&mut self) -> Option<&mut Menu> {
        self.menu.as_mut()
    }

    /// Input should be suspended while this is set.
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Wikipedia page of the last clicked item.
    pub fn panel_url(&self) -> Option<&str> {
        self.panel.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Position of the visible window among all related items of the
    /// current root, counting the ones not loaded yet.
    pub fn indicator(&self) -> Option<String> {
        let menu = self.menu.as_ref()?;
        let root = menu.current_root();
        if root.is_leaf() {
            return None;
        }
        let total = self
            .nodes
            .get(&root.id())
            .map(|n| n.total)
            .filter(|&n| n > 0)
            .unwrap_or(root.children().len());
        Some(indicator_text(menu.page_bounds(), total))
    }

    pub fn start(&mut self) -> Vec<Effect> {
        self.loading = true;
        self.error = None;
        let query = self.config.query(&self.config.root);
        vec![Effect::Fetch(Request::Related {
            origin: Origin::Root,
            query,
        })]
    }

    pub fn handle(&mut self, event: AppEvent) -> Vec<Effect> {
        match event {
            AppEvent::Related { origin, ids } => self.on_related(origin, ids),
            AppEvent::Entities { origin, entities } => self.on_entities(origin, entities),
            AppEvent::Thumbnail { item, url, .. } => {
                self.on_thumbnail(item, url);
                Vec::new()
            }
            AppEvent::Failed { origin, error } => {
                self.on_failure(origin, error);
                Vec::new()
            }
            AppEvent::ConfigReload => Vec::new(),
        }
    }

    /// Handles the clicks and link requests the menu reported since the
    /// last call.
    pub fn drain(&mut self) -> Vec<Effect> {
        let signals = std::mem::take(&mut *self.signals.borrow_mut());
        let mut effects = Vec::new();
        for signal in signals {
            match signal {
                Signal::Click { is_child, item } => effects.extend(self.on_click(is_child, item)),
                Signal::Open { href } => effects.push(Effect::Open(href)),
                Signal::Scroll(_) => {}
            }
        }
        effects
    }

    fn on_related(&mut self, origin: Origin, ids: Vec<Qid>) -> Vec<Effect> {
        if ids.is_empty() {
            log::info!("Nothing related for {origin:?}");
            self.loading = false;
            if let Origin::Children(item) = origin
                && let Some(node) = self.nodes.get_mut(&item)
            {
                node.explored = true;
            }
            if origin == Origin::Root {
                self.error = Some(format!("Nothing found for {}", self.config.root));
            }
            return Vec::new();
        }

        let total = ids.len();
        let (mut page, unloaded) = split_page(ids, self.config.page_size);
        self.staged.insert(origin.clone(), Staged { unloaded, total });
        if origin == Origin::Root {
            page.insert(0, self.config.root.clone());
        }
        vec![Effect::Fetch(Request::Entities { origin, ids: page })]
    }

    fn on_entities(&mut self, origin: Origin, entities: Vec<Entity>) -> Vec<Effect> {
        self.loading = false;
        match origin {
            Origin::Root => self.build_root(entities),
            Origin::Children(item) => self.attach_children(item, entities),
            Origin::More { parent, button } => self.append_page(parent, button, entities),
        }
    }

    /// Registers an entity and returns its item, queuing its thumbnail.
    fn adopt(&mut self, entity: Entity, effects: &mut Vec<Effect>) -> MenuItem {
        let item = item_from_entity(&entity, &self.config.langs, self.config.unicode_icons);
        if let Some(file) = entity.image_file() {
            effects.push(Effect::Fetch(Request::Thumbnail {
                item: item.id(),
                file: file.to_string(),
            }));
        }
        self.nodes.insert(
            item.id(),
            Node {
                entity,
                unloaded: Vec::new(),
                total: 0,
                explored: false,
            },
        );
        item
    }

    fn adopt_all(&mut self, entities: Vec<Entity>, effects: &mut Vec<Effect>) -> Vec<MenuItem> {
        entities
            .into_iter()
            .map(|entity| self.adopt(entity, effects))
            .collect()
    }

    /// Applies staged paging state to `item`; returns a fresh button when
    /// more ids are left.
    fn settle_node(&mut self, item: ItemId, staged: Staged) -> Option<MenuItem> {
        let node = self.nodes.get_mut(&item)?;
        node.total = staged.total;
        node.unloaded = staged.unloaded;
        node.explored = true;
        if node.unloaded.is_empty() {
            return None;
        }
        let button = load_more_item();
        self.buttons.insert(button.id(), item);
        Some(button)
    }

    fn build_root(&mut self, mut entities: Vec<Entity>) -> Vec<Effect> {
        let staged = self.staged.remove(&Origin::Root).unwrap_or_default();
        if self.menu.is_some() {
            log::debug!("Ignoring a second root load");
            return Vec::new();
        }
        let Some(position) = entities
            .iter()
            .position(|e| e.qid().as_ref() == Some(&self.config.root))
        else {
            log::error!("{} is not a known item", self.config.root);
            self.error = Some(format!("{} is not a known item", self.config.root));
            return Vec::new();
        };
        let root_entity = entities.remove(position);

        let mut effects = Vec::new();
        let root = self.adopt(root_entity, &mut effects);
        let root_id = root.id();
        let children = self.adopt_all(entities, &mut effects);
        let mut root = root.with_children(children);
        if let Some(button) = self.settle_node(root_id, staged) {
            root.add_child(button);
        }
        self.panel = self
            .nodes
            .get(&root_id)
            .map(|n| n.entity.wikipedia_url(&self.config.langs));

        let mut menu = match Menu::new(root, self.config.menu_options()) {
            Ok(menu) => menu,
            Err(e) => {
                log::error!("Cannot build the menu: {e}");
                self.error = Some(e.to_string());
                return Vec::new();
            }
        };
        for event in [MenuEvent::Click, MenuEvent::Open] {
            let sink = self.signals.clone();
            let listener = move |s: &Signal| sink.borrow_mut().push(s.clone());
            if let Err(e) = menu.on(&event.to_string(), listener) {
                log::error!("Failed to listen for {event}: {e}");
            }
        }
        menu.draw();
        self.menu = Some(menu);
        log::info!("Loaded {}", self.config.root);
        effects
    }

    fn attach_children(&mut self, item: ItemId, entities: Vec<Entity>) -> Vec<Effect> {
        let staged = self.staged.remove(&Origin::Children(item)).unwrap_or_default();
        let mut effects = Vec::new();
        let children = self.adopt_all(entities, &mut effects);
        if children.is_empty() {
            if let Some(node) = self.nodes.get_mut(&item) {
                node.explored = true;
            }
            return effects;
        }
        let button = self.settle_node(item, staged);

        let Some(menu) = self.menu.as_mut() else {
            return effects;
        };
        if let Err(e) = menu.add_children(item, children.into_iter().chain(button)) {
            log::warn!("Dropping children of {item}: {e}");
            return effects;
        }
        match menu.promote_child(item) {
            Ok(true) => {}
            Ok(false) => log::debug!("Promotion of {item} skipped, menu busy"),
            Err(e) => log::warn!("Cannot promote {item}: {e}"),
        }
        effects
    }

    fn append_page(
        &mut self,
        parent: ItemId,
        button: ItemId,
        entities: Vec<Entity>,
    ) -> Vec<Effect> {
        self.in_flight.remove(&parent);
        let mut effects = Vec::new();
        let children = self.adopt_all(entities, &mut effects);
        let remaining = self
            .nodes
            .get(&parent)
            .is_some_and(|n| !n.unloaded.is_empty());

        let Some(menu) = self.menu.as_mut() else {
            return effects;
        };
        let detached = match menu.remove_child(parent, button) {
            Ok(item) => Some(item),
            Err(e) => {
                log::warn!("Load more button of {parent} is gone: {e}");
                None
            }
        };
        if let Err(e) = menu.add_children(parent, children) {
            log::warn!("Dropping page of {parent}: {e}");
        }
        match detached {
            Some(item) if remaining => {
                if let Err(e) = menu.add_child(parent, item) {
                    log::warn!("Cannot restore load more button: {e}");
                }
            }
            _ => {
                self.buttons.remove(&button);
            }
        }
        effects.push(Effect::NextAfter(LOAD_MORE_DELAY));
        effects
    }

    fn on_thumbnail(&mut self, item: ItemId, url: String) {
        let Some(menu) = self.menu.as_mut() else {
            return;
        };
        if let Err(e) = menu.set_background_image(item, url) {
            log::debug!("Dropping image: {e}");
        }
    }

    fn on_failure(&mut self, origin: Option<Origin>, error: String) {
        let Some(origin) = origin else {
            log::warn!("{error}");
            return;
        };
        log::error!("Loading {origin:?} failed: {error}");
        self.loading = false;
        self.staged.remove(&origin);
        match origin {
            Origin::Root => self.error = Some(error),
            Origin::More { parent, .. } => {
                if let Some(ids) = self.in_flight.remove(&parent)
                    && let Some(node) = self.nodes.get_mut(&parent)
                {
                    node.unloaded.splice(0..0, ids);
                }
            }
            Origin::Children(_) => {}
        }
    }

    fn on_click(&mut self, is_child: bool, item: ItemId) -> Vec<Effect> {
        if self.loading {
            log::debug!("Click on {item} ignored while loading");
            return Vec::new();
        }
        if let Some(&parent) = self.buttons.get(&item) {
            return self.load_more(parent, item);
        }
        let Some(node) = self.nodes.get(&item) else {
            return Vec::new();
        };
        self.panel = Some(node.entity.wikipedia_url(&self.config.langs));
        if !is_child || node.explored {
            return Vec::new();
        }
        let is_leaf = self
            .menu
            .as_ref()
            .and_then(|m| m.item(item))
            .is_some_and(MenuItem::is_leaf);
        let Some(qid) = node.entity.qid().filter(|_| is_leaf) else {
            return Vec::new();
        };

        self.loading = true;
        vec![Effect::Fetch(Request::Related {
            origin: Origin::Children(item),
            query: self.config.query(&qid),
        })]
    }

    fn load_more(&mut self, parent: ItemId, button: ItemId) -> Vec<Effect> {
        let Some(node) = self.nodes.get_mut(&parent) else {
            return Vec::new();
        };
        let take = self.config.page_size.min(node.unloaded.len());
        if take == 0 {
            return Vec::new();
        }
        let page: Vec<Qid> = node.unloaded.drain(..take).collect();
        self.in_flight.insert(parent, page.clone());
        self.loading = true;
        if let Some(menu) = self.menu.as_mut() {
            menu.previous();
        }
        vec![Effect::Fetch(Request::Entities {
            origin: Origin::More { parent, button },
            ids: page,
        })]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::fake::FakeSource;
    use crate::sys::runtime::answer;
    use std::collections::VecDeque;

    fn config(page_size: usize) -> Config {
        Config {
            root: "Q1".parse().unwrap(),
            langs: vec!["en".into()],
            page_size,
            ..Default::default()
        }
    }

    fn ids(range: std::ops::RangeInclusive<u32>) -> Vec<String> {
        range.map(|i| format!("Q{i}")).collect()
    }

    fn relate(source: &mut FakeSource, root: &str, children: &[String]) {
        let children: Vec<&str> = children.iter().map(String::as_str).collect();
        source.relate(root, &children);
    }

    /// Answers every fetch until none are left; returns the other effects.
    async fn pump(
        explorer: &mut Explorer,
        source: &FakeSource,
        effects: Vec<Effect>,
    ) -> Vec<Effect> {
        let mut queue: VecDeque<Effect> = effects.into();
        let mut rest = Vec::new();
        while let Some(effect) = queue.pop_front() {
            match effect {
                Effect::Fetch(request) => {
                    let event = answer(source, request).await;
                    queue.extend(explorer.handle(event));
                }
                other => rest.push(other),
            }
        }
        rest
    }

    fn child_titled(explorer: &Explorer, title: &str) -> ItemId {
        explorer
            .menu()
            .unwrap()
            .current_root()
            .children()
            .iter()
            .find(|c| c.title == title)
            .map(MenuItem::id)
            .unwrap()
    }

    fn titles(explorer: &Explorer) -> Vec<String> {
        explorer
            .menu()
            .unwrap()
            .current_root()
            .children()
            .iter()
            .map(|c| c.title.clone())
            .collect()
    }

    #[tokio::test]
    async fn test_initial_load_shows_first_page() {
        let mut source = FakeSource::default();
        relate(&mut source, "Q1", &ids(2..=6));
        let mut explorer = Explorer::new(config(3));

        let effects = explorer.start();
        assert!(explorer.is_loading());
        pump(&mut explorer, &source, effects).await;

        assert!(!explorer.is_loading());
        let menu = explorer.menu().unwrap();
        assert_eq!(menu.current_root().title, "Item Q1");
        assert_eq!(titles(&explorer), vec!["Item Q2", "Item Q3", "Item Q4", "load more"]);
        assert_eq!(explorer.indicator().as_deref(), Some("1-4 / 5"));
        assert_eq!(
            explorer.panel_url(),
            Some("https://en.m.wikipedia.org/wiki/Item_Q1")
        );
        assert_eq!(
            source.queries.lock().as_slice(),
            ["SELECT ?x WHERE { ?x wdt:P170 wd:Q1 }"]
        );
    }

    #[tokio::test]
    async fn test_leaf_click_loads_and_promotes() {
        let mut source = FakeSource::default();
        relate(&mut source, "Q1", &ids(2..=3));
        relate(&mut source, "Q2", &ids(7..=8));
        let mut explorer = Explorer::new(config(49));
        let effects = explorer.start();
        pump(&mut explorer, &source, effects).await;

        let leaf = child_titled(&explorer, "Item Q2");
        explorer.menu_mut().unwrap().click_item(leaf).unwrap();
        let effects = explorer.drain();
        assert!(matches!(
            effects.as_slice(),
            [Effect::Fetch(Request::Related { origin: Origin::Children(id), .. })] if *id == leaf
        ));
        assert!(explorer.is_loading());

        pump(&mut explorer, &source, effects).await;
        let menu = explorer.menu_mut().unwrap();
        menu.settle();
        assert_eq!(menu.current_root().id(), leaf);
        assert_eq!(titles(&explorer), vec!["Item Q7", "Item Q8"]);
        assert_eq!(explorer.indicator().as_deref(), Some("1-2 / 2"));
        assert!(!explorer.is_loading());
    }

    #[tokio::test]
    async fn test_leaf_without_relations_stays_put() {
        let mut source = FakeSource::default();
        relate(&mut source, "Q1", &ids(2..=3));
        let mut explorer = Explorer::new(config(49));
        let effects = explorer.start();
        pump(&mut explorer, &source, effects).await;

        let leaf = child_titled(&explorer, "Item Q3");
        explorer.menu_mut().unwrap().click_item(leaf).unwrap();
        let effects = explorer.drain();
        pump(&mut explorer, &source, effects).await;

        let menu = explorer.menu_mut().unwrap();
        menu.settle();
        assert_eq!(menu.current_root().title, "Item Q1");
        assert!(menu.item(leaf).unwrap().is_leaf());
        assert!(!explorer.is_loading());

        explorer.menu_mut().unwrap().click_item(leaf).unwrap();
        assert!(explorer.drain().is_empty());
        assert_eq!(source.queries.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_load_more_appends_pages() {
        let mut source = FakeSource::default();
        relate(&mut source, "Q1", &ids(2..=9));
        let mut explorer = Explorer::new(config(3));
        let effects = explorer.start();
        pump(&mut explorer, &source, effects).await;

        let button = child_titled(&explorer, "load more");
        explorer.menu_mut().unwrap().click_item(button).unwrap();
        let effects = explorer.drain();
        assert_eq!(effects.len(), 1);
        let rest = pump(&mut explorer, &source, effects).await;
        assert_eq!(rest, vec![Effect::NextAfter(LOAD_MORE_DELAY)]);
        assert_eq!(
            titles(&explorer),
            vec!["Item Q2", "Item Q3", "Item Q4", "Item Q5", "Item Q6", "Item Q7", "load more"]
        );
        assert_eq!(child_titled(&explorer, "load more"), button);

        explorer.menu_mut().unwrap().click_item(button).unwrap();
        let effects = explorer.drain();
        pump(&mut explorer, &source, effects).await;
        let expected: Vec<String> = (2..=9).map(|i| format!("Item Q{i}")).collect();
        assert_eq!(titles(&explorer), expected);
        assert!(explorer.buttons.is_empty());
        assert_eq!(explorer.indicator().as_deref(), Some("1-8 / 8"));
    }

    #[tokio::test]
    async fn test_failed_page_keeps_ids() {
        let mut source = FakeSource::default();
        relate(&mut source, "Q1", &ids(2..=6));
        let mut explorer = Explorer::new(config(3));
        let effects = explorer.start();
        pump(&mut explorer, &source, effects).await;

        let button = child_titled(&explorer, "load more");
        explorer.menu_mut().unwrap().click_item(button).unwrap();
        let effects = explorer.drain();
        let Some(Effect::Fetch(Request::Entities { origin, .. })) = effects.first().cloned() else {
            panic!("expected an entity fetch, got {effects:?}");
        };
        explorer.handle(AppEvent::Failed {
            origin: Some(origin),
            error: "timed out".into(),
        });
        assert!(!explorer.is_loading());

        explorer.menu_mut().unwrap().click_item(button).unwrap();
        let effects = explorer.drain();
        pump(&mut explorer, &source, effects).await;
        assert_eq!(titles(&explorer).len(), 5);
    }

    #[tokio::test]
    async fn test_thumbnails_become_backgrounds() {
        let mut source = FakeSource::default();
        relate(&mut source, "Q1", &ids(2..=3));
        source.entity("Q2", "Two", Some("Two.jpg"));
        let mut explorer = Explorer::new(config(49));
        let effects = explorer.start();
        pump(&mut explorer, &source, effects).await;

        let two = child_titled(&explorer, "Two");
        let three = child_titled(&explorer, "Item Q3");
        let menu = explorer.menu().unwrap();
        assert_eq!(
            menu.item(two).unwrap().background_image.as_deref(),
            Some("https://thumbs.test/Two.jpg")
        );
        assert_eq!(menu.item(three).unwrap().background_image, None);
    }

    #[tokio::test]
    async fn test_double_click_opens_link() {
        let mut source = FakeSource::default();
        relate(&mut source, "Q1", &ids(2..=2));
        let mut explorer = Explorer::new(config(49));
        let effects = explorer.start();
        pump(&mut explorer, &source, effects).await;

        let child = child_titled(&explorer, "Item Q2");
        explorer.menu_mut().unwrap().double_click_item(child).unwrap();
        assert_eq!(
            explorer.drain(),
            vec![Effect::Open("https://www.wikidata.org/wiki/Q2".into())]
        );
    }

    #[tokio::test]
    async fn test_clicks_ignored_while_loading() {
        let mut source = FakeSource::default();
        relate(&mut source, "Q1", &ids(2..=3));
        let mut explorer = Explorer::new(config(49));
        let effects = explorer.start();
        pump(&mut explorer, &source, effects).await;

        let a = child_titled(&explorer, "Item Q2");
        let b = child_titled(&explorer, "Item Q3");
        explorer.menu_mut().unwrap().click_item(a).unwrap();
        explorer.menu_mut().unwrap().click_item(b).unwrap();
        assert_eq!(explorer.drain().len(), 1);
    }

    #[test]
    fn test_failed_root_load() {
        let mut explorer = Explorer::new(config(49));
        explorer.start();
        explorer.handle(AppEvent::Failed {
            origin: Some(Origin::Root),
            error: "offline".into(),
        });
        assert!(!explorer.is_loading());
        assert!(explorer.menu().is_none());
        assert_eq!(explorer.error(), Some("offline"));
        assert_eq!(explorer.indicator(), None);
    }

    #[test]
    fn test_empty_root() {
        let mut explorer = Explorer::new(config(49));
        explorer.start();
        assert!(explorer
            .handle(AppEvent::Related {
                origin: Origin::Root,
                ids: Vec::new()
            })
            .is_empty());
        assert_eq!(explorer.error(), Some("Nothing found for Q1"));
    }
}
