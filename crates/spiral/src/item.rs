use crate::error::MenuError;
use derive_more::{Display, From, Into};
use palette::Srgba;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ITEM_ID: AtomicU64 = AtomicU64::new(0);

/// Process-wide identity of a [`MenuItem`]. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, From, Into)]
pub struct ItemId(u64);

crate::impl_id_newtype!(ItemId);

impl ItemId {
    fn next() -> Self {
        Self(NEXT_ITEM_ID.fetch_add(1, Ordering::Relaxed))
    }
}

pub type ItemHook = Rc<dyn Fn(&MenuItem)>;

/// A node of the menu tree. Children are owned and kept in insertion order,
/// which is also their order around the ring.
pub struct MenuItem {
    id: ItemId,
    pub title: String,
    pub description: String,
    pub href: Option<String>,
    pub background_image: Option<String>,
    /// Icon name, for hosts that can show one.
    pub icon: Option<String>,
    /// Overrides the first letter of the title as the slice's text icon.
    pub text_icon: Option<String>,
    /// `None` until the menu paints it with a generated color.
    pub fill: Option<Srgba<f64>>,
    children: Vec<MenuItem>,
    on_click: Option<ItemHook>,
    on_becoming_root: Option<ItemHook>,
}

impl MenuItem {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: ItemId::next(),
            title: title.into(),
            description: String::new(),
            href: None,
            background_image: None,
            icon: None,
            text_icon: None,
            fill: None,
            children: Vec::new(),
            on_click: None,
            on_becoming_root: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_href(mut self, href: impl Into<String>) -> Self {
        self.href = Some(href.into());
        self
    }

    pub fn with_background_image(mut self, url: impl Into<String>) -> Self {
        self.background_image = Some(url.into());
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn with_text_icon(mut self, text_icon: impl Into<String>) -> Self {
        self.text_icon = Some(text_icon.into());
        self
    }

    pub fn with_fill(mut self, fill: Srgba<f64>) -> Self {
        self.fill = Some(fill);
        self
    }

    pub fn with_child(mut self, child: MenuItem) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = MenuItem>) -> Self {
        self.children.extend(children);
        self
    }

    /// Called with the item when it is clicked, before any navigation.
    pub fn on_click(mut self, hook: impl Fn(&MenuItem) + 'static) -> Self {
        self.on_click = Some(Rc::new(hook));
        self
    }

    /// Called once the item has been promoted to the center.
    pub fn on_becoming_root(mut self, hook: impl Fn(&MenuItem) + 'static) -> Self {
        self.on_becoming_root = Some(Rc::new(hook));
        self
    }

    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn children(&self) -> &[MenuItem] {
        &self.children
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub(crate) fn click_hook(&self) -> Option<ItemHook> {
        self.on_click.clone()
    }

    pub(crate) fn becoming_root_hook(&self) -> Option<ItemHook> {
        self.on_becoming_root.clone()
    }

    /// Letter shown on a slice without an image.
    pub fn text_icon_text(&self) -> String {
        self.text_icon
            .clone()
            .unwrap_or_else(|| self.title.chars().take(1).collect())
    }

    /// Appends a child.
    pub fn add_child(&mut self, child: MenuItem) -> &mut Self {
        self.children.push(child);
        self
    }

    /// Position of a direct child, matched by identity.
    pub fn index_of(&self, child: ItemId) -> Option<usize> {
        self.children.iter().position(|c| c.id == child)
    }

    /// Detaches a direct child and hands it back.
    pub fn remove_child(&mut self, child: ItemId) -> Result<MenuItem, MenuError> {
        let index = self.index_of(child).ok_or(MenuError::NotAChild {
            parent: self.id,
            child,
        })?;
        Ok(self.children.remove(index))
    }

    /// Sets the image without redrawing anything; once the item is shown use
    /// [`crate::Menu::set_background_image`].
    pub fn set_background_image(&mut self, url: impl Into<String>) {
        self.background_image = Some(url.into());
    }

    pub fn find(&self, id: ItemId) -> Option<&MenuItem> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(id))
    }

    pub fn find_mut(&mut self, id: ItemId) -> Option<&mut MenuItem> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter_mut().find_map(|c| c.find_mut(id))
    }

    pub(crate) fn child(&self, id: ItemId) -> Option<&MenuItem> {
        self.children.iter().find(|c| c.id == id)
    }

    /// Depth-first walk over this item and all descendants.
    pub(crate) fn for_each_mut(&mut self, f: &mut impl FnMut(&mut MenuItem)) {
        f(self);
        for child in &mut self.children {
            child.for_each_mut(f);
        }
    }
}

impl fmt::Debug for MenuItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MenuItem")
            .field("id", &self.id)
            .field("title", &self.title)
            .field("href", &self.href)
            .field("background_image", &self.background_image)
            .field("text_icon", &self.text_icon)
            .field("children", &self.children)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_ids_are_unique() {
        let a = MenuItem::new("a");
        let b = MenuItem::new("b");
        assert_ne!(a.id(), b.id());
        assert!(b.id() > a.id());
    }

    #[test]
    fn test_children_keep_insertion_order() {
        let mut root = MenuItem::new("root");
        let ids: Vec<ItemId> = (0..4)
            .map(|i| {
                let child = MenuItem::new(format!("c{i}"));
                let id = child.id();
                root.add_child(child);
                id
            })
            .collect();
        for (i, id) in ids.iter().enumerate() {
            assert_eq!(root.index_of(*id), Some(i));
        }
        assert!(!root.is_leaf());
    }

    #[test]
    fn test_remove_child_by_identity() {
        let child = MenuItem::new("child");
        let id = child.id();
        let mut root = MenuItem::new("root").with_child(child);

        let removed = root.remove_child(id).unwrap();
        assert_eq!(removed.id(), id);
        assert!(root.is_leaf());
        assert_eq!(
            root.remove_child(id).unwrap_err(),
            MenuError::NotAChild {
                parent: root.id(),
                child: id
            }
        );
    }

    #[test]
    fn test_remove_grandchild_fails() {
        let grandchild = MenuItem::new("gc");
        let gc_id = grandchild.id();
        let mut root = MenuItem::new("root").with_child(MenuItem::new("c").with_child(grandchild));
        assert!(root.remove_child(gc_id).is_err());
        assert!(root.find(gc_id).is_some());
    }

    #[test]
    fn test_text_icon_text() {
        assert_eq!(MenuItem::new("Mozart").text_icon_text(), "M");
        assert_eq!(MenuItem::new("Éclair").text_icon_text(), "É");
        assert_eq!(MenuItem::new("x").with_text_icon("+").text_icon_text(), "+");
        assert_eq!(MenuItem::new("").text_icon_text(), "");
    }

    #[test]
    fn test_click_hook_receives_item() {
        let seen = Rc::new(Cell::new(None));
        let sink = seen.clone();
        let item = MenuItem::new("a").on_click(move |i| sink.set(Some(i.id())));
        if let Some(hook) = item.click_hook() {
            hook(&item);
        }
        assert_eq!(seen.get(), Some(item.id()));
    }
}
