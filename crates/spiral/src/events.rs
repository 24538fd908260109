use crate::error::MenuError;
use crate::item::ItemId;
use derive_more::{Display, From, Into};
use std::collections::HashMap;
use std::str::FromStr;
use strum::{Display as StrumDisplay, EnumIter, EnumString, IntoEnumIterator};

/// Names a menu can be listened on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, EnumIter, StrumDisplay)]
#[strum(serialize_all = "lowercase")]
pub enum MenuEvent {
    /// The page window or the current root changed.
    Scroll,
    /// A slice or the root was clicked; fired after the menu handled it.
    Click,
    /// A slice or the root was double clicked and has a link.
    Open,
}

/// Visible window of the current root's children, for "3-14 / 120" style
/// indicators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageBounds {
    pub first: usize,
    /// `first + count - 1`; `-1` when the root has no children.
    pub last: isize,
    pub count: usize,
}

impl PageBounds {
    pub fn new(first: usize, count: usize) -> Self {
        Self {
            first,
            last: first as isize + count as isize - 1,
            count,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    Scroll(PageBounds),
    Click { is_child: bool, item: ItemId },
    Open { href: String },
}

impl Signal {
    pub fn event(&self) -> MenuEvent {
        match self {
            Self::Scroll(_) => MenuEvent::Scroll,
            Self::Click { .. } => MenuEvent::Click,
            Self::Open { .. } => MenuEvent::Open,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, From, Into)]
pub struct ListenerId(u64);

crate::impl_id_newtype!(ListenerId);

pub type Callback = Box<dyn FnMut(&Signal)>;

pub(crate) struct Listeners {
    next_id: u64,
    by_event: HashMap<MenuEvent, Vec<(ListenerId, Callback)>>,
}

impl Default for Listeners {
    fn default() -> Self {
        Self {
            next_id: 0,
            by_event: MenuEvent::iter().map(|e| (e, Vec::new())).collect(),
        }
    }
}

impl Listeners {
    fn parse(name: &str) -> Result<MenuEvent, MenuError> {
        MenuEvent::from_str(name).map_err(|_| MenuError::UnknownEvent(name.to_string()))
    }

    pub fn on(&mut self, name: &str, callback: Callback) -> Result<ListenerId, MenuError> {
        let event = Self::parse(name)?;
        let id = ListenerId::new(self.next_id);
        self.next_id += 1;
        self.by_event.entry(event).or_default().push((id, callback));
        Ok(id)
    }

    pub fn off(&mut self, name: &str, id: ListenerId) -> Result<(), MenuError> {
        let event = Self::parse(name)?;
        let listeners = self.by_event.entry(event).or_default();
        let index = listeners
            .iter()
            .position(|(l, _)| *l == id)
            .ok_or(MenuError::UnknownListener { event, id })?;
        drop(listeners.remove(index));
        Ok(())
    }

    pub fn trigger(&mut self, signal: &Signal) {
        if let Some(listeners) = self.by_event.get_mut(&signal.event()) {
            for (_, callback) in listeners.iter_mut() {
                callback(signal);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_event_names() {
        assert_eq!(MenuEvent::from_str("scroll"), Ok(MenuEvent::Scroll));
        assert_eq!(MenuEvent::Open.to_string(), "open");
        assert!(MenuEvent::from_str("zoom").is_err());
    }

    #[test]
    fn test_unknown_event_is_rejected() {
        let mut listeners = Listeners::default();
        let err = listeners.on("zoom", Box::new(|_| {})).unwrap_err();
        assert_eq!(err, MenuError::UnknownEvent("zoom".into()));
        assert!(listeners.off("zoom", ListenerId::new(0)).is_err());
    }

    #[test]
    fn test_off_requires_registered_listener() {
        let mut listeners = Listeners::default();
        let id = listeners.on("scroll", Box::new(|_| {})).unwrap();
        assert!(listeners.off("click", id).is_err());
        listeners.off("scroll", id).unwrap();
        assert_eq!(
            listeners.off("scroll", id),
            Err(MenuError::UnknownListener {
                event: MenuEvent::Scroll,
                id
            })
        );
    }

    #[test]
    fn test_trigger_only_reaches_matching_event() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut listeners = Listeners::default();
        let sink = seen.clone();
        listeners
            .on("scroll", Box::new(move |s| sink.borrow_mut().push(s.clone())))
            .unwrap();

        listeners.trigger(&Signal::Open { href: "x".into() });
        listeners.trigger(&Signal::Scroll(PageBounds::new(2, 3)));

        assert_eq!(*seen.borrow(), vec![Signal::Scroll(PageBounds::new(2, 3))]);
    }

    #[test]
    fn test_page_bounds_arithmetic() {
        let b = PageBounds::new(3, 5);
        assert_eq!(b.last, 7);
        assert_eq!(PageBounds::new(0, 0).last, -1);
    }
}
