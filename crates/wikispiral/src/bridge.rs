//! Turns Wikidata entities into menu items.

use crate::ids::Qid;
use crate::wikidata::{Entity, UNICODE_CHARACTER};
use spiral::{MenuItem, PageBounds};

pub const LOAD_MORE_TITLE: &str = "load more";
pub const LOAD_MORE_ICON: &str = "+";

pub fn item_from_entity(entity: &Entity, langs: &[String], unicode_icons: bool) -> MenuItem {
    let mut item = MenuItem::new(entity.label(langs)).with_href(entity.url());
    if unicode_icons && let Some(symbol) = entity.claim_str(UNICODE_CHARACTER) {
        item = item.with_text_icon(symbol);
    }
    item
}

pub fn load_more_item() -> MenuItem {
    MenuItem::new(LOAD_MORE_TITLE).with_text_icon(LOAD_MORE_ICON)
}

/// Splits related ids into the page loaded now and the rest.
pub fn split_page(mut ids: Vec<Qid>, page_size: usize) -> (Vec<Qid>, Vec<Qid>) {
    let rest = ids.split_off(page_size.min(ids.len()));
    (ids, rest)
}

/// "first-last / total", one-based.
pub fn indicator_text(bounds: PageBounds, total: usize) -> String {
    format!("{}-{} / {}", bounds.first + 1, bounds.last + 1, total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn qids(n: usize) -> Vec<Qid> {
        (1..=n).map(|i| format!("Q{i}").parse().unwrap()).collect()
    }

    #[test]
    fn test_item_from_entity() {
        let entity: Entity = serde_json::from_value(json!({
            "id": "Q9659",
            "title": "Q9659",
            "labels": { "en": { "language": "en", "value": "A" } },
            "claims": { "P487": [{ "mainsnak": { "property": "P487", "datavalue": { "value": "🅰" } } }] }
        }))
        .unwrap();
        let langs = vec!["en".to_string()];

        let plain = item_from_entity(&entity, &langs, false);
        assert_eq!(plain.title, "A");
        assert_eq!(plain.href.as_deref(), Some("https://www.wikidata.org/wiki/Q9659"));
        assert_eq!(plain.text_icon, None);

        let symbol = item_from_entity(&entity, &langs, true);
        assert_eq!(symbol.text_icon_text(), "🅰");
    }

    #[test]
    fn test_load_more_item() {
        let item = load_more_item();
        assert_eq!(item.title, "load more");
        assert_eq!(item.text_icon_text(), "+");
        assert!(item.href.is_none());
    }

    #[test]
    fn test_split_page() {
        let (page, rest) = split_page(qids(5), 3);
        assert_eq!(page.len(), 3);
        assert_eq!(rest.iter().map(Qid::as_str).collect::<Vec<_>>(), vec!["Q4", "Q5"]);

        let (page, rest) = split_page(qids(2), 49);
        assert_eq!(page.len(), 2);
        assert!(rest.is_empty());
    }

    #[test]
    fn test_indicator_text() {
        assert_eq!(indicator_text(PageBounds::new(0, 12), 120), "1-12 / 120");
        assert_eq!(indicator_text(PageBounds::new(3, 4), 7), "4-7 / 7");
    }
}
