//! Response shapes of the Wikidata and Commons web APIs, reduced to the
//! fields the explorer reads.

use crate::ids::Qid;
use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// Properties that may hold a representative image, in order of preference.
pub const IMAGE_PROPERTIES: [&str; 22] = [
    "P18", "P154", "P41", "P948", "P692", "P1766", "P94", "P242", "P15", "P1621", "P1846",
    "P14", "P1801", "P1543", "P158", "P1442", "P109", "P367", "P491", "P117", "P207", "P181",
];

/// Holds the Unicode character of a letter, symbol or emoji.
pub const UNICODE_CHARACTER: &str = "P487";

pub const ENTITY_PREFIX: &str = "http://www.wikidata.org/entity/";

#[derive(Debug, Clone, Deserialize)]
pub struct EntitiesResponse {
    #[serde(default)]
    pub entities: HashMap<String, Entity>,
    #[serde(default)]
    pub error: Option<ApiError>,
}

/// Error object the MediaWiki API sends instead of a result.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ApiError {
    pub code: String,
    #[serde(default)]
    pub info: String,
}

impl EntitiesResponse {
    /// Entities in the order they were asked for. Ids the service does not
    /// know are dropped.
    pub fn into_ordered(mut self, ids: &[Qid]) -> Vec<Entity> {
        ids.iter()
            .filter_map(|id| self.entities.remove(id.as_str()))
            .filter(|e| e.missing.is_none())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Entity {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub labels: BTreeMap<String, LangValue>,
    #[serde(default)]
    pub claims: HashMap<String, Vec<Statement>>,
    #[serde(default)]
    pub sitelinks: BTreeMap<String, Sitelink>,
    #[serde(default)]
    pub missing: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LangValue {
    pub language: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Statement {
    pub mainsnak: Snak,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Snak {
    pub property: String,
    #[serde(default)]
    pub datavalue: Option<DataValue>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DataValue {
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Sitelink {
    pub site: String,
    pub title: String,
}

impl Entity {
    pub fn qid(&self) -> Option<Qid> {
        self.id.parse().ok()
    }

    /// Label in the first language that has one, otherwise any label.
    pub fn label(&self, langs: &[String]) -> &str {
        langs
            .iter()
            .find_map(|lang| self.labels.get(lang))
            .or_else(|| self.labels.values().next())
            .map(|l| l.value.as_str())
            .unwrap_or_default()
    }

    /// Value of the first statement for `property`.
    pub fn claim(&self, property: &str) -> Option<&Value> {
        self.claims
            .get(property)?
            .first()?
            .mainsnak
            .datavalue
            .as_ref()
            .map(|d| &d.value)
    }

    pub fn claim_str(&self, property: &str) -> Option<&str> {
        self.claim(property).and_then(Value::as_str)
    }

    /// Commons file name of the most preferred image statement.
    pub fn image_file(&self) -> Option<&str> {
        IMAGE_PROPERTIES.iter().find_map(|p| self.claim_str(p))
    }

    pub fn url(&self) -> String {
        let title = if self.title.is_empty() {
            &self.id
        } else {
            &self.title
        };
        format!("https://www.wikidata.org/wiki/{title}")
    }

    /// Mobile Wikipedia article in the first preferred language that has
    /// one, then in any language, then the mobile Wikidata page.
    pub fn wikipedia_url(&self, langs: &[String]) -> String {
        let article = langs
            .iter()
            .find_map(|lang| {
                self.sitelinks
                    .get(&format!("{lang}wiki"))
                    .map(|s| (lang.as_str(), s))
            })
            .or_else(|| {
                self.sitelinks.iter().find_map(|(site, link)| {
                    let lang = site.strip_suffix("wiki")?;
                    (!lang.is_empty() && !lang.contains("commons") && !lang.contains("species"))
                        .then_some((lang, link))
                })
            });

        match article {
            Some((lang, link)) => {
                article_url(&format!("https://{lang}.m.wikipedia.org/wiki/"), &link.title)
            }
            None => {
                let title = if self.title.is_empty() {
                    &self.id
                } else {
                    &self.title
                };
                format!("https://m.wikidata.org/wiki/{title}")
            }
        }
    }
}

fn article_url(base: &str, title: &str) -> String {
    let fallback = || format!("{base}{}", title.replace(' ', "_"));
    let Ok(mut url) = Url::parse(base) else {
        return fallback();
    };
    match url.path_segments_mut() {
        Ok(mut segments) => {
            segments.pop_if_empty().push(&title.replace(' ', "_"));
        }
        Err(()) => return fallback(),
    }
    url.to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct SparqlResponse {
    pub head: SparqlHead,
    pub results: SparqlResults,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SparqlHead {
    #[serde(default)]
    pub vars: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SparqlResults {
    #[serde(default)]
    pub bindings: Vec<HashMap<String, SparqlValue>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SparqlValue {
    pub value: String,
}

impl SparqlResponse {
    /// Item ids bound to the first selected variable. Bindings that are not
    /// items, such as literals, are skipped.
    pub fn item_ids(&self) -> Vec<Qid> {
        let Some(var) = self.head.vars.first() else {
            return Vec::new();
        };
        self.results
            .bindings
            .iter()
            .filter_map(|row| row.get(var))
            .filter_map(|v| {
                let id = v.value.strip_prefix(ENTITY_PREFIX)?;
                match id.parse() {
                    Ok(qid) => Some(qid),
                    Err(e) => {
                        log::debug!("Skipping SPARQL binding: {e}");
                        None
                    }
                }
            })
            .collect()
    }
}

/// Answer of the legacy WDQ service: bare numeric item ids.
#[derive(Debug, Clone, Deserialize)]
pub struct WdqResponse {
    #[serde(default)]
    pub items: Vec<u64>,
}

impl WdqResponse {
    pub fn item_ids(&self) -> Vec<Qid> {
        self.items
            .iter()
            .filter_map(|n| format!("Q{n}").parse().ok())
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageInfoResponse {
    #[serde(default)]
    pub query: Option<ImageQuery>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageQuery {
    #[serde(default)]
    pub pages: HashMap<String, ImagePage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImagePage {
    #[serde(default)]
    pub imageinfo: Vec<ImageInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageInfo {
    #[serde(default)]
    pub thumburl: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl ImageInfoResponse {
    pub fn thumbnail_url(&self) -> Option<String> {
        self.query
            .as_ref()?
            .pages
            .values()
            .find_map(|page| page.imageinfo.first())
            .and_then(|info| info.thumburl.clone().or_else(|| info.url.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn langs(codes: &[&str]) -> Vec<String> {
        codes.iter().map(|c| c.to_string()).collect()
    }

    fn mona_lisa() -> Entity {
        serde_json::from_value(json!({
            "id": "Q12418",
            "title": "Q12418",
            "labels": {
                "fr": { "language": "fr", "value": "La Joconde" },
                "de": { "language": "de", "value": "Mona Lisa" }
            },
            "claims": {
                "P154": [{ "mainsnak": { "property": "P154", "datavalue": { "value": "Logo.svg", "type": "string" } } }],
                "P18": [
                    { "mainsnak": { "property": "P18", "datavalue": { "value": "Mona Lisa.jpg", "type": "string" } } },
                    { "mainsnak": { "property": "P18", "datavalue": { "value": "Other.jpg", "type": "string" } } }
                ],
                "P170": [{ "mainsnak": { "property": "P170", "snaktype": "somevalue" } }]
            },
            "sitelinks": {
                "dewiki": { "site": "dewiki", "title": "Mona Lisa" },
                "frwiki": { "site": "frwiki", "title": "La Joconde" }
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_label_fallbacks() {
        let entity = mona_lisa();
        assert_eq!(entity.label(&langs(&["en", "fr"])), "La Joconde");
        assert_eq!(entity.label(&langs(&["en"])), "Mona Lisa");

        let bare: Entity = serde_json::from_value(json!({ "id": "Q1" })).unwrap();
        assert_eq!(bare.label(&langs(&["en"])), "");
    }

    #[test]
    fn test_claims() {
        let entity = mona_lisa();
        assert_eq!(entity.claim_str("P18"), Some("Mona Lisa.jpg"));
        assert_eq!(entity.claim("P170"), None);
        assert_eq!(entity.claim("P31"), None);
        assert_eq!(entity.image_file(), Some("Mona Lisa.jpg"));
        assert_eq!(entity.url(), "https://www.wikidata.org/wiki/Q12418");
    }

    #[test]
    fn test_wikipedia_url() {
        let entity = mona_lisa();
        assert_eq!(
            entity.wikipedia_url(&langs(&["en", "fr"])),
            "https://fr.m.wikipedia.org/wiki/La_Joconde"
        );
        assert_eq!(
            entity.wikipedia_url(&langs(&["en"])),
            "https://de.m.wikipedia.org/wiki/Mona_Lisa"
        );

        let bare: Entity = serde_json::from_value(json!({
            "id": "Q1",
            "title": "Q1",
            "sitelinks": { "commonswiki": { "site": "commonswiki", "title": "Category:X" } }
        }))
        .unwrap();
        assert_eq!(bare.wikipedia_url(&langs(&["en"])), "https://m.wikidata.org/wiki/Q1");
    }

    #[test]
    fn test_article_titles_are_encoded() {
        let entity: Entity = serde_json::from_value(json!({
            "id": "Q2",
            "sitelinks": { "enwiki": { "site": "enwiki", "title": "AC/DC & friends?" } }
        }))
        .unwrap();
        let url = entity.wikipedia_url(&langs(&["en"]));
        assert!(url.starts_with("https://en.m.wikipedia.org/wiki/AC%2FDC"), "{url}");
        assert!(!url.contains('?'));
    }

    #[test]
    fn test_entities_keep_request_order() {
        let response: EntitiesResponse = serde_json::from_value(json!({
            "entities": {
                "Q3": { "id": "Q3" },
                "Q1": { "id": "Q1" },
                "Q9": { "id": "Q9", "missing": "" }
            }
        }))
        .unwrap();
        let ids: Vec<Qid> = ["Q1", "Q9", "Q3", "Q4"].iter().map(|s| s.parse().unwrap()).collect();
        let ordered: Vec<String> = response.into_ordered(&ids).into_iter().map(|e| e.id).collect();
        assert_eq!(ordered, vec!["Q1", "Q3"]);
    }

    #[test]
    fn test_api_error_object() {
        let response: EntitiesResponse = serde_json::from_value(json!({
            "error": { "code": "no-such-entity", "info": "Could not find an entity with the ID \"Q0\"." }
        }))
        .unwrap();
        assert!(response.entities.is_empty());
        assert_eq!(response.error.map(|e| e.code).as_deref(), Some("no-such-entity"));
    }

    #[test]
    fn test_sparql_results() {
        let response: SparqlResponse = serde_json::from_value(json!({
            "head": { "vars": ["x", "label"] },
            "results": { "bindings": [
                { "x": { "type": "uri", "value": "http://www.wikidata.org/entity/Q12418" } },
                { "x": { "type": "literal", "value": "not an item" } },
                { "label": { "type": "literal", "value": "no x" } },
                { "x": { "type": "uri", "value": "http://www.wikidata.org/entity/Q5" } }
            ] }
        }))
        .unwrap();
        let ids: Vec<String> = response.item_ids().into_iter().map(|q| q.to_string()).collect();
        assert_eq!(ids, vec!["Q12418", "Q5"]);
    }

    #[test]
    fn test_wdq_results() {
        let response: WdqResponse =
            serde_json::from_value(json!({ "status": {}, "items": [12418, 5] })).unwrap();
        let ids: Vec<String> = response.item_ids().into_iter().map(|q| q.to_string()).collect();
        assert_eq!(ids, vec!["Q12418", "Q5"]);
    }

    #[test]
    fn test_thumbnail_url() {
        let response: ImageInfoResponse = serde_json::from_value(json!({
            "query": { "pages": { "-1": { "imageinfo": [
                { "thumburl": "https://upload.wikimedia.org/thumb/400px-Mona.jpg", "url": "https://upload.wikimedia.org/Mona.jpg" }
            ] } } }
        }))
        .unwrap();
        assert_eq!(
            response.thumbnail_url().as_deref(),
            Some("https://upload.wikimedia.org/thumb/400px-Mona.jpg")
        );

        let empty: ImageInfoResponse =
            serde_json::from_value(json!({ "batchcomplete": "" })).unwrap();
        assert_eq!(empty.thumbnail_url(), None);
    }
}
