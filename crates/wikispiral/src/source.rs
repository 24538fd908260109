use crate::ids::Qid;
use crate::query::Query;
use crate::wikidata::{
    ApiError, EntitiesResponse, Entity, ImageInfoResponse, SparqlResponse, WdqResponse,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

pub const SPARQL_ENDPOINT: &str = "https://query.wikidata.org/sparql";
pub const WDQ_ENDPOINT: &str = "https://wdq.wmflabs.org/api";
pub const WIKIDATA_API: &str = "https://www.wikidata.org/w/api.php";
pub const COMMONS_API: &str = "https://commons.wikimedia.org/w/api.php";

/// `wbgetentities` accepts at most this many ids per call.
pub const MAX_ENTITIES_PER_CALL: usize = 50;

/// Width in pixels of requested thumbnails.
pub const THUMBNAIL_WIDTH: u32 = 400;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected response: {0}")]
    Json(#[from] serde_json::Error),
    #[error("service error {code}: {info}")]
    Api { code: String, info: String },
}

/// Where the explorer gets its data from.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Items matched by the query, in service order.
    async fn related(&self, query: &Query) -> Result<Vec<Qid>, SourceError>;

    /// Entities in the order of `ids`; unknown ids are left out.
    async fn entities(&self, ids: &[Qid]) -> Result<Vec<Entity>, SourceError>;

    /// Thumbnail URL of a Commons file, if Commons knows it.
    async fn thumbnail(&self, file: &str) -> Result<Option<String>, SourceError>;

    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, SourceError>;
}

pub struct WikidataClient {
    http: reqwest::Client,
    thumbnails: Mutex<HashMap<String, Option<String>>>,
}

impl WikidataClient {
    pub fn new() -> Result<Self, SourceError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("wikispiral/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            thumbnails: Mutex::new(HashMap::new()),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, &str)],
    ) -> Result<T, SourceError> {
        let body = self
            .http
            .get(url)
            .query(params)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl DataSource for WikidataClient {
    async fn related(&self, query: &Query) -> Result<Vec<Qid>, SourceError> {
        log::debug!("Running query: {}", query.text());
        match query {
            Query::Sparql(q) => {
                let response: SparqlResponse = self
                    .get_json(
                        SPARQL_ENDPOINT,
                        &[("query", q.as_str()), ("format", "json")],
                    )
                    .await?;
                Ok(response.item_ids())
            }
            Query::Wdq(q) => {
                let response: WdqResponse =
                    self.get_json(WDQ_ENDPOINT, &[("q", q.as_str())]).await?;
                Ok(response.item_ids())
            }
        }
    }

    async fn entities(&self, ids: &[Qid]) -> Result<Vec<Entity>, SourceError> {
        let mut entities = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(MAX_ENTITIES_PER_CALL) {
            let joined = chunk.iter().map(Qid::as_str).collect::<Vec<_>>().join("|");
            let response: EntitiesResponse = self
                .get_json(
                    WIKIDATA_API,
                    &[("action", "wbgetentities"), ("format", "json"), ("ids", joined.as_str())],
                )
                .await?;
            if let Some(ApiError { code, info }) = response.error {
                return Err(SourceError::Api { code, info });
            }
            entities.extend(response.into_ordered(chunk));
        }
        Ok(entities)
    }

    async fn thumbnail(&self, file: &str) -> Result<Option<String>, SourceError> {
        let cached = self.thumbnails.lock().get(file).cloned();
        if let Some(cached) = cached {
            return Ok(cached);
        }
        let title = format!("File:{file}");
        let width = THUMBNAIL_WIDTH.to_string();
        let response: ImageInfoResponse = self
            .get_json(
                COMMONS_API,
                &[
                    ("action", "query"),
                    ("format", "json"),
                    ("prop", "imageinfo"),
                    ("iiprop", "url"),
                    ("iilimit", "1"),
                    ("iiurlwidth", width.as_str()),
                    ("titles", title.as_str()),
                ],
            )
            .await?;
        let url = response.thumbnail_url();
        self.thumbnails.lock().insert(file.to_string(), url.clone());
        Ok(url)
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, SourceError> {
        let bytes = self.http.get(url).send().await?.error_for_status()?.bytes().await?;
        Ok(bytes.to_vec())
    }
}

/// In-memory source for tests.
#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use serde_json::json;

    #[derive(Default)]
    pub struct FakeSource {
        related: HashMap<String, Vec<Qid>>,
        entities: HashMap<String, Entity>,
        pub queries: Mutex<Vec<String>>,
    }

    impl FakeSource {
        /// Items `children` become related to `root` for any query that
        /// mentions it.
        pub fn relate(&mut self, root: &str, children: &[&str]) -> &mut Self {
            self.related.insert(
                root.to_string(),
                children.iter().map(|c| c.parse().unwrap()).collect(),
            );
            for id in std::iter::once(&root).chain(children) {
                self.entity(id, &format!("Item {id}"), None);
            }
            self
        }

        pub fn entity(&mut self, id: &str, label: &str, image: Option<&str>) -> &mut Self {
            let mut claims = json!({});
            if let Some(file) = image {
                claims = json!({ "P18": [{ "mainsnak": { "property": "P18", "datavalue": { "value": file } } }] });
            }
            let entity: Entity = serde_json::from_value(json!({
                "id": id,
                "title": id,
                "labels": { "en": { "language": "en", "value": label } },
                "claims": claims,
                "sitelinks": { "enwiki": { "site": "enwiki", "title": label } }
            }))
            .unwrap();
            self.entities.insert(id.to_string(), entity);
            self
        }
    }

    #[async_trait]
    impl DataSource for FakeSource {
        async fn related(&self, query: &Query) -> Result<Vec<Qid>, SourceError> {
            self.queries.lock().push(query.text().to_string());
            Ok(self
                .related
                .iter()
                .find(|(root, _)| query.text().contains(&format!("wd:{root} ")))
                .map(|(_, ids)| ids.clone())
                .unwrap_or_default())
        }

        async fn entities(&self, ids: &[Qid]) -> Result<Vec<Entity>, SourceError> {
            Ok(ids
                .iter()
                .filter_map(|id| self.entities.get(id.as_str()).cloned())
                .collect())
        }

        async fn thumbnail(&self, file: &str) -> Result<Option<String>, SourceError> {
            Ok(Some(format!("https://thumbs.test/{file}")))
        }

        async fn fetch_bytes(&self, _url: &str) -> Result<Vec<u8>, SourceError> {
            Ok(Vec::new())
        }
    }
}
