use crate::events::{AppEvent, Request};
use crate::source::DataSource;
use async_channel::{Receiver, Sender};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use tokio::runtime::Runtime;

/// Runs fetches and the config watcher on a Tokio runtime in its own
/// thread. Every request is answered with exactly one [`AppEvent`].
pub fn start_background_services(
    source: Arc<dyn DataSource>,
    requests: Receiver<Request>,
    tx: Sender<AppEvent>,
    config_path: Option<PathBuf>,
) {
    thread::spawn(move || {
        let rt = match Runtime::new() {
            Ok(rt) => rt,
            Err(e) => {
                log::error!("Failed to create Tokio runtime: {}", e);
                return;
            }
        };

        rt.block_on(async {
            if let Some(path) = config_path {
                let tx = tx.clone();
                tokio::spawn(async move {
                    crate::config::run_async_watcher(path, tx).await;
                });
            }

            while let Ok(request) = requests.recv().await {
                let source = source.clone();
                let tx = tx.clone();
                tokio::spawn(async move {
                    let event = answer(source.as_ref(), request).await;
                    if tx.send(event).await.is_err() {
                        log::debug!("UI is gone, dropping answer");
                    }
                });
            }
        });
    });
}

pub async fn answer(source: &dyn DataSource, request: Request) -> AppEvent {
    match request {
        Request::Related { origin, query } => match source.related(&query).await {
            Ok(ids) => AppEvent::Related { origin, ids },
            Err(e) => AppEvent::Failed {
                origin: Some(origin),
                error: e.to_string(),
            },
        },
        Request::Entities { origin, ids } => match source.entities(&ids).await {
            Ok(entities) => AppEvent::Entities { origin, entities },
            Err(e) => AppEvent::Failed {
                origin: Some(origin),
                error: e.to_string(),
            },
        },
        Request::Thumbnail { item, file } => {
            let url = match source.thumbnail(&file).await {
                Ok(Some(url)) => url,
                Ok(None) => {
                    return AppEvent::Failed {
                        origin: None,
                        error: format!("No thumbnail for {file}"),
                    };
                }
                Err(e) => {
                    return AppEvent::Failed {
                        origin: None,
                        error: format!("Thumbnail of {file}: {e}"),
                    };
                }
            };
            match source.fetch_bytes(&url).await {
                Ok(bytes) => AppEvent::Thumbnail { item, url, bytes },
                Err(e) => AppEvent::Failed {
                    origin: None,
                    error: format!("Image {url}: {e}"),
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Origin;
    use crate::query::Query;
    use crate::source::fake::FakeSource;

    #[tokio::test]
    async fn test_answers_related() {
        let mut source = FakeSource::default();
        source.relate("Q1", &["Q2", "Q3"]);
        let query = Query::Sparql("SELECT ?x WHERE { ?x wdt:P170 wd:Q1 }".into());

        let event = answer(&source, Request::Related { origin: Origin::Root, query }).await;
        let AppEvent::Related { origin, ids } = event else {
            panic!("unexpected {event:?}");
        };
        assert_eq!(origin, Origin::Root);
        assert_eq!(ids.iter().map(|q| q.as_str()).collect::<Vec<_>>(), vec!["Q2", "Q3"]);
    }

    #[tokio::test]
    async fn test_entities_skip_unknown_ids() {
        let mut source = FakeSource::default();
        source.relate("Q1", &["Q2"]);
        let ids = vec!["Q2".parse().unwrap(), "Q99".parse().unwrap()];

        let event = answer(&source, Request::Entities { origin: Origin::Root, ids }).await;
        let AppEvent::Entities { entities, .. } = event else {
            panic!("unexpected {event:?}");
        };
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].id, "Q2");
    }

    #[tokio::test]
    async fn test_answers_thumbnail_with_bytes() {
        let source = FakeSource::default();
        let item = spiral::MenuItem::new("x").id();

        let event = answer(&source, Request::Thumbnail { item, file: "A.png".into() }).await;
        let AppEvent::Thumbnail { item: got, url, bytes } = event else {
            panic!("unexpected {event:?}");
        };
        assert_eq!(got, item);
        assert_eq!(url, "https://thumbs.test/A.png");
        assert!(bytes.is_empty());
    }
}
