use crate::events::AppEvent;
use crate::ids::{Pid, Qid};
use crate::query::{DEFAULT_SPARQL, DEFAULT_WDQ, Query, QueryLanguage};
use async_channel::Sender;
use directories::ProjectDirs;
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde::{Deserialize, Serialize};
use spiral::MenuOptions;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Largest page: one entity lookup carries the page plus its parent.
pub const MAX_PAGE_SIZE: usize = crate::source::MAX_ENTITIES_PER_CALL - 1;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub root: Qid,
    pub property: Pid,
    /// Label and Wikipedia languages, most preferred first.
    pub langs: Vec<String>,
    pub page_size: usize,
    pub slices: usize,
    pub auto_scroll: bool,
    pub query_language: QueryLanguage,
    pub sparql: String,
    pub wdq: String,
    pub page_start: usize,
    /// Show a "Unicode character" statement as the text icon.
    pub unicode_icons: bool,
    pub size: f64,
    pub animate: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: Qid::known("Q5582"),
            property: Pid::known("P170"),
            langs: vec!["en".into(), "fr".into()],
            page_size: MAX_PAGE_SIZE,
            slices: 12,
            auto_scroll: false,
            query_language: QueryLanguage::Sparql,
            sparql: DEFAULT_SPARQL.into(),
            wdq: DEFAULT_WDQ.into(),
            page_start: 0,
            unicode_icons: false,
            size: 600.0,
            animate: false,
        }
    }
}

impl Config {
    pub fn menu_options(&self) -> MenuOptions {
        MenuOptions {
            size: self.size,
            animate: self.animate,
            max_slices: self.slices,
            auto_scroll: self.auto_scroll,
            page_start: self.page_start,
            always_show_text_icon: self.unicode_icons,
            ..MenuOptions::default()
        }
    }

    /// Query for the items related to `root` under the configured property.
    pub fn query(&self, root: &Qid) -> Query {
        let template = match self.query_language {
            QueryLanguage::Sparql => &self.sparql,
            QueryLanguage::Wdq => &self.wdq,
        };
        Query::render(self.query_language, template, &self.property, root)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_PAGE_SIZE).contains(&self.page_size) {
            return Err(ConfigError::Invalid(format!(
                "page_size must be between 1 and {MAX_PAGE_SIZE}, got {}",
                self.page_size
            )));
        }
        self.menu_options()
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}

/// Command line overrides, applied on top of the file and environment.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct Overrides {
    /// Item shown in the center first
    #[arg(long)]
    pub root: Option<Qid>,
    /// Property linking children to their parent
    #[arg(short, long)]
    pub property: Option<Pid>,
    /// Preferred languages, comma separated
    #[arg(long, value_delimiter = ',')]
    pub langs: Option<Vec<String>>,
    #[arg(long)]
    pub page_size: Option<usize>,
    /// Most slices shown at once
    #[arg(long)]
    pub slices: Option<usize>,
    #[arg(long)]
    pub auto_scroll: bool,
    #[arg(long)]
    pub query_language: Option<QueryLanguage>,
    /// SPARQL or WDQ template with $property and $root placeholders
    #[arg(short, long)]
    pub query: Option<String>,
    #[arg(long)]
    pub page_start: Option<usize>,
    #[arg(long)]
    pub unicode_icons: bool,
    #[arg(long)]
    pub size: Option<f64>,
    #[arg(long)]
    pub animate: bool,
}

impl Overrides {
    pub fn apply(&self, config: &mut Config) {
        if let Some(root) = &self.root {
            config.root = root.clone();
        }
        if let Some(property) = &self.property {
            config.property = property.clone();
        }
        if let Some(langs) = &self.langs {
            config.langs = langs.clone();
        }
        if let Some(n) = self.page_size {
            config.page_size = n;
        }
        if let Some(n) = self.slices {
            config.slices = n;
        }
        if let Some(language) = self.query_language {
            config.query_language = language;
        }
        if let Some(query) = &self.query {
            match config.query_language {
                QueryLanguage::Sparql => config.sparql = query.clone(),
                QueryLanguage::Wdq => config.wdq = query.clone(),
            }
        }
        if let Some(n) = self.page_start {
            config.page_start = n;
        }
        if let Some(size) = self.size {
            config.size = size;
        }
        config.auto_scroll |= self.auto_scroll;
        config.unicode_icons |= self.unicode_icons;
        config.animate |= self.animate;
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to determine config directory")]
    ConfigDirNotFound,
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub fn get_config_path() -> Result<PathBuf, ConfigError> {
    let proj_dirs =
        ProjectDirs::from("org", "wikispiral", "wikispiral").ok_or(ConfigError::ConfigDirNotFound)?;
    Ok(proj_dirs.config_dir().join("config.toml"))
}

/// Reads `path`, or the default location, then `WIKISPIRAL_*` variables.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let config_path = match path {
        Some(p) => p.to_path_buf(),
        None => get_config_path()?,
    };

    let s = config::Config::builder()
        .add_source(config::File::from(config_path).required(false))
        .add_source(
            config::Environment::with_prefix("WIKISPIRAL")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("langs"),
        )
        .build()?;

    Ok(s.try_deserialize()?)
}

/// Loads the configuration, falling back to defaults when it is unreadable.
pub fn load_or_default(path: Option<&Path>, overrides: &Overrides) -> Config {
    let mut config = load_config(path).unwrap_or_else(|e| {
        log::warn!("Using default configuration: {e}");
        Config::default()
    });
    overrides.apply(&mut config);
    config
}

pub fn write_default_config() -> std::io::Result<PathBuf> {
    let path =
        get_config_path().map_err(|e| std::io::Error::new(std::io::ErrorKind::NotFound, e))?;
    if let Some(parent) = path.parent() {
        fs_err::create_dir_all(parent)?;
    }
    if !path.exists() {
        fs_err::write(&path, DEFAULT_CONFIG)?;
    }
    Ok(path)
}

const DEFAULT_CONFIG: &str = include_str!("default_config.toml");

pub async fn run_async_watcher(config_path: PathBuf, tx: Sender<AppEvent>) {
    let Some(config_dir) = config_path.parent().map(Path::to_path_buf) else {
        return;
    };

    if let Err(e) = fs_err::create_dir_all(&config_dir) {
        log::error!("Failed to create config directory for watching: {}", e);
        return;
    }

    let (bridge_tx, bridge_rx) = async_channel::unbounded();

    let mut watcher = match RecommendedWatcher::new(
        move |res| {
            let _ = bridge_tx.send_blocking(res);
        },
        notify::Config::default(),
    ) {
        Ok(w) => w,
        Err(e) => {
            log::error!("Failed to create watcher: {}", e);
            return;
        }
    };

    if let Err(e) = watcher.watch(&config_dir, RecursiveMode::NonRecursive) {
        log::error!("Failed to watch config directory: {}", e);
        return;
    }

    while let Ok(res) = bridge_rx.recv().await {
        match res {
            Ok(event) => {
                let meaningful_event = matches!(
                    event.kind,
                    EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_)
                );

                if meaningful_event
                    && event.paths.iter().any(|p| p == &config_path)
                    && tx.send(AppEvent::ConfigReload).await.is_err()
                {
                    break;
                }
            }
            Err(e) => log::error!("Watch error: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_toml(s: &str) -> Config {
        config::Config::builder()
            .add_source(config::File::from_str(s, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.root.as_str(), "Q5582");
        assert_eq!(config.property.as_str(), "P170");
        assert_eq!(config.langs, vec!["en", "fr"]);
        assert_eq!(config.page_size, 49);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_file_matches_defaults() {
        assert_eq!(from_toml(DEFAULT_CONFIG), Config::default());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = from_toml(
            r#"
            root = "q42"
            query_language = "WDQ"
            langs = ["de"]
            "#,
        );
        assert_eq!(config.root.as_str(), "Q42");
        assert_eq!(config.query_language, QueryLanguage::Wdq);
        assert_eq!(config.langs, vec!["de"]);
        assert_eq!(config.slices, 12);
    }

    #[test]
    fn test_invalid_ids_are_rejected() {
        let result: Result<Config, _> = config::Config::builder()
            .add_source(config::File::from_str(r#"root = "P42""#, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize();
        assert!(result.is_err());
    }

    #[test]
    fn test_overrides() {
        let mut config = Config::default();
        let overrides = Overrides {
            root: Some("Q42".parse().unwrap()),
            langs: Some(vec!["nl".into()]),
            query_language: Some(QueryLanguage::Wdq),
            query: Some("CLAIM[$property:$root]".into()),
            slices: Some(8),
            animate: true,
            ..Default::default()
        };
        overrides.apply(&mut config);
        assert_eq!(config.root.as_str(), "Q42");
        assert_eq!(config.langs, vec!["nl"]);
        assert_eq!(config.wdq, "CLAIM[$property:$root]");
        assert_eq!(config.sparql, DEFAULT_SPARQL);
        assert!(config.animate);
        assert!(!config.auto_scroll);
        assert_eq!(config.menu_options().max_slices, 8);
    }

    #[test]
    fn test_query_follows_language() {
        let mut config = Config::default();
        let root: Qid = "Q12418".parse().unwrap();
        assert_eq!(
            config.query(&root),
            Query::Sparql("SELECT ?x WHERE { ?x wdt:P170 wd:Q12418 }".into())
        );
        config.query_language = QueryLanguage::Wdq;
        assert_eq!(config.query(&root), Query::Wdq("CLAIM[170:12418]".into()));
    }

    #[test]
    fn test_validation() {
        let too_big = Config {
            page_size: 50,
            ..Default::default()
        };
        assert!(matches!(too_big.validate(), Err(ConfigError::Invalid(_))));

        let no_slices = Config {
            slices: 0,
            ..Default::default()
        };
        assert!(no_slices.validate().is_err());
    }

    #[test]
    fn test_menu_options() {
        let config = Config {
            unicode_icons: true,
            page_start: 3,
            ..Default::default()
        };
        let options = config.menu_options();
        assert_eq!(options.size, 600.0);
        assert!(!options.animate);
        assert!(options.always_show_text_icon);
        assert_eq!(options.page_start, 3);
        assert_eq!(options.animation_length, 500);
    }
}
