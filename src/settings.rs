//! Layered configuration: built-in defaults, then an optional `tagdb` file
//! (toml, json, yaml, ...), then `TAGDB_*` environment variables.

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::Result;

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Settings {
    /// Capturing pattern extracting ids from richer id-list lines.
    pub id_pattern: Option<String>,
    /// Sort field given to every loaded store.
    pub default_sort: Option<String>,
    /// File extensions read as columnar containers.
    pub container_extensions: Vec<String>,
    /// Filter directive for the log subscriber.
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            id_pattern: None,
            default_sort: None,
            container_extensions: vec!["db".into(), "sqlite".into(), "tagdb".into()],
            log_filter: "info".into(),
        }
    }
}

impl Settings {
    /// Loads settings from `file` (extension optional, may be missing).
    pub fn load(file: &str) -> Result<Settings> {
        let defaults = Settings::default();
        let settings = Config::builder()
            .set_default("container_extensions", defaults.container_extensions)?
            .set_default("log_filter", defaults.log_filter)?
            .add_source(File::with_name(file).required(false))
            .add_source(
                Environment::with_prefix("TAGDB")
                    .list_separator(",")
                    .with_list_parse_key("container_extensions")
                    .try_parsing(true),
            )
            .build()?;
        Ok(settings.try_deserialize()?)
    }
}
