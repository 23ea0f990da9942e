//! Choosing between the text manifest and the columnar container.

use std::path::Path;

use regex::Regex;
use tracing::debug;

use crate::container::read_container;
use crate::error::{Result, TagdbError};
use crate::settings::Settings;
use crate::store::Tagdb;
use crate::text::read_text;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Text,
    Container,
}
impl Format {
    /// The container format for the configured extensions, text otherwise.
    pub fn detect(path: &Path, settings: &Settings) -> Format {
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        if settings
            .container_extensions
            .iter()
            .any(|known| known.eq_ignore_ascii_case(extension))
        {
            Format::Container
        } else {
            Format::Text
        }
    }
}

/// Reads a store, detecting the format from the file extension unless one is
/// given. The settings' id pattern applies to the text format and their
/// default sort field, if any, to the loaded store.
pub fn read(path: &Path, format: Option<Format>, settings: &Settings) -> Result<Tagdb> {
    let format = format.unwrap_or_else(|| Format::detect(path, settings));
    debug!(file = %path.display(), ?format, "reading tagdb");
    let db = match format {
        Format::Text => {
            let pattern = settings
                .id_pattern
                .as_deref()
                .map(Regex::new)
                .transpose()
                .map_err(|e| TagdbError::Config(format!("bad id_pattern: {}", e)))?;
            read_text(path, pattern.as_ref())?
        }
        Format::Container => read_container(path)?,
    };
    match &settings.default_sort {
        Some(sort) => db.with_sort(Some(sort.clone())),
        None => Ok(db),
    }
}
