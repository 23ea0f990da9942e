use std::path::Path;

use thiserror::Error;

use crate::grammar::Rule;

#[derive(Error, Debug)]
pub enum TagdbError {
    #[error("Parse error: {message}")]
    Parse { message: String, position: Option<usize> },
    #[error("Evaluation error: {0}")]
    Evaluation(String),
    #[error("Load error in '{path}': {message}")]
    Load { path: String, message: String },
    #[error("Merge error: {0}")]
    Merge(String),
    #[error("Schema error: {0}")]
    Schema(String),
    #[error("Config error: {0}")]
    Config(String),
    #[error("Persistence error: {0}")]
    Persistence(String),
}

pub type Result<T> = std::result::Result<T, TagdbError>;

impl TagdbError {
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse { message: message.into(), position: None }
    }
    pub fn parse_at(message: impl Into<String>, position: usize) -> Self {
        Self::Parse { message: message.into(), position: Some(position) }
    }
    pub fn load(path: &Path, message: impl Into<String>) -> Self {
        Self::Load { path: path.display().to_string(), message: message.into() }
    }
}

// Helper conversions
impl From<rusqlite::Error> for TagdbError {
    fn from(e: rusqlite::Error) -> Self { Self::Persistence(e.to_string()) }
}
impl From<config::ConfigError> for TagdbError {
    fn from(e: config::ConfigError) -> Self { Self::Config(e.to_string()) }
}
impl From<pest::error::Error<Rule>> for TagdbError {
    fn from(e: pest::error::Error<Rule>) -> Self {
        let position = match e.location {
            pest::error::InputLocation::Pos(p) => p,
            pest::error::InputLocation::Span((start, _)) => start,
        };
        Self::Parse { message: e.variant.message().into_owned(), position: Some(position) }
    }
}
