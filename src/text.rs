//! The text format: a manifest whose entries name id-list files and the
//! tags every id in them carries.
//!
//! ```text
//! # comment
//! root = /data/lists
//! {root}/deep56.txt  deep56 night
//! {root}/ar2.txt     ar2
//! ```
//!
//! Tokens are separated by whitespace. A token wholly enclosed in single or
//! double quotes may contain spaces; quotes inside a token (`a"b c"`) are
//! not understood.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use tracing::{debug, warn};

use crate::column::Column;
use crate::error::{Result, TagdbError};
use crate::merge::merge;
use crate::store::{ID, Tagdb};

lazy_static! {
    // a quoted token may hold spaces, otherwise tokens are whitespace separated
    static ref TOKEN: Regex = Regex::new(r#""([^"]*)"|'([^']*)'|(\S+)"#).unwrap();
    static ref VARIABLE: Regex = Regex::new(r"\{(\w+)\}").unwrap();
}

/// One manifest entry: an id-list file and the tags of its ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub file: PathBuf,
    pub tags: Vec<String>,
}

fn read_lines(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| TagdbError::load(path, e.to_string()))
}

fn tokenize(line: &str) -> Vec<String> {
    TOKEN
        .captures_iter(line)
        .filter_map(|c| c.get(1).or_else(|| c.get(2)).or_else(|| c.get(3)))
        .map(|m| m.as_str().to_owned())
        .collect()
}

/// Reads the manifest, substituting `{name}` with variables defined on
/// earlier lines. Relative files are taken relative to the manifest.
pub fn parse_manifest(path: &Path) -> Result<Vec<Entry>> {
    let text = read_lines(path)?;
    let base = path.parent().unwrap_or_else(|| Path::new(""));
    let mut variables: HashMap<String, String> = HashMap::new();
    let mut entries = Vec::new();
    for (number, line) in text.lines().enumerate() {
        let line = line.trim_end();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let at_line = |message: String| TagdbError::load(path, format!("line {}: {}", number + 1, message));
        let tokens = tokenize(line);
        if tokens.len() < 2 {
            return Err(at_line(format!("entry needs at least one tag: '{}'", line)));
        }
        if tokens[1] == "=" {
            let value = tokens
                .get(2)
                .ok_or_else(|| at_line(format!("variable '{}' has no value", tokens[0])))?;
            variables.insert(tokens[0].clone(), value.clone());
            continue;
        }
        let mut missing = None;
        let file = VARIABLE.replace_all(&tokens[0], |c: &Captures| match variables.get(&c[1]) {
            Some(value) => value.clone(),
            None => {
                missing.get_or_insert_with(|| c[1].to_owned());
                String::new()
            }
        });
        if let Some(name) = missing {
            return Err(at_line(format!("unknown variable '{}'", name)));
        }
        let mut tags: Vec<String> = Vec::new();
        for tag in &tokens[1..] {
            if !tags.contains(tag) {
                tags.push(tag.clone());
            }
        }
        entries.push(Entry { file: base.join(&*file), tags });
    }
    Ok(entries)
}

/// Reads one id per line, skipping blank lines and `#` comments. With a
/// pattern, its first capture is the id when the line matches from its
/// start, and the whole line is the id otherwise. Without one, the first
/// whitespace separated token is. Repeated ids are kept once.
pub fn read_id_list(path: &Path, pattern: Option<&Regex>) -> Result<Vec<String>> {
    let text = read_lines(path)?;
    let mut seen = HashSet::new();
    let mut ids = Vec::new();
    for line in text.lines() {
        let line = line.trim_end();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let id = match pattern {
            // the pattern has to match from the start of the line
            Some(pattern) => match pattern
                .captures(line)
                .filter(|c| c.get(0).is_some_and(|m| m.start() == 0))
                .and_then(|c| c.get(1))
            {
                Some(capture) => capture.as_str(),
                None => {
                    warn!(file = %path.display(), line, "id pattern did not match, using the whole line");
                    line
                }
            },
            None => line.split_whitespace().next().unwrap_or(line),
        };
        if seen.insert(id.to_owned()) {
            ids.push(id.to_owned());
        }
    }
    Ok(ids)
}

/// The first token of every non-comment line, as used by `@file` queries.
pub fn read_reference_list(path: &Path) -> Result<Vec<String>> {
    let text = read_lines(path)?;
    Ok(text
        .lines()
        .filter(|line| !line.starts_with('#'))
        .filter_map(|line| line.split_whitespace().next())
        .map(str::to_owned)
        .collect())
}

/// Builds a store from a manifest. Every entry contributes a store where its
/// tags are true for its ids, and all of them are merged in manifest order.
pub fn read_text(path: &Path, pattern: Option<&Regex>) -> Result<Tagdb> {
    let entries = parse_manifest(path)?;
    if entries.is_empty() {
        return Err(TagdbError::load(path, "manifest has no entries"));
    }
    let mut dbs = Vec::with_capacity(entries.len());
    for entry in &entries {
        let ids = read_id_list(&entry.file, pattern)?;
        debug!(file = %entry.file.display(), ids = ids.len(), tags = ?entry.tags, "read id list");
        let mut columns = vec![(ID.to_owned(), Column::string(ids.clone()))];
        for tag in &entry.tags {
            columns.push((tag.clone(), Column::boolean(vec![true; ids.len()])));
        }
        let db = Tagdb::new(columns, None)
            .map_err(|e| TagdbError::load(&entry.file, e.to_string()))?;
        dbs.push(db);
    }
    merge(&dbs).map_err(|e| TagdbError::load(path, e.to_string()))
}
