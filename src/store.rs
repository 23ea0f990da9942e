// used to keep the one-to-one mapping between ids and their rows
use bimap::BiMap;

// columns are kept in a HashMap keyed by name
use core::hash::BuildHasherDefault;
use seahash::SeaHasher;
use std::collections::HashMap;
use std::collections::hash_map::Entry;

use tracing::trace;

// our own stuff that we need
use crate::column::{Column, ColumnData};
use crate::error::{Result, TagdbError};
use crate::merge::merge;
use crate::query::Query;
use crate::select::select;

/// Name of the mandatory column holding the unique ids.
pub const ID: &str = "id";

pub type ColumnHasher = BuildHasherDefault<SeaHasher>;

// ------------- Tagdb -------------
/// An immutable set of named, equal-length columns keyed by the `id` column.
#[derive(Debug, Clone)]
pub struct Tagdb {
    columns: HashMap<String, Column, ColumnHasher>,
    rows: BiMap<String, usize>,
    len: usize,
    sort: Option<String>,
}

impl Tagdb {
    /// Builds a store from raw columns. There must be a single-component
    /// string column named `id` with unique values, and every column must
    /// cover the same number of ids. `sort`, when given, names the column
    /// queries are sorted by unless they name their own.
    pub fn new<I, S>(columns: I, sort: Option<String>) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Column)>,
        S: Into<String>,
    {
        let mut kept: HashMap<String, Column, ColumnHasher> = HashMap::default();
        for (name, column) in columns {
            match kept.entry(name.into()) {
                Entry::Vacant(e) => {
                    e.insert(column);
                }
                Entry::Occupied(e) => {
                    return Err(TagdbError::Schema(format!("duplicate column '{}'", e.key())));
                }
            }
        }
        let id_column = kept
            .get(ID)
            .ok_or_else(|| TagdbError::Schema(format!("missing '{}' column", ID)))?;
        let ids = match (id_column.data(), id_column.components()) {
            (ColumnData::String(ids), 1) => ids,
            _ => {
                return Err(TagdbError::Schema(format!(
                    "the '{}' column must hold single strings, not {} x {}",
                    ID,
                    id_column.components(),
                    id_column.kind()
                )));
            }
        };
        let len = ids.len();
        let mut rows = BiMap::new();
        for (row, id) in ids.iter().enumerate() {
            if rows.insert_no_overwrite(id.clone(), row).is_err() {
                return Err(TagdbError::Schema(format!("duplicate id '{}'", id)));
            }
        }
        for (name, column) in &kept {
            if column.len() != len {
                return Err(TagdbError::Schema(format!(
                    "column '{}' covers {} ids but there are {}",
                    name,
                    column.len(),
                    len
                )));
            }
        }
        let db = Self { columns: kept, rows, len, sort: None };
        db.with_sort(sort)
    }
    /// The same store with another default sort field.
    pub fn with_sort(mut self, sort: Option<String>) -> Result<Self> {
        if let Some(name) = &sort {
            if !self.columns.contains_key(name) {
                return Err(TagdbError::Schema(format!("unknown sort field '{}'", name)));
            }
        }
        self.sort = sort;
        Ok(self)
    }
    pub fn ids(&self) -> &[String] {
        match self.columns.get(ID).map(Column::data) {
            Some(ColumnData::String(ids)) => ids,
            _ => &[],
        }
    }
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }
    pub fn columns(&self) -> impl Iterator<Item = (&str, &Column)> {
        self.columns.iter().map(|(name, column)| (name.as_str(), column))
    }
    /// Column names in sorted order.
    pub fn column_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.columns.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
    pub fn sort(&self) -> Option<&str> {
        self.sort.as_deref()
    }
    pub fn len(&self) -> usize {
        self.len
    }
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
    pub fn contains_id(&self, id: &str) -> bool {
        self.rows.contains_left(id)
    }
    pub fn row_of(&self, id: &str) -> Option<usize> {
        self.rows.get_by_left(id).copied()
    }
    pub fn id_at(&self, row: usize) -> Option<&str> {
        self.rows.get_by_right(&row).map(String::as_str)
    }
    /// Selects ids with a query such as `deep56,night,hits(bounds,moon):ra[1:]`.
    /// Pass-through tags (`+tag`) are appended to every returned id as
    /// `id:tag`.
    pub fn query(&self, query: &str) -> Result<Vec<String>> {
        let parsed = Query::parse(query, self)?;
        let ids = select(self, &parsed)?;
        trace!(query, selected = ids.len(), "query complete");
        Ok(ids)
    }
    /// A new store holding the union of both stores' ids and columns, see
    /// [`merge`].
    pub fn union(&self, other: &Tagdb) -> Result<Tagdb> {
        merge([self, other])
    }
}
