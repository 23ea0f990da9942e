//! Union of several stores into one.
//!
//! The result holds every id of every input, in order of first appearance.
//! Each column is first filled with its kind's default, then every input that
//! has the column writes its values in list order through the kind's
//! combiner: booleans accumulate with OR, everything else is overwritten by
//! the later input. A column that is boolean, integer or float in different
//! inputs is widened to the widest of those kinds first.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use bimap::BiMap;
use tracing::{debug, info};

use crate::column::{Column, ColumnData, Element, ValueKind};
use crate::error::{Result, TagdbError};
use crate::store::{ColumnHasher, ID, Tagdb};

/// Merges the stores in the given order. The result has no default sort
/// field; use [`Tagdb::with_sort`] to carry one over.
pub fn merge<'a, I>(dbs: I) -> Result<Tagdb>
where
    I: IntoIterator<Item = &'a Tagdb>,
{
    let dbs: Vec<&Tagdb> = dbs.into_iter().collect();
    if dbs.is_empty() {
        return Err(TagdbError::Merge("nothing to merge".into()));
    }

    // the union of ids, and where each store's rows land in it
    let mut union: BiMap<String, usize> = BiMap::new();
    let mut positions: Vec<Vec<usize>> = Vec::with_capacity(dbs.len());
    for db in &dbs {
        let mut landing = Vec::with_capacity(db.len());
        for id in db.ids() {
            let position = match union.get_by_left(id) {
                Some(position) => *position,
                None => {
                    let position = union.len();
                    union.insert(id.clone(), position);
                    position
                }
            };
            landing.push(position);
        }
        positions.push(landing);
    }
    let total = union.len();

    // every column's kind is the widest kind any input gives it
    let mut layout: HashMap<&str, (ValueKind, usize), ColumnHasher> = HashMap::default();
    for db in &dbs {
        for (name, column) in db.columns() {
            if name == ID {
                continue;
            }
            match layout.entry(name) {
                Entry::Vacant(e) => {
                    e.insert((column.kind(), column.components()));
                }
                Entry::Occupied(mut e) => {
                    let (kind, components) = *e.get();
                    let promoted = kind.promoted(column.kind());
                    match promoted {
                        Some(promoted) if components == column.components() => {
                            e.insert((promoted, components));
                        }
                        _ => {
                            return Err(TagdbError::Merge(format!(
                                "column '{}' is {} x {} in one store and {} x {} in another",
                                name,
                                components,
                                kind,
                                column.components(),
                                column.kind()
                            )));
                        }
                    }
                }
            }
        }
    }

    let mut merged: HashMap<String, Column, ColumnHasher> = HashMap::default();
    for (db, landing) in dbs.iter().zip(&positions) {
        for (name, column) in db.columns() {
            let Some(&(kind, components)) = layout.get(name) else {
                continue;
            };
            let target = match merged.entry(name.to_owned()) {
                Entry::Occupied(e) => e.into_mut(),
                Entry::Vacant(e) => e.insert(filled(kind, components, total)?),
            };
            combine(target, column, landing)?;
        }
    }

    let mut ids = vec![String::new(); total];
    for (id, position) in union {
        ids[position] = id;
    }
    info!(stores = dbs.len(), ids = total, columns = merged.len() + 1, "merged stores");
    Tagdb::new(
        merged.into_iter().chain(std::iter::once((ID.to_owned(), Column::string(ids)))),
        None,
    )
}

/// A column of `total` ids with `components` components, holding only the
/// defaults of `kind`.
fn filled(kind: ValueKind, components: usize, total: usize) -> Result<Column> {
    let size = components * total;
    let data = match kind {
        ValueKind::Boolean => ColumnData::Boolean(vec![bool::fill(); size]),
        ValueKind::Integer => ColumnData::Integer(vec![i64::fill(); size]),
        ValueKind::Float => ColumnData::Float(vec![f64::fill(); size]),
        ValueKind::String => ColumnData::String(vec![String::fill(); size]),
    };
    Column::array(data, components)
}

fn combine(target: &mut Column, incoming: &Column, landing: &[usize]) -> Result<()> {
    let components = target.components();
    let kind = target.kind();
    let incoming = incoming.data().cast(kind).ok_or_else(|| {
        TagdbError::Merge(format!("cannot combine {} values with {} values", kind, incoming.kind()))
    })?;
    match (target.data_mut(), &*incoming) {
        (ColumnData::Boolean(t), ColumnData::Boolean(i)) => combine_into(t, i, landing, components),
        (ColumnData::Integer(t), ColumnData::Integer(i)) => combine_into(t, i, landing, components),
        (ColumnData::Float(t), ColumnData::Float(i)) => combine_into(t, i, landing, components),
        (ColumnData::String(t), ColumnData::String(i)) => combine_into(t, i, landing, components),
        (_, i) => {
            return Err(TagdbError::Merge(format!(
                "cannot combine {} values with {} values",
                kind,
                i.kind()
            )));
        }
    }
    debug!(%kind, rows = landing.len(), "combined column");
    Ok(())
}

fn combine_into<T: Element>(target: &mut [T], incoming: &[T], landing: &[usize], components: usize) {
    let total = target.len() / components;
    let len = landing.len();
    for c in 0..components {
        for (row, position) in landing.iter().enumerate() {
            let at = c * total + position;
            target[at] = target[at].combine(&incoming[c * len + row]);
        }
    }
}
