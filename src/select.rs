//! Turning a mask into the final id sequence: sort, slice and tag.

use std::cmp::Ordering;

use crate::column::{Column, ColumnRef};
use crate::error::{Result, TagdbError};
use crate::evaluate::evaluate_fields;
use crate::query::Query;
use crate::slice::{Item, resolve_position};
use crate::store::Tagdb;

/// Runs a parsed query against the store it was parsed for.
pub fn select(db: &Tagdb, query: &Query) -> Result<Vec<String>> {
    let mask = evaluate_fields(db, query.fields())?;
    let rows: Vec<usize> = mask
        .iter()
        .enumerate()
        .filter_map(|(row, kept)| kept.then_some(row))
        .collect();
    let rows = match query.sort() {
        Some(field) => sort_rows(db, rows, field, query)?,
        None => rows,
    };
    let ids = rows
        .iter()
        .map(|row| {
            db.id_at(*row)
                .ok_or_else(|| TagdbError::Evaluation(format!("row {} has no id", row)))
        })
        .collect::<Result<Vec<&str>>>()?;
    let ids = query.data_slice().apply(ids)?;
    let suffix: String = query.tags().iter().map(|tag| format!(":{}", tag)).collect();
    Ok(ids.into_iter().map(|id| format!("{}{}", id, suffix)).collect())
}

/// Orders the selected rows by the sort field, ascending. The sort is stable,
/// so rows with equal keys keep the store's order. NaN sorts last.
fn sort_rows(db: &Tagdb, rows: Vec<usize>, field: &str, query: &Query) -> Result<Vec<usize>> {
    let column = db
        .column(field)
        .ok_or_else(|| TagdbError::Evaluation(format!("unknown sort field '{}'", field)))?;
    let key = sort_key(column, field, query)?;
    let mut rows = rows;
    match key {
        ColumnRef::Boolean(values) => rows.sort_by_key(|row| values[*row]),
        ColumnRef::Integer(values) => rows.sort_by_key(|row| values[*row]),
        ColumnRef::String(values) => rows.sort_by(|a, b| values[*a].cmp(&values[*b])),
        ColumnRef::Float(values) => rows.sort_by(|a, b| nan_last(values[*a], values[*b])),
    }
    Ok(rows)
}

/// The part of the sort column the field slice selects.
fn sort_key<'a>(column: &'a Column, field: &str, query: &Query) -> Result<ColumnRef<'a>> {
    let subscripts = query.field_slice().subscripts();
    match subscripts {
        [] => column.scalar().ok_or_else(|| {
            TagdbError::Evaluation(format!(
                "sort field '{}' has {} components; select one, e.g. '{}[0]'",
                field,
                column.components(),
                field
            ))
        }),
        [subscript] if column.components() > 1 => match subscript.single()? {
            Item::Position(k) => resolve_position(k, column.components())
                .and_then(|k| column.component(k))
                .ok_or_else(|| {
                    TagdbError::Evaluation(format!(
                        "component {} is out of bounds for sort field '{}' with {} components",
                        k,
                        field,
                        column.components()
                    ))
                }),
            range => Err(TagdbError::Evaluation(format!(
                "sort key slice '{}' must select a single component of '{}'",
                range, field
            ))),
        },
        _ => Err(TagdbError::Evaluation(format!(
            "sort key slice '{}' does not apply to '{}' with {} component(s)",
            query.field_slice(),
            field,
            column.components()
        ))),
    }
}

fn nan_last(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}
