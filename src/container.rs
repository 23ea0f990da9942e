//! The columnar container: a SQLite file holding one row per column.
//!
//! Numeric data is kept as little-endian blobs so that NaN defaults survive
//! the round trip; strings are kept as a JSON array.

use std::path::Path;

use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;

use crate::column::{Column, ColumnData, ValueKind};
use crate::error::{Result, TagdbError};
use crate::store::Tagdb;

const SCHEMA: &str = "
    create table if not exists TagdbColumn (
        Name text not null,
        Kind text not null,
        Components integer not null,
        Length integer not null,
        Data blob not null,
        constraint referenceable_Name primary key (
            Name
        )
    );
    create table if not exists TagdbSort (
        Name text not null
    );
";

fn encode(data: &ColumnData) -> Result<Vec<u8>> {
    Ok(match data {
        ColumnData::Boolean(values) => values.iter().map(|b| *b as u8).collect(),
        ColumnData::Integer(values) => values.iter().flat_map(|i| i.to_le_bytes()).collect(),
        ColumnData::Float(values) => values.iter().flat_map(|x| x.to_le_bytes()).collect(),
        ColumnData::String(values) => serde_json::to_vec(values)
            .map_err(|e| TagdbError::Persistence(e.to_string()))?,
    })
}

fn decode(kind: ValueKind, bytes: &[u8]) -> std::result::Result<ColumnData, String> {
    let words = |bytes: &[u8]| -> std::result::Result<Vec<[u8; 8]>, String> {
        if bytes.len() % 8 != 0 {
            return Err(format!("{} bytes is not a whole number of 8 byte values", bytes.len()));
        }
        Ok(bytes
            .chunks_exact(8)
            .map(|chunk| {
                let mut word = [0u8; 8];
                word.copy_from_slice(chunk);
                word
            })
            .collect())
    };
    Ok(match kind {
        ValueKind::Boolean => ColumnData::Boolean(bytes.iter().map(|b| *b != 0).collect()),
        ValueKind::Integer => ColumnData::Integer(words(bytes)?.into_iter().map(i64::from_le_bytes).collect()),
        ValueKind::Float => ColumnData::Float(words(bytes)?.into_iter().map(f64::from_le_bytes).collect()),
        ValueKind::String => ColumnData::String(serde_json::from_slice(bytes).map_err(|e| e.to_string())?),
    })
}

/// Writes the store into the container at `path`, replacing what was there.
pub fn write_container(db: &Tagdb, path: &Path) -> Result<()> {
    let mut connection = Connection::open(path)?;
    connection.execute_batch(SCHEMA)?;
    let transaction = connection.transaction()?;
    transaction.execute("delete from TagdbColumn", [])?;
    transaction.execute("delete from TagdbSort", [])?;
    {
        let mut add_column = transaction.prepare(
            "
            insert into TagdbColumn (
                Name,
                Kind,
                Components,
                Length,
                Data
            ) values (?, ?, ?, ?, ?)
        ",
        )?;
        for (name, column) in db.columns() {
            add_column.execute(params![
                name,
                column.kind().name(),
                column.components() as i64,
                column.len() as i64,
                encode(column.data())?
            ])?;
        }
        if let Some(sort) = db.sort() {
            transaction.execute("insert into TagdbSort (Name) values (?)", params![sort])?;
        }
    }
    transaction.commit()?;
    debug!(file = %path.display(), columns = db.columns().count(), ids = db.len(), "wrote container");
    Ok(())
}

/// Reads a store back from the container at `path`.
pub fn read_container(path: &Path) -> Result<Tagdb> {
    if !path.exists() {
        return Err(TagdbError::load(path, "no such file"));
    }
    let connection = Connection::open(path)?;
    let mut all_columns = connection
        .prepare(
            "
            select Name, Kind, Components, Length, Data
                from TagdbColumn
        ",
        )
        .map_err(|e| TagdbError::load(path, e.to_string()))?;
    let mut rows = all_columns.query([])?;
    let mut columns = Vec::new();
    while let Some(row) = rows.next()? {
        let name: String = row.get(0)?;
        let kind: String = row.get(1)?;
        let components: i64 = row.get(2)?;
        let length: i64 = row.get(3)?;
        let bytes: Vec<u8> = row.get(4)?;
        let in_column = |message: String| TagdbError::load(path, format!("column '{}': {}", name, message));
        let kind = ValueKind::from_name(&kind)
            .ok_or_else(|| in_column(format!("unknown kind '{}'", kind)))?;
        let data = decode(kind, &bytes).map_err(&in_column)?;
        let expected = components.checked_mul(length);
        if components < 1 || length < 0 || expected != Some(data.len() as i64) {
            return Err(in_column(format!(
                "{} values do not make {} x {}",
                data.len(),
                components,
                length
            )));
        }
        let column = Column::array(data, components as usize).map_err(|e| in_column(e.to_string()))?;
        columns.push((name, column));
    }
    let sort: Option<String> = connection
        .query_row("select Name from TagdbSort", [], |row| row.get(0))
        .optional()?;
    debug!(file = %path.display(), columns = columns.len(), "read container");
    Tagdb::new(columns, sort).map_err(|e| TagdbError::load(path, e.to_string()))
}
