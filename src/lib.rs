//! Tagdb: an in-memory tag database for selecting named records.
//!
//! A [`store::Tagdb`] is a set of named, equal-length typed columns keyed by a
//! unique `id` column. Boolean columns act as *tags*; numeric, string and
//! multi-component columns (e.g. a `2 × N` coordinate field) carry values.
//! Stores are immutable once built: queries only read them, and a merge
//! produces a brand new store.
//!
//! ## Queries
//! A query has the form `field,field,+tag,...:sort[field_slice][data_slice]`:
//! * Fields are expressions over the columns (`deep56`, `ra > 3 | night`,
//!   `hits([[0,0],[1,0],[1,1]], pos)`) and are all required to hold, with
//!   `,` binding looser than any operator.
//! * A bare id selects that id, and `@file` selects the ids listed in a file.
//! * `+tag` fields never filter; their names are appended to every result as
//!   `id:tag`.
//! * After `:` comes an optional sort field, a slice of the sort key (one
//!   component of a multi-component field) and a slice of the result.
//!
//! ```
//! use tagdb::column::Column;
//! use tagdb::store::Tagdb;
//! let db = Tagdb::new(
//!     [
//!         ("id", Column::string(vec!["a", "b", "c"])),
//!         ("deep56", Column::boolean(vec![true, false, true])),
//!         ("night", Column::boolean(vec![true, true, false])),
//!     ],
//!     None,
//! )
//! .unwrap();
//! assert_eq!(db.query("deep56,night").unwrap(), vec!["a"]);
//! assert_eq!(db.query("+extra,deep56").unwrap(), vec!["a:extra", "c:extra"]);
//! ```
//!
//! ## Merging
//! [`merge::merge`] unions stores: ids missing from an input get the column
//! kind's default (`false`, `-1`, NaN, empty string), booleans accumulate
//! with OR and other values are overwritten by later inputs.
//!
//! ## Loading
//! [`loader::read`] loads either the text format (a manifest of id-list files
//! and their tags, see [`text`]) or the SQLite based columnar container (see
//! [`container`]).
//!
//! ## Modules
//! * [`column`]: typed columns and the per-kind merge defaults/combiners.
//! * [`store`]: the column store and its `query` entry point.
//! * [`query`], [`expression`], [`evaluate`], [`builtins`], [`slice`],
//!   [`select`]: the query language from string to id sequence.
//! * [`merge`]: union of stores.
//! * [`text`], [`container`], [`loader`]: reading and writing stores.
//! * [`settings`]: configuration.

pub mod builtins;
pub mod column;
pub mod container;
pub mod error;
pub mod evaluate;
pub mod expression;
pub mod grammar;
pub mod loader;
pub mod merge;
pub mod query;
pub mod select;
pub mod settings;
pub mod slice;
pub mod store;
pub mod text;

pub use error::{Result, TagdbError};
pub use store::Tagdb;
