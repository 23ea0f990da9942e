// used to print out readable forms of a kind
use std::fmt;
// casts borrow when no conversion is needed
use std::borrow::Cow;

use crate::error::{Result, TagdbError};

// ------------- Value kinds -------------
/// The element kinds a column can hold. `String` is also the fallback
/// category for anything that is neither boolean nor numeric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Boolean,
    Integer,
    Float,
    String,
}
impl ValueKind {
    pub fn name(&self) -> &'static str {
        match self {
            ValueKind::Boolean => "boolean",
            ValueKind::Integer => "integer",
            ValueKind::Float => "float",
            ValueKind::String => "string",
        }
    }
    pub fn from_name(name: &str) -> Option<ValueKind> {
        match name {
            "boolean" => Some(ValueKind::Boolean),
            "integer" => Some(ValueKind::Integer),
            "float" => Some(ValueKind::Float),
            "string" => Some(ValueKind::String),
            _ => None,
        }
    }
    /// The kind both kinds can be cast to without losing values:
    /// booleans widen to integers, integers to floats. Strings only join
    /// strings.
    pub fn promoted(self, other: ValueKind) -> Option<ValueKind> {
        let rank = |kind: ValueKind| match kind {
            ValueKind::Boolean => Some(0),
            ValueKind::Integer => Some(1),
            ValueKind::Float => Some(2),
            ValueKind::String => None,
        };
        match (rank(self), rank(other)) {
            _ if self == other => Some(self),
            (Some(a), Some(b)) => Some(if a >= b { self } else { other }),
            _ => None,
        }
    }
}
impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Sentinel written into integer columns for ids a store does not know about.
pub const INTEGER_FILL: i64 = -1;

/// An element type that can live in a column. Every kind declares the value
/// used to fill positions missing from a merge input, and how an incoming
/// value is reconciled with the one already present.
pub trait Element: Clone + fmt::Debug + Send + Sync {
    const KIND: ValueKind;
    fn fill() -> Self;
    fn combine(&self, incoming: &Self) -> Self;
}

// ------------- Element kinds --------------
impl Element for bool {
    const KIND: ValueKind = ValueKind::Boolean;
    fn fill() -> bool {
        false
    }
    // tags are additive
    fn combine(&self, incoming: &bool) -> bool {
        *self | *incoming
    }
}
impl Element for i64 {
    const KIND: ValueKind = ValueKind::Integer;
    fn fill() -> i64 {
        INTEGER_FILL
    }
    fn combine(&self, incoming: &i64) -> i64 {
        *incoming
    }
}
impl Element for f64 {
    const KIND: ValueKind = ValueKind::Float;
    fn fill() -> f64 {
        f64::NAN
    }
    fn combine(&self, incoming: &f64) -> f64 {
        *incoming
    }
}
impl Element for String {
    const KIND: ValueKind = ValueKind::String;
    fn fill() -> String {
        String::new()
    }
    fn combine(&self, incoming: &String) -> String {
        incoming.clone()
    }
}

// ------------- Column data -------------
/// Owned storage of a column. Multi-component columns are stored
/// component-major: element `(c, i)` lives at `c * len + i`.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Boolean(Vec<bool>),
    Integer(Vec<i64>),
    Float(Vec<f64>),
    String(Vec<String>),
}
impl ColumnData {
    pub fn kind(&self) -> ValueKind {
        match self {
            ColumnData::Boolean(_) => ValueKind::Boolean,
            ColumnData::Integer(_) => ValueKind::Integer,
            ColumnData::Float(_) => ValueKind::Float,
            ColumnData::String(_) => ValueKind::String,
        }
    }
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Boolean(v) => v.len(),
            ColumnData::Integer(v) => v.len(),
            ColumnData::Float(v) => v.len(),
            ColumnData::String(v) => v.len(),
        }
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// The same values as `kind`, when that kind is a widening of this one.
    pub fn cast(&self, kind: ValueKind) -> Option<Cow<'_, ColumnData>> {
        Some(match (self, kind) {
            (data, kind) if data.kind() == kind => Cow::Borrowed(data),
            (ColumnData::Boolean(v), ValueKind::Integer) => {
                Cow::Owned(ColumnData::Integer(v.iter().map(|b| *b as i64).collect()))
            }
            (ColumnData::Boolean(v), ValueKind::Float) => {
                Cow::Owned(ColumnData::Float(v.iter().map(|b| *b as u8 as f64).collect()))
            }
            (ColumnData::Integer(v), ValueKind::Float) => {
                Cow::Owned(ColumnData::Float(v.iter().map(|i| *i as f64).collect()))
            }
            _ => return None,
        })
    }
    pub fn as_ref(&self) -> ColumnRef<'_> {
        match self {
            ColumnData::Boolean(v) => ColumnRef::Boolean(v),
            ColumnData::Integer(v) => ColumnRef::Integer(v),
            ColumnData::Float(v) => ColumnRef::Float(v),
            ColumnData::String(v) => ColumnRef::String(v),
        }
    }
}

/// A borrowed view of (part of) a column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColumnRef<'a> {
    Boolean(&'a [bool]),
    Integer(&'a [i64]),
    Float(&'a [f64]),
    String(&'a [String]),
}
impl<'a> ColumnRef<'a> {
    pub fn kind(&self) -> ValueKind {
        match self {
            ColumnRef::Boolean(_) => ValueKind::Boolean,
            ColumnRef::Integer(_) => ValueKind::Integer,
            ColumnRef::Float(_) => ValueKind::Float,
            ColumnRef::String(_) => ValueKind::String,
        }
    }
    pub fn len(&self) -> usize {
        match self {
            ColumnRef::Boolean(v) => v.len(),
            ColumnRef::Integer(v) => v.len(),
            ColumnRef::Float(v) => v.len(),
            ColumnRef::String(v) => v.len(),
        }
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    fn range(&self, from: usize, to: usize) -> ColumnRef<'a> {
        match *self {
            ColumnRef::Boolean(v) => ColumnRef::Boolean(&v[from..to]),
            ColumnRef::Integer(v) => ColumnRef::Integer(&v[from..to]),
            ColumnRef::Float(v) => ColumnRef::Float(&v[from..to]),
            ColumnRef::String(v) => ColumnRef::String(&v[from..to]),
        }
    }
}

// ------------- Column -------------
/// A named store's per-id values: `components × len` elements of one kind.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    data: ColumnData,
    components: usize,
}
impl Column {
    pub fn boolean(values: Vec<bool>) -> Self {
        Self { data: ColumnData::Boolean(values), components: 1 }
    }
    pub fn integer(values: Vec<i64>) -> Self {
        Self { data: ColumnData::Integer(values), components: 1 }
    }
    pub fn float(values: Vec<f64>) -> Self {
        Self { data: ColumnData::Float(values), components: 1 }
    }
    pub fn string<S: Into<String>>(values: Vec<S>) -> Self {
        Self {
            data: ColumnData::String(values.into_iter().map(Into::into).collect()),
            components: 1,
        }
    }
    /// Builds a multi-component column, e.g. a `2 × N` coordinate field,
    /// from component-major data.
    pub fn array(data: ColumnData, components: usize) -> Result<Self> {
        if components == 0 {
            return Err(TagdbError::Schema(
                "a column needs at least one component".into(),
            ));
        }
        if data.len() % components != 0 {
            return Err(TagdbError::Schema(format!(
                "{} values cannot be split into {} components",
                data.len(),
                components
            )));
        }
        Ok(Self { data, components })
    }
    /// Builds a multi-component float column from one row per component.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self> {
        let components = rows.len();
        let len = rows.first().map(Vec::len).unwrap_or(0);
        if rows.iter().any(|row| row.len() != len) {
            return Err(TagdbError::Schema("component rows differ in length".into()));
        }
        Self::array(ColumnData::Float(rows.concat()), components)
    }
    pub fn kind(&self) -> ValueKind {
        self.data.kind()
    }
    pub fn data(&self) -> &ColumnData {
        &self.data
    }
    // only for columns still being built, such as a merge's output
    pub(crate) fn data_mut(&mut self) -> &mut ColumnData {
        &mut self.data
    }
    pub fn components(&self) -> usize {
        self.components
    }
    /// Number of ids covered by the column.
    pub fn len(&self) -> usize {
        self.data.len() / self.components
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// A view of one component of the column; for single-component columns
    /// component 0 is the whole column.
    pub fn component(&self, component: usize) -> Option<ColumnRef<'_>> {
        if component >= self.components {
            return None;
        }
        let len = self.len();
        Some(self.data.as_ref().range(component * len, (component + 1) * len))
    }
    /// The whole column when it has a single component.
    pub fn scalar(&self) -> Option<ColumnRef<'_>> {
        if self.components == 1 { Some(self.data.as_ref()) } else { None }
    }
}
