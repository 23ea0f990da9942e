//! Elementwise evaluation of query fields against a store.
//!
//! Every evaluation builds an immutable [`Scope`] binding the store's columns
//! and the builtin function table. Nothing outside that scope can be reached
//! from a query, and nothing in it is ever written to.

use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::HashMap;

use tracing::trace;

use crate::builtins::{BUILTINS, Builtin};
use crate::column::{Column, ColumnRef};
use crate::error::{Result, TagdbError};
use crate::expression::{BinaryOp, Expr, Literal, UnaryOp};
use crate::query::Field;
use crate::slice::resolve_position;
use crate::store::{ColumnHasher, Tagdb};

// ------------- Values -------------
/// Either one value broadcast over all ids, or one value per id.
#[derive(Debug, Clone)]
pub enum Lane<'a, T: Clone> {
    Scalar(T),
    Vector(Cow<'a, [T]>),
}
impl<'a, T: Clone> Lane<'a, T> {
    pub fn get(&self, i: usize) -> &T {
        match self {
            Lane::Scalar(value) => value,
            Lane::Vector(values) => &values[i],
        }
    }
    pub fn map<R: Clone>(&self, n: usize, f: impl Fn(&T) -> R) -> Result<Lane<'a, R>> {
        Ok(match self {
            Lane::Scalar(value) => Lane::Scalar(f(value)),
            Lane::Vector(values) => {
                check_length(values.len(), n)?;
                Lane::Vector(Cow::Owned(values.iter().map(f).collect()))
            }
        })
    }
    /// Expands the lane to exactly `n` values.
    pub fn into_vec(self, n: usize) -> Result<Vec<T>> {
        match self {
            Lane::Scalar(value) => Ok(vec![value; n]),
            Lane::Vector(values) => {
                check_length(values.len(), n)?;
                Ok(values.into_owned())
            }
        }
    }
}

fn check_length(len: usize, n: usize) -> Result<()> {
    if len == n {
        Ok(())
    } else {
        Err(TagdbError::Evaluation(format!(
            "shape mismatch: {} values where {} ids were expected",
            len, n
        )))
    }
}

fn zip<'a, A: Clone, B: Clone, R: Clone>(
    n: usize,
    a: &Lane<'a, A>,
    b: &Lane<'a, B>,
    f: impl Fn(&A, &B) -> R,
) -> Result<Lane<'a, R>> {
    if let (Lane::Scalar(a), Lane::Scalar(b)) = (a, b) {
        return Ok(Lane::Scalar(f(a, b)));
    }
    for lane_len in [vector_len(a), vector_len(b)].into_iter().flatten() {
        check_length(lane_len, n)?;
    }
    Ok(Lane::Vector(Cow::Owned((0..n).map(|i| f(a.get(i), b.get(i))).collect())))
}

fn vector_len<T: Clone>(lane: &Lane<'_, T>) -> Option<usize> {
    match lane {
        Lane::Scalar(_) => None,
        Lane::Vector(values) => Some(values.len()),
    }
}

/// Intermediate result of evaluating (part of) an expression.
#[derive(Debug, Clone)]
pub enum Value<'a> {
    Boolean(Lane<'a, bool>),
    Integer(Lane<'a, i64>),
    Float(Lane<'a, f64>),
    String(Lane<'a, String>),
    /// A multi-component column, usable whole by builtins or one component
    /// at a time through `name[k]`.
    Components(&'a Column),
    List(Vec<Value<'a>>),
}
impl<'a> Value<'a> {
    pub fn describe(&self) -> String {
        let shape = |lane_is_scalar: bool| if lane_is_scalar { "scalar" } else { "per-id" };
        match self {
            Value::Boolean(l) => format!("{} boolean", shape(vector_len(l).is_none())),
            Value::Integer(l) => format!("{} integer", shape(vector_len(l).is_none())),
            Value::Float(l) => format!("{} float", shape(vector_len(l).is_none())),
            Value::String(l) => format!("{} string", shape(vector_len(l).is_none())),
            Value::Components(c) => format!("{} x N {} array", c.components(), c.kind()),
            Value::List(items) => format!("list of {} items", items.len()),
        }
    }
    fn from_column(column: ColumnRef<'a>) -> Value<'a> {
        match column {
            ColumnRef::Boolean(v) => Value::Boolean(Lane::Vector(Cow::Borrowed(v))),
            ColumnRef::Integer(v) => Value::Integer(Lane::Vector(Cow::Borrowed(v))),
            ColumnRef::Float(v) => Value::Float(Lane::Vector(Cow::Borrowed(v))),
            ColumnRef::String(v) => Value::String(Lane::Vector(Cow::Borrowed(v))),
        }
    }
    fn from_literal(literal: &Literal) -> Value<'a> {
        match literal {
            Literal::Boolean(b) => Value::Boolean(Lane::Scalar(*b)),
            Literal::Integer(i) => Value::Integer(Lane::Scalar(*i)),
            Literal::Float(x) => Value::Float(Lane::Scalar(*x)),
            Literal::String(s) => Value::String(Lane::Scalar(s.clone())),
        }
    }
    /// A plain number, used for list literals such as polygon corners.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Integer(Lane::Scalar(i)) => Some(*i as f64),
            Value::Float(Lane::Scalar(x)) => Some(*x),
            _ => None,
        }
    }
}

// numbers after promoting booleans to integers
enum Numeric<'a> {
    Integer(Lane<'a, i64>),
    Float(Lane<'a, f64>),
}
impl<'a> Numeric<'a> {
    fn from_value(value: Value<'a>, n: usize) -> Result<Option<Numeric<'a>>> {
        Ok(match value {
            Value::Boolean(lane) => Some(Numeric::Integer(lane.map(n, |b| *b as i64)?)),
            Value::Integer(lane) => Some(Numeric::Integer(lane)),
            Value::Float(lane) => Some(Numeric::Float(lane)),
            _ => None,
        })
    }
    fn into_float(self, n: usize) -> Result<Lane<'a, f64>> {
        match self {
            Numeric::Integer(lane) => lane.map(n, |i| *i as f64),
            Numeric::Float(lane) => Ok(lane),
        }
    }
}

// ------------- Scope -------------
/// The names a query can see: the store's columns and the builtins.
pub struct Scope<'a> {
    len: usize,
    columns: HashMap<&'a str, &'a Column, ColumnHasher>,
    builtins: HashMap<&'static str, &'static Builtin, ColumnHasher>,
}
impl<'a> Scope<'a> {
    pub fn new(db: &'a Tagdb) -> Self {
        Self {
            len: db.len(),
            columns: db.columns().collect(),
            builtins: BUILTINS.iter().map(|builtin| (builtin.name, builtin)).collect(),
        }
    }
    pub fn len(&self) -> usize {
        self.len
    }
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
    pub fn evaluate(&self, expr: &Expr) -> Result<Value<'a>> {
        match expr {
            Expr::Literal(literal) => Ok(Value::from_literal(literal)),
            Expr::Column(name) => self.resolve(name),
            Expr::Component(inner, k) => match self.evaluate(inner)? {
                Value::Components(column) => resolve_position(*k, column.components())
                    .and_then(|k| column.component(k))
                    .map(Value::from_column)
                    .ok_or_else(|| {
                        TagdbError::Evaluation(format!(
                            "component {} is out of bounds for '{}' with {} components",
                            k,
                            inner,
                            column.components()
                        ))
                    }),
                other => Err(TagdbError::Evaluation(format!(
                    "'{}' is a {} and has no components to index",
                    inner,
                    other.describe()
                ))),
            },
            Expr::Call(name, args) => {
                let builtin = self.builtins.get(name.as_str()).ok_or_else(|| {
                    TagdbError::Evaluation(format!("unknown function '{}'", name))
                })?;
                if args.len() != builtin.arity {
                    return Err(TagdbError::Evaluation(format!(
                        "'{}' takes {} arguments but {} were given",
                        name,
                        builtin.arity,
                        args.len()
                    )));
                }
                let args = args
                    .iter()
                    .map(|arg| self.evaluate(arg))
                    .collect::<Result<Vec<_>>>()?;
                (builtin.call)(self.len, args)
            }
            Expr::List(items) => Ok(Value::List(
                items.iter().map(|item| self.evaluate(item)).collect::<Result<Vec<_>>>()?,
            )),
            Expr::Unary(op, inner) => unary(*op, self.evaluate(inner)?, self.len),
            Expr::Binary(op, lhs, rhs) => {
                binary(*op, self.evaluate(lhs)?, self.evaluate(rhs)?, self.len)
            }
        }
    }
    fn resolve(&self, name: &str) -> Result<Value<'a>> {
        match self.columns.get(name) {
            Some(column) => Ok(match column.scalar() {
                Some(values) => Value::from_column(values),
                None => Value::Components(column),
            }),
            None if self.builtins.contains_key(name) => Err(TagdbError::Evaluation(format!(
                "function '{}' used without being called",
                name
            ))),
            None => Err(TagdbError::Evaluation(format!("unknown column '{}'", name))),
        }
    }
    /// Evaluates one field to a boolean mask over all ids.
    pub fn mask(&self, field: &Field) -> Result<Vec<bool>> {
        let value = self.evaluate(field.expr()).map_err(|e| match e {
            TagdbError::Evaluation(message) => {
                TagdbError::Evaluation(format!("in field '{}': {}", field.text(), message))
            }
            other => other,
        })?;
        match value {
            Value::Boolean(lane) => lane.into_vec(self.len),
            other => Err(TagdbError::Evaluation(format!(
                "field '{}' is a {}, not a boolean mask",
                field.text(),
                other.describe()
            ))),
        }
    }
}

/// The conjunction of all fields; every id passes when there are none.
pub fn evaluate_fields(db: &Tagdb, fields: &[Field]) -> Result<Vec<bool>> {
    let scope = Scope::new(db);
    let mut mask = vec![true; db.len()];
    for field in fields {
        let field_mask = scope.mask(field)?;
        for (kept, passes) in mask.iter_mut().zip(field_mask) {
            *kept &= passes;
        }
        trace!(field = field.text(), remaining = mask.iter().filter(|k| **k).count(), "field applied");
    }
    Ok(mask)
}

// ------------- Operators -------------
fn unary<'a>(op: UnaryOp, value: Value<'a>, n: usize) -> Result<Value<'a>> {
    match (op, value) {
        (UnaryOp::Neg, Value::Integer(lane)) => Ok(Value::Integer(lane.map(n, |i| i.wrapping_neg())?)),
        (UnaryOp::Neg, Value::Float(lane)) => Ok(Value::Float(lane.map(n, |x| -x)?)),
        (UnaryOp::Not, Value::Boolean(lane)) => Ok(Value::Boolean(lane.map(n, |b| !b)?)),
        (UnaryOp::Not, Value::Integer(lane)) => Ok(Value::Integer(lane.map(n, |i| !i)?)),
        (op, other) => Err(TagdbError::Evaluation(format!(
            "'{}' cannot be applied to a {}",
            match op {
                UnaryOp::Neg => "-",
                UnaryOp::Not => "~",
            },
            other.describe()
        ))),
    }
}

fn binary<'a>(op: BinaryOp, lhs: Value<'a>, rhs: Value<'a>, n: usize) -> Result<Value<'a>> {
    let mismatch = |lhs: &Value, rhs: &Value| {
        TagdbError::Evaluation(format!(
            "'{}' cannot combine a {} with a {}",
            op.symbol(),
            lhs.describe(),
            rhs.describe()
        ))
    };
    if op.is_comparison() {
        if let (Value::String(a), Value::String(b)) = (&lhs, &rhs) {
            return Ok(Value::Boolean(zip(n, a, b, |a, b| ordered(op, a.cmp(b)))?));
        }
    }
    if op.is_logical() {
        if let (Value::Boolean(a), Value::Boolean(b)) = (&lhs, &rhs) {
            return Ok(Value::Boolean(zip(n, a, b, |a, b| match op {
                BinaryOp::Or => a | b,
                BinaryOp::Xor => a ^ b,
                _ => a & b,
            })?));
        }
    }
    let error = mismatch(&lhs, &rhs);
    let (a, b) = match (Numeric::from_value(lhs, n)?, Numeric::from_value(rhs, n)?) {
        (Some(a), Some(b)) => (a, b),
        _ => return Err(error),
    };
    match (a, b) {
        (Numeric::Integer(a), Numeric::Integer(b)) => integer_op(op, &a, &b, n),
        (_, _) if op.is_logical() => Err(error),
        (a, b) => float_op(op, &a.into_float(n)?, &b.into_float(n)?, n),
    }
}

fn ordered(op: BinaryOp, ordering: Ordering) -> bool {
    match op {
        BinaryOp::Eq => ordering == Ordering::Equal,
        BinaryOp::Ne => ordering != Ordering::Equal,
        BinaryOp::Lt => ordering == Ordering::Less,
        BinaryOp::Le => ordering != Ordering::Greater,
        BinaryOp::Gt => ordering == Ordering::Greater,
        _ => ordering != Ordering::Less,
    }
}

fn integer_op<'a>(op: BinaryOp, a: &Lane<'a, i64>, b: &Lane<'a, i64>, n: usize) -> Result<Value<'a>> {
    Ok(match op {
        BinaryOp::Or => Value::Integer(zip(n, a, b, |a, b| a | b)?),
        BinaryOp::Xor => Value::Integer(zip(n, a, b, |a, b| a ^ b)?),
        BinaryOp::And => Value::Integer(zip(n, a, b, |a, b| a & b)?),
        BinaryOp::Add => Value::Integer(zip(n, a, b, |a, b| a.wrapping_add(*b))?),
        BinaryOp::Sub => Value::Integer(zip(n, a, b, |a, b| a.wrapping_sub(*b))?),
        BinaryOp::Mul => Value::Integer(zip(n, a, b, |a, b| a.wrapping_mul(*b))?),
        BinaryOp::Div => Value::Float(zip(n, a, b, |a, b| *a as f64 / *b as f64)?),
        BinaryOp::Rem => {
            let zero_divisor = match b {
                Lane::Scalar(b) => *b == 0,
                Lane::Vector(values) => values.contains(&0),
            };
            if zero_divisor {
                return Err(TagdbError::Evaluation("integer modulo by zero".into()));
            }
            // the result takes the sign of the divisor
            Value::Integer(zip(n, a, b, |a, b| a.wrapping_rem(*b).wrapping_add(*b).wrapping_rem(*b))?)
        }
        op => Value::Boolean(zip(n, a, b, |a, b| ordered(op, a.cmp(b)))?),
    })
}

fn float_op<'a>(op: BinaryOp, a: &Lane<'a, f64>, b: &Lane<'a, f64>, n: usize) -> Result<Value<'a>> {
    Ok(match op {
        BinaryOp::Add => Value::Float(zip(n, a, b, |a, b| a + b)?),
        BinaryOp::Sub => Value::Float(zip(n, a, b, |a, b| a - b)?),
        BinaryOp::Mul => Value::Float(zip(n, a, b, |a, b| a * b)?),
        BinaryOp::Div => Value::Float(zip(n, a, b, |a, b| a / b)?),
        BinaryOp::Rem => Value::Float(zip(n, a, b, |a, b| {
            let r = a % b;
            if r != 0.0 && (r < 0.0) != (*b < 0.0) { r + b } else { r }
        })?),
        // NaN compares unequal to everything
        BinaryOp::Ne => Value::Boolean(zip(n, a, b, |a, b| a != b)?),
        op => Value::Boolean(zip(n, a, b, |a, b| {
            a.partial_cmp(b).is_some_and(|ordering| ordered(op, ordering))
        })?),
    })
}
