//! The fixed table of functions a query may call.

use std::borrow::Cow;
use std::collections::HashSet;
use std::path::Path;

use crate::column::{Column, ColumnRef};
use crate::error::{Result, TagdbError};
use crate::evaluate::{Lane, Value};
use crate::text::read_reference_list;

pub type BuiltinFn = for<'a> fn(usize, Vec<Value<'a>>) -> Result<Value<'a>>;

pub struct Builtin {
    pub name: &'static str,
    pub arity: usize,
    pub call: BuiltinFn,
}

pub static BUILTINS: &[Builtin] = &[
    Builtin { name: "hits", arity: 2, call: hits },
    Builtin { name: "file_contains", arity: 2, call: file_contains },
    Builtin { name: "abs", arity: 1, call: abs },
    Builtin { name: "isnan", arity: 1, call: isnan },
    Builtin { name: "isfinite", arity: 1, call: isfinite },
];

fn argument_error(function: &str, expected: &str, got: &Value) -> TagdbError {
    TagdbError::Evaluation(format!(
        "'{}' expects {} but got a {}",
        function,
        expected,
        got.describe()
    ))
}

// ------------- Polygons -------------
/// `hits(polygon, coords)`: whether each id's point lies inside the polygon.
/// The polygon is a list of `[x, y]` corners, the coordinates a `2 x N`
/// numeric column.
fn hits<'a>(n: usize, args: Vec<Value<'a>>) -> Result<Value<'a>> {
    let mut args = args.into_iter();
    let (polygon, coords) = match (args.next(), args.next()) {
        (Some(polygon), Some(coords)) => (polygon, coords),
        _ => return Err(TagdbError::Evaluation("'hits' takes 2 arguments".into())),
    };
    let corners = polygon_corners(&polygon)?;
    let column = match coords {
        Value::Components(column) if column.components() == 2 => column,
        other => return Err(argument_error("hits", "a 2 x N coordinate column", &other)),
    };
    let xs = coordinates(column, 0)?;
    let ys = coordinates(column, 1)?;
    if xs.len() != n {
        return Err(TagdbError::Evaluation(format!(
            "shape mismatch: {} coordinates where {} ids were expected",
            xs.len(),
            n
        )));
    }
    let inside = xs
        .iter()
        .zip(ys.iter())
        .map(|(x, y)| point_in_polygon(&corners, (*x, *y)))
        .collect();
    Ok(Value::Boolean(Lane::Vector(Cow::Owned(inside))))
}

fn polygon_corners(polygon: &Value) -> Result<Vec<(f64, f64)>> {
    let expected = "a list of [x, y] corners";
    let items = match polygon {
        Value::List(items) if items.len() >= 3 => items,
        other => return Err(argument_error("hits", expected, other)),
    };
    items
        .iter()
        .map(|item| match item {
            Value::List(pair) => match pair.as_slice() {
                [x, y] => x
                    .as_number()
                    .zip(y.as_number())
                    .ok_or_else(|| argument_error("hits", expected, item)),
                _ => Err(argument_error("hits", expected, item)),
            },
            other => Err(argument_error("hits", expected, other)),
        })
        .collect()
}

fn coordinates(column: &Column, component: usize) -> Result<Vec<f64>> {
    match column.component(component) {
        Some(ColumnRef::Float(values)) => Ok(values.to_vec()),
        Some(ColumnRef::Integer(values)) => Ok(values.iter().map(|i| *i as f64).collect()),
        _ => Err(TagdbError::Evaluation(format!(
            "'hits' needs numeric coordinates, not {}",
            column.kind()
        ))),
    }
}

/// Even-odd rule: a point is inside when a ray from it crosses the polygon's
/// edges an odd number of times.
pub fn point_in_polygon(corners: &[(f64, f64)], (x, y): (f64, f64)) -> bool {
    let mut inside = false;
    let mut j = corners.len().wrapping_sub(1);
    for (i, &(xi, yi)) in corners.iter().enumerate() {
        let (xj, yj) = corners[j];
        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

// ------------- Membership -------------
/// `file_contains(path, ids)`: whether each id is listed in the file.
fn file_contains<'a>(n: usize, args: Vec<Value<'a>>) -> Result<Value<'a>> {
    let mut args = args.into_iter();
    let path = match args.next() {
        Some(Value::String(Lane::Scalar(path))) => path,
        Some(other) => return Err(argument_error("file_contains", "a file name", &other)),
        None => return Err(TagdbError::Evaluation("'file_contains' takes 2 arguments".into())),
    };
    let listed: HashSet<String> = read_reference_list(Path::new(&path))?.into_iter().collect();
    match args.next() {
        Some(Value::String(ids)) => Ok(Value::Boolean(ids.map(n, |id| listed.contains(id))?)),
        Some(other) => Err(argument_error("file_contains", "string ids", &other)),
        None => Err(TagdbError::Evaluation("'file_contains' takes 2 arguments".into())),
    }
}

// ------------- Numeric helpers -------------
fn single<'a>(function: &str, args: Vec<Value<'a>>) -> Result<Value<'a>> {
    args.into_iter()
        .next()
        .ok_or_else(|| TagdbError::Evaluation(format!("'{}' takes 1 argument", function)))
}

fn abs<'a>(n: usize, args: Vec<Value<'a>>) -> Result<Value<'a>> {
    match single("abs", args)? {
        Value::Integer(lane) => Ok(Value::Integer(lane.map(n, |i| i.wrapping_abs())?)),
        Value::Float(lane) => Ok(Value::Float(lane.map(n, |x| x.abs())?)),
        other => Err(argument_error("abs", "a number", &other)),
    }
}

fn isnan<'a>(n: usize, args: Vec<Value<'a>>) -> Result<Value<'a>> {
    match single("isnan", args)? {
        Value::Integer(lane) => Ok(Value::Boolean(lane.map(n, |_| false)?)),
        Value::Float(lane) => Ok(Value::Boolean(lane.map(n, |x| x.is_nan())?)),
        other => Err(argument_error("isnan", "a number", &other)),
    }
}

fn isfinite<'a>(n: usize, args: Vec<Value<'a>>) -> Result<Value<'a>> {
    match single("isfinite", args)? {
        Value::Integer(lane) => Ok(Value::Boolean(lane.map(n, |_| true)?)),
        Value::Float(lane) => Ok(Value::Boolean(lane.map(n, |x| x.is_finite())?)),
        other => Err(argument_error("isfinite", "a number", &other)),
    }
}

#[cfg(test)]
mod tests {
    use super::point_in_polygon;

    #[test]
    fn unit_square() {
        let square = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)];
        assert!(point_in_polygon(&square, (0.5, 0.5)));
        assert!(!point_in_polygon(&square, (1.5, 0.5)));
        assert!(!point_in_polygon(&square, (0.5, -0.1)));
    }

    #[test]
    fn concave_polygon() {
        // a "U" shape opening upwards
        let u = [(0.0, 0.0), (3.0, 0.0), (3.0, 3.0), (2.0, 3.0), (2.0, 1.0), (1.0, 1.0), (1.0, 3.0), (0.0, 3.0)];
        assert!(point_in_polygon(&u, (0.5, 2.0)));
        assert!(!point_in_polygon(&u, (1.5, 2.0)));
        assert!(point_in_polygon(&u, (1.5, 0.5)));
    }
}
