//! Subscript chains such as `[2:-1][::2]`, parsed with the shared grammar and
//! applied to one-dimensional sequences with Python indexing semantics.

use std::fmt;

use pest::Parser;
use pest::iterators::Pair;

use crate::error::{Result, TagdbError};
use crate::expression::parse_integer;
use crate::grammar::{Rule, TagdbParser};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Item {
    /// A single position, negative counting from the end.
    Position(i64),
    Range {
        start: Option<i64>,
        stop: Option<i64>,
        step: Option<i64>,
    },
}
impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let show = |bound: &Option<i64>| bound.map(|b| b.to_string()).unwrap_or_default();
        match self {
            Item::Position(p) => write!(f, "{}", p),
            Item::Range { start, stop, step: None } => write!(f, "{}:{}", show(start), show(stop)),
            Item::Range { start, stop, step } => {
                write!(f, "{}:{}:{}", show(start), show(stop), show(step))
            }
        }
    }
}

/// One bracketed subscript; it may hold several comma separated items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscript {
    items: Vec<Item>,
}
impl Subscript {
    /// The only item of a subscript addressing a one-dimensional sequence.
    pub fn single(&self) -> Result<Item> {
        match self.items.as_slice() {
            [item] => Ok(*item),
            _ => Err(TagdbError::Evaluation(format!(
                "too many indices in {} for a one-dimensional sequence",
                self
            ))),
        }
    }
}
impl fmt::Display for Subscript {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let items: Vec<String> = self.items.iter().map(Item::to_string).collect();
        write!(f, "[{}]", items.join(","))
    }
}

/// A chain of subscripts applied left to right.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Selection {
    subscripts: Vec<Subscript>,
}
impl Selection {
    /// Parses text such as `[1:3]` or `[::2][0]`. Empty text selects everything.
    pub fn parse(text: &str) -> Result<Selection> {
        if text.trim().is_empty() {
            return Ok(Selection::default());
        }
        let mut pairs = TagdbParser::parse(Rule::subscripts, text).map_err(|e| {
            match TagdbError::from(e) {
                TagdbError::Parse { message, position } => TagdbError::Parse {
                    message: format!("in slice '{}': {}", text, message),
                    position,
                },
                other => other,
            }
        })?;
        let mut subscripts = Vec::new();
        if let Some(root) = pairs.next() {
            for subscript in root.into_inner().filter(|p| p.as_rule() == Rule::subscript) {
                let items = subscript
                    .into_inner()
                    .map(build_item)
                    .collect::<Result<Vec<_>>>()?;
                subscripts.push(Subscript { items });
            }
        }
        Ok(Selection { subscripts })
    }
    pub fn is_empty(&self) -> bool {
        self.subscripts.is_empty()
    }
    pub fn subscripts(&self) -> &[Subscript] {
        &self.subscripts
    }
    /// Applies every subscript in turn to a one-dimensional sequence.
    pub fn apply<T: Clone>(&self, values: Vec<T>) -> Result<Vec<T>> {
        let mut values = values;
        for subscript in &self.subscripts {
            values = select(&values, subscript.single()?)?;
        }
        Ok(values)
    }
}
impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for subscript in &self.subscripts {
            write!(f, "{}", subscript)?;
        }
        Ok(())
    }
}

fn build_item(pair: Pair<Rule>) -> Result<Item> {
    match pair.as_rule() {
        Rule::position => {
            let value = pair
                .into_inner()
                .next()
                .map(|p| parse_integer(p.as_str()))
                .transpose()?
                .ok_or_else(|| TagdbError::parse("empty position"))?;
            Ok(Item::Position(value))
        }
        _ => {
            let (mut start, mut stop, mut step) = (None, None, None);
            for bound in pair.into_inner() {
                let value = bound
                    .clone()
                    .into_inner()
                    .next()
                    .map(|p| parse_integer(p.as_str()))
                    .transpose()?;
                match bound.as_rule() {
                    Rule::start => start = value,
                    Rule::stop => stop = value,
                    _ => step = value,
                }
            }
            Ok(Item::Range { start, stop, step })
        }
    }
}

/// Resolves a possibly negative position against a sequence length.
pub fn resolve_position(position: i64, len: usize) -> Option<usize> {
    let len = len as i64;
    let resolved = if position < 0 { position + len } else { position };
    if (0..len).contains(&resolved) { Some(resolved as usize) } else { None }
}

fn select<T: Clone>(values: &[T], item: Item) -> Result<Vec<T>> {
    match item {
        Item::Position(position) => resolve_position(position, values.len())
            .map(|i| vec![values[i].clone()])
            .ok_or_else(|| {
                TagdbError::Evaluation(format!(
                    "index {} is out of bounds for {} ids",
                    position,
                    values.len()
                ))
            }),
        Item::Range { start, stop, step } => {
            let indices = range_indices(values.len(), start, stop, step)?;
            Ok(indices.into_iter().map(|i| values[i].clone()).collect())
        }
    }
}

/// The positions a `start:stop:step` slice picks out of `len` elements.
pub fn range_indices(
    len: usize,
    start: Option<i64>,
    stop: Option<i64>,
    step: Option<i64>,
) -> Result<Vec<usize>> {
    let step = step.unwrap_or(1);
    if step == 0 {
        return Err(TagdbError::Evaluation("slice step cannot be zero".into()));
    }
    let len = len as i64;
    // clamp the way Python does, which differs for negative steps
    let clamp = |bound: i64, low: i64, high: i64| {
        let bound = if bound < 0 { bound + len } else { bound };
        bound.clamp(low, high)
    };
    let mut indices = Vec::new();
    if step > 0 {
        let from = start.map(|b| clamp(b, 0, len)).unwrap_or(0);
        let to = stop.map(|b| clamp(b, 0, len)).unwrap_or(len);
        let mut i = from;
        while i < to {
            indices.push(i as usize);
            match i.checked_add(step) {
                Some(next) => i = next,
                None => break,
            }
        }
    } else {
        let from = start.map(|b| clamp(b, -1, len - 1)).unwrap_or(len - 1);
        let to = stop.map(|b| clamp(b, -1, len - 1)).unwrap_or(-1);
        let mut i = from;
        while i > to {
            indices.push(i as usize);
            match i.checked_add(step) {
                Some(next) => i = next,
                None => break,
            }
        }
    }
    Ok(indices)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn letters() -> Vec<char> {
        "abcdef".chars().collect()
    }

    #[test]
    fn python_slicing() {
        let pick = |text: &str| -> String {
            Selection::parse(text).unwrap().apply(letters()).unwrap().into_iter().collect()
        };
        assert_eq!(pick("[1:3]"), "bc");
        assert_eq!(pick("[-2:]"), "ef");
        assert_eq!(pick("[::-1]"), "fedcba");
        assert_eq!(pick("[::2]"), "ace");
        assert_eq!(pick("[4:1:-2]"), "ec");
        assert_eq!(pick("[-1]"), "f");
        assert_eq!(pick("[10:]"), "");
        assert_eq!(pick("[1:][::2]"), "bdf");
        assert_eq!(pick(""), "abcdef");
    }

    #[test]
    fn rejects_bad_subscripts() {
        assert!(matches!(Selection::parse("[a:b]"), Err(TagdbError::Parse { .. })));
        assert!(matches!(Selection::parse("[1:2"), Err(TagdbError::Parse { .. })));
        let zero_step = Selection::parse("[::0]").unwrap();
        assert!(zero_step.apply(letters()).is_err());
        let out_of_range = Selection::parse("[6]").unwrap();
        assert!(matches!(out_of_range.apply(letters()), Err(TagdbError::Evaluation(_))));
        let two_dimensional = Selection::parse("[0,1]").unwrap();
        assert!(two_dimensional.apply(letters()).is_err());
    }

    #[test]
    fn huge_steps() {
        assert_eq!(range_indices(3, Some(1), None, Some(i64::MAX)).unwrap(), vec![1]);
        assert_eq!(range_indices(3, None, None, Some(i64::MIN)).unwrap(), vec![2]);
        let pick = Selection::parse("[1::9223372036854775807]").unwrap();
        assert_eq!(pick.apply(letters()).unwrap(), vec!['b']);
    }
}
