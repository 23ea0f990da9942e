//! Parsing of query strings of the form
//! `field,field,+tag,...:sort[field_slice][data_slice]`.
//!
//! Fields are conjoined with a precedence looser than any operator inside a
//! field, so `a|b,c` means `(a|b)&(c)`. Fields starting with `+` are
//! pass-through tags that never filter. A field that names an id of the store
//! is shorthand for `id == 'that id'`, and `@path` is shorthand for
//! `file_contains('path', id)`.
//!
//! Inside a field, comparisons bind tighter than `&`, `^` and `|`, so
//! `ra > 1 & night` means `(ra > 1) & night`. Languages where `&` binds
//! tighter than comparisons read it as `ra > (1 & night)`; parenthesized
//! comparisons mean the same under both.

use tracing::debug;

use crate::error::{Result, TagdbError};
use crate::expression::{BinaryOp, Expr};
use crate::slice::Selection;
use crate::store::{ID, Tagdb};

/// A field that takes part in filtering, with the text it was written as.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    text: String,
    expr: Expr,
}
impl Field {
    pub fn text(&self) -> &str {
        &self.text
    }
    pub fn expr(&self) -> &Expr {
        &self.expr
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Query {
    fields: Vec<Field>,
    tags: Vec<String>,
    sort: Option<String>,
    field_slice: Selection,
    data_slice: Selection,
}
impl Query {
    /// Parses a query against a store, which is needed to recognize ids
    /// written as bare fields. A store's default sort field is used when the
    /// query names none.
    pub fn parse(query: &str, db: &Tagdb) -> Result<Query> {
        let (head, rest) = match split_outside(query, ':', 1)?.as_slice() {
            [head] => (head.clone(), None),
            [head, rest] => (head.clone(), Some(rest.clone())),
            _ => return Err(TagdbError::parse(format!("malformed query '{}'", query))),
        };
        if head.trim().is_empty() && rest.as_deref().is_some_and(|r| r.trim().is_empty()) {
            return Err(TagdbError::parse(format!(
                "dangling ':' without fields or sort in query '{}'",
                query
            )));
        }

        let mut fields = Vec::new();
        let mut tags = Vec::new();
        if !head.trim().is_empty() {
            for token in split_outside(&head, ',', usize::MAX)? {
                let token = token.trim();
                if token.is_empty() {
                    return Err(TagdbError::parse(format!("empty field in query '{}'", query)));
                }
                if let Some(tag) = token.strip_prefix('+') {
                    let tag = tag.trim();
                    if tag.is_empty() {
                        return Err(TagdbError::parse(format!(
                            "empty pass-through tag in query '{}'",
                            query
                        )));
                    }
                    tags.push(tag.to_owned());
                } else {
                    fields.push(Field { text: token.to_owned(), expr: rewrite(token, db)? });
                }
            }
        }

        let (sort, field_slice, data_slice) = match rest {
            Some(rest) => parse_rest(&rest)?,
            None => (None, Selection::default(), Selection::default()),
        };
        let sort = sort.or_else(|| db.sort().map(str::to_owned));
        let query = Query { fields, tags, sort, field_slice, data_slice };
        debug!(
            fields = query.fields.len(),
            tags = ?query.tags,
            sort = ?query.sort,
            field_slice = %query.field_slice,
            data_slice = %query.data_slice,
            "parsed query"
        );
        Ok(query)
    }
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }
    pub fn tags(&self) -> &[String] {
        &self.tags
    }
    pub fn sort(&self) -> Option<&str> {
        self.sort.as_deref()
    }
    pub fn field_slice(&self) -> &Selection {
        &self.field_slice
    }
    pub fn data_slice(&self) -> &Selection {
        &self.data_slice
    }
}

fn rewrite(token: &str, db: &Tagdb) -> Result<Expr> {
    if db.contains_id(token) {
        Ok(Expr::binary(BinaryOp::Eq, Expr::column(ID), Expr::string(token)))
    } else if let Some(path) = token.strip_prefix('@') {
        Ok(Expr::Call("file_contains".into(), vec![Expr::string(path), Expr::column(ID)]))
    } else {
        Expr::parse(token)
    }
}

/// Splits the text after the top-level `:` into the sort field, the slice
/// applied to the sort key and the slice applied to the resulting ids.
/// One bracketed group is a data slice; with more, the first one slices the
/// sort key and the others slice the ids.
fn parse_rest(rest: &str) -> Result<(Option<String>, Selection, Selection)> {
    let (sort, groups) = match rest.find('[') {
        Some(at) => (&rest[..at], bracket_groups(&rest[at..])?),
        None => (rest, Vec::new()),
    };
    if sort.contains(']') {
        return Err(TagdbError::parse(format!("unbalanced ']' in '{}'", rest)));
    }
    let sort = Some(sort.trim()).filter(|s| !s.is_empty()).map(str::to_owned);
    let (field_slice, data_slice) = match groups.as_slice() {
        [] => (String::new(), String::new()),
        [data] => (String::new(), data.clone()),
        [field, data @ ..] => (field.clone(), data.concat()),
    };
    Ok((sort, Selection::parse(&field_slice)?, Selection::parse(&data_slice)?))
}

fn bracket_groups(text: &str) -> Result<Vec<String>> {
    let mut groups = Vec::new();
    let mut current: Option<String> = None;
    for (at, c) in text.char_indices() {
        match (c, current.as_mut()) {
            ('[', None) => current = Some(String::from("[")),
            ('[', Some(_)) => {
                return Err(TagdbError::parse_at(format!("nested '[' in '{}'", text), at));
            }
            (']', Some(group)) => {
                group.push(']');
                groups.extend(current.take());
            }
            (']', None) => {
                return Err(TagdbError::parse_at(format!("unbalanced ']' in '{}'", text), at));
            }
            (c, Some(group)) => group.push(c),
            (c, None) if c.is_whitespace() => (),
            (c, None) => {
                return Err(TagdbError::parse_at(
                    format!("unexpected '{}' between slices in '{}'", c, text),
                    at,
                ));
            }
        }
    }
    if current.is_some() {
        return Err(TagdbError::parse(format!("unclosed '[' in '{}'", text)));
    }
    Ok(groups)
}

/// Splits `text` on `separator` wherever it is not enclosed in brackets,
/// parentheses, braces or quotes, producing at most `max_splits + 1` parts.
pub fn split_outside(text: &str, separator: char, max_splits: usize) -> Result<Vec<String>> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut closers: Vec<char> = Vec::new();
    let mut quote: Option<char> = None;
    for (at, c) in text.char_indices() {
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            current.push(c);
            continue;
        }
        match c {
            '\'' | '"' => quote = Some(c),
            '(' => closers.push(')'),
            '[' => closers.push(']'),
            '{' => closers.push('}'),
            ')' | ']' | '}' => {
                if closers.pop() != Some(c) {
                    return Err(TagdbError::parse_at(
                        format!("unbalanced '{}' in '{}'", c, text),
                        at,
                    ));
                }
            }
            c if c == separator && closers.is_empty() && parts.len() < max_splits => {
                parts.push(std::mem::take(&mut current));
                continue;
            }
            _ => (),
        }
        current.push(c);
    }
    if let Some(q) = quote {
        return Err(TagdbError::parse(format!("unclosed {} in '{}'", q, text)));
    }
    if let Some(closer) = closers.last() {
        return Err(TagdbError::parse(format!("missing '{}' in '{}'", closer, text)));
    }
    parts.push(current);
    Ok(parts)
}
