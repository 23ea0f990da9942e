//! Typed syntax tree for a single query field.
//!
//! A field is parsed once into an [`Expr`] over a closed set of operators.
//! Names are not resolved here; that happens against a store's columns and
//! the builtin table when the expression is evaluated.

use std::fmt;

use lazy_static::lazy_static;
use pest::Parser;
use pest::iterators::{Pair, Pairs};
use pest::pratt_parser::{Assoc, Op, PrattParser};

use crate::error::{Result, TagdbError};
use crate::grammar::{Rule, TagdbParser};

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}
impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Literal::Boolean(b) => write!(f, "{}", if *b { "True" } else { "False" }),
            Literal::Integer(i) => write!(f, "{}", i),
            Literal::Float(x) => write!(f, "{}", x),
            Literal::String(s) => write!(f, "'{}'", s),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    Xor,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}
impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Or => "|",
            BinaryOp::Xor => "^",
            BinaryOp::And => "&",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
        }
    }
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }
    pub fn is_logical(&self) -> bool {
        matches!(self, BinaryOp::Or | BinaryOp::Xor | BinaryOp::And)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    Column(String),
    /// One component of a multi-component column, `pos[1]`.
    Component(Box<Expr>, i64),
    Call(String, Vec<Expr>),
    List(Vec<Expr>),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
}
impl Expr {
    pub fn column(name: impl Into<String>) -> Expr {
        Expr::Column(name.into())
    }
    pub fn string(value: impl Into<String>) -> Expr {
        Expr::Literal(Literal::String(value.into()))
    }
    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
        Expr::Binary(op, Box::new(lhs), Box::new(rhs))
    }
    /// Parses the text of one field.
    pub fn parse(text: &str) -> Result<Expr> {
        let mut pairs = TagdbParser::parse(Rule::field, text).map_err(|e| {
            let error = TagdbError::from(e);
            match error {
                TagdbError::Parse { message, position } => TagdbError::Parse {
                    message: format!("in field '{}': {}", text, message),
                    position,
                },
                other => other,
            }
        })?;
        let field = pairs
            .next()
            .ok_or_else(|| TagdbError::parse(format!("empty field '{}'", text)))?;
        let expr = field
            .into_inner()
            .find(|pair| pair.as_rule() == Rule::expr)
            .ok_or_else(|| TagdbError::parse(format!("empty field '{}'", text)))?;
        build_expr(expr.into_inner())
    }
}
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Expr::Literal(literal) => write!(f, "{}", literal),
            Expr::Column(name) => write!(f, "{}", name),
            Expr::Component(inner, k) => write!(f, "{}[{}]", inner, k),
            Expr::Call(name, args) => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Expr::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Expr::Unary(UnaryOp::Neg, inner) => write!(f, "-{}", inner),
            Expr::Unary(UnaryOp::Not, inner) => write!(f, "~{}", inner),
            Expr::Binary(op, lhs, rhs) => write!(f, "({} {} {})", lhs, op.symbol(), rhs),
        }
    }
}

lazy_static! {
    // loosest binding first
    static ref PRATT: PrattParser<Rule> = PrattParser::new()
        .op(Op::infix(Rule::or, Assoc::Left))
        .op(Op::infix(Rule::xor, Assoc::Left))
        .op(Op::infix(Rule::and, Assoc::Left))
        .op(Op::infix(Rule::eq, Assoc::Left)
            | Op::infix(Rule::ne, Assoc::Left)
            | Op::infix(Rule::lt, Assoc::Left)
            | Op::infix(Rule::le, Assoc::Left)
            | Op::infix(Rule::gt, Assoc::Left)
            | Op::infix(Rule::ge, Assoc::Left))
        .op(Op::infix(Rule::add, Assoc::Left) | Op::infix(Rule::sub, Assoc::Left))
        .op(Op::infix(Rule::mul, Assoc::Left)
            | Op::infix(Rule::div, Assoc::Left)
            | Op::infix(Rule::rem, Assoc::Left))
        .op(Op::prefix(Rule::neg) | Op::prefix(Rule::not))
        .op(Op::postfix(Rule::component));
}

fn build_expr(pairs: Pairs<Rule>) -> Result<Expr> {
    PRATT
        .map_primary(build_primary)
        .map_prefix(|op, rhs| {
            let op = match op.as_rule() {
                Rule::neg => UnaryOp::Neg,
                _ => UnaryOp::Not,
            };
            Ok(Expr::Unary(op, Box::new(rhs?)))
        })
        .map_postfix(|lhs, op| {
            let index = op
                .into_inner()
                .next()
                .map(|pair| parse_integer(pair.as_str()))
                .transpose()?
                .ok_or_else(|| TagdbError::parse("component index without a value"))?;
            Ok(Expr::Component(Box::new(lhs?), index))
        })
        .map_infix(|lhs, op, rhs| {
            let op = match op.as_rule() {
                Rule::or => BinaryOp::Or,
                Rule::xor => BinaryOp::Xor,
                Rule::and => BinaryOp::And,
                Rule::eq => BinaryOp::Eq,
                Rule::ne => BinaryOp::Ne,
                Rule::lt => BinaryOp::Lt,
                Rule::le => BinaryOp::Le,
                Rule::gt => BinaryOp::Gt,
                Rule::ge => BinaryOp::Ge,
                Rule::add => BinaryOp::Add,
                Rule::sub => BinaryOp::Sub,
                Rule::mul => BinaryOp::Mul,
                Rule::div => BinaryOp::Div,
                _ => BinaryOp::Rem,
            };
            Ok(Expr::binary(op, lhs?, rhs?))
        })
        .parse(pairs)
}

fn build_primary(pair: Pair<Rule>) -> Result<Expr> {
    match pair.as_rule() {
        Rule::expr => build_expr(pair.into_inner()),
        Rule::integer => Ok(Expr::Literal(Literal::Integer(parse_integer(pair.as_str())?))),
        Rule::float => pair
            .as_str()
            .parse::<f64>()
            .map(|x| Expr::Literal(Literal::Float(x)))
            .map_err(|e| TagdbError::parse(format!("bad float '{}': {}", pair.as_str(), e))),
        Rule::nan => Ok(Expr::Literal(Literal::Float(f64::NAN))),
        Rule::inf => Ok(Expr::Literal(Literal::Float(f64::INFINITY))),
        Rule::boolean => Ok(Expr::Literal(Literal::Boolean(matches!(
            pair.as_str(),
            "True" | "true"
        )))),
        Rule::string => {
            let quoted = pair.as_str();
            Ok(Expr::string(&quoted[1..quoted.len() - 1]))
        }
        Rule::name => Ok(Expr::column(pair.as_str())),
        Rule::call => {
            let mut inner = pair.into_inner();
            let name = inner
                .next()
                .map(|p| p.as_str().to_owned())
                .ok_or_else(|| TagdbError::parse("function call without a name"))?;
            let args = inner
                .map(|arg| build_expr(arg.into_inner()))
                .collect::<Result<Vec<_>>>()?;
            Ok(Expr::Call(name, args))
        }
        Rule::list => {
            let items = pair
                .into_inner()
                .map(|item| build_expr(item.into_inner()))
                .collect::<Result<Vec<_>>>()?;
            Ok(Expr::List(items))
        }
        rule => Err(TagdbError::parse(format!(
            "unexpected {:?} '{}'",
            rule,
            pair.as_str()
        ))),
    }
}

pub(crate) fn parse_integer(text: &str) -> Result<i64> {
    text.parse::<i64>()
        .map_err(|e| TagdbError::parse(format!("bad integer '{}': {}", text, e)))
}
