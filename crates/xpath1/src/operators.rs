//! Binary operators: comparisons with node-set semantics, arithmetic, and union.

use super::ast::BinaryOperator;
use super::engine::{XPathValue, string_to_number};
use crate::datasource::DataSourceNode;
use crate::error::XPathError;

/// A single value taking part in a comparison.
#[derive(Debug, Clone, PartialEq)]
enum Atom {
    Str(String),
    Num(f64),
    Bool(bool),
}

impl Atom {
    fn number(&self) -> f64 {
        match self {
            Atom::Str(s) => string_to_number(s),
            Atom::Num(n) => *n,
            Atom::Bool(b) => f64::from(u8::from(*b)),
        }
    }

    fn boolean(&self) -> bool {
        match self {
            Atom::Str(s) => !s.is_empty(),
            Atom::Num(n) => *n != 0.0 && !n.is_nan(),
            Atom::Bool(b) => *b,
        }
    }

    fn string(&self) -> String {
        match self {
            Atom::Str(s) => s.clone(),
            Atom::Num(n) => super::engine::format_number(*n),
            Atom::Bool(b) => b.to_string(),
        }
    }

    fn from_scalar<N>(value: &XPathValue<N>) -> Option<Atom> {
        match value {
            XPathValue::NodeSet(_) => None,
            XPathValue::String(s) => Some(Atom::Str(s.clone())),
            XPathValue::Number(n) => Some(Atom::Num(*n)),
            XPathValue::Boolean(b) => Some(Atom::Bool(*b)),
        }
    }

    /// A node's string value, typed to compare against `other`.
    fn from_node_for(string_value: String, other: &Atom) -> Atom {
        match other {
            Atom::Num(_) => Atom::Num(string_to_number(&string_value)),
            _ => Atom::Str(string_value),
        }
    }
}

/// Applies a binary operator to two evaluated operands.
pub fn evaluate<'a, N: DataSourceNode<'a>>(
    op: BinaryOperator,
    left: XPathValue<N>,
    right: XPathValue<N>,
) -> Result<XPathValue<N>, XPathError> {
    match op {
        BinaryOperator::Or => Ok(XPathValue::Boolean(left.to_bool() || right.to_bool())),
        BinaryOperator::And => Ok(XPathValue::Boolean(left.to_bool() && right.to_bool())),
        BinaryOperator::Equals
        | BinaryOperator::NotEquals
        | BinaryOperator::LessThan
        | BinaryOperator::LessThanOrEqual
        | BinaryOperator::GreaterThan
        | BinaryOperator::GreaterThanOrEqual => Ok(XPathValue::Boolean(compare(op, &left, &right))),
        BinaryOperator::Plus => Ok(XPathValue::Number(left.to_number() + right.to_number())),
        BinaryOperator::Minus => Ok(XPathValue::Number(left.to_number() - right.to_number())),
        BinaryOperator::Multiply => Ok(XPathValue::Number(left.to_number() * right.to_number())),
        BinaryOperator::Divide => Ok(XPathValue::Number(left.to_number() / right.to_number())),
        // Truncating remainder, sign follows the dividend.
        BinaryOperator::Modulo => Ok(XPathValue::Number(left.to_number() % right.to_number())),
        BinaryOperator::Union => union(left, right),
    }
}

fn union<'a, N: DataSourceNode<'a>>(
    left: XPathValue<N>,
    right: XPathValue<N>,
) -> Result<XPathValue<N>, XPathError> {
    match (left, right) {
        (XPathValue::NodeSet(mut l), XPathValue::NodeSet(r)) => {
            l.extend(r);
            l.sort();
            l.dedup();
            Ok(XPathValue::NodeSet(l))
        }
        (l, r) => {
            let offender = if matches!(l, XPathValue::NodeSet(_)) { r } else { l };
            Err(XPathError::TypeError(format!(
                "the operands of '|' must be node-sets, got a {}",
                offender.type_name()
            )))
        }
    }
}

/// XPath 1.0 comparison. A node-set operand compares true if any of its nodes does.
fn compare<'a, N: DataSourceNode<'a>>(
    op: BinaryOperator,
    left: &XPathValue<N>,
    right: &XPathValue<N>,
) -> bool {
    match (left, right) {
        (XPathValue::NodeSet(l), XPathValue::NodeSet(r)) => {
            let right_values: Vec<String> = r.iter().map(|n| n.string_value()).collect();
            l.iter().any(|ln| {
                let lv = ln.string_value();
                right_values.iter().any(|rv| {
                    compare_atoms(op, &Atom::Str(lv.clone()), &Atom::Str(rv.clone()))
                })
            })
        }
        (XPathValue::NodeSet(l), XPathValue::Boolean(b)) => {
            compare_atoms(op, &Atom::Bool(!l.is_empty()), &Atom::Bool(*b))
        }
        (XPathValue::Boolean(b), XPathValue::NodeSet(r)) => {
            compare_atoms(op, &Atom::Bool(*b), &Atom::Bool(!r.is_empty()))
        }
        (XPathValue::NodeSet(l), scalar) => Atom::from_scalar(scalar).is_some_and(|other| {
            l.iter()
                .any(|n| compare_atoms(op, &Atom::from_node_for(n.string_value(), &other), &other))
        }),
        (scalar, XPathValue::NodeSet(r)) => Atom::from_scalar(scalar).is_some_and(|other| {
            r.iter()
                .any(|n| compare_atoms(op, &other, &Atom::from_node_for(n.string_value(), &other)))
        }),
        (l, r) => match (Atom::from_scalar(l), Atom::from_scalar(r)) {
            (Some(a), Some(b)) => compare_atoms(op, &a, &b),
            _ => false,
        },
    }
}

fn compare_atoms(op: BinaryOperator, a: &Atom, b: &Atom) -> bool {
    match op {
        BinaryOperator::Equals | BinaryOperator::NotEquals => {
            let equal = match (a, b) {
                (Atom::Bool(_), _) | (_, Atom::Bool(_)) => a.boolean() == b.boolean(),
                (Atom::Num(_), _) | (_, Atom::Num(_)) => a.number() == b.number(),
                _ => a.string() == b.string(),
            };
            if op == BinaryOperator::Equals { equal } else { !equal }
        }
        BinaryOperator::LessThan => a.number() < b.number(),
        BinaryOperator::LessThanOrEqual => a.number() <= b.number(),
        BinaryOperator::GreaterThan => a.number() > b.number(),
        BinaryOperator::GreaterThanOrEqual => a.number() >= b.number(),
        _ => false,
    }
}
