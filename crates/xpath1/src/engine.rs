//! The evaluation engine for executing a parsed XPath AST against a generic `DataSourceNode`.

use super::ast::{Axis, BinaryOperator, Expression, LocationPath, NodeTest, NodeTypeTest, Step, UnaryOperator};
use super::functions::{self, FunctionRegistry};
use super::{axes, operators};
use crate::datasource::{DataSourceNode, NodeType, XML_NAMESPACE};
use crate::error::XPathError;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

/// Represents the possible result types of an XPath expression evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum XPathValue<N> {
    NodeSet(Vec<N>),
    String(String),
    Number(f64),
    Boolean(bool),
}

impl<'a, N: DataSourceNode<'a>> XPathValue<N> {
    /// Coerces the XPath value to a boolean as per XPath 1.0 rules.
    pub fn to_bool(&self) -> bool {
        match self {
            XPathValue::NodeSet(nodes) => !nodes.is_empty(),
            XPathValue::String(s) => !s.is_empty(),
            XPathValue::Number(n) => *n != 0.0 && !n.is_nan(),
            XPathValue::Boolean(b) => *b,
        }
    }

    /// Coerces the XPath value to a number as per XPath 1.0 rules.
    pub fn to_number(&self) -> f64 {
        match self {
            XPathValue::Number(n) => *n,
            XPathValue::Boolean(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            other => string_to_number(&other.to_string()),
        }
    }

    /// A short name for the value's type, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            XPathValue::NodeSet(_) => "node-set",
            XPathValue::String(_) => "string",
            XPathValue::Number(_) => "number",
            XPathValue::Boolean(_) => "boolean",
        }
    }
}

impl<'a, N: DataSourceNode<'a>> fmt::Display for XPathValue<N> {
    /// Coerces the XPath value to a string as per XPath 1.0 rules.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            XPathValue::NodeSet(nodes) => write!(
                f,
                "{}",
                nodes.iter().min().map(|n| n.string_value()).unwrap_or_default()
            ),
            XPathValue::String(s) => write!(f, "{}", s),
            XPathValue::Number(n) => write!(f, "{}", format_number(*n)),
            XPathValue::Boolean(b) => write!(f, "{}", b),
        }
    }
}

/// Parses a string the way XPath's `number()` does: optional minus, digits, at most one
/// dot, surrounding whitespace allowed. Anything else is NaN.
pub fn string_to_number(s: &str) -> f64 {
    let trimmed = s.trim();
    let unsigned = trimmed.strip_prefix('-').unwrap_or(trimmed);
    let well_formed = unsigned.chars().any(|c| c.is_ascii_digit())
        && unsigned.chars().all(|c| c.is_ascii_digit() || c == '.')
        && unsigned.matches('.').count() <= 1;
    if well_formed {
        trimmed.parse().unwrap_or(f64::NAN)
    } else {
        f64::NAN
    }
}

/// Formats a number per XPath 1.0: integral values carry no fraction, never an exponent.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let s = if n > 0.0 { "Infinity" } else { "-Infinity" };
        s.to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else {
        format!("{}", n)
    }
}

/// A container for all state needed during expression evaluation.
/// `'a` is the lifetime of the underlying data source.
/// `'d` is the lifetime of the borrowed registry and namespace bindings.
pub struct EvaluationContext<'a, 'd, N: DataSourceNode<'a>> {
    pub context_node: N,
    pub root_node: N,
    pub functions: &'d FunctionRegistry,
    pub context_position: usize, // 1-based index
    pub context_size: usize,
    /// Prefix bindings supplied by the caller; they win over in-document declarations.
    pub namespaces: &'d HashMap<String, String>,
    _marker: PhantomData<&'a ()>,
}

impl<'a, 'd, N: DataSourceNode<'a>> EvaluationContext<'a, 'd, N> {
    pub fn new(
        context_node: N,
        root_node: N,
        functions: &'d FunctionRegistry,
        namespaces: &'d HashMap<String, String>,
    ) -> Self {
        Self {
            context_node,
            root_node,
            functions,
            context_position: 1,
            context_size: 1,
            namespaces,
            _marker: PhantomData,
        }
    }

    /// The context for evaluating a predicate against one member of a node list.
    fn focused(&self, node: N, position: usize, size: usize) -> Self {
        Self {
            context_node: node,
            root_node: self.root_node,
            functions: self.functions,
            context_position: position,
            context_size: size,
            namespaces: self.namespaces,
            _marker: PhantomData,
        }
    }
}

/// Evaluates a parsed expression and returns a concrete `XPathValue`.
pub fn evaluate<'a, N>(
    expr: &Expression,
    e_ctx: &EvaluationContext<'a, '_, N>,
) -> Result<XPathValue<N>, XPathError>
where
    N: DataSourceNode<'a> + 'a,
{
    match expr {
        Expression::Literal(s) => Ok(XPathValue::String(s.clone())),
        Expression::Number(n) => Ok(XPathValue::Number(*n)),
        Expression::LocationPath(path) => {
            let nodes = evaluate_location_path(path, e_ctx)?;
            Ok(XPathValue::NodeSet(nodes))
        }
        Expression::Variable(name) => Err(XPathError::UnboundVariable(name.clone())),
        Expression::FunctionCall { name, args } => {
            e_ctx.functions.check_call(name, args.len())?;
            let mut evaluated_args = Vec::with_capacity(args.len());
            for arg in args {
                evaluated_args.push(evaluate(arg, e_ctx)?);
            }
            functions::evaluate_function(name, evaluated_args, e_ctx)
        }
        Expression::Filter { base, predicates } => {
            let nodes = expect_node_set(evaluate(base, e_ctx)?, "a filter expression")?;
            Ok(XPathValue::NodeSet(apply_predicates(nodes, predicates, e_ctx)?))
        }
        // `and`/`or` only look at the right operand when they have to.
        Expression::BinaryOp {
            left,
            op: BinaryOperator::Or,
            right,
        } => Ok(XPathValue::Boolean(
            evaluate(left, e_ctx)?.to_bool() || evaluate(right, e_ctx)?.to_bool(),
        )),
        Expression::BinaryOp {
            left,
            op: BinaryOperator::And,
            right,
        } => Ok(XPathValue::Boolean(
            evaluate(left, e_ctx)?.to_bool() && evaluate(right, e_ctx)?.to_bool(),
        )),
        Expression::BinaryOp { left, op, right } => {
            let left_val = evaluate(left, e_ctx)?;
            let right_val = evaluate(right, e_ctx)?;
            operators::evaluate(*op, left_val, right_val)
        }
        Expression::UnaryOp { op, expr } => {
            let val = evaluate(expr, e_ctx)?;
            match op {
                UnaryOperator::Minus => Ok(XPathValue::Number(-val.to_number())),
            }
        }
    }
}

fn expect_node_set<'a, N: DataSourceNode<'a>>(
    value: XPathValue<N>,
    what: &str,
) -> Result<Vec<N>, XPathError> {
    match value {
        XPathValue::NodeSet(nodes) => Ok(nodes),
        other => Err(XPathError::TypeError(format!(
            "{} must select a node-set, got a {}",
            what,
            other.type_name()
        ))),
    }
}

fn evaluate_location_path<'a, N>(
    path: &LocationPath,
    e_ctx: &EvaluationContext<'a, '_, N>,
) -> Result<Vec<N>, XPathError>
where
    N: DataSourceNode<'a> + 'a,
{
    let mut current_nodes = if let Some(start_expr) = &path.start_point {
        expect_node_set(evaluate(start_expr, e_ctx)?, "the start of a path")?
    } else if path.is_absolute {
        vec![e_ctx.root_node]
    } else {
        vec![e_ctx.context_node]
    };

    for step in &path.steps {
        current_nodes = evaluate_step(step, &current_nodes, e_ctx)?;
        log::trace!("step {:?} selected {} node(s)", step.axis, current_nodes.len());
    }
    Ok(current_nodes)
}

/// Evaluates one step for every context node, then merges the results into document order.
///
/// Predicates run per context node, so `//list/item[1]` keeps the first item of every list.
fn evaluate_step<'a, N>(
    step: &Step,
    context_nodes: &[N],
    e_ctx: &EvaluationContext<'a, '_, N>,
) -> Result<Vec<N>, XPathError>
where
    N: DataSourceNode<'a> + 'a,
{
    let mut selected = Vec::new();
    for &node in context_nodes {
        let mut matched = Vec::new();
        for candidate in axes::collect(step.axis, node) {
            if matches_node_test(candidate, &step.node_test, step.axis, e_ctx) {
                matched.push(candidate);
            }
        }
        selected.extend(apply_predicates(matched, &step.predicates, e_ctx)?);
    }
    if context_nodes.len() > 1 || step.axis.is_reverse() {
        selected.sort();
        selected.dedup();
    }
    Ok(selected)
}

fn matches_node_test<'a, N>(
    node: N,
    test: &NodeTest,
    axis: Axis,
    e_ctx: &EvaluationContext<'a, '_, N>,
) -> bool
where
    N: DataSourceNode<'a> + 'a,
{
    let principal = if axis == Axis::Attribute {
        NodeType::Attribute
    } else {
        NodeType::Element
    };
    match test {
        NodeTest::Wildcard => node.node_type() == principal,
        NodeTest::PrefixWildcard(prefix) => {
            node.node_type() == principal && namespace_matches(node, Some(prefix), e_ctx)
        }
        NodeTest::Name { prefix, local } => {
            node.node_type() == principal
                && node.name().is_some_and(|q_name| q_name.local_part == local.as_str())
                && namespace_matches(node, prefix.as_deref(), e_ctx)
        }
        NodeTest::NodeType(ntt) => match ntt {
            NodeTypeTest::Node => true,
            NodeTypeTest::Text => node.node_type() == NodeType::Text,
            NodeTypeTest::Comment => node.node_type() == NodeType::Comment,
            NodeTypeTest::ProcessingInstruction(target) => {
                node.node_type() == NodeType::ProcessingInstruction
                    && target.as_deref().is_none_or(|t| {
                        node.name().is_some_and(|q_name| q_name.local_part == t)
                    })
            }
        },
    }
}

/// An unprefixed name only matches nodes in no namespace; a prefixed one matches the
/// namespace the prefix resolves to, through the caller's bindings first.
/// A prefix that is not in scope at the node matches nothing.
fn namespace_matches<'a, N>(
    node: N,
    prefix: Option<&str>,
    e_ctx: &EvaluationContext<'a, '_, N>,
) -> bool
where
    N: DataSourceNode<'a> + 'a,
{
    let actual = node.namespace_uri();
    let Some(prefix) = prefix else {
        return actual.is_none();
    };
    let expected = if let Some(uri) = e_ctx.namespaces.get(prefix) {
        uri.as_str()
    } else if prefix == "xml" {
        XML_NAMESPACE
    } else if let Some(uri) = node.lookup_namespace(prefix) {
        uri
    } else {
        return false;
    };
    actual == Some(expected)
}

/// Filters nodes (given in axis order) through each predicate in turn.
fn apply_predicates<'a, N>(
    nodes: Vec<N>,
    predicates: &[Expression],
    e_ctx: &EvaluationContext<'a, '_, N>,
) -> Result<Vec<N>, XPathError>
where
    N: DataSourceNode<'a> + 'a,
{
    let mut remaining = nodes;
    for predicate in predicates {
        let size = remaining.len();
        let mut kept = Vec::with_capacity(size);
        for (i, node) in remaining.into_iter().enumerate() {
            let position = i + 1;
            let keep = match evaluate(predicate, &e_ctx.focused(node, position, size))? {
                XPathValue::Number(n) => n == position as f64,
                other => other.to_bool(),
            };
            if keep {
                kept.push(node);
            }
        }
        remaining = kept;
    }
    Ok(remaining)
}
