//! Defines the registry and built-in implementations for the XPath 1.0 core function library.

use super::engine::{EvaluationContext, XPathValue, string_to_number};
use crate::datasource::{DataSourceNode, NodeType, XML_NAMESPACE};
use crate::error::XPathError;
use std::collections::HashMap;

/// Accepted argument counts for a function. `max: None` means variadic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arity {
    pub min: usize,
    pub max: Option<usize>,
}

impl Arity {
    const fn exactly(n: usize) -> Self {
        Arity { min: n, max: Some(n) }
    }

    const fn optional(n: usize) -> Self {
        Arity { min: 0, max: Some(n) }
    }

    fn accepts(&self, count: usize) -> bool {
        count >= self.min && self.max.is_none_or(|max| count <= max)
    }

    fn describe(&self) -> String {
        match self.max {
            Some(max) if max == self.min => format!("exactly {}", max),
            Some(max) => format!("{} to {}", self.min, max),
            None => format!("at least {}", self.min),
        }
    }
}

const CORE_FUNCTIONS: &[(&str, Arity)] = &[
    // Node-set
    ("last", Arity::exactly(0)),
    ("position", Arity::exactly(0)),
    ("count", Arity::exactly(1)),
    ("local-name", Arity::optional(1)),
    ("name", Arity::optional(1)),
    ("namespace-uri", Arity::optional(1)),
    // String
    ("string", Arity::optional(1)),
    ("concat", Arity { min: 2, max: None }),
    ("starts-with", Arity::exactly(2)),
    ("contains", Arity::exactly(2)),
    ("substring-before", Arity::exactly(2)),
    ("substring-after", Arity::exactly(2)),
    ("substring", Arity { min: 2, max: Some(3) }),
    ("string-length", Arity::optional(1)),
    ("normalize-space", Arity::optional(1)),
    ("translate", Arity::exactly(3)),
    // Boolean
    ("boolean", Arity::exactly(1)),
    ("not", Arity::exactly(1)),
    ("true", Arity::exactly(0)),
    ("false", Arity::exactly(0)),
    ("lang", Arity::exactly(1)),
    // Number
    ("number", Arity::optional(1)),
    ("sum", Arity::exactly(1)),
    ("floor", Arity::exactly(1)),
    ("ceiling", Arity::exactly(1)),
    ("round", Arity::exactly(1)),
];

/// The set of callable functions and their arities.
#[derive(Debug, Clone)]
pub struct FunctionRegistry {
    functions: HashMap<&'static str, Arity>,
}

impl Default for FunctionRegistry {
    /// A registry holding the XPath 1.0 core library.
    fn default() -> Self {
        Self {
            functions: CORE_FUNCTIONS.iter().copied().collect(),
        }
    }
}

impl FunctionRegistry {
    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn arity(&self, name: &str) -> Option<Arity> {
        self.functions.get(name).copied()
    }

    /// Checks that `name` exists and accepts `arg_count` arguments.
    pub fn check_call(&self, name: &str, arg_count: usize) -> Result<(), XPathError> {
        let arity = self
            .arity(name)
            .ok_or_else(|| XPathError::UnknownFunction(name.to_string()))?;
        if arity.accepts(arg_count) {
            Ok(())
        } else {
            Err(XPathError::FunctionError {
                function: format!("{}()", name),
                message: format!(
                    "expected {} argument(s), got {}",
                    arity.describe(),
                    arg_count
                ),
            })
        }
    }
}

/// Dispatches a function call to the correct implementation.
///
/// Arity is checked by the caller through [`FunctionRegistry::check_call`].
pub fn evaluate_function<'a, 'd, N: DataSourceNode<'a>>(
    name: &str,
    args: Vec<XPathValue<N>>,
    e_ctx: &EvaluationContext<'a, 'd, N>,
) -> Result<XPathValue<N>, XPathError> {
    let mut args = Args { name, values: args };
    match name {
        // Node-set
        "last" => Ok(XPathValue::Number(e_ctx.context_size as f64)),
        "position" => Ok(XPathValue::Number(e_ctx.context_position as f64)),
        "count" => Ok(XPathValue::Number(args.node_set(0)?.len() as f64)),
        "local-name" => {
            let node = args.optional_node(e_ctx)?;
            Ok(XPathValue::String(
                node.and_then(|n| n.name())
                    .map(|q| q.local_part.to_string())
                    .unwrap_or_default(),
            ))
        }
        "name" => {
            let node = args.optional_node(e_ctx)?;
            Ok(XPathValue::String(node.map(qualified_name).unwrap_or_default()))
        }
        "namespace-uri" => {
            let node = args.optional_node(e_ctx)?;
            Ok(XPathValue::String(
                node.and_then(|n| n.namespace_uri())
                    .unwrap_or_default()
                    .to_string(),
            ))
        }

        // String
        "string" => Ok(XPathValue::String(args.string_or_context(e_ctx))),
        "concat" => Ok(XPathValue::String(
            args.values.iter().map(|v| v.to_string()).collect(),
        )),
        "starts-with" => {
            let (s1, s2) = args.two_strings();
            Ok(XPathValue::Boolean(s1.starts_with(&s2)))
        }
        "contains" => {
            let (s1, s2) = args.two_strings();
            Ok(XPathValue::Boolean(s1.contains(&s2)))
        }
        "substring-before" => {
            let (s1, s2) = args.two_strings();
            let before = s1.find(&s2).map(|i| &s1[..i]).unwrap_or_default();
            Ok(XPathValue::String(before.to_string()))
        }
        "substring-after" => {
            let (s1, s2) = args.two_strings();
            let after = s1.find(&s2).map(|i| &s1[i + s2.len()..]).unwrap_or_default();
            Ok(XPathValue::String(after.to_string()))
        }
        "substring" => {
            let s = args.string(0);
            let start = args.number(1);
            let length = args.values.get(2).map(|v| v.to_number());
            Ok(XPathValue::String(substring(&s, start, length)))
        }
        "string-length" => Ok(XPathValue::Number(
            args.string_or_context(e_ctx).chars().count() as f64,
        )),
        "normalize-space" => Ok(XPathValue::String(
            args.string_or_context(e_ctx)
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" "),
        )),
        "translate" => Ok(XPathValue::String(translate(
            &args.string(0),
            &args.string(1),
            &args.string(2),
        ))),

        // Boolean
        "boolean" => Ok(XPathValue::Boolean(args.boolean(0))),
        "not" => Ok(XPathValue::Boolean(!args.boolean(0))),
        "true" => Ok(XPathValue::Boolean(true)),
        "false" => Ok(XPathValue::Boolean(false)),
        "lang" => Ok(XPathValue::Boolean(lang_matches(
            e_ctx.context_node,
            &args.string(0),
        ))),

        // Number
        "number" => Ok(XPathValue::Number(match args.values.first() {
            Some(v) => v.to_number(),
            None => XPathValue::NodeSet(vec![e_ctx.context_node]).to_number(),
        })),
        "sum" => Ok(XPathValue::Number(
            args.node_set(0)?
                .iter()
                .map(|n| string_to_number(&n.string_value()))
                .sum(),
        )),
        "floor" => Ok(XPathValue::Number(args.number(0).floor())),
        "ceiling" => Ok(XPathValue::Number(args.number(0).ceil())),
        "round" => Ok(XPathValue::Number(round(args.number(0)))),

        _ => Err(XPathError::UnknownFunction(name.to_string())),
    }
}

/// Positional access to evaluated arguments. Missing arguments read as empty values.
struct Args<'n, N> {
    name: &'n str,
    values: Vec<XPathValue<N>>,
}

impl<'a, N: DataSourceNode<'a>> Args<'_, N> {
    fn string(&self, i: usize) -> String {
        self.values.get(i).map(|v| v.to_string()).unwrap_or_default()
    }

    fn number(&self, i: usize) -> f64 {
        self.values.get(i).map_or(f64::NAN, |v| v.to_number())
    }

    fn boolean(&self, i: usize) -> bool {
        self.values.get(i).is_some_and(|v| v.to_bool())
    }

    fn two_strings(&self) -> (String, String) {
        (self.string(0), self.string(1))
    }

    fn string_or_context<'d>(&self, e_ctx: &EvaluationContext<'a, 'd, N>) -> String {
        match self.values.first() {
            Some(v) => v.to_string(),
            None => e_ctx.context_node.string_value(),
        }
    }

    fn node_set(&mut self, i: usize) -> Result<Vec<N>, XPathError> {
        if i >= self.values.len() {
            return Ok(vec![]);
        }
        match self.values.swap_remove(i) {
            XPathValue::NodeSet(nodes) => Ok(nodes),
            other => Err(XPathError::TypeError(format!(
                "{}() argument must be a node-set, got a {}",
                self.name,
                other.type_name()
            ))),
        }
    }

    /// The context node when no argument is given, otherwise the first node of the argument
    /// in document order.
    fn optional_node<'d>(
        &mut self,
        e_ctx: &EvaluationContext<'a, 'd, N>,
    ) -> Result<Option<N>, XPathError> {
        if self.values.is_empty() {
            Ok(Some(e_ctx.context_node))
        } else {
            Ok(self.node_set(0)?.into_iter().min())
        }
    }
}

fn qualified_name<'a, N: DataSourceNode<'a>>(node: N) -> String {
    match node.name() {
        Some(q) => match q.prefix {
            Some(prefix) => format!("{}:{}", prefix, q.local_part),
            None => q.local_part.to_string(),
        },
        None => String::new(),
    }
}

fn substring(s: &str, start: f64, length: Option<f64>) -> String {
    let first = round(start);
    let last = length.map_or(f64::INFINITY, |l| first + round(l));
    s.chars()
        .enumerate()
        .filter(|(i, _)| {
            let pos = (i + 1) as f64;
            pos >= first && pos < last
        })
        .map(|(_, c)| c)
        .collect()
}

fn translate(s: &str, from: &str, to: &str) -> String {
    let from: Vec<char> = from.chars().collect();
    let to: Vec<char> = to.chars().collect();
    s.chars()
        .filter_map(|c| match from.iter().position(|&f| f == c) {
            Some(i) => to.get(i).copied(),
            None => Some(c),
        })
        .collect()
}

/// XPath rounding: halves go towards positive infinity.
fn round(n: f64) -> f64 {
    if n.is_nan() || n.is_infinite() {
        n
    } else {
        (n + 0.5).floor()
    }
}

/// Finds the nearest `xml:lang` on the ancestor-or-self axis and compares it
/// case-insensitively, ignoring any suffix after a `-`.
fn lang_matches<'a, N: DataSourceNode<'a>>(context: N, wanted: &str) -> bool {
    let mut current = Some(context);
    while let Some(node) = current {
        if node.node_type() == NodeType::Element {
            let lang = node.attributes().find(|attr| {
                attr.namespace_uri() == Some(XML_NAMESPACE)
                    && attr.name().is_some_and(|q| q.local_part == "lang")
            });
            if let Some(attr) = lang {
                let value = attr.string_value().to_lowercase();
                let wanted = wanted.to_lowercase();
                return value == wanted
                    || value
                        .strip_prefix(&wanted)
                        .is_some_and(|rest| rest.starts_with('-'));
            }
        }
        current = node.parent();
    }
    false
}
