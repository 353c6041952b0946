//! Compiling and evaluating XPath queries against parsed documents.

use crate::document::{Node, XmlDocument};
use crate::error::QueryError;
use restkit_xpath1::{
    DataSourceNode, EvaluationContext, Expression, FunctionRegistry, NodeType, XPathValue,
    format_number, parse_expression,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// The shape a query result is coerced to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultKind {
    #[default]
    NodeSet,
    String,
    Number,
    Boolean,
}

impl fmt::Display for ResultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResultKind::NodeSet => "nodeset",
            ResultKind::String => "string",
            ResultKind::Number => "number",
            ResultKind::Boolean => "boolean",
        };
        f.write_str(name)
    }
}

impl FromStr for ResultKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "nodeset" | "node-set" | "nodes" => Ok(ResultKind::NodeSet),
            "string" => Ok(ResultKind::String),
            "number" => Ok(ResultKind::Number),
            "boolean" | "bool" => Ok(ResultKind::Boolean),
            other => Err(format!(
                "unknown result kind '{}', expected nodeset, string, number or boolean",
                other
            )),
        }
    }
}

/// A query result of the requested kind. `N` is the node representation.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult<N> {
    NodeSet(Vec<N>),
    String(String),
    Number(f64),
    Boolean(bool),
}

impl<N> QueryResult<N> {
    pub fn kind(&self) -> ResultKind {
        match self {
            QueryResult::NodeSet(_) => ResultKind::NodeSet,
            QueryResult::String(_) => ResultKind::String,
            QueryResult::Number(_) => ResultKind::Number,
            QueryResult::Boolean(_) => ResultKind::Boolean,
        }
    }

    pub fn as_nodes(&self) -> Option<&[N]> {
        match self {
            QueryResult::NodeSet(nodes) => Some(nodes),
            _ => None,
        }
    }

    pub fn into_nodes(self) -> Option<Vec<N>> {
        match self {
            QueryResult::NodeSet(nodes) => Some(nodes),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            QueryResult::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            QueryResult::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            QueryResult::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Converts every node, leaving scalars untouched.
    pub fn map_nodes<M>(self, f: impl FnMut(N) -> M) -> QueryResult<M> {
        match self {
            QueryResult::NodeSet(nodes) => QueryResult::NodeSet(nodes.into_iter().map(f).collect()),
            QueryResult::String(s) => QueryResult::String(s),
            QueryResult::Number(n) => QueryResult::Number(n),
            QueryResult::Boolean(b) => QueryResult::Boolean(b),
        }
    }
}

impl<N: fmt::Display> fmt::Display for QueryResult<N> {
    /// Node-sets print one node per line.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryResult::NodeSet(nodes) => {
                for (i, node) in nodes.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{}", node)?;
                }
                Ok(())
            }
            QueryResult::String(s) => f.write_str(s),
            QueryResult::Number(n) => f.write_str(&format_number(*n)),
            QueryResult::Boolean(b) => write!(f, "{}", b),
        }
    }
}

/// An owned copy of a matched node, detached from its document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeSnapshot {
    #[serde(serialize_with = "serialize_node_type")]
    pub node_type: NodeType,
    /// Qualified name (`prefix:local`), absent for text, comment and root nodes.
    pub name: Option<String>,
    pub namespace_uri: Option<String>,
    pub value: String,
}

fn serialize_node_type<S: serde::Serializer>(node_type: &NodeType, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(match node_type {
        NodeType::Root => "root",
        NodeType::Element => "element",
        NodeType::Attribute => "attribute",
        NodeType::Text => "text",
        NodeType::Comment => "comment",
        NodeType::ProcessingInstruction => "processing-instruction",
    })
}

impl NodeSnapshot {
    pub fn local_name(&self) -> Option<&str> {
        self.name
            .as_deref()
            .map(|name| name.rsplit_once(':').map_or(name, |(_, local)| local))
    }
}

impl From<Node<'_>> for NodeSnapshot {
    fn from(node: Node<'_>) -> Self {
        let name = node.name().map(|q| match q.prefix {
            Some(prefix) => format!("{}:{}", prefix, q.local_part),
            None => q.local_part.to_string(),
        });
        Self {
            node_type: node.node_type(),
            name,
            namespace_uri: node.namespace_uri().map(str::to_string),
            value: node.string_value(),
        }
    }
}

impl fmt::Display for NodeSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

/// A compiled XPath expression together with its source text and namespace bindings.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    expression: String,
    ast: Expression,
    namespaces: HashMap<String, String>,
}

impl CompiledQuery {
    /// Binds `prefix` for prefixed name tests. Bindings win over in-document declarations.
    pub fn with_namespace(mut self, prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        self.namespaces.insert(prefix.into(), uri.into());
        self
    }

    pub fn with_namespaces<I, K, V>(mut self, bindings: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.namespaces
            .extend(bindings.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    fn evaluation_error(&self, reason: impl fmt::Display) -> QueryError {
        QueryError::Evaluation {
            expression: self.expression.clone(),
            reason: reason.to_string(),
        }
    }
}

impl fmt::Display for CompiledQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expression)
    }
}

impl FromStr for CompiledQuery {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        compile(s)
    }
}

/// Parses XML text into a document.
pub fn parse(text: &str) -> Result<XmlDocument<'_>, QueryError> {
    XmlDocument::parse(text)
}

/// Parses XML from bytes; non-UTF-8 input is an I/O error.
pub fn parse_bytes(bytes: &[u8]) -> Result<XmlDocument<'_>, QueryError> {
    XmlDocument::parse_bytes(bytes)
}

pub fn parse_with_options<'input>(
    text: &'input str,
    options: &crate::ParseOptions,
) -> Result<XmlDocument<'input>, QueryError> {
    XmlDocument::parse_with_options(text, options)
}

/// Compiles an XPath 1.0 expression. Syntax errors and calls to unknown functions fail here.
pub fn compile(expression: &str) -> Result<CompiledQuery, QueryError> {
    let invalid = |reason: String| QueryError::InvalidQuery {
        expression: expression.to_string(),
        reason,
    };
    let ast = parse_expression(expression).map_err(|e| invalid(e.to_string()))?;

    let functions = FunctionRegistry::default();
    let mut unknown: Option<String> = None;
    ast.visit_function_calls(&mut |name: &str, _arg_count: usize| {
        if unknown.is_none() && !functions.contains(name) {
            unknown = Some(name.to_string());
        }
    });
    if let Some(name) = unknown {
        return Err(invalid(format!("unknown function '{}()'", name)));
    }

    log::debug!("Compiled XPath expression '{}'", expression);
    Ok(CompiledQuery {
        expression: expression.to_string(),
        ast,
        namespaces: HashMap::new(),
    })
}

/// Evaluates `query` from the document root and coerces the value to `kind`.
///
/// Asking for a node-set from a scalar expression fails, as does asking for any scalar
/// from an expression that selects no nodes.
pub fn evaluate<'a>(
    query: &CompiledQuery,
    doc: &'a XmlDocument<'_>,
    kind: ResultKind,
) -> Result<QueryResult<Node<'a>>, QueryError> {
    let functions = FunctionRegistry::default();
    let root = doc.root();
    let e_ctx = EvaluationContext::new(root, root, &functions, &query.namespaces);
    let value = restkit_xpath1::evaluate(&query.ast, &e_ctx).map_err(|e| query.evaluation_error(e))?;

    if let XPathValue::NodeSet(nodes) = &value {
        log::trace!("'{}' selected {} node(s)", query.expression, nodes.len());
        if nodes.is_empty() && kind != ResultKind::NodeSet {
            return Err(query.evaluation_error(format_args!(
                "no nodes matched, cannot produce a {}",
                kind
            )));
        }
    }

    match kind {
        ResultKind::NodeSet => match value {
            XPathValue::NodeSet(nodes) => Ok(QueryResult::NodeSet(nodes)),
            other => Err(query.evaluation_error(format_args!(
                "expression yields a {}, not a node-set",
                other.type_name()
            ))),
        },
        ResultKind::String => Ok(QueryResult::String(value.to_string())),
        ResultKind::Number => Ok(QueryResult::Number(value.to_number())),
        ResultKind::Boolean => Ok(QueryResult::Boolean(value.to_bool())),
    }
}

/// Parses, compiles and evaluates in one go, handing the matched nodes to `f`.
pub fn extract_with<R>(
    expression: &str,
    xml: &str,
    f: impl FnOnce(&[Node<'_>]) -> R,
) -> Result<R, QueryError> {
    let doc = parse(xml)?;
    let query = compile(expression)?;
    let result = evaluate(&query, &doc, ResultKind::NodeSet)?;
    let nodes = result.as_nodes().unwrap_or_default();
    Ok(f(nodes))
}

/// The matched nodes, copied out of the document.
pub fn extract(expression: &str, xml: &str) -> Result<Vec<NodeSnapshot>, QueryError> {
    extract_with(expression, xml, |nodes| {
        nodes.iter().copied().map(NodeSnapshot::from).collect()
    })
}

/// The string value of every matched node.
pub fn extract_strings(expression: &str, xml: &str) -> Result<Vec<String>, QueryError> {
    extract_with(expression, xml, |nodes| {
        nodes.iter().map(|n| n.string_value()).collect()
    })
}

pub fn extract_count(expression: &str, xml: &str) -> Result<usize, QueryError> {
    extract_with(expression, xml, |nodes| nodes.len())
}

/// Like [`evaluate`] for a one-off query, with matched nodes reduced to their string values.
pub fn extract_as(
    expression: &str,
    xml: &str,
    kind: ResultKind,
) -> Result<QueryResult<String>, QueryError> {
    let doc = parse(xml)?;
    let query = compile(expression)?;
    let result = evaluate(&query, &doc, kind)?;
    Ok(result.map_nodes(|n| n.string_value()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOOKS: &str = r#"<?xml version="1.0"?>
<catalog xmlns:p="urn:price">
  <book id="b1" lang="en"><title>Dune</title><p:price>9.5</p:price></book>
  <book id="b2"><title>Solaris</title><p:price>12</p:price></book>
  <magazine id="m1"><title>Wired</title></magazine>
</catalog>"#;

    fn titles(result: &QueryResult<Node<'_>>) -> Vec<String> {
        result
            .as_nodes()
            .unwrap()
            .iter()
            .map(|n| n.string_value())
            .collect()
    }

    #[test]
    fn test_node_set_in_document_order() {
        let doc = parse(BOOKS).unwrap();
        let query = compile("//magazine/title | //book/title").unwrap();
        let result = evaluate(&query, &doc, ResultKind::NodeSet).unwrap();
        assert_eq!(titles(&result), vec!["Dune", "Solaris", "Wired"]);
    }

    #[test]
    fn test_node_set_length_matches_count() {
        let doc = parse(BOOKS).unwrap();
        let nodes = evaluate(&compile("//title").unwrap(), &doc, ResultKind::NodeSet).unwrap();
        let count = evaluate(&compile("count(//title)").unwrap(), &doc, ResultKind::Number).unwrap();
        assert_eq!(nodes.as_nodes().unwrap().len() as f64, count.as_number().unwrap());
        assert_eq!(extract_count("//title", BOOKS).unwrap(), 3);
    }

    #[test]
    fn test_scalar_kinds() {
        let doc = parse(BOOKS).unwrap();
        let eval = |expr: &str, kind| evaluate(&compile(expr).unwrap(), &doc, kind).unwrap();
        assert_eq!(eval("//book[2]/title", ResultKind::String).as_str(), Some("Solaris"));
        assert_eq!(eval("sum(//p:price)", ResultKind::Number).as_number(), Some(21.5));
        assert_eq!(eval("count(//book) > 1", ResultKind::Boolean).as_bool(), Some(true));
        assert_eq!(eval("//book/@id", ResultKind::Boolean).as_bool(), Some(true));
        assert_eq!(eval("concat('a', 'b')", ResultKind::String).as_str(), Some("ab"));
    }

    #[test]
    fn test_scalar_from_empty_node_set_fails() {
        let doc = parse(BOOKS).unwrap();
        let query = compile("//missing").unwrap();
        for kind in [ResultKind::String, ResultKind::Number, ResultKind::Boolean] {
            assert!(matches!(
                evaluate(&query, &doc, kind),
                Err(QueryError::Evaluation { .. })
            ));
        }
        let empty = evaluate(&query, &doc, ResultKind::NodeSet).unwrap();
        assert_eq!(empty.as_nodes().map(<[_]>::len), Some(0));
    }

    #[test]
    fn test_node_set_from_scalar_fails() {
        let doc = parse(BOOKS).unwrap();
        let err = evaluate(&compile("count(//book)").unwrap(), &doc, ResultKind::NodeSet).unwrap_err();
        match err {
            QueryError::Evaluation { expression, reason } => {
                assert_eq!(expression, "count(//book)");
                assert!(reason.contains("number"));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_evaluation_errors() {
        let doc = parse(BOOKS).unwrap();
        for expr in ["$price", "count(//book, 2)", "//book | 'x'", "substring('abc')"] {
            let query = compile(expr).unwrap();
            assert!(
                matches!(evaluate(&query, &doc, ResultKind::String), Err(QueryError::Evaluation { .. })),
                "{} should fail to evaluate",
                expr
            );
        }
    }

    #[test]
    fn test_invalid_queries_name_the_expression() {
        for expr in ["//book[", "1 +", "", "frobnicate(1)", "//book[nosuch()]"] {
            match compile(expr) {
                Err(QueryError::InvalidQuery { expression, .. }) => assert_eq!(expression, expr),
                other => panic!("{:?} should not compile, got {:?}", expr, other),
            }
        }
        let err = compile("//book[").unwrap_err();
        assert!(err.to_string().contains("//book["));
    }

    #[test]
    fn test_namespace_bindings() {
        let doc = parse(BOOKS).unwrap();
        let in_doc = compile("//p:price").unwrap();
        assert_eq!(evaluate(&in_doc, &doc, ResultKind::NodeSet).unwrap().as_nodes().unwrap().len(), 2);

        let rebound = compile("//cost:price").unwrap().with_namespace("cost", "urn:price");
        let result = evaluate(&rebound, &doc, ResultKind::String).unwrap();
        assert_eq!(result.as_str(), Some("9.5"));

        // An unprefixed test does not match namespaced elements.
        assert_eq!(extract_count("//price", BOOKS).unwrap(), 0);
        assert_eq!(extract_count("//*[local-name()='price']", BOOKS).unwrap(), 2);
    }

    #[test]
    fn test_default_namespace_requires_a_binding() {
        let xml = r#"<feed xmlns="urn:atom"><entry>a</entry><entry>b</entry></feed>"#;
        assert_eq!(extract_count("//entry", xml).unwrap(), 0);
        let doc = parse(xml).unwrap();
        let query = compile("//a:entry").unwrap().with_namespace("a", "urn:atom");
        let result = evaluate(&query, &doc, ResultKind::NodeSet).unwrap();
        assert_eq!(titles(&result), vec!["a", "b"]);
    }

    #[test]
    fn test_compiled_query_is_reusable_across_documents() {
        let query: CompiledQuery = "count(//item)".parse().unwrap();
        for (xml, expected) in [("<a><item/></a>", 1.0), ("<b><item/><item/></b>", 2.0)] {
            let doc = parse(xml).unwrap();
            let result = evaluate(&query, &doc, ResultKind::Number).unwrap();
            assert_eq!(result.as_number(), Some(expected));
        }
        assert_eq!(query.to_string(), "count(//item)");
    }

    #[test]
    fn test_extract_snapshots() {
        let snapshots = extract("//book/@id | //p:price", BOOKS).unwrap();
        let names: Vec<_> = snapshots.iter().map(|s| s.name.as_deref().unwrap()).collect();
        assert_eq!(names, vec!["id", "p:price", "id", "p:price"]);
        assert_eq!(snapshots[0].node_type, NodeType::Attribute);
        assert_eq!(snapshots[1].namespace_uri.as_deref(), Some("urn:price"));
        assert_eq!(snapshots[1].local_name(), Some("price"));
        assert_eq!(snapshots[1].value, "9.5");

        let json = serde_json::to_value(&snapshots[0]).unwrap();
        assert_eq!(json["node_type"], "attribute");
    }

    #[test]
    fn test_extract_helpers() {
        assert_eq!(extract_strings("//title", BOOKS).unwrap(), vec!["Dune", "Solaris", "Wired"]);
        let result = extract_as("//book/title", BOOKS, ResultKind::NodeSet).unwrap();
        assert_eq!(result, QueryResult::NodeSet(vec!["Dune".to_string(), "Solaris".to_string()]));
        assert_eq!(result.to_string(), "Dune\nSolaris");
        assert!(matches!(extract("//a", "<a>"), Err(QueryError::Parse(_))));
        assert!(matches!(extract("//a[", "<a/>"), Err(QueryError::InvalidQuery { .. })));
    }

    #[test]
    fn test_result_kind_from_str() {
        assert_eq!("NodeSet".parse::<ResultKind>(), Ok(ResultKind::NodeSet));
        assert_eq!("bool".parse::<ResultKind>(), Ok(ResultKind::Boolean));
        assert!("list".parse::<ResultKind>().is_err());
        assert_eq!(ResultKind::Number.to_string(), "number");
    }
}
