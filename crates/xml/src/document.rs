// XML datasource implementation using roxmltree
use crate::error::QueryError;
use crate::options::ParseOptions;
use restkit_xpath1::{DataSourceNode, NodeType, QName, XML_NAMESPACE};
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

/// A parsed XML document. Borrows the text it was parsed from and is never mutated.
pub struct XmlDocument<'input> {
    doc: roxmltree::Document<'input>,
}

impl<'input> XmlDocument<'input> {
    pub fn parse(text: &'input str) -> Result<Self, QueryError> {
        Self::parse_with_options(text, &ParseOptions::default())
    }

    /// Parses raw bytes, which must be UTF-8.
    pub fn parse_bytes(bytes: &'input [u8]) -> Result<Self, QueryError> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| QueryError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;
        Self::parse(text)
    }

    pub fn parse_with_options(text: &'input str, options: &ParseOptions) -> Result<Self, QueryError> {
        let doc = roxmltree::Document::parse_with_options(text, options.to_parsing_options())?;
        log::debug!(
            "Parsed XML document with root <{}>",
            doc.root_element().tag_name().name()
        );
        Ok(Self { doc })
    }

    /// The document (root) node, parent of the document element.
    pub fn root(&self) -> Node<'_> {
        XmlNode::Tree(self.doc.root())
    }

    /// The single top-level element.
    pub fn root_element(&self) -> Node<'_> {
        XmlNode::Tree(self.doc.root_element())
    }
}

impl std::fmt::Debug for XmlDocument<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XmlDocument")
            .field("root_element", &self.doc.root_element().tag_name().name())
            .finish()
    }
}

/// Either a tree node (root, element, text, comment, processing instruction) or an attribute.
/// roxmltree keeps attributes as data on their element, so an attribute is addressed by its
/// parent element and index.
#[derive(Debug, Clone, Copy)]
pub enum XmlNode<'a, 'input> {
    Tree(roxmltree::Node<'a, 'input>),
    Attribute {
        parent: roxmltree::Node<'a, 'input>,
        index: usize,
    },
}

/// The node type the query engine works with.
pub type Node<'a> = XmlNode<'a, 'a>;

impl<'a, 'input> XmlNode<'a, 'input> {
    /// The underlying roxmltree node, `None` for attributes.
    pub fn inner(&self) -> Option<roxmltree::Node<'a, 'input>> {
        match self {
            XmlNode::Tree(node) => Some(*node),
            XmlNode::Attribute { .. } => None,
        }
    }

    fn attribute(&self) -> Option<roxmltree::Attribute<'a, 'input>> {
        match self {
            XmlNode::Attribute { parent, index } => parent.attributes().nth(*index),
            XmlNode::Tree(_) => None,
        }
    }

    /// The element this node belongs to for namespace scoping.
    fn scope(&self) -> roxmltree::Node<'a, 'input> {
        match self {
            XmlNode::Tree(node) if node.is_element() => *node,
            XmlNode::Tree(node) => node
                .ancestors()
                .find(|n| n.is_element())
                .unwrap_or(*node),
            XmlNode::Attribute { parent, .. } => *parent,
        }
    }

    /// Document order key: tree nodes by id, attributes right after their element.
    fn order_key(&self) -> (u32, usize) {
        match self {
            XmlNode::Tree(node) => (node.id().get(), 0),
            XmlNode::Attribute { parent, index } => (parent.id().get(), index + 1),
        }
    }
}

impl PartialEq for XmlNode<'_, '_> {
    fn eq(&self, other: &Self) -> bool {
        self.order_key() == other.order_key()
    }
}

impl Eq for XmlNode<'_, '_> {}

impl PartialOrd for XmlNode<'_, '_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Attributes sort after their element and before its first child, whose id is larger.
impl Ord for XmlNode<'_, '_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.order_key().cmp(&other.order_key())
    }
}

impl Hash for XmlNode<'_, '_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.order_key().hash(state);
    }
}

impl<'a> DataSourceNode<'a> for XmlNode<'a, 'a> {
    fn node_type(&self) -> NodeType {
        match self {
            XmlNode::Tree(node) if node.is_root() => NodeType::Root,
            XmlNode::Tree(node) if node.is_text() => NodeType::Text,
            XmlNode::Tree(node) if node.is_comment() => NodeType::Comment,
            XmlNode::Tree(node) if node.is_pi() => NodeType::ProcessingInstruction,
            XmlNode::Tree(_) => NodeType::Element,
            XmlNode::Attribute { .. } => NodeType::Attribute,
        }
    }

    fn name(&self) -> Option<QName<'a>> {
        match self {
            XmlNode::Tree(node) if node.is_element() => {
                let tag = node.tag_name();
                Some(QName {
                    prefix: tag.namespace().and_then(|uri| node.lookup_prefix(uri)),
                    local_part: tag.name(),
                })
            }
            XmlNode::Tree(node) => node.pi().map(|pi| QName {
                prefix: None,
                local_part: pi.target,
            }),
            XmlNode::Attribute { parent, .. } => self.attribute().map(|attr| {
                // The xml prefix is never declared, so lookup_prefix may not know it.
                let prefix = match attr.namespace() {
                    Some(XML_NAMESPACE) => Some("xml"),
                    Some(uri) => parent.lookup_prefix(uri),
                    None => None,
                };
                QName {
                    prefix,
                    local_part: attr.name(),
                }
            }),
        }
    }

    fn namespace_uri(&self) -> Option<&'a str> {
        match self {
            XmlNode::Tree(node) if node.is_element() => node.tag_name().namespace(),
            XmlNode::Tree(_) => None,
            XmlNode::Attribute { .. } => self.attribute().and_then(|attr| attr.namespace()),
        }
    }

    fn lookup_namespace(&self, prefix: &str) -> Option<&'a str> {
        if prefix == "xml" {
            return Some(XML_NAMESPACE);
        }
        self.scope()
            .namespaces()
            .find(|ns| ns.name() == Some(prefix))
            .map(|ns| ns.uri())
    }

    fn string_value(&self) -> String {
        match self {
            XmlNode::Tree(node) if node.is_text() || node.is_comment() => {
                node.text().unwrap_or_default().to_string()
            }
            XmlNode::Tree(node) if node.is_pi() => node
                .pi()
                .and_then(|pi| pi.value)
                .unwrap_or_default()
                .to_string(),
            XmlNode::Tree(node) => node
                .descendants()
                .filter(|n| n.is_text())
                .filter_map(|n| n.text())
                .collect(),
            XmlNode::Attribute { .. } => self
                .attribute()
                .map(|attr| attr.value().to_string())
                .unwrap_or_default(),
        }
    }

    fn attributes(&self) -> Box<dyn Iterator<Item = Self> + 'a> {
        match self {
            XmlNode::Tree(node) if node.is_element() => {
                let parent = *node;
                let count = node.attributes().len();
                Box::new((0..count).map(move |index| XmlNode::Attribute { parent, index }))
            }
            _ => Box::new(std::iter::empty()),
        }
    }

    fn children(&self) -> Box<dyn Iterator<Item = Self> + 'a> {
        match self {
            XmlNode::Tree(node) => Box::new(node.children().map(XmlNode::Tree)),
            XmlNode::Attribute { .. } => Box::new(std::iter::empty()),
        }
    }

    fn parent(&self) -> Option<Self> {
        match self {
            XmlNode::Tree(node) => node.parent().map(XmlNode::Tree),
            XmlNode::Attribute { parent, .. } => Some(XmlNode::Tree(*parent)),
        }
    }
}
