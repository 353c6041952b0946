//! Contains pure functions for collecting nodes along each XPath axis.
//!
//! Every collector returns the nodes in axis order: document order for forward axes,
//! reverse document order for reverse axes. Positional predicates rely on that.

use crate::ast::Axis;
use crate::datasource::{DataSourceNode, NodeType};

/// Collects the nodes reachable from `node` along `axis`.
pub fn collect<'a, N: DataSourceNode<'a>>(axis: Axis, node: N) -> Vec<N> {
    let mut results = Vec::new();
    match axis {
        Axis::Child => results.extend(node.children()),
        Axis::Attribute => results.extend(node.attributes()),
        Axis::SelfAxis => results.push(node),
        Axis::Descendant => push_descendants(node, &mut results),
        Axis::DescendantOrSelf => {
            results.push(node);
            push_descendants(node, &mut results);
        }
        Axis::Parent => results.extend(node.parent()),
        Axis::Ancestor => push_ancestors(node, &mut results),
        Axis::AncestorOrSelf => {
            results.push(node);
            push_ancestors(node, &mut results);
        }
        Axis::FollowingSibling => push_following_siblings(node, &mut results),
        Axis::PrecedingSibling => push_preceding_siblings(node, &mut results),
        Axis::Following => push_following(node, &mut results),
        Axis::Preceding => push_preceding(node, &mut results),
    }
    results
}

fn is_attribute<'a, N: DataSourceNode<'a>>(node: N) -> bool {
    node.node_type() == NodeType::Attribute
}

/// Pre-order walk, so descendants come out in document order.
fn push_descendants<'a, N: DataSourceNode<'a>>(node: N, results: &mut Vec<N>) {
    let mut stack: Vec<N> = node.children().collect();
    stack.reverse();
    while let Some(current) = stack.pop() {
        results.push(current);
        let mut children: Vec<N> = current.children().collect();
        children.reverse();
        stack.extend(children);
    }
}

fn push_ancestors<'a, N: DataSourceNode<'a>>(node: N, results: &mut Vec<N>) {
    let mut current = node.parent();
    while let Some(p) = current {
        results.push(p);
        current = p.parent();
    }
}

fn push_following_siblings<'a, N: DataSourceNode<'a>>(node: N, results: &mut Vec<N>) {
    if is_attribute(node) {
        return;
    }
    if let Some(parent) = node.parent() {
        results.extend(parent.children().skip_while(|s| *s != node).skip(1));
    }
}

fn push_preceding_siblings<'a, N: DataSourceNode<'a>>(node: N, results: &mut Vec<N>) {
    if is_attribute(node) {
        return;
    }
    if let Some(parent) = node.parent() {
        let mut siblings: Vec<N> = parent.children().take_while(|s| *s != node).collect();
        siblings.reverse();
        results.extend(siblings);
    }
}

fn push_following<'a, N: DataSourceNode<'a>>(node: N, results: &mut Vec<N>) {
    let mut current = node;
    if is_attribute(node) {
        // The owner element's content follows its attributes.
        if let Some(owner) = node.parent() {
            push_descendants(owner, results);
            current = owner;
        }
    }
    loop {
        let Some(parent) = current.parent() else {
            break;
        };
        for sibling in parent.children().skip_while(|s| *s != current).skip(1) {
            results.push(sibling);
            push_descendants(sibling, results);
        }
        current = parent;
    }
}

fn push_preceding<'a, N: DataSourceNode<'a>>(node: N, results: &mut Vec<N>) {
    // Ancestors are excluded, and an attribute's owner element is one of them.
    let mut current = if is_attribute(node) {
        node.parent().unwrap_or(node)
    } else {
        node
    };
    let start = results.len();
    while let Some(parent) = current.parent() {
        for sibling in parent.children().take_while(|s| *s != current) {
            results.push(sibling);
            push_descendants(sibling, results);
        }
        current = parent;
    }
    results[start..].sort_by(|a, b| b.cmp(a));
}
