//! Evaluation of compiled expressions against an [`XmlDocument`].

use super::ast::{Axis, BinaryOp, Expr, NodeTest, PathExpr, PathStart, Step};
use super::{NamespaceContext, XPathError};
use crate::document::{NodeId, NodeKind, XmlDocument};
use std::cmp::Ordering;
use std::collections::HashMap;

/// A node as XPath sees it: a tree node or an attribute of an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum XPathNode {
    Node(NodeId),
    Attribute { element: NodeId, index: usize },
}

impl XPathNode {
    /// The tree node, if this is not an attribute.
    pub fn as_node(&self) -> Option<NodeId> {
        match self {
            XPathNode::Node(id) => Some(*id),
            XPathNode::Attribute { .. } => None,
        }
    }
}

/// The result of evaluating an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum XPathValue {
    NodeSet(Vec<XPathNode>),
    Boolean(bool),
    Number(f64),
    String(String),
}

impl XPathValue {
    /// `boolean()` of this value.
    pub fn to_boolean(&self) -> bool {
        match self {
            XPathValue::NodeSet(nodes) => !nodes.is_empty(),
            XPathValue::Boolean(b) => *b,
            XPathValue::Number(n) => *n != 0.0 && !n.is_nan(),
            XPathValue::String(s) => !s.is_empty(),
        }
    }

    pub fn into_node_set(self) -> Result<Vec<XPathNode>, XPathError> {
        match self {
            XPathValue::NodeSet(nodes) => Ok(nodes),
            _ => Err(XPathError::NotANodeSet),
        }
    }
}

/// The string-value of a node.
pub fn string_value(doc: &XmlDocument, node: XPathNode) -> String {
    match node {
        XPathNode::Attribute { element, index } => doc
            .attributes(element)
            .get(index)
            .map(|a| a.value.clone())
            .unwrap_or_default(),
        XPathNode::Node(id) => match doc.kind(id) {
            NodeKind::Comment(raw) => raw
                .strip_prefix("<!--")
                .and_then(|s| s.strip_suffix("-->"))
                .unwrap_or(raw)
                .to_string(),
            NodeKind::ProcessingInstruction(raw) => {
                let inner = raw
                    .strip_prefix("<?")
                    .and_then(|s| s.strip_suffix("?>"))
                    .unwrap_or(raw);
                inner
                    .split_once(char::is_whitespace)
                    .map(|(_, data)| data.trim_start().to_string())
                    .unwrap_or_default()
            }
            _ => doc.text_content(id),
        },
    }
}

pub(crate) fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n == n.trunc() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

pub(crate) fn string_to_number(s: &str) -> f64 {
    let t = s.trim();
    let digits = t.strip_prefix('-').unwrap_or(t);
    let valid = !digits.is_empty()
        && digits.chars().all(|c| c.is_ascii_digit() || c == '.')
        && digits.chars().filter(|c| *c == '.').count() <= 1
        && digits != ".";
    if valid {
        t.parse().unwrap_or(f64::NAN)
    } else {
        f64::NAN
    }
}

fn pi_target(raw: &str) -> &str {
    let inner = raw.strip_prefix("<?").unwrap_or(raw);
    inner
        .split(|c: char| c.is_whitespace() || c == '?')
        .next()
        .unwrap_or("")
}

#[derive(Debug, Clone, Copy)]
struct Focus {
    node: XPathNode,
    position: usize,
    size: usize,
}

pub(crate) struct Evaluator<'d> {
    doc: &'d XmlDocument,
    ns: &'d NamespaceContext,
    order: HashMap<NodeId, usize>,
}

impl<'d> Evaluator<'d> {
    pub(crate) fn new(doc: &'d XmlDocument, ns: &'d NamespaceContext) -> Self {
        Evaluator {
            doc,
            ns,
            order: doc.document_order(),
        }
    }

    pub(crate) fn evaluate(&self, expr: &Expr, context: XPathNode) -> Result<XPathValue, XPathError> {
        self.eval(
            expr,
            Focus {
                node: context,
                position: 1,
                size: 1,
            },
        )
    }

    fn eval(&self, expr: &Expr, focus: Focus) -> Result<XPathValue, XPathError> {
        match expr {
            Expr::Literal(s) => Ok(XPathValue::String(s.clone())),
            Expr::Number(n) => Ok(XPathValue::Number(*n)),
            Expr::Negate(inner) => Ok(XPathValue::Number(-self.number(&self.eval(inner, focus)?))),
            Expr::Binary(op, left, right) => self.binary(*op, left, right, focus),
            Expr::Function(name, args) => self.function(name, args, focus),
            Expr::Path(path) => self.path(path, focus).map(XPathValue::NodeSet),
            Expr::Filter(primary, predicates) => {
                let nodes = self.eval(primary, focus)?.into_node_set()?;
                let nodes = self.filter(nodes, predicates)?;
                Ok(XPathValue::NodeSet(nodes))
            }
        }
    }

    // Conversions

    fn string(&self, value: &XPathValue) -> String {
        match value {
            XPathValue::NodeSet(nodes) => nodes
                .first()
                .map(|n| string_value(self.doc, *n))
                .unwrap_or_default(),
            XPathValue::Boolean(b) => b.to_string(),
            XPathValue::Number(n) => number_to_string(*n),
            XPathValue::String(s) => s.clone(),
        }
    }

    fn number(&self, value: &XPathValue) -> f64 {
        match value {
            XPathValue::Number(n) => *n,
            XPathValue::Boolean(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            other => string_to_number(&self.string(other)),
        }
    }

    // Document order

    fn order_key(&self, node: XPathNode) -> (usize, usize, usize) {
        match node {
            XPathNode::Node(id) => (self.order.get(&id).copied().unwrap_or(usize::MAX), 0, 0),
            XPathNode::Attribute { element, index } => (
                self.order.get(&element).copied().unwrap_or(usize::MAX),
                1,
                index,
            ),
        }
    }

    fn sort_unique(&self, mut nodes: Vec<XPathNode>) -> Vec<XPathNode> {
        nodes.sort_by_key(|n| self.order_key(*n));
        nodes.dedup();
        nodes
    }

    // Paths

    fn path(&self, path: &PathExpr, focus: Focus) -> Result<Vec<XPathNode>, XPathError> {
        let mut current = match &path.start {
            PathStart::Root => vec![XPathNode::Node(self.root_of(focus.node))],
            PathStart::Context => vec![focus.node],
            PathStart::Filter(expr) => self.eval(expr, focus)?.into_node_set()?,
        };

        for step in &path.steps {
            let mut next = Vec::new();
            for node in &current {
                next.extend(self.step(step, *node)?);
            }
            current = self.sort_unique(next);
        }

        Ok(current)
    }

    /// The document node, or the top of a detached subtree.
    fn root_of(&self, node: XPathNode) -> NodeId {
        let id = match node {
            XPathNode::Node(id) => id,
            XPathNode::Attribute { element, .. } => element,
        };
        self.doc.ancestors(id).last().copied().unwrap_or(id)
    }

    fn step(&self, step: &Step, node: XPathNode) -> Result<Vec<XPathNode>, XPathError> {
        let mut candidates = Vec::new();
        for candidate in self.axis(step.axis, node) {
            if self.test(&step.test, step.axis, candidate)? {
                candidates.push(candidate);
            }
        }

        // Candidates are in proximity order, so predicates see the right positions.
        self.filter(candidates, &step.predicates)
    }

    fn filter(&self, mut nodes: Vec<XPathNode>, predicates: &[Expr]) -> Result<Vec<XPathNode>, XPathError> {
        for predicate in predicates {
            let size = nodes.len();
            let mut kept = Vec::new();
            for (index, node) in nodes.iter().enumerate() {
                let focus = Focus {
                    node: *node,
                    position: index + 1,
                    size,
                };
                let keep = match self.eval(predicate, focus)? {
                    XPathValue::Number(n) => n == (index + 1) as f64,
                    other => other.to_boolean(),
                };
                if keep {
                    kept.push(*node);
                }
            }
            nodes = kept;
        }
        Ok(nodes)
    }

    fn is_xpath_node(&self, id: NodeId) -> bool {
        !matches!(
            self.doc.kind(id),
            NodeKind::Declaration(_) | NodeKind::DocType(_)
        )
    }

    fn nodes(&self, ids: impl IntoIterator<Item = NodeId>) -> Vec<XPathNode> {
        ids.into_iter()
            .filter(|id| self.is_xpath_node(*id))
            .map(XPathNode::Node)
            .collect()
    }

    /// Nodes along an axis, in proximity order.
    fn axis(&self, axis: Axis, node: XPathNode) -> Vec<XPathNode> {
        let doc = self.doc;
        match (axis, node) {
            (Axis::SelfAxis, _) => vec![node],

            (Axis::Child, XPathNode::Node(id)) => self.nodes(doc.children(id).iter().copied()),
            (Axis::Descendant, XPathNode::Node(id)) => self.nodes(doc.descendants(id)),
            (Axis::DescendantOrSelf, XPathNode::Node(id)) => {
                self.nodes(std::iter::once(id).chain(doc.descendants(id)))
            }
            (Axis::Child | Axis::Descendant, XPathNode::Attribute { .. }) => Vec::new(),
            (Axis::DescendantOrSelf, XPathNode::Attribute { .. }) => vec![node],

            (Axis::Parent, XPathNode::Node(id)) => self.nodes(doc.parent(id)),
            (Axis::Parent, XPathNode::Attribute { element, .. }) => vec![XPathNode::Node(element)],

            (Axis::Ancestor | Axis::AncestorOrSelf, _) => {
                let mut result = Vec::new();
                if axis == Axis::AncestorOrSelf {
                    result.push(node);
                }
                let start = match node {
                    XPathNode::Node(id) => id,
                    XPathNode::Attribute { element, .. } => {
                        result.push(XPathNode::Node(element));
                        element
                    }
                };
                result.extend(self.nodes(doc.ancestors(start)));
                result
            }

            (Axis::FollowingSibling, XPathNode::Node(id)) => match doc.parent(id) {
                Some(parent) => {
                    let siblings = doc.children(parent);
                    let index = siblings.iter().position(|c| *c == id).unwrap_or(siblings.len());
                    self.nodes(siblings[index + 1..].iter().copied())
                }
                None => Vec::new(),
            },
            (Axis::PrecedingSibling, XPathNode::Node(id)) => match doc.parent(id) {
                Some(parent) => {
                    let siblings = doc.children(parent);
                    let index = siblings.iter().position(|c| *c == id).unwrap_or(0);
                    self.nodes(siblings[..index].iter().rev().copied())
                }
                None => Vec::new(),
            },
            (Axis::FollowingSibling | Axis::PrecedingSibling, XPathNode::Attribute { .. }) => {
                Vec::new()
            }

            (Axis::Following, _) => {
                let (anchor, skip_descendants) = match node {
                    XPathNode::Node(id) => (id, true),
                    XPathNode::Attribute { element, .. } => (element, false),
                };
                let all = doc.descendants(self.root_of(node));
                let index = all.iter().position(|n| *n == anchor);
                let after = index.map_or(&[][..], |i| &all[i + 1..]);
                self.nodes(
                    after
                        .iter()
                        .copied()
                        .filter(|n| !skip_descendants || !doc.is_ancestor_or_self(anchor, *n)),
                )
            }
            (Axis::Preceding, _) => {
                let anchor = match node {
                    XPathNode::Node(id) => id,
                    XPathNode::Attribute { element, .. } => element,
                };
                let all = doc.descendants(self.root_of(node));
                let index = all.iter().position(|n| *n == anchor).unwrap_or(0);
                let ancestors = doc.ancestors(anchor);
                self.nodes(
                    all[..index]
                        .iter()
                        .rev()
                        .copied()
                        .filter(|n| !ancestors.contains(n)),
                )
            }

            (Axis::Attribute, XPathNode::Node(id)) => doc
                .attributes(id)
                .iter()
                .enumerate()
                .filter(|(_, a)| !a.name.is_namespace_declaration())
                .map(|(index, _)| XPathNode::Attribute { element: id, index })
                .collect(),
            (Axis::Attribute, XPathNode::Attribute { .. }) => Vec::new(),
        }
    }

    fn test(&self, test: &NodeTest, axis: Axis, node: XPathNode) -> Result<bool, XPathError> {
        let doc = self.doc;

        // Name tests select the principal node type of the axis.
        let principal = match (axis, node) {
            (Axis::Attribute, XPathNode::Attribute { .. }) => true,
            (Axis::Attribute, _) => false,
            (_, XPathNode::Node(id)) => doc.is_element(id),
            (_, XPathNode::Attribute { .. }) => false,
        };

        match test {
            NodeTest::Node => Ok(true),
            NodeTest::Text => Ok(matches!(
                node.as_node().map(|id| doc.kind(id)),
                Some(NodeKind::Text(_) | NodeKind::CData(_))
            )),
            NodeTest::Comment => Ok(matches!(
                node.as_node().map(|id| doc.kind(id)),
                Some(NodeKind::Comment(_))
            )),
            NodeTest::ProcessingInstruction(target) => Ok(match node.as_node().map(|id| doc.kind(id)) {
                Some(NodeKind::ProcessingInstruction(raw)) => {
                    target.as_deref().is_none_or(|t| t == pi_target(raw))
                }
                _ => false,
            }),
            NodeTest::AnyName => Ok(principal),
            NodeTest::PrefixedAny(prefix) => {
                if !principal {
                    return Ok(false);
                }
                let expected = self.ns.resolve(prefix)?;
                Ok(self.namespace_of(node).as_deref() == Some(expected))
            }
            NodeTest::Name { prefix, local } => {
                if !principal || self.local_name_of(node) != *local {
                    return Ok(false);
                }
                let expected = match (prefix, node) {
                    (Some(p), _) => Some(self.ns.resolve(p)?.to_string()),
                    (None, XPathNode::Node(_)) => self.ns.default_namespace().map(str::to_string),
                    (None, XPathNode::Attribute { .. }) => None,
                };
                Ok(self.namespace_of(node) == expected)
            }
        }
    }

    fn local_name_of(&self, node: XPathNode) -> String {
        match node {
            XPathNode::Node(id) => match self.doc.kind(id) {
                NodeKind::Element(e) => e.name.local.clone(),
                NodeKind::ProcessingInstruction(raw) => pi_target(raw).to_string(),
                _ => String::new(),
            },
            XPathNode::Attribute { element, index } => self
                .doc
                .attributes(element)
                .get(index)
                .map(|a| a.name.local.clone())
                .unwrap_or_default(),
        }
    }

    fn qualified_name_of(&self, node: XPathNode) -> String {
        match node {
            XPathNode::Node(id) => match self.doc.kind(id) {
                NodeKind::Element(e) => e.name.to_string(),
                NodeKind::ProcessingInstruction(raw) => pi_target(raw).to_string(),
                _ => String::new(),
            },
            XPathNode::Attribute { element, index } => self
                .doc
                .attributes(element)
                .get(index)
                .map(|a| a.name.to_string())
                .unwrap_or_default(),
        }
    }

    fn namespace_of(&self, node: XPathNode) -> Option<String> {
        match node {
            XPathNode::Node(id) => self.doc.namespace_uri(id),
            XPathNode::Attribute { element, index } => {
                let attr = self.doc.attributes(element).get(index)?;
                self.doc.attribute_namespace(element, &attr.name)
            }
        }
    }

    // Operators

    fn binary(&self, op: BinaryOp, left: &Expr, right: &Expr, focus: Focus) -> Result<XPathValue, XPathError> {
        match op {
            BinaryOp::Or => {
                let l = self.eval(left, focus)?.to_boolean();
                Ok(XPathValue::Boolean(l || self.eval(right, focus)?.to_boolean()))
            }
            BinaryOp::And => {
                let l = self.eval(left, focus)?.to_boolean();
                Ok(XPathValue::Boolean(l && self.eval(right, focus)?.to_boolean()))
            }
            BinaryOp::Union => {
                let mut nodes = self.eval(left, focus)?.into_node_set()?;
                nodes.extend(self.eval(right, focus)?.into_node_set()?);
                Ok(XPathValue::NodeSet(self.sort_unique(nodes)))
            }
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
                let l = self.number(&self.eval(left, focus)?);
                let r = self.number(&self.eval(right, focus)?);
                Ok(XPathValue::Number(match op {
                    BinaryOp::Add => l + r,
                    BinaryOp::Sub => l - r,
                    BinaryOp::Mul => l * r,
                    BinaryOp::Div => l / r,
                    _ => l % r,
                }))
            }
            _ => {
                let l = self.eval(left, focus)?;
                let r = self.eval(right, focus)?;
                Ok(XPathValue::Boolean(self.compare(op, &l, &r)))
            }
        }
    }

    fn compare(&self, op: BinaryOp, left: &XPathValue, right: &XPathValue) -> bool {
        use XPathValue::*;

        match (left, right) {
            (NodeSet(l), NodeSet(r)) => l.iter().any(|a| {
                let a = string_value(self.doc, *a);
                r.iter()
                    .any(|b| self.compare_atoms(op, &String(a.clone()), &String(string_value(self.doc, *b))))
            }),
            (NodeSet(nodes), Boolean(_)) => {
                self.compare_atoms(op, &Boolean(!nodes.is_empty()), right)
            }
            (Boolean(_), NodeSet(nodes)) => {
                self.compare_atoms(op, left, &Boolean(!nodes.is_empty()))
            }
            (NodeSet(nodes), other) => nodes
                .iter()
                .any(|n| self.compare_atoms(op, &String(string_value(self.doc, *n)), other)),
            (other, NodeSet(nodes)) => nodes
                .iter()
                .any(|n| self.compare_atoms(op, other, &String(string_value(self.doc, *n)))),
            _ => self.compare_atoms(op, left, right),
        }
    }

    fn compare_atoms(&self, op: BinaryOp, left: &XPathValue, right: &XPathValue) -> bool {
        use XPathValue::*;

        if matches!(op, BinaryOp::Eq | BinaryOp::NotEq) {
            let equal = match (left, right) {
                (Boolean(_), _) | (_, Boolean(_)) => left.to_boolean() == right.to_boolean(),
                (Number(_), _) | (_, Number(_)) => self.number(left) == self.number(right),
                _ => self.string(left) == self.string(right),
            };
            return if op == BinaryOp::Eq { equal } else { !equal };
        }

        let ordering = self.number(left).partial_cmp(&self.number(right));
        match op {
            BinaryOp::Lt => ordering == Some(Ordering::Less),
            BinaryOp::LtEq => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
            BinaryOp::Gt => ordering == Some(Ordering::Greater),
            BinaryOp::GtEq => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
            _ => false,
        }
    }

    // Functions

    fn function(&self, name: &str, args: &[Expr], focus: Focus) -> Result<XPathValue, XPathError> {
        let values = args
            .iter()
            .map(|a| self.eval(a, focus))
            .collect::<Result<Vec<_>, _>>()?;

        let string_arg = |i: usize| -> String {
            values
                .get(i)
                .map(|v| self.string(v))
                .unwrap_or_else(|| string_value(self.doc, focus.node))
        };
        let number_arg = |i: usize| -> f64 { values.get(i).map_or(f64::NAN, |v| self.number(v)) };
        let node_arg = |i: usize| -> Result<Option<XPathNode>, XPathError> {
            match values.get(i) {
                Some(v) => Ok(v.clone().into_node_set()?.first().copied()),
                None => Ok(Some(focus.node)),
            }
        };

        let value = match name {
            "last" => XPathValue::Number(focus.size as f64),
            "position" => XPathValue::Number(focus.position as f64),
            "count" => XPathValue::Number(values[0].clone().into_node_set()?.len() as f64),
            "local-name" => XPathValue::String(
                node_arg(0)?
                    .map(|n| self.local_name_of(n))
                    .unwrap_or_default(),
            ),
            "name" => XPathValue::String(
                node_arg(0)?
                    .map(|n| self.qualified_name_of(n))
                    .unwrap_or_default(),
            ),
            "namespace-uri" => XPathValue::String(
                node_arg(0)?
                    .and_then(|n| self.namespace_of(n))
                    .unwrap_or_default(),
            ),
            "string" => XPathValue::String(string_arg(0)),
            "concat" => XPathValue::String((0..values.len()).map(string_arg).collect()),
            "starts-with" => XPathValue::Boolean(string_arg(0).starts_with(&string_arg(1))),
            "contains" => XPathValue::Boolean(string_arg(0).contains(&string_arg(1))),
            "substring-before" => {
                let s = string_arg(0);
                let pattern = string_arg(1);
                XPathValue::String(
                    s.find(&pattern)
                        .map(|at| s[..at].to_string())
                        .unwrap_or_default(),
                )
            }
            "substring-after" => {
                let s = string_arg(0);
                let pattern = string_arg(1);
                XPathValue::String(
                    s.find(&pattern)
                        .map(|at| s[at + pattern.len()..].to_string())
                        .unwrap_or_default(),
                )
            }
            "substring" => {
                let s = string_arg(0);
                let start = round(number_arg(1));
                let end = if values.len() > 2 {
                    start + round(number_arg(2))
                } else {
                    f64::INFINITY
                };
                XPathValue::String(
                    s.chars()
                        .enumerate()
                        .filter(|(i, _)| {
                            let p = (*i + 1) as f64;
                            p >= start && p < end
                        })
                        .map(|(_, c)| c)
                        .collect(),
                )
            }
            "string-length" => XPathValue::Number(string_arg(0).chars().count() as f64),
            "normalize-space" => XPathValue::String(
                string_arg(0)
                    .split_whitespace()
                    .collect::<Vec<_>>()
                    .join(" "),
            ),
            "translate" => {
                let from: Vec<char> = string_arg(1).chars().collect();
                let to: Vec<char> = string_arg(2).chars().collect();
                XPathValue::String(
                    string_arg(0)
                        .chars()
                        .filter_map(|c| match from.iter().position(|f| *f == c) {
                            Some(i) => to.get(i).copied(),
                            None => Some(c),
                        })
                        .collect(),
                )
            }
            "boolean" => XPathValue::Boolean(values[0].to_boolean()),
            "not" => XPathValue::Boolean(!values[0].to_boolean()),
            "true" => XPathValue::Boolean(true),
            "false" => XPathValue::Boolean(false),
            "number" => XPathValue::Number(match values.first() {
                Some(v) => self.number(v),
                None => string_to_number(&string_value(self.doc, focus.node)),
            }),
            "sum" => XPathValue::Number(
                values[0]
                    .clone()
                    .into_node_set()?
                    .iter()
                    .map(|n| string_to_number(&string_value(self.doc, *n)))
                    .sum(),
            ),
            "floor" => XPathValue::Number(number_arg(0).floor()),
            "ceiling" => XPathValue::Number(number_arg(0).ceil()),
            "round" => XPathValue::Number(round(number_arg(0))),
            other => {
                return Err(XPathError::UnknownFunction {
                    name: other.to_string(),
                    position: 0,
                });
            }
        };

        Ok(value)
    }
}

/// XPath `round()`: halves round towards positive infinity.
fn round(n: f64) -> f64 {
    if n.is_nan() || n.is_infinite() {
        n
    } else {
        (n + 0.5).floor()
    }
}
