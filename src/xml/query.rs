//! Path expressions over a [`Document`].
//!
//! Supported subset:
//!
//! | Form            | Meaning                                        |
//! |-----------------|------------------------------------------------|
//! | `/a/b`          | child steps from the document                  |
//! | `//a`, `/a//b`  | descendant-or-self, then child                 |
//! | `*`             | any element name                               |
//! | `[2]`           | position among the matches of one parent (1-based) |
//! | `[@k]`          | element has attribute `k`                      |
//! | `[@k='v']`      | attribute `k` equals `v`                       |
//! | `text()`        | text children (last step only)                 |
//! | `@k`, `@*`      | attributes (last step only)                    |

use super::{Content, Document, Element};
use crate::error::{Error, Result};
use rustc_hash::FxHashSet;

/// A compiled path expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    source: String,
    steps: Vec<Step>,
    target: Target,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Child,
    Descendant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Predicate {
    Position(usize),
    HasAttribute(String),
    AttributeEquals(String, String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Step {
    axis: Axis,
    /// `None` matches any name.
    name: Option<String>,
    predicates: Vec<Predicate>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    Elements,
    Text(Axis),
    /// `None` selects every attribute.
    Attribute(Axis, Option<String>),
}

/// One node selected by a query, detached from its document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selected {
    Element(Element),
    Text(String),
    Attribute { name: String, value: String },
}

impl Selected {
    /// Text content: descendant text for elements, the value for attributes.
    pub fn string_value(&self) -> String {
        match self {
            Self::Element(e) => e.text(),
            Self::Text(t) => t.clone(),
            Self::Attribute { value, .. } => value.clone(),
        }
    }

    /// Markup of the selected node.
    pub fn to_xml(&self) -> String {
        match self {
            Self::Element(e) => e.to_xml(),
            Self::Text(t) => quick_xml::escape::escape(t.as_str()).into_owned(),
            Self::Attribute { name, value } => {
                format!("{name}=\"{}\"", quick_xml::escape::escape(value.as_str()))
            }
        }
    }
}

// ============================================================================
// Parsing
// ============================================================================

impl Query {
    /// Compile `source`, failing with [`Error::InvalidQuery`] when malformed.
    pub fn parse(source: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidQuery {
            query: source.to_owned(),
            reason: reason.to_owned(),
        };

        let mut parser = Parser {
            rest: source.trim(),
        };
        if parser.rest.is_empty() {
            return Err(invalid("empty expression"));
        }

        let mut steps = Vec::new();
        let mut target = Target::Elements;
        let mut first = true;

        while !parser.rest.is_empty() {
            if target != Target::Elements {
                return Err(invalid("text() and attributes must be the last step"));
            }

            let axis = if parser.eat("//") {
                Axis::Descendant
            } else if parser.eat("/") || first {
                Axis::Child
            } else {
                return Err(invalid("expected `/`"));
            };
            first = false;

            if parser.eat("text()") {
                target = Target::Text(axis);
            } else if parser.eat("@") {
                let name = if parser.eat("*") {
                    None
                } else {
                    Some(parser.name().ok_or_else(|| invalid("expected attribute name"))?)
                };
                target = Target::Attribute(axis, name);
            } else {
                let name = if parser.eat("*") {
                    None
                } else {
                    Some(parser.name().ok_or_else(|| invalid("expected element name"))?)
                };
                let mut predicates = Vec::new();
                while parser.eat("[") {
                    predicates.push(parser.predicate().map_err(|reason| invalid(reason))?);
                    if !parser.eat("]") {
                        return Err(invalid("expected `]`"));
                    }
                }
                steps.push(Step {
                    axis,
                    name,
                    predicates,
                });
            }
        }

        Ok(Self {
            source: source.to_owned(),
            steps,
            target,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

struct Parser<'a> {
    rest: &'a str,
}

impl<'a> Parser<'a> {
    fn eat(&mut self, token: &str) -> bool {
        match self.rest.strip_prefix(token) {
            Some(rest) => {
                self.rest = rest;
                true
            }
            None => false,
        }
    }

    fn name(&mut self) -> Option<String> {
        let mut chars = self.rest.char_indices();
        match chars.next() {
            Some((_, c)) if c.is_alphabetic() || c == '_' => {}
            _ => return None,
        }
        let end = chars
            .find(|&(_, c)| !(c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':')))
            .map_or(self.rest.len(), |(i, _)| i);
        let (name, rest) = self.rest.split_at(end);
        self.rest = rest;
        Some(name.to_owned())
    }

    fn predicate(&mut self) -> std::result::Result<Predicate, &'static str> {
        if self.eat("@") {
            let name = self.name().ok_or("expected attribute name in predicate")?;
            if !self.eat("=") {
                return Ok(Predicate::HasAttribute(name));
            }
            let quote = match self.rest.chars().next() {
                Some(q @ ('\'' | '"')) => q,
                _ => return Err("expected quoted value in predicate"),
            };
            let body = &self.rest[1..];
            let end = body.find(quote).ok_or("unterminated string in predicate")?;
            let value = body[..end].to_owned();
            self.rest = &body[end + 1..];
            return Ok(Predicate::AttributeEquals(name, value));
        }

        let end = self
            .rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(self.rest.len());
        let position = self.rest[..end]
            .parse::<usize>()
            .ok()
            .filter(|&n| n >= 1)
            .ok_or("expected a position starting at 1 or an attribute test")?;
        self.rest = &self.rest[end..];
        Ok(Predicate::Position(position))
    }
}

// ============================================================================
// Evaluation
// ============================================================================

/// Context node: the document itself or one of its elements.
#[derive(Clone, Copy)]
enum Scope<'d> {
    Document(&'d Element),
    Element(&'d Element),
}

impl<'d> Scope<'d> {
    fn children(self) -> Vec<&'d Element> {
        match self {
            Scope::Document(root) => vec![root],
            Scope::Element(e) => e.elements().collect(),
        }
    }

    /// The node itself and every element below it, in document order.
    fn descendants_or_self(self) -> Vec<Scope<'d>> {
        let mut out = vec![self];
        let mut pending: Vec<&Element> = self.children();
        pending.reverse();
        while let Some(e) = pending.pop() {
            out.push(Scope::Element(e));
            pending.extend(e.elements().collect::<Vec<_>>().into_iter().rev());
        }
        out
    }

    fn with_axis(self, axis: Axis) -> Vec<Scope<'d>> {
        match axis {
            Axis::Child => vec![self],
            Axis::Descendant => self.descendants_or_self(),
        }
    }

    /// Identity of the node; the document and its root element differ.
    fn key(self) -> (bool, *const Element) {
        match self {
            Scope::Document(root) => (true, root as *const Element),
            Scope::Element(e) => (false, e as *const Element),
        }
    }
}

/// Elements of the tree under `root` that are in `wanted`, in document order.
fn document_order<'d>(root: &'d Element, wanted: &FxHashSet<*const Element>) -> Vec<&'d Element> {
    let mut out = Vec::with_capacity(wanted.len());
    if wanted.is_empty() {
        return out;
    }
    let mut pending = vec![root];
    while let Some(e) = pending.pop() {
        if wanted.contains(&(e as *const Element)) {
            out.push(e);
        }
        pending.extend(e.elements().collect::<Vec<_>>().into_iter().rev());
    }
    out
}

/// Every distinct node reached from `context` along `axis`.
fn expand<'d>(context: &[Scope<'d>], axis: Axis) -> Vec<Scope<'d>> {
    let mut visited = FxHashSet::default();
    let mut out = Vec::new();
    for &node in context {
        for n in node.with_axis(axis) {
            if visited.insert(n.key()) {
                out.push(n);
            }
        }
    }
    out
}

impl Predicate {
    fn apply<'d>(&self, matches: Vec<&'d Element>) -> Vec<&'d Element> {
        match self {
            Predicate::Position(n) => matches.get(n - 1).copied().into_iter().collect(),
            Predicate::HasAttribute(k) => matches
                .into_iter()
                .filter(|e| e.attribute(k).is_some())
                .collect(),
            Predicate::AttributeEquals(k, v) => matches
                .into_iter()
                .filter(|e| e.attribute(k) == Some(v.as_str()))
                .collect(),
        }
    }
}

impl Step {
    fn select<'d>(&self, root: &'d Element, context: &[Scope<'d>]) -> Vec<Scope<'d>> {
        let mut found = FxHashSet::default();
        for parent in expand(context, self.axis) {
            let mut matches: Vec<&Element> = parent
                .children()
                .into_iter()
                .filter(|e| self.name.as_ref().is_none_or(|n| *n == e.name))
                .collect();
            for predicate in &self.predicates {
                matches = predicate.apply(matches);
            }
            found.extend(matches.into_iter().map(|e| e as *const Element));
        }
        document_order(root, &found)
            .into_iter()
            .map(Scope::Element)
            .collect()
    }
}

impl Query {
    pub(crate) fn evaluate(&self, document: &Document) -> Vec<Selected> {
        let root = document.root();
        let mut context = vec![Scope::Document(root)];
        for step in &self.steps {
            context = step.select(root, &context);
        }

        let owners = |axis: Axis| {
            let wanted: FxHashSet<*const Element> = expand(&context, axis)
                .into_iter()
                .filter_map(|n| match n {
                    Scope::Element(e) => Some(e as *const Element),
                    Scope::Document(_) => None,
                })
                .collect();
            document_order(root, &wanted)
        };

        match &self.target {
            Target::Elements => context
                .iter()
                .filter_map(|n| match n {
                    Scope::Element(e) => Some(Selected::Element((*e).clone())),
                    Scope::Document(_) => None,
                })
                .collect(),
            Target::Text(axis) => owners(*axis)
                .into_iter()
                .flat_map(|e| e.children.iter())
                .filter_map(|c| match c {
                    Content::Text(t) => Some(Selected::Text(t.clone())),
                    Content::Element(_) => None,
                })
                .collect(),
            Target::Attribute(axis, name) => owners(*axis)
                .into_iter()
                .flat_map(|e| e.attributes.iter())
                .filter(|(k, _)| name.as_ref().is_none_or(|n| n == k))
                .map(|(k, v)| Selected::Attribute {
                    name: k.clone(),
                    value: v.clone(),
                })
                .collect(),
        }
    }
}
