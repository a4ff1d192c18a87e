//! Namespace-aware path queries over a [`Document`].
//!
//! Supports the XPath subset the pipeline needs:
//!
//! ```text
//! //opf:item[@properties="nav"]/@href
//! //xhtml:nav[@epub:type="landmarks"]/xhtml:ol/xhtml:li/xhtml:a
//! //opf:item[contains(@properties, "cover-image")]
//! ```
//!
//! Steps are separated by `/` (child) or `//` (descendant). A relative path
//! starts from the context node's children. Unprefixed name tests match any
//! namespace.

use std::collections::HashSet;

use super::{Document, Namespaces, NodeId, local_name, prefix_of};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Child,
    Descendant,
}

#[derive(Debug, Clone)]
struct NameTest {
    /// `None` for `*`.
    local: Option<String>,
    /// Resolved namespace of a prefixed test.
    namespace: Option<String>,
    prefixed: bool,
}

#[derive(Debug, Clone)]
struct AttrName {
    namespace: Option<String>,
    local: String,
}

#[derive(Debug, Clone)]
enum Predicate {
    Has(AttrName),
    Equals(AttrName, String),
    Contains(AttrName, String),
}

#[derive(Debug, Clone)]
struct Step {
    axis: Axis,
    test: NameTest,
    predicates: Vec<Predicate>,
}

/// A compiled path.
#[derive(Debug, Clone)]
pub(crate) struct Query {
    absolute: bool,
    steps: Vec<Step>,
    attribute: Option<AttrName>,
}

impl Query {
    pub(crate) fn compile(path: &str, namespaces: &Namespaces) -> Result<Self> {
        Parser {
            src: path,
            pos: 0,
            namespaces,
        }
        .parse()
    }

    /// Matching elements, in the order they were first reached.
    pub(crate) fn select(&self, doc: &Document, context: NodeId) -> Vec<NodeId> {
        let start = if self.absolute { doc.root() } else { context };
        let mut current = vec![start];

        for step in &self.steps {
            let mut seen = HashSet::new();
            let mut next = Vec::new();
            for &node in &current {
                let candidates: Vec<NodeId> = match step.axis {
                    Axis::Child => doc.element_children(node).collect(),
                    Axis::Descendant => doc
                        .descendants(node)
                        .into_iter()
                        .filter(|&id| doc.element(id).is_some())
                        .collect(),
                };
                for candidate in candidates {
                    if step.matches(doc, candidate) && seen.insert(candidate) {
                        next.push(candidate);
                    }
                }
            }
            current = next;
        }

        current
    }

    pub(crate) fn attribute_values(&self, doc: &Document, context: NodeId) -> Vec<String> {
        let elements = self.select(doc, context);
        match &self.attribute {
            Some(attr) => elements
                .into_iter()
                .filter_map(|id| attr.value(doc, id))
                .collect(),
            None => elements
                .into_iter()
                .map(|id| doc.text_content(id))
                .collect(),
        }
    }

    pub(crate) fn selects_attribute(&self) -> bool {
        self.attribute.is_some()
    }
}

impl Step {
    fn matches(&self, doc: &Document, id: NodeId) -> bool {
        let Some(el) = doc.element(id) else {
            return false;
        };
        if let Some(local) = &self.test.local
            && local_name(&el.name) != local
        {
            return false;
        }
        if self.test.prefixed && doc.namespace(id) != self.test.namespace.as_deref() {
            return false;
        }
        self.predicates.iter().all(|p| p.holds(doc, id))
    }
}

impl AttrName {
    fn value(&self, doc: &Document, id: NodeId) -> Option<String> {
        doc.attribute_ns(id, self.namespace.as_deref(), &self.local)
            .map(|v| v.into_owned())
    }
}

impl Predicate {
    fn holds(&self, doc: &Document, id: NodeId) -> bool {
        match self {
            Predicate::Has(attr) => attr.value(doc, id).is_some(),
            Predicate::Equals(attr, expected) => attr.value(doc, id).as_deref() == Some(expected),
            Predicate::Contains(attr, needle) => attr
                .value(doc, id)
                .is_some_and(|v| v.contains(needle.as_str())),
        }
    }
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    namespaces: &'a Namespaces,
}

impl Parser<'_> {
    fn parse(mut self) -> Result<Query> {
        let absolute = self.rest().starts_with('/');
        let mut steps = Vec::new();
        let mut attribute = None;
        let mut axis = Axis::Child;

        if self.eat("//") {
            axis = Axis::Descendant;
        } else {
            self.eat("/");
        }

        loop {
            if self.eat("@") {
                attribute = Some(self.attr_name()?);
                if !self.rest().is_empty() {
                    return Err(self.error("attribute selection must be the last step"));
                }
                break;
            }

            let test = self.name_test()?;
            let mut predicates = Vec::new();
            while self.eat("[") {
                predicates.push(self.predicate()?);
                self.skip_ws();
                if !self.eat("]") {
                    return Err(self.error("expected ']'"));
                }
            }
            steps.push(Step {
                axis,
                test,
                predicates,
            });

            if self.rest().is_empty() {
                break;
            } else if self.eat("//") {
                axis = Axis::Descendant;
            } else if self.eat("/") {
                axis = Axis::Child;
            } else {
                return Err(self.error("expected '/'"));
            }
        }

        if steps.is_empty() {
            return Err(self.error("no element step"));
        }

        Ok(Query {
            absolute,
            steps,
            attribute,
        })
    }

    fn rest(&self) -> &str {
        &self.src[self.pos..]
    }

    fn eat(&mut self, token: &str) -> bool {
        if self.rest().starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    fn skip_ws(&mut self) {
        let trimmed = self.rest().trim_start();
        self.pos = self.src.len() - trimmed.len();
    }

    fn error(&self, message: &str) -> Error {
        Error::InvalidQuery(format!("{message} at offset {} in `{}`", self.pos, self.src))
    }

    fn qname(&mut self) -> Result<&str> {
        let start = self.pos;
        let len = self
            .rest()
            .find(|c: char| !(c.is_alphanumeric() || matches!(c, ':' | '-' | '_' | '.' | '*')))
            .unwrap_or(self.rest().len());
        self.pos += len;
        let name = &self.src[start..self.pos];
        if name.is_empty() {
            return Err(self.error("expected a name"));
        }
        Ok(name)
    }

    fn resolve(&self, prefix: &str) -> Result<String> {
        self.namespaces
            .uri(prefix)
            .map(str::to_string)
            .ok_or_else(|| self.error(&format!("unknown prefix `{prefix}`")))
    }

    fn name_test(&mut self) -> Result<NameTest> {
        let name = self.qname()?.to_string();
        if name == "*" {
            return Ok(NameTest {
                local: None,
                namespace: None,
                prefixed: false,
            });
        }
        match prefix_of(&name) {
            Some(prefix) => Ok(NameTest {
                local: Some(local_name(&name).to_string()),
                namespace: Some(self.resolve(prefix)?),
                prefixed: true,
            }),
            None => Ok(NameTest {
                local: Some(name),
                namespace: None,
                prefixed: false,
            }),
        }
    }

    fn attr_name(&mut self) -> Result<AttrName> {
        let name = self.qname()?.to_string();
        let namespace = match prefix_of(&name) {
            Some(prefix) => Some(self.resolve(prefix)?),
            None => None,
        };
        Ok(AttrName {
            namespace,
            local: local_name(&name).to_string(),
        })
    }

    fn literal(&mut self) -> Result<String> {
        self.skip_ws();
        let quote = match self.rest().chars().next() {
            Some(q @ ('"' | '\'')) => q,
            _ => return Err(self.error("expected a quoted string")),
        };
        self.pos += 1;
        let end = self
            .rest()
            .find(quote)
            .ok_or_else(|| self.error("unterminated string"))?;
        let value = self.rest()[..end].to_string();
        self.pos += end + 1;
        Ok(value)
    }

    fn predicate(&mut self) -> Result<Predicate> {
        self.skip_ws();
        if self.eat("contains(") {
            self.skip_ws();
            if !self.eat("@") {
                return Err(self.error("expected '@' in contains()"));
            }
            let attr = self.attr_name()?;
            self.skip_ws();
            if !self.eat(",") {
                return Err(self.error("expected ','"));
            }
            let needle = self.literal()?;
            self.skip_ws();
            if !self.eat(")") {
                return Err(self.error("expected ')'"));
            }
            return Ok(Predicate::Contains(attr, needle));
        }

        if !self.eat("@") {
            return Err(self.error("expected '@' or contains()"));
        }
        let attr = self.attr_name()?;
        self.skip_ws();
        if self.eat("=") {
            let value = self.literal()?;
            Ok(Predicate::Equals(attr, value))
        } else {
            Ok(Predicate::Has(attr))
        }
    }
}
