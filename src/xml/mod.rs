//! Markup document model.
//!
//! A small namespace-aware XML tree built on `quick-xml`, with path queries
//! and two serializations: lossless ([`Document::to_xml`]) and canonical
//! tab-indented ([`Document::to_pretty_xml`]).

mod document;
mod escape;
mod query;

pub use document::{Attribute, Document, Element, NodeData, NodeId};
pub use escape::{escape_xml, strip_bom, unescape_xml};

use crate::error::{Error, Result};
use query::Query;

pub const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";
pub const XHTML_NS: &str = "http://www.w3.org/1999/xhtml";
pub const EPUB_NS: &str = "http://www.idpf.org/2007/ops";
pub const OPF_NS: &str = "http://www.idpf.org/2007/opf";
pub const DC_NS: &str = "http://purl.org/dc/elements/1.1/";
pub const NCX_NS: &str = "http://www.daisy.org/z3986/2005/ncx/";
pub const Z3998_NS: &str = "http://www.daisy.org/z3998/2012/vocab/structure/";
pub const SE_NS: &str = "https://standardebooks.org/vocab/1.0";

/// Prefix bindings used to resolve names in queries.
#[derive(Debug, Clone)]
pub struct Namespaces {
    bindings: Vec<(String, String)>,
}

impl Namespaces {
    /// No bindings at all.
    pub fn empty() -> Self {
        Self {
            bindings: Vec::new(),
        }
    }

    /// The prefixes used throughout an EPUB source tree.
    pub fn epub() -> Self {
        Self::empty()
            .with("xhtml", XHTML_NS)
            .with("epub", EPUB_NS)
            .with("z3998", Z3998_NS)
            .with("se", SE_NS)
            .with("dc", DC_NS)
            .with("opf", OPF_NS)
            .with("ncx", NCX_NS)
    }

    /// Bind (or rebind) a prefix.
    pub fn with(mut self, prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        let prefix = prefix.into();
        self.bindings.retain(|(p, _)| *p != prefix);
        self.bindings.push((prefix, uri.into()));
        self
    }

    pub fn uri(&self, prefix: &str) -> Option<&str> {
        if prefix == "xml" {
            return Some(XML_NS);
        }
        self.bindings
            .iter()
            .find(|(p, _)| p == prefix)
            .map(|(_, uri)| uri.as_str())
    }
}

impl Default for Namespaces {
    fn default() -> Self {
        Self::epub()
    }
}

impl Document {
    /// Elements matching `path`, resolved with the EPUB prefixes.
    ///
    /// No match is an empty vector. Paths ending in `/@name` must go
    /// through [`Document::query_values`].
    pub fn query(&self, path: &str) -> Result<Vec<NodeId>> {
        self.query_with(&Namespaces::default(), self.root(), path)
    }

    /// Like [`Document::query`], relative to `context`.
    pub fn query_from(&self, context: NodeId, path: &str) -> Result<Vec<NodeId>> {
        self.query_with(&Namespaces::default(), context, path)
    }

    pub fn query_with(&self, namespaces: &Namespaces, context: NodeId, path: &str) -> Result<Vec<NodeId>> {
        let query = Query::compile(path, namespaces)?;
        if query.selects_attribute() {
            return Err(Error::InvalidQuery(format!(
                "`{path}` selects attribute values; use query_values"
            )));
        }
        Ok(query.select(self, context))
    }

    /// Attribute values for paths ending in `/@name`, otherwise the text
    /// content of each matching element.
    pub fn query_values(&self, path: &str) -> Result<Vec<String>> {
        let query = Query::compile(path, &Namespaces::default())?;
        Ok(query.attribute_values(self, self.root()))
    }

    /// First value of [`Document::query_values`], if any.
    pub fn query_value(&self, path: &str) -> Result<Option<String>> {
        Ok(self.query_values(path)?.into_iter().next())
    }
}

/// Extract local name from a qualified name (e.g., "dc:title" -> "title").
pub(crate) fn local_name(name: &str) -> &str {
    name.rsplit_once(':').map_or(name, |(_, local)| local)
}

/// Prefix of a qualified name, if any.
pub(crate) fn prefix_of(name: &str) -> Option<&str> {
    name.split_once(':').map(|(prefix, _)| prefix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_name() {
        assert_eq!(local_name("title"), "title");
        assert_eq!(local_name("dc:title"), "title");
        assert_eq!(local_name("opf:meta"), "meta");
        assert_eq!(local_name(""), "");
    }

    #[test]
    fn test_prefix_of() {
        assert_eq!(prefix_of("epub:type"), Some("epub"));
        assert_eq!(prefix_of("href"), None);
    }

    #[test]
    fn test_namespaces_rebind() {
        let ns = Namespaces::epub().with("se", "http://standardebooks.org/vocab/1.0");
        assert_eq!(ns.uri("se"), Some("http://standardebooks.org/vocab/1.0"));
        assert_eq!(ns.uri("xml"), Some(XML_NS));
        assert_eq!(Namespaces::empty().uri("dc"), None);
    }
}
