//! EPUB3 navigation document reader.

use crate::error::{Error, Result};
use crate::xml::{Document, EPUB_NS, NodeId, XHTML_NS, XML_NS};

use super::rebase_href;

/// One entry of the reading-order list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavEntry {
    /// Link text with whitespace collapsed.
    pub label: String,
    pub href: String,
    pub children: Vec<NavEntry>,
}

impl NavEntry {
    pub fn new(label: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            href: href.into(),
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<NavEntry>) -> Self {
        self.children = children;
        self
    }

    /// Number of entries in this subtree, this one included.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(NavEntry::count).sum::<usize>()
    }

    /// Nesting depth of this subtree (1 for a leaf).
    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(NavEntry::depth).max().unwrap_or(0)
    }
}

/// A landmarks link and its structural roles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Landmark {
    /// Tokens of the link's `epub:type`, e.g. `["frontmatter", "titlepage"]`.
    pub roles: Vec<String>,
    pub href: String,
    pub label: String,
}

/// The parts of a navigation document the legacy formats need.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavDocument {
    pub entries: Vec<NavEntry>,
    pub landmarks: Vec<Landmark>,
    /// `xml:lang` (or `lang`) of the root element.
    pub language: Option<String>,
}

impl NavDocument {
    /// Parse a navigation document.
    ///
    /// A missing `nav[epub:type="toc"]` is an error; missing landmarks are
    /// not.
    pub fn parse(text: &str) -> Result<Self> {
        Self::from_document(&Document::parse(text)?)
    }

    pub fn from_document(doc: &Document) -> Result<Self> {
        let toc = doc
            .query(r#"//xhtml:nav[@epub:type="toc"]"#)?
            .into_iter()
            .next()
            .ok_or_else(|| Error::MissingElement(r#"nav[epub:type="toc"]"#.to_string()))?;

        let entries = match doc.query_from(toc, "xhtml:ol")?.first() {
            Some(&ol) => read_list(doc, ol),
            None => Vec::new(),
        };

        let landmarks = doc
            .query(r#"//xhtml:nav[@epub:type="landmarks"]/xhtml:ol/xhtml:li/xhtml:a"#)?
            .into_iter()
            .map(|a| Landmark {
                roles: doc
                    .attribute_ns(a, Some(EPUB_NS), "type")
                    .map(|t| t.split_whitespace().map(str::to_string).collect())
                    .unwrap_or_default(),
                href: doc.attribute(a, "href").unwrap_or_default().into_owned(),
                label: normalize_space(&doc.text_content(a)),
            })
            .collect();

        let language = doc.document_element().and_then(|root| {
            doc.attribute_ns(root, Some(XML_NS), "lang")
                .or_else(|| doc.attribute_ns(root, None, "lang"))
                .map(|l| l.into_owned())
        });

        Ok(Self {
            entries,
            landmarks,
            language,
        })
    }

    /// Total number of reading-order entries at every level.
    pub fn len(&self) -> usize {
        self.entries.iter().map(NavEntry::count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rewrite every href from the navigation document's directory to
    /// `to_dir`.
    pub fn rebased(mut self, from_dir: &str, to_dir: &str) -> Self {
        fn walk(entries: &mut [NavEntry], from_dir: &str, to_dir: &str) {
            for entry in entries {
                entry.href = rebase_href(&entry.href, from_dir, to_dir);
                walk(&mut entry.children, from_dir, to_dir);
            }
        }
        walk(&mut self.entries, from_dir, to_dir);
        for landmark in &mut self.landmarks {
            landmark.href = rebase_href(&landmark.href, from_dir, to_dir);
        }
        self
    }
}

fn is_xhtml(doc: &Document, id: NodeId, local: &str) -> bool {
    doc.local_name(id) == Some(local) && doc.namespace(id) == Some(XHTML_NS)
}

fn read_list(doc: &Document, ol: NodeId) -> Vec<NavEntry> {
    let mut entries = Vec::new();
    for li in doc.element_children(ol).filter(|&c| is_xhtml(doc, c, "li")) {
        let link = doc.element_children(li).find(|&c| is_xhtml(doc, c, "a"));
        let children = doc
            .element_children(li)
            .filter(|&c| is_xhtml(doc, c, "ol"))
            .flat_map(|nested| read_list(doc, nested))
            .collect();

        match link {
            Some(a) => entries.push(NavEntry {
                label: normalize_space(&doc.text_content(a)),
                href: doc.attribute(a, "href").unwrap_or_default().into_owned(),
                children,
            }),
            // Headings without a link stand in for their children
            None => entries.extend(children),
        }
    }
    entries
}

fn normalize_space(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
