//! Package document (OPF) reading and rewriting.

mod rewrite;

pub use rewrite::PackageRewriter;

use quick_xml::Reader;
use quick_xml::events::Event;

use crate::error::{Error, Result};
use crate::util::decode_text;
use crate::xml::{Document, NodeId, strip_bom};

/// A manifest item referenced by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestRef {
    pub id: String,
    /// Relative to the package document.
    pub href: String,
}

/// The package metadata the pipeline needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageDocument {
    pub title: String,
    /// First `dc:creator`.
    pub author: String,
    /// The unique identifier, e.g. `url:https://standardebooks.org/ebooks/…`.
    pub identifier: String,
    pub language: Option<String>,
    pub cover: ManifestRef,
    pub nav: ManifestRef,
}

impl PackageDocument {
    /// Parse package metadata. Missing title, author, identifier, cover
    /// image or navigation document is an error.
    pub fn parse(text: &str) -> Result<Self> {
        let doc = Document::parse(text)?;

        let title = required_text(&doc, "//opf:metadata/dc:title", "dc:title")?;
        let author = required_text(&doc, "//opf:metadata/dc:creator", "dc:creator")?;
        let identifier = unique_identifier(&doc)?;
        let language = doc
            .query_value("//opf:metadata/dc:language")?
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty());

        let cover = manifest_item(
            &doc,
            r#"//opf:manifest/opf:item[contains(@properties, "cover-image")]"#,
            "cover-image manifest item",
        )?;
        let nav = manifest_item(
            &doc,
            r#"//opf:manifest/opf:item[contains(@properties, "nav")]"#,
            "nav manifest item",
        )?;

        Ok(Self {
            title,
            author,
            identifier,
            language,
            cover,
            nav,
        })
    }
}

fn required_text(doc: &Document, path: &str, what: &str) -> Result<String> {
    doc.query_value(path)?
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::MissingElement(what.to_string()))
}

/// The `dc:identifier` named by `unique-identifier`, or the first one.
fn unique_identifier(doc: &Document) -> Result<String> {
    let identifiers = doc.query("//opf:metadata/dc:identifier")?;
    let package_uid = doc
        .document_element()
        .and_then(|root| doc.attribute(root, "unique-identifier"));
    let chosen: Option<NodeId> = package_uid
        .and_then(|uid| {
            identifiers
                .iter()
                .copied()
                .find(|&id| doc.attribute(id, "id").as_deref() == Some(&*uid))
        })
        .or_else(|| identifiers.first().copied());

    chosen
        .map(|id| doc.text_content(id).trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::MissingElement("dc:identifier".to_string()))
}

fn manifest_item(doc: &Document, path: &str, what: &str) -> Result<ManifestRef> {
    let item = doc
        .query(path)?
        .first()
        .copied()
        .ok_or_else(|| Error::MissingElement(what.to_string()))?;
    let attr = |name: &str| {
        doc.attribute(item, name)
            .map(|v| v.into_owned())
            .ok_or_else(|| Error::MissingElement(format!("{what} @{name}")))
    };
    Ok(ManifestRef {
        id: attr("id")?,
        href: attr("href")?,
    })
}

/// Locate the package document path inside `META-INF/container.xml`.
pub fn parse_container_xml(bytes: &[u8]) -> Result<String> {
    let content = decode_text(bytes, None);
    let mut reader = Reader::from_str(strip_bom(&content));
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Empty(e)) | Ok(Event::Start(e)) if e.local_name().as_ref() == b"rootfile" => {
                for attr in e.attributes().flatten() {
                    if attr.key.as_ref() == b"full-path" {
                        return Ok(String::from_utf8_lossy(&attr.value).into_owned());
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::malformed(e.to_string()).in_file("META-INF/container.xml")),
            _ => {}
        }
    }

    Err(Error::MissingElement("rootfile in container.xml".to_string()))
}
