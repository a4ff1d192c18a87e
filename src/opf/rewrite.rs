//! Insert-only edits to a package document.
//!
//! Edits work on the package text so that everything not touched is kept
//! byte for byte. The input must be well-formed.

use std::sync::LazyLock;

use regex_lite::Regex;

use crate::error::{Error, Result};
use crate::nav::Guide;
use crate::xml::{Document, escape_xml};

static METADATA_OPEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<metadata(\s[^>]*)?>"#).unwrap());

static SPINE_OPEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<spine(\s[^>]*)?>"#).unwrap());

static COVER_META_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<meta\s[^>]*name="cover""#).unwrap());

const NCX_ITEM: &str = r#"<item href="toc.ncx" id="ncx" media-type="application/x-dtbncx+xml"/>"#;

/// A set of package edits, each toggled independently.
///
/// ```
/// use quire::opf::PackageRewriter;
///
/// let opf = "<package><metadata></metadata><manifest></manifest><spine></spine></package>";
/// let out = PackageRewriter::new().legacy_toc().apply(opf).unwrap();
/// assert!(out.contains(r#"<spine toc="ncx">"#));
/// ```
#[derive(Debug, Clone, Default)]
pub struct PackageRewriter {
    cover_meta: Option<String>,
    transform_marker: Option<String>,
    legacy_toc: bool,
    guide: Option<Guide>,
}

impl PackageRewriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare the cover image for EPUB2 readers with `<meta name="cover">`.
    pub fn cover_meta(mut self, id: impl Into<String>) -> Self {
        self.cover_meta = Some(id.into());
        self
    }

    /// Record that the package went through the named transform.
    pub fn transform_marker(mut self, name: impl Into<String>) -> Self {
        self.transform_marker = Some(name.into());
        self
    }

    /// Point the spine at `toc.ncx` and list it in the manifest.
    pub fn legacy_toc(mut self) -> Self {
        self.legacy_toc = true;
        self
    }

    pub fn guide(mut self, guide: Guide) -> Self {
        self.guide = Some(guide);
        self
    }

    /// Apply the selected edits to package text.
    pub fn apply(&self, opf: &str) -> Result<String> {
        Document::parse(opf)?;
        let mut out = opf.to_string();

        if let Some(id) = &self.cover_meta
            && !COVER_META_RE.is_match(&out)
        {
            let end = METADATA_OPEN_RE
                .find(&out)
                .ok_or_else(|| Error::MissingElement("metadata".to_string()))?
                .end();
            out.insert_str(
                end,
                &format!("\n\t\t<meta content=\"{}\" name=\"cover\"/>", escape_xml(id)),
            );
        }

        if let Some(name) = &self.transform_marker {
            let at = find_required(&out, "</metadata>")?;
            out.insert_str(
                at,
                &format!(
                    "\t<meta property=\"se:transform\">{}</meta>\n\t",
                    escape_xml(name)
                ),
            );
        }

        if self.legacy_toc {
            let spine = SPINE_OPEN_RE
                .find(&out)
                .ok_or_else(|| Error::MissingElement("spine".to_string()))?;
            if !spine.as_str().contains("toc=") {
                let at = spine.start() + "<spine".len();
                out.insert_str(at, r#" toc="ncx""#);
            }
            if !out.contains(r#"id="ncx""#) {
                let at = find_required(&out, "</manifest>")?;
                out.insert_str(at, &format!("\t{NCX_ITEM}\n\t"));
            }
        }

        if let Some(guide) = &self.guide {
            let at = find_required(&out, "</package>")?;
            out.insert_str(at, &format!("\t{}\n", guide.to_xml()));
        }

        Ok(out)
    }
}

fn find_required(text: &str, tag: &str) -> Result<usize> {
    text.rfind(tag)
        .ok_or_else(|| Error::MissingElement(tag.trim_matches(['<', '/', '>']).to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nav::GuideReference;
    use crate::opf::tests::OPF;

    #[test]
    fn test_legacy_toc_declarations() {
        let out = PackageRewriter::new().legacy_toc().apply(OPF).unwrap();
        assert!(out.contains("\t<spine toc=\"ncx\">\n"));
        assert!(out.contains(
            "properties=\"svg\"/>\n\t\t<item href=\"toc.ncx\" id=\"ncx\" media-type=\"application/x-dtbncx+xml\"/>\n\t</manifest>"
        ));

        // Applying twice adds nothing
        let again = PackageRewriter::new().legacy_toc().apply(&out).unwrap();
        assert_eq!(again, out);
    }

    #[test]
    fn test_cover_meta_follows_metadata_open_tag() {
        let out = PackageRewriter::new().cover_meta("cover.jpg").apply(OPF).unwrap();
        assert!(out.contains(
            "<metadata xmlns:dc=\"http://purl.org/dc/elements/1.1/\">\n\t\t<meta content=\"cover.jpg\" name=\"cover\"/>\n\t\t<dc:identifier id=\"other\">"
        ));
    }

    #[test]
    fn test_transform_marker_closes_metadata() {
        let out = PackageRewriter::new()
            .transform_marker("compatibility")
            .apply(OPF)
            .unwrap();
        assert!(out.contains(
            "<dc:publisher id=\"publisher\">Standard Ebooks</dc:publisher>\n\t\t<meta property=\"se:transform\">compatibility</meta>\n\t</metadata>"
        ));
    }

    #[test]
    fn test_guide_before_package_end() {
        let guide = Guide {
            references: vec![GuideReference {
                kind: "colophon".into(),
                href: "text/colophon.xhtml".into(),
                title: "Colophon".into(),
                start_reading: false,
            }],
        };
        let out = PackageRewriter::new().guide(guide).apply(OPF).unwrap();
        assert!(out.ends_with(
            "\t</spine>\n\t<guide>\n\t\t<reference href=\"text/colophon.xhtml\" title=\"Colophon\" type=\"colophon\"/>\n\t</guide>\n</package>\n"
        ));
        Document::parse(&out).unwrap();
    }

    #[test]
    fn test_existing_entries_untouched() {
        let out = PackageRewriter::new()
            .cover_meta("cover.jpg")
            .transform_marker("compatibility")
            .legacy_toc()
            .guide(Guide::default())
            .apply(OPF)
            .unwrap();
        // Every original line survives in order
        let mut rest = out.as_str();
        for line in OPF.lines() {
            let line = line.replace("<spine>", "<spine toc=\"ncx\">");
            let at = rest.find(line.as_str()).unwrap();
            rest = &rest[at + line.len()..];
        }
    }

    #[test]
    fn test_malformed_package() {
        assert!(matches!(
            PackageRewriter::new().legacy_toc().apply("<package><spine></package>"),
            Err(Error::MalformedMarkup { .. })
        ));
    }

    #[test]
    fn test_no_toggles_is_identity() {
        assert_eq!(PackageRewriter::new().apply(OPF).unwrap(), OPF);
    }
}
