//! NCX (EPUB2 table of contents) synthesis.

use crate::error::{Error, Result};
use crate::xml::{Document, NCX_NS, NodeId};

use super::{NavDocument, NavEntry};

/// One node of the NCX navMap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavPoint {
    pub id: String,
    /// 1-based position in a pre-order walk of the whole map.
    pub play_order: usize,
    pub label: String,
    pub src: String,
    pub children: Vec<NavPoint>,
}

/// Values for the NCX `<head>` and `<docTitle>`.
#[derive(Debug, Clone, Default)]
pub struct NcxHead {
    /// The package's unique identifier.
    pub uid: String,
    pub title: String,
    pub language: Option<String>,
}

/// A legacy table of contents ready to be serialized as NCX.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyToc {
    pub nav_points: Vec<NavPoint>,
}

/// Build the NCX tree from a navigation document's reading order.
///
/// Fails with [`Error::EmptyToc`] when there is nothing to list.
pub fn to_legacy_toc(nav: &NavDocument) -> Result<LegacyToc> {
    if nav.entries.is_empty() {
        return Err(Error::EmptyToc);
    }
    let mut play_order = 0;
    let nav_points = convert(&nav.entries, &mut play_order);
    Ok(LegacyToc { nav_points })
}

fn convert(entries: &[NavEntry], play_order: &mut usize) -> Vec<NavPoint> {
    entries
        .iter()
        .map(|entry| {
            *play_order += 1;
            let order = *play_order;
            NavPoint {
                id: format!("navpoint-{order}"),
                play_order: order,
                label: entry.label.clone(),
                src: entry.href.clone(),
                children: convert(&entry.children, play_order),
            }
        })
        .collect()
}

impl LegacyToc {
    /// Every nav point in play order.
    pub fn iter(&self) -> impl Iterator<Item = &NavPoint> {
        let mut out = Vec::new();
        fn walk<'a>(points: &'a [NavPoint], out: &mut Vec<&'a NavPoint>) {
            for point in points {
                out.push(point);
                walk(&point.children, out);
            }
        }
        walk(&self.nav_points, &mut out);
        out.into_iter()
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.nav_points.is_empty()
    }

    /// Deepest nesting level, 1 for a flat map.
    pub fn depth(&self) -> usize {
        fn depth(points: &[NavPoint]) -> usize {
            points
                .iter()
                .map(|p| 1 + depth(&p.children))
                .max()
                .unwrap_or(0)
        }
        depth(&self.nav_points)
    }

    /// Serialize as an NCX 2005-1 document.
    pub fn to_xml(&self, head: &NcxHead) -> String {
        let mut doc = Document::new();
        let root = doc.root();
        doc.append_markup(root, r#"<?xml version="1.0" encoding="utf-8"?>"#);

        let ncx = doc.create_element("ncx");
        doc.set_attribute(ncx, "xmlns", NCX_NS);
        doc.set_attribute(ncx, "version", "2005-1");
        if let Some(lang) = &head.language {
            doc.set_attribute(ncx, "xml:lang", lang);
        }
        doc.append_child(root, ncx);

        let head_el = child(&mut doc, ncx, "head", &[]);
        let depth = self.depth().to_string();
        for (name, content) in [
            ("dtb:uid", head.uid.as_str()),
            ("dtb:depth", depth.as_str()),
            ("dtb:totalPageCount", "0"),
            ("dtb:maxPageNumber", "0"),
        ] {
            child(&mut doc, head_el, "meta", &[("content", content), ("name", name)]);
        }

        let doc_title = child(&mut doc, ncx, "docTitle", &[]);
        let text = child(&mut doc, doc_title, "text", &[]);
        doc.append_text(text, &head.title);

        let nav_map = child(&mut doc, ncx, "navMap", &[("id", "navmap")]);
        write_points(&mut doc, nav_map, &self.nav_points);

        doc.to_pretty_xml()
    }
}

fn child(doc: &mut Document, parent: NodeId, name: &str, attrs: &[(&str, &str)]) -> NodeId {
    let id = doc.create_element(name);
    for (key, value) in attrs {
        doc.set_attribute(id, key, value);
    }
    doc.append_child(parent, id);
    id
}

fn write_points(doc: &mut Document, parent: NodeId, points: &[NavPoint]) {
    for point in points {
        let play_order = point.play_order.to_string();
        let nav_point = child(
            doc,
            parent,
            "navPoint",
            &[("id", &point.id), ("playOrder", &play_order)],
        );
        let label = child(doc, nav_point, "navLabel", &[]);
        let text = child(doc, label, "text", &[]);
        doc.append_text(text, &point.label);
        child(doc, nav_point, "content", &[("src", &point.src)]);
        write_points(doc, nav_point, &point.children);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nav() -> NavDocument {
        NavDocument {
            entries: vec![
                NavEntry::new("Titlepage", "text/titlepage.xhtml"),
                NavEntry::new("Part I", "text/part-1.xhtml").with_children(vec![
                    NavEntry::new("I", "text/chapter-1.xhtml"),
                    NavEntry::new("II", "text/chapter-2.xhtml"),
                ]),
                NavEntry::new("Colophon", "text/colophon.xhtml"),
            ],
            landmarks: Vec::new(),
            language: Some("en-US".into()),
        }
    }

    #[test]
    fn test_play_order_is_preorder() {
        let toc = to_legacy_toc(&nav()).unwrap();
        let orders: Vec<_> = toc.iter().map(|p| p.play_order).collect();
        assert_eq!(orders, vec![1, 2, 3, 4, 5]);
        let labels: Vec<_> = toc.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, vec!["Titlepage", "Part I", "I", "II", "Colophon"]);
        assert_eq!(toc.nav_points[1].children[0].id, "navpoint-3");
        assert_eq!(toc.depth(), 2);
    }

    #[test]
    fn test_empty_toc_is_error() {
        assert!(matches!(
            to_legacy_toc(&NavDocument::default()),
            Err(Error::EmptyToc)
        ));
    }

    #[test]
    fn test_ncx_xml() {
        let toc = to_legacy_toc(&NavDocument {
            entries: vec![
                NavEntry::new("Titlepage", "text/titlepage.xhtml"),
                NavEntry::new("Notes & Sources", "text/endnotes.xhtml"),
            ],
            ..nav()
        })
        .unwrap();
        let head = NcxHead {
            uid: "url:https://standardebooks.org/ebooks/x".into(),
            title: "A Title".into(),
            language: Some("en-US".into()),
        };
        let expected = "<?xml version=\"1.0\" encoding=\"utf-8\"?>
<ncx xmlns=\"http://www.daisy.org/z3986/2005/ncx/\" version=\"2005-1\" xml:lang=\"en-US\">
\t<head>
\t\t<meta content=\"url:https://standardebooks.org/ebooks/x\" name=\"dtb:uid\"/>
\t\t<meta content=\"1\" name=\"dtb:depth\"/>
\t\t<meta content=\"0\" name=\"dtb:totalPageCount\"/>
\t\t<meta content=\"0\" name=\"dtb:maxPageNumber\"/>
\t</head>
\t<docTitle>
\t\t<text>A Title</text>
\t</docTitle>
\t<navMap id=\"navmap\">
\t\t<navPoint id=\"navpoint-1\" playOrder=\"1\">
\t\t\t<navLabel>
\t\t\t\t<text>Titlepage</text>
\t\t\t</navLabel>
\t\t\t<content src=\"text/titlepage.xhtml\"/>
\t\t</navPoint>
\t\t<navPoint id=\"navpoint-2\" playOrder=\"2\">
\t\t\t<navLabel>
\t\t\t\t<text>Notes &amp; Sources</text>
\t\t\t</navLabel>
\t\t\t<content src=\"text/endnotes.xhtml\"/>
\t\t</navPoint>
\t</navMap>
</ncx>
";
        assert_eq!(toc.to_xml(&head), expected);
    }

    #[test]
    fn test_ncx_reparses() {
        let toc = to_legacy_toc(&nav()).unwrap();
        let xml = toc.to_xml(&NcxHead::default());
        let doc = Document::parse(&xml).unwrap();
        assert_eq!(doc.query("//ncx:navPoint").unwrap().len(), 5);
        assert_eq!(
            doc.query_values("//ncx:navPoint/ncx:content/@src").unwrap()[2],
            "text/chapter-1.xhtml"
        );
    }
}
