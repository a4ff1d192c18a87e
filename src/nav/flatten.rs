//! Table of contents flattening for readers with a shallow TOC.

use crate::error::{Error, Result};
use crate::xml::{Document, NodeId, XHTML_NS};

fn is_xhtml(doc: &Document, id: NodeId, local: &str) -> bool {
    doc.local_name(id) == Some(local) && doc.namespace(id) == Some(XHTML_NS)
}

/// Nesting level of a list item inside `nav`, 1 for top-level items.
fn level(doc: &Document, li: NodeId, nav: NodeId) -> usize {
    let mut level = 1;
    let mut current = doc.parent(li);
    while let Some(node) = current {
        if node == nav {
            break;
        }
        if is_xhtml(doc, node, "li") {
            level += 1;
        }
        current = doc.parent(node);
    }
    level
}

/// Limit the `toc` navigation list to `max_depth` levels.
///
/// Every item nested deeper than `max_depth` becomes a sibling following its
/// level-`max_depth` ancestor, in reading order. Lists left empty are
/// removed. Returns the number of items moved.
pub fn flatten_toc(doc: &mut Document, max_depth: usize) -> Result<usize> {
    let max_depth = max_depth.max(1);
    let nav = doc
        .query(r#"//xhtml:nav[@epub:type="toc"]"#)?
        .first()
        .copied()
        .ok_or_else(|| Error::MissingElement(r#"nav[epub:type="toc"]"#.to_string()))?;

    let anchors: Vec<NodeId> = doc
        .descendants(nav)
        .into_iter()
        .filter(|&id| is_xhtml(doc, id, "li") && level(doc, id, nav) == max_depth)
        .collect();

    let mut moved = 0;
    for anchor in anchors {
        let deeper: Vec<NodeId> = doc
            .descendants(anchor)
            .into_iter()
            .filter(|&id| is_xhtml(doc, id, "li"))
            .collect();
        let mut last = anchor;
        for li in deeper {
            doc.insert_after(last, li);
            last = li;
            moved += 1;
        }
    }

    let emptied: Vec<NodeId> = doc
        .descendants(nav)
        .into_iter()
        .filter(|&id| is_xhtml(doc, id, "ol") && doc.element_children(id).next().is_none())
        .collect();
    for ol in emptied {
        doc.detach(ol);
    }

    Ok(moved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nav::NavDocument;

    const NAV: &str = r#"<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops"><body><nav epub:type="toc"><ol><li><a href="p1.xhtml">Part 1</a><ol><li><a href="b1.xhtml">Book 1</a><ol><li><a href="c1.xhtml">Chapter 1</a><ol><li><a href="c1.xhtml#s1">Section 1</a></li></ol></li><li><a href="c2.xhtml">Chapter 2</a></li></ol></li><li><a href="b2.xhtml">Book 2</a></li></ol></li><li><a href="colophon.xhtml">Colophon</a></li></ol></nav></body></html>"#;

    #[test]
    fn test_flatten_to_two_levels() {
        let mut doc = Document::parse(NAV).unwrap();
        assert_eq!(flatten_toc(&mut doc, 2).unwrap(), 3);

        let nav = NavDocument::from_document(&doc).unwrap();
        let top: Vec<_> = nav.entries.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(top, vec!["Part 1", "Colophon"]);
        let second: Vec<_> = nav.entries[0]
            .children
            .iter()
            .map(|e| e.label.as_str())
            .collect();
        assert_eq!(
            second,
            vec!["Book 1", "Chapter 1", "Section 1", "Chapter 2", "Book 2"]
        );
        assert!(nav.entries[0].children.iter().all(|e| e.children.is_empty()));
        // Reading order is unchanged
        assert_eq!(nav.len(), 7);
    }

    #[test]
    fn test_empty_lists_removed() {
        let mut doc = Document::parse(NAV).unwrap();
        flatten_toc(&mut doc, 2).unwrap();
        let xml = doc.to_xml();
        assert!(!xml.contains("<ol/>"));
        assert!(xml.contains(
            r#"<li><a href="b1.xhtml">Book 1</a></li><li><a href="c1.xhtml">Chapter 1</a></li>"#
        ));
    }

    #[test]
    fn test_shallow_toc_untouched() {
        let src = r#"<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops"><body><nav epub:type="toc"><ol><li><a href="a.xhtml">A</a></li></ol></nav></body></html>"#;
        let mut doc = Document::parse(src).unwrap();
        assert_eq!(flatten_toc(&mut doc, 2).unwrap(), 0);
        assert_eq!(doc.to_xml(), src);
    }
}
