use quire::Error;
use quire::xml::{Document, Namespaces, XHTML_NS};

const CHAPTER: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops" epub:prefix="z3998: http://www.daisy.org/z3998/2012/vocab/structure/, se: https://standardebooks.org/vocab/1.0" xml:lang="en-GB">
	<head>
		<title>I</title>
		<link href="../css/core.css" rel="stylesheet" type="text/css"/>
	</head>
	<body epub:type="bodymatter z3998:fiction">
		<section id="chapter-1" epub:type="chapter">
			<h2 epub:type="ordinal z3998:roman">I</h2>
			<p>Sir Walter Elliot, of Kellynch&#160;Hall, in Somersetshire, was a man who, for his own amusement, never took up any book but the Baronetage.</p>
			<!-- end of chapter -->
		</section>
	</body>
</html>
"#;

#[test]
fn test_round_trip_content_document() {
    let doc = Document::parse(CHAPTER).unwrap();
    assert_eq!(doc.to_xml(), CHAPTER);
}

#[test]
fn test_queries_resolve_epub_prefixes() {
    let doc = Document::parse(CHAPTER).unwrap();

    let sections = doc.query(r#"//xhtml:section[@epub:type="chapter"]"#).unwrap();
    assert_eq!(sections.len(), 1);
    assert_eq!(doc.attribute(sections[0], "id").as_deref(), Some("chapter-1"));

    let ordinals = doc
        .query(r#"//xhtml:h2[contains(@epub:type, "z3998:roman")]"#)
        .unwrap();
    assert_eq!(ordinals.len(), 1);
    assert_eq!(doc.text_content(ordinals[0]), "I");

    assert_eq!(
        doc.query_value("//xhtml:head/xhtml:link/@href").unwrap().as_deref(),
        Some("../css/core.css")
    );
    assert!(doc.query("//xhtml:nav").unwrap().is_empty());
}

#[test]
fn test_text_content_decodes_references() {
    let doc = Document::parse(CHAPTER).unwrap();
    let p = doc.query("//xhtml:p").unwrap()[0];
    assert!(doc.text_content(p).contains("Kellynch\u{a0}Hall"));
}

#[test]
fn test_relative_and_custom_namespace_queries() {
    let doc = Document::parse(CHAPTER).unwrap();
    let body = doc.query("//xhtml:body").unwrap()[0];
    assert_eq!(doc.query_from(body, "xhtml:section/xhtml:p").unwrap().len(), 1);

    let ns = Namespaces::empty().with("h", XHTML_NS);
    let titles = doc.query_with(&ns, doc.root(), "//h:title").unwrap();
    assert_eq!(titles.len(), 1);
}

#[test]
fn test_attribute_paths_need_query_values() {
    let doc = Document::parse(CHAPTER).unwrap();
    assert!(matches!(
        doc.query("//xhtml:link/@href"),
        Err(Error::InvalidQuery(_))
    ));
}

#[test]
fn test_unbound_prefix_is_an_invalid_query() {
    let doc = Document::parse(CHAPTER).unwrap();
    assert!(matches!(
        doc.query("//nope:p"),
        Err(Error::InvalidQuery(_))
    ));
}

#[test]
fn test_mismatched_tags_are_malformed() {
    let err = Document::parse("<html><body><p>text</body></html>").unwrap_err();
    assert!(matches!(err, Error::MalformedMarkup { path: None, .. }));
}

#[test]
fn test_edits_keep_untouched_markup() {
    let mut doc = Document::parse(CHAPTER).unwrap();
    let section = doc.query("//xhtml:section").unwrap()[0];
    doc.remove_attribute(section, "epub:type");
    let out = doc.to_xml();
    assert!(out.contains(r#"<section id="chapter-1">"#));
    assert!(out.contains("Kellynch&#160;Hall"));
    assert!(out.contains("<!-- end of chapter -->"));
}
