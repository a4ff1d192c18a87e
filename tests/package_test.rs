use std::fs;
use std::io::{Cursor, Read};

use quire::Error;
use quire::epub::write_epub_dir_to_writer;
use quire::nav::{Guide, GuideReference};
use quire::opf::{PackageDocument, PackageRewriter, parse_container_xml};
use zip::ZipArchive;

const OPF: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<package xmlns="http://www.idpf.org/2007/opf" dir="ltr" unique-identifier="uid" version="3.0" xml:lang="en-US">
	<metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
		<dc:identifier id="uid">url:https://standardebooks.org/ebooks/robert-louis-stevenson/kidnapped</dc:identifier>
		<dc:title id="title">Kidnapped</dc:title>
		<dc:creator id="author">Robert Louis Stevenson</dc:creator>
		<dc:language>en-GB</dc:language>
	</metadata>
	<manifest>
		<item href="images/cover.jpg" id="cover.jpg" media-type="image/jpeg" properties="cover-image"/>
		<item href="toc.xhtml" id="toc.xhtml" media-type="application/xhtml+xml" properties="nav"/>
		<item href="text/chapter-1.xhtml" id="chapter-1.xhtml" media-type="application/xhtml+xml"/>
	</manifest>
	<spine>
		<itemref idref="chapter-1.xhtml"/>
	</spine>
</package>
"#;

fn guide() -> Guide {
    Guide {
        references: vec![GuideReference {
            kind: "bodymatter".into(),
            href: "text/chapter-1.xhtml".into(),
            title: "Kidnapped".into(),
            start_reading: false,
        }],
    }
}

#[test]
fn test_package_metadata() {
    let pkg = PackageDocument::parse(OPF).unwrap();
    assert_eq!(pkg.title, "Kidnapped");
    assert_eq!(pkg.author, "Robert Louis Stevenson");
    assert_eq!(pkg.cover.href, "images/cover.jpg");
    assert_eq!(pkg.nav.id, "toc.xhtml");
    assert_eq!(pkg.language.as_deref(), Some("en-GB"));
}

#[test]
fn test_package_without_nav_is_rejected() {
    let opf = OPF.replace(r#" properties="nav""#, "");
    assert!(matches!(
        PackageDocument::parse(&opf),
        Err(Error::MissingElement(_))
    ));
}

#[test]
fn test_compatibility_package() {
    let pkg = PackageDocument::parse(OPF).unwrap();
    let out = PackageRewriter::new()
        .cover_meta(pkg.cover.id.as_str())
        .transform_marker("compatibility")
        .legacy_toc()
        .guide(guide())
        .apply(OPF)
        .unwrap();

    assert!(out.contains(
        "<metadata xmlns:dc=\"http://purl.org/dc/elements/1.1/\">\n\t\t<meta content=\"cover.jpg\" name=\"cover\"/>"
    ));
    assert!(out.contains(
        "\t\t<meta property=\"se:transform\">compatibility</meta>\n\t</metadata>"
    ));
    assert!(out.contains("<spine toc=\"ncx\">"));
    assert!(out.contains(
        "\t\t<item href=\"toc.ncx\" id=\"ncx\" media-type=\"application/x-dtbncx+xml\"/>\n\t</manifest>"
    ));
    assert!(out.ends_with(
        "\t<guide>\n\t\t<reference href=\"text/chapter-1.xhtml\" title=\"Kidnapped\" type=\"bodymatter\"/>\n\t</guide>\n</package>\n"
    ));

    // Still a valid package with the same metadata
    let reparsed = PackageDocument::parse(&out).unwrap();
    assert_eq!(reparsed.identifier, pkg.identifier);
}

#[test]
fn test_legacy_toc_is_not_added_twice() {
    let once = PackageRewriter::new().legacy_toc().apply(OPF).unwrap();
    let twice = PackageRewriter::new().legacy_toc().apply(&once).unwrap();
    assert_eq!(once, twice);
}

#[test]
fn test_container_rootfile() {
    let xml = br#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
	<rootfiles>
		<rootfile full-path="epub/content.opf" media-type="application/oebps-package+xml"/>
	</rootfiles>
</container>"#;
    assert_eq!(parse_container_xml(xml).unwrap(), "epub/content.opf");
    assert!(parse_container_xml(b"<container/>").is_err());
}

#[test]
fn test_packaged_container_is_readable() {
    let dir = tempfile::TempDir::new().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("META-INF")).unwrap();
    fs::create_dir_all(root.join("epub/text")).unwrap();
    fs::write(root.join("mimetype"), "application/epub+zip").unwrap();
    fs::write(
        root.join("META-INF/container.xml"),
        r#"<container><rootfiles><rootfile full-path="epub/content.opf"/></rootfiles></container>"#,
    )
    .unwrap();
    fs::write(root.join("epub/content.opf"), OPF).unwrap();
    fs::write(root.join("epub/text/chapter-1.xhtml"), "<html/>").unwrap();

    let mut buf = Cursor::new(Vec::new());
    write_epub_dir_to_writer(root, &mut buf).unwrap();

    let mut archive = ZipArchive::new(Cursor::new(buf.into_inner())).unwrap();
    assert_eq!(archive.len(), 4);
    let mut container = String::new();
    archive
        .by_name("META-INF/container.xml")
        .unwrap()
        .read_to_string(&mut container)
        .unwrap();
    let opf_path = parse_container_xml(container.as_bytes()).unwrap();
    let mut opf = String::new();
    archive
        .by_name(&opf_path)
        .unwrap()
        .read_to_string(&mut opf)
        .unwrap();
    assert_eq!(opf, OPF);
}
