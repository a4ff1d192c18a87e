use std::fs;

use quire::Target;
use quire::rewrite::{FileKind, Pass, RuleSet, SOFT_HYPHEN, WORD_JOINER, ZERO_WIDTH_NO_BREAK_SPACE, apply_tree};
use tempfile::TempDir;

const ENDNOTES: &str = r#"<section id="endnotes" epub:type="backmatter endnotes" xml:lang="en-GB">
	<ol>
		<li id="note-1" epub:type="rearnote" class="epub-type-rearnote">
			<p>See the <abbr>Rev.</abbr>&#8288;2⸺3.</p>
		</li>
	</ol>
</section>"#;

#[test]
fn test_compatibility_markup() {
    let rules = RuleSet::new(Pass::Compatibility, Target::Compatible);
    let out = rules.apply(FileKind::Markup, ENDNOTES);

    assert!(out.contains(r#"epub:type="footnote""#));
    assert!(out.contains(r#"class="epub-type-footnote""#));
    assert!(out.contains(r#"lang="en-GB" xml:lang="en-GB""#));
    assert!(out.contains("2\u{2014}\u{feff}\u{2014}3"));
    // Entity references are not characters yet
    assert!(out.contains("&#8288;"));
}

#[test]
fn test_compatibility_is_idempotent() {
    let rules = RuleSet::new(Pass::Compatibility, Target::Compatible);
    let once = rules.apply(FileKind::Markup, ENDNOTES);
    assert_eq!(rules.apply(FileKind::Markup, &once), once);
}

#[test]
fn test_word_joiners_follow_target() {
    let text = format!("a{WORD_JOINER}b{ZERO_WIDTH_NO_BREAK_SPACE}c");

    let epub3 = RuleSet::new(Pass::Compatibility, Target::Epub3).apply(FileKind::Markup, &text);
    assert_eq!(epub3, text);

    let kobo = RuleSet::new(Pass::Compatibility, Target::Kobo).apply(FileKind::Markup, &text);
    assert_eq!(kobo, "a\u{feff}b\u{feff}c");

    let kindle = RuleSet::new(Pass::Kindle, Target::Kindle).apply(FileKind::Markup, &text);
    assert_eq!(kindle, "abc");
}

#[test]
fn test_stylesheets_get_legacy_declarations() {
    let css = "p{\n\thyphens: auto;\n\tpage-break-before: always;\n}\n\nh2{\n\thyphens: none;\n}\n";
    let out = RuleSet::new(Pass::Legacy, Target::Compatible).apply(FileKind::Stylesheet, css);

    assert!(out.contains("\tadobe-hyphenate: auto;"));
    assert!(out.contains("\t-moz-hyphens: auto;"));
    assert!(out.contains("-webkit-column-break-before: always; /* For Readium */"));
    assert!(out.contains("adobe-text-layout: optimizeSpeed; /* For Nook */"));
}

#[test]
fn test_rules_only_touch_their_file_kinds() {
    let rules = RuleSet::new(Pass::Compatibility, Target::Compatible);
    let css = "[epub|type~=\"rearnote\"]{ content: \"⸺\"; }";
    let out = rules.apply(FileKind::Stylesheet, css);
    assert!(out.contains("footnote"));
    assert!(out.contains('⸺'));
}

#[test]
fn test_kindle_endnotes_drop_soft_hyphens() {
    let text = format!("<p>pop{SOFT_HYPHEN}up</p>");
    let out = RuleSet::new(Pass::KindleEndnotes, Target::Kindle).apply(FileKind::Markup, &text);
    assert_eq!(out, "<p>popup</p>");
}

#[test]
fn test_apply_tree() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("epub/text")).unwrap();
    fs::create_dir_all(root.join("epub/images")).unwrap();
    fs::write(root.join("epub/text/chapter-1.xhtml"), "<p>In ⸺shire</p>").unwrap();
    fs::write(root.join("epub/text/chapter-2.xhtml"), "<p>Plain</p>").unwrap();
    fs::write(root.join("epub/images/cover.svg"), "<svg>⸺</svg>").unwrap();

    let rules = RuleSet::new(Pass::Compatibility, Target::Compatible);
    assert_eq!(apply_tree(root, &rules).unwrap(), 1);
    assert_eq!(
        fs::read_to_string(root.join("epub/text/chapter-1.xhtml")).unwrap(),
        "<p>In \u{2014}\u{feff}\u{2014}shire</p>"
    );
    // Images are not rewritten
    assert_eq!(
        fs::read_to_string(root.join("epub/images/cover.svg")).unwrap(),
        "<svg>⸺</svg>"
    );
    assert_eq!(apply_tree(root, &rules).unwrap(), 0);
}
