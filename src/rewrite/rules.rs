//! The rule catalogue, one ordered table per pass.

use regex_lite::Captures;

use super::patterns::*;
use super::{FileKind, Pattern, Replacement, Rule, Step};

pub const WORD_JOINER: char = '\u{2060}';
pub const ZERO_WIDTH_NO_BREAK_SPACE: char = '\u{feff}';
pub const SOFT_HYPHEN: char = '\u{00ad}';

const MARKUP: &[FileKind] = &[FileKind::Markup];
const STYLESHEET: &[FileKind] = &[FileKind::Stylesheet];
const PACKAGE: &[FileKind] = &[FileKind::Package];
const MARKUP_AND_PACKAGE: &[FileKind] = &[FileKind::Markup, FileKind::Package];

/// Run once on the compatibility tree, before the Kobo edition forks.
pub(super) static COMPATIBILITY: &[Step] = &[
    // Rasterized images
    Step::Rule(Rule {
        name: "cover-svg-to-jpg",
        kinds: MARKUP_AND_PACKAGE,
        pattern: Pattern::Literal("cover.svg"),
        replacement: Replacement::Text("cover.jpg"),
    }),
    Step::Rule(Rule {
        name: "svg-to-png",
        kinds: MARKUP_AND_PACKAGE,
        pattern: Pattern::Literal(".svg"),
        replacement: Replacement::Text(".png"),
    }),
    Step::Rule(Rule {
        name: "cover-media-type",
        kinds: PACKAGE,
        pattern: Pattern::Regex(&MANIFEST_ITEM_RE),
        replacement: Replacement::With(cover_media_type),
    }),
    Step::Rule(Rule {
        name: "svg-media-type",
        kinds: PACKAGE,
        pattern: Pattern::Literal("image/svg+xml"),
        replacement: Replacement::Text("image/png"),
    }),
    Step::Rule(Rule {
        name: "strip-svg-property",
        kinds: PACKAGE,
        pattern: Pattern::Regex(&SVG_PROPERTY_RE),
        replacement: Replacement::Text(""),
    }),
    // Some reading systems choke on https vocabulary identifiers
    Step::Rule(Rule {
        name: "se-vocabulary-http",
        kinds: MARKUP,
        pattern: Pattern::Literal("https://standardebooks.org/vocab/1.0"),
        replacement: Replacement::Text("http://standardebooks.org/vocab/1.0"),
    }),
    // Popup notes need footnote rather than rearnote
    Step::Rule(Rule {
        name: "rearnote-epub-type",
        kinds: MARKUP,
        pattern: Pattern::Regex(&EPUB_TYPE_REARNOTE_RE),
        replacement: Replacement::Expand(r#"epub:type="${1}footnote${2}""#),
    }),
    Step::Rule(Rule {
        name: "rearnote-class",
        kinds: MARKUP,
        pattern: Pattern::Regex(&CLASS_REARNOTE_RE),
        replacement: Replacement::Expand(r#"class="${1}epub-type-footnote${2}""#),
    }),
    Step::Rule(Rule {
        name: "rearnote-selectors",
        kinds: STYLESHEET,
        pattern: Pattern::Literal("rearnote"),
        replacement: Replacement::Text("footnote"),
    }),
    Step::Rule(Rule {
        name: "duplicate-xml-lang",
        kinds: MARKUP,
        pattern: Pattern::Regex(&XML_LANG_RE),
        replacement: Replacement::With(duplicate_lang),
    }),
    // Typography
    Step::Rule(Rule {
        name: "two-em-dash",
        kinds: MARKUP,
        pattern: Pattern::Literal("\u{2e3a}"),
        replacement: Replacement::Text("\u{2014}\u{2060}\u{2014}"),
    }),
    Step::Rule(Rule {
        name: "three-em-dash",
        kinds: MARKUP,
        pattern: Pattern::Literal("\u{2e3b}"),
        replacement: Replacement::Text("\u{2014}\u{2060}\u{2014}\u{2060}\u{2014}"),
    }),
    Step::Rule(Rule {
        name: "one-tenth",
        kinds: MARKUP,
        pattern: Pattern::Literal("\u{2152}"),
        replacement: Replacement::Text("1/10"),
    }),
    Step::Rule(Rule {
        name: "care-of",
        kinds: MARKUP,
        pattern: Pattern::Literal("\u{2105}"),
        replacement: Replacement::Text("c/o"),
    }),
    Step::WordJoiners,
];

/// Stylesheet additions for older reading systems.
pub(super) static LEGACY: &[Step] = &[
    Step::Rule(Rule {
        name: "readium-column-breaks",
        kinds: STYLESHEET,
        pattern: Pattern::Regex(&PAGE_BREAK_RE),
        replacement: Replacement::Expand(
            "${1}\n\t-webkit-column-break-${2}: ${3} /* For Readium */",
        ),
    }),
    Step::Rule(Rule {
        name: "prefixed-hyphens",
        kinds: STYLESHEET,
        pattern: Pattern::Regex(&HYPHENS_RE),
        replacement: Replacement::Expand(
            "\thyphens: ${1}\n\tadobe-hyphenate: ${1}\n\t-webkit-hyphens: ${1}\n\t-epub-hyphens: ${1}\n\t-moz-hyphens: ${1}",
        ),
    }),
    Step::Rule(Rule {
        name: "nook-text-layout",
        kinds: STYLESHEET,
        pattern: Pattern::Regex(&HYPHENS_NONE_RE),
        replacement: Replacement::Text(
            "\thyphens: none;\n\tadobe-text-layout: optimizeSpeed; /* For Nook */",
        ),
    }),
];

pub(super) static KINDLE: &[Step] = &[
    Step::WordJoiners,
    // The device converter turns epub:type into a bare type attribute
    Step::Rule(Rule {
        name: "strip-epub-type",
        kinds: MARKUP,
        pattern: Pattern::Regex(&EPUB_TYPE_ATTR_RE),
        replacement: Replacement::Text(""),
    }),
];

/// Popup notes break words without drawing the hyphen.
pub(super) static KINDLE_ENDNOTES: &[Step] = &[Step::Rule(Rule {
    name: "strip-soft-hyphens",
    kinds: MARKUP,
    pattern: Pattern::Literal("\u{00ad}"),
    replacement: Replacement::Text(""),
})];

pub(super) static REPLACE_WORD_JOINERS: &[Rule] = &[Rule {
    name: "word-joiner-to-zwnbsp",
    kinds: MARKUP,
    pattern: Pattern::Literal("\u{2060}"),
    replacement: Replacement::Text("\u{feff}"),
}];

pub(super) static REMOVE_WORD_JOINERS: &[Rule] = &[
    Rule {
        name: "strip-zwnbsp",
        kinds: MARKUP,
        pattern: Pattern::Literal("\u{feff}"),
        replacement: Replacement::Text(""),
    },
    Rule {
        name: "strip-word-joiner",
        kinds: MARKUP,
        pattern: Pattern::Literal("\u{2060}"),
        replacement: Replacement::Text(""),
    },
];

/// The rasterized cover is a JPEG; other converted images are PNGs.
fn cover_media_type(caps: &Captures<'_>) -> String {
    let item = &caps[0];
    if item.contains("cover.jpg") {
        item.replace("image/svg+xml", "image/jpeg")
    } else {
        item.to_string()
    }
}

/// Screen readers look for a bare lang next to xml:lang. Tags that already
/// have one, on either side, are left alone.
fn duplicate_lang(caps: &Captures<'_>) -> String {
    if BARE_LANG_RE.is_match(&caps[0]) {
        return caps[0].to_string();
    }
    format!(r#"{}lang="{}" {}"#, &caps[1], &caps[3], &caps[2])
}
