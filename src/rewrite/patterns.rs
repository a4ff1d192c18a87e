//! Cached regex patterns for the rewrite catalogue.
//!
//! Uses LazyLock to compile patterns once on first use.

use regex_lite::Regex;
use std::sync::LazyLock;

// === Markup patterns ===

/// Matches epub:type values containing the rearnote token
pub static EPUB_TYPE_REARNOTE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"epub:type="([^"]*?)rearnote([^"]*?)""#).unwrap());

/// Matches class values containing the class derived from rearnote
pub static CLASS_REARNOTE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"class="([^"]*?)epub-type-rearnote([^"]*?)""#).unwrap());

/// Matches a start tag carrying xml:lang="...", split just before the attribute
pub static XML_LANG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(<[^<>]*?\s)(xml:lang="([^"]+)"[^<>]*>)"#).unwrap());

/// Matches a bare lang attribute
pub static BARE_LANG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\slang=["']"#).unwrap());

/// Matches epub:type="..." attributes for removal
pub static EPUB_TYPE_ATTR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\s+epub:type="[^"]*""#).unwrap());

// === Package patterns ===

/// Matches manifest <item ...> tags
pub static MANIFEST_ITEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<item\s[^>]*>"#).unwrap());

/// Matches the svg manifest property
pub static SVG_PROPERTY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\s+properties="svg""#).unwrap());

// === Stylesheet patterns ===

/// Matches page-break-before/after/inside declarations
pub static PAGE_BREAK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(page-break-(before|after|inside)\s*:\s*(.+))"#).unwrap()
});

/// Matches a hyphens declaration at the start of a line
pub static HYPHENS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?m)^[ \t]*hyphens[ \t]*:[ \t]*(.+)"#).unwrap());

/// Matches a hyphens: none; declaration at the start of a line
pub static HYPHENS_NONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?m)^[ \t]*hyphens[ \t]*:[ \t]*none;"#).unwrap());
