//! OPF `<guide>` synthesis from navigation landmarks.

use std::fmt::Write as _;

use crate::xml::escape_xml;

use super::NavDocument;

/// Landmark roles that have a guide equivalent, in order of precedence, with
/// the guide type each maps to. Roles are looked up without their vocabulary
/// prefix.
const GUIDE_TYPES: &[(&str, &str)] = &[
    ("acknowledgements", "acknowledgements"),
    ("bibliography", "bibliography"),
    ("colophon", "colophon"),
    ("copyright-page", "copyright page"),
    ("cover", "cover"),
    ("dedication", "dedication"),
    ("epigraph", "epigraph"),
    ("foreword", "foreword"),
    ("glossary", "glossary"),
    ("index", "index"),
    ("loi", "loi"),
    ("lot", "lot"),
    ("notes", "notes"),
    ("endnotes", "notes"),
    ("preface", "preface"),
    ("bodymatter", "bodymatter"),
    ("titlepage", "title-page"),
    ("toc", "toc"),
];

/// Division roles that say nothing about the landmark itself.
const DIVISION_ROLES: &[&str] = &["frontmatter", "backmatter"];

/// One `<reference>` of the guide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuideReference {
    /// Guide type, e.g. `copyright page`.
    pub kind: String,
    pub href: String,
    pub title: String,
    /// Marks the place a reading system should open the book.
    pub start_reading: bool,
}

impl GuideReference {
    /// The `type` attribute as written to the package document.
    pub fn type_attr(&self) -> String {
        if self.start_reading {
            format!("{} text", self.kind)
        } else {
            self.kind.clone()
        }
    }
}

/// An ordered list of guide references.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Guide {
    pub references: Vec<GuideReference>,
}

/// Map navigation landmarks to guide references.
///
/// Landmarks with no recognized role (appendices included) are left out, so
/// the guide never has more entries than there are landmarks.
pub fn to_guide(nav: &NavDocument) -> Guide {
    let mut references = Vec::new();
    let mut has_start = false;

    for landmark in &nav.landmarks {
        let roles: Vec<&str> = landmark
            .roles
            .iter()
            .map(|role| unprefixed(role))
            .filter(|role| !DIVISION_ROLES.contains(role))
            .collect();

        let Some(&(role, kind)) = GUIDE_TYPES.iter().find(|(role, _)| roles.contains(role)) else {
            continue;
        };

        let start_reading = role == "titlepage" && !has_start;
        has_start |= start_reading;

        references.push(GuideReference {
            kind: kind.to_string(),
            href: landmark.href.clone(),
            title: landmark.label.clone(),
            start_reading,
        });
    }

    Guide { references }
}

/// `z3998:copyright-page` becomes `copyright-page`.
fn unprefixed(role: &str) -> &str {
    role.rsplit_once(':').map_or(role, |(_, name)| name)
}

impl Guide {
    pub fn len(&self) -> usize {
        self.references.len()
    }

    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }

    /// Serialize as a `<guide>` element indented for a package document.
    pub fn to_xml(&self) -> String {
        if self.references.is_empty() {
            return "<guide></guide>".to_string();
        }
        let mut out = String::from("<guide>\n");
        for reference in &self.references {
            let _ = writeln!(
                out,
                "\t\t<reference href=\"{}\" title=\"{}\" type=\"{}\"/>",
                escape_xml(&reference.href),
                escape_xml(&reference.title),
                escape_xml(&reference.type_attr()),
            );
        }
        out.push_str("\t</guide>");
        out
    }
}
