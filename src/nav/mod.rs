//! Navigation transcoder.
//!
//! Turns an EPUB3 navigation document into the structures older reading
//! systems expect: an NCX table of contents and an OPF `<guide>`. Also holds
//! the Kindle table of contents flattening.

mod document;
mod flatten;
mod guide;
mod ncx;

pub use document::{Landmark, NavDocument, NavEntry};
pub use flatten::flatten_toc;
pub use guide::{Guide, GuideReference, to_guide};
pub use ncx::{LegacyToc, NavPoint, NcxHead, to_legacy_toc};

/// Directory part of a `/`-separated path, without the trailing slash.
pub(crate) fn parent_dir(path: &str) -> &str {
    path.rsplit_once('/').map_or("", |(dir, _)| dir)
}

fn segments(dir: &str) -> Vec<&str> {
    let mut out = Vec::new();
    for seg in dir.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                out.pop();
            }
            s => out.push(s),
        }
    }
    out
}

/// Re-express `href`, relative to `from_dir`, as a path relative to `to_dir`.
///
/// Both directories are relative to the same root. Fragments are kept;
/// absolute URLs and bare fragments are returned unchanged.
///
/// ```
/// use quire::nav::rebase_href;
///
/// assert_eq!(rebase_href("chapter-1.xhtml#p2", "epub/text", "epub"), "text/chapter-1.xhtml#p2");
/// assert_eq!(rebase_href("../css/core.css", "epub/text", "epub"), "css/core.css");
/// assert_eq!(rebase_href("text/a.xhtml", "epub", "epub"), "text/a.xhtml");
/// ```
pub fn rebase_href(href: &str, from_dir: &str, to_dir: &str) -> String {
    if href.is_empty() || href.starts_with('#') || href.contains("://") {
        return href.to_string();
    }
    let (path, fragment) = match href.split_once('#') {
        Some((path, fragment)) => (path, Some(fragment)),
        None => (href, None),
    };

    let mut target = segments(from_dir);
    for seg in path.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                target.pop();
            }
            s => target.push(s),
        }
    }
    let base = segments(to_dir);

    // Never treat the file name itself as a shared directory
    let dirs = target.len().saturating_sub(1);
    let common = target[..dirs]
        .iter()
        .zip(&base)
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<&str> = vec![".."; base.len() - common];
    parts.extend_from_slice(&target[common..]);
    let mut out = parts.join("/");
    if let Some(fragment) = fragment {
        out.push('#');
        out.push_str(fragment);
    }
    out
}
