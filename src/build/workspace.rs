//! Source trees and per-target working copies.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::nav::parent_dir;
use crate::opf::parse_container_xml;
use crate::util::decode_text;

/// A book source directory: a `src/` tree holding the unpacked EPUB3.
#[derive(Debug, Clone)]
pub struct SourceTree {
    root: PathBuf,
    /// Path of the package document relative to `src/`.
    package: String,
}

impl SourceTree {
    /// Check the layout of a source directory and locate its package
    /// document.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(Error::Precondition(format!(
                "Not a directory: {}",
                root.display()
            )));
        }
        let src = root.join("src");
        if !src.is_dir() {
            return Err(Error::Precondition(format!(
                "Doesn't look like an ebook source directory (no src/): {}",
                root.display()
            )));
        }
        let container = src.join("META-INF").join("container.xml");
        let bytes = fs::read(&container).map_err(|e| {
            Error::Precondition(format!("Can't read {}: {e}", container.display()))
        })?;
        let package = parse_container_xml(&bytes)?;
        if !src.join(&package).is_file() {
            return Err(Error::Precondition(format!(
                "Package document {package} listed in container.xml doesn't exist"
            )));
        }
        Ok(Self { root, package })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The unpacked EPUB tree.
    pub fn src(&self) -> PathBuf {
        self.root.join("src")
    }

    pub fn package_path(&self) -> &str {
        &self.package
    }
}

/// A private copy of an EPUB tree in a temporary directory, removed on drop.
#[derive(Debug)]
pub struct WorkingCopy {
    dir: TempDir,
    package: String,
}

impl WorkingCopy {
    /// Copy a source tree's `src/`, leaving version control metadata behind.
    pub fn stage(source: &SourceTree) -> Result<Self> {
        let dir = TempDir::with_prefix("quire-")?;
        copy_tree(&source.src(), &dir.path().join("src"))?;
        debug!(dir = %dir.path().display(), "staged working copy");
        Ok(Self {
            dir,
            package: source.package.clone(),
        })
    }

    /// An independent copy of this working copy.
    pub fn fork(&self) -> Result<Self> {
        let dir = TempDir::with_prefix("quire-")?;
        copy_tree(&self.root(), &dir.path().join("src"))?;
        debug!(from = %self.dir.path().display(), to = %dir.path().display(), "forked working copy");
        Ok(Self {
            dir,
            package: self.package.clone(),
        })
    }

    /// The root of the EPUB tree (what gets packaged).
    pub fn root(&self) -> PathBuf {
        self.dir.path().join("src")
    }

    /// Scratch space next to the tree, outside of what gets packaged.
    pub fn scratch(&self) -> &Path {
        self.dir.path()
    }

    /// Resolve a `/`-separated path relative to the tree root.
    pub fn path(&self, rel: &str) -> PathBuf {
        rel.split('/')
            .filter(|s| !s.is_empty())
            .fold(self.root(), |path, seg| path.join(seg))
    }

    /// Package document path relative to the tree root.
    pub fn package_path(&self) -> &str {
        &self.package
    }

    /// Directory of the package document relative to the tree root.
    pub fn package_dir(&self) -> &str {
        parent_dir(&self.package)
    }

    /// Tree-relative path of a file given relative to the package document.
    pub fn package_file(&self, rel: &str) -> String {
        match self.package_dir() {
            "" => rel.to_string(),
            dir => format!("{dir}/{rel}"),
        }
    }

    /// Resolve a manifest href (relative to the package document).
    pub fn package_relative(&self, href: &str) -> PathBuf {
        let decoded = percent_encoding::percent_decode_str(href).decode_utf8_lossy();
        self.path(&self.package_file(&decoded))
    }

    pub fn read_to_string(&self, rel: &str) -> Result<String> {
        let bytes = fs::read(self.path(rel))?;
        Ok(decode_text(&bytes, None).into_owned())
    }

    pub fn write(&self, rel: &str, contents: &str) -> Result<()> {
        fs::write(self.path(rel), contents)?;
        Ok(())
    }

    /// Append text to an existing file.
    pub fn append(&self, rel: &str, contents: &str) -> Result<()> {
        let path = self.path(rel);
        let mut file = fs::OpenOptions::new().append(true).open(&path).map_err(|e| {
            Error::Precondition(format!("Can't append to {}: {e}", path.display()))
        })?;
        file.write_all(contents.as_bytes())?;
        Ok(())
    }

    /// Every file under the tree with the given extension, in path order.
    pub fn files_with_extension(&self, ext: &str) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in WalkDir::new(self.root()).sort_by_file_name() {
            let entry = entry?;
            if entry.file_type().is_file()
                && entry
                    .path()
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case(ext))
            {
                files.push(entry.into_path());
            }
        }
        Ok(files)
    }
}

fn copy_tree(from: &Path, to: &Path) -> Result<()> {
    let walker = WalkDir::new(from)
        .into_iter()
        .filter_entry(|e| e.file_name() != ".git");
    for entry in walker {
        let entry = entry?;
        let rel = entry
            .path()
            .strip_prefix(from)
            .map_err(|e| Error::Precondition(e.to_string()))?;
        let dest = to.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&dest)?;
        } else if entry.file_type().is_file() {
            fs::copy(entry.path(), &dest)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> TempDir {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(src.join("META-INF")).unwrap();
        fs::create_dir_all(src.join("epub/css")).unwrap();
        fs::create_dir_all(src.join(".git")).unwrap();
        fs::write(src.join(".git/HEAD"), "ref").unwrap();
        fs::write(src.join("mimetype"), "application/epub+zip").unwrap();
        fs::write(
            src.join("META-INF/container.xml"),
            r#"<container><rootfiles><rootfile full-path="epub/content.opf"/></rootfiles></container>"#,
        )
        .unwrap();
        fs::write(src.join("epub/content.opf"), "<package/>").unwrap();
        fs::write(src.join("epub/css/core.css"), "p{}\n").unwrap();
        dir
    }

    #[test]
    fn test_open_checks_layout() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            SourceTree::open(dir.path()),
            Err(Error::Precondition(_))
        ));
        assert!(matches!(
            SourceTree::open(dir.path().join("missing")),
            Err(Error::Precondition(_))
        ));

        let dir = source();
        let tree = SourceTree::open(dir.path()).unwrap();
        assert_eq!(tree.package_path(), "epub/content.opf");
    }

    #[test]
    fn test_stage_and_fork_are_independent() {
        let dir = source();
        let tree = SourceTree::open(dir.path()).unwrap();
        let copy = WorkingCopy::stage(&tree).unwrap();
        assert!(copy.path("epub/content.opf").is_file());
        assert!(!copy.path(".git").exists());
        assert_eq!(copy.package_dir(), "epub");

        let fork = copy.fork().unwrap();
        fork.append("epub/css/core.css", "em{}\n").unwrap();
        assert_eq!(copy.read_to_string("epub/css/core.css").unwrap(), "p{}\n");
        assert_eq!(fork.read_to_string("epub/css/core.css").unwrap(), "p{}\nem{}\n");
        // Source untouched
        assert_eq!(
            fs::read_to_string(dir.path().join("src/epub/css/core.css")).unwrap(),
            "p{}\n"
        );
    }

    #[test]
    fn test_dropped_copy_is_removed() {
        let dir = source();
        let tree = SourceTree::open(dir.path()).unwrap();
        let copy = WorkingCopy::stage(&tree).unwrap();
        let root = copy.root();
        drop(copy);
        assert!(!root.exists());
    }

    #[test]
    fn test_package_relative() {
        let dir = source();
        let copy = WorkingCopy::stage(&SourceTree::open(dir.path()).unwrap()).unwrap();
        assert_eq!(
            copy.package_relative("images/cover%20art.jpg"),
            copy.root().join("epub").join("images").join("cover art.jpg")
        );
    }
}
