use std::fs::{self, File};
use std::io::{Seek, Write};
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::error::{Error, Result};
use crate::tools::Packager;

const MIMETYPE: &str = "mimetype";
const CONTAINER_XML: &str = "META-INF/container.xml";

/// Zips an unpacked EPUB tree into a container.
///
/// `mimetype` goes first and uncompressed, `META-INF/container.xml` second,
/// then every other file deflated, in path order.
#[derive(Debug, Clone, Copy, Default)]
pub struct EpubPackager;

impl Packager for EpubPackager {
    fn package(&self, root: &Path, out: &Path) -> Result<()> {
        let file = File::create(out)?;
        write_epub_dir_to_writer(root, file)?;
        debug!(out = %out.display(), "packaged");
        Ok(())
    }
}

/// Write an unpacked EPUB tree to a file on disk.
///
/// # Example
///
/// ```no_run
/// use quire::epub::write_epub_dir;
///
/// write_epub_dir("book/src", "book.epub")?;
/// # Ok::<(), quire::Error>(())
/// ```
pub fn write_epub_dir<P: AsRef<Path>, Q: AsRef<Path>>(root: P, path: Q) -> Result<()> {
    EpubPackager.package(root.as_ref(), path.as_ref())
}

/// Write an unpacked EPUB tree to any [`Write`] + [`Seek`] destination.
pub fn write_epub_dir_to_writer<W: Write + Seek>(root: &Path, writer: W) -> Result<()> {
    let mimetype = root.join(MIMETYPE);
    if !mimetype.is_file() {
        return Err(Error::Precondition(format!(
            "No mimetype file in {}",
            root.display()
        )));
    }

    let mut zip = ZipWriter::new(writer);

    // 1. Write mimetype (must be first, uncompressed)
    let options_stored =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    let options_deflate =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    zip.start_file(MIMETYPE, options_stored)?;
    zip.write_all(&fs::read(&mimetype)?)?;

    // 2. Write META-INF/container.xml
    let container = root.join("META-INF").join("container.xml");
    if container.is_file() {
        zip.start_file(CONTAINER_XML, options_deflate)?;
        zip.write_all(&fs::read(&container)?)?;
    }

    // 3. Everything else
    for (name, path) in entries(root)? {
        if name == MIMETYPE || name == CONTAINER_XML {
            continue;
        }
        zip.start_file(&name, options_deflate)?;
        zip.write_all(&fs::read(&path)?)?;
    }

    zip.finish()?;
    Ok(())
}

/// Files under `root` as (archive name, path), sorted by archive name.
fn entries(root: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| Error::Precondition(e.to_string()))?;
        let name = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        files.push((name, entry.into_path()));
    }
    files.sort();
    Ok(files)
}
