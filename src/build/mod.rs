//! Format pipeline orchestration.
//!
//! A [`Build`] takes a source tree through every requested edition in a
//! fixed order: the pure EPUB3, then a compatibility working copy from which
//! the Kobo, EPUB2-compatible and Kindle editions are derived. Each edition
//! works on its own [`WorkingCopy`], so edits never leak between formats.
//!
//! ```no_run
//! use quire::build::{Build, BuildConfig};
//! use quire::tools::{ExternalTools, ToolPaths};
//!
//! let config = BuildConfig::default()
//!     .with_output_dir("dist")
//!     .with_kobo(true)
//!     .with_check(true);
//! let tools = ExternalTools::new(ToolPaths::discover(None));
//! let report = Build::new(config, tools).run("books/persuasion".as_ref())?;
//! for artifact in &report.artifacts {
//!     println!("{}", artifact.path.display());
//! }
//! # Ok::<(), quire::Error>(())
//! ```

mod naming;
mod stage;
mod target;
mod workspace;

pub use naming::{COVER_FILE, COVER_THUMBNAIL_FILE, OutputNames, url_safe};
pub use stage::BuildStage;
pub use target::Target;
pub use workspace::{SourceTree, WorkingCopy};

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use crate::epub::EpubPackager;
use crate::error::{Error, Result};
use crate::nav::{NavDocument, NcxHead, flatten_toc, parent_dir, to_guide, to_legacy_toc};
use crate::opf::{PackageDocument, PackageRewriter};
use crate::rewrite::{self, Pass, RuleSet};
use crate::tools::{
    COVER_SIZE, COVER_THUMBNAIL_SIZE, KINDLE_THUMBNAIL_SIZE, Packager, Tool, Toolchain,
};
use crate::xml::Document;

/// Appended to `core.css` for the compatible and Kobo editions.
pub const COMPATIBILITY_CSS: &str = include_str!("../../templates/compatibility.css");
/// Appended to `core.css` for the Kindle edition.
pub const KINDLE_CSS: &str = include_str!("../../templates/kindle.css");
/// Appended to `local.css` in proof builds.
pub const PROOFREADING_CSS: &str = include_str!("../../templates/proofreading.css");

/// Kindle readers only show two levels of contents.
const KINDLE_TOC_DEPTH: usize = 2;

/// Which editions to build and where to put them.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Created if missing. Defaults to the current directory.
    pub output_dir: PathBuf,
    pub kobo: bool,
    pub kindle: bool,
    /// Also write the rasterized cover and a thumbnail.
    pub covers: bool,
    /// Validate the compatible epub; a failure skips the Kindle edition.
    pub check: bool,
    /// Include proofreading styles and mark output names with `.proof`.
    pub proof: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            kobo: false,
            kindle: false,
            covers: false,
            check: false,
            proof: false,
        }
    }
}

impl BuildConfig {
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_kobo(mut self, kobo: bool) -> Self {
        self.kobo = kobo;
        self
    }

    pub fn with_kindle(mut self, kindle: bool) -> Self {
        self.kindle = kindle;
        self
    }

    pub fn with_covers(mut self, covers: bool) -> Self {
        self.covers = covers;
        self
    }

    pub fn with_check(mut self, check: bool) -> Self {
        self.check = check;
        self
    }

    pub fn with_proof(mut self, proof: bool) -> Self {
        self.proof = proof;
        self
    }

    /// Tools this configuration will call.
    pub fn required_tools(&self) -> Vec<Tool> {
        let mut tools = vec![
            Tool::Mogrify,
            Tool::RsvgConvert,
            Tool::SimplifyTags,
            Tool::Hyphenate,
            Tool::Clean,
        ];
        if self.kindle {
            tools.extend([
                Tool::EbookConvert,
                Tool::Convert,
                Tool::Endnotes2Kindle,
                Tool::UpdateAsin,
            ]);
        }
        if self.check {
            tools.push(Tool::Epubcheck);
        }
        tools
    }
}

/// What a build wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
#[cfg_attr(feature = "cli", serde(rename_all = "snake_case"))]
pub enum ArtifactKind {
    Book(Target),
    Cover,
    CoverThumbnail,
    KindleThumbnail,
}

/// A file written to the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub path: PathBuf,
}

/// Outcome of a successful build.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
pub struct BuildReport {
    pub artifacts: Vec<Artifact>,
    pub stage: BuildStage,
    /// Set when a Kindle edition was built.
    #[cfg_attr(feature = "cli", serde(skip_serializing_if = "Option::is_none"))]
    pub asin: Option<String>,
}

impl BuildReport {
    fn new() -> Self {
        Self {
            artifacts: Vec::new(),
            stage: BuildStage::Staged,
            asin: None,
        }
    }

    fn push(&mut self, kind: ArtifactKind, path: PathBuf) {
        info!(?kind, path = %path.display(), "wrote");
        self.artifacts.push(Artifact { kind, path });
    }

    /// Path of a built edition, if it was produced.
    pub fn book(&self, target: Target) -> Option<&Path> {
        self.artifacts
            .iter()
            .find(|a| a.kind == ArtifactKind::Book(target))
            .map(|a| a.path.as_path())
    }

    fn advance(&mut self, next: BuildStage) -> Result<()> {
        self.stage.advance(next)?;
        debug!(stage = ?next, "stage reached");
        Ok(())
    }
}

/// The Kindle ASIN of a book: the SHA-1 of its identifier without the
/// `url:` scheme.
///
/// ```
/// assert_eq!(
///     quire::build::asin("url:https://standardebooks.org/ebooks/x"),
///     quire::build::asin("https://standardebooks.org/ebooks/x"),
/// );
/// ```
pub fn asin(identifier: &str) -> String {
    let identifier = identifier.strip_prefix("url:").unwrap_or(identifier);
    sha1_smol::Sha1::from(identifier).hexdigest()
}

/// Values shared by the legacy table of contents of every edition.
struct BookInfo {
    package: PackageDocument,
    nav_path: String,
    head: NcxHead,
}

/// A configured build, run with [`Build::run`].
#[derive(Debug)]
pub struct Build<T, P = EpubPackager> {
    config: BuildConfig,
    tools: T,
    packager: P,
}

impl<T: Toolchain> Build<T, EpubPackager> {
    pub fn new(config: BuildConfig, tools: T) -> Self {
        Self {
            config,
            tools,
            packager: EpubPackager,
        }
    }
}

impl<T: Toolchain, P: Packager> Build<T, P> {
    /// Use a different container packager.
    pub fn with_packager<Q: Packager>(self, packager: Q) -> Build<T, Q> {
        Build {
            config: self.config,
            tools: self.tools,
            packager,
        }
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Build every configured edition of the book in `source`.
    ///
    /// Preconditions (source layout, output directory, tools) are checked
    /// before anything is written. A validation failure is returned after
    /// the compatible epub is written and stops the Kindle edition.
    #[instrument(skip_all, fields(source = %source.display()))]
    pub fn run(&self, source: &Path) -> Result<BuildReport> {
        let config = &self.config;
        self.tools.check(&config.required_tools())?;
        let tree = SourceTree::open(source)?;
        let output_dir = prepare_output_dir(&config.output_dir)?;

        let mut report = BuildReport::new();
        let work = WorkingCopy::stage(&tree)?;
        let package = read_package(&work)?;
        let names = OutputNames::new(&package.title, &package.author, config.proof);
        remove_stale_outputs(&output_dir, &names)?;
        info!(title = %package.title, author = %package.author, "building");

        if config.proof {
            work.append(&work.package_file("css/local.css"), PROOFREADING_CSS)?;
        }

        let epub3 = output_dir.join(names.file_name(Target::Epub3));
        self.packager.package(&work.root(), &epub3)?;
        report.push(ArtifactKind::Book(Target::Epub3), epub3);
        report.advance(BuildStage::Epub3Built)?;

        let compat = work.fork()?;
        drop(work);
        self.compatibility_rewrite(&compat, &package, &output_dir, &mut report)?;
        report.advance(BuildStage::CompatRewritten)?;

        if config.kobo {
            let kobo = compat.fork()?;
            let out = output_dir.join(names.file_name(Target::Kobo));
            self.packager.package(&kobo.root(), &out)?;
            report.push(ArtifactKind::Book(Target::Kobo), out);
            report.advance(BuildStage::KoboBuilt)?;
        }

        let book = self.legacy_rewrite(&compat)?;
        let epub = output_dir.join(names.file_name(Target::Compatible));
        self.packager.package(&compat.root(), &epub)?;
        report.push(ArtifactKind::Book(Target::Compatible), epub.clone());
        report.advance(BuildStage::CompatBuilt)?;

        if config.check {
            self.tools.validate(&epub)?;
            info!("validation passed");
        }

        if config.kindle {
            self.build_kindle(&compat, &book, &names, &output_dir, &mut report)?;
            report.advance(BuildStage::KindleBuilt)?;
        }

        report.advance(BuildStage::Done)?;
        Ok(report)
    }

    /// Rasterize images, add the compatibility styles and apply the
    /// compatibility rules.
    fn compatibility_rewrite(
        &self,
        compat: &WorkingCopy,
        package: &PackageDocument,
        output_dir: &Path,
        report: &mut BuildReport,
    ) -> Result<()> {
        compat.append(&compat.package_file("css/core.css"), COMPATIBILITY_CSS)?;
        self.tools.simplify_tags(&compat.root())?;

        let cover = compat.package_relative(&package.cover.href);
        if is_svg(&cover) {
            let cover_jpg = cover.with_extension("jpg");
            self.tools.rasterize(&cover, &cover_jpg, Some(COVER_SIZE))?;
            if self.config.covers {
                let out = output_dir.join(COVER_FILE);
                fs::copy(&cover_jpg, &out)?;
                report.push(ArtifactKind::Cover, out);
                let thumbnail = output_dir.join(COVER_THUMBNAIL_FILE);
                self.tools
                    .rasterize(&cover, &thumbnail, Some(COVER_THUMBNAIL_SIZE))?;
                report.push(ArtifactKind::CoverThumbnail, thumbnail);
            }
            fs::remove_file(&cover)?;
        }

        for svg in compat.files_with_extension("svg")? {
            self.tools.rasterize(&svg, &svg.with_extension("png"), None)?;
            fs::remove_file(&svg)?;
        }

        let changed = rewrite::apply_tree(
            &compat.root(),
            &RuleSet::new(Pass::Compatibility, Target::Compatible),
        )?;
        debug!(changed, "compatibility rules applied");
        Ok(())
    }

    /// Add the EPUB2 package structures (cover meta, NCX, guide), legacy
    /// stylesheet declarations and hyphenation.
    fn legacy_rewrite(&self, compat: &WorkingCopy) -> Result<BookInfo> {
        let opf_path = compat.package_path().to_string();
        let opf = compat.read_to_string(&opf_path)?;
        // Re-read: manifest ids changed with the rasterized images
        let package = PackageDocument::parse(&opf).map_err(|e| e.in_file(&opf_path))?;
        let nav_path = compat.package_file(&package.nav.href);
        let nav = read_nav(compat, &nav_path)?;

        let head = NcxHead {
            uid: package.identifier.clone(),
            title: package.title.clone(),
            language: nav.language.clone().or_else(|| package.language.clone()),
        };
        let toc = to_legacy_toc(&nav)?;
        compat.write(&compat.package_file("toc.ncx"), &toc.to_xml(&head))?;
        debug!(nav_points = toc.len(), "wrote toc.ncx");

        let opf = PackageRewriter::new()
            .cover_meta(package.cover.id.as_str())
            .transform_marker("compatibility")
            .legacy_toc()
            .guide(to_guide(&nav))
            .apply(&opf)
            .map_err(|e| e.in_file(&opf_path))?;
        compat.write(&opf_path, &opf)?;

        rewrite::apply_tree(&compat.root(), &RuleSet::new(Pass::Legacy, Target::Compatible))?;
        self.tools.hyphenate(&compat.root())?;
        self.tools.clean(&[compat.root()])?;

        Ok(BookInfo {
            package,
            nav_path,
            head,
        })
    }

    fn build_kindle(
        &self,
        compat: &WorkingCopy,
        book: &BookInfo,
        names: &OutputNames,
        output_dir: &Path,
        report: &mut BuildReport,
    ) -> Result<()> {
        let kindle = compat.fork()?;

        let nav_text = kindle.read_to_string(&book.nav_path)?;
        let mut nav_doc = Document::parse(&nav_text).map_err(|e| e.in_file(&book.nav_path))?;
        let moved = flatten_toc(&mut nav_doc, KINDLE_TOC_DEPTH)?;
        debug!(moved, "flattened table of contents");
        kindle.write(&book.nav_path, &nav_doc.to_xml())?;

        let nav = NavDocument::from_document(&nav_doc)?
            .rebased(parent_dir(&book.nav_path), kindle.package_dir());
        let ncx_path = kindle.package_file("toc.ncx");
        kindle.write(&ncx_path, &to_legacy_toc(&nav)?.to_xml(&book.head))?;
        self.tools
            .clean(&[kindle.path(&ncx_path), kindle.path(&book.nav_path)])?;

        rewrite::apply_tree(&kindle.root(), &RuleSet::new(Pass::Kindle, Target::Kindle))?;
        kindle.append(&kindle.package_file("css/core.css"), KINDLE_CSS)?;

        let endnotes = kindle.path(&kindle.package_file("text/endnotes.xhtml"));
        if endnotes.is_file() {
            self.tools.endnotes_to_popups(&endnotes)?;
            // Read back what the restructurer wrote
            RuleSet::new(Pass::KindleEndnotes, Target::Kindle).apply_file(&endnotes)?;
        }

        let intermediate = kindle.scratch().join(names.file_name(Target::Compatible));
        self.packager.package(&kindle.root(), &intermediate)?;
        let compiled = kindle.scratch().join(names.file_name(Target::Kindle));
        let cover = kindle.package_relative(&book.package.cover.href);
        self.tools.compile_kindle(&intermediate, &compiled, &cover)?;

        let asin = asin(&book.package.identifier);
        let azw3 = output_dir.join(names.file_name(Target::Kindle));
        self.tools.patch_asin(&asin, &compiled, &azw3)?;
        report.push(ArtifactKind::Book(Target::Kindle), azw3);

        let thumbnail = output_dir.join(OutputNames::kindle_thumbnail(&asin));
        self.tools.resize(&cover, &thumbnail, KINDLE_THUMBNAIL_SIZE)?;
        report.push(ArtifactKind::KindleThumbnail, thumbnail);
        report.asin = Some(asin);
        Ok(())
    }
}

fn is_svg(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("svg"))
}

fn read_package(work: &WorkingCopy) -> Result<PackageDocument> {
    let path = work.package_path();
    PackageDocument::parse(&work.read_to_string(path)?).map_err(|e| e.in_file(path))
}

/// Parse the navigation document with hrefs relative to the package.
fn read_nav(work: &WorkingCopy, nav_path: &str) -> Result<NavDocument> {
    let text = work.read_to_string(nav_path)?;
    Ok(NavDocument::parse(&text)
        .map_err(|e| e.in_file(nav_path))?
        .rebased(parent_dir(nav_path), work.package_dir()))
}

fn prepare_output_dir(dir: &Path) -> Result<PathBuf> {
    if dir.exists() {
        if !dir.is_dir() {
            return Err(Error::Precondition(format!(
                "Not a directory: {}",
                dir.display()
            )));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| {
            Error::Precondition(format!(
                "Couldn't create output directory {}: {e}",
                dir.display()
            ))
        })?;
    }
    Ok(dir.to_path_buf())
}

fn quiet_remove(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!(path = %path.display(), "removed stale output");
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

fn remove_stale_outputs(dir: &Path, names: &OutputNames) -> Result<()> {
    for target in Target::ALL {
        quiet_remove(&dir.join(names.file_name(target)))?;
    }
    quiet_remove(&dir.join(COVER_FILE))?;
    quiet_remove(&dir.join(COVER_THUMBNAIL_FILE))?;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if OutputNames::is_kindle_thumbnail(&entry.file_name().to_string_lossy()) {
            quiet_remove(&entry.path())?;
        }
    }
    Ok(())
}
