//! # quire
//!
//! Builds the distributable editions of a book from one EPUB3 source tree.
//!
//! ## Editions
//!
//! - A pure EPUB3 container, packaged as authored
//! - An EPUB2-compatible epub with a legacy NCX table of contents and guide
//! - A Kobo kepub
//! - A Kindle azw3 with a flattened table of contents and popup endnotes
//!
//! ## Quick Start
//!
//! ```no_run
//! use quire::{Build, BuildConfig, ExternalTools, ToolPaths};
//!
//! let config = BuildConfig::default()
//!     .with_output_dir("dist")
//!     .with_kobo(true)
//!     .with_kindle(true);
//! let tools = ExternalTools::new(ToolPaths::discover(None));
//! let report = Build::new(config, tools).run("books/persuasion".as_ref())?;
//! println!("built {} files", report.artifacts.len());
//! # Ok::<(), quire::Error>(())
//! ```
//!
//! ## Building blocks
//!
//! The pieces a build is made of are usable on their own:
//!
//! ```
//! use quire::nav::{NavDocument, NcxHead, to_legacy_toc};
//!
//! let nav = NavDocument::parse(r#"<html xmlns="http://www.w3.org/1999/xhtml"
//!     xmlns:epub="http://www.idpf.org/2007/ops"><body>
//!     <nav epub:type="toc"><ol><li><a href="text/chapter-1.xhtml">I</a></li></ol></nav>
//! </body></html>"#)?;
//! let ncx = to_legacy_toc(&nav)?;
//! assert_eq!(ncx.len(), 1);
//! assert!(ncx.to_xml(&NcxHead::default()).contains(r#"playOrder="1""#));
//! # Ok::<(), quire::Error>(())
//! ```

pub mod build;
pub mod epub;
pub mod error;
pub mod nav;
pub mod opf;
pub mod rewrite;
pub mod tools;
pub(crate) mod util;
pub mod xml;

pub use build::{Build, BuildConfig, BuildReport, BuildStage, Target};
pub use error::{Error, Result};
pub use tools::{ExternalTools, Packager, ToolPaths, Toolchain};
