//! External collaborators.
//!
//! Everything the pipeline delegates (image conversion, markup cleanup,
//! hyphenation, Kindle compilation, validation and packaging) sits behind
//! the [`Toolchain`] and [`Packager`] traits. [`ExternalTools`] runs the
//! usual command line programs.

mod external;
mod paths;

pub use external::ExternalTools;
pub use paths::{Tool, ToolPaths};

use std::path::{Path, PathBuf};

use crate::error::Result;

/// Pixel dimensions for raster output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    pub width: u32,
    pub height: u32,
    /// JPEG quality, or the converter's default.
    pub quality: Option<u8>,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            quality: None,
        }
    }

    pub const fn with_quality(mut self, quality: u8) -> Self {
        self.quality = Some(quality);
        self
    }

    /// `WxH` geometry argument.
    pub fn geometry(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}

/// Full size rasterized cover.
pub const COVER_SIZE: Size = Size::new(1400, 2100);
/// Cover thumbnail, a quarter of the cover in each dimension.
pub const COVER_THUMBNAIL_SIZE: Size = Size::new(350, 525).with_quality(100);
/// Cover thumbnail the Kindle shows in its library.
pub const KINDLE_THUMBNAIL_SIZE: Size = Size::new(432, 660);

/// The external programs a build calls out to.
///
/// Any failure is fatal to the build and comes back as
/// [`Error::Collaborator`](crate::Error::Collaborator) carrying the tool's
/// output.
pub trait Toolchain {
    /// Confirm the given tools are usable before anything is written.
    fn check(&self, _required: &[Tool]) -> Result<()> {
        Ok(())
    }

    /// Rasterize an SVG: a JPEG of the given size, or a PNG at twice the
    /// intrinsic size when `size` is `None`.
    fn rasterize(&self, svg: &Path, out: &Path, size: Option<Size>) -> Result<()>;

    /// Resize a raster image.
    fn resize(&self, src: &Path, out: &Path, size: Size) -> Result<()>;

    /// Replace markup that older reading systems mishandle, over a whole tree.
    fn simplify_tags(&self, root: &Path) -> Result<()>;

    /// Insert soft hyphens into the content documents of a tree.
    fn hyphenate(&self, root: &Path) -> Result<()>;

    /// Pretty-print markup files, or every markup file under a directory.
    fn clean(&self, paths: &[PathBuf]) -> Result<()>;

    /// Restructure an endnotes document for Kindle popup notes.
    fn endnotes_to_popups(&self, endnotes: &Path) -> Result<()>;

    /// Compile an epub into a Kindle book.
    fn compile_kindle(&self, epub: &Path, azw3: &Path, cover: &Path) -> Result<()>;

    /// Write a copy of `input` to `output` carrying the given ASIN.
    fn patch_asin(&self, asin: &str, input: &Path, output: &Path) -> Result<()>;

    /// Check an epub for structural errors.
    ///
    /// Reported issues come back as
    /// [`Error::Validation`](crate::Error::Validation).
    fn validate(&self, epub: &Path) -> Result<()>;
}

/// Packs an EPUB tree into a container file.
pub trait Packager {
    fn package(&self, root: &Path, out: &Path) -> Result<()>;
}

impl<T: Toolchain + ?Sized> Toolchain for &T {
    fn check(&self, required: &[Tool]) -> Result<()> {
        (**self).check(required)
    }
    fn rasterize(&self, svg: &Path, out: &Path, size: Option<Size>) -> Result<()> {
        (**self).rasterize(svg, out, size)
    }
    fn resize(&self, src: &Path, out: &Path, size: Size) -> Result<()> {
        (**self).resize(src, out, size)
    }
    fn simplify_tags(&self, root: &Path) -> Result<()> {
        (**self).simplify_tags(root)
    }
    fn hyphenate(&self, root: &Path) -> Result<()> {
        (**self).hyphenate(root)
    }
    fn clean(&self, paths: &[PathBuf]) -> Result<()> {
        (**self).clean(paths)
    }
    fn endnotes_to_popups(&self, endnotes: &Path) -> Result<()> {
        (**self).endnotes_to_popups(endnotes)
    }
    fn compile_kindle(&self, epub: &Path, azw3: &Path, cover: &Path) -> Result<()> {
        (**self).compile_kindle(epub, azw3, cover)
    }
    fn patch_asin(&self, asin: &str, input: &Path, output: &Path) -> Result<()> {
        (**self).patch_asin(asin, input, output)
    }
    fn validate(&self, epub: &Path) -> Result<()> {
        (**self).validate(epub)
    }
}
