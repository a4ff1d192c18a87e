//! Locating external programs.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};

/// An external program the pipeline may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    Mogrify,
    RsvgConvert,
    Convert,
    EbookConvert,
    Epubcheck,
    SimplifyTags,
    Clean,
    Hyphenate,
    Endnotes2Kindle,
    UpdateAsin,
}

impl Tool {
    pub const ALL: [Tool; 10] = [
        Tool::Mogrify,
        Tool::RsvgConvert,
        Tool::Convert,
        Tool::EbookConvert,
        Tool::Epubcheck,
        Tool::SimplifyTags,
        Tool::Clean,
        Tool::Hyphenate,
        Tool::Endnotes2Kindle,
        Tool::UpdateAsin,
    ];

    /// Executable name.
    pub fn command(self) -> &'static str {
        match self {
            Tool::Mogrify => "mogrify",
            Tool::RsvgConvert => "rsvg-convert",
            Tool::Convert => "convert",
            Tool::EbookConvert => "ebook-convert",
            Tool::Epubcheck => "epubcheck",
            Tool::SimplifyTags => "simplify-tags",
            Tool::Clean => "clean",
            Tool::Hyphenate => "hyphenate",
            Tool::Endnotes2Kindle => "endnotes2kindle",
            Tool::UpdateAsin => "update-asin",
        }
    }

    fn install_hint(self) -> &'static str {
        match self {
            Tool::Mogrify | Tool::Convert => "Is ImageMagick installed?",
            Tool::RsvgConvert => "Is librsvg installed?",
            Tool::EbookConvert => "Is Calibre installed?",
            Tool::Epubcheck => "Is it installed?",
            _ => "Pass --tools-dir or add it to PATH.",
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.command())
    }
}

/// Where each tool lives.
#[derive(Debug, Clone, Default)]
pub struct ToolPaths {
    paths: HashMap<Tool, PathBuf>,
}

impl ToolPaths {
    /// Look for every tool in `tools_dir` first, then on `PATH`.
    pub fn discover(tools_dir: Option<&Path>) -> Self {
        let mut paths = HashMap::new();
        for tool in Tool::ALL {
            let local = tools_dir
                .map(|dir| dir.join(tool.command()))
                .filter(|p| p.is_file());
            let found = local.or_else(|| which::which(tool.command()).ok());
            match &found {
                Some(path) => debug!(%tool, path = %path.display(), "found tool"),
                None => debug!(%tool, "tool not found"),
            }
            if let Some(path) = found {
                paths.insert(tool, path);
            }
        }
        Self { paths }
    }

    /// Use an explicit path for a tool.
    pub fn with(mut self, tool: Tool, path: impl Into<PathBuf>) -> Self {
        self.paths.insert(tool, path.into());
        self
    }

    pub fn get(&self, tool: Tool) -> Option<&Path> {
        self.paths.get(&tool).map(PathBuf::as_path)
    }

    /// The tool's path, or a precondition error naming it.
    pub fn require(&self, tool: Tool) -> Result<&Path> {
        self.get(tool).ok_or_else(|| {
            Error::Precondition(format!(
                "Couldn't locate {}. {}",
                tool.command(),
                tool.install_hint()
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tools_dir_takes_precedence() {
        let dir = tempfile::TempDir::new().unwrap();
        let script = dir.path().join("simplify-tags");
        std::fs::write(&script, "#!/bin/sh\n").unwrap();

        let paths = ToolPaths::discover(Some(dir.path()));
        assert_eq!(paths.get(Tool::SimplifyTags), Some(script.as_path()));
    }

    #[test]
    fn test_require_missing_tool() {
        let paths = ToolPaths::default();
        let err = paths.require(Tool::EbookConvert).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Couldn't locate ebook-convert. Is Calibre installed?"
        );

        let paths = paths.with(Tool::EbookConvert, "/opt/calibre/ebook-convert");
        assert_eq!(
            paths.require(Tool::EbookConvert).unwrap(),
            Path::new("/opt/calibre/ebook-convert")
        );
    }
}
