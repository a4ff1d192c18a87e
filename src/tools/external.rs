//! [`Toolchain`] backed by command line programs.

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;
use tracing::{debug, instrument};

use super::{Size, Tool, ToolPaths, Toolchain};
use crate::error::{Error, Result};

/// Runs each collaborator as a blocking child process.
#[derive(Debug, Clone, Default)]
pub struct ExternalTools {
    paths: ToolPaths,
}

impl ExternalTools {
    pub fn new(paths: ToolPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &ToolPaths {
        &self.paths
    }

    fn command(&self, tool: Tool) -> Result<Command> {
        Ok(Command::new(self.paths.require(tool)?))
    }

    /// Run to completion. A non-zero exit is a failure; returns the
    /// combined, trimmed output otherwise.
    fn run(&self, tool: Tool, mut cmd: Command) -> Result<String> {
        debug!(%tool, ?cmd, "running");
        let output = cmd.output().map_err(|e| Error::Collaborator {
            tool: tool.to_string(),
            status: None,
            output: e.to_string(),
        })?;
        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        let text = text.trim().to_string();

        if !output.status.success() {
            return Err(Error::Collaborator {
                tool: tool.to_string(),
                status: output.status.code(),
                output: text,
            });
        }
        Ok(text)
    }

    /// Like [`ExternalTools::run`], but any output also counts as failure.
    fn run_silent(&self, tool: Tool, cmd: Command) -> Result<()> {
        let output = self.run(tool, cmd)?;
        if !output.is_empty() {
            return Err(Error::Collaborator {
                tool: tool.to_string(),
                status: Some(0),
                output,
            });
        }
        Ok(())
    }
}

impl Toolchain for ExternalTools {
    fn check(&self, required: &[Tool]) -> Result<()> {
        for &tool in required {
            self.paths.require(tool)?;
        }
        Ok(())
    }

    #[instrument(skip(self))]
    fn rasterize(&self, svg: &Path, out: &Path, size: Option<Size>) -> Result<()> {
        let Some(size) = size else {
            let mut cmd = self.command(Tool::RsvgConvert)?;
            cmd.args(["-z", "2", "-a", "-f", "png", "-o"]).arg(out).arg(svg);
            self.run(Tool::RsvgConvert, cmd)?;
            return Ok(());
        };

        // mogrify writes <stem>.jpg next to its input, so convert a copy
        let scratch = TempDir::with_prefix("quire-raster-")?;
        let stem = out.file_stem().unwrap_or(OsStr::new("cover"));
        let input = scratch.path().join(stem).with_extension("svg");
        fs::copy(svg, &input)?;

        let mut cmd = self.command(Tool::Mogrify)?;
        cmd.arg("-resize").arg(size.geometry());
        if let Some(quality) = size.quality {
            cmd.arg("-quality").arg(quality.to_string());
        }
        cmd.args(["-format", "jpg"]).arg(&input);
        self.run(Tool::Mogrify, cmd)?;

        fs::copy(input.with_extension("jpg"), out)?;
        Ok(())
    }

    #[instrument(skip(self))]
    fn resize(&self, src: &Path, out: &Path, size: Size) -> Result<()> {
        let mut cmd = self.command(Tool::Convert)?;
        cmd.arg(src).arg("-resize").arg(size.geometry());
        if let Some(quality) = size.quality {
            cmd.arg("-quality").arg(quality.to_string());
        }
        cmd.arg(out);
        self.run(Tool::Convert, cmd)?;
        Ok(())
    }

    fn simplify_tags(&self, root: &Path) -> Result<()> {
        let mut cmd = self.command(Tool::SimplifyTags)?;
        cmd.arg(root);
        self.run_silent(Tool::SimplifyTags, cmd)
    }

    fn hyphenate(&self, root: &Path) -> Result<()> {
        let mut cmd = self.command(Tool::Hyphenate)?;
        cmd.arg("--ignore-h-tags").arg(root);
        self.run(Tool::Hyphenate, cmd)?;
        Ok(())
    }

    fn clean(&self, paths: &[PathBuf]) -> Result<()> {
        let mut cmd = self.command(Tool::Clean)?;
        cmd.args(paths);
        self.run(Tool::Clean, cmd)?;
        Ok(())
    }

    fn endnotes_to_popups(&self, endnotes: &Path) -> Result<()> {
        let mut cmd = self.command(Tool::Endnotes2Kindle)?;
        cmd.arg(endnotes);
        self.run(Tool::Endnotes2Kindle, cmd)?;
        Ok(())
    }

    #[instrument(skip(self))]
    fn compile_kindle(&self, epub: &Path, azw3: &Path, cover: &Path) -> Result<()> {
        let mut cover_arg = std::ffi::OsString::from("--cover=");
        cover_arg.push(cover);

        let mut cmd = self.command(Tool::EbookConvert)?;
        cmd.arg(epub)
            .arg(azw3)
            .args([
                "--pretty-print",
                "--no-inline-toc",
                "--max-toc-links=0",
                "--prefer-metadata-cover",
            ])
            .arg(cover_arg);
        self.run(Tool::EbookConvert, cmd)?;
        Ok(())
    }

    fn patch_asin(&self, asin: &str, input: &Path, output: &Path) -> Result<()> {
        let mut cmd = self.command(Tool::UpdateAsin)?;
        cmd.arg(asin).arg(input).arg(output);
        self.run(Tool::UpdateAsin, cmd)?;
        Ok(())
    }

    #[instrument(skip(self))]
    fn validate(&self, epub: &Path) -> Result<()> {
        let mut cmd = self.command(Tool::Epubcheck)?;
        cmd.arg("--quiet").arg(epub);
        // epubcheck exits non-zero on errors; either way its output is the report
        match self.run(Tool::Epubcheck, cmd) {
            Ok(output) if output.is_empty() => Ok(()),
            Ok(output) => Err(Error::Validation { output }),
            Err(Error::Collaborator {
                status: Some(_),
                output,
                ..
            }) if !output.is_empty() => Err(Error::Validation { output }),
            Err(e) => Err(e),
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn test_missing_tool_is_precondition() {
        let tools = ExternalTools::default();
        assert!(matches!(
            tools.check(&[Tool::Mogrify]),
            Err(Error::Precondition(_))
        ));
        assert!(matches!(
            tools.hyphenate(Path::new(".")),
            Err(Error::Precondition(_))
        ));
    }

    #[test]
    fn test_non_zero_exit_is_collaborator_failure() {
        let dir = TempDir::new().unwrap();
        let hyphenate = script(dir.path(), "hyphenate", "echo 'no dictionary' >&2; exit 3");
        let tools = ExternalTools::new(ToolPaths::default().with(Tool::Hyphenate, hyphenate));
        match tools.hyphenate(dir.path()) {
            Err(Error::Collaborator {
                tool,
                status,
                output,
            }) => {
                assert_eq!(tool, "hyphenate");
                assert_eq!(status, Some(3));
                assert_eq!(output, "no dictionary");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_simplify_tags_output_is_failure() {
        let dir = TempDir::new().unwrap();
        let chatty = script(dir.path(), "simplify-tags", "echo 'Error: bad tag'");
        let tools = ExternalTools::new(ToolPaths::default().with(Tool::SimplifyTags, chatty));
        assert!(matches!(
            tools.simplify_tags(dir.path()),
            Err(Error::Collaborator { status: Some(0), .. })
        ));
    }

    #[test]
    fn test_validator_output_is_validation_error() {
        let dir = TempDir::new().unwrap();
        let epubcheck = script(dir.path(), "epubcheck", "echo 'ERROR(RSC-005): bad'; exit 1");
        let tools = ExternalTools::new(ToolPaths::default().with(Tool::Epubcheck, epubcheck));
        match tools.validate(Path::new("book.epub")) {
            Err(Error::Validation { output }) => assert_eq!(output, "ERROR(RSC-005): bad"),
            other => panic!("unexpected {other:?}"),
        }

        let quiet = script(dir.path(), "quiet", "exit 0");
        let tools = ExternalTools::new(ToolPaths::default().with(Tool::Epubcheck, quiet));
        tools.validate(Path::new("book.epub")).unwrap();
    }

    #[test]
    fn test_arguments_are_passed() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("args.txt");
        let update = script(
            dir.path(),
            "update-asin",
            &format!("echo \"$@\" > {}", log.display()),
        );
        let tools = ExternalTools::new(ToolPaths::default().with(Tool::UpdateAsin, update));
        tools
            .patch_asin("abc", Path::new("in.azw3"), Path::new("out.azw3"))
            .unwrap();
        assert_eq!(fs::read_to_string(log).unwrap().trim(), "abc in.azw3 out.azw3");
    }
}
