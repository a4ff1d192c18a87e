//! Build progress.

use crate::error::{Error, Result};

/// How far a build has got. Stages only move forward; stages of targets
/// that were not requested are skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
#[cfg_attr(feature = "cli", serde(rename_all = "snake_case"))]
pub enum BuildStage {
    /// Working copy prepared, outputs named.
    Staged,
    Epub3Built,
    /// Compatibility rewrites applied to the working copy.
    CompatRewritten,
    KoboBuilt,
    CompatBuilt,
    KindleBuilt,
    Done,
}

impl BuildStage {
    /// Move to `next`, which must come strictly after the current stage.
    pub fn advance(&mut self, next: BuildStage) -> Result<()> {
        if next <= *self {
            return Err(Error::InvalidStage {
                from: *self,
                to: next,
            });
        }
        *self = next;
        Ok(())
    }
}
