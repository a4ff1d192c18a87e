//! Output formats.

use std::fmt;

use crate::rewrite::WordJoinerPolicy;

/// A distribution format produced by a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
#[cfg_attr(feature = "cli", serde(rename_all = "snake_case"))]
pub enum Target {
    /// The source as is, packaged.
    Epub3,
    /// EPUB2-compatible epub for older reading systems.
    Compatible,
    Kobo,
    Kindle,
}

impl Target {
    pub const ALL: [Target; 4] = [Target::Epub3, Target::Compatible, Target::Kobo, Target::Kindle];

    /// File extension of the packaged output, without the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            Target::Epub3 => "epub3",
            Target::Compatible => "epub",
            Target::Kobo => "kepub.epub",
            Target::Kindle => "azw3",
        }
    }

    /// How U+2060 and U+FEFF are treated for this target.
    pub fn word_joiner_policy(self) -> WordJoinerPolicy {
        match self {
            Target::Epub3 => WordJoinerPolicy::Keep,
            Target::Compatible | Target::Kobo => WordJoinerPolicy::Replace,
            // The device renders word joiners as spaces
            Target::Kindle => WordJoinerPolicy::Remove,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Target::Epub3 => "epub3",
            Target::Compatible => "epub",
            Target::Kobo => "kobo",
            Target::Kindle => "kindle",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extensions_are_distinct() {
        let mut exts: Vec<_> = Target::ALL.iter().map(|t| t.extension()).collect();
        exts.sort();
        exts.dedup();
        assert_eq!(exts.len(), 4);
    }

    #[test]
    fn test_word_joiner_policy() {
        assert_eq!(Target::Epub3.word_joiner_policy(), WordJoinerPolicy::Keep);
        assert_eq!(Target::Kobo.word_joiner_policy(), WordJoinerPolicy::Replace);
        assert_eq!(Target::Kindle.word_joiner_policy(), WordJoinerPolicy::Remove);
    }
}
