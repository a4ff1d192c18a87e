//! Text/CSS rewrite engine.
//!
//! Rules are ordered pattern/replacement pairs evaluated over the whole text
//! of a file, so they may cross element boundaries. A rule with no match is a
//! no-op. The catalogue lives in [`rules`] as static tables, one per [`Pass`].

mod patterns;
pub mod rules;

use std::borrow::Cow;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use regex_lite::{Captures, Regex};
use tracing::{debug, instrument};
use walkdir::WalkDir;

use crate::build::Target;
use crate::error::Result;
use crate::util::decode_text;

pub use rules::{SOFT_HYPHEN, WORD_JOINER, ZERO_WIDTH_NO_BREAK_SPACE};

/// The kind of file a rule may apply to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    /// XHTML content and navigation documents.
    Markup,
    Stylesheet,
    /// The OPF package document.
    Package,
}

impl FileKind {
    /// Classify a path by extension; `None` for files no rule touches.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "xhtml" | "html" | "htm" => Some(FileKind::Markup),
            "css" => Some(FileKind::Stylesheet),
            "opf" => Some(FileKind::Package),
            _ => None,
        }
    }
}

/// A group of rules run together at one point of a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    /// Markup, stylesheet and package fixups for every compatibility edition.
    Compatibility,
    /// Vendor-prefixed stylesheet declarations for the compatible epub.
    Legacy,
    Kindle,
    /// Applied to the endnotes document only.
    KindleEndnotes,
}

impl Pass {
    fn steps(self) -> &'static [Step] {
        match self {
            Pass::Compatibility => rules::COMPATIBILITY,
            Pass::Legacy => rules::LEGACY,
            Pass::Kindle => rules::KINDLE,
            Pass::KindleEndnotes => rules::KINDLE_ENDNOTES,
        }
    }
}

/// How a target treats U+2060 WORD JOINER and U+FEFF ZERO WIDTH NO-BREAK SPACE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordJoinerPolicy {
    /// Leave both characters alone.
    Keep,
    /// Replace every word joiner with a zero width no-break space.
    Replace,
    /// Remove both characters.
    Remove,
}

impl WordJoinerPolicy {
    fn rules(self) -> &'static [Rule] {
        match self {
            WordJoinerPolicy::Keep => &[],
            WordJoinerPolicy::Replace => rules::REPLACE_WORD_JOINERS,
            WordJoinerPolicy::Remove => rules::REMOVE_WORD_JOINERS,
        }
    }
}

/// What a rule looks for.
#[derive(Debug, Clone, Copy)]
pub enum Pattern {
    Literal(&'static str),
    Regex(&'static LazyLock<Regex>),
}

/// What a match is replaced with.
#[derive(Debug, Clone, Copy)]
pub enum Replacement {
    /// Inserted as is.
    Text(&'static str),
    /// A template with `${n}` capture references; regex patterns only.
    Expand(&'static str),
    /// Computed from the captures; regex patterns only.
    With(fn(&Captures<'_>) -> String),
}

/// One rewrite rule.
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub name: &'static str,
    pub kinds: &'static [FileKind],
    pub pattern: Pattern,
    pub replacement: Replacement,
}

impl Rule {
    pub fn applies_to(&self, kind: FileKind) -> bool {
        self.kinds.contains(&kind)
    }

    /// Apply the rule to `text`; borrowed when nothing matched.
    pub fn apply<'t>(&self, text: &'t str) -> Cow<'t, str> {
        match (self.pattern, self.replacement) {
            (Pattern::Literal(needle), Replacement::Text(with) | Replacement::Expand(with)) => {
                if text.contains(needle) {
                    Cow::Owned(text.replace(needle, with))
                } else {
                    Cow::Borrowed(text)
                }
            }
            // Computed replacements need captures
            (Pattern::Literal(_), Replacement::With(_)) => Cow::Borrowed(text),
            (Pattern::Regex(re), Replacement::Text(with)) => re.replace_all(text, regex_lite::NoExpand(with)),
            (Pattern::Regex(re), Replacement::Expand(template)) => re.replace_all(text, template),
            (Pattern::Regex(re), Replacement::With(f)) => {
                re.replace_all(text, |caps: &Captures<'_>| f(caps))
            }
        }
    }
}

/// A position in a pass: a rule, or the slot where the target's word joiner
/// policy runs.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Step {
    Rule(Rule),
    WordJoiners,
}

/// The rules of one pass as they apply to one target.
#[derive(Debug, Clone, Copy)]
pub struct RuleSet {
    pass: Pass,
    target: Target,
}

impl RuleSet {
    pub fn new(pass: Pass, target: Target) -> Self {
        Self { pass, target }
    }

    pub fn pass(&self) -> Pass {
        self.pass
    }

    /// The rules in execution order.
    pub fn rules(&self) -> impl Iterator<Item = &'static Rule> + use<> {
        let policy = self.target.word_joiner_policy();
        self.pass.steps().iter().flat_map(move |step| match step {
            Step::Rule(rule) => std::slice::from_ref(rule),
            Step::WordJoiners => policy.rules(),
        })
    }

    /// Run every rule applicable to `kind` over `text`, in order.
    pub fn apply(&self, kind: FileKind, text: &str) -> String {
        let mut out = Cow::Borrowed(text);
        for rule in self.rules().filter(|r| r.applies_to(kind)) {
            let replaced = match rule.apply(&out) {
                Cow::Owned(s) => Some(s),
                Cow::Borrowed(_) => None,
            };
            if let Some(s) = replaced {
                out = Cow::Owned(s);
            }
        }
        out.into_owned()
    }

    /// Rewrite one file in place. Returns whether it changed.
    pub fn apply_file(&self, path: &Path) -> Result<bool> {
        let Some(kind) = FileKind::from_path(path) else {
            return Ok(false);
        };
        let bytes = fs::read(path)?;
        let text = decode_text(&bytes, None);
        let processed = self.apply(kind, &text);
        if processed == text {
            return Ok(false);
        }
        fs::write(path, processed)?;
        Ok(true)
    }
}

/// Apply a rule set to every markup, stylesheet and package file under
/// `root`, writing back only the files that changed.
#[instrument(skip_all, fields(pass = ?rules.pass(), root = %root.display()))]
pub fn apply_tree(root: &Path, rules: &RuleSet) -> Result<usize> {
    let mut changed = 0;
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        if rules.apply_file(entry.path()).map_err(|e| e.in_file(entry.path()))? {
            debug!(file = %entry.path().display(), "rewritten");
            changed += 1;
        }
    }
    debug!(changed, "pass complete");
    Ok(changed)
}
