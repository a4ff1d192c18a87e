//! Output file names.

use super::Target;

pub const COVER_FILE: &str = "cover.jpg";
pub const COVER_THUMBNAIL_FILE: &str = "cover-thumbnail.jpg";

/// Lowercase ASCII form of a title or name for use in file names.
///
/// Apostrophes are dropped rather than turned into separators.
///
/// ```
/// use quire::build::url_safe;
///
/// assert_eq!(url_safe("The Hound of the Baskervilles"), "the-hound-of-the-baskervilles");
/// assert_eq!(url_safe("Tess of the d’Urbervilles"), "tess-of-the-durbervilles");
/// assert_eq!(url_safe("Émile Zola"), "emile-zola");
/// ```
pub fn url_safe(text: &str) -> String {
    let stripped: String = text
        .chars()
        .filter(|c| !matches!(c, '\'' | '’' | '‘' | '"' | '“' | '”'))
        .collect();
    slug::slugify(stripped)
}

/// Names of everything a build writes to the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputNames {
    stem: String,
}

impl OutputNames {
    pub fn new(title: &str, author: &str, proof: bool) -> Self {
        let mut stem = format!("{}_{}", url_safe(title), url_safe(author));
        if proof {
            stem.push_str(".proof");
        }
        Self { stem }
    }

    /// `<title>_<author>[.proof]`
    pub fn stem(&self) -> &str {
        &self.stem
    }

    pub fn file_name(&self, target: Target) -> String {
        format!("{}.{}", self.stem, target.extension())
    }

    /// Cover thumbnail name the Kindle uses to find a book's cover.
    pub fn kindle_thumbnail(asin: &str) -> String {
        format!("thumbnail_{asin}_EBOK_portrait.jpg")
    }

    /// Whether `name` is a Kindle cover thumbnail from any build.
    pub fn is_kindle_thumbnail(name: &str) -> bool {
        name.starts_with("thumbnail_") && name.ends_with("_EBOK_portrait.jpg")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_names() {
        let names = OutputNames::new("Persuasion", "Jane Austen", false);
        assert_eq!(names.file_name(Target::Epub3), "persuasion_jane-austen.epub3");
        assert_eq!(names.file_name(Target::Compatible), "persuasion_jane-austen.epub");
        assert_eq!(names.file_name(Target::Kobo), "persuasion_jane-austen.kepub.epub");
        assert_eq!(names.file_name(Target::Kindle), "persuasion_jane-austen.azw3");

        let proof = OutputNames::new("Persuasion", "Jane Austen", true);
        assert_eq!(proof.file_name(Target::Kobo), "persuasion_jane-austen.proof.kepub.epub");
    }

    #[test]
    fn test_kindle_thumbnail() {
        let name = OutputNames::kindle_thumbnail("abc123");
        assert_eq!(name, "thumbnail_abc123_EBOK_portrait.jpg");
        assert!(OutputNames::is_kindle_thumbnail(&name));
        assert!(!OutputNames::is_kindle_thumbnail("cover-thumbnail.jpg"));
    }
}
