//! URL slugs derived from display names.
//!
//! A slug is lowercase ASCII letters, digits and single hyphens, never
//! starting or ending with a hyphen. Duplicate names are disambiguated with a
//! numeric suffix: `cafe-nero`, `cafe-nero-2`, `cafe-nero-3`.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Slug used when a name contains nothing slug-worthy (e.g. only symbols).
const FALLBACK_SLUG: &str = "store";

/// Maximum slug length before any numeric suffix is appended.
const MAX_BASE_LENGTH: usize = 96;

/// Errors that can occur when parsing a [`Slug`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SlugError {
    /// The input string is empty.
    #[error("slug cannot be empty")]
    Empty,
    /// The input contains characters outside `[a-z0-9-]`.
    #[error("slug may only contain lowercase letters, digits and hyphens")]
    InvalidCharacter,
    /// The input has leading, trailing or doubled hyphens.
    #[error("slug has misplaced hyphens")]
    MisplacedHyphen,
}

/// A validated URL slug.
///
/// ## Examples
///
/// ```
/// use storefinder_core::Slug;
///
/// let slug = Slug::from_name("  Café Nero & Co. ");
/// assert_eq!(slug.as_str(), "cafe-nero-co");
///
/// // Three stores already use `cafe-nero-co` or a numbered variant.
/// assert_eq!(slug.disambiguate(3).as_str(), "cafe-nero-co-4");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct Slug(String);

impl Slug {
    /// Derive a slug from a display name.
    ///
    /// Letters are lowercased and common Latin accents folded to ASCII; every
    /// run of other characters becomes a single hyphen.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        let mut out = String::with_capacity(name.len());
        let mut pending_hyphen = false;

        for ch in name.chars().flat_map(char::to_lowercase) {
            let ascii = ch.is_ascii_alphanumeric();
            let accent = if ascii { None } else { fold_accent(ch) };
            if !ascii && accent.is_none() {
                pending_hyphen = true;
                continue;
            }
            if pending_hyphen && !out.is_empty() {
                out.push('-');
            }
            pending_hyphen = false;
            match accent {
                Some(folded) => out.push_str(folded),
                None => out.push(ch),
            }
        }

        if out.len() > MAX_BASE_LENGTH {
            out.truncate(MAX_BASE_LENGTH);
            while out.ends_with('-') {
                out.pop();
            }
        }

        if out.is_empty() {
            out.push_str(FALLBACK_SLUG);
        }

        Self(out)
    }

    /// Parse an existing slug (from a URL or the database).
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, contains characters outside
    /// `[a-z0-9-]`, or has leading, trailing or doubled hyphens.
    pub fn parse(s: &str) -> Result<Self, SlugError> {
        if s.is_empty() {
            return Err(SlugError::Empty);
        }
        if !s
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(SlugError::InvalidCharacter);
        }
        if s.starts_with('-') || s.ends_with('-') || s.contains("--") {
            return Err(SlugError::MisplacedHyphen);
        }
        Ok(Self(s.to_owned()))
    }

    /// Returns the slug as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `Slug` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Append a numeric suffix: `name` becomes `name-<n>`.
    #[must_use]
    pub fn with_suffix(&self, n: u32) -> Self {
        Self(format!("{}-{n}", self.0))
    }

    /// Pick the slug for a record whose base slug is already used by
    /// `existing` other records (counting numbered variants).
    ///
    /// No collisions keeps the base; otherwise the suffix is `existing + 1`.
    #[must_use]
    pub fn disambiguate(&self, existing: usize) -> Self {
        if existing == 0 {
            return self.clone();
        }
        let n = u32::try_from(existing).map_or(u32::MAX, |n| n.saturating_add(1));
        self.with_suffix(n)
    }

    /// Returns `true` when `candidate` is this slug or a numbered variant of
    /// it, i.e. matches `^<self>(-\d+)?$` ignoring ASCII case.
    #[must_use]
    pub fn is_variant(&self, candidate: &str) -> bool {
        let base = self.0.as_bytes();
        let candidate_bytes = candidate.as_bytes();
        if candidate_bytes.len() < base.len()
            || !candidate_bytes
                .get(..base.len())
                .is_some_and(|head| head.eq_ignore_ascii_case(base))
        {
            return false;
        }
        match candidate_bytes.get(base.len()..) {
            None | Some([]) => true,
            Some([b'-', digits @ ..]) => {
                !digits.is_empty() && digits.iter().all(u8::is_ascii_digit)
            }
            Some(_) => false,
        }
    }

    /// Returns the numeric suffix of `candidate` relative to this base slug,
    /// if it is a numbered variant.
    #[must_use]
    pub fn suffix_of(&self, candidate: &str) -> Option<u32> {
        if !self.is_variant(candidate) {
            return None;
        }
        candidate
            .get(self.0.len()..)
            .and_then(|rest| rest.strip_prefix('-'))
            .and_then(|digits| digits.parse().ok())
    }
}

/// ASCII spelling of a lowercase accented Latin letter.
const fn fold_accent(ch: char) -> Option<&'static str> {
    let folded = match ch {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' => "a",
        'æ' => "ae",
        'ç' | 'ć' | 'č' => "c",
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ę' => "e",
        'ì' | 'í' | 'î' | 'ï' => "i",
        'ł' => "l",
        'ñ' | 'ń' => "n",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' => "o",
        'œ' => "oe",
        'ś' | 'š' => "s",
        'ß' => "ss",
        'ù' | 'ú' | 'û' | 'ü' | 'ū' => "u",
        'ý' | 'ÿ' => "y",
        'ź' | 'ż' | 'ž' => "z",
        _ => return None,
    };
    Some(folded)
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Slug {
    type Err = SlugError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Slug {
    type Error = SlugError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Slug> for String {
    fn from(slug: Slug) -> Self {
        slug.0
    }
}

impl AsRef<str> for Slug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name_basic() {
        assert_eq!(Slug::from_name("Cafe Nero").as_str(), "cafe-nero");
        assert_eq!(Slug::from_name("  Wes's   Pizza!! ").as_str(), "wes-s-pizza");
        assert_eq!(Slug::from_name("Top-Shop_2").as_str(), "top-shop-2");
    }

    #[test]
    fn test_from_name_folds_accents() {
        assert_eq!(Slug::from_name("Crème Brûlée").as_str(), "creme-brulee");
        assert_eq!(Slug::from_name("Straße").as_str(), "strasse");
    }

    #[test]
    fn test_from_name_fallback() {
        assert_eq!(Slug::from_name("!!!").as_str(), "store");
        assert_eq!(Slug::from_name("").as_str(), "store");
        assert_eq!(Slug::from_name("東京").as_str(), "store");
    }

    #[test]
    fn test_from_name_truncates() {
        let slug = Slug::from_name(&"ab ".repeat(100));
        assert!(slug.as_str().len() <= MAX_BASE_LENGTH);
        assert!(!slug.as_str().ends_with('-'));
        assert!(Slug::parse(slug.as_str()).is_ok());
    }

    #[test]
    fn test_parse() {
        assert!(Slug::parse("cafe-nero-2").is_ok());
        assert_eq!(Slug::parse(""), Err(SlugError::Empty));
        assert_eq!(Slug::parse("Cafe"), Err(SlugError::InvalidCharacter));
        assert_eq!(Slug::parse("-cafe"), Err(SlugError::MisplacedHyphen));
        assert_eq!(Slug::parse("cafe--nero"), Err(SlugError::MisplacedHyphen));
    }

    #[test]
    fn test_disambiguate() {
        let base = Slug::from_name("Cafe Nero");
        assert_eq!(base.disambiguate(0).as_str(), "cafe-nero");
        assert_eq!(base.disambiguate(1).as_str(), "cafe-nero-2");
        assert_eq!(base.disambiguate(2).as_str(), "cafe-nero-3");
    }

    #[test]
    fn test_is_variant() {
        let base = Slug::from_name("Cafe Nero");
        assert!(base.is_variant("cafe-nero"));
        assert!(base.is_variant("cafe-nero-2"));
        assert!(base.is_variant("CAFE-NERO-17"));
        assert!(!base.is_variant("cafe-nero-"));
        assert!(!base.is_variant("cafe-nero-bar"));
        assert!(!base.is_variant("cafe-ner"));
        assert!(!base.is_variant("cafe-nero-2b"));
    }

    #[test]
    fn test_suffix_of() {
        let base = Slug::from_name("Cafe Nero");
        assert_eq!(base.suffix_of("cafe-nero"), None);
        assert_eq!(base.suffix_of("cafe-nero-4"), Some(4));
        assert_eq!(base.suffix_of("other"), None);
    }
}
