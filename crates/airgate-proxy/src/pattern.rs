//! Wildcard model patterns
//!
//! A pattern may carry `*` only at its ends: `*` alone, `prefix*`,
//! `*suffix`, or `*keyword*`. Matching is case-insensitive.

/// Model families excluded from generic patterns unless the pattern asks for
/// them by name
pub const CATEGORY_KEYWORDS: &[&str] = &[
    "image",
    "video",
    "vedio",
    "embedding",
    "audio",
    "tools",
    "retrieval",
    "fine-tuning",
    "moderation",
    "vector",
    "claude",
    "codex",
    "nano",
    "banana",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    /// `*`
    Any,
    /// No asterisk at all
    Exact(String),
    Prefix(String),
    Suffix(String),
    Contains(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatternError {
    #[error("pattern cannot be empty")]
    Empty,
    #[error("asterisk (*) can only be at the beginning or end")]
    MisplacedAsterisk,
    #[error("must have content between asterisks")]
    NoKeyword,
}

impl Pattern {
    /// # Errors
    ///
    /// Returns a [`PatternError`] for an empty pattern, an inner asterisk, or
    /// asterisks with nothing between them
    pub fn parse(pattern: &str) -> Result<Self, PatternError> {
        if pattern.is_empty() {
            return Err(PatternError::Empty);
        }

        if !pattern.contains('*') {
            return Ok(Self::Exact(pattern.to_owned()));
        }

        let keyword = pattern.trim_matches('*');
        if keyword.contains('*') {
            return Err(PatternError::MisplacedAsterisk);
        }
        if pattern == "*" {
            return Ok(Self::Any);
        }
        if keyword.is_empty() {
            return Err(PatternError::NoKeyword);
        }

        let leading = pattern.starts_with('*');
        let trailing = pattern.ends_with('*');
        let keyword = keyword.to_lowercase();

        Ok(match (leading, trailing) {
            (true, true) => Self::Contains(keyword),
            (false, true) => Self::Prefix(keyword),
            _ => Self::Suffix(keyword),
        })
    }

    /// Whether `model_id` satisfies the pattern, category rules included
    pub fn matches(&self, model_id: &str) -> bool {
        let keyword = match self {
            Self::Any => return true,
            Self::Exact(id) => return id == model_id,
            Self::Prefix(k) | Self::Suffix(k) | Self::Contains(k) => k,
        };

        let candidate = model_id.to_lowercase();
        let shape = match self {
            Self::Prefix(_) => candidate.starts_with(keyword.as_str()),
            Self::Suffix(_) => candidate.ends_with(keyword.as_str()),
            _ => candidate.contains(keyword.as_str()),
        };

        shape && category_allows(keyword, &candidate)
    }
}

/// A specialised model only matches a keyword that itself names a category
fn category_allows(keyword: &str, candidate: &str) -> bool {
    CATEGORY_KEYWORDS.iter().any(|category| keyword.contains(category))
        || !CATEGORY_KEYWORDS.iter().any(|category| candidate.contains(category))
}
