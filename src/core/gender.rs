//! Gender normalisation into the two capacity buckets.
//!
//! Raw gender strings are only ever read at the identity boundary; everything
//! past it works with [`GenderBucket`].

use serde::{Deserialize, Serialize};

const MALE_TOKENS: &[&str] = &["m", "masc", "masculino", "h", "hombre", "male", "man"];
const FEMALE_TOKENS: &[&str] = &["f", "fem", "femenino", "mujer", "female", "woman"];

/// Capacity-accounting category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GenderBucket {
    /// Bucket A.
    #[serde(rename = "M")]
    Male,
    /// Bucket B.
    #[serde(rename = "F")]
    Female,
}

impl GenderBucket {
    /// Classify a raw token case-insensitively; unknown tokens yield `None`.
    pub fn classify(raw: &str) -> Option<Self> {
        let token = raw.trim().to_lowercase();
        if MALE_TOKENS.contains(&token.as_str()) {
            Some(Self::Male)
        } else if FEMALE_TOKENS.contains(&token.as_str()) {
            Some(Self::Female)
        } else {
            None
        }
    }

    /// Short code used on the wire and in storage.
    pub const fn code(self) -> &'static str {
        match self {
            Self::Male => "M",
            Self::Female => "F",
        }
    }

    /// Inverse of [`GenderBucket::code`].
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "M" => Some(Self::Male),
            "F" => Some(Self::Female),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn male_synonyms_map_to_bucket_a() {
        for raw in ["M", "masculino", "hombre", "male", " Male ", "MASC"] {
            assert_eq!(GenderBucket::classify(raw), Some(GenderBucket::Male), "{raw}");
        }
    }

    #[test]
    fn female_synonyms_map_to_bucket_b() {
        for raw in ["F", "femenino", "mujer", "female", "Woman"] {
            assert_eq!(GenderBucket::classify(raw), Some(GenderBucket::Female), "{raw}");
        }
    }

    #[test]
    fn lone_m_is_never_female() {
        assert_eq!(GenderBucket::classify("m"), Some(GenderBucket::Male));
        assert_ne!(GenderBucket::classify("m"), Some(GenderBucket::Female));
    }

    #[test]
    fn unknown_tokens_are_unclassified() {
        for raw in ["", "x", "otro", "mf", "n/a"] {
            assert_eq!(GenderBucket::classify(raw), None, "{raw}");
        }
    }
}
