use serde::Deserialize;

/// Likelihood label returned by the moderation service for one category.
///
/// Discriminants are the ordinal scores stored in the record files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum Likelihood {
    #[default]
    Unknown = 0,
    VeryUnlikely = 1,
    Unlikely = 2,
    Possible = 3,
    Likely = 4,
    VeryLikely = 5,
}

/// Any category at or above this level marks the image for rejection.
pub const REJECTION_THRESHOLD: Likelihood = Likelihood::Likely;

impl Likelihood {
    pub fn ordinal(self) -> u8 {
        self as u8
    }
}

/// The five safe-search categories for one image.
///
/// Categories left out of a response are treated as `UNKNOWN`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct SafeSearchScores {
    #[serde(default)]
    pub adult: Likelihood,
    #[serde(default)]
    pub medical: Likelihood,
    #[serde(default)]
    pub violence: Likelihood,
    #[serde(default)]
    pub racy: Likelihood,
    #[serde(default)]
    pub spoof: Likelihood,
}

impl SafeSearchScores {
    /// Ordinals in column order: adult, medical, violence, racy, spoof.
    pub fn ordinals(&self) -> [u8; 5] {
        [
            self.adult.ordinal(),
            self.medical.ordinal(),
            self.violence.ordinal(),
            self.racy.ordinal(),
            self.spoof.ordinal(),
        ]
    }
}

pub fn should_be_rejected(scores: &[u8]) -> bool {
    scores.iter().any(|&score| score >= REJECTION_THRESHOLD.ordinal())
}
