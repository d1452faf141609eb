use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Feedback attached to a bot reply
///
/// Encoded on the wire as a signed integer: `-1` thumbs down, `0` no rating, `1` thumbs up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "i8", try_from = "i8")]
pub enum Rating {
    Negative,
    #[default]
    Neutral,
    Positive,
}

impl Rating {
    pub fn value(self) -> i8 {
        match self {
            Rating::Negative => -1,
            Rating::Neutral => 0,
            Rating::Positive => 1,
        }
    }

    /// Rating that results from clicking `requested` while `current` is set.
    ///
    /// Clicking the active rating again removes it.
    pub fn toggled(current: Rating, requested: Rating) -> Rating {
        if current == requested {
            Rating::Neutral
        } else {
            requested
        }
    }
}

impl std::fmt::Display for Rating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rating::Negative => write!(f, "👎"),
            Rating::Neutral => write!(f, "·"),
            Rating::Positive => write!(f, "👍"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RatingParseError {
    #[error("rating out of range: {0} (expected -1, 0 or 1)")]
    OutOfRange(i64),

    #[error("unrecognised rating: {0}")]
    Unrecognised(String),
}

impl From<Rating> for i8 {
    fn from(rating: Rating) -> Self {
        rating.value()
    }
}

impl TryFrom<i8> for Rating {
    type Error = RatingParseError;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        Rating::try_from(i64::from(value))
    }
}

impl TryFrom<i64> for Rating {
    type Error = RatingParseError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(Rating::Negative),
            0 => Ok(Rating::Neutral),
            1 => Ok(Rating::Positive),
            other => Err(RatingParseError::OutOfRange(other)),
        }
    }
}

impl std::str::FromStr for Rating {
    type Err = RatingParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        match normalized.as_str() {
            "up" | "positive" | "+1" | "+" => Ok(Rating::Positive),
            "down" | "negative" | "-" => Ok(Rating::Negative),
            "none" | "neutral" | "clear" => Ok(Rating::Neutral),
            other => match other.parse::<i64>() {
                Ok(n) => Rating::try_from(n),
                Err(_) => Err(RatingParseError::Unrecognised(s.to_string())),
            },
        }
    }
}
