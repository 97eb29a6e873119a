//! Inclusive integer intervals used for arity and group multiplicity.
//!
//! A [`Range`] is written the way it appears in command definitions:
//! `"2"` (exactly two), `"0..1"`, `"1..*"` (one or more) or `"*"` (any
//! number, including zero).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced when parsing a textual range.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    /// The text is empty or whitespace-only.
    #[error("range cannot be empty")]
    Empty,
    /// One of the bounds is not a non-negative integer.
    #[error("invalid range bound '{bound}' in '{text}'")]
    InvalidBound { text: String, bound: String },
    /// The lower bound is greater than the upper bound.
    #[error("invalid range '{0}': min must not exceed max")]
    Inverted(String),
}

/// An inclusive `[min, max]` interval where `max` may be unbounded.
///
/// # Examples
///
/// ```
/// use argspec_core::Range;
///
/// let r: Range = "1..*".parse().unwrap();
/// assert!(r.contains(1));
/// assert!(r.contains(1_000));
/// assert!(!r.contains(0));
/// assert_eq!(r.to_string(), "1..*");
///
/// assert_eq!("2".parse::<Range>().unwrap(), Range::exactly(2));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Range {
    min: u32,
    max: Option<u32>,
}

impl Range {
    /// Creates a bounded range, rejecting `min > max`.
    pub fn new(min: u32, max: u32) -> Result<Self, RangeError> {
        if min > max {
            return Err(RangeError::Inverted(format!("{min}..{max}")));
        }
        Ok(Self {
            min,
            max: Some(max),
        })
    }

    /// A range matching exactly `n`.
    pub const fn exactly(n: u32) -> Self {
        Self {
            min: n,
            max: Some(n),
        }
    }

    /// A range with no upper bound.
    pub const fn at_least(min: u32) -> Self {
        Self { min, max: None }
    }

    /// `0..1`, the default group multiplicity.
    pub const fn optional() -> Self {
        Self {
            min: 0,
            max: Some(1),
        }
    }

    pub const fn min(&self) -> u32 {
        self.min
    }

    /// Upper bound, or `None` when unbounded.
    pub const fn max(&self) -> Option<u32> {
        self.max
    }

    pub const fn is_unbounded(&self) -> bool {
        self.max.is_none()
    }

    /// Returns `true` if `n` lies within the interval.
    pub fn contains(&self, n: u32) -> bool {
        n >= self.min && self.max.is_none_or(|max| n <= max)
    }

    /// Returns `true` if a count of `n` may still grow without leaving the range.
    pub fn admits_more_than(&self, n: usize) -> bool {
        self.max.is_none_or(|max| (max as usize) > n)
    }
}

impl Default for Range {
    fn default() -> Self {
        Self::optional()
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) if max == self.min => write!(f, "{max}"),
            Some(max) => write!(f, "{}..{max}", self.min),
            None if self.min == 0 => write!(f, "*"),
            None => write!(f, "{}..*", self.min),
        }
    }
}

impl FromStr for Range {
    type Err = RangeError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(RangeError::Empty);
        }
        if trimmed == "*" {
            return Ok(Self::at_least(0));
        }

        let bound = |raw: &str| {
            raw.trim()
                .parse::<u32>()
                .map_err(|_| RangeError::InvalidBound {
                    text: text.to_string(),
                    bound: raw.to_string(),
                })
        };

        match trimmed.split_once("..") {
            None => Ok(Self::exactly(bound(trimmed)?)),
            Some((min, max)) if max.trim() == "*" => Ok(Self::at_least(bound(min)?)),
            Some((min, max)) => {
                let (min, max) = (bound(min)?, bound(max)?);
                if min > max {
                    return Err(RangeError::Inverted(text.to_string()));
                }
                Ok(Self {
                    min,
                    max: Some(max),
                })
            }
        }
    }
}

impl TryFrom<String> for Range {
    type Error = RangeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Range> for String {
    fn from(range: Range) -> Self {
        range.to_string()
    }
}
