use crate::error::Error;
use std::{fmt, str::FromStr};

/// Rendering mode which encodes the position of each metric into the header value,
/// so that the registration order survives clients re-sorting the metrics.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum PrefixMode {
    /// Metrics are rendered as they are.
    #[default]
    None,
    /// The name is prefixed with the zero-padded 0-based index, e.g. `01_db`.
    Index,
    /// The description is prefixed with the 1-based position, e.g. `desc="2: Database"`.
    Description,
}

impl PrefixMode {
    /// Returns `self` as `&'static str`.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Index => "index",
            Self::Description => "description",
        }
    }

    /// Returns `true` if the metrics are rendered with a prefix.
    #[inline]
    pub fn is_enabled(&self) -> bool {
        !matches!(self, Self::None)
    }

    /// Returns the position marker of the metric at `index` in a list of `count` metrics.
    pub(crate) fn position(self, index: usize, count: usize) -> Position {
        match self {
            Self::None => Position::Unmarked,
            Self::Index => Position::Index {
                index,
                width: index_width(count),
            },
            Self::Description => Position::Ordinal(index + 1),
        }
    }
}

impl fmt::Display for PrefixMode {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PrefixMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "index" => Ok(Self::Index),
            "description" => Ok(Self::Description),
            _ => Err(Error::new(format!("invalid prefix mode `{s}`"))),
        }
    }
}

/// Position marker of a metric in the header value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Position {
    /// No marker.
    Unmarked,
    /// Zero-padded 0-based index before the name.
    Index { index: usize, width: usize },
    /// 1-based position before the description.
    Ordinal(usize),
}

/// Number of decimal digits of the largest index, at least one.
fn index_width(count: usize) -> usize {
    count
        .saturating_sub(1)
        .checked_ilog10()
        .map_or(1, |exp| exp as usize + 1)
}
