//! Target period handling.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CrimeError;

/// A YYYYMM-encoded reporting interval, e.g. 202302.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TargetPeriod(pub i64);

impl TargetPeriod {
    pub fn as_i64(&self) -> i64 {
        self.0
    }

    /// Extract the leading integer from a period label such as "1 Month".
    ///
    /// Returns None when the label is empty or the first token is not a
    /// number; callers decide the fallback (the metric importer uses the
    /// row number).
    pub fn from_label(label: &str) -> Option<Self> {
        let first = label.split_whitespace().next()?;
        first.parse::<i64>().ok().map(TargetPeriod)
    }
}

impl FromStr for TargetPeriod {
    type Err = CrimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<i64>()
            .map(TargetPeriod)
            .map_err(|_| CrimeError::InvalidParameter {
                param: "period".to_string(),
                message: format!("'{}' is not an integer (expected YYYYMM)", s),
            })
    }
}

impl fmt::Display for TargetPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
