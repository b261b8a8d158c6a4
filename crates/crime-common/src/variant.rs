//! Model variants and their CSV/database column mappings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CrimeError;

/// The three sources of per-grid counts.
///
/// "lee" is the historical name of the baseline statistical model and is
/// kept in file names and CLI input for compatibility with existing data
/// directories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelVariant {
    /// Ground-truth observed counts.
    Actual,
    /// ML model predictions.
    Mlp,
    /// Baseline statistical model ("lee").
    #[serde(alias = "lee")]
    Baseline,
}

impl ModelVariant {
    /// Short name used in mapped file names and CLI flags.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Actual => "actual",
            Self::Mlp => "mlp",
            Self::Baseline => "lee",
        }
    }

    /// Count column name in the source ranking CSV.
    pub fn count_column(&self) -> &'static str {
        match self {
            Self::Actual => "Actual_Crime_Count",
            Self::Mlp => "Predicted_Crime_Count",
            Self::Baseline => "Crime_T1",
        }
    }

    /// File name of the mapped per-period output.
    pub fn mapped_filename(&self) -> String {
        format!("mapped_{}.csv", self.as_str())
    }

    /// Count field name in API/snapshot JSON payloads.
    pub fn output_count_field(&self) -> &'static str {
        match self {
            Self::Actual => "actual_crime_count",
            Self::Mlp => "mlp_crime_count",
            Self::Baseline => "baseline_predicted_count",
        }
    }

    /// Whether the rank must be re-derived from counts instead of taken
    /// from the source file.
    pub fn rerank_from_counts(&self) -> bool {
        matches!(self, Self::Actual)
    }
}

impl FromStr for ModelVariant {
    type Err = CrimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "actual" => Ok(Self::Actual),
            "mlp" => Ok(Self::Mlp),
            "lee" | "baseline" => Ok(Self::Baseline),
            other => Err(CrimeError::InvalidParameter {
                param: "model".to_string(),
                message: format!("unknown model variant: {}", other),
            }),
        }
    }
}

impl fmt::Display for ModelVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_both_baseline_names() {
        assert_eq!(
            "lee".parse::<ModelVariant>().unwrap(),
            ModelVariant::Baseline
        );
        assert_eq!(
            "baseline".parse::<ModelVariant>().unwrap(),
            ModelVariant::Baseline
        );
        assert!("gru".parse::<ModelVariant>().is_err());
    }

    #[test]
    fn test_mapped_filenames() {
        assert_eq!(ModelVariant::Mlp.mapped_filename(), "mapped_mlp.csv");
        assert_eq!(ModelVariant::Baseline.mapped_filename(), "mapped_lee.csv");
        assert_eq!(ModelVariant::Actual.mapped_filename(), "mapped_actual.csv");
    }
}
