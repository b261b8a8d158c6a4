//! Model-vs-model metric comparison.

use serde::{Deserialize, Serialize};

/// Accuracy metrics reported for one (model, period) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricValues {
    pub model: String,
    pub target_period: i64,
    pub pei_percent: f64,
    pub accuracy_percent: f64,
}

/// One compared figure (PEI or accuracy) between the ML and baseline models.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricFigure {
    pub winner: String,
    pub difference: f64,
    pub mlp_value: f64,
    pub baseline_value: f64,
}

/// MLP-vs-baseline comparison for one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricComparison {
    pub pei: MetricFigure,
    pub accuracy: MetricFigure,
}

impl MetricComparison {
    /// Compare the ML model against the baseline.
    ///
    /// Ties go to the baseline.
    pub fn build(mlp: &MetricValues, baseline: &MetricValues) -> Self {
        Self {
            pei: compare_figure(mlp.pei_percent, baseline.pei_percent),
            accuracy: compare_figure(mlp.accuracy_percent, baseline.accuracy_percent),
        }
    }
}

fn compare_figure(mlp_value: f64, baseline_value: f64) -> MetricFigure {
    let winner = if mlp_value > baseline_value {
        "MLP"
    } else {
        "Baseline"
    };

    MetricFigure {
        winner: winner.to_string(),
        difference: round2((mlp_value - baseline_value).abs()),
        mlp_value,
        baseline_value,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Build the metrics payload served by the API and written to static
/// snapshots.
///
/// Model rows are matched by substring: any model name containing "mlp"
/// is the ML entry, any containing "lee" is the baseline entry. The
/// comparison block is present only when both models reported for the
/// period. Display colors and icons are part of the payload contract with
/// the dashboard.
pub fn metrics_payload(period: i64, rows: &[MetricValues]) -> serde_json::Value {
    let mlp_row = rows.iter().find(|r| r.model.to_lowercase().contains("mlp"));
    let baseline_row = rows.iter().find(|r| r.model.to_lowercase().contains("lee"));

    let mut metrics = Vec::new();
    if let Some(row) = mlp_row {
        metrics.push(serde_json::json!({
            "model": "MLP",
            "model_display": "MLP Predictions",
            "pei_percent": row.pei_percent,
            "accuracy": row.accuracy_percent,
            "target_period": period,
            "color": "#4ECDC4",
            "icon": "🧠",
        }));
    }
    if let Some(row) = baseline_row {
        metrics.push(serde_json::json!({
            "model": "Baseline",
            "model_display": "Baseline Predictions",
            "pei_percent": row.pei_percent,
            "accuracy": row.accuracy_percent,
            "target_period": period,
            "color": "#FFD166",
            "icon": "📊",
        }));
    }

    let comparison = match (mlp_row, baseline_row) {
        (Some(mlp), Some(baseline)) => {
            serde_json::to_value(MetricComparison::build(mlp, baseline))
                .unwrap_or(serde_json::Value::Null)
        }
        _ => serde_json::Value::Null,
    };

    serde_json::json!({
        "success": true,
        "period": period,
        "metrics": metrics,
        "comparison": comparison,
        "count": metrics.len(),
    })
}
