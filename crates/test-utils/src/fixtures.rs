//! CSV fixtures for pipeline tests.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use crime_common::{GridCell, ModelVariant};

/// One row of a synthetic ranking CSV.
#[derive(Debug, Clone, Copy)]
pub struct RankingRow {
    pub rank: i64,
    pub grid_id: i64,
    pub count: f64,
    pub target_period: i64,
}

/// Build a ranking CSV with the count column of the given variant.
///
/// ML exports carry both predicted and actual counts, so the mlp fixture
/// includes an `Actual_Crime_Count` column mirroring the count values.
pub fn ranking_csv(variant: ModelVariant, rows: &[RankingRow]) -> String {
    let mut text = String::new();

    match variant {
        ModelVariant::Mlp => {
            text.push_str("Rank,grid_id,Predicted_Crime_Count,Actual_Crime_Count,Target_Period\n");
            for row in rows {
                let _ = writeln!(
                    text,
                    "{},{},{},{},{}",
                    row.rank, row.grid_id, row.count, row.count, row.target_period
                );
            }
        }
        _ => {
            let _ = writeln!(
                text,
                "Rank,grid_id,{},Target_Period",
                variant.count_column()
            );
            for row in rows {
                let _ = writeln!(
                    text,
                    "{},{},{},{}",
                    row.rank, row.grid_id, row.count, row.target_period
                );
            }
        }
    }

    text
}

/// Build a coordinate CSV from (gridid, xcentroid, ycentroid) tuples.
pub fn coordinate_csv(cells: &[(i64, f64, f64)]) -> String {
    let mut text = String::from("gridid,xcentroid,ycentroid\n");
    for (gridid, x, y) in cells {
        let _ = writeln!(text, "{},{},{}", gridid, x, y);
    }
    text
}

/// Build a mapped CSV in the layout written by the mapping pipeline.
pub fn mapped_csv(variant: ModelVariant, rows: &[(i64, i64, i64, i64)]) -> String {
    let mut text = format!(
        "Rank,grid_id,{},Target_Period,center_longitude,center_latitude,\
         southwest_lat,southwest_lng,northeast_lat,northeast_lng\n",
        variant.count_column()
    );

    for (rank, grid_id, count, period) in rows {
        let cell = GridCell::from_centroid(*grid_id, -82.5 + *grid_id as f64 * 0.01, 27.3);
        let _ = writeln!(
            text,
            "{},{},{},{},{},{},{},{},{},{}",
            rank,
            grid_id,
            count,
            period,
            cell.center_longitude,
            cell.center_latitude,
            cell.southwest_lat,
            cell.southwest_lng,
            cell.northeast_lat,
            cell.northeast_lng
        );
    }

    text
}

/// Build a summary-statistics CSV in the reporter's layout.
///
/// Rows are (model, period_label, target_periods, pei_percent,
/// accuracy_percent).
pub fn summary_table_csv(rows: &[(&str, &str, i64, f64, f64)]) -> String {
    let mut text = String::from(
        "dataset,model,temporal,grid_size,tie_breaking,target_periods,period,\
         pei_percent,accuracy_percent\n",
    );
    for (model, period_label, target_periods, pei, accuracy) in rows {
        let _ = writeln!(
            text,
            "sarasota,{},monthly,500,random,{},{},{},{}",
            model, target_periods, period_label, pei, accuracy
        );
    }
    text
}

/// Write `content` to `dir/name`, creating parent directories as needed.
pub fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create fixture dir");
    }
    fs::write(&path, content).expect("write fixture file");
    path
}
