//! End-to-end tests for the mapping pipeline.

use crime_common::ModelVariant;
use mapping::{map_model, read_mapped_rows, read_target_period};
use test_utils::{coordinate_csv, ranking_csv, write_file, RankingRow};

fn row(rank: i64, grid_id: i64, count: f64) -> RankingRow {
    RankingRow {
        rank,
        grid_id,
        count,
        target_period: 202302,
    }
}

#[test]
fn baseline_three_rows_map_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let model_path = write_file(
        dir.path(),
        "data/baseline/grid_ranking.csv",
        &ranking_csv(
            ModelVariant::Baseline,
            &[row(1, 1, 7.0), row(2, 2, 5.0), row(3, 3, 2.0)],
        ),
    );
    let coordinate_path = write_file(
        dir.path(),
        "coordinate/coordinate.csv",
        &coordinate_csv(&[
            (1, -82.53, 27.33),
            (2, -82.52, 27.34),
            (3, -82.51, 27.35),
        ]),
    );
    let processed = dir.path().join("processed_data");

    let outputs = map_model(
        &model_path,
        &coordinate_path,
        ModelVariant::Baseline,
        &processed,
    )
    .unwrap();

    assert_eq!(outputs.len(), 1);
    assert_eq!(outputs[0].period, 202302);
    assert_eq!(outputs[0].rows, 3);
    assert_eq!(outputs[0].path, processed.join("202302/mapped_lee.csv"));

    // Integer-typed rank/grid_id/period columns in the written file.
    let content = std::fs::read_to_string(&outputs[0].path).unwrap();
    let mut lines = content.lines();
    let header = lines.next().unwrap();
    assert!(header.starts_with("Rank,grid_id,Crime_T1,Target_Period"));
    let first = lines.next().unwrap();
    assert!(first.starts_with("1,1,7,202302,"));
}

#[test]
fn join_drops_grid_ids_missing_from_either_side() {
    let dir = tempfile::tempdir().unwrap();
    // Grid 3 has no coordinates; grid 99 has coordinates but no ranking row.
    let model_path = write_file(
        dir.path(),
        "grid_ranking.csv",
        &ranking_csv(
            ModelVariant::Baseline,
            &[row(1, 1, 7.0), row(2, 2, 5.0), row(3, 3, 2.0)],
        ),
    );
    let coordinate_path = write_file(
        dir.path(),
        "coordinate.csv",
        &coordinate_csv(&[(1, -82.53, 27.33), (2, -82.52, 27.34), (99, -82.0, 27.0)]),
    );

    let outputs = map_model(
        &model_path,
        &coordinate_path,
        ModelVariant::Baseline,
        &dir.path().join("processed_data"),
    )
    .unwrap();

    assert_eq!(outputs[0].rows, 2);
    let records = read_mapped_rows(&outputs[0].path, "Crime_T1", 100).unwrap();
    let ids: Vec<i64> = records.iter().filter_map(|r| r.grid_id).collect();
    assert_eq!(ids, vec![1, 2]);
}

#[test]
fn mlp_source_also_yields_mapped_actual() {
    let dir = tempfile::tempdir().unwrap();
    let model_path = write_file(
        dir.path(),
        "grid_ranking.csv",
        &ranking_csv(ModelVariant::Mlp, &[row(1, 1, 4.0), row(2, 2, 9.0)]),
    );
    let coordinate_path = write_file(
        dir.path(),
        "coordinate.csv",
        &coordinate_csv(&[(1, -82.53, 27.33), (2, -82.52, 27.34)]),
    );
    let processed = dir.path().join("processed_data");

    let outputs = map_model(&model_path, &coordinate_path, ModelVariant::Mlp, &processed).unwrap();

    assert_eq!(outputs.len(), 2);
    assert!(processed.join("202302/mapped_mlp.csv").exists());
    assert!(processed.join("202302/mapped_actual.csv").exists());

    // The actual output is reranked by count: grid 2 (count 9) first.
    let actual = read_mapped_rows(
        &processed.join("202302/mapped_actual.csv"),
        "Actual_Crime_Count",
        100,
    )
    .unwrap();
    assert_eq!(actual[0].grid_id, Some(2));
    assert_eq!(actual[0].rank, 1);
}

#[test]
fn remapping_overwrites_previous_output() {
    let dir = tempfile::tempdir().unwrap();
    let model_path = write_file(
        dir.path(),
        "grid_ranking.csv",
        &ranking_csv(ModelVariant::Baseline, &[row(1, 1, 7.0)]),
    );
    let coordinate_path = write_file(
        dir.path(),
        "coordinate.csv",
        &coordinate_csv(&[(1, -82.53, 27.33)]),
    );
    let processed = dir.path().join("processed_data");

    let first = map_model(
        &model_path,
        &coordinate_path,
        ModelVariant::Baseline,
        &processed,
    )
    .unwrap();
    let before = std::fs::read_to_string(&first.first().unwrap().path).unwrap();

    let second = map_model(
        &model_path,
        &coordinate_path,
        ModelVariant::Baseline,
        &processed,
    )
    .unwrap();
    let after = std::fs::read_to_string(&second.first().unwrap().path).unwrap();

    assert_eq!(before, after);
}

#[test]
fn target_period_peeks_at_first_row() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(
        dir.path(),
        "grid_ranking.csv",
        &ranking_csv(ModelVariant::Baseline, &[row(1, 1, 7.0)]),
    );

    assert_eq!(read_target_period(&path), Some("202302".to_string()));
    assert_eq!(read_target_period(&dir.path().join("missing.csv")), None);
}
