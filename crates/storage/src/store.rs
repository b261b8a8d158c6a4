//! SQLite store with upsert semantics.
//!
//! All writes are keyed upserts: reruns of an import converge instead of
//! duplicating rows, and nothing is ever deleted by the pipeline.

use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use tracing::debug;

use crime_common::{CrimeError, CrimeResult, GridCell, MetricValues, ModelVariant};

/// A variant fact record to upsert, keyed by (grid, period).
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionInsert {
    pub grid_id: i64,
    pub target_period: i64,
    pub count: f64,
    pub rank: Option<i64>,
    pub source_file: String,
}

/// A fact row joined with its grid coordinates, as served by the API.
#[derive(Debug, Clone, PartialEq, FromRow, serde::Serialize)]
pub struct PredictionRow {
    pub grid_id: i64,
    pub center_longitude: f64,
    pub center_latitude: f64,
    pub southwest_lat: f64,
    pub southwest_lng: f64,
    pub northeast_lat: f64,
    pub northeast_lng: f64,
    pub target_period: i64,
    pub count: f64,
    pub rank: Option<i64>,
}

/// Periods available in the store, with the variants present for each.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct PeriodDetail {
    pub period: i64,
    pub available_models: Vec<String>,
}

/// Database connection pool and pipeline store operations.
pub struct CrimeStore {
    pool: SqlitePool,
}

impl CrimeStore {
    /// Open or create the store at the given file path.
    pub async fn open(path: &Path) -> CrimeResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);

        Self::with_options(options, 5).await
    }

    /// Connect from a database URL (e.g. `sqlite:crime_grids.db`).
    pub async fn connect(url: &str) -> CrimeResult<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| CrimeError::Database(format!("Invalid database URL: {}", e)))?
            .create_if_missing(true);

        Self::with_options(options, 5).await
    }

    /// In-memory store for tests. Limited to one connection so every
    /// query sees the same database.
    pub async fn in_memory() -> CrimeResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| CrimeError::Database(e.to_string()))?;

        Self::with_options(options, 1).await
    }

    async fn with_options(options: SqliteConnectOptions, max_connections: u32) -> CrimeResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| CrimeError::Database(format!("Connection failed: {}", e)))?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Create tables and indexes if they do not exist yet.
    async fn migrate(&self) -> CrimeResult<()> {
        for statement in SCHEMA_SQL {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| CrimeError::Database(format!("Migration failed: {}", e)))?;
        }
        Ok(())
    }

    /// Trivial connectivity check for readiness probes.
    pub async fn ping(&self) -> CrimeResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| CrimeError::Database(format!("Ping failed: {}", e)))?;
        Ok(())
    }

    /// Upsert a grid dimension record. Returns true when the grid was
    /// created, false when an existing row was updated.
    pub async fn upsert_grid(&self, cell: &GridCell) -> CrimeResult<bool> {
        let existed = self.grid_exists(cell.grid_id).await?;
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO crime_grids (
                grid_id, center_longitude, center_latitude,
                southwest_lat, southwest_lng, northeast_lat, northeast_lng,
                created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            ON CONFLICT (grid_id) DO UPDATE SET
                center_longitude = excluded.center_longitude,
                center_latitude = excluded.center_latitude,
                southwest_lat = excluded.southwest_lat,
                southwest_lng = excluded.southwest_lng,
                northeast_lat = excluded.northeast_lat,
                northeast_lng = excluded.northeast_lng,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(cell.grid_id)
        .bind(cell.center_longitude)
        .bind(cell.center_latitude)
        .bind(cell.southwest_lat)
        .bind(cell.southwest_lng)
        .bind(cell.northeast_lat)
        .bind(cell.northeast_lng)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| CrimeError::Database(format!("Grid upsert failed: {}", e)))?;

        Ok(!existed)
    }

    async fn grid_exists(&self, grid_id: i64) -> CrimeResult<bool> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT grid_id FROM crime_grids WHERE grid_id = $1")
                .bind(grid_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| CrimeError::Database(format!("Grid lookup failed: {}", e)))?;
        Ok(row.is_some())
    }

    /// Upsert a variant fact record keyed by (grid, period). Returns true
    /// when a new record was created.
    pub async fn upsert_prediction(
        &self,
        variant: ModelVariant,
        record: &PredictionInsert,
    ) -> CrimeResult<bool> {
        let table = fact_table(variant);
        let count_column = fact_count_column(variant);

        let existing: Option<(i64,)> = sqlx::query_as(&format!(
            "SELECT id FROM {} WHERE grid_id = $1 AND target_period = $2",
            table
        ))
        .bind(record.grid_id)
        .bind(record.target_period)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| CrimeError::Database(format!("Fact lookup failed: {}", e)))?;

        let sql = format!(
            r#"
            INSERT INTO {table} (grid_id, target_period, {count}, rank, source_file, recorded_date)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (grid_id, target_period) DO UPDATE SET
                {count} = excluded.{count},
                rank = excluded.rank,
                source_file = excluded.source_file
            "#,
            table = table,
            count = count_column,
        );

        let query = sqlx::query(&sql)
            .bind(record.grid_id)
            .bind(record.target_period);

        // Baseline counts stay REAL; the other variants store integers.
        let query = if variant == ModelVariant::Baseline {
            query.bind(record.count)
        } else {
            query.bind(record.count as i64)
        };

        query
            .bind(record.rank)
            .bind(&record.source_file)
            .bind(Utc::now().format("%Y-%m-%d").to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| CrimeError::Database(format!("Fact upsert failed: {}", e)))?;

        debug!(
            model = %variant,
            grid_id = record.grid_id,
            period = record.target_period,
            created = existing.is_none(),
            "Upserted prediction record"
        );

        Ok(existing.is_none())
    }

    /// Upsert a metric record keyed by (model, period). Returns true when
    /// a new record was created.
    pub async fn upsert_metric(&self, metric: &MetricValues) -> CrimeResult<bool> {
        let existing: Option<(i64,)> =
            sqlx::query_as("SELECT id FROM metrics WHERE model = $1 AND target_period = $2")
                .bind(&metric.model)
                .bind(metric.target_period)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| CrimeError::Database(format!("Metric lookup failed: {}", e)))?;

        sqlx::query(
            r#"
            INSERT INTO metrics (model, target_period, pei_percent, accuracy_percent)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (model, target_period) DO UPDATE SET
                pei_percent = excluded.pei_percent,
                accuracy_percent = excluded.accuracy_percent
            "#,
        )
        .bind(&metric.model)
        .bind(metric.target_period)
        .bind(metric.pei_percent)
        .bind(metric.accuracy_percent)
        .execute(&self.pool)
        .await
        .map_err(|e| CrimeError::Database(format!("Metric upsert failed: {}", e)))?;

        Ok(existing.is_none())
    }

    /// Top-N ranked rows for one variant and period, joined with grid
    /// coordinates and ordered by rank ascending.
    pub async fn top_predictions(
        &self,
        variant: ModelVariant,
        period: i64,
        limit: i64,
    ) -> CrimeResult<Vec<PredictionRow>> {
        let sql = format!(
            r#"
            SELECT
                g.grid_id, g.center_longitude, g.center_latitude,
                g.southwest_lat, g.southwest_lng, g.northeast_lat, g.northeast_lng,
                f.target_period, CAST(f.{count} AS REAL) AS count, f.rank
            FROM {table} f
            JOIN crime_grids g ON g.grid_id = f.grid_id
            WHERE f.target_period = $1
            ORDER BY f.rank ASC
            LIMIT $2
            "#,
            table = fact_table(variant),
            count = fact_count_column(variant),
        );

        sqlx::query_as::<_, PredictionRow>(&sql)
            .bind(period)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| CrimeError::Database(format!("Top-predictions query failed: {}", e)))
    }

    /// All metric rows recorded for one period.
    pub async fn metrics_for_period(&self, period: i64) -> CrimeResult<Vec<MetricValues>> {
        let rows: Vec<(String, i64, f64, f64)> = sqlx::query_as(
            "SELECT model, target_period, pei_percent, accuracy_percent \
             FROM metrics WHERE target_period = $1 ORDER BY model",
        )
        .bind(period)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| CrimeError::Database(format!("Metrics query failed: {}", e)))?;

        Ok(rows
            .into_iter()
            .map(|(model, target_period, pei_percent, accuracy_percent)| MetricValues {
                model,
                target_period,
                pei_percent,
                accuracy_percent,
            })
            .collect())
    }

    /// Distinct target periods across all fact tables, sorted ascending,
    /// with the variants available for each period.
    pub async fn available_periods(&self) -> CrimeResult<Vec<PeriodDetail>> {
        let mut by_period: BTreeMap<i64, Vec<String>> = BTreeMap::new();

        for variant in [
            ModelVariant::Actual,
            ModelVariant::Mlp,
            ModelVariant::Baseline,
        ] {
            let sql = format!(
                "SELECT DISTINCT target_period FROM {}",
                fact_table(variant)
            );
            let periods: Vec<(i64,)> = sqlx::query_as(&sql)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| CrimeError::Database(format!("Periods query failed: {}", e)))?;

            for (period,) in periods {
                by_period
                    .entry(period)
                    .or_default()
                    .push(variant.as_str().to_string());
            }
        }

        Ok(by_period
            .into_iter()
            .map(|(period, available_models)| PeriodDetail {
                period,
                available_models,
            })
            .collect())
    }
}

fn fact_table(variant: ModelVariant) -> &'static str {
    match variant {
        ModelVariant::Actual => "actual_crimes",
        ModelVariant::Mlp => "mlp_predictions",
        ModelVariant::Baseline => "baseline_predictions",
    }
}

fn fact_count_column(variant: ModelVariant) -> &'static str {
    match variant {
        ModelVariant::Actual => "actual_crime_count",
        ModelVariant::Mlp => "mlp_crime_count",
        ModelVariant::Baseline => "baseline_predicted_count",
    }
}

const SCHEMA_SQL: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS crime_grids (
        grid_id INTEGER PRIMARY KEY,
        center_longitude REAL NOT NULL,
        center_latitude REAL NOT NULL,
        southwest_lat REAL NOT NULL,
        southwest_lng REAL NOT NULL,
        northeast_lat REAL NOT NULL,
        northeast_lng REAL NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS actual_crimes (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        grid_id INTEGER NOT NULL REFERENCES crime_grids(grid_id),
        target_period INTEGER NOT NULL,
        actual_crime_count INTEGER NOT NULL,
        rank INTEGER,
        source_file TEXT NOT NULL DEFAULT '',
        recorded_date TEXT NOT NULL,
        UNIQUE (grid_id, target_period)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS mlp_predictions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        grid_id INTEGER NOT NULL REFERENCES crime_grids(grid_id),
        target_period INTEGER NOT NULL,
        mlp_crime_count INTEGER NOT NULL,
        rank INTEGER,
        source_file TEXT NOT NULL DEFAULT '',
        recorded_date TEXT NOT NULL,
        UNIQUE (grid_id, target_period)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS baseline_predictions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        grid_id INTEGER NOT NULL REFERENCES crime_grids(grid_id),
        target_period INTEGER NOT NULL,
        baseline_predicted_count REAL NOT NULL,
        rank INTEGER,
        source_file TEXT NOT NULL DEFAULT '',
        recorded_date TEXT NOT NULL,
        UNIQUE (grid_id, target_period)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS metrics (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        model TEXT NOT NULL,
        target_period INTEGER NOT NULL,
        pei_percent REAL NOT NULL,
        accuracy_percent REAL NOT NULL,
        UNIQUE (model, target_period)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_actual_period ON actual_crimes(target_period)",
    "CREATE INDEX IF NOT EXISTS idx_mlp_period ON mlp_predictions(target_period)",
    "CREATE INDEX IF NOT EXISTS idx_baseline_period ON baseline_predictions(target_period)",
];
