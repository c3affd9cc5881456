//! `DiffMetrics` repository functions — spec §3 "Diff metric row", §6.

use sqlx::PgPool;

use gold_core::model::DiffMetricRow;

use crate::errors::Result;

#[derive(sqlx::FromRow)]
struct DiffMetricRecord {
    left_digest: String,
    right_digest: String,
    num_pixels_diff: i64,
    percent_pixels_diff: f64,
    max_rgba_diffs: Vec<i16>,
    combined_metric: f64,
    dimensions_differ: bool,
    ts: chrono::DateTime<chrono::Utc>,
}

impl DiffMetricRecord {
    fn into_row(self) -> Result<DiffMetricRow> {
        let mut rgba = [0u8; 4];
        for (i, v) in self.max_rgba_diffs.iter().take(4).enumerate() {
            rgba[i] = (*v).clamp(0, 255) as u8;
        }
        Ok(DiffMetricRow {
            left: gold_core::model::Digest::from_hex(&self.left_digest)?,
            right: gold_core::model::Digest::from_hex(&self.right_digest)?,
            num_pixels_diff: self.num_pixels_diff as u64,
            percent_pixels_diff: self.percent_pixels_diff,
            max_rgba_diffs: rgba,
            combined_metric: self.combined_metric,
            dimensions_differ: self.dimensions_differ,
            timestamp: self.ts,
        })
    }
}

/// Load the (left, candidate) diff row for every candidate in
/// `candidates`, for the Reference Diff Selector (spec §4.5). Candidates
/// with no stored row are simply absent from the result, matching "if no
/// row exists, C is excluded."
pub async fn load_diff_rows(
    pool: &PgPool,
    left: &str,
    candidates: &[String],
) -> Result<Vec<DiffMetricRow>> {
    if candidates.is_empty() {
        return Ok(Vec::new());
    }
    let records = sqlx::query_as::<_, DiffMetricRecord>(
        "SELECT left_digest, right_digest, num_pixels_diff, percent_pixels_diff,
                max_rgba_diffs, combined_metric, dimensions_differ, ts
         FROM diff_metrics WHERE left_digest = $1 AND right_digest = ANY($2)",
    )
    .bind(left)
    .bind(candidates)
    .fetch_all(pool)
    .await?;

    records.into_iter().map(DiffMetricRecord::into_row).collect()
}

/// Load every diff row with `left_digest` among `digests`, for the Cluster
/// Builder (spec §4.8), keyed as `(left, right) -> distance`.
pub async fn load_combined_metrics_within(
    pool: &PgPool,
    digests: &[String],
) -> Result<Vec<(String, String, f64)>> {
    if digests.is_empty() {
        return Ok(Vec::new());
    }
    let rows: Vec<(String, String, f64)> = sqlx::query_as(
        "SELECT left_digest, right_digest, combined_metric FROM diff_metrics
         WHERE left_digest = ANY($1) AND right_digest = ANY($1)",
    )
    .bind(digests)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
