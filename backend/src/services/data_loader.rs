//! Bulk import of a video export into the metrics store.
//!
//! Replaces the contents of `videos` and `video_snapshots` in one transaction.

use std::path::Path;

use sqlx::{Postgres, QueryBuilder, Sqlite};

use crate::models::VideoDataset;
use crate::services::metrics_db::MetricsDb;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadSummary {
    pub videos: usize,
    pub snapshots: usize,
}

pub fn read_dataset(path: impl AsRef<Path>) -> Result<VideoDataset, anyhow::Error> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
    let dataset = serde_json::from_str(&content)
        .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path.display(), e))?;
    Ok(dataset)
}

const INSERT_VIDEOS: &str = "INSERT INTO videos (id, creator_id, video_created_at, \
     views_count, likes_count, comments_count, reports_count, created_at, updated_at) ";

const INSERT_SNAPSHOTS: &str = "INSERT INTO video_snapshots (id, video_id, \
     views_count, likes_count, comments_count, reports_count, \
     delta_views_count, delta_likes_count, delta_comments_count, delta_reports_count, \
     created_at, updated_at) ";

// Same body for both backends; QueryBuilder picks the placeholder syntax.
macro_rules! load_into {
    ($db:ty, $pool:expr, $clear:expr, $dataset:expr, $batch_size:expr) => {{
        let mut tx = $pool.begin().await?;

        for stmt in $clear {
            sqlx::query(stmt).execute(&mut *tx).await?;
        }

        for chunk in $dataset.videos.chunks($batch_size) {
            let mut qb = QueryBuilder::<$db>::new(INSERT_VIDEOS);
            qb.push_values(chunk, |mut row, v| {
                row.push_bind(v.id.clone())
                    .push_bind(v.creator_id.clone())
                    .push_bind(v.video_created_at)
                    .push_bind(v.views_count)
                    .push_bind(v.likes_count)
                    .push_bind(v.comments_count)
                    .push_bind(v.reports_count)
                    .push_bind(v.created_at)
                    .push_bind(v.updated_at);
            });
            qb.build().execute(&mut *tx).await?;
        }

        let snapshots: Vec<_> = $dataset.videos.iter().flat_map(|v| v.snapshots.iter()).collect();
        for chunk in snapshots.chunks($batch_size) {
            let mut qb = QueryBuilder::<$db>::new(INSERT_SNAPSHOTS);
            qb.push_values(chunk, |mut row, s| {
                row.push_bind(s.id.clone())
                    .push_bind(s.video_id.clone())
                    .push_bind(s.views_count)
                    .push_bind(s.likes_count)
                    .push_bind(s.comments_count)
                    .push_bind(s.reports_count)
                    .push_bind(s.delta_views_count)
                    .push_bind(s.delta_likes_count)
                    .push_bind(s.delta_comments_count)
                    .push_bind(s.delta_reports_count)
                    .push_bind(s.created_at)
                    .push_bind(s.updated_at);
            });
            qb.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;
        LoadSummary { videos: $dataset.videos.len(), snapshots: snapshots.len() }
    }};
}

/// Replace the store contents with `dataset`, inserting `batch_size` rows per statement.
pub async fn load_dataset(
    db: &MetricsDb,
    dataset: &VideoDataset,
    batch_size: usize,
) -> Result<LoadSummary, sqlx::Error> {
    let batch_size = batch_size.max(1);

    let summary = match db {
        MetricsDb::Postgres(pool) => load_into!(
            Postgres,
            pool,
            ["TRUNCATE TABLE video_snapshots, videos CASCADE"],
            dataset,
            batch_size
        ),
        MetricsDb::Sqlite(pool) => load_into!(
            Sqlite,
            pool,
            ["DELETE FROM video_snapshots", "DELETE FROM videos"],
            dataset,
            batch_size
        ),
    };

    tracing::info!("Loaded: videos={}, snapshots={}", summary.videos, summary.snapshots);
    Ok(summary)
}
