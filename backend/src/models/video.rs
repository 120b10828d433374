use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};

/// Bulk export consumed by the loader: `{ "videos": [ ... ] }`.
#[derive(Debug, Clone, Deserialize)]
pub struct VideoDataset {
    pub videos: Vec<Video>,
}

/// One row of `videos` plus its nested snapshots.
#[derive(Debug, Clone, Deserialize)]
pub struct Video {
    pub id: String,
    pub creator_id: String,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub video_created_at: DateTime<Utc>,
    pub views_count: i64,
    pub likes_count: i64,
    pub comments_count: i64,
    pub reports_count: i64,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub snapshots: Vec<VideoSnapshot>,
}

/// One row of `video_snapshots`: cumulative counters at `created_at` and the
/// change since the previous snapshot.
#[derive(Debug, Clone, Deserialize)]
pub struct VideoSnapshot {
    pub id: String,
    pub video_id: String,
    pub views_count: i64,
    pub likes_count: i64,
    pub comments_count: i64,
    pub reports_count: i64,
    pub delta_views_count: i64,
    pub delta_likes_count: i64,
    pub delta_comments_count: i64,
    pub delta_reports_count: i64,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl VideoDataset {
    pub fn snapshot_count(&self) -> usize {
        self.videos.iter().map(|v| v.snapshots.len()).sum()
    }
}

/// Parse an ISO-8601 timestamp; values without an offset are taken as UTC.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    let value = value.trim();
    match DateTime::parse_from_rfc3339(value) {
        Ok(ts) => Ok(ts.with_timezone(&Utc)),
        Err(rfc_err) => ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
            .map(|naive| naive.and_utc())
            .ok_or(rfc_err),
    }
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).map_err(serde::de::Error::custom)
}
