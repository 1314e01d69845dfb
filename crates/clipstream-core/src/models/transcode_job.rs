use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl Display for JobStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            JobStatus::Pending => write!(f, "PENDING"),
            JobStatus::Processing => write!(f, "PROCESSING"),
            JobStatus::Completed => write!(f, "COMPLETED"),
            JobStatus::Failed => write!(f, "FAILED"),
        }
    }
}

impl FromStr for JobStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(JobStatus::Pending),
            "PROCESSING" => Ok(JobStatus::Processing),
            "COMPLETED" => Ok(JobStatus::Completed),
            "FAILED" => Ok(JobStatus::Failed),
            _ => Err(anyhow::anyhow!("Invalid job status: {}", s)),
        }
    }
}

/// Job priority. Persisted as an integer band so the claim query can order by
/// a single column; the wire format is the band name.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
}

impl Priority {
    pub fn as_i32(&self) -> i32 {
        match self {
            Priority::Low => 3,
            Priority::Normal => 5,
            Priority::High => 7,
        }
    }

    pub fn from_i32(value: i32) -> Self {
        match value {
            i32::MIN..=3 => Priority::Low,
            4..=6 => Priority::Normal,
            _ => Priority::High,
        }
    }
}

impl From<Priority> for i32 {
    fn from(priority: Priority) -> Self {
        priority.as_i32()
    }
}

impl Display for Priority {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Priority::Low => write!(f, "LOW"),
            Priority::Normal => write!(f, "NORMAL"),
            Priority::High => write!(f, "HIGH"),
        }
    }
}

/// One transcode queue entry, one-to-one with a video asset while non-terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscodeJob {
    pub id: Uuid,
    pub asset_id: Uuid,
    pub storage_key: String,
    pub storage_bucket: String,
    pub status: JobStatus,
    pub priority: i32,
    pub attempts: i32,
    pub max_attempts: i32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl sqlx::FromRow<'_, sqlx::postgres::PgRow> for TranscodeJob {
    fn from_row(row: &sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;
        Ok(TranscodeJob {
            id: row.get("id"),
            asset_id: row.get("asset_id"),
            storage_key: row.get("storage_key"),
            storage_bucket: row.get("storage_bucket"),
            status: row.get::<String, _>("status").parse().map_err(|e| {
                sqlx::Error::Decode(format!("Failed to parse job status: {}", e).into())
            })?,
            priority: row.get("priority"),
            attempts: row.get("attempts"),
            max_attempts: row.get("max_attempts"),
            last_error: row.get("last_error"),
            created_at: row.get("created_at"),
            started_at: row.get("started_at"),
            completed_at: row.get("completed_at"),
            updated_at: row.get("updated_at"),
        })
    }
}

impl TranscodeJob {
    /// Whether another attempt remains after the current one fails.
    /// `attempts` is incremented at claim time, so a job in PROCESSING with
    /// `attempts == max_attempts` is on its final try.
    pub fn can_retry(&self) -> bool {
        self.attempts < self.max_attempts
    }

    pub fn priority_band(&self) -> Priority {
        Priority::from_i32(self.priority)
    }
}

/// Per-status queue counts for operator visibility.
#[derive(Debug, Serialize, ToSchema)]
pub struct JobStats {
    pub total: i64,
    pub pending: i64,
    pub processing: i64,
    pub completed: i64,
    pub failed: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_status_round_trips() {
        for status in [
            JobStatus::Pending,
            JobStatus::Processing,
            JobStatus::Completed,
            JobStatus::Failed,
        ] {
            assert_eq!(status.to_string().parse::<JobStatus>().unwrap(), status);
        }
        assert!("RUNNING".parse::<JobStatus>().is_err());
    }

    #[test]
    fn terminal_statuses() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
    }

    #[test]
    fn priority_as_i32() {
        assert_eq!(Priority::Low.as_i32(), 3);
        assert_eq!(Priority::Normal.as_i32(), 5);
        assert_eq!(Priority::High.as_i32(), 7);
    }

    #[test]
    fn priority_from_i32_bands() {
        assert_eq!(Priority::from_i32(0), Priority::Low);
        assert_eq!(Priority::from_i32(3), Priority::Low);
        assert_eq!(Priority::from_i32(5), Priority::Normal);
        assert_eq!(Priority::from_i32(7), Priority::High);
        assert_eq!(Priority::from_i32(100), Priority::High);
    }

    #[test]
    fn priority_ordering() {
        assert!(Priority::Low < Priority::Normal);
        assert!(Priority::Normal < Priority::High);
    }

    #[test]
    fn priority_default_is_normal() {
        assert_eq!(Priority::default(), Priority::Normal);
    }

    #[test]
    fn priority_wire_format() {
        assert_eq!(
            serde_json::to_value(Priority::High).unwrap(),
            serde_json::json!("HIGH")
        );
        let parsed: Priority = serde_json::from_value(serde_json::json!("LOW")).unwrap();
        assert_eq!(parsed, Priority::Low);
    }

    #[test]
    fn can_retry_under_at_and_over_limit() {
        let mut job = job_fixture();
        job.attempts = 2;
        assert!(job.can_retry());
        job.attempts = 3;
        assert!(!job.can_retry());
        job.attempts = 5;
        assert!(!job.can_retry());
    }

    fn job_fixture() -> TranscodeJob {
        let now = Utc::now();
        TranscodeJob {
            id: Uuid::new_v4(),
            asset_id: Uuid::new_v4(),
            storage_key: "uploads/uncategorized/1-keynote.mp4".to_string(),
            storage_bucket: "media".to_string(),
            status: JobStatus::Processing,
            priority: Priority::Normal.as_i32(),
            attempts: 0,
            max_attempts: 3,
            last_error: None,
            created_at: now,
            started_at: None,
            completed_at: None,
            updated_at: now,
        }
    }
}
