/// Complaint records
use super::{ComplaintStatus, IssueType, Severity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stored complaint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Complaint {
    pub id: i64,
    pub user_id: i64,
    pub image_path: String,
    pub latitude: f64,
    pub longitude: f64,
    pub issue_type: IssueType,
    pub details: String,
    pub status: ComplaintStatus,
    pub severity: Option<Severity>,
    pub damage_score: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Complaint row to insert
#[derive(Debug, Clone)]
pub struct NewComplaint {
    pub user_id: i64,
    pub image_path: String,
    pub latitude: f64,
    pub longitude: f64,
    pub issue_type: IssueType,
    pub details: String,
}
