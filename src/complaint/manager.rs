/// Complaint persistence
use super::{Complaint, ComplaintStatus, IssueType, NewComplaint, Severity};
use crate::error::{FmsError, FmsResult};
use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

const COMPLAINT_COLUMNS: &str = "id, user_id, image_path, latitude, longitude, issue_type, details,
     status, severity, damage_score, created_at, updated_at";

pub const DEFAULT_LIST_LIMIT: i64 = 100;
pub const MAX_LIST_LIMIT: i64 = 500;

/// Optional filters for the all-complaints listing
#[derive(Debug, Clone, Default)]
pub struct ComplaintFilter {
    pub status: Option<ComplaintStatus>,
    pub severity: Option<Severity>,
    pub issue_type: Option<IssueType>,
    pub limit: Option<i64>,
}

impl ComplaintFilter {
    /// Requested limit clamped to 1..=500
    pub fn effective_limit(&self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_LIST_LIMIT)
            .clamp(1, MAX_LIST_LIMIT)
    }
}

/// Complaint manager
pub struct ComplaintManager {
    db: SqlitePool,
}

impl ComplaintManager {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Insert a new complaint as `reported` with `low` severity
    pub async fn create(&self, new: NewComplaint) -> FmsResult<Complaint> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO complaints (user_id, image_path, latitude, longitude, issue_type, details,
                                    status, severity, damage_score, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, NULL, ?, ?)
            "#,
        )
        .bind(new.user_id)
        .bind(&new.image_path)
        .bind(new.latitude)
        .bind(new.longitude)
        .bind(new.issue_type.as_str())
        .bind(&new.details)
        .bind(ComplaintStatus::Reported.as_str())
        .bind(Severity::Low.as_str())
        .bind(now)
        .bind(now)
        .execute(&self.db)
        .await?;

        Ok(Complaint {
            id: result.last_insert_rowid(),
            user_id: new.user_id,
            image_path: new.image_path,
            latitude: new.latitude,
            longitude: new.longitude,
            issue_type: new.issue_type,
            details: new.details,
            status: ComplaintStatus::Reported,
            severity: Some(Severity::Low),
            damage_score: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Store the analyzer's verdict
    pub async fn record_assessment(
        &self,
        id: i64,
        severity: Severity,
        damage_score: i64,
    ) -> FmsResult<Complaint> {
        let result = sqlx::query(
            r#"
            UPDATE complaints
            SET severity = ?, damage_score = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(severity.as_str())
        .bind(damage_score)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(not_found(id));
        }

        self.get(id).await?.ok_or_else(|| not_found(id))
    }

    /// Change status, and severity when one is given
    ///
    /// `severity`: `None` leaves it alone, `Some(None)` clears it.
    pub async fn update(
        &self,
        id: i64,
        status: ComplaintStatus,
        severity: Option<Option<Severity>>,
    ) -> FmsResult<Complaint> {
        let now = Utc::now();

        let query = match severity {
            Some(severity) => sqlx::query(
                r#"
                UPDATE complaints
                SET status = ?, severity = ?, updated_at = ?
                WHERE id = ?
                "#,
            )
            .bind(status.as_str())
            .bind(severity.map(|s| s.as_str())),
            None => sqlx::query(
                r#"
                UPDATE complaints
                SET status = ?, updated_at = ?
                WHERE id = ?
                "#,
            )
            .bind(status.as_str()),
        };

        let result = query.bind(now).bind(id).execute(&self.db).await?;

        if result.rows_affected() == 0 {
            return Err(not_found(id));
        }

        self.get(id).await?.ok_or_else(|| not_found(id))
    }

    /// Get complaint by ID
    pub async fn get(&self, id: i64) -> FmsResult<Option<Complaint>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM complaints WHERE id = ?",
            COMPLAINT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        row.map(parse_complaint).transpose()
    }

    /// A user's own complaints, newest first
    pub async fn list_for_user(&self, user_id: i64) -> FmsResult<Vec<Complaint>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM complaints WHERE user_id = ? ORDER BY created_at DESC, id DESC",
            COMPLAINT_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(parse_complaint).collect()
    }

    /// All complaints, newest first
    pub async fn list(&self, filter: &ComplaintFilter) -> FmsResult<Vec<Complaint>> {
        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM complaints WHERE 1 = 1", COMPLAINT_COLUMNS));

        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(severity) = filter.severity {
            query.push(" AND severity = ").push_bind(severity.as_str());
        }
        if let Some(issue_type) = filter.issue_type {
            query.push(" AND issue_type = ").push_bind(issue_type.as_str());
        }

        query
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(filter.effective_limit());

        let rows = query.build().fetch_all(&self.db).await?;

        rows.into_iter().map(parse_complaint).collect()
    }

    /// Total complaints stored
    pub async fn count(&self) -> FmsResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM complaints")
            .fetch_one(&self.db)
            .await?;

        Ok(count)
    }
}

fn not_found(id: i64) -> FmsError {
    FmsError::NotFound(format!("Complaint {} not found", id))
}

fn parse_complaint(row: sqlx::sqlite::SqliteRow) -> FmsResult<Complaint> {
    let issue_type: IssueType = row.try_get::<String, _>("issue_type")?.parse()?;
    let status: ComplaintStatus = row.try_get::<String, _>("status")?.parse()?;
    let severity = row
        .try_get::<Option<String>, _>("severity")?
        .map(|s| s.parse::<Severity>())
        .transpose()?;

    let created_at: DateTime<Utc> = row.try_get("created_at")?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at")?;

    Ok(Complaint {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        image_path: row.try_get("image_path")?,
        latitude: row.try_get("latitude")?,
        longitude: row.try_get("longitude")?,
        issue_type,
        details: row.try_get("details")?,
        status,
        severity,
        damage_score: row.try_get("damage_score")?,
        created_at,
        updated_at,
    })
}
