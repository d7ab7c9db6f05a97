/// Report review endpoints: list every complaint and update its status
use crate::{
    api::complaints::ComplaintList,
    auth::ReviewerContext,
    complaint::{Complaint, ListComplaintsQuery, UpdateComplaintRequest},
    context::AppContext,
    error::{FmsError, FmsResult},
    metrics,
    validation::{Validate, ValidJson},
};
use axum::{
    extract::{Path, Query, State},
    routing::{get, put},
    Json, Router,
};
use serde::Serialize;

/// Build report review routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/reports", get(list_reports))
        .route("/api/report/:id", put(update_report))
}

#[derive(Debug, Serialize)]
pub struct UpdateResponse {
    pub message: &'static str,
    pub complaint: Complaint,
}

/// All complaints, newest first, with optional filters
async fn list_reports(
    State(ctx): State<AppContext>,
    _reviewer: ReviewerContext,
    Query(query): Query<ListComplaintsQuery>,
) -> FmsResult<Json<ComplaintList>> {
    let filter = query.validate().map_err(FmsError::Validation)?;

    let complaints = ctx.complaint_manager.list(&filter).await?;

    Ok(Json(ComplaintList { complaints }))
}

/// Set status, and optionally severity, on any complaint
async fn update_report(
    State(ctx): State<AppContext>,
    reviewer: ReviewerContext,
    Path(id): Path<i64>,
    body: Result<ValidJson<UpdateComplaintRequest>, FmsError>,
) -> FmsResult<Json<UpdateResponse>> {
    // Unknown ids are reported before body errors
    if ctx.complaint_manager.get(id).await?.is_none() {
        return Err(FmsError::NotFound(format!("Complaint {} not found", id)));
    }
    let ValidJson(update) = body?;

    let complaint = ctx
        .complaint_manager
        .update(id, update.status, update.severity)
        .await?;

    tracing::info!(
        complaint_id = id,
        reviewer_id = reviewer.user.id,
        status = update.status.as_str(),
        "complaint_status_updated"
    );
    metrics::record_status_update(update.status.as_str());

    Ok(Json(UpdateResponse {
        message: "Complaint updated successfully",
        complaint,
    }))
}
