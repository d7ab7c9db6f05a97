/// Complaint submission and citizen-facing listing
use crate::{
    analyzer::DamageRegion,
    auth::AuthContext,
    complaint::{Complaint, ComplaintForm, NewComplaint, Severity, UploadedFile},
    config::ServerConfig,
    context::AppContext,
    error::{FmsError, FmsResult},
    image_store,
    metrics,
    validation::Validate,
};
use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        DefaultBodyLimit, Multipart, Path, State,
    },
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

const MULTIPART_OVERHEAD: usize = 1024 * 1024;

const SUBMITTED: &str = "Complaint submitted successfully";
const SUBMITTED_WITHOUT_ANALYSIS: &str = "Complaint submitted successfully (AI service unavailable)";

/// Build complaint routes
pub fn routes(config: &ServerConfig) -> Router<AppContext> {
    // Room for the photo plus the text fields and multipart framing
    let body_limit = config.uploads.max_image_bytes.saturating_add(MULTIPART_OVERHEAD);

    let submit = Router::new()
        .route("/api/complaints", post(submit_complaint))
        .route("/api/report", post(submit_complaint))
        .layer(DefaultBodyLimit::max(body_limit));

    Router::new()
        .merge(submit)
        .route("/api/my-complaints", get(my_complaints))
        .route("/api/my-reports", get(my_complaints))
        .route("/api/complaints/:id", get(show_complaint))
}

/// Response for a submitted complaint
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub message: &'static str,
    pub complaint: Complaint,
    pub severity: Severity,
    pub damage_score: i64,
    pub damage_detected: bool,
    pub damage_count: i64,
    pub damage_regions: Vec<DamageRegion>,
    pub image_url: String,
}

/// Wrapper for a single complaint
#[derive(Debug, Serialize)]
pub struct ComplaintResponse {
    pub complaint: Complaint,
}

/// Wrapper for complaint lists
#[derive(Debug, Serialize)]
pub struct ComplaintList {
    pub complaints: Vec<Complaint>,
}

/// Accept a photo report, store it, then score it
async fn submit_complaint(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    multipart: Result<Multipart, MultipartRejection>,
) -> FmsResult<(StatusCode, Json<SubmitResponse>)> {
    let form = match multipart {
        Ok(multipart) => read_form(multipart, ctx.config.uploads.max_image_bytes).await?,
        Err(rejection) => {
            // Not multipart at all: report the missing fields
            tracing::debug!(error = %rejection, "complaint_body_not_multipart");
            ComplaintForm {
                max_image_bytes: ctx.config.uploads.max_image_bytes,
                ..Default::default()
            }
        }
    };

    let submission = form.validate().map_err(FmsError::Validation)?;

    let stored = ctx
        .image_store
        .save(&submission.image, submission.image_kind)
        .await?;

    let created = ctx
        .complaint_manager
        .create(NewComplaint {
            user_id: auth.user.id,
            image_path: stored.path.clone(),
            latitude: submission.latitude,
            longitude: submission.longitude,
            issue_type: submission.issue_type,
            details: submission.details,
        })
        .await;

    let complaint = match created {
        Ok(complaint) => complaint,
        Err(e) => {
            // Don't leave an orphaned photo behind
            if let Err(cleanup) = ctx.image_store.delete(&stored.path).await {
                tracing::warn!(error = %cleanup, path = %stored.path, "orphaned_image_cleanup_failed");
            }
            return Err(e);
        }
    };

    tracing::info!(
        complaint_id = complaint.id,
        user_id = auth.user.id,
        issue_type = complaint.issue_type.as_str(),
        upload_name = submission.image_name.as_deref().unwrap_or("-"),
        "complaint_created"
    );

    let file_name = stored
        .path
        .rsplit('/')
        .next()
        .unwrap_or(stored.path.as_str())
        .to_string();

    let analysis = ctx
        .analyzer
        .analyze(submission.image, &file_name, stored.kind.mime_type())
        .await;

    let image_url = image_store::public_url(&ctx.config.service.public_url, &complaint.image_path);

    let response = match analysis {
        Ok(assessment) => {
            let severity = assessment.severity();
            let damage_score = assessment.damage_score();
            let recorded = ctx
                .complaint_manager
                .record_assessment(complaint.id, severity, damage_score)
                .await;

            match recorded {
                Ok(complaint) => {
                    tracing::info!(
                        complaint_id = complaint.id,
                        severity = severity.as_str(),
                        damage_score,
                        "complaint_scored"
                    );
                    SubmitResponse {
                        message: SUBMITTED,
                        complaint,
                        severity,
                        damage_score,
                        damage_detected: assessment.damage_detected,
                        damage_count: assessment.damage_count(),
                        damage_regions: assessment.damage_regions,
                        image_url,
                    }
                }
                Err(e) => {
                    // The complaint itself is stored; only the score is lost
                    tracing::error!(
                        complaint_id = complaint.id,
                        error = %e,
                        "damage_assessment_not_saved: keeping default severity"
                    );
                    unscored(complaint, image_url)
                }
            }
        }
        Err(e) => {
            tracing::error!(
                complaint_id = complaint.id,
                error = %e,
                "damage_analysis_failed: keeping default severity"
            );
            unscored(complaint, image_url)
        }
    };

    metrics::record_complaint_submitted(
        response.complaint.issue_type.as_str(),
        response.severity.as_str(),
    );

    Ok((StatusCode::CREATED, Json(response)))
}

fn unscored(complaint: Complaint, image_url: String) -> SubmitResponse {
    SubmitResponse {
        message: SUBMITTED_WITHOUT_ANALYSIS,
        severity: complaint.severity.unwrap_or_default(),
        complaint,
        damage_score: 0,
        damage_detected: false,
        damage_count: 0,
        damage_regions: Vec::new(),
        image_url,
    }
}

/// Collect the multipart fields into an unvalidated form
async fn read_form(mut multipart: Multipart, max_image_bytes: usize) -> FmsResult<ComplaintForm> {
    let mut form = ComplaintForm {
        max_image_bytes,
        ..Default::default()
    };

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" => {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(multipart_error)?;
                form.image = Some(UploadedFile {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            "latitude" => form.latitude = Some(field.text().await.map_err(multipart_error)?),
            "longitude" => form.longitude = Some(field.text().await.map_err(multipart_error)?),
            "issue_type" => form.issue_type = Some(field.text().await.map_err(multipart_error)?),
            "details" => form.details = Some(field.text().await.map_err(multipart_error)?),
            _ => {}
        }
    }

    Ok(form)
}

fn multipart_error(e: MultipartError) -> FmsError {
    match e.status() {
        StatusCode::PAYLOAD_TOO_LARGE => FmsError::PayloadTooLarge(e.body_text()),
        _ => FmsError::BadRequest(e.body_text()),
    }
}

/// The caller's complaints, newest first
async fn my_complaints(
    State(ctx): State<AppContext>,
    auth: AuthContext,
) -> FmsResult<Json<ComplaintList>> {
    let complaints = ctx.complaint_manager.list_for_user(auth.user.id).await?;

    Ok(Json(ComplaintList { complaints }))
}

/// One complaint, visible to its owner and to admins
async fn show_complaint(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(id): Path<i64>,
) -> FmsResult<Json<ComplaintResponse>> {
    let complaint = ctx
        .complaint_manager
        .get(id)
        .await?
        .ok_or_else(|| FmsError::NotFound(format!("Complaint {} not found", id)))?;

    if complaint.user_id != auth.user.id && !auth.is_admin() {
        return Err(FmsError::Authorization(format!(
            "User {} may not view complaint {}",
            auth.user.id, id
        )));
    }

    Ok(Json(ComplaintResponse { complaint }))
}
