/// Complaint domain
///
/// Citizen-submitted road issue reports: the enumerations stored with each
/// complaint, the submission form rules, and the persistence manager.

mod manager;
mod models;

pub use manager::{ComplaintFilter, ComplaintManager};
pub use models::{Complaint, NewComplaint};

use crate::error::FmsError;
use crate::image_store::{self, ImageKind};
use crate::validation::{nullable, FieldErrors, Validate};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

/// Kind of road issue being reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    Pothole,
    RoadDamage,
    Drainage,
    Other,
}

impl IssueType {
    pub const ALL: [IssueType; 4] = [
        IssueType::Pothole,
        IssueType::RoadDamage,
        IssueType::Drainage,
        IssueType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IssueType::Pothole => "pothole",
            IssueType::RoadDamage => "road_damage",
            IssueType::Drainage => "drainage",
            IssueType::Other => "other",
        }
    }
}

impl FromStr for IssueType {
    type Err = FmsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pothole" => Ok(IssueType::Pothole),
            "road_damage" => Ok(IssueType::RoadDamage),
            "drainage" => Ok(IssueType::Drainage),
            "other" => Ok(IssueType::Other),
            _ => Err(FmsError::field("issue_type", format!("Invalid issue type: {}", s))),
        }
    }
}

/// Complaint lifecycle status
///
/// Any status may follow any other; no transition rules are enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplaintStatus {
    Reported,
    InProgress,
    Resolved,
}

impl ComplaintStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComplaintStatus::Reported => "reported",
            ComplaintStatus::InProgress => "in_progress",
            ComplaintStatus::Resolved => "resolved",
        }
    }
}

impl FromStr for ComplaintStatus {
    type Err = FmsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "reported" => Ok(ComplaintStatus::Reported),
            "in_progress" => Ok(ComplaintStatus::InProgress),
            "resolved" => Ok(ComplaintStatus::Resolved),
            _ => Err(FmsError::field("status", format!("Invalid status: {}", s))),
        }
    }
}

/// Damage severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }

    /// Bucket a 0-100 damage score: >= 80 high, >= 50 medium, else low
    pub fn from_score(score: i64) -> Self {
        if score >= 80 {
            Severity::High
        } else if score >= 50 {
            Severity::Medium
        } else {
            Severity::Low
        }
    }
}

impl Default for Severity {
    fn default() -> Self {
        Severity::Low
    }
}

impl FromStr for Severity {
    type Err = FmsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            _ => Err(FmsError::field("severity", format!("Invalid severity: {}", s))),
        }
    }
}

/// File part of a multipart submission
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Raw multipart submission, every field still a string
#[derive(Debug, Clone, Default)]
pub struct ComplaintForm {
    pub image: Option<UploadedFile>,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    pub issue_type: Option<String>,
    pub details: Option<String>,
    pub max_image_bytes: usize,
}

/// Validated submission, ready to store
#[derive(Debug, Clone)]
pub struct ComplaintSubmission {
    pub image: Vec<u8>,
    pub image_kind: ImageKind,
    pub image_name: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub issue_type: IssueType,
    pub details: String,
}

impl Validate for ComplaintForm {
    type Output = ComplaintSubmission;

    fn validate(self) -> Result<ComplaintSubmission, FieldErrors> {
        let mut errors = FieldErrors::new();

        let image = match self.image.filter(|file| !file.bytes.is_empty()) {
            None => {
                errors.add("image", "The image field is required.");
                None
            }
            Some(file) => check_image(&mut errors, file, self.max_image_bytes),
        };

        let latitude = coordinate(&mut errors, "latitude", self.latitude.as_deref(), 90.0);
        let longitude = coordinate(&mut errors, "longitude", self.longitude.as_deref(), 180.0);

        let issue_type = errors
            .required("issue_type", self.issue_type.as_deref())
            .filter(|raw| errors.max_chars("issue_type", raw, 50))
            .and_then(|raw| errors.one_of::<IssueType>("issue_type", raw));

        let details = errors
            .required("details", self.details.as_deref())
            .filter(|raw| errors.max_chars("details", raw, 500))
            .map(str::to_string);

        match (image, latitude, longitude, issue_type, details) {
            (Some((file, kind)), Some(latitude), Some(longitude), Some(issue_type), Some(details))
                if errors.is_empty() =>
            {
                Ok(ComplaintSubmission {
                    image: file.bytes,
                    image_kind: kind,
                    image_name: file.file_name,
                    latitude,
                    longitude,
                    issue_type,
                    details,
                })
            }
            _ => Err(errors),
        }
    }
}

/// Body of a status/severity update
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateComplaintRequest {
    pub status: Option<Value>,
    #[serde(default, deserialize_with = "nullable")]
    pub severity: Option<Option<Value>>,
}

/// Validated update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComplaintUpdate {
    pub status: ComplaintStatus,
    /// `None` leaves severity unchanged, `Some(None)` clears it
    pub severity: Option<Option<Severity>>,
}

impl Validate for UpdateComplaintRequest {
    type Output = ComplaintUpdate;

    fn validate(self) -> Result<ComplaintUpdate, FieldErrors> {
        let mut errors = FieldErrors::new();

        let status = errors
            .string("status", &self.status)
            .and_then(|v| errors.required("status", v))
            .and_then(|raw| errors.one_of::<ComplaintStatus>("status", raw));

        // Blank strings count as null
        let severity = match &self.severity {
            None => Some(None),
            Some(raw) => match errors.string("severity", raw) {
                None => None,
                Some(value) => match value.map(str::trim).filter(|s| !s.is_empty()) {
                    None => Some(Some(None)),
                    Some(raw) => errors
                        .one_of::<Severity>("severity", raw)
                        .map(|severity| Some(Some(severity))),
                },
            },
        };

        match (status, severity) {
            (Some(status), Some(severity)) if errors.is_empty() => {
                Ok(ComplaintUpdate { status, severity })
            }
            _ => Err(errors),
        }
    }
}

/// Query string of the all-complaints listing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListComplaintsQuery {
    pub status: Option<String>,
    pub severity: Option<String>,
    pub issue_type: Option<String>,
    pub limit: Option<String>,
}

impl Validate for ListComplaintsQuery {
    type Output = ComplaintFilter;

    fn validate(self) -> Result<ComplaintFilter, FieldErrors> {
        let mut errors = FieldErrors::new();

        fn present(value: &Option<String>) -> Option<&str> {
            value.as_deref().map(str::trim).filter(|v| !v.is_empty())
        }

        let status = present(&self.status)
            .and_then(|raw| errors.one_of::<ComplaintStatus>("status", raw));
        let severity = present(&self.severity)
            .and_then(|raw| errors.one_of::<Severity>("severity", raw));
        let issue_type = present(&self.issue_type)
            .and_then(|raw| errors.one_of::<IssueType>("issue_type", raw));

        let limit = present(&self.limit).and_then(|raw| match raw.parse::<i64>() {
            Ok(limit) => Some(limit),
            Err(_) => {
                errors.add("limit", "The limit field must be an integer.");
                None
            }
        });

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(ComplaintFilter {
            status,
            severity,
            issue_type,
            limit,
        })
    }
}

fn check_image(
    errors: &mut FieldErrors,
    file: UploadedFile,
    max_bytes: usize,
) -> Option<(UploadedFile, ImageKind)> {
    let kind = image_store::detect_image_kind(&file.bytes);
    if kind.is_none() {
        if !image_store::is_image(&file.bytes) {
            errors.add("image", "The image field must be an image.");
        }
        errors.add("image", "The image field must be a file of type: jpeg, png, jpg.");
    }

    if let (Some(kind), Some(declared)) = (kind, file.content_type.as_deref()) {
        if declared != kind.mime_type() {
            tracing::debug!(declared, detected = kind.mime_type(), "upload_content_type_mismatch");
        }
    }

    if file.bytes.len() > max_bytes {
        errors.add(
            "image",
            format!(
                "The image field must not be greater than {} kilobytes.",
                max_bytes / 1024
            ),
        );
        return None;
    }

    kind.map(|kind| (file, kind))
}

fn coordinate(errors: &mut FieldErrors, field: &str, raw: Option<&str>, limit: f64) -> Option<f64> {
    let value = errors.required(field, raw)?;
    let number = errors.numeric(field, value)?;
    errors
        .between(field, number, -limit, limit)
        .then(|| round_to_7(number))
}

/// Match `decimal(10,7)` storage precision
fn round_to_7(value: f64) -> f64 {
    (value * 1e7).round() / 1e7
}
