/// Road damage analysis
///
/// Submitted photos are scored by an external model service. The service is
/// best-effort: callers fall back to a default severity when it fails.

mod http;

pub use http::HttpDamageAnalyzer;

use crate::complaint::Severity;
use crate::error::FmsResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Scores a complaint photo
#[async_trait]
pub trait DamageAnalyzer: Send + Sync {
    async fn analyze(
        &self,
        image: Vec<u8>,
        file_name: &str,
        mime_type: &str,
    ) -> FmsResult<DamageAssessment>;
}

/// One detected damage patch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamageRegion {
    /// `[x1, y1, x2, y2]`
    #[serde(default)]
    pub coordinates: Vec<i64>,
    #[serde(default)]
    pub damage_level: i64,
    #[serde(default)]
    pub score: f64,
}

/// Analyzer verdict
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DamageAssessment {
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub damage_detected: bool,
    #[serde(default)]
    pub final_score: f64,
    #[serde(default)]
    pub damage_count: Option<i64>,
    #[serde(default)]
    pub damage_regions: Vec<DamageRegion>,
}

impl DamageAssessment {
    /// Score as stored on the complaint, 0-100
    pub fn damage_score(&self) -> i64 {
        self.final_score.round().clamp(0.0, 100.0) as i64
    }

    /// Number of damage patches, falling back to the regions listed
    pub fn damage_count(&self) -> i64 {
        self.damage_count.unwrap_or(self.damage_regions.len() as i64)
    }

    /// Reported severity, or one derived from the score when absent
    ///
    /// Unrecognised labels degrade to `low`.
    pub fn severity(&self) -> Severity {
        match self.severity.as_deref() {
            Some(label) => label.parse().unwrap_or_else(|_| {
                tracing::warn!(severity = label, "analyzer_returned_unknown_severity");
                Severity::Low
            }),
            None => Severity::from_score(self.damage_score()),
        }
    }
}
