/// HTTP client for the damage analysis service
use super::{DamageAnalyzer, DamageAssessment};
use crate::{
    config::AnalyzerConfig,
    error::{FmsError, FmsResult},
    metrics,
};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use std::time::{Duration, Instant};

/// Posts the photo as multipart field `image` and reads back JSON
#[derive(Clone)]
pub struct HttpDamageAnalyzer {
    http_client: reqwest::Client,
    url: String,
}

impl HttpDamageAnalyzer {
    pub fn new(config: &AnalyzerConfig) -> FmsResult<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("fixmystreet/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| FmsError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            url: config.url.clone(),
        })
    }

    async fn request(
        &self,
        image: Vec<u8>,
        file_name: &str,
        mime_type: &str,
    ) -> FmsResult<DamageAssessment> {
        let part = Part::bytes(image)
            .file_name(file_name.to_string())
            .mime_str(mime_type)
            .map_err(|e| FmsError::Analyzer(format!("Invalid image mime type: {}", e)))?;
        let form = Form::new().part("image", part);

        let response = self
            .http_client
            .post(&self.url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| FmsError::Analyzer(format!("Analyzer request failed: {}", e)))?
            .error_for_status()
            .map_err(|e| FmsError::Analyzer(format!("Analyzer returned error: {}", e)))?;

        response
            .json::<DamageAssessment>()
            .await
            .map_err(|e| FmsError::Analyzer(format!("Invalid analyzer response: {}", e)))
    }
}

#[async_trait]
impl DamageAnalyzer for HttpDamageAnalyzer {
    async fn analyze(
        &self,
        image: Vec<u8>,
        file_name: &str,
        mime_type: &str,
    ) -> FmsResult<DamageAssessment> {
        let start = Instant::now();
        let result = self.request(image, file_name, mime_type).await;
        let elapsed = start.elapsed();

        metrics::record_analyzer_call(result.is_ok(), elapsed.as_secs_f64());
        match &result {
            Ok(assessment) => tracing::debug!(
                final_score = assessment.final_score,
                damage_detected = assessment.damage_detected,
                elapsed_ms = elapsed.as_millis() as u64,
                "analyzer_succeeded"
            ),
            Err(e) => tracing::warn!(error = %e, "analyzer_failed"),
        }

        result
    }
}
