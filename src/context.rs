/// Application context and dependency injection
use crate::{
    account::AccountManager,
    analyzer::{DamageAnalyzer, HttpDamageAnalyzer},
    complaint::ComplaintManager,
    config::ServerConfig,
    db,
    error::{FmsError, FmsResult},
    image_store::ImageStore,
    rate_limit::RateLimiter,
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: SqlitePool,
    pub account_manager: Arc<AccountManager>,
    pub complaint_manager: Arc<ComplaintManager>,
    pub image_store: Arc<ImageStore>,
    pub analyzer: Arc<dyn DamageAnalyzer>,
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> FmsResult<Self> {
        config.validate()?;

        Self::ensure_directories(&config).await?;

        let db = db::create_pool(&config.storage.database, db::DatabaseOptions::default()).await?;
        db::run_migrations(&db).await?;
        db::test_connection(&db).await?;

        let analyzer: Arc<dyn DamageAnalyzer> = Arc::new(HttpDamageAnalyzer::new(&config.analyzer)?);

        Ok(Self::from_parts(config, db, analyzer))
    }

    /// Assemble a context around an existing pool and analyzer
    pub fn from_parts(
        config: ServerConfig,
        db: SqlitePool,
        analyzer: Arc<dyn DamageAnalyzer>,
    ) -> Self {
        let config = Arc::new(config);

        let account_manager = Arc::new(AccountManager::new(db.clone(), Arc::clone(&config)));
        let complaint_manager = Arc::new(ComplaintManager::new(db.clone()));
        let image_store = Arc::new(ImageStore::new(config.storage.upload_directory.clone()));
        let rate_limiter = Arc::new(RateLimiter::new(&config.rate_limit));

        Self {
            config,
            db,
            account_manager,
            complaint_manager,
            image_store,
            analyzer,
            rate_limiter,
        }
    }

    /// Ensure required directories exist
    async fn ensure_directories(config: &ServerConfig) -> FmsResult<()> {
        let mut dirs = vec![
            config.storage.data_directory.clone(),
            config.storage.upload_directory.clone(),
        ];
        if let Some(parent) = config.storage.database.parent() {
            dirs.push(parent.to_path_buf());
        }

        for dir in dirs.iter().filter(|d| !d.as_os_str().is_empty()) {
            if !dir.exists() {
                tokio::fs::create_dir_all(dir).await.map_err(|e| {
                    FmsError::Internal(format!("Failed to create directory {:?}: {}", dir, e))
                })?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::DamageAssessment;
    use async_trait::async_trait;
    use tempfile::TempDir;

    struct NoopAnalyzer;

    #[async_trait]
    impl DamageAnalyzer for NoopAnalyzer {
        async fn analyze(&self, _: Vec<u8>, _: &str, _: &str) -> FmsResult<DamageAssessment> {
            Ok(DamageAssessment::default())
        }
    }

    #[tokio::test]
    async fn test_new_creates_directories_and_database() {
        let temp_dir = TempDir::new().unwrap();
        let data = temp_dir.path().join("data");

        let mut config = ServerConfig::default();
        config.storage.data_directory = data.clone();
        config.storage.database = data.join("db").join("fixmystreet.sqlite");
        config.storage.upload_directory = data.join("public");

        let ctx = AppContext::new(config).await.unwrap();

        assert!(data.join("public").is_dir());
        assert!(data.join("db").join("fixmystreet.sqlite").exists());
        assert_eq!(ctx.complaint_manager.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_from_parts() {
        let db = db::create_memory_pool().await.unwrap();
        let ctx = AppContext::from_parts(ServerConfig::default(), db, Arc::new(NoopAnalyzer));
        assert!(ctx.account_manager.find_by_id(1).await.unwrap().is_none());
    }
}
