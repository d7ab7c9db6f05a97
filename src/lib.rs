/// FixMyStreet - civic road-issue reporting API
///
/// Citizens photograph potholes and other road damage, the photo is scored
/// by an external damage analyzer, and officials review and resolve the
/// resulting complaints.

pub mod account;
pub mod analyzer;
pub mod api;
pub mod auth;
pub mod complaint;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod image_store;
pub mod metrics;
pub mod rate_limit;
pub mod server;
pub mod validation;
