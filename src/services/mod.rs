/// Axum health endpoints
pub mod health;
/// Invoice creation and payment confirmation paths
pub mod payment;
/// Background lesson reminder job
pub mod reminder;
/// Read-only reporting rollups
pub mod stats;
