use mongodb::Client;
use std::time::Instant;

/// Health check status for MongoDB
#[derive(Debug, Clone)]
pub struct HealthStatus {
    pub healthy: bool,
    /// Error text when the check failed
    pub message: Option<String>,
    pub response_time_ms: u64,
}

/// Ping MongoDB by listing databases, timing the round trip.
///
/// # Example
/// ```ignore
/// let status = check_health(&client).await;
/// if !status.healthy {
///     tracing::warn!("MongoDB unhealthy: {:?}", status.message);
/// }
/// ```
pub async fn check_health(client: &Client) -> HealthStatus {
    let start = Instant::now();
    let result = client.list_database_names().await;
    let response_time_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

    match result {
        Ok(_) => HealthStatus {
            healthy: true,
            message: None,
            response_time_ms,
        },
        Err(e) => HealthStatus {
            healthy: false,
            message: Some(e.to_string()),
            response_time_ms,
        },
    }
}
