use serde::{Deserialize, Serialize};
use std::time::SystemTime;

use crate::metrics::MetricsSnapshot;
use crate::registry::ClientRegistry;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: u64,
    pub version: String,
    pub uptime_seconds: u64,
    pub throttling: MetricsSnapshot,
}

static START_TIME: std::sync::LazyLock<SystemTime> = std::sync::LazyLock::new(SystemTime::now);

pub struct HealthChecker {
    registry: ClientRegistry,
}

impl HealthChecker {
    pub fn new(registry: ClientRegistry) -> Self {
        // Pin the start time to the first checker rather than the first request
        std::sync::LazyLock::force(&START_TIME);
        Self { registry }
    }

    pub fn check_health(&self) -> HealthStatus {
        let now = SystemTime::now();
        let uptime = now
            .duration_since(*START_TIME)
            .unwrap_or_default()
            .as_secs();

        HealthStatus {
            status: "healthy".to_string(),
            timestamp: now
                .duration_since(SystemTime::UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: uptime,
            throttling: self.registry.metrics_snapshot(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_reports_tracked_clients() {
        let registry: ClientRegistry = ClientRegistry::default();
        registry.get_or_create("1.2.3.4");
        registry.get_or_create("5.6.7.8");

        let status = HealthChecker::new(registry).check_health();
        assert_eq!(status.status, "healthy");
        assert_eq!(status.throttling.tracked_clients, 2);
        assert_eq!(status.throttling.clients_created, 2);
    }

    #[test]
    fn test_health_status_serialization() {
        let status = HealthStatus {
            status: "healthy".to_string(),
            timestamp: 1234567890,
            version: "1.0.0".to_string(),
            uptime_seconds: 3600,
            throttling: MetricsSnapshot::default(),
        };

        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["timestamp"], 1234567890);
        assert_eq!(json["throttling"]["tracked_clients"], 0);
    }
}
