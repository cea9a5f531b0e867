//! 서버 상태 모델.

use serde::{Deserialize, Serialize};

/// `GET /health` 응답
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    /// "healthy" 또는 "unhealthy"
    pub status: String,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

/// `GET /settings/` 응답. 서버 측 보안 설정 요약
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSettings {
    pub firewall_enabled: bool,
    pub auto_updates: bool,
    pub version: String,
    pub last_patch: String,
}
