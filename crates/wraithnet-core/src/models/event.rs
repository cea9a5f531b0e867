//! 보안 이벤트 모델 (`/events`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 서버에 기록된 보안 이벤트
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityEvent {
    pub id: u64,
    pub timestamp: DateTime<Utc>,
    /// 이벤트를 보고한 출처 (에이전트, 센서 등)
    pub source: String,
    pub category: String,
    pub severity: String,
    pub message: String,
}

/// 이벤트 생성 요청
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSecurityEvent {
    pub source: String,
    pub category: String,
    pub severity: String,
    pub message: String,
}
