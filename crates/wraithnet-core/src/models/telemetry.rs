//! 텔레메트리 모델.
//!
//! `/telemetry/ws`로 수신하는 시스템 지표 스냅샷. 메시지 하나가
//! 화면의 텔레메트리 뷰 모델 전체를 대체한다.

use serde::{Deserialize, Serialize};

/// 시계열의 한 점
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryPoint {
    /// 표시용 시각 (예: "12:34")
    pub time: String,
    /// 사용률
    pub usage: f64,
}

/// 최근 알림 항목
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEntry {
    pub time: String,
    #[serde(rename = "type")]
    pub alert_type: String,
    pub severity: String,
    pub description: String,
}

/// 에이전트 상태 항목
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentEntry {
    pub name: String,
    pub cpu: f64,
    pub memory: f64,
    pub status: String,
    pub last_heartbeat: String,
}

/// 텔레메트리 스냅샷
///
/// 서버는 일부 필드(`cpu`, `memory`)만 보내기도 하므로 모든 필드에 기본값이 있다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TelemetrySnapshot {
    pub cpu: Vec<TelemetryPoint>,
    pub memory: Vec<TelemetryPoint>,
    pub disk: Vec<TelemetryPoint>,
    /// 네트워크 사용량 (Mbps)
    pub network: Vec<TelemetryPoint>,
    pub uptime: String,
    pub active_agents: u32,
    pub alerts: u32,
    pub alert_list: Vec<AlertEntry>,
    pub agent_list: Vec<AgentEntry>,
}

impl Default for TelemetrySnapshot {
    fn default() -> Self {
        Self {
            cpu: Vec::new(),
            memory: Vec::new(),
            disk: Vec::new(),
            network: Vec::new(),
            uptime: "0d 0h 0m".to_string(),
            active_agents: 0,
            alerts: 0,
            alert_list: Vec::new(),
            agent_list: Vec::new(),
        }
    }
}

fn latest(series: &[TelemetryPoint]) -> f64 {
    series.last().map_or(0.0, |p| p.usage)
}

impl TelemetrySnapshot {
    pub fn latest_cpu(&self) -> f64 {
        latest(&self.cpu)
    }

    pub fn latest_memory(&self) -> f64 {
        latest(&self.memory)
    }

    pub fn latest_disk(&self) -> f64 {
        latest(&self.disk)
    }

    pub fn latest_network(&self) -> f64 {
        latest(&self.network)
    }
}
