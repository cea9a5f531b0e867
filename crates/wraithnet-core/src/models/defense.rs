//! 능동 방어 모델.
//!
//! 로컬에서 관리하는 방어 규칙과 서버의 에이전트 현황.

use serde::{Deserialize, Serialize};

use super::Severity;

/// 규칙 활성 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleStatus {
    Enabled,
    Disabled,
}

/// 규칙이 발동했을 때의 조치
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    Block,
    #[default]
    Alert,
    Quarantine,
}

/// 방어 규칙. 이름이 있고 켜고 끌 수 있는 정책
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefenseRule {
    pub id: String,
    pub name: String,
    /// 규칙 종류 (예: "Firewall", "Malware Scan")
    #[serde(rename = "type")]
    pub rule_type: String,
    pub status: RuleStatus,
    pub last_triggered: String,
    #[serde(default)]
    pub action: RuleAction,
    #[serde(default)]
    pub severity: Severity,
}

impl DefenseRule {
    pub fn is_enabled(&self) -> bool {
        self.status == RuleStatus::Enabled
    }

    /// 활성/비활성 전환
    pub fn toggle(&mut self) {
        self.status = match self.status {
            RuleStatus::Enabled => RuleStatus::Disabled,
            RuleStatus::Disabled => RuleStatus::Enabled,
        };
    }
}

/// `GET /defense/` 응답의 에이전트 항목
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRecord {
    pub id: u64,
    pub name: String,
    pub status: String,
    pub last_seen: String,
}

/// `GET /defense/` 응답
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentOverview {
    pub count: usize,
    pub agents: Vec<AgentRecord>,
}

impl AgentOverview {
    /// 온라인 에이전트 수 (상태 문자열은 대소문자 무시)
    pub fn online_count(&self) -> usize {
        self.agents
            .iter()
            .filter(|a| a.status.eq_ignore_ascii_case("online"))
            .count()
    }
}
