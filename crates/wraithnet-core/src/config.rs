//! 설정 구조체.
//!
//! - [`SettingsConfig`]: 대시보드 사용자 환경설정 (표시, 알림, 방어 임계값, 연동).
//!   `systemSettings` 키에 camelCase JSON으로 저장된다.
//! - [`SettingsPatch`]: 부분 업데이트용. 지정한 필드만 병합한다.
//! - [`ClientConfig`]: 런타임 연결 설정. 환경변수에서 로드.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::CoreError;
use crate::models::Severity;

/// API 베이스 URL 환경변수
pub const API_URL_ENV: &str = "WRAITHNET_API_URL";

/// 환경변수가 없을 때 사용하는 루프백 주소
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";

/// 텔레메트리 WebSocket 경로
pub const TELEMETRY_WS_PATH: &str = "/telemetry/ws";

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================
// 표시 설정
// ============================================================

/// UI 테마
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
    Auto,
}

// ============================================================
// 방어 설정
// ============================================================

/// 로그 보존 기간. 7/14/30일만 허용하며 숫자로 직렬화된다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum LogRetention {
    Week,
    #[default]
    TwoWeeks,
    Month,
}

impl LogRetention {
    /// 보존 일수
    pub fn days(self) -> u32 {
        match self {
            LogRetention::Week => 7,
            LogRetention::TwoWeeks => 14,
            LogRetention::Month => 30,
        }
    }
}

impl TryFrom<u32> for LogRetention {
    type Error = String;

    fn try_from(days: u32) -> Result<Self, Self::Error> {
        match days {
            7 => Ok(LogRetention::Week),
            14 => Ok(LogRetention::TwoWeeks),
            30 => Ok(LogRetention::Month),
            other => Err(format!(
                "log retention must be 7, 14 or 30 days, got {other}"
            )),
        }
    }
}

impl From<LogRetention> for u32 {
    fn from(value: LogRetention) -> Self {
        value.days()
    }
}

// ============================================================
// 통합 설정
// ============================================================

/// 대시보드 환경설정
///
/// 모든 필드가 필수다. 누락 필드가 있으면 역직렬화가 실패하므로
/// 백업 복원 시 형태 검증을 겸한다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsConfig {
    // --- 표시 ---
    /// UI 테마
    pub theme: Theme,
    /// 자동 새로고침 간격 (초, 1 이상)
    pub refresh_interval: u32,
    pub animations_enabled: bool,
    pub compact_mode: bool,
    /// 시작 시 표시할 대시보드 식별자
    pub default_dashboard: String,

    // --- 알림 ---
    pub email_alerts: bool,
    pub push_notifications: bool,
    pub sms_alerts: bool,
    /// 이 심각도 이상만 알림
    pub severity_threshold: Severity,
    pub daily_summary: bool,

    // --- 방어 임계값 ---
    /// CPU 경보 임계값 (%)
    pub cpu_threshold: f64,
    /// 메모리 경보 임계값 (%)
    pub memory_threshold: f64,
    pub auto_mitigation: bool,
    pub log_retention: LogRetention,
    pub auto_restart_agents: bool,

    // --- 연동 ---
    pub api_endpoint: String,
    pub ws_url: String,
    /// 연동용 인증 토큰 (비밀값)
    pub auth_token: String,
    pub siem_enabled: bool,
    pub cloud_backup: bool,
    pub threat_feed: bool,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            theme: Theme::Dark,
            refresh_interval: 10,
            animations_enabled: true,
            compact_mode: false,
            default_dashboard: "Overview".to_string(),
            email_alerts: true,
            push_notifications: false,
            sms_alerts: false,
            severity_threshold: Severity::Medium,
            daily_summary: true,
            cpu_threshold: 80.0,
            memory_threshold: 80.0,
            auto_mitigation: false,
            log_retention: LogRetention::TwoWeeks,
            auto_restart_agents: true,
            api_endpoint: "https://api.wraithnet.local".to_string(),
            ws_url: "wss://ws.wraithnet.local".to_string(),
            auth_token: String::new(),
            siem_enabled: false,
            cloud_backup: false,
            threat_feed: false,
        }
    }
}

impl SettingsConfig {
    /// 값 범위 검증. 역직렬화로 걸러지지 않는 제약만 확인한다.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.refresh_interval == 0 {
            return Err(CoreError::Validation {
                field: "refreshInterval".to_string(),
                message: "must be a positive number of seconds".to_string(),
            });
        }
        for (field, value) in [
            ("cpuThreshold", self.cpu_threshold),
            ("memoryThreshold", self.memory_threshold),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(CoreError::Validation {
                    field: field.to_string(),
                    message: format!("must be a percentage between 0 and 100, got {value}"),
                });
            }
        }
        Ok(())
    }

    /// 새로고침 간격
    pub fn refresh_period(&self) -> Duration {
        Duration::from_secs(u64::from(self.refresh_interval))
    }

    /// 해당 심각도가 알림 임계값 이상인지
    pub fn should_notify(&self, severity: Severity) -> bool {
        severity >= self.severity_threshold
    }

    /// CPU 사용률이 임계값을 넘었는지
    pub fn cpu_exceeded(&self, usage_percent: f64) -> bool {
        usage_percent > self.cpu_threshold
    }

    /// 메모리 사용률이 임계값을 넘었는지
    pub fn memory_exceeded(&self, usage_percent: f64) -> bool {
        usage_percent > self.memory_threshold
    }
}

/// 부분 업데이트. `None` 필드는 기존 값을 유지한다.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct SettingsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<Theme>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_interval: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub animations_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compact_mode: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_dashboard: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_alerts: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub push_notifications: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sms_alerts: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity_threshold: Option<Severity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_summary: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_mitigation: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_retention: Option<LogRetention>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_restart_agents: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ws_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub siem_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloud_backup: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threat_feed: Option<bool>,
}

impl SettingsPatch {
    /// 지정된 필드만 `target`에 덮어쓴다
    pub fn apply_to(&self, target: &mut SettingsConfig) {
        macro_rules! merge {
            ($($field:ident),* $(,)?) => {
                $(
                    if let Some(value) = &self.$field {
                        target.$field = value.clone();
                    }
                )*
            };
        }

        merge!(
            theme,
            refresh_interval,
            animations_enabled,
            compact_mode,
            default_dashboard,
            email_alerts,
            push_notifications,
            sms_alerts,
            severity_threshold,
            daily_summary,
            cpu_threshold,
            memory_threshold,
            auto_mitigation,
            log_retention,
            auto_restart_agents,
            api_endpoint,
            ws_url,
            auth_token,
            siem_enabled,
            cloud_backup,
            threat_feed,
        );
    }

    /// 변경할 필드가 하나도 없는지
    pub fn is_empty(&self) -> bool {
        *self == SettingsPatch::default()
    }
}

impl From<SettingsConfig> for SettingsPatch {
    /// 전체 설정을 모든 필드가 채워진 패치로 변환
    fn from(config: SettingsConfig) -> Self {
        Self {
            theme: Some(config.theme),
            refresh_interval: Some(config.refresh_interval),
            animations_enabled: Some(config.animations_enabled),
            compact_mode: Some(config.compact_mode),
            default_dashboard: Some(config.default_dashboard),
            email_alerts: Some(config.email_alerts),
            push_notifications: Some(config.push_notifications),
            sms_alerts: Some(config.sms_alerts),
            severity_threshold: Some(config.severity_threshold),
            daily_summary: Some(config.daily_summary),
            cpu_threshold: Some(config.cpu_threshold),
            memory_threshold: Some(config.memory_threshold),
            auto_mitigation: Some(config.auto_mitigation),
            log_retention: Some(config.log_retention),
            auto_restart_agents: Some(config.auto_restart_agents),
            api_endpoint: Some(config.api_endpoint),
            ws_url: Some(config.ws_url),
            auth_token: Some(config.auth_token),
            siem_enabled: Some(config.siem_enabled),
            cloud_backup: Some(config.cloud_backup),
            threat_feed: Some(config.threat_feed),
        }
    }
}

// ============================================================
// 연결 설정
// ============================================================

/// 런타임 연결 설정
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// REST API 베이스 URL (끝의 `/` 제거됨)
    pub api_base_url: String,
    /// 텔레메트리 WebSocket URL
    pub telemetry_ws_url: String,
    /// HTTP 요청 타임아웃
    pub request_timeout: Duration,
    /// 로컬 저장소 디렉토리. `None`이면 플랫폼 기본 경로
    pub data_dir: Option<PathBuf>,
}

impl ClientConfig {
    /// 주어진 베이스 URL로 설정 생성
    pub fn new(api_base_url: &str) -> Self {
        let api_base_url = api_base_url.trim_end_matches('/').to_string();
        Self {
            telemetry_ws_url: telemetry_ws_url(&api_base_url),
            api_base_url,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            data_dir: None,
        }
    }

    /// `WRAITHNET_API_URL`에서 로드. 없거나 비어 있으면 루프백 주소
    pub fn from_env() -> Self {
        let base = std::env::var(API_URL_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        Self::new(&base)
    }

    /// 저장소 디렉토리 지정
    pub fn with_data_dir(mut self, dir: PathBuf) -> Self {
        self.data_dir = Some(dir);
        self
    }

    /// 저장소 디렉토리 결정
    pub fn storage_dir(&self) -> Result<PathBuf, CoreError> {
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }
        directories::ProjectDirs::from("net", "WraithNet", "wraithnet")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .ok_or_else(|| CoreError::Config("홈 디렉토리를 찾을 수 없습니다".to_string()))
    }
}

/// HTTP 베이스 URL에서 텔레메트리 WebSocket URL 유도
pub fn telemetry_ws_url(api_base_url: &str) -> String {
    let base = api_base_url.trim_end_matches('/');
    let ws_base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        base.to_string()
    };
    format!("{ws_base}{TELEMETRY_WS_PATH}")
}
