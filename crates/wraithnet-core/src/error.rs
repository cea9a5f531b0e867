//! WraithNet 핵심 에러 타입.
//!
//! 모든 crate가 `CoreError` 하나를 공유한다. `Display` 문자열은
//! 그대로 화면(또는 CLI)에 표시되는 메시지로 쓰인다.

use thiserror::Error;

/// 코어 레이어 에러.
#[derive(Debug, Error)]
pub enum CoreError {
    /// 401 응답 (AuthenticationError)
    #[error("Unauthorized - please login")]
    Unauthorized,

    /// 401 이외의 비성공 HTTP 상태 (GenericRequestError)
    #[error("Error {status}")]
    Request {
        /// HTTP 상태 코드
        status: u16,
    },

    /// 로그인 실패. 서버가 돌려준 본문을 그대로 담는다.
    #[error("{0}")]
    Auth(String),

    /// 네트워크 에러 (연결 실패, 타임아웃)
    #[error("Network error: {0}")]
    Network(String),

    /// JSON 직렬화/역직렬화 실패
    #[error("Invalid data: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 복원할 설정 파일이 잘못됨 (ImportError)
    #[error("Invalid configuration file: {0}")]
    Import(String),

    /// 필드 유효성 검증 실패
    #[error("Validation failed - {field}: {message}")]
    Validation {
        /// 검증 실패한 필드명
        field: String,
        /// 실패 사유
        message: String,
    },

    /// 설정값 오류
    #[error("Configuration error: {0}")]
    Config(String),

    /// 로컬 저장소 에러
    #[error("Storage error: {0}")]
    Storage(String),

    /// I/O 에러
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// WebSocket 연결/수신 에러
    #[error("WebSocket error: {0}")]
    WebSocket(String),
}

impl CoreError {
    /// 재로그인이 필요한 에러인지
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, CoreError::Unauthorized)
    }

    /// 전송 계층 에러인지 (네트워크 실패 또는 응답 파싱 실패)
    pub fn is_transport(&self) -> bool {
        matches!(self, CoreError::Network(_) | CoreError::Serialization(_))
    }
}
