//! 데이터 소스 포트.
//!
//! 구현: `wraithnet-network` crate (`HttpApiClient`)

use async_trait::async_trait;
use serde_json::Value;

use crate::error::CoreError;

/// HTTP 메서드
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RequestMethod {
    #[default]
    Get,
    Post,
    Put,
    Delete,
}

/// 호출자가 지정하는 요청 옵션
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOptions {
    pub method: RequestMethod,
    /// 추가 헤더. 같은 이름의 기본 헤더(`Content-Type`)를 덮어쓴다
    pub headers: Vec<(String, String)>,
    /// JSON 본문
    pub body: Option<Value>,
}

impl RequestOptions {
    pub fn get() -> Self {
        Self::default()
    }

    pub fn with_method(mut self, method: RequestMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// 엔드포인트에서 JSON을 가져오는 데이터 소스
#[async_trait]
pub trait DataSource: Send + Sync {
    /// `endpoint`(베이스 URL 기준 경로)에 요청을 보내고 JSON 본문을 반환
    ///
    /// 401은 [`CoreError::Unauthorized`], 그 밖의 비성공 상태는
    /// [`CoreError::Request`], 전송/파싱 실패는 `Network`/`Serialization`.
    async fn request(&self, endpoint: &str, options: &RequestOptions) -> Result<Value, CoreError>;
}
