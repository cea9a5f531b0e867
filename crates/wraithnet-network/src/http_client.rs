//! HTTP REST API 클라이언트.
//!
//! `DataSource` 포트 구현. 베어러 토큰 헤더 자동 주입 + 상태 코드별 에러 매핑.
//! 재시도는 하지 않는다.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use wraithnet_core::error::CoreError;
use wraithnet_core::models::defense::AgentOverview;
use wraithnet_core::models::event::{NewSecurityEvent, SecurityEvent};
use wraithnet_core::models::policy::{NewSecurityPolicy, SecurityPolicy};
use wraithnet_core::models::system::{HealthStatus, ServerSettings};
use wraithnet_core::ports::data_source::{DataSource, RequestMethod, RequestOptions};

use crate::auth::TokenManager;

const POLICIES_PATH: &str = "/api/security/policies/";

/// REST API 클라이언트: `DataSource` 포트 구현
pub struct HttpApiClient {
    client: reqwest::Client,
    base_url: String,
    token_manager: Arc<TokenManager>,
}

impl HttpApiClient {
    /// 새 HTTP API 클라이언트 생성
    pub fn new(
        base_url: &str,
        token_manager: Arc<TokenManager>,
        timeout: Duration,
    ) -> Result<Self, CoreError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CoreError::Network(format!("HTTP 클라이언트 빌드 실패: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token_manager,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// 요청 헤더 구성
    ///
    /// `Content-Type: application/json` 기본값 → 호출자 헤더(덮어쓰기) →
    /// 저장된 토큰이 있으면 `Authorization: Bearer` 순서로 적용한다.
    fn build_headers(&self, options: &RequestOptions) -> Result<HeaderMap, CoreError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        for (name, value) in &options.headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                CoreError::Validation {
                    field: "headers".to_string(),
                    message: format!("잘못된 헤더 이름 {name:?}: {e}"),
                }
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| CoreError::Validation {
                field: "headers".to_string(),
                message: format!("잘못된 헤더 값 ({name}): {e}"),
            })?;
            headers.insert(name, value);
        }

        if let Some(token) = self.token_manager.access_token() {
            let value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|e| {
                CoreError::Validation {
                    field: "access_token".to_string(),
                    message: e.to_string(),
                }
            })?;
            headers.insert(AUTHORIZATION, value);
        }

        Ok(headers)
    }

    fn url_for(&self, endpoint: &str) -> String {
        if endpoint.starts_with('/') {
            format!("{}{}", self.base_url, endpoint)
        } else {
            format!("{}/{}", self.base_url, endpoint)
        }
    }

    /// 응답 상태 코드 확인 및 에러 매핑
    async fn check_response(
        &self,
        resp: reqwest::Response,
    ) -> Result<reqwest::Response, CoreError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let status_code = status.as_u16();
        let text = resp.text().await.unwrap_or_else(|e| {
            warn!("응답 본문 읽기 실패: {e}");
            String::new()
        });
        debug!("API 에러 ({status}): {text}");

        match status_code {
            401 => Err(CoreError::Unauthorized),
            _ => Err(CoreError::Request {
                status: status_code,
            }),
        }
    }

    /// 요청을 보내고 JSON 본문을 `T`로 파싱
    pub async fn request_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: &RequestOptions,
    ) -> Result<T, CoreError> {
        let method = match options.method {
            RequestMethod::Get => reqwest::Method::GET,
            RequestMethod::Post => reqwest::Method::POST,
            RequestMethod::Put => reqwest::Method::PUT,
            RequestMethod::Delete => reqwest::Method::DELETE,
        };
        let url = self.url_for(endpoint);
        debug!("{method} {url}");

        let mut req = self
            .client
            .request(method, &url)
            .headers(self.build_headers(options)?);
        if let Some(body) = &options.body {
            req = req.body(serde_json::to_vec(body)?);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| CoreError::Network(format!("요청 실패 ({endpoint}): {e}")))?;
        let resp = self.check_response(resp).await?;

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| CoreError::Network(format!("응답 수신 실패 ({endpoint}): {e}")))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    // --------------------------------------------------------
    // 타입이 있는 엔드포인트
    // --------------------------------------------------------

    /// `GET /health`
    pub async fn health(&self) -> Result<HealthStatus, CoreError> {
        self.request_json("/health", &RequestOptions::get()).await
    }

    /// `GET /defense/`: 에이전트 현황
    pub async fn agent_overview(&self) -> Result<AgentOverview, CoreError> {
        self.request_json("/defense/", &RequestOptions::get()).await
    }

    /// `GET /settings/`: 서버 보안 설정 요약
    pub async fn server_settings(&self) -> Result<ServerSettings, CoreError> {
        self.request_json("/settings/", &RequestOptions::get()).await
    }

    /// 보안 정책 목록
    pub async fn list_policies(&self) -> Result<Vec<SecurityPolicy>, CoreError> {
        self.request_json(POLICIES_PATH, &RequestOptions::get()).await
    }

    /// 보안 정책 생성
    pub async fn create_policy(
        &self,
        policy: &NewSecurityPolicy,
    ) -> Result<SecurityPolicy, CoreError> {
        let options = RequestOptions::get()
            .with_method(RequestMethod::Post)
            .with_body(serde_json::to_value(policy)?);
        let created: SecurityPolicy = self.request_json(POLICIES_PATH, &options).await?;
        debug!("정책 생성: id={}", created.id);
        Ok(created)
    }

    /// 보안 정책 활성/비활성 전환
    pub async fn toggle_policy(&self, policy_id: u64) -> Result<SecurityPolicy, CoreError> {
        let path = format!("{POLICIES_PATH}{policy_id}/toggle");
        let options = RequestOptions::get().with_method(RequestMethod::Put);
        self.request_json(&path, &options).await
    }

    /// 보안 이벤트 목록 (페이지네이션)
    pub async fn list_events(
        &self,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<SecurityEvent>, CoreError> {
        let path = format!("/events/?skip={skip}&limit={limit}");
        self.request_json(&path, &RequestOptions::get()).await
    }

    /// 보안 이벤트 기록
    pub async fn create_event(&self, event: &NewSecurityEvent) -> Result<SecurityEvent, CoreError> {
        let options = RequestOptions::get()
            .with_method(RequestMethod::Post)
            .with_body(serde_json::to_value(event)?);
        self.request_json("/events/", &options).await
    }
}

#[async_trait]
impl DataSource for HttpApiClient {
    async fn request(
        &self,
        endpoint: &str,
        options: &RequestOptions,
    ) -> Result<Value, CoreError> {
        self.request_json(endpoint, options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use wraithnet_core::local_storage::MemoryKeyValueStore;
    use wraithnet_core::ports::key_value::{KeyValueStore, ACCESS_TOKEN_KEY};

    fn client_with_token(base_url: &str, token: Option<&str>) -> HttpApiClient {
        let storage = Arc::new(MemoryKeyValueStore::new());
        if let Some(token) = token {
            storage.set(ACCESS_TOKEN_KEY, token).unwrap();
        }
        let tm = Arc::new(TokenManager::new(base_url, storage));
        HttpApiClient::new(base_url, tm, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn http_client_creation() {
        let client = client_with_token("http://localhost:8000/", None);
        assert_eq!(client.base_url(), "http://localhost:8000");
        assert_eq!(client.url_for("/health"), "http://localhost:8000/health");
        assert_eq!(client.url_for("health"), "http://localhost:8000/health");
    }

    #[test]
    fn header_merge_order() {
        let client = client_with_token("http://localhost:8000", Some("jwt_abc"));
        let options = RequestOptions::get()
            .with_header("Content-Type", "text/plain")
            .with_header("X-Trace", "1")
            .with_header("Authorization", "Basic ignored");
        let headers = client.build_headers(&options).unwrap();

        assert_eq!(headers[CONTENT_TYPE], "text/plain");
        assert_eq!(headers["x-trace"], "1");
        // 저장된 토큰이 호출자 헤더보다 우선
        assert_eq!(headers[AUTHORIZATION], "Bearer jwt_abc");
    }

    #[test]
    fn no_token_no_authorization() {
        let client = client_with_token("http://localhost:8000", None);
        let headers = client.build_headers(&RequestOptions::get()).unwrap();
        assert_eq!(headers[CONTENT_TYPE], "application/json");
        assert!(headers.get(AUTHORIZATION).is_none());
    }

    #[test]
    fn invalid_header_rejected() {
        let client = client_with_token("http://localhost:8000", None);
        let options = RequestOptions::get().with_header("bad header", "x");
        assert!(matches!(
            client.build_headers(&options),
            Err(CoreError::Validation { .. })
        ));
    }

    #[tokio::test]
    async fn get_with_bearer_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/telemetry/summary")
            .match_header("authorization", "Bearer jwt_abc")
            .match_header("content-type", "application/json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"value":1}"#)
            .create_async()
            .await;

        let client = client_with_token(&server.url(), Some("jwt_abc"));
        let value = client
            .request("/telemetry/summary", &RequestOptions::get())
            .await
            .unwrap();
        assert_eq!(value, serde_json::json!({"value": 1}));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn get_without_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/health")
            .match_header("authorization", Matcher::Missing)
            .with_status(200)
            .with_body(r#"{"status":"healthy","database":"connected"}"#)
            .create_async()
            .await;

        let client = client_with_token(&server.url(), None);
        let health = client.health().await.unwrap();
        assert!(health.is_healthy());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn status_401_is_unauthorized() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/defense/")
            .with_status(401)
            .with_body(r#"{"detail":"Not authenticated"}"#)
            .create_async()
            .await;

        let client = client_with_token(&server.url(), Some("expired"));
        let err = client.agent_overview().await.unwrap_err();
        assert!(err.is_unauthorized());
        assert_eq!(err.to_string(), "Unauthorized - please login");
    }

    #[tokio::test]
    async fn other_status_carries_code() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/settings/")
            .with_status(503)
            .with_body("Service Unavailable")
            .create_async()
            .await;

        let client = client_with_token(&server.url(), None);
        let err = client.server_settings().await.unwrap_err();
        assert!(matches!(err, CoreError::Request { status: 503 }));
        assert_eq!(err.to_string(), "Error 503");
    }

    #[tokio::test]
    async fn malformed_body_is_transport_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/health")
            .with_status(200)
            .with_body("<html>oops</html>")
            .create_async()
            .await;

        let client = client_with_token(&server.url(), None);
        let err = client.health().await.unwrap_err();
        assert!(matches!(err, CoreError::Serialization(_)));
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn connection_refused_is_network_error() {
        let client = client_with_token("http://127.0.0.1:9", None);
        let err = client.health().await.unwrap_err();
        assert!(matches!(err, CoreError::Network(_)));
    }

    #[tokio::test]
    async fn policy_endpoints() {
        let mut server = mockito::Server::new_async().await;
        let list = server
            .mock("GET", "/api/security/policies/")
            .with_status(200)
            .with_body(r#"[{"id":1,"name":"Block Port Scans","description":"Detect and block network port scans","enabled":true}]"#)
            .create_async()
            .await;
        let create = server
            .mock("POST", "/api/security/policies/")
            .match_body(Matcher::Json(serde_json::json!({
                "name": "Deny brute force",
                "enabled": true
            })))
            .with_status(200)
            .with_body(r#"{"id":2,"name":"Deny brute force","description":null,"enabled":true}"#)
            .create_async()
            .await;
        let toggle = server
            .mock("PUT", "/api/security/policies/2/toggle")
            .with_status(200)
            .with_body(r#"{"id":2,"name":"Deny brute force","description":null,"enabled":false}"#)
            .create_async()
            .await;

        let client = client_with_token(&server.url(), Some("jwt"));
        let policies = client.list_policies().await.unwrap();
        assert_eq!(policies.len(), 1);
        assert_eq!(policies[0].name, "Block Port Scans");

        let created = client
            .create_policy(&NewSecurityPolicy::new("Deny brute force"))
            .await
            .unwrap();
        assert_eq!(created.id, 2);

        let toggled = client.toggle_policy(2).await.unwrap();
        assert!(!toggled.enabled);

        list.assert_async().await;
        create.assert_async().await;
        toggle.assert_async().await;
    }

    #[tokio::test]
    async fn event_endpoints() {
        let mut server = mockito::Server::new_async().await;
        let list = server
            .mock("GET", "/events/")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("skip".into(), "10".into()),
                Matcher::UrlEncoded("limit".into(), "5".into()),
            ]))
            .with_status(200)
            .with_body(r#"[{"id":11,"timestamp":"2025-10-14T12:00:00Z","source":"agent-01","category":"auth","severity":"High","message":"failed logins"}]"#)
            .create_async()
            .await;
        let create = server
            .mock("POST", "/events/")
            .with_status(200)
            .with_body(r#"{"id":12,"timestamp":"2025-10-14T12:05:00Z","source":"cli","category":"manual","severity":"Low","message":"note"}"#)
            .create_async()
            .await;

        let client = client_with_token(&server.url(), Some("jwt"));
        let events = client.list_events(10, 5).await.unwrap();
        assert_eq!(events[0].id, 11);

        let created = client
            .create_event(&NewSecurityEvent {
                source: "cli".to_string(),
                category: "manual".to_string(),
                severity: "Low".to_string(),
                message: "note".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(created.id, 12);

        list.assert_async().await;
        create.assert_async().await;
    }
}
