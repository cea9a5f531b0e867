//! 인증 토큰 관리.
//!
//! `/auth/login` 로그인과 로컬 저장소의 `access_token` / `refresh_token` 보관을 담당한다.
//! 토큰 만료나 갱신은 다루지 않는다.

use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};
use wraithnet_core::error::CoreError;
use wraithnet_core::ports::key_value::{KeyValueStore, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};

/// 서버 응답: 로그인
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// 토큰 매니저: 로그인/로그아웃, 저장된 토큰 조회
#[derive(Clone)]
pub struct TokenManager {
    base_url: String,
    client: reqwest::Client,
    storage: Arc<dyn KeyValueStore>,
}

impl TokenManager {
    /// 새 토큰 매니저 생성
    pub fn new(base_url: &str, storage: Arc<dyn KeyValueStore>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            storage,
        }
    }

    /// 사용자명/비밀번호 로그인 (form-urlencoded)
    ///
    /// 실패 시 서버가 돌려준 본문을 그대로 에러 메시지로 사용한다.
    pub async fn login(&self, username: &str, password: &str) -> Result<(), CoreError> {
        let url = format!("{}/auth/login", self.base_url);
        let resp = self
            .client
            .post(&url)
            .form(&[("username", username), ("password", password)])
            .send()
            .await
            .map_err(|e| CoreError::Network(format!("로그인 요청 실패: {e}")))?;

        let status = resp.status();
        let text = resp.text().await.unwrap_or_else(|e| {
            warn!("응답 본문 읽기 실패: {e}");
            String::new()
        });

        if !status.is_success() {
            let message = if text.trim().is_empty() {
                format!("Login failed: {}", status.as_u16())
            } else {
                text
            };
            return Err(CoreError::Auth(message));
        }

        let token_resp: TokenResponse = serde_json::from_str(&text)?;

        self.storage
            .set(ACCESS_TOKEN_KEY, &token_resp.access_token)?;
        match &token_resp.refresh_token {
            Some(refresh) => self.storage.set(REFRESH_TOKEN_KEY, refresh)?,
            None => self.storage.remove(REFRESH_TOKEN_KEY)?,
        }

        info!("로그인 성공: {username}");
        Ok(())
    }

    /// 로그아웃: 저장된 토큰 삭제
    pub fn logout(&self) -> Result<(), CoreError> {
        self.storage.remove(ACCESS_TOKEN_KEY)?;
        self.storage.remove(REFRESH_TOKEN_KEY)?;
        debug!("로그아웃 완료");
        Ok(())
    }

    /// 저장된 액세스 토큰
    ///
    /// 매 호출마다 저장소를 읽으므로 다른 프로세스의 로그인도 반영된다.
    pub fn access_token(&self) -> Option<String> {
        self.read_key(ACCESS_TOKEN_KEY)
    }

    /// 저장된 리프레시 토큰
    pub fn refresh_token(&self) -> Option<String> {
        self.read_key(REFRESH_TOKEN_KEY)
    }

    /// 액세스 토큰이 있는지
    pub fn is_authenticated(&self) -> bool {
        self.access_token().is_some()
    }

    fn read_key(&self, key: &str) -> Option<String> {
        match self.storage.get(key) {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(e) => {
                warn!("토큰 읽기 실패 ({key}): {e}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use wraithnet_core::local_storage::MemoryKeyValueStore;

    fn manager(base_url: &str) -> (TokenManager, Arc<MemoryKeyValueStore>) {
        let storage = Arc::new(MemoryKeyValueStore::new());
        (TokenManager::new(base_url, storage.clone()), storage)
    }

    #[test]
    fn trailing_slash_trimmed() {
        let (tm, _) = manager("http://localhost:8000/");
        assert_eq!(tm.base_url, "http://localhost:8000");
    }

    #[test]
    fn unauthenticated_state() {
        let (tm, _) = manager("http://localhost:8000");
        assert!(!tm.is_authenticated());
        assert!(tm.access_token().is_none());
    }

    #[tokio::test]
    async fn login_success_stores_tokens() {
        let body = r#"{"access_token":"jwt_abc","refresh_token":"ref_xyz","token_type":"bearer"}"#;
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/auth/login")
            .match_header("content-type", "application/x-www-form-urlencoded")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("username".into(), "analyst".into()),
                Matcher::UrlEncoded("password".into(), "hunter2".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await;

        let (tm, storage) = manager(&server.url());
        tm.login("analyst", "hunter2").await.unwrap();

        assert_eq!(tm.access_token().as_deref(), Some("jwt_abc"));
        assert_eq!(tm.refresh_token().as_deref(), Some("ref_xyz"));
        assert_eq!(
            storage.get(ACCESS_TOKEN_KEY).unwrap().as_deref(),
            Some("jwt_abc")
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn login_without_refresh_token() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/auth/login")
            .with_status(200)
            .with_body(r#"{"access_token":"jwt_only","token_type":"bearer"}"#)
            .create_async()
            .await;

        let (tm, storage) = manager(&server.url());
        storage.set(REFRESH_TOKEN_KEY, "stale").unwrap();
        tm.login("analyst", "pw").await.unwrap();

        assert!(tm.is_authenticated());
        assert!(tm.refresh_token().is_none());
    }

    #[tokio::test]
    async fn login_failure_uses_body_text() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/auth/login")
            .with_status(401)
            .with_body(r#"{"detail":"Invalid email or password"}"#)
            .create_async()
            .await;

        let (tm, _) = manager(&server.url());
        let err = tm.login("analyst", "wrong").await.unwrap_err();
        assert!(matches!(err, CoreError::Auth(_)));
        assert!(err.to_string().contains("Invalid email or password"));
        assert!(!tm.is_authenticated());
    }

    #[tokio::test]
    async fn login_failure_empty_body() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/auth/login")
            .with_status(500)
            .create_async()
            .await;

        let (tm, _) = manager(&server.url());
        let err = tm.login("analyst", "pw").await.unwrap_err();
        assert_eq!(err.to_string(), "Login failed: 500");
    }

    #[test]
    fn logout_clears_tokens() {
        let (tm, storage) = manager("http://localhost:8000");
        storage.set(ACCESS_TOKEN_KEY, "jwt").unwrap();
        storage.set(REFRESH_TOKEN_KEY, "ref").unwrap();
        assert!(tm.is_authenticated());

        tm.logout().unwrap();
        assert!(!tm.is_authenticated());
        assert!(tm.refresh_token().is_none());
    }
}
