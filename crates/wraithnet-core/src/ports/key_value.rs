//! 로컬 키-값 저장소 포트.
//!
//! 구현: [`crate::local_storage`] (파일, 메모리)

use crate::error::CoreError;

/// 액세스 토큰 키
pub const ACCESS_TOKEN_KEY: &str = "access_token";

/// 리프레시 토큰 키
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";

/// 대시보드 설정 키
pub const SETTINGS_KEY: &str = "systemSettings";

/// 문자열 키-값 저장소
///
/// 브라우저 local storage에 해당한다. 동기 호출이며 값은 불투명한 문자열이다.
pub trait KeyValueStore: Send + Sync {
    /// 값 조회. 키가 없으면 `Ok(None)`
    fn get(&self, key: &str) -> Result<Option<String>, CoreError>;

    /// 값 저장 (덮어쓰기)
    fn set(&self, key: &str, value: &str) -> Result<(), CoreError>;

    /// 값 삭제. 없는 키는 무시
    fn remove(&self, key: &str) -> Result<(), CoreError>;
}
