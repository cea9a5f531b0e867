//! WraithNet 도메인 모델.
//!
//! 대시보드가 서버에서 받아 표시하는 데이터 구조체를 정의한다.
//! 모든 모델은 `serde` Serialize/Deserialize를 구현한다.

pub mod defense;
pub mod event;
pub mod policy;
pub mod severity;
pub mod system;
pub mod telemetry;

pub use severity::Severity;
