//! 포트 인터페이스 (trait).
//!
//! 어댑터가 이 trait들을 구현하며 소비자는 `Arc<dyn T>`로 받는다.
//! 목업 데이터를 실제 서비스로 바꿀 때 화면 코드를 건드리지 않기 위한 경계다.

pub mod data_source;
pub mod key_value;
