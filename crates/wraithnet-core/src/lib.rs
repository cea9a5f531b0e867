//! # wraithnet-core
//!
//! WraithNet 도메인 모델, 포트(trait) 정의, 설정 저장소, 에러 타입.
//! 모든 크레이트가 공유하는 핵심 타입과 인터페이스를 제공한다.
//!
//! ## 구조
//!
//! - [`models`]: 대시보드 데이터 구조체 (serde Serialize/Deserialize)
//! - [`ports`]: 데이터 소스 / 키-값 저장소 인터페이스
//! - [`error`]: 핵심 에러 타입 (thiserror)
//! - [`config`]: 대시보드 설정과 연결 설정
//! - [`settings_store`]: 프로세스 전역 설정 저장소 (로드/병합/복원)
//! - [`local_storage`]: 키-값 저장소 구현 (파일, 메모리)
//! - [`export`]: JSON/CSV 내보내기

pub mod config;
pub mod error;
pub mod export;
pub mod local_storage;
pub mod models;
pub mod ports;
pub mod settings_store;
