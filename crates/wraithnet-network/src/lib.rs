//! # wraithnet-network
//!
//! HTTP/WebSocket 네트워크 어댑터.
//! 서버 REST API와 텔레메트리 WebSocket 통신을 담당하며
//! 베어러 토큰 인증, 범용 데이터 페처(자동 조회/폴링)를 제공한다.
//!
//! ## 사용 예시
//!
//! ```rust,ignore
//! use wraithnet_network::fetcher::{DataFetcher, FetcherOptions};
//! use wraithnet_network::http_client::HttpApiClient;
//!
//! let fetcher: DataFetcher<serde_json::Value> =
//!     DataFetcher::new(client, "/defense/", FetcherOptions::default());
//! let handle = fetcher.mount();
//! ```

pub mod auth;
pub mod fetcher;
pub mod http_client;
pub mod ws_client;
