//! 텔레메트리 WebSocket 클라이언트.
//!
//! `tokio-tungstenite` 기반 수신 전용 스트림. 메시지 하나(줄 단위 JSON 문서 하나)가
//! 텔레메트리 뷰 모델 전체를 대체한다. 잘못된 메시지는 로그만 남기고 버린다.
//! 연결이 끊겨도 재연결하지 않는다.

use futures::StreamExt;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};
use wraithnet_core::error::CoreError;
use wraithnet_core::models::telemetry::TelemetrySnapshot;

use crate::auth::TokenManager;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// 스트림 연결 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamStatus {
    /// 연결됨
    Connected,
    /// 연결 끊김 (서버 종료, 에러, 구독 해제)
    Disconnected,
}

impl std::fmt::Display for StreamStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamStatus::Connected => write!(f, "Connected"),
            StreamStatus::Disconnected => write!(f, "Disconnected"),
        }
    }
}

/// 텔레메트리 WebSocket 클라이언트
pub struct TelemetryClient {
    url: String,
    token_manager: Option<Arc<TokenManager>>,
}

impl TelemetryClient {
    /// `ws://host/telemetry/ws` 형태의 전체 URL로 생성
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            token_manager: None,
        }
    }

    /// 저장된 토큰이 있으면 `?token=`으로 붙인다
    pub fn with_token_manager(mut self, token_manager: Arc<TokenManager>) -> Self {
        self.token_manager = Some(token_manager);
        self
    }

    fn connect_url(&self) -> Result<String, CoreError> {
        let mut url = url::Url::parse(&self.url)
            .map_err(|e| CoreError::Config(format!("잘못된 WebSocket URL {}: {e}", self.url)))?;
        if let Some(token) = self.token_manager.as_ref().and_then(|tm| tm.access_token()) {
            url.query_pairs_mut().append_pair("token", &token);
        }
        Ok(url.to_string())
    }

    /// 연결 수립 후 수신 태스크 시작
    pub async fn connect(&self) -> Result<TelemetrySubscription, CoreError> {
        let url = self.connect_url()?;
        info!("텔레메트리 WebSocket 연결: {}", self.url);

        let (ws_stream, _) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(|e| CoreError::WebSocket(format!("연결 실패: {e}")))?;

        let (snapshot_tx, snapshot_rx) = watch::channel(None);
        let (status_tx, status_rx) = watch::channel(StreamStatus::Connected);
        let task = tokio::spawn(Self::read_loop(ws_stream, snapshot_tx, status_tx));

        Ok(TelemetrySubscription {
            snapshot_rx,
            status_rx,
            task,
        })
    }

    /// 수신 루프
    async fn read_loop(
        mut ws: WsStream,
        snapshot_tx: watch::Sender<Option<TelemetrySnapshot>>,
        status_tx: watch::Sender<StreamStatus>,
    ) {
        while let Some(msg) = ws.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    apply_frame(text.as_str(), &snapshot_tx);
                }
                Ok(Message::Binary(data)) => match std::str::from_utf8(&data) {
                    Ok(text) => {
                        apply_frame(text, &snapshot_tx);
                    }
                    Err(e) => warn!("바이너리 텔레메트리 메시지 무시: {e}"),
                },
                Ok(Message::Close(_)) => {
                    debug!("서버가 연결 종료");
                    break;
                }
                Ok(_) => {} // Ping/Pong은 자동 처리
                Err(e) => {
                    warn!("WebSocket 수신 에러: {e}");
                    break;
                }
            }
        }
        status_tx.send_replace(StreamStatus::Disconnected);
        info!("텔레메트리 WebSocket 연결 종료");
    }
}

/// 프레임 하나를 줄 단위 JSON으로 해석해 스냅샷을 갱신한다.
/// 적용된 문서 수를 반환한다.
fn apply_frame(text: &str, snapshot_tx: &watch::Sender<Option<TelemetrySnapshot>>) -> usize {
    let mut applied = 0;
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        match serde_json::from_str::<TelemetrySnapshot>(line) {
            Ok(snapshot) => {
                snapshot_tx.send_replace(Some(snapshot));
                applied += 1;
            }
            Err(e) => warn!("잘못된 텔레메트리 메시지 무시: {e}"),
        }
    }
    applied
}

/// 텔레메트리 구독. drop하면 수신 태스크가 중단된다.
pub struct TelemetrySubscription {
    snapshot_rx: watch::Receiver<Option<TelemetrySnapshot>>,
    status_rx: watch::Receiver<StreamStatus>,
    task: JoinHandle<()>,
}

impl TelemetrySubscription {
    /// 가장 최근 스냅샷
    pub fn latest(&self) -> Option<TelemetrySnapshot> {
        self.snapshot_rx.borrow().clone()
    }

    /// 스냅샷 변경 수신기
    pub fn snapshots(&self) -> watch::Receiver<Option<TelemetrySnapshot>> {
        self.snapshot_rx.clone()
    }

    /// 현재 연결 상태
    pub fn status(&self) -> StreamStatus {
        *self.status_rx.borrow()
    }

    /// 상태 변경 수신기
    pub fn status_updates(&self) -> watch::Receiver<StreamStatus> {
        self.status_rx.clone()
    }

    /// 구독 해제
    pub fn close(self) {}
}

impl Drop for TelemetrySubscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}
