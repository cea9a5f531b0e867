//! 범용 데이터 페처.
//!
//! 엔드포인트 하나에 대해 `data` / `loading` / `error` 상태를 유지하고,
//! 마운트 시 자동 조회와 주기적 폴링을 수행한다. 상태 변화는 `watch` 채널로 구독한다.
//!
//! 겹치는 요청은 취소하거나 합치지 않는다. 요청 순서와 상관없이
//! 마지막으로 끝난 응답이 상태를 덮어쓴다.

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, warn};
use wraithnet_core::error::CoreError;
use wraithnet_core::ports::data_source::{DataSource, RequestOptions};

/// 조회 상태
///
/// 조회가 끝나면 (`data` 갱신, `error` 없음) 또는 (`data` 유지, `error` 있음) 중 하나다.
/// 실패해도 이전 데이터는 지우지 않으므로 화면은 오래된 데이터와 에러를 함께 보여줄 수 있다.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchState<T> {
    pub data: Option<T>,
    pub loading: bool,
    pub error: Option<String>,
}

impl<T> FetchState<T> {
    fn initial(loading: bool) -> Self {
        Self {
            data: None,
            loading,
            error: None,
        }
    }
}

/// 페처 옵션
#[derive(Debug, Clone)]
pub struct FetcherOptions {
    /// 마운트 시(그리고 엔드포인트 변경 시) 즉시 조회
    pub auto_fetch: bool,
    /// 폴링 간격. `None` 또는 0이면 폴링하지 않음
    pub refresh_interval: Option<Duration>,
    /// 매 요청에 사용할 옵션
    pub request: RequestOptions,
}

impl Default for FetcherOptions {
    fn default() -> Self {
        Self {
            auto_fetch: true,
            refresh_interval: None,
            request: RequestOptions::default(),
        }
    }
}

impl FetcherOptions {
    pub fn with_auto_fetch(mut self, auto_fetch: bool) -> Self {
        self.auto_fetch = auto_fetch;
        self
    }

    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = Some(interval);
        self
    }

    pub fn with_request(mut self, request: RequestOptions) -> Self {
        self.request = request;
        self
    }

    fn poll_period(&self) -> Option<Duration> {
        self.refresh_interval.filter(|d| !d.is_zero())
    }
}

struct FetcherInner<T> {
    source: Arc<dyn DataSource>,
    endpoint: RwLock<String>,
    options: FetcherOptions,
    state: watch::Sender<FetchState<T>>,
}

/// 범용 데이터 페처
pub struct DataFetcher<T> {
    inner: Arc<FetcherInner<T>>,
}

impl<T> Clone for DataFetcher<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> DataFetcher<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// 새 페처 생성. 초기 `loading`은 `auto_fetch` 값과 같다.
    pub fn new(
        source: Arc<dyn DataSource>,
        endpoint: impl Into<String>,
        options: FetcherOptions,
    ) -> Self {
        let (state, _) = watch::channel(FetchState::initial(options.auto_fetch));
        Self {
            inner: Arc::new(FetcherInner {
                source,
                endpoint: RwLock::new(endpoint.into()),
                options,
                state,
            }),
        }
    }

    /// 현재 엔드포인트
    pub fn endpoint(&self) -> String {
        self.inner.endpoint.read().clone()
    }

    /// 현재 상태 (복제본)
    pub fn state(&self) -> FetchState<T> {
        self.inner.state.borrow().clone()
    }

    /// 상태 변경 수신기
    pub fn subscribe(&self) -> watch::Receiver<FetchState<T>> {
        self.inner.state.subscribe()
    }

    /// 한 번 조회하고 끝난 시점의 상태를 반환
    ///
    /// 에러는 상태에 메시지로 기록되며 호출자에게 전파되지 않는다.
    pub async fn fetch(&self) -> FetchState<T> {
        let endpoint = self.endpoint();
        self.inner.state.send_modify(|s| {
            s.loading = true;
            s.error = None;
        });

        let result = self.load(&endpoint).await;

        let mut settled = None;
        self.inner.state.send_modify(|s| {
            s.loading = false;
            match result {
                Ok(data) => {
                    s.data = Some(data);
                    s.error = None;
                }
                Err(e) => {
                    warn!("조회 실패 ({endpoint}): {e}");
                    s.error = Some(e.to_string());
                }
            }
            settled = Some(s.clone());
        });
        settled.unwrap_or_else(|| self.state())
    }

    /// 수동 새로고침. [`DataFetcher::fetch`]와 같다.
    pub async fn refetch(&self) -> FetchState<T> {
        self.fetch().await
    }

    async fn load(&self, endpoint: &str) -> Result<T, CoreError> {
        let value = self
            .inner
            .source
            .request(endpoint, &self.inner.options.request)
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    /// 마운트: 자동 조회와 폴링 타이머 시작
    ///
    /// 반환된 핸들을 drop하면 타이머와 진행 중인 조회 태스크가 모두 중단된다.
    /// tokio 런타임 안에서 호출해야 한다.
    pub fn mount(&self) -> FetcherHandle<T> {
        let fetcher = self.clone();
        let auto_fetch = self.inner.options.auto_fetch;
        let period = self.inner.options.poll_period();

        let mut tasks = Vec::new();
        if auto_fetch || period.is_some() {
            tasks.push(tokio::spawn(async move {
                if auto_fetch {
                    fetcher.fetch().await;
                }
                if let Some(period) = period {
                    debug!("폴링 시작: {}ms", period.as_millis());
                    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
                    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                    loop {
                        interval.tick().await;
                        fetcher.fetch().await;
                    }
                }
            }));
        }

        FetcherHandle {
            fetcher: self.clone(),
            tasks,
        }
    }
}

/// 마운트된 페처. drop 시 모든 백그라운드 태스크를 중단한다.
pub struct FetcherHandle<T> {
    fetcher: DataFetcher<T>,
    tasks: Vec<JoinHandle<()>>,
}

impl<T> FetcherHandle<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    pub fn fetcher(&self) -> &DataFetcher<T> {
        &self.fetcher
    }

    pub fn state(&self) -> FetchState<T> {
        self.fetcher.state()
    }

    pub fn subscribe(&self) -> watch::Receiver<FetchState<T>> {
        self.fetcher.subscribe()
    }

    /// 엔드포인트 변경. 실제로 바뀌었고 `auto_fetch`면 즉시 다시 조회한다.
    /// 폴링은 다음 틱부터 새 엔드포인트를 사용한다.
    pub fn set_endpoint(&mut self, endpoint: impl Into<String>) {
        let endpoint = endpoint.into();
        {
            let mut current = self.fetcher.inner.endpoint.write();
            if *current == endpoint {
                return;
            }
            debug!("엔드포인트 변경: {} → {endpoint}", *current);
            *current = endpoint;
        }

        self.tasks.retain(|task| !task.is_finished());
        if self.fetcher.inner.options.auto_fetch {
            let fetcher = self.fetcher.clone();
            self.tasks.push(tokio::spawn(async move {
                fetcher.fetch().await;
            }));
        }
    }

    /// 명시적 해제
    pub fn unmount(self) {}
}

impl<T> Drop for FetcherHandle<T> {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
        debug!("페처 해제: 태스크 {}개 중단", self.tasks.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde::Deserialize;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    #[derive(Debug, Clone, PartialEq, Deserialize)]
    struct Payload {
        value: u32,
    }

    type Responder = dyn Fn(&str, usize) -> Result<Value, CoreError> + Send + Sync;

    /// 호출 횟수를 세고 정해진 응답을 돌려주는 데이터 소스
    struct ScriptedSource {
        calls: AtomicUsize,
        endpoints: parking_lot::Mutex<Vec<String>>,
        respond: Box<Responder>,
    }

    impl ScriptedSource {
        fn new(
            respond: impl Fn(&str, usize) -> Result<Value, CoreError> + Send + Sync + 'static,
        ) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                endpoints: parking_lot::Mutex::new(Vec::new()),
                respond: Box::new(respond),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl DataSource for ScriptedSource {
        async fn request(
            &self,
            endpoint: &str,
            _options: &RequestOptions,
        ) -> Result<Value, CoreError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            self.endpoints.lock().push(endpoint.to_string());
            (self.respond)(endpoint, n)
        }
    }

    /// 신호를 받을 때까지 응답을 미루는 데이터 소스
    struct GatedSource {
        gate: Notify,
    }

    #[async_trait]
    impl DataSource for GatedSource {
        async fn request(
            &self,
            _endpoint: &str,
            _options: &RequestOptions,
        ) -> Result<Value, CoreError> {
            self.gate.notified().await;
            Ok(json!({"value": 7}))
        }
    }

    fn manual() -> FetcherOptions {
        FetcherOptions::default().with_auto_fetch(false)
    }

    #[test]
    fn initial_loading_follows_auto_fetch() {
        let source = ScriptedSource::new(|_, _| Ok(json!({"value": 1})));
        let auto: DataFetcher<Payload> =
            DataFetcher::new(source.clone(), "/x", FetcherOptions::default());
        assert!(auto.state().loading);

        let lazy: DataFetcher<Payload> = DataFetcher::new(source, "/x", manual());
        assert_eq!(lazy.state(), FetchState::initial(false));
    }

    #[tokio::test]
    async fn success_sets_data_and_clears_error() {
        let source = ScriptedSource::new(|_, _| Ok(json!({"value": 1})));
        let fetcher: DataFetcher<Payload> = DataFetcher::new(source, "/metrics", manual());

        let settled = fetcher.fetch().await;
        assert_eq!(settled.data, Some(Payload { value: 1 }));
        assert_eq!(settled.error, None);
        assert!(!settled.loading);
        assert_eq!(fetcher.state(), settled);
    }

    #[tokio::test]
    async fn failure_keeps_previous_data() {
        let source = ScriptedSource::new(|_, n| match n {
            0 => Ok(json!({"value": 5})),
            1 => Err(CoreError::Unauthorized),
            _ => Ok(json!({"value": "not a number"})),
        });
        let fetcher: DataFetcher<Payload> = DataFetcher::new(source, "/metrics", manual());

        fetcher.fetch().await;
        let after_401 = fetcher.fetch().await;
        assert_eq!(after_401.data, Some(Payload { value: 5 }));
        assert_eq!(
            after_401.error.as_deref(),
            Some("Unauthorized - please login")
        );
        assert!(!after_401.loading);

        // 파싱 실패도 같은 규칙
        let after_parse = fetcher.fetch().await;
        assert_eq!(after_parse.data, Some(Payload { value: 5 }));
        assert!(after_parse.error.is_some());
    }

    #[tokio::test]
    async fn next_attempt_resets_error_and_sets_loading() {
        let source = Arc::new(GatedSource {
            gate: Notify::new(),
        });
        let fetcher: DataFetcher<Payload> = DataFetcher::new(source.clone(), "/slow", manual());
        fetcher
            .inner
            .state
            .send_modify(|s| s.error = Some("old".to_string()));

        let mut rx = fetcher.subscribe();
        let running = {
            let fetcher = fetcher.clone();
            tokio::spawn(async move { fetcher.fetch().await })
        };

        rx.changed().await.unwrap();
        {
            let state = rx.borrow_and_update();
            assert!(state.loading);
            assert!(state.error.is_none());
        }

        source.gate.notify_one();
        let settled = running.await.unwrap();
        assert_eq!(settled.data, Some(Payload { value: 7 }));
        assert!(!settled.loading);
    }

    #[tokio::test]
    async fn mount_auto_fetches_once() {
        let source = ScriptedSource::new(|_, _| Ok(json!({"value": 2})));
        let fetcher: DataFetcher<Payload> =
            DataFetcher::new(source.clone(), "/agents", FetcherOptions::default());

        let handle = fetcher.mount();
        let mut rx = handle.subscribe();
        rx.wait_for(|s| !s.loading && s.data.is_some())
            .await
            .unwrap();

        assert_eq!(source.calls(), 1);
        assert_eq!(handle.state().data, Some(Payload { value: 2 }));
    }

    #[tokio::test]
    async fn mount_without_auto_fetch_or_poll_is_idle() {
        let source = ScriptedSource::new(|_, _| Ok(json!({"value": 2})));
        let fetcher: DataFetcher<Payload> = DataFetcher::new(source.clone(), "/agents", manual());

        let _handle = fetcher.mount();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn endpoint_change_refetches() {
        let source = ScriptedSource::new(|endpoint, _| {
            let value = if endpoint == "/b" { 2 } else { 1 };
            Ok(json!({ "value": value }))
        });
        let fetcher: DataFetcher<Payload> =
            DataFetcher::new(source.clone(), "/a", FetcherOptions::default());

        let mut handle = fetcher.mount();
        let mut rx = handle.subscribe();
        rx.wait_for(|s| s.data == Some(Payload { value: 1 }))
            .await
            .unwrap();

        // 같은 엔드포인트는 무시
        handle.set_endpoint("/a");
        handle.set_endpoint("/b");
        rx.wait_for(|s| s.data == Some(Payload { value: 2 }))
            .await
            .unwrap();

        assert_eq!(source.calls(), 2);
        assert_eq!(*source.endpoints.lock(), vec!["/a", "/b"]);
        assert_eq!(handle.fetcher().endpoint(), "/b");
    }

    #[tokio::test]
    async fn refetch_is_manual_fetch() {
        let source = ScriptedSource::new(|_, n| Ok(json!({ "value": n })));
        let fetcher: DataFetcher<Payload> = DataFetcher::new(source.clone(), "/count", manual());

        fetcher.refetch().await;
        let state = fetcher.refetch().await;
        assert_eq!(state.data, Some(Payload { value: 1 }));
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn polling_stops_on_teardown() {
        let source = ScriptedSource::new(|_, _| Ok(json!({"value": 3})));
        let fetcher: DataFetcher<Payload> = DataFetcher::new(
            source.clone(),
            "/telemetry",
            manual().with_refresh_interval(Duration::from_millis(1000)),
        );

        let handle = fetcher.mount();
        tokio::time::sleep(Duration::from_millis(2500)).await;
        let during = source.calls();
        assert!(during >= 2, "폴링 호출 {during}회");

        handle.unmount();
        let at_teardown = source.calls();
        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(source.calls(), at_teardown);
    }

    #[tokio::test]
    async fn zero_interval_disables_polling() {
        let source = ScriptedSource::new(|_, _| Ok(json!({"value": 3})));
        let fetcher: DataFetcher<Payload> = DataFetcher::new(
            source.clone(),
            "/telemetry",
            manual().with_refresh_interval(Duration::ZERO),
        );

        let _handle = fetcher.mount();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn over_http_200_and_401() {
        use crate::auth::TokenManager;
        use crate::http_client::HttpApiClient;
        use wraithnet_core::local_storage::MemoryKeyValueStore;

        let mut server = mockito::Server::new_async().await;
        let ok = server
            .mock("GET", "/value")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"value":1}"#)
            .create_async()
            .await;
        let unauthorized = server
            .mock("GET", "/secret")
            .with_status(401)
            .create_async()
            .await;

        let storage = Arc::new(MemoryKeyValueStore::new());
        let tm = Arc::new(TokenManager::new(&server.url(), storage));
        let client =
            Arc::new(HttpApiClient::new(&server.url(), tm, Duration::from_secs(5)).unwrap());

        let fetcher: DataFetcher<Value> = DataFetcher::new(client.clone(), "/value", manual());
        let state = fetcher.fetch().await;
        assert_eq!(state.data, Some(json!({"value": 1})));
        assert_eq!(state.error, None);
        assert!(!state.loading);

        let denied: DataFetcher<Value> = DataFetcher::new(client, "/secret", manual());
        let state = denied.fetch().await;
        assert_eq!(state.data, None);
        assert_eq!(
            state.error.as_deref(),
            Some("Unauthorized - please login")
        );
        assert!(!state.loading);

        ok.assert_async().await;
        unauthorized.assert_async().await;
    }
}
