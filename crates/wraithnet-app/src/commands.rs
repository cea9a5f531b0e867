//! 서브커맨드 실행부.
//!
//! 결과는 stdout, 진단 로그는 stderr(tracing)로 나간다.

use anyhow::{anyhow, bail, Context, Result};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use wraithnet_core::config::{SettingsConfig, SettingsPatch};
use wraithnet_core::export::{self, ExportFormat};
use wraithnet_core::models::defense::DefenseRule;
use wraithnet_core::models::policy::NewSecurityPolicy;
use wraithnet_core::models::telemetry::TelemetrySnapshot;
use wraithnet_core::ports::data_source::{DataSource, RequestOptions};
use wraithnet_core::settings_store::BACKUP_FILE_NAME;
use wraithnet_network::fetcher::{DataFetcher, FetchState, FetcherOptions};
use wraithnet_network::ws_client::{StreamStatus, TelemetryClient};

use crate::App;

const MASK: &str = "********";

/// 규칙 내보내기 기본 파일 이름 (확장자 제외)
const RULES_EXPORT_STEM: &str = "defense-rules";

fn enabled_label(enabled: bool) -> &'static str {
    if enabled {
        "enabled"
    } else {
        "disabled"
    }
}

// ── 인증 ──

pub async fn login(app: &App, username: &str, password: &str) -> Result<()> {
    app.tokens.login(username, password).await?;
    println!("Logged in as {username}");
    Ok(())
}

pub fn logout(app: &App) -> Result<()> {
    app.tokens.logout()?;
    println!("Logged out");
    Ok(())
}

// ── 설정 ──

pub fn settings_show(app: &App) -> Result<()> {
    let masked = masked_settings(app.settings.read());
    println!("{}", serde_json::to_string_pretty(&masked)?);
    Ok(())
}

pub fn settings_set(app: &App, assignments: &[String]) -> Result<()> {
    let patch = parse_assignments(assignments)?;

    // 범위 검사는 저장 전에 미리 해본다
    let mut preview = app.settings.read();
    patch.apply_to(&mut preview);
    preview.validate()?;

    let updated = app.settings.update(&patch)?;
    println!(
        "{}",
        serde_json::to_string_pretty(&masked_settings(updated))?
    );
    Ok(())
}

pub fn settings_export(app: &App, output: Option<PathBuf>) -> Result<()> {
    let path = output.unwrap_or_else(|| PathBuf::from(BACKUP_FILE_NAME));
    app.settings.export_file(&path)?;
    println!("Settings exported to {}", path.display());
    Ok(())
}

pub fn settings_import(app: &App, file: &Path) -> Result<()> {
    app.settings.import_file(file)?;
    println!("Settings imported from {}", file.display());
    Ok(())
}

pub fn settings_reset(app: &App) -> Result<()> {
    app.settings.reset()?;
    println!("Settings reset to defaults");
    Ok(())
}

/// `key=value` 목록을 부분 설정으로 변환.
/// 값은 JSON으로 먼저 해석하고, 실패하면 문자열로 취급한다.
fn parse_assignments(assignments: &[String]) -> Result<SettingsPatch> {
    let mut fields = Map::new();
    for assignment in assignments {
        let (key, raw) = assignment
            .split_once('=')
            .ok_or_else(|| anyhow!("expected key=value, got '{assignment}'"))?;
        let key = key.trim();
        if key.is_empty() {
            bail!("empty key in '{assignment}'");
        }
        let value = serde_json::from_str::<Value>(raw)
            .unwrap_or_else(|_| Value::String(raw.to_string()));
        fields.insert(key.to_string(), value);
    }
    serde_json::from_value(Value::Object(fields)).context("invalid settings value")
}

fn masked_settings(mut settings: SettingsConfig) -> SettingsConfig {
    if !settings.auth_token.is_empty() {
        settings.auth_token = MASK.to_string();
    }
    settings
}

// ── 범용 조회 ──

/// 엔드포인트 조회.
/// 간격이 있으면 `count`개 결과(0이면 Ctrl+C)까지 폴링한다.
///
/// 종료 코드는 마지막으로 끝난 조회의 성공 여부를 따른다.
pub async fn fetch(
    app: &App,
    endpoint: &str,
    poll_ms: Option<u64>,
    watch: bool,
    count: usize,
) -> Result<()> {
    let source: Arc<dyn DataSource> = app.api.clone();

    let interval = match (poll_ms, watch) {
        (Some(ms), _) => Some(Duration::from_millis(ms)),
        (None, true) => Some(app.settings.read().refresh_period()),
        (None, false) => None,
    };
    // 0 간격은 폴링하지 않으므로 한 번만 조회
    let interval = interval.filter(|d| !d.is_zero());

    let Some(interval) = interval else {
        let fetcher: DataFetcher<Value> = DataFetcher::new(
            source,
            endpoint,
            FetcherOptions::default().with_auto_fetch(false),
        );
        let state = fetcher.fetch().await;
        return print_state(&state);
    };

    info!("{endpoint} 폴링 시작 ({}ms)", interval.as_millis());
    let fetcher: DataFetcher<Value> = DataFetcher::new(
        source,
        endpoint,
        FetcherOptions::default()
            .with_refresh_interval(interval)
            .with_request(RequestOptions::get()),
    );
    let handle = fetcher.mount();
    let mut updates = handle.subscribe();
    let mut settled = 0usize;
    let mut last_error = None;

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = updates.borrow_and_update().clone();
                if state.loading {
                    continue;
                }
                last_error = print_state(&state).err();
                if let Some(e) = &last_error {
                    eprintln!("{e}");
                }
                settled += 1;
                if count > 0 && settled >= count {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("중단 요청");
                break;
            }
        }
    }

    handle.unmount();
    match last_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn print_state(state: &FetchState<Value>) -> Result<()> {
    if let Some(error) = &state.error {
        bail!("{error}");
    }
    match &state.data {
        Some(data) => println!("{}", serde_json::to_string_pretty(data)?),
        None => println!("null"),
    }
    Ok(())
}

// ── 텔레메트리 ──

pub async fn telemetry(app: &App, url: Option<String>, export_to: Option<PathBuf>) -> Result<()> {
    let url = url.unwrap_or_else(|| app.config.telemetry_ws_url.clone());
    let client = TelemetryClient::new(&url)
        .with_token_manager(app.tokens.clone());
    let subscription = client.connect().await?;
    println!("Live Monitoring: {}", StreamStatus::Connected);

    let mut snapshots = subscription.snapshots();
    let mut status = subscription.status_updates();

    loop {
        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                if let Some(snapshot) = snapshot {
                    report_snapshot(app, &snapshot);
                }
            }
            _ = status.wait_for(|s| *s == StreamStatus::Disconnected) => {
                break;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("중단 요청");
                break;
            }
        }
    }
    println!("Live Monitoring: {}", StreamStatus::Disconnected);

    let latest = subscription.latest();
    subscription.close();

    if let Some(target) = export_to {
        let Some(snapshot) = latest else {
            warn!("수신한 텔레메트리가 없어 내보내기 생략");
            return Ok(());
        };
        let path = if target.is_dir() {
            target.join(export::export_file_name("telemetry", ExportFormat::Json))
        } else {
            target
        };
        fs::write(&path, export::to_json_pretty(&snapshot)?)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("Telemetry exported to {}", path.display());
    }
    Ok(())
}

fn report_snapshot(app: &App, snapshot: &TelemetrySnapshot) {
    let cpu = snapshot.latest_cpu();
    let memory = snapshot.latest_memory();
    println!(
        "cpu {:>5.1}%  mem {:>5.1}%  disk {:>5.1}%  net {:>6.1} Mbps  agents {}  alerts {}  uptime {}",
        cpu,
        memory,
        snapshot.latest_disk(),
        snapshot.latest_network(),
        snapshot.active_agents,
        snapshot.alerts,
        snapshot.uptime,
    );

    let settings = app.settings.read();
    if settings.cpu_exceeded(cpu) {
        warn!("CPU 사용률 {cpu:.1}% > 임계값 {}%", settings.cpu_threshold);
    }
    if settings.memory_exceeded(memory) {
        warn!(
            "메모리 사용률 {memory:.1}% > 임계값 {}%",
            settings.memory_threshold
        );
    }
}

// ── 정책/이벤트/에이전트 ──

pub async fn policies_list(app: &App) -> Result<()> {
    let policies = app.api.list_policies().await?;
    if policies.is_empty() {
        println!("No policies");
    }
    for policy in policies {
        println!(
            "{:>4}  {:<8}  {}{}",
            policy.id,
            enabled_label(policy.enabled),
            policy.name,
            policy
                .description
                .map(|d| format!(" - {d}"))
                .unwrap_or_default(),
        );
    }
    Ok(())
}

pub async fn policies_create(
    app: &App,
    name: String,
    description: Option<String>,
    enabled: bool,
) -> Result<()> {
    let mut request = NewSecurityPolicy::new(name);
    if let Some(description) = description {
        request = request.with_description(description);
    }
    request.enabled = enabled;

    let created = app.api.create_policy(&request).await?;
    println!("Created policy {} ({})", created.id, created.name);
    Ok(())
}

pub async fn policies_toggle(app: &App, id: u64) -> Result<()> {
    let policy = app.api.toggle_policy(id).await?;
    println!(
        "Policy {} is now {}",
        policy.id,
        enabled_label(policy.enabled)
    );
    Ok(())
}

pub async fn policies_export(
    app: &App,
    format: ExportFormat,
    output: Option<PathBuf>,
) -> Result<()> {
    let policies = app.api.list_policies().await?;
    let path = output
        .unwrap_or_else(|| PathBuf::from(export::export_file_name("security-policies", format)));
    export::write_export(&policies, format, &path)?;
    println!("Exported {} policies to {}", policies.len(), path.display());
    Ok(())
}

pub async fn events_list(app: &App, skip: usize, limit: usize) -> Result<()> {
    let events = app.api.list_events(skip, limit).await?;
    for event in events {
        println!(
            "{}  [{}] {} / {}: {}",
            event.timestamp.format("%Y-%m-%d %H:%M:%S"),
            event.severity,
            event.source,
            event.category,
            event.message
        );
    }
    Ok(())
}

pub async fn agents(app: &App) -> Result<()> {
    let overview = app.api.agent_overview().await?;
    println!(
        "{} agents ({} online)",
        overview.count,
        overview.online_count()
    );
    for agent in overview.agents {
        println!(
            "{:>4}  {:<20}  {:<8}  {}",
            agent.id, agent.name, agent.status, agent.last_seen
        );
    }
    Ok(())
}

pub async fn health(app: &App) -> Result<()> {
    let status = app.api.health().await?;
    match status.database.as_deref() {
        Some(db) => println!("{} (database: {db})", status.status),
        None => println!("{}", status.status),
    }
    if let Some(error) = &status.error {
        println!("error: {error}");
    }
    if !status.is_healthy() {
        bail!("server reported {}", status.status);
    }
    Ok(())
}

// ── 방어 규칙 ──

fn load_rules(file: &Path) -> Result<Vec<DefenseRule>> {
    let content = fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("invalid rules file {}", file.display()))
}

/// 규칙 하나의 상태를 뒤집고 파일 전체를 다시 기록
pub fn rules_toggle(file: &Path, id: &str) -> Result<()> {
    let mut rules = load_rules(file)?;
    let rule = rules
        .iter_mut()
        .find(|r| r.id == id)
        .ok_or_else(|| anyhow!("no rule with id '{id}'"))?;
    rule.toggle();
    println!("{} is now {}", rule.name, enabled_label(rule.is_enabled()));

    fs::write(file, export::to_json_pretty(&rules)?)
        .with_context(|| format!("failed to write {}", file.display()))?;
    Ok(())
}

pub fn rules_export(file: &Path, format: ExportFormat, output: Option<PathBuf>) -> Result<()> {
    let rules = load_rules(file)?;
    let path = output
        .unwrap_or_else(|| PathBuf::from(format!("{RULES_EXPORT_STEM}.{}", format.extension())));
    export::write_export(&rules, format, &path)?;
    println!("Exported {} rules to {}", rules.len(), path.display());
    Ok(())
}
