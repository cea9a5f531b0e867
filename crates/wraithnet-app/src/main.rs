//! # wraithnet-app
//!
//! WraithNet 클라이언트 바이너리 진입점.
//! 저장소/설정/네트워크 어댑터를 조립하고 서브커맨드를 실행한다.

mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use wraithnet_core::config::ClientConfig;
use wraithnet_core::export::ExportFormat;
use wraithnet_core::local_storage::FileKeyValueStore;
use wraithnet_core::ports::key_value::KeyValueStore;
use wraithnet_core::settings_store::SettingsStore;
use wraithnet_network::auth::TokenManager;
use wraithnet_network::http_client::HttpApiClient;

/// WraithNet 보안 운영 대시보드 클라이언트
#[derive(Parser, Debug)]
#[command(name = "wraithnet")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// API 서버 URL (기본: WRAITHNET_API_URL 또는 http://127.0.0.1:8000)
    #[arg(long, short = 's', global = true)]
    server: Option<String>,

    /// 로컬 저장소 경로 (기본: 플랫폼 데이터 디렉토리)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, short = 'l', default_value = "warn", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 로그인하고 토큰 저장
    Login {
        #[arg(long, short = 'u')]
        username: String,
        #[arg(long, short = 'p')]
        password: String,
    },
    /// 저장된 토큰 삭제
    Logout,
    /// 대시보드 설정 관리
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// 임의 엔드포인트 조회 (선택적 폴링)
    Fetch {
        /// 베이스 URL 기준 경로 (예: /defense/)
        endpoint: String,
        /// 폴링 간격 (밀리초, 1 이상)
        #[arg(
            long,
            conflicts_with = "watch",
            value_parser = clap::value_parser!(u64).range(1..)
        )]
        poll_ms: Option<u64>,
        /// 설정의 새로고침 간격으로 폴링
        #[arg(long)]
        watch: bool,
        /// 폴링 시 출력할 결과 수 (0이면 Ctrl+C까지)
        #[arg(long, default_value_t = 0)]
        count: usize,
    },
    /// 실시간 텔레메트리 스트림
    Telemetry {
        /// WebSocket URL (기본: 서버 URL에서 유도)
        #[arg(long)]
        url: Option<String>,
        /// 종료 시 마지막 스냅샷을 JSON으로 저장 (파일 또는 디렉토리)
        #[arg(long)]
        export: Option<PathBuf>,
    },
    /// 보안 정책 관리
    Policies {
        #[command(subcommand)]
        action: PolicyAction,
    },
    /// 로컬 방어 규칙 파일 관리
    Rules {
        #[command(subcommand)]
        action: RulesAction,
    },
    /// 보안 이벤트 목록
    Events {
        #[arg(long, default_value_t = 0)]
        skip: usize,
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
    /// 에이전트 현황
    Agents,
    /// 서버 상태 확인
    Health,
}

#[derive(Subcommand, Debug)]
enum SettingsAction {
    /// 현재 설정 출력 (비밀값 가림)
    Show,
    /// 일부 필드 변경 (예: theme=light refreshInterval=30)
    Set {
        #[arg(required = true)]
        assignments: Vec<String>,
    },
    /// 백업 파일로 내보내기
    Export {
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },
    /// 백업 파일에서 복원
    Import { file: PathBuf },
    /// 기본값으로 초기화
    Reset,
}

#[derive(Subcommand, Debug)]
enum PolicyAction {
    List,
    Create {
        name: String,
        #[arg(long)]
        description: Option<String>,
        /// 비활성 상태로 생성
        #[arg(long)]
        disabled: bool,
    },
    /// 활성/비활성 전환
    Toggle { id: u64 },
    /// 목록을 파일로 내보내기
    Export {
        #[arg(long, value_enum, default_value_t = FormatArg::Json)]
        format: FormatArg,
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum RulesAction {
    /// 규칙 하나를 켜거나 끄고 파일에 다시 기록
    Toggle { file: PathBuf, id: String },
    /// 규칙 목록을 JSON/CSV로 내보내기
    Export {
        file: PathBuf,
        #[arg(long, value_enum, default_value_t = FormatArg::Csv)]
        format: FormatArg,
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Json,
    Csv,
}

impl From<FormatArg> for ExportFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Json => ExportFormat::Json,
            FormatArg::Csv => ExportFormat::Csv,
        }
    }
}

/// 조립된 어댑터 묶음
pub struct App {
    pub config: ClientConfig,
    pub settings: Arc<SettingsStore>,
    pub tokens: Arc<TokenManager>,
    pub api: Arc<HttpApiClient>,
}

impl App {
    fn build(args: &Args) -> Result<Self> {
        let mut config = match &args.server {
            Some(server) => ClientConfig::new(server),
            None => ClientConfig::from_env(),
        };
        if let Some(dir) = &args.data_dir {
            config = config.with_data_dir(dir.clone());
        }

        let storage_dir = config.storage_dir()?;
        debug!("저장소: {}", storage_dir.display());
        let storage: Arc<dyn KeyValueStore> = Arc::new(
            FileKeyValueStore::open(&storage_dir)
                .with_context(|| format!("저장소 열기 실패: {}", storage_dir.display()))?,
        );

        let settings = install_settings(storage.clone())?;
        Self::assemble(config, storage, settings)
    }

    /// 준비된 저장소와 설정 저장소로 나머지 어댑터를 만든다
    fn assemble(
        config: ClientConfig,
        storage: Arc<dyn KeyValueStore>,
        settings: Arc<SettingsStore>,
    ) -> Result<Self> {
        let tokens = Arc::new(TokenManager::new(&config.api_base_url, storage));
        let api = Arc::new(HttpApiClient::new(
            &config.api_base_url,
            tokens.clone(),
            config.request_timeout,
        )?);

        Ok(Self {
            config,
            settings,
            tokens,
            api,
        })
    }
}

/// 전역 설정 저장소 등록. 이미 등록되어 있으면 그대로 쓴다.
fn install_settings(storage: Arc<dyn KeyValueStore>) -> Result<Arc<SettingsStore>> {
    if SettingsStore::try_global().is_none() {
        SettingsStore::install(SettingsStore::load(storage))?;
    }
    Ok(SettingsStore::global())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // tracing 초기화 (출력은 stderr, 결과는 stdout)
    let log_filter = format!(
        "wraithnet={0},wraithnet_app={0},wraithnet_core={0},wraithnet_network={0}",
        args.log_level
    );
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let app = App::build(&args)?;
    info!("서버: {}", app.config.api_base_url);

    match args.command {
        Command::Login { username, password } => commands::login(&app, &username, &password).await,
        Command::Logout => commands::logout(&app),
        Command::Settings { action } => match action {
            SettingsAction::Show => commands::settings_show(&app),
            SettingsAction::Set { assignments } => commands::settings_set(&app, &assignments),
            SettingsAction::Export { output } => commands::settings_export(&app, output),
            SettingsAction::Import { file } => commands::settings_import(&app, &file),
            SettingsAction::Reset => commands::settings_reset(&app),
        },
        Command::Fetch {
            endpoint,
            poll_ms,
            watch,
            count,
        } => commands::fetch(&app, &endpoint, poll_ms, watch, count).await,
        Command::Telemetry { url, export } => commands::telemetry(&app, url, export).await,
        Command::Policies { action } => match action {
            PolicyAction::List => commands::policies_list(&app).await,
            PolicyAction::Create {
                name,
                description,
                disabled,
            } => commands::policies_create(&app, name, description, !disabled).await,
            PolicyAction::Toggle { id } => commands::policies_toggle(&app, id).await,
            PolicyAction::Export { format, output } => {
                commands::policies_export(&app, format.into(), output).await
            }
        },
        Command::Rules { action } => match action {
            RulesAction::Toggle { file, id } => commands::rules_toggle(&file, &id),
            RulesAction::Export {
                file,
                format,
                output,
            } => commands::rules_export(&file, format.into(), output),
        },
        Command::Events { skip, limit } => commands::events_list(&app, skip, limit).await,
        Command::Agents => commands::agents(&app).await,
        Command::Health => commands::health(&app).await,
    }
}
