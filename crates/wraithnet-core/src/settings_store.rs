//! 대시보드 설정 저장소.
//!
//! 프로세스 전체에서 하나의 [`SettingsConfig`]를 공유하고, 변경될 때마다
//! `systemSettings` 키로 로컬 저장소에 전체를 기록한다.

use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::{SettingsConfig, SettingsPatch};
use crate::error::CoreError;
use crate::ports::key_value::{KeyValueStore, SETTINGS_KEY};

/// 백업 파일 기본 이름
pub const BACKUP_FILE_NAME: &str = "system-settings-backup.json";

static GLOBAL: OnceCell<Arc<SettingsStore>> = OnceCell::new();

/// 설정 저장소
///
/// 쓰기는 항상 "복제 → 병합 → 통째로 교체" 순서로 락 안에서 이루어지며,
/// 같은 락 안에서 저장까지 끝낸다.
pub struct SettingsStore {
    config: RwLock<SettingsConfig>,
    storage: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for SettingsStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsStore").finish_non_exhaustive()
    }
}

impl SettingsStore {
    /// 저장소에서 설정을 읽어 생성
    ///
    /// 저장된 값이 없거나 파싱할 수 없으면 기본값으로 시작한다.
    pub fn load(storage: Arc<dyn KeyValueStore>) -> Self {
        let config = match Self::read_stored(storage.as_ref()) {
            Ok(Some(config)) => {
                debug!("저장된 설정 로드 완료");
                config
            }
            Ok(None) => {
                info!("저장된 설정 없음, 기본값 사용");
                SettingsConfig::default()
            }
            Err(e) => {
                warn!("저장된 설정을 읽을 수 없어 기본값 사용: {e}");
                SettingsConfig::default()
            }
        };

        Self {
            config: RwLock::new(config),
            storage,
        }
    }

    /// 현재 설정 반환 (복제본)
    pub fn read(&self) -> SettingsConfig {
        self.config.read().clone()
    }

    /// 지정된 필드만 병합하고 저장
    ///
    /// 메모리 병합은 실패하지 않는다. `Err`는 저장소 기록 실패만 뜻하며
    /// 그 경우에도 메모리의 설정은 이미 갱신되어 있다.
    pub fn update(&self, patch: &SettingsPatch) -> Result<SettingsConfig, CoreError> {
        let mut current = self.config.write();
        let mut next = current.clone();
        patch.apply_to(&mut next);
        *current = next.clone();
        self.persist(&next)?;
        debug!("설정 업데이트 완료");
        Ok(next)
    }

    /// 외부에서 받은 전체 설정으로 교체 (백업 복원)
    ///
    /// 파싱 또는 검증에 실패하면 기존 설정을 그대로 두고 [`CoreError::Import`]를 반환한다.
    /// 저장소 기록이 실패해도 기존 설정은 바뀌지 않는다.
    pub fn import_json(&self, json: &str) -> Result<SettingsConfig, CoreError> {
        let restored: SettingsConfig =
            serde_json::from_str(json).map_err(|e| CoreError::Import(e.to_string()))?;
        restored
            .validate()
            .map_err(|e| CoreError::Import(e.to_string()))?;

        self.replace(restored.clone())?;
        info!("설정 복원 완료");
        Ok(restored)
    }

    /// 파일에서 설정 복원
    pub fn import_file(&self, path: &Path) -> Result<SettingsConfig, CoreError> {
        let content = fs::read_to_string(path)
            .map_err(|e| CoreError::Import(format!("{}: {e}", path.display())))?;
        self.import_json(&content)
    }

    /// 현재 설정을 보기 좋은 JSON으로 내보내기
    pub fn export_json(&self) -> Result<String, CoreError> {
        Ok(serde_json::to_string_pretty(&self.read())?)
    }

    /// 현재 설정을 파일로 내보내기
    pub fn export_file(&self, path: &Path) -> Result<(), CoreError> {
        let content = self.export_json()?;
        fs::write(path, content)?;
        info!("설정 내보내기 완료: {}", path.display());
        Ok(())
    }

    /// 기본값으로 되돌리기
    pub fn reset(&self) -> Result<SettingsConfig, CoreError> {
        let defaults = SettingsConfig::default();
        self.replace(defaults.clone())?;
        info!("설정 기본값으로 초기화");
        Ok(defaults)
    }

    /// 저장소에서 다시 읽기. 저장된 값이 없으면 기본값
    pub fn reload(&self) -> Result<SettingsConfig, CoreError> {
        let config = Self::read_stored(self.storage.as_ref())?.unwrap_or_default();
        *self.config.write() = config.clone();
        info!("설정 다시 로드 완료");
        Ok(config)
    }

    // --------------------------------------------------------
    // 프로세스 전역 인스턴스
    // --------------------------------------------------------

    /// 전역 인스턴스 등록. 두 번째 호출은 실패한다.
    pub fn install(store: SettingsStore) -> Result<Arc<SettingsStore>, CoreError> {
        let store = Arc::new(store);
        GLOBAL
            .set(store.clone())
            .map_err(|_| CoreError::Config("설정 저장소가 이미 초기화되었습니다".to_string()))?;
        debug!("전역 설정 저장소 등록");
        Ok(store)
    }

    /// 전역 인스턴스 반환
    ///
    /// # Panics
    ///
    /// [`SettingsStore::install`] 전에 호출하면 패닉한다.
    pub fn global() -> Arc<SettingsStore> {
        expect_installed(&GLOBAL)
    }

    /// 전역 인스턴스가 있으면 반환
    pub fn try_global() -> Option<Arc<SettingsStore>> {
        GLOBAL.get().cloned()
    }

    /// 통째로 교체. 저장에 성공해야 메모리 값도 바뀐다.
    fn replace(&self, config: SettingsConfig) -> Result<(), CoreError> {
        let mut current = self.config.write();
        self.persist(&config)?;
        *current = config;
        Ok(())
    }

    fn persist(&self, config: &SettingsConfig) -> Result<(), CoreError> {
        let content = serde_json::to_string(config)?;
        self.storage.set(SETTINGS_KEY, &content)
    }

    fn read_stored(storage: &dyn KeyValueStore) -> Result<Option<SettingsConfig>, CoreError> {
        match storage.get(SETTINGS_KEY)? {
            Some(content) => {
                let config = serde_json::from_str(&content)
                    .map_err(|e| CoreError::Config(format!("저장된 설정 파싱 실패: {e}")))?;
                Ok(Some(config))
            }
            None => Ok(None),
        }
    }
}

fn expect_installed(cell: &OnceCell<Arc<SettingsStore>>) -> Arc<SettingsStore> {
    match cell.get() {
        Some(store) => store.clone(),
        None => panic!("SettingsStore::global() called before SettingsStore::install()"),
    }
}
