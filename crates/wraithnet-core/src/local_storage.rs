//! 로컬 키-값 저장소 구현.
//!
//! - [`FileKeyValueStore`]: 디렉토리 안에 키마다 파일 하나
//! - [`MemoryKeyValueStore`]: 프로세스 메모리 (테스트, 일회성 실행)

use parking_lot::RwLock;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::CoreError;
use crate::ports::key_value::KeyValueStore;

/// 파일 기반 저장소
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    dir: PathBuf,
}

impl FileKeyValueStore {
    /// 저장소 디렉토리 지정. 없으면 생성한다.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, CoreError> {
        let dir = dir.into();
        if !dir.exists() {
            fs::create_dir_all(&dir).map_err(|e| {
                CoreError::Storage(format!("저장소 디렉토리 생성 실패: {}: {e}", dir.display()))
            })?;
            info!("저장소 디렉토리 생성: {}", dir.display());
        }
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, CoreError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(CoreError::Storage(format!("허용되지 않는 키: {key:?}")));
        }
        Ok(self.dir.join(key))
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, CoreError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CoreError::Storage(format!(
                "읽기 실패: {}: {e}",
                path.display()
            ))),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CoreError> {
        let path = self.path_for(key)?;
        // 임시 파일에 쓴 뒤 rename. 중간에 끊겨도 이전 값이 남는다
        let tmp = self.dir.join(format!(".{key}.tmp"));
        fs::write(&tmp, value)
            .map_err(|e| CoreError::Storage(format!("쓰기 실패: {}: {e}", tmp.display())))?;
        fs::rename(&tmp, &path)
            .map_err(|e| CoreError::Storage(format!("쓰기 실패: {}: {e}", path.display())))?;
        debug!("저장 완료: {key}");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), CoreError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CoreError::Storage(format!(
                "삭제 실패: {}: {e}",
                path.display()
            ))),
        }
    }
}

/// 메모리 저장소
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, CoreError> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CoreError> {
        self.entries
            .write()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), CoreError> {
        self.entries.write().remove(key);
        Ok(())
    }
}
