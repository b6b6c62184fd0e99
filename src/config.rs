//! Archive Configuration
//!
//! DB 경로, 쓰기 락 대기 시간, 기본 언어 설정

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ArchiveError, ArchiveResult};

pub const ENV_DB_PATH: &str = "LOC_ARCHIVE_DB_PATH";
pub const ENV_BUSY_TIMEOUT_MS: &str = "LOC_ARCHIVE_BUSY_TIMEOUT_MS";
pub const ENV_DEFAULT_LANGUAGE: &str = "LOC_ARCHIVE_DEFAULT_LANGUAGE";

/// 아카이브 설정
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// SQLite 파일 경로
    pub db_path: PathBuf,
    /// 쓰기 락 대기 한도 (ms). 0이면 즉시 실패
    pub busy_timeout_ms: u64,
    pub default_language: String,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("mods_cache.sqlite"),
            busy_timeout_ms: 5000,
            default_language: "zh-CN".to_string(),
        }
    }
}

impl ArchiveConfig {
    pub fn with_db_path(path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: path.into(),
            ..Self::default()
        }
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    /// JSON 설정 파일 로드 (누락된 필드는 기본값)
    pub fn from_json_file(path: &Path) -> ArchiveResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&text)?;
        Ok(config)
    }

    /// 환경 변수에서 설정 로드
    ///
    /// `.env.local`(상위 디렉토리까지 탐색) → `.env` 순서로 읽은 뒤
    /// `LOC_ARCHIVE_*` 변수를 기본값 위에 덮어씁니다.
    pub fn from_env() -> ArchiveResult<Self> {
        load_dotenv_files();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ArchiveResult<Self> {
        let mut config = Self::default();

        if let Some(path) = non_empty(lookup(ENV_DB_PATH)) {
            config.db_path = PathBuf::from(path);
        }
        if let Some(raw) = non_empty(lookup(ENV_BUSY_TIMEOUT_MS)) {
            config.busy_timeout_ms = raw.trim().parse().map_err(|e| {
                ArchiveError::Config(format!("{} must be an integer: {}", ENV_BUSY_TIMEOUT_MS, e))
            })?;
        }
        if let Some(lang) = non_empty(lookup(ENV_DEFAULT_LANGUAGE)) {
            config.default_language = lang.trim().to_string();
        }

        Ok(config)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn find_upwards(start: PathBuf, filename: &str, max_hops: usize) -> Option<PathBuf> {
    let mut cur = start;
    for _ in 0..=max_hops {
        let candidate = cur.join(filename);
        if candidate.exists() {
            return Some(candidate);
        }
        if !cur.pop() {
            break;
        }
    }
    None
}

fn load_dotenv_files() {
    // 파일이 없을 수 있으므로 실패는 무시
    if let Ok(cwd) = std::env::current_dir() {
        if let Some(path) = find_upwards(cwd, ".env.local", 6) {
            if dotenvy::from_path(&path).is_ok() {
                debug!(path = %path.display(), "loaded env file");
            }
        }
    }
    let _ = dotenvy::dotenv();
}
