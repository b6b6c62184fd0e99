//! Archive Error Types
//!
//! 아카이브 전역 에러 타입 정의

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// 아카이브 에러
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// 연결/초기화 실패. 다음 호출에서 다시 열기를 시도합니다.
    #[error("Archive store unavailable at {path}: {source}")]
    StoreUnavailable {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Archive store is closed")]
    StoreClosed,

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Failed to acquire archive lock: {0}")]
    LockPoisoned(String),

    #[error("Translation failed: {0}")]
    Translation(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl ArchiveError {
    /// 외부 글루(웹 라우트 등)에 노출되는 안정적인 에러 코드
    pub fn code(&self) -> &'static str {
        match self {
            ArchiveError::StoreUnavailable { .. } => "STORE_UNAVAILABLE",
            ArchiveError::StoreClosed => "STORE_CLOSED",
            ArchiveError::Database(_) => "DB_ERROR",
            ArchiveError::Io(_) => "IO_ERROR",
            ArchiveError::Serialization(_) => "SERIALIZATION_ERROR",
            ArchiveError::Config(_) => "CONFIG_ERROR",
            ArchiveError::InvalidInput(_) => "INVALID_INPUT",
            ArchiveError::LockPoisoned(_) => "LOCK_ERROR",
            ArchiveError::Translation(_) => "TRANSLATION_ERROR",
        }
    }
}

/// 직렬화 가능한 에러 응답
#[derive(Debug, Serialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
}

impl From<ArchiveError> for ErrorPayload {
    fn from(error: ArchiveError) -> Self {
        let details = match &error {
            ArchiveError::StoreUnavailable { path, .. } => Some(path.display().to_string()),
            _ => None,
        };

        ErrorPayload {
            code: error.code().to_string(),
            message: error.to_string(),
            details,
        }
    }
}

/// 아카이브 결과 타입
pub type ArchiveResult<T> = Result<T, ArchiveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_carries_code_and_path() {
        let error = ArchiveError::StoreUnavailable {
            path: PathBuf::from("/tmp/archive.sqlite"),
            source: rusqlite::Error::InvalidQuery,
        };
        let payload = ErrorPayload::from(error);

        assert_eq!(payload.code, "STORE_UNAVAILABLE");
        assert_eq!(payload.details.as_deref(), Some("/tmp/archive.sqlite"));
        assert!(payload.message.contains("/tmp/archive.sqlite"));
    }

    #[test]
    fn test_database_error_code() {
        let error: ArchiveError = rusqlite::Error::QueryReturnedNoRows.into();
        assert_eq!(error.code(), "DB_ERROR");
    }
}
