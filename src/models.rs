//! Archive Data Models
//!
//! 파싱 협력자(로컬라이제이션 파일 파서)와 주고받는 입력 구조 및 아카이브 레코드

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// 파일 이름 -> 번역문 목록 (해당 파일의 key_map 순서와 동일)
pub type FileResults = BTreeMap<String, Vec<String>>;

/// 원본 키 정보 (파서가 만든 key_map 항목)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyInfo {
    /// `key` 또는 `key:0` 형태의 키 헤더
    pub key_part: String,
    #[serde(default)]
    pub line_num: Option<u32>,
}

impl KeyInfo {
    pub fn new(key_part: impl Into<String>) -> Self {
        Self {
            key_part: key_part.into(),
            line_num: None,
        }
    }

    pub fn with_line(key_part: impl Into<String>, line_num: u32) -> Self {
        Self {
            key_part: key_part.into(),
            line_num: Some(line_num),
        }
    }
}

/// 파싱된 소스 파일 하나
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    pub filename: String,
    pub key_map: Vec<KeyInfo>,
    pub texts_to_translate: Vec<String>,
}

impl SourceFile {
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            key_map: Vec::new(),
            texts_to_translate: Vec::new(),
        }
    }

    /// 테스트/글루 코드용 빌더
    pub fn entry(mut self, key: impl Into<String>, text: impl Into<String>) -> Self {
        let line = self.key_map.len() as u32 + 1;
        self.key_map.push(KeyInfo::with_line(key, line));
        self.texts_to_translate.push(text.into());
        self
    }

    /// key_map과 texts_to_translate 길이가 다른지 여부 (짧은 쪽 기준으로 잘림)
    pub fn is_misaligned(&self) -> bool {
        self.key_map.len() != self.texts_to_translate.len()
    }
}

/// 모드 레코드
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModRecord {
    pub mod_id: i64,
    pub name: String,
    pub last_updated: i64,
}

/// 소스 버전(스냅샷) 레코드
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    pub version_id: i64,
    pub mod_id: i64,
    pub snapshot_hash: String,
    pub created_at: i64,
}

/// 버전 요약 (대시보드/진단용)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionSummary {
    #[serde(flatten)]
    pub version: VersionRecord,
    pub entry_count: usize,
    pub files: Vec<String>,
}

/// 언어별 번역 통계
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageStat {
    pub language_code: String,
    pub translated: usize,
}

/// 원문 + 번역(딥 서치 결과)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchivedEntry {
    pub key: String,
    pub original: String,
    pub translation: Option<String>,
}

/// 에디터에서 들어오는 직접 수정
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationUpdate {
    pub key: String,
    #[serde(default)]
    pub translation: String,
}

/// 소스 항목에 바인딩되지 못한 키
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnresolvedKey {
    pub filename: String,
    pub key: String,
}

/// 번역 결과 아카이빙 리포트
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveReport {
    pub archived: usize,
    pub unresolved: Vec<UnresolvedKey>,
    /// 결과에는 있지만 소스 파일 목록에는 없는 파일
    pub unknown_files: Vec<String>,
}

impl ArchiveReport {
    pub fn skipped(&self) -> usize {
        self.unresolved.len()
    }
}
