//! Key Resolver
//!
//! 키 표기 흔들림(`key:N` 리비전 접미사, 끝의 `:`)과 file_path가 없던 레거시 행을
//! 고려해 소스 항목을 찾습니다.
//!
//! 해석은 고정된 전략 목록을 순서대로 시도하고 처음 일치한 항목을 사용합니다:
//! 정확히 일치 → file_path 완화(레거시) → 리비전 접미사 제거 → 리비전이 붙은 저장 키.
//! 각 전략은 조회 조건만 만드는 순수 함수이며 실제 조회는 [`Database`]가 합니다.

use tracing::{debug, warn};

use crate::db::Database;

/// 키 정규화: 앞뒤 공백 제거, 끝의 `:` 한 개 제거 후 다시 trim
///
/// 리비전 접미사(`:3`)는 키의 일부로 남깁니다.
pub fn normalize(raw_key: &str) -> String {
    let trimmed = raw_key.trim();
    match trimmed.strip_suffix(':') {
        Some(rest) => rest.trim().to_string(),
        None => trimmed.to_string(),
    }
}

/// `foo:3` → `("foo", "3")`. 접미사는 `:` 뒤 ASCII 숫자 1개 이상
pub fn split_revision(key: &str) -> Option<(&str, &str)> {
    let (base, revision) = key.rsplit_once(':')?;
    if base.is_empty() || revision.is_empty() || !revision.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((base, revision))
}

/// 키 일치 방식
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyMatch {
    Exact(String),
    /// 저장된 `base:N` 중 아무 리비전
    AnyRevisionOf(String),
}

impl KeyMatch {
    pub fn matches(&self, stored_key: &str) -> bool {
        match self {
            KeyMatch::Exact(key) => stored_key == key,
            KeyMatch::AnyRevisionOf(base) => {
                matches!(split_revision(stored_key), Some((b, _)) if b == base)
            }
        }
    }
}

/// file_path 범위
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileScope {
    Exact(String),
    /// file_path가 '' 또는 NULL인 레거시 행
    Legacy,
    ExactOrLegacy(String),
}

/// 한 번의 조회 조건
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryLookup {
    pub key: KeyMatch,
    pub file: FileScope,
}

/// 해석 입력 (key는 정규화된 값)
#[derive(Debug, Clone, Copy)]
pub struct ResolveCriteria<'a> {
    pub file_path: &'a str,
    pub key: &'a str,
}

/// 해석 전략
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveStrategy {
    Exact,
    LegacyFilePath,
    StripRevision,
    AnyRevision,
}

impl ResolveStrategy {
    pub const ORDER: [ResolveStrategy; 4] = [
        ResolveStrategy::Exact,
        ResolveStrategy::LegacyFilePath,
        ResolveStrategy::StripRevision,
        ResolveStrategy::AnyRevision,
    ];

    /// 이 전략이 적용되지 않으면 None
    pub fn lookup(self, criteria: ResolveCriteria<'_>) -> Option<EntryLookup> {
        let file = criteria.file_path.to_string();
        match self {
            ResolveStrategy::Exact => Some(EntryLookup {
                key: KeyMatch::Exact(criteria.key.to_string()),
                file: FileScope::Exact(file),
            }),
            ResolveStrategy::LegacyFilePath => Some(EntryLookup {
                key: KeyMatch::Exact(criteria.key.to_string()),
                file: FileScope::Legacy,
            }),
            ResolveStrategy::StripRevision => {
                split_revision(criteria.key).map(|(base, _)| EntryLookup {
                    key: KeyMatch::Exact(base.to_string()),
                    file: FileScope::ExactOrLegacy(file),
                })
            }
            // 리비전이 붙은 조회는 다른 리비전으로 넘어가지 않음
            ResolveStrategy::AnyRevision => match split_revision(criteria.key) {
                Some(_) => None,
                None => Some(EntryLookup {
                    key: KeyMatch::AnyRevisionOf(criteria.key.to_string()),
                    file: FileScope::ExactOrLegacy(file),
                }),
            },
        }
    }
}

/// 해석 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub source_entry_id: i64,
    pub strategy: ResolveStrategy,
}

/// DB 기반 키 해석기
pub struct KeyResolver<'a> {
    db: &'a Database,
}

impl<'a> KeyResolver<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// `(version_id, file_path, key)`에 해당하는 소스 항목 찾기. 못 찾으면 Ok(None)
    pub fn resolve(
        &self,
        version_id: i64,
        file_path: &str,
        raw_key: &str,
    ) -> Result<Option<Resolution>, rusqlite::Error> {
        let key = normalize(raw_key);
        let criteria = ResolveCriteria {
            file_path,
            key: &key,
        };

        for strategy in ResolveStrategy::ORDER {
            let Some(lookup) = strategy.lookup(criteria) else {
                continue;
            };
            if let Some(source_entry_id) = self.db.find_source_entry(version_id, &lookup)? {
                if strategy != ResolveStrategy::Exact {
                    debug!(key = %key, file_path, ?strategy, "key resolved through fallback");
                }
                return Ok(Some(Resolution {
                    source_entry_id,
                    strategy,
                }));
            }
        }

        warn!(version_id, file_path, key = %key, "source entry not found for key");
        Ok(None)
    }
}

/// 메모리 키 인덱스: 키 → (파일명, 파일 내 위치)
///
/// 디스크의 기존 번역 파일을 소스 파일에 바인딩할 때 DB 조회 없이 같은 전략 순서를 씁니다.
/// file_path 범위는 의미가 없으므로 키 전략만 적용됩니다.
#[derive(Debug, Default)]
pub struct KeyIndex {
    entries: Vec<(String, String, usize)>,
}

impl KeyIndex {
    pub fn insert(&mut self, key: &str, filename: &str, position: usize) {
        self.entries
            .push((normalize(key), filename.to_string(), position));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn resolve(&self, raw_key: &str) -> Option<(&str, usize)> {
        let key = normalize(raw_key);
        let criteria = ResolveCriteria { file_path: "", key: &key };

        ResolveStrategy::ORDER
            .iter()
            .filter(|s| **s != ResolveStrategy::LegacyFilePath)
            .filter_map(|s| s.lookup(criteria))
            .find_map(|lookup| {
                self.entries
                    .iter()
                    .find(|(stored, _, _)| lookup.key.matches(stored))
                    .map(|(_, file, pos)| (file.as_str(), *pos))
            })
    }
}
