//! Translation Import
//!
//! 디스크에 이미 있는 번역 파일(파서가 언어별 `(key, text)` 쌍으로 넘겨줌)을
//! 현재 소스 스냅샷에 바인딩해 아카이브합니다.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::archive::keys::KeyIndex;
use crate::archive::store::{AlignedResults, ArchiveStore};
use crate::error::ArchiveResult;
use crate::models::{ArchiveReport, SourceFile};

/// 한 언어의 번역 파일 내용
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationFile {
    pub language: String,
    pub entries: Vec<(String, String)>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub version_id: i64,
    /// 언어별 소스 키에 매칭된 번역 수
    pub matched: BTreeMap<String, usize>,
    /// 어떤 소스 파일에도 매칭되지 않은 키
    pub unmatched: Vec<String>,
    pub archive: BTreeMap<String, ArchiveReport>,
}

impl ImportReport {
    pub fn match_count(&self) -> usize {
        self.matched.values().sum()
    }
}

/// 기존 번역 가져오기
///
/// 소스 파일로 스냅샷을 만든 뒤(같은 내용이면 재사용) 각 번역 키를
/// 정확히 일치 → 리비전 제거 → 리비전이 붙은 소스 키 순서로 소스 파일에 매칭합니다.
/// 매칭된 번역이 없으면 아무것도 아카이브하지 않습니다.
pub fn import_existing_translations(
    store: &ArchiveStore,
    mod_name: &str,
    remote_id: Option<&str>,
    source_files: &[SourceFile],
    translation_files: &[TranslationFile],
) -> ArchiveResult<ImportReport> {
    let mod_id = store.get_or_create_mod(mod_name, remote_id)?;
    let version_id = store.create_source_version(mod_id, source_files)?;

    let mut index = KeyIndex::default();
    for file in source_files {
        for (position, key_info) in file.key_map.iter().enumerate() {
            index.insert(&key_info.key_part, &file.filename, position);
        }
    }

    let mut report = ImportReport {
        version_id,
        ..ImportReport::default()
    };
    let mut by_language: BTreeMap<String, AlignedResults> = BTreeMap::new();

    for translation in translation_files {
        let results = by_language.entry(translation.language.clone()).or_default();
        for (key, text) in &translation.entries {
            let Some((filename, position)) = index.resolve(key) else {
                report.unmatched.push(key.clone());
                continue;
            };

            let slots = results.entry(filename.to_string()).or_insert_with(|| {
                let len = source_files
                    .iter()
                    .find(|f| f.filename == filename)
                    .map(|f| f.key_map.len())
                    .unwrap_or(0);
                vec![None; len]
            });
            if let Some(slot) = slots.get_mut(position) {
                *slot = Some(text.clone());
                *report.matched.entry(translation.language.clone()).or_default() += 1;
            }
        }
    }

    if report.match_count() == 0 {
        info!(mod_name, "no matching keys found in translation files");
        return Ok(report);
    }

    for (language, results) in &by_language {
        if results.is_empty() {
            continue;
        }
        let archived = store.archive_aligned(version_id, results, source_files, language)?;
        report.archive.insert(language.clone(), archived);
    }

    info!(
        mod_name,
        matched = report.match_count(),
        languages = report.archive.len(),
        "imported existing translations"
    );
    Ok(report)
}
