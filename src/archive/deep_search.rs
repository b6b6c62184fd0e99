//! Deep Search
//!
//! 최신 버전의 파일 항목을 기준으로, 모드의 모든 과거 버전에서 번역을 찾아 붙입니다.
//! 버전이 올라가도 원문이 그대로인 키는 이전 번역이 유지됩니다.

use std::collections::HashMap;

use crate::db::Database;
use crate::models::ArchivedEntry;

/// 경로에서 파일 이름만 추출 (`/`, `\` 모두 구분자로 취급)
pub fn basename(file_path: &str) -> &str {
    file_path.rsplit(['/', '\\']).next().unwrap_or(file_path)
}

pub struct DeepSearchResolver<'a> {
    db: &'a Database,
}

impl<'a> DeepSearchResolver<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// `[{key, original, translation}]` (최신 버전 항목 순서)
    ///
    /// 모드나 버전, 파일 항목이 없으면 빈 목록
    pub fn get_entries(
        &self,
        mod_name: &str,
        file_path: &str,
        language: &str,
    ) -> Result<Vec<ArchivedEntry>, rusqlite::Error> {
        let Some(record) = self.db.get_mod_by_name(mod_name)? else {
            return Ok(Vec::new());
        };
        let Some(version) = self.db.latest_version(record.mod_id)? else {
            return Ok(Vec::new());
        };

        let filename = basename(file_path);
        let current = self.db.source_entries_for_file(version.version_id, filename)?;
        if current.is_empty() {
            return Ok(Vec::new());
        }

        let translations = self.translation_map(record.mod_id, filename, language)?;

        Ok(current
            .into_iter()
            .map(|row| ArchivedEntry {
                translation: translations.get(&row.entry_key).cloned(),
                key: row.entry_key,
                original: row.source_text,
            })
            .collect())
    }

    /// entry_key -> 가장 최근 번역 (오래된 순 조회를 접어서 마지막 쓰기가 이김)
    fn translation_map(
        &self,
        mod_id: i64,
        filename: &str,
        language: &str,
    ) -> Result<HashMap<String, String>, rusqlite::Error> {
        let mut map = HashMap::new();
        for (key, text) in self.db.translation_history_for_file(mod_id, filename, language)? {
            map.insert(key, text);
        }
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::TranslationUpsert;
    use crate::models::SourceFile;

    fn setup() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        db
    }

    fn translate(db: &Database, version_id: i64, file: &str, key: &str, text: &str, lang: &str) {
        let id = db
            .source_entries_for_file(version_id, file)
            .unwrap()
            .into_iter()
            .find(|r| r.entry_key == key)
            .unwrap()
            .source_entry_id;
        db.upsert_translations(
            lang,
            &[TranslationUpsert {
                source_entry_id: id,
                translated_text: text.to_string(),
            }],
        )
        .unwrap();
    }

    #[test]
    fn test_basename() {
        assert_eq!(basename("J:/ignored/events_l_english.yml"), "events_l_english.yml");
        assert_eq!(basename(r"C:\mods\a.yml"), "a.yml");
        assert_eq!(basename("a.yml"), "a.yml");
    }

    #[test]
    fn test_recovers_translation_from_older_version() {
        let db = setup();
        let mod_id = db.get_or_create_mod("Alpha", None).unwrap();
        let v1 = db
            .create_source_version(mod_id, &[SourceFile::new("a.yml").entry("k1", "Hello")])
            .unwrap()
            .version_id;
        translate(&db, v1, "a.yml", "k1", "你好", "zh-CN");

        let v2 = db
            .create_source_version(
                mod_id,
                &[SourceFile::new("a.yml").entry("k1", "Hello").entry("k2", "Bye")],
            )
            .unwrap()
            .version_id;
        assert_ne!(v1, v2);

        let entries = DeepSearchResolver::new(&db)
            .get_entries("Alpha", "some/dir/a.yml", "zh-CN")
            .unwrap();
        assert_eq!(
            entries,
            vec![
                ArchivedEntry { key: "k1".into(), original: "Hello".into(), translation: Some("你好".into()) },
                ArchivedEntry { key: "k2".into(), original: "Bye".into(), translation: None },
            ]
        );
    }

    #[test]
    fn test_latest_write_wins_across_versions() {
        let db = setup();
        let mod_id = db.get_or_create_mod("Alpha", None).unwrap();
        let v1 = db
            .create_source_version(mod_id, &[SourceFile::new("a.yml").entry("k1", "Hello")])
            .unwrap()
            .version_id;
        let v2 = db
            .create_source_version(mod_id, &[SourceFile::new("a.yml").entry("k1", "Hello!")])
            .unwrap()
            .version_id;

        translate(&db, v2, "a.yml", "k1", "新", "zh-CN");
        std::thread::sleep(std::time::Duration::from_millis(5));
        translate(&db, v1, "a.yml", "k1", "旧的修正", "zh-CN");

        let entries = DeepSearchResolver::new(&db).get_entries("Alpha", "a.yml", "zh-CN").unwrap();
        assert_eq!(entries[0].original, "Hello!");
        assert_eq!(entries[0].translation.as_deref(), Some("旧的修正"));
    }

    #[test]
    fn test_language_and_mod_scoping() {
        let db = setup();
        let alpha = db.get_or_create_mod("Alpha", None).unwrap();
        let beta = db.get_or_create_mod("Beta", None).unwrap();
        let va = db
            .create_source_version(alpha, &[SourceFile::new("a.yml").entry("k1", "Hello")])
            .unwrap()
            .version_id;
        db.create_source_version(beta, &[SourceFile::new("a.yml").entry("k1", "Hallo")])
            .unwrap();
        translate(&db, va, "a.yml", "k1", "你好", "zh-CN");

        let resolver = DeepSearchResolver::new(&db);
        assert_eq!(resolver.get_entries("Beta", "a.yml", "zh-CN").unwrap()[0].translation, None);
        assert_eq!(resolver.get_entries("Alpha", "a.yml", "ko").unwrap()[0].translation, None);
    }

    #[test]
    fn test_missing_pieces_return_empty() {
        let db = setup();
        let resolver = DeepSearchResolver::new(&db);
        assert!(resolver.get_entries("Nobody", "a.yml", "zh-CN").unwrap().is_empty());

        db.get_or_create_mod("Alpha", None).unwrap();
        assert!(resolver.get_entries("Alpha", "a.yml", "zh-CN").unwrap().is_empty());

        let mod_id = db.get_mod_by_name("Alpha").unwrap().unwrap().mod_id;
        db.create_source_version(mod_id, &[SourceFile::new("a.yml").entry("k1", "x")])
            .unwrap();
        assert!(resolver.get_entries("Alpha", "b.yml", "zh-CN").unwrap().is_empty());
    }
}
