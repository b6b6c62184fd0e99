//! Snapshot Hasher
//!
//! 소스 파일 묶음의 번역 대상 텍스트로 버전 식별용 SHA-256 지문을 계산합니다.
//! 키는 해시에 포함하지 않습니다 (텍스트가 같으면 키 이름만 바뀌어도 같은 버전).

use sha2::{Digest, Sha256};

use crate::models::SourceFile;

/// 파일명 순으로 정렬한 뒤 각 텍스트의 UTF-8 바이트를 순서대로 넣은 SHA-256 hex
///
/// 구분자 없이 이어 붙이므로 기존 아카이브의 해시와 호환됩니다.
pub fn snapshot_hash(files: &[SourceFile]) -> String {
    let mut sorted: Vec<&SourceFile> = files.iter().collect();
    sorted.sort_by(|a, b| a.filename.cmp(&b.filename));

    let mut hasher = Sha256::new();
    for file in sorted {
        for text in &file.texts_to_translate {
            hasher.update(text.as_bytes());
        }
    }
    format!("{:x}", hasher.finalize())
}

/// 로그용 짧은 해시
pub fn short_hash(hash: &str) -> &str {
    hash.get(..7).unwrap_or(hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<SourceFile> {
        vec![
            SourceFile::new("events_l_english.yml").entry("e.1.t", "The Storm").entry("e.1.d", "Rain falls."),
            SourceFile::new("b_l_english.yml").entry("b.1", "Bye"),
            SourceFile::new("a_l_english.yml").entry("a.1", "Hello"),
        ]
    }

    #[test]
    fn test_order_independent() {
        let files = sample();
        let mut reversed = files.clone();
        reversed.reverse();
        let mut rotated = files.clone();
        rotated.rotate_left(1);

        let expected = snapshot_hash(&files);
        assert_eq!(snapshot_hash(&reversed), expected);
        assert_eq!(snapshot_hash(&rotated), expected);
        assert_eq!(expected.len(), 64);
    }

    #[test]
    fn test_single_character_change_changes_hash() {
        let files = sample();
        let mut edited = files.clone();
        edited[0].texts_to_translate[1] = "Rain falls!".to_string();

        assert_ne!(snapshot_hash(&files), snapshot_hash(&edited));
    }

    #[test]
    fn test_added_text_changes_hash() {
        let files = sample();
        let mut extended = files.clone();
        extended[1] = extended[1].clone().entry("b.2", "See you");

        assert_ne!(snapshot_hash(&files), snapshot_hash(&extended));
    }

    #[test]
    fn test_keys_do_not_affect_hash() {
        let files = sample();
        let mut renamed = files.clone();
        renamed[2].key_map[0].key_part = "a.renamed".to_string();

        assert_eq!(snapshot_hash(&files), snapshot_hash(&renamed));
    }

    #[test]
    fn test_known_digest_for_empty_set() {
        assert_eq!(
            snapshot_hash(&[]),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(short_hash("abc"), "abc");
    }
}
