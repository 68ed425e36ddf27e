/// イベント正規化
///
/// S3通知レコードからデコード済みオブジェクトキーとイベント時刻を取り出す。
/// S3は通知内のキーをURLエンコードし、空白を`+`で表すため、
/// `+`を空白に置換してからパーセントデコードする。
use percent_encoding::percent_decode_str;
use thiserror::Error;

use super::storage_event::StorageEventRecord;

/// キーのデコードエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// `%`の後に16進2桁が続いていない
    #[error("不正なパーセントエスケープ（位置 {position}）")]
    MalformedEscape { position: usize },

    /// デコード結果がUTF-8として不正
    #[error("デコード結果が不正なUTF-8です: {0}")]
    InvalidUtf8(#[source] std::str::Utf8Error),
}

/// レコード正規化エラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    /// s3.object.keyが欠損
    #[error("オブジェクトキーが欠損しています")]
    MissingObjectKey,

    /// eventTimeが欠損（作成イベントと条件付き削除でのみ必須）
    #[error("イベント時刻が欠損しています")]
    MissingEventTime,

    /// キーのデコードに失敗
    #[error("オブジェクトキーのデコードに失敗: {0}")]
    Decode(#[from] DecodeError),
}

/// 正規化済みレコード
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRecord {
    /// デコード済みオブジェクトキー
    pub object_key: String,
    /// イベント時刻（検証・整形はしない）
    pub event_time: Option<String>,
}

impl NormalizedRecord {
    /// イベント時刻を必須として取り出す
    pub fn require_event_time(self) -> Result<(String, String), NormalizeError> {
        let event_time = self.event_time.ok_or(NormalizeError::MissingEventTime)?;
        Ok((self.object_key, event_time))
    }
}

/// URLエンコードされたオブジェクトキーをデコード
///
/// `+`を空白に置換した後でパーセントデコードするため、`%2B`はリテラルの`+`になる。
///
/// # 使用例
/// ```
/// use s3_indexer::domain::decode_object_key;
///
/// assert_eq!(decode_object_key("a+b%20c").unwrap(), "a b c");
/// ```
pub fn decode_object_key(raw: &str) -> Result<String, DecodeError> {
    let spaced = raw.replace('+', " ");
    validate_escapes(&spaced)?;

    percent_decode_str(&spaced)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(DecodeError::InvalidUtf8)
}

/// すべての`%`が16進2桁を伴っていることを確認
///
/// percent_encodingは不正なエスケープをそのまま通すため、ここで弾く。
fn validate_escapes(input: &str) -> Result<(), DecodeError> {
    let bytes = input.as_bytes();
    let mut position = 0;

    while position < bytes.len() {
        if bytes[position] == b'%' {
            let well_formed = bytes
                .get(position + 1..position + 3)
                .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit));
            if !well_formed {
                return Err(DecodeError::MalformedEscape { position });
            }
            position += 3;
        } else {
            position += 1;
        }
    }

    Ok(())
}

/// 通知レコードを正規化
///
/// eventTimeの有無はここでは問わない。削除はキーだけで成立するため。
pub fn normalize(record: &StorageEventRecord) -> Result<NormalizedRecord, NormalizeError> {
    let raw_key = record
        .s3
        .object
        .key
        .as_deref()
        .ok_or(NormalizeError::MissingObjectKey)?;

    let object_key = decode_object_key(raw_key)?;

    Ok(NormalizedRecord {
        object_key,
        event_time: record.event_time.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::storage_event::{S3Bucket, S3Entity, S3Object};

    fn record(key: Option<&str>, event_time: Option<&str>, event_name: Option<&str>) -> StorageEventRecord {
        StorageEventRecord {
            event_name: event_name.map(str::to_string),
            event_time: event_time.map(str::to_string),
            s3: S3Entity {
                bucket: S3Bucket {
                    name: Some("serverless-app-bkt".to_string()),
                },
                object: S3Object {
                    key: key.map(str::to_string),
                },
            },
        }
    }

    // ==================== decode_object_key テスト ====================

    #[test]
    fn test_decode_plus_then_percent() {
        assert_eq!(decode_object_key("a+b%20c").unwrap(), "a b c");
    }

    #[test]
    fn test_decode_plain_key_unchanged() {
        assert_eq!(decode_object_key("dir/sub/file.txt").unwrap(), "dir/sub/file.txt");
    }

    #[test]
    fn test_decode_encoded_plus_is_literal_plus() {
        // %2Bは置換後にデコードされるので空白にはならない
        assert_eq!(decode_object_key("c%2B%2B+notes.md").unwrap(), "c++ notes.md");
    }

    #[test]
    fn test_decode_multibyte_utf8() {
        assert_eq!(
            decode_object_key("%E3%81%82%E3%81%84.txt").unwrap(),
            "あい.txt"
        );
    }

    #[test]
    fn test_decode_lowercase_hex() {
        assert_eq!(decode_object_key("a%2fb").unwrap(), "a/b");
    }

    #[test]
    fn test_decode_non_hex_escape() {
        assert_eq!(
            decode_object_key("bad%zzkey").unwrap_err(),
            DecodeError::MalformedEscape { position: 3 }
        );
    }

    #[test]
    fn test_decode_truncated_escape() {
        assert_eq!(
            decode_object_key("trailing%4").unwrap_err(),
            DecodeError::MalformedEscape { position: 8 }
        );
        assert_eq!(
            decode_object_key("trailing%").unwrap_err(),
            DecodeError::MalformedEscape { position: 8 }
        );
    }

    #[test]
    fn test_decode_invalid_utf8() {
        let err = decode_object_key("%FF%FE").unwrap_err();
        assert!(matches!(err, DecodeError::InvalidUtf8(_)));
    }

    #[test]
    fn test_decode_error_display() {
        let err = DecodeError::MalformedEscape { position: 5 };
        assert!(err.to_string().contains("位置 5"));
    }

    // ==================== normalize テスト ====================

    #[test]
    fn test_normalize_success() {
        let rec = record(
            Some("my+photo%281%29.png"),
            Some("2024-01-01T00:00:00.000Z"),
            Some("ObjectCreated:Put"),
        );

        let normalized = normalize(&rec).unwrap();
        assert_eq!(normalized.object_key, "my photo(1).png");
        assert_eq!(normalized.event_time.as_deref(), Some("2024-01-01T00:00:00.000Z"));
    }

    #[test]
    fn test_normalize_keeps_event_time_verbatim() {
        // 時刻は解析・整形しない
        let rec = record(Some("k"), Some("not-a-timestamp"), None);
        assert_eq!(
            normalize(&rec).unwrap().event_time.as_deref(),
            Some("not-a-timestamp")
        );
    }

    #[test]
    fn test_normalize_missing_key() {
        let rec = record(None, Some("2024-01-01T00:00:00Z"), Some("ObjectCreated:Put"));
        assert_eq!(normalize(&rec).unwrap_err(), NormalizeError::MissingObjectKey);
    }

    #[test]
    fn test_normalize_remove_without_event_time() {
        // 削除はキーだけで成立する
        let rec = record(Some("foo.txt"), None, Some("ObjectRemoved:Delete"));

        let normalized = normalize(&rec).unwrap();
        assert_eq!(normalized.object_key, "foo.txt");
        assert_eq!(normalized.event_time, None);
    }

    #[test]
    fn test_require_event_time() {
        let with_time = normalize(&record(Some("a+b"), Some("2024-01-01T00:00:00Z"), None)).unwrap();
        assert_eq!(
            with_time.require_event_time().unwrap(),
            ("a b".to_string(), "2024-01-01T00:00:00Z".to_string())
        );

        let without_time = normalize(&record(Some("a+b"), None, None)).unwrap();
        assert_eq!(
            without_time.require_event_time().unwrap_err(),
            NormalizeError::MissingEventTime
        );
    }

    #[test]
    fn test_normalize_decode_failure() {
        let rec = record(Some("%G0"), Some("2024-01-01T00:00:00Z"), None);
        assert_eq!(
            normalize(&rec).unwrap_err(),
            NormalizeError::Decode(DecodeError::MalformedEscape { position: 0 })
        );
    }
}
