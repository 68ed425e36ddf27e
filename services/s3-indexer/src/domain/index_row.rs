// インデックス行
//
// S3オブジェクトキーと最後に観測した作成イベント時刻の対応を表す。
// テーブル上はオブジェクトキーごとに高々1行となる。

/// パーティションキー属性名
pub const OBJECT_KEY_ATTR: &str = "ObjectKey";

/// タイムスタンプ属性名
pub const TIMESTAMP_ATTR: &str = "TimeStamp";

/// インデックステーブルの1行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexRow {
    /// デコード済みのS3オブジェクトキー（主キー）
    pub object_key: String,
    /// イベント時刻（ISO-8601文字列、受信したまま保存）
    pub timestamp: String,
}

impl IndexRow {
    /// 新しいIndexRowを作成
    pub fn new(object_key: impl Into<String>, timestamp: impl Into<String>) -> Self {
        Self {
            object_key: object_key.into(),
            timestamp: timestamp.into(),
        }
    }
}
