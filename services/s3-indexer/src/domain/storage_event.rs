// S3オブジェクトライフサイクル通知のワイヤ型
//
// Lambdaに届く通知JSONをそのまま受け取るための型。
// 外部から受け取るだけで永続化はしない。
//
// 一部のフィールドが欠けていてもバッチ全体のデシリアライズは失敗させず、
// レコード単位の正規化で扱う。
use serde::{Deserialize, Serialize};

/// S3通知イベント（1回の呼び出しで届くバッチ）
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct StorageEvent {
    /// 通知レコード（欠落時は空バッチ）
    #[serde(rename = "Records", default)]
    pub records: Vec<StorageEventRecord>,
}

/// 通知レコード
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageEventRecord {
    /// イベント名（例: "ObjectCreated:Put"）
    #[serde(default)]
    pub event_name: Option<String>,
    /// イベント時刻（ISO-8601）
    #[serde(default)]
    pub event_time: Option<String>,
    /// S3エンティティ
    #[serde(default)]
    pub s3: S3Entity,
}

/// レコード内のS3エンティティ
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct S3Entity {
    #[serde(default)]
    pub bucket: S3Bucket,
    #[serde(default)]
    pub object: S3Object,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct S3Bucket {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct S3Object {
    /// URLエンコードされたオブジェクトキー（空白は`+`）
    #[serde(default)]
    pub key: Option<String>,
}

/// イベント種別
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// ObjectCreated:*
    Created,
    /// ObjectRemoved:*
    Removed,
    /// それ以外（ObjectRestore、Replication等）
    Unknown,
}

impl EventKind {
    /// イベント名から種別を判定
    ///
    /// S3は "ObjectCreated:Put" のようにサブタイプを付けて送るため前方一致で判定する。
    pub fn from_event_name(event_name: &str) -> Self {
        if event_name.starts_with("ObjectCreated") {
            EventKind::Created
        } else if event_name.starts_with("ObjectRemoved") {
            EventKind::Removed
        } else {
            EventKind::Unknown
        }
    }

    /// ログ用の文字列表現
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Created => "created",
            EventKind::Removed => "removed",
            EventKind::Unknown => "unknown",
        }
    }
}

impl StorageEventRecord {
    /// レコードのイベント種別（eventName欠落時はNone）
    pub fn kind(&self) -> Option<EventKind> {
        self.event_name.as_deref().map(EventKind::from_event_name)
    }

    /// バケット名
    pub fn bucket_name(&self) -> Option<&str> {
        self.s3.bucket.name.as_deref()
    }
}
