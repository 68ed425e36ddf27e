// イベントソースバインディング
//
// S3バケットの作成/削除通知に対する反応を定義する。
// 1回の呼び出しで届いたバッチを、正規化段と同期段の2段パイプラインで処理する。
//
// # 処理フロー
// 1. 正規化段: レコードごとにバケット確認・キーのデコードを行い、IndexCommandをチャネルに送信
// 2. 同期段: チャネルからコマンドを受け取り、IndexSynchronizerで1件ずつ書き込む
// 3. 両段の完了を待ってから集計結果（SyncReport）を返す
//
// 不正なレコードや書き込み失敗はレコード単位でログに記録し、バッチ処理は継続する。
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::index_synchronizer::{IndexCommand, IndexSynchronizer, SyncOutcome};
use crate::domain::{normalize, EventKind, NormalizeError, StorageEvent, StorageEventRecord};
use crate::infrastructure::config::DEFAULT_CHANNEL_CAPACITY;
use crate::infrastructure::{IndexRepository, IndexerConfig};

/// 通知の登録種別
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// バケットのObjectCreated通知に登録（すべてのレコードを作成として扱う）
    ObjectCreated,
    /// バケットのObjectRemoved通知に登録（すべてのレコードを削除として扱う）
    ObjectRemoved,
    /// 両方に登録し、eventNameで振り分ける
    Any,
}

impl Registration {
    pub fn as_str(&self) -> &'static str {
        match self {
            Registration::ObjectCreated => "object_created",
            Registration::ObjectRemoved => "object_removed",
            Registration::Any => "any",
        }
    }

    /// レコードの種別から実行する操作を決める
    fn resolve(&self, kind: Option<EventKind>) -> Result<Operation, &'static str> {
        match (self, kind) {
            (Registration::ObjectCreated, None | Some(EventKind::Created)) => Ok(Operation::Upsert),
            (Registration::ObjectRemoved, None | Some(EventKind::Removed)) => Ok(Operation::Remove),
            (Registration::Any, Some(EventKind::Created)) => Ok(Operation::Upsert),
            (Registration::Any, Some(EventKind::Removed)) => Ok(Operation::Remove),
            (Registration::Any, None) => Err("eventNameがありません"),
            (_, Some(EventKind::Unknown)) => Err("対象外のイベントタイプ"),
            (Registration::ObjectCreated, Some(EventKind::Removed)) => {
                Err("作成用の登録に削除イベントが届きました")
            }
            (Registration::ObjectRemoved, Some(EventKind::Created)) => {
                Err("削除用の登録に作成イベントが届きました")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Upsert,
    Remove,
}

/// レコードをコマンドにできなかった理由
#[derive(Debug)]
enum Rejection {
    /// 対象外（他バケット、種別不一致等）
    Skipped(String),
    /// 正規化に失敗
    Malformed(NormalizeError),
}

/// 正規化段の集計
#[derive(Debug, Default)]
struct IntakeSummary {
    skip_count: usize,
    malformed_count: usize,
}

/// バッチ処理の結果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// 受信したレコード数
    pub record_count: usize,
    /// ストアに反映したレコード数
    pub success_count: usize,
    /// より新しい行があり反映しなかったレコード数
    pub stale_count: usize,
    /// 書き込みに失敗したレコード数
    pub failure_count: usize,
    /// 対象外としてスキップしたレコード数
    pub skip_count: usize,
    /// 正規化に失敗したレコード数
    pub malformed_count: usize,
}

/// S3通知とインデックス同期器の結び付け
pub struct EventSourceBinding<R>
where
    R: IndexRepository,
{
    synchronizer: IndexSynchronizer<R>,
    registration: Registration,
    /// 指定時はこのバケット以外のレコードをスキップ
    bucket_filter: Option<String>,
    channel_capacity: usize,
}

impl<R> EventSourceBinding<R>
where
    R: IndexRepository,
{
    pub fn new(synchronizer: IndexSynchronizer<R>, registration: Registration) -> Self {
        Self {
            synchronizer,
            registration,
            bucket_filter: None,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    /// 設定からバインディングを作成
    pub fn from_config(repository: R, registration: Registration, config: &IndexerConfig) -> Self {
        let mut binding = Self::new(IndexSynchronizer::new(repository), registration)
            .with_channel_capacity(config.channel_capacity());
        if let Some(bucket) = config.bucket_name() {
            binding = binding.with_bucket_filter(bucket);
        }
        binding
    }

    pub fn with_bucket_filter(mut self, bucket: impl Into<String>) -> Self {
        self.bucket_filter = Some(bucket.into());
        self
    }

    pub fn with_channel_capacity(mut self, channel_capacity: usize) -> Self {
        // mpsc::channelは容量0でパニックする
        self.channel_capacity = channel_capacity.max(1);
        self
    }

    pub fn registration(&self) -> Registration {
        self.registration
    }

    /// 1回の呼び出しで届いたバッチを処理
    ///
    /// 設定を読み込めていれば常に完了し、レコード単位の失敗はSyncReportの件数に反映する。
    pub async fn handle(&self, event: StorageEvent) -> SyncReport {
        let record_count = event.records.len();
        info!(
            registration = self.registration.as_str(),
            record_count = record_count,
            "S3イベントを受信"
        );

        let (tx, rx) = mpsc::channel(self.channel_capacity);
        let (intake, mut report) = tokio::join!(self.enqueue(event.records, tx), self.drain(rx));

        report.record_count = record_count;
        report.skip_count = intake.skip_count;
        report.malformed_count = intake.malformed_count;

        info!(
            registration = self.registration.as_str(),
            success_count = report.success_count,
            stale_count = report.stale_count,
            failure_count = report.failure_count,
            skip_count = report.skip_count,
            malformed_count = report.malformed_count,
            "S3イベント処理完了"
        );

        report
    }

    /// 正規化段: レコードをコマンドに変換して送信
    ///
    /// `tx`はこの関数の終了時にドロップされ、同期段のループが終了する。
    async fn enqueue(
        &self,
        records: Vec<StorageEventRecord>,
        tx: mpsc::Sender<IndexCommand>,
    ) -> IntakeSummary {
        let mut summary = IntakeSummary::default();

        for record in &records {
            match self.to_command(record) {
                Ok(command) => {
                    if let Err(e) = tx.send(command).await {
                        // 受信側はチャネルが閉じるまで動くため通常は起こらない
                        warn!(object_key = e.0.object_key(), "同期段が停止しているためコマンドを送信できません");
                        summary.skip_count += 1;
                    }
                }
                Err(Rejection::Skipped(reason)) => {
                    debug!(
                        reason = %reason,
                        kind = record.kind().map_or("none", |kind| kind.as_str()),
                        "レコードをスキップ"
                    );
                    summary.skip_count += 1;
                }
                Err(Rejection::Malformed(e)) => {
                    warn!(
                        raw_key = record.s3.object.key.as_deref().unwrap_or(""),
                        error = %e,
                        "レコードの正規化に失敗"
                    );
                    summary.malformed_count += 1;
                }
            }
        }

        summary
    }

    /// 同期段: チャネルが閉じるまでコマンドを適用
    async fn drain(&self, mut rx: mpsc::Receiver<IndexCommand>) -> SyncReport {
        let mut report = SyncReport::default();

        while let Some(command) = rx.recv().await {
            match self.synchronizer.apply(&command).await {
                SyncOutcome::Written => report.success_count += 1,
                SyncOutcome::Stale => report.stale_count += 1,
                SyncOutcome::Failed => report.failure_count += 1,
            }
        }

        report
    }

    fn to_command(&self, record: &StorageEventRecord) -> Result<IndexCommand, Rejection> {
        if let (Some(expected), Some(actual)) = (self.bucket_filter.as_deref(), record.bucket_name()) {
            if expected != actual {
                return Err(Rejection::Skipped(format!("対象外のバケット: {}", actual)));
            }
        }

        let operation = self
            .registration
            .resolve(record.kind())
            .map_err(|reason| Rejection::Skipped(reason.to_string()))?;

        let normalized = normalize(record).map_err(Rejection::Malformed)?;

        // 時刻は作成と条件付き削除でのみ必須
        match operation {
            Operation::Upsert => {
                let (object_key, event_time) =
                    normalized.require_event_time().map_err(Rejection::Malformed)?;
                Ok(IndexCommand::Upsert {
                    object_key,
                    event_time,
                })
            }
            Operation::Remove if self.synchronizer.write_policy().is_conditional() => {
                let (object_key, event_time) =
                    normalized.require_event_time().map_err(Rejection::Malformed)?;
                Ok(IndexCommand::Remove {
                    object_key,
                    event_time: Some(event_time),
                })
            }
            Operation::Remove => Ok(IndexCommand::Remove {
                object_key: normalized.object_key,
                event_time: normalized.event_time,
            }),
        }
    }
}
