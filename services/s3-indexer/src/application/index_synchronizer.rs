// インデックス同期
//
// 正規化済みのイベントを受け取り、インデックス行の書き込み・削除を1回ずつ発行する。
// 書き込み失敗はログに記録して結果として返すだけで、再試行も伝播もしない。
use tracing::{debug, error, info};

use crate::domain::{IndexRow, WritePolicy};
use crate::infrastructure::{IndexRepository, WriteOutcome};

/// 正規化段から同期段へ渡すコマンド
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexCommand {
    /// 行を作成/上書き
    Upsert { object_key: String, event_time: String },
    /// 行を削除（時刻は条件付き削除でのみ使う）
    Remove {
        object_key: String,
        event_time: Option<String>,
    },
}

impl IndexCommand {
    pub fn object_key(&self) -> &str {
        match self {
            IndexCommand::Upsert { object_key, .. } | IndexCommand::Remove { object_key, .. } => {
                object_key
            }
        }
    }

    /// ログ用の操作名
    pub fn operation(&self) -> &'static str {
        match self {
            IndexCommand::Upsert { .. } => "put",
            IndexCommand::Remove { .. } => "delete",
        }
    }
}

/// 1コマンドの同期結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// ストアに反映した
    Written,
    /// より新しい行が存在したため反映しなかった
    Stale,
    /// ストアが書き込みを拒否した（ログ記録済み）
    Failed,
}

/// インデックス同期器
pub struct IndexSynchronizer<R>
where
    R: IndexRepository,
{
    repository: R,
}

impl<R> IndexSynchronizer<R>
where
    R: IndexRepository,
{
    pub fn new(repository: R) -> Self {
        Self { repository }
    }

    /// リポジトリの書き込み競合ポリシー
    pub fn write_policy(&self) -> WritePolicy {
        self.repository.write_policy()
    }

    /// 行を作成/上書きする
    ///
    /// 同じ引数で繰り返し呼んでもストアの観測可能な状態は変わらない。
    pub async fn upsert(&self, object_key: &str, event_time: &str) -> SyncOutcome {
        let table = self.repository.table_name();
        let row = IndexRow::new(object_key, event_time);

        match self.repository.put(&row).await {
            Ok(WriteOutcome::Applied) => {
                info!(
                    table = table,
                    object_key = object_key,
                    event_time = event_time,
                    "インデックス行を書き込み"
                );
                SyncOutcome::Written
            }
            Ok(WriteOutcome::ConditionRejected) => {
                info!(
                    table = table,
                    object_key = object_key,
                    event_time = event_time,
                    "より新しい行が存在するため書き込みをスキップ"
                );
                SyncOutcome::Stale
            }
            Err(e) => {
                error!(
                    operation = "put",
                    table = table,
                    object_key = object_key,
                    error = %e,
                    "インデックス行の書き込みに失敗"
                );
                SyncOutcome::Failed
            }
        }
    }

    /// 行を削除する
    ///
    /// 行が存在しない場合も成功として扱う。
    pub async fn remove(&self, object_key: &str, event_time: Option<&str>) -> SyncOutcome {
        let table = self.repository.table_name();

        match self.repository.delete(object_key, event_time).await {
            Ok(WriteOutcome::Applied) => {
                info!(table = table, object_key = object_key, "インデックス行を削除");
                SyncOutcome::Written
            }
            Ok(WriteOutcome::ConditionRejected) => {
                info!(
                    table = table,
                    object_key = object_key,
                    event_time = event_time,
                    "削除イベントより新しい行が存在するため削除をスキップ"
                );
                SyncOutcome::Stale
            }
            Err(e) => {
                error!(
                    operation = "delete",
                    table = table,
                    object_key = object_key,
                    error = %e,
                    "インデックス行の削除に失敗"
                );
                SyncOutcome::Failed
            }
        }
    }

    /// コマンドを適用
    pub async fn apply(&self, command: &IndexCommand) -> SyncOutcome {
        debug!(
            operation = command.operation(),
            object_key = command.object_key(),
            "コマンド適用"
        );

        match command {
            IndexCommand::Upsert {
                object_key,
                event_time,
            } => self.upsert(object_key, event_time).await,
            IndexCommand::Remove {
                object_key,
                event_time,
            } => self.remove(object_key, event_time.as_deref()).await,
        }
    }
}
