/// DynamoDBでS3オブジェクトのインデックス行を管理するリポジトリ
///
/// 1回の呼び出しにつき1回の書き込み（PutItem / DeleteItem）だけを発行する。
/// バッチ書き込みや複数キーにまたがるトランザクションは使わない。
use async_trait::async_trait;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoDbClient;
use thiserror::Error;

use crate::domain::index_row::{IndexRow, OBJECT_KEY_ATTR, TIMESTAMP_ATTR};
use crate::domain::WritePolicy;

/// 新しいイベントのみ書き込むための条件式
///
/// 行が存在しないか、保存済みTimeStampがイベント時刻以下の場合に真。
///
/// 削除済みのキーは`attribute_not_exists`で常に真になるため、
/// 削除より後に届いた古い作成イベントは行を復活させる。
pub const NEWER_TIMESTAMP_CONDITION: &str = "attribute_not_exists(#key) OR #ts <= :event_time";

/// ストア書き込みのエラー型
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreWriteError {
    /// PutItemに失敗
    #[error("Put failed: {0}")]
    PutFailed(String),

    /// DeleteItemに失敗
    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    /// 条件付き削除にイベント時刻が渡されなかった
    #[error("Conditional delete requires an event time")]
    MissingEventTime,
}

/// 条件付き削除で使うイベント時刻を取り出す
///
/// 無条件ポリシーでは時刻を使わないので`None`を返す。
fn delete_condition_time<'a>(
    policy: WritePolicy,
    event_time: Option<&'a str>,
) -> Result<Option<&'a str>, StoreWriteError> {
    if !policy.is_conditional() {
        return Ok(None);
    }
    event_time.map(Some).ok_or(StoreWriteError::MissingEventTime)
}

/// 書き込みの結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// 書き込みが反映された（削除対象が存在しなかった場合も含む）
    Applied,
    /// 条件付き書き込みで、より新しい行が存在したため反映されなかった
    ConditionRejected,
}

/// インデックス行の永続化を抽象化するトレイト
///
/// 実際のDynamoDBとテスト用モックを差し替え可能にする。
#[async_trait]
pub trait IndexRepository: Send + Sync {
    /// 行を書き込む（同じキーの行は上書き）
    async fn put(&self, row: &IndexRow) -> Result<WriteOutcome, StoreWriteError>;

    /// キーの行を削除する
    ///
    /// 行が存在しなくてもエラーにしない。`event_time`は条件付き削除にのみ使い、
    /// 条件付きポリシーで`None`の場合は`StoreWriteError::MissingEventTime`を返す。
    async fn delete(
        &self,
        object_key: &str,
        event_time: Option<&str>,
    ) -> Result<WriteOutcome, StoreWriteError>;

    /// ログ用のテーブル名
    fn table_name(&self) -> &str;

    /// 書き込み競合ポリシー
    fn write_policy(&self) -> WritePolicy;
}

/// IndexRepositoryのDynamoDB実装
#[derive(Debug, Clone)]
pub struct DynamoIndexRepository {
    /// DynamoDBクライアント
    client: DynamoDbClient,
    /// インデックステーブル名
    table_name: String,
    /// 書き込み競合ポリシー
    policy: WritePolicy,
}

impl DynamoIndexRepository {
    /// 新しいDynamoIndexRepositoryを作成
    ///
    /// # 引数
    /// * `client` - DynamoDBクライアント
    /// * `table_name` - インデックステーブルの名前
    /// * `policy` - 書き込み競合ポリシー
    pub fn new(client: DynamoDbClient, table_name: String, policy: WritePolicy) -> Self {
        Self {
            client,
            table_name,
            policy,
        }
    }
}

#[async_trait]
impl IndexRepository for DynamoIndexRepository {
    async fn put(&self, row: &IndexRow) -> Result<WriteOutcome, StoreWriteError> {
        let mut request = self
            .client
            .put_item()
            .table_name(&self.table_name)
            .item(OBJECT_KEY_ATTR, AttributeValue::S(row.object_key.clone()))
            .item(TIMESTAMP_ATTR, AttributeValue::S(row.timestamp.clone()));

        if self.policy.is_conditional() {
            request = request
                .condition_expression(NEWER_TIMESTAMP_CONDITION)
                .expression_attribute_names("#key", OBJECT_KEY_ATTR)
                .expression_attribute_names("#ts", TIMESTAMP_ATTR)
                .expression_attribute_values(":event_time", AttributeValue::S(row.timestamp.clone()));
        }

        match request.send().await {
            Ok(_) => Ok(WriteOutcome::Applied),
            Err(e)
                if e
                    .as_service_error()
                    .is_some_and(|se| se.is_conditional_check_failed_exception()) =>
            {
                Ok(WriteOutcome::ConditionRejected)
            }
            Err(e) => Err(StoreWriteError::PutFailed(DisplayErrorContext(&e).to_string())),
        }
    }

    async fn delete(
        &self,
        object_key: &str,
        event_time: Option<&str>,
    ) -> Result<WriteOutcome, StoreWriteError> {
        let condition_time = delete_condition_time(self.policy, event_time)?;
        let mut request = self
            .client
            .delete_item()
            .table_name(&self.table_name)
            .key(OBJECT_KEY_ATTR, AttributeValue::S(object_key.to_string()));

        if let Some(event_time) = condition_time {
            request = request
                .condition_expression(NEWER_TIMESTAMP_CONDITION)
                .expression_attribute_names("#key", OBJECT_KEY_ATTR)
                .expression_attribute_names("#ts", TIMESTAMP_ATTR)
                .expression_attribute_values(":event_time", AttributeValue::S(event_time.to_string()));
        }

        match request.send().await {
            Ok(_) => Ok(WriteOutcome::Applied),
            Err(e)
                if e
                    .as_service_error()
                    .is_some_and(|se| se.is_conditional_check_failed_exception()) =>
            {
                Ok(WriteOutcome::ConditionRejected)
            }
            Err(e) => Err(StoreWriteError::DeleteFailed(DisplayErrorContext(&e).to_string())),
        }
    }

    fn table_name(&self) -> &str {
        &self.table_name
    }

    fn write_policy(&self) -> WritePolicy {
        self.policy
    }
}
