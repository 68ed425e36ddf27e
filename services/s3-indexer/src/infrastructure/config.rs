/// インデクサー設定
///
/// Lambdaのコールドスタート時に環境変数から一度だけ読み込み、
/// 以降は値として各コンポーネントに渡す。
use aws_sdk_dynamodb::Client as DynamoDbClient;
use thiserror::Error;
use url::Url;

use crate::domain::{WritePolicy, WritePolicyParseError};

/// チャネル容量のデフォルト値
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// 設定のエラー型
#[derive(Debug, Error)]
pub enum IndexerConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid write policy: {0}")]
    InvalidWritePolicy(#[from] WritePolicyParseError),

    #[error("Invalid channel capacity: {0}")]
    InvalidChannelCapacity(String),

    #[error("Invalid endpoint URL: {0}")]
    InvalidEndpointUrl(#[from] url::ParseError),
}

/// インデクサー設定
///
/// 環境変数:
/// - INDEX_TABLE: インデックス用DynamoDBテーブル名（必須）
/// - SOURCE_BUCKET: 対象バケット名（任意、指定時は他バケットのレコードをスキップ）
/// - INDEX_WRITE_POLICY: `last-write-wins`（デフォルト）または `newer-timestamp-wins`
/// - INDEX_CHANNEL_CAPACITY: 正規化段と同期段の間のチャネル容量（デフォルト: 64）
/// - DYNAMODB_ENDPOINT_URL: DynamoDBエンドポイントの上書き（DynamoDB Local等）
#[derive(Debug, Clone, PartialEq)]
pub struct IndexerConfig {
    table_name: String,
    bucket_name: Option<String>,
    write_policy: WritePolicy,
    channel_capacity: usize,
    endpoint_url: Option<Url>,
}

impl IndexerConfig {
    /// テーブル名だけを指定して残りをデフォルト値で作成
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            bucket_name: None,
            write_policy: WritePolicy::default(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            endpoint_url: None,
        }
    }

    /// 環境変数から設定を読み込み
    pub fn from_env() -> Result<Self, IndexerConfigError> {
        Self::from_env_with_table(None)
    }

    /// 環境変数から設定を読み込み、テーブル名だけを差し替える
    ///
    /// `table_name`指定時はINDEX_TABLEを読まない。その他の任意項目は常に環境変数から読む。
    pub fn from_env_with_table(table_name: Option<String>) -> Result<Self, IndexerConfigError> {
        let table_name = match table_name {
            Some(table_name) => table_name,
            None => std::env::var("INDEX_TABLE")
                .map_err(|_| IndexerConfigError::MissingEnvVar("INDEX_TABLE".to_string()))?,
        };

        let mut config = Self::new(table_name);

        if let Some(bucket) = non_empty_var("SOURCE_BUCKET") {
            config = config.with_bucket_name(bucket);
        }

        if let Some(policy) = non_empty_var("INDEX_WRITE_POLICY") {
            config = config.with_write_policy(policy.parse()?);
        }

        if let Some(capacity) = non_empty_var("INDEX_CHANNEL_CAPACITY") {
            config = config.with_channel_capacity(parse_capacity(&capacity)?);
        }

        if let Some(endpoint) = non_empty_var("DYNAMODB_ENDPOINT_URL") {
            config = config.with_endpoint_url(Url::parse(&endpoint)?);
        }

        Ok(config)
    }

    pub fn with_bucket_name(mut self, bucket_name: impl Into<String>) -> Self {
        self.bucket_name = Some(bucket_name.into());
        self
    }

    pub fn with_write_policy(mut self, write_policy: WritePolicy) -> Self {
        self.write_policy = write_policy;
        self
    }

    pub fn with_channel_capacity(mut self, channel_capacity: usize) -> Self {
        self.channel_capacity = channel_capacity;
        self
    }

    pub fn with_endpoint_url(mut self, endpoint_url: Url) -> Self {
        self.endpoint_url = Some(endpoint_url);
        self
    }

    /// インデックステーブル名を取得
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// 対象バケット名を取得
    pub fn bucket_name(&self) -> Option<&str> {
        self.bucket_name.as_deref()
    }

    pub fn write_policy(&self) -> WritePolicy {
        self.write_policy
    }

    pub fn channel_capacity(&self) -> usize {
        self.channel_capacity
    }

    pub fn endpoint_url(&self) -> Option<&Url> {
        self.endpoint_url.as_ref()
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_capacity(value: &str) -> Result<usize, IndexerConfigError> {
    match value.trim().parse::<usize>() {
        Ok(capacity) if capacity > 0 => Ok(capacity),
        _ => Err(IndexerConfigError::InvalidChannelCapacity(value.to_string())),
    }
}

/// 環境からAWS設定を読み込み、DynamoDBクライアントを作成
///
/// 認証情報・リージョンはaws-configのデフォルトチェーンから取得する。
/// `endpoint_url`指定時はエンドポイントを上書きする。
pub async fn build_dynamodb_client(endpoint_url: Option<&Url>) -> DynamoDbClient {
    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;

    let mut builder = aws_sdk_dynamodb::config::Builder::from(&aws_config);
    if let Some(url) = endpoint_url {
        builder = builder.endpoint_url(url.as_str());
    }

    DynamoDbClient::from_conf(builder.build())
}
