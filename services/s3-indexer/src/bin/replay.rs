/// S3通知リプレイツール
///
/// 保存しておいたS3通知JSONをローカルから適用する。
/// Lambdaと同じEventSourceBindingを使うため、取りこぼした通知の再投入や
/// DynamoDB Localに対する動作確認に使える。
///
/// # 環境変数
/// - INDEX_TABLE: `--table`未指定時に使用
/// - SOURCE_BUCKET / INDEX_WRITE_POLICY / INDEX_CHANNEL_CAPACITY / DYNAMODB_ENDPOINT_URL: 任意
///
/// 任意項目は常に環境変数から読み、指定したフラグだけがそれを上書きする。
///
/// # ローカル実行
/// ```bash
/// # ファイルから
/// cargo run --bin replay -- --table s3object-table --file event.json
///
/// # 標準入力から、DynamoDB Localに対して
/// cat event.json | cargo run --bin replay -- \
///     --table s3object-table --endpoint-url http://localhost:8000
/// ```
use std::io::Read;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use lambda_runtime::Error;
use s3_indexer::application::{EventSourceBinding, Registration};
use s3_indexer::domain::StorageEvent;
use s3_indexer::infrastructure::{
    build_dynamodb_client, init_logging, DynamoIndexRepository, IndexerConfig,
};
use tracing::info;
use url::Url;

/// 登録種別の指定
#[derive(Debug, Clone, Copy, ValueEnum)]
enum RegistrationArg {
    /// すべてのレコードを作成として扱う
    Created,
    /// すべてのレコードを削除として扱う
    Removed,
    /// eventNameで振り分ける
    Any,
}

impl From<RegistrationArg> for Registration {
    fn from(arg: RegistrationArg) -> Self {
        match arg {
            RegistrationArg::Created => Registration::ObjectCreated,
            RegistrationArg::Removed => Registration::ObjectRemoved,
            RegistrationArg::Any => Registration::Any,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "replay")]
#[command(about = "S3通知JSONをインデックステーブルに適用")]
struct CliArgs {
    /// 通知JSONファイル（省略時は標準入力）
    #[arg(long, short = 'f')]
    file: Option<PathBuf>,

    /// インデックステーブル名（INDEX_TABLEを上書き）
    #[arg(long, short = 't')]
    table: Option<String>,

    /// 対象バケット名
    #[arg(long, short = 'b')]
    bucket: Option<String>,

    /// 書き込みポリシー（last-write-wins / newer-timestamp-wins）
    #[arg(long, short = 'p')]
    policy: Option<String>,

    /// DynamoDBエンドポイントの上書き
    #[arg(long)]
    endpoint_url: Option<String>,

    /// 登録種別
    #[arg(long, short = 'r', value_enum, default_value_t = RegistrationArg::Any)]
    registration: RegistrationArg,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_logging();

    let args = CliArgs::parse();
    let config = build_config(&args)?;

    let payload = match &args.file {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };
    let event: StorageEvent = serde_json::from_str(&payload)?;

    info!(
        table = config.table_name(),
        record_count = event.records.len(),
        "通知のリプレイを開始"
    );

    let client = build_dynamodb_client(config.endpoint_url()).await;
    let repository = DynamoIndexRepository::new(
        client,
        config.table_name().to_string(),
        config.write_policy(),
    );
    let binding = EventSourceBinding::from_config(repository, args.registration.into(), &config);

    let report = binding.handle(event).await;
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}

/// コマンドライン引数で環境変数の設定を上書き
fn build_config(args: &CliArgs) -> Result<IndexerConfig, Error> {
    let mut config = IndexerConfig::from_env_with_table(args.table.clone())?;

    if let Some(bucket) = &args.bucket {
        config = config.with_bucket_name(bucket.clone());
    }
    if let Some(policy) = &args.policy {
        config = config.with_write_policy(policy.parse()?);
    }
    if let Some(endpoint) = &args.endpoint_url {
        config = config.with_endpoint_url(Url::parse(endpoint)?);
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use s3_indexer::domain::WritePolicy;
    use serial_test::serial;

    unsafe fn set_env(key: &str, value: &str) {
        unsafe { std::env::set_var(key, value) };
    }

    fn cleanup() {
        for key in [
            "INDEX_TABLE",
            "SOURCE_BUCKET",
            "INDEX_WRITE_POLICY",
            "INDEX_CHANNEL_CAPACITY",
            "DYNAMODB_ENDPOINT_URL",
        ] {
            // 安全性: #[serial]テスト内からのみ呼ばれる
            unsafe { std::env::remove_var(key) };
        }
    }

    #[test]
    #[serial]
    fn test_build_config_table_flag_keeps_env_values() {
        cleanup();
        // 安全性: #[serial]で直列化
        unsafe {
            set_env("DYNAMODB_ENDPOINT_URL", "http://localhost:8000");
            set_env("INDEX_WRITE_POLICY", "newer-timestamp-wins");
            set_env("INDEX_CHANNEL_CAPACITY", "8");
        }

        let args = CliArgs::parse_from(["replay", "--table", "s3object-table"]);
        let config = build_config(&args).unwrap();

        assert_eq!(config.table_name(), "s3object-table");
        assert_eq!(
            config.endpoint_url().map(Url::as_str),
            Some("http://localhost:8000/")
        );
        assert_eq!(config.write_policy(), WritePolicy::NewerTimestampWins);
        assert_eq!(config.channel_capacity(), 8);

        cleanup();
    }

    #[test]
    #[serial]
    fn test_build_config_flags_override_env() {
        cleanup();
        // 安全性: #[serial]で直列化
        unsafe {
            set_env("INDEX_TABLE", "env-table");
            set_env("SOURCE_BUCKET", "env-bucket");
            set_env("DYNAMODB_ENDPOINT_URL", "http://localhost:8000");
        }

        let args = CliArgs::parse_from([
            "replay",
            "--bucket",
            "flag-bucket",
            "--endpoint-url",
            "http://localhost:9000",
        ]);
        let config = build_config(&args).unwrap();

        assert_eq!(config.table_name(), "env-table");
        assert_eq!(config.bucket_name(), Some("flag-bucket"));
        assert_eq!(
            config.endpoint_url().map(Url::as_str),
            Some("http://localhost:9000/")
        );

        cleanup();
    }

    #[test]
    #[serial]
    fn test_build_config_without_table() {
        cleanup();

        let args = CliArgs::parse_from(["replay"]);
        assert!(build_config(&args).is_err());
    }
}
