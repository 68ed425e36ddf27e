use lambda_runtime::{service_fn, Error, LambdaEvent};
use tracing::{error, info};

// Domain layer modules
pub mod domain;

// Application layer modules
pub mod application;

// Infrastructure layer modules
pub mod infrastructure;

use application::{EventSourceBinding, Registration, SyncReport};
use domain::StorageEvent;
use infrastructure::{build_dynamodb_client, init_logging, DynamoIndexRepository, IndexerConfig};

/// S3通知Lambdaを起動する
///
/// 設定とDynamoDBクライアントはコールドスタート時に一度だけ作成し、
/// 以降の呼び出しで参照として共有する。設定エラーは初期化失敗として返す。
pub async fn run(registration: Registration) -> Result<(), Error> {
    init_logging();

    let config = IndexerConfig::from_env().inspect_err(|err| {
        error!(error = %err, "インデクサー設定読み込み失敗");
    })?;

    let client = build_dynamodb_client(config.endpoint_url()).await;
    let repository = DynamoIndexRepository::new(
        client,
        config.table_name().to_string(),
        config.write_policy(),
    );
    let binding = EventSourceBinding::from_config(repository, registration, &config);

    info!(
        registration = registration.as_str(),
        table = config.table_name(),
        bucket = config.bucket_name().unwrap_or("*"),
        write_policy = config.write_policy().as_str(),
        "インデクサー起動"
    );

    let binding = &binding;
    lambda_runtime::run(service_fn(move |event: LambdaEvent<StorageEvent>| async move {
        Ok::<SyncReport, Error>(binding.handle(event.payload).await)
    }))
    .await
}
