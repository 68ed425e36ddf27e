/// S3通知インデクサーLambda関数
///
/// 作成・削除の両方の通知を1つの関数で受け、eventNameで書き込み/削除を振り分ける。
use lambda_runtime::Error;
use s3_indexer::application::Registration;

#[tokio::main]
async fn main() -> Result<(), Error> {
    s3_indexer::run(Registration::Any).await
}
