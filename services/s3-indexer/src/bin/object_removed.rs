/// S3 ObjectRemoved通知ハンドラー
///
/// バケットからオブジェクトが削除されたとき、インデックステーブルの行を削除する。
use lambda_runtime::Error;
use s3_indexer::application::Registration;

#[tokio::main]
async fn main() -> Result<(), Error> {
    s3_indexer::run(Registration::ObjectRemoved).await
}
