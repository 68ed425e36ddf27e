/// S3 ObjectCreated通知ハンドラー
///
/// バケットにオブジェクトが作成（アップロード）されたとき、
/// オブジェクトキーとイベント時刻をインデックステーブルに書き込む。
use lambda_runtime::Error;
use s3_indexer::application::Registration;

#[tokio::main]
async fn main() -> Result<(), Error> {
    s3_indexer::run(Registration::ObjectCreated).await
}
