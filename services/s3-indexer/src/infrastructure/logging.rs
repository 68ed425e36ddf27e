/// ログ基盤モジュール
///
/// Lambda（CloudWatch Logs）向けにJSON形式の構造化ログを出力する。
use std::sync::Once;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

/// Lambda環境向けのログサブスクライバーを初期化する
///
/// `RUST_LOG`でフィルタ可能（デフォルトはinfo）。複数回呼び出しても初回のみ有効。
///
/// # 使用例
/// ```ignore
/// use s3_indexer::infrastructure::init_logging;
///
/// init_logging();
/// tracing::info!(table = "s3object-table", "インデクサー起動");
/// ```
pub fn init_logging() {
    INIT.call_once(|| {
        let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let json_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .flatten_event(true)
            .with_current_span(false);

        // 既に設定済みのサブスクライバーがあればそちらに出力する
        if let Err(e) = tracing_subscriber::registry()
            .with(env_filter)
            .with(json_layer)
            .try_init()
        {
            tracing::warn!(error = %e, "JSONログサブスクライバーを設定できません");
        }
    });
}

/// テスト用のログサブスクライバーを初期化する（人間が読みやすい形式）
#[cfg(test)]
pub(crate) fn init_test_logging() {
    static TEST_INIT: Once = Once::new();

    TEST_INIT.call_once(|| {
        let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_test_writer()
            .with_target(true)
            .compact();

        let _ = tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init();
    });
}
