// アプリケーション層モジュール
pub mod event_binding;
pub mod index_synchronizer;

// 再エクスポート
pub use event_binding::{EventSourceBinding, Registration, SyncReport};
pub use index_synchronizer::{IndexCommand, IndexSynchronizer, SyncOutcome};
