// Domain layer modules
pub mod index_row;
pub mod object_key;
pub mod storage_event;
pub mod write_policy;

// Re-exports
pub use index_row::IndexRow;
pub use object_key::{decode_object_key, normalize, DecodeError, NormalizeError, NormalizedRecord};
pub use storage_event::{EventKind, StorageEvent, StorageEventRecord};
pub use write_policy::{WritePolicy, WritePolicyParseError};
