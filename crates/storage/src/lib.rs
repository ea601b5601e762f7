#![forbid(unsafe_code)]

pub mod records;
pub mod repository;
pub mod sqlite;

pub use records::{ANALYTICS_STORAGE_KEY, ArticleRecordStore, RecordCodecError};
pub use repository::{InMemoryStore, KeyValueStore, Storage, StorageError, UnavailableStore};
