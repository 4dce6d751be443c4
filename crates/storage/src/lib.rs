#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;

pub use repository::{
    AnswerCacheRepository, CacheScope, CachedAnswerRecord, CandidateRecord, CandidateRepository,
    InMemoryRepository, Storage, StorageError,
};
pub use sqlite::{SqliteInitError, SqliteRepository};
