pub mod keys;
pub mod operations;
pub mod trees;

use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::Db;
use thiserror::Error;

#[derive(Debug)]
pub struct Store {
    db: Db,
    pub words: sled::Tree,
    pub clusters: sled::Tree,
    pub questions: sled::Tree,
    pub word_progress: sled::Tree,
    pub sessions: sled::Tree,
    pub audio_cache: sled::Tree,
    pub file_mtimes: sled::Tree,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("not found: entity={entity}, key={key}")]
    NotFound { entity: String, key: String },
}

impl StoreError {
    pub fn not_found(entity: &str, key: &str) -> Self {
        Self::NotFound {
            entity: entity.to_string(),
            key: key.to_string(),
        }
    }
}

impl Store {
    pub fn open(sled_path: &str) -> Result<Self, StoreError> {
        let db = sled::open(sled_path)?;
        let words = db.open_tree(trees::WORDS)?;
        let clusters = db.open_tree(trees::CLUSTERS)?;
        let questions = db.open_tree(trees::QUESTIONS)?;
        let word_progress = db.open_tree(trees::WORD_PROGRESS)?;
        let sessions = db.open_tree(trees::SESSIONS)?;
        let audio_cache = db.open_tree(trees::AUDIO_CACHE)?;
        let file_mtimes = db.open_tree(trees::FILE_MTIMES)?;

        Ok(Self {
            db,
            words,
            clusters,
            questions,
            word_progress,
            sessions,
            audio_cache,
            file_mtimes,
        })
    }

    pub fn flush(&self) -> Result<(), StoreError> {
        self.db.flush()?;
        Ok(())
    }

    /// Monotonic id source for sessions.
    pub(crate) fn next_id(&self) -> Result<i64, StoreError> {
        let id = self.db.generate_id()?;
        Ok(id as i64)
    }

    pub(crate) fn serialize<T: Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
        Ok(serde_json::to_vec(value)?)
    }

    pub(crate) fn deserialize<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StoreError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
