use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::keys;
use crate::store::{Store, StoreError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioCacheEntry {
    pub sentence_hash: String,
    pub file_path: String,
    pub tts_backend: String,
    pub created_at: DateTime<Utc>,
}

impl Store {
    pub fn get_audio_cache(&self, sentence_hash: &str) -> Result<Option<AudioCacheEntry>, StoreError> {
        let key = keys::audio_key(sentence_hash);
        match self.audio_cache.get(key.as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn set_audio_cache(
        &self,
        sentence_hash: &str,
        file_path: &str,
        tts_backend: &str,
    ) -> Result<(), StoreError> {
        let entry = AudioCacheEntry {
            sentence_hash: sentence_hash.to_string(),
            file_path: file_path.to_string(),
            tts_backend: tts_backend.to_string(),
            created_at: Utc::now(),
        };
        let key = keys::audio_key(sentence_hash);
        self.audio_cache
            .insert(key.as_bytes(), Self::serialize(&entry)?)?;
        Ok(())
    }

    pub fn list_audio_cache(&self) -> Result<Vec<AudioCacheEntry>, StoreError> {
        let mut out = Vec::new();
        for item in self.audio_cache.iter() {
            let (_, v) = item?;
            out.push(Self::deserialize::<AudioCacheEntry>(&v)?);
        }
        Ok(out)
    }

    pub fn remove_audio_cache(&self, sentence_hash: &str) -> Result<(), StoreError> {
        let key = keys::audio_key(sentence_hash);
        self.audio_cache.remove(key.as_bytes())?;
        Ok(())
    }
}
