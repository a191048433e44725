//! TTS audio caching keyed by a content hash of the narrated sentence.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use sha2::{Digest, Sha256};

use crate::constants::AUDIO_HASH_LEN;
use crate::providers::TtsBackend;
use crate::store::Store;

pub fn sentence_hash(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    hex::encode(digest)[..AUDIO_HASH_LEN].to_string()
}

/// Return cached audio for the sentence, synthesizing and caching it on a
/// miss. Best-effort: errors are logged and `None` is returned so answer
/// processing never fails on narration.
pub async fn get_or_create_audio(
    text: &str,
    tts: &Arc<dyn TtsBackend>,
    store: &Store,
    cache_dir: &Path,
) -> Option<PathBuf> {
    let hash = sentence_hash(text);

    match store.get_audio_cache(&hash) {
        Ok(Some(entry)) => {
            let path = PathBuf::from(&entry.file_path);
            if path.exists() {
                return Some(path);
            }
        }
        Ok(None) => {}
        Err(e) => {
            tracing::warn!(error = %e, "Audio cache lookup failed");
            return None;
        }
    }

    let output = cache_dir.join(format!("{hash}.mp3"));
    if let Err(e) = tts.synthesize(text, &output).await {
        tracing::warn!(error = %e, backend = %tts.id(), "TTS synthesis failed");
        return None;
    }
    if let Err(e) = store.set_audio_cache(&hash, &output.to_string_lossy(), &tts.id()) {
        tracing::warn!(error = %e, "Failed to record audio cache entry");
    }
    Some(output)
}
