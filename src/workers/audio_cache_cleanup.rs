use std::path::Path;

use crate::store::Store;

/// Drop audio cache rows whose files no longer exist on disk.
pub async fn run(store: &Store) {
    let entries = match store.list_audio_cache() {
        Ok(entries) => entries,
        Err(e) => {
            tracing::error!(error = %e, "Audio cache cleanup failed to list entries");
            return;
        }
    };

    let mut removed = 0usize;
    for entry in entries {
        if Path::new(&entry.file_path).exists() {
            continue;
        }
        match store.remove_audio_cache(&entry.sentence_hash) {
            Ok(()) => removed += 1,
            Err(e) => {
                tracing::warn!(error = %e, hash = %entry.sentence_hash, "Failed to drop cache row");
            }
        }
    }
    if removed > 0 {
        tracing::info!(removed, "Audio cache cleanup removed stale entries");
    }
}
