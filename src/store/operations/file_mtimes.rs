use crate::store::keys;
use crate::store::{Store, StoreError};

/// Modification timestamps of imported source files. Written by the
/// file-import collaborator so unchanged files can be skipped.
impl Store {
    pub fn get_file_mtime(&self, file_path: &str) -> Result<Option<i64>, StoreError> {
        let key = keys::file_mtime_key(file_path);
        match self.file_mtimes.get(key.as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn set_file_mtime(&self, file_path: &str, mtime_ns: i64) -> Result<(), StoreError> {
        let key = keys::file_mtime_key(file_path);
        self.file_mtimes
            .insert(key.as_bytes(), Self::serialize(&mtime_ns)?)?;
        Ok(())
    }
}
