pub mod audio_cache;
pub mod clusters;
pub mod file_mtimes;
pub mod progress;
pub mod questions;
pub mod sessions;
pub mod stats;
pub mod words;
