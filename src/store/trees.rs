pub const WORDS: &str = "words";
pub const CLUSTERS: &str = "clusters";
pub const QUESTIONS: &str = "questions";
pub const WORD_PROGRESS: &str = "word_progress";
pub const SESSIONS: &str = "sessions";
pub const AUDIO_CACHE: &str = "audio_cache";
pub const FILE_MTIMES: &str = "file_mtimes";
