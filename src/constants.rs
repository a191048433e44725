/// Blank marker expected in fill-in-the-blank stems.
pub const BLANK_MARKER: &str = "___";

/// Generation attempts per builder stage before giving up.
pub const MAX_GENERATION_ATTEMPTS: u32 = 3;

/// Sampling temperature for question generation.
pub const GENERATION_TEMPERATURE: f32 = 0.7;

/// Required number of answer choices per question.
pub const CHOICE_COUNT: usize = 4;

/// Minimum cluster size eligible for question generation.
pub const MIN_CLUSTER_SIZE: usize = 4;

/// Interval credit factor for overdue-but-remembered words.
/// effective_interval = scheduled_interval + overdue_days * OVERDUE_DAMPENING
pub const OVERDUE_DAMPENING: f64 = 0.5;

/// Bound on waiting for cancelled build tasks (chat preemption, shutdown).
pub const CANCEL_WAIT_SECS: u64 = 2;

/// Progress stream tick.
pub const PROGRESS_TICK_SECS: u64 = 1;

/// Hex chars kept from the SHA-256 sentence hash for audio file names.
pub const AUDIO_HASH_LEN: usize = 16;
