use std::env;
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    pub enable_file_logs: bool,
    pub log_dir: String,
    pub sled_path: String,
    pub cors_origin: String,
    pub auto_import: bool,
    pub training: TrainingConfig,
    pub generation: GenerationConfig,
    pub tts: TtsConfig,
    pub worker: WorkerConfig,
    pub limits: LimitsConfig,
}

#[derive(Debug, Clone)]
pub struct TrainingConfig {
    /// Soft target number of questions per session.
    pub session_size: usize,
    /// Buffer target floor for ready (unanswered) questions.
    pub min_ready_questions: usize,
    /// SRS interval (days) at which a correct answer archives the pair.
    pub archive_interval_days: f64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            session_size: 20,
            min_ready_questions: 3,
            archive_interval_days: 21.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GenerationConfig {
    /// Backend selector: "ollama" or "mock".
    pub backend: String,
    pub model: String,
    pub ollama_url: String,
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            backend: "ollama".to_string(),
            model: "qwen3:8b".to_string(),
            ollama_url: "http://localhost:11434".to_string(),
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TtsConfig {
    /// Backend selector: "none" or "mock".
    pub backend: String,
    pub voice: String,
    pub audio_cache_dir: String,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            backend: "none".to_string(),
            voice: "en-US-GuyNeural".to_string(),
            audio_cache_dir: "./data/audio_cache".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub is_leader: bool,
}

#[derive(Debug, Clone)]
pub struct LimitsConfig {
    pub max_review_pool: usize,
    pub max_generation_batch: usize,
    pub max_sse_connections: usize,
    pub enrichment_words_min: usize,
    pub enrichment_words_max: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_review_pool: 200,
            max_generation_batch: 50,
            max_sse_connections: 100,
            enrichment_words_min: 5,
            enrichment_words_max: 10,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let config = Self {
            host: env_or_parse("HOST", IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))),
            port: env_or_parse("PORT", 3000_u16),
            log_level: env_or("RUST_LOG", "info"),
            enable_file_logs: env_or_bool("ENABLE_FILE_LOGS", false),
            log_dir: env_or("LOG_DIR", "./logs"),
            sled_path: normalized_sled_path(&env_or("SLED_PATH", "./data/vocab.sled")),
            cors_origin: env_or("CORS_ORIGIN", "http://localhost:5173"),
            auto_import: env_or_bool("AUTO_IMPORT", false),
            training: TrainingConfig {
                session_size: env_or_parse("SESSION_SIZE", 20_usize),
                min_ready_questions: env_or_parse("MIN_READY_QUESTIONS", 3_usize),
                archive_interval_days: env_or_parse("ARCHIVE_INTERVAL_DAYS", 21.0_f64),
            },
            generation: GenerationConfig {
                backend: env_or("GENERATION_BACKEND", "ollama"),
                model: env_or("GENERATION_MODEL", "qwen3:8b"),
                ollama_url: env_or("OLLAMA_URL", "http://localhost:11434"),
                timeout_secs: env_or_parse("GENERATION_TIMEOUT_SECS", 120_u64),
            },
            tts: TtsConfig {
                backend: env_or("TTS_BACKEND", "none"),
                voice: env_or("TTS_VOICE", "en-US-GuyNeural"),
                audio_cache_dir: env_or("AUDIO_CACHE_DIR", "./data/audio_cache"),
            },
            worker: WorkerConfig {
                is_leader: env_or_bool("WORKER_LEADER", true),
            },
            limits: LimitsConfig {
                max_review_pool: env_or_parse("LIMITS_MAX_REVIEW_POOL", 200_usize),
                max_generation_batch: env_or_parse("LIMITS_MAX_GENERATION_BATCH", 50_usize),
                max_sse_connections: env_or_parse("LIMITS_MAX_SSE_CONNECTIONS", 100_usize),
                enrichment_words_min: env_or_parse("LIMITS_ENRICHMENT_MIN", 5_usize),
                enrichment_words_max: env_or_parse("LIMITS_ENRICHMENT_MAX", 10_usize),
            },
        };

        config.validate();
        config
    }

    pub fn validate(&self) {
        if self.training.session_size == 0 {
            panic!("FATAL: SESSION_SIZE must be at least 1");
        }
        if self.training.archive_interval_days < 1.0 {
            panic!("FATAL: ARCHIVE_INTERVAL_DAYS must be at least 1");
        }
        match self.generation.backend.as_str() {
            "ollama" | "mock" => {}
            other => panic!(
                "FATAL: Unknown GENERATION_BACKEND '{other}'. \
                 Supported backends: ollama, mock."
            ),
        }
        match self.tts.backend.as_str() {
            "none" | "mock" => {}
            other => panic!(
                "FATAL: Unknown TTS_BACKEND '{other}'. \
                 Supported backends: none, mock."
            ),
        }
        if self.limits.enrichment_words_min > self.limits.enrichment_words_max {
            panic!("FATAL: LIMITS_ENRICHMENT_MIN must not exceed LIMITS_ENRICHMENT_MAX");
        }
    }
}

fn normalized_sled_path(raw: &str) -> String {
    let path = Path::new(raw);
    if path.is_absolute() {
        return path.to_string_lossy().to_string();
    }

    let project_root = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    project_root.join(path).to_string_lossy().to_string()
}

pub fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

pub fn env_or_parse<T>(key: &str, default: T) -> T
where
    T: FromStr + Copy,
{
    match env::var(key) {
        Ok(raw) => match raw.parse::<T>() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!(
                    key,
                    value = %raw,
                    "Failed to parse env var, using default"
                );
                default
            }
        },
        Err(_) => default,
    }
}

pub fn env_or_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        },
        Err(_) => default,
    }
}
