use std::sync::Arc;

use axum::Router;
use tempfile::TempDir;
use tokio::sync::broadcast;

use vocab_backend::config::{
    Config, GenerationConfig, LimitsConfig, TrainingConfig, TtsConfig, WorkerConfig,
};
use vocab_backend::providers::mock::MockGeneration;
use vocab_backend::providers::{build_tts_backend, GenerationBackend};
use vocab_backend::routes::build_router;
use vocab_backend::state::AppState;
use vocab_backend::store::Store;

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub mock: Arc<MockGeneration>,
    pub config: Config,
    _temp_dir: TempDir,
}

/// Build a config directly instead of via env vars, so parallel tests do
/// not race on the process environment.
fn test_config(temp_dir: &TempDir) -> Config {
    Config {
        host: std::net::IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1)),
        port: 3000,
        log_level: "info".to_string(),
        enable_file_logs: false,
        log_dir: "./logs".to_string(),
        sled_path: temp_dir
            .path()
            .join("vocab-test.sled")
            .to_string_lossy()
            .to_string(),
        cors_origin: "http://localhost:5173".to_string(),
        auto_import: false,
        training: TrainingConfig::default(),
        generation: GenerationConfig {
            backend: "mock".to_string(),
            ..GenerationConfig::default()
        },
        tts: TtsConfig {
            backend: "none".to_string(),
            voice: "test-voice".to_string(),
            audio_cache_dir: temp_dir
                .path()
                .join("audio_cache")
                .to_string_lossy()
                .to_string(),
        },
        worker: WorkerConfig { is_leader: false },
        limits: LimitsConfig::default(),
    }
}

pub async fn spawn_with_mock(
    mock: Arc<MockGeneration>,
    tweak: impl FnOnce(&mut Config),
) -> TestApp {
    let temp_dir = tempfile::tempdir().expect("tempdir");
    let mut config = test_config(&temp_dir);
    tweak(&mut config);

    let store = Arc::new(Store::open(&config.sled_path).expect("open store"));
    let backend: Arc<dyn GenerationBackend> = mock.clone();
    let tts = build_tts_backend(&config);
    let (shutdown_tx, _) = broadcast::channel::<()>(8);

    let state = AppState::new(store, backend, tts, &config, shutdown_tx);
    let app = build_router(state.clone());

    TestApp {
        app,
        state,
        mock,
        config,
        _temp_dir: temp_dir,
    }
}

pub async fn spawn_test_app() -> TestApp {
    spawn_with_mock(Arc::new(MockGeneration::new()), |_| {}).await
}

pub async fn spawn_with(tweak: impl FnOnce(&mut Config)) -> TestApp {
    spawn_with_mock(Arc::new(MockGeneration::new()), tweak).await
}
