//! Application state shared across handlers.

use pipeline_core::MetricsWindows;
use std::time::Instant;

/// Default cap on request bodies (16 MiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Window lengths applied to every metrics request
    pub windows: MetricsWindows,
    /// Allowed CORS origins; `*` allows any
    pub cors_origins: Vec<String>,
    pub max_body_bytes: usize,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(windows: MetricsWindows) -> Self {
        Self {
            windows,
            cors_origins: vec!["*".to_string()],
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            started_at: Instant::now(),
        }
    }

    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = origins;
        self
    }

    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(MetricsWindows::default())
    }
}
