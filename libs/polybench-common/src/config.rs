use std::env;

/// Builder configuration
/// Provides defaults with environment variable overrides
///
/// The default engine timeout must cover a cold-cache base-image build,
/// which runs multi-minute package installs
#[derive(Debug, Clone)]
pub struct Config {
    pub docker_host: String,
    pub docker_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            docker_host: env::var("DOCKER_HOST")
                .unwrap_or_else(|_| "unix:///var/run/docker.sock".to_string()),
            docker_timeout_secs: env::var("POLYBENCH_DOCKER_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(720),
        }
    }

    pub fn new() -> Self {
        Self::from_env()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
