use std::env;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
    /// Seconds between background worker passes (recurring
    /// transactions, subscription billing, budget alerts).
    pub worker_interval_secs: u64,
}

impl Config {
    pub fn from_env() -> Self {
        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://splitbook.db?mode=rwc".to_string());

        Self {
            database_url,
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8000),
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .ok()
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or_else(Vec::new),
            worker_interval_secs: env::var("WORKER_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3600),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for key in ["DATABASE_URL", "PORT", "CORS_ALLOWED_ORIGINS", "WORKER_INTERVAL_SECS"] {
            // Safe here: #[serial] keeps env-mutating tests off other threads
            unsafe { env::remove_var(key) };
        }
    }

    #[test]
    #[serial]
    fn defaults_apply_without_env() {
        clear_env();
        let config = Config::from_env();
        assert_eq!(config.database_url, "sqlite://splitbook.db?mode=rwc");
        assert_eq!(config.port, 8000);
        assert!(config.cors_allowed_origins.is_empty());
        assert_eq!(config.worker_interval_secs, 3600);
    }

    #[test]
    #[serial]
    fn env_overrides_are_read() {
        clear_env();
        unsafe {
            env::set_var("DATABASE_URL", "sqlite::memory:");
            env::set_var("PORT", "9100");
            env::set_var("CORS_ALLOWED_ORIGINS", "http://localhost:3000, http://app.local");
        }

        let config = Config::from_env();
        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.port, 9100);
        assert_eq!(
            config.cors_allowed_origins,
            vec!["http://localhost:3000", "http://app.local"]
        );

        clear_env();
    }
}
