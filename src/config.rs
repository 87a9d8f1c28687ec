// src/config.rs

//! Engine configuration. Constructed explicitly and injected into the
//! service (no ambient global), with env-variable overrides for the binary.

use std::str::FromStr;

/// Tunables for the memory engine.
#[derive(Debug, Clone)]
pub struct MemoryConfig {
    /// Hard cap on entries retained per thread.
    pub max_entries_per_thread: usize,
    /// Entries older than this are dropped when prior state is loaded.
    pub retention_days: i64,
    /// Read-path defaults when the query leaves them unset.
    pub default_limit: usize,
    pub default_relevance_threshold: f32,
    /// Durable store location (used by the binary).
    pub database_url: String,
    pub sqlite_max_connections: u32,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_entries_per_thread: 100,
            retention_days: 30,
            default_limit: 10,
            default_relevance_threshold: 0.3,
            database_url: "sqlite:./memora.db".to_string(),
            sqlite_max_connections: 5,
        }
    }
}

// Missing variables fall back to the default; unparseable values do too.
fn env_var_or<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    match std::env::var(key) {
        Ok(val) => {
            let clean_val = val.split('#').next().unwrap_or("").trim();
            clean_val.parse::<T>().unwrap_or(default)
        }
        Err(_) => default,
    }
}

impl MemoryConfig {
    /// Builds a config from environment variables, loading `.env` first if
    /// one exists.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();

        let defaults = Self::default();
        Self {
            max_entries_per_thread: env_var_or("MEMORA_MAX_ENTRIES", defaults.max_entries_per_thread),
            retention_days: env_var_or("MEMORA_RETENTION_DAYS", defaults.retention_days),
            default_limit: env_var_or("MEMORA_DEFAULT_LIMIT", defaults.default_limit),
            default_relevance_threshold: env_var_or(
                "MEMORA_RELEVANCE_THRESHOLD",
                defaults.default_relevance_threshold,
            ),
            database_url: env_var_or("DATABASE_URL", defaults.database_url),
            sqlite_max_connections: env_var_or("SQLITE_MAX_CONNECTIONS", defaults.sqlite_max_connections),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_engine_contract() {
        let cfg = MemoryConfig::default();
        assert_eq!(cfg.max_entries_per_thread, 100);
        assert_eq!(cfg.retention_days, 30);
        assert_eq!(cfg.default_limit, 10);
        assert_eq!(cfg.default_relevance_threshold, 0.3);
    }

    #[test]
    fn test_env_var_or_strips_comments() {
        unsafe { std::env::set_var("MEMORA_TEST_CAP", "25 # inline comment") };
        assert_eq!(env_var_or("MEMORA_TEST_CAP", 1usize), 25);
        unsafe { std::env::remove_var("MEMORA_TEST_CAP") };
    }
}
