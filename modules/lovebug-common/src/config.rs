use std::env;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Postgres
    pub database_url: String,

    // Twitter recent-search API. None means the offline sample fetcher is used.
    pub twitter_bearer_token: Option<String>,

    // Web server
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,

    // Ingest
    pub poll_interval_secs: u64,
    pub fetch_limit_per_keyword: u32,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            database_url: required_env("DATABASE_URL"),
            twitter_bearer_token: env::var("TWITTER_BEARER_TOKEN").ok().filter(|t| !t.is_empty()),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .expect("PORT must be a number"),
            allowed_origins: env::var("ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "*".to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            poll_interval_secs: env::var("POLL_INTERVAL_SECS")
                .unwrap_or_else(|_| "600".to_string())
                .parse()
                .expect("POLL_INTERVAL_SECS must be a number"),
            fetch_limit_per_keyword: env::var("FETCH_LIMIT_PER_KEYWORD")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .expect("FETCH_LIMIT_PER_KEYWORD must be a number"),
        }
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}
