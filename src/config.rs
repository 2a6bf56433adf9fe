//! Environment-based configuration

use std::env;

/// Environment variable for the Postgres connection string
const ENV_DATABASE_URL: &str = "DATABASE_URL";

/// Environment variable for the upstream API base URL
const ENV_API_URL: &str = "OFFERS_API_URL";

/// Environment variable for the pre-shared upstream auth secret
const ENV_TOKEN_SECRET: &str = "OFFERS_API_TOKEN_SECRET";

/// Default upstream API base URL
const DEFAULT_API_URL: &str = "https://python.exercise.applifting.cz/api/v1";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub api_url: String,
    pub token_secret: String,
}

impl Config {
    /// Read configuration from the environment. Required variables missing
    /// is a startup failure, not something to limp past.
    pub fn from_env() -> Self {
        let database_url =
            env::var(ENV_DATABASE_URL).expect("DATABASE_URL must be set");
        let token_secret =
            env::var(ENV_TOKEN_SECRET).expect("OFFERS_API_TOKEN_SECRET must be set");
        let api_url = env::var(ENV_API_URL).unwrap_or_else(|_| DEFAULT_API_URL.to_string());

        Self {
            database_url,
            api_url,
            token_secret,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_var_names() {
        assert_eq!(ENV_DATABASE_URL, "DATABASE_URL");
        assert_eq!(ENV_API_URL, "OFFERS_API_URL");
        assert_eq!(ENV_TOKEN_SECRET, "OFFERS_API_TOKEN_SECRET");
    }
}
