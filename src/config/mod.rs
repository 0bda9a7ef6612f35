use serde::Deserialize;
use std::thread;
use thiserror::Error;

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_api_threads")]
    pub api_threads: usize,
    pub notion_token: Option<String>,
    pub notion_database_id: Option<String>,
    #[serde(default = "default_notion_api_url")]
    pub notion_api_url: String,
    #[serde(default = "default_notion_version")]
    pub notion_version: String,
}

/// Everything the remote store adapter needs, validated once at startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreConfig {
    pub credential: String,
    pub collection_id: String,
    pub api_url: String,
    pub api_version: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),
    #[error("Missing required environment variables {0}")]
    MissingAll(String),
}

impl Config {
    pub fn store_config(&self) -> Result<StoreConfig, ConfigurationError> {
        let credential = present(&self.notion_token);
        let collection_id = present(&self.notion_database_id);

        match (credential, collection_id) {
            (Some(credential), Some(collection_id)) => Ok(StoreConfig {
                credential,
                collection_id,
                api_url: self.notion_api_url.trim_end_matches('/').to_string(),
                api_version: self.notion_version.clone(),
            }),
            (None, Some(_)) => Err(ConfigurationError::Missing("APP_NOTION_TOKEN")),
            (Some(_), None) => Err(ConfigurationError::Missing("APP_NOTION_DATABASE_ID")),
            (None, None) => Err(ConfigurationError::MissingAll(
                "APP_NOTION_TOKEN and APP_NOTION_DATABASE_ID".into(),
            )),
        }
    }
}

fn present(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

fn default_host() -> String {
    "[::]:3000".into()
}

fn default_api_threads() -> usize {
    let cores = thread::available_parallelism().map_or(1, usize::from);
    usize::max(1, cores - 1)
}

fn default_notion_api_url() -> String {
    "https://api.notion.com/v1".into()
}

fn default_notion_version() -> String {
    "2022-06-28".into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(token: Option<&str>, database_id: Option<&str>) -> Config {
        Config {
            host: default_host(),
            api_threads: 1,
            notion_token: token.map(String::from),
            notion_database_id: database_id.map(String::from),
            notion_api_url: "https://api.notion.com/v1/".into(),
            notion_version: default_notion_version(),
        }
    }

    #[test]
    fn should_build_store_config() {
        let store = config(Some("secret_abc"), Some("db123"))
            .store_config()
            .unwrap();

        assert_eq!(store.credential, "secret_abc");
        assert_eq!(store.collection_id, "db123");
        assert_eq!(store.api_url, "https://api.notion.com/v1");
        assert_eq!(store.api_version, "2022-06-28");
    }

    #[test]
    fn should_reject_missing_token() {
        let err = config(None, Some("db123")).store_config().unwrap_err();
        assert_eq!(err, ConfigurationError::Missing("APP_NOTION_TOKEN"));
    }

    #[test]
    fn should_treat_blank_values_as_missing() {
        let err = config(Some("  "), Some("")).store_config().unwrap_err();
        assert!(matches!(err, ConfigurationError::MissingAll(_)));

        let err = config(Some("secret"), Some(" ")).store_config().unwrap_err();
        assert_eq!(err, ConfigurationError::Missing("APP_NOTION_DATABASE_ID"));
    }

    #[test]
    fn should_deserialize_from_prefixed_env() {
        let vars = vec![
            ("APP_HOST".to_string(), "127.0.0.1:8080".to_string()),
            ("APP_NOTION_TOKEN".to_string(), "secret".to_string()),
            ("APP_NOTION_DATABASE_ID".to_string(), "db".to_string()),
        ];
        let config = envy::prefixed("APP_")
            .from_iter::<_, Config>(vars)
            .unwrap();

        assert_eq!(config.host, "127.0.0.1:8080");
        assert!(config.api_threads >= 1);
        assert_eq!(config.notion_api_url, "https://api.notion.com/v1");
        assert!(config.store_config().is_ok());
    }
}
