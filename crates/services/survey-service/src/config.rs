//! Survey service configuration.

use std::env;

use common::{DatabaseConfig, ServiceConfig, LOCAL_DATABASE_URL};

/// Survey service configuration.
#[derive(Debug, Clone)]
pub struct SurveyServiceConfig {
    pub service: ServiceConfig,
    pub database: DatabaseConfig,
}

impl SurveyServiceConfig {
    /// Load configuration from environment variables.
    ///
    /// `SURVEY_SERVICE_DATABASE_URL` wins over `DATABASE_URL`; without either
    /// the local SQLite store is used.
    pub fn from_env() -> Self {
        let url = env::var("SURVEY_SERVICE_DATABASE_URL")
            .or_else(|_| env::var("DATABASE_URL"))
            .ok();

        Self::resolve(url.as_deref(), |key| env::var(key).ok())
    }

    /// Build the configuration from an optional database URL and a variable lookup.
    fn resolve(url: Option<&str>, var: impl Fn(&str) -> Option<String>) -> Self {
        let mut database = match url.map(str::trim).filter(|url| !url.is_empty()) {
            Some(url) => DatabaseConfig::with_url(url),
            None => {
                tracing::info!(
                    url = LOCAL_DATABASE_URL,
                    "DATABASE_URL not set, using local SQLite store"
                );
                DatabaseConfig::default()
            }
        };

        if let Some(max) = var("SURVEY_SERVICE_DB_MAX_CONNECTIONS").and_then(|v| v.parse().ok()) {
            database.max_connections = max;
        }

        let mut service = Self::default().service;
        if let Some(host) = var("SURVEY_SERVICE_HOST") {
            service.host = host;
        }
        if let Some(port) = var("SURVEY_SERVICE_PORT").and_then(|p| p.parse().ok()) {
            service.port = port;
        }

        Self { service, database }
    }
}

impl Default for SurveyServiceConfig {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                service_name: "survey-service".to_string(),
                ..ServiceConfig::default()
            },
            database: DatabaseConfig::default(),
        }
    }
}
