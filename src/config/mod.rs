use crate::models::ValidationMode;
use crate::services::authorizenet::{PRODUCTION_ENDPOINT, SANDBOX_ENDPOINT};
use anyhow::{anyhow, Result};
use dotenvy::dotenv;
use secrecy::Secret;
use serde::Deserialize;
use std::env;

#[derive(Deserialize, Clone, Debug)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub authorizenet: AuthorizeNetConfig,
    pub service_name: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Storefront origin allowed by CORS. Permissive when unset.
    pub allowed_origin: Option<String>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct DatabaseConfig {
    pub url: Secret<String>,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Deserialize, Clone, Debug)]
pub struct AuthorizeNetConfig {
    pub login_id: String,
    pub transaction_key: Secret<String>,
    pub endpoint: String,
    pub validation_mode: ValidationMode,
    /// Bound on each outbound gateway call. The upstream API configures
    /// no timeout of its own.
    pub request_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let host = env::var("AUTHNET_SERVICE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("AUTHNET_SERVICE_PORT")
            .unwrap_or_else(|_| "1337".to_string())
            .parse()?;
        let allowed_origin = env::var("CORS_ALLOWED_ORIGIN").ok();

        let login_id = env::var("AUTHORIZENET_NAME")
            .map_err(|_| anyhow!("AUTHORIZENET_NAME must be set"))?;
        let transaction_key = env::var("AUTHORIZENET_TRANSACTION_KEY")
            .map_err(|_| anyhow!("AUTHORIZENET_TRANSACTION_KEY must be set"))?;
        if login_id.is_empty() || transaction_key.is_empty() {
            return Err(anyhow!("Missing login-id or transaction-key"));
        }

        // Anything other than "production" selects the sandbox.
        let environment =
            env::var("AUTHORIZENET_ENVIRONMENT").unwrap_or_else(|_| "sandbox".to_string());
        let (endpoint, validation_mode) = if environment == "production" {
            (PRODUCTION_ENDPOINT.to_string(), ValidationMode::LiveMode)
        } else {
            (SANDBOX_ENDPOINT.to_string(), ValidationMode::TestMode)
        };

        let request_timeout_secs = env::var("AUTHORIZENET_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()?;

        let db_url = env::var("DATABASE_URL").map_err(|_| anyhow!("DATABASE_URL must be set"))?;
        let max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "5".to_string())
            .parse()?;
        let min_connections = env::var("DATABASE_MIN_CONNECTIONS")
            .unwrap_or_else(|_| "1".to_string())
            .parse()?;

        Ok(Self {
            server: ServerConfig {
                host,
                port,
                allowed_origin,
            },
            database: DatabaseConfig {
                url: Secret::new(db_url),
                max_connections,
                min_connections,
            },
            authorizenet: AuthorizeNetConfig {
                login_id,
                transaction_key: Secret::new(transaction_key),
                endpoint,
                validation_mode,
                request_timeout_secs,
            },
            service_name: "authnet-service".to_string(),
        })
    }
}
