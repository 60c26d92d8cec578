//! Configuration module
//!
//! This module provides the environment-driven configuration for the API,
//! including database, tenancy, payment-gateway, session, and SMTP settings.

use std::env;

// Common constants
const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const SESSION_TTL_HOURS: i64 = 24 * 30;
const DEFAULT_ROOT_DOMAIN: &str = "localhost:3000";

/// Platform configuration loaded from the environment.
#[derive(Clone, Debug)]
pub struct PlatformConfig {
    pub environment: String,
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    /// Root domain the platform is served from; hosts below it are tenant
    /// subdomains (e.g. `acme.example.com` for root domain `example.com`).
    pub root_domain: String,
    /// Public base URL for links in emails and gateway callbacks.
    pub app_url: String,
    /// Session token lifetime in hours.
    pub session_ttl_hours: i64,
    // Payment gateway (Snap API)
    pub gateway_server_key: String,
    pub gateway_client_key: String,
    pub gateway_is_production: bool,
    // Email / invitation notifications
    pub smtp_host: Option<String>,
    pub smtp_port: Option<u16>,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
    pub smtp_from: Option<String>,
    pub smtp_tls: bool,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(Box<PlatformConfig>);

impl Config {
    fn inner(&self) -> &PlatformConfig {
        &self.0
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        Ok(Config(Box::new(PlatformConfig::from_env()?)))
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.inner().environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.inner().validate()
    }

    // Convenience getters for common fields
    pub fn server_port(&self) -> u16 {
        self.inner().server_port
    }

    pub fn environment(&self) -> &str {
        &self.inner().environment
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.inner().cors_origins
    }

    pub fn database_url(&self) -> &str {
        &self.inner().database_url
    }

    pub fn db_max_connections(&self) -> u32 {
        self.inner().db_max_connections
    }

    pub fn db_timeout_seconds(&self) -> u64 {
        self.inner().db_timeout_seconds
    }

    pub fn root_domain(&self) -> &str {
        &self.inner().root_domain
    }

    pub fn app_url(&self) -> &str {
        &self.inner().app_url
    }

    pub fn session_ttl_hours(&self) -> i64 {
        self.inner().session_ttl_hours
    }

    pub fn gateway_server_key(&self) -> &str {
        &self.inner().gateway_server_key
    }

    pub fn gateway_client_key(&self) -> &str {
        &self.inner().gateway_client_key
    }

    pub fn gateway_is_production(&self) -> bool {
        self.inner().gateway_is_production
    }

    pub fn smtp_host(&self) -> Option<&str> {
        self.inner().smtp_host.as_deref()
    }

    pub fn smtp_port(&self) -> Option<u16> {
        self.inner().smtp_port
    }

    pub fn smtp_user(&self) -> Option<&str> {
        self.inner().smtp_user.as_deref()
    }

    pub fn smtp_password(&self) -> Option<&str> {
        self.inner().smtp_password.as_deref()
    }

    pub fn smtp_from(&self) -> Option<&str> {
        self.inner().smtp_from.as_deref()
    }

    pub fn smtp_tls(&self) -> bool {
        self.inner().smtp_tls
    }
}

impl PlatformConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let server_port = env::var("SERVER_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3000);

        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable not set"))?;

        let db_max_connections = env::var("DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(MAX_CONNECTIONS);

        let db_timeout_seconds = env::var("DB_TIMEOUT_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(CONNECTION_TIMEOUT_SECS);

        let root_domain =
            env::var("ROOT_DOMAIN").unwrap_or_else(|_| DEFAULT_ROOT_DOMAIN.to_string());

        let app_url =
            env::var("APP_URL").unwrap_or_else(|_| format!("http://{}", root_domain));

        let session_ttl_hours = env::var("SESSION_TTL_HOURS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(SESSION_TTL_HOURS);

        let gateway_server_key = env::var("GATEWAY_SERVER_KEY")
            .map_err(|_| anyhow::anyhow!("GATEWAY_SERVER_KEY environment variable not set"))?;
        let gateway_client_key = env::var("GATEWAY_CLIENT_KEY").unwrap_or_default();
        let gateway_is_production = env::var("GATEWAY_IS_PRODUCTION")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        let smtp_host = env::var("SMTP_HOST").ok();
        let smtp_port = env::var("SMTP_PORT").ok().and_then(|s| s.parse().ok());
        let smtp_user = env::var("SMTP_USER").ok();
        let smtp_password = env::var("SMTP_PASSWORD").ok();
        let smtp_from = env::var("SMTP_FROM").ok();
        let smtp_tls = env::var("SMTP_TLS")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        Ok(Self {
            environment,
            server_port,
            cors_origins,
            database_url,
            db_max_connections,
            db_timeout_seconds,
            root_domain,
            app_url,
            session_ttl_hours,
            gateway_server_key,
            gateway_client_key,
            gateway_is_production,
            smtp_host,
            smtp_port,
            smtp_user,
            smtp_password,
            smtp_from,
            smtp_tls,
        })
    }

    /// Fail fast on misconfiguration that would otherwise only surface at
    /// request time.
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.database_url.is_empty() {
            anyhow::bail!("DATABASE_URL must not be empty");
        }
        if self.gateway_server_key.is_empty() {
            anyhow::bail!("GATEWAY_SERVER_KEY must not be empty");
        }
        if self.root_domain.is_empty() {
            anyhow::bail!("ROOT_DOMAIN must not be empty");
        }
        if self.db_max_connections == 0 {
            anyhow::bail!("DB_MAX_CONNECTIONS must be at least 1");
        }
        if self.session_ttl_hours <= 0 {
            anyhow::bail!("SESSION_TTL_HOURS must be positive");
        }
        // SMTP settings are optional as a group, but partial configuration is
        // almost always a deployment mistake.
        if self.smtp_host.is_some() && self.smtp_from.is_none() {
            anyhow::bail!("SMTP_FROM must be set when SMTP_HOST is configured");
        }
        Ok(())
    }
}
