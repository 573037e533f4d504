use serde::{Deserialize, Serialize};
use std::env;

/// Application configuration, built once at startup and handed to the router
/// through shared state. Nothing reads the environment after boot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// Identity provider settings. The provider publishes signing keys at
/// `https://{domain}/.well-known/jwks.json` and issues tokens whose issuer
/// is `https://{domain}/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub domain: String,
    pub audience: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::defaults().with_env_overrides()
    }

    fn defaults() -> Self {
        Self {
            server: ServerConfig { port: 8080 },
            database: DatabaseConfig {
                url: "sqlite::memory:".to_string(),
                max_connections: 5,
            },
            auth: AuthConfig {
                domain: "coffeeshop.us.auth0.com".to_string(),
                audience: "drinks".to_string(),
            },
        }
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = env::var("PORT") {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = v;
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("AUTH0_DOMAIN") {
            self.auth.domain = v;
        }
        if let Ok(v) = env::var("AUTH0_AUDIENCE") {
            self.auth.audience = v;
        }
        self
    }
}

impl AuthConfig {
    pub fn issuer(&self) -> String {
        format!("https://{}/", self.domain)
    }

    pub fn jwks_url(&self) -> String {
        format!("https://{}/.well-known/jwks.json", self.domain)
    }
}
