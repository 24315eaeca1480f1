use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // Server
    pub host: String,
    pub port: u16,
    pub environment: String,

    // TRON node / TronGrid
    pub tron_host: String,
    pub tron_grid_host: Option<String>,
    pub tron_api_key: Option<String>,

    // Signing defaults (read-only after startup)
    pub sender_private_key: Option<String>,
    pub fee_limit_sun: u64,

    // CORS
    pub cors_allowed_origins: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        Ok(Config {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()?,
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),

            tron_host: env::var("TRON_HOST")
                .unwrap_or_else(|_| "https://api.trongrid.io".to_string())
                .trim_end_matches('/')
                .to_string(),
            tron_grid_host: env::var("TRON_GRID_HOST")
                .ok()
                .map(|h| h.trim_end_matches('/').to_string()),
            tron_api_key: env::var("TRONGRID_API_KEY")
                .ok()
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty()),

            sender_private_key: env::var("SENDER_PRIVATE_KEY")
                .ok()
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty()),
            fee_limit_sun: env::var("FEE_LIMIT_SUN")
                .unwrap_or_else(|_| "10000000".to_string())
                .parse()?,

            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:8080,http://127.0.0.1:8080".to_string()),
        })
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.tron_host.trim().is_empty() {
            anyhow::bail!("TRON_HOST is empty");
        }
        if self.fee_limit_sun == 0 {
            anyhow::bail!("FEE_LIMIT_SUN must be > 0");
        }

        if self.sender_private_key.is_none() {
            tracing::warn!(
                "SENDER_PRIVATE_KEY not set; transfers without a per-request key will be rejected"
            );
        }
        if self.tron_api_key.is_none() {
            tracing::warn!("TRONGRID_API_KEY not set; public rate limits apply");
        }
        if self.cors_allowed_origins.trim().is_empty() {
            tracing::warn!("CORS_ALLOWED_ORIGINS is empty; requests may be blocked");
        }

        Ok(())
    }

    /// History endpoint base; falls back to the node host when no separate
    /// TronGrid host is configured.
    pub fn grid_host(&self) -> &str {
        self.tron_grid_host.as_deref().unwrap_or(&self.tron_host)
    }

    pub fn is_testnet(&self) -> bool {
        if self.environment == "development" || self.environment == "testnet" {
            return true;
        }
        let host = self.tron_host.to_ascii_lowercase();
        host.contains("nile") || host.contains("shasta")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            host: "0.0.0.0".to_string(),
            port: 5000,
            environment: "production".to_string(),
            tron_host: "https://api.trongrid.io".to_string(),
            tron_grid_host: None,
            tron_api_key: None,
            sender_private_key: None,
            fee_limit_sun: 10_000_000,
            cors_allowed_origins: "*".to_string(),
        }
    }

    #[test]
    fn grid_host_falls_back_to_node_host() {
        let mut config = base_config();
        assert_eq!(config.grid_host(), "https://api.trongrid.io");
        config.tron_grid_host = Some("https://nile.trongrid.io".to_string());
        assert_eq!(config.grid_host(), "https://nile.trongrid.io");
    }

    #[test]
    fn testnet_detected_from_host() {
        let mut config = base_config();
        assert!(!config.is_testnet());
        config.tron_host = "https://nile.trongrid.io".to_string();
        assert!(config.is_testnet());
    }
}
