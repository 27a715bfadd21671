use crate::types::network::Network;
use config::{Config, ConfigError, Environment};
use serde::Deserialize;
use std::fmt::Debug;

/// Process configuration, read once at startup from the environment (plus
/// whatever `.env` dotenv loaded before us). A network is enabled only when
/// both its RPC endpoint and its signing key are present.
#[derive(Clone, Deserialize)]
pub struct Settings {
    pub database_url: String,
    pub session_secret: Option<String>,
    pub rpc_url_eth: Option<String>,
    pub rpc_url_base: Option<String>,
    pub rpc_url_bnb: Option<String>,
    pub rpc_url_sol: Option<String>,
    pub private_key_eth: Option<String>,
    pub private_key_base: Option<String>,
    pub private_key_bnb: Option<String>,
    pub private_key_sol: Option<String>,
    #[serde(default = "default_notify_bind_addr")]
    pub notify_bind_addr: String,
    #[serde(default = "default_price_api_base")]
    pub price_api_base: String,
    #[serde(default = "default_jupiter_api_base")]
    pub jupiter_api_base: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_notify_bind_addr() -> String {
    "0.0.0.0:8081".to_string()
}

fn default_price_api_base() -> String {
    "https://api.coingecko.com/api/v3".to_string()
}

fn default_jupiter_api_base() -> String {
    "https://quote-api.jup.ag/v6".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(Environment::default())
            .build()?
            .try_deserialize()
    }

    pub fn rpc_url(&self, network: Network) -> Option<&str> {
        match network {
            Network::Eth => self.rpc_url_eth.as_deref(),
            Network::Base => self.rpc_url_base.as_deref(),
            Network::Bnb => self.rpc_url_bnb.as_deref(),
            Network::Sol => self.rpc_url_sol.as_deref(),
        }
    }

    pub fn private_key(&self, network: Network) -> Option<&str> {
        match network {
            Network::Eth => self.private_key_eth.as_deref(),
            Network::Base => self.private_key_base.as_deref(),
            Network::Bnb => self.private_key_bnb.as_deref(),
            Network::Sol => self.private_key_sol.as_deref(),
        }
    }

    pub fn network_enabled(&self, network: Network) -> bool {
        self.rpc_url(network).is_some() && self.private_key(network).is_some()
    }
}

impl Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("database_url", &"<hidden>")
            .field("rpc_url_eth", &self.rpc_url_eth)
            .field("rpc_url_base", &self.rpc_url_base)
            .field("rpc_url_bnb", &self.rpc_url_bnb)
            .field("rpc_url_sol", &self.rpc_url_sol)
            .field("private_keys", &"<hidden>")
            .field("notify_bind_addr", &self.notify_bind_addr)
            .field("price_api_base", &self.price_api_base)
            .field("jupiter_api_base", &self.jupiter_api_base)
            .field("log_level", &self.log_level)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings_with_eth() -> Settings {
        Settings {
            database_url: "postgres://localhost/test".into(),
            session_secret: None,
            rpc_url_eth: Some("https://eth.example".into()),
            rpc_url_base: None,
            rpc_url_bnb: None,
            rpc_url_sol: None,
            private_key_eth: Some("0xabc".into()),
            private_key_base: None,
            private_key_bnb: Some("0xdef".into()),
            private_key_sol: None,
            notify_bind_addr: default_notify_bind_addr(),
            price_api_base: default_price_api_base(),
            jupiter_api_base: default_jupiter_api_base(),
            log_level: default_log_level(),
        }
    }

    #[test]
    fn network_needs_both_url_and_key() {
        let settings = settings_with_eth();
        assert!(settings.network_enabled(Network::Eth));
        // BNB has a key but no endpoint
        assert!(!settings.network_enabled(Network::Bnb));
        assert!(!settings.network_enabled(Network::Sol));
    }

    #[test]
    fn debug_hides_key_material() {
        let rendered = format!("{:?}", settings_with_eth());
        assert!(!rendered.contains("0xabc"));
        assert!(!rendered.contains("postgres://"));
    }
}
