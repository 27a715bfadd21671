use crate::config::constants::{
    FALLBACK_PRICE_BNB, FALLBACK_PRICE_ETH, FALLBACK_PRICE_SOL, PRICE_CACHE_TTL_SECS,
};
use crate::types::network::Network;
use anyhow::{anyhow, Context, Result};
use bigdecimal::BigDecimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::warn;

#[derive(Debug, Deserialize)]
struct UsdQuote {
    usd: BigDecimal,
}

#[derive(Debug, Clone)]
struct CachedPrice {
    price: BigDecimal,
    fetched_at: Instant,
}

/// USD price of a network's native unit, memoized for 30 seconds per feed id
/// (ETH and BASE share the `ethereum` feed, so one fetch serves both).
/// Lookup never fails: any source error degrades to a static fallback, and
/// callers are expected to tolerate prices as stale as the TTL.
pub struct PriceOracle {
    http: reqwest::Client,
    base_url: String,
    cache: RwLock<HashMap<&'static str, CachedPrice>>,
}

impl PriceOracle {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .expect("reqwest client"),
            base_url: base_url.into(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get_price(&self, network: Network) -> BigDecimal {
        let feed_id = network.price_feed_id();
        {
            let cache = self.cache.read().await;
            if let Some(hit) = cache.get(feed_id) {
                if hit.fetched_at.elapsed() < Duration::from_secs(PRICE_CACHE_TTL_SECS) {
                    return hit.price.clone();
                }
            }
        }
        match self.fetch_usd(feed_id).await {
            Ok(price) => {
                self.cache.write().await.insert(
                    feed_id,
                    CachedPrice {
                        price: price.clone(),
                        fetched_at: Instant::now(),
                    },
                );
                price
            }
            Err(e) => {
                warn!("price fetch for {feed_id} failed, using static fallback: {e:#}");
                Self::fallback_price(network)
            }
        }
    }

    async fn fetch_usd(&self, feed_id: &str) -> Result<BigDecimal> {
        let url = format!(
            "{}/simple/price?ids={feed_id}&vs_currencies=usd",
            self.base_url
        );
        let mut quotes: HashMap<String, UsdQuote> = self
            .http
            .get(&url)
            .send()
            .await
            .context("price request failed")?
            .error_for_status()
            .context("price source returned an error status")?
            .json()
            .await
            .context("malformed price response")?;
        quotes
            .remove(feed_id)
            .map(|q| q.usd)
            .ok_or_else(|| anyhow!("price source has no entry for {feed_id}"))
    }

    pub fn fallback_price(network: Network) -> BigDecimal {
        let usd = match network {
            Network::Eth | Network::Base => FALLBACK_PRICE_ETH,
            Network::Bnb => FALLBACK_PRICE_BNB,
            Network::Sol => FALLBACK_PRICE_SOL,
        };
        BigDecimal::from(usd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_values_per_network() {
        assert_eq!(PriceOracle::fallback_price(Network::Eth), BigDecimal::from(2000));
        assert_eq!(PriceOracle::fallback_price(Network::Base), BigDecimal::from(2000));
        assert_eq!(PriceOracle::fallback_price(Network::Bnb), BigDecimal::from(600));
        assert_eq!(PriceOracle::fallback_price(Network::Sol), BigDecimal::from(150));
    }

    #[tokio::test]
    async fn unreachable_source_degrades_to_fallback() {
        let oracle = PriceOracle::new("http://127.0.0.1:9");
        assert_eq!(oracle.get_price(Network::Sol).await, BigDecimal::from(150));
    }
}
