use crate::chains::ClientPool;
use crate::config::constants::NOMINAL_SWAP_GAS_UNITS;
use crate::dex::jupiter::JupiterAdapter;
use crate::dex::pancake::PancakeAdapter;
use crate::dex::uniswap_v2::UniswapV2Adapter;
use crate::dex::uniswap_v3::UniswapV3Adapter;
use crate::dex::Swap;
use crate::pricing::PriceOracle;
use crate::types::network::Network;
use crate::types::trade::{DexVersion, SwapRequest, TradeError, TradeOutcome, TradeParams};
use crate::utils::address::is_valid_address;
use crate::utils::decimals::wei_to_native;
use crate::utils::retry::{with_retry, RetryPolicy};
use bigdecimal::{BigDecimal, RoundingMode};
use ethers::providers::Middleware;
use ethers::types::U256;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Front door of the execution core. Applies the safety envelope (network
/// availability, address family, USD conversion, gas ratio gate), then hands
/// off to the single matching DEX adapter. Uniswap version fallback is
/// decided here so adapters stay single-protocol.
pub struct TradingService {
    clients: ClientPool,
    oracle: Arc<PriceOracle>,
    jupiter_api_base: String,
}

impl TradingService {
    pub fn new(clients: ClientPool, oracle: Arc<PriceOracle>, jupiter_api_base: String) -> Self {
        Self {
            clients,
            oracle,
            jupiter_api_base,
        }
    }

    pub fn network_available(&self, network: Network) -> bool {
        self.clients.is_enabled(network)
    }

    #[instrument(skip(self, params), fields(user = %params.user_id, network = %params.network))]
    pub async fn execute_trade(&self, params: &TradeParams) -> TradeOutcome {
        let network = params.network;
        let dex = network.default_dex();

        if !self.clients.is_enabled(network) {
            return TradeOutcome::failure(dex, TradeError::NetworkUnavailable(network));
        }
        if !is_valid_address(network, &params.token_address) {
            return TradeOutcome::failure(
                dex,
                TradeError::InvalidAddress {
                    network,
                    address: params.token_address.clone(),
                },
            );
        }

        let native_price = self.oracle.get_price(network).await;
        let amount_native = &params.amount_usd / &native_price;
        info!(
            "trading ${} for {} at {} {}/USD ({} native)",
            params.amount_usd,
            params.token_address,
            native_price,
            network.native_symbol(),
            amount_native
        );

        if network.is_evm() {
            match self.gas_precheck(params, &native_price).await {
                Ok(None) => {}
                Ok(Some(blocked)) => return blocked,
                Err(e) => {
                    warn!("gas pre-check failed on {network}: {e:#}");
                    return TradeOutcome::failure(
                        dex,
                        TradeError::AdapterError(format!("gas pre-check failed: {e:#}")),
                    );
                }
            }
        }

        let request = SwapRequest {
            network,
            token_address: params.token_address.clone(),
            amount_native,
            slippage_pct: params.slippage_tolerance.clone(),
            native_price_usd: native_price,
        };

        match network {
            Network::Sol => {
                let chain = self.clients.solana().expect("availability checked above");
                JupiterAdapter::new(chain, self.jupiter_api_base.clone())
                    .execute_swap(&request)
                    .await
            }
            Network::Bnb => {
                let chain = self.clients.evm(network).expect("availability checked above");
                PancakeAdapter::new(chain).execute_swap(&request).await
            }
            Network::Eth | Network::Base => {
                self.execute_uniswap(params.dex_version.unwrap_or(DexVersion::Auto), &request)
                    .await
            }
        }
    }

    async fn execute_uniswap(&self, version: DexVersion, request: &SwapRequest) -> TradeOutcome {
        let chain = self
            .clients
            .evm(request.network)
            .expect("availability checked above");
        match version {
            DexVersion::V4 => {
                TradeOutcome::failure("Uniswap", TradeError::NotImplemented("Uniswap V4".into()))
            }
            DexVersion::V2 => UniswapV2Adapter::new(chain).execute_swap(request).await,
            DexVersion::V3 => UniswapV3Adapter::new(chain).execute_swap(request).await,
            DexVersion::Auto => {
                let v3_outcome = UniswapV3Adapter::new(chain.clone()).execute_swap(request).await;
                if should_fall_back_to_v2(&v3_outcome) {
                    info!("no V3 pool on {}, falling back to V2", request.network);
                    UniswapV2Adapter::new(chain).execute_swap(request).await
                } else {
                    v3_outcome
                }
            }
        }
    }

    /// Blocks a trade whose nominal gas spend is out of proportion to its
    /// notional, without submitting anything on chain.
    async fn gas_precheck(
        &self,
        params: &TradeParams,
        native_price: &BigDecimal,
    ) -> anyhow::Result<Option<TradeOutcome>> {
        let network = params.network;
        let chain = self.clients.evm(network).expect("availability checked above");
        let policy = RetryPolicy::for_network(network);
        let gas_price = with_retry(policy, "eth.gasPrice", || async {
            chain
                .provider
                .get_gas_price()
                .await
                .map_err(anyhow::Error::from)
        })
        .await?;

        let gas_fee = wei_to_native(gas_price * U256::from(NOMINAL_SWAP_GAS_UNITS))
            .with_scale_round(8, RoundingMode::HalfUp);
        let gas_fee_usd = (&gas_fee * native_price).with_scale_round(8, RoundingMode::HalfUp);
        if let Some(error) = gas_gate(&gas_fee_usd, &params.amount_usd, &params.max_gas_ratio) {
            warn!("gas gate tripped on {network}: {error}");
            let mut outcome = TradeOutcome::failure(network.default_dex(), error);
            outcome.gas_fee = Some(gas_fee);
            outcome.gas_fee_usd = Some(gas_fee_usd);
            return Ok(Some(outcome));
        }
        Ok(None)
    }
}

pub fn should_fall_back_to_v2(outcome: &TradeOutcome) -> bool {
    matches!(outcome.error, Some(TradeError::NoV3Pool(_)))
}

/// `gasFeeUsd / amountUsd > maxGasRatio` ⇒ the trade is refused.
pub fn gas_gate(
    gas_fee_usd: &BigDecimal,
    amount_usd: &BigDecimal,
    max_gas_ratio: &BigDecimal,
) -> Option<TradeError> {
    let ratio = (gas_fee_usd / amount_usd).with_scale_round(4, RoundingMode::HalfUp);
    if &ratio > max_gas_ratio {
        Some(TradeError::GasTooHigh {
            gas_fee_usd: gas_fee_usd.clone(),
            amount_usd: amount_usd.clone(),
            ratio,
            max_ratio: max_gas_ratio.clone(),
        })
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::settings::Settings;

    fn offline_pool() -> ClientPool {
        // Connecting never dials out, so an unroutable endpoint still builds
        // a pool with ETH and SOL enabled.
        let key = "0x0000000000000000000000000000000000000000000000000000000000000001";
        let sol_key = solana_sdk::signature::Keypair::new().to_base58_string();
        let settings = Settings {
            database_url: "postgres://localhost/test".into(),
            session_secret: None,
            rpc_url_eth: Some("http://127.0.0.1:9".into()),
            rpc_url_base: None,
            rpc_url_bnb: None,
            rpc_url_sol: Some("http://127.0.0.1:9".into()),
            private_key_eth: Some(key.into()),
            private_key_base: None,
            private_key_bnb: None,
            private_key_sol: Some(sol_key),
            notify_bind_addr: "127.0.0.1:0".into(),
            price_api_base: "http://127.0.0.1:9".into(),
            jupiter_api_base: "http://127.0.0.1:9".into(),
            log_level: "info".into(),
        };
        ClientPool::from_settings(&settings)
    }

    fn service(pool: ClientPool) -> TradingService {
        TradingService::new(
            pool,
            Arc::new(PriceOracle::new("http://127.0.0.1:9")),
            "http://127.0.0.1:9".into(),
        )
    }

    fn params(network: Network, token: &str) -> TradeParams {
        TradeParams {
            user_id: "user-1".into(),
            network,
            token_address: token.into(),
            dex_version: None,
            amount_usd: BigDecimal::from(10),
            max_gas_ratio: "0.5".parse().unwrap(),
            slippage_tolerance: BigDecimal::from(1),
        }
    }

    #[tokio::test]
    async fn disabled_network_is_unavailable() {
        let svc = service(ClientPool::default());
        let outcome = svc
            .execute_trade(&params(Network::Bnb, "0x000000000000000000000000000000000000dEaD"))
            .await;
        assert!(!outcome.success);
        assert!(matches!(outcome.error, Some(TradeError::NetworkUnavailable(Network::Bnb))));
    }

    #[tokio::test]
    async fn malformed_address_is_rejected_before_any_rpc() {
        let svc = service(offline_pool());
        let outcome = svc.execute_trade(&params(Network::Eth, "0x1234")).await;
        assert!(matches!(outcome.error, Some(TradeError::InvalidAddress { .. })));
        assert!(outcome.tx_hash.is_none());
    }

    #[tokio::test]
    async fn v4_is_explicitly_not_implemented() {
        let svc = service(offline_pool());
        let outcome = svc
            .execute_uniswap(
                DexVersion::V4,
                &SwapRequest {
                    network: Network::Eth,
                    token_address: "0x000000000000000000000000000000000000dEaD".into(),
                    amount_native: BigDecimal::from(1),
                    slippage_pct: BigDecimal::from(1),
                    native_price_usd: BigDecimal::from(2000),
                },
            )
            .await;
        assert!(matches!(outcome.error, Some(TradeError::NotImplemented(_))));
    }

    #[test]
    fn gas_gate_blocks_on_ratio() {
        // $4 of gas against a $5 trade at max ratio 0.5
        let err = gas_gate(
            &BigDecimal::from(4),
            &BigDecimal::from(5),
            &"0.5".parse().unwrap(),
        )
        .expect("gate should trip");
        let msg = err.to_string();
        assert!(msg.contains("0.8"));
        assert!(msg.contains("0.5"));
        // $1 of gas against the same trade passes
        assert!(gas_gate(
            &BigDecimal::from(1),
            &BigDecimal::from(5),
            &"0.5".parse().unwrap()
        )
        .is_none());
        // exactly at the ratio is allowed; the gate is strict-greater
        assert!(gas_gate(
            &"2.5".parse().unwrap(),
            &BigDecimal::from(5),
            &"0.5".parse().unwrap()
        )
        .is_none());
    }

    #[test]
    fn v2_fallback_only_on_missing_v3_pool() {
        let no_pool = TradeOutcome::failure("Uniswap", TradeError::NoV3Pool("0xdead".into()));
        assert!(should_fall_back_to_v2(&no_pool));
        let other = TradeOutcome::failure("Uniswap", TradeError::AdapterError("boom".into()));
        assert!(!should_fall_back_to_v2(&other));
        let ok = TradeOutcome {
            success: true,
            dex: "Uniswap".into(),
            tx_hash: Some("0xabc".into()),
            token_amount: None,
            gas_fee: None,
            gas_fee_usd: None,
            token_price: None,
            slippage: None,
            error: None,
        };
        assert!(!should_fall_back_to_v2(&ok));
    }
}
