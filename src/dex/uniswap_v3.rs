use crate::chains::evm::EvmChain;
use crate::config::constants::{
    v3_quoter, v3_router, wrapped_native, EVM_RECEIPT_TIMEOUT_SECS, SWAP_DEADLINE_SECS,
    V3_FEE_TIERS, V3_PROBE_PAUSE_MS,
};
use crate::dex::{
    i_swap_router::ExactInputSingleParams, min_out_with_slippage, pick_best_tier, price_per_token,
    IErc20, IQuoter, ISwapRouter, Swap,
};
use crate::types::network::Network;
use crate::types::trade::{SwapRequest, TradeError, TradeOutcome};
use crate::utils::decimals::{native_to_wei, u256_to_ui, wei_to_native};
use crate::utils::retry::{with_retry, RetryPolicy};
use async_trait::async_trait;
use bigdecimal::RoundingMode;
use chrono::Utc;
use ethers::providers::Middleware;
use ethers::types::{Address, U256};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Uniswap V3 buy path. Probes every fee tier through the quoter, swaps on
/// the deepest one via `exactInputSingle`.
pub struct UniswapV3Adapter {
    chain: Arc<EvmChain>,
}

impl UniswapV3Adapter {
    pub fn new(chain: Arc<EvmChain>) -> Self {
        Self { chain }
    }
}

#[async_trait]
impl Swap for UniswapV3Adapter {
    fn dex(&self) -> &'static str {
        "Uniswap"
    }

    async fn execute_swap(&self, request: &SwapRequest) -> TradeOutcome {
        match self.swap(request).await {
            Ok(outcome) => outcome,
            Err(err) => TradeOutcome::failure(self.dex(), err),
        }
    }
}

impl UniswapV3Adapter {
    async fn swap(&self, request: &SwapRequest) -> Result<TradeOutcome, TradeError> {
        let network = request.network;
        let policy = RetryPolicy::for_network(network);
        let token: Address = request
            .token_address
            .parse()
            .map_err(|_| TradeError::InvalidAddress {
                network,
                address: request.token_address.clone(),
            })?;
        let router_addr: Address = v3_router(network)
            .ok_or_else(|| TradeError::AdapterError(format!("no V3 router on {network}")))?
            .parse()
            .expect("router constants are checksummed addresses");
        let quoter_addr: Address = v3_quoter(network)
            .ok_or_else(|| TradeError::AdapterError(format!("no V3 quoter on {network}")))?
            .parse()
            .expect("quoter constants are checksummed addresses");
        let wrapped: Address = wrapped_native(network)
            .parse()
            .expect("wrapped-native constants are checksummed addresses");

        let client = self.chain.client.clone();
        let erc20 = IErc20::new(token, client.clone());
        let token_decimals = with_retry(policy, "erc20.decimals", || {
            let erc20 = erc20.clone();
            async move { erc20.decimals().call().await.map_err(anyhow::Error::from) }
        })
        .await
        .map_err(|_| TradeError::InvalidToken(request.token_address.clone()))?;

        let amount_in = native_to_wei(&request.amount_native)
            .map_err(|e| TradeError::AdapterError(format!("amount conversion failed: {e}")))?;

        let quoter = IQuoter::new(quoter_addr, client.clone());
        let mut quotes: Vec<(u32, U256)> = Vec::with_capacity(V3_FEE_TIERS.len());
        for (i, &tier) in V3_FEE_TIERS.iter().enumerate() {
            if i > 0 && network == Network::Base {
                tokio::time::sleep(Duration::from_millis(V3_PROBE_PAUSE_MS)).await;
            }
            let out = with_retry(policy, "quoter.quoteExactInputSingle", || {
                let quoter = quoter.clone();
                async move {
                    quoter
                        .quote_exact_input_single(wrapped, token, tier, amount_in, U256::zero())
                        .call()
                        .await
                        .map_err(anyhow::Error::from)
                }
            })
            .await
            .unwrap_or_default();
            debug!("V3 tier {tier} on {network} quotes {out}");
            quotes.push((tier, out));
        }
        let Some((fee_tier, expected_out)) = pick_best_tier(&quotes) else {
            return Err(TradeError::NoV3Pool(request.token_address.clone()));
        };

        let min_out = min_out_with_slippage(expected_out, &request.slippage_pct);
        let router = ISwapRouter::new(router_addr, client);
        let params = ExactInputSingleParams {
            token_in: wrapped,
            token_out: token,
            fee: fee_tier,
            recipient: self.chain.wallet_address,
            deadline: U256::from(Utc::now().timestamp() as u64 + SWAP_DEADLINE_SECS),
            amount_in,
            amount_out_minimum: min_out,
            sqrt_price_limit_x96: U256::zero(),
        };
        let call = router.exact_input_single(params).value(amount_in);

        let gas_estimate = with_retry(policy, "swap.estimateGas", || {
            let call = call.clone();
            async move { call.estimate_gas().await.map_err(anyhow::Error::from) }
        })
        .await
        .map_err(|e| TradeError::AdapterError(format!("gas estimation failed: {e:#}")))?;
        let gas_price = with_retry(policy, "eth.gasPrice", || async {
            self.chain
                .provider
                .get_gas_price()
                .await
                .map_err(anyhow::Error::from)
        })
        .await
        .map_err(|e| TradeError::AdapterError(format!("gas price lookup failed: {e:#}")))?;

        let call = call.gas(gas_estimate).gas_price(gas_price);
        let pending = call
            .send()
            .await
            .map_err(|e| TradeError::AdapterError(format!("swap submission failed: {e}")))?;
        let tx_hash = format!("{:#x}", *pending);
        info!("Uniswap V3 swap sent on {network} at tier {fee_tier}: {tx_hash}");

        let receipt = tokio::time::timeout(Duration::from_secs(EVM_RECEIPT_TIMEOUT_SECS), pending)
            .await
            .map_err(|_| {
                TradeError::AdapterError(format!("timed out waiting for receipt of {tx_hash}"))
            })?
            .map_err(|e| TradeError::AdapterError(format!("receipt wait failed for {tx_hash}: {e}")))?;
        if let Some(receipt) = receipt {
            if receipt.status == Some(0.into()) {
                let mut outcome = TradeOutcome::failure(
                    "Uniswap",
                    TradeError::AdapterError(format!("transaction {tx_hash} reverted")),
                );
                outcome.tx_hash = Some(tx_hash);
                return Ok(outcome);
            }
        }

        let gas_fee =
            wei_to_native(gas_estimate * gas_price).with_scale_round(8, RoundingMode::HalfUp);
        let gas_fee_usd =
            (&gas_fee * &request.native_price_usd).with_scale_round(8, RoundingMode::HalfUp);
        let token_amount = u256_to_ui(expected_out, token_decimals);
        let token_price = price_per_token(&request.amount_native, &token_amount);

        Ok(TradeOutcome {
            success: true,
            dex: "Uniswap".to_string(),
            tx_hash: Some(tx_hash),
            token_amount: Some(token_amount.with_scale_round(8, RoundingMode::HalfUp)),
            gas_fee: Some(gas_fee),
            gas_fee_usd: Some(gas_fee_usd),
            token_price: Some(token_price),
            slippage: Some(request.slippage_pct.clone()),
            error: None,
        })
    }
}
