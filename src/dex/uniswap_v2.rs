use crate::chains::evm::EvmChain;
use crate::config::constants::{v2_router, wrapped_native, EVM_RECEIPT_TIMEOUT_SECS, SWAP_DEADLINE_SECS};
use crate::dex::{min_out_with_slippage, price_per_token, IErc20, IUniswapV2Router, Swap};
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

/// Uniswap V2 buy path on ETH and BASE. The whole flow is a router
/// `swapExactETHForTokens` against the `[WETH, token]` pair.
pub struct UniswapV2Adapter {
    chain: Arc<EvmChain>,
}

impl UniswapV2Adapter {
    pub fn new(chain: Arc<EvmChain>) -> Self {
        Self { chain }
    }
}

#[async_trait]
impl Swap for UniswapV2Adapter {
    fn dex(&self) -> &'static str {
        "Uniswap"
    }

    async fn execute_swap(&self, request: &SwapRequest) -> TradeOutcome {
        match execute_v2_swap(&self.chain, self.dex(), request).await {
            Ok(outcome) => outcome,
            Err(err) => TradeOutcome::failure(self.dex(), err),
        }
    }
}

/// Router/wrapped-native resolution plus the V2 swap flow, shared with the
/// PancakeSwap adapter (identical protocol, BNB constants).
pub(crate) async fn execute_v2_swap(
    chain: &EvmChain,
    dex_name: &str,
    request: &SwapRequest,
) -> Result<TradeOutcome, TradeError> {
    let network = request.network;
    let policy = RetryPolicy::for_network(network);
    let token: Address = request
        .token_address
        .parse()
        .map_err(|_| TradeError::InvalidAddress {
            network,
            address: request.token_address.clone(),
        })?;
    let router_addr: Address = v2_router(network)
        .expect("V2 router is defined for every EVM network")
        .parse()
        .expect("router constants are checksummed addresses");
    let wrapped: Address = wrapped_native(network)
        .parse()
        .expect("wrapped-native constants are checksummed addresses");

    let client = chain.client.clone();
    let erc20 = IErc20::new(token, client.clone());
    let token_decimals = with_retry(policy, "erc20.decimals", || {
        let erc20 = erc20.clone();
        async move { erc20.decimals().call().await.map_err(anyhow::Error::from) }
    })
    .await
    .map_err(|_| TradeError::InvalidToken(request.token_address.clone()))?;

    let amount_in = native_to_wei(&request.amount_native)
        .map_err(|e| TradeError::AdapterError(format!("amount conversion failed: {e}")))?;

    let router = IUniswapV2Router::new(router_addr, client.clone());
    let path = vec![wrapped, token];
    let amounts = with_retry(policy, "router.getAmountsOut", || {
        let router = router.clone();
        let path = path.clone();
        async move {
            router
                .get_amounts_out(amount_in, path)
                .call()
                .await
                .map_err(anyhow::Error::from)
        }
    })
    .await
    .map_err(|_| TradeError::NoLiquidity(request.token_address.clone()))?;

    let expected_out = amounts.last().copied().unwrap_or_default();
    if expected_out.is_zero() {
        return Err(TradeError::NoLiquidity(request.token_address.clone()));
    }
    let min_out = min_out_with_slippage(expected_out, &request.slippage_pct);
    debug!(
        "{dex_name} quote on {network}: in {amount_in} wei, expected {expected_out}, min out {min_out}"
    );

    let deadline = U256::from(Utc::now().timestamp() as u64 + SWAP_DEADLINE_SECS);
    let call = router
        .swap_exact_eth_for_tokens(min_out, path.clone(), chain.wallet_address, deadline)
        .value(amount_in);

    let gas_estimate = with_retry(policy, "swap.estimateGas", || {
        let call = call.clone();
        async move { call.estimate_gas().await.map_err(anyhow::Error::from) }
    })
    .await
    .map_err(|e| TradeError::AdapterError(format!("gas estimation failed: {e:#}")))?;
    let gas_price = with_retry(policy, "eth.gasPrice", || async {
        chain
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
    info!("{dex_name} swap sent on {network}: {tx_hash}");

    let receipt = tokio::time::timeout(Duration::from_secs(EVM_RECEIPT_TIMEOUT_SECS), pending)
        .await
        .map_err(|_| TradeError::AdapterError(format!("timed out waiting for receipt of {tx_hash}")))?
        .map_err(|e| TradeError::AdapterError(format!("receipt wait failed for {tx_hash}: {e}")))?;
    if let Some(receipt) = receipt {
        if receipt.status == Some(0.into()) {
            let mut outcome =
                TradeOutcome::failure(dex_name, TradeError::AdapterError(format!("transaction {tx_hash} reverted")));
            outcome.tx_hash = Some(tx_hash);
            return Ok(outcome);
        }
    }

    let gas_fee = wei_to_native(gas_estimate * gas_price).with_scale_round(8, RoundingMode::HalfUp);
    let gas_fee_usd =
        (&gas_fee * &request.native_price_usd).with_scale_round(8, RoundingMode::HalfUp);
    let token_amount = u256_to_ui(expected_out, token_decimals);
    let token_price = price_per_token(&request.amount_native, &token_amount);

    Ok(TradeOutcome {
        success: true,
        dex: dex_name.to_string(),
        tx_hash: Some(tx_hash),
        token_amount: Some(token_amount.with_scale_round(8, RoundingMode::HalfUp)),
        gas_fee: Some(gas_fee),
        gas_fee_usd: Some(gas_fee_usd),
        token_price: Some(token_price),
        slippage: Some(request.slippage_pct.clone()),
        error: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;

    #[test]
    fn price_per_token_at_scale_8() {
        let native: BigDecimal = "0.5".parse().unwrap();
        let tokens: BigDecimal = "1500".parse().unwrap();
        assert_eq!(price_per_token(&native, &tokens), "0.00033333".parse().unwrap());
    }
}
