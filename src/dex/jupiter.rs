use crate::chains::solana::SolanaChain;
use crate::config::constants::{
    DEFAULT_SOL_TOKEN_DECIMALS, SOLANA_FLAT_FEE_SOL, WRAPPED_SOL_MINT,
};
use crate::dex::{price_per_token, Swap};
use crate::types::trade::{SwapRequest, TradeError, TradeOutcome};
use crate::utils::decimals::{raw_to_ui, sol_to_lamports};
use crate::utils::retry::{with_retry, RetryPolicy};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use bigdecimal::num_bigint::BigInt;
use bigdecimal::{BigDecimal, RoundingMode, ToPrimitive};
use serde::Deserialize;
use serde_json::json;
use solana_client::rpc_config::RpcSendTransactionConfig;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::transaction::{Transaction, VersionedTransaction};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JupiterSwapResponse {
    swap_transaction: String,
}

/// Jupiter aggregator on Solana: quote over HTTP, server-built swap
/// transaction, local signing, raw submission, confirmation bounded by the
/// blockhash validity window.
pub struct JupiterAdapter {
    chain: Arc<SolanaChain>,
    http: reqwest::Client,
    base_url: String,
}

impl JupiterAdapter {
    pub fn new(chain: Arc<SolanaChain>, base_url: impl Into<String>) -> Self {
        Self {
            chain,
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(20))
                .build()
                .expect("reqwest client"),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl Swap for JupiterAdapter {
    fn dex(&self) -> &'static str {
        "Jupiter"
    }

    async fn execute_swap(&self, request: &SwapRequest) -> TradeOutcome {
        match self.swap(request).await {
            Ok(outcome) => outcome,
            Err(err) => TradeOutcome::failure(self.dex(), TradeError::AdapterError(format!("{err:#}"))),
        }
    }
}

/// `round(slippage% × 100)` — Jupiter wants basis points.
pub fn slippage_to_bps(slippage_pct: &BigDecimal) -> u64 {
    (slippage_pct * BigDecimal::from(100))
        .with_scale_round(0, RoundingMode::HalfUp)
        .to_u64()
        .unwrap_or(0)
}

impl JupiterAdapter {
    async fn swap(&self, request: &SwapRequest) -> Result<TradeOutcome> {
        let policy = RetryPolicy::for_network(request.network);
        let lamports = sol_to_lamports(&request.amount_native)?;
        let slippage_bps = slippage_to_bps(&request.slippage_pct);
        let output_mint = Pubkey::from_str(&request.token_address)
            .map_err(|e| anyhow!("invalid output mint {}: {e}", request.token_address))?;

        let quote_url = format!(
            "{}/quote?inputMint={WRAPPED_SOL_MINT}&outputMint={output_mint}&amount={lamports}&slippageBps={slippage_bps}",
            self.base_url
        );
        // The quote is forwarded to /swap verbatim, so keep it as raw JSON.
        let quote: serde_json::Value = with_retry(policy, "jupiter.quote", || {
            let url = quote_url.clone();
            async move {
                self.http
                    .get(&url)
                    .send()
                    .await
                    .context("quote request failed")?
                    .error_for_status()
                    .context("quote returned an error status")?
                    .json()
                    .await
                    .context("malformed quote response")
            }
        })
        .await?;
        let out_amount = quote
            .get("outAmount")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow!("quote response has no outAmount"))?
            .to_string();
        debug!("Jupiter quote: {lamports} lamports -> {out_amount} raw tokens");

        let swap_body = json!({
            "quoteResponse": quote,
            "userPublicKey": self.chain.pubkey().to_string(),
            "wrapAndUnwrapSol": true,
            "dynamicComputeUnitLimit": true,
        });
        let swap: JupiterSwapResponse = with_retry(policy, "jupiter.swap", || {
            let body = swap_body.clone();
            async move {
                self.http
                    .post(format!("{}/swap", self.base_url))
                    .json(&body)
                    .send()
                    .await
                    .context("swap request failed")?
                    .error_for_status()
                    .context("swap returned an error status")?
                    .json()
                    .await
                    .context("malformed swap response")
            }
        })
        .await?;

        let tx_bytes = general_purpose::STANDARD
            .decode(&swap.swap_transaction)
            .context("swap transaction is not valid base64")?;
        let signed = self.sign_transaction(&tx_bytes)?;

        let rpc = self.chain.rpc.clone();
        let (_blockhash, last_valid_block_height) = with_retry(policy, "sol.latestBlockhash", || {
            let rpc = rpc.clone();
            async move {
                rpc.get_latest_blockhash_with_commitment(rpc.commitment())
                    .await
                    .map_err(anyhow::Error::from)
            }
        })
        .await?;

        let signature = with_retry(policy, "sol.sendTransaction", || {
            let rpc = rpc.clone();
            let signed = signed.clone();
            async move {
                rpc.send_transaction_with_config(
                    &signed,
                    RpcSendTransactionConfig {
                        skip_preflight: true,
                        ..RpcSendTransactionConfig::default()
                    },
                )
                .await
                .map_err(anyhow::Error::from)
            }
        })
        .await?;
        info!("Jupiter swap sent: {signature}");

        // Poll until the signature lands or the blockhash expires.
        loop {
            if let Some(status) = rpc.get_signature_status(&signature).await? {
                status.map_err(|e| anyhow!("transaction {signature} failed on chain: {e}"))?;
                break;
            }
            let height = rpc.get_block_height().await?;
            if height > last_valid_block_height {
                return Err(anyhow!(
                    "transaction {signature} expired: blockhash no longer valid"
                ));
            }
            tokio::time::sleep(Duration::from_millis(500)).await;
        }

        let decimals = self.output_decimals(&output_mint).await;
        let raw_out = BigInt::from_str(&out_amount).context("quote outAmount is not an integer")?;
        let token_amount = raw_to_ui(&raw_out, decimals);
        let token_price = price_per_token(&request.amount_native, &token_amount);

        let gas_fee: BigDecimal = SOLANA_FLAT_FEE_SOL.parse().expect("flat fee constant parses");
        let gas_fee_usd =
            (&gas_fee * &request.native_price_usd).with_scale_round(8, RoundingMode::HalfUp);

        Ok(TradeOutcome {
            success: true,
            dex: "Jupiter".to_string(),
            tx_hash: Some(signature.to_string()),
            token_amount: Some(token_amount.with_scale_round(8, RoundingMode::HalfUp)),
            gas_fee: Some(gas_fee),
            gas_fee_usd: Some(gas_fee_usd),
            token_price: Some(token_price),
            slippage: Some(request.slippage_pct.clone()),
            error: None,
        })
    }

    /// Deserializes the server-built transaction, preferring the versioned
    /// wire format and falling back to legacy, then signs with our keypair.
    fn sign_transaction(&self, tx_bytes: &[u8]) -> Result<VersionedTransaction> {
        let keypair = self.chain.keypair.as_ref();
        match bincode::deserialize::<VersionedTransaction>(tx_bytes) {
            Ok(tx) => VersionedTransaction::try_new(tx.message, &[keypair])
                .map_err(|e| anyhow!("failed to sign versioned transaction: {e}")),
            Err(versioned_err) => {
                warn!("versioned deserialize failed ({versioned_err}), trying legacy format");
                let mut tx: Transaction = bincode::deserialize(tx_bytes)
                    .context("swap transaction is neither versioned nor legacy")?;
                let blockhash = tx.message.recent_blockhash;
                tx.try_sign(&[keypair], blockhash)
                    .map_err(|e| anyhow!("failed to sign legacy transaction: {e}"))?;
                Ok(VersionedTransaction::from(tx))
            }
        }
    }

    async fn output_decimals(&self, mint: &Pubkey) -> u8 {
        use spl_token::solana_program::program_pack::Pack;
        match self.chain.rpc.get_account_data(mint).await {
            Ok(data) => match spl_token::state::Mint::unpack(&data) {
                Ok(parsed) => parsed.decimals,
                Err(e) => {
                    warn!("failed to unpack mint {mint}: {e}, assuming {DEFAULT_SOL_TOKEN_DECIMALS}");
                    DEFAULT_SOL_TOKEN_DECIMALS
                }
            },
            Err(e) => {
                warn!("failed to fetch mint {mint}: {e}, assuming {DEFAULT_SOL_TOKEN_DECIMALS}");
                DEFAULT_SOL_TOKEN_DECIMALS
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slippage_converts_to_basis_points() {
        assert_eq!(slippage_to_bps(&"1".parse().unwrap()), 100);
        assert_eq!(slippage_to_bps(&"0.5".parse().unwrap()), 50);
        assert_eq!(slippage_to_bps(&"0.124".parse().unwrap()), 12);
        assert_eq!(slippage_to_bps(&"0.125".parse().unwrap()), 13);
        assert_eq!(slippage_to_bps(&"50".parse().unwrap()), 5_000);
    }
}
