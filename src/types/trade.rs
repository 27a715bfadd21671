use crate::types::network::Network;
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Typed failure surface of the trading core. These never cross the public
/// boundary as panics; they are folded into a [`TradeOutcome`] with
/// `success=false` and the rendered message.
#[derive(Error, Debug, Clone, Serialize)]
pub enum TradeError {
    #[error("network {0} is unavailable: missing RPC endpoint or signing key")]
    NetworkUnavailable(Network),
    #[error("invalid token address {address} for {network}")]
    InvalidAddress { network: Network, address: String },
    #[error("gas fee ${gas_fee_usd} exceeds max gas ratio {max_ratio} of trade amount ${amount_usd} (ratio {ratio})")]
    GasTooHigh {
        gas_fee_usd: BigDecimal,
        amount_usd: BigDecimal,
        ratio: BigDecimal,
        max_ratio: BigDecimal,
    },
    #[error("invalid token: contract {0} does not expose decimals()")]
    InvalidToken(String),
    #[error("no liquidity for token {0}")]
    NoLiquidity(String),
    #[error("no Uniswap V3 pool with liquidity for token {0}")]
    NoV3Pool(String),
    #[error("unrecognized trade interval: {0}")]
    InvalidInterval(String),
    #[error("{0} is not implemented")]
    NotImplemented(String),
    #[error("{0}")]
    AdapterError(String),
    #[error("no active trade config for {0}")]
    NoActiveConfig(Network),
}

/// Uniswap protocol version selector. Only meaningful on ETH/BASE; other
/// networks ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DexVersion {
    Auto,
    V2,
    V3,
    V4,
}

impl FromStr for DexVersion {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(DexVersion::Auto),
            "v2" => Ok(DexVersion::V2),
            "v3" => Ok(DexVersion::V3),
            "v4" => Ok(DexVersion::V4),
            other => Err(anyhow::anyhow!("unknown dex version: {other}")),
        }
    }
}

impl fmt::Display for DexVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DexVersion::Auto => "auto",
            DexVersion::V2 => "v2",
            DexVersion::V3 => "v3",
            DexVersion::V4 => "v4",
        };
        f.write_str(s)
    }
}

/// The recurring schedule granularity a bot can run at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeInterval {
    OneMin,
    FiveMin,
    TenMin,
    ThirtyMin,
    OneHour,
}

impl TradeInterval {
    pub fn parse(s: &str) -> Result<Self, TradeError> {
        match s {
            "1min" => Ok(TradeInterval::OneMin),
            "5min" => Ok(TradeInterval::FiveMin),
            "10min" => Ok(TradeInterval::TenMin),
            "30min" => Ok(TradeInterval::ThirtyMin),
            "1hour" => Ok(TradeInterval::OneHour),
            other => Err(TradeError::InvalidInterval(other.to_string())),
        }
    }

    pub fn minutes(&self) -> u32 {
        match self {
            TradeInterval::OneMin => 1,
            TradeInterval::FiveMin => 5,
            TradeInterval::TenMin => 10,
            TradeInterval::ThirtyMin => 30,
            TradeInterval::OneHour => 60,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TradeInterval::OneMin => "1min",
            TradeInterval::FiveMin => "5min",
            TradeInterval::TenMin => "10min",
            TradeInterval::ThirtyMin => "30min",
            TradeInterval::OneHour => "1hour",
        }
    }
}

impl fmt::Display for TradeInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized input to the trading service, whether the trade comes from a
/// scheduler tick or the manual path.
#[derive(Debug, Clone)]
pub struct TradeParams {
    pub user_id: String,
    pub network: Network,
    pub token_address: String,
    pub dex_version: Option<DexVersion>,
    pub amount_usd: BigDecimal,
    pub max_gas_ratio: BigDecimal,
    pub slippage_tolerance: BigDecimal,
}

/// What an adapter needs to perform one buy: everything is already resolved
/// to the native unit of the chain.
#[derive(Debug, Clone)]
pub struct SwapRequest {
    pub network: Network,
    pub token_address: String,
    pub amount_native: BigDecimal,
    pub slippage_pct: BigDecimal,
    pub native_price_usd: BigDecimal,
}

/// Structured result of one trade attempt. Written into the journal verbatim
/// and surfaced to the UI as-is.
#[derive(Debug, Clone, Serialize)]
pub struct TradeOutcome {
    pub success: bool,
    pub dex: String,
    pub tx_hash: Option<String>,
    pub token_amount: Option<BigDecimal>,
    pub gas_fee: Option<BigDecimal>,
    pub gas_fee_usd: Option<BigDecimal>,
    pub token_price: Option<BigDecimal>,
    pub slippage: Option<BigDecimal>,
    #[serde(skip)]
    pub error: Option<TradeError>,
}

impl TradeOutcome {
    pub fn failure(dex: impl Into<String>, error: TradeError) -> Self {
        Self {
            success: false,
            dex: dex.into(),
            tx_hash: None,
            token_amount: None,
            gas_fee: None,
            gas_fee_usd: None,
            token_price: None,
            slippage: None,
            error: Some(error),
        }
    }

    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_round_trip() {
        for s in ["1min", "5min", "10min", "30min", "1hour"] {
            assert_eq!(TradeInterval::parse(s).unwrap().as_str(), s);
        }
        assert!(matches!(
            TradeInterval::parse("2min"),
            Err(TradeError::InvalidInterval(_))
        ));
    }

    #[test]
    fn gas_too_high_message_mentions_ratio() {
        let err = TradeError::GasTooHigh {
            gas_fee_usd: BigDecimal::from(4),
            amount_usd: BigDecimal::from(5),
            ratio: "0.8".parse().unwrap(),
            max_ratio: "0.5".parse().unwrap(),
        };
        let msg = err.to_string();
        assert!(msg.contains("ratio"));
        assert!(msg.contains("0.5"));
    }
}
