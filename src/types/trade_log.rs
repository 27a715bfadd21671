use crate::schema::trade_logs;
use crate::types::trade::TradeOutcome;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::pg::Pg;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a trade attempt. Rows are created `Pending` and move to a
/// terminal state exactly once; terminal rows are never mutated again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeStatus {
    Pending,
    Success,
    Failed,
}

impl TradeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeStatus::Pending => "pending",
            TradeStatus::Success => "success",
            TradeStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeType {
    Automated,
    Manual,
}

impl TradeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeType::Automated => "automated",
            TradeType::Manual => "manual",
        }
    }
}

/// Audit record of a single trade attempt, automated or manual.
#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = trade_logs)]
#[diesel(check_for_backend(Pg))]
#[serde(rename_all = "camelCase")]
pub struct TradeLog {
    pub id: i32,
    pub user_id: String,
    pub config_id: Option<i32>,
    pub network: String,
    pub dex: String,
    pub token_address: String,
    pub trade_type: String,
    pub amount_usd: BigDecimal,
    pub token_amount: Option<BigDecimal>,
    pub gas_fee: Option<BigDecimal>,
    pub gas_fee_usd: Option<BigDecimal>,
    pub status: String,
    pub tx_hash: Option<String>,
    pub error_message: Option<String>,
    pub slippage: Option<BigDecimal>,
    pub token_price: Option<BigDecimal>,
    pub created_at: DateTime<Utc>,
}

impl TradeLog {
    pub fn is_terminal(&self) -> bool {
        self.status != TradeStatus::Pending.as_str()
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = trade_logs)]
pub struct NewTradeLog {
    pub user_id: String,
    pub config_id: Option<i32>,
    pub network: String,
    pub dex: String,
    pub token_address: String,
    pub trade_type: String,
    pub amount_usd: BigDecimal,
    pub status: String,
}

impl NewTradeLog {
    pub fn pending(
        user_id: &str,
        config_id: Option<i32>,
        network: &str,
        dex: &str,
        token_address: &str,
        trade_type: TradeType,
        amount_usd: BigDecimal,
    ) -> Self {
        Self {
            user_id: user_id.to_string(),
            config_id,
            network: network.to_string(),
            dex: dex.to_string(),
            token_address: token_address.to_string(),
            trade_type: trade_type.as_str().to_string(),
            amount_usd,
            status: TradeStatus::Pending.as_str().to_string(),
        }
    }
}

/// Terminal fields written exactly once when the attempt resolves.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = trade_logs)]
pub struct TradeLogTerminal {
    pub status: String,
    pub dex: String,
    pub tx_hash: Option<String>,
    pub token_amount: Option<BigDecimal>,
    pub gas_fee: Option<BigDecimal>,
    pub gas_fee_usd: Option<BigDecimal>,
    pub token_price: Option<BigDecimal>,
    pub slippage: Option<BigDecimal>,
    pub error_message: Option<String>,
}

impl From<&TradeOutcome> for TradeLogTerminal {
    fn from(outcome: &TradeOutcome) -> Self {
        let status = if outcome.success {
            TradeStatus::Success
        } else {
            TradeStatus::Failed
        };
        Self {
            status: status.as_str().to_string(),
            dex: outcome.dex.clone(),
            tx_hash: outcome.tx_hash.clone(),
            token_amount: outcome.token_amount.clone(),
            gas_fee: outcome.gas_fee.clone(),
            gas_fee_usd: outcome.gas_fee_usd.clone(),
            token_price: outcome.token_price.clone(),
            slippage: outcome.slippage.clone(),
            error_message: outcome.error_message(),
        }
    }
}

impl TradeLogTerminal {
    /// Terminal record for an attempt that failed outside the adapter
    /// contract, e.g. a journal write blowing up mid-tick.
    pub fn failed(dex: &str, message: String) -> Self {
        Self {
            status: TradeStatus::Failed.as_str().to_string(),
            dex: dex.to_string(),
            tx_hash: None,
            token_amount: None,
            gas_fee: None,
            gas_fee_usd: None,
            token_price: None,
            slippage: None,
            error_message: Some(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::trade::{TradeError, TradeOutcome};

    #[test]
    fn outcome_maps_to_terminal_status() {
        let failed = TradeOutcome::failure("Uniswap", TradeError::NoLiquidity("0xdead".into()));
        let terminal = TradeLogTerminal::from(&failed);
        assert_eq!(terminal.status, "failed");
        assert!(terminal.error_message.unwrap().contains("no liquidity"));
        assert!(terminal.tx_hash.is_none());
    }
}
