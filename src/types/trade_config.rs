use crate::schema::trade_configs;
use crate::types::trade::{DexVersion, TradeInterval};
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::pg::Pg;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

/// One row of per-(user, network) trade configuration. At most one row per
/// key has `is_active = true`, enforced by a partial unique index.
#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = trade_configs)]
#[diesel(check_for_backend(Pg))]
#[serde(rename_all = "camelCase")]
pub struct TradeConfig {
    pub id: i32,
    pub user_id: String,
    pub contract_address: String,
    pub wallet_address: String,
    pub network: String,
    pub dex: String,
    pub dex_version: Option<String>,
    pub trade_interval: String,
    pub trade_amount_usd: BigDecimal,
    pub max_gas_ratio: BigDecimal,
    pub slippage_tolerance: BigDecimal,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TradeConfig {
    pub fn interval(&self) -> Result<TradeInterval, crate::types::trade::TradeError> {
        TradeInterval::parse(&self.trade_interval)
    }

    pub fn dex_version(&self) -> Option<DexVersion> {
        self.dex_version.as_deref().and_then(|v| v.parse().ok())
    }
}

#[derive(Debug, Clone, Insertable, Deserialize)]
#[diesel(table_name = trade_configs)]
#[serde(rename_all = "camelCase")]
pub struct NewTradeConfig {
    pub user_id: String,
    pub contract_address: String,
    pub wallet_address: String,
    pub network: String,
    pub dex: String,
    pub dex_version: Option<String>,
    pub trade_interval: String,
    pub trade_amount_usd: BigDecimal,
    pub max_gas_ratio: BigDecimal,
    pub slippage_tolerance: BigDecimal,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}
