use crate::schema::bot_status;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::pg::Pg;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

/// Durable per-(user, network) bot state. The scheduler's in-memory map is a
/// cache of this row; the row is reconciled against the map at process start.
#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = bot_status)]
#[diesel(check_for_backend(Pg))]
#[serde(rename_all = "camelCase")]
pub struct BotStatus {
    pub id: i32,
    pub user_id: String,
    pub network: String,
    pub is_running: bool,
    pub active_config_id: Option<i32>,
    pub last_trade_at: Option<DateTime<Utc>>,
    pub next_trade_at: Option<DateTime<Utc>>,
    pub total_trades_count: i32,
    pub successful_trades_count: i32,
    pub failed_trades_count: i32,
    pub total_volume_usd: BigDecimal,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = bot_status)]
pub struct NewBotStatus {
    pub user_id: String,
    pub network: String,
    pub is_running: bool,
    pub active_config_id: Option<i32>,
    pub next_trade_at: Option<DateTime<Utc>>,
    pub total_volume_usd: BigDecimal,
}

impl NewBotStatus {
    pub fn stopped(user_id: &str, network: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            network: network.to_string(),
            is_running: false,
            active_config_id: None,
            next_trade_at: None,
            total_volume_usd: BigDecimal::from(0),
        }
    }
}

/// Partial update for a status row. Double-`Option` fields distinguish
/// "leave untouched" (`None`) from "write NULL" (`Some(None)`).
#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = bot_status)]
pub struct BotStatusUpdate {
    pub is_running: Option<bool>,
    pub active_config_id: Option<Option<i32>>,
    pub last_trade_at: Option<Option<DateTime<Utc>>>,
    pub next_trade_at: Option<Option<DateTime<Utc>>>,
    pub total_trades_count: Option<i32>,
    pub successful_trades_count: Option<i32>,
    pub failed_trades_count: Option<i32>,
    pub total_volume_usd: Option<BigDecimal>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl BotStatusUpdate {
    pub fn touch(mut self) -> Self {
        self.updated_at = Some(Utc::now());
        self
    }
}
