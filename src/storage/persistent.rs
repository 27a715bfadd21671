//! The trade journal. Exclusive owner of configs, trade logs and bot status;
//! everything else holds transient copies.

use crate::types::bot_status::{BotStatus, BotStatusUpdate, NewBotStatus};
use crate::types::network::{Network, ALL_NETWORKS};
use crate::types::trade_config::{NewTradeConfig, TradeConfig};
use crate::types::trade_log::{NewTradeLog, TradeLog, TradeLogTerminal, TradeStatus};
use anyhow::{anyhow, Result};
use bigdecimal::BigDecimal;
use chrono::Utc;
use diesel::dsl::sum;
use diesel::prelude::*;
use diesel_async::pooled_connection::deadpool::Pool;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use serde::Serialize;
use std::sync::Arc;

pub type DbPool = Arc<Pool<AsyncPgConnection>>;

pub fn connect(database_url: &str) -> DbPool {
    let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);
    Arc::new(
        Pool::builder(manager)
            .build()
            .expect("Failed to create pool."),
    )
}

/// Inserts the new config and deactivates every prior config for the same
/// `(user, network)` in one transaction, so the partial unique index on
/// active rows never trips.
pub async fn create_config(pool: &DbPool, new_config: NewTradeConfig) -> Result<TradeConfig> {
    use crate::schema::trade_configs::dsl::*;
    let mut conn = pool.get().await?;
    let created = conn
        .transaction::<TradeConfig, diesel::result::Error, _>(|conn| {
            async move {
                diesel::update(
                    trade_configs
                        .filter(user_id.eq(&new_config.user_id))
                        .filter(network.eq(&new_config.network))
                        .filter(is_active.eq(true)),
                )
                .set((is_active.eq(false), updated_at.eq(Utc::now())))
                .execute(conn)
                .await?;
                diesel::insert_into(trade_configs)
                    .values(&new_config)
                    .returning(TradeConfig::as_returning())
                    .get_result(conn)
                    .await
            }
            .scope_boxed()
        })
        .await?;
    Ok(created)
}

pub async fn get_config_by_id(pool: &DbPool, config_id: i32) -> Result<Option<TradeConfig>> {
    use crate::schema::trade_configs::dsl::*;
    let mut conn = pool.get().await?;
    let row = trade_configs
        .find(config_id)
        .select(TradeConfig::as_select())
        .first(&mut conn)
        .await
        .optional()?;
    Ok(row)
}

pub async fn get_active_config(
    pool: &DbPool,
    user: &str,
    net: Network,
) -> Result<Option<TradeConfig>> {
    use crate::schema::trade_configs::dsl::*;
    let mut conn = pool.get().await?;
    let row = trade_configs
        .filter(user_id.eq(user))
        .filter(network.eq(net.as_str()))
        .filter(is_active.eq(true))
        .select(TradeConfig::as_select())
        .first(&mut conn)
        .await
        .optional()?;
    Ok(row)
}

pub async fn get_all_active_configs(pool: &DbPool, user: &str) -> Result<Vec<TradeConfig>> {
    use crate::schema::trade_configs::dsl::*;
    let mut conn = pool.get().await?;
    let rows = trade_configs
        .filter(user_id.eq(user))
        .filter(is_active.eq(true))
        .order(network.asc())
        .select(TradeConfig::as_select())
        .load(&mut conn)
        .await?;
    Ok(rows)
}

pub async fn get_all_configs(pool: &DbPool, user: &str) -> Result<Vec<TradeConfig>> {
    use crate::schema::trade_configs::dsl::*;
    let mut conn = pool.get().await?;
    let rows = trade_configs
        .filter(user_id.eq(user))
        .order(created_at.desc())
        .select(TradeConfig::as_select())
        .load(&mut conn)
        .await?;
    Ok(rows)
}

pub async fn create_trade_log(pool: &DbPool, new_log: NewTradeLog) -> Result<TradeLog> {
    use crate::schema::trade_logs::dsl::*;
    let mut conn = pool.get().await?;
    let row = diesel::insert_into(trade_logs)
        .values(&new_log)
        .returning(TradeLog::as_returning())
        .get_result(&mut conn)
        .await?;
    Ok(row)
}

/// Moves a pending log to its terminal state. Terminal rows are immutable; a
/// second terminal write is a bug and comes back as an error.
pub async fn update_trade_log(
    pool: &DbPool,
    log_id: i32,
    terminal: TradeLogTerminal,
) -> Result<TradeLog> {
    use crate::schema::trade_logs::dsl::*;
    let mut conn = pool.get().await?;
    let updated = diesel::update(
        trade_logs
            .filter(id.eq(log_id))
            .filter(status.eq(TradeStatus::Pending.as_str())),
    )
    .set(&terminal)
    .returning(TradeLog::as_returning())
    .get_result(&mut conn)
    .await
    .optional()?;
    updated.ok_or_else(|| anyhow!("trade log {log_id} is already terminal or missing"))
}

pub async fn get_bot_status(pool: &DbPool, user: &str, net: Network) -> Result<Option<BotStatus>> {
    use crate::schema::bot_status::dsl::*;
    let mut conn = pool.get().await?;
    let row = bot_status
        .filter(user_id.eq(user))
        .filter(network.eq(net.as_str()))
        .select(BotStatus::as_select())
        .first(&mut conn)
        .await
        .optional()?;
    Ok(row)
}

pub async fn get_all_bot_statuses(pool: &DbPool, user: &str) -> Result<Vec<BotStatus>> {
    use crate::schema::bot_status::dsl::*;
    let mut conn = pool.get().await?;
    let rows = bot_status
        .filter(user_id.eq(user))
        .order(network.asc())
        .select(BotStatus::as_select())
        .load(&mut conn)
        .await?;
    Ok(rows)
}

/// Every row claiming to be running, for startup reconciliation.
pub async fn get_running_bot_statuses(pool: &DbPool) -> Result<Vec<BotStatus>> {
    use crate::schema::bot_status::dsl::*;
    let mut conn = pool.get().await?;
    let rows = bot_status
        .filter(is_running.eq(true))
        .select(BotStatus::as_select())
        .load(&mut conn)
        .await?;
    Ok(rows)
}

pub async fn upsert_bot_status(pool: &DbPool, new_status: NewBotStatus) -> Result<BotStatus> {
    use crate::schema::bot_status::dsl::*;
    let mut conn = pool.get().await?;
    let row = diesel::insert_into(bot_status)
        .values(new_status.clone())
        .on_conflict((user_id, network))
        .do_update()
        .set((
            is_running.eq(new_status.is_running),
            active_config_id.eq(new_status.active_config_id),
            next_trade_at.eq(new_status.next_trade_at),
            updated_at.eq(Utc::now()),
        ))
        .returning(BotStatus::as_returning())
        .get_result(&mut conn)
        .await?;
    Ok(row)
}

pub async fn update_bot_status(
    pool: &DbPool,
    user: &str,
    net: Network,
    changes: BotStatusUpdate,
) -> Result<BotStatus> {
    use crate::schema::bot_status::dsl::*;
    let mut conn = pool.get().await?;
    let row = diesel::update(
        bot_status
            .filter(user_id.eq(user))
            .filter(network.eq(net.as_str())),
    )
    .set(&changes.touch())
    .returning(BotStatus::as_returning())
    .get_result(&mut conn)
    .await?;
    Ok(row)
}

pub async fn get_recent_trades(pool: &DbPool, user: &str, limit: i64) -> Result<Vec<TradeLog>> {
    use crate::schema::trade_logs::dsl::*;
    let mut conn = pool.get().await?;
    let rows = trade_logs
        .filter(user_id.eq(user))
        .order(created_at.desc())
        .limit(limit)
        .select(TradeLog::as_select())
        .load(&mut conn)
        .await?;
    Ok(rows)
}

pub async fn get_all_trades(pool: &DbPool, user: &str) -> Result<Vec<TradeLog>> {
    use crate::schema::trade_logs::dsl::*;
    let mut conn = pool.get().await?;
    let rows = trade_logs
        .filter(user_id.eq(user))
        .order(created_at.desc())
        .select(TradeLog::as_select())
        .load(&mut conn)
        .await?;
    Ok(rows)
}

/// Per-network aggregation over a user's trade logs. Every network appears
/// in the result, zero-valued when the user never traded there.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkStats {
    pub network: String,
    pub total_trades: i64,
    pub successful_trades: i64,
    pub failed_trades: i64,
    pub total_gas_fee: BigDecimal,
    pub total_gas_fee_usd: BigDecimal,
    pub total_volume_usd: BigDecimal,
}

pub async fn get_network_stats(pool: &DbPool, user: &str) -> Result<Vec<NetworkStats>> {
    use crate::schema::trade_logs::dsl::*;
    let mut conn = pool.get().await?;
    let mut stats = Vec::with_capacity(ALL_NETWORKS.len());
    for net in ALL_NETWORKS {
        let total: i64 = trade_logs
            .filter(user_id.eq(user))
            .filter(network.eq(net.as_str()))
            .count()
            .get_result(&mut conn)
            .await?;
        let successful: i64 = trade_logs
            .filter(user_id.eq(user))
            .filter(network.eq(net.as_str()))
            .filter(status.eq(TradeStatus::Success.as_str()))
            .count()
            .get_result(&mut conn)
            .await?;
        let failed: i64 = trade_logs
            .filter(user_id.eq(user))
            .filter(network.eq(net.as_str()))
            .filter(status.eq(TradeStatus::Failed.as_str()))
            .count()
            .get_result(&mut conn)
            .await?;
        let (fee_sum, fee_usd_sum, volume_sum): (
            Option<BigDecimal>,
            Option<BigDecimal>,
            Option<BigDecimal>,
        ) = trade_logs
            .filter(user_id.eq(user))
            .filter(network.eq(net.as_str()))
            .select((sum(gas_fee), sum(gas_fee_usd), sum(amount_usd)))
            .first(&mut conn)
            .await?;
        stats.push(NetworkStats {
            network: net.as_str().to_string(),
            total_trades: total,
            successful_trades: successful,
            failed_trades: failed,
            total_gas_fee: fee_sum.unwrap_or_else(|| BigDecimal::from(0)),
            total_gas_fee_usd: fee_usd_sum.unwrap_or_else(|| BigDecimal::from(0)),
            total_volume_usd: volume_sum.unwrap_or_else(|| BigDecimal::from(0)),
        });
    }
    Ok(stats)
}
