//! Per-(user, network) recurring trade tasks. The in-memory map here is the
//! authority on "is a tick currently scheduled"; the durable `bot_status`
//! rows are reconciled against it at process start.

use crate::notify::{NotificationBus, NotificationEvent};
use crate::storage::persistent::{self as journal, DbPool};
use crate::trading::TradingService;
use crate::types::bot_status::{BotStatusUpdate, NewBotStatus};
use crate::types::network::Network;
use crate::types::trade::{TradeError, TradeInterval, TradeParams};
use crate::types::trade_config::TradeConfig;
use crate::types::trade_log::{NewTradeLog, TradeLogTerminal, TradeType};
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

type BotKey = (String, Network);

struct ScheduleEntry {
    handle: JoinHandle<()>,
    /// Held for the duration of one tick; a firing that cannot take it is
    /// dropped, not queued.
    gate: Arc<Mutex<()>>,
}

pub struct BotScheduler {
    entries: Mutex<HashMap<BotKey, ScheduleEntry>>,
    pool: DbPool,
    trading: Arc<TradingService>,
    bus: Arc<NotificationBus>,
}

/// The smallest wall-clock instant strictly after `after` whose epoch minute
/// is divisible by the interval. `10min` fires at :00, :10, :20…; `1hour` at
/// the top of each hour.
pub fn next_aligned_fire(after: DateTime<Utc>, interval: TradeInterval) -> DateTime<Utc> {
    let step = interval.minutes() as i64;
    let epoch_min = after.timestamp().div_euclid(60);
    let next_min = (epoch_min.div_euclid(step) + 1) * step;
    DateTime::<Utc>::from_timestamp(next_min * 60, 0).expect("aligned minute is a valid timestamp")
}

impl BotScheduler {
    pub fn new(pool: DbPool, trading: Arc<TradingService>, bus: Arc<NotificationBus>) -> Arc<Self> {
        Arc::new(Self {
            entries: Mutex::new(HashMap::new()),
            pool,
            trading,
            bus,
        })
    }

    /// Installs (or cleanly reinstalls) the recurring task for this config.
    /// Holding the map lock across the whole operation serializes start,
    /// stop and reconfigure for the same key.
    pub async fn start_bot(self: &Arc<Self>, user: &str, config: &TradeConfig) -> Result<(), TradeError> {
        let network: Network = config
            .network
            .parse()
            .map_err(|_| TradeError::AdapterError(format!("config {} has unknown network {}", config.id, config.network)))?;
        let interval = config.interval()?;
        let key = (user.to_string(), network);

        let mut entries = self.entries.lock().await;
        if let Some(previous) = entries.remove(&key) {
            previous.handle.abort();
            debug!("replaced running schedule for {user}/{network}");
        }

        let next_at = next_aligned_fire(Utc::now(), interval);
        journal::upsert_bot_status(
            &self.pool,
            NewBotStatus {
                user_id: user.to_string(),
                network: network.as_str().to_string(),
                is_running: true,
                active_config_id: Some(config.id),
                next_trade_at: Some(next_at),
                total_volume_usd: bigdecimal::BigDecimal::from(0),
            },
        )
        .await
        .map_err(|e| TradeError::AdapterError(format!("failed to persist bot status: {e:#}")))?;

        let gate = Arc::new(Mutex::new(()));
        let handle = tokio::spawn(run_schedule(
            self.clone(),
            config.clone(),
            network,
            interval,
            gate.clone(),
        ));
        entries.insert(key, ScheduleEntry { handle, gate });
        info!("bot started for {user}/{network}, first tick at {next_at}");
        Ok(())
    }

    /// Cancels the schedule if present and persists the stopped state. An
    /// already-running tick is left to finish and write its terminal log.
    pub async fn stop_bot(&self, user: &str, network: Network) -> Result<()> {
        let mut entries = self.entries.lock().await;
        if let Some(entry) = entries.remove(&(user.to_string(), network)) {
            entry.handle.abort();
            info!("bot stopped for {user}/{network}");
        }
        drop(entries);

        if journal::get_bot_status(&self.pool, user, network).await?.is_some() {
            journal::update_bot_status(
                &self.pool,
                user,
                network,
                BotStatusUpdate {
                    is_running: Some(false),
                    next_trade_at: Some(None),
                    ..Default::default()
                },
            )
            .await?;
        }
        Ok(())
    }

    pub async fn is_running(&self, user: &str, network: Network) -> bool {
        self.entries
            .lock()
            .await
            .contains_key(&(user.to_string(), network))
    }

    /// Re-installs timers for every `is_running` row whose active config is
    /// still there; rows pointing at a deleted config are forced stopped.
    pub async fn reconcile(self: &Arc<Self>) -> Result<()> {
        let running = journal::get_running_bot_statuses(&self.pool).await?;
        info!("reconciling {} bot status rows", running.len());
        for status in running {
            let Ok(network) = status.network.parse::<Network>() else {
                warn!("skipping status row {} with unknown network {}", status.id, status.network);
                continue;
            };
            let config = match status.active_config_id {
                Some(config_id) => journal::get_config_by_id(&self.pool, config_id)
                    .await?
                    .filter(|c| c.is_active),
                None => None,
            };
            match config {
                Some(config) => {
                    if let Err(e) = self.start_bot(&status.user_id, &config).await {
                        warn!("could not resume bot for {}/{network}: {e}", status.user_id);
                    }
                }
                None => {
                    warn!(
                        "bot status for {}/{network} points at a missing config; forcing stopped",
                        status.user_id
                    );
                    journal::update_bot_status(
                        &self.pool,
                        &status.user_id,
                        network,
                        BotStatusUpdate {
                            is_running: Some(false),
                            next_trade_at: Some(None),
                            ..Default::default()
                        },
                    )
                    .await?;
                }
            }
        }
        Ok(())
    }

    /// Cancels every timer. In-flight ticks still finish; the next process
    /// reconciles from the journal.
    pub async fn shutdown(&self) {
        let mut entries = self.entries.lock().await;
        for (key, entry) in entries.drain() {
            entry.handle.abort();
            debug!("cancelled schedule for {}/{}", key.0, key.1);
        }
    }

    /// One firing: pending log, trade, terminal log, counters, notifications.
    /// Never propagates an error to the timer; failures after the log row
    /// exists still terminalize it as failed.
    pub async fn execute_scheduled_trade(&self, config: &TradeConfig, network: Network) {
        let pending = match journal::create_trade_log(
            &self.pool,
            NewTradeLog::pending(
                &config.user_id,
                Some(config.id),
                network.as_str(),
                &config.dex,
                &config.contract_address,
                TradeType::Automated,
                config.trade_amount_usd.clone(),
            ),
        )
        .await
        {
            Ok(log) => log,
            Err(e) => {
                error!("tick for {}/{network} could not open a trade log: {e:#}", config.user_id);
                return;
            }
        };

        let params = TradeParams {
            user_id: config.user_id.clone(),
            network,
            token_address: config.contract_address.clone(),
            dex_version: config.dex_version(),
            amount_usd: config.trade_amount_usd.clone(),
            max_gas_ratio: config.max_gas_ratio.clone(),
            slippage_tolerance: config.slippage_tolerance.clone(),
        };
        let outcome = self.trading.execute_trade(&params).await;

        if let Err(e) = self.finalize_tick(config, network, pending.id, &outcome).await {
            error!("tick bookkeeping failed for {}/{network}: {e:#}", config.user_id);
            let fallback =
                TradeLogTerminal::failed(&outcome.dex, format!("trade bookkeeping failed: {e:#}"));
            if let Err(e) = journal::update_trade_log(&self.pool, pending.id, fallback).await {
                error!("could not terminalize trade log {}: {e:#}", pending.id);
            }
        }
    }

    async fn finalize_tick(
        &self,
        config: &TradeConfig,
        network: Network,
        log_id: i32,
        outcome: &crate::types::trade::TradeOutcome,
    ) -> Result<()> {
        let updated_log = journal::update_trade_log(&self.pool, log_id, TradeLogTerminal::from(outcome))
            .await
            .context("terminal log write failed")?;

        let interval = config.interval().map_err(|e| anyhow!("{e}"))?;
        let now = Utc::now();
        let current = journal::get_bot_status(&self.pool, &config.user_id, network)
            .await?
            .ok_or_else(|| anyhow!("bot status row vanished for {}/{network}", config.user_id))?;

        let mut changes = BotStatusUpdate {
            total_trades_count: Some(current.total_trades_count + 1),
            last_trade_at: Some(Some(now)),
            next_trade_at: Some(Some(next_aligned_fire(now, interval))),
            ..Default::default()
        };
        if outcome.success {
            changes.successful_trades_count = Some(current.successful_trades_count + 1);
            changes.total_volume_usd = Some(&current.total_volume_usd + &updated_log.amount_usd);
        } else {
            changes.failed_trades_count = Some(current.failed_trades_count + 1);
        }
        let status = journal::update_bot_status(&self.pool, &config.user_id, network, changes).await?;

        self.bus
            .broadcast(&config.user_id, &NotificationEvent::new_trade(updated_log))
            .await;
        self.bus
            .broadcast(
                &config.user_id,
                &NotificationEvent::bot_status(network, status.is_running),
            )
            .await;
        Ok(())
    }
}

/// Timer loop for one bot. Fires on aligned boundaries; a firing that finds
/// the previous tick still holding the gate is skipped outright.
async fn run_schedule(
    scheduler: Arc<BotScheduler>,
    config: TradeConfig,
    network: Network,
    interval: TradeInterval,
    gate: Arc<Mutex<()>>,
) {
    let mut next = next_aligned_fire(Utc::now(), interval);
    loop {
        let delay = (next - Utc::now())
            .to_std()
            .unwrap_or(Duration::from_secs(0));
        tokio::time::sleep(delay).await;

        match gate.clone().try_lock_owned() {
            Ok(guard) => {
                let scheduler = scheduler.clone();
                let config = config.clone();
                tokio::spawn(async move {
                    let _tick = guard;
                    scheduler.execute_scheduled_trade(&config, network).await;
                });
            }
            Err(_) => {
                warn!(
                    "tick for {}/{network} overlaps a still-running trade; skipping",
                    config.user_id
                );
            }
        }
        next = next_aligned_fire(next, interval);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn ten_minute_interval_aligns_to_wall_clock() {
        let started = Utc.with_ymd_and_hms(2024, 5, 1, 10, 3, 27).unwrap();
        let first = next_aligned_fire(started, TradeInterval::TenMin);
        assert_eq!(first, Utc.with_ymd_and_hms(2024, 5, 1, 10, 10, 0).unwrap());
        let second = next_aligned_fire(first, TradeInterval::TenMin);
        assert_eq!(second, Utc.with_ymd_and_hms(2024, 5, 1, 10, 20, 0).unwrap());
    }

    #[test]
    fn boundary_fire_advances_a_full_interval() {
        let on_boundary = Utc.with_ymd_and_hms(2024, 5, 1, 10, 30, 0).unwrap();
        assert_eq!(
            next_aligned_fire(on_boundary, TradeInterval::ThirtyMin),
            Utc.with_ymd_and_hms(2024, 5, 1, 11, 0, 0).unwrap()
        );
    }

    #[test]
    fn hourly_fires_at_the_top_of_the_hour() {
        let late = Utc.with_ymd_and_hms(2024, 5, 1, 10, 59, 59).unwrap();
        assert_eq!(
            next_aligned_fire(late, TradeInterval::OneHour),
            Utc.with_ymd_and_hms(2024, 5, 1, 11, 0, 0).unwrap()
        );
    }

    #[test]
    fn every_minute_is_strictly_future() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        let next = next_aligned_fire(now, TradeInterval::OneMin);
        assert!(next > now);
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 5, 1, 10, 1, 0).unwrap());
    }
}
