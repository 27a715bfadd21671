//! Thin command surface consumed by the external HTTP/WebSocket transport.
//! Transport, sessions and auth live outside; everything here takes an
//! already-authenticated `user_id`.

use crate::notify::{NotificationBus, NotificationEvent};
use crate::scheduler::BotScheduler;
use crate::storage::persistent::{self as journal, DbPool, NetworkStats};
use crate::trading::TradingService;
use crate::types::bot_status::{BotStatus, BotStatusUpdate, NewBotStatus};
use crate::types::network::Network;
use crate::types::trade::{DexVersion, TradeError, TradeInterval, TradeParams};
use crate::types::trade_config::{NewTradeConfig, TradeConfig};
use crate::types::trade_log::{NewTradeLog, TradeLog, TradeLogTerminal, TradeType};
use anyhow::{Context, Result};
use bigdecimal::BigDecimal;
use chrono::Utc;
use serde::Deserialize;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, instrument, warn};

const DEFAULT_RECENT_TRADES: i64 = 10;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualTradeRequest {
    pub contract_address: String,
    pub network: Network,
    pub dex_version: Option<DexVersion>,
    pub amount_usd: BigDecimal,
    pub slippage_tolerance: BigDecimal,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigValidationError {
    #[error("unknown network: {0}")]
    UnknownNetwork(String),
    #[error("invalid contract address for {0}")]
    BadContractAddress(Network),
    #[error("invalid wallet address for {0}")]
    BadWalletAddress(Network),
    #[error("unrecognized trade interval: {0}")]
    BadInterval(String),
    #[error("unknown dex version: {0}")]
    BadDexVersion(String),
    #[error("tradeAmountUsd must be at least 1")]
    AmountTooSmall,
    #[error("maxGasRatio must be within [0.1, 1.0]")]
    GasRatioOutOfRange,
    #[error("slippageTolerance must be within (0, 50]")]
    SlippageOutOfRange,
}

pub fn validate_config(config: &NewTradeConfig) -> Result<Network, ConfigValidationError> {
    let network = Network::from_str(&config.network)
        .map_err(|_| ConfigValidationError::UnknownNetwork(config.network.clone()))?;
    if !crate::utils::address::is_valid_address(network, &config.contract_address) {
        return Err(ConfigValidationError::BadContractAddress(network));
    }
    if !crate::utils::address::is_valid_address(network, &config.wallet_address) {
        return Err(ConfigValidationError::BadWalletAddress(network));
    }
    TradeInterval::parse(&config.trade_interval)
        .map_err(|_| ConfigValidationError::BadInterval(config.trade_interval.clone()))?;
    if let Some(version) = config.dex_version.as_deref() {
        DexVersion::from_str(version)
            .map_err(|_| ConfigValidationError::BadDexVersion(version.to_string()))?;
    }
    if config.trade_amount_usd < BigDecimal::from(1) {
        return Err(ConfigValidationError::AmountTooSmall);
    }
    let ratio_lo: BigDecimal = "0.1".parse().expect("constant parses");
    if config.max_gas_ratio < ratio_lo || config.max_gas_ratio > BigDecimal::from(1) {
        return Err(ConfigValidationError::GasRatioOutOfRange);
    }
    if config.slippage_tolerance <= BigDecimal::from(0)
        || config.slippage_tolerance > BigDecimal::from(50)
    {
        return Err(ConfigValidationError::SlippageOutOfRange);
    }
    Ok(network)
}

/// All operations the external transport can invoke on the core.
pub struct CommandService {
    pool: DbPool,
    scheduler: Arc<BotScheduler>,
    trading: Arc<TradingService>,
    bus: Arc<NotificationBus>,
}

impl CommandService {
    pub fn new(
        pool: DbPool,
        scheduler: Arc<BotScheduler>,
        trading: Arc<TradingService>,
        bus: Arc<NotificationBus>,
    ) -> Self {
        Self {
            pool,
            scheduler,
            trading,
            bus,
        }
    }

    pub async fn bot_statuses(&self, user: &str) -> Result<Vec<BotStatus>> {
        journal::get_all_bot_statuses(&self.pool, user).await
    }

    #[instrument(skip(self))]
    pub async fn start_bot(&self, user: &str, network: Network) -> Result<(), TradeError> {
        if !self.trading.network_available(network) {
            return Err(TradeError::NetworkUnavailable(network));
        }
        let config = journal::get_active_config(&self.pool, user, network)
            .await
            .map_err(|e| TradeError::AdapterError(format!("config lookup failed: {e:#}")))?
            .ok_or(TradeError::NoActiveConfig(network))?;
        self.scheduler.start_bot(user, &config).await?;
        self.bus
            .broadcast(user, &NotificationEvent::bot_status(network, true))
            .await;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn stop_bot(&self, user: &str, network: Network) -> Result<()> {
        self.scheduler.stop_bot(user, network).await?;
        self.bus
            .broadcast(user, &NotificationEvent::bot_status(network, false))
            .await;
        Ok(())
    }

    pub async fn active_config(&self, user: &str, network: Network) -> Result<Option<TradeConfig>> {
        journal::get_active_config(&self.pool, user, network).await
    }

    pub async fn active_configs(&self, user: &str) -> Result<Vec<TradeConfig>> {
        journal::get_all_active_configs(&self.pool, user).await
    }

    pub async fn all_configs(&self, user: &str) -> Result<Vec<TradeConfig>> {
        journal::get_all_configs(&self.pool, user).await
    }

    /// Persists a new config (atomically deactivating the previous one) and,
    /// when the bot for that network is running and the new config is
    /// active, restarts its schedule with it.
    pub async fn save_config(&self, config: NewTradeConfig) -> Result<TradeConfig> {
        let network = validate_config(&config)?;
        let created = journal::create_config(&self.pool, config).await?;
        if created.is_active && self.scheduler.is_running(&created.user_id, network).await {
            info!(
                "bot on {network} is running for {}; restarting with config {}",
                created.user_id, created.id
            );
            self.scheduler
                .start_bot(&created.user_id, &created)
                .await
                .map_err(|e| anyhow::anyhow!("bot restart failed: {e}"))?;
        }
        Ok(created)
    }

    /// Runs the full trade pipeline once, synchronously, and returns the
    /// terminal log. Counter updates intentionally mirror the automated
    /// path, so manual activity shows in the network's totals.
    #[instrument(skip(self, request), fields(network = %request.network))]
    pub async fn execute_manual_trade(
        &self,
        user: &str,
        request: ManualTradeRequest,
    ) -> Result<TradeLog> {
        let network = request.network;
        let pending = journal::create_trade_log(
            &self.pool,
            NewTradeLog::pending(
                user,
                None,
                network.as_str(),
                network.default_dex(),
                &request.contract_address,
                TradeType::Manual,
                request.amount_usd.clone(),
            ),
        )
        .await
        .context("could not open a trade log")?;

        let params = TradeParams {
            user_id: user.to_string(),
            network,
            token_address: request.contract_address.clone(),
            dex_version: request.dex_version,
            amount_usd: request.amount_usd.clone(),
            max_gas_ratio: crate::config::constants::DEFAULT_MAX_GAS_RATIO
                .parse()
                .expect("constant parses"),
            slippage_tolerance: request.slippage_tolerance.clone(),
        };
        let outcome = self.trading.execute_trade(&params).await;
        let terminal_log =
            journal::update_trade_log(&self.pool, pending.id, TradeLogTerminal::from(&outcome))
                .await
                .context("terminal log write failed")?;

        if let Err(e) = self.bump_counters_for_manual(user, network, &terminal_log).await {
            warn!("counter update after manual trade failed: {e:#}");
        }
        self.bus
            .broadcast(user, &NotificationEvent::new_trade(terminal_log.clone()))
            .await;
        Ok(terminal_log)
    }

    async fn bump_counters_for_manual(
        &self,
        user: &str,
        network: Network,
        log: &TradeLog,
    ) -> Result<()> {
        let current = match journal::get_bot_status(&self.pool, user, network).await? {
            Some(status) => status,
            None => {
                journal::upsert_bot_status(
                    &self.pool,
                    NewBotStatus::stopped(user, network.as_str()),
                )
                .await?
            }
        };
        let succeeded = log.status == "success";
        let mut changes = BotStatusUpdate {
            total_trades_count: Some(current.total_trades_count + 1),
            last_trade_at: Some(Some(Utc::now())),
            ..Default::default()
        };
        if succeeded {
            changes.successful_trades_count = Some(current.successful_trades_count + 1);
            changes.total_volume_usd = Some(&current.total_volume_usd + &log.amount_usd);
        } else {
            changes.failed_trades_count = Some(current.failed_trades_count + 1);
        }
        journal::update_bot_status(&self.pool, user, network, changes).await?;
        Ok(())
    }

    pub async fn recent_trades(&self, user: &str, limit: Option<i64>) -> Result<Vec<TradeLog>> {
        journal::get_recent_trades(&self.pool, user, limit.unwrap_or(DEFAULT_RECENT_TRADES)).await
    }

    pub async fn all_trades(&self, user: &str) -> Result<Vec<TradeLog>> {
        journal::get_all_trades(&self.pool, user).await
    }

    pub async fn network_stats(&self, user: &str) -> Result<Vec<NetworkStats>> {
        journal::get_network_stats(&self.pool, user).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> NewTradeConfig {
        NewTradeConfig {
            user_id: "user-1".into(),
            contract_address: format!("0x{}", "a".repeat(40)),
            wallet_address: format!("0x{}", "b".repeat(40)),
            network: "BNB".into(),
            dex: "PancakeSwap".into(),
            dex_version: None,
            trade_interval: "5min".into(),
            trade_amount_usd: BigDecimal::from(25),
            max_gas_ratio: "0.5".parse().unwrap(),
            slippage_tolerance: "1.5".parse().unwrap(),
            is_active: true,
        }
    }

    #[test]
    fn valid_config_passes() {
        assert_eq!(validate_config(&valid_config()).unwrap(), Network::Bnb);
    }

    #[test]
    fn slippage_boundaries() {
        let mut config = valid_config();
        config.slippage_tolerance = "0.1".parse().unwrap();
        assert!(validate_config(&config).is_ok());
        config.slippage_tolerance = BigDecimal::from(50);
        assert!(validate_config(&config).is_ok());
        config.slippage_tolerance = BigDecimal::from(0);
        assert_eq!(
            validate_config(&config).unwrap_err(),
            ConfigValidationError::SlippageOutOfRange
        );
        config.slippage_tolerance = "50.0001".parse().unwrap();
        assert_eq!(
            validate_config(&config).unwrap_err(),
            ConfigValidationError::SlippageOutOfRange
        );
    }

    #[test]
    fn gas_ratio_boundaries() {
        let mut config = valid_config();
        config.max_gas_ratio = "0.1".parse().unwrap();
        assert!(validate_config(&config).is_ok());
        config.max_gas_ratio = BigDecimal::from(1);
        assert!(validate_config(&config).is_ok());
        config.max_gas_ratio = "0.09".parse().unwrap();
        assert_eq!(
            validate_config(&config).unwrap_err(),
            ConfigValidationError::GasRatioOutOfRange
        );
        config.max_gas_ratio = "1.01".parse().unwrap();
        assert_eq!(
            validate_config(&config).unwrap_err(),
            ConfigValidationError::GasRatioOutOfRange
        );
    }

    #[test]
    fn amount_must_be_at_least_one_dollar() {
        let mut config = valid_config();
        config.trade_amount_usd = "0.99".parse().unwrap();
        assert_eq!(
            validate_config(&config).unwrap_err(),
            ConfigValidationError::AmountTooSmall
        );
        config.trade_amount_usd = BigDecimal::from(1);
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn addresses_must_match_the_network_family() {
        let mut config = valid_config();
        config.contract_address = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v".into();
        assert_eq!(
            validate_config(&config).unwrap_err(),
            ConfigValidationError::BadContractAddress(Network::Bnb)
        );
        let mut config = valid_config();
        config.network = "SOL".into();
        config.contract_address = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v".into();
        config.wallet_address = "4Nd1mY5ZV3ZQiFZkpF2LjnqAtq7tV4J3W8PYZq6K3b9d".into();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn interval_and_version_are_validated() {
        let mut config = valid_config();
        config.trade_interval = "2min".into();
        assert_eq!(
            validate_config(&config).unwrap_err(),
            ConfigValidationError::BadInterval("2min".into())
        );
        let mut config = valid_config();
        config.dex_version = Some("v5".into());
        assert_eq!(
            validate_config(&config).unwrap_err(),
            ConfigValidationError::BadDexVersion("v5".into())
        );
    }
}
