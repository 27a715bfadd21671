use crate::chains::ClientPool;
use crate::config::settings::Settings;
use crate::notify::NotificationBus;
use crate::pricing::PriceOracle;
use crate::storage::persistent::{self, DbPool};
use anyhow::{Context, Result};
use std::fmt::Debug;
use std::sync::Arc;
use tracing_subscriber::fmt;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::prelude::*;

/// Everything process-wide, constructed once at startup and passed around by
/// clone. Connections are fixed for the process lifetime.
#[derive(Clone)]
pub struct AppContext {
    pub settings: Arc<Settings>,
    pub clients: ClientPool,
    pub db_pool: DbPool,
    pub oracle: Arc<PriceOracle>,
    pub bus: Arc<NotificationBus>,
}

impl Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("settings", &self.settings)
            .field("clients", &self.clients)
            .finish()
    }
}

impl AppContext {
    pub fn new() -> Result<Self> {
        let settings = Settings::from_env().context("failed to load settings")?;

        let filter = tracing_subscriber::EnvFilter::new(&settings.log_level)
            .add_directive("hyper::client=info".parse().unwrap())
            .add_directive("hyper::proto::h1=info".parse().unwrap())
            .add_directive("h2::codec=info".parse().unwrap())
            .add_directive("reqwest=info".parse().unwrap())
            .add_directive("tokio_postgres=info".parse().unwrap())
            .add_directive("ethers_providers=info".parse().unwrap());
        let fmt_layer = fmt::layer()
            .with_target(true)
            .with_span_events(FmtSpan::CLOSE)
            .with_ansi(true)
            .with_writer(std::io::stderr);
        tracing_subscriber::registry()
            .with(fmt_layer)
            .with(filter)
            .init();

        let clients = ClientPool::from_settings(&settings);
        let db_pool = persistent::connect(&settings.database_url);

        Ok(Self {
            oracle: Arc::new(PriceOracle::new(settings.price_api_base.clone())),
            bus: Arc::new(NotificationBus::new()),
            settings: Arc::new(settings),
            clients,
            db_pool,
        })
    }
}
