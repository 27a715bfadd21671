use anyhow::Result;
use chainpilot::commands::CommandService;
use chainpilot::config::app_context::AppContext;
use chainpilot::notify::run_ws_server;
use chainpilot::scheduler::BotScheduler;
use chainpilot::trading::TradingService;
use dotenv::dotenv;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let context = AppContext::new()?;
    info!("starting chainpilot: {:?}", context.settings);
    info!("enabled networks: {:?}", context.clients.enabled_networks());

    let trading = Arc::new(TradingService::new(
        context.clients.clone(),
        context.oracle.clone(),
        context.settings.jupiter_api_base.clone(),
    ));
    let scheduler = BotScheduler::new(context.db_pool.clone(), trading.clone(), context.bus.clone());

    // Resume bots that were running when the previous process died.
    scheduler.reconcile().await?;

    // The command surface the embedding HTTP/WebSocket transport drives.
    let _commands = CommandService::new(
        context.db_pool.clone(),
        scheduler.clone(),
        trading,
        context.bus.clone(),
    );

    let bus = context.bus.clone();
    let bind_addr = context.settings.notify_bind_addr.clone();
    let ws_server = tokio::spawn(async move {
        if let Err(e) = run_ws_server(bus, &bind_addr).await {
            error!("notification stream terminated: {e:#}");
        }
    });

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    scheduler.shutdown().await;
    context.bus.close_all().await;
    ws_server.abort();
    Ok(())
}
