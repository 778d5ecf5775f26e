use anyhow::Context;
use tether_bridge::config::BridgeConfig;
use tether_bridge::{app, util};
use tether_core::StopReason;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = BridgeConfig::load().context("Failed to load configuration")?;
    util::init_tracing(config.log_file.as_deref())?;
    util::install_panic_hook();

    match app::run(config).await? {
        StopReason::ChannelClosed => println!("Interpreter exited."),
        StopReason::Shutdown | StopReason::HostClosed => {}
    }
    Ok(())
}
