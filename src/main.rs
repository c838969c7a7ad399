use std::sync::Arc;

use appwarden::{
    BrowserRegistry, LogNotifier, PolicyHandle, SystemProcessControl, Warden, WardenConfig,
};
use log::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    info!("appwarden starting up...");

    // The policy starts empty; the configuration surface mutates it through
    // the shared handle while the daemon runs.
    let policy = PolicyHandle::default();

    let warden = Warden::new(
        WardenConfig::default(),
        policy,
        appwarden::platform::default_source(),
        Arc::new(BrowserRegistry::standard()),
        Arc::new(SystemProcessControl::new()),
        Arc::new(LogNotifier),
    );

    warden.set_manual_enabled(true);

    tokio::signal::ctrl_c().await?;
    warden.shutdown().await;
    info!("appwarden stopped");

    Ok(())
}
