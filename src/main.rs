//! Invoicer Client - Main Entry Point
//!
//! Restores the persisted session against the hosted auth service and
//! reports who is signed in.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use invoicer_lib::{
    config::Config,
    logging,
    navigation::TracingNavigator,
    storage::SessionFileStore,
    supabase::SupabaseAuthClient,
    AppContext,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();
    info!("Invoicer client starting...");

    let config = Config::from_env().context("Failed to load configuration")?;
    let storage = SessionFileStore::new(&config.storage_dir);
    let service = SupabaseAuthClient::new(&config)
        .context("Failed to create auth client")?
        .with_storage(storage);

    let mut app = AppContext::new(Arc::new(service), Arc::new(TracingNavigator));
    app.start();

    app.session().init_auth().await;
    match app.session().user() {
        Some(user) => info!("Signed in as user: {}", user.id),
        None => info!("No active session"),
    }

    app.dispose();
    Ok(())
}
