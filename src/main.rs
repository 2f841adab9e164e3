mod addressbook;
mod api;
mod blockchain;
mod cipher;
mod config;
mod miner;
mod network;

use std::io;

use actix_web::{App, HttpServer, web};
use dotenvy::dotenv;
use log::{error, info};

use api::AppState;
use config::NodeConfig;

#[actix_web::main]
async fn main() -> io::Result<()> {
    let _ = dotenv();
    env_logger::init();

    let config = NodeConfig::from_env().map_err(|e| {
        error!("invalid configuration: {e}");
        io::Error::new(io::ErrorKind::InvalidInput, e)
    })?;

    let state = web::Data::new(AppState::new(&config)?);

    if !state.ledger.read().is_chain_valid() {
        error!("ledger failed validation at startup; shutting down");
        return Err(io::Error::other("invalid ledger at startup"));
    }

    info!(
        "⛓️ Starting ledger node {} at http://{}:{} (difficulty={}, peers={})",
        config.node_url,
        config.host,
        config.port,
        config.difficulty,
        state.peers.read().len()
    );

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(api::init_routes)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
