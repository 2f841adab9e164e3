mod address;
mod chain;
mod health;
mod messages;
pub mod models;
mod peers;
mod stats;

use actix_web::web::{self, ServiceConfig};

pub use models::AppState;

pub fn init_routes(cfg: &mut ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .service(health::health_check)
            .service(chain::get_blockchain)
            .service(chain::validate_chain)
            .service(chain::add_block)
            .service(chain::resolve_consensus)
            .service(messages::send_message)
            .service(messages::receive_latest)
            .service(peers::list_peers)
            .service(peers::register_peer)
            .service(peers::register_peers)
            .service(address::get_address)
            .service(address::record_address)
            .service(stats::get_stats),
    );
}
