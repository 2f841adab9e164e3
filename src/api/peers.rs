use actix_web::{HttpResponse, Responder, get, post, web};

use super::models::{
    AppState, PeersResponse, RegisterPeerRequest, RegisterPeersRequest, RegisterResponse,
};

#[get("/peers/")]
pub async fn list_peers(state: web::Data<AppState>) -> impl Responder {
    let registry = state.peers.read();
    HttpResponse::Ok().json(PeersResponse {
        self_address: registry.self_address().to_string(),
        peers: registry.peers().to_vec(),
    })
}

/// Register a single peer. Re-registering, or registering ourselves, is a no-op.
#[post("/peers/")]
pub async fn register_peer(
    state: web::Data<AppState>,
    req: web::Json<RegisterPeerRequest>,
) -> impl Responder {
    let mut registry = state.peers.write();
    let registered = usize::from(registry.register(&req.address));
    HttpResponse::Ok().json(RegisterResponse {
        registered,
        total_peers: registry.len(),
    })
}

#[post("/peers/bulk/")]
pub async fn register_peers(
    state: web::Data<AppState>,
    req: web::Json<RegisterPeersRequest>,
) -> impl Responder {
    let mut registry = state.peers.write();
    let registered = registry.register_many(&req.addresses);
    HttpResponse::Ok().json(RegisterResponse {
        registered,
        total_peers: registry.len(),
    })
}
