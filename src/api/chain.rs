use actix_web::{HttpResponse, Responder, get, post, web};
use log::{info, warn};

use super::models::{AppState, ConsensusResponse, NewBlockRequest, ValidateResponse};
use crate::blockchain::Block;

/// Full ledger (chain + pending messages). Peers fetch this during consensus.
#[get("/blockchain/")]
pub async fn get_blockchain(state: web::Data<AppState>) -> impl Responder {
    let snapshot = state.ledger.read().snapshot();
    HttpResponse::Ok().json(snapshot)
}

/// Validate the whole chain.
#[get("/validate/")]
pub async fn validate_chain(state: web::Data<AppState>) -> impl Responder {
    let ledger = state.ledger.read();
    HttpResponse::Ok().json(ValidateResponse {
        valid: ledger.is_chain_valid(),
        length: ledger.len(),
        difficulty: ledger.difficulty(),
    })
}

/// Build a block around a raw message and hand it to the miner.
#[post("/blocks/")]
pub async fn add_block(
    state: web::Data<AppState>,
    req: web::Json<NewBlockRequest>,
) -> impl Responder {
    let index = state.ledger.read().len() as u64;
    let block = Block::new(index, req.into_inner().message, String::new());

    match state.miner.append_block(block).await {
        Ok(sealed) => HttpResponse::Ok().json(sealed),
        Err(e) => {
            warn!("POST /blocks/ - mining failed: {e}");
            HttpResponse::ServiceUnavailable().body(e.to_string())
        }
    }
}

/// Compare against every registered peer and adopt the longest valid chain.
#[get("/consensus/")]
pub async fn resolve_consensus(state: web::Data<AppState>) -> impl Responder {
    let outcome = state.resolver.resolve().await;
    info!(
        "GET /consensus/ - replaced={} length={} failed_peers={}",
        outcome.replaced,
        outcome.chain.len(),
        outcome.failures.len()
    );
    let note = if outcome.replaced {
        "This chain has been replaced."
    } else {
        "Current chain has not been replaced."
    };
    HttpResponse::Ok().json(ConsensusResponse {
        note,
        replaced: outcome.replaced,
        chain: outcome.chain,
        failures: outcome.failures,
    })
}
