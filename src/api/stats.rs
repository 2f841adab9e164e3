use actix_web::{HttpResponse, Responder, get, web};

use super::models::{AppState, StatsResponse};

/// How many recent block intervals the average covers.
pub const STATS_WINDOW: usize = 10;

#[get("/stats/")]
pub async fn get_stats(state: web::Data<AppState>) -> impl Responder {
    // Snapshot ledger figures under one short read lock
    let (height, difficulty, pending_messages, last_interval_ms, avg_interval_ms) = {
        let ledger = state.ledger.read();
        let chain = ledger.chain();
        let height = chain.len();

        let last_interval_ms = match chain {
            [.., older, newer] if older.index > 0 => {
                Some((newer.timestamp - older.timestamp).max(0))
            }
            _ => None,
        };

        // average over the window, genesis excluded (its timestamp is node start)
        let avg_interval_ms = if height >= STATS_WINDOW + 2 {
            let recent = &chain[height - (STATS_WINDOW + 1)..];
            let total: i64 = recent
                .windows(2)
                .map(|pair| (pair[1].timestamp - pair[0].timestamp).max(0))
                .sum();
            Some(total as f64 / STATS_WINDOW as f64)
        } else {
            None
        };

        (
            height,
            ledger.difficulty(),
            ledger.pending().len(),
            last_interval_ms,
            avg_interval_ms,
        )
    };

    let peers = state.peers.read().len();

    HttpResponse::Ok().json(StatsResponse {
        height,
        difficulty,
        peers,
        pending_messages,
        window: STATS_WINDOW,
        last_interval_ms,
        avg_interval_ms,
    })
}
