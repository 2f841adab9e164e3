use actix_web::{HttpResponse, Responder, get, post, web};
use log::{debug, warn};

use super::models::{
    AppState, ErrorResponse, ReceiveMessageResponse, SecretQuery, SendMessageRequest,
    SendMessageResponse,
};
use crate::cipher::MessageCipher;

/// Encrypt a message with the caller's key and seal it into the ledger.
#[post("/messages/")]
pub async fn send_message(
    state: web::Data<AppState>,
    req: web::Json<SendMessageRequest>,
) -> impl Responder {
    let SendMessageRequest { message, secret } = req.into_inner();
    let encrypted = match MessageCipher::from_hex_key(&secret).and_then(|c| c.encrypt(&message)) {
        Ok(encrypted) => encrypted,
        Err(e) => {
            warn!("POST /messages/ - rejected: {e}");
            return HttpResponse::BadRequest().json(ErrorResponse {
                error: e.to_string(),
            });
        }
    };
    debug!("POST /messages/ - {} bytes encrypted", encrypted.len() / 2);

    match state.miner.create_and_append(encrypted.clone()).await {
        Ok(block) => HttpResponse::Ok().json(SendMessageResponse {
            note: "Message sent and added to blockchain",
            encrypted_message: encrypted,
            block,
        }),
        Err(e) => HttpResponse::ServiceUnavailable().body(e.to_string()),
    }
}

/// Decrypt the message held by the latest block.
#[get("/messages/latest/")]
pub async fn receive_latest(
    state: web::Data<AppState>,
    query: web::Query<SecretQuery>,
) -> impl Responder {
    let (index, payload) = {
        let ledger = state.ledger.read();
        let tip = ledger.latest_block();
        (tip.index, tip.message.clone())
    };

    let decrypted =
        MessageCipher::from_hex_key(&query.secret).and_then(|cipher| cipher.decrypt(&payload));
    match decrypted {
        Ok(decrypted_message) => HttpResponse::Ok().json(ReceiveMessageResponse {
            index,
            decrypted_message,
        }),
        Err(e) => HttpResponse::BadRequest().json(ErrorResponse {
            error: e.to_string(),
        }),
    }
}
