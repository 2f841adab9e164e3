use std::sync::PoisonError;

use actix_web::{HttpResponse, Responder, get, post, web};

use super::models::{AddressEntriesResponse, AddressRecordResponse, AppState};

#[get("/address/{address}/")]
pub async fn get_address(state: web::Data<AppState>, path: web::Path<(String,)>) -> impl Responder {
    let address = path.into_inner().0;
    let entries = {
        let book = state
            .address_book
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        book.entries(&address).to_vec()
    };
    HttpResponse::Ok().json(AddressEntriesResponse { address, entries })
}

#[post("/address/{address}/")]
pub async fn record_address(
    state: web::Data<AppState>,
    path: web::Path<(String,)>,
    body: web::Json<serde_json::Value>,
) -> impl Responder {
    let address = path.into_inner().0;
    let count = state
        .address_book
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .record(&address, body.into_inner());
    HttpResponse::Ok().json(AddressRecordResponse { address, count })
}
