use actix_web::{error, web, HttpResponse};

use super::handlers;

/// Configures the API routes
///
/// Paths match what peers call on each other, so they are mounted at the root.
/// Bodies that fail to parse are answered with a JSON 400 before reaching a handler.
///
/// # Arguments
///
/// * `cfg` - The service configuration
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    let json_config = web::JsonConfig::default().error_handler(|err, _req| {
        let body = serde_json::json!({ "error": format!("Malformed input: {}", err) });
        error::InternalError::from_response(err, HttpResponse::BadRequest().json(body)).into()
    });

    cfg.app_data(json_config)
        .route("/blockchain", web::get().to(handlers::get_blockchain))
        .route("/transaction", web::post().to(handlers::receive_transaction))
        .route("/transaction/broadcast", web::post().to(handlers::broadcast_transaction))
        .route("/transaction/{transactionId}", web::get().to(handlers::get_transaction))
        .route("/mine", web::get().to(handlers::mine))
        .route("/receive-new-block", web::post().to(handlers::receive_new_block))
        .route(
            "/register-and-broadcast-node",
            web::post().to(handlers::register_and_broadcast_node),
        )
        .route("/register-node", web::post().to(handlers::register_node))
        .route("/register-nodes-bulk", web::post().to(handlers::register_nodes_bulk))
        .route("/consensus", web::get().to(handlers::consensus))
        .route("/block/{blockHash}", web::get().to(handlers::get_block))
        .route("/address/{address}", web::get().to(handlers::get_address));
}
