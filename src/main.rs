use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use anyhow::Context;
use clap::Parser;
use log::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod api;
mod blockchain;
mod config;
mod network;
mod node;

use config::NodeConfig;
use network::PeerClient;
use node::Node;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::get_blockchain,
        api::handlers::receive_transaction,
        api::handlers::broadcast_transaction,
        api::handlers::mine,
        api::handlers::receive_new_block,
        api::handlers::register_and_broadcast_node,
        api::handlers::register_node,
        api::handlers::register_nodes_bulk,
        api::handlers::consensus,
        api::handlers::get_block,
        api::handlers::get_transaction,
        api::handlers::get_address
    ),
    components(
        schemas(
            blockchain::Block,
            blockchain::Transaction,
            blockchain::AddressSummary,
            node::NodeSnapshot,
            api::handlers::NoteResponse,
            api::handlers::TransactionRequest,
            api::handlers::TransactionResponse,
            api::handlers::MineResponse,
            api::handlers::ReceiveBlockRequest,
            api::handlers::ReceiveBlockResponse,
            api::handlers::NewNodeRequest,
            api::handlers::BulkRegisterRequest,
            api::handlers::ConsensusResponse,
            api::handlers::BlockResponse,
            api::handlers::TransactionLookupResponse,
            api::handlers::AddressResponse
        )
    ),
    tags(
        (name = "ledger", description = "Replicated ledger node endpoints")
    ),
    info(
        title = "Ledger Node API",
        version = "0.1.0",
        description = "Proof-of-work ledger node with longest-valid-chain consensus",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    )
)]
struct ApiDoc;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = NodeConfig::parse();
    let current_node_url = config.current_node_url();

    let node = web::Data::new(Node::new(
        current_node_url.clone(),
        &config.ledger_config(),
        config.reward_config(),
    ));
    let peers = web::Data::new(
        PeerClient::new(config.peer_timeout()).context("failed to create peer client")?,
    );

    info!(
        "Node {} listening on {}:{} (reward address {}, difficulty {:?})",
        current_node_url,
        config.host,
        config.port,
        node.node_address(),
        config.difficulty_prefix
    );

    HttpServer::new(move || {
        // Configure CORS
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        // Configure OpenAPI documentation
        let openapi = ApiDoc::openapi();

        App::new()
            .wrap(middleware::Logger::default())
            .wrap(cors)
            .app_data(node.clone())
            .app_data(peers.clone())
            .configure(api::configure_routes)
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", openapi.clone())
            )
    })
    .bind((config.host.as_str(), config.port))
    .with_context(|| format!("failed to bind {}:{}", config.host, config.port))?
    .run()
    .await
    .context("HTTP server failed")
}
