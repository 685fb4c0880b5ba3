use actix_web::{web, HttpResponse, Responder};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::blockchain::{
    AddressSummary, Block, BlockchainError, ReconcileOutcome, Transaction,
};
use crate::network::PeerClient;
use crate::node::{Node, NodeSnapshot};

/// Shared node state
pub type NodeData = web::Data<Node>;

/// Shared client for outbound peer calls
pub type PeerData = web::Data<PeerClient>;

/// Plain acknowledgement
#[derive(Serialize, Deserialize, ToSchema)]
pub struct NoteResponse {
    pub note: String,
}

/// Request for the transaction broadcast endpoint
#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    /// What is being transacted
    pub url_resource: String,

    /// The amount to transfer
    pub amount: f64,

    /// The sender's identity
    pub sender: String,

    /// The recipient's identity
    pub recipient: String,
}

/// Response for the transaction endpoints
#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResponse {
    pub note: String,

    /// The index of the block expected to include this transaction
    pub block_index: u64,
}

/// Response for the mine endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct MineResponse {
    pub note: String,

    /// The newly mined block
    pub block: Block,
}

/// Request for the block receipt endpoint
#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReceiveBlockRequest {
    pub new_block: Block,
}

/// Response for the block receipt endpoint
#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReceiveBlockResponse {
    pub note: String,
    pub accepted: bool,
    pub new_block: Block,
}

/// Request to register a single node
#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewNodeRequest {
    pub new_node_url: String,
}

/// Request to register many nodes at once
#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkRegisterRequest {
    pub all_network_nodes: Vec<String>,
}

/// Response for the consensus endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ConsensusResponse {
    pub note: String,
    pub replaced: bool,
    pub chain: Vec<Block>,
}

/// Response for the block lookup endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct BlockResponse {
    pub block: Option<Block>,
}

/// Response for the transaction lookup endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct TransactionLookupResponse {
    pub transaction: Option<Transaction>,
    pub block: Option<Block>,
}

/// Response for the address lookup endpoint
#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddressResponse {
    pub address_data: AddressSummary,
}

fn error_response(err: BlockchainError) -> HttpResponse {
    let body = serde_json::json!({ "error": err.to_string() });

    match err {
        BlockchainError::TransactionError(_) | BlockchainError::InvalidBlock(_) => {
            HttpResponse::BadRequest().json(body)
        }
        BlockchainError::StaleAppend { .. } | BlockchainError::MiningCancelled { .. } => {
            HttpResponse::Conflict().json(body)
        }
        BlockchainError::SystemError(_) => HttpResponse::InternalServerError().json(body),
    }
}

/// Get the full ledger
///
/// Returns the chain, the pending pool and the known peers
#[utoipa::path(
    get,
    path = "/blockchain",
    responses(
        (status = 200, description = "Ledger retrieved successfully", body = NodeSnapshot)
    )
)]
pub async fn get_blockchain(node: NodeData) -> impl Responder {
    match node.snapshot() {
        Ok(snapshot) => HttpResponse::Ok().json(snapshot),
        Err(err) => error_response(err),
    }
}

/// Receive a transaction from a peer
///
/// Adds an already stamped transaction to the pending pool
#[utoipa::path(
    post,
    path = "/transaction",
    request_body = Transaction,
    responses(
        (status = 200, description = "Transaction queued", body = TransactionResponse),
        (status = 400, description = "Malformed transaction")
    )
)]
pub async fn receive_transaction(node: NodeData, body: web::Json<serde_json::Value>) -> impl Responder {
    let transaction = match Transaction::from_json(body.into_inner()) {
        Ok(transaction) => transaction,
        Err(err) => return error_response(err.into()),
    };

    match node.submit_transaction(transaction) {
        Ok(block_index) => HttpResponse::Ok().json(TransactionResponse {
            note: format!("Transaction will be added in block {}.", block_index),
            block_index,
        }),
        Err(err) => error_response(err),
    }
}

/// Create and broadcast a transaction
///
/// Stamps a new transaction, queues it locally and sends it to every peer
#[utoipa::path(
    post,
    path = "/transaction/broadcast",
    request_body = TransactionRequest,
    responses(
        (status = 200, description = "Transaction created and broadcast", body = TransactionResponse),
        (status = 400, description = "Invalid transaction data")
    )
)]
pub async fn broadcast_transaction(
    node: NodeData,
    peers: PeerData,
    request: web::Json<TransactionRequest>,
) -> impl Responder {
    let (transaction, block_index) = match node.create_transaction(
        &request.url_resource,
        request.amount,
        &request.sender,
        &request.recipient,
    ) {
        Ok(created) => created,
        Err(err) => return error_response(err),
    };

    let others = match node.peers() {
        Ok(others) => others,
        Err(err) => return error_response(err),
    };
    let delivered = peers.broadcast_transaction(&others, &transaction).await;
    info!("Transaction {} sent to {}/{} peers", transaction.id, delivered, others.len());

    HttpResponse::Ok().json(TransactionResponse {
        note: "Transaction created and broadcast successfully.".to_string(),
        block_index,
    })
}

/// Mine a new block
///
/// Mines the pending pool, sends the block to every peer, then queues and
/// broadcasts this node's mining reward
#[utoipa::path(
    get,
    path = "/mine",
    responses(
        (status = 200, description = "Block mined and broadcast", body = MineResponse),
        (status = 409, description = "Another block was accepted first")
    )
)]
pub async fn mine(node: NodeData, peers: PeerData) -> impl Responder {
    let block = match node.mine().await {
        Ok(block) => block,
        Err(err) => return error_response(err),
    };

    let others = match node.peers() {
        Ok(others) => others,
        Err(err) => return error_response(err),
    };
    peers.broadcast_block(&others, &block).await;

    let reward = match node.create_reward_transaction() {
        Ok((reward, _)) => reward,
        Err(err) => return error_response(err),
    };
    peers.broadcast_transaction(&others, &reward).await;

    HttpResponse::Ok().json(MineResponse {
        note: "New block mined & broadcast successfully".to_string(),
        block,
    })
}

/// Receive a block mined by a peer
///
/// Accepts the block only if it extends the local tip and carries valid work
#[utoipa::path(
    post,
    path = "/receive-new-block",
    request_body = ReceiveBlockRequest,
    responses(
        (status = 200, description = "Block accepted or rejected", body = ReceiveBlockResponse)
    )
)]
pub async fn receive_new_block(node: NodeData, request: web::Json<ReceiveBlockRequest>) -> impl Responder {
    let new_block = request.into_inner().new_block;

    match node.receive_block(new_block.clone()) {
        Ok(_) => HttpResponse::Ok().json(ReceiveBlockResponse {
            note: "New block received and accepted.".to_string(),
            accepted: true,
            new_block,
        }),
        Err(BlockchainError::SystemError(reason)) => {
            error_response(BlockchainError::SystemError(reason))
        }
        Err(err) => {
            warn!("Rejected block {}: {}", new_block.index, err);
            HttpResponse::Ok().json(ReceiveBlockResponse {
                note: "New block rejected.".to_string(),
                accepted: false,
                new_block,
            })
        }
    }
}

/// Register a node and introduce it to the network
///
/// Registers the node locally, tells every known peer about it, then sends
/// the full peer list to the new node
#[utoipa::path(
    post,
    path = "/register-and-broadcast-node",
    request_body = NewNodeRequest,
    responses(
        (status = 200, description = "Node registered with the network", body = NoteResponse)
    )
)]
pub async fn register_and_broadcast_node(
    node: NodeData,
    peers: PeerData,
    request: web::Json<NewNodeRequest>,
) -> impl Responder {
    let new_node_url = request.into_inner().new_node_url;

    if let Err(err) = node.register_peer(&new_node_url) {
        return error_response(err);
    }

    let (others, current_node_url) = match (node.peers(), node.current_node_url()) {
        (Ok(others), Ok(current)) => (others, current),
        (Err(err), _) | (_, Err(err)) => return error_response(err),
    };

    let existing: Vec<String> = others.iter().filter(|peer| **peer != new_node_url).cloned().collect();
    peers.broadcast_registration(&existing, &new_node_url).await;

    let mut all_network_nodes = others;
    all_network_nodes.push(current_node_url);
    if let Err(err) = peers.register_bulk(&new_node_url, &all_network_nodes).await {
        warn!("Bulk registration at {} failed: {}", new_node_url, err);
    }

    HttpResponse::Ok().json(NoteResponse {
        note: "New node registered with network successfully.".to_string(),
    })
}

/// Register a single node
#[utoipa::path(
    post,
    path = "/register-node",
    request_body = NewNodeRequest,
    responses(
        (status = 200, description = "Node registered", body = NoteResponse)
    )
)]
pub async fn register_node(node: NodeData, request: web::Json<NewNodeRequest>) -> impl Responder {
    match node.register_peer(&request.new_node_url) {
        Ok(_) => HttpResponse::Ok().json(NoteResponse {
            note: "New node registered successfully.".to_string(),
        }),
        Err(err) => error_response(err),
    }
}

/// Register many nodes at once
#[utoipa::path(
    post,
    path = "/register-nodes-bulk",
    request_body = BulkRegisterRequest,
    responses(
        (status = 200, description = "Nodes registered", body = NoteResponse)
    )
)]
pub async fn register_nodes_bulk(node: NodeData, request: web::Json<BulkRegisterRequest>) -> impl Responder {
    match node.register_peers(&request.all_network_nodes) {
        Ok(_) => HttpResponse::Ok().json(NoteResponse {
            note: "Bulk registration successful.".to_string(),
        }),
        Err(err) => error_response(err),
    }
}

/// Run consensus against every peer
///
/// Fetches each peer's ledger in registration order and adopts the longest
/// valid chain, if it is longer than ours
#[utoipa::path(
    get,
    path = "/consensus",
    responses(
        (status = 200, description = "Consensus round finished", body = ConsensusResponse)
    )
)]
pub async fn consensus(node: NodeData, peers: PeerData) -> impl Responder {
    let others = match node.peers() {
        Ok(others) => others,
        Err(err) => return error_response(err),
    };
    let candidates = peers.fetch_chains(&others).await;

    let outcome = match node.reconcile(candidates) {
        Ok(outcome) => outcome,
        Err(err) => return error_response(err),
    };
    let chain = match node.chain() {
        Ok(chain) => chain,
        Err(err) => return error_response(err),
    };

    let (note, replaced) = match outcome {
        ReconcileOutcome::Replaced { previous_length, length } => {
            info!("Consensus replaced {} blocks with {} from {} peers", previous_length, length, others.len());
            ("This chain has been replaced.", true)
        }
        ReconcileOutcome::Kept { length } => {
            info!("Consensus kept {} blocks after polling {} peers", length, others.len());
            ("Current chain has not been replaced.", false)
        }
    };

    HttpResponse::Ok().json(ConsensusResponse {
        note: note.to_string(),
        replaced,
        chain,
    })
}

/// Look up a block by its hash
#[utoipa::path(
    get,
    path = "/block/{blockHash}",
    params(("blockHash" = String, Path, description = "Hash of the block")),
    responses(
        (status = 200, description = "Block, or null when unknown", body = BlockResponse)
    )
)]
pub async fn get_block(node: NodeData, block_hash: web::Path<String>) -> impl Responder {
    match node.block_by_hash(&block_hash) {
        Ok(block) => HttpResponse::Ok().json(BlockResponse { block }),
        Err(err) => error_response(err),
    }
}

/// Look up a settled transaction by id
#[utoipa::path(
    get,
    path = "/transaction/{transactionId}",
    params(("transactionId" = String, Path, description = "Id of the transaction")),
    responses(
        (status = 200, description = "Transaction and its block, or nulls when unknown", body = TransactionLookupResponse)
    )
)]
pub async fn get_transaction(node: NodeData, transaction_id: web::Path<String>) -> impl Responder {
    match node.transaction_by_id(&transaction_id) {
        Ok(found) => {
            let (transaction, block) = found.map_or((None, None), |(t, b)| (Some(t), Some(b)));
            HttpResponse::Ok().json(TransactionLookupResponse { transaction, block })
        }
        Err(err) => error_response(err),
    }
}

/// Summarise an address's settled activity
#[utoipa::path(
    get,
    path = "/address/{address}",
    params(("address" = String, Path, description = "Sender or recipient identity")),
    responses(
        (status = 200, description = "Balance and transaction history", body = AddressResponse)
    )
)]
pub async fn get_address(node: NodeData, address: web::Path<String>) -> impl Responder {
    match node.address_summary(&address) {
        Ok(address_data) => HttpResponse::Ok().json(AddressResponse { address_data }),
        Err(err) => error_response(err),
    }
}
