// API module
//
// HTTP routes exposing the node to clients and to other nodes

pub mod handlers;
pub mod routes;

// Re-export main components for easier access
pub use routes::configure_routes;
