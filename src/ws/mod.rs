pub mod handler;
pub mod hub;

pub use handler::ws_handler;
pub use hub::{ConnectionId, WsHub};
