// Public handlers: no session required. Token acquisition and liveness probes.

pub mod auth;
pub mod system;

pub use auth::{login_post, register_post};
pub use system::{health_get, hello_get, ping_get};
