pub mod auth;
pub mod extract;
pub mod response;

pub use auth::{extract_bearer_token, session_required};
pub use extract::{ApiJson, ApiPath, ApiQuery};
pub use response::{ApiResponse, ApiResult, Empty};
