// Protected handlers: every route here sits behind `middleware::session_required`,
// which puts the caller's `AuthSession` into request extensions.

pub mod boards;
pub mod cards;
pub mod notifications;
pub mod users;
