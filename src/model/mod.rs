pub mod board;
pub mod card;
pub mod notification;
pub mod session;
pub mod user;

pub use board::{Board, BoardMember, BoardPatch, BoardRole};
pub use card::{Card, CardPatch};
pub use notification::{NotificationType, UserNotification};
pub use session::Session;
pub use user::User;
