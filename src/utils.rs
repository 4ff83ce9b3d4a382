use chrono::Utc;
use uuid::Uuid;

/// Entity kind encoded as the first character of a generated id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdType {
    None,
    User,
    Session,
    Board,
    Card,
}

impl IdType {
    fn prefix(self) -> &'static str {
        match self {
            IdType::None => "",
            IdType::User => "u",
            IdType::Session => "s",
            IdType::Board => "b",
            IdType::Card => "c",
        }
    }
}

/// Generate a new opaque id: type prefix + random v4 UUID in simple form
pub fn new_id(id_type: IdType) -> String {
    format!("{}{}", id_type.prefix(), Uuid::new_v4().simple())
}

/// Current time in milliseconds since the Unix epoch
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_carry_prefix_and_are_unique() {
        let a = new_id(IdType::Card);
        let b = new_id(IdType::Card);
        assert!(a.starts_with('c'));
        assert_eq!(a.len(), 33);
        assert_ne!(a, b);
        assert_eq!(new_id(IdType::None).len(), 32);
    }
}
