#[derive(Debug, PartialEq)]
pub enum RoomRepositoryError {
    /// The room is gone or has already ended, so it accepts no further writes.
    NotFound(String),
    /// Concurrent writers kept changing the room.
    Contended(String),
    Serialization(String),
    DynamoDb(String),
}

impl std::fmt::Display for RoomRepositoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoomRepositoryError::NotFound(room_id) => write!(f, "Room {} not found", room_id),
            RoomRepositoryError::Contended(room_id) => {
                write!(f, "Room {} kept changing under concurrent writes", room_id)
            }
            RoomRepositoryError::Serialization(msg) => {
                write!(f, "Serialization error: {}", msg)
            }
            RoomRepositoryError::DynamoDb(msg) => write!(f, "DynamoDB error: {}", msg),
        }
    }
}

impl std::error::Error for RoomRepositoryError {}
