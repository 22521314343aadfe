use screeps::RoomName;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BastionError {
    #[error("flow source and sink are the same vertex")]
    DegenerateFlow,

    #[error("malformed room name: {0}")]
    InvalidRoomName(String),

    #[error("invalid bounds ({x1}, {y1}) - ({x2}, {y2})")]
    InvalidBounds { x1: u8, y1: u8, x2: u8, y2: u8 },

    #[error("malformed terrain: {0}")]
    InvalidTerrain(String),

    #[error("no vision of room {0}")]
    NoVision(RoomName),

    #[error("memory failure: {0}")]
    Memory(String),

    #[error("unknown squad kind: {0}")]
    UnknownSquadKind(String),
}

impl BastionError {
    /// Errors caused by missing game context may clear up on a later tick;
    /// everything else is a caller bug.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BastionError::NoVision(_))
    }
}

pub type BastionResult<T> = Result<T, BastionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_missing_vision_is_retryable() {
        let room_name = RoomName::new("W1N1").unwrap();

        assert!(BastionError::NoVision(room_name).is_retryable());
        assert!(!BastionError::DegenerateFlow.is_retryable());
        assert!(!BastionError::InvalidTerrain("short".to_owned()).is_retryable());
        assert!(!BastionError::Memory("bad".to_owned()).is_retryable());
    }
}
