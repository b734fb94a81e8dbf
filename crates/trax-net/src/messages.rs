//! Wire message types.
//!
//! A dense integer enumeration partitioned into request/response pairs;
//! the numbering is part of the wire contract and mirrors the historical
//! client ordering, so new types append rather than renumber.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum MessageType {
    /// Freeform notification or error envelope.
    Simple = 0,
    /// Freeform typed payload.
    Variable = 1,
    AvailableModelsRequest = 2,
    AvailableModels = 3,
    ModelLoadRequest = 4,
    ModelLoaded = 5,
    StartPointSetRequest = 6,
    StartPointSet = 7,
    EndPointSetRequest = 8,
    EndPointSet = 9,
    RadialObstacleSetRequest = 10,
    ObstaclesChanged = 11,
    PathFindRequest = 12,
    PathFound = 13,
}

#[derive(Debug, Error)]
#[error("unknown message type {0}")]
pub struct UnknownMessageType(pub u32);

impl TryFrom<u32> for MessageType {
    type Error = UnknownMessageType;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        use MessageType::*;
        Ok(match value {
            0 => Simple,
            1 => Variable,
            2 => AvailableModelsRequest,
            3 => AvailableModels,
            4 => ModelLoadRequest,
            5 => ModelLoaded,
            6 => StartPointSetRequest,
            7 => StartPointSet,
            8 => EndPointSetRequest,
            9 => EndPointSet,
            10 => RadialObstacleSetRequest,
            11 => ObstaclesChanged,
            12 => PathFindRequest,
            13 => PathFound,
            other => return Err(UnknownMessageType(other)),
        })
    }
}

impl MessageType {
    pub fn as_u32(self) -> u32 {
        self as u32
    }

    /// The response type a request is answered with, `None` for responses
    /// and freeform messages.
    pub fn response(self) -> Option<MessageType> {
        use MessageType::*;
        match self {
            AvailableModelsRequest => Some(AvailableModels),
            ModelLoadRequest => Some(ModelLoaded),
            StartPointSetRequest => Some(StartPointSet),
            EndPointSetRequest => Some(EndPointSet),
            RadialObstacleSetRequest => Some(ObstaclesChanged),
            PathFindRequest => Some(PathFound),
            _ => None,
        }
    }
}
