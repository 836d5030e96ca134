use mission_schema::{
    Coalition, LatLon, Mission, SessionData, SessionId, SessionTable, StaticData, Unit, Waypoint,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Commands a console sends to the mission server.
///
/// The envelope is `{"key": ..., "value": ...}`; request variants carry no
/// value and are answered with the matching [`ServerMessage`] kind.
#[allow(clippy::large_enum_variant)]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "key", content = "value", rename_all = "snake_case")]
pub enum ClientMessage {
    GroupRouteInsertAt {
        group_id: u64,
        new: Waypoint,
        at: Option<Waypoint>,
    },
    GroupRouteRemove {
        group_id: u64,
        waypoint: Waypoint,
    },
    GroupRouteModify {
        group_id: u64,
        old: Waypoint,
        new: Waypoint,
    },
    AddFlight {
        coalition: Coalition,
        country: String,
        location: LatLon,
        airport: u32,
        airframe: String,
        count: u32,
    },
    UnitLoadoutUpdate {
        unit_id: u64,
        pylons: BTreeMap<u32, String>,
        chaff: u32,
        flare: u32,
        gun: u32,
        fuel: f64,
    },
    SessionDataUpdate {
        session_id: SessionId,
        session_data: SessionData,
    },
    SetBullseye {
        coalition: Coalition,
        bullseye: LatLon,
    },
    SaveMission {
        name: Option<String>,
    },
    LoadMission {
        name: String,
    },
    RequestSessionId,
    RequestStaticData,
    RequestMission,
    RequestSessions,
    RequestMissionList,
}

/// Replies and broadcasts the mission server sends to consoles.
#[allow(clippy::large_enum_variant)]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "key", content = "value", rename_all = "snake_case")]
pub enum ServerMessage {
    MissionUpdated {
        revision: u64,
        mission: Mission,
    },
    RouteUpdate {
        group_id: u64,
        points: Vec<Waypoint>,
    },
    UnitUpdate {
        unit: Unit,
    },
    BullseyeUpdate {
        coalition: Coalition,
        bullseye: LatLon,
    },
    SessionsUpdated {
        sessions: SessionTable,
    },
    #[serde(rename = "sessionid")]
    SessionId {
        session_id: SessionId,
    },
    StaticData {
        data: StaticData,
    },
    MissionList {
        missions: Vec<String>,
    },
}

/// Reply routing key for request/response pairing on the client side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServerMessageKind {
    MissionUpdated,
    RouteUpdate,
    UnitUpdate,
    BullseyeUpdate,
    SessionsUpdated,
    SessionId,
    StaticData,
    MissionList,
}

impl ServerMessage {
    pub fn kind(&self) -> ServerMessageKind {
        match self {
            ServerMessage::MissionUpdated { .. } => ServerMessageKind::MissionUpdated,
            ServerMessage::RouteUpdate { .. } => ServerMessageKind::RouteUpdate,
            ServerMessage::UnitUpdate { .. } => ServerMessageKind::UnitUpdate,
            ServerMessage::BullseyeUpdate { .. } => ServerMessageKind::BullseyeUpdate,
            ServerMessage::SessionsUpdated { .. } => ServerMessageKind::SessionsUpdated,
            ServerMessage::SessionId { .. } => ServerMessageKind::SessionId,
            ServerMessage::StaticData { .. } => ServerMessageKind::StaticData,
            ServerMessage::MissionList { .. } => ServerMessageKind::MissionList,
        }
    }
}

impl ClientMessage {
    /// Reply kind a request variant is answered with, if any.
    pub fn expected_reply(&self) -> Option<ServerMessageKind> {
        match self {
            ClientMessage::RequestSessionId => Some(ServerMessageKind::SessionId),
            ClientMessage::RequestStaticData => Some(ServerMessageKind::StaticData),
            ClientMessage::RequestMission => Some(ServerMessageKind::MissionUpdated),
            ClientMessage::RequestSessions => Some(ServerMessageKind::SessionsUpdated),
            ClientMessage::RequestMissionList => Some(ServerMessageKind::MissionList),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum MessageError {
    #[error("encode failed: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("decode failed: {0}")]
    Decode(#[source] serde_json::Error),
}

pub fn encode_client_message(message: &ClientMessage) -> Result<Vec<u8>, MessageError> {
    serde_json::to_vec(message).map_err(MessageError::Encode)
}

pub fn decode_client_message(data: &[u8]) -> Result<ClientMessage, MessageError> {
    serde_json::from_slice(data).map_err(MessageError::Decode)
}

pub fn encode_server_message(message: &ServerMessage) -> Result<Vec<u8>, MessageError> {
    serde_json::to_vec(message).map_err(MessageError::Encode)
}

pub fn decode_server_message(data: &[u8]) -> Result<ServerMessage, MessageError> {
    serde_json::from_slice(data).map_err(MessageError::Decode)
}
