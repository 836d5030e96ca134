use tracing::{info, warn};

use mission_proto::{ClientMessage, ServerMessage};
use mission_schema::SessionId;

use crate::campaign::{list_missions, mission_file_path, Campaign};
use crate::config::ServerConfig;
use crate::network::{ClientEvent, MissionServer};
use crate::sessions::SessionManager;

/// Single-threaded dispatcher tying the campaign, the session registry, and
/// the client channels together. The server binary feeds it from its event
/// loop; tests feed it directly.
pub struct MissionService {
    campaign: Campaign,
    sessions: SessionManager,
    config: ServerConfig,
    server: MissionServer,
}

impl MissionService {
    pub fn new(campaign: Campaign, config: ServerConfig, server: MissionServer) -> Self {
        Self {
            campaign,
            sessions: SessionManager::new(),
            config,
            server,
        }
    }

    pub fn campaign(&self) -> &Campaign {
        &self.campaign
    }

    pub fn handle_event(&mut self, event: ClientEvent) {
        match event {
            ClientEvent::Connected(session_id) => {
                self.sessions.register(session_id);
                info!(target: "tauntaun::server", session_id, "session.registered");
                self.broadcast_sessions();
            }
            ClientEvent::Disconnected(session_id) => {
                if self.sessions.deregister(session_id).is_some() {
                    info!(target: "tauntaun::server", session_id, "session.deregistered");
                    self.broadcast_sessions();
                }
            }
            ClientEvent::Message(session_id, message) => {
                self.handle_message(session_id, message);
            }
        }
    }

    /// Autosave tick. Only missions loaded from disk are armed for this.
    pub fn autosave(&mut self) {
        match self.campaign.autosave() {
            Ok(Some(path)) => info!(
                target: "tauntaun::server",
                path = %path.display(),
                "mission.autosaved"
            ),
            Ok(None) => {}
            Err(err) => warn!(
                target: "tauntaun::server",
                error = %err,
                "mission.autosave_failed"
            ),
        }
    }

    /// Load a saved mission by name from the missions directory. Returns
    /// whether the campaign now holds it.
    pub fn load_named(&mut self, name: &str) -> bool {
        let path = match mission_file_path(&self.config.missions_dir, name) {
            Ok(path) => path,
            Err(err) => {
                warn!(
                    target: "tauntaun::server",
                    mission = name,
                    error = %err,
                    "mission.load_failed"
                );
                return false;
            }
        };
        if let Err(err) = self.campaign.load_mission(&path, self.config.autosave) {
            warn!(
                target: "tauntaun::server",
                mission = name,
                error = %err,
                "mission.load_failed"
            );
            return false;
        }
        true
    }

    fn handle_message(&mut self, session_id: SessionId, message: ClientMessage) {
        match message {
            ClientMessage::RequestSessionId => {
                self.server
                    .send_to(session_id, &ServerMessage::SessionId { session_id });
            }
            ClientMessage::RequestStaticData => {
                self.server.send_to(
                    session_id,
                    &ServerMessage::StaticData {
                        data: self.campaign.static_data().clone(),
                    },
                );
            }
            ClientMessage::RequestMission => {
                self.server.send_to(session_id, &self.mission_updated());
            }
            ClientMessage::RequestSessions => {
                self.server.send_to(
                    session_id,
                    &ServerMessage::SessionsUpdated {
                        sessions: self.sessions.table().clone(),
                    },
                );
            }
            ClientMessage::RequestMissionList => {
                self.server.send_to(
                    session_id,
                    &ServerMessage::MissionList {
                        missions: list_missions(&self.config.missions_dir),
                    },
                );
            }
            ClientMessage::GroupRouteInsertAt { group_id, new, at } => {
                match self.campaign.route_insert_at(group_id, new, at.as_ref()) {
                    Ok(points) => {
                        let update = ServerMessage::RouteUpdate {
                            group_id,
                            points: points.to_vec(),
                        };
                        info!(target: "tauntaun::server", session_id, group_id, "route.inserted");
                        self.server.broadcast(&update);
                    }
                    Err(err) => warn!(
                        target: "tauntaun::server",
                        session_id,
                        group_id,
                        error = %err,
                        "route.insert_rejected"
                    ),
                }
            }
            ClientMessage::GroupRouteRemove { group_id, waypoint } => {
                match self.campaign.route_remove(group_id, &waypoint) {
                    Ok(points) => {
                        let update = ServerMessage::RouteUpdate {
                            group_id,
                            points: points.to_vec(),
                        };
                        info!(target: "tauntaun::server", session_id, group_id, "route.removed");
                        self.server.broadcast(&update);
                    }
                    Err(err) => warn!(
                        target: "tauntaun::server",
                        session_id,
                        group_id,
                        error = %err,
                        "route.remove_rejected"
                    ),
                }
            }
            ClientMessage::GroupRouteModify { group_id, old, new } => {
                match self.campaign.route_modify(group_id, &old, new) {
                    Ok(points) => {
                        let update = ServerMessage::RouteUpdate {
                            group_id,
                            points: points.to_vec(),
                        };
                        info!(target: "tauntaun::server", session_id, group_id, "route.modified");
                        self.server.broadcast(&update);
                    }
                    Err(err) => warn!(
                        target: "tauntaun::server",
                        session_id,
                        group_id,
                        error = %err,
                        "route.modify_rejected"
                    ),
                }
            }
            ClientMessage::AddFlight {
                coalition,
                country,
                location,
                airport,
                airframe,
                count,
            } => {
                match self
                    .campaign
                    .add_flight(coalition, &country, location, airport, &airframe, count)
                {
                    Ok(group_id) => {
                        info!(
                            target: "tauntaun::server",
                            session_id,
                            group_id,
                            airframe = %airframe,
                            count,
                            "flight.added"
                        );
                        let update = self.mission_updated();
                        self.server.broadcast(&update);
                    }
                    Err(err) => warn!(
                        target: "tauntaun::server",
                        session_id,
                        airframe = %airframe,
                        error = %err,
                        "flight.rejected"
                    ),
                }
            }
            ClientMessage::UnitLoadoutUpdate {
                unit_id,
                pylons,
                chaff,
                flare,
                gun,
                fuel,
            } => {
                match self
                    .campaign
                    .update_unit_loadout(unit_id, pylons, chaff, flare, gun, fuel)
                {
                    Ok(unit) => {
                        let update = ServerMessage::UnitUpdate { unit: unit.clone() };
                        info!(target: "tauntaun::server", session_id, unit_id, "loadout.updated");
                        self.server.broadcast(&update);
                    }
                    Err(err) => warn!(
                        target: "tauntaun::server",
                        session_id,
                        unit_id,
                        error = %err,
                        "loadout.rejected"
                    ),
                }
            }
            ClientMessage::SessionDataUpdate {
                session_id: target,
                session_data,
            } => {
                if self.sessions.update(target, session_data) {
                    info!(
                        target: "tauntaun::server",
                        session_id,
                        updated = target,
                        "session.updated"
                    );
                    self.broadcast_sessions();
                } else {
                    warn!(
                        target: "tauntaun::server",
                        session_id,
                        updated = target,
                        "session.update_ignored=unknown_id"
                    );
                }
            }
            ClientMessage::SetBullseye {
                coalition,
                bullseye,
            } => {
                self.campaign.set_bullseye(coalition, bullseye);
                info!(
                    target: "tauntaun::server",
                    session_id,
                    coalition = coalition.as_str(),
                    "bullseye.updated"
                );
                self.server.broadcast(&ServerMessage::BullseyeUpdate {
                    coalition,
                    bullseye,
                });
            }
            ClientMessage::SaveMission { name } => {
                let path = match name.as_deref() {
                    Some(name) => match mission_file_path(&self.config.missions_dir, name) {
                        Ok(path) => Some(path),
                        Err(err) => {
                            warn!(
                                target: "tauntaun::server",
                                session_id,
                                mission = name,
                                error = %err,
                                "mission.save_failed"
                            );
                            return;
                        }
                    },
                    None => None,
                };
                match self.campaign.save_mission(path.as_deref()) {
                    Ok(path) => info!(
                        target: "tauntaun::server",
                        session_id,
                        path = %path.display(),
                        "mission.saved"
                    ),
                    Err(err) => warn!(
                        target: "tauntaun::server",
                        session_id,
                        error = %err,
                        "mission.save_failed"
                    ),
                }
            }
            ClientMessage::LoadMission { name } => {
                if self.load_named(&name) {
                    info!(
                        target: "tauntaun::server",
                        session_id,
                        mission = %name,
                        "mission.loaded"
                    );
                    let update = self.mission_updated();
                    self.server.broadcast(&update);
                }
            }
        }
    }

    fn mission_updated(&self) -> ServerMessage {
        ServerMessage::MissionUpdated {
            revision: self.campaign.revision(),
            mission: self.campaign.mission().clone(),
        }
    }

    fn broadcast_sessions(&self) {
        self.server.broadcast(&ServerMessage::SessionsUpdated {
            sessions: self.sessions.table().clone(),
        });
    }
}
