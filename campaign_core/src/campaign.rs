use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use mission_schema::{
    hash_mission, Coalition, Group, GroupCategory, LatLon, Loadout, Mission, Skill, StaticData,
    Unit, Waypoint, WaypointAction,
};

use crate::geo::haversine_m;

/// Route edits identify waypoints by position; anything closer than this is
/// treated as the same waypoint.
pub const WAYPOINT_MATCH_RADIUS_M: f64 = 1.0;

/// Altitude assigned to the first en-route waypoint of a new flight.
pub const DEFAULT_FLIGHT_ALTITUDE_M: f64 = 5000.0;

pub const DEFAULT_FLIGHT_SPEED_MPS: f64 = 220.0;

pub const BUILTIN_MISSION: &str = include_str!("data/default_mission.json");
pub const BUILTIN_STATIC_DATA: &str = include_str!("data/static_data.json");

#[derive(Debug, Error)]
pub enum CampaignError {
    #[error("unknown group {0}")]
    UnknownGroup(u64),
    #[error("unknown unit {0}")]
    UnknownUnit(u64),
    #[error("unknown airport {0}")]
    UnknownAirport(u32),
    #[error("unknown airframe {0}")]
    UnknownAirframe(String),
    #[error("unknown weapon {0}")]
    UnknownWeapon(String),
    #[error("gun charge {0} outside 0-100")]
    GunOutOfRange(u32),
    #[error("no waypoint near {lat:.6}, {lon:.6}")]
    WaypointNotFound { lat: f64, lon: f64 },
    #[error("no mission path set; save needs a name first")]
    NoMissionPath,
    #[error("mission name {0:?} escapes the missions directory")]
    InvalidMissionName(String),
    #[error("failed to read mission from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write mission to {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse mission: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Server-side mission state: the live mission document, the static
/// reference catalog, and the save/autosave bookkeeping around them.
#[derive(Debug, Clone)]
pub struct Campaign {
    mission: Mission,
    static_data: StaticData,
    mission_path: Option<PathBuf>,
    autosave_active: bool,
}

impl Campaign {
    pub fn new() -> Self {
        Self::with_mission(builtin_mission(), builtin_static_data())
    }

    pub fn with_mission(mission: Mission, static_data: StaticData) -> Self {
        Self {
            mission,
            static_data,
            mission_path: None,
            autosave_active: false,
        }
    }

    pub fn mission(&self) -> &Mission {
        &self.mission
    }

    pub fn static_data(&self) -> &StaticData {
        &self.static_data
    }

    pub fn revision(&self) -> u64 {
        hash_mission(&self.mission)
    }

    pub fn mission_path(&self) -> Option<&Path> {
        self.mission_path.as_deref()
    }

    pub fn autosave_active(&self) -> bool {
        self.autosave_active
    }

    /// Reset to the built-in mission. The built-in mission has no backing
    /// file, so autosave stops.
    pub fn load_builtin(&mut self) {
        self.mission = builtin_mission();
        self.mission_path = None;
        self.autosave_active = false;
    }

    pub fn load_mission(&mut self, path: &Path, autosave: bool) -> Result<(), CampaignError> {
        let contents = fs::read_to_string(path).map_err(|source| CampaignError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        self.mission = serde_json::from_str(&contents)?;
        self.mission_path = Some(path.to_path_buf());
        self.autosave_active = autosave;
        Ok(())
    }

    /// Save to the given path, or to the last loaded path when none is given.
    pub fn save_mission(&mut self, path: Option<&Path>) -> Result<PathBuf, CampaignError> {
        let target = match path {
            Some(path) => path.to_path_buf(),
            None => self
                .mission_path
                .clone()
                .ok_or(CampaignError::NoMissionPath)?,
        };
        let contents = serde_json::to_string_pretty(&self.mission)?;
        fs::write(&target, contents).map_err(|source| CampaignError::Write {
            path: target.clone(),
            source,
        })?;
        self.mission_path = Some(target.clone());
        Ok(target)
    }

    /// Periodic save hook. Does nothing until a mission file has been loaded
    /// with autosave enabled.
    pub fn autosave(&mut self) -> Result<Option<PathBuf>, CampaignError> {
        if !self.autosave_active {
            return Ok(None);
        }
        self.save_mission(None).map(Some)
    }

    pub fn route_insert_at(
        &mut self,
        group_id: u64,
        new: Waypoint,
        at: Option<&Waypoint>,
    ) -> Result<&[Waypoint], CampaignError> {
        let group = self
            .mission
            .group_mut(group_id)
            .ok_or(CampaignError::UnknownGroup(group_id))?;
        let index = match at {
            Some(at) => {
                waypoint_index(group, at.position).ok_or(CampaignError::WaypointNotFound {
                    lat: at.position.lat,
                    lon: at.position.lon,
                })?
            }
            None => group.waypoints.len(),
        };
        group.waypoints.insert(index, new);
        Ok(&group.waypoints)
    }

    pub fn route_remove(
        &mut self,
        group_id: u64,
        waypoint: &Waypoint,
    ) -> Result<&[Waypoint], CampaignError> {
        let group = self
            .mission
            .group_mut(group_id)
            .ok_or(CampaignError::UnknownGroup(group_id))?;
        let index =
            waypoint_index(group, waypoint.position).ok_or(CampaignError::WaypointNotFound {
                lat: waypoint.position.lat,
                lon: waypoint.position.lon,
            })?;
        group.waypoints.remove(index);
        Ok(&group.waypoints)
    }

    pub fn route_modify(
        &mut self,
        group_id: u64,
        old: &Waypoint,
        new: Waypoint,
    ) -> Result<&[Waypoint], CampaignError> {
        let group = self
            .mission
            .group_mut(group_id)
            .ok_or(CampaignError::UnknownGroup(group_id))?;
        let index = waypoint_index(group, old.position).ok_or(CampaignError::WaypointNotFound {
            lat: old.position.lat,
            lon: old.position.lon,
        })?;
        group.waypoints[index] = new;
        Ok(&group.waypoints)
    }

    /// Create a client-skill flight at an airport with a takeoff waypoint
    /// there and one en-route waypoint at the requested location. Returns the
    /// new group id.
    pub fn add_flight(
        &mut self,
        coalition: Coalition,
        country: &str,
        location: LatLon,
        airport_id: u32,
        airframe_id: &str,
        count: u32,
    ) -> Result<u64, CampaignError> {
        let airport = self
            .mission
            .terrain
            .airport(airport_id)
            .cloned()
            .ok_or(CampaignError::UnknownAirport(airport_id))?;
        let airframe = self
            .static_data
            .airframe(airframe_id)
            .cloned()
            .ok_or_else(|| CampaignError::UnknownAirframe(airframe_id.to_string()))?;

        let group_id = self.mission.next_group_id();
        let first_unit_id = self.mission.next_unit_id();
        let units = (0..count.max(1))
            .map(|index| Unit {
                id: first_unit_id + index as u64,
                name: format!("{} {}-{}", airframe.name, group_id, index + 1),
                unit_type: airframe.id.clone(),
                position: airport.position,
                heading: 0.0,
                skill: Skill::Client,
                loadout: airframe.default_loadout.clone(),
            })
            .collect();
        let waypoints = vec![
            Waypoint {
                name: "TAKEOFF".to_string(),
                position: airport.position,
                alt: 0.0,
                speed: 0.0,
                action: WaypointAction::TakeOff,
            },
            Waypoint {
                name: "WP1".to_string(),
                position: location,
                alt: DEFAULT_FLIGHT_ALTITUDE_M,
                speed: DEFAULT_FLIGHT_SPEED_MPS,
                action: WaypointAction::TurningPoint,
            },
        ];

        self.mission.groups.push(Group {
            id: group_id,
            name: format!("{} {}", airframe.name, group_id),
            coalition,
            country: country.to_string(),
            category: GroupCategory::Plane,
            units,
            waypoints,
        });
        Ok(group_id)
    }

    pub fn update_unit_loadout(
        &mut self,
        unit_id: u64,
        pylons: BTreeMap<u32, String>,
        chaff: u32,
        flare: u32,
        gun: u32,
        fuel: f64,
    ) -> Result<&Unit, CampaignError> {
        if gun > 100 {
            return Err(CampaignError::GunOutOfRange(gun));
        }
        for weapon_id in pylons.values() {
            if self.static_data.weapon(weapon_id).is_none() {
                return Err(CampaignError::UnknownWeapon(weapon_id.clone()));
            }
        }
        let unit = self
            .mission
            .groups
            .iter_mut()
            .find_map(|group| group.unit_mut(unit_id))
            .ok_or(CampaignError::UnknownUnit(unit_id))?;
        unit.loadout = Loadout {
            pylons,
            chaff,
            flare,
            gun,
            fuel,
        };
        Ok(unit)
    }

    pub fn set_bullseye(&mut self, coalition: Coalition, bullseye: LatLon) {
        self.mission.bullseyes.insert(coalition, bullseye);
    }
}

impl Default for Campaign {
    fn default() -> Self {
        Self::new()
    }
}

fn waypoint_index(group: &Group, position: LatLon) -> Option<usize> {
    group
        .waypoints
        .iter()
        .position(|waypoint| haversine_m(waypoint.position, position) < WAYPOINT_MATCH_RADIUS_M)
}

pub fn builtin_mission() -> Mission {
    serde_json::from_str(BUILTIN_MISSION).expect("builtin mission should parse")
}

pub fn builtin_static_data() -> StaticData {
    serde_json::from_str(BUILTIN_STATIC_DATA).expect("builtin static data should parse")
}

/// Resolve a client-supplied mission name inside the missions directory.
pub fn mission_file_path(missions_dir: &Path, name: &str) -> Result<PathBuf, CampaignError> {
    if name.is_empty() || name.contains('/') || name.contains('\\') || name.contains("..") {
        return Err(CampaignError::InvalidMissionName(name.to_string()));
    }
    let mut path = missions_dir.join(name);
    if path.extension().is_none() {
        path.set_extension("json");
    }
    Ok(path)
}

pub fn list_missions(missions_dir: &Path) -> Vec<String> {
    let mut names = Vec::new();
    let Ok(entries) = fs::read_dir(missions_dir) else {
        return names;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
            names.push(stem.to_string());
        }
    }
    names.sort();
    names
}
