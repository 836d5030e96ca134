use ahash::RandomState;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::hash::{BuildHasher, Hasher};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Coalition {
    Blue,
    Red,
    Neutral,
}

impl Coalition {
    pub fn as_str(self) -> &'static str {
        match self {
            Coalition::Blue => "blue",
            Coalition::Red => "red",
            Coalition::Neutral => "neutral",
        }
    }
}

impl Default for Coalition {
    fn default() -> Self {
        Coalition::Blue
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WaypointAction {
    TakeOff,
    TurningPoint,
    FlyOver,
    Landing,
}

impl Default for WaypointAction {
    fn default() -> Self {
        WaypointAction::TurningPoint
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Waypoint {
    pub name: String,
    pub position: LatLon,
    pub alt: f64,
    pub speed: f64,
    pub action: WaypointAction,
}

/// Pylons are keyed by station number so serialized missions keep a stable
/// field order and the revision hash stays deterministic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Loadout {
    pub pylons: BTreeMap<u32, String>,
    pub chaff: u32,
    pub flare: u32,
    pub gun: u32,
    pub fuel: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Skill {
    Average,
    Good,
    High,
    Excellent,
    Random,
    Client,
    Player,
}

impl Default for Skill {
    fn default() -> Self {
        Skill::Average
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Unit {
    pub id: u64,
    pub name: String,
    #[serde(rename = "type")]
    pub unit_type: String,
    pub position: LatLon,
    pub heading: f64,
    pub skill: Skill,
    pub loadout: Loadout,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GroupCategory {
    Plane,
    Helicopter,
    Ship,
    Vehicle,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Group {
    pub id: u64,
    pub name: String,
    pub coalition: Coalition,
    pub country: String,
    pub category: GroupCategory,
    pub units: Vec<Unit>,
    pub waypoints: Vec<Waypoint>,
}

impl Group {
    pub fn unit(&self, unit_id: u64) -> Option<&Unit> {
        self.units.iter().find(|unit| unit.id == unit_id)
    }

    pub fn unit_mut(&mut self, unit_id: u64) -> Option<&mut Unit> {
        self.units.iter_mut().find(|unit| unit.id == unit_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Airport {
    pub id: u32,
    pub name: String,
    pub position: LatLon,
    pub coalition: Coalition,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Terrain {
    pub name: String,
    pub map_view_default: LatLon,
    pub airports: Vec<Airport>,
}

impl Terrain {
    pub fn airport(&self, airport_id: u32) -> Option<&Airport> {
        self.airports
            .iter()
            .find(|airport| airport.id == airport_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Mission {
    pub terrain: Terrain,
    pub groups: Vec<Group>,
    pub bullseyes: BTreeMap<Coalition, LatLon>,
}

impl Mission {
    pub fn group(&self, group_id: u64) -> Option<&Group> {
        self.groups.iter().find(|group| group.id == group_id)
    }

    pub fn group_mut(&mut self, group_id: u64) -> Option<&mut Group> {
        self.groups.iter_mut().find(|group| group.id == group_id)
    }

    pub fn unit(&self, unit_id: u64) -> Option<&Unit> {
        self.groups.iter().find_map(|group| group.unit(unit_id))
    }

    pub fn group_of_unit(&self, unit_id: u64) -> Option<&Group> {
        self.groups
            .iter()
            .find(|group| group.unit(unit_id).is_some())
    }

    pub fn next_group_id(&self) -> u64 {
        self.groups.iter().map(|group| group.id).max().unwrap_or(0) + 1
    }

    pub fn next_unit_id(&self) -> u64 {
        self.groups
            .iter()
            .flat_map(|group| group.units.iter())
            .map(|unit| unit.id)
            .max()
            .unwrap_or(0)
            + 1
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionData {
    pub coalition: Coalition,
    pub selected_unit_id: i64,
}

impl SessionData {
    pub const NO_SELECTED_UNIT: i64 = -1;

    pub fn selected_unit(&self) -> Option<u64> {
        if self.selected_unit_id < 0 {
            None
        } else {
            Some(self.selected_unit_id as u64)
        }
    }

    pub fn set_selected_unit(&mut self, unit_id: Option<u64>) {
        self.selected_unit_id = match unit_id {
            Some(id) => id as i64,
            None => Self::NO_SELECTED_UNIT,
        };
    }
}

impl Default for SessionData {
    fn default() -> Self {
        Self {
            coalition: Coalition::Blue,
            selected_unit_id: Self::NO_SELECTED_UNIT,
        }
    }
}

pub type SessionId = u64;
pub type SessionTable = BTreeMap<SessionId, SessionData>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Airframe {
    pub id: String,
    pub name: String,
    pub default_loadout: Loadout,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Weapon {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct StaticData {
    pub airframes: Vec<Airframe>,
    pub weapons: Vec<Weapon>,
    pub maps: Vec<String>,
}

impl StaticData {
    pub fn airframe(&self, airframe_id: &str) -> Option<&Airframe> {
        self.airframes
            .iter()
            .find(|airframe| airframe.id == airframe_id)
    }

    pub fn weapon(&self, weapon_id: &str) -> Option<&Weapon> {
        self.weapons.iter().find(|weapon| weapon.id == weapon_id)
    }
}

pub fn hash_mission(mission: &Mission) -> u64 {
    let encoded = serde_json::to_vec(mission).expect("mission serialization for hashing");
    let mut hasher = RandomState::with_seeds(0, 0, 0, 0).build_hasher();
    hasher.write(&encoded);
    hasher.finish()
}
