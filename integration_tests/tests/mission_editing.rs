mod common;

use std::collections::BTreeMap;

use campaign_core::config::ServerConfig;
use mission_proto::{ClientMessage, ServerMessage, ServerMessageKind};
use mission_schema::{hash_mission, Coalition, LatLon, Skill, Waypoint, WaypointAction};

use common::{bootstrap, spawn_server, spawn_server_with, update_of_kind, TempDir};

fn turning_point(name: &str, lat: f64, lon: f64) -> Waypoint {
    Waypoint {
        name: name.to_string(),
        position: LatLon { lat, lon },
        alt: 6000.0,
        speed: 220.0,
        action: WaypointAction::TurningPoint,
    }
}

#[tokio::test]
async fn route_insert_is_broadcast_and_folds_into_the_store() -> anyhow::Result<()> {
    let server = spawn_server();
    let (mut gateway, mut world) = bootstrap(&server).await;

    gateway.send(ClientMessage::GroupRouteInsertAt {
        group_id: 101,
        new: turning_point("PUSH", 42.6, 42.2),
        at: None,
    })?;

    let update = update_of_kind(&mut gateway, ServerMessageKind::RouteUpdate).await;
    match &update {
        ServerMessage::RouteUpdate { group_id, points } => {
            assert_eq!(*group_id, 101);
            assert_eq!(points.len(), 4, "builtin route plus the appended point");
            assert_eq!(points[3].name, "PUSH");
        }
        other => panic!("expected a route update, got {:?}", other.kind()),
    }

    world.apply(update);
    let group = world
        .mission
        .mission()
        .and_then(|mission| mission.group(101))
        .expect("group in the local store");
    assert_eq!(group.waypoints.len(), 4);
    Ok(())
}

#[tokio::test]
async fn route_modify_matches_the_point_within_a_meter() -> anyhow::Result<()> {
    let server = spawn_server();
    let (mut gateway, _world) = bootstrap(&server).await;

    // Builtin WP1 sits at 42.5, 42.3. A millionth of a degree of latitude is
    // about eleven centimeters, well inside the match radius.
    let mut old = turning_point("WP1", 42.500001, 42.3);
    old.alt = 5000.0;
    let mut new = turning_point("WP1", 42.5, 42.3);
    new.alt = 7000.0;
    gateway.send(ClientMessage::GroupRouteModify {
        group_id: 101,
        old,
        new,
    })?;

    let update = update_of_kind(&mut gateway, ServerMessageKind::RouteUpdate).await;
    match update {
        ServerMessage::RouteUpdate { group_id, points } => {
            assert_eq!(group_id, 101);
            assert_eq!(points.len(), 3);
            assert_eq!(points[1].alt, 7000.0);
        }
        other => panic!("expected a route update, got {:?}", other.kind()),
    }
    Ok(())
}

#[tokio::test]
async fn route_remove_drops_the_matched_point() -> anyhow::Result<()> {
    let server = spawn_server();
    let (mut gateway, _world) = bootstrap(&server).await;

    gateway.send(ClientMessage::GroupRouteRemove {
        group_id: 101,
        waypoint: turning_point("WP1", 42.5, 42.3),
    })?;

    let update = update_of_kind(&mut gateway, ServerMessageKind::RouteUpdate).await;
    match update {
        ServerMessage::RouteUpdate { group_id, points } => {
            assert_eq!(group_id, 101);
            assert_eq!(points.len(), 2);
            assert_eq!(points[0].name, "TAKEOFF");
            assert_eq!(points[1].name, "LAND");
        }
        other => panic!("expected a route update, got {:?}", other.kind()),
    }
    Ok(())
}

#[tokio::test]
async fn add_flight_broadcasts_a_full_mission_update() -> anyhow::Result<()> {
    let server = spawn_server();
    let (mut gateway, _world) = bootstrap(&server).await;

    gateway.send(ClientMessage::AddFlight {
        coalition: Coalition::Blue,
        country: "USA".to_string(),
        location: LatLon {
            lat: 42.9,
            lon: 41.8,
        },
        airport: 21,
        airframe: "F-16C_50".to_string(),
        count: 2,
    })?;

    let update = update_of_kind(&mut gateway, ServerMessageKind::MissionUpdated).await;
    match update {
        ServerMessage::MissionUpdated { revision, mission } => {
            assert_eq!(revision, hash_mission(&mission));
            assert_eq!(mission.groups.len(), 4);
            let flight = mission
                .groups
                .iter()
                .find(|group| group.units.iter().any(|unit| unit.unit_type == "F-16C_50"))
                .expect("new flight in the mission");
            assert_eq!(flight.coalition, Coalition::Blue);
            assert_eq!(flight.units.len(), 2);
            assert!(flight.units.iter().all(|unit| unit.skill == Skill::Client));
            assert_eq!(flight.waypoints[0].action, WaypointAction::TakeOff);
        }
        other => panic!("expected a mission update, got {:?}", other.kind()),
    }
    Ok(())
}

#[tokio::test]
async fn loadout_updates_validate_the_gun_percentage() -> anyhow::Result<()> {
    let server = spawn_server();
    let (mut gateway, _world) = bootstrap(&server).await;

    let mut pylons = BTreeMap::new();
    pylons.insert(1, "AIM-120C".to_string());
    gateway.send(ClientMessage::UnitLoadoutUpdate {
        unit_id: 1001,
        pylons: pylons.clone(),
        chaff: 30,
        flare: 30,
        gun: 150,
        fuel: 4000.0,
    })?;
    gateway.send(ClientMessage::UnitLoadoutUpdate {
        unit_id: 1001,
        pylons,
        chaff: 30,
        flare: 30,
        gun: 50,
        fuel: 4000.0,
    })?;

    // Requests run in order, so the first unit update to come back must be
    // the accepted one.
    let update = update_of_kind(&mut gateway, ServerMessageKind::UnitUpdate).await;
    match update {
        ServerMessage::UnitUpdate { unit } => {
            assert_eq!(unit.id, 1001);
            assert_eq!(unit.loadout.gun, 50, "the out-of-range update was dropped");
            assert_eq!(
                unit.loadout.pylons.get(&1).map(String::as_str),
                Some("AIM-120C")
            );
        }
        other => panic!("expected a unit update, got {:?}", other.kind()),
    }
    Ok(())
}

#[tokio::test]
async fn bullseye_changes_reach_every_client() -> anyhow::Result<()> {
    let server = spawn_server();
    let (mut watcher, _watcher_world) = bootstrap(&server).await;
    let (editor, _editor_world) = bootstrap(&server).await;

    editor.send(ClientMessage::SetBullseye {
        coalition: Coalition::Red,
        bullseye: LatLon {
            lat: 43.1,
            lon: 40.9,
        },
    })?;

    let update = update_of_kind(&mut watcher, ServerMessageKind::BullseyeUpdate).await;
    match update {
        ServerMessage::BullseyeUpdate {
            coalition,
            bullseye,
        } => {
            assert_eq!(coalition, Coalition::Red);
            assert_eq!(bullseye.lat, 43.1);
            assert_eq!(bullseye.lon, 40.9);
        }
        other => panic!("expected a bullseye update, got {:?}", other.kind()),
    }
    Ok(())
}

#[tokio::test]
async fn save_list_load_roundtrip() -> anyhow::Result<()> {
    let missions_dir = TempDir::new("tauntaun_missions");
    let server = spawn_server_with(ServerConfig {
        missions_dir: missions_dir.path().to_path_buf(),
        autosave: false,
        ..ServerConfig::default()
    });
    let (mut gateway, _world) = bootstrap(&server).await;

    gateway.send(ClientMessage::SaveMission {
        name: Some("alpha".to_string()),
    })?;
    match gateway.request(ClientMessage::RequestMissionList).await? {
        ServerMessage::MissionList { missions } => {
            assert_eq!(missions, vec!["alpha".to_string()]);
        }
        other => panic!("expected the mission list, got {:?}", other.kind()),
    }

    // The file on disk is the plain mission document.
    let raw = std::fs::read_to_string(missions_dir.path().join("alpha.json"))?;
    let saved: serde_json::Value = serde_json::from_str(&raw)?;
    assert_eq!(saved["groups"].as_array().map(|groups| groups.len()), Some(3));

    // Drift the live mission, then load the save back over it.
    gateway.send(ClientMessage::GroupRouteRemove {
        group_id: 101,
        waypoint: turning_point("WP1", 42.5, 42.3),
    })?;
    update_of_kind(&mut gateway, ServerMessageKind::RouteUpdate).await;

    gateway.send(ClientMessage::LoadMission {
        name: "alpha".to_string(),
    })?;
    let update = update_of_kind(&mut gateway, ServerMessageKind::MissionUpdated).await;
    match update {
        ServerMessage::MissionUpdated { revision, mission } => {
            assert_eq!(revision, hash_mission(&mission));
            let group = mission.group(101).expect("group 101");
            assert_eq!(group.waypoints.len(), 3, "the save restored the removed point");
        }
        other => panic!("expected a mission update, got {:?}", other.kind()),
    }
    Ok(())
}
