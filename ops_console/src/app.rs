use std::sync::mpsc::{Receiver, Sender};
use std::time::{Duration, Instant};

use color_eyre::Result;
use crossterm::event::{self, Event, KeyCode};
use ratatui::backend::CrosstermBackend;
use ratatui::prelude::*;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{error, info, warn};

use mission_proto::{ClientMessage, ServerMessage};
use mission_schema::{Coalition, Group, Waypoint, WaypointAction};

use crate::bootstrap::InitializationStatus;
use crate::selection::GroupClick;
use crate::stores::WorldState;
use crate::ui::{draw_ui, UiState};

/// State pushed from the async side to the terminal thread.
#[derive(Debug)]
pub enum ClientEvent {
    Status(InitializationStatus),
    Connection(bool),
    World(Box<WorldState>),
    Update(ServerMessage),
}

pub struct ConsoleApp {
    terminal: Terminal<CrosstermBackend<std::io::Stdout>>,
    ui_state: UiState,
    events: Receiver<ClientEvent>,
    command_sender: UnboundedSender<ClientMessage>,
    shutdown_sender: Sender<()>,
    log_receiver: Receiver<String>,
}

impl ConsoleApp {
    pub fn new(
        events: Receiver<ClientEvent>,
        command_sender: UnboundedSender<ClientMessage>,
        shutdown_sender: Sender<()>,
        log_receiver: Receiver<String>,
    ) -> Result<Self> {
        let stdout = std::io::stdout();
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        crossterm::terminal::enable_raw_mode()?;
        terminal.clear()?;
        terminal.hide_cursor()?;
        Ok(Self {
            terminal,
            ui_state: UiState::default(),
            events,
            command_sender,
            shutdown_sender,
            log_receiver,
        })
    }

    pub fn run(mut self) -> Result<()> {
        let mut last_draw = Instant::now();

        loop {
            while let Ok(event) = self.events.try_recv() {
                self.apply_event(event);
            }

            while let Ok(line) = self.log_receiver.try_recv() {
                self.ui_state.push_log(line);
            }

            if last_draw.elapsed() >= Duration::from_millis(100) {
                self.terminal.draw(|frame| draw_ui(frame, &self.ui_state))?;
                last_draw = Instant::now();
            }

            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    if self.handle_key(key.code) {
                        break;
                    }
                }
            }
        }

        self.terminal.show_cursor()?;
        crossterm::terminal::disable_raw_mode()?;
        let _ = self.shutdown_sender.send(());
        Ok(())
    }

    fn apply_event(&mut self, event: ClientEvent) {
        match event {
            ClientEvent::Status(status) => self.ui_state.status = status,
            ClientEvent::Connection(connected) => self.ui_state.connected = connected,
            ClientEvent::World(world) => self.ui_state.set_world(world),
            ClientEvent::Update(update) => self.ui_state.apply_update(update),
        }
    }

    /// Returns true when the app should exit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        if self.ui_state.mission_picker.is_some() {
            match code {
                KeyCode::Esc => self.ui_state.mission_picker = None,
                KeyCode::Up => self.ui_state.cursor_up(),
                KeyCode::Down => self.ui_state.cursor_down(),
                KeyCode::Enter => self.load_picked_mission(),
                _ => {}
            }
            return false;
        }

        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Up => self.ui_state.cursor_up(),
            KeyCode::Down => self.ui_state.cursor_down(),
            KeyCode::Enter => self.select_group_under_cursor(),
            KeyCode::Char('c') => {
                let commander = !self.ui_state.selection.is_commander();
                self.ui_state.selection.set_mode(commander);
                info!("Switched to {} mode", if commander { "commander" } else { "pilot" });
            }
            KeyCode::Char('a') => {
                self.ui_state.show_all_groups = !self.ui_state.show_all_groups;
                self.ui_state.clamp_cursor();
            }
            KeyCode::Char('u') => self.cycle_session_unit(),
            KeyCode::Char('w') => self.cycle_waypoint(),
            KeyCode::Char('b') => self.send_bullseye(),
            KeyCode::Char('x') => self.append_waypoint(),
            KeyCode::Char('d') | KeyCode::Delete => self.remove_selected_waypoint(),
            KeyCode::Char('+') | KeyCode::Char('=') => self.nudge_waypoint_altitude(500.0),
            KeyCode::Char('-') | KeyCode::Char('_') => self.nudge_waypoint_altitude(-500.0),
            KeyCode::Char('f') => self.add_flight(),
            KeyCode::Char('s') => {
                self.send(ClientMessage::SaveMission { name: None }, "Save requested");
            }
            KeyCode::Char('l') => {
                self.send(ClientMessage::RequestMissionList, "Mission list requested");
            }
            KeyCode::Char('o') => self.download_mission(),
            _ => {}
        }
        false
    }

    fn send(&self, message: ClientMessage, log: &str) {
        if let Err(err) = self.command_sender.send(message) {
            error!("Failed to send command: {}", err);
        } else {
            info!("{log}");
        }
    }

    fn select_group_under_cursor(&mut self) {
        let Some(group) = self.ui_state.cursor_group() else {
            warn!("No group under cursor");
            return;
        };
        let click = GroupClick {
            group_id: group.id,
            coalition: group.coalition,
        };
        let own = self.ui_state.own_coalition();
        if !self.ui_state.selection.handle_group_click(click, own) {
            warn!("Selection unchanged: commander mode and matching coalition required");
        }
    }

    fn cycle_session_unit(&mut self) {
        let Some(world) = self.ui_state.world.as_deref() else {
            return;
        };
        let Some(session_id) = world.session.own_id() else {
            return;
        };
        let Some(mut data) = world.session.own_data().copied() else {
            return;
        };
        let resolved = self.ui_state.resolved();
        let Some(group) = resolved.group else {
            warn!("Select a group before picking a unit");
            return;
        };
        let next = next_unit_in(group, data.selected_unit());
        data.set_selected_unit(next);
        self.send(
            ClientMessage::SessionDataUpdate {
                session_id,
                session_data: data,
            },
            "Session unit selection sent",
        );
    }

    fn cycle_waypoint(&mut self) {
        let resolved = self.ui_state.resolved();
        let Some(group) = resolved.group else {
            warn!("Select a group before cycling waypoints");
            return;
        };
        let count = group.waypoints.len();
        let next = match resolved.waypoint {
            _ if count == 0 => None,
            None => Some(0),
            Some(index) if index + 1 >= count => None,
            Some(index) => Some(index + 1),
        };
        self.ui_state.selection.select_waypoint(next);
    }

    fn send_bullseye(&mut self) {
        let Some(coalition) = self.ui_state.own_coalition() else {
            warn!("No session coalition yet");
            return;
        };
        let resolved = self.ui_state.resolved();
        let position = match (resolved.group, resolved.waypoint) {
            (Some(group), Some(index)) => group.waypoints[index].position,
            _ => {
                let Some(mission) = self
                    .ui_state
                    .world
                    .as_deref()
                    .and_then(|world| world.mission.mission())
                else {
                    return;
                };
                mission.terrain.map_view_default
            }
        };
        self.send(
            ClientMessage::SetBullseye {
                coalition,
                bullseye: position,
            },
            "Bullseye update sent",
        );
    }

    fn append_waypoint(&mut self) {
        let resolved = self.ui_state.resolved();
        let Some(group) = resolved.group else {
            warn!("Select a group before editing its route");
            return;
        };
        let Some(mission) = self
            .ui_state
            .world
            .as_deref()
            .and_then(|world| world.mission.mission())
        else {
            return;
        };
        let new = Waypoint {
            name: format!("WP{}", group.waypoints.len()),
            position: mission.terrain.map_view_default,
            alt: 5000.0,
            speed: 220.0,
            action: WaypointAction::TurningPoint,
        };
        self.send(
            ClientMessage::GroupRouteInsertAt {
                group_id: group.id,
                new,
                at: None,
            },
            "Route insert sent",
        );
    }

    fn remove_selected_waypoint(&mut self) {
        let resolved = self.ui_state.resolved();
        let (Some(group), Some(index)) = (resolved.group, resolved.waypoint) else {
            warn!("Select a waypoint first");
            return;
        };
        let message = ClientMessage::GroupRouteRemove {
            group_id: group.id,
            waypoint: group.waypoints[index].clone(),
        };
        self.send(message, "Route remove sent");
        self.ui_state.selection.select_waypoint(None);
    }

    fn nudge_waypoint_altitude(&mut self, delta: f64) {
        let resolved = self.ui_state.resolved();
        let (Some(group), Some(index)) = (resolved.group, resolved.waypoint) else {
            warn!("Select a waypoint first");
            return;
        };
        let old = group.waypoints[index].clone();
        let mut new = old.clone();
        new.alt = (new.alt + delta).max(0.0);
        self.send(
            ClientMessage::GroupRouteModify {
                group_id: group.id,
                old,
                new,
            },
            "Route modify sent",
        );
    }

    fn add_flight(&mut self) {
        let Some(world) = self.ui_state.world.as_deref() else {
            return;
        };
        let Some(coalition) = world.session.own_coalition() else {
            warn!("No session coalition yet");
            return;
        };
        let Some(mission) = world.mission.mission() else {
            return;
        };
        let Some(static_data) = world.static_data.data() else {
            return;
        };
        let Some(airport) = mission
            .terrain
            .airports
            .iter()
            .find(|airport| airport.coalition == coalition)
        else {
            warn!("No airport for coalition {}", coalition.as_str());
            return;
        };
        let Some(airframe) = static_data.airframes.first() else {
            warn!("No airframes in static data");
            return;
        };
        let country = match coalition {
            Coalition::Blue => "USA",
            Coalition::Red => "Russia",
            Coalition::Neutral => "Switzerland",
        };
        self.send(
            ClientMessage::AddFlight {
                coalition,
                country: country.to_string(),
                location: airport.position,
                airport: airport.id,
                airframe: airframe.id.clone(),
                count: 2,
            },
            "Add flight sent",
        );
    }

    fn download_mission(&mut self) {
        let Some(world) = self.ui_state.world.as_deref() else {
            return;
        };
        let Some(mission) = world.mission.mission() else {
            return;
        };
        let path = format!("tauntaun_mission_{}.json", world.mission.revision());
        match serde_json::to_string_pretty(mission) {
            Ok(encoded) => match std::fs::write(&path, encoded) {
                Ok(()) => info!("Mission written to {path}"),
                Err(err) => error!("Failed to write {path}: {err}"),
            },
            Err(err) => error!("Failed to encode mission: {err}"),
        }
    }

    fn load_picked_mission(&mut self) {
        let Some(picker) = self.ui_state.mission_picker.take() else {
            return;
        };
        let Some(name) = picker.missions.get(picker.cursor).cloned() else {
            warn!("No mission to load");
            return;
        };
        self.send(ClientMessage::LoadMission { name }, "Mission load sent");
    }
}

fn next_unit_in(group: &Group, current: Option<u64>) -> Option<u64> {
    let ids: Vec<u64> = group.units.iter().map(|unit| unit.id).collect();
    match current.and_then(|id| ids.iter().position(|candidate| *candidate == id)) {
        Some(index) if index + 1 < ids.len() => Some(ids[index + 1]),
        Some(_) => None,
        None => ids.first().copied(),
    }
}
