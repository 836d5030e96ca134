use std::collections::VecDeque;

use ratatui::layout::{Constraint, Direction, Layout, Margin};
use ratatui::prelude::Rect;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Frame;

use mission_proto::ServerMessage;
use mission_schema::{Coalition, Group};

use crate::bootstrap::InitializationStatus;
use crate::selection::{resolve, ResolvedSelection, Selection};
use crate::shell::{shell_view, ShellView};
use crate::stores::WorldState;

pub struct MissionPicker {
    pub missions: Vec<String>,
    pub cursor: usize,
}

pub struct UiState {
    pub status: InitializationStatus,
    pub connected: bool,
    pub world: Option<Box<WorldState>>,
    pub selection: Selection,
    pub show_all_groups: bool,
    pub group_cursor: usize,
    pub mission_picker: Option<MissionPicker>,
    pub logs: VecDeque<String>,
    pub max_logs: usize,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            status: InitializationStatus::Uninitialized,
            connected: false,
            world: None,
            selection: Selection::default(),
            show_all_groups: false,
            group_cursor: 0,
            mission_picker: None,
            logs: VecDeque::new(),
            max_logs: 8,
        }
    }
}

impl UiState {
    pub fn push_log<S: Into<String>>(&mut self, line: S) {
        let mut text: String = line.into();
        while text.ends_with('\n') || text.ends_with('\r') {
            text.pop();
        }
        if text.is_empty() {
            return;
        }
        self.logs.push_front(text);
        while self.logs.len() > self.max_logs {
            self.logs.pop_back();
        }
    }

    pub fn set_world(&mut self, world: Box<WorldState>) {
        self.world = Some(world);
        self.group_cursor = 0;
    }

    /// Fold a server push into the mirrored world. A mission list reply
    /// opens the picker instead; everything else may shrink the visible
    /// group list, so the cursor is clamped afterwards.
    pub fn apply_update(&mut self, update: ServerMessage) {
        match update {
            ServerMessage::MissionList { missions } => {
                self.mission_picker = Some(MissionPicker {
                    missions,
                    cursor: 0,
                });
            }
            other => {
                if let Some(world) = self.world.as_mut() {
                    world.apply(other);
                }
                self.clamp_cursor();
            }
        }
    }

    pub fn own_coalition(&self) -> Option<Coalition> {
        self.world
            .as_deref()
            .and_then(|world| world.session.own_coalition())
    }

    /// Groups shown in the list pane: the viewer's own coalition, or every
    /// group when the all-groups toggle is on.
    pub fn visible_groups(&self) -> Vec<&Group> {
        let Some(world) = self.world.as_deref() else {
            return Vec::new();
        };
        let Some(mission) = world.mission.mission() else {
            return Vec::new();
        };
        if self.show_all_groups {
            return mission.groups.iter().collect();
        }
        match world.session.own_coalition() {
            Some(own) => mission
                .groups
                .iter()
                .filter(|group| group.coalition == own)
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn cursor_group(&self) -> Option<&Group> {
        self.visible_groups().get(self.group_cursor).copied()
    }

    pub fn cursor_up(&mut self) {
        if let Some(picker) = self.mission_picker.as_mut() {
            picker.cursor = picker.cursor.saturating_sub(1);
            return;
        }
        self.group_cursor = self.group_cursor.saturating_sub(1);
    }

    pub fn cursor_down(&mut self) {
        if let Some(picker) = self.mission_picker.as_mut() {
            if !picker.missions.is_empty() {
                picker.cursor = (picker.cursor + 1).min(picker.missions.len() - 1);
            }
            return;
        }
        let len = self.visible_groups().len();
        if len > 0 {
            self.group_cursor = (self.group_cursor + 1).min(len - 1);
        }
    }

    pub fn clamp_cursor(&mut self) {
        let len = self.visible_groups().len();
        if len == 0 {
            self.group_cursor = 0;
        } else if self.group_cursor >= len {
            self.group_cursor = len - 1;
        }
    }

    pub fn resolved(&self) -> ResolvedSelection<'_> {
        match self.world.as_deref() {
            Some(world) => match world.mission.mission() {
                Some(mission) => resolve(&self.selection, mission, world.session.own_data()),
                None => ResolvedSelection::default(),
            },
            None => ResolvedSelection::default(),
        }
    }
}

pub fn draw_ui(frame: &mut Frame, state: &UiState) {
    match shell_view(state.status, state.connected) {
        ShellView::Loading => draw_notice(frame, "Loading", "Initializing mission data..."),
        ShellView::Failed => draw_notice(
            frame,
            "Initialization Failed",
            "The console could not initialize. Check the server address and restart.",
        ),
        ShellView::Disconnected => draw_notice(
            frame,
            "Disconnected",
            "Connection to the mission server was lost. Restart the console to reconnect.",
        ),
        ShellView::Ready => draw_ready(frame, state),
    }
}

fn draw_notice(frame: &mut Frame, title: &str, message: &str) {
    let area = frame.size();
    let block = Block::default().borders(Borders::ALL).title(title.to_string());
    let text = Paragraph::new(message.to_string()).wrap(Wrap { trim: true });
    frame.render_widget(block, area);
    frame.render_widget(
        text,
        area.inner(&Margin {
            vertical: 1,
            horizontal: 2,
        }),
    );
}

fn draw_ready(frame: &mut Frame, state: &UiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(10),
            Constraint::Length(7),
            Constraint::Length(4),
        ])
        .split(frame.size());

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(32),
            Constraint::Min(30),
            Constraint::Length(28),
        ])
        .split(chunks[1]);

    let resolved = state.resolved();

    draw_header(frame, chunks[0], state);
    draw_groups(frame, body[0], state, &resolved);
    if let Some(picker) = state.mission_picker.as_ref() {
        draw_mission_picker(frame, body[1], picker);
    } else {
        draw_detail(frame, body[1], state, &resolved);
    }
    draw_sessions(frame, body[2], state);
    draw_logs(frame, chunks[2], state);
    draw_hints(frame, chunks[3]);
}

fn draw_header(frame: &mut Frame, area: Rect, state: &UiState) {
    let title = concat!("Project Tauntaun Ops Console v", env!("CARGO_PKG_VERSION"));
    let block = Block::default().borders(Borders::ALL).title(title);

    let mode = if state.selection.is_commander() {
        "commander"
    } else {
        "pilot"
    };
    let mut spans = vec![
        Span::styled("Connected", Style::default().fg(Color::Green)),
        Span::raw(" | mode "),
        Span::styled(mode, Style::default().fg(Color::Yellow)),
    ];
    if let Some(coalition) = state.own_coalition() {
        spans.push(Span::raw(" | coalition "));
        spans.push(Span::styled(
            coalition.as_str(),
            Style::default().fg(coalition_color(coalition)),
        ));
    }
    if let Some(world) = state.world.as_deref() {
        if let Some(mission) = world.mission.mission() {
            spans.push(Span::raw(format!(" | {}", mission.terrain.name)));
        }
        spans.push(Span::raw(format!(" | revision {}", world.mission.revision())));
        spans.push(Span::raw(format!(
            " | sessions {}",
            world.session.sessions().len()
        )));
    }
    if state.show_all_groups {
        spans.push(Span::raw(" | all groups"));
    }

    let text = Paragraph::new(Line::from(spans)).wrap(Wrap { trim: true });
    frame.render_widget(block, area);
    frame.render_widget(
        text,
        area.inner(&Margin {
            vertical: 1,
            horizontal: 1,
        }),
    );
}

fn draw_groups(frame: &mut Frame, area: Rect, state: &UiState, resolved: &ResolvedSelection) {
    let block = Block::default().borders(Borders::ALL).title("Groups");
    let selected_id = resolved.group.map(|group| group.id);
    let lines: Vec<Line> = state
        .visible_groups()
        .iter()
        .enumerate()
        .map(|(index, group)| {
            let cursor = if index == state.group_cursor { "> " } else { "  " };
            let mark = if Some(group.id) == selected_id {
                "*"
            } else {
                " "
            };
            Line::from(vec![
                Span::raw(format!("{cursor}{mark} ")),
                Span::styled(
                    format!("{:<14}", group.name),
                    Style::default().fg(coalition_color(group.coalition)),
                ),
                Span::raw(format!(" {:?} x{}", group.category, group.units.len())),
            ])
        })
        .collect();

    let paragraph = Paragraph::new(lines).wrap(Wrap { trim: false });
    frame.render_widget(block, area);
    frame.render_widget(
        paragraph,
        area.inner(&Margin {
            vertical: 1,
            horizontal: 1,
        }),
    );
}

fn draw_detail(frame: &mut Frame, area: Rect, state: &UiState, resolved: &ResolvedSelection) {
    let block = Block::default().borders(Borders::ALL).title("Selection");
    let mut lines: Vec<Line> = Vec::new();

    match resolved.group {
        Some(group) => {
            lines.push(Line::from(vec![
                Span::styled(group.name.clone(), Style::default().fg(Color::Yellow)),
                Span::raw(format!(
                    "  {} / {} / {:?}",
                    group.coalition.as_str(),
                    group.country,
                    group.category
                )),
            ]));
            lines.push(Line::from(Span::raw("")));

            let session_unit = state
                .world
                .as_deref()
                .and_then(|world| world.session.own_data())
                .and_then(|data| data.selected_unit());
            for unit in &group.units {
                let mark = if Some(unit.id) == session_unit {
                    "* "
                } else {
                    "  "
                };
                lines.push(Line::from(vec![
                    Span::raw(mark),
                    Span::styled(
                        format!("{:<14}", unit.name),
                        Style::default().fg(Color::Cyan),
                    ),
                    Span::raw(format!(" {} {:?}", unit.unit_type, unit.skill)),
                ]));
            }
            lines.push(Line::from(Span::raw("")));

            for (index, waypoint) in group.waypoints.iter().enumerate() {
                let cursor = if resolved.waypoint == Some(index) {
                    "> "
                } else {
                    "  "
                };
                lines.push(Line::from(vec![
                    Span::raw(format!("{cursor}{index} ")),
                    Span::styled(
                        format!("{:<10}", waypoint.name),
                        Style::default().fg(Color::Yellow),
                    ),
                    Span::raw(format!(
                        " {:>8.4} {:>9.4}  alt {:>6.0}m  spd {:>4.0}",
                        waypoint.position.lat,
                        waypoint.position.lon,
                        waypoint.alt,
                        waypoint.speed
                    )),
                ]));
            }
        }
        None => {
            lines.push(Line::from(Span::raw("No group selected.")));
            if let Some(mission) = state
                .world
                .as_deref()
                .and_then(|world| world.mission.mission())
            {
                lines.push(Line::from(Span::raw("")));
                for (coalition, bullseye) in &mission.bullseyes {
                    lines.push(Line::from(vec![
                        Span::styled(
                            format!("{:<8}", coalition.as_str()),
                            Style::default().fg(coalition_color(*coalition)),
                        ),
                        Span::raw(format!(
                            "bullseye {:>8.4} {:>9.4}",
                            bullseye.lat, bullseye.lon
                        )),
                    ]));
                }
            }
        }
    }

    let paragraph = Paragraph::new(lines).wrap(Wrap { trim: false });
    frame.render_widget(block, area);
    frame.render_widget(
        paragraph,
        area.inner(&Margin {
            vertical: 1,
            horizontal: 1,
        }),
    );
}

fn draw_mission_picker(frame: &mut Frame, area: Rect, picker: &MissionPicker) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Load Mission (Enter to load, Esc to cancel)");
    let lines: Vec<Line> = if picker.missions.is_empty() {
        vec![Line::from(Span::raw("No saved missions."))]
    } else {
        picker
            .missions
            .iter()
            .enumerate()
            .map(|(index, name)| {
                let cursor = if index == picker.cursor { "> " } else { "  " };
                Line::from(vec![
                    Span::raw(cursor),
                    Span::styled(name.clone(), Style::default().fg(Color::Yellow)),
                ])
            })
            .collect()
    };

    let paragraph = Paragraph::new(lines).wrap(Wrap { trim: false });
    frame.render_widget(block, area);
    frame.render_widget(
        paragraph,
        area.inner(&Margin {
            vertical: 1,
            horizontal: 1,
        }),
    );
}

fn draw_sessions(frame: &mut Frame, area: Rect, state: &UiState) {
    let block = Block::default().borders(Borders::ALL).title("Sessions");
    let mut lines: Vec<Line> = Vec::new();
    if let Some(world) = state.world.as_deref() {
        let own = world.session.own_id();
        for (id, data) in world.session.sessions() {
            let marker = if Some(*id) == own { "> " } else { "  " };
            let unit = match data.selected_unit() {
                Some(unit_id) => format!(" unit {unit_id}"),
                None => String::new(),
            };
            lines.push(Line::from(vec![
                Span::raw(format!("{marker}#{id} ")),
                Span::styled(
                    data.coalition.as_str(),
                    Style::default().fg(coalition_color(data.coalition)),
                ),
                Span::raw(unit),
            ]));
        }
    }

    let paragraph = Paragraph::new(lines).wrap(Wrap { trim: false });
    frame.render_widget(block, area);
    frame.render_widget(
        paragraph,
        area.inner(&Margin {
            vertical: 1,
            horizontal: 1,
        }),
    );
}

fn draw_logs(frame: &mut Frame, area: Rect, state: &UiState) {
    let block = Block::default().borders(Borders::ALL).title("Logs");
    let lines: Vec<Line> = state
        .logs
        .iter()
        .map(|entry| Line::from(Span::raw(entry)))
        .collect();
    let paragraph = Paragraph::new(lines).wrap(Wrap { trim: false });
    frame.render_widget(block, area);
    frame.render_widget(
        paragraph,
        area.inner(&Margin {
            vertical: 1,
            horizontal: 1,
        }),
    );
}

fn draw_hints(frame: &mut Frame, area: Rect) {
    let lines = vec![
        Line::from(vec![
            Span::styled("c", Style::default().fg(Color::Yellow)),
            Span::raw(" mode  "),
            Span::styled("a", Style::default().fg(Color::Yellow)),
            Span::raw(" all groups  "),
            Span::styled("enter", Style::default().fg(Color::Yellow)),
            Span::raw(" select  "),
            Span::styled("u", Style::default().fg(Color::Yellow)),
            Span::raw(" unit  "),
            Span::styled("w", Style::default().fg(Color::Yellow)),
            Span::raw(" waypoint  "),
            Span::styled("b", Style::default().fg(Color::Yellow)),
            Span::raw(" bullseye"),
        ]),
        Line::from(vec![
            Span::styled("x", Style::default().fg(Color::Yellow)),
            Span::raw(" add wp  "),
            Span::styled("d", Style::default().fg(Color::Yellow)),
            Span::raw(" del wp  "),
            Span::styled("+/-", Style::default().fg(Color::Yellow)),
            Span::raw(" alt  "),
            Span::styled("f", Style::default().fg(Color::Yellow)),
            Span::raw(" flight  "),
            Span::styled("s", Style::default().fg(Color::Yellow)),
            Span::raw(" save  "),
            Span::styled("l", Style::default().fg(Color::Yellow)),
            Span::raw(" load  "),
            Span::styled("o", Style::default().fg(Color::Yellow)),
            Span::raw(" download  "),
            Span::styled("q", Style::default().fg(Color::Yellow)),
            Span::raw(" quit"),
        ]),
    ];

    let block = Block::default().borders(Borders::ALL).title("Commands");
    let paragraph = Paragraph::new(lines).wrap(Wrap { trim: false });
    frame.render_widget(block, area);
    frame.render_widget(
        paragraph,
        area.inner(&Margin {
            vertical: 1,
            horizontal: 1,
        }),
    );
}

fn coalition_color(coalition: Coalition) -> Color {
    match coalition {
        Coalition::Blue => Color::Cyan,
        Coalition::Red => Color::Red,
        Coalition::Neutral => Color::Gray,
    }
}
