use mission_schema::{Coalition, Group, Mission, SessionData, Unit};

/// Explicit ids a commander has picked. Ids are kept as-is even when the
/// mission later drops them; [`resolve`] turns stale ids into misses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CommanderSelection {
    pub group_id: Option<u64>,
    pub unit_id: Option<u64>,
    pub waypoint: Option<usize>,
}

/// What the console is pointed at. Commander mode carries explicit ids;
/// pilot mode derives everything from the session's selected unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Commander(CommanderSelection),
    Pilot,
}

impl Default for Selection {
    fn default() -> Self {
        Selection::Commander(CommanderSelection::default())
    }
}

/// A click on a group's map marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupClick {
    pub group_id: u64,
    pub coalition: Coalition,
}

impl Selection {
    pub fn commander() -> Self {
        Selection::Commander(CommanderSelection::default())
    }

    pub fn pilot() -> Self {
        Selection::Pilot
    }

    pub fn is_commander(&self) -> bool {
        matches!(self, Selection::Commander(_))
    }

    /// Switch mode. Any explicit selection is dropped with the old mode.
    pub fn set_mode(&mut self, commander: bool) {
        *self = if commander {
            Self::commander()
        } else {
            Self::pilot()
        };
    }

    /// Point at a group directly. Changing the group drops the unit and
    /// waypoint sub-selections; reasserting the current group keeps them.
    /// Pilot mode ignores this.
    pub fn select_group(&mut self, group_id: Option<u64>) {
        if let Selection::Commander(commander) = self {
            if commander.group_id != group_id {
                *commander = CommanderSelection {
                    group_id,
                    unit_id: None,
                    waypoint: None,
                };
            }
        }
    }

    pub fn select_unit(&mut self, unit_id: Option<u64>) {
        if let Selection::Commander(commander) = self {
            commander.unit_id = unit_id;
        }
    }

    pub fn select_waypoint(&mut self, waypoint: Option<usize>) {
        if let Selection::Commander(commander) = self {
            commander.waypoint = waypoint;
        }
    }

    /// Marker click rules: only commander mode reacts, and only to markers
    /// of the viewer's own coalition. Clicking the selected group again
    /// deselects it. Returns whether the selection changed.
    pub fn handle_group_click(&mut self, click: GroupClick, own_coalition: Option<Coalition>) -> bool {
        let Selection::Commander(commander) = self else {
            return false;
        };
        if own_coalition != Some(click.coalition) {
            return false;
        }
        let target = if commander.group_id == Some(click.group_id) {
            None
        } else {
            Some(click.group_id)
        };
        *commander = CommanderSelection {
            group_id: target,
            unit_id: None,
            waypoint: None,
        };
        true
    }
}

/// Selection resolved against the live mission. Every field is a plain miss
/// when its id no longer exists; nothing here errors.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolvedSelection<'a> {
    pub group: Option<&'a Group>,
    pub unit: Option<&'a Unit>,
    pub waypoint: Option<usize>,
}

/// Resolve a selection against the mission. Commander ids are looked up
/// directly; pilot mode starts from the session's selected unit and derives
/// the owning group. The waypoint index survives only while it stays inside
/// the resolved group's route.
pub fn resolve<'a>(
    selection: &Selection,
    mission: &'a Mission,
    session: Option<&SessionData>,
) -> ResolvedSelection<'a> {
    match selection {
        Selection::Commander(commander) => {
            let group = commander.group_id.and_then(|id| mission.group(id));
            let unit = commander.unit_id.and_then(|id| mission.unit(id));
            let waypoint = match (commander.waypoint, group) {
                (Some(index), Some(group)) if index < group.waypoints.len() => Some(index),
                _ => None,
            };
            ResolvedSelection {
                group,
                unit,
                waypoint,
            }
        }
        Selection::Pilot => {
            let unit_id = session.and_then(|session| session.selected_unit());
            ResolvedSelection {
                group: unit_id.and_then(|id| mission.group_of_unit(id)),
                unit: unit_id.and_then(|id| mission.unit(id)),
                waypoint: None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mission_schema::{GroupCategory, LatLon, Loadout, Skill, Terrain, Waypoint, WaypointAction};

    fn unit(id: u64, name: &str) -> Unit {
        Unit {
            id,
            name: name.to_string(),
            unit_type: "FA-18C_hornet".to_string(),
            position: LatLon::new(42.2, 42.0),
            heading: 0.0,
            skill: Skill::Client,
            loadout: Loadout::default(),
        }
    }

    fn waypoint(name: &str) -> Waypoint {
        Waypoint {
            name: name.to_string(),
            position: LatLon::new(42.2, 42.0),
            alt: 2000.0,
            speed: 180.0,
            action: WaypointAction::TurningPoint,
        }
    }

    fn group(id: u64, coalition: Coalition, units: Vec<Unit>) -> Group {
        Group {
            id,
            name: format!("Group {id}"),
            coalition,
            country: "USA".to_string(),
            category: GroupCategory::Plane,
            units,
            waypoints: vec![waypoint("WP0"), waypoint("WP1")],
        }
    }

    fn mission() -> Mission {
        Mission {
            terrain: Terrain::default(),
            groups: vec![
                group(101, Coalition::Blue, vec![unit(1001, "Enfield 1-1")]),
                group(102, Coalition::Red, vec![unit(2001, "Uzi 1-1")]),
            ],
            bullseyes: Default::default(),
        }
    }

    fn blue_session(selected_unit: Option<u64>) -> SessionData {
        let mut data = SessionData::default();
        data.set_selected_unit(selected_unit);
        data
    }

    #[test]
    fn commander_mode_starts_with_nothing_selected() {
        let mission = mission();
        let resolved = resolve(&Selection::default(), &mission, None);
        assert!(resolved.group.is_none());
        assert!(resolved.unit.is_none());
        assert!(resolved.waypoint.is_none());
    }

    #[test]
    fn commander_ids_resolve_directly() {
        let mission = mission();
        let mut selection = Selection::commander();
        selection.select_group(Some(101));
        selection.select_unit(Some(1001));
        selection.select_waypoint(Some(1));

        let resolved = resolve(&selection, &mission, None);
        assert_eq!(resolved.group.map(|g| g.id), Some(101));
        assert_eq!(resolved.unit.map(|u| u.id), Some(1001));
        assert_eq!(resolved.waypoint, Some(1));
    }

    #[test]
    fn stale_ids_resolve_to_misses() {
        let mission = mission();
        let mut selection = Selection::commander();
        selection.select_group(Some(999));
        selection.select_unit(Some(9999));
        selection.select_waypoint(Some(0));

        let resolved = resolve(&selection, &mission, None);
        assert!(resolved.group.is_none());
        assert!(resolved.unit.is_none());
        assert!(resolved.waypoint.is_none());
    }

    #[test]
    fn waypoint_index_survives_only_inside_the_route() {
        let mission = mission();
        let mut selection = Selection::commander();
        selection.select_group(Some(101));
        selection.select_waypoint(Some(5));
        assert!(resolve(&selection, &mission, None).waypoint.is_none());

        selection.select_waypoint(Some(1));
        assert_eq!(resolve(&selection, &mission, None).waypoint, Some(1));
    }

    #[test]
    fn pilot_mode_derives_from_the_session() {
        let mission = mission();
        let session = blue_session(Some(1001));
        let resolved = resolve(&Selection::pilot(), &mission, Some(&session));
        assert_eq!(resolved.unit.map(|u| u.id), Some(1001));
        assert_eq!(resolved.group.map(|g| g.id), Some(101));
    }

    #[test]
    fn pilot_mode_with_no_selection_resolves_to_nothing() {
        let mission = mission();
        let session = blue_session(None);
        let resolved = resolve(&Selection::pilot(), &mission, Some(&session));
        assert!(resolved.unit.is_none());
        assert!(resolved.group.is_none());
    }

    #[test]
    fn pilot_mode_survives_a_removed_unit() {
        let mission = mission();
        let session = blue_session(Some(4242));
        let resolved = resolve(&Selection::pilot(), &mission, Some(&session));
        assert!(resolved.unit.is_none());
        assert!(resolved.group.is_none());
    }

    #[test]
    fn clicks_are_ignored_outside_commander_mode() {
        let mut selection = Selection::pilot();
        let click = GroupClick {
            group_id: 101,
            coalition: Coalition::Blue,
        };
        assert!(!selection.handle_group_click(click, Some(Coalition::Blue)));
        assert_eq!(selection, Selection::pilot());
    }

    #[test]
    fn clicks_require_a_matching_coalition() {
        let mut selection = Selection::commander();
        let click = GroupClick {
            group_id: 102,
            coalition: Coalition::Red,
        };
        assert!(!selection.handle_group_click(click, Some(Coalition::Blue)));
        assert!(!selection.handle_group_click(click, None));
        assert_eq!(selection, Selection::commander());
    }

    #[test]
    fn clicking_a_group_toggles_it() {
        let mut selection = Selection::commander();
        let click = GroupClick {
            group_id: 101,
            coalition: Coalition::Blue,
        };
        assert!(selection.handle_group_click(click, Some(Coalition::Blue)));
        assert_eq!(
            selection,
            Selection::Commander(CommanderSelection {
                group_id: Some(101),
                unit_id: None,
                waypoint: None,
            })
        );

        assert!(selection.handle_group_click(click, Some(Coalition::Blue)));
        assert_eq!(selection, Selection::commander());
    }

    #[test]
    fn changing_group_drops_sub_selections() {
        let mut selection = Selection::commander();
        selection.select_group(Some(101));
        selection.select_unit(Some(1001));
        selection.select_waypoint(Some(1));

        let click = GroupClick {
            group_id: 103,
            coalition: Coalition::Blue,
        };
        assert!(selection.handle_group_click(click, Some(Coalition::Blue)));
        assert_eq!(
            selection,
            Selection::Commander(CommanderSelection {
                group_id: Some(103),
                unit_id: None,
                waypoint: None,
            })
        );
    }

    #[test]
    fn deselecting_also_drops_sub_selections() {
        let mut selection = Selection::commander();
        selection.select_group(Some(101));
        selection.select_unit(Some(1001));

        let click = GroupClick {
            group_id: 101,
            coalition: Coalition::Blue,
        };
        assert!(selection.handle_group_click(click, Some(Coalition::Blue)));
        assert_eq!(selection, Selection::commander());
    }

    #[test]
    fn reasserting_the_same_group_keeps_sub_selections() {
        let mut selection = Selection::commander();
        selection.select_group(Some(101));
        selection.select_unit(Some(1001));
        selection.select_group(Some(101));
        assert_eq!(
            selection,
            Selection::Commander(CommanderSelection {
                group_id: Some(101),
                unit_id: Some(1001),
                waypoint: None,
            })
        );
    }
}
