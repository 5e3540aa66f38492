use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::RwLock;

use super::frames::{InboundFrame, parse_position, user_positions};
use super::mutation::{PixelMutation, normalize_color};

/// Colours kept per neighbour in [`CanvasView::neighbor_colors`].
const NEIGHBOR_COLOR_LIMIT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Neighbor {
    North,
    South,
    East,
    West,
}

impl Neighbor {
    const ALL: [Self; 4] = [Self::North, Self::South, Self::East, Self::West];

    fn offset(self) -> (i32, i32) {
        match self {
            Self::North => (0, -1),
            Self::South => (0, 1),
            Self::East => (1, 0),
            Self::West => (-1, 0),
        }
    }
}

#[derive(Debug, Default)]
struct ViewState {
    identity: Option<String>,
    position: Option<(i32, i32)>,
    own_cells: BTreeMap<(i32, i32), String>,
    positions: HashMap<String, (i32, i32)>,
    pixels: HashMap<String, BTreeMap<(i32, i32), String>>,
}

/// What this agent knows about the shared canvas, as told by the canvas
/// channel. Written by the channel reader, read by the scheduler, the
/// submitter and the heartbeat emitter.
#[derive(Debug, Default)]
pub struct CanvasView {
    state: RwLock<ViewState>,
}

impl CanvasView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Identity assigned by the canvas server, if the handshake happened.
    pub fn identity(&self) -> Option<String> {
        self.state.read().ok().and_then(|s| s.identity.clone())
    }

    pub fn position(&self) -> Option<(i32, i32)> {
        self.state.read().ok().and_then(|s| s.position)
    }

    pub fn set_identity(&self, user_id: impl Into<String>, position: Option<(i32, i32)>) {
        if let Ok(mut state) = self.state.write() {
            state.identity = Some(user_id.into());
            if position.is_some() {
                state.position = position;
            }
        }
    }

    /// Fold one inbound frame into the view.
    pub fn apply_inbound(&self, frame: &InboundFrame) {
        let Ok(mut state) = self.state.write() else {
            return;
        };

        match frame {
            InboundFrame::InitialState {
                my_user_id,
                grid_state,
                sub_cell_states,
            } => {
                state.identity = Some(my_user_id.clone());
                state.positions = user_positions(grid_state.as_ref());
                state.position = state.positions.get(my_user_id).copied();

                state.pixels.clear();
                state.own_cells.clear();
                for (user, cells) in sub_cell_states {
                    let parsed = parse_cells(cells);
                    if user == my_user_id {
                        state.own_cells.clone_from(&parsed);
                    }
                    state.pixels.insert(user.clone(), parsed);
                }
            }
            InboundFrame::NewUser { user_id, position } => {
                if let Some(pos) = position.as_ref().and_then(parse_position) {
                    state.positions.insert(user_id.clone(), pos);
                }
            }
            InboundFrame::CellUpdate {
                user_id,
                sub_x,
                sub_y,
                color,
            } => {
                let Some(color) = normalize_color(color) else {
                    return;
                };
                let Some(user) = user_id.clone() else {
                    return;
                };
                if state.identity.as_deref() == Some(user.as_str()) {
                    state.own_cells.insert((*sub_x, *sub_y), color.clone());
                }
                state
                    .pixels
                    .entry(user)
                    .or_default()
                    .insert((*sub_x, *sub_y), color);
            }
            InboundFrame::StateUpdate { user_id, pixels } => {
                let parsed = parse_cells(pixels);
                if state.identity.as_deref() == Some(user_id.as_str()) {
                    state.own_cells.clone_from(&parsed);
                }
                state.pixels.insert(user_id.clone(), parsed);
            }
            InboundFrame::UserPositionUpdate { user_id, x, y } => {
                state.positions.insert(user_id.clone(), (*x, *y));
                if state.identity.as_deref() == Some(user_id.as_str()) {
                    state.position = Some((*x, *y));
                }
            }
            InboundFrame::UserLeft { user_id } => {
                state.positions.remove(user_id);
                state.pixels.remove(user_id);
            }
            InboundFrame::Unknown => {}
        }
    }

    /// Remember cells this agent just wrote.
    pub fn record_own(&self, mutations: &[PixelMutation]) {
        if let Ok(mut state) = self.state.write() {
            for m in mutations {
                state.own_cells.insert((m.x, m.y), m.color.clone());
            }
        }
    }

    /// Distinct colours on the agent's own grid, most frequent first.
    pub fn known_colors(&self, limit: usize) -> Vec<String> {
        let Ok(state) = self.state.read() else {
            return Vec::new();
        };
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for color in state.own_cells.values() {
            *counts.entry(color.as_str()).or_default() += 1;
        }
        let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked
            .into_iter()
            .take(limit)
            .map(|(c, _)| c.to_string())
            .collect()
    }

    /// Up to five distinct colours drawn by each adjacent agent.
    pub fn neighbor_colors(&self) -> BTreeMap<Neighbor, Vec<String>> {
        let mut out = BTreeMap::new();
        let Ok(state) = self.state.read() else {
            return out;
        };
        let Some((x, y)) = state.position else {
            return out;
        };

        for side in Neighbor::ALL {
            let (dx, dy) = side.offset();
            let target = (x + dx, y + dy);
            let Some(user) = state
                .positions
                .iter()
                .find(|(_, pos)| **pos == target)
                .map(|(id, _)| id)
            else {
                continue;
            };
            let colors: BTreeSet<&String> = state
                .pixels
                .get(user)
                .map(|cells| cells.values().collect())
                .unwrap_or_default();
            if !colors.is_empty() {
                out.insert(
                    side,
                    colors
                        .into_iter()
                        .take(NEIGHBOR_COLOR_LIMIT)
                        .cloned()
                        .collect(),
                );
            }
        }
        out
    }

    /// The agent's own cells in `"x,y#RRGGBB"` form.
    pub fn palette_summary(&self, limit: usize) -> Vec<String> {
        self.state
            .read()
            .map(|s| {
                s.own_cells
                    .iter()
                    .take(limit)
                    .map(|((x, y), c)| format!("{x},{y}{c}"))
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn parse_cells(cells: &HashMap<String, String>) -> BTreeMap<(i32, i32), String> {
    cells
        .iter()
        .filter_map(|(key, color)| {
            let (x, y) = key.split_once(',')?;
            let x = x.trim().parse().ok()?;
            let y = y.trim().parse().ok()?;
            Some(((x, y), normalize_color(color)?))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn seeded_view() -> CanvasView {
        let view = CanvasView::new();
        let frame = InboundFrame::parse(
            &json!({
                "type": "initial_state",
                "my_user_id": "me",
                "grid_state": {"user_positions": {"me": [0, 0], "north": [0, -1], "far": [5, 5]}},
                "sub_cell_states": {
                    "me": {"1,1": "#111111", "2,2": "#111111", "3,3": "#222222"},
                    "north": {"0,0": "#AA0000", "0,1": "#00AA00"},
                    "far": {"0,0": "#FFFFFF"}
                }
            })
            .to_string(),
        )
        .unwrap();
        view.apply_inbound(&frame);
        view
    }

    #[test]
    fn initial_state_sets_identity_and_position() {
        let view = seeded_view();
        assert_eq!(view.identity().as_deref(), Some("me"));
        assert_eq!(view.position(), Some((0, 0)));
    }

    #[test]
    fn known_colors_rank_by_frequency() {
        let view = seeded_view();
        assert_eq!(view.known_colors(5), vec!["#111111", "#222222"]);
        assert_eq!(view.known_colors(1), vec!["#111111"]);
    }

    #[test]
    fn neighbor_colors_only_include_adjacent_agents() {
        let view = seeded_view();
        let neighbors = view.neighbor_colors();
        assert_eq!(neighbors.len(), 1);
        assert_eq!(
            neighbors[&Neighbor::North],
            vec!["#00AA00".to_string(), "#AA0000".to_string()]
        );
    }

    #[test]
    fn own_cell_updates_and_records_are_tracked() {
        let view = seeded_view();
        view.apply_inbound(&InboundFrame::CellUpdate {
            user_id: Some("me".into()),
            sub_x: 4,
            sub_y: 4,
            color: "#333333".into(),
        });
        view.record_own(&[PixelMutation::new(5, 5, "#444444")]);

        let summary = view.palette_summary(10);
        assert!(summary.contains(&"4,4#333333".to_string()));
        assert!(summary.contains(&"5,5#444444".to_string()));
    }

    #[test]
    fn position_updates_follow_own_identity() {
        let view = seeded_view();
        view.apply_inbound(&InboundFrame::UserPositionUpdate {
            user_id: "me".into(),
            x: 2,
            y: -3,
        });
        assert_eq!(view.position(), Some((2, -3)));

        view.apply_inbound(&InboundFrame::UserLeft {
            user_id: "north".into(),
        });
        assert!(view.neighbor_colors().is_empty());
    }
}
