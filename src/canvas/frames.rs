use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use super::mutation::PixelMutation;

/// Messages this agent writes to the Canvas Channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundFrame {
    CellUpdate {
        sub_x: i32,
        sub_y: i32,
        color: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        user_id: Option<String>,
    },
    Heartbeat,
}

impl OutboundFrame {
    /// Build a cell update. The mutation must already be clamped.
    pub fn cell_update(mutation: &PixelMutation, user_id: Option<String>) -> Self {
        Self::CellUpdate {
            sub_x: mutation.x,
            sub_y: mutation.y,
            color: mutation.color.clone(),
            user_id,
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| String::from("{}"))
    }
}

/// Messages the canvas server pushes to every participant.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundFrame {
    InitialState {
        my_user_id: String,
        /// Either an object or a JSON-encoded string holding one.
        #[serde(default)]
        grid_state: Option<Value>,
        #[serde(default)]
        sub_cell_states: HashMap<String, HashMap<String, String>>,
    },
    NewUser {
        user_id: String,
        #[serde(default)]
        position: Option<Value>,
    },
    CellUpdate {
        #[serde(default)]
        user_id: Option<String>,
        sub_x: i32,
        sub_y: i32,
        color: String,
    },
    StateUpdate {
        user_id: String,
        #[serde(default)]
        pixels: HashMap<String, String>,
    },
    UserPositionUpdate {
        user_id: String,
        x: i32,
        y: i32,
    },
    UserLeft {
        user_id: String,
    },
    #[serde(other)]
    Unknown,
}

impl InboundFrame {
    pub fn parse(raw: &str) -> Option<Self> {
        serde_json::from_str(raw).ok()
    }
}

/// `user_positions` out of an `initial_state` grid, tolerating the
/// string-encoded form and string coordinates.
pub fn user_positions(grid_state: Option<&Value>) -> HashMap<String, (i32, i32)> {
    let decoded;
    let grid = match grid_state {
        Some(Value::String(raw)) => {
            decoded = serde_json::from_str::<Value>(raw).unwrap_or(Value::Null);
            &decoded
        }
        Some(other) => other,
        None => return HashMap::new(),
    };

    grid.get("user_positions")
        .and_then(Value::as_object)
        .map(|positions| {
            positions
                .iter()
                .filter_map(|(id, pos)| parse_position(pos).map(|p| (id.clone(), p)))
                .collect()
        })
        .unwrap_or_default()
}

/// `[x, y]` with numeric or string members.
pub fn parse_position(value: &Value) -> Option<(i32, i32)> {
    let items = value.as_array()?;
    if items.len() != 2 {
        return None;
    }
    let coord = |v: &Value| -> Option<i32> {
        match v {
            Value::Number(n) => n.as_i64().and_then(|n| i32::try_from(n).ok()),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    };
    Some((coord(&items[0])?, coord(&items[1])?))
}
