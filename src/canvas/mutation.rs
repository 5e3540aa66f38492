use serde::{Deserialize, Serialize};
use std::fmt;

/// Side length of an agent's sub-grid.
pub const GRID_SIZE: i32 = 20;
/// Highest valid sub-grid coordinate.
pub const GRID_MAX: i32 = GRID_SIZE - 1;

/// One cell write on the agent's own 20×20 sub-grid.
///
/// Coordinates are kept signed so a Brain-proposed mutation can be carried
/// as-is until [`PixelMutation::clamped`] brings it into `[0, GRID_MAX]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelMutation {
    pub x: i32,
    pub y: i32,
    pub color: String,
}

impl PixelMutation {
    pub fn new(x: i32, y: i32, color: impl Into<String>) -> Self {
        Self {
            x,
            y,
            color: color.into(),
        }
    }

    pub fn clamped(&self) -> Self {
        Self {
            x: self.x.clamp(0, GRID_MAX),
            y: self.y.clamp(0, GRID_MAX),
            color: self.color.clone(),
        }
    }

    pub fn is_in_bounds(&self) -> bool {
        (0..=GRID_MAX).contains(&self.x) && (0..=GRID_MAX).contains(&self.y)
    }

    /// Parse the Brain's `"x,y#RRGGBB"` notation. Colour is upper-cased.
    pub fn parse(raw: &str) -> Option<Self> {
        let (coords, hex) = raw.trim().split_once('#')?;
        let (x, y) = coords.split_once(',')?;
        let x = x.trim().parse::<i32>().ok()?;
        let y = y.trim().parse::<i32>().ok()?;
        let color = normalize_color(hex)?;
        Some(Self { x, y, color })
    }
}

impl fmt::Display for PixelMutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}{}", self.x, self.y, self.color)
    }
}

/// Accepts `RRGGBB` or `#RRGGBB`, returns `#RRGGBB` upper-case.
pub fn normalize_color(raw: &str) -> Option<String> {
    let hex = raw.trim().trim_start_matches('#');
    if hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()) {
        Some(format!("#{}", hex.to_ascii_uppercase()))
    } else {
        None
    }
}

/// Parse a list of Brain pixel strings, returning the mutations and the
/// number of entries that could not be parsed.
pub fn parse_pixels<S: AsRef<str>>(raw: &[S]) -> (Vec<PixelMutation>, usize) {
    let mut parsed = Vec::with_capacity(raw.len());
    let mut skipped = 0;
    for entry in raw {
        match PixelMutation::parse(entry.as_ref()) {
            Some(mutation) => parsed.push(mutation),
            None => skipped += 1,
        }
    }
    (parsed, skipped)
}
