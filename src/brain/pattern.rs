use rand::Rng;
use serde_json::json;
use std::future::Future;
use std::pin::Pin;

use super::{Action, AgentMode, Brain, ContextBundle};
use crate::canvas::{GRID_MAX, GRID_SIZE, PixelMutation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum Shape {
    Ring,
    Diagonal,
    Checkerboard,
    Spiral,
    Cross,
}

impl Shape {
    const ROTATION: [Self; 5] = [
        Self::Ring,
        Self::Diagonal,
        Self::Checkerboard,
        Self::Spiral,
        Self::Cross,
    ];

    fn for_iteration(iteration: u64) -> Self {
        let len = Self::ROTATION.len() as u64;
        #[allow(clippy::cast_possible_truncation)]
        let index = (iteration % len) as usize;
        Self::ROTATION[index]
    }

    /// Cells covered by the shape, all inside the grid.
    pub fn cells(self, iteration: u64) -> Vec<(i32, i32)> {
        let center = GRID_SIZE / 2;
        #[allow(clippy::cast_possible_truncation)]
        let grow = (iteration % 4) as i32;
        let cells: Vec<(i32, i32)> = match self {
            Self::Ring => {
                let r = 1 + grow;
                let mut cells = Vec::new();
                for dx in -r..=r {
                    for dy in -r..=r {
                        if dx.abs() == r || dy.abs() == r {
                            cells.push((center + dx, center + dy));
                        }
                    }
                }
                cells
            }
            Self::Diagonal => (0..GRID_SIZE).map(|i| (i, (i + grow) % GRID_SIZE)).collect(),
            Self::Checkerboard => {
                let lo = center - 3;
                let mut cells = Vec::new();
                for x in lo..lo + 6 {
                    for y in lo..lo + 6 {
                        if (x + y + grow) % 2 == 0 {
                            cells.push((x, y));
                        }
                    }
                }
                cells
            }
            Self::Spiral => spiral(center, 24 + grow * 4),
            Self::Cross => {
                let arm = 3 + grow;
                let mut cells = vec![(center, center)];
                for d in 1..=arm {
                    cells.extend([
                        (center + d, center),
                        (center - d, center),
                        (center, center + d),
                        (center, center - d),
                    ]);
                }
                cells
            }
        };
        cells
            .into_iter()
            .filter(|(x, y)| (0..=GRID_MAX).contains(x) && (0..=GRID_MAX).contains(y))
            .collect()
    }
}

fn spiral(center: i32, steps: i32) -> Vec<(i32, i32)> {
    let (mut x, mut y) = (center, center);
    let directions = [(1, 0), (0, 1), (-1, 0), (0, -1)];
    let mut cells = vec![(x, y)];
    let mut run = 1;
    let mut dir = 0;
    while i32::try_from(cells.len()).unwrap_or(i32::MAX) < steps {
        for _ in 0..2 {
            let (dx, dy) = directions[dir % 4];
            for _ in 0..run {
                x += dx;
                y += dy;
                cells.push((x, y));
            }
            dir += 1;
        }
        run += 1;
    }
    cells.truncate(usize::try_from(steps).unwrap_or(0));
    cells
}

/// Offline Brain that cycles through simple geometric shapes, painted with
/// colours this agent or its neighbours already use.
#[derive(Debug, Default)]
pub struct PatternBrain;

impl PatternBrain {
    pub fn new() -> Self {
        Self
    }

    fn colors(context: &ContextBundle) -> Vec<String> {
        let mut colors: Vec<String> = context.palette.clone();
        for neighbor in context.neighbor_colors.values() {
            for color in neighbor {
                if !colors.contains(color) {
                    colors.push(color.clone());
                }
            }
        }
        if colors.is_empty() {
            let mut rng = rand::rng();
            colors = (0..3)
                .map(|_| format!("#{:06X}", rng.random_range(0..=0x00FF_FFFF_u32)))
                .collect();
        }
        colors
    }

    pub fn draw(mode: AgentMode, context: &ContextBundle) -> Action {
        let shape = match mode {
            AgentMode::Seed => Shape::Ring,
            AgentMode::Action => Shape::for_iteration(context.iteration),
        };
        let colors = Self::colors(context);
        let mutations = shape
            .cells(context.iteration)
            .into_iter()
            .enumerate()
            .map(|(i, (x, y))| PixelMutation::new(x, y, colors[i % colors.len()].clone()))
            .collect::<Vec<_>>();

        Action {
            strategy_id: Some(shape.to_string()),
            strategy: Some(format!("{shape} in {} colour(s)", colors.len())),
            rationale: Some(format!("{mode} iteration {}", context.iteration)),
            predictions: json!({ "self": format!("{shape} stays visible") }),
            delta_complexity: None,
            mutations,
        }
    }
}

impl Brain for PatternBrain {
    fn name(&self) -> &str {
        "pattern"
    }

    fn decide<'a>(
        &'a self,
        mode: AgentMode,
        context: &'a ContextBundle,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Action>> + Send + 'a>> {
        Box::pin(async move { Ok(Self::draw(mode, context)) })
    }
}
