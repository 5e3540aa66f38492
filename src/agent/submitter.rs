use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use super::state::AgentMode;
use crate::canvas::{CanvasView, GRID_SIZE, OutboundFrame, PixelMutation};
use crate::config::SubmitterConfig;
use crate::error::ChannelError;
use crate::transport::CanvasChannel;

/// Colours pulled from the local view for a fallback pattern.
const FALLBACK_COLOR_LIMIT: usize = 4;

/// What one submission achieved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SubmitReport {
    pub delivered: usize,
    pub dropped: usize,
    pub fallback_used: bool,
    /// Clamped cells that reached the channel, in send order.
    pub cells: Vec<PixelMutation>,
}

impl SubmitReport {
    /// Delivered cells in `"x,y#RRGGBB"` form.
    pub fn pixels(&self) -> Vec<String> {
        self.cells.iter().map(ToString::to_string).collect()
    }
}

/// Turns an action's mutations into `cell_update` frames on the canvas
/// channel.
pub struct ActionSubmitter {
    channel: Arc<dyn CanvasChannel>,
    view: Arc<CanvasView>,
    config: SubmitterConfig,
    consecutive_empty: AtomicU32,
}

impl ActionSubmitter {
    pub fn new(
        channel: Arc<dyn CanvasChannel>,
        view: Arc<CanvasView>,
        config: SubmitterConfig,
    ) -> Self {
        Self {
            channel,
            view,
            config,
            consecutive_empty: AtomicU32::new(0),
        }
    }

    pub fn consecutive_empty(&self) -> u32 {
        self.consecutive_empty.load(Ordering::Acquire)
    }

    /// Deliver `mutations`, substituting a fallback pattern when the seed
    /// produced nothing or the Brain has come back empty too many times in a
    /// row. Never fails: undelivered mutations are counted as dropped.
    pub async fn submit(&self, mode: AgentMode, mutations: Vec<PixelMutation>) -> SubmitReport {
        let (mutations, fallback_used) = if mutations.is_empty() {
            let empty = self.consecutive_empty.fetch_add(1, Ordering::AcqRel) + 1;
            if mode == AgentMode::Seed || empty >= self.config.empty_fallback_threshold {
                tracing::info!(
                    %mode,
                    consecutive_empty = empty,
                    "No mutations from brain; drawing fallback pattern"
                );
                self.consecutive_empty.store(0, Ordering::Release);
                (self.fallback_mutations(), true)
            } else {
                tracing::debug!(consecutive_empty = empty, "Empty action");
                return SubmitReport::default();
            }
        } else {
            self.consecutive_empty.store(0, Ordering::Release);
            (mutations, false)
        };

        let report = self.deliver(&mutations).await;
        SubmitReport {
            fallback_used,
            ..report
        }
    }

    async fn deliver(&self, mutations: &[PixelMutation]) -> SubmitReport {
        let user_id = self.view.identity();
        let mut delivered = Vec::with_capacity(mutations.len());
        let mut dropped = 0;

        for (batch_no, batch) in mutations.chunks(self.config.batch_size.max(1)).enumerate() {
            let before = delivered.len();
            for mutation in batch {
                let clamped = mutation.clamped();
                let frame = OutboundFrame::cell_update(&clamped, user_id.clone());
                match self.send_with_retry(&frame).await {
                    Ok(()) => delivered.push(clamped),
                    Err(e) => {
                        dropped += 1;
                        tracing::debug!(cell = %clamped, "Dropped mutation: {e}");
                    }
                }
            }
            tracing::debug!(
                batch = batch_no + 1,
                sent = delivered.len() - before,
                size = batch.len(),
                "Canvas batch sent"
            );
        }

        if dropped > 0 {
            tracing::warn!(
                delivered = delivered.len(),
                dropped,
                "Partial delivery to canvas channel"
            );
        }
        self.view.record_own(&delivered);

        SubmitReport {
            delivered: delivered.len(),
            dropped,
            fallback_used: false,
            cells: delivered,
        }
    }

    async fn send_with_retry(&self, frame: &OutboundFrame) -> Result<(), ChannelError> {
        let mut backoff_ms = self.config.retry_backoff_ms;
        let mut attempt = 0;
        loop {
            match self.channel.send_frame(frame).await {
                Ok(()) => return Ok(()),
                Err(ChannelError::Closed) => return Err(ChannelError::Closed),
                Err(e) if attempt >= self.config.max_send_retries => return Err(e),
                Err(_) => {
                    attempt += 1;
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms = backoff_ms.saturating_mul(2);
                }
            }
        }
    }

    /// A ring of eight cells around the grid centre.
    pub fn fallback_mutations(&self) -> Vec<PixelMutation> {
        let mut colors = self.view.known_colors(FALLBACK_COLOR_LIMIT);
        if colors.is_empty() {
            colors = self
                .view
                .neighbor_colors()
                .into_values()
                .flatten()
                .take(FALLBACK_COLOR_LIMIT)
                .collect();
        }
        if colors.is_empty() {
            colors.clone_from(&self.config.fallback_palette);
        }
        if colors.is_empty() {
            colors.push("#808080".into());
        }

        let center = GRID_SIZE / 2;
        let mut ring = Vec::with_capacity(8);
        for dy in -1..=1 {
            for dx in -1..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let color = colors[ring.len() % colors.len()].clone();
                ring.push(PixelMutation::new(center + dx, center + dy, color));
            }
        }
        ring
    }
}
