//! Scripted frame source for deterministic playback runs.
//!
//! Stands in for the simulation server: frames are raw wire values built
//! in advance, decoded through the same lazy path as the HTTP feed, with
//! optional fault injection to script transport failures.

use std::collections::VecDeque;

use async_trait::async_trait;

use gridview_core::grid::GridLayout;
use gridview_core::params::RunParameters;
use gridview_core::snapshot::{RawCar, RawFrame, RawSignal, Snapshot};
use gridview_env::{FrameFeed, FrameSource, SourceError};

/// Scripted failure modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// `fetch_frames` itself fails.
    FailFetch,
    /// The feed fails when the frame at this index is pulled.
    FailAt(usize),
}

/// In-memory [`FrameSource`] driven by a pre-built frame list.
pub struct ScriptedFrameSource {
    grid: GridLayout,
    frames: Vec<RawFrame>,
    fault: Option<Fault>,
}

impl ScriptedFrameSource {
    pub fn new(frames: Vec<RawFrame>) -> Self {
        let grid = GridLayout::from_matrix(vec![vec![1.0]]).expect("static 1x1 matrix");
        Self { grid, frames, fault: None }
    }

    pub fn with_grid(mut self, grid: GridLayout) -> Self {
        self.grid = grid;
        self
    }

    pub fn with_fault(mut self, fault: Fault) -> Self {
        self.fault = Some(fault);
        self
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }
}

#[async_trait]
impl FrameSource for ScriptedFrameSource {
    async fn fetch_grid(&self) -> Result<GridLayout, SourceError> {
        Ok(self.grid.clone())
    }

    async fn fetch_frames(&self) -> Result<Box<dyn FrameFeed>, SourceError> {
        if self.fault == Some(Fault::FailFetch) {
            return Err(SourceError::transport("scripted fetch failure"));
        }
        Ok(Box::new(ScriptedFeed {
            frames: self.frames.iter().cloned().collect(),
            index: 0,
            fail_at: match self.fault {
                Some(Fault::FailAt(i)) => Some(i),
                _ => None,
            },
        }))
    }

    async fn post_run_parameters(&self, params: &RunParameters) -> Result<(), SourceError> {
        params.validate()?;
        Ok(())
    }

    async fn fetch_total_steps(&self) -> Result<u32, SourceError> {
        Ok(self.frames.len() as u32)
    }
}

struct ScriptedFeed {
    frames: VecDeque<RawFrame>,
    index: usize,
    fail_at: Option<usize>,
}

#[async_trait]
impl FrameFeed for ScriptedFeed {
    async fn next(&mut self) -> Option<Result<Snapshot, SourceError>> {
        if self.fail_at == Some(self.index) {
            self.index += 1;
            return Some(Err(SourceError::transport("scripted feed failure")));
        }
        self.index += 1;
        let raw = self.frames.pop_front()?;
        Some(Snapshot::decode(raw).map(|(snapshot, _)| snapshot).map_err(SourceError::from))
    }
}

// ============================================================================
// FRAME BUILDERS
// ============================================================================

/// Builds a wire frame from `(id, x, y, direction)` cars and
/// `(x, y, state, direction)` lights.
pub fn frame(cars: &[(&str, f64, f64, i64)], lights: &[(f64, f64, i64, i64)]) -> RawFrame {
    RawFrame {
        cars: Some(
            cars.iter()
                .map(|(id, x, y, dir)| RawCar {
                    id: Some((*id).to_string()),
                    position: Some(vec![*x, *y]),
                    direction: Some(*dir),
                })
                .collect(),
        ),
        traffic_lights: Some(
            lights
                .iter()
                .map(|(x, y, state, dir)| RawSignal {
                    position: Some(vec![*x, *y]),
                    state: Some(*state),
                    direction: Some(*dir),
                })
                .collect(),
        ),
    }
}

/// A frame whose signal list is structurally broken (missing phase).
pub fn malformed_frame() -> RawFrame {
    RawFrame {
        cars: Some(vec![]),
        traffic_lights: Some(vec![RawSignal {
            position: Some(vec![0.0, 0.0]),
            state: None,
            direction: Some(1),
        }]),
    }
}
