//! Recording renderer: ground truth for playback assertions.
//!
//! Every instruction the synchronizer issues is appended to a log, and the
//! currently-live set is kept alongside, so tests can check both the final
//! scene and the exact order it was reached in.

use std::collections::BTreeMap;

use gridview_core::motion::Pose;
use gridview_core::render::{EntityKind, SceneRenderer};

/// One recorded renderer instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderOp {
    Created { id: u64, kind: EntityKind, pose: Pose },
    Moved { id: u64, pose: Pose },
    Destroyed { id: u64 },
}

/// Renderer whose handles are sequence numbers and whose scene is a map.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    next: u64,
    live: BTreeMap<u64, (EntityKind, Pose)>,
    ops: Vec<RenderOp>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Full instruction log, in issue order.
    pub fn ops(&self) -> &[RenderOp] {
        &self.ops
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Kinds of everything currently on screen, in handle order.
    pub fn live_kinds(&self) -> Vec<EntityKind> {
        self.live.values().map(|(kind, _)| *kind).collect()
    }

    /// Poses of everything currently on screen, in handle order.
    pub fn live_poses(&self) -> Vec<Pose> {
        self.live.values().map(|(_, pose)| *pose).collect()
    }

    pub fn created_count(&self) -> usize {
        self.ops.iter().filter(|op| matches!(op, RenderOp::Created { .. })).count()
    }

    pub fn destroyed_count(&self) -> usize {
        self.ops.iter().filter(|op| matches!(op, RenderOp::Destroyed { .. })).count()
    }
}

impl SceneRenderer for RecordingRenderer {
    type Handle = u64;

    fn create(&mut self, kind: EntityKind, pose: Pose) -> u64 {
        self.next += 1;
        self.live.insert(self.next, (kind, pose));
        self.ops.push(RenderOp::Created { id: self.next, kind, pose });
        self.next
    }

    fn update(&mut self, handle: &mut u64, pose: Pose) {
        if let Some(entry) = self.live.get_mut(handle) {
            entry.1 = pose;
        }
        self.ops.push(RenderOp::Moved { id: *handle, pose });
    }

    fn destroy(&mut self, handle: u64) {
        self.live.remove(&handle);
        self.ops.push(RenderOp::Destroyed { id: handle });
    }
}
