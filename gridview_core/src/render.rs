//! The renderer seam.
//!
//! The synchronizer never draws anything itself: it issues create, update,
//! and destroy instructions through [`SceneRenderer`] and keeps the returned
//! handles in its registry. Implementations must apply each instruction
//! synchronously before returning so no torn state is observable between
//! instructions of the same diff.

use crate::grid::GridLayout;
use crate::motion::Pose;
use crate::snapshot::SignalPhase;

/// What kind of visual an entity needs. The renderer picks the asset;
/// signals select theirs by phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Car,
    Signal(SignalPhase),
    Tile,
}

/// Materializes registry changes as visible objects.
///
/// `Handle` is opaque to the synchronizer: whatever the renderer needs to
/// find the object again. Camera framing is advisory and never affects
/// synchronizer correctness.
pub trait SceneRenderer {
    type Handle;

    /// Creates a visual at the given pose and returns its handle.
    fn create(&mut self, kind: EntityKind, pose: Pose) -> Self::Handle;

    /// Moves an existing visual to a new pose.
    fn update(&mut self, handle: &mut Self::Handle, pose: Pose);

    /// Removes a visual from the scene, consuming its handle.
    fn destroy(&mut self, handle: Self::Handle);

    /// Frames the camera around the grid. Default: do nothing.
    fn frame_camera(&mut self, _grid: &GridLayout) {}
}
