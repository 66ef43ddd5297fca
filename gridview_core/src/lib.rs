//! gridview core - frame-reconciliation engine for traffic-grid playback.
//!
//! Pure engines only, no I/O:
//! - [`snapshot`]: wire decode of one simulation step
//! - [`registry`]: live-entity registry and the reconciliation diff
//! - [`motion`]: interpolated movement between snapshot poses
//! - [`sync`]: the tick-driven playback state machine
//! - [`grid`] / [`params`]: intersection matrix and run-parameter knobs

pub mod grid;
pub mod motion;
pub mod params;
pub mod registry;
pub mod render;
pub mod snapshot;
pub mod sync;

// Re-export key types for convenience
pub use grid::{GridError, GridLayout};
pub use motion::{MotionTween, Pose};
pub use params::{CarCap, LightChance, ParamsError, RunParameters, SpawnRate};
pub use registry::{reconcile, EntityKey, FrameDiff, SceneRegistry};
pub use render::{EntityKind, SceneRenderer};
pub use snapshot::{
    CarState, DecodeStats, Direction, RawFrame, SignalPhase, SignalState, Snapshot, SnapshotError,
};
pub use sync::{FeedEvent, PlaybackState, SceneSynchronizer, SessionId, SyncConfig, SyncError};
