//! gridview playback harness.
//!
//! Deterministic substitutes for everything outside the synchronizer:
//! scripted frame sources with fault injection, a renderer that records
//! every instruction, and a clock that sleeps in zero wall time. The
//! scenario runner drives the real [`gridview_env::ScenePlayer`] through
//! these, so a whole playback session runs instantly and repeatably.

pub mod clock;
pub mod recorder;
pub mod runner;
pub mod scenarios;
pub mod scripted;

pub use clock::VirtualClock;
pub use recorder::{RecordingRenderer, RenderOp};
pub use runner::{place_grid, ScenarioResult, ScenarioRunner};
pub use scenarios::Scenario;
pub use scripted::{frame, malformed_frame, Fault, ScriptedFrameSource};
