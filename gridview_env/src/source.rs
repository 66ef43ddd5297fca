//! Frame-source abstraction.
//!
//! A [`FrameSource`] is wherever snapshots come from: the production HTTP
//! client in [`crate::http`], or a scripted in-memory source in tests. The
//! snapshot sequence itself is pulled through a [`FrameFeed`], one item at
//! a time, so a source may hold the whole run in memory or stream it -
//! the synchronizer never sees the difference and never holds more than
//! one undelivered snapshot.

use async_trait::async_trait;

use gridview_core::grid::GridLayout;
use gridview_core::params::RunParameters;
use gridview_core::snapshot::Snapshot;

use crate::error::SourceError;

/// Pull-based snapshot sequence for one playback session.
///
/// # Contract
///
/// * `Some(Ok(snapshot))` - the next step, in order, exactly once.
/// * `Some(Err(_))` - the sequence is broken; the session aborts.
/// * `None` - the sequence ended normally. A feed over an unbounded run
///   may simply never return `None`.
#[async_trait]
pub trait FrameFeed: Send {
    async fn next(&mut self) -> Option<Result<Snapshot, SourceError>>;
}

/// The simulation server, as seen by the playback side.
#[async_trait]
pub trait FrameSource: Send + Sync {
    /// Retrieves the intersection layout for tile placement and camera
    /// framing.
    async fn fetch_grid(&self) -> Result<GridLayout, SourceError>;

    /// Opens the snapshot sequence for the most recent run.
    async fn fetch_frames(&self) -> Result<Box<dyn FrameFeed>, SourceError>;

    /// Validates and submits run parameters; the server runs the model
    /// before returning.
    async fn post_run_parameters(&self, params: &RunParameters) -> Result<(), SourceError>;

    /// Number of steps the completed run actually took.
    async fn fetch_total_steps(&self) -> Result<u32, SourceError>;
}
