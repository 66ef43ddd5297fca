//! Production frame source: HTTP/JSON against the simulation server.
//!
//! Endpoints, matching the server:
//! - `POST /run_model` - submit run parameters, body is the wire payload
//!   from [`RunParameters::to_wire`]
//! - `GET /intersection_matrix` - 2-D numeric matrix, nonzero = tile
//! - `GET /frames` - the full snapshot sequence for the completed run
//! - `GET /total_steps` - `{"total_steps": n}`
//!
//! `/frames` arrives as one JSON list, but decoding to the domain model is
//! deferred: the feed validates each frame as it is pulled, so a malformed
//! frame aborts playback at the step where it sits, never earlier.

use std::collections::VecDeque;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use gridview_core::grid::GridLayout;
use gridview_core::params::RunParameters;
use gridview_core::snapshot::{RawFrame, Snapshot};

use crate::error::SourceError;
use crate::source::{FrameFeed, FrameSource};

/// Where the simulation server listens unless told otherwise.
pub const DEFAULT_BASE_URL: &str = "http://localhost:6000";

/// HTTP client for one simulation server.
pub struct HttpFrameSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpFrameSource {
    /// Builds a client against `base_url` (trailing slash tolerated).
    pub fn new(base_url: impl Into<String>) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder().build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

#[async_trait]
impl FrameSource for HttpFrameSource {
    async fn fetch_grid(&self) -> Result<GridLayout, SourceError> {
        let url = self.endpoint("intersection_matrix");
        debug!(%url, "fetching intersection matrix");
        let matrix: Vec<Vec<f64>> = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(GridLayout::from_matrix(matrix)?)
    }

    async fn fetch_frames(&self) -> Result<Box<dyn FrameFeed>, SourceError> {
        let url = self.endpoint("frames");
        debug!(%url, "fetching frame sequence");
        let frames: Vec<RawFrame> = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        debug!(count = frames.len(), "frame sequence received");
        Ok(Box::new(BufferedFeed::new(frames)))
    }

    async fn post_run_parameters(&self, params: &RunParameters) -> Result<(), SourceError> {
        let payload = params.to_wire()?;
        let url = self.endpoint("run_model");
        debug!(%url, "submitting run parameters");
        self.client
            .post(&url)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn fetch_total_steps(&self) -> Result<u32, SourceError> {
        #[derive(Deserialize)]
        struct TotalSteps {
            total_steps: u32,
        }

        let url = self.endpoint("total_steps");
        let body: TotalSteps = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(body.total_steps)
    }
}

/// Feed over an already-downloaded frame list, decoded one pull at a time.
pub struct BufferedFeed {
    frames: VecDeque<RawFrame>,
}

impl BufferedFeed {
    pub fn new(frames: impl IntoIterator<Item = RawFrame>) -> Self {
        Self { frames: frames.into_iter().collect() }
    }
}

#[async_trait]
impl FrameFeed for BufferedFeed {
    async fn next(&mut self) -> Option<Result<Snapshot, SourceError>> {
        let raw = self.frames.pop_front()?;
        let item = Snapshot::decode(raw)
            .map(|(snapshot, stats)| {
                if stats.total_skipped() > 0 {
                    warn!(
                        skipped_cars = stats.skipped_cars,
                        skipped_signals = stats.skipped_signals,
                        "snapshot carried unrecognized records"
                    );
                }
                snapshot
            })
            .map_err(SourceError::from);
        Some(item)
    }
}
