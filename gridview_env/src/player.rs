//! The playback driver: funnels ticks and feed results through one task.
//!
//! [`ScenePlayer`] owns the cooperative loop the synchronizer is designed
//! around: sleep one tick, advance interpolation, and poll the feed only
//! when the machine asks for the next snapshot. Everything - fetch
//! completions, pause/stop commands, ticks - is serialized here, so the
//! renderer is never touched from two places at once.

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::info;

use gridview_core::render::SceneRenderer;
use gridview_core::sync::{FeedEvent, PlaybackState, SceneSynchronizer, SyncConfig, SyncError};

use crate::clock::Clock;
use crate::error::SourceError;
use crate::source::FrameSource;

/// Control input for a running player, mirroring the pause/stop buttons
/// of an interactive front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerCommand {
    Pause,
    Resume,
    Stop,
}

/// Driver configuration.
#[derive(Debug, Clone, Copy)]
pub struct PlayerConfig {
    pub sync: SyncConfig,
    /// Render-loop tick rate in Hz (default 60).
    pub tick_rate_hz: u32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self { sync: SyncConfig::default(), tick_rate_hz: 60 }
    }
}

/// What a finished playback looked like.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackReport {
    pub frames_applied: u64,
    /// Entities still on screen when playback ended.
    pub live_entities: usize,
}

/// One-session playback driver.
pub struct ScenePlayer {
    config: PlayerConfig,
}

impl ScenePlayer {
    pub fn new(config: PlayerConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(PlayerConfig::default())
    }

    /// Plays one session to completion without external control.
    pub async fn run<S, R, C>(
        &self,
        source: &S,
        renderer: &mut R,
        clock: &C,
    ) -> Result<PlaybackReport, SyncError>
    where
        S: FrameSource + ?Sized,
        R: SceneRenderer,
        C: Clock + ?Sized,
    {
        self.run_controlled(source, renderer, clock, None).await
    }

    /// Plays one session, draining `commands` between ticks when given.
    pub async fn run_controlled<S, R, C>(
        &self,
        source: &S,
        renderer: &mut R,
        clock: &C,
        mut commands: Option<&mut mpsc::UnboundedReceiver<PlayerCommand>>,
    ) -> Result<PlaybackReport, SyncError>
    where
        S: FrameSource + ?Sized,
        R: SceneRenderer,
        C: Clock + ?Sized,
    {
        let mut sync = SceneSynchronizer::new(self.config.sync);
        let session = sync.start(renderer);

        let mut feed = match source.fetch_frames().await {
            Ok(feed) => feed,
            Err(err) => {
                sync.deliver(session, FeedEvent::SourceFailed(err.to_string()), renderer)?;
                return Ok(report(&sync));
            }
        };

        let dt = 1.0 / self.config.tick_rate_hz as f64;
        loop {
            if let Some(rx) = commands.as_mut() {
                while let Ok(command) = rx.try_recv() {
                    match command {
                        PlayerCommand::Pause => sync.pause(),
                        PlayerCommand::Resume => sync.resume(),
                        PlayerCommand::Stop => sync.stop(renderer),
                    }
                }
            }
            if sync.state() == PlaybackState::Idle {
                break;
            }

            if sync.wants_snapshot() {
                let event = match feed.next().await {
                    Some(Ok(snapshot)) => FeedEvent::Frame(snapshot),
                    Some(Err(SourceError::Malformed(err))) => FeedEvent::Malformed(err),
                    Some(Err(err)) => FeedEvent::SourceFailed(err.to_string()),
                    None => FeedEvent::Exhausted,
                };
                sync.deliver(session, event, renderer)?;
                if sync.state() == PlaybackState::Idle {
                    break;
                }
            }

            clock.sleep(Duration::from_secs_f64(dt)).await;
            sync.tick(dt, renderer);
        }

        let outcome = report(&sync);
        info!(
            frames = outcome.frames_applied,
            live = outcome.live_entities,
            "playback finished"
        );
        Ok(outcome)
    }
}

fn report<H>(sync: &SceneSynchronizer<H>) -> PlaybackReport {
    PlaybackReport {
        frames_applied: sync.frames_applied(),
        live_entities: sync.registry().len(),
    }
}
