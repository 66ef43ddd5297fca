//! The scene synchronizer: a tick-driven playback state machine.
//!
//! One playback session walks `Idle -> Fetching -> Playing -> Idle`. The
//! machine is fed from outside on a single logical thread: the driver calls
//! [`SceneSynchronizer::tick`] every render tick and hands over fetch
//! results via [`SceneSynchronizer::deliver`]. Nothing here blocks or
//! spawns; ordering is whatever order the driver makes the calls in.
//!
//! ```text
//!          start()                 deliver(Frame)
//!  Idle ───────────► Fetching ───────────────────► Playing ──┐
//!   ▲                                              │ paused │
//!   │        stop() / failure / exhaustion         ◄─ gate ──┘
//!   └──────────────────────────────────────────────┘
//! ```
//!
//! Session identity: `start` allocates a fresh [`SessionId`] and every
//! delivery carries the id it was fetched under. A result tagged with a
//! dead session is dropped silently, so a fetch that outlives its session
//! can never touch the next session's registry.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::motion::MotionTween;
use crate::registry::{reconcile, EntityKey, SceneRegistry};
use crate::render::SceneRenderer;
use crate::snapshot::{Snapshot, SnapshotError};

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Playback configuration, fixed for the lifetime of a session.
#[derive(Debug, Clone, Copy)]
pub struct SyncConfig {
    /// Seconds between simulation steps (default 0.1 = 10 steps/second).
    /// Also the duration of every motion tween.
    pub frame_interval: f64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self { frame_interval: 0.1 }
    }
}

// ============================================================================
// SESSION IDENTITY
// ============================================================================

/// Identity of one playback session, used to tag in-flight fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    fn fresh() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

/// Where the machine currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Fetching,
    Playing,
}

/// One item handed to the machine by the driver.
#[derive(Debug)]
pub enum FeedEvent {
    /// The next snapshot in sequence.
    Frame(Snapshot),
    /// The sequence ended normally.
    Exhausted,
    /// A snapshot failed structural validation.
    Malformed(SnapshotError),
    /// The source failed before producing a snapshot.
    SourceFailed(String),
}

/// Session-fatal failure surfaced to the caller exactly once.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SyncError {
    #[error("frame source failed: {0}")]
    Source(String),

    #[error("malformed snapshot: {0}")]
    Malformed(#[from] SnapshotError),
}

// ============================================================================
// THE SYNCHRONIZER
// ============================================================================

/// Keeps the rendered scene consistent with the latest fully-applied
/// snapshot, animating transitions in between.
///
/// Generic over the renderer handle type; the renderer itself is passed
/// into each call so the machine owns no I/O.
#[derive(Debug)]
pub struct SceneSynchronizer<H> {
    config: SyncConfig,
    state: PlaybackState,
    session: Option<SessionId>,
    paused: bool,
    registry: SceneRegistry<H>,
    tweens: HashMap<EntityKey, MotionTween>,
    /// At most one fetched-but-unapplied snapshot.
    pending: Option<Snapshot>,
    /// Unpaused time since the last snapshot was applied.
    frame_elapsed: f64,
    frames_applied: u64,
}

impl<H> SceneSynchronizer<H> {
    pub fn new(config: SyncConfig) -> Self {
        Self {
            config,
            state: PlaybackState::Idle,
            session: None,
            paused: false,
            registry: SceneRegistry::new(),
            tweens: HashMap::new(),
            pending: None,
            frame_elapsed: 0.0,
            frames_applied: 0,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(SyncConfig::default())
    }

    // ========================================================================
    // SESSION CONTROL
    // ========================================================================

    /// Begins a new session: clears whatever the previous session left on
    /// screen, then waits for frames tagged with the returned id.
    ///
    /// Callable from any state; an in-flight fetch for the old session
    /// becomes stale and will be dropped on delivery.
    pub fn start<R>(&mut self, renderer: &mut R) -> SessionId
    where
        R: SceneRenderer<Handle = H>,
    {
        self.clear_scene(renderer);
        let session = SessionId::fresh();
        self.session = Some(session);
        self.state = PlaybackState::Fetching;
        self.paused = false;
        self.frames_applied = 0;
        // Let the first frame apply the moment it arrives.
        self.frame_elapsed = self.config.frame_interval;
        info!(%session, "playback session started");
        session
    }

    /// Forced return to `Idle` from any state. Destroys every live entity
    /// synchronously before returning.
    pub fn stop<R>(&mut self, renderer: &mut R)
    where
        R: SceneRenderer<Handle = H>,
    {
        if let Some(session) = self.session.take() {
            info!(%session, "playback session stopped");
        }
        self.clear_scene(renderer);
        self.state = PlaybackState::Idle;
        self.paused = false;
    }

    /// Gates [`tick`](Self::tick): while paused no timer elapses and no
    /// snapshot advances. Fetches already in flight still complete and
    /// queue.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Reopens the gate; playback continues from the exact point of
    /// suspension.
    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn session(&self) -> Option<SessionId> {
        self.session
    }

    pub fn frames_applied(&self) -> u64 {
        self.frames_applied
    }

    pub fn registry(&self) -> &SceneRegistry<H> {
        &self.registry
    }

    /// True when the driver should poll the feed for the next item.
    ///
    /// At most one snapshot is ever in flight: once delivered it parks in
    /// the pending slot until the machine is ready to apply it.
    pub fn wants_snapshot(&self) -> bool {
        match self.state {
            PlaybackState::Fetching => true,
            PlaybackState::Playing => !self.paused && self.pending.is_none(),
            PlaybackState::Idle => false,
        }
    }

    // ========================================================================
    // FEED INPUT
    // ========================================================================

    /// Hands the machine one feed item fetched under `tag`.
    ///
    /// Items tagged with a session other than the live one are dropped
    /// silently. Failures abort the session: the registry is cleared, the
    /// machine returns to `Idle`, and the error surfaces here exactly once.
    pub fn deliver<R>(
        &mut self,
        tag: SessionId,
        event: FeedEvent,
        renderer: &mut R,
    ) -> Result<(), SyncError>
    where
        R: SceneRenderer<Handle = H>,
    {
        if self.session != Some(tag) {
            debug!(%tag, "dropping stale feed result");
            return Ok(());
        }

        match event {
            FeedEvent::Frame(snapshot) => {
                if self.state == PlaybackState::Fetching {
                    self.state = PlaybackState::Playing;
                }
                debug_assert!(self.pending.is_none(), "more than one snapshot in flight");
                if self.paused || !self.ready_to_apply() {
                    self.pending = Some(snapshot);
                } else {
                    self.apply_snapshot(snapshot, renderer);
                }
                Ok(())
            }
            FeedEvent::Exhausted => {
                // The last scene stays on screen; only start/stop clear it.
                info!(session = %tag, frames = self.frames_applied, "frame sequence exhausted");
                self.session = None;
                self.state = PlaybackState::Idle;
                Ok(())
            }
            FeedEvent::Malformed(err) => {
                self.abort_session(renderer);
                Err(SyncError::Malformed(err))
            }
            FeedEvent::SourceFailed(msg) => {
                self.abort_session(renderer);
                Err(SyncError::Source(msg))
            }
        }
    }

    // ========================================================================
    // TICK
    // ========================================================================

    /// Advances playback by `dt` seconds of unpaused time.
    ///
    /// Moves every in-flight tween and, once all tweens have landed and a
    /// full frame interval has elapsed, applies the pending snapshot.
    pub fn tick<R>(&mut self, dt: f64, renderer: &mut R)
    where
        R: SceneRenderer<Handle = H>,
    {
        if self.paused {
            return;
        }
        self.frame_elapsed += dt;

        for (key, tween) in self.tweens.iter_mut() {
            let pose = tween.advance(dt);
            self.registry.move_entity(key, pose, |handle, p| renderer.update(handle, p));
        }
        self.tweens.retain(|_, tween| !tween.is_complete());

        if self.state == PlaybackState::Playing && self.ready_to_apply() {
            if let Some(snapshot) = self.pending.take() {
                self.apply_snapshot(snapshot, renderer);
            }
        }
    }

    // ========================================================================
    // INTERNALS
    // ========================================================================

    fn ready_to_apply(&self) -> bool {
        self.frame_elapsed >= self.config.frame_interval && self.tweens.is_empty()
    }

    /// Applies one snapshot: removals, then creates, then updates, so no
    /// registry key is ever claimed twice mid-transition.
    fn apply_snapshot<R>(&mut self, snapshot: Snapshot, renderer: &mut R)
    where
        R: SceneRenderer<Handle = H>,
    {
        let diff = reconcile(&self.registry, &snapshot);

        for key in &diff.removals {
            if let Some(handle) = self.registry.remove(key) {
                renderer.destroy(handle);
            }
            self.tweens.remove(key);
        }
        for op in diff.creates {
            let handle = renderer.create(op.kind, op.pose);
            self.registry.insert(op.key, handle, op.pose);
        }
        for op in diff.updates {
            // Tween from wherever the entity currently stands.
            let start = self.registry.pose(&op.key).unwrap_or(op.target);
            self.tweens.insert(
                op.key,
                MotionTween::new(start, op.target, self.config.frame_interval),
            );
        }

        self.frame_elapsed = 0.0;
        self.frames_applied += 1;
    }

    fn abort_session<R>(&mut self, renderer: &mut R)
    where
        R: SceneRenderer<Handle = H>,
    {
        self.clear_scene(renderer);
        self.session = None;
        self.state = PlaybackState::Idle;
        self.paused = false;
    }

    fn clear_scene<R>(&mut self, renderer: &mut R)
    where
        R: SceneRenderer<Handle = H>,
    {
        self.registry.clear_with(|handle| renderer.destroy(handle));
        self.tweens.clear();
        self.pending = None;
        self.frame_elapsed = 0.0;
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motion::Pose;
    use crate::render::EntityKind;
    use crate::snapshot::{CarState, Direction, RawFrame, RawSignal, SignalPhase, SignalState};
    use nalgebra::Point2;
    use std::collections::HashMap;

    /// Minimal renderer: handles are counters, live poses are recorded.
    #[derive(Default)]
    struct TestRenderer {
        next: u64,
        live: HashMap<u64, (EntityKind, Pose)>,
        created: usize,
        destroyed: usize,
    }

    impl SceneRenderer for TestRenderer {
        type Handle = u64;

        fn create(&mut self, kind: EntityKind, pose: Pose) -> u64 {
            self.next += 1;
            self.created += 1;
            self.live.insert(self.next, (kind, pose));
            self.next
        }

        fn update(&mut self, handle: &mut u64, pose: Pose) {
            if let Some(entry) = self.live.get_mut(handle) {
                entry.1 = pose;
            }
        }

        fn destroy(&mut self, handle: u64) {
            self.destroyed += 1;
            self.live.remove(&handle);
        }
    }

    fn car(id: &str, x: f64, y: f64, heading: Direction) -> CarState {
        CarState { id: id.to_string(), position: Point2::new(x, y), heading }
    }

    fn cars_frame(cars: Vec<CarState>) -> Snapshot {
        Snapshot { cars, signals: vec![] }
    }

    #[test]
    fn first_frame_applies_on_delivery() {
        let mut renderer = TestRenderer::default();
        let mut sync = SceneSynchronizer::with_defaults();

        let session = sync.start(&mut renderer);
        assert_eq!(sync.state(), PlaybackState::Fetching);
        assert!(sync.wants_snapshot());

        let frame = cars_frame(vec![car("a", 0.0, 0.0, Direction::North)]);
        sync.deliver(session, FeedEvent::Frame(frame), &mut renderer).unwrap();

        assert_eq!(sync.state(), PlaybackState::Playing);
        assert_eq!(renderer.live.len(), 1);
        assert_eq!(sync.frames_applied(), 1);
    }

    #[test]
    fn registry_tracks_latest_applied_snapshot() {
        let mut renderer = TestRenderer::default();
        let mut sync = SceneSynchronizer::with_defaults();
        let session = sync.start(&mut renderer);

        let first = cars_frame(vec![car("a", 0.0, 0.0, Direction::North)]);
        sync.deliver(session, FeedEvent::Frame(first), &mut renderer).unwrap();

        // Let the transition land, then deliver the second frame.
        sync.tick(0.1, &mut renderer);
        assert!(sync.wants_snapshot());
        let second = cars_frame(vec![
            car("a", 1.0, 0.0, Direction::East),
            car("b", 0.0, 0.0, Direction::North),
        ]);
        sync.deliver(session, FeedEvent::Frame(second), &mut renderer).unwrap();

        let mut ids: Vec<_> = sync.registry().car_ids().map(str::to_string).collect();
        ids.sort();
        assert_eq!(ids, vec!["a", "b"]);

        sync.tick(0.1, &mut renderer);
        let third = cars_frame(vec![]);
        sync.deliver(session, FeedEvent::Frame(third), &mut renderer).unwrap();
        assert!(sync.registry().is_empty());
        assert_eq!(renderer.live.len(), 0);
    }

    #[test]
    fn interpolation_walks_toward_target() {
        let mut renderer = TestRenderer::default();
        let mut sync = SceneSynchronizer::with_defaults();
        let session = sync.start(&mut renderer);

        sync.deliver(
            session,
            FeedEvent::Frame(cars_frame(vec![car("a", 0.0, 0.0, Direction::North)])),
            &mut renderer,
        )
        .unwrap();
        sync.tick(0.1, &mut renderer);
        sync.deliver(
            session,
            FeedEvent::Frame(cars_frame(vec![car("a", 2.0, 0.0, Direction::North)])),
            &mut renderer,
        )
        .unwrap();

        sync.tick(0.05, &mut renderer);
        let pose = sync.registry().pose(&EntityKey::Car("a".to_string())).unwrap();
        assert!((pose.position.x - 1.0).abs() < 1e-9);

        sync.tick(0.05, &mut renderer);
        let pose = sync.registry().pose(&EntityKey::Car("a".to_string())).unwrap();
        assert!((pose.position.x - 2.0).abs() < 1e-9);
    }

    #[test]
    fn next_frame_waits_for_the_frame_interval() {
        let mut renderer = TestRenderer::default();
        let mut sync = SceneSynchronizer::with_defaults();
        let session = sync.start(&mut renderer);

        sync.deliver(
            session,
            FeedEvent::Frame(cars_frame(vec![car("a", 0.0, 0.0, Direction::North)])),
            &mut renderer,
        )
        .unwrap();

        // Queued: the interval since the first apply has not elapsed.
        sync.deliver(
            session,
            FeedEvent::Frame(cars_frame(vec![car("a", 1.0, 0.0, Direction::North)])),
            &mut renderer,
        )
        .unwrap();
        assert_eq!(sync.frames_applied(), 1);
        assert!(!sync.wants_snapshot());

        sync.tick(0.1, &mut renderer);
        assert_eq!(sync.frames_applied(), 2);
    }

    #[test]
    fn pause_gates_time_and_queues_deliveries() {
        let mut renderer = TestRenderer::default();
        let mut sync = SceneSynchronizer::with_defaults();
        let session = sync.start(&mut renderer);

        sync.deliver(
            session,
            FeedEvent::Frame(cars_frame(vec![car("a", 0.0, 0.0, Direction::North)])),
            &mut renderer,
        )
        .unwrap();
        sync.pause();
        assert!(!sync.wants_snapshot());

        // A fetch that was already in flight completes during the pause.
        sync.deliver(
            session,
            FeedEvent::Frame(cars_frame(vec![car("a", 1.0, 0.0, Direction::North)])),
            &mut renderer,
        )
        .unwrap();

        for _ in 0..50 {
            sync.tick(0.1, &mut renderer);
        }
        assert_eq!(sync.frames_applied(), 1, "no frame advances while paused");

        sync.resume();
        sync.tick(0.1, &mut renderer);
        assert_eq!(sync.frames_applied(), 2);
    }

    #[test]
    fn pause_resume_is_a_pure_time_shift() {
        let frames = vec![
            cars_frame(vec![car("a", 0.0, 0.0, Direction::North)]),
            cars_frame(vec![car("a", 1.0, 0.0, Direction::East)]),
            cars_frame(vec![car("a", 1.0, 1.0, Direction::South), car("b", 0.0, 0.0, Direction::North)]),
        ];

        let run = |pause_at_tick: Option<usize>| {
            let mut renderer = TestRenderer::default();
            let mut sync = SceneSynchronizer::with_defaults();
            let session = sync.start(&mut renderer);
            let mut queue = frames.clone().into_iter();
            let mut ticks = 0usize;
            loop {
                if sync.wants_snapshot() {
                    match queue.next() {
                        Some(f) => {
                            sync.deliver(session, FeedEvent::Frame(f), &mut renderer).unwrap()
                        }
                        None => {
                            sync.deliver(session, FeedEvent::Exhausted, &mut renderer).unwrap()
                        }
                    }
                }
                if sync.state() == PlaybackState::Idle && sync.frames_applied() > 0 {
                    break;
                }
                if Some(ticks) == pause_at_tick {
                    sync.pause();
                    for _ in 0..7 {
                        sync.tick(0.025, &mut renderer);
                        ticks += 1;
                    }
                    sync.resume();
                }
                sync.tick(0.025, &mut renderer);
                ticks += 1;
                if ticks > 1000 {
                    panic!("playback did not finish");
                }
            }
            let mut poses: Vec<_> = renderer
                .live
                .values()
                .map(|(kind, pose)| (format!("{kind:?}"), format!("{pose:?}")))
                .collect();
            poses.sort();
            (sync.frames_applied(), poses)
        };

        assert_eq!(run(None), run(Some(5)));
    }

    #[test]
    fn stop_clears_everything_from_any_state() {
        let mut renderer = TestRenderer::default();
        let mut sync = SceneSynchronizer::with_defaults();

        // Stop while Fetching.
        sync.start(&mut renderer);
        sync.stop(&mut renderer);
        assert_eq!(sync.state(), PlaybackState::Idle);

        // Stop while Playing with live entities.
        let session = sync.start(&mut renderer);
        sync.deliver(
            session,
            FeedEvent::Frame(cars_frame(vec![
                car("a", 0.0, 0.0, Direction::North),
                car("b", 1.0, 0.0, Direction::East),
            ])),
            &mut renderer,
        )
        .unwrap();
        assert_eq!(renderer.live.len(), 2);

        sync.stop(&mut renderer);
        assert_eq!(sync.state(), PlaybackState::Idle);
        assert!(sync.registry().is_empty());
        assert_eq!(renderer.live.len(), 0);
        assert_eq!(sync.session(), None);
    }

    #[test]
    fn restart_invalidates_the_previous_session() {
        let mut renderer = TestRenderer::default();
        let mut sync = SceneSynchronizer::with_defaults();

        let old = sync.start(&mut renderer);
        let new = sync.start(&mut renderer);
        assert_ne!(old, new);

        // The old session's fetch lands late: dropped, no error, no frame.
        sync.deliver(
            old,
            FeedEvent::Frame(cars_frame(vec![car("ghost", 0.0, 0.0, Direction::North)])),
            &mut renderer,
        )
        .unwrap();
        assert_eq!(sync.frames_applied(), 0);
        assert!(sync.registry().is_empty());
        assert_eq!(sync.state(), PlaybackState::Fetching);
    }

    #[test]
    fn source_failure_aborts_and_surfaces_once() {
        let mut renderer = TestRenderer::default();
        let mut sync = SceneSynchronizer::with_defaults();
        let session = sync.start(&mut renderer);

        sync.deliver(
            session,
            FeedEvent::Frame(cars_frame(vec![car("a", 0.0, 0.0, Direction::North)])),
            &mut renderer,
        )
        .unwrap();

        let err = sync
            .deliver(session, FeedEvent::SourceFailed("connection refused".into()), &mut renderer)
            .unwrap_err();
        assert_eq!(err, SyncError::Source("connection refused".into()));
        assert_eq!(sync.state(), PlaybackState::Idle);
        assert!(sync.registry().is_empty());
        assert_eq!(renderer.live.len(), 0);
    }

    #[test]
    fn malformed_snapshot_aborts_without_partial_application() {
        let mut renderer = TestRenderer::default();
        let mut sync = SceneSynchronizer::with_defaults();
        let session = sync.start(&mut renderer);

        sync.deliver(
            session,
            FeedEvent::Frame(Snapshot {
                cars: vec![car("a", 0.0, 0.0, Direction::North)],
                signals: vec![SignalState {
                    position: Point2::new(3.0, 3.0),
                    heading: Direction::South,
                    phase: SignalPhase::Red,
                }],
            }),
            &mut renderer,
        )
        .unwrap();
        assert_eq!(renderer.live.len(), 2);

        // A signal record with no phase fails structural validation.
        let raw = RawFrame {
            cars: Some(vec![]),
            traffic_lights: Some(vec![RawSignal {
                position: Some(vec![1.0, 1.0]),
                state: None,
                direction: Some(1),
            }]),
        };
        let decode_err = Snapshot::decode(raw).unwrap_err();

        let err = sync
            .deliver(session, FeedEvent::Malformed(decode_err.clone()), &mut renderer)
            .unwrap_err();
        assert_eq!(err, SyncError::Malformed(decode_err));
        assert_eq!(sync.state(), PlaybackState::Idle);
        assert!(sync.registry().is_empty());
        assert_eq!(renderer.live.len(), 0);
    }

    #[test]
    fn exhaustion_goes_idle_but_leaves_the_scene_standing() {
        let mut renderer = TestRenderer::default();
        let mut sync = SceneSynchronizer::with_defaults();
        let session = sync.start(&mut renderer);

        sync.deliver(
            session,
            FeedEvent::Frame(cars_frame(vec![car("a", 0.0, 0.0, Direction::North)])),
            &mut renderer,
        )
        .unwrap();
        sync.tick(0.1, &mut renderer);
        sync.deliver(session, FeedEvent::Exhausted, &mut renderer).unwrap();

        assert_eq!(sync.state(), PlaybackState::Idle);
        assert_eq!(renderer.live.len(), 1, "last frame stays on screen");

        // The next start clears the leftovers.
        sync.start(&mut renderer);
        assert_eq!(renderer.live.len(), 0);
    }
}
