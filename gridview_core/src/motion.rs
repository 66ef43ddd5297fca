//! Interpolated motion between snapshot poses.
//!
//! Cars do not teleport between simulation steps: each update starts a
//! [`MotionTween`] that carries the entity from its pose at transition start
//! to the target pose over one frame interval. Positions follow a straight
//! lerp; headings take the shortest angular arc (a car turning from 350 to
//! 10 degrees sweeps 20 degrees, not 340).

use nalgebra::Point2;

use crate::snapshot::Direction;

/// A renderable pose: scene position plus heading about the vertical axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Point2<f64>,
    pub yaw_deg: f64,
}

impl Pose {
    pub fn new(position: Point2<f64>, yaw_deg: f64) -> Self {
        Self { position, yaw_deg }
    }

    /// Pose at a grid position facing a direction.
    pub fn facing(position: Point2<f64>, heading: Direction) -> Self {
        Self { position, yaw_deg: heading.yaw_deg() }
    }
}

/// Interpolates headings along the shortest arc, result in `[0, 360)`.
pub fn lerp_yaw_deg(from: f64, to: f64, t: f64) -> f64 {
    // Signed smallest difference in (-180, 180].
    let delta = (to - from + 180.0).rem_euclid(360.0) - 180.0;
    (from + delta * t).rem_euclid(360.0)
}

/// One in-flight transition from a start pose to a target pose.
///
/// Progress is `t = clamp(elapsed / duration, 0, 1)`; the interpolated
/// position is monotone toward the target, and a tween holds at `t = 1`
/// until dropped.
#[derive(Debug, Clone)]
pub struct MotionTween {
    start: Pose,
    target: Pose,
    duration: f64,
    elapsed: f64,
}

impl MotionTween {
    /// A zero-duration tween lands immediately on its first advance.
    pub fn new(start: Pose, target: Pose, duration: f64) -> Self {
        Self { start, target, duration, elapsed: 0.0 }
    }

    /// Advances the clock and returns the pose at the new progress point.
    pub fn advance(&mut self, dt: f64) -> Pose {
        self.elapsed += dt;
        self.current()
    }

    /// Pose at the current progress point without advancing.
    pub fn current(&self) -> Pose {
        let t = self.progress();
        let position = Point2::new(
            self.start.position.x + (self.target.position.x - self.start.position.x) * t,
            self.start.position.y + (self.target.position.y - self.start.position.y) * t,
        );
        Pose { position, yaw_deg: lerp_yaw_deg(self.start.yaw_deg, self.target.yaw_deg, t) }
    }

    /// Progress in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        if self.duration <= 0.0 {
            return 1.0;
        }
        (self.elapsed / self.duration).clamp(0.0, 1.0)
    }

    pub fn is_complete(&self) -> bool {
        self.progress() >= 1.0
    }

    pub fn target(&self) -> Pose {
        self.target
    }
}
