//! Snapshot model - one simulation step as delivered by the frame source.
//!
//! The simulation server reports each step as a JSON frame:
//!
//! ```text
//! {
//!   "cars":          [{"id": "7", "position": [3, 4], "direction": 2}, ...],
//!   "trafficLights": [{"position": [5, 5], "state": 101, "direction": 1}, ...]
//! }
//! ```
//!
//! Decoding happens in two layers:
//! 1. `RawFrame` mirrors the wire exactly, every field optional.
//! 2. [`Snapshot::decode`] promotes a raw frame to the domain model. A missing
//!    required field fails the whole snapshot ([`SnapshotError`]); a numeric
//!    code outside the closed [`Direction`]/[`SignalPhase`] enums skips that
//!    one record and is reported in [`DecodeStats`].
//!
//! Signals carry no server-assigned identity, so a synthetic key is derived
//! from their grid position for registry purposes.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

// ============================================================================
// CLOSED ENUMS
// ============================================================================

/// Travel heading of a car or facing of a signal.
///
/// Wire codes: 1=South, 2=North, 3=East, 4=West, 5=Intersection. The server
/// emits `-1` when a direction was never assigned; that is not part of the
/// closed set and the record carrying it is skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    South,
    East,
    West,
    Intersection,
}

impl Direction {
    /// Decodes a wire code, `None` for anything outside the closed set.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Direction::South),
            2 => Some(Direction::North),
            3 => Some(Direction::East),
            4 => Some(Direction::West),
            5 => Some(Direction::Intersection),
            _ => None,
        }
    }

    /// Heading angle in degrees about the vertical axis.
    ///
    /// Fixed lookup: North 0, East 90, South 180, West 270. `Intersection`
    /// has no travel direction and renders facing North.
    pub fn yaw_deg(self) -> f64 {
        match self {
            Direction::North => 0.0,
            Direction::East => 90.0,
            Direction::South => 180.0,
            Direction::West => 270.0,
            Direction::Intersection => 0.0,
        }
    }
}

/// Traffic-light phase. Wire codes: 100=Red, 101=Green, 102=Yellow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalPhase {
    Red,
    Green,
    Yellow,
}

impl SignalPhase {
    /// Decodes a wire code, `None` for anything outside the closed set.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            100 => Some(SignalPhase::Red),
            101 => Some(SignalPhase::Green),
            102 => Some(SignalPhase::Yellow),
            _ => None,
        }
    }
}

// ============================================================================
// WIRE FORMAT (Input)
// ============================================================================

/// One car record exactly as serialized by the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawCar {
    pub id: Option<String>,
    pub position: Option<Vec<f64>>,
    pub direction: Option<i64>,
}

/// One traffic-light record exactly as serialized by the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawSignal {
    pub position: Option<Vec<f64>>,
    /// Phase code (100/101/102).
    pub state: Option<i64>,
    pub direction: Option<i64>,
}

/// One frame exactly as serialized by the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawFrame {
    pub cars: Option<Vec<RawCar>>,
    #[serde(rename = "trafficLights")]
    pub traffic_lights: Option<Vec<RawSignal>>,
}

// ============================================================================
// DOMAIN MODEL
// ============================================================================

/// State of one car at one simulation step.
#[derive(Debug, Clone, PartialEq)]
pub struct CarState {
    /// Stable identity across snapshots. Absence in a later snapshot means
    /// the car has left the simulation.
    pub id: String,
    pub position: Point2<f64>,
    pub heading: Direction,
}

/// State of one traffic light at one simulation step.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalState {
    pub position: Point2<f64>,
    pub heading: Direction,
    pub phase: SignalPhase,
}

impl SignalState {
    /// Synthetic registry key derived from the grid position.
    ///
    /// Signals have no server-assigned identity; two snapshots referring to
    /// the same cell must produce the same key.
    pub fn registry_key(&self) -> String {
        format!("light_{}_{}", self.position.x as i64, self.position.y as i64)
    }
}

/// One fully-decoded simulation step. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Snapshot {
    pub cars: Vec<CarState>,
    pub signals: Vec<SignalState>,
}

/// Per-snapshot decode accounting: records dropped for out-of-enum codes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeStats {
    pub skipped_cars: usize,
    pub skipped_signals: usize,
}

impl DecodeStats {
    pub fn total_skipped(&self) -> usize {
        self.skipped_cars + self.skipped_signals
    }
}

impl Snapshot {
    /// Promotes a raw wire frame to the domain model.
    ///
    /// Structural problems (missing field, position not `[x, y]`) fail the
    /// whole snapshot so it is never partially applied. Codes outside the
    /// closed enums drop only the record that carries them.
    pub fn decode(raw: RawFrame) -> Result<(Snapshot, DecodeStats), SnapshotError> {
        let raw_cars = raw.cars.ok_or(SnapshotError::MissingField { field: "cars" })?;
        let raw_signals = raw
            .traffic_lights
            .ok_or(SnapshotError::MissingField { field: "trafficLights" })?;

        let mut stats = DecodeStats::default();
        let mut cars = Vec::with_capacity(raw_cars.len());
        for raw_car in raw_cars {
            let id = raw_car.id.ok_or(SnapshotError::MissingField { field: "id" })?;
            let position = decode_position(raw_car.position, "position")?;
            let code = raw_car
                .direction
                .ok_or(SnapshotError::MissingField { field: "direction" })?;
            match Direction::from_code(code) {
                Some(heading) => cars.push(CarState { id, position, heading }),
                None => {
                    warn!(car = %id, code, "unknown direction code, skipping car record");
                    stats.skipped_cars += 1;
                }
            }
        }

        let mut signals = Vec::with_capacity(raw_signals.len());
        for raw_signal in raw_signals {
            let position = decode_position(raw_signal.position, "position")?;
            let phase_code = raw_signal
                .state
                .ok_or(SnapshotError::MissingField { field: "state" })?;
            let dir_code = raw_signal
                .direction
                .ok_or(SnapshotError::MissingField { field: "direction" })?;
            match (SignalPhase::from_code(phase_code), Direction::from_code(dir_code)) {
                (Some(phase), Some(heading)) => {
                    signals.push(SignalState { position, heading, phase });
                }
                (None, _) => {
                    warn!(code = phase_code, "unknown signal phase code, skipping record");
                    stats.skipped_signals += 1;
                }
                (_, None) => {
                    warn!(code = dir_code, "unknown signal direction code, skipping record");
                    stats.skipped_signals += 1;
                }
            }
        }

        Ok((Snapshot { cars, signals }, stats))
    }

    /// Car ids present in this snapshot, in wire order.
    pub fn car_ids(&self) -> impl Iterator<Item = &str> {
        self.cars.iter().map(|c| c.id.as_str())
    }
}

fn decode_position(
    raw: Option<Vec<f64>>,
    field: &'static str,
) -> Result<Point2<f64>, SnapshotError> {
    let coords = raw.ok_or(SnapshotError::MissingField { field })?;
    if coords.len() != 2 {
        return Err(SnapshotError::BadPosition { len: coords.len() });
    }
    Ok(Point2::new(coords[0], coords[1]))
}

// ============================================================================
// ERRORS
// ============================================================================

/// Structural validation failure: the snapshot cannot be applied at all.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("snapshot missing required field `{field}`")]
    MissingField { field: &'static str },

    #[error("malformed position: expected [x, y], got {len} coordinates")]
    BadPosition { len: usize },
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_car(id: &str, x: f64, y: f64, direction: i64) -> RawCar {
        RawCar {
            id: Some(id.to_string()),
            position: Some(vec![x, y]),
            direction: Some(direction),
        }
    }

    fn raw_signal(x: f64, y: f64, state: i64, direction: i64) -> RawSignal {
        RawSignal {
            position: Some(vec![x, y]),
            state: Some(state),
            direction: Some(direction),
        }
    }

    #[test]
    fn decodes_wire_frame() {
        let json = r#"{
            "cars": [{"id": "12", "position": [3, 7], "direction": 3}],
            "trafficLights": [{"position": [5, 5], "state": 101, "direction": 1}]
        }"#;
        let raw: RawFrame = serde_json::from_str(json).unwrap();
        let (snapshot, stats) = Snapshot::decode(raw).unwrap();

        assert_eq!(snapshot.cars.len(), 1);
        assert_eq!(snapshot.cars[0].id, "12");
        assert_eq!(snapshot.cars[0].heading, Direction::East);
        assert_eq!(snapshot.signals.len(), 1);
        assert_eq!(snapshot.signals[0].phase, SignalPhase::Green);
        assert_eq!(stats.total_skipped(), 0);
    }

    #[test]
    fn direction_yaw_lookup() {
        assert_eq!(Direction::North.yaw_deg(), 0.0);
        assert_eq!(Direction::East.yaw_deg(), 90.0);
        assert_eq!(Direction::South.yaw_deg(), 180.0);
        assert_eq!(Direction::West.yaw_deg(), 270.0);
        assert_eq!(Direction::Intersection.yaw_deg(), 0.0);
    }

    #[test]
    fn unknown_direction_skips_only_that_car() {
        let raw = RawFrame {
            cars: Some(vec![raw_car("a", 0.0, 0.0, 2), raw_car("b", 1.0, 0.0, -1)]),
            traffic_lights: Some(vec![]),
        };
        let (snapshot, stats) = Snapshot::decode(raw).unwrap();

        assert_eq!(snapshot.cars.len(), 1);
        assert_eq!(snapshot.cars[0].id, "a");
        assert_eq!(stats.skipped_cars, 1);
    }

    #[test]
    fn unknown_phase_skips_only_that_signal() {
        let raw = RawFrame {
            cars: Some(vec![]),
            traffic_lights: Some(vec![raw_signal(2.0, 2.0, 101, 1), raw_signal(3.0, 3.0, 99, 1)]),
        };
        let (snapshot, stats) = Snapshot::decode(raw).unwrap();

        assert_eq!(snapshot.signals.len(), 1);
        assert_eq!(stats.skipped_signals, 1);
    }

    #[test]
    fn missing_phase_is_structural() {
        let raw = RawFrame {
            cars: Some(vec![]),
            traffic_lights: Some(vec![RawSignal {
                position: Some(vec![1.0, 1.0]),
                state: None,
                direction: Some(1),
            }]),
        };
        let err = Snapshot::decode(raw).unwrap_err();
        assert_eq!(err, SnapshotError::MissingField { field: "state" });
    }

    #[test]
    fn missing_car_list_is_structural() {
        let raw = RawFrame { cars: None, traffic_lights: Some(vec![]) };
        let err = Snapshot::decode(raw).unwrap_err();
        assert_eq!(err, SnapshotError::MissingField { field: "cars" });
    }

    #[test]
    fn short_position_is_structural() {
        let raw = RawFrame {
            cars: Some(vec![RawCar {
                id: Some("a".to_string()),
                position: Some(vec![1.0]),
                direction: Some(2),
            }]),
            traffic_lights: Some(vec![]),
        };
        let err = Snapshot::decode(raw).unwrap_err();
        assert_eq!(err, SnapshotError::BadPosition { len: 1 });
    }

    #[test]
    fn signal_keys_derive_from_position() {
        let raw = RawFrame {
            cars: Some(vec![]),
            traffic_lights: Some(vec![raw_signal(5.0, 9.0, 100, 4)]),
        };
        let (snapshot, _) = Snapshot::decode(raw).unwrap();
        assert_eq!(snapshot.signals[0].registry_key(), "light_5_9");
    }
}
