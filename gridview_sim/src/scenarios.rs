//! Scripted playback scenarios.

use gridview_core::grid::GridLayout;

use crate::scripted::{frame, malformed_frame, Fault, ScriptedFrameSource};

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Scenario {
    /// One car crossing the grid while the lights cycle
    Crossing,

    /// Cars entering and leaving on every frame
    Churn,

    /// A run with zero frames
    EmptyRun,

    /// Transport failure in the middle of the sequence
    Dropout,

    /// Structurally broken frame in the middle of the sequence
    Malformed,
}

impl Scenario {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<Scenario> {
        vec![
            Scenario::Crossing,
            Scenario::Churn,
            Scenario::EmptyRun,
            Scenario::Dropout,
            Scenario::Malformed,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Scenario::Crossing => "crossing",
            Scenario::Churn => "churn",
            Scenario::EmptyRun => "empty-run",
            Scenario::Dropout => "dropout",
            Scenario::Malformed => "malformed",
        }
    }

    /// True when the scenario is scripted to abort playback.
    pub fn expects_failure(&self) -> bool {
        matches!(self, Scenario::Dropout | Scenario::Malformed)
    }

    /// Builds the scripted source for this scenario.
    pub fn build(&self) -> ScriptedFrameSource {
        match self {
            Scenario::Crossing => {
                let lights = |ns: i64, ew: i64| {
                    vec![(2.0, 1.0, ns, 2), (1.0, 2.0, ew, 3)]
                };
                ScriptedFrameSource::new(vec![
                    frame(&[("car-1", 0.0, 2.0, 3)], &lights(101, 100)),
                    frame(&[("car-1", 1.0, 2.0, 3)], &lights(101, 100)),
                    frame(&[("car-1", 2.0, 2.0, 3)], &lights(102, 100)),
                    frame(&[("car-1", 2.0, 1.0, 2)], &lights(100, 101)),
                    frame(&[("car-1", 2.0, 0.0, 2)], &lights(100, 101)),
                ])
                .with_grid(crossing_grid())
            }
            Scenario::Churn => ScriptedFrameSource::new(vec![
                frame(&[("a", 0.0, 0.0, 2)], &[]),
                frame(&[("a", 0.0, 1.0, 2), ("b", 1.0, 0.0, 3)], &[]),
                frame(&[("b", 2.0, 0.0, 3), ("c", 0.0, 0.0, 1)], &[]),
                frame(&[("c", 0.0, 1.0, 1)], &[]),
                frame(&[], &[]),
            ]),
            Scenario::EmptyRun => ScriptedFrameSource::new(vec![]),
            Scenario::Dropout => ScriptedFrameSource::new(vec![
                frame(&[("a", 0.0, 0.0, 2)], &[]),
                frame(&[("a", 0.0, 1.0, 2)], &[]),
                frame(&[("a", 0.0, 2.0, 2)], &[]),
            ])
            .with_fault(Fault::FailAt(2)),
            Scenario::Malformed => ScriptedFrameSource::new(vec![
                frame(&[("a", 0.0, 0.0, 2)], &[]),
                malformed_frame(),
                frame(&[("a", 0.0, 2.0, 2)], &[]),
            ]),
        }
    }
}

/// A 5x5 grid with one crossing: row 2 and column 2 are road.
fn crossing_grid() -> GridLayout {
    let cells = (0..5)
        .map(|row| {
            (0..5)
                .map(|col| if row == 2 || col == 2 { 1.0 } else { 0.0 })
                .collect()
        })
        .collect();
    GridLayout::from_matrix(cells).expect("static 5x5 matrix")
}
