//! Grid layout decoded from the server's intersection matrix.
//!
//! `GET /intersection_matrix` returns a 2-D numeric matrix; nonzero cells
//! mark placeable road tiles. Cell `(row, col)` maps to scene position
//! `(x = col, y = row)` - the renderer owns any further axis convention.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The simulated intersection grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridLayout {
    cells: Vec<Vec<f64>>,
}

impl GridLayout {
    /// Validates a raw matrix: non-empty and rectangular.
    pub fn from_matrix(cells: Vec<Vec<f64>>) -> Result<Self, GridError> {
        let Some(first) = cells.first() else {
            return Err(GridError::Empty);
        };
        let expected = first.len();
        if expected == 0 {
            return Err(GridError::Empty);
        }
        for (row, line) in cells.iter().enumerate() {
            if line.len() != expected {
                return Err(GridError::Ragged { row, expected, got: line.len() });
            }
        }
        Ok(Self { cells })
    }

    pub fn rows(&self) -> usize {
        self.cells.len()
    }

    pub fn cols(&self) -> usize {
        self.cells[0].len()
    }

    /// True when the cell holds a road tile (nonzero marker).
    pub fn is_placeable(&self, row: usize, col: usize) -> bool {
        self.cells
            .get(row)
            .and_then(|line| line.get(col))
            .is_some_and(|v| *v != 0.0)
    }

    /// Scene positions of every placeable tile, row-major order.
    pub fn placeable_tiles(&self) -> impl Iterator<Item = Point2<f64>> + '_ {
        self.cells.iter().enumerate().flat_map(|(row, line)| {
            line.iter().enumerate().filter_map(move |(col, v)| {
                (*v != 0.0).then(|| Point2::new(col as f64, row as f64))
            })
        })
    }
}

/// Matrix validation failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GridError {
    #[error("intersection matrix is empty")]
    Empty,

    #[error("intersection matrix is ragged: row {row} has {got} columns, expected {expected}")]
    Ragged { row: usize, expected: usize, got: usize },
}
