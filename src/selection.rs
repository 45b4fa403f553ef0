//! Destination point selection state

use serde::{Deserialize, Serialize};

use crate::error::WarpResult;
use crate::geometry::{Point2D, Quadrilateral, CORNER_NAMES};

/// Where the selection stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionState {
    /// No points yet
    Idle,
    /// 1 to 3 points collected
    Collecting(usize),
    /// All four corners collected
    Ready,
}

/// Result of offering a point to the selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddPoint {
    /// Stored; carries the state after the append
    Accepted(SelectionState),
    /// Already holding four points; nothing changed
    Rejected,
}

/// A collected corner with its label, for display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabeledPoint {
    pub id: usize,
    pub label: String,
    pub x: f64,
    pub y: f64,
}

/// Up to four destination points, collected in Top-Left, Top-Right,
/// Bottom-Right, Bottom-Left order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PointCollectionState {
    points: Vec<Point2D>,
}

impl PointCollectionState {
    pub const CAPACITY: usize = 4;

    pub fn new() -> Self {
        Self::default()
    }

    /// Restore a selection, keeping at most the first four points
    pub fn from_points(points: &[Point2D]) -> Self {
        if points.len() > Self::CAPACITY {
            tracing::warn!(
                "Ignoring {} extra selection points",
                points.len() - Self::CAPACITY
            );
        }
        Self {
            points: points.iter().copied().take(Self::CAPACITY).collect(),
        }
    }

    pub fn state(&self) -> SelectionState {
        match self.points.len() {
            0 => SelectionState::Idle,
            n if n < Self::CAPACITY => SelectionState::Collecting(n),
            _ => SelectionState::Ready,
        }
    }

    /// Append a point unless the selection is already full
    pub fn add_point(&mut self, point: Point2D) -> AddPoint {
        if self.is_ready() {
            return AddPoint::Rejected;
        }
        self.points.push(point);
        AddPoint::Accepted(self.state())
    }

    /// Discard all points and return to `Idle`
    pub fn reset(&mut self) {
        self.points.clear();
    }

    pub fn points(&self) -> &[Point2D] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn is_ready(&self) -> bool {
        self.points.len() >= Self::CAPACITY
    }

    /// Label of the corner the next point will fill
    pub fn next_corner(&self) -> Option<&'static str> {
        CORNER_NAMES.get(self.points.len()).copied()
    }

    /// The collected quad; fails unless exactly four points are held
    pub fn quadrilateral(&self) -> WarpResult<Quadrilateral> {
        Quadrilateral::from_slice(&self.points)
    }

    /// Instruction for whoever is picking points
    pub fn prompt(&self) -> String {
        match self.state() {
            SelectionState::Idle => format!(
                "Click 4 points on the image: {}.",
                CORNER_NAMES.join(", ")
            ),
            SelectionState::Collecting(n) => {
                format!("Point {} added. Click {}.", n, CORNER_NAMES[n])
            }
            SelectionState::Ready => "4 points selected. Load a design image or apply the mockup.".to_string(),
        }
    }

    /// Collected points with their corner labels
    pub fn labeled_points(&self) -> Vec<LabeledPoint> {
        self.points
            .iter()
            .zip(CORNER_NAMES)
            .enumerate()
            .map(|(id, (p, label))| LabeledPoint {
                id,
                label: label.to_string(),
                x: p.x,
                y: p.y,
            })
            .collect()
    }
}
