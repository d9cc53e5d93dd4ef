//! Snap functionality for aligning dragged blocks to the grid and to siblings.

use crate::geometry::{Point, Position, Rect, Size};
use serde::{Deserialize, Serialize};

/// Distance threshold for sibling alignment (in canvas pixels).
pub const SNAP_THRESHOLD: f64 = 6.0;

/// Axis a guide line marks. An `X` guide is a vertical line at `x = position`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuideAxis {
    X,
    Y,
}

/// A visual alignment indicator fired by sibling snapping.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GuideLine {
    pub axis: GuideAxis,
    pub position: f64,
}

impl GuideLine {
    pub fn x(position: f64) -> Self {
        Self {
            axis: GuideAxis::X,
            position,
        }
    }

    pub fn y(position: f64) -> Self {
        Self {
            axis: GuideAxis::Y,
            position,
        }
    }
}

/// Result of a snap operation.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapOutcome {
    /// The corrected position.
    pub position: Position,
    /// Every alignment that fired, in evaluation order.
    pub guides: Vec<GuideLine>,
}

impl SnapOutcome {
    /// Create a result with no snapping.
    pub fn none(position: Position) -> Self {
        Self {
            position,
            guides: Vec::new(),
        }
    }
}

/// Snap a point to the nearest grid intersection.
///
/// A non-positive or non-finite grid size leaves the point unchanged.
pub fn snap_to_grid(point: Point, grid_size: f64) -> Point {
    if !(grid_size.is_finite() && grid_size > 0.0) {
        return point;
    }
    Point::new(
        (point.x / grid_size).round() * grid_size,
        (point.y / grid_size).round() * grid_size,
    )
}

/// Snap a candidate block position against the grid and its siblings.
///
/// The candidate is first rounded to the grid on each axis. Then, for every
/// sibling, the raw (un-rounded) candidate's left/right/center edges are
/// compared with the sibling's, followed by top/bottom/middle. Each match
/// within `threshold` overrides that axis with the exact aligned value and
/// adds a guide at the sibling's coordinate. Later matches override earlier
/// ones: the last matching sibling in iteration order wins, not the closest.
///
/// `siblings` must not include the block being moved.
pub fn snap_position(
    candidate: Position,
    size: Size,
    siblings: &[Rect],
    grid_size: f64,
    threshold: f64,
    disable_snap: bool,
) -> SnapOutcome {
    if disable_snap {
        return SnapOutcome::none(candidate);
    }

    let mut position = snap_to_grid(candidate, grid_size);
    let mut guides = Vec::new();

    let raw = Rect::from_origin_size(candidate, size);
    let raw_center = raw.center();
    let (half_w, half_h) = (size.width / 2.0, size.height / 2.0);

    for sibling in siblings {
        let center = sibling.center();

        // (candidate edge, sibling edge, offset from the candidate origin)
        let x_checks = [
            (raw.x0, sibling.x0, 0.0),
            (raw.x1, sibling.x1, size.width),
            (raw_center.x, center.x, half_w),
        ];
        for (edge, target, offset) in x_checks {
            if (edge - target).abs() < threshold {
                position.x = target - offset;
                guides.push(GuideLine::x(target));
            }
        }

        let y_checks = [
            (raw.y0, sibling.y0, 0.0),
            (raw.y1, sibling.y1, size.height),
            (raw_center.y, center.y, half_h),
        ];
        for (edge, target, offset) in y_checks {
            if (edge - target).abs() < threshold {
                position.y = target - offset;
                guides.push(GuideLine::y(target));
            }
        }
    }

    SnapOutcome { position, guides }
}
