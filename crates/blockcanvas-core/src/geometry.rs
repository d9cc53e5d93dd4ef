//! Geometry value types for canvas-space coordinates.
//!
//! Positions and sizes are plain `kurbo` values: canvas pixels, top-left origin.

pub use kurbo::{Point, Rect, Size, Vec2};

/// Top-left corner of a block in canvas space.
pub type Position = Point;

/// Smallest width/height accepted by store-level mutations.
pub const MIN_BLOCK_DIMENSION: f64 = 10.0;

/// Bounding rectangle of a block placed at `position` with `size`.
pub fn block_bounds(position: Position, size: Size) -> Rect {
    Rect::from_origin_size(position, size)
}

/// Clamp both dimensions to at least `min`.
///
/// Non-finite dimensions collapse to `min` as well.
pub fn clamp_size(size: Size, min: f64) -> Size {
    Size::new(clamp_dimension(size.width, min), clamp_dimension(size.height, min))
}

/// Clamp a position into the non-negative quadrant.
pub fn clamp_position(position: Position) -> Position {
    Point::new(clamp_coordinate(position.x), clamp_coordinate(position.y))
}

fn clamp_dimension(value: f64, min: f64) -> f64 {
    if value.is_finite() { value.max(min) } else { min }
}

fn clamp_coordinate(value: f64) -> f64 {
    if value.is_finite() { value.max(0.0) } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_size() {
        assert_eq!(clamp_size(Size::new(4.0, 40.0), 10.0), Size::new(10.0, 40.0));
        assert_eq!(clamp_size(Size::new(-5.0, f64::NAN), 24.0), Size::new(24.0, 24.0));
    }

    #[test]
    fn test_clamp_position() {
        assert_eq!(clamp_position(Point::new(-12.0, 30.0)), Point::new(0.0, 30.0));
        assert_eq!(clamp_position(Point::new(f64::INFINITY, 5.0)), Point::new(0.0, 5.0));
    }

    #[test]
    fn test_block_bounds() {
        let rect = block_bounds(Point::new(10.0, 20.0), Size::new(100.0, 40.0));
        assert_eq!(rect.x1, 110.0);
        assert_eq!(rect.y1, 60.0);
        assert_eq!(rect.center(), Point::new(60.0, 40.0));
    }
}
