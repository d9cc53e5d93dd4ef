//! Bottom-right handle resize state machine.

use crate::geometry::{Point, Rect, Size};
use crate::input::PointerEvent;

/// Smallest width/height a resize gesture can produce.
pub const MIN_RESIZE: f64 = 24.0;

/// Hit radius (px) around the resize handle.
pub const HANDLE_TOLERANCE: f64 = 8.0;

/// Position of the resize handle for a block with these bounds.
pub fn resize_handle(bounds: Rect) -> Point {
    Point::new(bounds.x1, bounds.y1)
}

/// Whether `point` hits the resize handle of `bounds`.
pub fn hit_test_handle(bounds: Rect, point: Point, tolerance: f64) -> bool {
    let handle = resize_handle(bounds);
    let dx = point.x - handle.x;
    let dy = point.y - handle.y;
    dx * dx + dy * dy <= tolerance * tolerance
}

/// Side effects of a resize pointer-down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResizeStart {
    pub capture: bool,
    /// The press must not reach the block's drag controller.
    pub stop_propagation: bool,
}

#[derive(Debug, Clone, Copy)]
struct Gesture {
    pointer_id: u64,
    start: Point,
    start_size: Size,
    last: Option<Size>,
}

/// Resize gesture on a single block.
#[derive(Debug, Clone)]
pub struct ResizeController {
    min: f64,
    gesture: Option<Gesture>,
}

impl Default for ResizeController {
    fn default() -> Self {
        Self::new(MIN_RESIZE)
    }
}

impl ResizeController {
    pub fn new(min: f64) -> Self {
        Self { min, gesture: None }
    }

    pub fn is_active(&self) -> bool {
        self.gesture.is_some()
    }

    /// Capture the pointer and record the starting size.
    pub fn pointer_down(&mut self, event: &PointerEvent, size: Size) -> ResizeStart {
        if !event.button.is_primary() {
            return ResizeStart::default();
        }
        self.gesture = Some(Gesture {
            pointer_id: event.pointer_id,
            start: event.position,
            start_size: size,
            last: None,
        });
        ResizeStart {
            capture: true,
            stop_propagation: true,
        }
    }

    /// Preview size for the current pointer position. No snapping.
    pub fn pointer_move(&mut self, event: &PointerEvent) -> Option<Size> {
        let min = self.min;
        let gesture = self.gesture.as_mut()?;
        if gesture.pointer_id != event.pointer_id {
            return None;
        }
        let delta = event.position - gesture.start;
        let size = Size::new(
            (gesture.start_size.width + delta.x).max(min),
            (gesture.start_size.height + delta.y).max(min),
        );
        gesture.last = Some(size);
        Some(size)
    }

    /// Commit the last previewed size. A release without any move commits
    /// nothing.
    pub fn pointer_up(&mut self, event: &PointerEvent) -> Option<Size> {
        match self.gesture {
            Some(g) if g.pointer_id == event.pointer_id => {
                self.gesture = None;
                g.last
            }
            _ => None,
        }
    }

    pub fn pointer_cancel(&mut self) -> Option<Size> {
        self.gesture.take().and_then(|g| g.last)
    }
}
