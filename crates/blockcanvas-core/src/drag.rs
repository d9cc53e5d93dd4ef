//! Per-block drag state machine.
//!
//! The controller turns raw pointer samples into frame-coalesced previews and
//! one final commit. It never touches the document: the caller feeds it the
//! block's origin and a snap context, and applies the commit to the store.

use crate::geometry::{Point, Position, Rect, Size};
use crate::input::{PointerEvent, PointerKind};
use crate::snap::{GuideLine, SNAP_THRESHOLD, snap_position};
use std::time::{Duration, Instant};

/// Pointer travel (px) before a mouse/pen press turns into a drag.
pub const DRAG_THRESHOLD: f64 = 3.0;
/// Hold time before a touch press turns into a drag.
pub const TOUCH_LONG_PRESS: Duration = Duration::from_millis(300);
/// Touch travel (px) during the long-press window that cancels the gesture.
pub const TOUCH_CANCEL_THRESHOLD: f64 = 8.0;
/// Distance from the scroll container's edge that triggers autoscroll.
pub const AUTOSCROLL_EDGE: f64 = 40.0;
/// Scroll amount per pointer move while inside the autoscroll band.
pub const AUTOSCROLL_STEP: f64 = 12.0;

/// Tunables for a [`DragController`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragSettings {
    pub threshold: f64,
    pub long_press: Duration,
    pub touch_cancel_threshold: f64,
    pub autoscroll_edge: f64,
    pub autoscroll_step: f64,
}

impl Default for DragSettings {
    fn default() -> Self {
        Self {
            threshold: DRAG_THRESHOLD,
            long_press: TOUCH_LONG_PRESS,
            touch_cancel_threshold: TOUCH_CANCEL_THRESHOLD,
            autoscroll_edge: AUTOSCROLL_EDGE,
            autoscroll_step: AUTOSCROLL_STEP,
        }
    }
}

/// What the snap calculator needs to know about the rest of the document.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapContext {
    /// Bounds of every other block.
    pub siblings: Vec<Rect>,
    pub grid_size: f64,
    pub threshold: f64,
}

impl SnapContext {
    pub fn new(siblings: Vec<Rect>, grid_size: f64) -> Self {
        Self {
            siblings,
            grid_size,
            threshold: SNAP_THRESHOLD,
        }
    }
}

/// Vertical extent of the scroll container, in pointer coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollViewport {
    pub top: f64,
    pub bottom: f64,
}

/// Live position to render for the dragged block.
#[derive(Debug, Clone, PartialEq)]
pub struct DragPreview {
    pub position: Position,
    pub guides: Vec<GuideLine>,
}

/// Final value of a drag, to be written into the store.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragCommit {
    pub position: Position,
    pub disable_snap: bool,
}

/// Side effects the host should perform after feeding an event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DragResponse {
    /// Capture the pointer on the block element.
    pub capture: bool,
    /// Release a previously taken capture.
    pub release: bool,
    /// Scroll the container vertically by this many pixels.
    pub autoscroll: Option<f64>,
    pub commit: Option<DragCommit>,
}

impl DragResponse {
    fn released() -> Self {
        Self {
            release: true,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Gesture {
    pointer_id: u64,
    touch: bool,
    start: Point,
    origin: Position,
    size: Size,
    pressed_at: Instant,
    last: Point,
    shift: bool,
}

#[derive(Debug, Clone, Copy, Default)]
enum DragState {
    #[default]
    Idle,
    /// Pressed but not yet dragging.
    Pending(Gesture),
    Active(Gesture),
}

/// Drag state machine for one block.
#[derive(Debug, Clone, Default)]
pub struct DragController {
    settings: DragSettings,
    state: DragState,
    preview: Option<DragPreview>,
}

impl DragController {
    pub fn new(settings: DragSettings) -> Self {
        Self {
            settings,
            state: DragState::Idle,
            preview: None,
        }
    }

    /// Whether the pointer has crossed into an actual drag.
    pub fn is_active(&self) -> bool {
        matches!(self.state, DragState::Active(_))
    }

    /// Whether a press is being tracked at all.
    pub fn is_tracking(&self) -> bool {
        !matches!(self.state, DragState::Idle)
    }

    /// Start tracking a press on the block whose origin is `origin`.
    ///
    /// Touch presses capture immediately; mouse and pen wait for movement.
    /// A gesture still tracked from a lost release is dropped without a
    /// commit, and its capture is released.
    pub fn pointer_down(&mut self, event: &PointerEvent, origin: Position, size: Size) -> DragResponse {
        if !event.button.is_primary() {
            return DragResponse::default();
        }
        let stale_capture = self.abandon();
        let touch = event.kind == PointerKind::Touch;
        self.state = DragState::Pending(Gesture {
            pointer_id: event.pointer_id,
            touch,
            start: event.position,
            origin,
            size,
            pressed_at: event.timestamp,
            last: event.position,
            shift: event.modifiers.shift,
        });
        DragResponse {
            capture: touch,
            release: stale_capture,
            ..DragResponse::default()
        }
    }

    /// Drop the tracked gesture without committing. Returns true if it held
    /// the pointer capture.
    pub fn abandon(&mut self) -> bool {
        self.preview = None;
        match std::mem::take(&mut self.state) {
            DragState::Idle => false,
            DragState::Pending(g) => {
                log::debug!("Dropping pending press of pointer {}", g.pointer_id);
                g.touch
            }
            DragState::Active(g) => {
                log::debug!("Dropping active drag of pointer {}", g.pointer_id);
                true
            }
        }
    }

    pub fn pointer_move(
        &mut self,
        event: &PointerEvent,
        ctx: &SnapContext,
        viewport: Option<ScrollViewport>,
    ) -> DragResponse {
        let mut response = DragResponse::default();
        let gesture = match &mut self.state {
            DragState::Idle => return response,
            DragState::Pending(g) | DragState::Active(g) => {
                if g.pointer_id != event.pointer_id {
                    return response;
                }
                g.last = event.position;
                g.shift = event.modifiers.shift;
                *g
            }
        };

        if let DragState::Pending(_) = self.state {
            let travel = (event.position - gesture.start).hypot();
            if gesture.touch {
                let held = event.timestamp.saturating_duration_since(gesture.pressed_at);
                if held < self.settings.long_press {
                    if travel >= self.settings.touch_cancel_threshold {
                        log::debug!("Touch moved {travel:.1}px before long press; treating as scroll");
                        self.state = DragState::Idle;
                        return DragResponse::released();
                    }
                    return response;
                }
            } else {
                if travel < self.settings.threshold {
                    return response;
                }
                response.capture = true;
            }
            self.state = DragState::Active(gesture);
        }

        let outcome = snap_position(
            gesture.origin + (event.position - gesture.start),
            gesture.size,
            &ctx.siblings,
            ctx.grid_size,
            ctx.threshold,
            gesture.shift,
        );
        self.preview = Some(DragPreview {
            position: outcome.position,
            guides: outcome.guides,
        });
        response.autoscroll = viewport.and_then(|v| self.autoscroll(event.position.y, v));
        response
    }

    fn autoscroll(&self, y: f64, viewport: ScrollViewport) -> Option<f64> {
        if y - viewport.top < self.settings.autoscroll_edge {
            Some(-self.settings.autoscroll_step)
        } else if viewport.bottom - y < self.settings.autoscroll_edge {
            Some(self.settings.autoscroll_step)
        } else {
            None
        }
    }

    /// Advance timers. Activates a held touch once the long press elapses.
    /// Returns true if the drag became active.
    pub fn tick(&mut self, now: Instant) -> bool {
        match self.state {
            DragState::Pending(g)
                if g.touch && now.saturating_duration_since(g.pressed_at) >= self.settings.long_press =>
            {
                self.state = DragState::Active(g);
                true
            }
            _ => false,
        }
    }

    /// Take the latest preview; at most one per animation frame.
    pub fn on_animation_frame(&mut self) -> Option<DragPreview> {
        self.preview.take()
    }

    /// Finish the gesture. An active drag commits one final snapped position
    /// computed from the recorded origin; a press that never activated is a
    /// click and commits nothing.
    pub fn pointer_up(&mut self, event: &PointerEvent, ctx: &SnapContext) -> DragResponse {
        match self.state {
            DragState::Pending(g) | DragState::Active(g) if g.pointer_id != event.pointer_id => {
                DragResponse::default()
            }
            _ => self.finish(event.position, event.modifiers.shift, ctx),
        }
    }

    /// Pointer cancelled by the platform. Commits from the last known sample.
    pub fn pointer_cancel(&mut self, ctx: &SnapContext) -> DragResponse {
        match self.state {
            DragState::Pending(g) | DragState::Active(g) => self.finish(g.last, g.shift, ctx),
            DragState::Idle => DragResponse::default(),
        }
    }

    fn finish(&mut self, position: Point, shift: bool, ctx: &SnapContext) -> DragResponse {
        let state = std::mem::take(&mut self.state);
        self.preview = None;
        match state {
            DragState::Idle => DragResponse::default(),
            DragState::Pending(g) => DragResponse {
                release: g.touch,
                ..DragResponse::default()
            },
            DragState::Active(g) => {
                let outcome = snap_position(
                    g.origin + (position - g.start),
                    g.size,
                    &ctx.siblings,
                    ctx.grid_size,
                    ctx.threshold,
                    shift,
                );
                DragResponse {
                    release: true,
                    commit: Some(DragCommit {
                        position: outcome.position,
                        disable_snap: shift,
                    }),
                    ..DragResponse::default()
                }
            }
        }
    }
}
