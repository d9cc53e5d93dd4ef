//! Editor tunables.

use crate::drag::{
    AUTOSCROLL_EDGE, AUTOSCROLL_STEP, DRAG_THRESHOLD, DragSettings, TOUCH_CANCEL_THRESHOLD,
    TOUCH_LONG_PRESS,
};
use crate::history::DEFAULT_HISTORY_LIMIT;
use crate::keyboard::{KeyboardController, NUDGE_STEP, NUDGE_STEP_FINE};
use crate::resize::MIN_RESIZE;
use crate::snap::SNAP_THRESHOLD;
use crate::storage::{AutoSaveConfig, DEFAULT_DEBOUNCE, DEFAULT_REMOTE_TIMEOUT};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Editor configuration. Every field is optional in JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditorConfig {
    pub save_debounce_ms: u64,
    /// `0` waits on the remote tier indefinitely.
    pub remote_timeout_ms: u64,
    pub history_limit: usize,
    pub snap_threshold: f64,
    pub drag_threshold: f64,
    pub touch_long_press_ms: u64,
    pub touch_cancel_threshold: f64,
    pub autoscroll_edge: f64,
    pub autoscroll_step: f64,
    pub min_resize: f64,
    pub nudge_step: f64,
    pub nudge_step_fine: f64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            save_debounce_ms: DEFAULT_DEBOUNCE.as_millis() as u64,
            remote_timeout_ms: DEFAULT_REMOTE_TIMEOUT.as_millis() as u64,
            history_limit: DEFAULT_HISTORY_LIMIT,
            snap_threshold: SNAP_THRESHOLD,
            drag_threshold: DRAG_THRESHOLD,
            touch_long_press_ms: TOUCH_LONG_PRESS.as_millis() as u64,
            touch_cancel_threshold: TOUCH_CANCEL_THRESHOLD,
            autoscroll_edge: AUTOSCROLL_EDGE,
            autoscroll_step: AUTOSCROLL_STEP,
            min_resize: MIN_RESIZE,
            nudge_step: NUDGE_STEP,
            nudge_step_fine: NUDGE_STEP_FINE,
        }
    }
}

impl EditorConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn drag_settings(&self) -> DragSettings {
        DragSettings {
            threshold: self.drag_threshold,
            long_press: Duration::from_millis(self.touch_long_press_ms),
            touch_cancel_threshold: self.touch_cancel_threshold,
            autoscroll_edge: self.autoscroll_edge,
            autoscroll_step: self.autoscroll_step,
        }
    }

    pub fn keyboard(&self) -> KeyboardController {
        KeyboardController::new(self.nudge_step, self.nudge_step_fine)
    }

    /// Auto-save settings for `document_id`.
    pub fn autosave(&self, document_id: impl Into<String>) -> AutoSaveConfig {
        let timeout = (self.remote_timeout_ms > 0).then(|| Duration::from_millis(self.remote_timeout_ms));
        AutoSaveConfig::new(document_id)
            .with_debounce(Duration::from_millis(self.save_debounce_ms))
            .with_remote_timeout(timeout)
    }
}
