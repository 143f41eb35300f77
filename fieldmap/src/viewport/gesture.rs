//! Touch stream interpretation.
//!
//! Raw pointer events are turned into map actions:
//!
//! - the very first event only records where the pointer is
//! - a down within [`DOUBLE_TAP_WINDOW`] of the previous down is a double
//!   tap, which asks for a note at that spot
//! - a move of more than [`JITTER_THRESHOLD_PX`] on either axis is treated as
//!   a touchscreen glitch and skipped
//! - other moves pan, or extend the measurement while measuring
//! - up ends the drag

use std::time::{Duration, Instant};

/// Two downs closer together than this form a double tap.
pub const DOUBLE_TAP_WINDOW: Duration = Duration::from_millis(300);

/// Larger single-step moves are discarded as sensor jitter.
pub const JITTER_THRESHOLD_PX: f64 = 40.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchPhase {
    Down,
    Move,
    Up,
}

/// One pointer event in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchEvent {
    pub phase: TouchPhase,
    pub x: f64,
    pub y: f64,
    pub at: Instant,
}

impl TouchEvent {
    pub fn new(phase: TouchPhase, x: f64, y: f64, at: Instant) -> Self {
        Self { phase, x, y, at }
    }

    pub fn down(x: f64, y: f64) -> Self {
        Self::new(TouchPhase::Down, x, y, Instant::now())
    }

    pub fn moved(x: f64, y: f64) -> Self {
        Self::new(TouchPhase::Move, x, y, Instant::now())
    }

    pub fn up(x: f64, y: f64) -> Self {
        Self::new(TouchPhase::Up, x, y, Instant::now())
    }
}

/// What the map should do in response to an event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureAction {
    /// Nothing to do.
    Ignored,
    /// A drag began.
    Started,
    /// Shift the map by the finger's movement in pixels.
    Pan { dx: f64, dy: f64 },
    /// Extend the measurement to this screen position.
    MeasureTo { x: f64, y: f64 },
    /// Double tap: the user wants to take a note here.
    NoteRequested { x: f64, y: f64 },
    /// The drag ended.
    Released,
}

/// Per-view touch state.
#[derive(Debug, Default)]
pub struct GestureTracker {
    last_position: Option<(f64, f64)>,
    last_down: Option<Instant>,
    dragging: bool,
}

impl GestureTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a drag is in progress.
    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Interprets one event.
    ///
    /// # Arguments
    ///
    /// * `event` - The pointer event
    /// * `measuring` - Whether drags should measure instead of pan
    pub fn handle(&mut self, event: &TouchEvent, measuring: bool) -> GestureAction {
        let Some((last_x, last_y)) = self.last_position else {
            self.last_position = Some((event.x, event.y));
            return GestureAction::Ignored;
        };

        match event.phase {
            TouchPhase::Down => {
                self.last_position = Some((event.x, event.y));
                let double_tap = self
                    .last_down
                    .is_some_and(|previous| event.at.saturating_duration_since(previous) < DOUBLE_TAP_WINDOW);
                if double_tap {
                    self.last_down = None;
                    return GestureAction::NoteRequested {
                        x: event.x,
                        y: event.y,
                    };
                }
                self.last_down = Some(event.at);
                GestureAction::Started
            }
            TouchPhase::Move => {
                self.dragging = true;
                let dx = event.x - last_x;
                let dy = event.y - last_y;
                self.last_position = Some((event.x, event.y));

                if dx.abs() > JITTER_THRESHOLD_PX || dy.abs() > JITTER_THRESHOLD_PX {
                    return GestureAction::Ignored;
                }
                if measuring {
                    GestureAction::MeasureTo {
                        x: event.x,
                        y: event.y,
                    }
                } else {
                    GestureAction::Pan { dx, dy }
                }
            }
            TouchPhase::Up => {
                self.dragging = false;
                self.last_position = Some((event.x, event.y));
                GestureAction::Released
            }
        }
    }
}
