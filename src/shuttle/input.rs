//! Keyboard mapping and JKL hold bookkeeping.

use super::transport::MAX_SPEED;

/// The closed set of keys the engine understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    /// J: reverse shuttle.
    Reverse,
    /// K: stop / jog modifier.
    Stop,
    /// L: forward shuttle.
    Forward,
    /// I: mark in.
    MarkIn,
    /// O: mark out.
    MarkOut,
    /// `.`: extract the marked range.
    Extract,
}

impl Key {
    /// Normalized single-character identifiers as delivered by the shell.
    pub fn from_ident(ident: &str) -> Option<Key> {
        match ident {
            "j" => Some(Key::Reverse),
            "k" => Some(Key::Stop),
            "l" => Some(Key::Forward),
            "i" => Some(Key::MarkIn),
            "o" => Some(Key::MarkOut),
            "." => Some(Key::Extract),
            _ => None,
        }
    }
}

/// Per-key hold flags plus the press bookkeeping tap/hold disambiguation
/// needs: the press timestamp and the playhead recorded at press time,
/// before any drift. Hold flags also filter keyboard auto-repeat.
#[derive(Clone, Copy, Debug, Default)]
pub struct HoldState {
    pub j: bool,
    pub k: bool,
    pub l: bool,
    pub j_pressed_ms: f64,
    pub l_pressed_ms: f64,
    pub j_press_playhead: f64,
    pub l_press_playhead: f64,
}

impl HoldState {
    pub fn clear(&mut self) {
        *self = HoldState::default();
    }
}

/// One rung up the forward shuttle ladder: a reverse speed collapses to a
/// stop, a standstill starts at 1x, anything else doubles up to the ceiling.
pub fn shuttle_forward(speed: f64) -> f64 {
    if speed < 0.0 {
        0.0
    } else if speed == 0.0 {
        1.0
    } else {
        (speed * 2.0).min(MAX_SPEED)
    }
}

/// Mirror of [`shuttle_forward`] for the J side.
pub fn shuttle_reverse(speed: f64) -> f64 {
    if speed > 0.0 {
        0.0
    } else if speed == 0.0 {
        -1.0
    } else {
        (speed * 2.0).max(-MAX_SPEED)
    }
}
