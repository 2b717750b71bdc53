//! Cosmetic character mood, driven by engine events.
//!
//! Flagged events force a timed mood; once the timer runs out the mood decays
//! back to a speed-derived default. Purely presentational; nothing reads it
//! back into the simulation.

/// Speed at or above which the default mood is dizzy.
pub const DIZZY_SPEED: f64 = 8.0;

/// How long a bad-habit tap keeps the character worried.
pub const PENALTY_MOOD_MS: f64 = 1200.0;
/// How long a successful extraction keeps the character happy.
pub const EXTRACT_MOOD_MS: f64 = 1600.0;
/// How long a failed extraction keeps the character dizzy.
pub const LOST_MOOD_MS: f64 = 2400.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Mood {
    #[default]
    Idle,
    Focused,
    Dizzy,
    Happy,
    Worried,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct MoodState {
    current: Mood,
    timer_ms: f64,
}

impl MoodState {
    pub fn current(&self) -> Mood {
        self.current
    }

    /// Override the mood for `hold_ms` of simulated time.
    pub fn force(&mut self, mood: Mood, hold_ms: f64) {
        self.current = mood;
        self.timer_ms = hold_ms;
    }

    /// Run the forced-mood timer down; past it, follow the speed default.
    pub fn tick(&mut self, dt_ms: f64, speed: f64) {
        if self.timer_ms > 0.0 {
            self.timer_ms -= dt_ms;
            if self.timer_ms > 0.0 {
                return;
            }
            self.timer_ms = 0.0;
        }
        self.current = if speed.abs() >= DIZZY_SPEED {
            Mood::Dizzy
        } else if speed != 0.0 {
            Mood::Focused
        } else {
            Mood::Idle
        };
    }

    pub fn reset(&mut self) {
        *self = MoodState::default();
    }
}
