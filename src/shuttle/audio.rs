//! Scrub-feedback audio: per-tick directives, the voice capability seam and
//! the procedural meow sample for cat mode.
//!
//! The engine never touches platform audio handles. Each tick it derives an
//! [`AudioDirective`] from `(speed, segment under playhead, mode)` and the
//! shell applies it to whatever [`ScrubVoice`] it managed to create; tests
//! substitute a recording fake.

use super::tape::{Color, Lcg};

/// Gain target while the tape is moving; zero when parked.
pub const SCRUB_GAIN: f64 = 0.1;

/// Shared smoothing time-constant for every gain/frequency move, seconds.
/// One short constant everywhere keeps ramps click-free and uniform.
pub const SMOOTHING_TC: f64 = 0.04;

/// Milliseconds between grain launches while scrubbing in cat mode.
pub const GRAIN_INTERVAL_MS: f64 = 90.0;

/// Seconds of each grain sliced out of the meow sample.
pub const GRAIN_SECONDS: f64 = 0.12;

/// Length of the synthesized meow sample, seconds.
pub const MEOW_SECONDS: f64 = 1.0;

/// Playback-rate clamp for grain scrubbing.
pub const MIN_GRAIN_RATE: f64 = 0.1;
pub const MAX_GRAIN_RATE: f64 = 3.0;

/// Per-color oscillator base frequencies, a pentatonic-ish six-note row.
pub fn base_frequency(color: Color) -> f64 {
    match color {
        Color::Red => 261.63,    // C4
        Color::Orange => 293.66, // D4
        Color::Yellow => 329.63, // E4
        Color::Green => 392.00,  // G4
        Color::Blue => 440.00,   // A4
        Color::Purple => 523.25, // C5
    }
}

/// Scrub tone pitch: the color's base note bent with speed, at most half an
/// octave either way. Reverse play bends down.
pub fn scrub_frequency(color: Color, speed: f64) -> f64 {
    let bend = (speed * 0.05).clamp(-0.5, 0.5);
    base_frequency(color) * 2f64.powf(bend)
}

/// What the audio layer should do this tick. `Hold` leaves the graph alone
/// (a grain is still sounding and no parameter needs to move).
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AudioDirective {
    Tone { freq: f64, gain: f64 },
    Grain { offset: f64, rate: f64 },
    Hold,
    Silence,
}

impl AudioDirective {
    pub fn apply(&self, voice: &mut dyn ScrubVoice) {
        match *self {
            AudioDirective::Tone { freq, gain } => voice.set_tone(freq, gain),
            AudioDirective::Grain { offset, rate } => voice.play_grain(offset, rate),
            AudioDirective::Hold => {}
            AudioDirective::Silence => voice.silence(),
        }
    }
}

/// Platform audio capability. The web shell owns the real WebAudio graph;
/// the simulation stays verifiable without one.
pub trait ScrubVoice {
    /// Steer the continuous scrub tone (standard mode).
    fn set_tone(&mut self, freq: f64, gain: f64);
    /// Launch one grain from the meow sample at `offset` seconds, pitched by
    /// `rate` (cat mode).
    fn play_grain(&mut self, offset: f64, rate: f64);
    /// Ramp everything to quiet.
    fn silence(&mut self);
}

/// Synthesize the one-second meow sample: a sine gliding down an octave with
/// a soft second harmonic, an attack/sustain/release amplitude envelope and
/// light noise on top. Built once per engine lifetime.
pub fn synth_meow(sample_rate: u32) -> Vec<f32> {
    let rate = f64::from(sample_rate);
    let len = (rate * MEOW_SECONDS) as usize;
    let mut out = Vec::with_capacity(len);
    let mut noise = Lcg::new(0x9e37_79b9);
    let mut phase = 0.0f64;
    for i in 0..len {
        let t = i as f64 / rate;
        let freq = 740.0 - 370.0 * t;
        phase += std::f64::consts::TAU * freq / rate;
        let amp = if t < 0.08 {
            t / 0.08
        } else if t < 0.65 {
            1.0
        } else {
            ((MEOW_SECONDS - t) / 0.35).max(0.0)
        };
        let tone = phase.sin() + (phase * 2.0).sin() * 0.25;
        let n = noise.unit() * 2.0 - 1.0;
        out.push((((tone * 0.7) + n * 0.05) * amp).clamp(-1.0, 1.0) as f32);
    }
    out
}
