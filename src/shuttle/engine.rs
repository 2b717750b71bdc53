//! The shuttle engine: one state aggregate advanced by key events and clock
//! ticks.
//!
//! Entry points return [`Note`] lists instead of calling back into the shell,
//! and audio comes out as a per-tick [`AudioDirective`], so the whole machine
//! runs native-side in tests with no canvas or audio context anywhere near it.
//! The caller must feed `tick` a monotonically increasing time source.

use super::audio::{
    AudioDirective, GRAIN_INTERVAL_MS, GRAIN_SECONDS, MAX_GRAIN_RATE, MEOW_SECONDS, MIN_GRAIN_RATE,
    SCRUB_GAIN, scrub_frequency,
};
use super::extract::{GameMode, Policy, Reject, validate};
use super::input::{HoldState, Key, shuttle_forward, shuttle_reverse};
use super::mood::{EXTRACT_MOOD_MS, LOST_MOOD_MS, Mood, MoodState, PENALTY_MOOD_MS};
use super::tape::{Color, FRAME_PIXELS, Tape};
use super::transport::{JOG_SPEED, Transport};

/// Drawing surface size; the playhead sits at the horizontal center.
pub const VIEW_WIDTH: f64 = 960.0;
pub const VIEW_HEIGHT: f64 = 540.0;

/// One accepted extraction, appended to the growing sequence.
#[derive(Clone, Copy, Debug)]
pub struct SequenceClip {
    pub id: u32,
    pub width: f64,
    pub color: Color,
}

/// Run lifecycle. Terminal phases stay put until the next `start`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Running,
    Won,
    Lost,
}

/// Events surfaced to the shell. Each qualifying event appears exactly once,
/// in the list returned by the entry point that caused it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Note {
    /// Mark-in landed (cosmetic feedback).
    MarkIn(f64),
    /// Mark-out landed (cosmetic feedback).
    MarkOut(f64),
    /// A clip of this width joined the sequence.
    Extracted(f64),
    /// Accumulated sequence width after a successful extraction.
    Score(f64),
    /// Penalty count after a bad-habit tap.
    Penalty(u32),
    /// Run won with this terminal score.
    Won(u32),
    /// Extraction failed; the run is over.
    Lost(Reject),
}

/// Terminal record of a finished run, for the score-submission form.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RunSummary {
    pub won: bool,
    pub final_score: u32,
    pub sequence_width: f64,
    pub penalties: u32,
    pub elapsed_ms: f64,
}

pub struct ShuttleEngine {
    policy: Policy,
    pub tape: Tape,
    pub clips: Vec<SequenceClip>,
    pub transport: Transport,
    pub mark_in: Option<f64>,
    pub mark_out: Option<f64>,
    pub holds: HoldState,
    pub target: Color,
    pub mode: GameMode,
    pub phase: Phase,
    pub penalties: u32,
    pub mood: MoodState,
    started_ms: f64,
    last_tick_ms: Option<f64>,
    last_grain_ms: f64,
    next_clip_id: u32,
    summary: Option<RunSummary>,
}

impl ShuttleEngine {
    /// A fresh engine in the idle phase. Created once and reused across runs.
    pub fn new(policy: Policy) -> Self {
        ShuttleEngine {
            policy,
            tape: Tape::default(),
            clips: Vec::new(),
            transport: Transport::new(VIEW_WIDTH / 2.0),
            mark_in: None,
            mark_out: None,
            holds: HoldState::default(),
            target: Color::Red,
            mode: GameMode::Standard,
            phase: Phase::Idle,
            penalties: 0,
            mood: MoodState::default(),
            started_ms: 0.0,
            last_tick_ms: None,
            last_grain_ms: f64::NEG_INFINITY,
            next_clip_id: 0,
            summary: None,
        }
    }

    /// Reset every run-scoped field and begin a run on a freshly generated
    /// tape. Safe to call repeatedly.
    pub fn start(&mut self, target: Color, mode: GameMode, seed: u32, now_ms: f64) {
        self.start_with_tape(Tape::generate(seed), target, mode, now_ms);
    }

    /// Begin a run on a prepared tape (scripted drills, tests).
    pub fn start_with_tape(&mut self, tape: Tape, target: Color, mode: GameMode, now_ms: f64) {
        self.tape = tape;
        self.clips.clear();
        self.transport = Transport::new(VIEW_WIDTH / 2.0);
        self.transport.set_playhead(0.0);
        self.mark_in = None;
        self.mark_out = None;
        self.holds.clear();
        self.target = target;
        self.mode = mode;
        self.phase = Phase::Running;
        self.penalties = 0;
        self.mood.reset();
        self.started_ms = now_ms;
        self.last_tick_ms = None;
        self.last_grain_ms = f64::NEG_INFINITY;
        self.next_clip_id = 0;
        self.summary = None;
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    pub fn playhead(&self) -> f64 {
        self.transport.playhead()
    }

    pub fn sequence_width(&self) -> f64 {
        self.clips.iter().map(|c| c.width).sum()
    }

    pub fn summary(&self) -> Option<&RunSummary> {
        self.summary.as_ref()
    }

    /// Key-down transition. Auto-repeat is filtered by the hold flags.
    pub fn key_down(&mut self, key: Key, now_ms: f64) -> Vec<Note> {
        let mut notes = Vec::new();
        if self.phase != Phase::Running {
            return notes;
        }
        match key {
            Key::Stop => {
                if !self.holds.k {
                    self.holds.k = true;
                    self.transport.stop();
                }
            }
            Key::Forward => {
                if !self.holds.l {
                    self.holds.l = true;
                    self.holds.l_pressed_ms = now_ms;
                    self.holds.l_press_playhead = self.playhead();
                    if self.holds.k {
                        self.transport.speed = JOG_SPEED;
                    } else {
                        let prev = self.transport.speed;
                        self.transport.speed = shuttle_forward(prev);
                        if prev < 0.0 {
                            // Collapsed through zero; land on the grid.
                            self.transport.snap_to_frame();
                        }
                    }
                }
            }
            Key::Reverse => {
                if !self.holds.j {
                    self.holds.j = true;
                    self.holds.j_pressed_ms = now_ms;
                    self.holds.j_press_playhead = self.playhead();
                    if self.holds.k {
                        self.transport.speed = -JOG_SPEED;
                    } else {
                        let prev = self.transport.speed;
                        self.transport.speed = shuttle_reverse(prev);
                        if prev > 0.0 {
                            self.transport.snap_to_frame();
                        }
                    }
                }
            }
            Key::MarkIn => {
                self.transport.snap_to_frame();
                let at = self.playhead();
                self.mark_in = Some(at);
                // An out mark at or before the new in mark is stale.
                if self.mark_out.is_some_and(|out| out <= at) {
                    self.mark_out = None;
                }
                notes.push(Note::MarkIn(at));
            }
            Key::MarkOut => {
                self.transport.snap_to_frame();
                let at = self.playhead();
                if self.mark_in.is_none_or(|m| at > m) {
                    self.mark_out = Some(at);
                    notes.push(Note::MarkOut(at));
                }
            }
            Key::Extract => {
                if let (Some(mark_in), Some(mark_out)) = (self.mark_in, self.mark_out) {
                    self.extract(mark_in, mark_out, now_ms, &mut notes);
                }
            }
        }
        notes
    }

    /// Key-up transition. Releasing J/L with K down stops and disambiguates
    /// tap vs hold; without K the latched shuttle speed is left alone.
    pub fn key_up(&mut self, key: Key, now_ms: f64) -> Vec<Note> {
        let mut notes = Vec::new();
        if self.phase != Phase::Running {
            // Still drop hold flags so a stale hold cannot leak into the next run.
            match key {
                Key::Stop => self.holds.k = false,
                Key::Forward => self.holds.l = false,
                Key::Reverse => self.holds.j = false,
                _ => {}
            }
            return notes;
        }
        match key {
            Key::Stop => self.holds.k = false,
            Key::Forward => {
                if self.holds.l {
                    self.holds.l = false;
                    if self.holds.k {
                        self.transport.speed = 0.0;
                        let (pressed, at) = (self.holds.l_pressed_ms, self.holds.l_press_playhead);
                        self.release_step(pressed, at, FRAME_PIXELS, now_ms, &mut notes);
                    }
                }
            }
            Key::Reverse => {
                if self.holds.j {
                    self.holds.j = false;
                    if self.holds.k {
                        self.transport.speed = 0.0;
                        let (pressed, at) = (self.holds.j_pressed_ms, self.holds.j_press_playhead);
                        self.release_step(pressed, at, -FRAME_PIXELS, now_ms, &mut notes);
                    }
                }
            }
            _ => {}
        }
        notes
    }

    /// K-held release: a tap becomes exactly one frame of travel measured
    /// from the press-time grid position, so drift accumulated between press
    /// and release never compounds. It also costs a penalty, because tapping
    /// while parked is the habit this game trains away. A hold just snaps
    /// the stop onto the frame grid.
    fn release_step(
        &mut self,
        pressed_ms: f64,
        press_playhead: f64,
        step: f64,
        now_ms: f64,
        notes: &mut Vec<Note>,
    ) {
        if now_ms - pressed_ms < self.policy.tap_threshold_ms {
            let frame = (press_playhead / FRAME_PIXELS).round() * FRAME_PIXELS;
            let end = self.tape.total_width();
            self.transport.set_playhead((frame + step).clamp(0.0, end));
            self.penalties += 1;
            self.mood.force(Mood::Worried, PENALTY_MOOD_MS);
            notes.push(Note::Penalty(self.penalties));
        } else {
            self.transport.snap_to_frame();
        }
    }

    fn extract(&mut self, mark_in: f64, mark_out: f64, now_ms: f64, notes: &mut Vec<Note>) {
        match validate(
            &self.tape,
            mark_in,
            mark_out,
            self.target,
            self.mode,
            &self.policy,
        ) {
            Ok(()) => {
                let width = mark_out - mark_in;
                self.clips.push(SequenceClip {
                    id: self.next_clip_id,
                    width,
                    color: self.target,
                });
                self.next_clip_id += 1;
                notes.push(Note::Extracted(width));
                let total = self.sequence_width();
                notes.push(Note::Score(total));
                self.mood.force(Mood::Happy, EXTRACT_MOOD_MS);
                if total >= self.policy.win_width {
                    let score = self.final_score(now_ms);
                    self.phase = Phase::Won;
                    self.summary = Some(RunSummary {
                        won: true,
                        final_score: score,
                        sequence_width: total,
                        penalties: self.penalties,
                        elapsed_ms: now_ms - self.started_ms,
                    });
                    notes.push(Note::Won(score));
                } else {
                    self.tape.ripple_delete(mark_in, mark_out);
                    // Park the playhead where the cut began.
                    self.transport
                        .set_playhead(mark_in.min(self.tape.total_width()));
                    self.mark_in = None;
                    self.mark_out = None;
                    self.transport.stop();
                }
            }
            Err(reason) => {
                self.phase = Phase::Lost;
                self.summary = Some(RunSummary {
                    won: false,
                    final_score: 0,
                    sequence_width: self.sequence_width(),
                    penalties: self.penalties,
                    elapsed_ms: now_ms - self.started_ms,
                });
                self.mood.force(Mood::Dizzy, LOST_MOOD_MS);
                notes.push(Note::Lost(reason));
            }
        }
    }

    /// `max(0, ⌊10000 − 10·seconds − 50·penalties⌋)`.
    fn final_score(&self, now_ms: f64) -> u32 {
        let elapsed_s = (now_ms - self.started_ms) / 1000.0;
        let raw = 10000.0 - 10.0 * elapsed_s - 50.0 * f64::from(self.penalties);
        raw.max(0.0).floor() as u32
    }

    /// Advance the simulation to `now_ms` and report what the audio layer
    /// should do. Transport moves before the directive is computed so the
    /// tone reflects the segment under the fresh playhead, not last frame's.
    pub fn tick(&mut self, now_ms: f64) -> AudioDirective {
        let dt = match self.last_tick_ms {
            Some(prev) => (now_ms - prev).max(0.0),
            None => 0.0,
        };
        self.last_tick_ms = Some(now_ms);
        if self.phase != Phase::Running {
            self.mood.tick(dt, 0.0);
            return AudioDirective::Silence;
        }
        self.transport.advance(dt, self.tape.total_width());
        self.mood.tick(dt, self.transport.speed);
        self.audio_directive(now_ms)
    }

    fn audio_directive(&mut self, now_ms: f64) -> AudioDirective {
        let speed = self.transport.speed;
        if speed == 0.0 {
            return AudioDirective::Silence;
        }
        let seg = match self.tape.segment_at(self.playhead()) {
            Some(seg) => *seg,
            None => return AudioDirective::Silence,
        };
        match self.mode {
            GameMode::Standard => AudioDirective::Tone {
                freq: scrub_frequency(seg.color, speed),
                gain: SCRUB_GAIN,
            },
            GameMode::Cat => {
                if seg.color != self.target {
                    return AudioDirective::Silence;
                }
                if now_ms - self.last_grain_ms < GRAIN_INTERVAL_MS {
                    return AudioDirective::Hold;
                }
                self.last_grain_ms = now_ms;
                let progress = ((self.playhead() - seg.x) / seg.width).clamp(0.0, 1.0);
                AudioDirective::Grain {
                    offset: progress * (MEOW_SECONDS - GRAIN_SECONDS),
                    rate: speed.abs().clamp(MIN_GRAIN_RATE, MAX_GRAIN_RATE),
                }
            }
        }
    }
}
