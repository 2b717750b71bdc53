// Integration tests (native) for the `shuttle-cat` crate.
// These tests avoid wasm-specific functionality and exercise the pure
// simulation core (transport, input machine, extraction flow) so they can
// run under `cargo test` on the host.

use shuttle_cat::shuttle::audio::{AudioDirective, ScrubVoice};
use shuttle_cat::shuttle::engine::{Note, Phase, ShuttleEngine};
use shuttle_cat::shuttle::extract::{GameMode, Policy, Reject};
use shuttle_cat::shuttle::input::Key;
use shuttle_cat::shuttle::mood::Mood;
use shuttle_cat::shuttle::tape::{Color, FRAME_PIXELS, Segment, Tape};

fn seg(id: u32, x: f64, width: f64, color: Color) -> Segment {
    Segment {
        id,
        x,
        width,
        color,
    }
}

fn engine_on(segments: Vec<Segment>, target: Color, mode: GameMode) -> ShuttleEngine {
    let mut engine = ShuttleEngine::new(Policy::default());
    engine.start_with_tape(Tape::from_segments(segments), target, mode, 0.0);
    engine
}

fn mark_range(engine: &mut ShuttleEngine, mark_in: f64, mark_out: f64, now: f64) {
    engine.transport.set_playhead(mark_in);
    engine.key_down(Key::MarkIn, now);
    engine.transport.set_playhead(mark_out);
    engine.key_down(Key::MarkOut, now);
}

#[test]
fn snap_to_frame_is_idempotent() {
    let mut engine = engine_on(
        vec![seg(0, 0.0, 600.0, Color::Red)],
        Color::Red,
        GameMode::Standard,
    );
    engine.transport.set_playhead(13.7);
    engine.transport.snap_to_frame();
    let once = engine.transport.conveyor_offset;
    assert_eq!(engine.playhead(), 12.0);
    engine.transport.snap_to_frame();
    assert_eq!(engine.transport.conveyor_offset, once);
}

#[test]
fn forward_ladder_doubles_and_clamps() {
    let mut engine = engine_on(
        vec![seg(0, 0.0, 60000.0, Color::Red)],
        Color::Red,
        GameMode::Standard,
    );
    let mut t = 0.0;
    for want in [1.0, 2.0, 4.0, 8.0, 16.0, 32.0, 32.0] {
        engine.key_down(Key::Forward, t);
        assert_eq!(engine.transport.speed, want);
        // Releasing without K leaves the latched shuttle speed alone.
        engine.key_up(Key::Forward, t + 300.0);
        assert_eq!(engine.transport.speed, want);
        t += 1000.0;
    }
}

#[test]
fn opposite_direction_press_collapses_to_stop_first() {
    let mut engine = engine_on(
        vec![seg(0, 0.0, 60000.0, Color::Red)],
        Color::Red,
        GameMode::Standard,
    );
    engine.key_down(Key::Forward, 0.0);
    engine.key_up(Key::Forward, 300.0);
    engine.key_down(Key::Forward, 400.0);
    engine.key_up(Key::Forward, 700.0);
    assert_eq!(engine.transport.speed, 2.0);

    engine.key_down(Key::Reverse, 1000.0);
    assert_eq!(engine.transport.speed, 0.0);
    engine.key_up(Key::Reverse, 1400.0);
    engine.key_down(Key::Reverse, 1500.0);
    assert_eq!(engine.transport.speed, -1.0);
    engine.key_up(Key::Reverse, 1900.0);
    engine.key_down(Key::Reverse, 2000.0);
    assert_eq!(engine.transport.speed, -2.0);
}

#[test]
fn k_with_l_or_j_jogs_in_slow_motion() {
    let mut engine = engine_on(
        vec![seg(0, 0.0, 60000.0, Color::Red)],
        Color::Red,
        GameMode::Standard,
    );
    engine.key_down(Key::Stop, 0.0);
    engine.key_down(Key::Forward, 0.0);
    assert_eq!(engine.transport.speed, 0.2);
    // J while K is held swaps the jog direction.
    engine.key_down(Key::Reverse, 100.0);
    assert_eq!(engine.transport.speed, -0.2);
}

#[test]
fn quick_tap_steps_exactly_one_frame_despite_drift() {
    let mut engine = engine_on(
        vec![seg(0, 0.0, 60000.0, Color::Red)],
        Color::Red,
        GameMode::Standard,
    );
    engine.key_down(Key::Stop, 1000.0);
    engine.key_down(Key::Forward, 1000.0);
    // Let the jog drift the playhead off the grid before the release.
    engine.tick(1000.0);
    engine.tick(1100.0);
    assert!(engine.playhead() > 0.0);
    let notes = engine.key_up(Key::Forward, 1150.0);
    assert_eq!(engine.playhead(), FRAME_PIXELS);
    assert_eq!(engine.transport.speed, 0.0);
    assert_eq!(engine.penalties, 1);
    assert_eq!(notes, vec![Note::Penalty(1)]);
    assert_eq!(engine.mood.current(), Mood::Worried);
}

#[test]
fn reverse_tap_steps_one_frame_back() {
    let mut engine = engine_on(
        vec![seg(0, 0.0, 60000.0, Color::Red)],
        Color::Red,
        GameMode::Standard,
    );
    engine.transport.set_playhead(60.0);
    engine.key_down(Key::Stop, 0.0);
    engine.key_down(Key::Reverse, 10.0);
    let notes = engine.key_up(Key::Reverse, 100.0);
    assert_eq!(engine.playhead(), 54.0);
    assert_eq!(notes, vec![Note::Penalty(1)]);
}

#[test]
fn long_hold_release_snaps_without_penalty() {
    let mut engine = engine_on(
        vec![seg(0, 0.0, 60000.0, Color::Red)],
        Color::Red,
        GameMode::Standard,
    );
    engine.key_down(Key::Stop, 0.0);
    engine.key_down(Key::Forward, 0.0);
    engine.tick(0.0);
    engine.tick(500.0);
    let notes = engine.key_up(Key::Forward, 500.0);
    assert!(notes.is_empty());
    assert_eq!(engine.penalties, 0);
    assert_eq!(engine.transport.speed, 0.0);
    // Parked on the grid.
    assert_eq!(engine.playhead() % FRAME_PIXELS, 0.0);
}

#[test]
fn motion_is_framerate_independent() {
    let tape = vec![seg(0, 0.0, 60000.0, Color::Red)];
    let mut coarse = engine_on(tape.clone(), Color::Red, GameMode::Standard);
    let mut fine = engine_on(tape, Color::Red, GameMode::Standard);
    coarse.key_down(Key::Forward, 0.0);
    fine.key_down(Key::Forward, 0.0);

    coarse.tick(0.0);
    coarse.tick(500.0);

    fine.tick(0.0);
    for i in 1..=50 {
        fine.tick(f64::from(i) * 10.0);
    }
    assert!((coarse.playhead() - fine.playhead()).abs() < 1e-9);
}

#[test]
fn playhead_stays_inside_the_tape() {
    let mut engine = engine_on(
        vec![seg(0, 0.0, 300.0, Color::Red)],
        Color::Red,
        GameMode::Standard,
    );
    engine.key_down(Key::Forward, 0.0);
    engine.tick(0.0);
    engine.tick(60_000.0);
    assert_eq!(engine.playhead(), 300.0);

    engine.key_down(Key::Reverse, 61_000.0); // collapses to a stop
    engine.key_up(Key::Reverse, 61_500.0);
    engine.key_down(Key::Reverse, 62_000.0);
    engine.tick(62_000.0);
    engine.tick(120_000.0);
    assert_eq!(engine.playhead(), 0.0);
}

#[test]
fn mark_out_before_mark_in_is_refused() {
    let mut engine = engine_on(
        vec![seg(0, 0.0, 600.0, Color::Red)],
        Color::Red,
        GameMode::Standard,
    );
    engine.transport.set_playhead(60.0);
    let notes = engine.key_down(Key::MarkIn, 0.0);
    assert_eq!(notes, vec![Note::MarkIn(60.0)]);
    engine.transport.set_playhead(30.0);
    let notes = engine.key_down(Key::MarkOut, 0.0);
    assert!(notes.is_empty());
    assert_eq!(engine.mark_out, None);
}

#[test]
fn new_mark_in_drops_stale_mark_out() {
    let mut engine = engine_on(
        vec![seg(0, 0.0, 600.0, Color::Red)],
        Color::Red,
        GameMode::Standard,
    );
    // An out mark may land first.
    engine.transport.set_playhead(120.0);
    engine.key_down(Key::MarkOut, 0.0);
    assert_eq!(engine.mark_out, Some(120.0));
    engine.transport.set_playhead(180.0);
    engine.key_down(Key::MarkIn, 0.0);
    assert_eq!(engine.mark_in, Some(180.0));
    assert_eq!(engine.mark_out, None);
}

#[test]
fn extract_without_both_marks_is_a_no_op() {
    let mut engine = engine_on(
        vec![seg(0, 0.0, 600.0, Color::Red)],
        Color::Red,
        GameMode::Standard,
    );
    engine.key_down(Key::MarkIn, 0.0);
    let notes = engine.key_down(Key::Extract, 0.0);
    assert!(notes.is_empty());
    assert_eq!(engine.phase, Phase::Running);
}

#[test]
fn clean_extraction_appends_clip_and_resets_marks() {
    let mut engine = engine_on(
        vec![seg(0, 0.0, 300.0, Color::Red)],
        Color::Red,
        GameMode::Standard,
    );
    mark_range(&mut engine, 0.0, 300.0, 10.0);
    let notes = engine.key_down(Key::Extract, 20.0);
    assert_eq!(notes, vec![Note::Extracted(300.0), Note::Score(300.0)]);
    assert_eq!(engine.clips.len(), 1);
    assert_eq!(engine.clips[0].width, 300.0);
    assert_eq!(engine.sequence_width(), 300.0);
    assert_eq!(engine.tape.total_width(), 0.0);
    assert_eq!(engine.mark_in, None);
    assert_eq!(engine.mark_out, None);
    assert_eq!(engine.transport.speed, 0.0);
    assert_eq!(engine.mood.current(), Mood::Happy);
    assert_eq!(engine.phase, Phase::Running);
}

#[test]
fn extraction_reanchors_playhead_to_former_mark_in() {
    let mut engine = engine_on(
        vec![
            seg(0, 0.0, 120.0, Color::Blue),
            seg(1, 120.0, 300.0, Color::Red),
            seg(2, 420.0, 120.0, Color::Green),
        ],
        Color::Red,
        GameMode::Standard,
    );
    mark_range(&mut engine, 120.0, 420.0, 10.0);
    engine.key_down(Key::Extract, 20.0);
    assert_eq!(engine.playhead(), 120.0);
    // Green closed the gap.
    let colors: Vec<_> = engine.tape.segments().iter().map(|s| s.color).collect();
    assert_eq!(colors, vec![Color::Blue, Color::Green]);
    assert_eq!(engine.tape.total_width(), 240.0);
}

#[test]
fn failed_extraction_ends_the_run_without_touching_the_tape() {
    let mut engine = engine_on(
        vec![
            seg(0, 0.0, 120.0, Color::Red),
            seg(1, 120.0, 180.0, Color::Blue),
        ],
        Color::Red,
        GameMode::Standard,
    );
    mark_range(&mut engine, 0.0, 300.0, 10.0);
    let notes = engine.key_down(Key::Extract, 20.0);
    assert_eq!(notes, vec![Note::Lost(Reject::OffTarget)]);
    assert_eq!(engine.phase, Phase::Lost);
    assert_eq!(engine.tape.segments().len(), 2);
    assert_eq!(engine.mood.current(), Mood::Dizzy);
    let summary = engine.summary().expect("terminal summary");
    assert!(!summary.won);

    // Terminal: input and motion are dead until the next start.
    assert!(engine.key_down(Key::Forward, 30.0).is_empty());
    assert_eq!(engine.tick(40.0), AudioDirective::Silence);
}

#[test]
fn win_triggers_on_the_extraction_that_reaches_the_threshold() {
    let mut engine = ShuttleEngine::new(Policy {
        win_width: 600.0,
        ..Policy::default()
    });
    engine.start_with_tape(
        Tape::from_segments(vec![
            seg(0, 0.0, 300.0, Color::Red),
            seg(1, 300.0, 60.0, Color::Blue),
            seg(2, 360.0, 300.0, Color::Red),
        ]),
        Color::Red,
        GameMode::Standard,
        0.0,
    );
    mark_range(&mut engine, 0.0, 300.0, 100.0);
    let notes = engine.key_down(Key::Extract, 200.0);
    assert!(!notes.iter().any(|n| matches!(n, Note::Won(_))));
    assert_eq!(engine.phase, Phase::Running);

    // After the ripple the second red block starts at 60.
    mark_range(&mut engine, 60.0, 360.0, 300.0);
    let notes = engine.key_down(Key::Extract, 400.0);
    assert!(notes.contains(&Note::Score(600.0)));
    assert!(notes.iter().any(|n| matches!(n, Note::Won(_))));
    assert_eq!(engine.phase, Phase::Won);
    let summary = engine.summary().expect("terminal summary");
    assert!(summary.won);
    assert_eq!(summary.sequence_width, 600.0);
}

#[test]
fn final_score_charges_time_and_penalties() {
    let mut engine = ShuttleEngine::new(Policy {
        win_width: 300.0,
        ..Policy::default()
    });
    engine.start_with_tape(
        Tape::from_segments(vec![seg(0, 0.0, 300.0, Color::Red)]),
        Color::Red,
        GameMode::Standard,
        0.0,
    );
    // Two bad-habit taps.
    engine.key_down(Key::Stop, 0.0);
    engine.key_down(Key::Forward, 100.0);
    engine.key_up(Key::Forward, 150.0);
    engine.key_down(Key::Forward, 200.0);
    engine.key_up(Key::Forward, 250.0);
    engine.key_up(Key::Stop, 300.0);
    assert_eq!(engine.penalties, 2);

    mark_range(&mut engine, 0.0, 300.0, 500.0);
    let notes = engine.key_down(Key::Extract, 10_000.0);
    // 10000 - 10 * 10s - 50 * 2
    assert!(notes.contains(&Note::Won(9800)));
}

#[test]
fn start_resets_run_scoped_state() {
    let mut engine = ShuttleEngine::new(Policy::default());
    engine.start_with_tape(
        Tape::from_segments(vec![seg(0, 0.0, 600.0, Color::Red)]),
        Color::Red,
        GameMode::Standard,
        0.0,
    );
    engine.key_down(Key::Stop, 0.0);
    engine.key_down(Key::Forward, 0.0);
    engine.key_up(Key::Forward, 50.0);
    mark_range(&mut engine, 60.0, 120.0, 100.0);
    assert_eq!(engine.penalties, 1);

    engine.start(Color::Blue, GameMode::Cat, 42, 1000.0);
    assert_eq!(engine.penalties, 0);
    assert!(engine.clips.is_empty());
    assert_eq!(engine.mark_in, None);
    assert_eq!(engine.mark_out, None);
    assert_eq!(engine.transport.speed, 0.0);
    assert_eq!(engine.playhead(), 0.0);
    assert_eq!(engine.phase, Phase::Running);
    assert_eq!(engine.target, Color::Blue);
    assert_eq!(engine.mode, GameMode::Cat);
    assert!(engine.summary().is_none());
}

#[test]
fn mood_decays_to_speed_default() {
    let mut engine = engine_on(
        vec![seg(0, 0.0, 60000.0, Color::Red)],
        Color::Red,
        GameMode::Standard,
    );
    engine.key_down(Key::Stop, 0.0);
    engine.key_down(Key::Forward, 0.0);
    engine.key_up(Key::Forward, 50.0);
    assert_eq!(engine.mood.current(), Mood::Worried);
    engine.tick(100.0);
    engine.tick(1400.0);
    assert_eq!(engine.mood.current(), Mood::Idle);

    engine.key_up(Key::Stop, 1500.0);
    engine.key_down(Key::Forward, 1500.0);
    engine.tick(1600.0);
    assert_eq!(engine.mood.current(), Mood::Focused);

    for t in [1700.0, 1800.0, 1900.0, 2000.0] {
        engine.key_up(Key::Forward, t);
        engine.key_down(Key::Forward, t + 50.0);
    }
    assert!(engine.transport.speed >= 8.0);
    engine.tick(2200.0);
    assert_eq!(engine.mood.current(), Mood::Dizzy);
}

#[test]
fn standard_mode_tone_follows_segment_and_speed() {
    use shuttle_cat::shuttle::audio::{SCRUB_GAIN, scrub_frequency};
    let mut engine = engine_on(
        vec![
            seg(0, 0.0, 300.0, Color::Green),
            seg(1, 300.0, 300.0, Color::Blue),
        ],
        Color::Green,
        GameMode::Standard,
    );
    // Parked: silent.
    assert_eq!(engine.tick(0.0), AudioDirective::Silence);
    engine.key_down(Key::Forward, 10.0);
    let directive = engine.tick(10.0);
    assert_eq!(
        directive,
        AudioDirective::Tone {
            freq: scrub_frequency(Color::Green, 1.0),
            gain: SCRUB_GAIN,
        }
    );
    // Under the blue segment the base note changes.
    engine.transport.set_playhead(360.0);
    let directive = engine.tick(20.0);
    assert_eq!(
        directive,
        AudioDirective::Tone {
            freq: scrub_frequency(Color::Blue, 1.0),
            gain: SCRUB_GAIN,
        }
    );
}

/// Recording stand-in for the platform voice.
#[derive(Default)]
struct FakeVoice {
    log: Vec<String>,
}

impl ScrubVoice for FakeVoice {
    fn set_tone(&mut self, freq: f64, gain: f64) {
        self.log.push(format!("tone {freq:.0} {gain}"));
    }
    fn play_grain(&mut self, offset: f64, rate: f64) {
        self.log.push(format!("grain {offset} {rate}"));
    }
    fn silence(&mut self) {
        self.log.push("silence".to_string());
    }
}

#[test]
fn directives_drive_the_voice_capability() {
    let mut voice = FakeVoice::default();
    AudioDirective::Tone {
        freq: 440.0,
        gain: 0.1,
    }
    .apply(&mut voice);
    AudioDirective::Hold.apply(&mut voice);
    AudioDirective::Grain {
        offset: 0.25,
        rate: 1.5,
    }
    .apply(&mut voice);
    AudioDirective::Silence.apply(&mut voice);
    assert_eq!(voice.log, ["tone 440 0.1", "grain 0.25 1.5", "silence"]);
}

#[test]
fn cat_mode_grains_fire_on_cadence_inside_the_target() {
    use shuttle_cat::shuttle::audio::{GRAIN_INTERVAL_MS, MAX_GRAIN_RATE};
    let mut engine = engine_on(
        vec![
            seg(0, 0.0, 6000.0, Color::Red),
            seg(1, 6000.0, 6000.0, Color::Blue),
        ],
        Color::Red,
        GameMode::Cat,
    );
    engine.key_down(Key::Forward, 0.0);
    let first = engine.tick(0.0);
    assert!(matches!(first, AudioDirective::Grain { .. }));
    // Within the cadence window the graph is left alone.
    assert_eq!(engine.tick(GRAIN_INTERVAL_MS / 2.0), AudioDirective::Hold);
    assert!(matches!(
        engine.tick(GRAIN_INTERVAL_MS + 1.0),
        AudioDirective::Grain { .. }
    ));

    // Outside the target segment the grains stop.
    engine.transport.set_playhead(6600.0);
    assert_eq!(engine.tick(300.0), AudioDirective::Silence);

    // Fast shuttle pins the grain rate at the ceiling.
    engine.transport.set_playhead(300.0);
    engine.transport.speed = 16.0;
    match engine.tick(1000.0) {
        AudioDirective::Grain { rate, offset } => {
            assert_eq!(rate, MAX_GRAIN_RATE);
            assert!(offset > 0.0);
        }
        other => panic!("expected grain, got {other:?}"),
    }
}
