//! Browser shell for the shuttle trainer.
//!
//! Wires the canvas, keyboard listeners and the WebAudio voice to the pure
//! engine and runs the requestAnimationFrame loop. Per tick the order is
//! fixed: engine update (transport, mood, audio directive), then apply the
//! directive to the voice, then draw, then overlay refresh, so the tone always
//! reflects the segment under the freshly moved playhead.

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, window};

pub mod audio;
pub mod engine;
pub mod extract;
pub mod input;
pub mod mood;
pub mod tape;
pub mod transport;
pub mod webaudio;

use self::audio::ScrubVoice;
use self::engine::{Note, Phase, RunSummary, ShuttleEngine, VIEW_HEIGHT, VIEW_WIDTH};
use self::extract::{GameMode, Policy};
use self::input::Key;
use self::mood::Mood;
use self::tape::{Color, FRAME_PIXELS, Lcg, PALETTE};
use self::webaudio::WebScrubVoice;

// Tape strip and sequence bar placement on the canvas.
const TAPE_Y: f64 = 170.0;
const TAPE_H: f64 = 130.0;
const SEQ_X: f64 = 40.0;
const SEQ_Y: f64 = 430.0;
const SEQ_H: f64 = 34.0;

/// Transient extraction/mark sparkle.
struct Spark {
    x: f64,
    y: f64,
    vx: f64,
    vy: f64,
    born_ms: f64,
    color: &'static str,
}

const SPARK_LIFE_MS: f64 = 600.0;

struct ShellState {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
    engine: ShuttleEngine,
    voice: Option<WebScrubVoice>,
    audio_attempted: bool,
    sparks: Vec<Spark>,
    verdict: String,
}

// RefCell::new isn't const on this toolchain; allow Clippy lint until a const initializer is feasible.
thread_local! {
    static SHELL_STATE: std::cell::RefCell<Option<ShellState>> = std::cell::RefCell::new(None);
}

pub(crate) fn performance_now() -> f64 {
    window()
        .and_then(|w| w.performance())
        .map(|p| p.now())
        .unwrap_or(0.0)
}

/// Run seed: browser entropy when the `rng` feature is on, otherwise the
/// performance clock folded through the LCG (prototype randomness, not crypto).
fn tape_seed() -> u32 {
    #[cfg(feature = "rng")]
    {
        let mut buf = [0u8; 4];
        if getrandom::getrandom(&mut buf).is_ok() {
            return u32::from_le_bytes(buf);
        }
    }
    Lcg::new((performance_now() * 1000.0) as u32).next()
}

/// Terminal summary of the most recent finished run, if any.
pub fn run_summary() -> Option<RunSummary> {
    SHELL_STATE.with(|cell| cell.borrow().as_ref().and_then(|s| s.engine.summary().copied()))
}

/// Silence any in-flight audio ramps (exit to menu, run end).
pub fn stop_audio() {
    SHELL_STATE.with(|cell| {
        if let Some(state) = cell.borrow_mut().as_mut() {
            if let Some(voice) = state.voice.as_mut() {
                voice.silence();
            }
        }
    });
}

/// Create (or reuse) the canvas and overlays, then start a run. Keyboard
/// listeners and the frame loop are installed once; later calls restart the
/// engine in place.
pub fn start_shuttle_mode(target: Option<Color>, mode: GameMode) -> Result<(), JsValue> {
    let win = window().ok_or_else(|| JsValue::from_str("no window"))?;
    let doc = win
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))?;

    let fresh = doc.get_element_by_id("sc-canvas").is_none();
    let canvas: HtmlCanvasElement = if let Some(el) = doc.get_element_by_id("sc-canvas") {
        el.dyn_into()?
    } else {
        let c: HtmlCanvasElement = doc.create_element("canvas")?.dyn_into()?;
        c.set_id("sc-canvas");
        c.set_width(VIEW_WIDTH as u32);
        c.set_height(VIEW_HEIGHT as u32);
        c.set_attribute("style", "position:fixed; left:50%; top:46%; transform:translate(-50%,-50%); box-shadow:0 0 32px 0 rgba(0,0,0,0.18); border-radius:12px; border:2px solid #222; background:#101014; z-index:20;").ok();
        doc.body().unwrap().append_child(&c)?;
        c
    };
    let ctx: CanvasRenderingContext2d = canvas.get_context("2d")?.unwrap().dyn_into()?;
    ctx.set_font("14px 'Fira Code', monospace");

    ensure_overlay(&doc, "sc-score", "Sequence: 0 px", "top:10px; left:12px;")?;
    ensure_overlay(&doc, "sc-penalties", "Bad habits: 0", "top:10px; left:200px;")?;
    ensure_overlay(
        &doc,
        "sc-status",
        "",
        "bottom:18px; left:50%; transform:translateX(-50%);",
    )?;

    let now = performance_now();
    let seed = tape_seed();
    let target = target.unwrap_or(PALETTE[seed as usize % PALETTE.len()]);

    SHELL_STATE.with(|cell| {
        let mut slot = cell.borrow_mut();
        match slot.as_mut() {
            Some(state) => {
                // Restart in place: canvas, listeners and audio graph survive.
                state.engine.start(target, mode, seed, now);
                state.sparks.clear();
                state.verdict.clear();
            }
            None => {
                let mut engine = ShuttleEngine::new(Policy::default());
                engine.start(target, mode, seed, now);
                *slot = Some(ShellState {
                    canvas: canvas.clone(),
                    ctx: ctx.clone(),
                    engine,
                    voice: None,
                    audio_attempted: false,
                    sparks: Vec::new(),
                    verdict: String::new(),
                });
            }
        }
    });
    set_overlay_text("sc-score", "Sequence: 0 px");
    set_overlay_text("sc-penalties", "Bad habits: 0");

    if fresh {
        attach_key_listeners(&doc)?;
        start_shuttle_loop();
    }
    Ok(())
}

fn ensure_overlay(
    doc: &web_sys::Document,
    id: &str,
    text: &str,
    pos: &str,
) -> Result<(), JsValue> {
    if doc.get_element_by_id(id).is_some() {
        return Ok(());
    }
    let Some(body) = doc.body() else {
        return Ok(());
    };
    let div = doc.create_element("div")?;
    div.set_id(id);
    div.set_text_content(Some(text));
    div.set_attribute("style", &format!("position:fixed; {pos} font-family:'Fira Code', monospace; font-size:15px; padding:4px 8px; background:rgba(0,0,0,0.42); border:1px solid #333; border-radius:6px; color:#ffd166; z-index:45; letter-spacing:0.5px;")).ok();
    body.append_child(&div)?;
    Ok(())
}

fn set_overlay_text(id: &str, text: &str) {
    if let Some(doc) = window().and_then(|w| w.document()) {
        if let Some(el) = doc.get_element_by_id(id) {
            el.set_text_content(Some(text));
        }
    }
}

fn attach_key_listeners(doc: &web_sys::Document) -> Result<(), JsValue> {
    let down = Closure::wrap(Box::new(move |evt: web_sys::KeyboardEvent| {
        let Some(key) = Key::from_ident(evt.key().to_lowercase().as_str()) else {
            return;
        };
        evt.prevent_default();
        let now = performance_now();
        SHELL_STATE.with(|cell| {
            if let Some(state) = cell.borrow_mut().as_mut() {
                ensure_voice(state);
                let notes = state.engine.key_down(key, now);
                apply_notes(state, &notes, now);
            }
        });
    }) as Box<dyn FnMut(_)>);
    doc.add_event_listener_with_callback("keydown", down.as_ref().unchecked_ref())?;
    down.forget();

    let up = Closure::wrap(Box::new(move |evt: web_sys::KeyboardEvent| {
        let Some(key) = Key::from_ident(evt.key().to_lowercase().as_str()) else {
            return;
        };
        let now = performance_now();
        SHELL_STATE.with(|cell| {
            if let Some(state) = cell.borrow_mut().as_mut() {
                let notes = state.engine.key_up(key, now);
                apply_notes(state, &notes, now);
            }
        });
    }) as Box<dyn FnMut(_)>);
    doc.add_event_listener_with_callback("keyup", up.as_ref().unchecked_ref())?;
    up.forget();
    Ok(())
}

/// Build the audio graph on the first key event; it has to ride a user
/// gesture (autoplay policy). Failure leaves the run silent but playable.
fn ensure_voice(state: &mut ShellState) {
    if state.audio_attempted {
        return;
    }
    state.audio_attempted = true;
    state.voice = WebScrubVoice::new().ok();
}

fn apply_notes(state: &mut ShellState, notes: &[Note], now: f64) {
    for note in notes {
        match *note {
            Note::MarkIn(_) | Note::MarkOut(_) => spawn_sparks(state, 6, now),
            Note::Extracted(_) => spawn_sparks(state, 18, now),
            Note::Score(total) => {
                set_overlay_text("sc-score", &format!("Sequence: {} px", total as i64));
            }
            Note::Penalty(count) => {
                set_overlay_text("sc-penalties", &format!("Bad habits: {count}"));
            }
            Note::Won(score) => {
                state.verdict = format!("WIN! final score {score}");
                if let Some(voice) = state.voice.as_mut() {
                    voice.silence();
                }
            }
            Note::Lost(reason) => {
                state.verdict = format!("GAME OVER: {}", reason.describe());
                if let Some(voice) = state.voice.as_mut() {
                    voice.silence();
                }
            }
        }
    }
}

fn spawn_sparks(state: &mut ShellState, count: usize, now: f64) {
    let mut rng = Lcg::new(now as u32);
    let color = state.engine.target.css();
    for _ in 0..count {
        let ang = rng.unit() * std::f64::consts::TAU;
        let speed = 0.04 + rng.unit() * 0.12;
        state.sparks.push(Spark {
            x: VIEW_WIDTH / 2.0,
            y: TAPE_Y + TAPE_H / 2.0,
            vx: ang.cos() * speed,
            vy: ang.sin() * speed - 0.05,
            born_ms: now,
            color,
        });
    }
}

type FrameCallback = std::rc::Rc<std::cell::RefCell<Option<Closure<dyn FnMut(f64)>>>>;

fn start_shuttle_loop() {
    let f: FrameCallback = std::rc::Rc::new(std::cell::RefCell::new(None));
    let g = f.clone();
    *g.borrow_mut() = Some(Closure::wrap(Box::new(move |ts: f64| {
        SHELL_STATE.with(|cell| {
            if let Some(state) = cell.borrow_mut().as_mut() {
                shuttle_tick(state, ts);
            }
        });
        if let Some(w) = window() {
            let _ =
                w.request_animation_frame(f.borrow().as_ref().unwrap().as_ref().unchecked_ref());
        }
    }) as Box<dyn FnMut(f64)>));
    if let Some(w) = window() {
        let _ = w.request_animation_frame(g.borrow().as_ref().unwrap().as_ref().unchecked_ref());
    }
}

// --- Tick & Rendering --------------------------------------------------------

fn shuttle_tick(state: &mut ShellState, now: f64) {
    let directive = state.engine.tick(now);
    if let Some(voice) = state.voice.as_mut() {
        directive.apply(voice);
    }
    state.sparks.retain(|s| now - s.born_ms < SPARK_LIFE_MS);
    render(state, now);
    refresh_status(state);
}

fn refresh_status(state: &ShellState) {
    let status = match state.engine.phase {
        Phase::Won | Phase::Lost => state.verdict.clone(),
        Phase::Running => match (state.engine.mark_in, state.engine.mark_out) {
            (Some(a), Some(b)) => format!("marked {:.0}..{:.0} / press . to extract", a, b),
            (Some(a), None) => format!("in at {:.0} / set the out mark with O", a),
            _ => "hold J/K/L to shuttle, I/O to mark, . to extract".to_string(),
        },
        Phase::Idle => "press start".to_string(),
    };
    set_overlay_text("sc-status", &status);
}

fn line(ctx: &CanvasRenderingContext2d, x0: f64, y0: f64, x1: f64, y1: f64) {
    ctx.begin_path();
    ctx.move_to(x0, y0);
    ctx.line_to(x1, y1);
    ctx.stroke();
}

fn render(state: &mut ShellState, now: f64) {
    let ctx = &state.ctx;
    let engine = &state.engine;
    let (vw, vh) = (
        state.canvas.width() as f64,
        state.canvas.height() as f64,
    );

    ctx.set_fill_style_str("#101014");
    ctx.fill_rect(0.0, 0.0, vw, vh);

    render_tape(ctx, engine);
    render_marks(ctx, engine);
    render_sequence_bar(ctx, engine);
    render_hud(ctx, engine);
    render_cat(ctx, engine.mood.current(), now);

    for spark in &state.sparks {
        let age = now - spark.born_ms;
        let alpha = 1.0 - (age / SPARK_LIFE_MS).clamp(0.0, 1.0);
        if alpha <= 0.0 {
            continue;
        }
        ctx.set_global_alpha(alpha);
        ctx.set_fill_style_str(spark.color);
        ctx.fill_rect(spark.x + spark.vx * age, spark.y + spark.vy * age, 3.0, 3.0);
        ctx.set_global_alpha(1.0);
    }

    if matches!(engine.phase, Phase::Won | Phase::Lost) {
        ctx.set_fill_style_str("rgba(0,0,0,0.55)");
        ctx.fill_rect(0.0, 0.0, vw, vh);
        ctx.set_font("42px 'Fira Code', monospace");
        ctx.set_text_align("center");
        ctx.set_fill_style_str("#ffd166");
        let headline = if engine.phase == Phase::Won {
            "SEQUENCE COMPLETE"
        } else {
            "GAME OVER"
        };
        ctx.fill_text(headline, vw / 2.0, vh / 2.0).ok();
        ctx.set_font("14px 'Fira Code', monospace");
        ctx.set_text_align("left");
    }
}

fn render_tape(ctx: &CanvasRenderingContext2d, engine: &ShuttleEngine) {
    let offset = engine.transport.conveyor_offset;

    ctx.set_fill_style_str("#1c1c22");
    ctx.fill_rect(0.0, TAPE_Y, VIEW_WIDTH, TAPE_H);

    // A tape-space point lands on screen at `x + offset`.
    for seg in engine.tape.segments() {
        let sx = seg.x + offset;
        if sx + seg.width < 0.0 || sx > VIEW_WIDTH {
            continue;
        }
        ctx.set_fill_style_str(seg.color.css());
        ctx.fill_rect(sx, TAPE_Y + 6.0, seg.width - 1.0, TAPE_H - 12.0);
    }

    // Frame ticks every ten frames.
    ctx.set_stroke_style_str("rgba(255,255,255,0.18)");
    ctx.set_line_width(1.0);
    let step = FRAME_PIXELS * 10.0;
    let mut x = ((-offset) / step).floor() * step;
    while x + offset <= VIEW_WIDTH {
        if x >= 0.0 && x + offset >= 0.0 {
            line(ctx, x + offset, TAPE_Y + TAPE_H - 12.0, x + offset, TAPE_Y + TAPE_H);
        }
        x += step;
    }

    // Playhead, fixed at the viewport center.
    ctx.set_stroke_style_str("#ffffff");
    ctx.set_line_width(2.0);
    line(
        ctx,
        VIEW_WIDTH / 2.0,
        TAPE_Y - 16.0,
        VIEW_WIDTH / 2.0,
        TAPE_Y + TAPE_H + 16.0,
    );
}

fn render_marks(ctx: &CanvasRenderingContext2d, engine: &ShuttleEngine) {
    let offset = engine.transport.conveyor_offset;
    if let (Some(a), Some(b)) = (engine.mark_in, engine.mark_out) {
        let (sx0, sx1) = (a + offset, b + offset);
        if sx1 >= 0.0 && sx0 <= VIEW_WIDTH {
            ctx.set_fill_style_str("rgba(255,240,150,0.14)");
            ctx.fill_rect(sx0.max(0.0), TAPE_Y, sx1.min(VIEW_WIDTH) - sx0.max(0.0), TAPE_H);
        }
    }
    ctx.set_line_width(2.0);
    if let Some(a) = engine.mark_in {
        let sx = a + offset;
        if (0.0..=VIEW_WIDTH).contains(&sx) {
            ctx.set_stroke_style_str("#8ef58e");
            line(ctx, sx, TAPE_Y - 10.0, sx, TAPE_Y + TAPE_H + 10.0);
            ctx.set_fill_style_str("#8ef58e");
            ctx.fill_rect(sx, TAPE_Y - 10.0, 8.0, 6.0);
        }
    }
    if let Some(b) = engine.mark_out {
        let sx = b + offset;
        if (0.0..=VIEW_WIDTH).contains(&sx) {
            ctx.set_stroke_style_str("#f58e8e");
            line(ctx, sx, TAPE_Y - 10.0, sx, TAPE_Y + TAPE_H + 10.0);
            ctx.set_fill_style_str("#f58e8e");
            ctx.fill_rect(sx - 8.0, TAPE_Y - 10.0, 8.0, 6.0);
        }
    }
}

fn render_sequence_bar(ctx: &CanvasRenderingContext2d, engine: &ShuttleEngine) {
    let bar_w = VIEW_WIDTH - 2.0 * SEQ_X;
    ctx.set_fill_style_str("#1c1c22");
    ctx.fill_rect(SEQ_X, SEQ_Y, bar_w, SEQ_H);

    let scale = bar_w / engine.policy().win_width;
    let mut x = SEQ_X;
    for clip in &engine.clips {
        let w = clip.width * scale;
        ctx.set_fill_style_str(clip.color.css());
        ctx.fill_rect(x, SEQ_Y + 3.0, (w - 1.0).max(1.0), SEQ_H - 6.0);
        x += w;
    }

    ctx.set_stroke_style_str("#ffd166");
    ctx.set_line_width(1.0);
    ctx.stroke_rect(SEQ_X, SEQ_Y, bar_w, SEQ_H);
}

fn render_hud(ctx: &CanvasRenderingContext2d, engine: &ShuttleEngine) {
    let speed = engine.transport.speed;
    let arrow = if speed > 0.0 {
        "\u{25b6}"
    } else if speed < 0.0 {
        "\u{25c0}"
    } else {
        "\u{23f8}"
    };
    ctx.set_fill_style_str("#ffd166");
    ctx.fill_text(&format!("{arrow} {speed:+.1}x"), 20.0, 40.0).ok();

    ctx.set_fill_style_str(engine.target.css());
    ctx.fill_rect(20.0, 54.0, 22.0, 22.0);
    ctx.set_fill_style_str("#ffffff");
    let mode = match engine.mode {
        GameMode::Standard => "standard",
        GameMode::Cat => "cat mode",
    };
    ctx.fill_text(&format!("isolate this ({mode})"), 50.0, 70.0).ok();
}

fn render_cat(ctx: &CanvasRenderingContext2d, mood: Mood, now: f64) {
    let cx = VIEW_WIDTH - 96.0;
    let bob = match mood {
        Mood::Focused | Mood::Dizzy => (now / 140.0).sin() * 2.0,
        _ => 0.0,
    };
    let cy = 84.0 + bob;
    let r = 32.0;

    ctx.set_fill_style_str("#2e2e38");
    for side in [-1.0, 1.0] {
        ctx.begin_path();
        ctx.move_to(cx + side * r * 0.85, cy - r * 0.45);
        ctx.line_to(cx + side * r * 0.5, cy - r * 1.35);
        ctx.line_to(cx + side * r * 0.1, cy - r * 0.8);
        ctx.close_path();
        ctx.fill();
    }
    ctx.begin_path();
    ctx.arc(cx, cy, r, 0.0, std::f64::consts::TAU).ok();
    ctx.fill();

    ctx.set_stroke_style_str("#ffd166");
    ctx.set_line_width(2.0);
    match mood {
        Mood::Dizzy => {
            // X-shaped eyes.
            for side in [-1.0, 1.0] {
                let ex = cx + side * 12.0;
                line(ctx, ex - 4.0, cy - 10.0, ex + 4.0, cy - 2.0);
                line(ctx, ex + 4.0, cy - 10.0, ex - 4.0, cy - 2.0);
            }
        }
        Mood::Happy => {
            for side in [-1.0, 1.0] {
                ctx.begin_path();
                ctx.arc(cx + side * 12.0, cy - 4.0, 5.0, std::f64::consts::PI, std::f64::consts::TAU)
                    .ok();
                ctx.stroke();
            }
        }
        _ => {
            ctx.set_fill_style_str("#ffd166");
            for side in [-1.0, 1.0] {
                ctx.begin_path();
                ctx.arc(cx + side * 12.0, cy - 6.0, 3.0, 0.0, std::f64::consts::TAU)
                    .ok();
                ctx.fill();
            }
        }
    }

    match mood {
        Mood::Worried => {
            // Wavy mouth.
            ctx.begin_path();
            ctx.move_to(cx - 10.0, cy + 12.0);
            ctx.quadratic_curve_to(cx - 5.0, cy + 8.0, cx, cy + 12.0);
            ctx.quadratic_curve_to(cx + 5.0, cy + 16.0, cx + 10.0, cy + 12.0);
            ctx.stroke();
        }
        Mood::Happy => {
            ctx.begin_path();
            ctx.arc(cx, cy + 8.0, 8.0, 0.2, std::f64::consts::PI - 0.2).ok();
            ctx.stroke();
        }
        _ => {
            line(ctx, cx - 6.0, cy + 12.0, cx + 6.0, cy + 12.0);
        }
    }

    // Whiskers.
    ctx.set_line_width(1.0);
    for side in [-1.0, 1.0] {
        for dy in [-2.0, 4.0] {
            line(
                ctx,
                cx + side * r * 0.5,
                cy + 6.0 + dy,
                cx + side * (r + 14.0),
                cy + 2.0 + dy * 1.8,
            );
        }
    }
}
