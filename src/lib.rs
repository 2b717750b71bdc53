//! Shuttle Cat core crate.
//!
//! A JKL shuttle-editing trainer: scrub a procedurally generated source tape,
//! mark an in/out range and extract it into a growing sequence, racing toward
//! a target length while the engine scores "bad habit" taps. The simulation
//! core (tape, transport, input machine, extraction, mood) is pure Rust and
//! runs under native `cargo test`; the browser shell wires it to the canvas,
//! keyboard and WebAudio.

use wasm_bindgen::prelude::*;

pub mod shuttle;

// Optional small allocator for size (feature gated)
#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen(start)]
pub fn wasm_start() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Begin (or restart) a run. `target_color` is a palette name ("red",
/// "orange", "yellow", "green", "blue", "purple"); anything else lets the
/// engine pick one. `mode` is "standard" or "cat".
#[wasm_bindgen]
pub fn start_game(target_color: &str, mode: &str) -> Result<(), JsValue> {
    let target = shuttle::tape::Color::from_name(target_color);
    let mode = shuttle::extract::GameMode::from_ident(mode)
        .ok_or_else(|| JsValue::from_str("mode must be \"standard\" or \"cat\""))?;
    shuttle::start_shuttle_mode(target, mode)
}

/// Deterministically silence any in-flight audio ramps (exit to menu).
#[wasm_bindgen]
pub fn stop_audio() {
    shuttle::stop_audio();
}

/// Terminal summary of the most recent finished run, as JSON for the
/// score-submission form. Empty while no run has finished.
#[cfg(feature = "serde_json")]
#[wasm_bindgen]
pub fn run_summary_json() -> String {
    shuttle::run_summary()
        .and_then(|summary| serde_json::to_string(&summary).ok())
        .unwrap_or_default()
}
