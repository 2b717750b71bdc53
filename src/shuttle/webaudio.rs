//! WebAudio implementation of the scrub voice.
//!
//! Graph: oscillator into tone gain into destination for the standard-mode tone,
//! plus a grain gain that one-shot buffer sources feed through in cat mode.
//! Every parameter move goes through `set_target_at_time` with the shared
//! smoothing time-constant so ramps never click. Construction must ride a
//! user gesture or the context starts suspended (autoplay policy).

use wasm_bindgen::JsValue;
use web_sys::{AudioBuffer, AudioContext, GainNode, OscillatorNode, OscillatorType};

use super::audio::{GRAIN_SECONDS, SMOOTHING_TC, ScrubVoice, synth_meow};

/// Gain the grain bus ramps to while meow grains are firing.
const GRAIN_GAIN: f64 = 0.5;

pub struct WebScrubVoice {
    ctx: AudioContext,
    osc: OscillatorNode,
    tone_gain: GainNode,
    grain_gain: GainNode,
    meow: AudioBuffer,
}

impl WebScrubVoice {
    pub fn new() -> Result<Self, JsValue> {
        let ctx = AudioContext::new()?;

        let osc = ctx.create_oscillator()?;
        osc.set_type(OscillatorType::Sine);
        let tone_gain = ctx.create_gain()?;
        tone_gain.gain().set_value(0.0);
        osc.connect_with_audio_node(&tone_gain)?;
        tone_gain.connect_with_audio_node(&ctx.destination())?;
        // The oscillator runs for the life of the graph; only its gain moves.
        osc.start()?;

        let grain_gain = ctx.create_gain()?;
        grain_gain.gain().set_value(0.0);
        grain_gain.connect_with_audio_node(&ctx.destination())?;

        let sample_rate = ctx.sample_rate();
        let mut samples = synth_meow(sample_rate as u32);
        let meow = ctx.create_buffer(1, samples.len() as u32, sample_rate)?;
        meow.copy_to_channel(&mut samples, 0)?;

        Ok(WebScrubVoice {
            ctx,
            osc,
            tone_gain,
            grain_gain,
            meow,
        })
    }
}

impl ScrubVoice for WebScrubVoice {
    fn set_tone(&mut self, freq: f64, gain: f64) {
        let t = self.ctx.current_time();
        self.osc
            .frequency()
            .set_target_at_time(freq as f32, t, SMOOTHING_TC)
            .ok();
        self.tone_gain
            .gain()
            .set_target_at_time(gain as f32, t, SMOOTHING_TC)
            .ok();
        self.grain_gain
            .gain()
            .set_target_at_time(0.0, t, SMOOTHING_TC)
            .ok();
    }

    fn play_grain(&mut self, offset: f64, rate: f64) {
        let t = self.ctx.current_time();
        self.tone_gain
            .gain()
            .set_target_at_time(0.0, t, SMOOTHING_TC)
            .ok();
        self.grain_gain
            .gain()
            .set_target_at_time(GRAIN_GAIN as f32, t, SMOOTHING_TC)
            .ok();
        // One-shot source per grain; WebAudio sources are single-use.
        let src = match self.ctx.create_buffer_source() {
            Ok(src) => src,
            Err(_) => return,
        };
        src.set_buffer(Some(&self.meow));
        src.playback_rate().set_value(rate as f32);
        if src.connect_with_audio_node(&self.grain_gain).is_err() {
            return;
        }
        src.start_with_when_and_grain_offset_and_grain_duration(t, offset, GRAIN_SECONDS)
            .ok();
    }

    fn silence(&mut self) {
        let t = self.ctx.current_time();
        self.tone_gain
            .gain()
            .set_target_at_time(0.0, t, SMOOTHING_TC)
            .ok();
        self.grain_gain
            .gain()
            .set_target_at_time(0.0, t, SMOOTHING_TC)
            .ok();
    }
}
