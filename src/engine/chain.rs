use std::f32::consts::TAU;

use crate::engine::dsp::biquad::Biquad;
use crate::engine::dsp::echo::{EchoEngine, MAX_FEEDBACK};
use crate::engine::dsp::pitch::PitchShifter;
use crate::engine::dsp::reverb::ReverbEngine;
use crate::engine::params::{DspParams, MAX_EQ_BANDS};
use crate::engine::presets::PresetConfig;

/// Fixed wet mix of the explicit echo when enabled; preset delay sends add
/// on top of it.
const ECHO_MIX: f32 = 0.35;
/// Shelf corners for the formant tilt and the preset tone controls.
const FORMANT_LOW_HZ: f32 = 250.0;
const FORMANT_HIGH_HZ: f32 = 2500.0;
const TONE_BASS_HZ: f32 = 180.0;
const TONE_TREBLE_HZ: f32 = 3200.0;
/// dB of shelf gain per formant step.
const FORMANT_DB_PER_STEP: f32 = 0.6;
/// Phase-warp LFO rate.
const WARP_RATE_HZ: f32 = 0.4;

/// The whole per-sample effect chain and its derived state. Owned by the
/// stream worker; `configure` runs between buffers, `process` inside them.
/// Stage order: EQ, formant tilt, pitch + preset voicing, tone shelves,
/// reverb, echo, master volume, clamp.
pub struct FxChain {
  sr: f32,
  eq: [Biquad; MAX_EQ_BANDS],
  eq_on: bool,
  formant_low: Biquad,
  formant_high: Biquad,
  formant_on: bool,
  bass: Biquad,
  bass_on: bool,
  treble: Biquad,
  treble_on: bool,
  pitch: PitchShifter,
  reverb: ReverbEngine,
  echo: EchoEngine,
  preset: PresetConfig,
  pitch_ratio: f32,
  reverb_wet: f32,
  echo_delay: usize,
  echo_mix: f32,
  echo_feedback: f32,
  volume: f32,
  vib_phase: f32,
  ring_phase: f32,
  warp_phase: f32,
}

impl FxChain {
  pub fn new(sr: u32) -> Self {
    Self {
      sr: sr as f32,
      eq: [Biquad::new(); MAX_EQ_BANDS],
      eq_on: false,
      formant_low: Biquad::new(),
      formant_high: Biquad::new(),
      formant_on: false,
      bass: Biquad::new(),
      bass_on: false,
      treble: Biquad::new(),
      treble_on: false,
      pitch: PitchShifter::new(sr),
      reverb: ReverbEngine::new(sr),
      echo: EchoEngine::new(sr),
      preset: PresetConfig::NEUTRAL,
      pitch_ratio: 1.0,
      reverb_wet: 0.0,
      echo_delay: 0,
      echo_mix: 0.0,
      echo_feedback: 0.0,
      volume: 1.0,
      vib_phase: 0.0,
      ring_phase: 0.0,
      warp_phase: 0.0,
    }
  }

  /// Clamp a snapshot into its documented domains and rebuild all derived
  /// state. Filter setters reset their own memory, so a reconfigure never
  /// runs new coefficients against stale state.
  pub fn configure(&mut self, p: &DspParams) {
    let sr = self.sr;

    let mut eq_on = false;
    for (i, f) in self.eq.iter_mut().enumerate() {
      let band = p.eq.get(i);
      let gain = band.map(|b| b.gain_db).unwrap_or(0.0);
      let freq = band.map(|b| b.freq).unwrap_or(0);
      if gain.abs() < 0.01 || freq <= 0 {
        f.set_bypass();
      } else {
        f.set_peaking(freq as f32, gain, 1.0, sr);
        eq_on = true;
      }
    }
    self.eq_on = eq_on;

    // Formant tilt: up warms the low shelf, down pulls the high shelf.
    let formant = p.formant.clamp(-12, 12);
    self.formant_low.set_bypass();
    self.formant_high.set_bypass();
    if formant > 0 {
      self.formant_low.set_low_shelf(FORMANT_LOW_HZ, formant as f32 * FORMANT_DB_PER_STEP, sr);
    } else if formant < 0 {
      self.formant_high.set_high_shelf(FORMANT_HIGH_HZ, formant as f32 * FORMANT_DB_PER_STEP, sr);
    }
    self.formant_on = formant != 0;

    let pc = p.voice_preset.config();
    self.preset = pc;
    self.bass_on = pc.bass_db.abs() > 0.1;
    if self.bass_on {
      self.bass.set_low_shelf(TONE_BASS_HZ, pc.bass_db, sr);
    } else {
      self.bass.set_bypass();
    }
    self.treble_on = pc.treble_db.abs() > 0.1;
    if self.treble_on {
      self.treble.set_high_shelf(TONE_TREBLE_HZ, pc.treble_db, sr);
    } else {
      self.treble.set_bypass();
    }

    self.pitch_ratio = p.pitch.clamp(0.5, 2.0);
    self.volume = p.volume.clamp(0.0, 1.0);

    let explicit_wet = if p.reverb { p.reverb_wet.clamp(0.0, 1.0) } else { 0.0 };
    self.reverb_wet = (explicit_wet + pc.extra_reverb_wet).clamp(0.0, 1.0);

    let explicit_ms = if p.echo { p.echo_delay_ms.max(0) as f32 } else { 0.0 };
    let delay_ms = explicit_ms.max(pc.extra_delay_ms);
    self.echo_delay = (delay_ms / 1000.0 * sr).round() as usize;
    let explicit_mix = if p.echo { ECHO_MIX } else { 0.0 };
    self.echo_mix = (explicit_mix + pc.extra_delay_mix).clamp(0.0, 1.0);
    let explicit_fb = if p.echo { p.echo_feedback.max(0.0) } else { 0.0 };
    self.echo_feedback = (explicit_fb + pc.extra_delay_feedback).clamp(0.0, MAX_FEEDBACK);
  }

  /// True when every stage is a strict no-op, so a frame can skip the
  /// float round trip entirely and come out bit-identical.
  fn is_identity(&self) -> bool {
    !self.eq_on
      && !self.formant_on
      && !self.bass_on
      && !self.treble_on
      && (self.pitch_ratio - 1.0).abs() <= PitchShifter::DEAD_BAND
      && self.preset.vibrato_depth <= 0.0
      && self.preset.ring_mix <= 0.0
      && self.preset.distortion <= 0.0
      && self.preset.phase_warp <= 0.0
      && self.reverb_wet <= 0.0
      && (self.echo_delay == 0 || self.echo_mix <= 0.0)
      && self.volume == 1.0
  }

  #[inline]
  fn process_sample(&mut self, mut s: f32) -> f32 {
    if self.eq_on {
      for f in &mut self.eq {
        s = f.process(s);
      }
    }
    if self.formant_on {
      s = self.formant_low.process(s);
      s = self.formant_high.process(s);
    }
    s = self.pitch.process(s, self.pitch_ratio);
    let pc = self.preset;
    if pc.vibrato_depth > 0.0 {
      self.vib_phase += TAU * pc.vibrato_rate_hz / self.sr;
      if self.vib_phase >= TAU {
        self.vib_phase -= TAU;
      }
      s *= 1.0 + pc.vibrato_depth * self.vib_phase.sin();
    }
    if pc.ring_mix > 0.0 {
      self.ring_phase += TAU * pc.ring_freq_hz / self.sr;
      if self.ring_phase >= TAU {
        self.ring_phase -= TAU;
      }
      s = (1.0 - pc.ring_mix) * s + pc.ring_mix * (s * self.ring_phase.sin());
    }
    if pc.distortion > 0.0 {
      s = (s * (1.0 + pc.distortion * 6.0)).tanh();
    }
    if pc.phase_warp > 0.0 {
      self.warp_phase += TAU * WARP_RATE_HZ / self.sr;
      if self.warp_phase >= TAU {
        self.warp_phase -= TAU;
      }
      s = (s * (1.0 + pc.phase_warp * self.warp_phase.sin())).sin();
    }
    if self.bass_on {
      s = self.bass.process(s);
    }
    if self.treble_on {
      s = self.treble.process(s);
    }
    s = self.reverb.process(s, self.reverb_wet);
    s = self.echo.process(s, self.echo_delay, self.echo_mix, self.echo_feedback);
    s * self.volume
  }

  /// Run the pipeline over one captured frame in place.
  pub fn process(&mut self, frame: &mut [i16]) {
    if self.is_identity() {
      return;
    }
    for s in frame.iter_mut() {
      let x = *s as f32 / 32_768.0;
      let y = self.process_sample(x);
      *s = (y * 32_767.0).clamp(-32_768.0, 32_767.0) as i16;
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::engine::params::{EqBand, VoicePreset};

  fn sine_frame(len: usize, hz: f32, sr: f32) -> Vec<i16> {
    (0..len)
      .map(|i| ((TAU * hz * i as f32 / sr).sin() * 12_000.0) as i16)
      .collect()
  }

  #[test]
  fn default_snapshot_is_bit_exact_passthrough() {
    let mut chain = FxChain::new(44_100);
    chain.configure(&DspParams::default());
    let original = sine_frame(2048, 440.0, 44_100.0);
    let mut frame = original.clone();
    chain.process(&mut frame);
    assert_eq!(frame, original);
  }

  #[test]
  fn silence_stays_silent_through_every_effect() {
    let mut chain = FxChain::new(44_100);
    chain.configure(&DspParams {
      eq: vec![EqBand { freq: 1000, gain_db: 6.0 }],
      pitch: 1.5,
      formant: 4,
      reverb: true,
      reverb_wet: 0.5,
      echo: true,
      voice_preset: VoicePreset::Robot,
      ..DspParams::default()
    });
    let mut frame = vec![0i16; 4096];
    for _ in 0..8 {
      chain.process(&mut frame);
      assert!(frame.iter().all(|&s| s == 0));
    }
  }

  #[test]
  fn unity_pitch_with_effects_off_matches_input_closely() {
    // Volume below 1.0 defeats the identity fast path, so the frame takes
    // the full float round trip; everything else stays inert.
    let mut chain = FxChain::new(44_100);
    chain.configure(&DspParams { volume: 0.999, ..DspParams::default() });
    let original = sine_frame(2048, 330.0, 44_100.0);
    let mut frame = original.clone();
    chain.process(&mut frame);
    for (a, b) in frame.iter().zip(&original) {
      assert!((*a as i32 - *b as i32).abs() <= 14, "{a} vs {b}");
    }
  }

  #[test]
  fn volume_scales_output() {
    let mut chain = FxChain::new(44_100);
    chain.configure(&DspParams { volume: 0.5, ..DspParams::default() });
    let mut frame = vec![20_000i16; 256];
    chain.process(&mut frame);
    for &s in &frame {
      assert!((s as f32 - 10_000.0).abs() < 32.0, "{s}");
    }
  }

  #[test]
  fn out_of_range_volume_clamps_to_unity() {
    let mut chain = FxChain::new(44_100);
    chain.configure(&DspParams { volume: 7.5, ..DspParams::default() });
    let original = sine_frame(1024, 200.0, 44_100.0);
    let mut frame = original.clone();
    chain.process(&mut frame);
    assert_eq!(frame, original);
  }

  #[test]
  fn eq_boost_raises_band_energy() {
    let sr = 44_100.0;
    let mut boosted = FxChain::new(44_100);
    boosted.configure(&DspParams {
      eq: vec![EqBand { freq: 1000, gain_db: 12.0 }],
      ..DspParams::default()
    });
    let original = sine_frame(8192, 1000.0, sr);
    let mut frame = original.clone();
    boosted.process(&mut frame);
    let energy = |b: &[i16]| b.iter().map(|&s| (s as f64) * (s as f64)).sum::<f64>();
    assert!(energy(&frame[4096..]) > energy(&original[4096..]) * 2.0);
  }

  #[test]
  fn flat_eq_bands_do_not_enable_the_cascade() {
    let mut chain = FxChain::new(44_100);
    chain.configure(&DspParams {
      eq: vec![
        EqBand { freq: 1000, gain_db: 0.005 },
        EqBand { freq: -50, gain_db: 6.0 },
      ],
      ..DspParams::default()
    });
    assert!(!chain.eq_on);
    assert!(chain.is_identity());
  }

  #[test]
  fn echo_effective_settings_combine_explicit_and_preset() {
    let mut chain = FxChain::new(44_100);
    // Explicit echo only
    chain.configure(&DspParams {
      echo: true,
      echo_delay_ms: 240,
      echo_feedback: 0.35,
      ..DspParams::default()
    });
    assert_eq!(chain.echo_delay, 10_584);
    assert!((chain.echo_mix - ECHO_MIX).abs() < 1e-6);
    assert!((chain.echo_feedback - 0.35).abs() < 1e-6);
    // Robot preset stacks its send on top and its longer delay wins
    chain.configure(&DspParams {
      echo: true,
      echo_delay_ms: 100,
      echo_feedback: 0.6,
      voice_preset: VoicePreset::Robot,
      ..DspParams::default()
    });
    assert_eq!(chain.echo_delay, (0.210f32 * 44_100.0).round() as usize);
    assert!((chain.echo_mix - 0.70).abs() < 1e-6);
    // 0.6 + 0.45 saturates the cap
    assert_eq!(chain.echo_feedback, MAX_FEEDBACK);
    // Disabled echo with a preset that has no delay is fully off
    chain.configure(&DspParams { echo: false, ..DspParams::default() });
    assert_eq!(chain.echo_delay, 0);
    assert_eq!(chain.echo_mix, 0.0);
  }

  #[test]
  fn reverb_wet_combines_switch_and_preset() {
    let mut chain = FxChain::new(44_100);
    chain.configure(&DspParams { reverb: false, reverb_wet: 0.9, ..DspParams::default() });
    assert_eq!(chain.reverb_wet, 0.0);
    chain.configure(&DspParams {
      reverb: true,
      reverb_wet: 0.9,
      voice_preset: VoicePreset::Robot,
      ..DspParams::default()
    });
    assert!((chain.reverb_wet - 1.0).abs() < 1e-6, "0.9 + 0.35 clamps to 1");
  }

  #[test]
  fn formant_sign_selects_the_shelf() {
    let mut chain = FxChain::new(44_100);
    chain.configure(&DspParams { formant: 8, ..DspParams::default() });
    assert!(chain.formant_on);
    chain.configure(&DspParams { formant: -8, ..DspParams::default() });
    assert!(chain.formant_on);
    chain.configure(&DspParams { formant: 0, ..DspParams::default() });
    assert!(!chain.formant_on);
  }

  #[test]
  fn robot_preset_mangles_the_signal() {
    let mut chain = FxChain::new(44_100);
    chain.configure(&DspParams { voice_preset: VoicePreset::Robot, ..DspParams::default() });
    let original = sine_frame(4096, 220.0, 44_100.0);
    let mut frame = original.clone();
    chain.process(&mut frame);
    let diff: u64 = frame
      .iter()
      .zip(&original)
      .map(|(a, b)| (*a as i64 - *b as i64).unsigned_abs())
      .sum();
    assert!(diff / frame.len() as u64 > 500, "mean diff {}", diff / frame.len() as u64);
  }

  #[test]
  fn preset_switch_back_to_normal_restores_passthrough() {
    let mut chain = FxChain::new(44_100);
    chain.configure(&DspParams { voice_preset: VoicePreset::Alien, ..DspParams::default() });
    let mut frame = sine_frame(2048, 300.0, 44_100.0);
    chain.process(&mut frame);
    chain.configure(&DspParams::default());
    let original = sine_frame(2048, 300.0, 44_100.0);
    let mut frame = original.clone();
    chain.process(&mut frame);
    assert_eq!(frame, original);
  }
}
