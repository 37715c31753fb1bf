use super::params::VoicePreset;

/// Modulation recipe behind a voice preset: ring modulation, vibrato, soft
/// distortion, phase warp, extra reverb/delay sends and a bass/treble tilt.
/// Pure data; `VoicePreset::config` is a constant table lookup, so applying
/// a preset twice (or round-tripping through another) is bit-identical.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PresetConfig {
  pub ring_mix: f32,
  pub ring_freq_hz: f32,
  pub vibrato_depth: f32,
  pub vibrato_rate_hz: f32,
  pub distortion: f32,
  pub phase_warp: f32,
  pub extra_reverb_wet: f32,
  pub extra_delay_ms: f32,
  pub extra_delay_mix: f32,
  pub extra_delay_feedback: f32,
  pub bass_db: f32,
  pub treble_db: f32,
}

impl PresetConfig {
  pub const NEUTRAL: PresetConfig = PresetConfig {
    ring_mix: 0.0,
    ring_freq_hz: 0.0,
    vibrato_depth: 0.0,
    vibrato_rate_hz: 0.0,
    distortion: 0.0,
    phase_warp: 0.0,
    extra_reverb_wet: 0.0,
    extra_delay_ms: 0.0,
    extra_delay_mix: 0.0,
    extra_delay_feedback: 0.0,
    bass_db: 0.0,
    treble_db: 0.0,
  };
}

impl VoicePreset {
  pub fn config(self) -> PresetConfig {
    match self {
      VoicePreset::Normal => PresetConfig::NEUTRAL,
      VoicePreset::Child => PresetConfig {
        vibrato_depth: 0.02,
        vibrato_rate_hz: 5.0,
        extra_reverb_wet: 0.2,
        bass_db: -2.0,
        treble_db: 3.0,
        ..PresetConfig::NEUTRAL
      },
      VoicePreset::Funny => PresetConfig {
        ring_mix: 0.1,
        ring_freq_hz: 120.0,
        vibrato_depth: 0.06,
        vibrato_rate_hz: 6.5,
        extra_delay_ms: 90.0,
        extra_delay_mix: 0.25,
        extra_delay_feedback: 0.2,
        treble_db: 1.5,
        ..PresetConfig::NEUTRAL
      },
      VoicePreset::Robot => PresetConfig {
        ring_mix: 0.65,
        ring_freq_hz: 55.0,
        distortion: 0.6,
        extra_reverb_wet: 0.35,
        extra_delay_ms: 210.0,
        extra_delay_mix: 0.35,
        extra_delay_feedback: 0.45,
        bass_db: 2.0,
        ..PresetConfig::NEUTRAL
      },
      VoicePreset::Deep => PresetConfig {
        extra_reverb_wet: 0.12,
        bass_db: 5.0,
        treble_db: -4.0,
        ..PresetConfig::NEUTRAL
      },
      VoicePreset::Alien => PresetConfig {
        ring_mix: 0.35,
        ring_freq_hz: 420.0,
        phase_warp: 0.7,
        extra_reverb_wet: 0.25,
        extra_delay_ms: 180.0,
        extra_delay_mix: 0.3,
        extra_delay_feedback: 0.3,
        treble_db: 2.0,
        ..PresetConfig::NEUTRAL
      },
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn normal_is_fully_neutral() {
    assert_eq!(VoicePreset::Normal.config(), PresetConfig::NEUTRAL);
  }

  #[test]
  fn reapplying_a_preset_is_bit_identical() {
    for p in [
      VoicePreset::Normal,
      VoicePreset::Child,
      VoicePreset::Funny,
      VoicePreset::Robot,
      VoicePreset::Deep,
      VoicePreset::Alien,
    ] {
      assert_eq!(p.config(), p.config());
    }
  }

  #[test]
  fn round_trip_reproduces_the_original_row() {
    let before = VoicePreset::Alien.config();
    let _ = VoicePreset::Normal.config();
    let _ = VoicePreset::Robot.config();
    assert_eq!(VoicePreset::Alien.config(), before);
  }

  #[test]
  fn robot_row_matches_the_table() {
    let c = VoicePreset::Robot.config();
    assert_eq!(c.ring_mix, 0.65);
    assert_eq!(c.ring_freq_hz, 55.0);
    assert_eq!(c.vibrato_depth, 0.0);
    assert_eq!(c.distortion, 0.6);
    assert_eq!(c.phase_warp, 0.0);
    assert_eq!(c.extra_reverb_wet, 0.35);
    assert_eq!(c.extra_delay_ms, 210.0);
    assert_eq!(c.extra_delay_mix, 0.35);
    assert_eq!(c.extra_delay_feedback, 0.45);
    assert_eq!(c.bass_db, 2.0);
    assert_eq!(c.treble_db, 0.0);
  }
}
