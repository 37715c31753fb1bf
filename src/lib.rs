mod engine {
  pub mod audio;
  pub mod chain;
  pub mod dsp;
  pub mod io;
  pub mod params;
  pub mod presets;
}

pub use engine::audio::AudioEngine;
pub use engine::chain::FxChain;
pub use engine::io::{AudioError, CaptureSource, PlaybackSink, FRAME_LEN};
pub use engine::params::{DspParams, EqBand, VoicePreset, MAX_EQ_BANDS};
pub use engine::presets::PresetConfig;
