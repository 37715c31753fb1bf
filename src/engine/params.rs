use serde::Deserialize;

/// The EQ cascade is a fixed bank of five peaking sections; extra bands in
/// an incoming snapshot are ignored, missing ones stay flat.
pub const MAX_EQ_BANDS: usize = 5;

#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EqBand {
  pub freq: i32,
  pub gain_db: f32,
}

/// Named voice characters. Wire values match case-insensitively; anything
/// unrecognized (or absent) resolves to Normal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum VoicePreset {
  #[default]
  Normal,
  Child,
  Funny,
  Robot,
  Deep,
  Alien,
}

impl VoicePreset {
  pub fn from_name(name: &str) -> Self {
    match name.to_ascii_lowercase().as_str() {
      "child" => VoicePreset::Child,
      "funny" => VoicePreset::Funny,
      "robot" => VoicePreset::Robot,
      "deep" => VoicePreset::Deep,
      "alien" => VoicePreset::Alien,
      _ => VoicePreset::Normal,
    }
  }
}

impl From<String> for VoicePreset {
  fn from(s: String) -> Self {
    VoicePreset::from_name(&s)
  }
}

/// One immutable parameter snapshot. The control side builds these and
/// publishes them wholesale; the processing side never observes a partial
/// update. Out-of-range numeric values are clamped where they are consumed,
/// never rejected.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DspParams {
  pub eq: Vec<EqBand>,
  pub pitch: f32,
  pub formant: i32,
  pub reverb: bool,
  pub reverb_wet: f32,
  pub echo: bool,
  pub echo_delay_ms: i32,
  pub echo_feedback: f32,
  pub volume: f32,
  pub voice_preset: VoicePreset,
}

impl Default for DspParams {
  fn default() -> Self {
    Self {
      eq: Vec::new(),
      pitch: 1.0,
      formant: 0,
      reverb: false,
      reverb_wet: 0.25,
      echo: false,
      echo_delay_ms: 240,
      echo_feedback: 0.35,
      volume: 1.0,
      voice_preset: VoicePreset::Normal,
    }
  }
}
