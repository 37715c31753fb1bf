/// Upper bound on the applied feedback, kept just under 0.95 so the loop
/// gain can never reach the configured ceiling and the tail always decays.
pub const MAX_FEEDBACK: f32 = 0.949;

/// Single feedback delay line. Pre-sized for two seconds of delay so the
/// hot path stays allocation-free for ordinary settings; a larger request
/// grows the line to 1.5x the requested length.
pub struct EchoEngine {
  buf: Vec<f32>,
  pos: usize,
}

impl EchoEngine {
  pub fn new(sr: u32) -> Self {
    Self { buf: vec![0.0; sr as usize * 2 + 1], pos: 0 }
  }

  fn ensure_len(&mut self, delay: usize) {
    if delay < self.buf.len() {
      return;
    }
    let len = delay + delay / 2;
    log::debug!("echo line grows to {len} samples; buffered tail discarded");
    self.buf = vec![0.0; len];
    // Cursor restarts at zero: the old tail is gone, which is an accepted
    // one-off artifact of resizing mid-stream.
    self.pos = 0;
  }

  /// `delay` in samples; `mix` and `feedback` pre-combined by the caller.
  /// A zero delay or non-positive mix is an exact passthrough.
  #[inline]
  pub fn process(&mut self, input: f32, delay: usize, mix: f32, feedback: f32) -> f32 {
    if delay == 0 || mix <= 0.0 {
      return input;
    }
    self.ensure_len(delay);
    let len = self.buf.len();
    let mix = mix.min(1.0);
    let fb = feedback.clamp(0.0, MAX_FEEDBACK);
    let delayed = self.buf[(self.pos + len - delay) % len];
    let out = input * (1.0 - mix) + delayed * mix;
    self.buf[self.pos] = input + delayed * fb;
    self.pos += 1;
    if self.pos >= len {
      self.pos = 0;
    }
    out
  }
}
