/// Classic parallel comb-bank delay times, coprime-ish so the resonances
/// interleave instead of stacking.
const COMB_TIMES: [f32; 3] = [0.0297, 0.0371, 0.0411];
const COMB_FEEDBACK: [f32; 3] = [0.78, 0.75, 0.70];

struct CombDelay {
  buf: Vec<f32>,
  pos: usize,
  feedback: f32,
}

impl CombDelay {
  fn new(len: usize, feedback: f32) -> Self {
    Self { buf: vec![0.0; len.max(1)], pos: 0, feedback }
  }

  #[inline]
  fn process(&mut self, input: f32) -> f32 {
    let out = self.buf[self.pos];
    self.buf[self.pos] = input + out * self.feedback;
    self.pos += 1;
    if self.pos >= self.buf.len() {
      self.pos = 0;
    }
    out
  }
}

/// Three feedback combs mixed in parallel; wet/dry blend on top.
pub struct ReverbEngine {
  combs: [CombDelay; 3],
}

impl ReverbEngine {
  pub fn new(sr: u32) -> Self {
    let comb = |i: usize| {
      CombDelay::new((COMB_TIMES[i] * sr as f32).round() as usize, COMB_FEEDBACK[i])
    };
    Self { combs: [comb(0), comb(1), comb(2)] }
  }

  /// `wet <= 0` is an exact passthrough and leaves the comb state untouched.
  #[inline]
  pub fn process(&mut self, input: f32, wet: f32) -> f32 {
    if wet <= 0.0 {
      return input;
    }
    let wet = wet.min(1.0);
    let sum = self.combs[0].process(input)
      + self.combs[1].process(input)
      + self.combs[2].process(input);
    input * (1.0 - wet) + sum * (1.0 / 3.0) * wet
  }
}
