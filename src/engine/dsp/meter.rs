/// RMS of one raw captured frame, normalized to [0, 1]. Runs on the frame
/// before any processing so the meter tracks the microphone, not the
/// effects. The accumulator is f64: a full frame of i16 squares overflows
/// an f32 mantissa long before it overflows the value range.
pub fn rms_level(frame: &[i16]) -> f32 {
  if frame.is_empty() {
    return 0.0;
  }
  let mut sum = 0.0f64;
  for &s in frame {
    let v = s as f64;
    sum += v * v;
  }
  (((sum / frame.len() as f64).sqrt() / 32_768.0) as f32).clamp(0.0, 1.0)
}
