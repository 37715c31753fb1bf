use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait};
use crossbeam_channel::{bounded, Receiver, Sender};

/// Samples per frame handed to the stream worker; also the level-event
/// cadence.
pub const FRAME_LEN: usize = 1024;
/// Frames buffered between a device callback and the worker.
const FRAME_QUEUE: usize = 4;
/// Bound on a blocking read, so a stop request is observed within about one
/// frame of latency.
const READ_TIMEOUT: Duration = Duration::from_millis(20);

#[derive(Debug, thiserror::Error)]
pub enum AudioError {
  #[error("no input device available")]
  NoInputDevice,
  #[error("no output device available")]
  NoOutputDevice,
  #[error("input stream: {0}")]
  InputStream(String),
  #[error("output stream: {0}")]
  OutputStream(String),
  #[error("unsupported sample format {0}")]
  UnsupportedFormat(String),
}

/// Blocking source of mono 16-bit frames. A return of 0 means "nothing this
/// time" (transient underrun or shutdown in progress); callers skip the
/// iteration and poll again.
pub trait CaptureSource: Send {
  fn read(&mut self, buf: &mut [i16]) -> usize;
}

/// Sink for processed mono 16-bit frames. Best effort: a saturated or
/// closed device queue drops the frame.
pub trait PlaybackSink: Send {
  fn write(&mut self, frame: &[i16]);
}

pub struct ChannelCapture {
  rx: Receiver<Vec<i16>>,
}

impl ChannelCapture {
  pub fn new(rx: Receiver<Vec<i16>>) -> Self {
    Self { rx }
  }
}

impl CaptureSource for ChannelCapture {
  fn read(&mut self, buf: &mut [i16]) -> usize {
    match self.rx.recv_timeout(READ_TIMEOUT) {
      Ok(frame) => {
        let n = frame.len().min(buf.len());
        buf[..n].copy_from_slice(&frame[..n]);
        n
      }
      Err(_) => 0,
    }
  }
}

pub struct ChannelPlayback {
  tx: Sender<Vec<i16>>,
}

impl ChannelPlayback {
  pub fn new(tx: Sender<Vec<i16>>) -> Self {
    Self { tx }
  }
}

impl PlaybackSink for ChannelPlayback {
  fn write(&mut self, frame: &[i16]) {
    if self.tx.try_send(frame.to_vec()).is_err() {
      log::trace!("playback queue full; frame dropped");
    }
  }
}

/// First supported config that covers one of the wanted rates, most
/// preferred rate first. Only formats the stream builders handle qualify.
fn config_at_rate(
  ranges: &[cpal::SupportedStreamConfigRange],
  rates: &[u32],
) -> Option<cpal::SupportedStreamConfig> {
  for &sr in rates {
    for r in ranges {
      let fmt = r.sample_format();
      if fmt != cpal::SampleFormat::F32 && fmt != cpal::SampleFormat::I16 {
        continue;
      }
      if r.min_sample_rate().0 <= sr && r.max_sample_rate().0 >= sr {
        return Some(r.clone().with_sample_rate(cpal::SampleRate(sr)));
      }
    }
  }
  None
}

pub struct OutputEndpoint {
  pub stream: cpal::Stream,
  pub frames: Sender<Vec<i16>>,
  pub sample_rate: u32,
}

pub fn open_output(rates: &[u32]) -> Result<OutputEndpoint, AudioError> {
  let host = cpal::default_host();
  let device = host.default_output_device().ok_or(AudioError::NoOutputDevice)?;
  let supported: Vec<_> = device
    .supported_output_configs()
    .map(|c| c.collect())
    .unwrap_or_default();
  let config = match config_at_rate(&supported, rates) {
    Some(c) => c,
    None => device
      .default_output_config()
      .map_err(|e| AudioError::OutputStream(e.to_string()))?,
  };
  let mut cfg: cpal::StreamConfig = config.clone().into();
  // Request a larger buffer for better stability; reduces underruns
  cfg.buffer_size = cpal::BufferSize::Fixed(FRAME_LEN as u32);
  let sample_rate = cfg.sample_rate.0;
  let channels = (cfg.channels as usize).max(1);
  let (tx, rx) = bounded::<Vec<i16>>(FRAME_QUEUE);
  let err_fn = |e: cpal::StreamError| log::warn!("output stream error: {e}");
  let stream = match config.sample_format() {
    cpal::SampleFormat::F32 => {
      let mut feed = OutputFeed::new(rx);
      device.build_output_stream(
        &cfg,
        move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
          for frame in data.chunks_mut(channels) {
            let v = feed.next_sample() as f32 / 32_768.0;
            for out in frame {
              *out = v;
            }
          }
        },
        err_fn,
        None,
      )
    }
    cpal::SampleFormat::I16 => {
      let mut feed = OutputFeed::new(rx);
      device.build_output_stream(
        &cfg,
        move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
          for frame in data.chunks_mut(channels) {
            let v = feed.next_sample();
            for out in frame {
              *out = v;
            }
          }
        },
        err_fn,
        None,
      )
    }
    other => return Err(AudioError::UnsupportedFormat(format!("{other:?}"))),
  }
  .map_err(|e| AudioError::OutputStream(e.to_string()))?;
  Ok(OutputEndpoint { stream, frames: tx, sample_rate })
}

/// Reassembles queued worker frames into the device callback cadence,
/// zero-filling on underrun (mono fans out to every device channel).
struct OutputFeed {
  rx: Receiver<Vec<i16>>,
  current: Vec<i16>,
  offset: usize,
}

impl OutputFeed {
  fn new(rx: Receiver<Vec<i16>>) -> Self {
    Self { rx, current: Vec::new(), offset: 0 }
  }

  #[inline]
  fn next_sample(&mut self) -> i16 {
    if self.offset >= self.current.len() {
      match self.rx.try_recv() {
        Ok(f) => {
          self.current = f;
          self.offset = 0;
        }
        Err(_) => return 0,
      }
      if self.current.is_empty() {
        return 0;
      }
    }
    let s = self.current[self.offset];
    self.offset += 1;
    s
  }
}

pub struct InputEndpoint {
  pub stream: cpal::Stream,
  pub frames: Receiver<Vec<i16>>,
  pub sample_rate: u32,
}

/// Opens the default microphone at `rate` when it supports it (its own
/// default config otherwise), downmixing interleaved channels to mono i16
/// frames of `FRAME_LEN` samples.
pub fn open_input(rate: u32) -> Result<InputEndpoint, AudioError> {
  let host = cpal::default_host();
  let device = host.default_input_device().ok_or(AudioError::NoInputDevice)?;
  let supported: Vec<_> = device
    .supported_input_configs()
    .map(|c| c.collect())
    .unwrap_or_default();
  let config = match config_at_rate(&supported, &[rate]) {
    Some(c) => c,
    None => device
      .default_input_config()
      .map_err(|e| AudioError::InputStream(e.to_string()))?,
  };
  let mut cfg: cpal::StreamConfig = config.clone().into();
  cfg.buffer_size = cpal::BufferSize::Fixed(FRAME_LEN as u32);
  let sample_rate = cfg.sample_rate.0;
  let channels = (cfg.channels as usize).max(1);
  let (tx, rx) = bounded::<Vec<i16>>(FRAME_QUEUE);
  let err_fn = |e: cpal::StreamError| log::warn!("input stream error: {e}");
  let stream = match config.sample_format() {
    cpal::SampleFormat::F32 => {
      let mut pending: Vec<i16> = Vec::with_capacity(FRAME_LEN);
      device.build_input_stream(
        &cfg,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
          for frame in data.chunks(channels) {
            let mut acc = 0.0f32;
            for &s in frame {
              acc += s;
            }
            let mono = acc / frame.len() as f32;
            push_mono(&tx, &mut pending, (mono.clamp(-1.0, 1.0) * 32_767.0) as i16);
          }
        },
        err_fn,
        None,
      )
    }
    cpal::SampleFormat::I16 => {
      let mut pending: Vec<i16> = Vec::with_capacity(FRAME_LEN);
      device.build_input_stream(
        &cfg,
        move |data: &[i16], _: &cpal::InputCallbackInfo| {
          for frame in data.chunks(channels) {
            let mut acc = 0i32;
            for &s in frame {
              acc += s as i32;
            }
            push_mono(&tx, &mut pending, (acc / frame.len() as i32) as i16);
          }
        },
        err_fn,
        None,
      )
    }
    other => return Err(AudioError::UnsupportedFormat(format!("{other:?}"))),
  }
  .map_err(|e| AudioError::InputStream(e.to_string()))?;
  Ok(InputEndpoint { stream, frames: rx, sample_rate })
}

#[inline]
fn push_mono(tx: &Sender<Vec<i16>>, pending: &mut Vec<i16>, sample: i16) {
  pending.push(sample);
  if pending.len() >= FRAME_LEN {
    let full = std::mem::replace(pending, Vec::with_capacity(FRAME_LEN));
    if tx.try_send(full).is_err() {
      log::trace!("capture queue full; frame dropped");
    }
  }
}
