use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use cpal::traits::StreamTrait;
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};

use crate::engine::chain::FxChain;
use crate::engine::dsp::meter::rms_level;
use crate::engine::io::{
  self, AudioError, CaptureSource, ChannelCapture, ChannelPlayback, PlaybackSink, FRAME_LEN,
};
use crate::engine::params::DspParams;

/// Stream rates to try, most compatible first.
const PREFERRED_RATES: [u32; 2] = [44_100, 48_000];
/// Level events buffered for a slow consumer before values are dropped.
const LEVEL_QUEUE: usize = 16;

/// Live mic-to-speaker engine. Owns the platform endpoints and the worker
/// thread that runs the effect chain; parameter snapshots hot-swap through
/// a queue the worker drains at buffer boundaries, so only the worker ever
/// touches per-sample DSP state.
pub struct AudioEngine {
  params: DspParams,
  param_tx: Option<Sender<DspParams>>,
  level_tx: Sender<f32>,
  level_rx: Receiver<f32>,
  stop: Arc<AtomicBool>,
  worker: Option<JoinHandle<()>>,
  streams: Vec<cpal::Stream>,
}

impl AudioEngine {
  pub fn new() -> Self {
    let (level_tx, level_rx) = bounded(LEVEL_QUEUE);
    Self {
      params: DspParams::default(),
      param_tx: None,
      level_tx,
      level_rx,
      stop: Arc::new(AtomicBool::new(false)),
      worker: None,
      streams: Vec::new(),
    }
  }

  /// One RMS value in [0, 1] per processed buffer; values are dropped when
  /// the consumer lags.
  pub fn levels(&self) -> Receiver<f32> {
    self.level_rx.clone()
  }

  pub fn is_running(&self) -> bool {
    self.worker.is_some()
  }

  /// Acquire capture and playback endpoints and enter the streaming loop.
  /// A no-op when already running. On any acquisition failure everything
  /// built so far is released and the engine stays stopped.
  pub fn start(&mut self) -> Result<(), AudioError> {
    if self.worker.is_some() {
      return Ok(());
    }
    let output = io::open_output(&PREFERRED_RATES)?;
    let sample_rate = output.sample_rate;
    // Capture at the playback rate so the whole chain runs on one clock.
    let input = io::open_input(sample_rate)?;
    if input.sample_rate != sample_rate {
      log::warn!(
        "capture runs at {} Hz but playback at {} Hz; pitch will drift",
        input.sample_rate,
        sample_rate
      );
    }
    input
      .stream
      .play()
      .map_err(|e| AudioError::InputStream(e.to_string()))?;
    output
      .stream
      .play()
      .map_err(|e| AudioError::OutputStream(e.to_string()))?;
    log::info!("stream running at {sample_rate} Hz");

    let stop = Arc::new(AtomicBool::new(false));
    let (param_tx, param_rx) = unbounded();
    let capture = ChannelCapture::new(input.frames);
    let playback = ChannelPlayback::new(output.frames);
    let initial = self.params.clone();
    let level_tx = self.level_tx.clone();
    let stop_flag = stop.clone();
    let worker = std::thread::spawn(move || {
      run_stream(capture, playback, sample_rate, initial, param_rx, level_tx, stop_flag);
    });

    self.stop = stop;
    self.param_tx = Some(param_tx);
    self.worker = Some(worker);
    self.streams = vec![input.stream, output.stream];
    Ok(())
  }

  /// Hot-swap the parameter snapshot. Never blocks; the worker picks the
  /// update up at its next buffer boundary. Also valid while stopped: the
  /// snapshot seeds the chain on the next start.
  pub fn apply(&mut self, params: DspParams) {
    if let Some(tx) = &self.param_tx {
      let _ = tx.send(params.clone());
    }
    self.params = params;
  }

  /// Cooperative teardown: flag the worker, join it, release the devices.
  /// Idempotent, and release failures are swallowed.
  pub fn stop(&mut self) {
    self.stop.store(true, Ordering::Relaxed);
    self.param_tx = None;
    if let Some(worker) = self.worker.take() {
      if worker.join().is_err() {
        log::warn!("stream worker panicked during shutdown");
      }
    }
    for s in self.streams.drain(..) {
      if let Err(e) = s.pause() {
        log::warn!("pausing stream failed: {e}");
      }
      // dropping the stream releases the device
    }
  }
}

impl Default for AudioEngine {
  fn default() -> Self {
    Self::new()
  }
}

impl Drop for AudioEngine {
  fn drop(&mut self) {
    self.stop();
  }
}

/// The per-buffer worker loop. All DSP state lives on this thread; queued
/// snapshots are drained (last one wins) before each read, so a torn
/// configuration can never be observed mid-buffer.
fn run_stream<C: CaptureSource, P: PlaybackSink>(
  mut capture: C,
  mut playback: P,
  sample_rate: u32,
  initial: DspParams,
  params: Receiver<DspParams>,
  levels: Sender<f32>,
  stop: Arc<AtomicBool>,
) {
  let mut chain = FxChain::new(sample_rate);
  chain.configure(&initial);
  let mut buf = vec![0i16; FRAME_LEN];
  while !stop.load(Ordering::Relaxed) {
    let mut latest = None;
    while let Ok(p) = params.try_recv() {
      latest = Some(p);
    }
    if let Some(p) = latest {
      chain.configure(&p);
    }
    let n = capture.read(&mut buf);
    if n == 0 {
      continue;
    }
    let frame = &mut buf[..n.min(FRAME_LEN)];
    let _ = levels.try_send(rms_level(frame));
    chain.process(frame);
    playback.write(frame);
  }
}
