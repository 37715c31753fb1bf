use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use voicebox::{AudioEngine, DspParams};

/// Streams the default microphone to the default speaker through the
/// effect chain. Optional argument: a JSON parameter file in the wire
/// shape (camelCase fields, all optional).
fn main() -> Result<()> {
  let params = match std::env::args().nth(1) {
    Some(path) => {
      let text = std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
      serde_json::from_str::<DspParams>(&text).with_context(|| format!("parsing {path}"))?
    }
    None => DspParams::default(),
  };

  let mut engine = AudioEngine::new();
  engine.apply(params);
  engine.start().context("starting audio")?;
  println!("streaming mic to speaker; press Enter to stop");

  let levels = engine.levels();
  let meter = std::thread::spawn(move || {
    while let Ok(level) = levels.recv() {
      let ticks = (level * 40.0) as usize;
      print!("\r[{:<40}] {:.3}", "#".repeat(ticks.min(40)), level);
      let _ = std::io::stdout().flush();
    }
  });

  let mut line = String::new();
  let _ = std::io::stdin().lock().read_line(&mut line);
  engine.stop();
  drop(engine);
  let _ = meter.join();
  println!();
  Ok(())
}
