pub mod analysis;
pub mod coaching;
pub mod pose;
pub mod replay;
pub mod sensing;
pub mod session;
pub mod settings;

use std::path::PathBuf;

use anyhow::{bail, Result};
use log::LevelFilter;

use replay::{replay, Recording};
use settings::SettingsStore;

/// Replays a recorded session and prints what the coach would have said.
///
/// Usage: `rallycoach <recording.json> [settings.json]`
pub fn run() -> Result<()> {
    let debug_mode = std::env::var("RALLYCOACH_DEBUG")
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    env_logger::Builder::from_default_env()
        .filter_level(if debug_mode {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        })
        .init();

    let mut args = std::env::args().skip(1);
    let Some(recording_path) = args.next().map(PathBuf::from) else {
        bail!("usage: rallycoach <recording.json> [settings.json]");
    };

    let settings = match args.next() {
        Some(path) => SettingsStore::new(PathBuf::from(path))?.get(),
        None => Default::default(),
    };

    log::info!("replaying {}", recording_path.display());
    let recording = Recording::load(&recording_path)?;
    let outcome = replay(&recording, &settings);

    for line in &outcome.spoken {
        let secs = line.offset_ms / 1000;
        println!("[{:02}:{:02}] {}", secs / 60, secs % 60, line.text);
    }
    if let Some(review) = &outcome.review {
        println!();
        println!("{}", review.render_markdown());
    }
    Ok(())
}
