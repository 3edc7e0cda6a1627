// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use pianorec::config::StudioConfig;
use pianorec::recording::SmfSummary;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn print_usage() {
    println!("pianorec - MIDI performance recorder");
    println!();
    println!("Usage: pianorec [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --list-sources          List available MIDI sources (inputs)");
    println!("  --record [N] [SECONDS]  Record from source N (default: all) and save a .mid file");
    println!("  --inspect <FILE>        Print a summary of a MIDI file");
    println!("  --config <PATH>         Studio config (.yaml or .toml), reloaded on change");
    println!("  --help                  Show this help message");
}

fn init_logging() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("pianorec=info")),
        )
        .init();
}

fn load_config(path: Option<&Path>) -> Result<StudioConfig> {
    match path {
        Some(path) => StudioConfig::load(path),
        None => Ok(StudioConfig::default()),
    }
}

fn inspect_file(path: &Path) -> Result<()> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read {:?}", path))?;
    let summary = SmfSummary::parse(&bytes)?;

    println!("{}: {}", path.display(), summary);
    for (i, track) in summary.tracks.iter().enumerate() {
        println!(
            "  track {}: {} bytes, {} events, ends at tick {}",
            i,
            track.length,
            track.events.len(),
            track.end_tick()
        );
    }
    Ok(())
}

#[cfg(feature = "live-input")]
fn list_sources() -> Result<()> {
    pianorec::midi::print_sources();
    Ok(())
}

#[cfg(not(feature = "live-input"))]
fn list_sources() -> Result<()> {
    Err(anyhow!("Built without MIDI input; rebuild with --features live-input"))
}

#[cfg(feature = "live-input")]
fn record(
    config: &StudioConfig,
    config_path: Option<&Path>,
    source: Option<usize>,
    seconds: Option<u64>,
) -> Result<()> {
    use std::thread;
    use std::time::{Duration, Instant};

    use pianorec::config::ConfigWatcher;
    use pianorec::midi::{EventSource, MidiInput};
    use pianorec::recording::{save_to_dir, SharedSession};
    use pianorec::timing::{SharedTempo, TempoProvider};
    use pianorec::RecordingError;

    let tempo = SharedTempo::new(config.tempo_signature());
    let watcher = config_path
        .map(|path| ConfigWatcher::new(path, None))
        .transpose()?;

    let mut input = match source.or(config.input.source) {
        Some(index) => {
            println!("Connecting to MIDI source {}...", index);
            MidiInput::new(index)?
        }
        None => {
            println!("Connecting to all MIDI sources...");
            MidiInput::all()?
        }
    };

    let session = SharedSession::default();
    input.attach(session.clone())?;
    session.start();

    let run_duration = Duration::from_secs(seconds.unwrap_or(config.recording.max_seconds));
    println!(
        "Recording from {} for {}s (press Ctrl+C to abort)...",
        input.name(),
        run_duration.as_secs()
    );

    let start_time = Instant::now();
    let mut last_count = 0;

    while start_time.elapsed() < run_duration {
        if let Some(updated) = watcher.as_ref().and_then(|w| w.latest()) {
            tempo.set(updated.tempo_signature());
            let sig = tempo.tempo_signature();
            println!(
                "Tempo now {} BPM, {}/{}",
                sig.bpm,
                sig.beats_per_measure,
                sig.normalized_beat_unit()
            );
        }

        let count = session.note_on_count();
        if count != last_count {
            last_count = count;
            println!("Notes: {}", count);
        }

        thread::sleep(Duration::from_millis(50));
    }

    input.detach();

    let bytes = match session.export(&tempo) {
        Ok(bytes) => bytes,
        Err(RecordingError::EmptyRecording) => {
            println!("No notes recorded!");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let path = save_to_dir(&config.recording.output_dir, &bytes)?;
    println!("Saved {} ({})", path.display(), SmfSummary::parse(&bytes)?);
    Ok(())
}

#[cfg(not(feature = "live-input"))]
fn record(
    _config: &StudioConfig,
    _config_path: Option<&Path>,
    _source: Option<usize>,
    _seconds: Option<u64>,
) -> Result<()> {
    Err(anyhow!("Built without MIDI input; rebuild with --features live-input"))
}

fn parse_number<T: std::str::FromStr>(arg: Option<&String>) -> Option<T> {
    arg.and_then(|a| a.parse().ok())
}

fn main() -> Result<()> {
    init_logging();

    let mut args: Vec<String> = env::args().skip(1).collect();

    // --config may appear anywhere
    let mut config_path: Option<PathBuf> = None;
    if let Some(pos) = args.iter().position(|a| a == "--config") {
        if pos + 1 >= args.len() {
            eprintln!("Error: --config requires a path");
            std::process::exit(1);
        }
        config_path = Some(PathBuf::from(args.remove(pos + 1)));
        args.remove(pos);
    }

    if args.is_empty() {
        println!("pianorec - MIDI performance recorder");
        println!("Run with --help for usage information");
        return Ok(());
    }

    match args[0].as_str() {
        "--list-sources" => {
            list_sources()?;
        }
        "--record" => {
            let source: Option<usize> = parse_number(args.get(1));
            if args.len() >= 2 && source.is_none() {
                return Err(anyhow!("Invalid source number: {}", args[1]));
            }
            let seconds: Option<u64> = parse_number(args.get(2));
            let config = load_config(config_path.as_deref())?;
            record(&config, config_path.as_deref(), source, seconds)?;
        }
        "--inspect" => {
            if args.len() < 2 {
                eprintln!("Error: --inspect requires a file");
                std::process::exit(1);
            }
            inspect_file(Path::new(&args[1]))?;
        }
        "--help" | "-h" => {
            print_usage();
        }
        _ => {
            eprintln!("Unknown option: {}", args[0]);
            print_usage();
            std::process::exit(1);
        }
    }

    Ok(())
}
