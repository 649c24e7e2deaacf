//! # Mixflow - Harmonic Track Selection
//!
//! CLI entry point. Routes subcommands to the engine library; all real
//! selection logic lives in the library modules.
//!
//! ## Logging
//!
//! Initializes the environment logger, controlled via `RUST_LOG`:
//! - `RUST_LOG=debug mixflow simulate ...` - full decision tracing
//! - `RUST_LOG=mixflow::selector=trace ...` - module-specific logging

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::info;
use std::sync::Arc;

use mixflow::catalogue::Catalogue;
use mixflow::cli::{Args, Command};
use mixflow::config::{self, EngineConfig};
use mixflow::keys::KeyProgression;
use mixflow::random::RandomSource;
use mixflow::selector::SongSelector;
use mixflow::storage::{KeyValueStorage, NullStorage, SqliteStorage};
use mixflow::track::KEY_COUNT;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();
    match args.command {
        Command::Simulate {
            catalogue,
            count,
            tempo,
            no_wildcard,
            config,
            ephemeral,
        } => {
            let engine_config = match config {
                Some(path) => EngineConfig::from_file(&path)?,
                None => EngineConfig::default(),
            };
            simulate(
                Catalogue::from_json_file(&catalogue)?,
                engine_config,
                count,
                tempo,
                no_wildcard,
                ephemeral,
            )
            .await?;
        }
        Command::Stats { catalogue } => {
            print_stats(&Catalogue::from_json_file(&catalogue)?);
        }
        Command::Search { catalogue, text } => {
            let catalogue = Catalogue::from_json_file(&catalogue)?;
            let hits = catalogue.search(&text);
            println!("{} of {} tracks match `{text}'", hits.len(), catalogue.total());
            for track in hits {
                println!(
                    "  {:>4}  {} - {} (key {}, {} BPM)",
                    track.id, track.artist, track.title, track.key, track.native_tempo
                );
            }
        }
        Command::Keys { from } => {
            print_keys(from)?;
        }
    }

    Ok(())
}

/// Run a selection session against the given catalogue and print every
/// decision the engine makes.
async fn simulate(
    catalogue: Catalogue,
    mut engine_config: EngineConfig,
    count: u32,
    tempo: Option<u16>,
    no_wildcard: bool,
    ephemeral: bool,
) -> Result<()> {
    if no_wildcard {
        engine_config.selector.wildcard_enabled = false;
    }

    let storage: Arc<dyn KeyValueStorage> = if ephemeral {
        Arc::new(NullStorage)
    } else {
        let path = config::get_storage_path()?;
        Arc::new(SqliteStorage::open(&path)?)
    };

    let random = RandomSource::with_storage(engine_config.random, storage)
        .context("Failed to build randomness source")?;
    let mut selector = SongSelector::new(catalogue, random, engine_config.selector);
    if let Some(tempo) = tempo {
        selector.set_tempo(tempo);
    }

    info!("Simulating {count} selections");
    for n in 1..=count {
        let decision = selector.select_track().await?;
        println!(
            "{n:>4}. {} - {} [{}] key {} score {}{}",
            decision.track.artist,
            decision.track.title,
            decision.track_type,
            decision.track.key,
            decision.compatibility_score,
            if decision.was_wildcard { "  (wildcard)" } else { "" },
        );
    }

    let stats = selector.stats();
    println!();
    println!("Session: {} selections at {} BPM", stats.track_count, stats.current_tempo);
    println!(
        "Catalogue: {} played, {} remaining, key now {}",
        stats.songs_played, stats.songs_remaining, stats.current_key
    );

    Ok(())
}

fn print_stats(catalogue: &Catalogue) {
    let stats = catalogue.stats();
    println!("{} tracks, {} unique artists", catalogue.total(), stats.unique_artists);

    let mut tempos: Vec<_> = stats.tracks_per_tempo.iter().collect();
    tempos.sort();
    for (tempo, count) in tempos {
        println!("  {tempo:>3} BPM: {count}");
    }

    let mut keys: Vec<_> = stats.tracks_per_key.iter().collect();
    keys.sort();
    for (key, count) in keys {
        println!("  key {key:>2}: {count}");
    }

    println!(
        "Most common: {} BPM, key {}",
        stats.most_common_tempo, stats.most_common_key
    );
}

fn print_keys(from: u8) -> Result<()> {
    if !(1..=KEY_COUNT).contains(&from) {
        bail!("key must be in 1..={KEY_COUNT}, got {from}");
    }

    println!("Keys by compatibility with key {from}:");
    for key in KeyProgression::compatible_keys(from) {
        let score = KeyProgression::score_compatibility(from, key);
        let marker = if KeyProgression::is_highly_compatible(from, key) {
            " *"
        } else {
            ""
        };
        println!("  key {key:>2}: score {score:>2}{marker}");
    }
    Ok(())
}
