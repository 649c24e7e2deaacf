//! # Command-Line Interface Module
//!
//! Clap derive definitions for the `mixflow` binary. The CLI is a demo and
//! inspection surface over the engine: it simulates selection sessions and
//! prints catalogue/key diagnostics. The real orchestrator drives the
//! library API directly.
//!
//! ## Examples
//!
//! ```bash
//! mixflow simulate --catalogue tracks.json --count 20
//! mixflow stats --catalogue tracks.json
//! mixflow keys --from 8
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Main application arguments structure.
#[derive(Parser)]
#[command(name = "mixflow")]
#[command(about = "Mixflow: harmonically-aware track selection for automated mixing sessions")]
#[command(version)]
pub struct Args {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Enumeration of all available subcommands.
#[derive(Subcommand)]
pub enum Command {
    /// Simulate a selection session and print every decision
    Simulate {
        /// Path to a JSON catalogue file (array of tracks)
        #[arg(long)]
        catalogue: PathBuf,

        /// Number of selections to run
        #[arg(long, default_value = "20")]
        count: u32,

        /// Tempo to stamp on results, in BPM
        #[arg(long)]
        tempo: Option<u16>,

        /// Disable the periodic wildcard selection
        #[arg(long)]
        no_wildcard: bool,

        /// Optional engine config file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Skip the durable entropy-cache storage (in-memory only)
        #[arg(long)]
        ephemeral: bool,
    },

    /// Print aggregate statistics for a catalogue
    Stats {
        /// Path to a JSON catalogue file (array of tracks)
        #[arg(long)]
        catalogue: PathBuf,
    },

    /// Search a catalogue by artist or title substring
    Search {
        /// Path to a JSON catalogue file (array of tracks)
        #[arg(long)]
        catalogue: PathBuf,

        /// Case-insensitive search text
        text: String,
    },

    /// Print the compatibility row and progression order for a key
    Keys {
        /// Key to inspect, 1..=12
        #[arg(long, default_value = "1")]
        from: u8,
    },
}
