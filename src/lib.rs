//! Harmonically-aware track selection for automated mixing sessions.
//!
//! Mixflow picks the next track for a continuous mix: full catalogue
//! coverage without immediate repetition, musically compatible key
//! transitions, and unpredictable ordering backed by a cached external
//! entropy source.
//!
//! Core modules:
//! - [`catalogue`] - Track collection and played-state queries
//! - [`keys`] - Key progression and the compatibility table
//! - [`random`] - Cached randomness with background refill and fallback
//! - [`selector`] - The per-call selection algorithm
//!
//! ### Supporting Modules
//!
//! - [`track`] - Track data model and load-time validation
//! - [`entropy`] - HTTP client for the external entropy service
//! - [`storage`] - Durable key-value storage adapters
//! - [`config`] - Configuration and data directory management
//! - [`cli`] - Command-line interface definitions
//!
//! ## Quick Start Example
//!
//! ```no_run
//! use mixflow::catalogue::Catalogue;
//! use mixflow::random::{RandomConfig, RandomSource};
//! use mixflow::selector::{SelectorConfig, SongSelector};
//! use mixflow::track::Track;
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let catalogue = Catalogue::new(vec![
//!     Track {
//!         id: 1,
//!         artist: "Aria North".to_string(),
//!         title: "Glasswork".to_string(),
//!         key: 1,
//!         native_tempo: 94,
//!     },
//!     Track {
//!         id: 2,
//!         artist: "Basalt Choir".to_string(),
//!         title: "Ember Lines".to_string(),
//!         key: 8,
//!         native_tempo: 94,
//!     },
//! ])?;
//!
//! let random = RandomSource::new(RandomConfig::default())?;
//! let mut selector = SongSelector::new(catalogue, random, SelectorConfig::default());
//!
//! let decision = selector.select_track().await?;
//! println!(
//!     "{} - {} ({}, key {}, score {})",
//!     decision.track.artist,
//!     decision.track.title,
//!     decision.track_type,
//!     decision.track.key,
//!     decision.compatibility_score
//! );
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Only two failure classes ever reach callers: catalogue validation errors
//! at load time ([`track::TrackError`]) and argument errors on the random
//! source ([`random::RandomError`]). Entropy-service failures and catalogue
//! exhaustion are recovered internally; steady-state selection does not fail.
//!
//! ## Logging
//!
//! All modules log through the `log` facade; binaries initialize
//! `env_logger`, so `RUST_LOG=mixflow=debug` traces selection decisions.

pub mod catalogue;
pub mod cli;
pub mod config;
pub mod entropy;
pub mod keys;
pub mod random;
pub mod selector;
pub mod storage;
pub mod track;
