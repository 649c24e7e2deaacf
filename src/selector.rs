//! # Selector Module
//!
//! The per-call decision algorithm that turns catalogue, key progression and
//! random source into a single `select_track()` choice.
//!
//! ## Selection shape
//!
//! Every Nth call (the wildcard rule) ignores key pressure entirely and draws
//! uniformly from the unplayed catalogue. All other calls build a candidate
//! set through four escalating tiers, score it against the current key, keep
//! the best few, and draw uniformly from that pool — selection pressure
//! comes from the pre-filter and sort, not from weighting inside the pool.
//!
//! Exhaustion is never an error: every tier bottoms out at "reset the
//! played-set and use the whole catalogue".

use crate::catalogue::{Catalogue, FilterCriteria};
use crate::keys::KeyProgression;
use crate::random::{RandomError, RandomSource};
use crate::track::{Track, TrackType};
use log::{debug, info, trace};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Tuning knobs for the selection algorithm.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// Enable the periodic wildcard selection.
    pub wildcard_enabled: bool,
    /// Every `wildcard_interval`-th call is a wildcard (when enabled).
    /// An interval of 0 disables the wildcard rule.
    pub wildcard_interval: u64,
    /// Candidates scoring below this against the current key are filtered
    /// out (when that leaves any candidates at all).
    pub min_compatibility_score: u8,
    /// Size of the final pool the uniform draw happens from.
    pub candidate_pool_size: usize,
    /// Key the progression starts at.
    pub initial_key: u8,
    /// Tempo stamped on results until `set_tempo` changes it.
    pub default_tempo: u16,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            wildcard_enabled: true,
            wildcard_interval: 5,
            min_compatibility_score: 5,
            candidate_pool_size: 5,
            initial_key: 1,
            default_tempo: 94,
        }
    }
}

/// Where the candidate set for a normal selection came from.
///
/// The tiers escalate: each is tried only when every earlier one came up
/// empty, and the last one cannot be empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CandidateTier {
    /// Unplayed tracks at the current key.
    CurrentKey,
    /// Unplayed tracks at compatible keys, best keys first.
    CompatibleKeys,
    /// Catalogue was reset; all tracks at the current key.
    ResetCurrentKey,
    /// Any unplayed track, or the whole catalogue after a final reset.
    AnyTrack,
}

/// One selection decision. Returned to the orchestrator, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionResult {
    pub track: Track,
    pub track_type: TrackType,
    /// The tempo the selector was set to when this decision was made.
    pub tempo: u16,
    /// True when the wildcard (magic-number) rule made this pick.
    pub was_wildcard: bool,
    /// Size of the candidate set the pick was drawn from, pre-truncation.
    pub candidate_count: usize,
    /// Score of the chosen track's key against the key current after this
    /// call (the key the next transition will be judged from).
    pub compatibility_score: u8,
}

/// Session stats snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorStats {
    pub track_count: u64,
    pub current_key: u8,
    pub current_tempo: u16,
    pub songs_played: usize,
    pub songs_remaining: usize,
    pub last_track_type: Option<TrackType>,
}

/// Stateful track selector for one mixing session. Single writer: callers
/// serialize `select_track()`.
#[derive(Debug)]
pub struct SongSelector {
    catalogue: Catalogue,
    keys: KeyProgression,
    random: RandomSource,
    config: SelectorConfig,
    tempo: u16,
    track_count: u64,
    last_track_type: Option<TrackType>,
}

impl SongSelector {
    #[must_use]
    pub fn new(catalogue: Catalogue, random: RandomSource, config: SelectorConfig) -> Self {
        let mut keys = KeyProgression::default();
        keys.set_key(config.initial_key);
        let tempo = config.default_tempo;
        Self {
            catalogue,
            keys,
            random,
            config,
            tempo,
            track_count: 0,
            last_track_type: None,
        }
    }

    /// Select the next track for the session.
    ///
    /// # Errors
    ///
    /// Only [`RandomError`] from the randomness source; exhaustion of the
    /// catalogue is always recovered internally.
    pub async fn select_track(&mut self) -> Result<SelectionResult, RandomError> {
        self.track_count += 1;
        let first_call = self.track_count == 1;

        let is_wildcard = self.config.wildcard_enabled
            && self.config.wildcard_interval != 0
            && self.track_count % self.config.wildcard_interval == 0;

        let (track, candidate_count) = if is_wildcard {
            self.select_wildcard().await?
        } else {
            self.select_normal().await?
        };

        let track_type = self.next_track_type();
        self.catalogue.mark_played(track.id);

        // The very first call leaves the key untouched so the first decision
        // and the initial externally-visible key agree.
        if !first_call {
            self.keys.next();
        }
        let compatibility_score = self.keys.score_from_current(track.key);
        self.last_track_type = Some(track_type);

        info!(
            "Selected #{} `{} - {}' (key {}, {}, score {}{})",
            self.track_count,
            track.artist,
            track.title,
            track.key,
            track_type,
            compatibility_score,
            if is_wildcard { ", wildcard" } else { "" }
        );

        Ok(SelectionResult {
            track,
            track_type,
            tempo: self.tempo,
            was_wildcard: is_wildcard,
            candidate_count,
            compatibility_score,
        })
    }

    /// Wildcard selection: all unplayed tracks, no key pressure; a uniform
    /// draw after an auto-reset when the catalogue is exhausted.
    async fn select_wildcard(&mut self) -> Result<(Track, usize), RandomError> {
        let mut pool = self.catalogue.all_unplayed();
        if pool.is_empty() {
            debug!("Wildcard found catalogue exhausted, resetting");
            self.catalogue.reset();
            pool = self.catalogue.all_tracks();
        }
        let count = pool.len();
        debug!("Wildcard selection from {count} unplayed tracks");
        let track = self.random.choice(&pool).await?.clone();
        Ok((track, count))
    }

    /// Normal selection: tiered candidate gathering, score/sort/truncate,
    /// then a uniform draw from the surviving pool.
    async fn select_normal(&mut self) -> Result<(Track, usize), RandomError> {
        let current_key = self.keys.current_key();
        let (tier, candidates) = self.gather_candidates(current_key);
        debug!(
            "Tier {tier:?} produced {} candidates at key {current_key}",
            candidates.len()
        );

        let mut scored: Vec<(Track, u8)> = candidates
            .into_iter()
            .map(|t| {
                let score = KeyProgression::score_compatibility(current_key, t.key);
                (t, score)
            })
            .collect();

        let filtered: Vec<(Track, u8)> = scored
            .iter()
            .filter(|(_, score)| *score >= self.config.min_compatibility_score)
            .cloned()
            .collect();
        // The deep-fallback tiers can surface only incompatible keys; keep
        // the unfiltered set then so the selection still progresses.
        if !filtered.is_empty() {
            scored = filtered;
        }

        scored.sort_by(|a, b| b.1.cmp(&a.1));
        let candidate_count = scored.len();
        scored.truncate(self.config.candidate_pool_size);

        let pool: Vec<Track> = scored.into_iter().map(|(t, _)| t).collect();
        trace!("Drawing uniformly from pool of {}", pool.len());
        let track = self.random.choice(&pool).await?.clone();
        Ok((track, candidate_count))
    }

    /// Build the candidate set from the first non-empty tier.
    fn gather_candidates(&mut self, current_key: u8) -> (CandidateTier, Vec<Track>) {
        // Tier a: unplayed at the current key.
        let at_key = self.catalogue.unplayed(&FilterCriteria::by_key(current_key));
        if !at_key.is_empty() {
            return (CandidateTier::CurrentKey, at_key);
        }

        // Tier b: unplayed at compatible keys, best first, until the pool is
        // comfortably oversubscribed.
        let target = self.config.candidate_pool_size * 2;
        let mut compatible = Vec::new();
        for key in KeyProgression::compatible_keys(current_key) {
            if key == current_key {
                continue;
            }
            if KeyProgression::score_compatibility(current_key, key)
                < self.config.min_compatibility_score
            {
                break; // keys are in descending score order
            }
            compatible.extend(self.catalogue.unplayed(&FilterCriteria::by_key(key)));
            if compatible.len() >= target {
                break;
            }
        }
        if !compatible.is_empty() {
            return (CandidateTier::CompatibleKeys, compatible);
        }

        // Tier c: reset, then everything at the current key.
        debug!("No unplayed compatible tracks, resetting catalogue");
        self.catalogue.reset();
        let at_key = self.catalogue.filter(&FilterCriteria::by_key(current_key));
        if !at_key.is_empty() {
            return (CandidateTier::ResetCurrentKey, at_key);
        }

        // Tier d: anything unplayed, else the whole catalogue. The catalogue
        // is non-empty by construction, so this tier cannot come up empty.
        let unplayed = self.catalogue.all_unplayed();
        if !unplayed.is_empty() {
            return (CandidateTier::AnyTrack, unplayed);
        }
        self.catalogue.reset();
        (CandidateTier::AnyTrack, self.catalogue.all_tracks())
    }

    /// Lead/body alternation: first call is always Lead, a Lead is always
    /// followed by Body, and after a Body the session leans 70/30 towards a
    /// fresh Lead. A fast non-crypto coin is fine here — this choice carries
    /// no fairness or exhaustion requirement.
    fn next_track_type(&mut self) -> TrackType {
        match self.last_track_type {
            None => TrackType::Lead,
            Some(TrackType::Lead) => TrackType::Body,
            Some(TrackType::Body) => {
                if rand::thread_rng().gen::<f64>() < 0.7 {
                    TrackType::Lead
                } else {
                    TrackType::Body
                }
            }
        }
    }

    /// Store the tempo stamped on subsequent results. Does not affect
    /// candidate filtering.
    pub fn set_tempo(&mut self, tempo: u16) {
        debug!("Selector tempo set to {tempo} BPM");
        self.tempo = tempo;
    }

    #[must_use]
    pub fn tempo(&self) -> u16 {
        self.tempo
    }

    #[must_use]
    pub fn current_key(&self) -> u8 {
        self.keys.current_key()
    }

    #[must_use]
    pub fn stats(&self) -> SelectorStats {
        SelectorStats {
            track_count: self.track_count,
            current_key: self.keys.current_key(),
            current_tempo: self.tempo,
            songs_played: self.catalogue.played(),
            songs_remaining: self.catalogue.remaining(),
            last_track_type: self.last_track_type,
        }
    }

    /// Reset session state. Sub-component resets are independent; the
    /// counters, last track type and tempo always go back to defaults.
    pub fn reset(&mut self, reset_catalogue: bool, reset_key_model: bool) {
        if reset_catalogue {
            self.catalogue.reset();
        }
        if reset_key_model {
            self.keys.reset();
            self.keys.set_key(self.config.initial_key);
        }
        self.track_count = 0;
        self.last_track_type = None;
        self.tempo = self.config.default_tempo;
        info!("Selector reset (catalogue: {reset_catalogue}, keys: {reset_key_model})");
    }

    #[must_use]
    pub fn catalogue(&self) -> &Catalogue {
        &self.catalogue
    }
}
