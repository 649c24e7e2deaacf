//! # Catalogue Module
//!
//! The catalogue owns the immutable track list plus the mutable played-set
//! for one mixing session. All queries are pure filters over the list; the
//! only mutations are marking tracks played and clearing the played-set.
//!
//! Malformed track data is rejected here, once, at construction time
//! ([`Catalogue::new`]). Queries afterwards never fail.

use crate::track::{Track, TrackError, ALLOWED_TEMPOS, KEY_COUNT};
use anyhow::{Context, Result};
use log::{debug, trace};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Filtering criteria for catalogue queries.
///
/// All fields are optional and AND-combined; an unset field is a no-op.
#[derive(Debug, Clone, Default)]
pub struct FilterCriteria {
    /// Exact native tempo match.
    pub tempo: Option<u16>,
    /// Exact key match.
    pub key: Option<u8>,
    /// Exact artist match (case-sensitive, as stored).
    pub artist: Option<String>,
    /// Ids to drop from the result.
    pub exclude_ids: Option<HashSet<u32>>,
}

impl FilterCriteria {
    #[must_use]
    pub fn by_key(key: u8) -> Self {
        Self {
            key: Some(key),
            ..Self::default()
        }
    }
}

/// Aggregate statistics over the full track list (played-state ignored).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogueStats {
    pub tracks_per_tempo: HashMap<u16, usize>,
    pub tracks_per_key: HashMap<u8, usize>,
    pub unique_artists: usize,
    /// Most common tempo; ties broken by ascending tempo order.
    pub most_common_tempo: u16,
    /// Most common key; ties broken by ascending key number.
    pub most_common_key: u8,
}

/// The full track collection plus played-state for one session.
///
/// The played-set only ever holds ids present in the track list, so the
/// remaining-count arithmetic cannot go negative.
#[derive(Debug, Clone)]
pub struct Catalogue {
    tracks: Vec<Track>,
    ids: HashSet<u32>,
    played: HashSet<u32>,
}

impl Catalogue {
    /// Build a catalogue from validated track data.
    ///
    /// # Errors
    ///
    /// Fails fast with a [`TrackError`] if the list is empty, any id is
    /// non-positive or duplicated, artist/title is empty, a key is outside
    /// 1..=12, or a tempo is not in [`ALLOWED_TEMPOS`].
    pub fn new(tracks: Vec<Track>) -> Result<Self, TrackError> {
        if tracks.is_empty() {
            return Err(TrackError::EmptyCatalogue);
        }

        let mut ids = HashSet::with_capacity(tracks.len());
        for track in &tracks {
            track.validate()?;
            if !ids.insert(track.id) {
                return Err(TrackError::DuplicateId { id: track.id });
            }
        }

        debug!("Catalogue built with {} tracks", tracks.len());
        Ok(Self {
            tracks,
            ids,
            played: HashSet::new(),
        })
    }

    /// Load a catalogue from a JSON array of tracks.
    pub fn from_json(json: &str) -> Result<Self> {
        let tracks: Vec<Track> =
            serde_json::from_str(json).context("Failed to parse catalogue JSON")?;
        Self::new(tracks).context("Catalogue validation failed")
    }

    /// Load a catalogue from a JSON file on disk.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalogue file {}", path.display()))?;
        Self::from_json(&json)
    }

    /// All tracks matching the criteria. Never fails; unknown ids in
    /// `exclude_ids` are simply ignored.
    #[must_use]
    pub fn filter(&self, criteria: &FilterCriteria) -> Vec<Track> {
        let matches: Vec<Track> = self
            .tracks
            .iter()
            .filter(|t| criteria.tempo.map_or(true, |tempo| t.native_tempo == tempo))
            .filter(|t| criteria.key.map_or(true, |key| t.key == key))
            .filter(|t| {
                criteria
                    .artist
                    .as_ref()
                    .map_or(true, |artist| &t.artist == artist)
            })
            .filter(|t| {
                criteria
                    .exclude_ids
                    .as_ref()
                    .map_or(true, |ids| !ids.contains(&t.id))
            })
            .cloned()
            .collect();

        trace!("filter {criteria:?} matched {} tracks", matches.len());
        matches
    }

    /// [`filter`](Self::filter) with the played-set merged into `exclude_ids`.
    #[must_use]
    pub fn unplayed(&self, criteria: &FilterCriteria) -> Vec<Track> {
        let mut exclude = criteria.exclude_ids.clone().unwrap_or_default();
        exclude.extend(&self.played);
        self.filter(&FilterCriteria {
            exclude_ids: Some(exclude),
            ..criteria.clone()
        })
    }

    /// All unplayed tracks, catalogue-wide.
    #[must_use]
    pub fn all_unplayed(&self) -> Vec<Track> {
        self.unplayed(&FilterCriteria::default())
    }

    /// Every track in the catalogue, played or not.
    #[must_use]
    pub fn all_tracks(&self) -> Vec<Track> {
        self.tracks.clone()
    }

    /// Idempotent: marking an already-played id is a no-op, and so is an id
    /// the catalogue does not contain.
    pub fn mark_played(&mut self, id: u32) {
        if !self.ids.contains(&id) {
            trace!("Ignoring unknown track id {id}");
            return;
        }
        if self.played.insert(id) {
            trace!("Track {id} marked played ({} remaining)", self.remaining());
        }
    }

    pub fn mark_many_played(&mut self, ids: &[u32]) {
        for &id in ids {
            self.mark_played(id);
        }
    }

    /// Clear the played-set. The track list is untouched.
    pub fn reset(&mut self) {
        debug!("Catalogue reset, clearing {} played ids", self.played.len());
        self.played.clear();
    }

    #[must_use]
    pub fn is_played(&self, id: u32) -> bool {
        self.played.contains(&id)
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.tracks.len()
    }

    #[must_use]
    pub fn played(&self) -> usize {
        self.played.len()
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.tracks.len() - self.played.len()
    }

    /// Case-insensitive substring search over artist and title.
    #[must_use]
    pub fn search(&self, text: &str) -> Vec<Track> {
        let needle = text.to_lowercase();
        self.tracks
            .iter()
            .filter(|t| {
                t.artist.to_lowercase().contains(&needle)
                    || t.title.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect()
    }

    /// Aggregate counts over the whole track list.
    ///
    /// Most-common tempo/key ties are broken by ascending tempo/key order so
    /// the result is stable across runs.
    #[must_use]
    pub fn stats(&self) -> CatalogueStats {
        let mut tracks_per_tempo: HashMap<u16, usize> = HashMap::new();
        let mut tracks_per_key: HashMap<u8, usize> = HashMap::new();
        let mut artists: HashSet<&str> = HashSet::new();

        for track in &self.tracks {
            *tracks_per_tempo.entry(track.native_tempo).or_default() += 1;
            *tracks_per_key.entry(track.key).or_default() += 1;
            artists.insert(track.artist.as_str());
        }

        // Walk candidates in ascending order and keep strict maxima, so ties
        // resolve to the lowest tempo/key.
        let most_common_tempo = ALLOWED_TEMPOS
            .iter()
            .map(|&tempo| (tracks_per_tempo.get(&tempo).copied().unwrap_or(0), tempo))
            .fold((0, ALLOWED_TEMPOS[0]), |best, cur| {
                if cur.0 > best.0 {
                    cur
                } else {
                    best
                }
            })
            .1;
        let most_common_key = (1..=KEY_COUNT)
            .map(|key| (tracks_per_key.get(&key).copied().unwrap_or(0), key))
            .fold((0, 1), |best, cur| if cur.0 > best.0 { cur } else { best })
            .1;

        CatalogueStats {
            tracks_per_tempo,
            tracks_per_key,
            unique_artists: artists.len(),
            most_common_tempo,
            most_common_key,
        }
    }
}
