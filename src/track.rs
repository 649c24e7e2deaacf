//! Track data model and load-time validation.
//!
//! A [`Track`] is immutable once loaded: the catalogue rejects malformed
//! track data at construction time so queries never have to re-validate.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tempos the engine is allowed to mix at, in BPM.
///
/// Every track is analyzed offline and rendered at one of these tempos, so
/// `native_tempo` outside this set means the input data is stale or corrupt.
pub const ALLOWED_TEMPOS: [u16; 6] = [84, 94, 102, 110, 120, 128];

/// Number of key buckets on the progression wheel.
pub const KEY_COUNT: u8 = 12;

/// Validation failures for track data, raised once at catalogue build time.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TrackError {
    /// The input track list was empty.
    #[error("catalogue cannot be built from an empty track list")]
    EmptyCatalogue,

    /// A track id was zero (ids are positive and unique).
    #[error("track id must be positive (artist: `{artist}', title: `{title}')")]
    NonPositiveId { artist: String, title: String },

    /// Two tracks shared the same id.
    #[error("duplicate track id {id}")]
    DuplicateId { id: u32 },

    /// Artist or title was empty.
    #[error("track {id} has an empty {field}")]
    EmptyField { id: u32, field: &'static str },

    /// Key outside the 1..=12 wheel.
    #[error("track {id} has key {key}, expected 1..={}", KEY_COUNT)]
    KeyOutOfRange { id: u32, key: u8 },

    /// Tempo not in [`ALLOWED_TEMPOS`].
    #[error("track {id} has unsupported tempo {tempo} BPM")]
    DisallowedTempo { id: u32, tempo: u16 },
}

/// A single mixable track. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    /// Positive, unique within the catalogue.
    pub id: u32,
    pub artist: String,
    pub title: String,
    /// Key bucket on the progression wheel, 1..=12. Not an absolute pitch.
    pub key: u8,
    /// The tempo the track was rendered at, one of [`ALLOWED_TEMPOS`].
    pub native_tempo: u16,
}

impl Track {
    /// Check a single track against the load-time invariants.
    pub fn validate(&self) -> Result<(), TrackError> {
        if self.id == 0 {
            return Err(TrackError::NonPositiveId {
                artist: self.artist.clone(),
                title: self.title.clone(),
            });
        }
        if self.artist.trim().is_empty() {
            return Err(TrackError::EmptyField {
                id: self.id,
                field: "artist",
            });
        }
        if self.title.trim().is_empty() {
            return Err(TrackError::EmptyField {
                id: self.id,
                field: "title",
            });
        }
        if self.key < 1 || self.key > KEY_COUNT {
            return Err(TrackError::KeyOutOfRange {
                id: self.id,
                key: self.key,
            });
        }
        if !ALLOWED_TEMPOS.contains(&self.native_tempo) {
            return Err(TrackError::DisallowedTempo {
                id: self.id,
                tempo: self.native_tempo,
            });
        }
        Ok(())
    }
}

/// Whether a track is scheduled as a short intro segment or the extended
/// main segment of a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackType {
    /// Short intro segment.
    Lead,
    /// Extended main segment.
    Body,
}

impl std::fmt::Display for TrackType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackType::Lead => write!(f, "lead"),
            TrackType::Body => write!(f, "body"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track() -> Track {
        Track {
            id: 1,
            artist: "Test Artist".to_string(),
            title: "Test Title".to_string(),
            key: 4,
            native_tempo: 94,
        }
    }

    #[test]
    fn valid_track_passes() {
        assert_eq!(track().validate(), Ok(()));
    }

    #[test]
    fn zero_id_rejected() {
        let t = Track { id: 0, ..track() };
        assert!(matches!(t.validate(), Err(TrackError::NonPositiveId { .. })));
    }

    #[test]
    fn empty_artist_rejected() {
        let t = Track {
            artist: "   ".to_string(),
            ..track()
        };
        assert_eq!(
            t.validate(),
            Err(TrackError::EmptyField {
                id: 1,
                field: "artist"
            })
        );
    }

    #[test]
    fn empty_title_rejected() {
        let t = Track {
            title: String::new(),
            ..track()
        };
        assert_eq!(
            t.validate(),
            Err(TrackError::EmptyField {
                id: 1,
                field: "title"
            })
        );
    }

    #[test]
    fn key_bounds_enforced() {
        for key in [0u8, 13, 200] {
            let t = Track { key, ..track() };
            assert_eq!(t.validate(), Err(TrackError::KeyOutOfRange { id: 1, key }));
        }
        for key in 1..=12u8 {
            let t = Track { key, ..track() };
            assert_eq!(t.validate(), Ok(()));
        }
    }

    #[test]
    fn tempo_whitelist_enforced() {
        let t = Track {
            native_tempo: 100,
            ..track()
        };
        assert_eq!(
            t.validate(),
            Err(TrackError::DisallowedTempo { id: 1, tempo: 100 })
        );
    }

    #[test]
    fn track_type_display() {
        assert_eq!(TrackType::Lead.to_string(), "lead");
        assert_eq!(TrackType::Body.to_string(), "body");
    }
}
