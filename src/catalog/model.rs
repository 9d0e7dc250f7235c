use std::sync::Arc;

use crate::config::TrackEntry;

/// One catalog entry. Identity is its position in the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub title: String,
    pub category: String,
    /// Advertised length as shown to the user, e.g. `10:00`.
    pub display_duration: String,
    pub source_uri: String,
}

impl Track {
    pub fn new(title: &str, category: &str, display_duration: &str, source_uri: &str) -> Self {
        Self {
            title: title.to_string(),
            category: category.to_string(),
            display_duration: display_duration.to_string(),
            source_uri: source_uri.to_string(),
        }
    }
}

impl From<&TrackEntry> for Track {
    fn from(entry: &TrackEntry) -> Self {
        Self::new(&entry.title, &entry.category, &entry.duration, &entry.url)
    }
}

/// Immutable ordered list of tracks, cheap to clone.
#[derive(Debug, Clone)]
pub struct TrackCatalog {
    tracks: Arc<[Track]>,
}

impl TrackCatalog {
    pub fn new(tracks: Vec<Track>) -> Self {
        Self {
            tracks: tracks.into(),
        }
    }

    /// The built-in meditation tracks.
    pub fn builtin() -> Self {
        Self::new(vec![
            Track::new(
                "Morning Focus",
                "Focus",
                "10:00",
                "https://cdn.freesound.org/previews/567/567174_11861866-lq.mp3",
            ),
            Track::new(
                "Inner Peace",
                "Peace",
                "15:00",
                "https://cdn.freesound.org/previews/221/221576_2394245-lq.mp3",
            ),
            Track::new(
                "Gratitude Practice",
                "Gratitude",
                "8:00",
                "https://cdn.freesound.org/previews/415/415209_6525331-lq.mp3",
            ),
            Track::new(
                "Stress Relief",
                "Relief",
                "12:00",
                "https://cdn.freesound.org/previews/458/458130_7037732-lq.mp3",
            ),
            Track::new(
                "Sleep Meditation",
                "Sleep",
                "20:00",
                "https://cdn.freesound.org/previews/419/419977_1474204-lq.mp3",
            ),
            Track::new(
                "Body Scan",
                "Relaxation",
                "18:00",
                "https://cdn.freesound.org/previews/364/364725_5121236-lq.mp3",
            ),
        ])
    }

    /// Catalog from configured entries, or the built-in one when none are given.
    pub fn from_entries(entries: &[TrackEntry]) -> Self {
        if entries.is_empty() {
            Self::builtin()
        } else {
            Self::new(entries.iter().map(Track::from).collect())
        }
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Track> {
        self.tracks.iter()
    }

    /// Index after `current`, wrapping to the first track.
    pub fn wrap_next(&self, current: usize) -> Option<usize> {
        match self.len() {
            0 => None,
            n => Some((current % n + 1) % n),
        }
    }

    /// Index before `current`, wrapping to the last track.
    pub fn wrap_prev(&self, current: usize) -> Option<usize> {
        match self.len() {
            0 => None,
            n => Some((current % n + n - 1) % n),
        }
    }
}
