use serde::Deserialize;

/// Top-level application settings loaded from `config.toml`.
///
/// File format: TOML
/// Default path (Linux/XDG): `$XDG_CONFIG_HOME/stillpoint/config.toml` or `~/.config/stillpoint/config.toml`
///
/// Precedence (highest wins):
/// 1) Environment variables (prefix `STILLPOINT__`, `__` as nested separator)
/// 2) Config file (if present)
/// 3) Struct defaults
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub audio: AudioSettings,
    pub playback: PlaybackSettings,
    pub progress: ProgressSettings,
    pub ui: UiSettings,
    pub catalog: CatalogSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// Frequency of the fallback tone (Hz).
    pub tone_frequency_hz: f32,
    /// Amplitude of the fallback tone, in (0, 1].
    pub tone_gain: f32,
    /// Whether mute also silences the fallback tone.
    pub mute_affects_tone: bool,
    /// How long a track may stay loading before the tone takes over (milliseconds).
    pub load_timeout_ms: u64,
    /// HTTP client timeout for fetching tracks (milliseconds).
    pub fetch_timeout_ms: u64,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            tone_frequency_hz: 432.0,
            tone_gain: 0.1,
            mute_affects_tone: false,
            load_timeout_ms: 15_000,
            fetch_timeout_ms: 20_000,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    /// Whether next/previous start playing the new track once it is ready.
    pub autoplay_on_skip: bool,
    /// Whether the session starts muted.
    pub start_muted: bool,
    /// Track loaded when the player opens (clamped to the catalog).
    pub initial_track: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProgressSettings {
    /// Interval between position samples (milliseconds).
    pub tick_ms: u64,
}

impl Default for ProgressSettings {
    fn default() -> Self {
        Self { tick_ms: 250 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UiSettings {
    /// The text rendered inside the top header box.
    pub header_text: String,

    /// Which track fields to show in the playlist, and in what order.
    ///
    /// Example: ["title", "category", "duration"]
    pub track_fields: Vec<TrackField>,

    /// Separator used to join `track_fields`.
    pub track_separator: String,

    /// Seconds between quote changes. 0 keeps the first quote.
    pub quote_interval_secs: u64,

    /// Mindfulness quotes shown under the player.
    pub quotes: Vec<String>,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            header_text: " ~ Find your center ~ ".to_string(),
            track_fields: vec![TrackField::Title, TrackField::Category, TrackField::Duration],
            track_separator: " • ".to_string(),
            quote_interval_secs: 6,
            quotes: default_quotes(),
        }
    }
}

fn default_quotes() -> Vec<String> {
    [
        "The present moment is filled with joy and happiness. If you are attentive, you will see it.",
        "Meditation is not about stopping thoughts, but recognizing that we are more than our thoughts.",
        "Peace comes from within. Do not seek it without.",
        "In the midst of movement and chaos, keep stillness inside of you.",
        "The quieter you become, the more you can hear.",
        "Meditation is the tongue of the soul and the language of our spirit.",
    ]
    .iter()
    .map(|q| q.to_string())
    .collect()
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrackField {
    Title,
    #[serde(alias = "type", alias = "kind")]
    Category,
    #[serde(alias = "length")]
    Duration,
    #[serde(alias = "url", alias = "uri")]
    Source,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CatalogSettings {
    /// Replaces the built-in catalog when non-empty.
    pub tracks: Vec<TrackEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackEntry {
    pub title: String,
    #[serde(default)]
    pub category: String,
    /// Advertised length, shown as-is.
    #[serde(default)]
    pub duration: String,
    pub url: String,
}
