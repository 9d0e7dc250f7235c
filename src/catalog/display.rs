use crate::config::TrackField;

use super::model::Track;

/// Build a display string for a track according to the provided `fields` and separator.
///
/// Blank fields are skipped; the title is used when nothing was produced.
pub fn display_from_fields(track: &Track, fields: &[TrackField], sep: &str) -> String {
    let mut parts: Vec<String> = Vec::new();

    for f in fields {
        let value = match f {
            TrackField::Title => track.title.as_str(),
            TrackField::Category => track.category.as_str(),
            TrackField::Duration => track.display_duration.as_str(),
            TrackField::Source => track.source_uri.as_str(),
        };
        let value = value.trim();
        if !value.is_empty() {
            parts.push(value.to_string());
        }
    }

    if parts.is_empty() {
        track.title.clone()
    } else {
        parts.join(sep)
    }
}
