use crate::app::App;
use crate::audio::AudioPlayer;
use crate::config;

/// Seed the view and the engine from the `[playback]` settings.
pub fn apply_playback_defaults(app: &mut App, audio_player: &AudioPlayer, settings: &config::Settings) {
    if app.has_tracks() {
        let initial = settings.playback.initial_track.min(app.catalog.len() - 1);
        app.set_selected(initial);
    }

    if settings.playback.start_muted {
        if let Err(e) = audio_player.set_muted(true) {
            tracing::warn!(error = %e, "could not apply start_muted");
        }
    }
}
